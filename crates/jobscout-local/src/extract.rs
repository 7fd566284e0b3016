//! Ordered-fallback field extraction from search-results cards and detail pages.
//!
//! Listing markup drifts across page variants, so every field is looked up
//! through an ordered selector chain: the first selector yielding non-empty
//! text wins, and exhausting the chain yields the sentinel rather than an
//! error. Extraction never fails on a syntactically valid node.

use html_scraper::{ElementRef, Html, Selector};
use jobscout_core::{DetailFields, FieldText, ListingSummary, CONTRACT_FALLBACK};

use crate::salary;

/// Base origin that root-relative listing links resolve against.
pub const BASE_ORIGIN: &str = "https://www.linkedin.com";

const CARD_SELECTORS: &[&str] = &[
    "div.base-card",
    "li.job-result-card",
    "div.job-search-card",
    "section.jobs-search__results-list li",
    "[data-entity-urn*=\"jobPosting\"]",
];

const TITLE_SELECTORS: &[&str] = &[
    "h3.base-search-card__title",
    "h3.job-result-card__title",
    ".base-search-card__title",
    "span.sr-only",
];

const COMPANY_SELECTORS: &[&str] = &[
    "h4.base-search-card__subtitle",
    "a.job-result-card__company",
    ".base-search-card__subtitle",
];

const LOCATION_SELECTORS: &[&str] = &[
    "span.job-search-card__location",
    "span.job-result-card__location",
    ".job-search-card__location",
];

const LINK_SELECTORS: &[&str] = &[
    "a.base-card__full-link",
    "a.job-result-card__full-card-link",
    ".base-card__full-link",
];

const DESCRIPTION_SELECTORS: &[&str] = &[
    ".description__text",
    ".show-more-less-html__markup",
    ".jobs-box__html-content",
    ".description",
    ".jobs-description__content",
    "div.description__text",
];

const CONTRACT_SELECTORS: &[&str] = &[
    ".jobs-description-details__list-item span",
    ".jobs-unified-top-card__job-insight",
    ".jobs-details-top-card__job-type",
];

/// Contract-type vocabulary, lowercased. `cdi`/`cdd` cover the French variants.
pub const CONTRACT_KEYWORDS: &[&str] = &[
    "full-time",
    "part-time",
    "contract",
    "internship",
    "temporary",
    "cdi",
    "cdd",
];

fn norm_ws(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn node_text(el: &ElementRef) -> String {
    norm_ws(&el.text().collect::<Vec<_>>().join(" "))
}

fn first_match_text(scope: &ElementRef, selectors: &[&str]) -> Option<String> {
    for raw in selectors {
        let Ok(sel) = Selector::parse(raw) else {
            continue;
        };
        if let Some(el) = scope.select(&sel).next() {
            let t = node_text(&el);
            if !t.is_empty() {
                return Some(t);
            }
        }
    }
    None
}

/// Candidate cards from a search-results page, first matching selector wins.
///
/// `max` is the over-fetch window: callers pass target-count × multiplier so
/// attrition from masking still leaves enough survivors.
pub fn select_cards<'a>(doc: &'a Html, max: usize) -> Vec<ElementRef<'a>> {
    for raw in CARD_SELECTORS {
        let Ok(sel) = Selector::parse(raw) else {
            continue;
        };
        let cards: Vec<ElementRef<'a>> = doc.select(&sel).take(max).collect();
        if !cards.is_empty() {
            return cards;
        }
    }
    Vec::new()
}

/// Resolve a root-relative link against the page it was extracted from,
/// falling back to the base origin when the page URL is unparseable.
/// Absolute links pass through unchanged.
pub fn resolve_link(href: &str, page_url: &str) -> String {
    if href.starts_with('/') {
        let base = url::Url::parse(page_url).or_else(|_| url::Url::parse(BASE_ORIGIN));
        match base.and_then(|b| b.join(href)) {
            Ok(u) => u.to_string(),
            Err(_) => href.to_string(),
        }
    } else {
        href.to_string()
    }
}

fn extract_link(card: &ElementRef, page_url: &str) -> Option<String> {
    for raw in LINK_SELECTORS {
        let Ok(sel) = Selector::parse(raw) else {
            continue;
        };
        if let Some(el) = card.select(&sel).next() {
            if let Some(href) = el.value().attr("href") {
                let href = href.trim();
                if !href.is_empty() {
                    return Some(resolve_link(href, page_url));
                }
            }
        }
    }
    None
}

/// Title-case each alphabetic run, so "full-time" becomes "Full-Time".
pub fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut at_word_start = true;
    for ch in s.chars() {
        if ch.is_alphabetic() {
            if at_word_start {
                out.extend(ch.to_uppercase());
                at_word_start = false;
            } else {
                out.extend(ch.to_lowercase());
            }
        } else {
            out.push(ch);
            at_word_start = true;
        }
    }
    out
}

/// Extract a normalized summary from one search-results card. `page_url` is
/// the URL the card came from; relative links resolve against it.
pub fn extract_summary(card: &ElementRef, page_url: &str) -> ListingSummary {
    ListingSummary {
        title: FieldText::from_extracted(first_match_text(card, TITLE_SELECTORS)),
        company: FieldText::from_extracted(first_match_text(card, COMPANY_SELECTORS)),
        location: FieldText::from_extracted(first_match_text(card, LOCATION_SELECTORS)),
        link: extract_link(card, page_url),
    }
}

fn extract_contract_type(root: &ElementRef) -> Option<String> {
    for raw in CONTRACT_SELECTORS {
        let Ok(sel) = Selector::parse(raw) else {
            continue;
        };
        for el in root.select(&sel) {
            let text = node_text(&el);
            let lowered = text.to_lowercase();
            if CONTRACT_KEYWORDS.iter().any(|kw| lowered.contains(kw)) {
                return Some(title_case(&text));
            }
        }
    }
    None
}

/// Detail-page extraction mode: description, contract type and salary.
///
/// The salary is parsed out of the normalized description text; an absent
/// description means there is nothing to parse a salary from.
pub fn extract_detail(html: &str) -> DetailFields {
    let doc = Html::parse_document(html);
    let root = doc.root_element();

    let description = first_match_text(&root, DESCRIPTION_SELECTORS);
    let salary = description.as_deref().and_then(salary::extract_salary);
    let contract_type =
        extract_contract_type(&root).unwrap_or_else(|| CONTRACT_FALLBACK.to_string());

    let mut fields = DetailFields::default();
    if let Some(description) = description {
        fields.description = description;
    }
    fields.contract_type = contract_type;
    fields.salary = salary;
    fields
}
