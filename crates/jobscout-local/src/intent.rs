//! Free-text query interpretation.
//!
//! This is an intentionally coarse keyword-containment matcher over curated
//! vocabularies, not a natural-language parser. Overlaps and ties resolve
//! purely by vocabulary iteration order. Salary-looking tokens ("60k") are
//! never consumed here; salary parsing applies to listing descriptions only.

use jobscout_core::SearchIntent;

use crate::extract::title_case;

pub const DEFAULT_TITLE: &str = "Software Engineer";
pub const DEFAULT_CITY: &str = "Paris";
pub const DEFAULT_REMOTE: &str = "Remote";

/// Lowercased job-title vocabulary, scanned in order.
const TITLE_VOCAB: &[&str] = &[
    "backend developer",
    "frontend developer",
    "full stack developer",
    "fullstack developer",
    "software engineer",
    "software developer",
    "web developer",
    "mobile developer",
    "ios developer",
    "android developer",
    "data scientist",
    "data engineer",
    "data analyst",
    "machine learning engineer",
    "devops engineer",
    "cloud engineer",
    "security engineer",
    "qa engineer",
    "product manager",
    "ux designer",
    "ui designer",
];

/// Lowercased location vocabulary, scanned in order; first match wins.
const LOCATION_VOCAB: &[&str] = &[
    "paris",
    "london",
    "berlin",
    "amsterdam",
    "madrid",
    "barcelona",
    "lyon",
    "toulouse",
    "marseille",
    "bordeaux",
    "lille",
    "nantes",
    "brussels",
    "geneva",
    "zurich",
    "dublin",
    "new york",
    "san francisco",
    "montreal",
    "remote",
];

/// Map free text to a structured search intent.
///
/// Every title vocabulary entry contained in the query is included (in
/// vocabulary order, title-cased); no match falls back to the default title.
/// The first location vocabulary entry contained wins; no match falls back to
/// the default city plus remote.
pub fn interpret(free_text: &str) -> SearchIntent {
    let lowered = free_text.to_lowercase();

    let mut titles: Vec<String> = TITLE_VOCAB
        .iter()
        .filter(|entry| lowered.contains(*entry))
        .map(|entry| title_case(entry))
        .collect();
    if titles.is_empty() {
        titles.push(DEFAULT_TITLE.to_string());
    }

    let locations = match LOCATION_VOCAB.iter().find(|entry| lowered.contains(*entry)) {
        Some(entry) => vec![title_case(entry)],
        None => vec![DEFAULT_CITY.to_string(), DEFAULT_REMOTE.to_string()],
    };

    SearchIntent { titles, locations }
}
