//! Search orchestration: compose fetch → extract → filter → enrich → filter
//! per (title, location) pair.
//!
//! The run is strictly sequential; fixed pacing delays between pairs and
//! between detail fetches are the only rate policy. Trouble at any scope
//! degrades locally: a failed search page empties that pair, a failed detail
//! fetch drops that listing, and `search` itself never returns an error.

use std::sync::Arc;
use std::time::Duration;

use jobscout_core::{FetchBackend, FetchRequest, ListingDetail, ListingSummary, SearchIntent};

use crate::{extract, filter};

/// Raw candidates considered per pair, as a multiple of the target count.
/// Compensates for expected attrition from masking and failed detail fetches.
pub const OVER_FETCH_MULTIPLIER: usize = 3;

pub const DEFAULT_SEARCH_URL: &str = "https://www.linkedin.com/jobs/search/";

#[derive(Debug, Clone)]
pub struct SearchConfig {
    /// Target listing count per (title, location) pair.
    pub jobs_per_pair: usize,
    /// Search-results endpoint; overridable so tests can point at a fixture.
    pub search_url: String,
    pub pair_delay_ms: u64,
    pub detail_delay_ms: u64,
    pub search_timeout_ms: u64,
    pub detail_timeout_ms: u64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            jobs_per_pair: 5,
            search_url: DEFAULT_SEARCH_URL.to_string(),
            pair_delay_ms: 1_000,
            detail_delay_ms: 500,
            search_timeout_ms: 15_000,
            detail_timeout_ms: 10_000,
        }
    }
}

pub struct SearchOrchestrator {
    fetcher: Arc<dyn FetchBackend>,
    cfg: SearchConfig,
}

impl SearchOrchestrator {
    pub fn new(fetcher: Arc<dyn FetchBackend>, cfg: SearchConfig) -> Self {
        Self { fetcher, cfg }
    }

    /// Run every (title, location) pair sequentially; results concatenate in
    /// pair-iteration order. Per-pair trouble yields an empty pair, never an
    /// error.
    pub async fn search(&self, intent: &SearchIntent) -> Vec<ListingDetail> {
        let mut all = Vec::new();
        let mut first = true;
        for (title, location) in intent.pairs() {
            if !first && self.cfg.pair_delay_ms > 0 {
                tokio::time::sleep(Duration::from_millis(self.cfg.pair_delay_ms)).await;
            }
            first = false;
            let found = self.search_pair(title, location).await;
            tracing::debug!(title, location, count = found.len(), "pair complete");
            all.extend(found);
        }
        all
    }

    fn search_url(&self, title: &str, location: &str) -> Option<String> {
        let mut u = url::Url::parse(&self.cfg.search_url).ok()?;
        u.query_pairs_mut()
            .append_pair("keywords", title)
            .append_pair("location", location);
        Some(u.to_string())
    }

    async fn search_pair(&self, title: &str, location: &str) -> Vec<ListingDetail> {
        let Some(url) = self.search_url(title, location) else {
            tracing::warn!(title, location, "unparseable search url");
            return Vec::new();
        };

        let mut req = FetchRequest::get(url);
        req.timeout_ms = Some(self.cfg.search_timeout_ms);
        let resp = match self.fetcher.fetch(&req).await {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!(title, location, error = %e, "search page fetch failed");
                return Vec::new();
            }
        };
        if !resp.is_success() {
            tracing::warn!(title, location, status = resp.status, "search page unavailable");
            return Vec::new();
        }

        let body = resp.text_lossy();
        // Parse and extract in one scope: the DOM handle is not Send and must
        // not live across the detail-fetch awaits below.
        let candidates: Vec<ListingSummary> = {
            let doc = html_scraper::Html::parse_document(&body);
            extract::select_cards(&doc, self.cfg.jobs_per_pair * OVER_FETCH_MULTIPLIER)
                .iter()
                .map(|card| extract::extract_summary(card, &resp.final_url))
                .collect()
        };

        let mut out = Vec::new();
        let mut fetched_any = false;
        for summary in candidates {
            if out.len() >= self.cfg.jobs_per_pair {
                break;
            }
            if filter::summary_is_masked(&summary) {
                tracing::debug!(title = summary.title.display(), "masked summary dropped");
                continue;
            }
            if summary.link.is_some() {
                if fetched_any && self.cfg.detail_delay_ms > 0 {
                    tokio::time::sleep(Duration::from_millis(self.cfg.detail_delay_ms)).await;
                }
                fetched_any = true;
            }
            let Some(detail) = self.enrich(summary).await else {
                continue;
            };
            if filter::detail_is_masked(&detail) {
                tracing::debug!(title = detail.title.display(), "masked detail dropped");
                continue;
            }
            out.push(detail);
        }
        out
    }

    /// Enrich a summary from its detail page. A summary without a link is
    /// terminal: kept with defaults, no fetch. A failed or non-success detail
    /// fetch drops the listing.
    async fn enrich(&self, summary: ListingSummary) -> Option<ListingDetail> {
        let Some(link) = summary.link.clone() else {
            return Some(summary.into_terminal_detail());
        };

        let mut req = FetchRequest::get(link);
        req.timeout_ms = Some(self.cfg.detail_timeout_ms);
        let resp = match self.fetcher.fetch(&req).await {
            Ok(r) => r,
            Err(e) => {
                tracing::debug!(url = req.url, error = %e, "detail fetch failed, listing dropped");
                return None;
            }
        };
        if !resp.is_success() {
            tracing::debug!(url = req.url, status = resp.status, "detail unavailable, listing dropped");
            return None;
        }

        let fields = extract::extract_detail(&resp.text_lossy());
        Some(summary.into_detail(fields))
    }
}
