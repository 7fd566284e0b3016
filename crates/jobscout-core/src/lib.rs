use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("invalid url: {0}")]
    InvalidUrl(String),
    #[error("invalid intent: {0}")]
    InvalidIntent(String),
    #[error("fetch failed: {0}")]
    Fetch(String),
    #[error("embedding backend unavailable: {0}")]
    EmbeddingUnavailable(String),
    #[error("not configured: {0}")]
    NotConfigured(String),
    #[error("store error: {0}")]
    Store(String),
    #[error("notify failed: {0}")]
    Notify(String),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Placeholder a consumer sees for a field that could not be extracted.
pub const SENTINEL: &str = "N/A";
pub const DESCRIPTION_FALLBACK: &str = "Description not available";
pub const CONTRACT_FALLBACK: &str = "Not specified";
pub const SALARY_FALLBACK: &str = "Not specified";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchRequest {
    pub url: String,
    /// Timeout for the whole operation (connect + body).
    pub timeout_ms: Option<u64>,
    /// Optional headers to add (best-effort; adapter may drop unsafe headers).
    pub headers: BTreeMap<String, String>,
}

impl FetchRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            timeout_ms: None,
            headers: BTreeMap::new(),
        }
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchResponse {
    pub url: String,
    pub final_url: String,
    pub status: u16,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl FetchResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn text_lossy(&self) -> String {
        String::from_utf8_lossy(&self.bytes).to_string()
    }
}

#[async_trait::async_trait]
pub trait FetchBackend: Send + Sync {
    async fn fetch(&self, req: &FetchRequest) -> Result<FetchResponse>;
}

/// Text field that may be semantically absent.
///
/// Extraction misses are data, not errors: a field that could not be found is
/// `Unknown`, which serializes as the `"N/A"` placeholder. Downstream logic
/// branches on the variant, never on string equality with the placeholder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum FieldText {
    Known(String),
    Unknown,
}

impl FieldText {
    /// Normalize raw extracted text: empty/whitespace and the placeholder
    /// itself both collapse into `Unknown`.
    pub fn from_extracted(text: Option<String>) -> Self {
        match text {
            Some(s) => Self::from(s),
            None => Self::Unknown,
        }
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, Self::Unknown)
    }

    pub fn as_known(&self) -> Option<&str> {
        match self {
            Self::Known(s) => Some(s.as_str()),
            Self::Unknown => None,
        }
    }

    /// Presentation form: the text itself, or the `"N/A"` placeholder.
    pub fn display(&self) -> &str {
        self.as_known().unwrap_or(SENTINEL)
    }
}

impl From<String> for FieldText {
    fn from(s: String) -> Self {
        let t = s.trim();
        if t.is_empty() || t == SENTINEL {
            Self::Unknown
        } else if t.len() == s.len() {
            Self::Known(s)
        } else {
            Self::Known(t.to_string())
        }
    }
}

impl From<&str> for FieldText {
    fn from(s: &str) -> Self {
        Self::from(s.to_string())
    }
}

impl From<FieldText> for String {
    fn from(f: FieldText) -> Self {
        match f {
            FieldText::Known(s) => s,
            FieldText::Unknown => SENTINEL.to_string(),
        }
    }
}

/// One candidate listing as extracted from a search-results card.
///
/// `link` is absent when no link element was found; an absent link
/// short-circuits detail fetching (the record is terminal, never enriched).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListingSummary {
    pub title: FieldText,
    pub company: FieldText,
    pub location: FieldText,
    pub link: Option<String>,
}

/// Fields pulled from a listing's detail page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetailFields {
    pub description: String,
    pub contract_type: String,
    pub salary: Option<String>,
}

impl Default for DetailFields {
    fn default() -> Self {
        Self {
            description: DESCRIPTION_FALLBACK.to_string(),
            contract_type: CONTRACT_FALLBACK.to_string(),
            salary: None,
        }
    }
}

/// A summary enriched with detail-page content. Immutable once produced;
/// ranking only attaches a score, it never rewrites these fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListingDetail {
    pub title: FieldText,
    pub company: FieldText,
    pub location: FieldText,
    pub link: Option<String>,
    pub description: String,
    pub contract_type: String,
    pub salary: Option<String>,
}

impl ListingSummary {
    pub fn into_detail(self, fields: DetailFields) -> ListingDetail {
        ListingDetail {
            title: self.title,
            company: self.company,
            location: self.location,
            link: self.link,
            description: fields.description,
            contract_type: fields.contract_type,
            salary: fields.salary,
        }
    }

    /// Terminal record for a summary with no detail link: defaults only.
    pub fn into_terminal_detail(self) -> ListingDetail {
        self.into_detail(DetailFields::default())
    }
}

impl ListingDetail {
    /// Presentation form of the salary field.
    pub fn salary_display(&self) -> &str {
        self.salary.as_deref().unwrap_or(SALARY_FALLBACK)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankedListing {
    #[serde(flatten)]
    pub listing: ListingDetail,
    /// Cosine similarity against the query, rounded for display stability.
    pub score: f64,
}

/// Structured search intent: which (title, location) pairs to run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchIntent {
    pub titles: Vec<String>,
    pub locations: Vec<String>,
}

impl SearchIntent {
    /// Build from already-decided parameters, bypassing inference.
    pub fn explicit(title: impl Into<String>, location: impl Into<String>) -> Result<Self> {
        Self::new(vec![title.into()], vec![location.into()])
    }

    /// Normalize: trim entries, drop empties, dedup titles in order.
    pub fn new(titles: Vec<String>, locations: Vec<String>) -> Result<Self> {
        let mut out_titles: Vec<String> = Vec::new();
        for t in titles {
            let t = t.trim().to_string();
            if !t.is_empty() && !out_titles.contains(&t) {
                out_titles.push(t);
            }
        }
        let mut out_locations: Vec<String> = Vec::new();
        for l in locations {
            let l = l.trim().to_string();
            if !l.is_empty() && !out_locations.contains(&l) {
                out_locations.push(l);
            }
        }
        if out_titles.is_empty() {
            return Err(Error::InvalidIntent("no usable title".to_string()));
        }
        if out_locations.is_empty() {
            return Err(Error::InvalidIntent("no usable location".to_string()));
        }
        Ok(Self {
            titles: out_titles,
            locations: out_locations,
        })
    }

    /// (title, location) pairs in iteration order: titles outer, locations inner.
    pub fn pairs(&self) -> Vec<(&str, &str)> {
        let mut out = Vec::with_capacity(self.titles.len() * self.locations.len());
        for t in &self.titles {
            for l in &self.locations {
                out.push((t.as_str(), l.as_str()));
            }
        }
        out
    }
}

/// Text-embedding collaborator: fixed-size vectors, deterministic within a run.
///
/// Implementations may batch however they like, but must return one vector per
/// input text, in input order.
#[async_trait::async_trait]
pub trait EmbeddingBackend: Send + Sync {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;
}

/// Persistence collaborator. Uniqueness is keyed on the detail link;
/// duplicate upserts are absorbed, not errors.
#[async_trait::async_trait]
pub trait ListingStore: Send + Sync {
    /// Returns true when the listing was newly inserted.
    async fn upsert(&self, listing: &ListingDetail) -> Result<bool>;
}

/// Notification collaborator. Callers must treat failures as non-fatal.
#[async_trait::async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, listings: &[ListingDetail], recipients: &[String]) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_text_normalizes_placeholder_and_whitespace() {
        assert_eq!(FieldText::from("N/A"), FieldText::Unknown);
        assert_eq!(FieldText::from(""), FieldText::Unknown);
        assert_eq!(FieldText::from("   "), FieldText::Unknown);
        assert_eq!(
            FieldText::from("  Acme Corp "),
            FieldText::Known("Acme Corp".to_string())
        );
        assert!(FieldText::from_extracted(None).is_unknown());
    }

    #[test]
    fn field_text_serializes_as_plain_string() {
        let known = FieldText::Known("Backend Developer".to_string());
        assert_eq!(
            serde_json::to_string(&known).unwrap(),
            "\"Backend Developer\""
        );
        assert_eq!(
            serde_json::to_string(&FieldText::Unknown).unwrap(),
            "\"N/A\""
        );

        let back: FieldText = serde_json::from_str("\"N/A\"").unwrap();
        assert!(back.is_unknown());
        let back: FieldText = serde_json::from_str("\"Acme\"").unwrap();
        assert_eq!(back.as_known(), Some("Acme"));
    }

    #[test]
    fn intent_dedups_titles_and_keeps_order() {
        let intent = SearchIntent::new(
            vec![
                "Backend Developer".to_string(),
                " Backend Developer ".to_string(),
                "Data Engineer".to_string(),
                "".to_string(),
            ],
            vec!["Paris".to_string(), "Remote".to_string()],
        )
        .unwrap();
        assert_eq!(intent.titles, vec!["Backend Developer", "Data Engineer"]);
        assert_eq!(
            intent.pairs(),
            vec![
                ("Backend Developer", "Paris"),
                ("Backend Developer", "Remote"),
                ("Data Engineer", "Paris"),
                ("Data Engineer", "Remote"),
            ]
        );
    }

    #[test]
    fn intent_rejects_empty_inputs() {
        assert!(SearchIntent::new(vec![], vec!["Paris".to_string()]).is_err());
        assert!(SearchIntent::explicit("Engineer", "  ").is_err());
    }

    #[test]
    fn terminal_detail_carries_defaults() {
        let summary = ListingSummary {
            title: FieldText::from("Engineer"),
            company: FieldText::Unknown,
            location: FieldText::from("Paris"),
            link: None,
        };
        let detail = summary.into_terminal_detail();
        assert_eq!(detail.description, DESCRIPTION_FALLBACK);
        assert_eq!(detail.contract_type, CONTRACT_FALLBACK);
        assert_eq!(detail.salary_display(), SALARY_FALLBACK);
        assert_eq!(detail.company.display(), SENTINEL);
    }

    #[test]
    fn ranked_listing_flattens_in_json() {
        let detail = ListingSummary {
            title: FieldText::from("Engineer"),
            company: FieldText::from("Acme"),
            location: FieldText::from("Paris"),
            link: Some("https://example.com/jobs/1".to_string()),
        }
        .into_terminal_detail();
        let ranked = RankedListing {
            listing: detail,
            score: 0.731234,
        };
        let v: serde_json::Value = serde_json::to_value(&ranked).unwrap();
        assert_eq!(v["title"].as_str(), Some("Engineer"));
        assert_eq!(v["score"].as_f64(), Some(0.731234));
    }
}
