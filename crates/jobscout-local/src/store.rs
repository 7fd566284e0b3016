//! Collaborator implementations at the edge of the pipeline.
//!
//! Persistence keys on the detail link; a record without one falls back to a
//! title/company composite so repeated terminal records still collapse.
//! Duplicate upserts are absorbed silently, never surfaced as errors.

use std::collections::HashMap;

use jobscout_core::{ListingDetail, ListingStore, Notifier, Result};
use tokio::sync::Mutex;

#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<HashMap<String, ListingDetail>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn key(listing: &ListingDetail) -> String {
        listing.link.clone().unwrap_or_else(|| {
            format!("{}|{}", listing.title.display(), listing.company.display())
        })
    }

    pub async fn len(&self) -> usize {
        self.inner.lock().await.len()
    }
}

#[async_trait::async_trait]
impl ListingStore for MemoryStore {
    async fn upsert(&self, listing: &ListingDetail) -> Result<bool> {
        let mut inner = self.inner.lock().await;
        let key = Self::key(listing);
        if inner.contains_key(&key) {
            return Ok(false);
        }
        inner.insert(key, listing.clone());
        Ok(true)
    }
}

/// Notifier that only records delivery in the log. Stands in for real
/// delivery channels; callers must treat any notifier failure as non-fatal.
#[derive(Debug, Default, Clone)]
pub struct LogNotifier;

#[async_trait::async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, listings: &[ListingDetail], recipients: &[String]) -> Result<()> {
        tracing::info!(
            listings = listings.len(),
            recipients = recipients.len(),
            "notifying recipients of new listings"
        );
        Ok(())
    }
}
