//! Masked-listing detection.
//!
//! Some sites redact fields with runs of a masking glyph instead of omitting
//! them. Masking is data quality, not an error: masked records are dropped at
//! two checkpoints, once after summary extraction (before the detail fetch is
//! paid for) and once after enrichment (detail pages can reveal masking the
//! summary did not).

use jobscout_core::{FieldText, ListingDetail, ListingSummary, SENTINEL};

pub const MASK_GLYPH: char = '*';

/// True iff `text` is the sentinel, empty, or at least half masking glyphs.
pub fn is_masked(text: &str) -> bool {
    if text.is_empty() || text == SENTINEL {
        return true;
    }
    let mut len = 0usize;
    let mut masked = 0usize;
    for c in text.chars() {
        len += 1;
        if c == MASK_GLYPH {
            masked += 1;
        }
    }
    // masked / len >= 0.5, in exact integer arithmetic.
    masked * 2 >= len
}

pub fn field_is_masked(field: &FieldText) -> bool {
    match field.as_known() {
        Some(s) => is_masked(s),
        None => true,
    }
}

/// Summary checkpoint: drop before spending a detail fetch.
pub fn summary_is_masked(summary: &ListingSummary) -> bool {
    field_is_masked(&summary.title) || field_is_masked(&summary.company)
}

/// Detail checkpoint: title and company are both re-checked after enrichment.
pub fn detail_is_masked(detail: &ListingDetail) -> bool {
    field_is_masked(&detail.title) || field_is_masked(&detail.company)
}
