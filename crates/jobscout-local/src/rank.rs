//! Embedding-based relevance ranking.
//!
//! Query and listings share one embedding space; relevance is cosine
//! similarity, rounded for display stability, ordered by a stable descending
//! sort so equal scores keep their accumulation order.

use jobscout_core::{EmbeddingBackend, Error, ListingDetail, RankedListing, Result};

/// Scores are rounded to this many decimal places.
pub const SCORE_DECIMALS: u32 = 6;

/// Cosine similarity, defined as 0.0 when either norm is zero.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    let mut dot = 0.0f64;
    for i in 0..a.len().min(b.len()) {
        dot += f64::from(a[i]) * f64::from(b[i]);
    }
    let norm_a: f64 = a.iter().map(|&x| f64::from(x) * f64::from(x)).sum::<f64>().sqrt();
    let norm_b: f64 = b.iter().map(|&x| f64::from(x) * f64::from(x)).sum::<f64>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

fn round_score(score: f64) -> f64 {
    let factor = 10f64.powi(SCORE_DECIMALS as i32);
    (score * factor).round() / factor
}

/// Text embedded for one listing: title plus description.
///
/// An unknown title contributes an empty string; the `"N/A"` placeholder must
/// not leak into the embedded corpus.
fn listing_text(listing: &ListingDetail) -> String {
    format!(
        "{} {}",
        listing.title.as_known().unwrap_or(""),
        listing.description
    )
}

/// Rank `listings` against `query`, stable-sorted descending by score.
///
/// One batched embed call covers the query and every listing text. A failing
/// or short-counting backend aborts the call; ranking without embeddings is
/// meaningless, so this is the one pipeline stage allowed to error.
pub async fn rank(
    backend: &dyn EmbeddingBackend,
    query: &str,
    listings: Vec<ListingDetail>,
) -> Result<Vec<RankedListing>> {
    if listings.is_empty() {
        return Ok(Vec::new());
    }

    let mut texts = Vec::with_capacity(listings.len() + 1);
    texts.push(query.to_string());
    texts.extend(listings.iter().map(listing_text));

    let vectors = backend.embed(&texts).await?;
    if vectors.len() != texts.len() {
        return Err(Error::EmbeddingUnavailable(format!(
            "expected {} vectors, got {}",
            texts.len(),
            vectors.len()
        )));
    }

    let query_vec = &vectors[0];
    let mut out: Vec<RankedListing> = listings
        .into_iter()
        .zip(vectors[1..].iter())
        .map(|(listing, v)| RankedListing {
            score: round_score(cosine_similarity(query_vec, v)),
            listing,
        })
        .collect();

    // Stable sort: equal scores retain accumulation order.
    out.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    Ok(out)
}
