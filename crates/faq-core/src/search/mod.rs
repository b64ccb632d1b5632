//! Vector search tiers.
//!
//! - [`category`]: Tier 1, popularity-ordered per-category search with a
//!   single-slot category cache
//! - [`fallback`]: Tier 2, batched scan over every indexed FAQ
//!
//! Both rank candidates with [`rank_candidates`].

pub mod category;
pub mod fallback;

pub use category::{search_categories, CachedCategory, CategoryCacheSlot, CategoryOutcome};
pub use fallback::{search_all, FallbackOutcome};

use std::cmp::Ordering;

use faq_db::{FaqRecord, IndexedFaq};
use serde::Serialize;

use crate::similarity::score_batch;

/// A FAQ with its similarity to the query.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredFaq {
    pub record: FaqRecord,
    pub score: f32,
}

/// The query being searched, vectorized by the active model.
#[derive(Debug, Clone, Copy)]
pub struct QueryVector<'a> {
    pub model_id: &'a str,
    pub vector: &'a [f32],
    pub norm: f32,
}

/// Score candidates and keep the `top_k` best, highest first.
///
/// Entries produced by another vectorizer generation are skipped. Equal
/// scores are ordered by FAQ id.
pub fn rank_candidates(
    query: &QueryVector<'_>,
    candidates: Vec<IndexedFaq>,
    top_k: usize,
) -> Vec<ScoredFaq> {
    let total = candidates.len();
    let current: Vec<IndexedFaq> = candidates
        .into_iter()
        .filter(|c| c.entry.model_id == query.model_id)
        .collect();

    let skipped = total - current.len();
    if skipped > 0 {
        tracing::warn!(
            "Skipped {} vector entries from another vectorizer generation; rebuild the index",
            skipped
        );
    }

    let scores = score_batch(query.vector, query.norm, current.iter().map(|c| &c.entry));
    let mut ranked: Vec<ScoredFaq> = current
        .into_iter()
        .zip(scores)
        .map(|(c, score)| ScoredFaq {
            record: c.record,
            score,
        })
        .collect();

    ranked.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.record.id.cmp(&b.record.id))
    });
    ranked.truncate(top_k);
    ranked
}

/// Best score of a ranked list, 0 when empty.
pub fn top_score(ranked: &[ScoredFaq]) -> f32 {
    ranked.first().map(|s| s.score).unwrap_or(0.0)
}
