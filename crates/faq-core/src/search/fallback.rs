//! Tier 2: global fallback over every indexed FAQ.
//!
//! Runs only after a Tier-1 miss. Entries are scanned in fixed-size pages to
//! bound peak memory. Each page is ranked on its own; a page's top-k
//! replaces the running result only when its best score beats the current
//! best. Results from different pages are never merged.

use faq_db::CorpusStore;

use super::{rank_candidates, top_score, QueryVector, ScoredFaq};
use crate::errors::FaqError;

/// Result of a Tier-2 scan.
#[derive(Debug, Clone, Default)]
pub struct FallbackOutcome {
    /// Top-k of the best page; empty when nothing scored above 0.
    pub hits: Vec<ScoredFaq>,
    /// Pages read from the store.
    pub pages: usize,
}

/// Scan all indexed FAQs in pages of `batch_size`.
pub fn search_all(
    store: &dyn CorpusStore,
    query: &QueryVector<'_>,
    top_k: usize,
    batch_size: usize,
) -> Result<FallbackOutcome, FaqError> {
    let batch_size = batch_size.max(1);
    let mut outcome = FallbackOutcome::default();
    let mut best_score = 0.0f32;
    let mut offset = 0;

    loop {
        let page = store.indexed_faqs(offset, batch_size)?;
        if page.is_empty() {
            break;
        }
        offset += page.len();
        outcome.pages += 1;

        let ranked = rank_candidates(query, page, top_k);
        let score = top_score(&ranked);
        if score > best_score {
            tracing::debug!("Page {} improves best score to {:.3}", outcome.pages, score);
            best_score = score;
            outcome.hits = ranked;
        }
    }

    Ok(outcome)
}
