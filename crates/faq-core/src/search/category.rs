//! Tier 1: popularity-ordered category search.
//!
//! Categories are probed from most to least popular; each probe ranks that
//! category's FAQs. The last winning category is remembered in a
//! [`CategoryCacheSlot`] and probed first on the next call.
//!
//! Iteration stops when a category reaches the good-score threshold, or as
//! soon as a category's best score is exactly 0. The second rule assumes
//! less popular categories will not do better; it can miss a match.

use std::sync::Mutex;

use faq_db::{CategoryId, CategorySummary, CorpusStore};
use serde::Serialize;

use super::{rank_candidates, top_score, QueryVector, ScoredFaq};
use crate::errors::FaqError;

/// The category that answered the last successful Tier-1 search.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CachedCategory {
    pub id: CategoryId,
    pub name: String,
    pub score: f32,
}

/// Single-slot, process-local category cache.
///
/// Reads and writes are independent short critical sections; concurrent
/// searches may overwrite each other's entry. Every read is re-validated by
/// a live probe, so a stale entry only costs one extra probe.
#[derive(Debug, Default)]
pub struct CategoryCacheSlot {
    inner: Mutex<Option<CachedCategory>>,
}

impl CategoryCacheSlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> Option<CachedCategory> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn set(&self, category: CachedCategory) {
        *self.inner.lock().unwrap_or_else(|e| e.into_inner()) = Some(category);
    }

    pub fn reset(&self) {
        *self.inner.lock().unwrap_or_else(|e| e.into_inner()) = None;
    }
}

/// Result of a Tier-1 search.
#[derive(Debug, Clone, Default)]
pub struct CategoryOutcome {
    /// Ranked hits of the winning category; empty on a miss.
    pub hits: Vec<ScoredFaq>,
    /// The winning category.
    pub category: Option<CategorySummary>,
    /// Number of categories whose FAQs were scored.
    pub categories_probed: usize,
    /// Whether the winner was the cached category.
    pub from_cache: bool,
}

impl CategoryOutcome {
    pub fn is_hit(&self) -> bool {
        !self.hits.is_empty()
    }
}

fn probe(
    store: &dyn CorpusStore,
    query: &QueryVector<'_>,
    category: &CategorySummary,
    top_k: usize,
) -> Result<Vec<ScoredFaq>, FaqError> {
    let candidates = store.indexed_faqs_in_category(category.id)?;
    Ok(rank_candidates(query, candidates, top_k))
}

/// Run the Tier-1 search.
///
/// Active categories are ordered by aggregate popularity (descending, ties
/// by id) on every call. A cached category that is no longer active resets
/// the slot and the search continues uncached. On a hit the slot is
/// overwritten with the winner, even when it scores below the previous
/// cached score.
pub fn search_categories(
    store: &dyn CorpusStore,
    cache: &CategoryCacheSlot,
    query: &QueryVector<'_>,
    top_k: usize,
    good_score: f32,
) -> Result<CategoryOutcome, FaqError> {
    let mut categories = store.active_categories()?;
    categories.sort_by(|a, b| b.popularity.cmp(&a.popularity).then(a.id.cmp(&b.id)));

    let mut probed = 0;
    let mut best: Option<(CategorySummary, Vec<ScoredFaq>, bool)> = None;
    let mut cached_id = None;

    if let Some(cached) = cache.get() {
        match categories.iter().find(|c| c.id == cached.id) {
            None => {
                let err = FaqError::CategoryLookupFailure {
                    category_id: cached.id.value(),
                    name: cached.name,
                };
                tracing::warn!("{}; searching uncached", err);
                cache.reset();
            }
            Some(category) => {
                cached_id = Some(category.id);
                let hits = probe(store, query, category, top_k)?;
                probed += 1;
                let score = top_score(&hits);
                tracing::debug!("Cached category `{}` scored {:.3}", category.name, score);
                best = Some((category.clone(), hits, true));
            }
        }
    }

    let cached_good = best
        .as_ref()
        .is_some_and(|(_, hits, _)| top_score(hits) >= good_score);

    if !cached_good {
        for category in categories.iter().filter(|c| Some(c.id) != cached_id) {
            let hits = probe(store, query, category, top_k)?;
            probed += 1;
            let score = top_score(&hits);
            tracing::debug!("Category `{}` scored {:.3}", category.name, score);

            if score == 0.0 {
                tracing::debug!("Early stop at category `{}`", category.name);
                break;
            }

            let best_score = best.as_ref().map(|(_, h, _)| top_score(h)).unwrap_or(0.0);
            if score > best_score {
                best = Some((category.clone(), hits, false));
            }
            if score.max(best_score) >= good_score {
                break;
            }
        }
    }

    match best {
        Some((category, hits, from_cache)) if top_score(&hits) > 0.0 => {
            cache.set(CachedCategory {
                id: category.id,
                name: category.name.clone(),
                score: top_score(&hits),
            });
            Ok(CategoryOutcome {
                hits,
                category: Some(category),
                categories_probed: probed,
                from_cache,
            })
        }
        _ => Ok(CategoryOutcome {
            categories_probed: probed,
            ..Default::default()
        }),
    }
}
