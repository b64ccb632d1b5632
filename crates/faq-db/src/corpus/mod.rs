//! Corpus storage for faqbot.
//!
//! This module defines the [`CorpusStore`] trait the retrieval core queries,
//! plus two implementations:
//!
//! - [`InMemoryCorpus`]: process-local store, used by tests and embedders
//! - [`FileCorpusStore`]: JSON corpus + bincode vectors on disk
//!
//! ## Activity rules
//!
//! A FAQ is *active* when its own flag is set **and** its category exists and
//! is active. Every listing below returns active FAQs only.
//!
//! ## Usage
//!
//! ```ignore
//! use faq_db::corpus::{CorpusStore, FileCorpusStore};
//!
//! let store = FileCorpusStore::open("/path/to/data")?;
//! for summary in store.active_categories()? {
//!     println!("{} ({} faqs, popularity {})", summary.name, summary.faq_count, summary.popularity);
//! }
//! ```

mod file;
mod memory;
mod types;

use std::collections::{BTreeMap, HashMap};

pub use file::{FileCorpusStore, CORPUS_FILENAME, FEEDBACK_FILENAME, INDEX_META_FILENAME, VECTORS_FILENAME};
pub use memory::InMemoryCorpus;
pub use types::{
    Category, CategoryId, CategorySummary, FaqId, FaqRecord, FaqVectorEntry, Feedback,
    FeedbackKind, IndexedFaq, NewFeedback, VectorIndexMeta,
};

use serde::{Deserialize, Serialize};

use crate::error::{DbError, DbResult};

// ============================================================================
// CorpusStore trait
// ============================================================================

/// Query interface over the FAQ corpus and its vector entries.
///
/// Implementations must be safe to share between request workers. Listings
/// are ordered by id so that paging is stable between calls.
pub trait CorpusStore: Send + Sync {
    /// Active categories with their aggregate popularity and FAQ count.
    fn active_categories(&self) -> DbResult<Vec<CategorySummary>>;

    /// Look up a category by id, active or not.
    fn category(&self, id: CategoryId) -> DbResult<Option<Category>>;

    /// Look up a FAQ by id, active or not.
    fn faq(&self, id: FaqId) -> DbResult<Option<FaqRecord>>;

    /// Number of active FAQs.
    fn active_faq_count(&self) -> DbResult<usize>;

    /// A page of active FAQs ordered by id.
    fn active_faqs(&self, offset: usize, limit: usize) -> DbResult<Vec<FaqRecord>>;

    /// Active FAQs of one category that have a vector entry.
    fn indexed_faqs_in_category(&self, category: CategoryId) -> DbResult<Vec<IndexedFaq>>;

    /// A page of active FAQs that have a vector entry, ordered by id.
    fn indexed_faqs(&self, offset: usize, limit: usize) -> DbResult<Vec<IndexedFaq>>;

    /// Insert or replace vector entries, keyed by FAQ id.
    fn upsert_vectors(&self, entries: Vec<FaqVectorEntry>) -> DbResult<()>;

    /// Drop entries not produced by `model_id` or whose FAQ is no longer active.
    ///
    /// Returns the number of removed entries.
    fn prune_vectors(&self, model_id: &str) -> DbResult<usize>;

    /// Metadata of the last completed index build.
    fn index_meta(&self) -> DbResult<Option<VectorIndexMeta>>;

    /// Replace the index metadata.
    fn set_index_meta(&self, meta: VectorIndexMeta) -> DbResult<()>;

    /// Store a feedback entry. Positive feedback increments the FAQ's popularity.
    fn record_feedback(&self, feedback: NewFeedback) -> DbResult<Feedback>;
}

// ============================================================================
// Shared state
// ============================================================================

/// Serialized form of the corpus (categories + FAQs).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CorpusDocument {
    #[serde(default)]
    pub categories: Vec<Category>,
    #[serde(default)]
    pub faqs: Vec<FaqRecord>,
}

/// In-memory corpus state shared by the store implementations.
#[derive(Debug, Default)]
pub(crate) struct CorpusState {
    pub(crate) categories: BTreeMap<CategoryId, Category>,
    pub(crate) faqs: BTreeMap<FaqId, FaqRecord>,
    pub(crate) vectors: HashMap<FaqId, FaqVectorEntry>,
    pub(crate) meta: Option<VectorIndexMeta>,
    pub(crate) feedback: Vec<Feedback>,
}

impl CorpusState {
    /// Build state from a corpus document, rejecting FAQs with unknown categories.
    pub(crate) fn from_document(doc: CorpusDocument) -> DbResult<Self> {
        let mut state = Self::default();
        for category in doc.categories {
            state.categories.insert(category.id, category);
        }
        for faq in doc.faqs {
            if !state.categories.contains_key(&faq.category_id) {
                return Err(DbError::DanglingCategory {
                    faq_id: faq.id.value(),
                    category_id: faq.category_id.value(),
                });
            }
            state.faqs.insert(faq.id, faq);
        }
        Ok(state)
    }

    pub(crate) fn to_document(&self) -> CorpusDocument {
        CorpusDocument {
            categories: self.categories.values().cloned().collect(),
            faqs: self.faqs.values().cloned().collect(),
        }
    }

    pub(crate) fn is_active(&self, faq: &FaqRecord) -> bool {
        faq.active
            && self
                .categories
                .get(&faq.category_id)
                .map(|c| c.active)
                .unwrap_or(false)
    }

    fn active_iter(&self) -> impl Iterator<Item = &FaqRecord> {
        self.faqs.values().filter(|f| self.is_active(f))
    }

    fn indexed(&self, faq: &FaqRecord) -> Option<IndexedFaq> {
        self.vectors.get(&faq.id).map(|entry| IndexedFaq {
            record: faq.clone(),
            entry: entry.clone(),
        })
    }

    pub(crate) fn active_categories(&self) -> Vec<CategorySummary> {
        let mut totals: HashMap<CategoryId, (u64, usize)> = HashMap::new();
        for faq in self.active_iter() {
            let slot = totals.entry(faq.category_id).or_insert((0, 0));
            slot.0 = slot.0.saturating_add(faq.popularity);
            slot.1 += 1;
        }

        self.categories
            .values()
            .filter(|c| c.active)
            .map(|c| {
                let (popularity, faq_count) = totals.get(&c.id).copied().unwrap_or((0, 0));
                CategorySummary {
                    id: c.id,
                    name: c.name.clone(),
                    popularity,
                    faq_count,
                }
            })
            .collect()
    }

    pub(crate) fn active_faq_count(&self) -> usize {
        self.active_iter().count()
    }

    pub(crate) fn active_faqs(&self, offset: usize, limit: usize) -> Vec<FaqRecord> {
        self.active_iter().skip(offset).take(limit).cloned().collect()
    }

    pub(crate) fn indexed_faqs_in_category(&self, category: CategoryId) -> Vec<IndexedFaq> {
        self.active_iter()
            .filter(|f| f.category_id == category)
            .filter_map(|f| self.indexed(f))
            .collect()
    }

    pub(crate) fn indexed_faqs(&self, offset: usize, limit: usize) -> Vec<IndexedFaq> {
        self.active_iter()
            .filter_map(|f| self.indexed(f))
            .skip(offset)
            .take(limit)
            .collect()
    }

    pub(crate) fn upsert_vectors(&mut self, entries: Vec<FaqVectorEntry>) {
        for entry in entries {
            self.vectors.insert(entry.faq_id, entry);
        }
    }

    pub(crate) fn prune_vectors(&mut self, model_id: &str) -> usize {
        let before = self.vectors.len();
        let active: std::collections::HashSet<FaqId> =
            self.active_iter().map(|f| f.id).collect();
        self.vectors
            .retain(|id, entry| entry.model_id == model_id && active.contains(id));
        before - self.vectors.len()
    }

    pub(crate) fn record_feedback(&mut self, feedback: NewFeedback) -> DbResult<Feedback> {
        let faq = self
            .faqs
            .get_mut(&feedback.faq_id)
            .ok_or(DbError::FaqNotFound {
                id: feedback.faq_id.value(),
            })?;

        if feedback.kind == FeedbackKind::Positive {
            faq.popularity = faq.popularity.saturating_add(1);
        }

        let stored = Feedback::from_new(feedback);
        self.feedback.push(stored.clone());
        Ok(stored)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_state() -> CorpusState {
        CorpusState::from_document(CorpusDocument {
            categories: vec![
                Category::new(1, "Compte"),
                Category::new(2, "Archives").with_active(false),
            ],
            faqs: vec![
                FaqRecord::new(1, 1, "q1", "a1").with_popularity(4),
                FaqRecord::new(2, 1, "q2", "a2").with_popularity(3),
                FaqRecord::new(3, 1, "q3", "a3").with_popularity(100).with_active(false),
                FaqRecord::new(4, 2, "q4", "a4").with_popularity(50),
            ],
        })
        .unwrap()
    }

    fn entry(id: u64, model: &str) -> FaqVectorEntry {
        FaqVectorEntry {
            faq_id: FaqId(id),
            model_id: model.to_string(),
            vector: vec![1.0, 0.0],
            norm: 1.0,
        }
    }

    #[test]
    fn test_dangling_category_rejected() {
        let result = CorpusState::from_document(CorpusDocument {
            categories: vec![],
            faqs: vec![FaqRecord::new(1, 9, "q", "a")],
        });
        assert!(matches!(result, Err(DbError::DanglingCategory { .. })));
    }

    #[test]
    fn test_category_popularity_counts_active_faqs_only() {
        let state = sample_state();
        let categories = state.active_categories();

        assert_eq!(categories.len(), 1);
        assert_eq!(categories[0].name, "Compte");
        assert_eq!(categories[0].popularity, 7);
        assert_eq!(categories[0].faq_count, 2);
    }

    #[test]
    fn test_faq_in_inactive_category_is_inactive() {
        let state = sample_state();
        assert_eq!(state.active_faq_count(), 2);
        let ids: Vec<_> = state.active_faqs(0, 10).iter().map(|f| f.id.value()).collect();
        assert_eq!(ids, vec![1, 2]);
    }

    #[test]
    fn test_paging_is_ordered_by_id() {
        let mut state = sample_state();
        state.upsert_vectors(vec![entry(2, "m"), entry(1, "m")]);

        let first = state.indexed_faqs(0, 1);
        let second = state.indexed_faqs(1, 1);
        assert_eq!(first[0].record.id, FaqId(1));
        assert_eq!(second[0].record.id, FaqId(2));
        assert!(state.indexed_faqs(2, 1).is_empty());
    }

    #[test]
    fn test_prune_drops_other_generations_and_inactive() {
        let mut state = sample_state();
        state.upsert_vectors(vec![entry(1, "new"), entry(2, "old"), entry(3, "new")]);

        let removed = state.prune_vectors("new");
        assert_eq!(removed, 2);
        assert!(state.vectors.contains_key(&FaqId(1)));
    }

    #[test]
    fn test_positive_feedback_increments_popularity() {
        let mut state = sample_state();
        state
            .record_feedback(NewFeedback::new(1, FeedbackKind::Positive))
            .unwrap();
        state
            .record_feedback(NewFeedback::new(1, FeedbackKind::Negative))
            .unwrap();

        assert_eq!(state.faqs[&FaqId(1)].popularity, 5);
        assert_eq!(state.feedback.len(), 2);
    }

    #[test]
    fn test_feedback_unknown_faq() {
        let mut state = sample_state();
        let result = state.record_feedback(NewFeedback::new(42, FeedbackKind::Positive));
        assert!(matches!(result, Err(DbError::FaqNotFound { id: 42 })));
    }
}
