//! Process-local corpus store.

use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use super::types::{
    Category, CategoryId, CategorySummary, FaqId, FaqRecord, FaqVectorEntry, Feedback,
    IndexedFaq, NewFeedback, VectorIndexMeta,
};
use super::{CorpusDocument, CorpusState, CorpusStore};
use crate::error::{DbError, DbResult};

/// Corpus held entirely in memory.
///
/// Nothing is persisted. Useful for tests and for embedding the engine
/// behind a storage layer that loads records itself.
#[derive(Debug, Default)]
pub struct InMemoryCorpus {
    state: RwLock<CorpusState>,
}

impl InMemoryCorpus {
    /// Create an empty corpus.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a corpus from a document.
    pub fn from_document(doc: CorpusDocument) -> DbResult<Self> {
        Ok(Self {
            state: RwLock::new(CorpusState::from_document(doc)?),
        })
    }

    /// Insert or replace a category.
    pub fn add_category(&self, category: Category) -> DbResult<()> {
        self.write()?.categories.insert(category.id, category);
        Ok(())
    }

    /// Insert or replace a FAQ. Its category must already exist.
    pub fn add_faq(&self, faq: FaqRecord) -> DbResult<()> {
        let mut state = self.write()?;
        if !state.categories.contains_key(&faq.category_id) {
            return Err(DbError::DanglingCategory {
                faq_id: faq.id.value(),
                category_id: faq.category_id.value(),
            });
        }
        state.faqs.insert(faq.id, faq);
        Ok(())
    }

    /// Remove a category and every FAQ in it.
    pub fn remove_category(&self, id: CategoryId) -> DbResult<()> {
        let mut state = self.write()?;
        state.categories.remove(&id);
        state.faqs.retain(|_, faq| faq.category_id != id);
        Ok(())
    }

    /// Overwrite a FAQ's popularity counter.
    pub fn set_popularity(&self, id: FaqId, popularity: u64) -> DbResult<()> {
        let mut state = self.write()?;
        let faq = state
            .faqs
            .get_mut(&id)
            .ok_or(DbError::FaqNotFound { id: id.value() })?;
        faq.popularity = popularity;
        Ok(())
    }

    /// Number of stored vector entries, including stale ones.
    pub fn vector_count(&self) -> DbResult<usize> {
        Ok(self.read()?.vectors.len())
    }

    /// Stored vector entry for a FAQ, if any.
    pub fn vector(&self, id: FaqId) -> DbResult<Option<FaqVectorEntry>> {
        Ok(self.read()?.vectors.get(&id).cloned())
    }

    /// All feedback recorded so far.
    pub fn feedback(&self) -> DbResult<Vec<Feedback>> {
        Ok(self.read()?.feedback.clone())
    }

    /// Snapshot of categories and FAQs.
    pub fn to_document(&self) -> DbResult<CorpusDocument> {
        Ok(self.read()?.to_document())
    }

    pub(crate) fn read(&self) -> DbResult<RwLockReadGuard<'_, CorpusState>> {
        self.state
            .read()
            .map_err(|e| DbError::internal(format!("Failed to acquire read lock: {}", e)))
    }

    pub(crate) fn write(&self) -> DbResult<RwLockWriteGuard<'_, CorpusState>> {
        self.state
            .write()
            .map_err(|e| DbError::internal(format!("Failed to acquire write lock: {}", e)))
    }
}

impl CorpusStore for InMemoryCorpus {
    fn active_categories(&self) -> DbResult<Vec<CategorySummary>> {
        Ok(self.read()?.active_categories())
    }

    fn category(&self, id: CategoryId) -> DbResult<Option<Category>> {
        Ok(self.read()?.categories.get(&id).cloned())
    }

    fn faq(&self, id: FaqId) -> DbResult<Option<FaqRecord>> {
        Ok(self.read()?.faqs.get(&id).cloned())
    }

    fn active_faq_count(&self) -> DbResult<usize> {
        Ok(self.read()?.active_faq_count())
    }

    fn active_faqs(&self, offset: usize, limit: usize) -> DbResult<Vec<FaqRecord>> {
        Ok(self.read()?.active_faqs(offset, limit))
    }

    fn indexed_faqs_in_category(&self, category: CategoryId) -> DbResult<Vec<IndexedFaq>> {
        Ok(self.read()?.indexed_faqs_in_category(category))
    }

    fn indexed_faqs(&self, offset: usize, limit: usize) -> DbResult<Vec<IndexedFaq>> {
        Ok(self.read()?.indexed_faqs(offset, limit))
    }

    fn upsert_vectors(&self, entries: Vec<FaqVectorEntry>) -> DbResult<()> {
        self.write()?.upsert_vectors(entries);
        Ok(())
    }

    fn prune_vectors(&self, model_id: &str) -> DbResult<usize> {
        Ok(self.write()?.prune_vectors(model_id))
    }

    fn index_meta(&self) -> DbResult<Option<VectorIndexMeta>> {
        Ok(self.read()?.meta.clone())
    }

    fn set_index_meta(&self, meta: VectorIndexMeta) -> DbResult<()> {
        self.write()?.meta = Some(meta);
        Ok(())
    }

    fn record_feedback(&self, feedback: NewFeedback) -> DbResult<Feedback> {
        self.write()?.record_feedback(feedback)
    }
}
