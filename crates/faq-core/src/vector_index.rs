//! Precomputed FAQ vectors.
//!
//! Every active FAQ has one [`FaqVectorEntry`] holding its question's TF-IDF
//! vector and norm, tagged with the vectorizer generation that produced it.
//! A full [`FaqVectorIndex::rebuild`] is needed whenever the vectorizer is
//! retrained; single edits can go through [`FaqVectorIndex::upsert_one`].

use chrono::Utc;
use faq_db::{CorpusStore, FaqRecord, FaqVectorEntry, VectorIndexMeta};
use serde::Serialize;

use crate::errors::FaqError;
use crate::vectorizer::VectorizerModel;

/// Summary of a full index rebuild.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RebuildReport {
    pub model_id: String,
    pub dimension: usize,
    /// Entries written.
    pub indexed: usize,
    /// Upsert batches issued.
    pub batches: usize,
    /// Stale entries removed (other generations or inactive FAQs).
    pub pruned: usize,
}

/// Maintains vector entries in a [`CorpusStore`].
#[derive(Debug, Clone, Copy)]
pub struct FaqVectorIndex {
    batch_size: usize,
}

impl FaqVectorIndex {
    pub fn new(batch_size: usize) -> Self {
        Self {
            batch_size: batch_size.max(1),
        }
    }

    /// Vector entry for one FAQ.
    pub fn entry_for(model: &VectorizerModel, faq: &FaqRecord) -> FaqVectorEntry {
        let (vector, norm) = model.vectorize(&faq.question);
        FaqVectorEntry {
            faq_id: faq.id,
            model_id: model.id().to_string(),
            vector,
            norm,
        }
    }

    /// Recompute the entry of every active FAQ with `model`.
    ///
    /// Entries are upserted by FAQ id in batches, so running this twice
    /// yields the same index. Afterwards entries of other generations and of
    /// inactive FAQs are pruned and the index metadata is updated.
    pub fn rebuild(
        &self,
        store: &dyn CorpusStore,
        model: &VectorizerModel,
    ) -> Result<RebuildReport, FaqError> {
        let mut indexed = 0;
        let mut batches = 0;
        let mut offset = 0;

        loop {
            let page = store.active_faqs(offset, self.batch_size)?;
            if page.is_empty() {
                break;
            }
            offset += page.len();

            let entries: Vec<FaqVectorEntry> =
                page.iter().map(|faq| Self::entry_for(model, faq)).collect();
            indexed += entries.len();
            batches += 1;
            store.upsert_vectors(entries)?;
            tracing::debug!("Indexed batch {} ({} FAQs so far)", batches, indexed);
        }

        let pruned = store.prune_vectors(model.id())?;
        if pruned > 0 {
            tracing::debug!("Pruned {} stale vector entries", pruned);
        }

        store.set_index_meta(VectorIndexMeta {
            model_id: model.id().to_string(),
            dimension: model.dimension(),
            entries: indexed,
            built_at: Utc::now(),
        })?;

        tracing::info!(
            "Rebuilt vector index: {} FAQs in {} batches, {} pruned",
            indexed,
            batches,
            pruned
        );

        Ok(RebuildReport {
            model_id: model.id().to_string(),
            dimension: model.dimension(),
            indexed,
            batches,
            pruned,
        })
    }

    /// Write the entry of a single FAQ.
    ///
    /// # Errors
    ///
    /// Returns [`FaqError::IndexIncompatible`] when the stored index was not
    /// built by `model`. Mixing generations would make scores meaningless, so
    /// the caller must run a full rebuild instead.
    pub fn upsert_one(
        &self,
        store: &dyn CorpusStore,
        model: &VectorizerModel,
        faq: &FaqRecord,
    ) -> Result<FaqVectorEntry, FaqError> {
        let index_model = store.index_meta()?.map(|meta| meta.model_id);
        if index_model.as_deref() != Some(model.id()) {
            return Err(FaqError::IndexIncompatible {
                index_model: index_model.unwrap_or_else(|| "none".to_string()),
                active_model: model.id().to_string(),
            });
        }

        let entry = Self::entry_for(model, faq);
        store.upsert_vectors(vec![entry.clone()])?;
        Ok(entry)
    }

    /// Whether the stored index was built by `model`.
    pub fn is_current(store: &dyn CorpusStore, model: &VectorizerModel) -> Result<bool, FaqError> {
        Ok(store
            .index_meta()?
            .is_some_and(|meta| meta.model_id == model.id()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::VectorizerConfig;
    use crate::vectorizer::l2_norm;
    use faq_db::{Category, FaqId, InMemoryCorpus};

    fn corpus(n: u64) -> InMemoryCorpus {
        let corpus = InMemoryCorpus::new();
        corpus.add_category(Category::new(1, "Compte")).unwrap();
        for i in 1..=n {
            corpus
                .add_faq(FaqRecord::new(
                    i,
                    1,
                    format!("question numéro {} sur le compte", i),
                    "réponse",
                ))
                .unwrap();
        }
        corpus
    }

    fn fresh_model() -> VectorizerModel {
        VectorizerModel::train(["question compte", "numéro"], &VectorizerConfig::default())
            .unwrap()
    }

    #[test]
    fn test_rebuild_batches_and_meta() {
        let store = corpus(5);
        let model = fresh_model();
        let report = FaqVectorIndex::new(2).rebuild(&store, &model).unwrap();

        assert_eq!(report.indexed, 5);
        assert_eq!(report.batches, 3);
        assert_eq!(store.vector_count().unwrap(), 5);

        let meta = store.index_meta().unwrap().unwrap();
        assert_eq!(meta.model_id, model.id());
        assert_eq!(meta.entries, 5);
        assert!(FaqVectorIndex::is_current(&store, &model).unwrap());
    }

    #[test]
    fn test_rebuild_is_idempotent() {
        let store = corpus(4);
        let model = fresh_model();
        let index = FaqVectorIndex::new(3);

        index.rebuild(&store, &model).unwrap();
        let first = store.vector(FaqId(2)).unwrap().unwrap();
        let report = index.rebuild(&store, &model).unwrap();
        let second = store.vector(FaqId(2)).unwrap().unwrap();

        assert_eq!(first, second);
        assert_eq!(report.pruned, 0);
        assert_eq!(store.vector_count().unwrap(), 4);
    }

    #[test]
    fn test_entries_carry_norm_and_generation() {
        let store = corpus(1);
        let model = fresh_model();
        FaqVectorIndex::new(10).rebuild(&store, &model).unwrap();

        let entry = store.vector(FaqId(1)).unwrap().unwrap();
        assert_eq!(entry.model_id, model.id());
        assert_eq!(entry.dimension(), model.dimension());
        assert!((entry.norm - l2_norm(&entry.vector)).abs() < 1e-6);
    }

    #[test]
    fn test_rebuild_with_new_model_prunes_old_generation() {
        let store = corpus(3);
        let index = FaqVectorIndex::new(10);
        index.rebuild(&store, &fresh_model()).unwrap();

        store
            .add_faq(FaqRecord::new(9, 1, "question inactive", "r").with_active(false))
            .unwrap();
        let newer = fresh_model();
        let report = index.rebuild(&store, &newer).unwrap();

        assert_eq!(report.indexed, 3);
        assert_eq!(store.vector_count().unwrap(), 3);
        assert_eq!(store.vector(FaqId(1)).unwrap().unwrap().model_id, newer.id());
    }

    #[test]
    fn test_upsert_one_requires_matching_generation() {
        let store = corpus(2);
        let index = FaqVectorIndex::new(10);
        let faq = FaqRecord::new(3, 1, "nouvelle question compte", "r");

        let model = fresh_model();
        let err = index.upsert_one(&store, &model, &faq).unwrap_err();
        assert!(matches!(err, FaqError::IndexIncompatible { .. }));

        index.rebuild(&store, &model).unwrap();
        store.add_faq(faq.clone()).unwrap();
        let entry = index.upsert_one(&store, &model, &faq).unwrap();
        assert_eq!(entry.faq_id, FaqId(3));

        let other = fresh_model();
        assert!(matches!(
            index.upsert_one(&store, &other, &faq),
            Err(FaqError::IndexIncompatible { .. })
        ));
    }
}
