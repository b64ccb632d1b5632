//! faqbot engine: the facade used by the CLI and by embedding services.
//!
//! The [`FaqEngine`] wires configuration, the corpus store, the init
//! coordinator and the [`Retriever`] together, and adds the maintenance
//! operations around retrieval (training, reindexing, feedback, stats).

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use faq_db::{
    CategorySummary, CorpusStore, Feedback, FileCorpusStore, InitCoordinator,
    LockFileCoordinator, NewFeedback, VectorIndexMeta,
};
use serde::Serialize;

use crate::config::FaqConfig;
use crate::errors::FaqError;
use crate::retrieval::{RetrievalResponse, Retriever};
use crate::rules::{ConversationalRule, RuleMatcher};
use crate::vector_index::{FaqVectorIndex, RebuildReport};
use crate::vectorizer::{load_vectorizer_meta, ModelSlot, VectorizerMeta};

// ============================================================================
// Reports
// ============================================================================

/// Result of [`FaqEngine::train`].
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrainReport {
    pub model_id: String,
    pub dimension: usize,
    pub documents: usize,
    pub index: RebuildReport,
}

/// Snapshot returned by [`FaqEngine::stats`].
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineStats {
    pub data_dir: PathBuf,
    pub active_faqs: usize,
    /// Active categories, most popular first.
    pub categories: Vec<CategorySummary>,
    /// Persisted vectorizer, if any.
    pub model: Option<VectorizerMeta>,
    /// Last completed index build, if any.
    pub index: Option<VectorIndexMeta>,
    pub rules: usize,
}

// ============================================================================
// FaqEngine
// ============================================================================

/// The main entry point for faqbot operations.
///
/// # Example
///
/// ```ignore
/// use faq_core::{FaqConfig, FaqEngine};
///
/// let engine = FaqEngine::from_config(FaqConfig::load_default()?)?;
/// let response = engine.ask("Comment réinitialiser mon mot de passe ?", None, None)?;
/// println!("{}", response.reply);
/// ```
pub struct FaqEngine {
    config: FaqConfig,
    store: Arc<dyn CorpusStore>,
    retriever: Retriever,
    index: FaqVectorIndex,
}

impl FaqEngine {
    // -------------------------------------------------------------------------
    // Construction
    // -------------------------------------------------------------------------

    /// Open the file-backed store under the configured data directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the corpus cannot
    /// be opened.
    pub fn from_config(config: FaqConfig) -> anyhow::Result<Self> {
        let data_dir = config.resolved_data_dir();
        let store = FileCorpusStore::open(&data_dir)
            .with_context(|| format!("Failed to open corpus at {}", data_dir.display()))?;
        let coordinator = LockFileCoordinator::new(&data_dir)
            .with_poll_interval(config.init.poll_interval());

        Ok(Self::new(config, Arc::new(store), Arc::new(coordinator))?)
    }

    /// Build an engine over any store and coordinator.
    ///
    /// # Errors
    ///
    /// Returns [`FaqError::InvalidConfiguration`] if the configuration fails
    /// validation.
    pub fn new(
        config: FaqConfig,
        store: Arc<dyn CorpusStore>,
        coordinator: Arc<dyn InitCoordinator>,
    ) -> Result<Self, FaqError> {
        for warning in config.validate()? {
            tracing::warn!("Config warning: {}", warning);
        }

        let rules = Self::load_rules(&config);
        let slot = ModelSlot::new(
            config.vectorizer_dir(),
            config.vectorizer.clone(),
            coordinator,
            config.init.wait_timeout(),
        );
        let retriever = Retriever::new(store.clone(), Arc::new(slot), rules, &config);
        let index = FaqVectorIndex::new(config.index.rebuild_batch_size);

        Ok(Self {
            config,
            store,
            retriever,
            index,
        })
    }

    fn load_rules(config: &FaqConfig) -> RuleMatcher {
        let path = config.rules_path();
        if config.rules.path.is_none() && !path.exists() {
            tracing::debug!("No rules file at {}, Tier 0 disabled", path.display());
            return RuleMatcher::default();
        }
        RuleMatcher::load_or_empty(&path)
    }

    pub fn config(&self) -> &FaqConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn CorpusStore> {
        &self.store
    }

    pub fn retriever(&self) -> &Retriever {
        &self.retriever
    }

    // -------------------------------------------------------------------------
    // Retrieval
    // -------------------------------------------------------------------------

    /// Answer a question, falling back to the configured `top_k`/`min_score`.
    pub fn ask(
        &self,
        question: &str,
        top_k: Option<usize>,
        min_score: Option<f32>,
    ) -> Result<RetrievalResponse, FaqError> {
        self.retriever.find_best(
            question,
            top_k.unwrap_or(self.config.retrieval.top_k),
            min_score.unwrap_or(self.config.retrieval.min_score),
        )
    }

    // -------------------------------------------------------------------------
    // Maintenance
    // -------------------------------------------------------------------------

    /// Fit a new vectorizer on the current corpus, persist it and rebuild the index.
    ///
    /// The category cache is cleared since scores from the previous model are
    /// no longer comparable.
    pub fn train(&self) -> Result<TrainReport, FaqError> {
        let model = self
            .retriever
            .model_slot()
            .retrain(self.store.as_ref())?;
        let index = self.index.rebuild(self.store.as_ref(), &model)?;
        self.retriever.cache().reset();
        self.retriever.mark_index_verified();

        Ok(TrainReport {
            model_id: model.id().to_string(),
            dimension: model.dimension(),
            documents: model.num_documents(),
            index,
        })
    }

    /// Rebuild the vector index with the active vectorizer (loading or
    /// training it first if needed).
    pub fn reindex(&self) -> Result<RebuildReport, FaqError> {
        let model = self
            .retriever
            .model_slot()
            .get_or_init(self.store.as_ref())?;
        let report = self.index.rebuild(self.store.as_ref(), &model)?;
        self.retriever.mark_index_verified();
        Ok(report)
    }

    /// Record user feedback on an answer.
    ///
    /// Positive feedback raises the FAQ's popularity, which moves its category
    /// up the Tier-1 order on the next query.
    pub fn feedback(&self, feedback: NewFeedback) -> Result<Feedback, FaqError> {
        let stored = self.store.record_feedback(feedback)?;
        tracing::debug!("Recorded {} feedback for FAQ {}", stored.kind, stored.faq_id);
        Ok(stored)
    }

    /// Active categories with popularity and FAQ count, most popular first.
    pub fn category_stats(&self) -> Result<Vec<CategorySummary>, FaqError> {
        let mut categories = self.store.active_categories()?;
        categories.sort_by(|a, b| b.popularity.cmp(&a.popularity).then(a.id.cmp(&b.id)));
        Ok(categories)
    }

    /// Corpus, model and index overview.
    pub fn stats(&self) -> Result<EngineStats, FaqError> {
        let model = match load_vectorizer_meta(self.retriever.model_slot().dir()) {
            Ok(meta) => meta,
            Err(e) => {
                tracing::warn!("Could not read vectorizer metadata: {}", e);
                None
            }
        };

        Ok(EngineStats {
            data_dir: self.config.resolved_data_dir(),
            active_faqs: self.store.active_faq_count()?,
            categories: self.category_stats()?,
            model,
            index: self.store.index_meta()?,
            rules: self.retriever.rules().len(),
        })
    }

    /// Loaded conversational rules, in match order.
    pub fn rules(&self) -> &[ConversationalRule] {
        self.retriever.rules().rules()
    }
}
