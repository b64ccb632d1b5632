//! Retrieval pipeline.
//!
//! [`Retriever::find_best`] answers a free-text question by walking the
//! tiers in order, stopping at the first terminal state:
//!
//! ```text
//! TryRules ──hit──▶ rule response (score 1.0)
//!    │
//! Vectorize ──zero vector──▶ "not understood"
//!    │
//! Tier 1 (categories by popularity) ──hit──▶ category hits
//!    │
//! Tier 2 (batched global scan) ──▶ global hits, or no match
//! ```
//!
//! Only model or corpus unavailability is an error. Every "nothing
//! matched" outcome is an ordinary [`RetrievalResponse`].

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use faq_db::{CategoryId, CorpusStore};
use serde::Serialize;

use crate::config::{ConfidenceConfig, FaqConfig, MessagesConfig, RetrievalConfig};
use crate::confidence::Confidence;
use crate::errors::FaqError;
use crate::rules::RuleMatcher;
use crate::search::{
    search_all, search_categories, CategoryCacheSlot, QueryVector, ScoredFaq,
};
use crate::vector_index::FaqVectorIndex;
use crate::vectorizer::{ModelSlot, VectorizerModel};

// ============================================================================
// Response types
// ============================================================================

/// One ranked answer.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RankedFaq {
    pub faq_id: u64,
    pub question: String,
    pub answer: String,
    pub score: f32,
    pub category_id: u64,
    /// Category name, empty if the category could not be resolved.
    pub category: String,
}

/// Which terminal state produced the response.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Resolution {
    /// A conversational rule matched.
    Rule { intent: String },
    /// The question has no term known to the vectorizer.
    NotUnderstood,
    /// Tier 1 answered from one category.
    #[serde(rename_all = "camelCase")]
    Category {
        category_id: u64,
        name: String,
        from_cache: bool,
    },
    /// Tier 2 answered.
    Global,
    /// Tier 2 found nothing.
    NoMatch,
}

impl Resolution {
    /// Short label for display.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Rule { .. } => "rule",
            Self::NotUnderstood => "not understood",
            Self::Category { .. } => "category",
            Self::Global => "global",
            Self::NoMatch => "no match",
        }
    }
}

/// Outcome of [`Retriever::find_best`].
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RetrievalResponse {
    pub question: String,
    /// Ranked hits, highest first, all with `score >= min_score`.
    pub hits: Vec<RankedFaq>,
    pub resolution: Resolution,
    pub top_score: f32,
    pub confidence: Confidence,
    /// Text to show the user.
    pub reply: String,
    /// Categories scored by Tier 1.
    pub categories_probed: usize,
    /// Pages scanned by Tier 2.
    pub fallback_pages: usize,
}

impl RetrievalResponse {
    pub fn best(&self) -> Option<&RankedFaq> {
        self.hits.first()
    }
}

// ============================================================================
// Retriever
// ============================================================================

/// The tiered retrieval orchestrator.
///
/// Shared by all request workers. Owns the process-wide vectorizer slot,
/// the category cache slot and the conversational rules.
pub struct Retriever {
    store: Arc<dyn CorpusStore>,
    model: Arc<ModelSlot>,
    rules: RuleMatcher,
    cache: CategoryCacheSlot,
    index: FaqVectorIndex,
    retrieval: RetrievalConfig,
    confidence: ConfidenceConfig,
    messages: MessagesConfig,
    index_verified: AtomicBool,
}

impl Retriever {
    pub fn new(
        store: Arc<dyn CorpusStore>,
        model: Arc<ModelSlot>,
        rules: RuleMatcher,
        config: &FaqConfig,
    ) -> Self {
        Self {
            store,
            model,
            rules,
            cache: CategoryCacheSlot::new(),
            index: FaqVectorIndex::new(config.index.rebuild_batch_size),
            retrieval: config.retrieval.clone(),
            confidence: config.confidence,
            messages: config.messages.clone(),
            index_verified: AtomicBool::new(false),
        }
    }

    pub fn store(&self) -> &Arc<dyn CorpusStore> {
        &self.store
    }

    pub fn model_slot(&self) -> &Arc<ModelSlot> {
        &self.model
    }

    pub fn rules(&self) -> &RuleMatcher {
        &self.rules
    }

    pub fn cache(&self) -> &CategoryCacheSlot {
        &self.cache
    }

    /// Answer with the configured defaults for `top_k` and `min_score`.
    pub fn ask(&self, question: &str) -> Result<RetrievalResponse, FaqError> {
        self.find_best(question, self.retrieval.top_k, self.retrieval.min_score)
    }

    /// Find the best answers to `question`.
    ///
    /// `min_score` filters the ranked hits after ranking; it never changes
    /// which tier answers.
    ///
    /// # Errors
    ///
    /// - [`FaqError::InvalidArgument`] if `top_k` is 0 or `min_score` is
    ///   outside `[0, 1]`
    /// - [`FaqError::ModelNotTrained`] if no model exists and none can be trained
    /// - [`FaqError::Store`] if the corpus cannot be read
    pub fn find_best(
        &self,
        question: &str,
        top_k: usize,
        min_score: f32,
    ) -> Result<RetrievalResponse, FaqError> {
        if top_k == 0 {
            return Err(FaqError::InvalidArgument(
                "top_k must be at least 1".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&min_score) {
            return Err(FaqError::InvalidArgument(format!(
                "min_score must be within [0, 1], got {}",
                min_score
            )));
        }

        // TryRules
        if let Some(rule) = self.rules.find(question) {
            tracing::debug!("Rule `{}` matched", rule.intent);
            return Ok(RetrievalResponse {
                question: question.to_string(),
                hits: Vec::new(),
                resolution: Resolution::Rule {
                    intent: rule.intent.clone(),
                },
                top_score: 1.0,
                confidence: Confidence::High,
                reply: rule.response.clone(),
                categories_probed: 0,
                fallback_pages: 0,
            });
        }

        // Vectorize
        let model = self.active_model()?;
        let (vector, norm) = model.vectorize(question);
        if norm == 0.0 {
            tracing::debug!("No known term in question, skipping vector tiers");
            return Ok(RetrievalResponse {
                question: question.to_string(),
                hits: Vec::new(),
                resolution: Resolution::NotUnderstood,
                top_score: 0.0,
                confidence: Confidence::Low,
                reply: self.messages.not_understood.clone(),
                categories_probed: 0,
                fallback_pages: 0,
            });
        }

        let query = QueryVector {
            model_id: model.id(),
            vector: &vector,
            norm,
        };

        // Tier 1
        let tier1 = search_categories(
            self.store.as_ref(),
            &self.cache,
            &query,
            top_k,
            self.retrieval.good_score_threshold,
        )?;

        if let Some(category) = tier1.category {
            tracing::debug!(
                "Tier 1 hit in `{}` after {} probes",
                category.name,
                tier1.categories_probed
            );
            let mut names = HashMap::new();
            names.insert(category.id, category.name.clone());
            let hits = self.finish_hits(tier1.hits, min_score, &names);
            return Ok(self.respond(
                question,
                hits,
                Resolution::Category {
                    category_id: category.id.value(),
                    name: category.name,
                    from_cache: tier1.from_cache,
                },
                tier1.categories_probed,
                0,
            ));
        }

        // Tier 2
        tracing::debug!(
            "Tier 1 miss after {} probes, scanning all FAQs",
            tier1.categories_probed
        );
        let tier2 = search_all(
            self.store.as_ref(),
            &query,
            top_k,
            self.retrieval.fallback_batch_size,
        )?;
        let names = self.category_names(&tier2.hits)?;
        let hits = self.finish_hits(tier2.hits, min_score, &names);
        let resolution = if hits.is_empty() {
            Resolution::NoMatch
        } else {
            Resolution::Global
        };

        Ok(self.respond(
            question,
            hits,
            resolution,
            tier1.categories_probed,
            tier2.pages,
        ))
    }

    /// The active vectorizer, with the stored index checked against it once.
    fn active_model(&self) -> Result<Arc<VectorizerModel>, FaqError> {
        let model = self.model.get_or_init(self.store.as_ref())?;

        if !self.index_verified.load(Ordering::Acquire) {
            if !FaqVectorIndex::is_current(self.store.as_ref(), &model)? {
                tracing::info!(
                    "Vector index does not match vectorizer {}, rebuilding",
                    model.id()
                );
                self.index.rebuild(self.store.as_ref(), &model)?;
            }
            self.index_verified.store(true, Ordering::Release);
        }

        Ok(model)
    }

    /// Mark the index as matching the active model (after an explicit rebuild).
    pub(crate) fn mark_index_verified(&self) {
        self.index_verified.store(true, Ordering::Release);
    }

    fn category_names(
        &self,
        hits: &[ScoredFaq],
    ) -> Result<HashMap<CategoryId, String>, FaqError> {
        let mut names = HashMap::new();
        for hit in hits {
            let id = hit.record.category_id;
            if names.contains_key(&id) {
                continue;
            }
            if let Some(category) = self.store.category(id)? {
                names.insert(id, category.name);
            }
        }
        Ok(names)
    }

    fn finish_hits(
        &self,
        hits: Vec<ScoredFaq>,
        min_score: f32,
        names: &HashMap<CategoryId, String>,
    ) -> Vec<RankedFaq> {
        hits.into_iter()
            .filter(|hit| hit.score >= min_score)
            .map(|hit| RankedFaq {
                faq_id: hit.record.id.value(),
                category: names.get(&hit.record.category_id).cloned().unwrap_or_default(),
                category_id: hit.record.category_id.value(),
                question: hit.record.question,
                answer: hit.record.answer,
                score: hit.score,
            })
            .collect()
    }

    fn respond(
        &self,
        question: &str,
        hits: Vec<RankedFaq>,
        resolution: Resolution,
        categories_probed: usize,
        fallback_pages: usize,
    ) -> RetrievalResponse {
        let top_score = hits.first().map(|h| h.score).unwrap_or(0.0);
        let confidence = Confidence::classify(top_score, &self.confidence);
        let reply = render_reply(&hits, confidence, &self.messages);

        RetrievalResponse {
            question: question.to_string(),
            hits,
            resolution,
            top_score,
            confidence,
            reply,
            categories_probed,
            fallback_pages,
        }
    }
}

/// Reply text for a ranked outcome.
///
/// High confidence returns the answer as is, medium prefixes it, low (or no
/// hit) asks the user to rephrase.
pub fn render_reply(hits: &[RankedFaq], confidence: Confidence, messages: &MessagesConfig) -> String {
    match (hits.first(), confidence) {
        (Some(best), Confidence::High) => best.answer.clone(),
        (Some(best), Confidence::Medium) => format!("{}{}", messages.closest_prefix, best.answer),
        _ => messages.not_found.clone(),
    }
}
