//! # faq-core
//!
//! **faqbot** – tiered FAQ retrieval engine.
//!
//! This crate answers free-text questions from a corpus of question/answer
//! pairs. It is consumed by the `faqbot` CLI and can be embedded in any
//! service that shares one engine across request workers.
//!
//! ## Main Types
//!
//! - [`FaqEngine`] – facade for retrieval and maintenance operations
//! - [`Retriever`] – the tiered retrieval pipeline (`find_best`)
//! - [`VectorizerModel`] – fitted TF-IDF model
//! - [`FaqError`] – domain-specific error type
//!
//! ## Modules
//!
//! - [`tokenizer`] – French tokenization and stemming
//! - [`vectorizer`] – TF-IDF training, persistence and the lazy model slot
//! - [`vector_index`] – per-FAQ vector maintenance (rebuild, incremental upsert)
//! - [`similarity`] – batched cosine similarity
//! - [`rules`] – conversational rules (Tier 0)
//! - [`search`] – category search (Tier 1) and global fallback (Tier 2)
//! - [`confidence`] – confidence bands
//! - [`retrieval`] – the orchestrator
//! - [`config`] – YAML configuration
//!
//! ## Example
//!
//! ```ignore
//! use faq_core::{FaqConfig, FaqEngine};
//!
//! let engine = FaqEngine::from_config(FaqConfig::load_default()?)?;
//! engine.train()?;
//!
//! let response = engine.ask("Comment réinitialiser mon mot de passe ?", None, None)?;
//! println!("[{}] {}", response.confidence, response.reply);
//! ```

// Modules
pub mod confidence;
pub mod config;
pub mod constants;
pub mod engine;
pub mod errors;
pub mod retrieval;
pub mod rules;
pub mod search;
pub mod similarity;
pub mod tokenizer;
pub mod vector_index;
pub mod vectorizer;

// Re-exports for convenience
pub use confidence::Confidence;
pub use config::{
    ConfidenceConfig, FaqConfig, IndexConfig, InitConfig, MessagesConfig, RetrievalConfig,
    RulesConfig, VectorizerConfig,
};
pub use engine::{EngineStats, FaqEngine, TrainReport};
pub use errors::FaqError;
pub use retrieval::{render_reply, RankedFaq, Resolution, RetrievalResponse, Retriever};
pub use rules::{ConversationalRule, RuleMatcher};
pub use search::{CachedCategory, CategoryCacheSlot, ScoredFaq};
pub use similarity::score_batch;
pub use tokenizer::{Tokenizer, TokenizerConfig};
pub use vector_index::{FaqVectorIndex, RebuildReport};
pub use vectorizer::{ModelSlot, VectorizerMeta, VectorizerModel};

// Storage collaborator types used in the public API
pub use faq_db::{
    Category, CategoryId, CategorySummary, CorpusDocument, CorpusStore, FaqId, FaqRecord,
    Feedback, FeedbackKind, NewFeedback,
};
