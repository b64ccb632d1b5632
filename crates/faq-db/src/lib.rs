//! # faq-db
//!
//! Storage layer for faqbot - the corpus, its vector entries, feedback and
//! init coordination.
//!
//! The retrieval core in `faq-core` treats storage as an external
//! collaborator. It only talks to the [`CorpusStore`] and
//! [`InitCoordinator`] traits defined here, so a deployment can back them
//! with a real database without touching the retrieval code.
//!
//! ## Architecture
//!
//! ```text
//! faq-cli → faq-core → (traits)
//!              ↑
//!           faq-db (CorpusStore, InitCoordinator + file/in-memory impls)
//! ```
//!
//! ## Modules
//!
//! - `corpus`: data model, `CorpusStore`, `InMemoryCorpus`, `FileCorpusStore`
//! - `lock`: `InitCoordinator`, `LocalCoordinator`, `LockFileCoordinator`

pub mod corpus;
pub mod error;
pub mod lock;

pub use corpus::{
    Category, CategoryId, CategorySummary, CorpusDocument, CorpusStore, FaqId, FaqRecord,
    FaqVectorEntry, Feedback, FeedbackKind, FileCorpusStore, InMemoryCorpus, IndexedFaq,
    NewFeedback, VectorIndexMeta,
};
pub use error::{DbError, DbResult};
pub use lock::{InitCoordinator, InitRole, LocalCoordinator, LockFileCoordinator};
