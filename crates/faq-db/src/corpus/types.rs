//! Corpus data model.
//!
//! These types are owned by the storage layer. The retrieval core only reads
//! them, except for the vector entries it computes and the popularity counter
//! that feedback increments.

use std::fmt;

use bincode::{Decode, Encode};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ============================================================================
// Identifiers
// ============================================================================

/// Identifier of a FAQ record.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Encode, Decode,
)]
#[serde(transparent)]
pub struct FaqId(pub u64);

impl FaqId {
    /// Create a new FAQ ID.
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Get the underlying ID value.
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl From<u64> for FaqId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl fmt::Display for FaqId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a category.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Encode, Decode,
)]
#[serde(transparent)]
pub struct CategoryId(pub u64);

impl CategoryId {
    /// Create a new category ID.
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Get the underlying ID value.
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl From<u64> for CategoryId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl fmt::Display for CategoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Category
// ============================================================================

/// A category grouping FAQ records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_active")]
    pub active: bool,
}

impl Category {
    /// Create an active category with an empty description.
    pub fn new(id: impl Into<CategoryId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: String::new(),
            active: true,
        }
    }

    /// Set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Set the active flag.
    pub fn with_active(mut self, active: bool) -> Self {
        self.active = active;
        self
    }
}

/// An active category with its aggregate popularity.
///
/// Popularity is the sum over the category's active FAQs. It is computed on
/// every request and never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategorySummary {
    pub id: CategoryId,
    pub name: String,
    pub popularity: u64,
    pub faq_count: usize,
}

// ============================================================================
// FaqRecord
// ============================================================================

/// A question/answer pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FaqRecord {
    pub id: FaqId,
    pub question: String,
    pub answer: String,
    pub category_id: CategoryId,
    #[serde(default)]
    pub subtheme: String,
    #[serde(default)]
    pub source: String,
    #[serde(default = "default_active")]
    pub active: bool,
    /// Incremented by positive feedback.
    #[serde(default)]
    pub popularity: u64,
}

fn default_active() -> bool {
    true
}

impl FaqRecord {
    /// Create an active FAQ record with zero popularity.
    pub fn new(
        id: impl Into<FaqId>,
        category_id: impl Into<CategoryId>,
        question: impl Into<String>,
        answer: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            question: question.into(),
            answer: answer.into(),
            category_id: category_id.into(),
            subtheme: String::new(),
            source: String::new(),
            active: true,
            popularity: 0,
        }
    }

    /// Set the popularity counter.
    pub fn with_popularity(mut self, popularity: u64) -> Self {
        self.popularity = popularity;
        self
    }

    /// Set the subtheme.
    pub fn with_subtheme(mut self, subtheme: impl Into<String>) -> Self {
        self.subtheme = subtheme.into();
        self
    }

    /// Set the source reference.
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }

    /// Set the active flag.
    pub fn with_active(mut self, active: bool) -> Self {
        self.active = active;
        self
    }
}

// ============================================================================
// Vector entries
// ============================================================================

/// Precomputed term-weight vector for one FAQ.
///
/// `norm` is the L2 norm of `vector`. `model_id` identifies the vectorizer
/// generation that produced it; entries of different generations must not be
/// scored together.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Encode, Decode)]
#[serde(rename_all = "camelCase")]
pub struct FaqVectorEntry {
    pub faq_id: FaqId,
    pub model_id: String,
    pub vector: Vec<f32>,
    pub norm: f32,
}

impl FaqVectorEntry {
    /// Dimension of the stored vector.
    pub fn dimension(&self) -> usize {
        self.vector.len()
    }
}

/// An active FAQ joined with its vector entry.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexedFaq {
    pub record: FaqRecord,
    pub entry: FaqVectorEntry,
}

/// Metadata describing the vector index as a whole.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VectorIndexMeta {
    /// Vectorizer generation the index was built with.
    pub model_id: String,
    pub dimension: usize,
    pub entries: usize,
    pub built_at: DateTime<Utc>,
}

// ============================================================================
// Feedback
// ============================================================================

/// Kind of user feedback on an answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedbackKind {
    Positive,
    Negative,
}

impl fmt::Display for FeedbackKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Positive => write!(f, "positive"),
            Self::Negative => write!(f, "negative"),
        }
    }
}

/// Feedback as submitted, before it is stored.
#[derive(Debug, Clone, PartialEq)]
pub struct NewFeedback {
    pub faq_id: FaqId,
    pub kind: FeedbackKind,
    pub question: String,
    pub score: Option<f32>,
    pub comment: String,
}

impl NewFeedback {
    /// Create feedback with no question, score or comment attached.
    pub fn new(faq_id: impl Into<FaqId>, kind: FeedbackKind) -> Self {
        Self {
            faq_id: faq_id.into(),
            kind,
            question: String::new(),
            score: None,
            comment: String::new(),
        }
    }
}

/// A stored feedback entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Feedback {
    pub id: Uuid,
    pub faq_id: FaqId,
    pub kind: FeedbackKind,
    #[serde(default)]
    pub question: String,
    #[serde(default)]
    pub score: Option<f32>,
    #[serde(default)]
    pub comment: String,
    pub created_at: DateTime<Utc>,
}

impl Feedback {
    /// Stamp a new feedback with an id and the current time.
    pub fn from_new(new: NewFeedback) -> Self {
        Self {
            id: Uuid::new_v4(),
            faq_id: new.faq_id,
            kind: new.kind,
            question: new.question,
            score: new.score,
            comment: new.comment,
            created_at: Utc::now(),
        }
    }
}
