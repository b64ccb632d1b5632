//! Error types for faq-db.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for faq-db operations.
pub type DbResult<T> = Result<T, DbError>;

/// Errors that can occur in faq-db operations.
#[derive(Debug, Error)]
pub enum DbError {
    // ========================================================================
    // Corpus errors
    // ========================================================================
    /// The corpus file could not be read or written.
    #[error("Corpus I/O error at {path}: {message}")]
    CorpusIo { path: PathBuf, message: String },

    /// The corpus file exists but is not valid JSON for the corpus schema.
    #[error("Corpus parse error at {path}: {message}")]
    CorpusParse { path: PathBuf, message: String },

    /// A FAQ referenced by id does not exist.
    #[error("FAQ #{id} not found")]
    FaqNotFound { id: u64 },

    /// A FAQ references a category that does not exist.
    #[error("FAQ #{faq_id} references unknown category #{category_id}")]
    DanglingCategory { faq_id: u64, category_id: u64 },

    // ========================================================================
    // Vector store errors
    // ========================================================================
    /// Vector store I/O error.
    #[error("Vector store I/O error at {path}: {message}")]
    VectorIo { path: PathBuf, message: String },

    /// Vector store parse error.
    #[error("Vector store parse error at {path}: {message}")]
    VectorParse { path: PathBuf, message: String },

    // ========================================================================
    // Init coordination errors
    // ========================================================================
    /// The init lock could not be created or released.
    #[error("Init lock error at {path}: {message}")]
    InitLock { path: PathBuf, message: String },

    // ========================================================================
    // General errors
    // ========================================================================
    /// IO error wrapper.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error wrapper.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic internal error.
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl DbError {
    /// Create a corpus I/O error.
    pub fn corpus_io(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::CorpusIo {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a corpus parse error.
    pub fn corpus_parse(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::CorpusParse {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a vector I/O error.
    pub fn vector_io(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::VectorIo {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a vector parse error.
    pub fn vector_parse(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::VectorParse {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }
}
