//! Error types for faq-core.

use std::path::PathBuf;

use faq_db::DbError;
use thiserror::Error;

/// Domain-specific errors for retrieval operations.
#[derive(Error, Debug)]
pub enum FaqError {
    /// No persisted vectorizer exists and the corpus is empty, so none can be trained.
    #[error("Vectorizer not trained: no persisted model and the corpus has no active FAQs. Load a corpus and run `faqbot train`.")]
    ModelNotTrained,

    /// Training was requested on a corpus without usable text.
    #[error("Cannot train vectorizer: corpus is empty")]
    EmptyCorpus,

    /// The cached category no longer exists or is inactive.
    ///
    /// Recovered locally by resetting the cache slot; surfaced only in logs.
    #[error("Cached category #{category_id} (`{name}`) is no longer available")]
    CategoryLookupFailure {
        /// Id of the stale category.
        category_id: u64,
        /// Name recorded in the cache slot.
        name: String,
    },

    /// The conversational rules document could not be read or parsed.
    ///
    /// Logged at load time; the rule list is treated as empty.
    #[error("Malformed rules source at `{path}`: {message}")]
    MalformedRulesSource {
        /// Path to the rules document.
        path: PathBuf,
        /// Description of the problem.
        message: String,
    },

    /// Failed to read/write the persisted vectorizer.
    #[error("Vectorizer I/O error at `{path}`: {message}")]
    VectorizerIo {
        /// Path to the model file or directory.
        path: PathBuf,
        /// Description of the I/O error.
        message: String,
    },

    /// The persisted vectorizer could not be decoded.
    #[error("Vectorizer parse error at `{path}`: {message}")]
    VectorizerParse {
        /// Path to the model file.
        path: PathBuf,
        /// Description of the parse error.
        message: String,
    },

    /// The vector index was built by a different vectorizer generation.
    #[error("Vector index incompatible: built with model `{index_model}`, active is `{active_model}`. Run a full rebuild.")]
    IndexIncompatible {
        /// Model id recorded in the index metadata.
        index_model: String,
        /// Model id of the active vectorizer.
        active_model: String,
    },

    /// A configuration value is invalid.
    #[error("Invalid configuration: {message}. {hint}")]
    InvalidConfiguration {
        /// Description of the invalid configuration.
        message: String,
        /// Actionable hint on how to fix it.
        hint: String,
    },

    /// Invalid argument provided to an operation.
    #[error("{0}")]
    InvalidArgument(String),

    /// Storage collaborator failure.
    #[error("Corpus store error: {0}")]
    Store(#[from] DbError),
}

impl FaqError {
    /// Whether the error means the corpus or the model is unavailable.
    ///
    /// These are the only failures `find_best` surfaces to callers; every
    /// "nothing matched" outcome is an ordinary response.
    pub fn is_unavailable(&self) -> bool {
        matches!(
            self,
            Self::ModelNotTrained | Self::Store(_) | Self::VectorizerIo { .. }
        )
    }
}
