//! Shared constants: default tuning values and on-disk names.

/// Directory under the user's home holding config and data.
pub const FAQBOT_HOME_DIR: &str = ".faqbot";

/// Config filename inside [`FAQBOT_HOME_DIR`].
pub const CONFIG_FILENAME: &str = "config.yaml";

/// Default data directory name inside [`FAQBOT_HOME_DIR`].
pub const DATA_DIR_NAME: &str = "data";

/// Default conversational rules filename inside the data directory.
pub const RULES_FILENAME: &str = "rules.yaml";

/// Directory inside the data directory holding the persisted vectorizer.
pub const VECTORIZER_DIR_NAME: &str = "vectorizer";

/// Vocabulary bound: the N most frequent corpus terms are kept.
pub const DEFAULT_MAX_FEATURES: usize = 5000;

/// Minimum token length kept by the tokenizer.
pub const DEFAULT_MIN_TOKEN_LENGTH: usize = 2;

/// Tier-1 score at which a category is accepted without looking further.
pub const GOOD_SCORE_THRESHOLD: f32 = 0.7;

/// Default number of ranked candidates returned.
pub const DEFAULT_TOP_K: usize = 3;

/// Default post-ranking score filter.
pub const DEFAULT_MIN_SCORE: f32 = 0.0;

/// FAQs vectorized per batch during an index rebuild.
pub const DEFAULT_REBUILD_BATCH_SIZE: usize = 1000;

/// Vector entries scored per batch during the global fallback scan.
pub const DEFAULT_FALLBACK_BATCH_SIZE: usize = 500;

/// Lower bound of the "medium" confidence band.
pub const DEFAULT_MEDIUM_CONFIDENCE: f32 = 0.6;

/// Lower bound of the "high" confidence band.
pub const DEFAULT_HIGH_CONFIDENCE: f32 = 0.8;

/// How long followers wait for the leader to build the model.
pub const DEFAULT_INIT_WAIT_SECS: u64 = 30;

/// Poll interval while waiting for the model build.
pub const DEFAULT_INIT_POLL_MS: u64 = 200;
