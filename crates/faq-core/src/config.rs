//! Configuration types for faqbot.
//!
//! [`FaqConfig`] is the user-level configuration stored in
//! `~/.faqbot/config.yaml`. Every field has a default so the engine works
//! without any file on disk.
//!
//! # Example YAML
//!
//! ```yaml
//! dataDir: /var/lib/faqbot
//! vectorizer:
//!   maxFeatures: 5000
//!   stemming: true
//! index:
//!   rebuildBatchSize: 1000
//! retrieval:
//!   topK: 3
//!   minScore: 0.0
//!   goodScoreThreshold: 0.7
//!   fallbackBatchSize: 500
//! confidence:
//!   medium: 0.6
//!   high: 0.8
//! rules:
//!   path: /etc/faqbot/rules.yaml
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants::{
    CONFIG_FILENAME, DATA_DIR_NAME, DEFAULT_FALLBACK_BATCH_SIZE, DEFAULT_HIGH_CONFIDENCE,
    DEFAULT_INIT_POLL_MS, DEFAULT_INIT_WAIT_SECS, DEFAULT_MAX_FEATURES,
    DEFAULT_MEDIUM_CONFIDENCE, DEFAULT_MIN_SCORE, DEFAULT_MIN_TOKEN_LENGTH,
    DEFAULT_REBUILD_BATCH_SIZE, DEFAULT_TOP_K, FAQBOT_HOME_DIR, GOOD_SCORE_THRESHOLD,
    RULES_FILENAME, VECTORIZER_DIR_NAME,
};
use crate::errors::FaqError;
use crate::tokenizer::TokenizerConfig;

// ============================================================================
// FaqConfig
// ============================================================================

/// Top-level faqbot configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FaqConfig {
    /// Directory holding the corpus, vectors and persisted model.
    /// Defaults to `~/.faqbot/data`.
    #[serde(default)]
    pub data_dir: Option<PathBuf>,

    #[serde(default)]
    pub vectorizer: VectorizerConfig,

    #[serde(default)]
    pub index: IndexConfig,

    #[serde(default)]
    pub retrieval: RetrievalConfig,

    #[serde(default)]
    pub confidence: ConfidenceConfig,

    #[serde(default)]
    pub rules: RulesConfig,

    #[serde(default)]
    pub init: InitConfig,

    #[serde(default)]
    pub messages: MessagesConfig,
}

impl FaqConfig {
    /// Load the configuration from the default location (`~/.faqbot/config.yaml`).
    ///
    /// # Errors
    ///
    /// Returns [`FaqError::InvalidConfiguration`] if the file exists but is invalid.
    pub fn load_default() -> Result<Self, FaqError> {
        match Self::default_path() {
            Some(path) => Self::from_path(&path),
            None => {
                tracing::debug!("Could not determine home directory, using default config");
                Ok(Self::default())
            }
        }
    }

    /// Load the configuration from a specific path.
    ///
    /// A missing file yields the defaults. Validation warnings are logged.
    ///
    /// # Errors
    ///
    /// Returns [`FaqError::InvalidConfiguration`] if the file cannot be read,
    /// parsed or validated.
    pub fn from_path(path: &Path) -> Result<Self, FaqError> {
        if !path.exists() {
            tracing::debug!("Config not found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).map_err(|e| FaqError::InvalidConfiguration {
            message: format!("Failed to read {}: {}", path.display(), e),
            hint: "Check the file permissions".to_string(),
        })?;

        let config = Self::from_yaml(&content).map_err(|e| match e {
            FaqError::InvalidConfiguration { message, hint } => FaqError::InvalidConfiguration {
                message: format!("{} ({})", message, path.display()),
                hint,
            },
            other => other,
        })?;

        for warning in config.validate()? {
            tracing::warn!("Config warning: {}", warning);
        }

        Ok(config)
    }

    /// Parse a YAML document. Does not validate.
    pub fn from_yaml(content: &str) -> Result<Self, FaqError> {
        serde_yaml::from_str(content).map_err(|e| FaqError::InvalidConfiguration {
            message: format!("Failed to parse config: {}", e),
            hint: "Keys are camelCase, e.g. `retrieval.topK`".to_string(),
        })
    }

    /// Default config directory (`~/.faqbot`).
    pub fn default_dir() -> Option<PathBuf> {
        dirs::home_dir().map(|h| h.join(FAQBOT_HOME_DIR))
    }

    /// Default config file path (`~/.faqbot/config.yaml`).
    pub fn default_path() -> Option<PathBuf> {
        Self::default_dir().map(|d| d.join(CONFIG_FILENAME))
    }

    /// Configuration rooted at an explicit data directory.
    pub fn with_data_dir(mut self, data_dir: impl Into<PathBuf>) -> Self {
        self.data_dir = Some(data_dir.into());
        self
    }

    /// Effective data directory.
    ///
    /// Falls back to `./.faqbot/data` when no home directory is known.
    pub fn resolved_data_dir(&self) -> PathBuf {
        if let Some(ref dir) = self.data_dir {
            return dir.clone();
        }
        Self::default_dir()
            .unwrap_or_else(|| PathBuf::from(FAQBOT_HOME_DIR))
            .join(DATA_DIR_NAME)
    }

    /// Directory holding the persisted vectorizer.
    pub fn vectorizer_dir(&self) -> PathBuf {
        self.resolved_data_dir().join(VECTORIZER_DIR_NAME)
    }

    /// Effective conversational rules path.
    pub fn rules_path(&self) -> PathBuf {
        self.rules
            .path
            .clone()
            .unwrap_or_else(|| self.resolved_data_dir().join(RULES_FILENAME))
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns the first critical problem as [`FaqError::InvalidConfiguration`].
    ///
    /// # Warnings
    ///
    /// Non-fatal issues are returned for the caller to log.
    pub fn validate(&self) -> Result<Vec<String>, FaqError> {
        let mut warnings = Vec::new();
        warnings.extend(self.vectorizer.validate()?);
        warnings.extend(self.index.validate()?);
        warnings.extend(self.retrieval.validate()?);
        warnings.extend(self.confidence.validate()?);
        Ok(warnings)
    }
}

fn check_unit_interval(key: &str, value: f32) -> Result<(), FaqError> {
    if !(0.0..=1.0).contains(&value) {
        return Err(FaqError::InvalidConfiguration {
            message: format!("{} must be within [0, 1], got {}", key, value),
            hint: "Scores are cosine similarities between 0 and 1".to_string(),
        });
    }
    Ok(())
}

// ============================================================================
// VectorizerConfig
// ============================================================================

/// TF-IDF vectorizer settings, applied at training time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VectorizerConfig {
    /// Vocabulary bound.
    #[serde(default = "default_max_features")]
    pub max_features: usize,

    #[serde(default = "default_true")]
    pub stemming: bool,

    #[serde(default = "default_true")]
    pub remove_stopwords: bool,

    #[serde(default = "default_min_token_length")]
    pub min_token_length: usize,
}

fn default_max_features() -> usize {
    DEFAULT_MAX_FEATURES
}
fn default_true() -> bool {
    true
}
fn default_min_token_length() -> usize {
    DEFAULT_MIN_TOKEN_LENGTH
}

impl Default for VectorizerConfig {
    fn default() -> Self {
        Self {
            max_features: DEFAULT_MAX_FEATURES,
            stemming: true,
            remove_stopwords: true,
            min_token_length: DEFAULT_MIN_TOKEN_LENGTH,
        }
    }
}

impl VectorizerConfig {
    /// Tokenizer settings derived from this config.
    pub fn tokenizer_config(&self) -> TokenizerConfig {
        TokenizerConfig {
            stemming: self.stemming,
            remove_stopwords: self.remove_stopwords,
            min_token_length: self.min_token_length,
        }
    }

    /// Validate vectorizer settings.
    pub fn validate(&self) -> Result<Vec<String>, FaqError> {
        let mut warnings = Vec::new();

        if self.max_features == 0 {
            return Err(FaqError::InvalidConfiguration {
                message: "vectorizer.maxFeatures cannot be 0".to_string(),
                hint: "Set maxFeatures to at least 1 (default: 5000)".to_string(),
            });
        }

        if self.max_features > 100_000 {
            warnings.push(format!(
                "vectorizer.maxFeatures={} is very large; every vector is stored dense",
                self.max_features
            ));
        }

        if self.min_token_length > 5 {
            warnings.push(format!(
                "vectorizer.minTokenLength={} drops most French words",
                self.min_token_length
            ));
        }

        Ok(warnings)
    }
}

// ============================================================================
// IndexConfig
// ============================================================================

/// Vector index maintenance settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexConfig {
    /// FAQs vectorized and upserted per batch during a rebuild.
    #[serde(default = "default_rebuild_batch_size")]
    pub rebuild_batch_size: usize,
}

fn default_rebuild_batch_size() -> usize {
    DEFAULT_REBUILD_BATCH_SIZE
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            rebuild_batch_size: DEFAULT_REBUILD_BATCH_SIZE,
        }
    }
}

impl IndexConfig {
    pub fn validate(&self) -> Result<Vec<String>, FaqError> {
        if self.rebuild_batch_size == 0 {
            return Err(FaqError::InvalidConfiguration {
                message: "index.rebuildBatchSize cannot be 0".to_string(),
                hint: "Set rebuildBatchSize to at least 1 (default: 1000)".to_string(),
            });
        }
        Ok(Vec::new())
    }
}

// ============================================================================
// RetrievalConfig
// ============================================================================

/// Retrieval pipeline settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetrievalConfig {
    /// Default number of hits returned. Overridable per call.
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// Default post-ranking score filter. Overridable per call.
    #[serde(default = "default_min_score")]
    pub min_score: f32,

    /// Tier-1 score at which a category is accepted immediately.
    #[serde(default = "default_good_score_threshold")]
    pub good_score_threshold: f32,

    /// Vector entries scored per batch in the global fallback.
    #[serde(default = "default_fallback_batch_size")]
    pub fallback_batch_size: usize,
}

fn default_top_k() -> usize {
    DEFAULT_TOP_K
}
fn default_min_score() -> f32 {
    DEFAULT_MIN_SCORE
}
fn default_good_score_threshold() -> f32 {
    GOOD_SCORE_THRESHOLD
}
fn default_fallback_batch_size() -> usize {
    DEFAULT_FALLBACK_BATCH_SIZE
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: DEFAULT_TOP_K,
            min_score: DEFAULT_MIN_SCORE,
            good_score_threshold: GOOD_SCORE_THRESHOLD,
            fallback_batch_size: DEFAULT_FALLBACK_BATCH_SIZE,
        }
    }
}

impl RetrievalConfig {
    pub fn validate(&self) -> Result<Vec<String>, FaqError> {
        let mut warnings = Vec::new();

        if self.top_k == 0 {
            return Err(FaqError::InvalidConfiguration {
                message: "retrieval.topK cannot be 0".to_string(),
                hint: "Set topK to at least 1 (default: 3)".to_string(),
            });
        }
        if self.fallback_batch_size == 0 {
            return Err(FaqError::InvalidConfiguration {
                message: "retrieval.fallbackBatchSize cannot be 0".to_string(),
                hint: "Set fallbackBatchSize to at least 1 (default: 500)".to_string(),
            });
        }
        check_unit_interval("retrieval.minScore", self.min_score)?;
        check_unit_interval("retrieval.goodScoreThreshold", self.good_score_threshold)?;

        if self.top_k > 50 {
            warnings.push(format!(
                "retrieval.topK={} is large for a FAQ answer list",
                self.top_k
            ));
        }

        Ok(warnings)
    }
}

// ============================================================================
// ConfidenceConfig
// ============================================================================

/// Score bands for the confidence label.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfidenceConfig {
    /// Lower bound of "medium".
    #[serde(default = "default_medium")]
    pub medium: f32,

    /// Lower bound of "high".
    #[serde(default = "default_high")]
    pub high: f32,
}

fn default_medium() -> f32 {
    DEFAULT_MEDIUM_CONFIDENCE
}
fn default_high() -> f32 {
    DEFAULT_HIGH_CONFIDENCE
}

impl Default for ConfidenceConfig {
    fn default() -> Self {
        Self {
            medium: DEFAULT_MEDIUM_CONFIDENCE,
            high: DEFAULT_HIGH_CONFIDENCE,
        }
    }
}

impl ConfidenceConfig {
    pub fn validate(&self) -> Result<Vec<String>, FaqError> {
        check_unit_interval("confidence.medium", self.medium)?;
        check_unit_interval("confidence.high", self.high)?;
        if self.medium > self.high {
            return Err(FaqError::InvalidConfiguration {
                message: format!(
                    "confidence.medium ({}) is above confidence.high ({})",
                    self.medium, self.high
                ),
                hint: "medium must be less than or equal to high".to_string(),
            });
        }
        Ok(Vec::new())
    }
}

// ============================================================================
// RulesConfig / InitConfig / MessagesConfig
// ============================================================================

/// Conversational rules source.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RulesConfig {
    /// JSON or YAML rules document. Defaults to `<dataDir>/rules.yaml`.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

/// Cross-worker model initialization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitConfig {
    /// How long a follower waits for the leader's build.
    #[serde(default = "default_wait_timeout_secs")]
    pub wait_timeout_secs: u64,

    /// Poll interval while waiting.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

fn default_wait_timeout_secs() -> u64 {
    DEFAULT_INIT_WAIT_SECS
}
fn default_poll_interval_ms() -> u64 {
    DEFAULT_INIT_POLL_MS
}

impl Default for InitConfig {
    fn default() -> Self {
        Self {
            wait_timeout_secs: DEFAULT_INIT_WAIT_SECS,
            poll_interval_ms: DEFAULT_INIT_POLL_MS,
        }
    }
}

impl InitConfig {
    pub fn wait_timeout(&self) -> Duration {
        Duration::from_secs(self.wait_timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }
}

const DEFAULT_NOT_UNDERSTOOD: &str =
    "Je n'ai pas compris votre question. Pourriez-vous la formuler autrement ?";
const DEFAULT_NOT_FOUND: &str =
    "Je n'ai pas trouvé de réponse précise à votre question. Pourriez-vous reformuler ?";
const DEFAULT_CLOSEST_PREFIX: &str = "Voici la réponse la plus proche : ";

/// Reply texts used when no confident answer is available.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessagesConfig {
    /// Reply when the question has no known term.
    #[serde(default = "default_not_understood")]
    pub not_understood: String,

    /// Reply on low confidence or no match.
    #[serde(default = "default_not_found")]
    pub not_found: String,

    /// Prefix put before a medium-confidence answer.
    #[serde(default = "default_closest_prefix")]
    pub closest_prefix: String,
}

fn default_not_understood() -> String {
    DEFAULT_NOT_UNDERSTOOD.to_string()
}
fn default_not_found() -> String {
    DEFAULT_NOT_FOUND.to_string()
}
fn default_closest_prefix() -> String {
    DEFAULT_CLOSEST_PREFIX.to_string()
}

impl Default for MessagesConfig {
    fn default() -> Self {
        Self {
            not_understood: default_not_understood(),
            not_found: default_not_found(),
            closest_prefix: default_closest_prefix(),
        }
    }
}
