//! Vectorizer serialization and storage.
//!
//! Uses bincode v2 for the fitted model and a JSON sidecar for metadata.
//! Storage layout:
//!
//! ```text
//! <data_dir>/vectorizer/
//! ├── model.bin         # Serialized VectorizerModel
//! └── meta.json         # Version, model id, dimension
//! ```

use std::fs;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use bincode::config;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::VectorizerModel;
use crate::errors::FaqError;

/// Filename for the serialized model.
pub const MODEL_FILENAME: &str = "model.bin";

/// Filename for model metadata.
pub const VECTORIZER_META_FILENAME: &str = "meta.json";

/// Vectorizer metadata sidecar.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VectorizerMeta {
    /// Format version for compatibility checks.
    pub version: u32,
    /// Generation id of the persisted model.
    pub model_id: String,
    /// Vocabulary size.
    pub dimension: usize,
    /// Number of training documents.
    pub num_documents: usize,
    /// Training time.
    pub trained_at: DateTime<Utc>,
}

impl VectorizerMeta {
    /// Current on-disk format version.
    pub const CURRENT_VERSION: u32 = 1;

    /// Describe a model.
    pub fn for_model(model: &VectorizerModel) -> Self {
        Self {
            version: Self::CURRENT_VERSION,
            model_id: model.id().to_string(),
            dimension: model.dimension(),
            num_documents: model.num_documents(),
            trained_at: model.trained_at(),
        }
    }
}

fn model_path(dir: &Path) -> PathBuf {
    dir.join(MODEL_FILENAME)
}

fn meta_path(dir: &Path) -> PathBuf {
    dir.join(VECTORIZER_META_FILENAME)
}

/// Save a vectorizer to `dir`, creating the directory if needed.
///
/// The model file is written before the metadata, so a reader that sees
/// metadata for a given id also sees its model.
///
/// # Errors
///
/// Returns [`FaqError::VectorizerIo`] or [`FaqError::VectorizerParse`] if
/// the directory, model file or metadata cannot be written.
pub fn save_vectorizer(model: &VectorizerModel, dir: &Path) -> Result<(), FaqError> {
    fs::create_dir_all(dir).map_err(|e| FaqError::VectorizerIo {
        path: dir.to_path_buf(),
        message: format!("Failed to create vectorizer directory: {}", e),
    })?;

    let model_file = model_path(dir);
    let file = fs::File::create(&model_file).map_err(|e| FaqError::VectorizerIo {
        path: model_file.clone(),
        message: format!("Failed to create model file: {}", e),
    })?;
    let mut writer = BufWriter::new(file);

    bincode::encode_into_std_write(model, &mut writer, config::standard()).map_err(|e| {
        FaqError::VectorizerParse {
            path: model_file.clone(),
            message: format!("Failed to serialize vectorizer: {}", e),
        }
    })?;
    writer.flush().map_err(|e| FaqError::VectorizerIo {
        path: model_file.clone(),
        message: format!("Failed to write model file: {}", e),
    })?;

    let meta = VectorizerMeta::for_model(model);
    let meta_file = meta_path(dir);
    let meta_json = serde_json::to_string_pretty(&meta).map_err(|e| FaqError::VectorizerParse {
        path: meta_file.clone(),
        message: format!("Failed to serialize vectorizer metadata: {}", e),
    })?;
    fs::write(&meta_file, meta_json).map_err(|e| FaqError::VectorizerIo {
        path: meta_file.clone(),
        message: format!("Failed to write vectorizer metadata: {}", e),
    })?;

    tracing::debug!(
        "Saved vectorizer {} to {}: {} docs, {} terms",
        model.id(),
        dir.display(),
        model.num_documents(),
        model.dimension()
    );

    Ok(())
}

/// Read only the metadata sidecar, if present.
pub fn load_vectorizer_meta(dir: &Path) -> Result<Option<VectorizerMeta>, FaqError> {
    let meta_file = meta_path(dir);
    if !meta_file.exists() {
        return Ok(None);
    }

    let content = fs::read_to_string(&meta_file).map_err(|e| FaqError::VectorizerIo {
        path: meta_file.clone(),
        message: format!("Failed to read vectorizer metadata: {}", e),
    })?;
    let meta = serde_json::from_str(&content).map_err(|e| FaqError::VectorizerParse {
        path: meta_file.clone(),
        message: format!("Failed to parse vectorizer metadata: {}", e),
    })?;

    Ok(Some(meta))
}

/// Load a vectorizer from `dir`.
///
/// Returns `Ok(None)` when no model exists or its format version is stale.
///
/// # Errors
///
/// Returns an error if a model exists but cannot be read or decoded.
pub fn load_vectorizer(dir: &Path) -> Result<Option<VectorizerModel>, FaqError> {
    let model_file = model_path(dir);
    if !model_file.exists() {
        tracing::debug!("No vectorizer found at {}", model_file.display());
        return Ok(None);
    }

    if let Some(meta) = load_vectorizer_meta(dir)? {
        if meta.version != VectorizerMeta::CURRENT_VERSION {
            tracing::warn!(
                "Vectorizer version mismatch: found {}, expected {}. Model will be retrained.",
                meta.version,
                VectorizerMeta::CURRENT_VERSION
            );
            return Ok(None);
        }
    }

    let file = fs::File::open(&model_file).map_err(|e| FaqError::VectorizerIo {
        path: model_file.clone(),
        message: format!("Failed to open model file: {}", e),
    })?;
    let mut reader = BufReader::new(file);

    let model: VectorizerModel = bincode::decode_from_std_read(&mut reader, config::standard())
        .map_err(|e| FaqError::VectorizerParse {
            path: model_file.clone(),
            message: format!("Failed to deserialize vectorizer: {}", e),
        })?;

    tracing::debug!(
        "Loaded vectorizer {} from {}: {} terms",
        model.id(),
        dir.display(),
        model.dimension()
    );

    Ok(Some(model))
}
