//! Error types shared by the dataset, training and inference stages
//!
//! Extraction and synthesis are total and never produce these. Everything
//! that touches the filesystem, the network or the classifier does.

use thiserror::Error;

/// Environment variable naming the remote model artifact location
pub const MODEL_URL_ENV: &str = "MODEL_URL";

/// Errors surfaced by the detector pipeline
#[derive(Error, Debug)]
pub enum DetectorError {
    #[error("failed to read dataset {path}: {reason}")]
    DatasetRead { path: String, reason: String },

    #[error("model unavailable: {0} (configure the model source by setting MODEL_URL or run `phishguard train`)")]
    ModelUnavailable(String),

    #[error("failed to load model {path}: {reason}")]
    ModelLoad { path: String, reason: String },

    #[error("failed to save model {path}: {reason}")]
    ModelSave { path: String, reason: String },

    #[error("feature schema mismatch: model expects {expected}, got {found}")]
    FeatureSchemaMismatch { expected: String, found: String },

    #[error("empty URL: enter a URL to check")]
    EmptyInput,

    #[error("training failed: {0}")]
    Training(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl DetectorError {
    pub(crate) fn dataset_read(path: impl AsRef<std::path::Path>, reason: impl Into<String>) -> Self {
        DetectorError::DatasetRead {
            path: path.as_ref().display().to_string(),
            reason: reason.into(),
        }
    }
}

/// Result type for detector operations
pub type Result<T> = std::result::Result<T, DetectorError>;
