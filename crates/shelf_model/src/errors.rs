//! Error types for the shelf-life model crate

use std::path::PathBuf;
use thiserror::Error;

/// Errors returned while loading data, training or serving the shelf-life model.
#[derive(Debug, Error)]
pub enum ModelError {
    /// Dataset file does not exist at the configured path
    #[error("dataset not found at {}", path.display())]
    DatasetNotFound { path: PathBuf },

    /// Dataset exists but could not be parsed or violates a record invariant
    #[error("dataset error: {0}")]
    Dataset(String),

    /// Fewer than one usable sample, or features and targets disagree in length
    #[error("insufficient training data: {0}")]
    InsufficientData(String),

    #[error("category vocabulary cannot be built from an empty sequence")]
    EmptyVocabulary,

    #[error("unknown category: {0}")]
    UnknownCategory(String),

    #[error("invalid category code: {0}")]
    InvalidCode(usize),

    /// Inference attempted before `fit`
    #[error("model has not been trained")]
    ModelNotTrained,

    #[error("model validation failed: {0}")]
    ValidationFailed(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result alias for model operations
pub type Result<T> = std::result::Result<T, ModelError>;
