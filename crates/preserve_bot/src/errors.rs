//! Bot error types

use foodpreserve_shelf_model::ModelError;
use thiserror::Error;

/// Errors surfaced by the assistant
#[derive(Error, Debug)]
pub enum BotError {
    /// Missing credential or invalid settings; fatal at startup
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Training or inference failure from the shelf-life model
    #[error("Shelf-life prediction failed: {0}")]
    Prediction(#[from] ModelError),

    /// The text-generation backend rejected or failed the request
    #[error("Text generation failed: {0}")]
    Generation(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("IO error: {0}")]
    Io(String),
}

impl BotError {
    /// Whether a generation attempt that failed this way may succeed on retry
    pub fn is_transient(&self) -> bool {
        matches!(self, BotError::Network(_))
    }
}

impl From<serde_json::Error> for BotError {
    fn from(err: serde_json::Error) -> Self {
        BotError::Serialization(err.to_string())
    }
}

impl From<reqwest::Error> for BotError {
    fn from(err: reqwest::Error) -> Self {
        BotError::Network(err.to_string())
    }
}

impl From<std::io::Error> for BotError {
    fn from(err: std::io::Error) -> Self {
        BotError::Io(err.to_string())
    }
}
