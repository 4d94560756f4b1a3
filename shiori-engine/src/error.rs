//! Layered error types
//!
//! Restoration and detection never fail hard; their degradations are values.
//! Errors here only come from the edges: the durable store and configuration.

use shiori_core::CoreError;
use thiserror::Error;

/// Engine-level errors
#[derive(Error, Debug)]
pub enum EngineError {
    /// Core model error
    #[error("core error: {0}")]
    Core(#[from] CoreError),

    /// The position store rejected a read or write
    #[error("position store failed for '{book_id}': {reason}")]
    Store {
        /// Book being read or written
        book_id: String,
        /// Underlying failure
        reason: String,
    },

    /// Configuration error
    #[error("invalid configuration: {0}")]
    ConfigError(String),

    /// I/O error
    #[error("I/O error: {0}")]
    IoError(String),

    /// JSON encoding error
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl From<std::io::Error> for EngineError {
    fn from(err: std::io::Error) -> Self {
        EngineError::IoError(err.to_string())
    }
}

impl From<serde_json::Error> for EngineError {
    fn from(err: serde_json::Error) -> Self {
        EngineError::Serialization(err.to_string())
    }
}

/// Result type for engine operations
pub type Result<T> = std::result::Result<T, EngineError>;
