//! Error handling for the CLI application

use thiserror::Error;

/// CLI-specific failures that are not plain I/O
#[derive(Debug, Error)]
pub enum CliError {
    /// File not found or inaccessible
    #[error("File not found: {0}")]
    FileNotFound(String),

    /// A saved position file could not be parsed
    #[error("Malformed position file: {0}")]
    MalformedPosition(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Restoration could not place the position anywhere
    #[error("Restore failed: {0}")]
    RestoreFailed(String),
}

/// Result type alias for CLI operations
pub type CliResult<T> = Result<T, anyhow::Error>;
