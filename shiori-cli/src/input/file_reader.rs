//! File reading utilities

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use shiori_core::Position;
use std::fs;
use std::path::Path;

use crate::error::CliError;

/// Reads chapter markup and JSON side files
pub struct FileReader;

impl FileReader {
    /// Read a file as UTF-8 text
    pub fn read_text(path: &Path) -> Result<String> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read file: {}", path.display()))?;

        Ok(content)
    }

    /// Read and deserialize a JSON file
    pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
        let content = Self::read_text(path)?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse JSON: {}", path.display()))
    }

    /// Read a saved position.
    ///
    /// Unlike the stores, which treat a malformed position as absent, an
    /// explicitly named file that does not parse is an error.
    pub fn read_position(path: &Path) -> Result<Position> {
        let content = Self::read_text(path)?;
        Position::from_json(&content)
            .ok_or_else(|| CliError::MalformedPosition(path.display().to_string()).into())
    }
}
