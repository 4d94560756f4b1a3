//! Configuration module
//!
//! One TOML file with four tables: `[segmenter]`, `[reader]` (engine timing
//! and tolerances), `[layout]` (the simulated viewport used by `restore`) and
//! `[output]`. Every table and key is optional.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use shiori_core::SegmenterConfig;
use shiori_engine::{EngineConfig, LayoutMetrics};
use std::path::Path;

use crate::error::CliError;

/// CLI configuration structure
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
pub struct CliConfig {
    /// Block segmentation
    #[serde(default)]
    pub segmenter: SegmenterConfig,

    /// Detection, saving and restoration
    #[serde(default)]
    pub reader: EngineConfig,

    /// Simulated reader layout
    #[serde(default)]
    pub layout: LayoutMetrics,

    /// Output configuration
    #[serde(default)]
    pub output: OutputConfig,
}

/// Output-related configuration
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct OutputConfig {
    /// Characters of block text shown in text and markdown listings
    pub preview_chars: usize,

    /// Pretty print JSON output
    pub pretty_json: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            preview_chars: 24,
            pretty_json: true,
        }
    }
}

impl CliConfig {
    /// Load and validate a configuration file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config: {}", path.display()))?;
        let config: CliConfig = toml::from_str(&content)
            .map_err(|e| CliError::ConfigError(format!("{}: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    /// The file at `path`, or the defaults when no path was given
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => Ok(Self::default()),
        }
    }

    /// Check value ranges across all tables
    pub fn validate(&self) -> Result<()> {
        self.reader
            .validate()
            .map_err(|e| CliError::ConfigError(e.to_string()))?;

        if self.segmenter.id_attribute.trim().is_empty() {
            return Err(CliError::ConfigError("segmenter.id_attribute cannot be empty".into()).into());
        }
        if self.segmenter.id_attribute == self.segmenter.kind_attribute {
            return Err(CliError::ConfigError(
                "segmenter.id_attribute and kind_attribute must differ".into(),
            )
            .into());
        }

        let layout = &self.layout;
        if layout.viewport_width <= 0.0 || layout.viewport_height <= 0.0 {
            return Err(CliError::ConfigError("layout viewport must be positive".into()).into());
        }
        if layout.font_size_px <= 0.0 || layout.line_height <= 0.0 {
            return Err(
                CliError::ConfigError("layout font_size_px and line_height must be positive".into())
                    .into(),
            );
        }
        if layout.margin_px < 0.0 || layout.block_gap_px < 0.0 || layout.column_gap_px < 0.0 {
            return Err(CliError::ConfigError("layout spacing cannot be negative".into()).into());
        }
        Ok(())
    }
}
