//! Generate config command implementation

use anyhow::{Context, Result};
use clap::{Args, ValueEnum};
use shiori_core::SegmenterConfig;
use shiori_engine::{EngineConfig, LayoutMetrics, WritingMode};
use std::path::PathBuf;

use crate::config::OutputConfig;

/// Timing presets for the `[reader]` table
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Preset {
    /// Balanced defaults
    Default,
    /// Short debounce and lock
    Responsive,
    /// Rare writes and long waits for slow renders
    Conservative,
}

impl Preset {
    fn reader_config(self) -> EngineConfig {
        match self {
            Preset::Default => EngineConfig::default(),
            Preset::Responsive => EngineConfig::responsive(),
            Preset::Conservative => EngineConfig::conservative(),
        }
    }
}

/// Arguments for the generate-config command
#[derive(Debug, Args)]
pub struct GenerateConfigArgs {
    /// Output file path
    #[arg(short, long, value_name = "FILE", required = true)]
    pub output: PathBuf,

    /// Reader timing preset
    #[arg(short, long, value_enum, default_value = "default")]
    pub preset: Preset,
}

impl GenerateConfigArgs {
    /// Execute the generate-config command
    pub fn execute(&self) -> Result<()> {
        use std::fs;

        println!("Generating configuration template...");
        println!("  Preset: {:?}", self.preset);
        println!("  Output file: {}", self.output.display());

        let template = self.generate_template();
        fs::write(&self.output, template)
            .with_context(|| format!("Failed to write to {}", self.output.display()))?;

        println!("✓ Configuration template generated successfully!");
        println!();
        println!("Next steps:");
        println!("1. Edit the timing and layout values");
        println!("2. Validate your configuration:");
        println!("   shiori validate -c {}", self.output.display());
        println!("3. Use it for restoring:");
        println!(
            "   shiori restore -i chapter.html -p position.json -c {}",
            self.output.display()
        );

        Ok(())
    }

    /// Generate template configuration content
    fn generate_template(&self) -> String {
        let segmenter = SegmenterConfig::default();
        let reader = self.preset.reader_config();
        let layout = LayoutMetrics::default();
        let output = OutputConfig::default();
        let writing_mode = match layout.writing_mode {
            WritingMode::HorizontalTb => "horizontal-tb",
            WritingMode::VerticalRl => "vertical-rl",
        };

        format!(
            r#"# shiori configuration ({preset:?} preset)

[segmenter]
# Attribute written onto every block element
id_attribute = "{id_attribute}"
kind_attribute = "{kind_attribute}"
# Figures and image-only paragraphs become zero-length blocks
include_image_blocks = {include_image_blocks}

[reader]
# Quiet period before a position is written (ms)
debounce_ms = {debounce_ms}
extra_save_delay_ms = {extra_save_delay_ms}
# Saving is locked this long after a trusted restore (ms)
restore_lock_ms = {restore_lock_ms}
# Wait after scroll or page events before re-detecting (ms)
settle_delay_ms = {settle_delay_ms}
# Reading band as a fraction of the viewport
reading_band_ratio = {reading_band_ratio:?}
# Block offsets up to this many characters restore to the block start
precise_offset_threshold = {precise_offset_threshold}
snippet_radius = {snippet_radius}
mount_poll_interval_ms = {mount_poll_interval_ms}
mount_poll_max_attempts = {mount_poll_max_attempts}
layout_settle_ms = {layout_settle_ms}
# device_id = "my-phone"

[layout]
viewport_width = {viewport_width:?}
viewport_height = {viewport_height:?}
font_size_px = {font_size_px:?}
line_height = {line_height:?}
margin_px = {margin_px:?}
block_gap_px = {block_gap_px:?}
image_extent_px = {image_extent_px:?}
# "horizontal-tb" or "vertical-rl"
writing_mode = "{writing_mode}"
paginated = {paginated}
column_gap_px = {column_gap_px:?}

[output]
preview_chars = {preview_chars}
pretty_json = {pretty_json}
"#,
            preset = self.preset,
            id_attribute = segmenter.id_attribute,
            kind_attribute = segmenter.kind_attribute,
            include_image_blocks = segmenter.include_image_blocks,
            debounce_ms = reader.debounce_ms,
            extra_save_delay_ms = reader.extra_save_delay_ms,
            restore_lock_ms = reader.restore_lock_ms,
            settle_delay_ms = reader.settle_delay_ms,
            reading_band_ratio = reader.reading_band_ratio,
            precise_offset_threshold = reader.precise_offset_threshold,
            snippet_radius = reader.snippet_radius,
            mount_poll_interval_ms = reader.mount_poll_interval_ms,
            mount_poll_max_attempts = reader.mount_poll_max_attempts,
            layout_settle_ms = reader.layout_settle_ms,
            viewport_width = layout.viewport_width,
            viewport_height = layout.viewport_height,
            font_size_px = layout.font_size_px,
            line_height = layout.line_height,
            margin_px = layout.margin_px,
            block_gap_px = layout.block_gap_px,
            image_extent_px = layout.image_extent_px,
            writing_mode = writing_mode,
            paginated = layout.paginated,
            column_gap_px = layout.column_gap_px,
            preview_chars = output.preview_chars,
            pretty_json = output.pretty_json,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CliConfig;
    use tempfile::TempDir;

    #[test]
    fn test_default_template_parses_to_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("shiori.toml");
        GenerateConfigArgs {
            output: path.clone(),
            preset: Preset::Default,
        }
        .execute()
        .unwrap();

        let config = CliConfig::from_file(&path).unwrap();
        assert_eq!(config, CliConfig::default());
    }

    #[test]
    fn test_preset_changes_reader_table() {
        let args = GenerateConfigArgs {
            output: PathBuf::from("unused.toml"),
            preset: Preset::Conservative,
        };
        let config: CliConfig = toml::from_str(&args.generate_template()).unwrap();
        assert_eq!(config.reader, EngineConfig::conservative());
        assert_eq!(config.layout, LayoutMetrics::default());
    }
}
