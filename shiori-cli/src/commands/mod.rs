//! CLI command implementations

use anyhow::{Context, Result};
use clap::Subcommand;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

pub mod generate_config;
pub mod merge;
pub mod restore;
pub mod segment;
pub mod stats;
pub mod validate;

/// Available CLI commands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Split chapter markup into addressable blocks
    Segment(segment::SegmentArgs),

    /// Compute book statistics (chapter lengths and block maps)
    Stats(stats::StatsArgs),

    /// Restore a saved position into a simulated re-render
    Restore(restore::RestoreArgs),

    /// Merge local and remote position maps from two devices
    Merge(merge::MergeArgs),

    /// Write a configuration template
    GenerateConfig(generate_config::GenerateConfigArgs),

    /// Validate a configuration file
    Validate(validate::ValidateArgs),
}

impl Commands {
    /// Run the selected command
    pub fn execute(&self) -> Result<()> {
        match self {
            Commands::Segment(args) => args.execute(),
            Commands::Stats(args) => args.execute(),
            Commands::Restore(args) => args.execute(),
            Commands::Merge(args) => args.execute(),
            Commands::GenerateConfig(args) => args.execute(),
            Commands::Validate(args) => args.execute(),
        }
    }
}

/// Supported listing formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// One tab-separated line per block
    Text,
    /// JSON array of chapters with their blocks
    Json,
    /// Markdown table per chapter
    Markdown,
}

/// `path`, or stdout when absent
pub(crate) fn open_output(path: Option<&Path>) -> Result<Box<dyn Write + Send + Sync>> {
    match path {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create output file: {}", path.display()))?;
            Ok(Box::new(BufWriter::new(file)))
        }
        None => Ok(Box::new(io::stdout())),
    }
}

/// Serialize `value` as JSON to `writer`
pub(crate) fn write_json<T: serde::Serialize>(
    writer: &mut dyn Write,
    value: &T,
    pretty: bool,
) -> Result<()> {
    if pretty {
        serde_json::to_writer_pretty(&mut *writer, value)?;
    } else {
        serde_json::to_writer(&mut *writer, value)?;
    }
    writeln!(writer)?;
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_commands_debug_format() {
        let command = Commands::Validate(validate::ValidateArgs {
            config: "shiori.toml".into(),
        });
        let debug_str = format!("{:?}", command);
        assert!(debug_str.contains("Validate"));
        assert!(debug_str.contains("shiori.toml"));
    }

    #[test]
    fn test_open_output_writes_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.json");
        {
            let mut writer = open_output(Some(&path)).unwrap();
            write_json(&mut *writer, &vec![1, 2], false).unwrap();
        }
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "[1,2]\n");
    }

    #[test]
    fn test_open_output_reports_bad_path() {
        let err = open_output(Some(Path::new("/nonexistent/dir/out.txt"))).err().unwrap();
        assert!(err.to_string().contains("Failed to create output file"));
    }
}
