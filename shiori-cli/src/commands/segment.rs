//! Segment command implementation

use anyhow::{Context, Result};
use clap::Args;
use shiori_core::Segmenter;
use std::fs;
use std::path::PathBuf;

use super::{open_output, OutputFormat};
use crate::config::CliConfig;
use crate::input::{chapter_label, resolve_patterns, FileReader};
use crate::logging::init_logging;
use crate::output::{JsonFormatter, MarkdownFormatter, OutputFormatter, TextFormatter};
use crate::progress::ProgressReporter;

/// Arguments for the segment command
#[derive(Debug, Args)]
pub struct SegmentArgs {
    /// Chapter files or patterns (supports glob); sorted order is chapter order
    #[arg(short, long, value_name = "FILE/PATTERN", required = true)]
    pub input: Vec<String>,

    /// Output file (default: stdout)
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    pub format: OutputFormat,

    /// Chapter index of the first file
    #[arg(long, value_name = "N", default_value_t = 0)]
    pub first_chapter: usize,

    /// Write markup with injected block attributes into this directory
    #[arg(short, long, value_name = "DIR")]
    pub markup_dir: Option<PathBuf>,

    /// Configuration file
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Suppress progress output
    #[arg(short, long)]
    pub quiet: bool,

    /// Increase verbosity
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl SegmentArgs {
    /// Execute the segment command
    pub fn execute(&self) -> Result<()> {
        init_logging(self.verbose, self.quiet);
        log::debug!("Arguments: {:?}", self);

        let config = CliConfig::load(self.config.as_deref())?;
        let files = resolve_patterns(&self.input)?;
        let segmenter = Segmenter::new(config.segmenter.clone());

        if let Some(dir) = &self.markup_dir {
            fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create directory: {}", dir.display()))?;
        }

        let writer = open_output(self.output.as_deref())?;
        let preview = config.output.preview_chars;
        let mut formatter: Box<dyn OutputFormatter> = match self.format {
            OutputFormat::Text => Box::new(TextFormatter::new(writer, preview)),
            OutputFormat::Json => Box::new(JsonFormatter::new(writer, config.output.pretty_json)),
            OutputFormat::Markdown => Box::new(MarkdownFormatter::new(writer, preview)),
        };

        let mut progress = ProgressReporter::new(self.quiet);
        progress.init_files(files.len() as u64);

        for (offset, path) in files.iter().enumerate() {
            let label = chapter_label(path);
            let markup = FileReader::read_text(path)?;
            let chapter = segmenter.segment(&markup, self.first_chapter + offset);
            log::info!(
                "{}: {} blocks, {} chars",
                label,
                chapter.blocks.len(),
                chapter.total_chars()
            );

            formatter.format_chapter(&label, &chapter)?;

            if let Some(dir) = &self.markup_dir {
                let target = dir.join(&label);
                fs::write(&target, &chapter.markup)
                    .with_context(|| format!("Failed to write markup: {}", target.display()))?;
            }
            progress.file_completed(&label);
        }

        progress.finish();
        formatter.finish()
    }
}
