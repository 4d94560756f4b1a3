//! Stats command implementation

use anyhow::Result;
use clap::Args;
use shiori_core::{BookStats, Segmenter};
use std::path::PathBuf;

use super::{open_output, write_json};
use crate::config::CliConfig;
use crate::input::{chapter_label, resolve_patterns, FileReader};
use crate::logging::init_logging;
use crate::progress::ProgressReporter;

/// Arguments for the stats command
#[derive(Debug, Args)]
pub struct StatsArgs {
    /// Chapter files or patterns (supports glob); sorted order is chapter order
    #[arg(short, long, value_name = "FILE/PATTERN", required = true)]
    pub input: Vec<String>,

    /// Output file (default: stdout)
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Only chapter lengths, no per-block maps
    #[arg(long)]
    pub no_block_maps: bool,

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

impl StatsArgs {
    /// Execute the stats command
    pub fn execute(&self) -> Result<()> {
        init_logging(self.verbose, self.quiet);

        let config = CliConfig::load(self.config.as_deref())?;
        let files = resolve_patterns(&self.input)?;
        let segmenter = Segmenter::new(config.segmenter.clone());

        let mut progress = ProgressReporter::new(self.quiet);
        progress.init_files(files.len() as u64);

        let mut chapters = Vec::with_capacity(files.len());
        for (index, path) in files.iter().enumerate() {
            let markup = FileReader::read_text(path)?;
            chapters.push(segmenter.segment(&markup, index));
            progress.file_completed(&chapter_label(path));
        }
        progress.finish();

        let mut stats = BookStats::from_chapters(&chapters);
        if self.no_block_maps {
            stats.block_maps = None;
        }
        log::info!(
            "{} chapters, {} chars",
            stats.chapter_count(),
            stats.total_length
        );

        let mut writer = open_output(self.output.as_deref())?;
        write_json(&mut *writer, &stats, config.output.pretty_json)
    }
}
