//! Restore command implementation
//!
//! Re-renders one chapter in a simulated layout and runs the restoration
//! cascade for a saved position against it.

use anyhow::{Context, Result};
use clap::{Args, ValueEnum};
use serde::Serialize;
use shiori_core::{BookStats, OffsetIndex, Segmenter};
use shiori_engine::{
    LayoutOracle, PageRelocation, RelocationStrategy, RestorationResult, RestoreMethod, Restorer,
    ScrollRelocation, SimulatedLayout, WritingMode,
};
use std::io::Write;
use std::path::PathBuf;

use super::{open_output, write_json};
use crate::config::CliConfig;
use crate::error::CliError;
use crate::input::FileReader;
use crate::logging::init_logging;

/// Report formats for a restoration
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ReportFormat {
    /// Human-readable lines
    Text,
    /// JSON object
    Json,
}

/// Arguments for the restore command
#[derive(Debug, Args)]
pub struct RestoreArgs {
    /// Chapter markup as it is rendered now
    #[arg(short, long, value_name = "FILE")]
    pub input: PathBuf,

    /// Saved position (JSON)
    #[arg(short, long, value_name = "FILE")]
    pub position: PathBuf,

    /// Chapter index of the markup (default: the saved position's chapter)
    #[arg(long, value_name = "N")]
    pub chapter_index: Option<usize>,

    /// Book statistics whose block maps supply the offset index
    #[arg(short, long, value_name = "FILE")]
    pub stats: Option<PathBuf>,

    /// Paginated layout
    #[arg(long)]
    pub paged: bool,

    /// Vertical right-to-left text
    #[arg(long)]
    pub vertical: bool,

    /// Output file (default: stdout)
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Report format
    #[arg(short, long, value_enum, default_value = "text")]
    pub format: ReportFormat,

    /// Exit with an error when nothing could be restored
    #[arg(long)]
    pub strict: bool,

    /// Configuration file
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Suppress informational output
    #[arg(short, long)]
    pub quiet: bool,

    /// Increase verbosity
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RestoreReport {
    #[serde(flatten)]
    result: RestorationResult,
    #[serde(skip_serializing_if = "Option::is_none")]
    snippet: Option<String>,
    scroll_position: f64,
}

impl RestoreArgs {
    /// Execute the restore command
    pub fn execute(&self) -> Result<()> {
        init_logging(self.verbose, self.quiet);

        let config = CliConfig::load(self.config.as_deref())?;
        let position = FileReader::read_position(&self.position)?;
        let markup = FileReader::read_text(&self.input)?;

        let chapter_index = self.chapter_index.unwrap_or(position.chapter_index);
        let chapter = Segmenter::new(config.segmenter.clone()).segment(&markup, chapter_index);

        let index = match &self.stats {
            Some(path) => {
                let stats: BookStats = FileReader::read_json(path)?;
                stats
                    .chapter_index(chapter_index)
                    .with_context(|| format!("Invalid block maps in {}", path.display()))?
            }
            None => None,
        };
        let index: &OffsetIndex = index.as_ref().unwrap_or(&chapter.index);

        let mut metrics = config.layout.clone();
        metrics.paginated |= self.paged;
        if self.vertical {
            metrics.writing_mode = WritingMode::VerticalRl;
        }
        let mut layout = SimulatedLayout::new(&chapter, metrics.clone());

        let radius = config.reader.snippet_radius;
        let result = if metrics.paginated {
            let restorer = Restorer::new(PageRelocation::new()).with_snippet_radius(radius);
            run(restorer, &position, &chapter, index, &mut layout)
        } else {
            let threshold = config.reader.precise_offset_threshold;
            run(
                Restorer::new(ScrollRelocation::new(threshold)).with_snippet_radius(radius),
                &position,
                &chapter,
                index,
                &mut layout,
            )
        };

        let snippet = match (&result.block_id, result.local_offset) {
            (Some(id), Some(local)) => chapter.block(id.as_str()).map(|block| {
                shiori_core::text::snippet_around(&block.text, local, config.reader.snippet_radius)
                    .to_string()
            }),
            _ => None,
        };

        let report = RestoreReport {
            result,
            snippet,
            scroll_position: layout.scroll_position(),
        };

        let mut writer = open_output(self.output.as_deref())?;
        match self.format {
            ReportFormat::Json => write_json(&mut *writer, &report, config.output.pretty_json)?,
            ReportFormat::Text => write_text(&mut *writer, &report)?,
        }

        if self.strict && report.result.method == RestoreMethod::Failed {
            return Err(CliError::RestoreFailed(self.position.display().to_string()).into());
        }
        Ok(())
    }
}

fn run<R: RelocationStrategy>(
    mut restorer: Restorer<R>,
    position: &shiori_core::Position,
    chapter: &shiori_core::SegmentedChapter,
    index: &OffsetIndex,
    layout: &mut SimulatedLayout,
) -> RestorationResult {
    if !layout.is_mounted() {
        log::warn!("chapter is not mounted; restoring anyway");
    }
    restorer.restore(position, chapter, Some(index), layout)
}

fn write_text(writer: &mut dyn Write, report: &RestoreReport) -> Result<()> {
    let result = &report.result;
    writeln!(writer, "method:      {}", result.method)?;
    writeln!(writer, "confidence:  {}", result.confidence)?;
    match (&result.block_id, result.local_offset) {
        (Some(id), Some(local)) => writeln!(writer, "block:       {} +{}", id, local)?,
        _ => writeln!(writer, "block:       -")?,
    }
    match result.chapter_offset {
        Some(offset) => writeln!(writer, "offset:      {}", offset)?,
        None => writeln!(writer, "offset:      -")?,
    }
    if let Some(page) = result.page {
        writeln!(writer, "page:        {}", page)?;
    }
    let degradations = if result.degradations.is_empty() {
        "none".to_string()
    } else {
        result
            .degradations
            .iter()
            .map(|d| d.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    };
    writeln!(writer, "degraded:    {}", degradations)?;
    if let Some(snippet) = &report.snippet {
        writeln!(writer, "snippet:     {}", snippet)?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use shiori_engine::{Confidence, Degradation};

    fn report(method: RestoreMethod, degradations: Vec<Degradation>) -> RestoreReport {
        RestoreReport {
            result: RestorationResult {
                method,
                confidence: Confidence::Medium,
                block_id: Some(shiori_core::BlockId::new(0, 2)),
                local_offset: Some(7),
                chapter_offset: Some(131),
                page: None,
                degradations,
            },
            snippet: Some("雨が降っていた".to_string()),
            scroll_position: 0.0,
        }
    }

    #[test]
    fn test_text_report_lines() {
        let mut out = Vec::new();
        write_text(
            &mut out,
            &report(RestoreMethod::BlockMap, vec![Degradation::StructuralMismatch]),
        )
        .unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("method:      block-map"));
        assert!(text.contains("confidence:  medium"));
        assert!(text.contains("block:       ch0-b2 +7"));
        assert!(text.contains("offset:      131"));
        assert!(text.contains("degraded:    structural-mismatch"));
        assert!(text.contains("snippet:     雨が降っていた"));
        assert!(!text.contains("page:"));
    }

    #[test]
    fn test_json_report_is_flat() {
        let value = serde_json::to_value(report(RestoreMethod::Block, Vec::new())).unwrap();
        assert_eq!(value["method"], "block");
        assert_eq!(value["chapterOffset"], 131);
        assert_eq!(value["snippet"], "雨が降っていた");
        assert!(value.get("result").is_none());
    }
}
