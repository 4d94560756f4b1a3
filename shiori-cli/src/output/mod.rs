//! Output formatting module

use anyhow::Result;
use shiori_core::SegmentedChapter;

/// Trait for segmentation output formatters
pub trait OutputFormatter: Send + Sync {
    /// Format the blocks of one chapter
    fn format_chapter(&mut self, source: &str, chapter: &SegmentedChapter) -> Result<()>;

    /// Finalize output (e.g., close JSON array)
    fn finish(&mut self) -> Result<()>;
}

pub mod json;
pub mod markdown;
pub mod text;

pub use json::JsonFormatter;
pub use markdown::MarkdownFormatter;
pub use text::TextFormatter;

/// First `limit` characters of block text, with an ellipsis when cut
pub fn preview(block_text: &str, limit: usize) -> String {
    let head = shiori_core::text::prefix_chars(block_text, limit);
    if head.len() < block_text.len() {
        format!("{head}…")
    } else {
        head.to_string()
    }
}
