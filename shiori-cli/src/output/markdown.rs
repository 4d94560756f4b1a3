//! Markdown output formatter

use super::{preview, OutputFormatter};
use anyhow::Result;
use shiori_core::SegmentedChapter;
use std::io::Write;

/// Markdown formatter - one table per chapter
pub struct MarkdownFormatter<W: Write> {
    writer: W,
    preview_chars: usize,
    chapter_count: usize,
    block_count: usize,
}

impl<W: Write> MarkdownFormatter<W> {
    /// Create a new markdown formatter
    pub fn new(writer: W, preview_chars: usize) -> Self {
        Self {
            writer,
            preview_chars,
            chapter_count: 0,
            block_count: 0,
        }
    }
}

impl<W: Write + Send + Sync> OutputFormatter for MarkdownFormatter<W> {
    fn format_chapter(&mut self, source: &str, chapter: &SegmentedChapter) -> Result<()> {
        self.chapter_count += 1;
        self.block_count += chapter.blocks.len();

        writeln!(self.writer, "## {} (chapter {})", source, chapter.chapter_index)?;
        writeln!(self.writer)?;
        writeln!(self.writer, "| id | kind | range | text |")?;
        writeln!(self.writer, "|----|------|-------|------|")?;
        for block in &chapter.blocks {
            writeln!(
                self.writer,
                "| {} | {} | {}..{} | {} |",
                block.id,
                block.kind,
                block.clean_char_start,
                block.clean_char_end(),
                preview(&block.text, self.preview_chars).replace('|', "\\|")
            )?;
        }
        writeln!(self.writer)?;
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        writeln!(self.writer, "---")?;
        writeln!(
            self.writer,
            "*Total: {} chapters, {} blocks*",
            self.chapter_count, self.block_count
        )?;
        self.writer.flush()?;
        Ok(())
    }
}
