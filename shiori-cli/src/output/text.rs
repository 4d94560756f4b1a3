//! Plain text output formatter

use super::{preview, OutputFormatter};
use anyhow::Result;
use shiori_core::SegmentedChapter;
use std::io::{self, Write};

/// One header line per chapter, then one tab-separated line per block
pub struct TextFormatter<W: Write> {
    writer: W,
    preview_chars: usize,
}

impl<W: Write> TextFormatter<W> {
    /// Create a new text formatter
    pub fn new(writer: W, preview_chars: usize) -> Self {
        Self {
            writer,
            preview_chars,
        }
    }
}

impl TextFormatter<io::Stdout> {
    /// Create a formatter that writes to stdout
    pub fn stdout(preview_chars: usize) -> Self {
        Self::new(io::stdout(), preview_chars)
    }
}

impl<W: Write + Send + Sync> OutputFormatter for TextFormatter<W> {
    fn format_chapter(&mut self, source: &str, chapter: &SegmentedChapter) -> Result<()> {
        writeln!(
            self.writer,
            "== {}: chapter {}, {} blocks, {} chars{}",
            source,
            chapter.chapter_index,
            chapter.blocks.len(),
            chapter.total_chars(),
            if chapter.is_fallback() { " (fallback)" } else { "" }
        )?;
        for block in &chapter.blocks {
            writeln!(
                self.writer,
                "{}\t{}\t{}..{}\t{}",
                block.id,
                block.kind,
                block.clean_char_start,
                block.clean_char_end(),
                preview(&block.text, self.preview_chars)
            )?;
        }
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shiori_core::Segmenter;

    #[test]
    fn test_lists_blocks_with_ranges() {
        let chapter = Segmenter::default().segment("<h1>序章</h1><p>雨が降っていた。</p>", 0);
        let mut formatter = TextFormatter::new(Vec::new(), 4);
        formatter.format_chapter("prologue.html", &chapter).unwrap();
        formatter.finish().unwrap();

        let output = String::from_utf8(formatter.writer).unwrap();
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines[0], "== prologue.html: chapter 0, 2 blocks, 10 chars");
        assert_eq!(lines[1], "ch0-b0\theading\t0..2\t序章");
        assert_eq!(lines[2], "ch0-b1\tparagraph\t2..10\t雨が降っ…");
    }
}
