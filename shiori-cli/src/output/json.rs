//! JSON output formatter

use super::OutputFormatter;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use shiori_core::{BlockId, BlockKind, SegmentedChapter};
use std::io::Write;

/// JSON formatter - outputs all chapters as one array
pub struct JsonFormatter<W: Write> {
    writer: W,
    pretty: bool,
    chapters: Vec<ChapterData>,
}

/// One chapter in JSON output
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChapterData {
    /// File the chapter came from
    pub source: String,
    /// Chapter index used for block ids
    pub chapter_index: usize,
    /// Clean characters in the chapter
    pub total_chars: usize,
    /// Whether the single-wrapper fallback was used
    pub fallback: bool,
    /// Blocks in document order
    pub blocks: Vec<BlockData>,
}

/// One block in JSON output
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockData {
    /// Block id
    pub id: BlockId,
    /// Structural kind
    pub kind: BlockKind,
    /// Chapter offset of the first clean character
    pub start: usize,
    /// Clean character count
    pub length: usize,
    /// Clean text
    pub text: String,
}

impl<W: Write> JsonFormatter<W> {
    /// Create a new JSON formatter
    pub fn new(writer: W, pretty: bool) -> Self {
        Self {
            writer,
            pretty,
            chapters: Vec::new(),
        }
    }
}

impl<W: Write + Send + Sync> OutputFormatter for JsonFormatter<W> {
    fn format_chapter(&mut self, source: &str, chapter: &SegmentedChapter) -> Result<()> {
        self.chapters.push(ChapterData {
            source: source.to_string(),
            chapter_index: chapter.chapter_index,
            total_chars: chapter.total_chars(),
            fallback: chapter.is_fallback(),
            blocks: chapter
                .blocks
                .iter()
                .map(|b| BlockData {
                    id: b.id.clone(),
                    kind: b.kind,
                    start: b.clean_char_start,
                    length: b.clean_char_count,
                    text: b.text.clone(),
                })
                .collect(),
        });
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        if self.pretty {
            serde_json::to_writer_pretty(&mut self.writer, &self.chapters)?;
        } else {
            serde_json::to_writer(&mut self.writer, &self.chapters)?;
        }
        writeln!(self.writer)?;
        self.writer.flush()?;
        Ok(())
    }
}
