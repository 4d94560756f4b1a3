//! Position building
//!
//! Turns "block X, N characters in" into a persistable [`Position`] with
//! offsets, progress fractions and a context snippet for later validation.

use crate::block::BlockId;
use crate::error::{CoreError, Result};
use crate::position::Position;
use crate::segmenter::SegmentedChapter;
use crate::stats::{ratio, BookStats};
use crate::text;

/// Default characters kept on each side of the reading edge
pub const DEFAULT_SNIPPET_RADIUS: usize = 20;

/// Default length of `sentence_text`
pub const DEFAULT_SENTENCE_LIMIT: usize = 200;

/// Builds positions for one book
#[derive(Debug, Clone)]
pub struct PositionBuilder<'a> {
    stats: Option<&'a BookStats>,
    snippet_radius: usize,
    sentence_limit: usize,
}

impl Default for PositionBuilder<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> PositionBuilder<'a> {
    /// Builder without book statistics; book progress equals chapter progress
    pub fn new() -> Self {
        Self {
            stats: None,
            snippet_radius: DEFAULT_SNIPPET_RADIUS,
            sentence_limit: DEFAULT_SENTENCE_LIMIT,
        }
    }

    /// Use book statistics for book-wide progress
    pub fn with_stats(mut self, stats: &'a BookStats) -> Self {
        self.stats = Some(stats);
        self
    }

    /// Set the snippet radius
    pub fn snippet_radius(mut self, radius: usize) -> Self {
        self.snippet_radius = radius;
        self
    }

    /// Set the maximum `sentence_text` length
    pub fn sentence_limit(mut self, limit: usize) -> Self {
        self.sentence_limit = limit;
        self
    }

    /// Position `local` characters into block `block_id`.
    ///
    /// The local offset is clamped to the block length.
    pub fn build(&self, chapter: &SegmentedChapter, block_id: &str, local: usize) -> Result<Position> {
        let block = chapter
            .block(block_id)
            .ok_or_else(|| CoreError::UnknownBlock {
                id: block_id.to_string(),
            })?;

        let local = local.min(block.clean_char_count);
        let chapter_offset = block.clean_char_start + local;
        let chapter_index = chapter.chapter_index;

        let chapter_len = self
            .stats
            .and_then(|s| s.chapter_length(chapter_index))
            .unwrap_or_else(|| chapter.total_chars());
        let (before, book_len) = match self.stats {
            Some(stats) => (stats.chars_before(chapter_index), stats.total_length),
            None => (0, chapter_len),
        };
        let total_chars_read = before + chapter_offset;

        let snippet = text::snippet_around(&block.text, local, self.snippet_radius);

        Ok(Position {
            chapter_index,
            page_number: None,
            chapter_char_offset: Some(chapter_offset),
            total_chars_read,
            sentence_text: text::prefix_chars(&block.text, self.sentence_limit).to_string(),
            chapter_progress: ratio(chapter_offset, chapter_len),
            total_progress: ratio(total_chars_read, book_len),
            block_id: Some(BlockId::from_raw(block_id)),
            block_local_offset: Some(local),
            context_snippet: (!snippet.is_empty()).then(|| snippet.to_string()),
            ..Position::default()
        })
    }

    /// Position at a chapter offset, resolved through the offset index
    pub fn build_at_offset(&self, chapter: &SegmentedChapter, offset: usize) -> Result<Position> {
        let entry = chapter
            .index
            .at_offset(offset)
            .ok_or_else(|| CoreError::InvalidIndex {
                reason: format!("chapter {} has no blocks", chapter.chapter_index),
            })?;
        let local = offset.saturating_sub(entry.start);
        let id = entry.block_id.clone();
        self.build(chapter, id.as_str(), local)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::segmenter::Segmenter;

    fn chapter() -> SegmentedChapter {
        let first = "a".repeat(80);
        let second: String = ('A'..='Z').cycle().take(120).collect();
        Segmenter::default().segment(&format!("<p>{first}</p><p>{second}</p>"), 0)
    }

    #[test]
    fn test_build_fills_offsets_and_snippet() {
        let chapter = chapter();
        let position = PositionBuilder::new().build(&chapter, "ch0-b1", 40).unwrap();
        assert_eq!(position.chapter_char_offset, Some(120));
        assert_eq!(position.block_local_offset, Some(40));
        assert!((position.chapter_progress - 0.6).abs() < 1e-9);
        assert_eq!(position.total_chars_read, 120);

        let snippet = position.context_snippet.unwrap();
        assert_eq!(snippet.chars().count(), 40);
        assert!(chapter.blocks[1].text.contains(&snippet));
    }

    #[test]
    fn test_build_with_book_stats() {
        let chapter = chapter();
        let stats = BookStats::from_lengths(vec![200, 200]);
        let mut shifted = chapter.clone();
        shifted.chapter_index = 1;
        for block in &mut shifted.blocks {
            block.id = BlockId::new(1, block.order);
        }
        shifted.index = crate::index::OffsetIndex::from_blocks(&shifted.blocks);

        let position = PositionBuilder::new()
            .with_stats(&stats)
            .build(&shifted, "ch1-b0", 0)
            .unwrap();
        assert_eq!(position.total_chars_read, 200);
        assert!((position.total_progress - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_local_offset_is_clamped() {
        let position = PositionBuilder::new().build(&chapter(), "ch0-b0", 999).unwrap();
        assert_eq!(position.block_local_offset, Some(80));
        assert_eq!(position.chapter_char_offset, Some(80));
    }

    #[test]
    fn test_unknown_block_is_an_error() {
        let result = PositionBuilder::new().build(&chapter(), "ch0-b9", 0);
        assert!(matches!(result, Err(CoreError::UnknownBlock { .. })));
    }

    #[test]
    fn test_build_at_offset_resolves_block() {
        let position = PositionBuilder::new()
            .sentence_limit(5)
            .build_at_offset(&chapter(), 150)
            .unwrap();
        assert_eq!(position.block_id.unwrap().as_str(), "ch0-b1");
        assert_eq!(position.block_local_offset, Some(70));
        assert_eq!(position.sentence_text, "ABCDE");
    }
}
