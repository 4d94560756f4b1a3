//! Whole-book statistics
//!
//! Chapter lengths are needed to turn a chapter offset into book-wide
//! progress. Block maps are optional: when present, an offset index can be
//! rebuilt for a chapter without re-segmenting it.

use serde::{Deserialize, Serialize};

use crate::block::BlockId;
use crate::error::{CoreError, Result};
use crate::index::OffsetIndex;
use crate::segmenter::SegmentedChapter;

/// Precomputed character range of one block
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockIndexMap {
    /// Block id (`ch{chapter}-b{order}`)
    #[serde(alias = "block_id")]
    pub block_id: BlockId,
    /// Chapter offset of the first character
    #[serde(alias = "start_offset")]
    pub start_offset: usize,
    /// Chapter offset one past the last character
    #[serde(alias = "end_offset")]
    pub end_offset: usize,
}

/// Character counts for a whole book
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookStats {
    /// Clean characters per chapter
    #[serde(alias = "chapter_lengths")]
    pub chapter_lengths: Vec<usize>,
    /// Sum of `chapter_lengths`
    #[serde(alias = "total_length")]
    pub total_length: usize,
    /// Per-block ranges across all chapters
    #[serde(default, skip_serializing_if = "Option::is_none", alias = "block_maps")]
    pub block_maps: Option<Vec<BlockIndexMap>>,
}

impl BookStats {
    /// Statistics from already segmented chapters, block maps included.
    ///
    /// Chapters are placed by their own `chapter_index`; gaps count as empty.
    pub fn from_chapters(chapters: &[SegmentedChapter]) -> Self {
        let count = chapters
            .iter()
            .map(|c| c.chapter_index + 1)
            .max()
            .unwrap_or(0);
        let mut chapter_lengths = vec![0; count];
        let mut block_maps = Vec::new();

        for chapter in chapters {
            chapter_lengths[chapter.chapter_index] = chapter.total_chars();
            block_maps.extend(chapter.blocks.iter().map(|b| BlockIndexMap {
                block_id: b.id.clone(),
                start_offset: b.clean_char_start,
                end_offset: b.clean_char_end(),
            }));
        }

        Self::from_lengths(chapter_lengths).with_block_maps(block_maps)
    }

    /// Statistics from chapter lengths alone
    pub fn from_lengths(chapter_lengths: Vec<usize>) -> Self {
        let total_length = chapter_lengths.iter().sum();
        Self {
            chapter_lengths,
            total_length,
            block_maps: None,
        }
    }

    /// Attach block maps
    pub fn with_block_maps(mut self, maps: Vec<BlockIndexMap>) -> Self {
        self.block_maps = Some(maps);
        self
    }

    /// Number of chapters
    pub fn chapter_count(&self) -> usize {
        self.chapter_lengths.len()
    }

    /// Clean length of one chapter
    pub fn chapter_length(&self, chapter: usize) -> Option<usize> {
        self.chapter_lengths.get(chapter).copied()
    }

    /// Characters in all chapters before `chapter`
    pub fn chars_before(&self, chapter: usize) -> usize {
        self.chapter_lengths.iter().take(chapter).sum()
    }

    /// Book-wide progress of `offset` characters into `chapter`, in `[0, 1]`
    pub fn total_progress(&self, chapter: usize, offset: usize) -> f64 {
        ratio(self.chars_before(chapter) + offset, self.total_length)
    }

    /// Rebuild the offset index of `chapter` from block maps.
    ///
    /// `Ok(None)` when the statistics carry no block maps.
    pub fn chapter_index(&self, chapter: usize) -> Result<Option<OffsetIndex>> {
        if chapter >= self.chapter_count() {
            return Err(CoreError::ChapterOutOfRange {
                index: chapter,
                count: self.chapter_count(),
            });
        }
        match &self.block_maps {
            Some(maps) => OffsetIndex::from_block_maps(maps, chapter).map(Some),
            None => Ok(None),
        }
    }

    /// Parse from JSON
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Serialize to pretty JSON
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// `part / whole` clamped to `[0, 1]`; zero when `whole` is zero
pub fn ratio(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    (part as f64 / whole as f64).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::segmenter::Segmenter;

    #[test]
    fn test_from_chapters_collects_lengths_and_maps() {
        let segmenter = Segmenter::default();
        let chapters = vec![
            segmenter.segment("<p>abcd</p><p>ef</p>", 0),
            segmenter.segment("<p>ghi</p>", 1),
        ];
        let stats = BookStats::from_chapters(&chapters);
        assert_eq!(stats.chapter_lengths, vec![6, 3]);
        assert_eq!(stats.total_length, 9);
        assert_eq!(stats.block_maps.as_ref().map(Vec::len), Some(3));

        let index = stats.chapter_index(0).unwrap().unwrap();
        assert_eq!(index.at_offset(5).unwrap().block_id.as_str(), "ch0-b1");
    }

    #[test]
    fn test_progress_math() {
        let stats = BookStats::from_lengths(vec![100, 300]);
        assert_eq!(stats.chars_before(1), 100);
        assert!((stats.total_progress(1, 100) - 0.5).abs() < f64::EPSILON);
        assert_eq!(stats.total_progress(1, 10_000), 1.0);
        assert_eq!(ratio(5, 0), 0.0);
    }

    #[test]
    fn test_chapter_index_errors() {
        let stats = BookStats::from_lengths(vec![10]);
        assert!(matches!(stats.chapter_index(0), Ok(None)));
        assert!(matches!(
            stats.chapter_index(3),
            Err(CoreError::ChapterOutOfRange { index: 3, count: 1 })
        ));
    }

    #[test]
    fn test_json_accepts_both_casings() {
        let camel = r#"{"chapterLengths":[3,4],"totalLength":7}"#;
        let snake = r#"{"chapter_lengths":[3,4],"total_length":7,"block_maps":[{"block_id":"ch0-b0","start_offset":0,"end_offset":3}]}"#;
        assert_eq!(BookStats::from_json(camel).unwrap().total_length, 7);
        let parsed = BookStats::from_json(snake).unwrap();
        assert_eq!(parsed.block_maps.unwrap()[0].end_offset, 3);
    }
}
