//! Per-chapter character offset index
//!
//! Maps block ids to half-open ranges of clean characters. The entries
//! partition `[0, total)`: sorted by start, contiguous, no overlaps.

use std::collections::HashMap;

use serde::Serialize;

use crate::block::{Block, BlockId};
use crate::error::{CoreError, Result};
use crate::stats::BlockIndexMap;

/// One block's character range
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexEntry {
    /// Block owning the range
    pub block_id: BlockId,
    /// First character offset (inclusive)
    pub start: usize,
    /// Number of characters
    pub len: usize,
}

impl IndexEntry {
    /// Exclusive end offset
    pub fn end(&self) -> usize {
        self.start + self.len
    }

    /// Whether `offset` falls inside this entry
    pub fn contains(&self, offset: usize) -> bool {
        offset >= self.start && offset < self.end()
    }
}

/// Offset index over one chapter's blocks
#[derive(Debug, Clone, Default)]
pub struct OffsetIndex {
    entries: Vec<IndexEntry>,
    by_id: HashMap<BlockId, usize>,
    total: usize,
}

impl OffsetIndex {
    /// Build from segmenter output. Blocks are already contiguous.
    pub fn from_blocks(blocks: &[Block]) -> Self {
        let entries = blocks
            .iter()
            .map(|b| IndexEntry {
                block_id: b.id.clone(),
                start: b.clean_char_start,
                len: b.clean_char_count,
            })
            .collect();
        Self::assemble(entries)
    }

    /// Build from arbitrary entries, validating the partition invariant.
    pub fn from_entries(mut entries: Vec<IndexEntry>) -> Result<Self> {
        entries.sort_by_key(|e| e.start);

        let mut expected = 0;
        for entry in &entries {
            if entry.start != expected {
                return Err(CoreError::InvalidIndex {
                    reason: format!(
                        "block {} starts at {} but the previous block ends at {}",
                        entry.block_id, entry.start, expected
                    ),
                });
            }
            expected = entry.end();
        }

        let index = Self::assemble(entries);
        if index.by_id.len() != index.entries.len() {
            return Err(CoreError::InvalidIndex {
                reason: "duplicate block ids".to_string(),
            });
        }
        Ok(index)
    }

    /// Build the index of one chapter from precomputed book block maps.
    pub fn from_block_maps(maps: &[BlockIndexMap], chapter: usize) -> Result<Self> {
        let mut entries = Vec::new();
        for map in maps {
            if map.block_id.chapter() != Some(chapter) {
                continue;
            }
            if map.end_offset < map.start_offset {
                return Err(CoreError::InvalidIndex {
                    reason: format!(
                        "block {} ends at {} before it starts at {}",
                        map.block_id, map.end_offset, map.start_offset
                    ),
                });
            }
            entries.push(IndexEntry {
                block_id: map.block_id.clone(),
                start: map.start_offset,
                len: map.end_offset - map.start_offset,
            });
        }
        Self::from_entries(entries)
    }

    fn assemble(entries: Vec<IndexEntry>) -> Self {
        let by_id = entries
            .iter()
            .enumerate()
            .map(|(i, e)| (e.block_id.clone(), i))
            .collect();
        let total = entries.last().map_or(0, IndexEntry::end);
        Self {
            entries,
            by_id,
            total,
        }
    }

    /// Entry for a block id
    pub fn by_id(&self, id: &str) -> Option<&IndexEntry> {
        self.ordinal(id).and_then(|i| self.entries.get(i))
    }

    /// Document-order position of a block id
    pub fn ordinal(&self, id: &str) -> Option<usize> {
        self.by_id.get(id).copied()
    }

    /// The block owning `offset`, clamped into `[0, total)`.
    ///
    /// Returns `None` only for an empty index. A chapter without any
    /// characters resolves every offset to its first block.
    pub fn at_offset(&self, offset: usize) -> Option<&IndexEntry> {
        if self.total == 0 {
            return self.entries.first();
        }
        let clamped = offset.min(self.total - 1);
        let idx = self.entries.partition_point(|e| e.end() <= clamped);
        self.entries.get(idx)
    }

    /// Chapter offset of `local` characters into block `id`
    pub fn char_offset_of(&self, id: &str, local: usize) -> Option<usize> {
        self.by_id(id).map(|e| e.start + local.min(e.len))
    }

    /// Offset of `chapter_offset` relative to the start of block `id`
    pub fn local_offset_of(&self, id: &str, chapter_offset: usize) -> Option<usize> {
        self.by_id(id).map(|e| chapter_offset.saturating_sub(e.start))
    }

    /// Total clean characters covered
    pub fn total(&self) -> usize {
        self.total
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the index has no entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in document order
    pub fn entries(&self) -> &[IndexEntry] {
        &self.entries
    }
}
