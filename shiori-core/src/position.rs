//! Persisted reading position
//!
//! JSON field names are camelCase; snake_case names are accepted on read so
//! older stores keep working.

use serde::{Deserialize, Serialize};

use crate::block::BlockId;
use crate::error::Result;

/// Where the reader stopped, in symbolic and numeric form
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Position {
    /// Chapter being read
    #[serde(alias = "chapter_index")]
    pub chapter_index: usize,

    /// Page in paged mode
    #[serde(default, skip_serializing_if = "Option::is_none", alias = "page_number")]
    pub page_number: Option<usize>,

    /// Clean character offset within the chapter
    #[serde(default, skip_serializing_if = "Option::is_none", alias = "chapter_char_offset")]
    pub chapter_char_offset: Option<usize>,

    /// Clean characters before the reading edge across the whole book
    #[serde(default, alias = "total_chars_read")]
    pub total_chars_read: usize,

    /// Text of the block at the reading edge, truncated
    #[serde(default, alias = "sentence_text")]
    pub sentence_text: String,

    /// Fraction of the chapter read
    #[serde(default, alias = "chapter_progress")]
    pub chapter_progress: f64,

    /// Fraction of the book read
    #[serde(default, alias = "total_progress")]
    pub total_progress: f64,

    /// Block at the reading edge
    #[serde(default, skip_serializing_if = "Option::is_none", alias = "block_id")]
    pub block_id: Option<BlockId>,

    /// Characters into that block
    #[serde(default, skip_serializing_if = "Option::is_none", alias = "block_local_offset")]
    pub block_local_offset: Option<usize>,

    /// Clean text around the reading edge
    #[serde(default, skip_serializing_if = "Option::is_none", alias = "context_snippet")]
    pub context_snippet: Option<String>,

    /// Epoch milliseconds of the last read
    #[serde(default, skip_serializing_if = "Option::is_none", alias = "last_read")]
    pub last_read: Option<i64>,

    /// Epoch milliseconds of the last write
    #[serde(default, skip_serializing_if = "Option::is_none", alias = "last_modified")]
    pub last_modified: Option<i64>,

    /// Write counter of the device that produced this position
    #[serde(default, skip_serializing_if = "Option::is_none", alias = "sync_version")]
    pub sync_version: Option<u64>,

    /// Device that produced this position
    #[serde(default, skip_serializing_if = "Option::is_none", alias = "device_id")]
    pub device_id: Option<String>,
}

impl Position {
    /// Position at the very start of `chapter`
    pub fn chapter_start(chapter: usize) -> Self {
        Self {
            chapter_index: chapter,
            chapter_char_offset: Some(0),
            ..Self::default()
        }
    }

    /// Parse a stored position. Malformed input reads as no position.
    pub fn from_json(json: &str) -> Option<Self> {
        match serde_json::from_str(json) {
            Ok(position) => Some(position),
            Err(err) => {
                log::warn!("ignoring malformed saved position: {}", err);
                None
            }
        }
    }

    /// Serialize to JSON
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Serialize to indented JSON
    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Whether any field can locate the reading point inside the chapter
    pub fn has_locator(&self) -> bool {
        self.block_id.is_some()
            || self.chapter_char_offset.is_some()
            || self.context_snippet.as_deref().is_some_and(|s| !s.is_empty())
    }

    /// Same reading point, ignoring progress fractions and sync metadata
    pub fn same_location(&self, other: &Position) -> bool {
        self.chapter_index == other.chapter_index
            && self.block_id == other.block_id
            && self.block_local_offset == other.block_local_offset
            && self.chapter_char_offset == other.chapter_char_offset
            && self.page_number == other.page_number
    }

    /// Further into the book than `other`
    pub fn is_further_than(&self, other: &Position) -> bool {
        self.total_progress > other.total_progress
    }

    /// Modified more recently than `other`; a missing timestamp is oldest
    pub fn is_newer_than(&self, other: &Position) -> bool {
        match (self.last_modified, other.last_modified) {
            (Some(a), Some(b)) => a > b,
            (Some(_), None) => true,
            _ => false,
        }
    }

    /// Higher sync version than `other`; a missing version is lowest
    pub fn has_higher_version(&self, other: &Position) -> bool {
        match (self.sync_version, other.sync_version) {
            (Some(a), Some(b)) => a > b,
            (Some(_), None) => true,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_uses_camel_case_and_skips_absent_fields() {
        let position = Position {
            chapter_index: 2,
            block_id: Some(BlockId::new(2, 5)),
            block_local_offset: Some(12),
            ..Position::default()
        };
        let json = position.to_json().unwrap();
        assert!(json.contains("\"chapterIndex\":2"));
        assert!(json.contains("\"blockId\":\"ch2-b5\""));
        assert!(json.contains("\"blockLocalOffset\":12"));
        assert!(!json.contains("pageNumber"));
    }

    #[test]
    fn test_reads_snake_case_aliases() {
        let json = r#"{"chapter_index":1,"block_id":"ch1-b0","block_local_offset":3,"context_snippet":"abc"}"#;
        let position = Position::from_json(json).unwrap();
        assert_eq!(position.chapter_index, 1);
        assert_eq!(position.block_local_offset, Some(3));
        assert_eq!(position.context_snippet.as_deref(), Some("abc"));
    }

    #[test]
    fn test_malformed_json_is_absent() {
        assert!(Position::from_json("{not json").is_none());
        assert!(Position::from_json(r#"{"chapterIndex":-1}"#).is_none());
        assert!(Position::from_json(r#"{"blockId":"ch0-b0"}"#).is_none());
    }

    #[test]
    fn test_has_locator() {
        assert!(!Position::default().has_locator());
        assert!(Position::chapter_start(3).has_locator());
        let empty_snippet = Position {
            context_snippet: Some(String::new()),
            ..Position::default()
        };
        assert!(!empty_snippet.has_locator());
    }

    #[test]
    fn test_comparisons() {
        let older = Position {
            total_progress: 0.2,
            last_modified: Some(10),
            sync_version: Some(1),
            ..Position::default()
        };
        let newer = Position {
            total_progress: 0.4,
            last_modified: Some(20),
            sync_version: None,
            ..Position::default()
        };
        assert!(newer.is_further_than(&older));
        assert!(newer.is_newer_than(&older));
        assert!(older.has_higher_version(&newer));
        assert!(!Position::default().is_newer_than(&Position::default()));
    }
}
