//! Addressable content blocks
//!
//! A block is the unit the rest of the system talks about: a paragraph,
//! heading, list item or image container selected by the segmenter. Block ids
//! are derived from chapter index and document order only, so an unchanged
//! chapter always yields the same ids.

use std::borrow::Borrow;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};

/// Stable block identifier in the form `ch{chapter}-b{order}`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlockId(String);

impl BlockId {
    /// Create the id of block `order` in chapter `chapter`
    pub fn new(chapter: usize, order: usize) -> Self {
        Self(format!("ch{chapter}-b{order}"))
    }

    /// Parse and validate an id string
    pub fn parse(raw: &str) -> Result<Self> {
        Self::split(raw)
            .map(|_| Self(raw.to_string()))
            .ok_or_else(|| CoreError::MalformedBlockId {
                id: raw.to_string(),
            })
    }

    /// Wrap a string without validation.
    ///
    /// Saved positions may carry ids from older segmenter versions; they are
    /// still compared verbatim against the live view.
    pub fn from_raw(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Chapter component, if the id is well-formed
    pub fn chapter(&self) -> Option<usize> {
        Self::split(&self.0).map(|(chapter, _)| chapter)
    }

    /// Order component, if the id is well-formed
    pub fn order(&self) -> Option<usize> {
        Self::split(&self.0).map(|(_, order)| order)
    }

    /// The id as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn split(raw: &str) -> Option<(usize, usize)> {
        let rest = raw.strip_prefix("ch")?;
        let (chapter, order) = rest.split_once("-b")?;
        let all_digits = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());
        if !all_digits(chapter) || !all_digits(order) {
            return None;
        }
        Some((chapter.parse().ok()?, order.parse().ok()?))
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for BlockId {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl Borrow<str> for BlockId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for BlockId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Structural role that made an element a block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BlockKind {
    /// `p`
    Paragraph,
    /// `h1`..`h6`
    Heading,
    /// `blockquote`
    Quote,
    /// `pre`
    Preformatted,
    /// `li`, `dt`, `dd`
    ListItem,
    /// `td`, `th`
    TableCell,
    /// `figcaption`, `caption`
    Caption,
    /// Generic container holding direct text
    Container,
    /// `figure`, `picture`, `svg`, or the parent of an image
    ImageContainer,
    /// Wrapper synthesized when nothing else qualified
    Fallback,
}

impl BlockKind {
    /// Attribute value used in processed markup
    pub fn as_str(&self) -> &'static str {
        match self {
            BlockKind::Paragraph => "paragraph",
            BlockKind::Heading => "heading",
            BlockKind::Quote => "quote",
            BlockKind::Preformatted => "preformatted",
            BlockKind::ListItem => "list-item",
            BlockKind::TableCell => "table-cell",
            BlockKind::Caption => "caption",
            BlockKind::Container => "container",
            BlockKind::ImageContainer => "image-container",
            BlockKind::Fallback => "fallback",
        }
    }
}

impl fmt::Display for BlockKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One addressable block of a rendered chapter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Block {
    /// Stable id
    pub id: BlockId,
    /// Chapter the block belongs to
    pub chapter: usize,
    /// 0-based position in document order
    pub order: usize,
    /// Structural role
    pub kind: BlockKind,
    /// Characters after cleaning (ruby annotations, scripts and whitespace removed)
    pub clean_char_count: usize,
    /// Sum of `clean_char_count` of all preceding blocks
    pub clean_char_start: usize,
    /// Cleaned text, used for snippet validation and text search
    pub text: String,
}

impl Block {
    /// Exclusive end of the block's character range
    pub fn clean_char_end(&self) -> usize {
        self.clean_char_start + self.clean_char_count
    }

    /// Whether the block owns no characters (images, empty containers)
    pub fn is_empty(&self) -> bool {
        self.clean_char_count == 0
    }
}
