//! Block segmentation and position model for re-rendered HTML chapters
//!
//! Chapters are re-rendered on every load, so a reading position cannot be a
//! pixel or a DOM path. This crate supplies the deterministic half of the
//! problem:
//!
//! - [`Segmenter`] splits a chapter into addressable [`Block`]s and injects
//!   their ids into the markup.
//! - [`OffsetIndex`] maps block ids to half-open clean-character ranges.
//! - [`PositionBuilder`] turns "block X, N characters in" into a persistable
//!   [`Position`].
//! - [`BookStats`] and [`merge_positions`] carry book-wide progress and
//!   multi-device merging.
//!
//! Live geometry, timing and restoration live in `shiori-engine`.
//!
//! # Example
//!
//! ```rust
//! use shiori_core::{PositionBuilder, Segmenter};
//!
//! let chapter = Segmenter::default().segment("<p>first</p><p>second block</p>", 0);
//! let position = PositionBuilder::new().build(&chapter, "ch0-b1", 3).unwrap();
//!
//! assert_eq!(position.chapter_char_offset, Some(8));
//! let restored = chapter.index.at_offset(8).unwrap();
//! assert_eq!(restored.block_id.as_str(), "ch0-b1");
//! ```

pub mod block;
pub mod builder;
pub mod error;
pub mod index;
pub mod merge;
pub mod position;
pub mod segmenter;
pub mod stats;
pub mod text;

pub use block::{Block, BlockId, BlockKind};
pub use builder::PositionBuilder;
pub use error::{CoreError, Result};
pub use index::{IndexEntry, OffsetIndex};
pub use merge::{merge_position, merge_positions, ConflictInfo};
pub use position::Position;
pub use segmenter::{SegmentedChapter, Segmenter, SegmenterConfig};
pub use stats::{BlockIndexMap, BookStats};
