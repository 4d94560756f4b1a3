//! Core error types (deterministic only)

use thiserror::Error;

/// Core errors (no I/O, no live geometry)
#[derive(Error, Debug)]
pub enum CoreError {
    /// A block id that does not follow the `ch{chapter}-b{order}` format
    #[error("malformed block id '{id}'")]
    MalformedBlockId {
        /// The offending id
        id: String,
    },

    /// An offset index that would violate the partition invariant
    #[error("invalid offset index: {reason}")]
    InvalidIndex {
        /// Why the entries were rejected
        reason: String,
    },

    /// A block id that is not present in the chapter
    #[error("unknown block '{id}'")]
    UnknownBlock {
        /// The id that was looked up
        id: String,
    },

    /// A chapter index past the end of the book
    #[error("chapter {index} out of range (book has {count} chapters)")]
    ChapterOutOfRange {
        /// Requested chapter
        index: usize,
        /// Chapters known to the book statistics
        count: usize,
    },

    /// JSON encoding or decoding failure
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for core operations
pub type Result<T> = std::result::Result<T, CoreError>;
