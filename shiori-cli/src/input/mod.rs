//! Chapter, position and statistics inputs

pub mod file_reader;
pub mod glob_resolver;

pub use file_reader::FileReader;
pub use glob_resolver::{chapter_label, resolve_patterns};
