//! Durable position storage
//!
//! A store holds one position per book. Unreadable or malformed entries read
//! as "no saved position"; only writes can fail.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use shiori_core::Position;

use crate::error::{EngineError, Result};

/// Bytes escaped in store file names; `%` itself is escaped, so decoding is unambiguous
const FILE_NAME_SET: &AsciiSet = &NON_ALPHANUMERIC.remove(b'-').remove(b'_').remove(b'.');

/// Where positions live between sessions
pub trait PositionStore {
    /// Saved position of `book_id`, if any
    fn load(&self, book_id: &str) -> Option<Position>;

    /// Persist `position` as the position of `book_id`
    fn save(&mut self, book_id: &str, position: &Position) -> Result<()>;
}

impl<S: PositionStore + ?Sized> PositionStore for Box<S> {
    fn load(&self, book_id: &str) -> Option<Position> {
        (**self).load(book_id)
    }

    fn save(&mut self, book_id: &str, position: &Position) -> Result<()> {
        (**self).save(book_id, position)
    }
}

/// Process-local store
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    positions: HashMap<String, Position>,
    writes: usize,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of successful writes so far
    pub fn writes(&self) -> usize {
        self.writes
    }
}

impl PositionStore for MemoryStore {
    fn load(&self, book_id: &str) -> Option<Position> {
        self.positions.get(book_id).cloned()
    }

    fn save(&mut self, book_id: &str, position: &Position) -> Result<()> {
        self.positions.insert(book_id.to_string(), position.clone());
        self.writes += 1;
        Ok(())
    }
}

/// One JSON file per book in a directory
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    /// Store rooted at `dir`; the directory is created on first write
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Directory holding the files
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File backing `book_id`; distinct ids never share a file
    pub fn path_for(&self, book_id: &str) -> PathBuf {
        let safe = utf8_percent_encode(book_id, FILE_NAME_SET);
        self.dir.join(format!("{safe}.json"))
    }

    fn write(&self, book_id: &str, position: &Position) -> Result<()> {
        fs::create_dir_all(&self.dir)?;
        let path = self.path_for(book_id);
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, position.to_json_pretty()?)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }
}

impl PositionStore for JsonFileStore {
    fn load(&self, book_id: &str) -> Option<Position> {
        let path = self.path_for(book_id);
        match fs::read_to_string(&path) {
            Ok(json) => Position::from_json(&json),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => None,
            Err(err) => {
                log::warn!("cannot read saved position {}: {}", path.display(), err);
                None
            }
        }
    }

    fn save(&mut self, book_id: &str, position: &Position) -> Result<()> {
        self.write(book_id, position).map_err(|err| EngineError::Store {
            book_id: book_id.to_string(),
            reason: err.to_string(),
        })
    }
}
