//! Debounced, lockable position saving
//!
//! The scheduler owns the pending position until it is written. Timer flushes
//! happen in [`SaveScheduler::poll`]; forced flushes (page hidden, teardown,
//! layout switch) go through [`SaveScheduler::save_now`].
//!
//! While locked, scheduled positions are recorded but the timer cannot fire
//! before the lock expires, so a just-restored position is not overwritten by
//! readings taken while the view is still settling.

use std::fmt;

use shiori_core::Position;

use crate::config::EngineConfig;
use crate::error::Result;
use crate::store::PositionStore;

/// Why a flush was forced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushReason {
    /// Debounce timer fired
    Debounce,
    /// The page or tab became hidden
    PageHidden,
    /// The reader view is being torn down
    Teardown,
    /// Writing direction or pagination is about to change
    LayoutSwitch,
    /// Explicit request
    Manual,
}

impl fmt::Display for FlushReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FlushReason::Debounce => "debounce",
            FlushReason::PageHidden => "page-hidden",
            FlushReason::Teardown => "teardown",
            FlushReason::LayoutSwitch => "layout-switch",
            FlushReason::Manual => "manual",
        };
        f.write_str(name)
    }
}

/// Debounces writes of one book's position to a store
#[derive(Debug)]
pub struct SaveScheduler<S: PositionStore> {
    store: S,
    book_id: String,
    delay_ms: u64,
    device_id: Option<String>,
    pending: Option<Position>,
    deadline: Option<u64>,
    locked_until: Option<u64>,
    last_saved: Option<Position>,
    sync_version: u64,
}

impl<S: PositionStore> SaveScheduler<S> {
    /// Create a scheduler writing `book_id` to `store`
    pub fn new(store: S, book_id: impl Into<String>, config: &EngineConfig) -> Self {
        Self {
            store,
            book_id: book_id.into(),
            delay_ms: config.save_delay_ms(),
            device_id: config.device_id.clone(),
            pending: None,
            deadline: None,
            locked_until: None,
            last_saved: None,
            sync_version: 0,
        }
    }

    /// Treat `position` as already written (it was just loaded from the store)
    pub fn seed(&mut self, position: &Position) {
        self.sync_version = self.sync_version.max(position.sync_version.unwrap_or(0));
        self.last_saved = Some(position.clone());
    }

    /// Record a new position and restart the debounce timer
    pub fn schedule(&mut self, position: Position, now: u64) {
        self.pending = Some(position);
        let mut deadline = now + self.delay_ms;
        if let Some(until) = self.locked_until.filter(|&until| now < until) {
            log::trace!("save locked; timer held until {}", until);
            deadline = deadline.max(until);
        }
        self.deadline = Some(deadline);
    }

    /// Suppress timer flushes for `duration_ms`.
    ///
    /// An armed timer is pushed back to the end of the lock, not dropped.
    pub fn lock(&mut self, duration_ms: u64, now: u64) {
        let until = now + duration_ms;
        self.locked_until = Some(until);
        self.deadline = self.deadline.map(|deadline| deadline.max(until));
        log::debug!("saving locked for {}ms", duration_ms);
    }

    /// Lift the lock early
    pub fn unlock(&mut self) {
        self.locked_until = None;
    }

    /// Whether timer flushes are suppressed at `now`
    pub fn is_locked(&self, now: u64) -> bool {
        self.locked_until.is_some_and(|until| now < until)
    }

    /// Fire the debounce timer if due. Returns the written position.
    pub fn poll(&mut self, now: u64) -> Result<Option<Position>> {
        match self.deadline {
            Some(deadline) if now >= deadline => self.deadline = None,
            _ => return Ok(None),
        }
        self.flush(FlushReason::Debounce, now)
    }

    /// Cancel the timer and write the pending position now.
    ///
    /// Bypasses the lock. A no-op when nothing is pending.
    pub fn save_now(&mut self, reason: FlushReason, now: u64) -> Result<Option<Position>> {
        self.deadline = None;
        self.flush(reason, now)
    }

    fn flush(&mut self, reason: FlushReason, now: u64) -> Result<Option<Position>> {
        let Some(position) = self.pending.take() else {
            return Ok(None);
        };

        if self
            .last_saved
            .as_ref()
            .is_some_and(|saved| saved.same_location(&position))
        {
            log::trace!("skipping {} save: position unchanged", reason);
            return Ok(None);
        }

        let mut stamped = position.clone();
        let now_ms = i64::try_from(now).unwrap_or(i64::MAX);
        stamped.last_read = Some(now_ms);
        stamped.last_modified = Some(now_ms);
        stamped.sync_version = Some(self.sync_version + 1);
        if self.device_id.is_some() {
            stamped.device_id = self.device_id.clone();
        }

        if let Err(err) = self.store.save(&self.book_id, &stamped) {
            log::warn!("{} save of '{}' failed: {}", reason, self.book_id, err);
            self.pending = Some(position);
            return Err(err);
        }

        log::debug!(
            "saved '{}' ({}): chapter {} block {}",
            self.book_id,
            reason,
            stamped.chapter_index,
            stamped.block_id.as_ref().map_or("-", |id| id.as_str())
        );
        self.sync_version += 1;
        self.last_saved = Some(stamped.clone());
        Ok(Some(stamped))
    }

    /// Position waiting to be written
    pub fn pending(&self) -> Option<&Position> {
        self.pending.as_ref()
    }

    /// Last position written or seeded
    pub fn last_saved(&self) -> Option<&Position> {
        self.last_saved.as_ref()
    }

    /// Book being saved
    pub fn book_id(&self) -> &str {
        &self.book_id
    }

    /// Backing store
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Backing store, mutably
    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    /// Give back the store
    pub fn into_store(self) -> S {
        self.store
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EngineError;
    use crate::store::MemoryStore;
    use shiori_core::BlockId;

    fn at(order: usize) -> Position {
        Position {
            block_id: Some(BlockId::new(0, order)),
            block_local_offset: Some(0),
            ..Position::default()
        }
    }

    fn scheduler() -> SaveScheduler<MemoryStore> {
        let config = EngineConfig::builder().device_id("phone").build().unwrap();
        SaveScheduler::new(MemoryStore::new(), "book", &config)
    }

    #[test]
    fn test_debounce_writes_latest_after_quiet_period() {
        let mut saver = scheduler();
        saver.schedule(at(1), 0);
        saver.schedule(at(2), 2_000);
        assert!(saver.poll(3_000).unwrap().is_none());

        let written = saver.poll(5_000).unwrap().unwrap();
        assert_eq!(written.block_id, Some(BlockId::new(0, 2)));
        assert_eq!(written.sync_version, Some(1));
        assert_eq!(written.last_modified, Some(5_000));
        assert_eq!(written.device_id.as_deref(), Some("phone"));
        assert_eq!(saver.store().writes(), 1);
        assert!(saver.pending().is_none());
    }

    #[test]
    fn test_save_now_is_idempotent() {
        let mut saver = scheduler();
        assert!(saver.save_now(FlushReason::PageHidden, 0).unwrap().is_none());

        saver.schedule(at(4), 10);
        assert!(saver.save_now(FlushReason::PageHidden, 20).unwrap().is_some());
        assert!(saver.save_now(FlushReason::Teardown, 30).unwrap().is_none());
        assert!(saver.poll(10_000).unwrap().is_none());
        assert_eq!(saver.store().writes(), 1);
    }

    #[test]
    fn test_lock_suppresses_timer_flushes() {
        let config = EngineConfig::builder().debounce_ms(1_000).build().unwrap();
        let mut saver = SaveScheduler::new(MemoryStore::new(), "book", &config);
        saver.schedule(at(6), 0);
        saver.lock(3_000, 0);
        saver.schedule(at(7), 1_000);
        assert!(saver.is_locked(1_000));

        for now in (0..3_000).step_by(100) {
            assert!(saver.poll(now).unwrap().is_none());
        }
        assert_eq!(saver.store().writes(), 0);
        assert_eq!(saver.pending(), Some(&at(7)));

        let written = saver.poll(3_000).unwrap().unwrap();
        assert_eq!(written.block_id, Some(BlockId::new(0, 7)));
        assert_eq!(saver.store().writes(), 1);
    }

    #[test]
    fn test_reading_during_lock_is_written_after_expiry() {
        let mut saver = scheduler();
        saver.schedule(at(1), 0);
        saver.lock(3_000, 0);
        saver.schedule(at(2), 1_000);

        let mut flushed_at = None;
        for now in (0..=20_000).step_by(100) {
            if saver.poll(now).unwrap().is_some() {
                flushed_at = Some(now);
                break;
            }
        }
        assert_eq!(flushed_at, Some(4_000));
        assert!(saver.pending().is_none());
        assert_eq!(saver.last_saved().unwrap().block_id, Some(BlockId::new(0, 2)));
    }

    #[test]
    fn test_lock_defers_armed_timer() {
        let mut saver = scheduler();
        saver.schedule(at(1), 0);
        saver.lock(3_000, 500);
        assert!(saver.poll(3_000).unwrap().is_none());
        assert_eq!(saver.store().writes(), 0);
        assert!(saver.poll(3_500).unwrap().is_some());
    }

    #[test]
    fn test_forced_flush_bypasses_lock() {
        let mut saver = scheduler();
        saver.lock(3_000, 0);
        saver.schedule(at(2), 10);
        let written = saver.save_now(FlushReason::LayoutSwitch, 20).unwrap();
        assert_eq!(written.unwrap().block_id, Some(BlockId::new(0, 2)));
    }

    #[test]
    fn test_identical_resave_is_skipped() {
        let mut saver = scheduler();
        saver.schedule(at(3), 0);
        saver.save_now(FlushReason::Manual, 1).unwrap();
        saver.schedule(at(3), 2);
        assert!(saver.save_now(FlushReason::Manual, 3).unwrap().is_none());
        assert_eq!(saver.store().writes(), 1);
    }

    #[test]
    fn test_seeded_version_continues() {
        let mut saver = scheduler();
        let loaded = Position {
            sync_version: Some(41),
            ..at(0)
        };
        saver.seed(&loaded);
        saver.schedule(at(0), 0);
        assert!(saver.save_now(FlushReason::Manual, 1).unwrap().is_none());
        saver.schedule(at(1), 2);
        let written = saver.save_now(FlushReason::Manual, 3).unwrap().unwrap();
        assert_eq!(written.sync_version, Some(42));
    }

    struct FailingStore;

    impl PositionStore for FailingStore {
        fn load(&self, _book_id: &str) -> Option<Position> {
            None
        }

        fn save(&mut self, book_id: &str, _position: &Position) -> Result<()> {
            Err(EngineError::Store {
                book_id: book_id.to_string(),
                reason: "disk full".to_string(),
            })
        }
    }

    #[test]
    fn test_failed_write_keeps_position_pending() {
        let mut saver = SaveScheduler::new(FailingStore, "book", &EngineConfig::default());
        saver.schedule(at(5), 0);
        assert!(saver.save_now(FlushReason::Teardown, 1).is_err());
        assert_eq!(saver.pending(), Some(&at(5)));
    }
}
