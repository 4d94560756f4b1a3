//! Injected time
//!
//! Timers in this crate are deadlines compared against [`Clock::now_ms`].
//! Hosts drive them by calling `poll`/`tick`; tests use [`ManualClock`].

use std::cell::Cell;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Millisecond clock with a blocking sleep
pub trait Clock {
    /// Milliseconds since the Unix epoch
    fn now_ms(&self) -> u64;

    /// Wait for `ms` milliseconds
    fn sleep_ms(&self, ms: u64);
}

/// Wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0)
    }

    fn sleep_ms(&self, ms: u64) {
        std::thread::sleep(Duration::from_millis(ms));
    }
}

/// Clock that only moves when told to; `sleep_ms` advances it instantly.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: Cell<u64>,
}

impl ManualClock {
    /// Clock starting at `start_ms`
    pub fn new(start_ms: u64) -> Self {
        Self {
            now: Cell::new(start_ms),
        }
    }

    /// Move forward by `ms`
    pub fn advance(&self, ms: u64) {
        self.now.set(self.now.get() + ms);
    }

    /// Jump to an absolute time
    pub fn set(&self, ms: u64) {
        self.now.set(ms);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> u64 {
        self.now.get()
    }

    fn sleep_ms(&self, ms: u64) {
        self.advance(ms);
    }
}
