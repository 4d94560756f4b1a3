//! Bounded polling
//!
//! Replaces open-ended "wait until the content shows up" loops: a probe is
//! retried a fixed number of times at a fixed interval, then gives up.

use crate::clock::Clock;

/// Result of a bounded poll
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome<T> {
    /// The probe produced a value
    Ready {
        /// Value returned by the probe
        value: T,
        /// Attempts used, including the successful one
        attempts: u32,
    },
    /// Every attempt came back empty
    TimedOut {
        /// Attempts made
        attempts: u32,
    },
}

impl<T> PollOutcome<T> {
    /// The value, if the probe succeeded
    pub fn ready(self) -> Option<T> {
        match self {
            PollOutcome::Ready { value, .. } => Some(value),
            PollOutcome::TimedOut { .. } => None,
        }
    }

    /// Attempts made either way
    pub fn attempts(&self) -> u32 {
        match self {
            PollOutcome::Ready { attempts, .. } | PollOutcome::TimedOut { attempts } => *attempts,
        }
    }
}

/// Poll a probe at most `max_attempts` times, `interval_ms` apart
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundedPoll {
    /// Upper bound on probe calls
    pub max_attempts: u32,
    /// Sleep between attempts
    pub interval_ms: u64,
}

impl BoundedPoll {
    /// Create a poll policy
    pub fn new(max_attempts: u32, interval_ms: u64) -> Self {
        Self {
            max_attempts,
            interval_ms,
        }
    }

    /// Run `probe` until it returns `Some` or attempts run out.
    ///
    /// The probe is always called at least once.
    pub fn run<T, C, F>(&self, clock: &C, mut probe: F) -> PollOutcome<T>
    where
        C: Clock + ?Sized,
        F: FnMut() -> Option<T>,
    {
        let max = self.max_attempts.max(1);
        for attempt in 1..=max {
            if let Some(value) = probe() {
                return PollOutcome::Ready {
                    value,
                    attempts: attempt,
                };
            }
            if attempt < max {
                clock.sleep_ms(self.interval_ms);
            }
        }
        PollOutcome::TimedOut { attempts: max }
    }
}
