//! Time Sources
//!
//! The context manager never reads the system time directly; it asks a [`Clock`]
//! so waits can be driven by a controlled instant in tests.

use parking_lot::Mutex;
use std::time::{Duration, Instant};

/// Source of the current instant.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

/// Monotonic system clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Clock whose instant only moves when told to.
///
/// A manager built on this clock sees a new instant the next time one of its
/// waiters wakes up; moving the clock does not wake anyone.
#[derive(Debug)]
pub struct ManualClock {
    instant: Mutex<Instant>,
}

impl ManualClock {
    pub fn new(start: Instant) -> Self {
        Self {
            instant: Mutex::new(start),
        }
    }

    pub fn set(&self, instant: Instant) {
        *self.instant.lock() = instant;
    }

    pub fn advance(&self, by: Duration) {
        let mut instant = self.instant.lock();
        *instant += by;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new(Instant::now())
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        *self.instant.lock()
    }
}
