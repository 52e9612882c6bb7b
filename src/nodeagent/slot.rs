//! Time-gated single-entry mailbox for scheduled contexts.
//!
//! Holds at most one entry. A new `put` replaces whatever is pending, so a tick that
//! was scheduled but never fetched is dropped rather than queued. Not synchronized on
//! its own: the manager only touches it while holding its lock.

use std::sync::Arc;
use std::time::{Duration, Instant};

/// A scheduled context together with the earliest instant it may be delivered.
#[derive(Debug)]
pub struct ScheduledEntry<C> {
    pub context: Arc<C>,
    pub not_before: Instant,
    pub generation: u64,
}

impl<C> ScheduledEntry<C> {
    /// Time left until the entry becomes eligible, zero once it is.
    pub fn remaining(&self, now: Instant) -> Duration {
        self.not_before.saturating_duration_since(now)
    }

    pub fn is_ready(&self, now: Instant) -> bool {
        self.not_before <= now
    }
}

#[derive(Debug)]
pub struct TimeGatedSlot<C> {
    entry: Option<ScheduledEntry<C>>,
    generation: u64,
}

impl<C> Default for TimeGatedSlot<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> TimeGatedSlot<C> {
    pub fn new() -> Self {
        Self {
            entry: None,
            generation: 0,
        }
    }

    /// Overwrite the pending entry and return its generation.
    pub fn put(&mut self, context: Arc<C>, not_before: Instant) -> u64 {
        self.generation += 1;
        self.entry = Some(ScheduledEntry {
            context,
            not_before,
            generation: self.generation,
        });
        self.generation
    }

    pub fn peek(&self) -> Option<&ScheduledEntry<C>> {
        self.entry.as_ref()
    }

    /// The pending entry, but only if it was put after `baseline`.
    pub fn pending_after(&self, baseline: u64) -> Option<&ScheduledEntry<C>> {
        self.entry.as_ref().filter(|e| e.generation > baseline)
    }

    pub fn take(&mut self) -> Option<ScheduledEntry<C>> {
        self.entry.take()
    }

    /// Generation of the most recent `put`, 0 if nothing was ever scheduled.
    pub fn generation(&self) -> u64 {
        self.generation
    }
}
