//! Rate limiting of streamed transcript updates.
//!
//! Rapid updates are coalesced into at most one publish per interval; the
//! latest pending update is always published once the interval has elapsed.
//! A zero interval publishes every update.

use std::time::Duration;

use tokio::time::Instant;

#[derive(Debug, Clone)]
pub struct Coalescer {
    interval: Duration,
    last_flush: Option<Instant>,
    dirty: bool,
}

impl Coalescer {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_flush: None,
            dirty: false,
        }
    }

    /// Record a new update. Returns true if it should be published right away.
    pub fn offer(&mut self, now: Instant) -> bool {
        self.dirty = true;
        match self.last_flush {
            None => true,
            Some(last) => now.saturating_duration_since(last) >= self.interval,
        }
    }

    pub fn flushed(&mut self, now: Instant) {
        self.dirty = false;
        self.last_flush = Some(now);
    }

    /// When the held-back update is due, if there is one.
    pub fn deadline(&self) -> Option<Instant> {
        if !self.dirty {
            return None;
        }
        self.last_flush.map(|last| last + self.interval)
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }
}
