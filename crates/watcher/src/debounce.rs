//! Opt-in debouncing
//!
//! Collects events until the tree has been quiet for the configured window, then
//! releases them as one batch with exact duplicates collapsed. A batch is also
//! released once it has been open for `MAX_DELAY_FACTOR` windows so a file that
//! is written continuously cannot hold snapshots back forever.

use crate::event::WatchEvent;
use std::time::{Duration, Instant};

/// Upper bound on batch age, in multiples of the quiet window
pub const MAX_DELAY_FACTOR: u32 = 20;

#[derive(Debug)]
pub struct Debouncer {
    window: Duration,
    pending: Vec<WatchEvent>,
    opened_at: Option<Instant>,
    last_event_at: Option<Instant>,
}

impl Debouncer {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            pending: Vec::new(),
            opened_at: None,
            last_event_at: None,
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Add an event to the open batch, restarting the quiet window
    pub fn push(&mut self, event: WatchEvent, now: Instant) {
        if !self.pending.contains(&event) {
            self.pending.push(event);
        }
        self.opened_at.get_or_insert(now);
        self.last_event_at = Some(now);
    }

    /// When the open batch becomes due, if there is one
    pub fn deadline(&self) -> Option<Instant> {
        let quiet = self.last_event_at? + self.window;
        let oldest = self.opened_at? + self.window * MAX_DELAY_FACTOR;
        Some(quiet.min(oldest))
    }

    /// Take the batch if it is due
    pub fn take_ready(&mut self, now: Instant) -> Option<Vec<WatchEvent>> {
        match self.deadline() {
            Some(deadline) if deadline <= now => Some(self.drain()),
            _ => None,
        }
    }

    /// Take whatever is pending
    pub fn drain(&mut self) -> Vec<WatchEvent> {
        self.opened_at = None;
        self.last_event_at = None;
        std::mem::take(&mut self.pending)
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
