//! Deferred scroll-to-index scheduling.
//!
//! After an add or insert the list should scroll to the first new row, but
//! only once the entrance animation has had a moment to start. The schedule
//! is a single pending entry fired by polling with the current time; the
//! controller polls once per frame and cancels the entry on disposal.

use std::time::{Duration, Instant};

/// Delay between an insertion and the automatic scroll to it.
pub const SCROLL_DELAY: Duration = Duration::from_millis(300);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PendingScroll {
    index: usize,
    due: Instant,
}

/// One-slot schedule for the deferred scroll.
///
/// Scheduling while an entry is pending replaces it: only the most recent
/// insertion is scrolled to.
#[derive(Debug)]
pub(crate) struct ScrollScheduler {
    delay: Duration,
    pending: Option<PendingScroll>,
}

impl ScrollScheduler {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: None,
        }
    }

    pub fn schedule(&mut self, index: usize, now: Instant) {
        self.pending = Some(PendingScroll {
            index,
            due: now + self.delay,
        });
    }

    /// Take the scheduled index if its delay has elapsed.
    pub fn poll(&mut self, now: Instant) -> Option<usize> {
        let pending = self.pending?;
        if now < pending.due {
            return None;
        }
        self.pending = None;
        Some(pending.index)
    }

    /// Drop any pending scroll. Safe to call repeatedly.
    pub fn cancel(&mut self) {
        self.pending = None;
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }
}
