// src/limit.rs
// Minimum-interval gate between requests. The archive wants polite,
// serialized crawling, so every fetch goes through one of these.

use std::cell::Cell;
use std::thread;
use std::time::{Duration, Instant};

/// Blocks the caller until at least `interval` has passed since the
/// previous permitted action.
///
/// First call never blocks, and `interval` of zero makes every call a
/// no-op. Interior state lives in a `Cell`, so this type is `!Sync`:
/// single-threaded use only, which matches how the whole crawl runs.
pub struct RateLimiter {
    interval: Duration,
    last_event: Cell<Option<Instant>>,
}

impl RateLimiter {
    pub fn new(interval: Duration) -> Self {
        Self { interval, last_event: Cell::new(None) }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Sleeps until the next permitted event, then records the new event
    /// time and returns.
    pub fn acquire(&self) {
        if let Some(last) = self.last_event.get() {
            let next_at = last + self.interval;
            let now = Instant::now();
            if next_at > now {
                thread::sleep(next_at - now);
            }
        }
        self.last_event.set(Some(Instant::now()));
    }
}
