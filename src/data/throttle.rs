//! Minimum-interval throttle shared by all fetch workers.

use std::sync::Mutex;
use std::thread;
use std::time::{Duration, Instant};

/// Spaces request starts at least `interval` apart across threads.
///
/// A zero interval disables throttling entirely.
#[derive(Debug)]
pub struct RateLimiter {
    interval: Duration,
    next_slot: Mutex<Option<Instant>>,
}

impl RateLimiter {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            next_slot: Mutex::new(None),
        }
    }

    /// Block until the caller may start a request.
    pub fn acquire(&self) {
        if self.interval.is_zero() {
            return;
        }

        let wait = {
            // Poisoning is ignored: the stored instant is always valid.
            let mut slot = self
                .next_slot
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            let now = Instant::now();
            let start = match *slot {
                Some(next) if next > now => next,
                _ => now,
            };
            *slot = Some(start + self.interval);
            start - now
        };

        if !wait.is_zero() {
            thread::sleep(wait);
        }
    }
}
