//! Fixed window policy: `permit_limit` requests per window, windows aligned
//! to the limiter's start time.

use std::time::{Duration, Instant};

use super::elapsed_periods;

#[derive(Debug)]
pub struct FixedWindow {
    permit_limit: u32,
    window: Duration,
    window_start: Instant,
    used: u32,
}

impl FixedWindow {
    pub fn new(permit_limit: u32, window: Duration, start: Instant) -> Self {
        Self {
            permit_limit,
            window,
            window_start: start,
            used: 0,
        }
    }

    /// Moves to the window containing `now`, resetting the count.
    pub fn replenish_at(&mut self, now: Instant) {
        let (periods, advance) = elapsed_periods(self.window_start, now, self.window);
        if periods > 0 {
            self.window_start += advance;
            self.used = 0;
        }
    }

    pub fn try_acquire_at(&mut self, now: Instant) -> bool {
        self.replenish_at(now);
        if self.used < self.permit_limit {
            self.used += 1;
            true
        } else {
            false
        }
    }

    pub fn available(&self) -> u32 {
        self.permit_limit - self.used
    }
}
