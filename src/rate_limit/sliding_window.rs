//! Sliding window policy: the window is split into segments and a request is
//! admitted while the trailing segments together hold fewer than
//! `permit_limit` requests.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use super::elapsed_periods;

#[derive(Debug)]
pub struct SlidingWindow {
    permit_limit: u32,
    segment: Duration,
    segment_start: Instant,
    // oldest first; the back is the current segment
    segments: VecDeque<u32>,
}

impl SlidingWindow {
    pub fn new(permit_limit: u32, window: Duration, segments_per_window: u32, start: Instant) -> Self {
        let count = segments_per_window.max(1);
        let segment = (window / count).max(Duration::from_millis(1));
        Self {
            permit_limit,
            segment,
            segment_start: start,
            segments: std::iter::repeat(0).take(count as usize).collect(),
        }
    }

    /// Rotates out every segment that ended before `now`.
    pub fn replenish_at(&mut self, now: Instant) {
        let (periods, advance) = elapsed_periods(self.segment_start, now, self.segment);
        if periods == 0 {
            return;
        }
        let rotations = periods.min(self.segments.len() as u128);
        for _ in 0..rotations {
            self.segments.pop_front();
            self.segments.push_back(0);
        }
        self.segment_start += advance;
    }

    pub fn try_acquire_at(&mut self, now: Instant) -> bool {
        self.replenish_at(now);
        if self.in_window() >= self.permit_limit {
            return false;
        }
        if let Some(current) = self.segments.back_mut() {
            *current += 1;
        }
        true
    }

    fn in_window(&self) -> u32 {
        self.segments.iter().sum()
    }

    pub fn available(&self) -> u32 {
        self.permit_limit.saturating_sub(self.in_window())
    }
}
