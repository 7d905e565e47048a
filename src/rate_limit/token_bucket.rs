//! Token bucket policy: each request spends a token; `tokens_per_period`
//! tokens are added every replenishment period, up to `token_limit`.

use std::time::{Duration, Instant};

use super::elapsed_periods;

#[derive(Debug)]
pub struct TokenBucket {
    token_limit: u32,
    tokens_per_period: u32,
    period: Duration,
    last_replenish: Instant,
    tokens: u32,
}

impl TokenBucket {
    pub fn new(token_limit: u32, tokens_per_period: u32, period: Duration, start: Instant) -> Self {
        Self {
            token_limit,
            tokens_per_period,
            period,
            last_replenish: start,
            tokens: token_limit,
        }
    }

    pub fn replenish_at(&mut self, now: Instant) {
        let (periods, advance) = elapsed_periods(self.last_replenish, now, self.period);
        if periods == 0 {
            return;
        }
        let added = periods.saturating_mul(self.tokens_per_period as u128);
        let tokens = (self.tokens as u128).saturating_add(added);
        self.tokens = tokens.min(self.token_limit as u128) as u32;
        self.last_replenish += advance;
    }

    pub fn try_acquire_at(&mut self, now: Instant) -> bool {
        self.replenish_at(now);
        if self.tokens > 0 {
            self.tokens -= 1;
            true
        } else {
            false
        }
    }

    pub fn available(&self) -> u32 {
        self.tokens
    }
}
