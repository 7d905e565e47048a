//! Concurrency policy: caps requests in flight.

use std::sync::Arc;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};

#[derive(Debug)]
pub struct ConcurrencyLimiter {
    permits: Arc<Semaphore>,
}

impl ConcurrencyLimiter {
    pub fn new(permit_limit: u32) -> Self {
        Self {
            permits: Arc::new(Semaphore::new(permit_limit as usize)),
        }
    }

    /// Takes a slot without waiting. The slot is released when the permit is
    /// dropped, whether the request completed, failed or was cancelled.
    pub fn try_acquire(&self) -> Option<OwnedSemaphorePermit> {
        self.permits.clone().try_acquire_owned().ok()
    }

    pub fn available(&self) -> usize {
        self.permits.available_permits()
    }
}
