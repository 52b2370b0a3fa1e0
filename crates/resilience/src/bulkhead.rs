//! Concurrency limiter isolating one dependency's load.

use std::sync::Arc;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::config::BulkheadConfig;

/// Limits the number of in-flight calls to a dependency.
///
/// Calls beyond the limit are rejected immediately rather than queued.
#[derive(Debug, Clone)]
pub struct Bulkhead {
    permits: Arc<Semaphore>,
    max_concurrent: usize,
}

/// An occupied bulkhead slot, released on drop.
#[derive(Debug)]
pub struct BulkheadSlot {
    _permit: OwnedSemaphorePermit,
}

impl Bulkhead {
    /// Creates a bulkhead with the configured capacity.
    pub fn new(config: BulkheadConfig) -> Self {
        let max_concurrent = config.max_concurrent.max(1);
        Self {
            permits: Arc::new(Semaphore::new(max_concurrent)),
            max_concurrent,
        }
    }

    /// Takes a slot if one is free.
    pub fn try_enter(&self) -> Option<BulkheadSlot> {
        Arc::clone(&self.permits)
            .try_acquire_owned()
            .ok()
            .map(|permit| BulkheadSlot { _permit: permit })
    }

    /// Number of calls currently in flight.
    pub fn in_flight(&self) -> usize {
        self.max_concurrent - self.permits.available_permits()
    }

    /// Configured capacity.
    pub fn max_concurrent(&self) -> usize {
        self.max_concurrent
    }
}
