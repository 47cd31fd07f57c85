//! Bounded pool of concurrent test executions.
//!
//! A slot must be held for the whole lifetime of an execution, retries
//! included. Slots are handed out in request order, so cases start in
//! discovery order even when they finish out of order.
//!
//! # Features
//!
//! - Configurable number of workers
//! - Pool statistics tracking

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use thiserror::Error;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::debug;

/// Errors that can occur in the worker pool.
#[derive(Debug, Error)]
pub enum PoolError {
    /// The pool was closed while waiting for a slot.
    #[error("Worker pool is closed")]
    Closed,
}

/// Statistics about the worker pool.
#[derive(Debug, Clone, Default)]
pub struct PoolStats {
    /// Total number of workers in the pool.
    pub num_workers: usize,
    /// Number of slots currently held.
    pub active_workers: usize,
    /// Highest number of slots held at the same time.
    pub peak_active_workers: usize,
    /// Number of slots released so far.
    pub executions: u64,
    /// Average time a slot was held.
    pub average_execution_duration: Duration,
}

/// Shared state for tracking pool statistics.
#[derive(Debug)]
struct SharedPoolStats {
    executions: AtomicU64,
    total_duration_ms: AtomicU64,
    active_workers: AtomicU64,
    peak_active_workers: AtomicU64,
}

impl SharedPoolStats {
    fn new() -> Self {
        Self {
            executions: AtomicU64::new(0),
            total_duration_ms: AtomicU64::new(0),
            active_workers: AtomicU64::new(0),
            peak_active_workers: AtomicU64::new(0),
        }
    }

    fn increment_active(&self) {
        let active = self.active_workers.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_active_workers.fetch_max(active, Ordering::SeqCst);
    }

    fn record_release(&self, duration: Duration) {
        self.active_workers.fetch_sub(1, Ordering::SeqCst);
        self.executions.fetch_add(1, Ordering::SeqCst);
        self.total_duration_ms
            .fetch_add(duration.as_millis() as u64, Ordering::SeqCst);
    }

    fn to_pool_stats(&self, num_workers: usize) -> PoolStats {
        let executions = self.executions.load(Ordering::SeqCst);
        let total_duration_ms = self.total_duration_ms.load(Ordering::SeqCst);

        let average = if executions > 0 {
            Duration::from_millis(total_duration_ms / executions)
        } else {
            Duration::ZERO
        };

        PoolStats {
            num_workers,
            active_workers: self.active_workers.load(Ordering::SeqCst) as usize,
            peak_active_workers: self.peak_active_workers.load(Ordering::SeqCst) as usize,
            executions,
            average_execution_duration: average,
        }
    }
}

/// Pool limiting how many tests execute at once.
#[derive(Debug, Clone)]
pub struct WorkerPool {
    num_workers: usize,
    semaphore: Arc<Semaphore>,
    stats: Arc<SharedPoolStats>,
}

/// A held execution slot; released on drop.
#[derive(Debug)]
pub struct WorkerSlot {
    _permit: OwnedSemaphorePermit,
    stats: Arc<SharedPoolStats>,
    started: Instant,
}

impl Drop for WorkerSlot {
    fn drop(&mut self) {
        self.stats.record_release(self.started.elapsed());
    }
}

impl WorkerPool {
    /// Creates a pool of `num_workers` slots (at least one).
    pub fn new(num_workers: usize) -> Self {
        let num_workers = num_workers.max(1);
        debug!(num_workers, "Creating worker pool");
        Self {
            num_workers,
            semaphore: Arc::new(Semaphore::new(num_workers)),
            stats: Arc::new(SharedPoolStats::new()),
        }
    }

    /// Waits for a free slot.
    pub async fn acquire(&self) -> Result<WorkerSlot, PoolError> {
        let permit = self
            .semaphore
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| PoolError::Closed)?;

        self.stats.increment_active();
        Ok(WorkerSlot {
            _permit: permit,
            stats: Arc::clone(&self.stats),
            started: Instant::now(),
        })
    }

    pub fn num_workers(&self) -> usize {
        self.num_workers
    }

    /// Returns current pool statistics.
    pub fn stats(&self) -> PoolStats {
        self.stats.to_pool_stats(self.num_workers)
    }
}
