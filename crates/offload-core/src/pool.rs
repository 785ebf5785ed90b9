//! Worker pools for blocking jobs.
//!
//! A [`BlockingPool`] runs type-erased jobs on threads that are not the
//! async scheduler's. The default [`TokioBlockingPool`] uses tokio's
//! blocking thread pool and caps concurrency with a semaphore.

use std::any::Any;
use std::sync::Arc;

use futures::future::BoxFuture;
use tokio::sync::Semaphore;
use tokio::task::JoinError;

use crate::config::BridgeConfig;
use crate::error::PoolError;

/// A type-erased blocking job.
pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// Resolves when a dispatched job has finished (or failed to run).
pub type Dispatched = BoxFuture<'static, Result<(), PoolError>>;

/// A pool of worker threads for blocking operations.
///
/// # Object Safety
/// The trait is object-safe and can be stored as `Arc<dyn BlockingPool>`.
pub trait BlockingPool: Send + Sync + 'static {
    /// Submit `job`. The job is queued for a worker immediately; the returned
    /// future only reports completion.
    ///
    /// Must be called from within a Tokio runtime.
    fn dispatch(&self, job: Job) -> Dispatched;

    /// Maximum number of jobs running at the same time.
    fn capacity(&self) -> usize;

    /// Stop accepting jobs. Jobs already running are left to finish.
    fn shutdown(&self) {}

    /// Pool identifier, used in logs.
    fn name(&self) -> &str {
        "blocking-pool"
    }
}

/// Tokio blocking-thread pool bounded by a semaphore.
#[derive(Debug, Clone)]
pub struct TokioBlockingPool {
    permits: Arc<Semaphore>,
    capacity: usize,
}

impl TokioBlockingPool {
    /// Create a pool running at most `capacity` jobs at once (minimum 1).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            permits: Arc::new(Semaphore::new(capacity)),
            capacity,
        }
    }

    pub fn from_config(config: &BridgeConfig) -> Self {
        Self::new(config.max_workers)
    }

    /// Number of jobs currently holding a worker slot.
    pub fn in_flight(&self) -> usize {
        if self.permits.is_closed() {
            return 0;
        }
        self.capacity - self.permits.available_permits()
    }

    pub fn is_shut_down(&self) -> bool {
        self.permits.is_closed()
    }
}

impl BlockingPool for TokioBlockingPool {
    fn dispatch(&self, job: Job) -> Dispatched {
        let permits = Arc::clone(&self.permits);
        let handle = tokio::spawn(async move {
            let permit = permits.acquire_owned().await.map_err(|_| PoolError::Closed)?;
            tokio::task::spawn_blocking(move || {
                let _permit = permit;
                job();
            })
            .await
            .map_err(join_error)
        });
        Box::pin(async move { handle.await.map_err(join_error)? })
    }

    fn capacity(&self) -> usize {
        self.capacity
    }

    fn shutdown(&self) {
        tracing::info!(capacity = self.capacity, "blocking pool shutting down");
        self.permits.close();
    }

    fn name(&self) -> &str {
        "tokio-blocking"
    }
}

fn join_error(err: JoinError) -> PoolError {
    if err.is_panic() {
        PoolError::Panicked(panic_message(err.into_panic()))
    } else {
        PoolError::Cancelled
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
