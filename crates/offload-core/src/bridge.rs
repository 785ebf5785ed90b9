//! Blocking-call bridge.
//!
//! Runs a blocking closure on a [`BlockingPool`] and hands its result back
//! to the awaiting task. The scheduler thread keeps serving other tasks
//! while the closure runs.
//!
//! # Usage
//! ```rust,no_run
//! use offload_core::bridge::Bridge;
//! use offload_core::config::BridgeConfig;
//!
//! # async fn example() {
//! let bridge = Bridge::from_config(&BridgeConfig::default());
//! let len = bridge
//!     .run_blocking(|| std::fs::read_to_string("/etc/hostname").map(|s| s.len()))
//!     .await;
//! # }
//! ```

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use futures::future::BoxFuture;
use tokio::sync::oneshot;

use crate::config::BridgeConfig;
use crate::error::BridgeError;
use crate::pool::{BlockingPool, TokioBlockingPool};

/// Handle to the worker pool used for blocking operations.
///
/// Cheap to clone; clones share the pool and the task-id counter.
#[derive(Clone)]
pub struct Bridge {
    pool: Arc<dyn BlockingPool>,
    call_timeout: Option<Duration>,
    next_id: Arc<AtomicU64>,
}

impl Bridge {
    /// Build a bridge over an existing pool.
    pub fn new(pool: Arc<dyn BlockingPool>, call_timeout: Option<Duration>) -> Self {
        Self {
            pool,
            call_timeout,
            next_id: Arc::new(AtomicU64::new(1)),
        }
    }

    /// Build a bridge backed by a [`TokioBlockingPool`] sized from `config`.
    pub fn from_config(config: &BridgeConfig) -> Self {
        Self::new(
            Arc::new(TokioBlockingPool::from_config(config)),
            config.call_timeout(),
        )
    }

    pub fn pool(&self) -> &Arc<dyn BlockingPool> {
        &self.pool
    }

    pub fn call_timeout(&self) -> Option<Duration> {
        self.call_timeout
    }

    /// Dispatch `f` to the worker pool and return a handle to it.
    ///
    /// The operation starts as soon as a worker slot frees up. Dropping the
    /// handle, or hitting the call timeout, stops waiting. A closure still
    /// queued for a slot is then skipped; one already running is not
    /// interrupted.
    pub fn spawn<F, T, E>(&self, f: F) -> BridgeTask<T, E>
    where
        F: FnOnce() -> Result<T, E> + Send + 'static,
        T: Send + 'static,
        E: Send + 'static,
    {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = oneshot::channel();
        let dispatched = self.pool.dispatch(Box::new(move || {
            if tx.is_closed() {
                tracing::debug!(task = id, "caller gone, skipping blocking call");
                return;
            }
            let _ = tx.send(f());
        }));
        tracing::trace!(task = id, pool = self.pool.name(), "blocking call dispatched");

        let settle = async move {
            if let Err(e) = dispatched.await {
                return Err(BridgeError::from(e));
            }
            match rx.await {
                Ok(result) => result.map_err(BridgeError::Operation),
                Err(_) => Err(BridgeError::Unavailable("worker dropped the result".into())),
            }
        };

        let inner: BoxFuture<'static, Result<T, BridgeError<E>>> = match self.call_timeout {
            Some(limit) => Box::pin(async move {
                match tokio::time::timeout(limit, settle).await {
                    Ok(result) => result,
                    Err(_) => {
                        let ms = limit.as_millis() as u64;
                        tracing::warn!(task = id, timeout_ms = ms, "blocking call timed out");
                        Err(BridgeError::Timeout { ms })
                    }
                }
            }),
            None => Box::pin(settle),
        };

        BridgeTask { id, inner }
    }

    /// Run `f` on the worker pool and wait for its result.
    ///
    /// An error returned by `f` comes back unchanged as
    /// [`BridgeError::Operation`].
    pub async fn run_blocking<F, T, E>(&self, f: F) -> Result<T, BridgeError<E>>
    where
        F: FnOnce() -> Result<T, E> + Send + 'static,
        T: Send + 'static,
        E: Send + 'static,
    {
        self.spawn(f).await
    }

    /// Stop accepting new blocking calls.
    pub fn shutdown(&self) {
        self.pool.shutdown();
    }
}

impl fmt::Debug for Bridge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bridge")
            .field("pool", &self.pool.name())
            .field("capacity", &self.pool.capacity())
            .field("call_timeout", &self.call_timeout)
            .finish()
    }
}

/// A blocking operation in flight on the worker pool.
///
/// Owned by the task that created it; resolves to the operation's result.
#[must_use = "a BridgeTask does nothing useful unless awaited"]
pub struct BridgeTask<T, E> {
    id: u64,
    inner: BoxFuture<'static, Result<T, BridgeError<E>>>,
}

impl<T, E> BridgeTask<T, E> {
    pub fn id(&self) -> u64 {
        self.id
    }
}

impl<T, E> Future for BridgeTask<T, E> {
    type Output = Result<T, BridgeError<E>>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        self.inner.as_mut().poll(cx)
    }
}

impl<T, E> fmt::Debug for BridgeTask<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BridgeTask").field("id", &self.id).finish()
    }
}
