//! Error taxonomy for the bridge, the batch executor and configuration.

use thiserror::Error;

/// Errors raised by a [`BlockingPool`](crate::pool::BlockingPool) while
/// running a job.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PoolError {
    /// The job panicked on its worker thread.
    #[error("worker panicked: {0}")]
    Panicked(String),

    /// The pool has been shut down and accepts no more work.
    #[error("worker pool is shut down")]
    Closed,

    /// The worker task was torn down before the job finished (runtime shutdown).
    #[error("worker task cancelled")]
    Cancelled,
}

/// Failure of a blocking call made through the [`Bridge`](crate::bridge::Bridge).
///
/// `E` is the error type of the wrapped operation. An operation failure is
/// returned as-is in [`BridgeError::Operation`], so callers can still match
/// on the original kind.
#[derive(Debug, Error)]
pub enum BridgeError<E> {
    /// The blocking operation itself returned an error.
    #[error(transparent)]
    Operation(E),

    /// The blocking operation panicked.
    #[error("blocking operation panicked: {message}")]
    Panicked { message: String },

    /// The caller stopped waiting after the configured per-call timeout.
    #[error("blocking operation timed out after {ms}ms")]
    Timeout { ms: u64 },

    /// The worker pool could not run the operation.
    #[error("worker pool unavailable: {0}")]
    Unavailable(String),
}

impl<E> BridgeError<E> {
    /// Borrow the original operation error, if that is what failed.
    pub fn operation(&self) -> Option<&E> {
        match self {
            Self::Operation(e) => Some(e),
            _ => None,
        }
    }

    /// Take the original operation error, if that is what failed.
    pub fn into_operation(self) -> Option<E> {
        match self {
            Self::Operation(e) => Some(e),
            _ => None,
        }
    }

    /// Returns `true` if the caller gave up waiting.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    /// Convert the operation error, keeping the other variants.
    pub fn map_operation<F, O>(self, f: O) -> BridgeError<F>
    where
        O: FnOnce(E) -> F,
    {
        match self {
            Self::Operation(e) => BridgeError::Operation(f(e)),
            Self::Panicked { message } => BridgeError::Panicked { message },
            Self::Timeout { ms } => BridgeError::Timeout { ms },
            Self::Unavailable(reason) => BridgeError::Unavailable(reason),
        }
    }
}

impl<E> From<PoolError> for BridgeError<E> {
    fn from(err: PoolError) -> Self {
        match err {
            PoolError::Panicked(message) => Self::Panicked { message },
            other => Self::Unavailable(other.to_string()),
        }
    }
}

/// Failure of a single unit of work inside a batch.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum UnitError {
    /// The remote call reported a failure.
    #[error("call {index} failed: {reason}")]
    Failed { index: usize, reason: String },

    /// The remote call did not finish within the per-unit timeout.
    #[error("call {index} timed out after {ms}ms")]
    Timeout { index: usize, ms: u64 },
}

impl UnitError {
    /// Index of the unit that failed.
    pub fn index(&self) -> usize {
        match self {
            Self::Failed { index, .. } | Self::Timeout { index, .. } => *index,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

/// Errors returned by the [`BatchExecutor`](crate::batch::BatchExecutor)
/// and the [`TimingHarness`](crate::timing::TimingHarness).
#[derive(Debug, Error)]
pub enum BatchError {
    /// At least one unit of a chunk failed. `source` is the first failure
    /// observed; the others are counted in `failed` and discarded.
    #[error("chunk {chunk} failed ({failed} of {size} units): {source}")]
    UnitFailed {
        chunk: usize,
        failed: usize,
        size: usize,
        #[source]
        source: UnitError,
    },

    /// The batch was cancelled; outstanding units were dropped.
    #[error("batch cancelled after {completed} of {total} units")]
    Cancelled { completed: usize, total: usize },

    /// Chunk size must be at least one.
    #[error("invalid chunk size: {0} (must be >= 1)")]
    InvalidChunkSize(usize),

    /// A batch task spawned by the timing harness panicked or was aborted.
    #[error("batch task failed: {0}")]
    Join(String),
}

impl BatchError {
    /// Returns `true` if the batch failed because a unit timed out.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::UnitFailed { source, .. } if source.is_timeout())
    }
}

/// Invalid configuration values.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value for `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Error, PartialEq)]
    #[error("record {0} missing")]
    struct Missing(u32);

    #[test]
    fn operation_error_keeps_kind_and_message() {
        let err: BridgeError<Missing> = BridgeError::Operation(Missing(7));
        assert_eq!(err.to_string(), "record 7 missing");
        assert_eq!(err.operation(), Some(&Missing(7)));
        assert_eq!(err.into_operation(), Some(Missing(7)));
    }

    #[test]
    fn pool_panic_becomes_bridge_panic() {
        let err: BridgeError<Missing> = PoolError::Panicked("boom".into()).into();
        assert!(matches!(err, BridgeError::Panicked { ref message } if message == "boom"));
        assert!(err.operation().is_none());

        let err: BridgeError<Missing> = PoolError::Closed.into();
        assert!(matches!(err, BridgeError::Unavailable(_)));
    }

    #[test]
    fn batch_timeout_detection() {
        let err = BatchError::UnitFailed {
            chunk: 0,
            failed: 1,
            size: 5,
            source: UnitError::Timeout { index: 3, ms: 10 },
        };
        assert!(err.is_timeout());
        assert!(err.to_string().contains("call 3 timed out"));
    }
}
