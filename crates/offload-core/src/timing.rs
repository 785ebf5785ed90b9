//! Sequential-vs-concurrent timing harness.
//!
//! Runs two equally sized batches either one after the other or as two
//! independent Tokio tasks and reports the wall-clock time taken.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tokio_util::task::AbortOnDropHandle;
use tracing::info;

use crate::batch::{BatchExecutor, BatchResult};
use crate::call::ApiCallResult;
use crate::error::BatchError;

/// Number of batches every comparison runs.
pub const BATCHES: usize = 2;

/// How the two batches are scheduled relative to each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Second batch starts after the first has completed.
    Sequential,
    /// Both batches start before either completes.
    Concurrent,
}

impl Mode {
    /// Adverb used on rendered pages ("sequentially" / "concurrently").
    pub fn label(&self) -> &'static str {
        match self {
            Self::Sequential => "sequentially",
            Self::Concurrent => "concurrently",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sequential => write!(f, "sequential"),
            Self::Concurrent => write!(f, "concurrent"),
        }
    }
}

impl FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sequential" | "sequentially" | "seq" => Ok(Self::Sequential),
            "concurrent" | "concurrently" | "conc" | "parallel" => Ok(Self::Concurrent),
            other => Err(format!("unknown mode '{other}' (expected sequential or concurrent)")),
        }
    }
}

/// Outcome of one comparison run. Purely observational.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimingReport {
    pub mode: Mode,
    pub label: String,
    /// Wall-clock duration of both batches together, in seconds.
    pub elapsed_secs: f64,
    /// Always [`BATCHES`].
    pub batches: usize,
    pub per_unit_delay_secs: f64,
    pub total: usize,
    pub chunk_size: usize,
    /// Units completed across both batches.
    pub units_completed: usize,
}

impl TimingReport {
    pub fn elapsed(&self) -> Duration {
        Duration::from_secs_f64(self.elapsed_secs)
    }
}

/// Runs batch pairs through a [`BatchExecutor`] and times them.
#[derive(Debug, Clone, Default)]
pub struct TimingHarness {
    executor: BatchExecutor,
}

impl TimingHarness {
    pub fn new(executor: BatchExecutor) -> Self {
        Self { executor }
    }

    pub fn executor(&self) -> &BatchExecutor {
        &self.executor
    }

    /// Run two batches of `total` simulated calls in the given `mode`.
    ///
    /// In concurrent mode each batch runs as its own task. Dropping the
    /// returned future aborts both.
    pub async fn compare(
        &self,
        mode: Mode,
        total: usize,
        chunk_size: usize,
        per_unit_delay: Duration,
    ) -> Result<TimingReport, BatchError> {
        let start = Instant::now();

        let units_completed = match mode {
            Mode::Sequential => {
                let first = self.executor.run_batched(total, chunk_size, per_unit_delay).await?;
                let second = self.executor.run_batched(total, chunk_size, per_unit_delay).await?;
                first.len() + second.len()
            }
            Mode::Concurrent => {
                let first = self.spawn_batch(total, chunk_size, per_unit_delay);
                let second = self.spawn_batch(total, chunk_size, per_unit_delay);
                let (first, second) = tokio::join!(first, second);
                let first = first.map_err(|e| BatchError::Join(e.to_string()))??;
                let second = second.map_err(|e| BatchError::Join(e.to_string()))??;
                first.len() + second.len()
            }
        };

        let elapsed_secs = start.elapsed().as_secs_f64();
        info!(
            mode = %mode,
            total,
            chunk_size,
            elapsed_secs,
            "timing comparison finished"
        );

        Ok(TimingReport {
            mode,
            label: mode.label().to_string(),
            elapsed_secs,
            batches: BATCHES,
            per_unit_delay_secs: per_unit_delay.as_secs_f64(),
            total,
            chunk_size,
            units_completed,
        })
    }

    fn spawn_batch(
        &self,
        total: usize,
        chunk_size: usize,
        per_unit_delay: Duration,
    ) -> AbortOnDropHandle<Result<BatchResult<ApiCallResult>, BatchError>> {
        let executor = self.executor.clone();
        AbortOnDropHandle::new(tokio::spawn(async move {
            executor.run_batched(total, chunk_size, per_unit_delay).await
        }))
    }
}
