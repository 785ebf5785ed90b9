//! `BatchExecutor`: bounded, chunked fan-out of remote calls.
//!
//! The index range `[0, total)` is split into chunks of `chunk_size`. Units
//! in a chunk run concurrently on the calling task; the next chunk is only
//! dispatched once every unit of the current one has settled. Peak
//! concurrency is therefore `chunk_size`.
//!
//! Results always come back in index order, whatever order the units
//! finished in.

use std::num::NonZeroUsize;
use std::ops::Range;
use std::sync::Arc;
use std::time::Duration;

use futures::stream::{FuturesUnordered, StreamExt};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::call::{ApiCallResult, RemoteCall, SimulatedCall};
use crate::config::BatchConfig;
use crate::error::{BatchError, UnitError};
use crate::partition::chunk_ranges;

/// Ordered results of a batch.
#[derive(Debug, Clone)]
pub struct BatchResult<T> {
    /// One entry per unit, in index order.
    pub results: Vec<T>,
    /// Number of chunks dispatched.
    pub chunks: usize,
    /// Wall-clock time spent in the batch.
    pub elapsed: Duration,
}

impl<T> BatchResult<T> {
    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.results.iter()
    }

    pub fn into_results(self) -> Vec<T> {
        self.results
    }
}

/// Chunked batch executor.
#[derive(Debug, Clone, Default)]
pub struct BatchExecutor {
    unit_timeout: Option<Duration>,
}

impl BatchExecutor {
    pub fn new(config: &BatchConfig) -> Self {
        Self {
            unit_timeout: config.unit_timeout(),
        }
    }

    /// Fail any unit that runs longer than `limit`.
    pub fn with_unit_timeout(mut self, limit: Option<Duration>) -> Self {
        self.unit_timeout = limit;
        self
    }

    pub fn unit_timeout(&self) -> Option<Duration> {
        self.unit_timeout
    }

    /// Run `total` simulated remote calls, each sleeping `per_unit_delay`,
    /// `chunk_size` at a time.
    pub async fn run_batched(
        &self,
        total: usize,
        chunk_size: usize,
        per_unit_delay: Duration,
    ) -> Result<BatchResult<ApiCallResult>, BatchError> {
        self.run_with(total, chunk_size, Arc::new(SimulatedCall::new(per_unit_delay)))
            .await
    }

    /// Run `total` units of `call`, `chunk_size` at a time.
    pub async fn run_with<C: RemoteCall>(
        &self,
        total: usize,
        chunk_size: usize,
        call: Arc<C>,
    ) -> Result<BatchResult<C::Output>, BatchError> {
        self.run_with_cancel(total, chunk_size, call, &CancellationToken::new())
            .await
    }

    /// Like [`run_with`](Self::run_with), aborting when `cancel` fires.
    ///
    /// On cancellation the in-flight chunk's outstanding units are dropped
    /// and no further chunk is dispatched.
    pub async fn run_with_cancel<C: RemoteCall>(
        &self,
        total: usize,
        chunk_size: usize,
        call: Arc<C>,
        cancel: &CancellationToken,
    ) -> Result<BatchResult<C::Output>, BatchError> {
        let size = NonZeroUsize::new(chunk_size).ok_or(BatchError::InvalidChunkSize(chunk_size))?;
        let start = Instant::now();
        let mut results = Vec::new();
        let mut chunks = 0usize;

        if total == 0 {
            return Ok(BatchResult { results, chunks, elapsed: start.elapsed() });
        }

        info!(total, chunk_size, "batch started");

        for (chunk, range) in chunk_ranges(total, size).enumerate() {
            if cancel.is_cancelled() {
                return Err(BatchError::Cancelled { completed: results.len(), total });
            }

            let outcome = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    warn!(chunk, completed = results.len(), total, "batch cancelled");
                    return Err(BatchError::Cancelled { completed: results.len(), total });
                }
                outcome = self.run_chunk(chunk, range, call.as_ref()) => outcome,
            };

            results.extend(outcome?);
            chunks += 1;
        }

        let elapsed = start.elapsed();
        info!(
            total,
            chunks,
            elapsed_ms = elapsed.as_millis() as u64,
            "batch complete"
        );
        Ok(BatchResult { results, chunks, elapsed })
    }

    /// Run every unit of one chunk concurrently and wait for all of them.
    async fn run_chunk<C: RemoteCall>(
        &self,
        chunk: usize,
        range: Range<usize>,
        call: &C,
    ) -> Result<Vec<C::Output>, BatchError> {
        let size = range.len();
        let offset = range.start;
        debug!(chunk, start = range.start, end = range.end, "dispatching chunk");

        let mut pending: FuturesUnordered<_> =
            range.map(|index| self.run_unit(call, index)).collect();

        let mut slots: Vec<Option<C::Output>> = std::iter::repeat_with(|| None).take(size).collect();
        let mut first_failure: Option<UnitError> = None;
        let mut failed = 0usize;

        while let Some((index, outcome)) = pending.next().await {
            match outcome {
                Ok(value) => slots[index - offset] = Some(value),
                Err(err) => {
                    failed += 1;
                    warn!(chunk, index, error = %err, "unit failed");
                    if first_failure.is_none() {
                        first_failure = Some(err);
                    }
                }
            }
        }

        if let Some(source) = first_failure {
            return Err(BatchError::UnitFailed { chunk, failed, size, source });
        }
        Ok(slots.into_iter().flatten().collect())
    }

    async fn run_unit<C: RemoteCall>(
        &self,
        call: &C,
        index: usize,
    ) -> (usize, Result<C::Output, UnitError>) {
        let outcome = match self.unit_timeout {
            Some(limit) => match tokio::time::timeout(limit, call.call(index)).await {
                Ok(outcome) => outcome,
                Err(_) => Err(UnitError::Timeout {
                    index,
                    ms: limit.as_millis() as u64,
                }),
            },
            None => call.call(index).await,
        };
        (index, outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Sleeps a per-index delay and tracks how many calls overlap.
    struct Recorder {
        delays: Vec<Duration>,
        fail_at: Vec<usize>,
        in_flight: AtomicUsize,
        peak: AtomicUsize,
        started: AtomicUsize,
    }

    impl Recorder {
        fn new(delays: Vec<Duration>) -> Self {
            Self {
                delays,
                fail_at: vec![],
                in_flight: AtomicUsize::new(0),
                peak: AtomicUsize::new(0),
                started: AtomicUsize::new(0),
            }
        }

        fn failing(mut self, fail_at: Vec<usize>) -> Self {
            self.fail_at = fail_at;
            self
        }
    }

    #[async_trait]
    impl RemoteCall for Recorder {
        type Output = usize;

        async fn call(&self, index: usize) -> Result<usize, UnitError> {
            self.started.fetch_add(1, Ordering::SeqCst);
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(self.delays[index]).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            if self.fail_at.contains(&index) {
                return Err(UnitError::Failed { index, reason: "remote said no".into() });
            }
            Ok(index * 10)
        }
    }

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[tokio::test(start_paused = true)]
    async fn results_follow_index_order_not_completion_order() {
        // Later indices finish first inside every chunk.
        let delays: Vec<_> = (0..7).map(|i| ms(100 - i as u64 * 10)).collect();
        let recorder = Arc::new(Recorder::new(delays));
        let out = BatchExecutor::default().run_with(7, 3, recorder).await.unwrap();
        assert_eq!(out.results, vec![0, 10, 20, 30, 40, 50, 60]);
        assert_eq!(out.chunks, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn in_flight_never_exceeds_chunk_size() {
        let recorder = Arc::new(Recorder::new(vec![ms(50); 23]));
        let out = BatchExecutor::default()
            .run_with(23, 4, Arc::clone(&recorder))
            .await
            .unwrap();
        assert_eq!(out.len(), 23);
        assert_eq!(recorder.peak.load(Ordering::SeqCst), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn chunks_run_back_to_back() {
        let out = BatchExecutor::default().run_batched(10, 5, ms(100)).await.unwrap();
        assert_eq!(out.len(), 10);
        assert_eq!(out.chunks, 2);
        assert!(out.elapsed >= ms(200) && out.elapsed < ms(220), "elapsed {:?}", out.elapsed);
        let indices: Vec<usize> = out.iter().map(|r| r.index).collect();
        assert_eq!(indices, (0..10).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn empty_batch_dispatches_nothing() {
        let recorder = Arc::new(Recorder::new(vec![]));
        let out = BatchExecutor::default()
            .run_with(0, 5, Arc::clone(&recorder))
            .await
            .unwrap();
        assert!(out.is_empty());
        assert_eq!(out.chunks, 0);
        assert_eq!(recorder.started.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn huge_total_allocates_per_chunk() {
        let recorder = Arc::new(Recorder::new(vec![ms(10); 2]).failing(vec![1]));
        let err = BatchExecutor::default()
            .run_with(usize::MAX, 2, Arc::clone(&recorder))
            .await
            .unwrap_err();
        assert!(matches!(err, BatchError::UnitFailed { chunk: 0, failed: 1, size: 2, .. }));
        assert_eq!(recorder.started.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn zero_chunk_size_rejected() {
        let err = BatchExecutor::default().run_batched(3, 0, ms(1)).await.unwrap_err();
        assert!(matches!(err, BatchError::InvalidChunkSize(0)));
    }

    #[tokio::test(start_paused = true)]
    async fn failing_chunk_settles_then_fails_batch() {
        // Chunk 1 holds indices 3..6; index 5 fails fast, index 4 fails slow.
        let mut delays = vec![ms(10); 9];
        delays[4] = ms(80);
        delays[5] = ms(5);
        let recorder = Arc::new(Recorder::new(delays).failing(vec![4, 5]));

        let err = BatchExecutor::default()
            .run_with(9, 3, Arc::clone(&recorder))
            .await
            .unwrap_err();

        match err {
            BatchError::UnitFailed { chunk, failed, size, source } => {
                assert_eq!(chunk, 1);
                assert_eq!(failed, 2);
                assert_eq!(size, 3);
                // First failure in completion order.
                assert_eq!(source.index(), 5);
            }
            other => panic!("expected UnitFailed, got {other:?}"),
        }
        // Every unit of the failing chunk ran to completion; chunk 2 never started.
        assert_eq!(recorder.started.load(Ordering::SeqCst), 6);
        assert_eq!(recorder.in_flight.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn slow_unit_times_out() {
        let mut delays = vec![ms(10); 4];
        delays[2] = ms(500);
        let recorder = Arc::new(Recorder::new(delays));
        let err = BatchExecutor::default()
            .with_unit_timeout(Some(ms(100)))
            .run_with(4, 4, recorder)
            .await
            .unwrap_err();
        assert!(err.is_timeout());
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_drops_outstanding_units() {
        let recorder = Arc::new(Recorder::new(vec![ms(100); 10]));
        let token = CancellationToken::new();
        let trigger = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(ms(150)).await;
            trigger.cancel();
        });

        let err = BatchExecutor::default()
            .run_with_cancel(10, 2, Arc::clone(&recorder), &token)
            .await
            .unwrap_err();

        assert!(matches!(err, BatchError::Cancelled { completed: 2, total: 10 }));
        // Chunk 0 finished, chunk 1 was in flight and dropped, nothing after.
        assert_eq!(recorder.started.load(Ordering::SeqCst), 4);
    }
}
