//! Property checks for the batch executor, the partitioner and the bridge.

use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use offload_core::{
    chunk_ranges, partition, BatchExecutor, Bridge, BridgeConfig, BridgeError, RemoteCall,
    UnitError,
};

// ─── Helpers ──────────────────────────────────────────────────────────────────

/// Sleeps a random 0–49 ms per call and records peak overlap.
struct Jittery {
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

impl Jittery {
    fn new() -> Self {
        Self { in_flight: AtomicUsize::new(0), peak: AtomicUsize::new(0) }
    }
}

#[async_trait]
impl RemoteCall for Jittery {
    type Output = usize;

    async fn call(&self, index: usize) -> Result<usize, UnitError> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        let jitter = rand::random::<u64>() % 50;
        tokio::time::sleep(Duration::from_millis(jitter)).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        Ok(index)
    }
}

// ─── Batch executor ───────────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn length_and_order_hold_for_random_delays() {
    let executor = BatchExecutor::default();
    for total in [0usize, 1, 4, 5, 6, 17, 30] {
        for chunk_size in [1usize, 2, 5, 8, 40] {
            let call = Arc::new(Jittery::new());
            let out = executor
                .run_with(total, chunk_size, Arc::clone(&call))
                .await
                .expect("batch should succeed");

            assert_eq!(out.len(), total);
            assert_eq!(out.results, (0..total).collect::<Vec<_>>());
            assert!(call.peak.load(Ordering::SeqCst) <= chunk_size);
            assert_eq!(out.chunks, chunk_ranges(total, NonZeroUsize::new(chunk_size).unwrap()).len());
        }
    }
}

// ─── Partitioner ──────────────────────────────────────────────────────────────

#[test]
fn partition_preserves_every_element() {
    for len in 0..50usize {
        let seq: Vec<usize> = (0..len).collect();
        for k in 1..12usize {
            let size = NonZeroUsize::new(k).unwrap();
            let chunks: Vec<&[usize]> = partition(&seq, size).collect();
            assert_eq!(chunks.iter().map(|c| c.len()).sum::<usize>(), len);
            assert!(chunks.iter().all(|c| !c.is_empty() && c.len() <= k));
            assert_eq!(chunks.concat(), seq);
        }
    }
}

// ─── Bridge ───────────────────────────────────────────────────────────────────

#[derive(Debug, PartialEq)]
enum StoreFault {
    NotFound(i64),
    Locked,
}

impl std::fmt::Display for StoreFault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound(id) => write!(f, "record {id} not found"),
            Self::Locked => write!(f, "database is locked"),
        }
    }
}

impl std::error::Error for StoreFault {}

#[tokio::test]
async fn bridge_preserves_failure_kind() {
    let bridge = Bridge::from_config(&BridgeConfig::default());

    let err = bridge
        .run_blocking(|| -> Result<(), StoreFault> { Err(StoreFault::NotFound(3)) })
        .await
        .unwrap_err();
    assert!(matches!(err, BridgeError::Operation(StoreFault::NotFound(3))));
    assert_eq!(err.to_string(), "record 3 not found");

    let err = bridge
        .run_blocking(|| -> Result<(), StoreFault> { Err(StoreFault::Locked) })
        .await
        .unwrap_err();
    assert_eq!(err.operation(), Some(&StoreFault::Locked));
}

#[tokio::test]
async fn bridge_calls_run_concurrently_up_to_capacity() {
    let bridge = Bridge::from_config(&BridgeConfig { max_workers: 4, call_timeout_ms: None });
    let running = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));

    let tasks: Vec<_> = (0..8)
        .map(|i| {
            let running = Arc::clone(&running);
            let peak = Arc::clone(&peak);
            bridge.spawn(move || -> Result<usize, StoreFault> {
                let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                std::thread::sleep(Duration::from_millis(30));
                running.fetch_sub(1, Ordering::SeqCst);
                Ok(i)
            })
        })
        .collect();

    let results: Vec<usize> = await_in_order(tasks).await;
    assert_eq!(results, (0..8).collect::<Vec<_>>());
    let peak = peak.load(Ordering::SeqCst);
    assert!(peak >= 2 && peak <= 4, "peak {peak}");
}

async fn await_in_order(tasks: Vec<offload_core::BridgeTask<usize, StoreFault>>) -> Vec<usize> {
    let mut out = Vec::with_capacity(tasks.len());
    for task in tasks {
        out.push(task.await.expect("blocking call failed"));
    }
    out
}
