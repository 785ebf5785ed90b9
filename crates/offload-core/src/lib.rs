//! offload-core: run blocking work and slow remote calls without stalling
//! the async scheduler.
//!
//! # Overview
//!
//! - [`Bridge`]: runs a blocking closure on a bounded worker pool and
//!   resumes the awaiting task with its result or its original error
//! - [`BatchExecutor`]: fans out N remote calls in fixed-size chunks and
//!   collects results in index order
//! - [`TimingHarness`]: times two batches run sequentially or concurrently
//! - [`partition`] module: the chunk partitioner both build on
//! - [`config`] module: `BridgeConfig` / `BatchConfig`

pub mod batch;
pub mod bridge;
pub mod call;
pub mod config;
pub mod error;
pub mod partition;
pub mod pool;
pub mod timing;

pub use batch::{BatchExecutor, BatchResult};
pub use bridge::{Bridge, BridgeTask};
pub use call::{ApiCallResult, RemoteCall, SimulatedCall};
pub use config::{BatchConfig, BridgeConfig};
pub use error::{BatchError, BridgeError, ConfigError, PoolError, UnitError};
pub use partition::{chunk_ranges, partition, ChunkRanges};
pub use pool::{BlockingPool, TokioBlockingPool};
pub use timing::{Mode, TimingHarness, TimingReport};

pub use tokio_util::sync::CancellationToken;
