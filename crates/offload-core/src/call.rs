//! The `RemoteCall` trait: one unit of work inside a batch.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::UnitError;

/// A slow, independent operation identified by its position in a batch.
///
/// # Thread Safety
/// Implementations must be `Send + Sync`; the timing harness runs batches
/// on separate Tokio tasks that share the same call.
#[async_trait]
pub trait RemoteCall: Send + Sync + 'static {
    /// Value produced by one call.
    type Output: Send + 'static;

    /// Perform the call for unit `index`.
    async fn call(&self, index: usize) -> Result<Self::Output, UnitError>;
}

/// Result of one simulated remote call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiCallResult {
    /// Position of the unit in the batch.
    pub index: usize,
    /// Payload returned by the "remote" side.
    pub result: f64,
    /// How long the call slept, in seconds.
    pub slept_secs: f64,
}

/// Stand-in for a remote dependency: sleeps for `delay`, then returns a
/// random value.
#[derive(Debug, Clone, Copy)]
pub struct SimulatedCall {
    delay: Duration,
}

impl SimulatedCall {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }
}

#[async_trait]
impl RemoteCall for SimulatedCall {
    type Output = ApiCallResult;

    async fn call(&self, index: usize) -> Result<ApiCallResult, UnitError> {
        tokio::time::sleep(self.delay).await;
        let slept_secs = self.delay.as_secs_f64();
        tracing::debug!(index, slept_secs, "remote call finished");
        Ok(ApiCallResult {
            index,
            result: rand::random::<f64>(),
            slept_secs,
        })
    }
}
