//! Shared application state handed to every handler.

use std::sync::Arc;
use std::time::Duration;

use offload_core::{BatchConfig, BatchExecutor, Bridge, TimingHarness};
use offload_store::{MemoryRecordStore, RecordStore, StoreError};
#[cfg(feature = "sqlite")]
use offload_store::SqliteRecordStore;
use serde_json::Value;

use crate::config::WebConfig;
use crate::error::AppError;
use crate::render::{JsonRenderer, RenderedPage, Renderer};

/// Per-request defaults for the optional query parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Defaults {
    pub delay_ms: u64,
    pub batch_size: usize,
    /// Simulated calls per batch.
    pub total: usize,
}

/// Everything the handlers compose.
pub struct AppState {
    pub bridge: Bridge,
    pub executor: BatchExecutor,
    pub harness: TimingHarness,
    pub store: Arc<dyn RecordStore>,
    pub renderer: Arc<dyn Renderer>,
    pub defaults: Defaults,
}

impl AppState {
    pub fn new(
        bridge: Bridge,
        batch: &BatchConfig,
        web: &WebConfig,
        store: Arc<dyn RecordStore>,
    ) -> Self {
        let executor = BatchExecutor::new(batch);
        Self {
            bridge,
            harness: TimingHarness::new(executor.clone()),
            executor,
            store,
            renderer: Arc::new(JsonRenderer),
            defaults: Defaults {
                delay_ms: web.default_delay_ms,
                batch_size: batch.chunk_size,
                total: batch.total,
            },
        }
    }

    pub fn with_renderer(mut self, renderer: Arc<dyn Renderer>) -> Self {
        self.renderer = renderer;
        self
    }

    pub fn delay(&self, sleep_ms: Option<u64>) -> Duration {
        Duration::from_millis(sleep_ms.unwrap_or(self.defaults.delay_ms))
    }

    pub fn batch_size(&self, requested: Option<usize>) -> usize {
        requested.unwrap_or(self.defaults.batch_size)
    }

    /// Render `template` on the worker pool.
    pub async fn render(&self, template: &'static str, context: Value) -> Result<RenderedPage, AppError> {
        let renderer = Arc::clone(&self.renderer);
        Ok(self
            .bridge
            .run_blocking(move || renderer.render(template, context))
            .await?)
    }

    /// Run a record-store operation on the worker pool.
    pub async fn with_store<F, T>(&self, f: F) -> Result<T, AppError>
    where
        F: FnOnce(&dyn RecordStore) -> Result<T, StoreError> + Send + 'static,
        T: Send + 'static,
    {
        let store = Arc::clone(&self.store);
        Ok(self.bridge.run_blocking(move || f(store.as_ref())).await?)
    }
}

/// Open the configured record store and seed it when empty.
///
/// Blocks; call before the server starts accepting requests.
pub fn open_store(web: &WebConfig) -> Result<Arc<dyn RecordStore>, StoreError> {
    let store: Arc<dyn RecordStore> = match &web.database {
        #[cfg(feature = "sqlite")]
        Some(path) => Arc::new(SqliteRecordStore::open(path)?),
        #[cfg(not(feature = "sqlite"))]
        Some(path) => {
            return Err(StoreError::Database(format!(
                "cannot open {}: built without sqlite support",
                path.display()
            )))
        }
        None => Arc::new(MemoryRecordStore::new()),
    };

    if !web.seed.is_empty() && store.fetch_all()?.is_empty() {
        for message in &web.seed {
            store.insert(message)?;
        }
        tracing::info!(records = web.seed.len(), "record store seeded");
    }
    Ok(store)
}
