//! offload-store: record-store backends for Offload.
//!
//! Every [`RecordStore`] method blocks the calling thread. Async callers go
//! through `offload_core::Bridge` rather than calling these directly.
//!
//! Backends:
//! - [`memory`]: in-memory (dev/testing, no persistence)
//! - [`sqlite`]: SQLite via `rusqlite` (single-file persistence)

pub mod error;
pub mod memory;
pub mod record;

#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use error::StoreError;
pub use memory::MemoryRecordStore;
pub use record::{Record, RecordId, RecordStore};

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteRecordStore;
