//! Record-store error types.

use thiserror::Error;

use crate::record::RecordId;

/// Errors returned by a [`RecordStore`](crate::RecordStore).
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    /// No record with this id.
    #[error("Entry {id} not found")]
    NotFound { id: RecordId },

    /// The backing database reported an error.
    #[error("Database error: {0}")]
    Database(String),

    /// A writer panicked while holding the store lock.
    #[error("Store lock poisoned")]
    Poisoned,
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}
