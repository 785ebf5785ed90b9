//! The `Record` entity and the blocking `RecordStore` trait.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::StoreError;

/// Primary key of a record.
pub type RecordId = i64;

/// A text message with a non-negative counter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub id: RecordId,
    pub message: String,
    pub count: u32,
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.message, self.count)
    }
}

/// Blocking record storage.
///
/// # Thread Safety
/// Implementations must be `Send + Sync`; calls arrive from worker-pool
/// threads, several at a time.
pub trait RecordStore: Send + Sync + 'static {
    /// All records, ordered by id.
    fn fetch_all(&self) -> Result<Vec<Record>, StoreError>;

    /// One record, or [`StoreError::NotFound`].
    fn fetch_one(&self, id: RecordId) -> Result<Record, StoreError>;

    /// Create a record with a zero counter.
    fn insert(&self, message: &str) -> Result<Record, StoreError>;

    /// Persist `record` as-is. The record must already exist.
    fn save(&self, record: &Record) -> Result<(), StoreError>;

    /// Add one to every record's counter. Returns the number of records touched.
    fn increment_all(&self) -> Result<usize, StoreError>;

    /// Bump the counter of `record`, persist it and return the saved value.
    fn increment_and_save(&self, mut record: Record) -> Result<Record, StoreError> {
        record.count = record.count.saturating_add(1);
        self.save(&record)?;
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_matches_message_and_count() {
        let r = Record { id: 1, message: "hello".into(), count: 3 };
        assert_eq!(r.to_string(), "hello: 3");
    }
}
