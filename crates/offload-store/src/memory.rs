//! In-memory record store.
//!
//! Keeps records in a `BTreeMap` behind a mutex. All data is lost when the
//! process exits.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use crate::error::StoreError;
use crate::record::{Record, RecordId, RecordStore};

#[derive(Default)]
struct Table {
    rows: BTreeMap<RecordId, Record>,
    next_id: RecordId,
}

/// In-memory record store.
#[derive(Default)]
pub struct MemoryRecordStore {
    table: Mutex<Table>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store pre-populated with one record per message.
    pub fn with_messages<I, S>(messages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut table = Table::default();
        for message in messages {
            table.next_id += 1;
            let id = table.next_id;
            table.rows.insert(
                id,
                Record { id, message: message.as_ref().to_string(), count: 0 },
            );
        }
        Self { table: Mutex::new(table) }
    }

    fn table(&self) -> Result<MutexGuard<'_, Table>, StoreError> {
        self.table.lock().map_err(|_| StoreError::Poisoned)
    }
}

impl RecordStore for MemoryRecordStore {
    fn fetch_all(&self) -> Result<Vec<Record>, StoreError> {
        Ok(self.table()?.rows.values().cloned().collect())
    }

    fn fetch_one(&self, id: RecordId) -> Result<Record, StoreError> {
        self.table()?
            .rows
            .get(&id)
            .cloned()
            .ok_or(StoreError::NotFound { id })
    }

    fn insert(&self, message: &str) -> Result<Record, StoreError> {
        let mut table = self.table()?;
        table.next_id += 1;
        let record = Record { id: table.next_id, message: message.to_string(), count: 0 };
        table.rows.insert(record.id, record.clone());
        Ok(record)
    }

    fn save(&self, record: &Record) -> Result<(), StoreError> {
        let mut table = self.table()?;
        match table.rows.get_mut(&record.id) {
            Some(row) => {
                *row = record.clone();
                Ok(())
            }
            None => Err(StoreError::NotFound { id: record.id }),
        }
    }

    fn increment_all(&self) -> Result<usize, StoreError> {
        let mut table = self.table()?;
        for row in table.rows.values_mut() {
            row.count = row.count.saturating_add(1);
        }
        Ok(table.rows.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_and_fetch() {
        let store = MemoryRecordStore::new();
        let a = store.insert("first").unwrap();
        let b = store.insert("second").unwrap();
        assert_eq!((a.id, b.id), (1, 2));
        assert_eq!(store.fetch_one(2).unwrap().message, "second");
        assert_eq!(store.fetch_all().unwrap().len(), 2);
    }

    #[test]
    fn missing_record_is_not_found() {
        let store = MemoryRecordStore::with_messages(["only"]);
        assert_eq!(store.fetch_one(42).unwrap_err(), StoreError::NotFound { id: 42 });
        let ghost = Record { id: 9, message: "ghost".into(), count: 0 };
        assert!(store.save(&ghost).unwrap_err().is_not_found());
    }

    #[test]
    fn increment_and_save_bumps_counter() {
        let store = MemoryRecordStore::with_messages(["a"]);
        let mut rec = store.fetch_one(1).unwrap();
        rec.message = "renamed".into();
        let saved = store.increment_and_save(rec).unwrap();
        assert_eq!(saved.count, 1);
        assert_eq!(store.fetch_one(1).unwrap(), saved);
    }

    #[test]
    fn increment_all_touches_every_row() {
        let store = MemoryRecordStore::with_messages(["a", "b", "c"]);
        assert_eq!(store.increment_all().unwrap(), 3);
        assert_eq!(store.increment_all().unwrap(), 3);
        assert!(store.fetch_all().unwrap().iter().all(|r| r.count == 2));
    }

    #[test]
    fn poisoned_table_is_an_error() {
        let store = std::sync::Arc::new(MemoryRecordStore::with_messages(["a"]));
        let writer = std::sync::Arc::clone(&store);
        let _ = std::thread::spawn(move || {
            let _guard = writer.table.lock().unwrap();
            panic!("writer died holding the lock");
        })
        .join();

        assert_eq!(store.fetch_all().unwrap_err(), StoreError::Poisoned);
        assert_eq!(store.fetch_one(1).unwrap_err(), StoreError::Poisoned);
        assert_eq!(store.increment_all().unwrap_err(), StoreError::Poisoned);
    }
}
