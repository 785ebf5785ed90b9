//! SQLite-backed `RecordStore`.
//!
//! ## Schema
//! ```sql
//! CREATE TABLE entries (
//!     id      INTEGER PRIMARY KEY AUTOINCREMENT,
//!     message TEXT    NOT NULL,
//!     count   INTEGER NOT NULL DEFAULT 0 CHECK (count >= 0)
//! );
//! ```

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::error::StoreError;
use crate::record::{Record, RecordId, RecordStore};

/// SQLite record store.
///
/// Thread-safe via an internal `Arc<Mutex<Connection>>`. WAL mode is enabled
/// for file-backed databases.
#[derive(Clone)]
pub struct SqliteRecordStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteRecordStore {
    /// Open (or create) a database at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let conn = Connection::open(path.as_ref()).map_err(sqlite_err)?;

        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")
            .map_err(sqlite_err)?;

        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS entries (
                id      INTEGER PRIMARY KEY AUTOINCREMENT,
                message TEXT    NOT NULL,
                count   INTEGER NOT NULL DEFAULT 0 CHECK (count >= 0)
            );",
        )
        .map_err(sqlite_err)?;

        tracing::debug!(path = %path.as_ref().display(), "sqlite record store opened");
        Ok(Self { conn: Arc::new(Mutex::new(conn)) })
    }

    /// Open an in-memory database (useful for tests).
    pub fn in_memory() -> Result<Self, StoreError> {
        Self::open(":memory:")
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn.lock().map_err(|_| StoreError::Poisoned)
    }
}

fn row_to_record(row: &Row<'_>) -> rusqlite::Result<Record> {
    Ok(Record {
        id: row.get(0)?,
        message: row.get(1)?,
        count: row.get(2)?,
    })
}

fn sqlite_err(e: rusqlite::Error) -> StoreError {
    StoreError::Database(e.to_string())
}

impl RecordStore for SqliteRecordStore {
    fn fetch_all(&self) -> Result<Vec<Record>, StoreError> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare("SELECT id, message, count FROM entries ORDER BY id")
            .map_err(sqlite_err)?;
        let rows = stmt.query_map([], row_to_record).map_err(sqlite_err)?;
        let records = rows.collect::<rusqlite::Result<Vec<_>>>().map_err(sqlite_err)?;
        Ok(records)
    }

    fn fetch_one(&self, id: RecordId) -> Result<Record, StoreError> {
        self.conn()?
            .query_row(
                "SELECT id, message, count FROM entries WHERE id = ?1",
                params![id],
                row_to_record,
            )
            .optional()
            .map_err(sqlite_err)?
            .ok_or(StoreError::NotFound { id })
    }

    fn insert(&self, message: &str) -> Result<Record, StoreError> {
        let conn = self.conn()?;
        conn.execute("INSERT INTO entries (message, count) VALUES (?1, 0)", params![message])
            .map_err(sqlite_err)?;
        Ok(Record {
            id: conn.last_insert_rowid(),
            message: message.to_string(),
            count: 0,
        })
    }

    fn save(&self, record: &Record) -> Result<(), StoreError> {
        let changed = self
            .conn()?
            .execute(
                "UPDATE entries SET message = ?1, count = ?2 WHERE id = ?3",
                params![record.message, record.count, record.id],
            )
            .map_err(sqlite_err)?;
        if changed == 0 {
            return Err(StoreError::NotFound { id: record.id });
        }
        Ok(())
    }

    fn increment_all(&self) -> Result<usize, StoreError> {
        self.conn()?
            .execute(
                "UPDATE entries SET count = MIN(count + 1, ?1)",
                params![u32::MAX],
            )
            .map_err(sqlite_err)
    }
}
