//! SQLite-backed durable slot.

use std::path::Path;

use rusqlite::{Connection, ErrorCode, OptionalExtension, params};

use crate::types::now_ms;

use super::{Slot, SlotError, SlotResult};

/// SQLite implementation of [`crate::persist::Slot`].
///
/// Each key is one row; a write replaces the row inside a transaction, so a
/// failed write leaves the previous document in place.
pub struct SqliteSlot {
    conn: Connection,
    quota: Option<usize>,
}

impl SqliteSlot {
    /// Opens or creates a slot database at `path`.
    ///
    /// Enables WAL mode and sets `synchronous=NORMAL`. `quota` caps the total
    /// stored bytes across all keys.
    pub fn open(path: impl AsRef<Path>, quota: Option<usize>) -> SlotResult<Self> {
        let conn = Connection::open(path)?;
        Self::init_connection(conn, quota)
    }

    /// Opens an in-memory slot database.
    pub fn open_in_memory(quota: Option<usize>) -> SlotResult<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init_connection(conn, quota)
    }

    fn init_connection(conn: Connection, quota: Option<usize>) -> SlotResult<Self> {
        conn.execute_batch(include_str!("schema.sql"))?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        Ok(Self { conn, quota })
    }

    /// Bytes currently stored under keys other than `except`.
    fn used_bytes(conn: &Connection, except: &str) -> SlotResult<usize> {
        let used: i64 = conn.query_row(
            "SELECT COALESCE(SUM(LENGTH(CAST(key AS BLOB)) + LENGTH(CAST(value AS BLOB))), 0) FROM slots WHERE key <> ?1",
            params![except],
            |row| row.get(0),
        )?;
        Ok(used.max(0) as usize)
    }
}

impl Slot for SqliteSlot {
    fn read(&self, key: &str) -> SlotResult<Option<String>> {
        let value = self
            .conn
            .query_row("SELECT value FROM slots WHERE key = ?1", params![key], |row| row.get(0))
            .optional()?;
        Ok(value)
    }

    fn write(&mut self, key: &str, value: &str) -> SlotResult<()> {
        let quota = self.quota;
        let tx = self.conn.transaction()?;
        if let Some(quota) = quota {
            let used = Self::used_bytes(&tx, key)?;
            let needed = key.len() + value.len();
            if used + needed > quota {
                return Err(SlotError::QuotaExceeded {
                    needed,
                    quota: quota.saturating_sub(used),
                });
            }
        }
        tx.execute(
            "INSERT INTO slots(key, value, ts_ms) VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, ts_ms = excluded.ts_ms",
            params![key, value, now_ms() as i64],
        )
        .map_err(|err| map_disk_full(err, value.len()))?;
        tx.commit().map_err(|err| map_disk_full(err, value.len()))?;
        Ok(())
    }

    fn remove(&mut self, key: &str) -> SlotResult<()> {
        self.conn.execute("DELETE FROM slots WHERE key = ?1", params![key])?;
        Ok(())
    }

    fn capacity(&self) -> Option<usize> {
        self.quota
    }
}

fn map_disk_full(err: rusqlite::Error, needed: usize) -> SlotError {
    match err {
        rusqlite::Error::SqliteFailure(e, _) if e.code == ErrorCode::DiskFull => {
            SlotError::QuotaExceeded { needed, quota: 0 }
        }
        other => SlotError::Sqlite(other),
    }
}
