/// SQLite-backed slot.
pub mod sqlite;

use std::sync::{Arc, Mutex};

use hashbrown::HashMap;
use thiserror::Error;

/// Failure of a slot operation.
#[derive(Debug, Error)]
pub enum SlotError {
    /// Write would exceed the slot's capacity.
    #[error("Speicher voll: {needed} Bytes benötigt, {quota} verfügbar")]
    QuotaExceeded {
        /// Bytes the write required.
        needed: usize,
        /// Bytes still free.
        quota: usize,
    },
    /// SQLite error.
    #[error("SQLite-Fehler: {0}")]
    Sqlite(#[from] rusqlite::Error),
    /// Document could not be serialized.
    #[error("Serialisierungsfehler: {0}")]
    Serde(#[from] serde_json::Error),
    /// Other failure.
    #[error("{0}")]
    Message(String),
}

impl SlotError {
    /// True when the write failed only because the medium is out of space.
    pub fn is_quota_exceeded(&self) -> bool {
        matches!(self, Self::QuotaExceeded { .. })
    }
}

/// Result of a slot operation.
pub type SlotResult<T> = Result<T, SlotError>;

/// Named key/value slot holding whole documents.
///
/// `write` must be atomic: on failure the previous value stays readable.
pub trait Slot: Send {
    /// Current value of `key`.
    fn read(&self, key: &str) -> SlotResult<Option<String>>;
    /// Replaces the value of `key`.
    fn write(&mut self, key: &str, value: &str) -> SlotResult<()>;
    /// Deletes `key`; a missing key is not an error.
    fn remove(&mut self, key: &str) -> SlotResult<()>;
    /// Total capacity in bytes, `None` when unbounded.
    fn capacity(&self) -> Option<usize> {
        None
    }
}

#[derive(Debug, Default)]
struct MemoryInner {
    entries: HashMap<String, String>,
    quota: Option<usize>,
    writes: usize,
}

/// In-process slot with an optional byte quota across all keys.
///
/// Clones share the same storage, so a caller can keep one to inspect what
/// a store wrote.
#[derive(Debug, Clone, Default)]
pub struct MemorySlot {
    inner: Arc<Mutex<MemoryInner>>,
}

impl MemorySlot {
    /// Unbounded slot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Slot holding at most `quota` bytes of keys and values.
    pub fn with_quota(quota: usize) -> Self {
        Self {
            inner: Arc::new(Mutex::new(MemoryInner {
                quota: Some(quota),
                ..MemoryInner::default()
            })),
        }
    }

    /// Stores `value` bypassing the quota.
    pub fn put_raw(&self, key: &str, value: &str) -> SlotResult<()> {
        let mut inner = self.lock()?;
        inner.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    /// Successful writes so far.
    pub fn write_count(&self) -> usize {
        self.lock().map(|inner| inner.writes).unwrap_or(0)
    }

    fn lock(&self) -> SlotResult<std::sync::MutexGuard<'_, MemoryInner>> {
        self.inner
            .lock()
            .map_err(|_| SlotError::Message("memory slot poisoned".to_string()))
    }
}

impl Slot for MemorySlot {
    fn read(&self, key: &str) -> SlotResult<Option<String>> {
        Ok(self.lock()?.entries.get(key).cloned())
    }

    fn write(&mut self, key: &str, value: &str) -> SlotResult<()> {
        let mut inner = self.lock()?;
        if let Some(quota) = inner.quota {
            let used: usize = inner
                .entries
                .iter()
                .filter(|(k, _)| k.as_str() != key)
                .map(|(k, v)| k.len() + v.len())
                .sum();
            let needed = key.len() + value.len();
            if used + needed > quota {
                return Err(SlotError::QuotaExceeded {
                    needed,
                    quota: quota.saturating_sub(used),
                });
            }
        }
        inner.entries.insert(key.to_string(), value.to_string());
        inner.writes += 1;
        Ok(())
    }

    fn remove(&mut self, key: &str) -> SlotResult<()> {
        self.lock()?.entries.remove(key);
        Ok(())
    }

    fn capacity(&self) -> Option<usize> {
        self.lock().ok().and_then(|inner| inner.quota)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quota_rejects_without_replacing_previous_value() {
        let mut slot = MemorySlot::with_quota(20);
        slot.write("k", "small").unwrap();
        let err = slot.write("k", &"x".repeat(40)).unwrap_err();
        assert!(err.is_quota_exceeded());
        assert_eq!(slot.read("k").unwrap().as_deref(), Some("small"));
        assert_eq!(slot.write_count(), 1);
    }

    #[test]
    fn clones_share_storage() {
        let slot = MemorySlot::new();
        let mut writer = slot.clone();
        writer.write("k", "v").unwrap();
        assert_eq!(slot.read("k").unwrap().as_deref(), Some("v"));
        writer.remove("k").unwrap();
        assert_eq!(slot.read("k").unwrap(), None);
    }
}
