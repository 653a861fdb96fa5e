//! History ledger: the capped, persisted list of past operations.
//!
//! # Storage
//!
//! The whole collection is one JSON array under a single key
//! ([`STORAGE_KEY`]). There is no schema version and no migration: a value
//! that fails to parse is treated as "no records" and logged.
//!
//! # Ordering and capacity
//!
//! New entries are prepended and the collection is truncated to
//! [`MAX_RECORDS`], so the oldest entries fall off the end. Reads sort by
//! `created_at` descending with a stable sort, so entries sharing a
//! timestamp keep their stored (newest-inserted-first) order.
//!
//! # Failure policy
//!
//! | Operation | On storage failure |
//! |---|---|
//! | `list`, `get`, `count` | empty / `None` / 0, logged |
//! | `add`, `update` | error returned to caller |
//! | `delete`, `clear` | `false`, logged |
//!
//! Losing a new record silently is not acceptable; losing a history listing is.

use crate::storage::{KeyValueStore, StorageError};
use crate::types::{EntryUpdate, HistoryEntry, NewEntry};
use rand::Rng;
use thiserror::Error;

/// Storage key the ledger lives under.
pub const STORAGE_KEY: &str = "watermark_records";

/// Maximum number of entries kept.
pub const MAX_RECORDS: usize = 50;

#[derive(Error, Debug)]
pub enum HistoryError {
    #[error("Failed to read history: {0}")]
    StorageRead(#[source] StorageError),
    #[error("Failed to write history: {0}")]
    StorageWrite(#[source] StorageError),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Source of creation timestamps (milliseconds since the Unix epoch).
pub trait Clock {
    fn now_millis(&self) -> i64;
}

/// Wall clock backed by `chrono`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        chrono::Utc::now().timestamp_millis()
    }
}

/// Ledger over any [`KeyValueStore`].
pub struct Ledger<S, C = SystemClock> {
    store: S,
    clock: C,
}

impl<S: KeyValueStore> Ledger<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            clock: SystemClock,
        }
    }
}

impl<S: KeyValueStore, C: Clock> Ledger<S, C> {
    pub fn with_clock(store: S, clock: C) -> Self {
        Self { store, clock }
    }

    /// All entries, newest first. Storage or decode failures yield an empty list.
    pub fn list(&self) -> Vec<HistoryEntry> {
        match self.load() {
            Ok(mut entries) => {
                entries.sort_by(|a, b| b.created_at.cmp(&a.created_at));
                entries
            }
            Err(e) => {
                tracing::warn!(error = %e, "history read failed, showing no records");
                Vec::new()
            }
        }
    }

    /// Store a new entry and return it with its assigned id and timestamp.
    pub fn add(&self, entry: NewEntry) -> Result<HistoryEntry, HistoryError> {
        let mut entries = self.list();
        let created_at = self.clock.now_millis();
        let stored = entry.into_entry(generate_id(created_at), created_at);

        entries.insert(0, stored.clone());
        entries.truncate(MAX_RECORDS);
        self.persist(&entries)?;

        tracing::debug!(id = %stored.id, total = entries.len(), "history entry added");
        Ok(stored)
    }

    /// Merge `update` into the entry with `id`. `Ok(None)` if no such entry.
    pub fn update(
        &self,
        id: &str,
        update: EntryUpdate,
    ) -> Result<Option<HistoryEntry>, HistoryError> {
        let mut entries = self.list();
        let Some(entry) = entries.iter_mut().find(|e| e.id == id) else {
            return Ok(None);
        };
        update.apply(entry);
        let merged = entry.clone();
        self.persist(&entries)?;
        Ok(Some(merged))
    }

    /// Remove the entry with `id`. Returns whether anything was removed.
    pub fn delete(&self, id: &str) -> bool {
        let entries = self.list();
        let remaining: Vec<HistoryEntry> =
            entries.iter().filter(|e| e.id != id).cloned().collect();
        if remaining.len() == entries.len() {
            return false;
        }
        match self.persist(&remaining) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(id, error = %e, "history delete failed");
                false
            }
        }
    }

    /// Remove every entry.
    pub fn clear(&self) -> bool {
        match self.store.remove(STORAGE_KEY) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(error = %e, "history clear failed");
                false
            }
        }
    }

    pub fn mark_as_saved(&self, id: &str) -> Result<Option<HistoryEntry>, HistoryError> {
        self.update(id, EntryUpdate::saved())
    }

    pub fn get(&self, id: &str) -> Option<HistoryEntry> {
        self.list().into_iter().find(|e| e.id == id)
    }

    pub fn count(&self) -> usize {
        self.list().len()
    }

    fn load(&self) -> Result<Vec<HistoryEntry>, HistoryError> {
        let raw = self
            .store
            .get(STORAGE_KEY)
            .map_err(HistoryError::StorageRead)?;
        match raw {
            Some(json) if !json.trim().is_empty() => Ok(serde_json::from_str(&json)?),
            _ => Ok(Vec::new()),
        }
    }

    fn persist(&self, entries: &[HistoryEntry]) -> Result<(), HistoryError> {
        let json = serde_json::to_string(entries)?;
        self.store
            .set(STORAGE_KEY, &json)
            .map_err(HistoryError::StorageWrite)
    }
}

/// `<millis>_<9 base-36 chars>`: unique enough for a single-user ledger.
fn generate_id(now_millis: i64) -> String {
    const ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    let mut rng = rand::thread_rng();
    let suffix: String = (0..9)
        .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
        .collect();
    format!("{now_millis}_{suffix}")
}
