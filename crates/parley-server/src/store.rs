//! In-memory call log.
//!
//! Entries live for the lifetime of the process: append-only, never
//! evicted, lost on restart.

use parley_types::ExtractedFields;
use serde::Serialize;
use serde_json::Value;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// One received webhook.
#[derive(Debug, Clone, Serialize)]
pub struct CallLogEntry {
    /// UTC receive time, ISO 8601 without offset.
    pub timestamp: String,
    pub raw_webhook: Value,
    pub extracted_fields: ExtractedFields,
}

impl CallLogEntry {
    /// Builds an entry stamped with the current UTC time.
    pub fn received_now(raw_webhook: Value, extracted_fields: ExtractedFields) -> Self {
        Self {
            timestamp: chrono::Utc::now()
                .naive_utc()
                .format("%Y-%m-%dT%H:%M:%S%.6f")
                .to_string(),
            raw_webhook,
            extracted_fields,
        }
    }
}

/// Shared handle to the call log.
///
/// Uses `std::sync::RwLock`: every lock section is a short `Vec` operation
/// that never spans an `.await`.
#[derive(Debug, Clone, Default)]
pub struct CallLogStore {
    entries: Arc<RwLock<Vec<CallLogEntry>>>,
}

impl CallLogStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an entry and returns the new total.
    pub fn append(&self, entry: CallLogEntry) -> usize {
        let mut entries = self.write();
        entries.push(entry);
        entries.len()
    }

    /// Copy of every entry, oldest first.
    pub fn snapshot(&self) -> Vec<CallLogEntry> {
        self.read().clone()
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    // A panic while holding the lock cannot leave the Vec half-written, so
    // poisoned guards are recovered.
    fn read(&self) -> RwLockReadGuard<'_, Vec<CallLogEntry>> {
        self.entries.read().unwrap_or_else(|poisoned| {
            tracing::error!("call log lock poisoned, recovering");
            poisoned.into_inner()
        })
    }

    fn write(&self) -> RwLockWriteGuard<'_, Vec<CallLogEntry>> {
        self.entries.write().unwrap_or_else(|poisoned| {
            tracing::error!("call log lock poisoned, recovering");
            poisoned.into_inner()
        })
    }
}
