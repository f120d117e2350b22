// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Byte-store abstraction — a prefix-namespaced key/value map of strings to
// JSON values. The vault never talks to a concrete backend directly; every
// service takes `Arc<dyn ByteStore>` at construction so persistence can be
// swapped (and tests can run entirely in memory).

use std::collections::BTreeMap;
use std::sync::RwLock;

use serde_json::Value;

use crate::error::{HarborError, Result};

/// Key/value byte store collaborator.
///
/// Keys are namespaced by prefix (`record/`, `audit/`, `draft/`,
/// `analytics/`, `session/`). Implementations own their I/O and timeout
/// policy; the vault surfaces failures as `StoreUnavailable` and never
/// retries silently.
pub trait ByteStore: Send + Sync {
    /// Fetch the value stored at `key`, or `None` if absent.
    fn get(&self, key: &str) -> Result<Option<Value>>;

    /// Store `value` at `key`, replacing any existing value.
    fn set(&self, key: &str, value: Value) -> Result<()>;

    /// Remove the value at `key`. Removing an absent key is not an error.
    fn remove(&self, key: &str) -> Result<()>;

    /// All keys starting with `prefix`, in unspecified order.
    fn list_keys(&self, prefix: &str) -> Result<Vec<String>>;
}

/// In-memory store backed by a `BTreeMap`.
///
/// The default backend for tests and for embedders that handle persistence
/// themselves. Sorted keys make listings deterministic.
#[derive(Default)]
pub struct MemoryStore {
    entries: RwLock<BTreeMap<String, Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries currently held (all prefixes).
    pub fn len(&self) -> usize {
        self.entries.read().map(|m| m.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn lock_err() -> HarborError {
    HarborError::StoreUnavailable("store lock poisoned".into())
}

impl ByteStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<Value>> {
        let entries = self.entries.read().map_err(|_| lock_err())?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: Value) -> Result<()> {
        let mut entries = self.entries.write().map_err(|_| lock_err())?;
        entries.insert(key.to_owned(), value);
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let mut entries = self.entries.write().map_err(|_| lock_err())?;
        entries.remove(key);
        Ok(())
    }

    fn list_keys(&self, prefix: &str) -> Result<Vec<String>> {
        let entries = self.entries.read().map_err(|_| lock_err())?;
        Ok(entries
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect())
    }
}
