// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Audit trail — append-only log of every access to a record's content,
// stored one entry per key under the audit prefix.
//
// There is no update or delete API on purpose. An entry that failed to
// write surfaces as `AuditWriteFailed`, and the operation that triggered
// it must abort: un-audited access to record content is never permitted.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, instrument};

use harbor_core::error::{HarborError, Result};
use harbor_core::store::ByteStore;
use harbor_core::types::{AuditId, UserId};

/// Store key prefix for audit entries.
pub const AUDIT_PREFIX: &str = "audit/";

/// What was done to the resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditAction {
    Create,
    Read,
    Update,
    Delete,
    Export,
}

/// What kind of resource was touched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditResource {
    Report,
    User,
    Analytics,
}

/// A committed audit entry. Never mutated once written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditLogEntry {
    pub id: AuditId,
    pub user_id: UserId,
    pub action: AuditAction,
    pub resource_type: AuditResource,
    pub resource_id: String,
    pub timestamp: DateTime<Utc>,
    /// Optional free-form context (categories touched, failure flags, ...).
    pub context: Option<Value>,
}

/// An entry as submitted by a caller — the log stamps id and timestamp.
#[derive(Debug, Clone)]
pub struct AuditEvent {
    pub user_id: UserId,
    pub action: AuditAction,
    pub resource_type: AuditResource,
    pub resource_id: String,
    pub context: Option<Value>,
}

/// Append-only audit log over the byte store.
#[derive(Clone)]
pub struct AuditLog {
    store: Arc<dyn ByteStore>,
}

impl AuditLog {
    pub fn new(store: Arc<dyn ByteStore>) -> Self {
        Self { store }
    }

    /// Record a new audit entry and return its id.
    ///
    /// A store failure here is an `AuditWriteFailed`, not a
    /// `StoreUnavailable` — callers must treat it as fatal to the
    /// triggering operation.
    #[instrument(skip_all, fields(action = ?event.action, resource = %event.resource_id))]
    pub fn append(&self, event: AuditEvent) -> Result<AuditId> {
        let id = AuditId::new();
        let entry = AuditLogEntry {
            id,
            user_id: event.user_id,
            action: event.action,
            resource_type: event.resource_type,
            resource_id: event.resource_id,
            timestamp: Utc::now(),
            context: event.context,
        };

        let value = serde_json::to_value(&entry)?;
        self.store
            .set(&format!("{AUDIT_PREFIX}{id}"), value)
            .map_err(|e| HarborError::AuditWriteFailed(e.to_string()))?;

        debug!(%id, "audit entry appended");
        Ok(id)
    }

    /// All entries touching `resource_id`, oldest first.
    pub fn list_for_resource(&self, resource_id: &str) -> Result<Vec<AuditLogEntry>> {
        let mut entries = self.load_all()?;
        entries.retain(|e| e.resource_id == resource_id);
        Ok(entries)
    }

    /// All entries produced on behalf of `user`, oldest first.
    pub fn list_for_user(&self, user: &UserId) -> Result<Vec<AuditLogEntry>> {
        let mut entries = self.load_all()?;
        entries.retain(|e| &e.user_id == user);
        Ok(entries)
    }

    /// The most recent `limit` entries, newest first.
    pub fn recent(&self, limit: usize) -> Result<Vec<AuditLogEntry>> {
        let mut entries = self.load_all()?;
        entries.reverse();
        entries.truncate(limit);
        Ok(entries)
    }

    /// Total number of entries in the log.
    pub fn count(&self) -> Result<u64> {
        Ok(self.store.list_keys(AUDIT_PREFIX)?.len() as u64)
    }

    /// Every entry in the log, sorted oldest first with the random id as a
    /// tiebreak so the order is total.
    fn load_all(&self) -> Result<Vec<AuditLogEntry>> {
        let keys = self.store.list_keys(AUDIT_PREFIX)?;
        let mut entries = Vec::with_capacity(keys.len());
        for key in keys {
            if let Some(value) = self.store.get(&key)? {
                entries.push(serde_json::from_value::<AuditLogEntry>(value)?);
            }
        }
        entries.sort_by(|a, b| {
            a.timestamp
                .cmp(&b.timestamp)
                .then_with(|| a.id.0.cmp(&b.id.0))
        });
        Ok(entries)
    }
}
