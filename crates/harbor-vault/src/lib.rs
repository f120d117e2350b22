// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// harbor-vault — Encrypted record storage for the Harbor incident vault.
//
// This crate holds the security core: PBKDF2/AES-GCM record encryption,
// the append-only audit trail, the record store orchestration (including
// export and the analytics read surface), and the durable SQLite byte
// store. Aggregation itself lives in harbor-analytics; this crate is the
// only way to reach it with a capability.

pub mod audit;
pub mod crypto;
pub mod records;
pub mod session;
pub mod sqlite_store;

pub use audit::{AuditAction, AuditEvent, AuditLog, AuditLogEntry, AuditResource};
pub use crypto::{decrypt, derive_key, encrypt};
pub use records::RecordStore;
pub use session::{CapabilityProvider, InMemorySession, StoreSession};
pub use sqlite_store::SqliteStore;
