// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for Harbor.

use thiserror::Error;

/// Top-level error type for all Harbor operations.
#[derive(Debug, Error)]
pub enum HarborError {
    // -- Key material / crypto --
    #[error("invalid key material: {0}")]
    InvalidKeyMaterial(String),

    #[error("encryption failed: {0}")]
    Encryption(String),

    /// Wrong key, corrupt ciphertext, and tampering all collapse into this
    /// variant. The message is deliberately generic so callers cannot be
    /// used as a decryption oracle.
    #[error("could not access record")]
    DecryptionFailed,

    // -- Record access --
    #[error("record not found")]
    NotFound,

    #[error("not authorized to access this record")]
    Unauthorized,

    #[error("no active session")]
    NotAuthenticated,

    // -- Audit / persistence --
    #[error("audit write failed: {0}")]
    AuditWriteFailed(String),

    #[error("store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, HarborError>;
