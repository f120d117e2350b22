// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Vault configuration.

use serde::{Deserialize, Serialize};

/// Settings for the record vault.
///
/// Privacy-relevant parameters (the per-aggregate noise epsilons) are
/// deliberately *not* configurable here — they live as a fixed policy in
/// `harbor-analytics` so the disclosure guarantee is uniform across every
/// installation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VaultConfig {
    /// PBKDF2 iteration count for per-operation key derivation.
    /// Values below 10,000 are rejected at the crypto layer.
    pub kdf_iterations: u32,
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            kdf_iterations: 10_000,
        }
    }
}
