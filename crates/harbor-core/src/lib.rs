// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Harbor — Core types, errors, and the byte-store seam shared across all
// crates.

pub mod config;
pub mod error;
pub mod store;
pub mod types;

pub use config::VaultConfig;
pub use error::{HarborError, Result};
pub use store::{ByteStore, MemoryStore};
pub use types::*;
