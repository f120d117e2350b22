// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Capability providers — where the vault asks "who is the caller and what
// may they decrypt". The capability itself is minted by the external auth
// collaborator at login; the vault only ever consumes it.

use std::sync::{Arc, RwLock};

use tracing::debug;

use harbor_core::error::{HarborError, Result};
use harbor_core::store::ByteStore;
use harbor_core::types::Capability;

/// The byte store's session slot, written by the auth collaborator at
/// login and cleared at logout. The raw key is never persisted anywhere
/// else.
pub const SESSION_KEY: &str = "session/current";

/// Supplies the active capability on demand.
pub trait CapabilityProvider: Send + Sync {
    /// The current capability, or `None` when no session is active.
    fn current(&self) -> Result<Option<Capability>>;
}

/// Session held in process memory only. `login` installs a capability,
/// `logout` discards it (the key zeroises on drop).
#[derive(Default)]
pub struct InMemorySession {
    capability: RwLock<Option<Capability>>,
}

impl InMemorySession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with a capability already installed.
    pub fn with_capability(capability: Capability) -> Self {
        Self {
            capability: RwLock::new(Some(capability)),
        }
    }

    pub fn login(&self, capability: Capability) -> Result<()> {
        let mut slot = self
            .capability
            .write()
            .map_err(|_| HarborError::StoreUnavailable("session lock poisoned".into()))?;
        debug!(user = %capability.user_id, "session started");
        *slot = Some(capability);
        Ok(())
    }

    pub fn logout(&self) -> Result<()> {
        let mut slot = self
            .capability
            .write()
            .map_err(|_| HarborError::StoreUnavailable("session lock poisoned".into()))?;
        if slot.take().is_some() {
            debug!("session ended");
        }
        Ok(())
    }
}

impl CapabilityProvider for InMemorySession {
    fn current(&self) -> Result<Option<Capability>> {
        let slot = self
            .capability
            .read()
            .map_err(|_| HarborError::StoreUnavailable("session lock poisoned".into()))?;
        Ok(slot.clone())
    }
}

/// Reads the capability from the byte store's session slot. For hosts
/// whose auth layer parks the session there rather than holding it in
/// process memory.
pub struct StoreSession {
    store: Arc<dyn ByteStore>,
}

impl StoreSession {
    pub fn new(store: Arc<dyn ByteStore>) -> Self {
        Self { store }
    }
}

impl CapabilityProvider for StoreSession {
    fn current(&self) -> Result<Option<Capability>> {
        match self.store.get(SESSION_KEY)? {
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use harbor_core::store::MemoryStore;
    use harbor_core::types::USER_KEY_LEN;

    fn cap() -> Capability {
        Capability::new("user-1", [9u8; USER_KEY_LEN])
    }

    #[test]
    fn in_memory_login_logout() {
        let session = InMemorySession::new();
        assert!(session.current().unwrap().is_none());

        session.login(cap()).unwrap();
        let current = session.current().unwrap().expect("capability missing");
        assert_eq!(current.user_id.0, "user-1");

        session.logout().unwrap();
        assert!(session.current().unwrap().is_none());
    }

    #[test]
    fn store_session_reads_session_slot() {
        let store = Arc::new(MemoryStore::new());
        let session = StoreSession::new(Arc::clone(&store) as Arc<dyn ByteStore>);

        assert!(session.current().unwrap().is_none());

        store
            .set(SESSION_KEY, serde_json::to_value(cap()).unwrap())
            .unwrap();
        let current = session.current().unwrap().expect("capability missing");
        assert_eq!(current.user_id.0, "user-1");
        assert_eq!(current.encryption_key, [9u8; USER_KEY_LEN]);
    }
}
