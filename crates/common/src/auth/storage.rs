//! In-memory ephemeral storage

use std::collections::HashMap;

use parking_lot::RwLock;
use portcullis_domain::AuthResult;

use super::traits::EphemeralStorage;

/// Process-local [`EphemeralStorage`]
///
/// Suitable when the host keeps the process alive across the authorization
/// redirect (desktop shells, loopback-redirect CLIs, tests).
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryStorage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl EphemeralStorage for MemoryStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.read().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> AuthResult<()> {
        self.entries.write().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) {
        self.entries.write().remove(key);
    }
}
