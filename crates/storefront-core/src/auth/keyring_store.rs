use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use keyring::Entry;
use tracing::warn;

use super::store::{TokenKey, TokenStore};

const SERVICE_NAME: &str = "storefront";

/// Token store backed by the OS keychain, one entry per well-known key.
///
/// Values written or read through this store are remembered, so a read
/// always observes the last write even if the keychain rejected it.
pub struct KeyringTokenStore {
    service: String,
    known: Mutex<HashMap<TokenKey, Option<String>>>,
}

impl KeyringTokenStore {
    pub fn new() -> Self {
        Self::with_service(SERVICE_NAME)
    }

    /// Use a custom keychain service name (separate profiles, tests)
    pub fn with_service(service: &str) -> Self {
        Self {
            service: service.to_string(),
            known: Mutex::new(HashMap::new()),
        }
    }

    fn known(&self) -> MutexGuard<'_, HashMap<TokenKey, Option<String>>> {
        self.known.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn entry(&self, key: TokenKey) -> Option<Entry> {
        match Entry::new(&self.service, key.as_str()) {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!(error = %e, key = key.as_str(), "Failed to create keyring entry");
                None
            }
        }
    }

    fn read_keychain(&self, key: TokenKey) -> Option<String> {
        let entry = self.entry(key)?;
        match entry.get_password() {
            Ok(value) => Some(value),
            Err(keyring::Error::NoEntry) => None,
            Err(e) => {
                warn!(error = %e, key = key.as_str(), "Failed to read token from keychain");
                None
            }
        }
    }
}

impl Default for KeyringTokenStore {
    fn default() -> Self {
        Self::new()
    }
}

impl TokenStore for KeyringTokenStore {
    fn get(&self, key: TokenKey) -> Option<String> {
        let mut known = self.known();
        known
            .entry(key)
            .or_insert_with(|| self.read_keychain(key))
            .clone()
    }

    fn set(&self, key: TokenKey, value: &str) {
        let mut known = self.known();
        known.insert(key, Some(value.to_string()));
        if let Some(entry) = self.entry(key) {
            if let Err(e) = entry.set_password(value) {
                warn!(error = %e, key = key.as_str(), "Failed to store token in keychain");
            }
        }
    }

    fn clear(&self, key: TokenKey) {
        let mut known = self.known();
        known.insert(key, None);
        if let Some(entry) = self.entry(key) {
            match entry.delete_credential() {
                Ok(()) | Err(keyring::Error::NoEntry) => {}
                Err(e) => {
                    warn!(error = %e, key = key.as_str(), "Failed to delete token from keychain");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::CredentialPair;

    fn test_store() -> KeyringTokenStore {
        KeyringTokenStore::with_service(&format!("storefront-test-{}", std::process::id()))
    }

    #[test]
    fn test_set_then_get_roundtrips() {
        let store = test_store();
        store.set(TokenKey::Access, "acc-1");
        store.set(TokenKey::Refresh, "ref-1");
        assert_eq!(store.get(TokenKey::Access).as_deref(), Some("acc-1"));
        assert_eq!(store.get(TokenKey::Refresh).as_deref(), Some("ref-1"));

        store.set(TokenKey::Access, "acc-2");
        assert_eq!(store.get(TokenKey::Access).as_deref(), Some("acc-2"));

        store.clear_all();
        assert_eq!(store.pair(), CredentialPair::default());
    }
}
