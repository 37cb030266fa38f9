//! Persistent storage for the access/refresh credential pair.
//!
//! Every component receives the store as an `Arc<dyn TokenStore>`; there
//! is no process-wide global. Mutations are visible to the next read.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use anyhow::Result;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Token file name in the data directory
const TOKEN_FILE: &str = "tokens.json";

/// Well-known storage keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKey {
    Access,
    Refresh,
}

impl TokenKey {
    pub const ALL: [TokenKey; 2] = [TokenKey::Access, TokenKey::Refresh];

    pub fn as_str(&self) -> &'static str {
        match self {
            TokenKey::Access => "access_token",
            TokenKey::Refresh => "refresh_token",
        }
    }
}

/// Snapshot of both credentials taken in a single synchronous read.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CredentialPair {
    pub access: Option<String>,
    pub refresh: Option<String>,
}

impl CredentialPair {
    pub fn is_complete(&self) -> bool {
        self.access.is_some() && self.refresh.is_some()
    }
}

/// Key-value storage for credentials. No validation is performed.
///
/// Absence is the normal "not logged in" signal, so reads return
/// `Option` and writes never fail; backends log their own I/O problems.
pub trait TokenStore: Send + Sync {
    fn get(&self, key: TokenKey) -> Option<String>;
    fn set(&self, key: TokenKey, value: &str);
    fn clear(&self, key: TokenKey);

    fn pair(&self) -> CredentialPair {
        CredentialPair {
            access: self.get(TokenKey::Access),
            refresh: self.get(TokenKey::Refresh),
        }
    }

    fn clear_all(&self) {
        for key in TokenKey::ALL {
            self.clear(key);
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// In-process store. Nothing survives a restart.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    entries: Mutex<HashMap<TokenKey, String>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store already holding both credentials
    pub fn with_pair(access: &str, refresh: &str) -> Self {
        let store = Self::new();
        store.set(TokenKey::Access, access);
        store.set(TokenKey::Refresh, refresh);
        store
    }
}

impl TokenStore for MemoryTokenStore {
    fn get(&self, key: TokenKey) -> Option<String> {
        lock(&self.entries).get(&key).cloned()
    }

    fn set(&self, key: TokenKey, value: &str) {
        lock(&self.entries).insert(key, value.to_string());
    }

    fn clear(&self, key: TokenKey) {
        lock(&self.entries).remove(&key);
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct TokenFileData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    access_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    refresh_token: Option<String>,
}

impl TokenFileData {
    fn slot(&mut self, key: TokenKey) -> &mut Option<String> {
        match key {
            TokenKey::Access => &mut self.access_token,
            TokenKey::Refresh => &mut self.refresh_token,
        }
    }
}

/// Store persisted as JSON in the data directory.
///
/// Reads are served from memory; every mutation is written through to disk.
pub struct FileTokenStore {
    data_dir: PathBuf,
    data: Mutex<TokenFileData>,
}

impl FileTokenStore {
    /// Open the store, loading any previously saved credentials.
    ///
    /// An unreadable or corrupt token file is treated as holding no
    /// credentials; it is replaced on the next write.
    pub fn open(data_dir: PathBuf) -> Self {
        let path = data_dir.join(TOKEN_FILE);
        let data = match Self::load(&path) {
            Ok(data) => data,
            Err(e) => {
                warn!(error = %e, path = %path.display(), "Discarding unreadable token file");
                TokenFileData::default()
            }
        };
        debug!(path = %path.display(), "Token store opened");

        Self {
            data_dir,
            data: Mutex::new(data),
        }
    }

    fn load(path: &Path) -> Result<TokenFileData> {
        if !path.exists() {
            return Ok(TokenFileData::default());
        }
        let contents = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&contents)?)
    }

    fn token_path(&self) -> PathBuf {
        self.data_dir.join(TOKEN_FILE)
    }

    fn save(&self, data: &TokenFileData) -> Result<()> {
        let path = self.token_path();
        if data.access_token.is_none() && data.refresh_token.is_none() {
            if path.exists() {
                std::fs::remove_file(&path)?;
            }
            return Ok(());
        }
        std::fs::create_dir_all(&self.data_dir)?;
        let contents = serde_json::to_string_pretty(data)?;
        std::fs::write(&path, contents)?;

        // Owner-only access (Unix only)
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mut perms = std::fs::metadata(&path)?.permissions();
            perms.set_mode(0o600);
            std::fs::set_permissions(&path, perms)?;
        }
        Ok(())
    }

    fn mutate(&self, key: TokenKey, value: Option<&str>) {
        let mut data = lock(&self.data);
        *data.slot(key) = value.map(str::to_string);
        if let Err(e) = self.save(&data) {
            warn!(error = %e, key = key.as_str(), "Failed to persist token store");
        }
    }
}

impl TokenStore for FileTokenStore {
    fn get(&self, key: TokenKey) -> Option<String> {
        lock(&self.data).slot(key).clone()
    }

    fn set(&self, key: TokenKey, value: &str) {
        self.mutate(key, Some(value));
    }

    fn clear(&self, key: TokenKey) {
        self.mutate(key, None);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_store_roundtrip() {
        let store = MemoryTokenStore::new();
        assert_eq!(store.get(TokenKey::Access), None);

        store.set(TokenKey::Access, "a1");
        assert_eq!(store.get(TokenKey::Access).as_deref(), Some("a1"));
        assert_eq!(store.get(TokenKey::Refresh), None);

        store.set(TokenKey::Access, "a2");
        assert_eq!(store.get(TokenKey::Access).as_deref(), Some("a2"));

        store.clear(TokenKey::Access);
        assert_eq!(store.get(TokenKey::Access), None);
    }

    #[test]
    fn test_pair_and_clear_all() {
        let store = MemoryTokenStore::with_pair("a", "r");
        let pair = store.pair();
        assert!(pair.is_complete());
        assert_eq!(pair.access.as_deref(), Some("a"));
        assert_eq!(pair.refresh.as_deref(), Some("r"));

        store.clear_all();
        assert_eq!(store.pair(), CredentialPair::default());
    }

    #[test]
    fn test_well_known_keys_are_distinct() {
        assert_eq!(TokenKey::Access.as_str(), "access_token");
        assert_eq!(TokenKey::Refresh.as_str(), "refresh_token");
    }

    #[test]
    fn test_file_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();

        let store = FileTokenStore::open(dir.path().to_path_buf());
        store.set(TokenKey::Access, "access-1");
        store.set(TokenKey::Refresh, "refresh-1");
        drop(store);

        let reopened = FileTokenStore::open(dir.path().to_path_buf());
        assert_eq!(reopened.get(TokenKey::Access).as_deref(), Some("access-1"));
        assert_eq!(reopened.get(TokenKey::Refresh).as_deref(), Some("refresh-1"));

        reopened.clear_all();
        assert!(!dir.path().join(TOKEN_FILE).exists());

        let emptied = FileTokenStore::open(dir.path().to_path_buf());
        assert_eq!(emptied.pair(), CredentialPair::default());
    }

    #[test]
    fn test_file_store_uses_well_known_keys_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileTokenStore::open(dir.path().to_path_buf());
        store.set(TokenKey::Refresh, "r");

        let contents = std::fs::read_to_string(dir.path().join(TOKEN_FILE)).unwrap();
        let json: serde_json::Value = serde_json::from_str(&contents).unwrap();
        assert_eq!(json["refresh_token"], "r");
        assert!(json.get("access_token").is_none());
    }

    #[test]
    fn test_corrupt_token_file_opens_empty() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(TOKEN_FILE), "{not json").unwrap();

        let store = FileTokenStore::open(dir.path().to_path_buf());
        assert_eq!(store.pair(), CredentialPair::default());

        // The next write replaces the corrupt file
        store.set(TokenKey::Access, "access-1");
        let reopened = FileTokenStore::open(dir.path().to_path_buf());
        assert_eq!(reopened.get(TokenKey::Access).as_deref(), Some("access-1"));
    }

    #[cfg(unix)]
    #[test]
    fn test_token_file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(TOKEN_FILE);
        std::fs::write(&path, "{}").unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o644)).unwrap();

        let store = FileTokenStore::open(dir.path().to_path_buf());
        store.set(TokenKey::Refresh, "refresh-1");

        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}
