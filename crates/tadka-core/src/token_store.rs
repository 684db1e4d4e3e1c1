//! The single persisted bearer credential.
//!
//! The store is the only owner of the credential. The request gateway and the
//! session guard read it through `Arc<dyn TokenStore>`; nothing else writes it
//! except the auth flows.

use crate::config::ClientConfig;
use crate::error::{StoreError, StoreResult};
use std::fmt;
use std::path::Path;
use std::sync::RwLock;
use tracing::{debug, info, warn};

/// Name of the slot holding the access token.
pub const TOKEN_SLOT: &str = "tt_access_token";

const SESSION_TREE: &str = "session";

/// Opaque bearer token. The client assumes no structure.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(<redacted>)")
    }
}

impl From<&str> for Credential {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for Credential {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Persistence for the one credential slot.
pub trait TokenStore: Send + Sync {
    /// Currently persisted credential, if any. No side effects.
    fn get(&self) -> Option<Credential>;

    /// Overwrite any existing credential.
    fn set(&self, credential: Credential) -> StoreResult<()>;

    /// Remove the credential. Clearing an empty store is a no-op.
    fn clear(&self) -> StoreResult<()>;

    /// Session status derived from credential presence.
    fn is_authenticated(&self) -> bool {
        self.get().is_some()
    }
}

/// Sled-backed store; the credential survives process restarts until cleared.
pub struct SledTokenStore {
    tree: sled::Tree,
}

impl SledTokenStore {
    /// Open (or create) the store at `path`.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let db = sled::open(path.as_ref())?;
        let tree = db.open_tree(SESSION_TREE)?;
        info!("Token store opened at {}", path.as_ref().display());
        Ok(Self { tree })
    }

    /// Open the store at the configured `token_store_path`.
    pub fn from_config(config: &ClientConfig) -> StoreResult<Self> {
        Self::open(&config.token_store_path)
    }

    /// Build from an already-open sled database (e.g. shared with other trees).
    pub fn from_db(db: &sled::Db) -> StoreResult<Self> {
        Ok(Self {
            tree: db.open_tree(SESSION_TREE)?,
        })
    }

    fn read(&self) -> StoreResult<Option<Credential>> {
        match self.tree.get(TOKEN_SLOT.as_bytes())? {
            Some(raw) => {
                let token = String::from_utf8(raw.to_vec()).map_err(|_| StoreError::Corrupt)?;
                if token.is_empty() {
                    Ok(None)
                } else {
                    Ok(Some(Credential(token)))
                }
            }
            None => Ok(None),
        }
    }
}

impl TokenStore for SledTokenStore {
    fn get(&self) -> Option<Credential> {
        match self.read() {
            Ok(c) => c,
            Err(e) => {
                // An unreadable slot is treated as anonymous.
                warn!("Token store read failed: {}", e);
                None
            }
        }
    }

    fn set(&self, credential: Credential) -> StoreResult<()> {
        self.tree.insert(TOKEN_SLOT.as_bytes(), credential.0.as_bytes())?;
        self.tree.flush()?;
        debug!("Credential stored");
        Ok(())
    }

    fn clear(&self) -> StoreResult<()> {
        if self.tree.remove(TOKEN_SLOT.as_bytes())?.is_some() {
            self.tree.flush()?;
            debug!("Credential cleared");
        }
        Ok(())
    }
}

/// In-process store. Used for tests and ephemeral sessions.
#[derive(Default)]
pub struct MemoryTokenStore {
    slot: RwLock<Option<Credential>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_credential(credential: impl Into<Credential>) -> Self {
        Self {
            slot: RwLock::new(Some(credential.into())),
        }
    }
}

impl TokenStore for MemoryTokenStore {
    fn get(&self) -> Option<Credential> {
        self.slot
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    fn set(&self, credential: Credential) -> StoreResult<()> {
        *self
            .slot
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(credential);
        Ok(())
    }

    fn clear(&self) -> StoreResult<()> {
        self.slot
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_set_then_get() {
        let store = MemoryTokenStore::new();
        assert!(store.get().is_none());
        store.set(Credential::new("tok123")).unwrap();
        assert_eq!(store.get(), Some(Credential::new("tok123")));
        assert!(store.is_authenticated());
    }

    #[test]
    fn memory_set_overwrites() {
        let store = MemoryTokenStore::with_credential("old");
        store.set(Credential::new("new")).unwrap();
        assert_eq!(store.get().unwrap().as_str(), "new");
    }

    #[test]
    fn memory_clear_is_idempotent() {
        let store = MemoryTokenStore::with_credential("tok");
        store.clear().unwrap();
        assert!(store.get().is_none());
        store.clear().unwrap();
        assert!(store.get().is_none());
    }

    #[test]
    fn sled_credential_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        {
            let store = SledTokenStore::open(dir.path()).unwrap();
            store.set(Credential::new("durable")).unwrap();
        }
        let store = SledTokenStore::open(dir.path()).unwrap();
        assert_eq!(store.get().unwrap().as_str(), "durable");

        store.clear().unwrap();
        store.clear().unwrap();
        assert!(store.get().is_none());
    }

    #[test]
    fn sled_store_opens_at_configured_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session");
        let config = ClientConfig {
            token_store_path: path.to_string_lossy().into_owned(),
            ..ClientConfig::default()
        };
        {
            let store = SledTokenStore::from_config(&config).unwrap();
            store.set(Credential::new("configured")).unwrap();
        }
        assert!(path.exists());
        let reopened = SledTokenStore::open(&path).unwrap();
        assert_eq!(reopened.get().unwrap().as_str(), "configured");
    }

    #[test]
    fn debug_output_is_redacted() {
        let c = Credential::new("secret-token");
        assert!(!format!("{:?}", c).contains("secret"));
    }
}
