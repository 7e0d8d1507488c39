//! durable session state
//!
//! ```text
//! selectedWalletRdns  rdns of the chosen wallet, written at selection time
//! currentAccount      verified account, written after the on-chain check
//! walletReconnected   one-shot flag set when a stored wallet is re-acquired
//! ```

use crate::error::{ClientError, Result};
use crate::types::{parse_address, Address};
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

pub const KEY_SELECTED_WALLET: &str = "selectedWalletRdns";
pub const KEY_CURRENT_ACCOUNT: &str = "currentAccount";
pub const KEY_WALLET_RECONNECTED: &str = "walletReconnected";

/// string key/value persistence
pub trait SessionStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
    fn remove(&self, key: &str) -> Result<()>;
    fn clear(&self) -> Result<()>;
}

/// process-local store
#[derive(Default)]
pub struct MemoryStore {
    entries: RwLock<BTreeMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.read().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.entries.write().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.entries.write().remove(key);
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        self.entries.write().clear();
        Ok(())
    }
}

/// json file store with a write-through cache
pub struct FileStore {
    path: PathBuf,
    cache: RwLock<BTreeMap<String, String>>,
}

impl FileStore {
    /// open or create the store at `path`
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let entries = if path.exists() {
            let contents = std::fs::read_to_string(&path)?;
            if contents.trim().is_empty() {
                BTreeMap::new()
            } else {
                serde_json::from_str(&contents)
                    .map_err(|e| ClientError::Storage(format!("corrupt session file {}: {}", path.display(), e)))?
            }
        } else {
            BTreeMap::new()
        };
        debug!("session store at {} ({} keys)", path.display(), entries.len());
        Ok(Self {
            path,
            cache: RwLock::new(entries),
        })
    }

    fn persist(&self, entries: &BTreeMap<String, String>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let json = serde_json::to_string_pretty(entries)?;
        let tmp = self.path.with_extension("tmp");
        std::fs::write(&tmp, json)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl SessionStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.cache.read().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut entries = self.cache.write();
        let mut next = entries.clone();
        next.insert(key.to_string(), value.to_string());
        self.persist(&next)?;
        *entries = next;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let mut entries = self.cache.write();
        if !entries.contains_key(key) {
            return Ok(());
        }
        let mut next = entries.clone();
        next.remove(key);
        self.persist(&next)?;
        *entries = next;
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        let mut entries = self.cache.write();
        let next = BTreeMap::new();
        self.persist(&next)?;
        *entries = next;
        Ok(())
    }
}

/// snapshot of the persisted session
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SessionState {
    pub selected_provider_rdns: Option<String>,
    pub current_account: Option<Address>,
}

/// typed view over a [`SessionStore`]
#[derive(Clone)]
pub struct Session {
    store: Arc<dyn SessionStore>,
}

impl Session {
    pub fn new(store: Arc<dyn SessionStore>) -> Self {
        Self { store }
    }

    pub fn selected_wallet(&self) -> Result<Option<String>> {
        Ok(self
            .store
            .get(KEY_SELECTED_WALLET)?
            .filter(|rdns| !rdns.is_empty()))
    }

    pub fn set_selected_wallet(&self, rdns: &str) -> Result<()> {
        self.store.set(KEY_SELECTED_WALLET, rdns)
    }

    /// verified account; empty and `"0"` read as none
    pub fn current_account(&self) -> Result<Option<Address>> {
        match self.store.get(KEY_CURRENT_ACCOUNT)? {
            Some(v) if !v.is_empty() && v != "0" => parse_address(&v).map(Some),
            _ => Ok(None),
        }
    }

    pub fn set_current_account(&self, account: &Address) -> Result<()> {
        self.store.set(KEY_CURRENT_ACCOUNT, &account.to_string())
    }

    pub fn mark_reconnected(&self) -> Result<()> {
        self.store.set(KEY_WALLET_RECONNECTED, "true")
    }

    /// read and clear the reconnect flag
    pub fn take_reconnected(&self) -> Result<bool> {
        let set = self.store.get(KEY_WALLET_RECONNECTED)?.as_deref() == Some("true");
        if set {
            self.store.remove(KEY_WALLET_RECONNECTED)?;
        }
        Ok(set)
    }

    pub fn clear_selection(&self) -> Result<()> {
        self.store.remove(KEY_SELECTED_WALLET)
    }

    pub fn clear(&self) -> Result<()> {
        self.store.clear()
    }

    pub fn state(&self) -> Result<SessionState> {
        Ok(SessionState {
            selected_provider_rdns: self.selected_wallet()?,
            current_account: self.current_account()?,
        })
    }
}
