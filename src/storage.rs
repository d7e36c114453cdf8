//! Persisted dashboard state
//!
//! [`LocalStore`] is a small string key/value store written through to a
//! JSON file, with the same semantics as browser `localStorage`: values are
//! opaque strings and callers parse them. [`KeyStore`] is the typed view of
//! the persisted platform stream keys.

use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::constants::STREAM_KEYS_STORAGE_KEY;
use crate::error::StorageError;
use crate::protocol::PlatformKey;

pub struct LocalStore {
    path: Option<PathBuf>,
    items: RwLock<BTreeMap<String, String>>,
}

impl LocalStore {
    /// Store that lives only in memory
    pub fn in_memory() -> Self {
        Self {
            path: None,
            items: RwLock::new(BTreeMap::new()),
        }
    }

    /// Open the store backed by `path`, creating it on first write
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let path = path.as_ref().to_path_buf();
        let items = match std::fs::read_to_string(&path) {
            Ok(raw) if raw.trim().is_empty() => BTreeMap::new(),
            Ok(raw) => serde_json::from_str(&raw).map_err(|source| StorageError::Malformed {
                key: path.display().to_string(),
                source,
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(e.into()),
        };

        tracing::debug!(path = %path.display(), items = items.len(), "opened local store");
        Ok(Self {
            path: Some(path),
            items: RwLock::new(items),
        })
    }

    pub fn get_item(&self, key: &str) -> Option<String> {
        self.items.read().get(key).cloned()
    }

    pub fn set_item(&self, key: &str, value: impl Into<String>) -> Result<(), StorageError> {
        let mut items = self.items.write();
        items.insert(key.to_string(), value.into());
        self.flush(&items)
    }

    pub fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        let mut items = self.items.write();
        if items.remove(key).is_some() {
            self.flush(&items)?;
        }
        Ok(())
    }

    pub fn clear(&self) -> Result<(), StorageError> {
        let mut items = self.items.write();
        items.clear();
        self.flush(&items)
    }

    fn flush(&self, items: &BTreeMap<String, String>) -> Result<(), StorageError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let raw = serde_json::to_string_pretty(items)?;
        std::fs::write(path, raw)?;
        Ok(())
    }
}

/// Typed access to `streamKeys`
#[derive(Clone)]
pub struct KeyStore {
    store: Arc<LocalStore>,
}

impl KeyStore {
    pub fn new(store: Arc<LocalStore>) -> Self {
        Self { store }
    }

    /// All persisted keys; an unset entry is an empty list
    pub fn load(&self) -> Result<Vec<PlatformKey>, StorageError> {
        match self.store.get_item(STREAM_KEYS_STORAGE_KEY) {
            None => Ok(Vec::new()),
            Some(raw) => serde_json::from_str(&raw).map_err(|source| StorageError::Malformed {
                key: STREAM_KEYS_STORAGE_KEY.to_string(),
                source,
            }),
        }
    }

    pub fn save(&self, keys: &[PlatformKey]) -> Result<(), StorageError> {
        let raw = serde_json::to_string(keys)?;
        self.store.set_item(STREAM_KEYS_STORAGE_KEY, raw)
    }

    /// Insert or replace the key for `key.platform`
    pub fn upsert(&self, key: PlatformKey) -> Result<(), StorageError> {
        let mut keys = self.load()?;
        match keys.iter_mut().find(|k| k.platform == key.platform) {
            Some(existing) => *existing = key,
            None => keys.push(key),
        }
        self.save(&keys)
    }

    /// Remove the key for `platform`; returns whether one existed
    pub fn remove(&self, platform: &str) -> Result<bool, StorageError> {
        let mut keys = self.load()?;
        let before = keys.len();
        keys.retain(|k| k.platform != platform);
        if keys.len() == before {
            return Ok(false);
        }
        self.save(&keys)?;
        Ok(true)
    }
}
