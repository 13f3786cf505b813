//! Fallback key/value store, used only when the durable tier is unavailable.
//!
//! Modelled on a browser's local storage: a small synchronous string map
//! persisted as one JSON file with a total size quota. Cache items are stored
//! under `vcache:{version}:{short_hash(key)}` as `{"exp": ms, "raw": "..."}`,
//! so unrelated items can share the file and survive a cache clear.

use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace, warn};

use crate::cache::key::short_hash;
use crate::cache::types::{CacheError, CacheKey, FallbackTierConfig};
use crate::time::{ttl_millis, Clock};

/// Synchronous string key/value store backed by a JSON file.
///
/// Every mutation rewrites the file; a failed write leaves the in-memory map
/// unchanged.
pub struct LocalStore {
    path: PathBuf,
    quota_bytes: usize,
    items: Mutex<BTreeMap<String, String>>,
}

impl LocalStore {
    /// Load the store from `path`.
    ///
    /// A missing file is an empty store. An unreadable or malformed file is
    /// logged and also treated as empty.
    pub fn open(path: impl Into<PathBuf>, quota_bytes: usize) -> Self {
        let path = path.into();
        let items = match std::fs::read(&path) {
            Ok(data) => match serde_json::from_slice(&data) {
                Ok(items) => items,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Fallback store malformed, starting empty");
                    BTreeMap::new()
                }
            },
            Err(e) if e.kind() == ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Fallback store unreadable, starting empty");
                BTreeMap::new()
            }
        };

        Self {
            path,
            quota_bytes,
            items: Mutex::new(items),
        }
    }

    /// Backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Value stored under `key`.
    pub fn get_item(&self, key: &str) -> Option<String> {
        self.items.lock().get(key).cloned()
    }

    /// Store `value` under `key`, replacing any previous value.
    ///
    /// Fails with [`CacheError::QuotaExceeded`] when the store would grow
    /// past its quota, or with an I/O error when the file cannot be written.
    pub fn set_item(&self, key: &str, value: &str) -> Result<(), CacheError> {
        let mut items = self.items.lock();

        let current = stored_size(&items);
        let replaced = items.get(key).map_or(0, |old| key.len() + old.len());
        let needed = current - replaced + key.len() + value.len();
        if needed > self.quota_bytes {
            return Err(CacheError::QuotaExceeded {
                needed,
                quota: self.quota_bytes,
            });
        }

        let previous = items.insert(key.to_string(), value.to_string());
        if let Err(e) = self.persist(&items) {
            match previous {
                Some(old) => items.insert(key.to_string(), old),
                None => items.remove(key),
            };
            return Err(e);
        }
        Ok(())
    }

    /// Remove `key`. Returns whether it existed.
    pub fn remove_item(&self, key: &str) -> Result<bool, CacheError> {
        let mut items = self.items.lock();
        let Some(old) = items.remove(key) else {
            return Ok(false);
        };
        if let Err(e) = self.persist(&items) {
            items.insert(key.to_string(), old);
            return Err(e);
        }
        Ok(true)
    }

    /// Remove every key starting with `prefix`. Returns the number removed.
    pub fn remove_prefixed(&self, prefix: &str) -> Result<usize, CacheError> {
        let mut items = self.items.lock();
        let before = items.clone();
        items.retain(|key, _| !key.starts_with(prefix));
        let removed = before.len() - items.len();
        if removed == 0 {
            return Ok(0);
        }
        if let Err(e) = self.persist(&items) {
            *items = before;
            return Err(e);
        }
        Ok(removed)
    }

    /// All stored keys, in sorted order.
    pub fn keys(&self) -> Vec<String> {
        self.items.lock().keys().cloned().collect()
    }

    /// Number of stored items.
    pub fn len(&self) -> usize {
        self.items.lock().len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Bytes counted against the quota.
    pub fn size_bytes(&self) -> usize {
        stored_size(&self.items.lock())
    }

    fn persist(&self, items: &BTreeMap<String, String>) -> Result<(), CacheError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let encoded = serde_json::to_vec(items)?;
        let temp_path = self.path.with_extension("tmp");
        std::fs::write(&temp_path, &encoded)?;
        std::fs::rename(&temp_path, &self.path)?;
        Ok(())
    }
}

fn stored_size(items: &BTreeMap<String, String>) -> usize {
    items.iter().map(|(k, v)| k.len() + v.len()).sum()
}

/// A cached payload inside the fallback store.
#[derive(Debug, Serialize, Deserialize)]
struct FallbackItem {
    exp: u64,
    raw: String,
}

/// Cache tier layered on a [`LocalStore`].
///
/// Never propagates errors: reads degrade to a miss and writes to `false`.
pub struct FallbackTier {
    store: LocalStore,
    prefix: String,
    max_entry_bytes: usize,
    clock: Arc<dyn Clock>,
}

impl FallbackTier {
    /// Open the tier for cache-format `version`.
    pub fn open(config: &FallbackTierConfig, version: &str, clock: Arc<dyn Clock>) -> Self {
        Self {
            store: LocalStore::open(&config.file, config.quota_bytes),
            prefix: format!("vcache:{}:", version),
            max_entry_bytes: config.max_entry_bytes,
            clock,
        }
    }

    /// Underlying store, shared with collaborators that persist other data.
    pub fn store(&self) -> &LocalStore {
        &self.store
    }

    /// Storage key for a cache key.
    pub fn storage_key(&self, key: &CacheKey) -> String {
        format!("{}{}", self.prefix, short_hash(key.as_str()))
    }

    /// Read a live payload. Expired items are removed.
    pub fn get(&self, key: &CacheKey) -> Option<String> {
        let storage_key = self.storage_key(key);
        let stored = self.store.get_item(&storage_key)?;

        let item: FallbackItem = match serde_json::from_str(&stored) {
            Ok(item) => item,
            Err(e) => {
                debug!(key = %key, error = %e, "Malformed fallback item");
                return None;
            }
        };

        if self.clock.now_millis() >= item.exp {
            trace!(key = %key, "Fallback item expired");
            if let Err(e) = self.store.remove_item(&storage_key) {
                debug!(key = %key, error = %e, "Failed to remove expired fallback item");
            }
            return None;
        }

        Some(item.raw)
    }

    /// Store a payload for `ttl`. Returns whether it was stored.
    pub fn set(&self, key: &CacheKey, raw: &str, ttl: Duration) -> bool {
        if raw.len() > self.max_entry_bytes {
            debug!(
                key = %key,
                size = raw.len(),
                limit = self.max_entry_bytes,
                "Payload too large for fallback cache"
            );
            return false;
        }

        let item = FallbackItem {
            exp: self.clock.now_millis().saturating_add(ttl_millis(ttl)),
            raw: raw.to_string(),
        };
        let encoded = match serde_json::to_string(&item) {
            Ok(encoded) => encoded,
            Err(e) => {
                debug!(key = %key, error = %e, "Failed to encode fallback item");
                return false;
            }
        };

        match self.store.set_item(&self.storage_key(key), &encoded) {
            Ok(()) => true,
            Err(e) => {
                debug!(key = %key, error = %e, "Fallback cache write failed");
                false
            }
        }
    }

    /// Remove every cache item of this version; other items are kept.
    pub fn clear_all(&self) -> usize {
        match self.store.remove_prefixed(&self.prefix) {
            Ok(removed) => {
                info!(removed = removed, "Fallback cache cleared");
                removed
            }
            Err(e) => {
                warn!(error = %e, "Failed to clear fallback cache");
                0
            }
        }
    }

    /// Number of cache items of this version.
    pub fn entry_count(&self) -> usize {
        self.store
            .keys()
            .iter()
            .filter(|key| key.starts_with(&self.prefix))
            .count()
    }
}
