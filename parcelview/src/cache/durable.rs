//! Durable (on-disk) response store.
//!
//! Each response is one JSON record file named after the SHA-256 of its key:
//!
//! ```text
//! {directory}/{sha256(key)}.json
//! {"key":"v2|https://...","created_at":1712345678901,"expires_at":...,"raw":"{...}"}
//! ```
//!
//! The full key is stored in the record and compared on read, so a filename
//! collision can never return another request's payload. Every operation
//! takes one async mutex, which makes a prune a single self-contained pass
//! that no concurrent `set` can interleave with.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tokio::sync::Mutex;
use tracing::{debug, info, trace, warn};

use crate::cache::types::{CacheError, CacheKey, DurableTierConfig};
use crate::time::{ttl_millis, Clock};

const RECORD_EXTENSION: &str = "json";
const TEMP_EXTENSION: &str = "tmp";

/// A persisted response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DurableRecord {
    /// Full cache key
    pub key: String,
    /// Epoch millis when written
    pub created_at: u64,
    /// Epoch millis after which the record is stale; always > `created_at`
    pub expires_at: u64,
    /// Raw response body
    pub raw: String,
}

impl DurableRecord {
    /// Whether the record is still valid at `now`.
    pub fn is_live(&self, now: u64) -> bool {
        now < self.expires_at
    }
}

/// Outcome of a prune pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PruneResult {
    /// Records deleted because they had expired
    pub expired_removed: usize,
    /// Live records deleted because the store was over its entry limit
    pub overflow_removed: usize,
    /// Unreadable record files deleted
    pub corrupt_removed: usize,
    /// Records left after the pass
    pub remaining: usize,
}

impl PruneResult {
    /// Total files deleted.
    pub fn total_removed(&self) -> usize {
        self.expired_removed + self.overflow_removed + self.corrupt_removed
    }
}

/// Directory-backed persistent store.
///
/// If the directory cannot be created at open time the tier stays
/// unavailable and every operation returns [`CacheError::Unavailable`]; the
/// orchestrator then falls back to the fallback tier.
pub struct DurableTier {
    directory: PathBuf,
    max_raw_bytes: usize,
    unavailable: Option<String>,
    lock: Mutex<()>,
    clock: Arc<dyn Clock>,
}

impl DurableTier {
    /// Open the store, creating its directory.
    ///
    /// Never fails: an unusable store is reported through
    /// [`is_available`](Self::is_available) and per-operation errors.
    pub async fn open(config: &DurableTierConfig, clock: Arc<dyn Clock>) -> Self {
        let unavailable = if !config.enabled {
            Some("durable store disabled".to_string())
        } else {
            match tokio::fs::create_dir_all(&config.directory).await {
                Ok(()) => None,
                Err(e) => {
                    warn!(
                        dir = %config.directory.display(),
                        error = %e,
                        "Durable cache directory unavailable"
                    );
                    Some(format!("{}: {}", config.directory.display(), e))
                }
            }
        };

        if unavailable.is_none() {
            debug!(dir = %config.directory.display(), "Durable cache opened");
        }

        Self {
            directory: config.directory.clone(),
            max_raw_bytes: config.max_raw_bytes,
            unavailable,
            lock: Mutex::new(()),
            clock,
        }
    }

    /// Whether the store opened successfully.
    pub fn is_available(&self) -> bool {
        self.unavailable.is_none()
    }

    /// Store directory.
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Read a live payload.
    ///
    /// Missing, malformed and foreign records read as `None`. An expired
    /// record is deleted before returning `None`.
    pub async fn get(&self, key: &CacheKey) -> Result<Option<String>, CacheError> {
        self.ensure_available()?;
        let _guard = self.lock.lock().await;

        let path = self.record_path(key);
        let Some(record) = read_record(&path).await? else {
            return Ok(None);
        };

        if record.key != key.as_str() {
            trace!(key = %key, stored = %record.key, "Durable record belongs to another key");
            return Ok(None);
        }

        if !record.is_live(self.clock.now_millis()) {
            trace!(key = %key, "Durable record expired");
            remove_if_exists(&path).await?;
            return Ok(None);
        }

        Ok(Some(record.raw))
    }

    /// Persist a payload for `ttl`.
    ///
    /// Returns `Ok(false)` without storing when the payload is larger than
    /// the configured maximum.
    pub async fn set(&self, key: &CacheKey, raw: &str, ttl: Duration) -> Result<bool, CacheError> {
        self.ensure_available()?;

        if raw.len() > self.max_raw_bytes {
            debug!(
                key = %key,
                size = raw.len(),
                limit = self.max_raw_bytes,
                "Payload too large for durable cache"
            );
            return Ok(false);
        }

        let created_at = self.clock.now_millis();
        let record = DurableRecord {
            key: key.as_str().to_string(),
            created_at,
            expires_at: created_at.saturating_add(ttl_millis(ttl)),
            raw: raw.to_string(),
        };
        let encoded = serde_json::to_vec(&record)?;

        let _guard = self.lock.lock().await;
        let path = self.record_path(key);
        // Write atomically via temp file
        let temp_path = path.with_extension(TEMP_EXTENSION);
        tokio::fs::write(&temp_path, &encoded).await?;
        tokio::fs::rename(&temp_path, &path).await?;

        trace!(key = %key, size = raw.len(), "Durable record written");
        Ok(true)
    }

    /// Delete expired records, then keep only the `max_entries` newest.
    ///
    /// Records are ranked by `created_at`, newest first. Unreadable record
    /// files are deleted as well; one that cannot be deleted either keeps
    /// its slot and counts toward `max_entries`.
    pub async fn prune(&self, max_entries: usize) -> Result<PruneResult, CacheError> {
        self.ensure_available()?;
        let _guard = self.lock.lock().await;

        let now = self.clock.now_millis();
        let mut result = PruneResult::default();
        let mut records = Vec::new();

        for path in self.record_files().await? {
            match read_record(&path).await {
                Ok(Some(record)) => records.push((path, record.created_at, record.expires_at)),
                Ok(None) => {
                    remove_if_exists(&path).await?;
                    result.corrupt_removed += 1;
                }
                Err(e) => match remove_if_exists(&path).await {
                    Ok(_) => {
                        debug!(path = %path.display(), error = %e, "Removed unreadable record");
                        result.corrupt_removed += 1;
                    }
                    Err(remove_error) => {
                        warn!(
                            path = %path.display(),
                            error = %e,
                            remove_error = %remove_error,
                            "Unreadable record could not be removed"
                        );
                        result.remaining += 1;
                    }
                },
            }
        }

        records.sort_by(|a, b| b.1.cmp(&a.1));

        for (path, _created_at, expires_at) in records {
            if now >= expires_at {
                remove_if_exists(&path).await?;
                result.expired_removed += 1;
            } else if result.remaining >= max_entries {
                remove_if_exists(&path).await?;
                result.overflow_removed += 1;
            } else {
                result.remaining += 1;
            }
        }

        if result.total_removed() > 0 {
            debug!(
                expired = result.expired_removed,
                overflow = result.overflow_removed,
                corrupt = result.corrupt_removed,
                remaining = result.remaining,
                "Durable cache pruned"
            );
        }

        Ok(result)
    }

    /// Remove one record. Returns whether it existed.
    pub async fn delete(&self, key: &CacheKey) -> Result<bool, CacheError> {
        self.ensure_available()?;
        let _guard = self.lock.lock().await;
        remove_if_exists(&self.record_path(key)).await
    }

    /// Remove every record. Returns the number of files deleted.
    pub async fn clear(&self) -> Result<usize, CacheError> {
        self.ensure_available()?;
        let _guard = self.lock.lock().await;

        let mut removed = 0;
        let mut entries = tokio::fs::read_dir(&self.directory).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if is_record_or_temp(&path) && remove_if_exists(&path).await? {
                removed += 1;
            }
        }

        info!(dir = %self.directory.display(), removed = removed, "Durable cache cleared");
        Ok(removed)
    }

    /// Number of record files currently stored (live or not).
    pub async fn entry_count(&self) -> Result<usize, CacheError> {
        self.ensure_available()?;
        let _guard = self.lock.lock().await;
        Ok(self.record_files().await?.len())
    }

    fn ensure_available(&self) -> Result<(), CacheError> {
        match &self.unavailable {
            None => Ok(()),
            Some(reason) => Err(CacheError::Unavailable(reason.clone())),
        }
    }

    fn record_path(&self, key: &CacheKey) -> PathBuf {
        self.directory.join(key_to_filename(key))
    }

    async fn record_files(&self) -> Result<Vec<PathBuf>, CacheError> {
        let mut files = Vec::new();
        let mut entries = tokio::fs::read_dir(&self.directory).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == RECORD_EXTENSION) {
                files.push(path);
            }
        }
        Ok(files)
    }
}

/// Filesystem-safe name for a key.
fn key_to_filename(key: &CacheKey) -> String {
    let digest = Sha256::digest(key.as_str().as_bytes());
    format!("{:x}.{}", digest, RECORD_EXTENSION)
}

fn is_record_or_temp(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext == RECORD_EXTENSION || ext == TEMP_EXTENSION)
}

/// Read and decode a record. `Ok(None)` for missing or malformed files.
async fn read_record(path: &Path) -> Result<Option<DurableRecord>, CacheError> {
    let data = match tokio::fs::read(path).await {
        Ok(data) => data,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(CacheError::Io(e)),
    };

    match serde_json::from_slice::<DurableRecord>(&data) {
        Ok(record) => Ok(Some(record)),
        Err(e) => {
            debug!(path = %path.display(), error = %e, "Malformed durable record");
            Ok(None)
        }
    }
}

async fn remove_if_exists(path: &Path) -> Result<bool, CacheError> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
        Err(e) => Err(CacheError::Io(e)),
    }
}
