//! Core types for the response cache.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Default cache-format version tag. Changing it invalidates every stored entry.
pub const DEFAULT_CACHE_VERSION: &str = "v2";

/// Default number of decoded responses kept in memory.
pub const DEFAULT_MEMORY_ENTRIES: usize = 25;

/// Default time-to-live for cached responses (24 h).
pub const DEFAULT_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Default number of records kept by the durable tier after a prune.
pub const DEFAULT_DURABLE_MAX_ENTRIES: usize = 60;

/// Responses larger than this are never persisted (8 MiB).
pub const DEFAULT_MAX_RAW_BYTES: usize = 8 * 1024 * 1024;

/// Largest payload the fallback tier accepts (~0.65 MB).
pub const DEFAULT_FALLBACK_MAX_ENTRY_BYTES: usize = 650_000;

/// Total size of the fallback store file (5 MiB).
pub const DEFAULT_FALLBACK_QUOTA_BYTES: usize = 5 * 1024 * 1024;

/// Query parameters that never take part in a cache key.
pub const DEFAULT_VOLATILE_PARAMS: &[&str] = &["_t"];

/// Canonical cache key for a request.
///
/// Built by [`crate::cache::build_key`]; two URLs that differ only in a
/// volatile parameter or in parameter order share a key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(String);

impl CacheKey {
    /// Wrap an already-canonical key string.
    pub fn from_raw(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// The key as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Cache-related errors.
///
/// These never reach a fetch caller; the orchestrator degrades to the next
/// tier or to "not cached".
#[derive(Debug, Error)]
pub enum CacheError {
    /// I/O error in a persistent tier
    #[error("Cache I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The durable store is disabled or could not be opened
    #[error("Durable cache unavailable: {0}")]
    Unavailable(String),

    /// A record could not be encoded
    #[error("Cache serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A write would push the fallback store past its quota
    #[error("Fallback store quota exceeded: {needed} bytes needed, quota is {quota}")]
    QuotaExceeded { needed: usize, quota: usize },
}

/// Key derivation settings.
#[derive(Debug, Clone)]
pub struct KeyConfig {
    /// Version tag prefixed to every key
    pub version: String,
    /// Query parameters removed before keying
    pub volatile_params: Vec<String>,
}

impl Default for KeyConfig {
    fn default() -> Self {
        Self {
            version: DEFAULT_CACHE_VERSION.to_string(),
            volatile_params: DEFAULT_VOLATILE_PARAMS
                .iter()
                .map(|p| p.to_string())
                .collect(),
        }
    }
}

/// Durable tier configuration.
#[derive(Debug, Clone)]
pub struct DurableTierConfig {
    /// Whether the durable store may be used at all
    pub enabled: bool,
    /// Directory holding one record file per key
    pub directory: PathBuf,
    /// Records kept after each prune
    pub max_entries: usize,
    /// Payloads above this size are rejected
    pub max_raw_bytes: usize,
}

impl Default for DurableTierConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            directory: default_cache_root().join("http"),
            max_entries: DEFAULT_DURABLE_MAX_ENTRIES,
            max_raw_bytes: DEFAULT_MAX_RAW_BYTES,
        }
    }
}

/// Fallback tier configuration.
#[derive(Debug, Clone)]
pub struct FallbackTierConfig {
    /// Key/value file backing the tier
    pub file: PathBuf,
    /// Largest accepted payload
    pub max_entry_bytes: usize,
    /// Total serialized size of the store
    pub quota_bytes: usize,
}

impl Default for FallbackTierConfig {
    fn default() -> Self {
        Self {
            file: default_cache_root().join("fallback.json"),
            max_entry_bytes: DEFAULT_FALLBACK_MAX_ENTRY_BYTES,
            quota_bytes: DEFAULT_FALLBACK_QUOTA_BYTES,
        }
    }
}

/// Complete cache configuration.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Master switch; when off every fetch goes to the network
    pub enabled: bool,
    /// Key derivation
    pub key: KeyConfig,
    /// Memory tier capacity in entries
    pub memory_entries: usize,
    /// TTL used when a fetch does not specify one
    pub default_ttl: Duration,
    /// Durable tier
    pub durable: DurableTierConfig,
    /// Fallback tier
    pub fallback: FallbackTierConfig,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            key: KeyConfig::default(),
            memory_entries: DEFAULT_MEMORY_ENTRIES,
            default_ttl: DEFAULT_TTL,
            durable: DurableTierConfig::default(),
            fallback: FallbackTierConfig::default(),
        }
    }
}

impl CacheConfig {
    /// Place both persistent tiers under one directory.
    pub fn with_cache_dir(mut self, dir: PathBuf) -> Self {
        self.durable.directory = dir.join("http");
        self.fallback.file = dir.join("fallback.json");
        self
    }

    /// Set the cache-format version tag.
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.key.version = version.into();
        self
    }

    /// Set the memory tier capacity.
    pub fn with_memory_entries(mut self, entries: usize) -> Self {
        self.memory_entries = entries;
        self
    }

    /// Disable the durable store, forcing the fallback tier.
    pub fn without_durable(mut self) -> Self {
        self.durable.enabled = false;
        self
    }
}

/// Default root for persistent cache data.
pub fn default_cache_root() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("parcelview")
}
