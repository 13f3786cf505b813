//! Multi-tier response cache.
//!
//! Memory → durable → fallback tiers plus an in-flight registry. The tiers
//! are composed by [`crate::fetch::FetchOrchestrator`]; each is usable on its
//! own for tests and tooling.

mod durable;
mod fallback;
mod inflight;
mod key;
mod memory;
mod stats;
mod types;

pub use durable::{DurableRecord, DurableTier, PruneResult};
pub use fallback::{FallbackTier, LocalStore};
pub use inflight::{InflightGuard, InflightRegistry, InflightStats, InflightWaiter, Registration};
pub use key::{build_key, short_hash};
pub use memory::MemoryTier;
pub use stats::{CacheStatistics, CacheStats};
pub use types::{
    default_cache_root, CacheConfig, CacheError, CacheKey, DurableTierConfig, FallbackTierConfig,
    KeyConfig, DEFAULT_CACHE_VERSION, DEFAULT_DURABLE_MAX_ENTRIES,
    DEFAULT_FALLBACK_MAX_ENTRY_BYTES, DEFAULT_FALLBACK_QUOTA_BYTES, DEFAULT_MAX_RAW_BYTES,
    DEFAULT_MEMORY_ENTRIES, DEFAULT_TTL, DEFAULT_VOLATILE_PARAMS,
};
