//! Cached GeoJSON fetch orchestration.
//!
//! Lookup order for a non-forced fetch:
//!
//! ```text
//! memory ──miss──► durable ──miss──────────────────┐
//!                     │                            ▼
//!                     └─unavailable─► fallback ──► in-flight registry
//!                                                  │        │
//!                                               waiter    owner ──► network
//!                                                              │
//!                              durable (+prune) / fallback ◄───┤ persist
//!                                                   memory ◄───┘
//! ```
//!
//! A forced fetch skips all of the above and goes straight to the network.
//!
//! Persistence is best-effort: a failed write is logged and counted but
//! never fails the fetch.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use crate::cache::{
    build_key, CacheConfig, CacheKey, CacheStatistics, CacheStats, DurableTier, FallbackTier,
    InflightRegistry, InflightStats, MemoryTier, Registration,
};
use crate::fetch::collection::FeatureCollection;
use crate::fetch::error::{excerpt, FetchError};
use crate::fetch::http::{AsyncHttpClient, HttpResponse};
use crate::time::{Clock, SystemClock};

/// Per-call fetch options.
#[derive(Debug, Clone, Default)]
pub struct FetchOptions {
    /// Lifetime of the cached response; the configured default when `None`
    pub ttl: Option<Duration>,
    /// Skip every cache read and go to the network
    pub force: bool,
    /// Aborts the request with [`FetchError::Cancelled`]
    pub cancel: Option<CancellationToken>,
}

impl FetchOptions {
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    pub fn forced(mut self) -> Self {
        self.force = true;
        self
    }

    pub fn with_cancel(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }
}

/// What [`FetchOrchestrator::clear_all_caches`] removed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClearSummary {
    pub memory: usize,
    pub durable: usize,
    pub fallback: usize,
}

impl ClearSummary {
    pub fn total(&self) -> usize {
        self.memory + self.durable + self.fallback
    }
}

/// Single entry point for feature fetches.
///
/// Owns the cache tiers and the in-flight registry. Share it behind an
/// `Arc`; every method takes `&self`.
pub struct FetchOrchestrator<C> {
    client: C,
    config: CacheConfig,
    memory: MemoryTier<FeatureCollection>,
    durable: DurableTier,
    fallback: FallbackTier,
    inflight: InflightRegistry<FeatureCollection>,
    stats: Mutex<CacheStats>,
}

impl<C: AsyncHttpClient> FetchOrchestrator<C> {
    /// Open the tiers described by `config` using the system clock.
    pub async fn new(client: C, config: CacheConfig) -> Self {
        Self::with_clock(client, config, Arc::new(SystemClock)).await
    }

    /// Open the tiers with an explicit clock.
    pub async fn with_clock(client: C, config: CacheConfig, clock: Arc<dyn Clock>) -> Self {
        let memory = MemoryTier::new(config.memory_entries, Arc::clone(&clock));
        let durable = DurableTier::open(&config.durable, Arc::clone(&clock)).await;
        let fallback = FallbackTier::open(&config.fallback, &config.key.version, clock);

        info!(
            enabled = config.enabled,
            version = %config.key.version,
            memory_entries = config.memory_entries,
            durable_available = durable.is_available(),
            durable_dir = %durable.directory().display(),
            "Fetch orchestrator ready"
        );

        Self {
            client,
            config,
            memory,
            durable,
            fallback,
            inflight: InflightRegistry::new(),
            stats: Mutex::new(CacheStats::new()),
        }
    }

    /// Fetch a GeoJSON feature collection through the cache.
    ///
    /// # Errors
    ///
    /// Network and validation failures as [`FetchError`]; a cancelled token
    /// yields [`FetchError::Cancelled`]. Cache failures never surface here.
    pub async fn fetch_geojson(
        &self,
        url: &str,
        options: FetchOptions,
    ) -> Result<FeatureCollection, FetchError> {
        if !self.config.enabled {
            return self
                .fetch_remote(url, options.cancel.as_ref())
                .await
                .map(|(collection, _)| collection);
        }

        let key = build_key(url, &self.config.key);
        let ttl = options.ttl.unwrap_or(self.config.default_ttl);

        // A forced refresh neither reads the tiers nor joins a pending
        // request; it still stores what it fetches.
        if options.force {
            let result = self
                .fetch_and_store(url, &key, ttl, options.cancel.as_ref())
                .await;
            if let Err(e) = &result {
                self.log_failure(url, e);
            }
            return result;
        }

        if let Some(hit) = self.lookup(&key, ttl).await {
            return Ok(hit);
        }

        match self.inflight.register(&key) {
            Registration::Waiter(waiter) => {
                self.stats.lock().record_coalesced_wait();
                let result = match &options.cancel {
                    Some(token) => tokio::select! {
                        biased;
                        _ = token.cancelled() => Err(FetchError::Cancelled),
                        result = waiter.wait() => result,
                    },
                    None => waiter.wait().await,
                };
                if matches!(result, Err(FetchError::Cancelled)) {
                    self.stats.lock().record_cancellation();
                }
                result
            }
            Registration::Owner(guard) => {
                // An owner that settled between our lookup and registration
                // has already filled memory.
                if let Some(hit) = self.memory.get(&key) {
                    trace!(key = %key, "Filled while registering");
                    guard.complete(&Ok(hit.clone()));
                    return Ok(hit);
                }

                let result = self
                    .fetch_and_store(url, &key, ttl, options.cancel.as_ref())
                    .await;
                guard.complete(&result);

                if let Err(e) = &result {
                    self.log_failure(url, e);
                }
                result
            }
        }
    }

    /// Empty every tier and forget pending requests.
    pub async fn clear_all_caches(&self) -> ClearSummary {
        let memory = self.memory.len();
        self.memory.clear();
        self.inflight.clear();

        let durable = match self.durable.clear().await {
            Ok(removed) => removed,
            Err(e) => {
                debug!(error = %e, "Durable tier not cleared");
                0
            }
        };
        let fallback = self.fallback.clear_all();

        let summary = ClearSummary {
            memory,
            durable,
            fallback,
        };
        info!(
            memory = summary.memory,
            durable = summary.durable,
            fallback = summary.fallback,
            "Cleared all caches"
        );
        summary
    }

    /// Snapshot of the counters.
    pub fn stats(&self) -> CacheStatistics {
        let mut stats = self.stats.lock();
        stats.update_memory(self.memory.len(), self.memory.evictions());
        CacheStatistics::from_stats(&stats)
    }

    /// De-duplication counters.
    pub fn inflight_stats(&self) -> InflightStats {
        self.inflight.stats()
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    pub fn memory(&self) -> &MemoryTier<FeatureCollection> {
        &self.memory
    }

    pub fn durable(&self) -> &DurableTier {
        &self.durable
    }

    pub fn fallback(&self) -> &FallbackTier {
        &self.fallback
    }

    /// Memory, then durable (fallback when durable fails). A persistent hit
    /// is promoted into memory for `ttl`.
    async fn lookup(&self, key: &CacheKey, ttl: Duration) -> Option<FeatureCollection> {
        if let Some(hit) = self.memory.get(key) {
            self.stats.lock().record_memory_hit();
            debug!(key = %key, "Memory cache hit");
            return Some(hit);
        }
        self.stats.lock().record_memory_miss();

        let raw = match self.durable.get(key).await {
            Ok(Some(raw)) => {
                self.stats.lock().record_durable_hit();
                debug!(key = %key, "Durable cache hit");
                raw
            }
            Ok(None) => {
                self.stats.lock().record_durable_miss();
                return None;
            }
            Err(e) => {
                trace!(key = %key, error = %e, "Durable lookup failed, trying fallback");
                match self.fallback.get(key) {
                    Some(raw) => {
                        self.stats.lock().record_fallback_hit();
                        debug!(key = %key, "Fallback cache hit");
                        raw
                    }
                    None => {
                        self.stats.lock().record_fallback_miss();
                        return None;
                    }
                }
            }
        };

        match FeatureCollection::parse(&raw) {
            Ok(collection) => {
                self.memory.set(key.clone(), collection.clone(), ttl);
                Some(collection)
            }
            Err(e) => {
                debug!(key = %key, error = %e, "Stored payload no longer parses, ignoring");
                None
            }
        }
    }

    async fn fetch_and_store(
        &self,
        url: &str,
        key: &CacheKey,
        ttl: Duration,
        cancel: Option<&CancellationToken>,
    ) -> Result<FeatureCollection, FetchError> {
        let (collection, raw) = self.fetch_remote(url, cancel).await?;

        self.persist(key, &raw, ttl).await;
        self.memory.set(key.clone(), collection.clone(), ttl);

        Ok(collection)
    }

    /// Network request plus validation. Returns the decoded collection and
    /// the raw body for persistence.
    async fn fetch_remote(
        &self,
        url: &str,
        cancel: Option<&CancellationToken>,
    ) -> Result<(FeatureCollection, String), FetchError> {
        let response = match cancel {
            Some(token) => tokio::select! {
                biased;
                _ = token.cancelled() => Err(FetchError::Cancelled),
                response = self.client.get(url) => response,
            },
            None => self.client.get(url).await,
        };

        let response = match response {
            Ok(response) => response,
            Err(e) => {
                let mut stats = self.stats.lock();
                if e.is_cancelled() {
                    stats.record_cancellation();
                } else {
                    stats.record_network_failure();
                }
                return Err(e);
            }
        };

        let bytes = response.body.len() as u64;
        let validated = validate(response);
        let mut stats = self.stats.lock();
        if validated.is_ok() {
            stats.record_network_fetch(bytes);
        } else {
            stats.record_network_failure();
        }
        validated
    }

    async fn persist(&self, key: &CacheKey, raw: &str, ttl: Duration) {
        match self.durable.set(key, raw, ttl).await {
            Ok(stored) => {
                self.stats.lock().record_durable_write(stored);
                if !stored {
                    debug!(key = %key, bytes = raw.len(), "Response too large to persist");
                    return;
                }
                match self.durable.prune(self.config.durable.max_entries).await {
                    Ok(pruned) => {
                        let removed = pruned.total_removed();
                        if removed > 0 {
                            self.stats.lock().record_durable_pruned(removed as u64);
                        }
                    }
                    Err(e) => debug!(error = %e, "Durable prune failed"),
                }
            }
            Err(e) => {
                trace!(key = %key, error = %e, "Durable write failed, using fallback");
                let stored = self.fallback.set(key, raw, ttl);
                let mut stats = self.stats.lock();
                stats.record_durable_failure();
                stats.record_fallback_write(stored);
            }
        }
    }

    fn log_failure(&self, url: &str, error: &FetchError) {
        if error.is_cancelled() {
            debug!(url = url, "Fetch cancelled");
        } else {
            warn!(url = url, error = %error, "Fetch failed");
        }
    }
}

/// Status, then content type, then JSON, then the `features` array.
fn validate(response: HttpResponse) -> Result<(FeatureCollection, String), FetchError> {
    if !response.is_success() {
        return Err(FetchError::Http {
            status: response.status,
        });
    }

    let raw = String::from_utf8_lossy(&response.body).into_owned();
    let is_json = response
        .content_type
        .as_deref()
        .is_some_and(|ct| ct.to_ascii_lowercase().contains("json"));
    if !is_json {
        return Err(FetchError::NotJson {
            excerpt: excerpt(&raw),
        });
    }

    let collection = FeatureCollection::parse(&raw)?;
    Ok((collection, raw))
}
