//! Cache statistics tracking and reporting.

use std::time::Instant;

/// Counters kept by the fetch orchestrator.
#[derive(Debug, Clone)]
pub struct CacheStats {
    // Memory tier
    pub memory_hits: u64,
    pub memory_misses: u64,
    pub memory_entry_count: usize,
    pub memory_evictions: u64,

    // Durable tier
    pub durable_hits: u64,
    pub durable_misses: u64,
    pub durable_writes: u64,
    pub durable_rejected: u64,
    pub durable_failures: u64,
    pub durable_pruned: u64,

    // Fallback tier
    pub fallback_hits: u64,
    pub fallback_misses: u64,
    pub fallback_writes: u64,
    pub fallback_rejected: u64,

    // Network
    pub network_fetches: u64,
    pub network_failures: u64,
    pub coalesced_waits: u64,
    pub cancellations: u64,
    pub bytes_downloaded: u64,

    pub created_at: Instant,
}

impl Default for CacheStats {
    fn default() -> Self {
        Self::new()
    }
}

impl CacheStats {
    /// Create a new statistics tracker.
    pub fn new() -> Self {
        Self {
            memory_hits: 0,
            memory_misses: 0,
            memory_entry_count: 0,
            memory_evictions: 0,
            durable_hits: 0,
            durable_misses: 0,
            durable_writes: 0,
            durable_rejected: 0,
            durable_failures: 0,
            durable_pruned: 0,
            fallback_hits: 0,
            fallback_misses: 0,
            fallback_writes: 0,
            fallback_rejected: 0,
            network_fetches: 0,
            network_failures: 0,
            coalesced_waits: 0,
            cancellations: 0,
            bytes_downloaded: 0,
            created_at: Instant::now(),
        }
    }

    /// Memory tier hit rate (0.0 to 1.0).
    pub fn memory_hit_rate(&self) -> f64 {
        ratio(self.memory_hits, self.memory_hits + self.memory_misses)
    }

    /// Hit rate across all tiers (0.0 to 1.0).
    ///
    /// Every lookup that reached the network, directly or by joining an
    /// in-flight request, counts as a miss.
    pub fn overall_hit_rate(&self) -> f64 {
        let hits = self.memory_hits + self.durable_hits + self.fallback_hits;
        ratio(hits, hits + self.network_fetches + self.coalesced_waits)
    }

    /// Time since statistics started.
    pub fn uptime(&self) -> std::time::Duration {
        self.created_at.elapsed()
    }

    pub fn record_memory_hit(&mut self) {
        self.memory_hits += 1;
    }

    pub fn record_memory_miss(&mut self) {
        self.memory_misses += 1;
    }

    pub fn record_durable_hit(&mut self) {
        self.durable_hits += 1;
    }

    pub fn record_durable_miss(&mut self) {
        self.durable_misses += 1;
    }

    /// Record the outcome of a durable write: stored, or rejected for size.
    pub fn record_durable_write(&mut self, stored: bool) {
        if stored {
            self.durable_writes += 1;
        } else {
            self.durable_rejected += 1;
        }
    }

    /// Record a durable read or write that errored.
    pub fn record_durable_failure(&mut self) {
        self.durable_failures += 1;
    }

    pub fn record_durable_pruned(&mut self, count: u64) {
        self.durable_pruned += count;
    }

    pub fn record_fallback_hit(&mut self) {
        self.fallback_hits += 1;
    }

    pub fn record_fallback_miss(&mut self) {
        self.fallback_misses += 1;
    }

    /// Record the outcome of a fallback write.
    pub fn record_fallback_write(&mut self, stored: bool) {
        if stored {
            self.fallback_writes += 1;
        } else {
            self.fallback_rejected += 1;
        }
    }

    /// Record a completed network request.
    pub fn record_network_fetch(&mut self, bytes: u64) {
        self.network_fetches += 1;
        self.bytes_downloaded += bytes;
    }

    /// Record a network request that failed or returned an invalid body.
    pub fn record_network_failure(&mut self) {
        self.network_fetches += 1;
        self.network_failures += 1;
    }

    pub fn record_coalesced_wait(&mut self) {
        self.coalesced_waits += 1;
    }

    pub fn record_cancellation(&mut self) {
        self.cancellations += 1;
    }

    /// Update memory tier occupancy.
    pub fn update_memory(&mut self, entry_count: usize, evictions: u64) {
        self.memory_entry_count = entry_count;
        self.memory_evictions = evictions;
    }
}

fn ratio(part: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        part as f64 / total as f64
    }
}

/// Snapshot of cache statistics for reporting.
#[derive(Debug, Clone)]
pub struct CacheStatistics {
    pub stats: CacheStats,
    pub memory_hit_rate_percent: f64,
    pub overall_hit_rate_percent: f64,
    pub uptime_secs: u64,
}

impl CacheStatistics {
    /// Create a statistics snapshot from current stats.
    pub fn from_stats(stats: &CacheStats) -> Self {
        Self {
            stats: stats.clone(),
            memory_hit_rate_percent: stats.memory_hit_rate() * 100.0,
            overall_hit_rate_percent: stats.overall_hit_rate() * 100.0,
            uptime_secs: stats.uptime().as_secs(),
        }
    }

    /// Format statistics as a human-readable report.
    pub fn format(&self) -> String {
        let stats = &self.stats;

        format!(
            r#"Parcelview Cache Statistics

MEMORY
  Entries:     {}
  Hits:        {}
  Misses:      {}
  Hit Rate:    {:.1}%
  Evictions:   {}

DURABLE
  Hits:        {}
  Misses:      {}
  Writes:      {}
  Rejected:    {}
  Failures:    {}
  Pruned:      {}

FALLBACK
  Hits:        {}
  Misses:      {}
  Writes:      {}
  Rejected:    {}

NETWORK
  Fetches:     {}
  Failures:    {}
  Coalesced:   {}
  Cancelled:   {}
  Bytes:       {:.2} MB

OVERALL
  Hit Rate:    {:.1}%
  Uptime:      {}s
"#,
            stats.memory_entry_count,
            stats.memory_hits,
            stats.memory_misses,
            self.memory_hit_rate_percent,
            stats.memory_evictions,
            stats.durable_hits,
            stats.durable_misses,
            stats.durable_writes,
            stats.durable_rejected,
            stats.durable_failures,
            stats.durable_pruned,
            stats.fallback_hits,
            stats.fallback_misses,
            stats.fallback_writes,
            stats.fallback_rejected,
            stats.network_fetches,
            stats.network_failures,
            stats.coalesced_waits,
            stats.cancellations,
            stats.bytes_downloaded as f64 / (1024.0 * 1024.0),
            self.overall_hit_rate_percent,
            self.uptime_secs,
        )
    }
}
