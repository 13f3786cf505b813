//! In-memory cache with TTL expiry and LRU eviction.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tracing::trace;

use crate::cache::types::CacheKey;
use crate::time::{ttl_millis, Clock};

/// Entry in the memory tier.
#[derive(Debug, Clone)]
struct MemoryEntry<V> {
    /// Decoded value
    value: V,
    /// Epoch millis after which the entry is stale
    expires_at: u64,
    /// Recency tick for LRU ordering
    last_used: u64,
}

#[derive(Debug)]
struct MemoryState<V> {
    entries: HashMap<CacheKey, MemoryEntry<V>>,
    /// Monotonic counter; larger means more recently used
    tick: u64,
    evictions: u64,
}

impl<V> MemoryState<V> {
    fn next_tick(&mut self) -> u64 {
        self.tick += 1;
        self.tick
    }
}

/// Bounded, process-local cache of decoded responses.
///
/// Holds at most `capacity` entries. Reads of a stale entry remove it; writes
/// beyond capacity evict the least recently used entries.
pub struct MemoryTier<V> {
    state: Mutex<MemoryState<V>>,
    capacity: usize,
    clock: Arc<dyn Clock>,
}

impl<V: Clone> MemoryTier<V> {
    /// Create an empty tier holding at most `capacity` entries.
    pub fn new(capacity: usize, clock: Arc<dyn Clock>) -> Self {
        Self {
            state: Mutex::new(MemoryState {
                entries: HashMap::new(),
                tick: 0,
                evictions: 0,
            }),
            capacity,
            clock,
        }
    }

    /// Get a live value, marking it most recently used.
    pub fn get(&self, key: &CacheKey) -> Option<V> {
        let now = self.clock.now_millis();
        let mut state = self.state.lock();

        let expired = match state.entries.get(key) {
            None => return None,
            Some(entry) => entry.expires_at <= now,
        };
        if expired {
            state.entries.remove(key);
            trace!(key = %key, "Memory entry expired");
            return None;
        }

        let tick = state.next_tick();
        let entry = state.entries.get_mut(key)?;
        entry.last_used = tick;
        Some(entry.value.clone())
    }

    /// Insert or overwrite a value that expires after `ttl`.
    pub fn set(&self, key: CacheKey, value: V, ttl: Duration) {
        let expires_at = self.clock.now_millis().saturating_add(ttl_millis(ttl));
        let mut state = self.state.lock();
        let last_used = state.next_tick();

        state.entries.insert(
            key,
            MemoryEntry {
                value,
                expires_at,
                last_used,
            },
        );

        while state.entries.len() > self.capacity {
            let oldest = state
                .entries
                .iter()
                .min_by_key(|(_, entry)| entry.last_used)
                .map(|(key, _)| key.clone());
            match oldest {
                Some(key) => {
                    state.entries.remove(&key);
                    state.evictions += 1;
                    trace!(key = %key, "Memory entry evicted");
                }
                None => break,
            }
        }
    }

    /// Check for a live entry without touching its recency.
    pub fn contains(&self, key: &CacheKey) -> bool {
        let now = self.clock.now_millis();
        self.state
            .lock()
            .entries
            .get(key)
            .is_some_and(|entry| entry.expires_at > now)
    }

    /// Remove every entry.
    pub fn clear(&self) {
        self.state.lock().entries.clear();
    }

    /// Number of entries currently held, including not-yet-reaped stale ones.
    pub fn len(&self) -> usize {
        self.state.lock().entries.len()
    }

    /// Whether the tier holds no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Maximum number of entries.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Total LRU evictions since creation.
    pub fn evictions(&self) -> u64 {
        self.state.lock().evictions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::ManualClock;

    fn key(n: u32) -> CacheKey {
        CacheKey::from_raw(format!("v2|https://example.com/ows?page={n}"))
    }

    fn tier(capacity: usize) -> (ManualClock, MemoryTier<String>) {
        let clock = ManualClock::new(1_000_000);
        let tier = MemoryTier::new(capacity, Arc::new(clock.clone()));
        (clock, tier)
    }

    const TTL: Duration = Duration::from_secs(60);

    #[test]
    fn test_memory_tier_set_and_get() {
        let (_clock, tier) = tier(25);
        tier.set(key(1), "one".to_string(), TTL);

        assert_eq!(tier.get(&key(1)), Some("one".to_string()));
        assert_eq!(tier.len(), 1);
    }

    #[test]
    fn test_memory_tier_miss() {
        let (_clock, tier) = tier(25);
        assert_eq!(tier.get(&key(1)), None);
        assert!(tier.is_empty());
    }

    #[test]
    fn test_memory_tier_entry_expires() {
        let (clock, tier) = tier(25);
        tier.set(key(1), "one".to_string(), TTL);

        clock.advance(Duration::from_secs(59));
        assert_eq!(tier.get(&key(1)), Some("one".to_string()));

        clock.advance(Duration::from_secs(1));
        assert_eq!(tier.get(&key(1)), None);
        // Stale entry removed on read
        assert_eq!(tier.len(), 0);
    }

    #[test]
    fn test_memory_tier_lru_bound() {
        let (_clock, tier) = tier(25);
        for n in 0..30 {
            tier.set(key(n), format!("value-{n}"), TTL);
        }

        assert_eq!(tier.len(), 25);
        for n in 0..5 {
            assert!(!tier.contains(&key(n)), "key {n} should be evicted");
        }
        for n in 5..30 {
            assert!(tier.contains(&key(n)), "key {n} should remain");
        }
        assert_eq!(tier.evictions(), 5);
    }

    #[test]
    fn test_memory_tier_get_refreshes_recency() {
        let (_clock, tier) = tier(2);
        tier.set(key(1), "one".to_string(), TTL);
        tier.set(key(2), "two".to_string(), TTL);

        // Touch key 1 so key 2 becomes least recently used
        assert!(tier.get(&key(1)).is_some());
        tier.set(key(3), "three".to_string(), TTL);

        assert!(tier.contains(&key(1)));
        assert!(!tier.contains(&key(2)));
        assert!(tier.contains(&key(3)));
    }

    #[test]
    fn test_memory_tier_overwrite_keeps_single_entry() {
        let (_clock, tier) = tier(25);
        tier.set(key(1), "old".to_string(), TTL);
        tier.set(key(1), "new".to_string(), TTL);

        assert_eq!(tier.get(&key(1)), Some("new".to_string()));
        assert_eq!(tier.len(), 1);
    }

    #[test]
    fn test_memory_tier_zero_ttl_is_one_millisecond() {
        let (clock, tier) = tier(25);
        tier.set(key(1), "one".to_string(), Duration::ZERO);
        assert!(tier.contains(&key(1)));

        clock.advance(Duration::from_millis(1));
        assert!(!tier.contains(&key(1)));
    }

    #[test]
    fn test_memory_tier_clear() {
        let (_clock, tier) = tier(25);
        tier.set(key(1), "one".to_string(), TTL);
        tier.set(key(2), "two".to_string(), TTL);

        tier.clear();
        assert!(tier.is_empty());
        assert_eq!(tier.get(&key(1)), None);
    }
}
