//! In-flight request registry.
//!
//! De-duplicates concurrent fetches of the same key: the first caller becomes
//! the owner and performs the request, later callers subscribe to the owner's
//! result instead of issuing their own.
//!
//! ```text
//! fetch A ─┐
//!          │                       owner
//! fetch B ─┼──► InflightRegistry ───────► network
//!          │         │                        │
//! fetch C ─┘         ▼                        ▼
//!              [B, C wait on a      ◄─── one result,
//!               broadcast channel]       broadcast to all
//! ```
//!
//! The entry for a key is removed whenever its owner settles, including when
//! the owner future is dropped mid-request, so a failed or abandoned fetch
//! never blocks later retries. Waiters of a vanished owner observe
//! [`FetchError::Cancelled`].

use std::collections::HashMap;

use parking_lot::Mutex;
use tokio::sync::broadcast;
use tracing::{debug, trace};

use crate::cache::types::CacheKey;
use crate::fetch::FetchError;

type Shared<V> = Result<V, FetchError>;

/// Statistics for monitoring de-duplication effectiveness.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InflightStats {
    /// Total registrations
    pub total_requests: u64,
    /// Registrations that joined an existing request
    pub coalesced_requests: u64,
    /// Registrations that became owners
    pub new_requests: u64,
}

impl InflightStats {
    /// Share of requests that were coalesced (0.0 to 1.0).
    pub fn coalescing_ratio(&self) -> f64 {
        if self.total_requests == 0 {
            0.0
        } else {
            self.coalesced_requests as f64 / self.total_requests as f64
        }
    }
}

/// Tracks pending requests by cache key.
pub struct InflightRegistry<V> {
    in_flight: Mutex<HashMap<CacheKey, broadcast::Sender<Shared<V>>>>,
    stats: Mutex<InflightStats>,
}

/// Outcome of [`InflightRegistry::register`].
pub enum Registration<'a, V: Clone> {
    /// First caller for the key; must perform the request.
    Owner(InflightGuard<'a, V>),
    /// A request is already pending; wait for its result.
    Waiter(InflightWaiter<V>),
}

impl<V: Clone> InflightRegistry<V> {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            in_flight: Mutex::new(HashMap::new()),
            stats: Mutex::new(InflightStats::default()),
        }
    }

    /// Join or start the request for `key`.
    ///
    /// The lookup and the insertion happen in one critical section, so two
    /// concurrent callers can never both become owners.
    pub fn register(&self, key: &CacheKey) -> Registration<'_, V> {
        let mut in_flight = self.in_flight.lock();
        let mut stats = self.stats.lock();
        stats.total_requests += 1;

        if let Some(tx) = in_flight.get(key) {
            stats.coalesced_requests += 1;
            debug!(key = %key, "Joining in-flight request");
            return Registration::Waiter(InflightWaiter { rx: tx.subscribe() });
        }

        // One message is ever sent per channel
        let (tx, _rx) = broadcast::channel(1);
        in_flight.insert(key.clone(), tx.clone());
        stats.new_requests += 1;
        trace!(key = %key, in_flight = in_flight.len(), "New in-flight request");

        Registration::Owner(InflightGuard {
            registry: self,
            key: key.clone(),
            sender: Some(tx),
        })
    }

    /// Forget every pending entry.
    ///
    /// Owners already running still deliver to the waiters they have; new
    /// callers start fresh requests.
    pub fn clear(&self) {
        self.in_flight.lock().clear();
    }

    /// Whether a request for `key` is pending.
    pub fn contains(&self, key: &CacheKey) -> bool {
        self.in_flight.lock().contains_key(key)
    }

    /// Number of pending requests.
    pub fn in_flight_count(&self) -> usize {
        self.in_flight.lock().len()
    }

    /// Snapshot of the statistics.
    pub fn stats(&self) -> InflightStats {
        *self.stats.lock()
    }

    /// Remove the entry for `key` only if it is still the one `sender` created.
    fn deregister(&self, key: &CacheKey, sender: &broadcast::Sender<Shared<V>>) {
        let mut in_flight = self.in_flight.lock();
        if in_flight
            .get(key)
            .is_some_and(|current| current.same_channel(sender))
        {
            in_flight.remove(key);
        }
    }
}

impl<V: Clone> Default for InflightRegistry<V> {
    fn default() -> Self {
        Self::new()
    }
}

/// Ownership of a pending request.
///
/// Call [`complete`](Self::complete) with the result. Dropping the guard
/// without completing deregisters the key and cancels every waiter.
pub struct InflightGuard<'a, V: Clone> {
    registry: &'a InflightRegistry<V>,
    key: CacheKey,
    sender: Option<broadcast::Sender<Shared<V>>>,
}

impl<V: Clone> InflightGuard<'_, V> {
    /// Key this guard owns.
    pub fn key(&self) -> &CacheKey {
        &self.key
    }

    /// Deregister the key and deliver `result` to every waiter.
    pub fn complete(mut self, result: &Result<V, FetchError>) {
        if let Some(sender) = self.sender.take() {
            self.registry.deregister(&self.key, &sender);
            let waiters = sender.receiver_count();
            // No receivers is fine
            let _ = sender.send(result.clone());
            if waiters > 0 {
                debug!(key = %self.key, waiters = waiters, "Delivered result to waiters");
            }
        }
    }
}

impl<V: Clone> Drop for InflightGuard<'_, V> {
    fn drop(&mut self) {
        if let Some(sender) = self.sender.take() {
            trace!(key = %self.key, "In-flight owner dropped without result");
            self.registry.deregister(&self.key, &sender);
        }
    }
}

/// Subscription to another caller's pending request.
pub struct InflightWaiter<V> {
    rx: broadcast::Receiver<Shared<V>>,
}

impl<V: Clone> InflightWaiter<V> {
    /// Wait for the owner's result.
    ///
    /// Returns [`FetchError::Cancelled`] if the owner goes away without one.
    pub async fn wait(mut self) -> Result<V, FetchError> {
        match self.rx.recv().await {
            Ok(result) => result,
            Err(_) => Err(FetchError::Cancelled),
        }
    }
}
