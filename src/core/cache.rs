//! TTL-bounded response cache with an entry-count ceiling.
//!
//! Expiry is evaluated lazily against the injected [`Clock`]; stale entries are dropped
//! on the lookup that finds them or when room is needed for a new insert. When the
//! ceiling is reached the oldest-inserted entry is evicted (insertion order, not LRU).

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::sync::RwLock;
use tokio::time::Instant;

use crate::core::clock::{Clock, TokioClock};
use crate::core::identity::RequestIdentity;

/// Defines the behavior of the in-memory cache for an API call.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CacheMode {
    /// Read from the cache if a non-expired entry is present; otherwise, fetch from the network
    /// and write the response to the cache. (Default)
    #[default]
    Use,
    /// Always fetch from the network, bypassing any cached entry, and write the new response to the cache.
    Refresh,
    /// Always fetch from the network and do not read from or write to the cache (live data).
    Bypass,
}

impl CacheMode {
    pub(crate) const fn reads(self) -> bool {
        matches!(self, Self::Use)
    }

    pub(crate) const fn writes(self) -> bool {
        !matches!(self, Self::Bypass)
    }
}

#[derive(Debug, Clone)]
struct CacheEntry<V> {
    value: V,
    stored_at: Instant,
    ttl: Duration,
    seq: u64,
}

impl<V> CacheEntry<V> {
    fn is_expired(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.stored_at) > self.ttl
    }
}

#[derive(Debug)]
struct CacheInner<V> {
    map: HashMap<RequestIdentity, CacheEntry<V>>,
    // (identity, seq) in insertion order; a pair is stale once the map holds a newer seq.
    order: VecDeque<(RequestIdentity, u64)>,
    next_seq: u64,
}

impl<V> CacheInner<V> {
    fn new() -> Self {
        Self {
            map: HashMap::new(),
            order: VecDeque::new(),
            next_seq: 0,
        }
    }

    fn is_current(&self, key: &RequestIdentity, seq: u64) -> bool {
        self.map.get(key).is_some_and(|e| e.seq == seq)
    }

    fn evict_oldest(&mut self) -> bool {
        while let Some((key, seq)) = self.order.pop_front() {
            if self.is_current(&key, seq) {
                self.map.remove(&key);
                return true;
            }
        }
        false
    }

    fn purge_expired(&mut self, now: Instant) -> usize {
        let before = self.map.len();
        self.map.retain(|_, e| !e.is_expired(now));
        let removed = before - self.map.len();
        if removed > 0 {
            self.compact();
        }
        removed
    }

    fn compact(&mut self) {
        let map = &self.map;
        self.order
            .retain(|(key, seq)| map.get(key).is_some_and(|e| e.seq == *seq));
    }
}

/// Counters and live keys reported by [`ResponseCache::stats`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Entries currently held, including ones that expired but were not yet dropped.
    pub entries: usize,
    /// Identities of the non-expired entries, oldest first.
    pub keys: Vec<String>,
    pub hits: u64,
    pub misses: u64,
    /// Entries removed to respect the ceiling.
    pub evictions: u64,
}

/// Thread-safe response cache keyed by [`RequestIdentity`].
///
/// `put` replaces whole entries under the write lock, so a concurrent `get` observes
/// either the previous entry or the new one, never a partial write.
#[derive(Debug, Clone)]
pub struct ResponseCache<V = serde_json::Value> {
    inner: Arc<RwLock<CacheInner<V>>>,
    clock: Arc<dyn Clock>,
    default_ttl: Duration,
    capacity: usize,
    hits: Arc<AtomicU64>,
    misses: Arc<AtomicU64>,
    evictions: Arc<AtomicU64>,
}

impl<V: Clone> ResponseCache<V> {
    /// Creates a cache on the runtime clock.
    #[must_use]
    pub fn new(default_ttl: Duration, capacity: usize) -> Self {
        Self::with_clock(default_ttl, capacity, Arc::new(TokioClock))
    }

    #[must_use]
    pub fn with_clock(default_ttl: Duration, capacity: usize, clock: Arc<dyn Clock>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(CacheInner::new())),
            clock,
            default_ttl,
            capacity,
            hits: Arc::new(AtomicU64::new(0)),
            misses: Arc::new(AtomicU64::new(0)),
            evictions: Arc::new(AtomicU64::new(0)),
        }
    }

    /// A cache that stores nothing.
    #[must_use]
    pub fn disabled() -> Self {
        Self::new(Duration::ZERO, 0)
    }

    /// A zero TTL or a zero ceiling disables caching.
    #[must_use]
    pub fn is_disabled(&self) -> bool {
        self.default_ttl.is_zero() || self.capacity == 0
    }

    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    #[must_use]
    pub const fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    /// Returns the cached value if present and not older than its TTL.
    ///
    /// A stale entry found here is dropped.
    pub async fn get(&self, key: &RequestIdentity) -> Option<V> {
        let now = self.clock.now();
        {
            let guard = self.inner.read().await;
            match guard.map.get(key) {
                Some(entry) if !entry.is_expired(now) => {
                    self.hits.fetch_add(1, Ordering::Relaxed);
                    return Some(entry.value.clone());
                }
                Some(_) => {}
                None => {
                    self.misses.fetch_add(1, Ordering::Relaxed);
                    return None;
                }
            }
        }

        let mut guard = self.inner.write().await;
        // Re-check: a concurrent put may have replaced the stale entry.
        if let Some(entry) = guard.map.get(key) {
            if !entry.is_expired(now) {
                self.hits.fetch_add(1, Ordering::Relaxed);
                return Some(entry.value.clone());
            }
            guard.map.remove(key);
        }
        self.misses.fetch_add(1, Ordering::Relaxed);
        None
    }

    /// Inserts or overwrites `key` with the default TTL.
    pub async fn put(&self, key: RequestIdentity, value: V) {
        self.put_with_ttl(key, value, None).await;
    }

    /// Inserts or overwrites `key`, optionally with a TTL other than the default.
    ///
    /// An overwrite counts as a fresh insertion for eviction order.
    pub async fn put_with_ttl(&self, key: RequestIdentity, value: V, ttl_override: Option<Duration>) {
        if self.is_disabled() {
            return;
        }
        let now = self.clock.now();
        let ttl = ttl_override.unwrap_or(self.default_ttl);

        let mut guard = self.inner.write().await;
        if !guard.map.contains_key(&key) && guard.map.len() >= self.capacity {
            guard.purge_expired(now);
            while guard.map.len() >= self.capacity && guard.evict_oldest() {
                self.evictions.fetch_add(1, Ordering::Relaxed);
            }
        }

        let seq = guard.next_seq;
        guard.next_seq += 1;
        guard.order.push_back((key.clone(), seq));
        guard.map.insert(
            key,
            CacheEntry {
                value,
                stored_at: now,
                ttl,
                seq,
            },
        );

        if guard.order.len() > self.capacity.saturating_mul(2) {
            guard.compact();
        }
    }

    /// Removes a single entry. Returns whether it was present.
    pub async fn invalidate(&self, key: &RequestIdentity) -> bool {
        let mut guard = self.inner.write().await;
        let removed = guard.map.remove(key).is_some();
        if removed {
            guard.compact();
        }
        removed
    }

    /// Removes every entry.
    pub async fn clear(&self) {
        let mut guard = self.inner.write().await;
        guard.map.clear();
        guard.order.clear();
    }

    /// Drops every expired entry and returns how many were removed.
    pub async fn purge_expired(&self) -> usize {
        let now = self.clock.now();
        self.inner.write().await.purge_expired(now)
    }

    /// Number of entries held, including expired ones not yet dropped.
    pub async fn len(&self) -> usize {
        self.inner.read().await.map.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    pub async fn stats(&self) -> CacheStats {
        let now = self.clock.now();
        let guard = self.inner.read().await;
        let keys = guard
            .order
            .iter()
            .filter(|(key, seq)| {
                guard
                    .map
                    .get(key)
                    .is_some_and(|e| e.seq == *seq && !e.is_expired(now))
            })
            .map(|(key, _)| key.to_string())
            .collect();
        CacheStats {
            entries: guard.map.len(),
            keys,
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
        }
    }
}
