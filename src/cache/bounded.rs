//! Size-limited LRU cache keyed by string.
//!
//! # Responsibilities
//! - Memoize string → V lookups shared by concurrent requests
//! - Track an approximate byte size for every entry
//! - Evict least-recently-used entries to stay within capacity
//!
//! # Design Decisions
//! - The LRU itself is unbounded; capacity is enforced on tracked bytes
//! - `get` refreshes recency, so it takes the same lock as `set`
//! - Hit/miss/eviction counters live beside the map for cheap stats

use lru::LruCache;
use parking_lot::Mutex;
use serde::Serialize;

use crate::observability::metrics;

/// Approximate serialized size of a cached value.
pub trait CacheWeight {
    fn weight(&self) -> usize;
}

impl CacheWeight for String {
    fn weight(&self) -> usize {
        self.len()
    }
}

impl CacheWeight for bool {
    fn weight(&self) -> usize {
        1
    }
}

/// Point-in-time statistics for one cache instance.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct CacheStats {
    pub name: String,
    pub entries: usize,
    pub size: usize,
    pub capacity: usize,
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
}

struct CacheInner<V> {
    lru: LruCache<String, V>,
    size: usize,
    hits: u64,
    misses: u64,
    evictions: u64,
}

/// A thread-safe cache bounded by the tracked byte size of its entries.
pub struct BoundedCache<V> {
    name: String,
    capacity: usize,
    inner: Mutex<CacheInner<V>>,
}

impl<V: Clone + CacheWeight> BoundedCache<V> {
    /// Create an empty cache holding at most `capacity` tracked bytes.
    pub fn new(name: impl Into<String>, capacity: usize) -> Self {
        Self {
            name: name.into(),
            capacity,
            inner: Mutex::new(CacheInner {
                lru: LruCache::unbounded(),
                size: 0,
                hits: 0,
                misses: 0,
                evictions: 0,
            }),
        }
    }

    /// Cache name used in logs and metrics.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Configured capacity in bytes.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Look up a value, marking it most recently used.
    pub fn get(&self, key: &str) -> Option<V> {
        let mut inner = self.inner.lock();
        let value = inner.lru.get(key).cloned();
        if value.is_some() {
            inner.hits += 1;
        } else {
            inner.misses += 1;
        }
        drop(inner);

        metrics::record_cache_lookup(&self.name, value.is_some());
        value
    }

    /// Insert or overwrite a value, evicting older entries if needed.
    ///
    /// Returns false when the entry alone exceeds the capacity; in that case
    /// any previous value for the key is dropped as well so a stale result is
    /// never served.
    pub fn set(&self, key: impl Into<String>, value: V) -> bool {
        let key = key.into();
        let weight = entry_weight(&key, &value);
        let mut inner = self.inner.lock();

        if let Some(old) = inner.lru.pop(&key) {
            let old_weight = entry_weight(&key, &old);
            inner.size = inner.size.saturating_sub(old_weight);
        }

        if weight > self.capacity {
            tracing::debug!(cache = %self.name, weight, capacity = self.capacity, "Entry exceeds cache capacity, not stored");
            return false;
        }

        let mut evicted = 0u64;
        while inner.size + weight > self.capacity {
            match inner.lru.pop_lru() {
                Some((old_key, old_value)) => {
                    let old_weight = entry_weight(&old_key, &old_value);
                    inner.size = inner.size.saturating_sub(old_weight);
                    evicted += 1;
                }
                None => break,
            }
        }

        inner.size += weight;
        inner.lru.put(key, value);
        inner.evictions += evicted;
        drop(inner);

        if evicted > 0 {
            metrics::record_cache_eviction(&self.name, evicted);
        }
        true
    }

    /// Remove a key, returning its value.
    pub fn remove(&self, key: &str) -> Option<V> {
        let mut inner = self.inner.lock();
        let value = inner.lru.pop(key)?;
        inner.size = inner.size.saturating_sub(entry_weight(key, &value));
        Some(value)
    }

    /// Drop every entry. Counters are kept.
    pub fn clear(&self) {
        let mut inner = self.inner.lock();
        inner.lru.clear();
        inner.size = 0;
    }

    /// Number of stored entries.
    pub fn len(&self) -> usize {
        self.inner.lock().lru.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Currently tracked size in bytes.
    pub fn size(&self) -> usize {
        self.inner.lock().size
    }

    pub fn stats(&self) -> CacheStats {
        let inner = self.inner.lock();
        CacheStats {
            name: self.name.clone(),
            entries: inner.lru.len(),
            size: inner.size,
            capacity: self.capacity,
            hits: inner.hits,
            misses: inner.misses,
            evictions: inner.evictions,
        }
    }
}

fn entry_weight<V: CacheWeight>(key: &str, value: &V) -> usize {
    key.len() + value.weight()
}
