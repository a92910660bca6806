//! In-memory cache layer with LRU eviction using moka.
//!
//! Backed by `moka::future::Cache`, which uses lock-free structures
//! internally and is safe to hit from many concurrent tile loads without
//! blocking the runtime. Entries are weighted by payload size so the layer
//! stays within its configured memory budget.
//!
//! Expiration is deliberately *not* delegated to moka's TTL support: the
//! expiration timestamp is part of the cached data (it must survive the
//! round-trip through the durable layer), so freshness is decided by the
//! caller and eviction here is purely a memory-pressure concern.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use moka::future::Cache;

use super::types::TileCacheEntry;

/// Fast, volatile cache layer in front of the durable store.
pub struct MemoryCache {
    cache: Cache<String, Arc<TileCacheEntry>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl MemoryCache {
    /// Creates a memory cache bounded to `max_size_bytes` of payload.
    pub fn new(max_size_bytes: u64) -> Self {
        let cache = Cache::builder()
            // Weight each entry by payload size plus a fixed overhead so
            // cached negative results still count.
            .weigher(|key: &String, entry: &Arc<TileCacheEntry>| -> u32 {
                (entry.buffer.len() + key.len() + 64).min(u32::MAX as usize) as u32
            })
            .max_capacity(max_size_bytes)
            .build();

        Self {
            cache,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    pub async fn get(&self, key: &str) -> Option<Arc<TileCacheEntry>> {
        match self.cache.get(key).await {
            Some(entry) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(entry)
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    pub async fn set(&self, key: String, entry: Arc<TileCacheEntry>) {
        self.cache.insert(key, entry).await;
    }

    pub async fn remove(&self, key: &str) {
        self.cache.invalidate(key).await;
    }

    /// Drops every entry. Used by tests to simulate a process restart.
    pub fn clear(&self) {
        self.cache.invalidate_all();
    }

    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn entry(byte: u8) -> Arc<TileCacheEntry> {
        Arc::new(TileCacheEntry::new(
            vec![byte; 8],
            Utc::now() + Duration::hours(1),
        ))
    }

    #[tokio::test]
    async fn test_set_then_get() {
        let cache = MemoryCache::new(1024 * 1024);
        cache.set("osm/5/10/10".to_string(), entry(7)).await;

        let got = cache.get("osm/5/10/10").await.unwrap();
        assert_eq!(got.buffer, vec![7; 8]);
        assert_eq!(cache.hits(), 1);
    }

    #[tokio::test]
    async fn test_miss_is_counted() {
        let cache = MemoryCache::new(1024);
        assert!(cache.get("absent").await.is_none());
        assert_eq!(cache.misses(), 1);
    }

    #[tokio::test]
    async fn test_remove_evicts() {
        let cache = MemoryCache::new(1024);
        cache.set("k".to_string(), entry(1)).await;
        cache.remove("k").await;
        assert!(cache.get("k").await.is_none());
    }

    #[tokio::test]
    async fn test_clear_simulates_restart() {
        let cache = MemoryCache::new(1024);
        cache.set("k".to_string(), entry(1)).await;
        cache.clear();
        assert!(cache.get("k").await.is_none());
    }
}
