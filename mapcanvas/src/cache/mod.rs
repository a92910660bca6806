//! Two-level tile cache
//!
//! Layers a fast, volatile in-memory store over a durable on-disk byte
//! store, keyed by the stable string derived from source identity and tile
//! coordinates. Entries carry their expiration with them; expired entries
//! are still returned so the loader can decide to refetch, matching the
//! "stale means miss" contract.
//!
//! Durable-store failures never abort a load: reads downgrade to a miss,
//! writes and removes to a logged no-op. Concurrent `get`/`set`/`remove`
//! from arbitrary tasks are safe; same-key races resolve by whichever
//! whole-entry write lands last, both being valid fetches of the same tile.

mod disk;
mod memory;
mod types;

pub use disk::DiskCache;
pub use memory::MemoryCache;
pub use types::{cache_key, CacheError, TileCacheEntry, EXPIRES_TAG, TRAILER_LEN};

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{debug, warn};

/// The two-level cache used by the tile loader.
///
/// Constructed explicitly at layer activation and dropped at shutdown; the
/// loader receives a shared handle rather than reaching for any process-wide
/// singleton.
pub struct TileCache {
    memory: MemoryCache,
    disk: DiskCache,
}

impl TileCache {
    /// Opens a cache with the given durable root and memory budget.
    pub fn new(disk_root: PathBuf, max_memory_bytes: u64) -> Result<Self, CacheError> {
        Ok(Self {
            memory: MemoryCache::new(max_memory_bytes),
            disk: DiskCache::new(disk_root)?,
        })
    }

    /// Looks up a key, memory first.
    ///
    /// On a memory miss the durable store is consulted and a hit is
    /// promoted into memory before returning. Durable failures (I/O errors,
    /// corrupt trailers) are logged and reported as a miss.
    ///
    /// The returned entry may be expired; the caller decides freshness.
    pub async fn get(&self, key: &str) -> Option<Arc<TileCacheEntry>> {
        if let Some(entry) = self.memory.get(key).await {
            return Some(entry);
        }

        match self.disk.read(key).await {
            Ok(Some(entry)) => {
                debug!(key, "Promoting disk cache entry into memory");
                let entry = Arc::new(entry);
                self.memory.set(key.to_string(), entry.clone()).await;
                Some(entry)
            }
            Ok(None) => None,
            Err(e) => {
                warn!(key, error = %e, "Disk cache read failed, treating as miss");
                None
            }
        }
    }

    /// Stores an entry in memory and, for non-empty buffers, durably.
    ///
    /// Cached negative results (empty buffers) stay memory-only: after a
    /// restart the tile is simply queried again. Durable write failures are
    /// logged, never raised.
    pub async fn set(&self, key: &str, entry: TileCacheEntry) {
        let entry = Arc::new(entry);
        self.memory.set(key.to_string(), entry.clone()).await;

        if entry.is_empty() {
            return;
        }

        if let Err(e) = self.disk.write(key, &entry).await {
            warn!(key, error = %e, "Disk cache write failed, entry remains memory-only");
        }
    }

    /// Evicts a key from memory and deletes its durable artifact.
    ///
    /// A failed delete (permissions, lock contention) is logged and
    /// otherwise ignored; a subsequent `get` will simply repopulate.
    pub async fn remove(&self, key: &str) {
        self.memory.remove(key).await;

        if let Err(e) = self.disk.delete(key).await {
            warn!(key, error = %e, "Failed to delete durable cache entry");
        }
    }

    /// Drops the volatile layer, simulating a process restart. Durable
    /// entries survive.
    pub fn clear_memory(&self) {
        self.memory.clear();
    }

    /// Memory-layer hit count, for diagnostics.
    pub fn memory_hits(&self) -> u64 {
        self.memory.hits()
    }

    /// Memory-layer miss count, for diagnostics.
    pub fn memory_misses(&self) -> u64 {
        self.memory.misses()
    }
}
