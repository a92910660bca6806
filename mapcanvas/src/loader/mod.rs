//! Concurrent tile loader
//!
//! Resolves the currently visible tile set through the two-level cache,
//! falling back to bounded network fetches, and hands decoded images to
//! each tile's display slot.
//!
//! Per tile the load walks `Pending -> Resolving (cache) -> Satisfied`, or
//! on a miss/expiry `-> Fetching (network) -> Satisfied | Failed`; those
//! states are terminal for one load generation. Viewport changes bump the
//! generation, cancelling superseded work: a cancelled fetch still commits
//! its cache write (the bytes stay valid for that tile id no matter which
//! generation asked), but its result is never assigned to a replaced tile.
//!
//! Per-tile failures — fetch, decode, cache I/O — are contained and logged
//! with the key and URL; they never abort sibling tiles or the loader.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use parking_lot::Mutex;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::cache::{cache_key, TileCache, TileCacheEntry};
use crate::config::LayerConfig;
use crate::decode::TileDecoder;
use crate::fetch::TileFetcher;
use crate::tile::{Tile, TileId};

/// One viewport state's load generation.
///
/// Generations are numbered monotonically; beginning a new one cancels all
/// work still in flight for its predecessor.
#[derive(Debug, Clone)]
pub struct LoadGeneration {
    number: u64,
    token: CancellationToken,
}

impl LoadGeneration {
    pub fn number(&self) -> u64 {
        self.number
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// Creates a runtime tile bound to this generation.
    pub fn tile(&self, id: TileId) -> Arc<Tile> {
        Arc::new(Tile::new(id, self.token.child_token()))
    }
}

/// How one tile's load attempt ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// Satisfied from a fresh cache entry; no network call was made.
    CacheHit,
    /// Satisfied after a network fetch (and cache write).
    Fetched,
    /// Fetch or decode failed; the slot stays unset and the tile may be
    /// retried by a later generation.
    Failed,
    /// The generation was superseded; any result was discarded.
    Cancelled,
}

/// Orchestrates tile loads for the visible set.
pub struct TileLoader {
    cache: Arc<TileCache>,
    fetcher: Arc<dyn TileFetcher>,
    decoder: Arc<dyn TileDecoder>,
    fetch_permits: Arc<Semaphore>,
    default_expiration: Duration,
    generation: AtomicU64,
    current_token: Mutex<CancellationToken>,
}

impl TileLoader {
    /// Creates a loader over an explicitly constructed cache and the given
    /// network/decoder boundaries.
    pub fn new(
        cache: Arc<TileCache>,
        fetcher: Arc<dyn TileFetcher>,
        decoder: Arc<dyn TileDecoder>,
        config: &LayerConfig,
    ) -> Self {
        Self {
            cache,
            fetcher,
            decoder,
            fetch_permits: Arc::new(Semaphore::new(config.max_concurrent_fetches)),
            default_expiration: config.default_expiration,
            generation: AtomicU64::new(0),
            current_token: Mutex::new(CancellationToken::new()),
        }
    }

    /// Starts a new load generation, cancelling the previous one.
    ///
    /// Called on every viewport change before re-enumerating the visible
    /// tile set.
    pub fn begin_generation(&self) -> LoadGeneration {
        let number = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let token = CancellationToken::new();

        let mut current = self.current_token.lock();
        current.cancel();
        *current = token.clone();

        debug!(generation = number, "Beginning load generation");
        LoadGeneration { number, token }
    }

    /// Loads a batch of tiles concurrently, bounded by the configured
    /// fetch limit, and reports each tile's outcome.
    ///
    /// No ordering is promised between tiles of the same batch; each slot
    /// update is independent and idempotent.
    pub async fn load(
        &self,
        source: &dyn crate::source::TileSource,
        tiles: &[Arc<Tile>],
    ) -> Vec<(TileId, LoadOutcome)> {
        let mut tasks = JoinSet::new();

        for tile in tiles {
            let key = cache_key(source.id(), tile.id());
            let url = source.url(&tile.id());
            let tile = tile.clone();
            let cache = self.cache.clone();
            let fetcher = self.fetcher.clone();
            let decoder = self.decoder.clone();
            let permits = self.fetch_permits.clone();
            let default_expiration = self.default_expiration;

            tasks.spawn(async move {
                let id = tile.id();
                let outcome = load_tile(
                    cache,
                    fetcher,
                    decoder,
                    permits,
                    default_expiration,
                    key,
                    url,
                    tile,
                )
                .await;
                (id, outcome)
            });
        }

        let mut outcomes = Vec::with_capacity(tiles.len());
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(outcome) => outcomes.push(outcome),
                Err(e) => warn!(error = %e, "Tile load task aborted"),
            }
        }
        outcomes
    }
}

/// Loads one tile through cache, network and decode.
#[allow(clippy::too_many_arguments)]
async fn load_tile(
    cache: Arc<TileCache>,
    fetcher: Arc<dyn TileFetcher>,
    decoder: Arc<dyn TileDecoder>,
    permits: Arc<Semaphore>,
    default_expiration: Duration,
    key: String,
    url: String,
    tile: Arc<Tile>,
) -> LoadOutcome {
    let now = Utc::now();
    let mut from_cache = true;
    let mut buffer = None;

    if let Some(entry) = cache.get(&key).await {
        if !entry.is_expired(now) {
            buffer = Some(entry.buffer.clone());
        }
    }

    if buffer.is_none() {
        if tile.is_cancelled() {
            // Not yet in flight; nothing worth finishing.
            return LoadOutcome::Cancelled;
        }

        // The permit bounds fetches across all tiles; waiters queue FIFO.
        let _permit = match permits.acquire().await {
            Ok(permit) => permit,
            Err(_) => return LoadOutcome::Cancelled,
        };
        if tile.is_cancelled() {
            return LoadOutcome::Cancelled;
        }

        from_cache = false;
        match fetcher.fetch(&url).await {
            Ok(fetched) => {
                let max_age = fetched.max_age.unwrap_or(default_expiration);
                let expires = Utc::now()
                    + chrono::Duration::from_std(max_age)
                        .unwrap_or_else(|_| chrono::Duration::days(365));
                // Committed even for a superseded generation: the bytes are
                // valid for this tile id regardless of who requested them.
                cache
                    .set(&key, TileCacheEntry::new(fetched.buffer.clone(), expires))
                    .await;
                buffer = Some(fetched.buffer);
            }
            Err(e) => {
                // Failures are not confirmed "no tile" answers and are
                // never cached.
                warn!(key = %key, url = %url, error = %e, "Tile fetch failed");
                return LoadOutcome::Failed;
            }
        }
    }

    let Some(buffer) = buffer else {
        return LoadOutcome::Failed;
    };

    let satisfied = if from_cache {
        LoadOutcome::CacheHit
    } else {
        LoadOutcome::Fetched
    };

    if buffer.is_empty() {
        // Cached or confirmed negative result: the slot stays empty and
        // that is not an error.
        return satisfied;
    }

    let decoded = tokio::task::spawn_blocking(move || decoder.decode(&buffer)).await;
    match decoded {
        Ok(Ok(image)) => {
            if tile.is_cancelled() {
                // A newer generation owns this tile id now; the decoded
                // image must not reach the replaced slot.
                return LoadOutcome::Cancelled;
            }
            tile.set_image(Arc::new(image));
            satisfied
        }
        Ok(Err(e)) => {
            // The cache entry is kept: the bytes may be fine and the
            // decoder the transient problem.
            warn!(key = %key, error = %e, "Tile decode failed");
            LoadOutcome::Failed
        }
        Err(e) => {
            warn!(key = %key, error = %e, "Tile decode task aborted");
            LoadOutcome::Failed
        }
    }
}
