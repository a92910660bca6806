//! Integration tests for the tile loading pipeline.
//!
//! These tests verify the complete loader workflow including:
//! - The bound on simultaneous in-flight fetches
//! - Warm-cache replays of an identical viewport
//! - Generation cancellation mid-fetch
//! - Containment of per-tile failures within a batch

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;

use mapcanvas::cache::TileCache;
use mapcanvas::config::LayerConfig;
use mapcanvas::decode::{DecodeError, TileDecoder, TileImage};
use mapcanvas::fetch::{BoxFuture, FetchError, FetchedTile, TileFetcher};
use mapcanvas::loader::{LoadOutcome, TileLoader};
use mapcanvas::source::UrlTemplate;
use mapcanvas::tile::TileId;

// =============================================================================
// Test Helpers
// =============================================================================

/// Decoder producing a fixed 1x1 image, independent of payload format.
struct StubDecoder;

impl TileDecoder for StubDecoder {
    fn decode(&self, bytes: &[u8]) -> Result<TileImage, DecodeError> {
        if bytes.is_empty() {
            return Err(DecodeError("empty payload".to_string()));
        }
        Ok(TileImage {
            width: 1,
            height: 1,
            pixels: vec![bytes[0], 0, 0, 255],
        })
    }
}

/// Fetcher that tracks how many requests are in flight simultaneously.
struct GaugeFetcher {
    in_flight: Arc<AtomicUsize>,
    max_in_flight: Arc<AtomicUsize>,
    total: Arc<AtomicUsize>,
    delay: Duration,
}

impl GaugeFetcher {
    fn new(delay: Duration) -> Self {
        Self {
            in_flight: Arc::new(AtomicUsize::new(0)),
            max_in_flight: Arc::new(AtomicUsize::new(0)),
            total: Arc::new(AtomicUsize::new(0)),
            delay,
        }
    }
}

impl TileFetcher for GaugeFetcher {
    fn fetch<'a>(&'a self, _url: &'a str) -> BoxFuture<'a, Result<FetchedTile, FetchError>> {
        let in_flight = self.in_flight.clone();
        let max_in_flight = self.max_in_flight.clone();
        let total = self.total.clone();
        let delay = self.delay;

        Box::pin(async move {
            let current = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            max_in_flight.fetch_max(current, Ordering::SeqCst);
            total.fetch_add(1, Ordering::SeqCst);

            tokio::time::sleep(delay).await;

            in_flight.fetch_sub(1, Ordering::SeqCst);
            Ok(FetchedTile {
                buffer: vec![7; 16],
                max_age: None,
            })
        })
    }
}

/// Fetcher that fails for one specific tile URL and succeeds for the rest.
struct PartialFailureFetcher {
    failing_fragment: String,
}

impl TileFetcher for PartialFailureFetcher {
    fn fetch<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<FetchedTile, FetchError>> {
        let fail = url.contains(&self.failing_fragment);
        Box::pin(async move {
            if fail {
                Err(FetchError::Status {
                    status: 503,
                    url: "unavailable".to_string(),
                })
            } else {
                Ok(FetchedTile {
                    buffer: vec![1, 2, 3],
                    max_age: None,
                })
            }
        })
    }
}

fn make_loader(
    fetcher: Arc<dyn TileFetcher>,
    max_concurrent: usize,
) -> (TempDir, TileLoader) {
    let dir = TempDir::new().unwrap();
    let config = LayerConfig::default().with_max_concurrent_fetches(max_concurrent);
    let cache = Arc::new(TileCache::new(dir.path().to_path_buf(), 16 * 1024 * 1024).unwrap());
    let loader = TileLoader::new(cache, fetcher, Arc::new(StubDecoder), &config);
    (dir, loader)
}

fn source() -> UrlTemplate {
    UrlTemplate::new("test", "https://tiles.example.org/{z}/{x}/{y}.png").unwrap()
}

fn block(zoom: u8, start: u32, size: u32) -> Vec<TileId> {
    let mut ids = Vec::new();
    for column in start..start + size {
        for row in start..start + size {
            ids.push(TileId::new(zoom, column, row));
        }
    }
    ids
}

// =============================================================================
// Tests
// =============================================================================

#[tokio::test]
async fn test_fetches_never_exceed_concurrency_bound() {
    let fetcher = Arc::new(GaugeFetcher::new(Duration::from_millis(20)));
    let max_seen = fetcher.max_in_flight.clone();
    let (_dir, loader) = make_loader(fetcher, 3);

    // 16 tiles, bound of 3.
    let generation = loader.begin_generation();
    let tiles: Vec<_> = block(6, 8, 4).into_iter().map(|id| generation.tile(id)).collect();
    let outcomes = loader.load(&source(), &tiles).await;

    assert_eq!(outcomes.len(), 16);
    assert!(outcomes.iter().all(|(_, o)| *o == LoadOutcome::Fetched));
    assert!(
        max_seen.load(Ordering::SeqCst) <= 3,
        "Observed {} simultaneous fetches, bound is 3",
        max_seen.load(Ordering::SeqCst)
    );
}

#[tokio::test]
async fn test_identical_viewport_replays_from_cache() {
    let fetcher = Arc::new(GaugeFetcher::new(Duration::from_millis(1)));
    let total = fetcher.total.clone();
    let (_dir, loader) = make_loader(fetcher, 4);
    let source = source();

    // First load of a 2x2 block at zoom 5: four fetches, four cache writes.
    let generation = loader.begin_generation();
    let tiles: Vec<_> = block(5, 10, 2).into_iter().map(|id| generation.tile(id)).collect();
    let outcomes = loader.load(&source, &tiles).await;
    assert!(outcomes.iter().all(|(_, o)| *o == LoadOutcome::Fetched));
    assert_eq!(total.load(Ordering::SeqCst), 4);

    // Second load of the identical viewport within the expiration window:
    // zero fetches, four cache hits, slots still populated.
    let generation = loader.begin_generation();
    let tiles: Vec<_> = block(5, 10, 2).into_iter().map(|id| generation.tile(id)).collect();
    let outcomes = loader.load(&source, &tiles).await;

    assert!(outcomes.iter().all(|(_, o)| *o == LoadOutcome::CacheHit));
    assert_eq!(total.load(Ordering::SeqCst), 4);
    assert!(tiles.iter().all(|t| t.image().is_some()));
}

#[tokio::test]
async fn test_cache_survives_memory_drop_between_loads() {
    let fetcher = Arc::new(GaugeFetcher::new(Duration::from_millis(1)));
    let total = fetcher.total.clone();
    let dir = TempDir::new().unwrap();
    let config = LayerConfig::default();
    let cache = Arc::new(TileCache::new(dir.path().to_path_buf(), 16 * 1024 * 1024).unwrap());
    let loader = TileLoader::new(cache.clone(), fetcher, Arc::new(StubDecoder), &config);
    let source = source();

    let generation = loader.begin_generation();
    let tile = generation.tile(TileId::new(7, 40, 41));
    loader.load(&source, &[tile]).await;
    assert_eq!(total.load(Ordering::SeqCst), 1);

    // Simulated restart: volatile layer gone, durable layer answers.
    cache.clear_memory();

    let generation = loader.begin_generation();
    let tile = generation.tile(TileId::new(7, 40, 41));
    let outcomes = loader.load(&source, &[tile.clone()]).await;

    assert_eq!(outcomes[0].1, LoadOutcome::CacheHit);
    assert_eq!(total.load(Ordering::SeqCst), 1);
    assert!(tile.image().is_some());
}

#[tokio::test]
async fn test_superseded_generation_discards_results() {
    let fetcher = Arc::new(GaugeFetcher::new(Duration::from_millis(50)));
    let (_dir, loader) = make_loader(fetcher, 2);
    let loader = Arc::new(loader);
    let source_a = source();

    let generation = loader.begin_generation();
    let old_tile = generation.tile(TileId::new(5, 10, 10));
    let load_handle = {
        let loader = loader.clone();
        let src = source_a.clone();
        let tile = old_tile.clone();
        tokio::spawn(async move { loader.load(&src, &[tile]).await })
    };

    // Give the fetch a moment to get in flight, then supersede it.
    tokio::time::sleep(Duration::from_millis(10)).await;
    let next = loader.begin_generation();
    let new_tile = next.tile(TileId::new(5, 10, 10));

    let outcomes = load_handle.await.unwrap();
    assert_eq!(outcomes[0].1, LoadOutcome::Cancelled);
    assert!(old_tile.image().is_none(), "Stale result reached the old slot");
    assert!(new_tile.image().is_none());

    // The cancelled fetch still committed its cache write, so the new
    // generation resolves without the network.
    let outcomes = loader.load(&source_a, &[new_tile.clone()]).await;
    assert_eq!(outcomes[0].1, LoadOutcome::CacheHit);
    assert!(new_tile.image().is_some());
}

#[tokio::test]
async fn test_one_failing_tile_does_not_abort_siblings() {
    let fetcher = Arc::new(PartialFailureFetcher {
        failing_fragment: "/10/11.".to_string(),
    });
    let (_dir, loader) = make_loader(fetcher, 4);

    let generation = loader.begin_generation();
    let tiles: Vec<_> = block(5, 10, 2).into_iter().map(|id| generation.tile(id)).collect();
    let outcomes = loader.load(&source(), &tiles).await;

    let failed: Vec<_> = outcomes
        .iter()
        .filter(|(_, o)| *o == LoadOutcome::Failed)
        .collect();
    let fetched: Vec<_> = outcomes
        .iter()
        .filter(|(_, o)| *o == LoadOutcome::Fetched)
        .collect();

    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].0, TileId::new(5, 10, 11));
    assert_eq!(fetched.len(), 3);
}
