//! MapCanvas - slippy-map tile engine
//!
//! This library provides the headless core of a slippy map: the coordinate
//! transform engine that decides which tiles a viewport needs and where
//! each tile's bitmap lands in view space, and the acquisition pipeline
//! that turns tile coordinates into image bytes through a two-level
//! (memory + disk) cache with per-tile expiration and a bounded number of
//! concurrent network fetches.
//!
//! Rendering, input handling and widget integration are deliberately out of
//! scope; embedders own the viewport state, rebuild the [`coord::ViewTransform`]
//! on every pan/zoom/rotate, and read decoded images back off the
//! [`tile::Tile`] slots.
//!
//! # Pipeline overview
//!
//! ```ignore
//! use std::sync::Arc;
//! use mapcanvas::cache::TileCache;
//! use mapcanvas::config::LayerConfig;
//! use mapcanvas::coord::ViewTransform;
//! use mapcanvas::decode::ImageDecoder;
//! use mapcanvas::fetch::HttpTileFetcher;
//! use mapcanvas::loader::TileLoader;
//! use mapcanvas::source::UrlTemplate;
//! use mapcanvas::tile::{visible_tiles, TileMatrix};
//!
//! let config = LayerConfig::default();
//! config.validate()?;
//!
//! let cache = Arc::new(TileCache::new(config.cache_dir.clone(), config.max_memory_bytes)?);
//! let fetcher = Arc::new(HttpTileFetcher::new(config.fetch_timeout)?);
//! let loader = TileLoader::new(cache, fetcher, Arc::new(ImageDecoder), &config);
//!
//! let source = UrlTemplate::new("osm", "https://tile.example.org/{z}/{x}/{y}.png")?;
//!
//! // Per viewport change:
//! let matrix = TileMatrix::for_zoom(12);
//! let bounds = view_transform.tile_matrix_bounds(matrix.scale, matrix.top_left, (1024.0, 768.0));
//! let generation = loader.begin_generation();
//! let tiles: Vec<_> = visible_tiles(&matrix, bounds, config.overscan_tiles)
//!     .map(|id| generation.tile(id))
//!     .collect();
//! loader.load(&source, &tiles).await;
//! ```

pub mod cache;
pub mod config;
pub mod coord;
pub mod decode;
pub mod fetch;
pub mod loader;
pub mod source;
pub mod tile;

pub use cache::{TileCache, TileCacheEntry};
pub use config::LayerConfig;
pub use coord::ViewTransform;
pub use loader::{LoadGeneration, LoadOutcome, TileLoader};
pub use source::{TileSource, UrlTemplate};
pub use tile::{Tile, TileId, TileMatrix};
