//! Layer configuration.
//!
//! One configuration surface covers the whole pipeline: cache location,
//! fetch concurrency, default expiration, overscan margin and network
//! timeout. Problems are surfaced once, at layer activation, by
//! [`LayerConfig::validate`] — never per tile.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Default bound on concurrent network fetches.
pub const DEFAULT_MAX_CONCURRENT_FETCHES: usize = 4;

/// Default tile expiration when the server sends no freshness hint.
pub const DEFAULT_EXPIRATION: Duration = Duration::from_secs(24 * 60 * 60);

/// Default overscan margin in tiles around the visible rectangle.
pub const DEFAULT_OVERSCAN_TILES: u32 = 1;

/// Default per-request network timeout.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Default memory-cache budget in bytes.
pub const DEFAULT_MEMORY_CACHE_BYTES: u64 = 256 * 1024 * 1024;

/// Configuration problems that are fatal at layer activation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("Configuration error: {0}")]
    Invalid(String),
}

/// Configuration for a tile layer.
#[derive(Debug, Clone)]
pub struct LayerConfig {
    /// Root directory of the durable tile cache.
    pub cache_dir: PathBuf,
    /// Memory-cache budget in bytes.
    pub max_memory_bytes: u64,
    /// Bound on simultaneous in-flight network fetches across all tiles.
    pub max_concurrent_fetches: usize,
    /// Expiration applied when a response carries no max-age hint.
    pub default_expiration: Duration,
    /// Extra tiles loaded beyond the visible rectangle on every side.
    pub overscan_tiles: u32,
    /// Per-request network timeout.
    pub fetch_timeout: Duration,
    /// Minimum usable zoom level.
    pub min_zoom: u8,
    /// Maximum usable zoom level.
    pub max_zoom: u8,
}

impl Default for LayerConfig {
    fn default() -> Self {
        Self {
            cache_dir: default_cache_dir(),
            max_memory_bytes: DEFAULT_MEMORY_CACHE_BYTES,
            max_concurrent_fetches: DEFAULT_MAX_CONCURRENT_FETCHES,
            default_expiration: DEFAULT_EXPIRATION,
            overscan_tiles: DEFAULT_OVERSCAN_TILES,
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
            min_zoom: 0,
            max_zoom: 19,
        }
    }
}

impl LayerConfig {
    /// Sets the durable cache root.
    pub fn with_cache_dir(mut self, dir: PathBuf) -> Self {
        self.cache_dir = dir;
        self
    }

    /// Sets the memory-cache budget.
    pub fn with_memory_budget(mut self, bytes: u64) -> Self {
        self.max_memory_bytes = bytes;
        self
    }

    /// Sets the concurrent fetch bound.
    pub fn with_max_concurrent_fetches(mut self, n: usize) -> Self {
        self.max_concurrent_fetches = n;
        self
    }

    /// Sets the default expiration duration.
    pub fn with_default_expiration(mut self, expiration: Duration) -> Self {
        self.default_expiration = expiration;
        self
    }

    /// Sets the overscan margin in tiles.
    pub fn with_overscan_tiles(mut self, tiles: u32) -> Self {
        self.overscan_tiles = tiles;
        self
    }

    /// Sets the network timeout.
    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    /// Checks the configuration for problems that would otherwise fail
    /// obscurely later.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_concurrent_fetches == 0 {
            return Err(ConfigError::Invalid(
                "max_concurrent_fetches must be at least 1".to_string(),
            ));
        }
        if self.min_zoom > self.max_zoom {
            return Err(ConfigError::Invalid(format!(
                "min_zoom {} exceeds max_zoom {}",
                self.min_zoom, self.max_zoom
            )));
        }
        if self.fetch_timeout.is_zero() {
            return Err(ConfigError::Invalid(
                "fetch_timeout must be non-zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Platform cache directory for tile storage, falling back to a relative
/// path when the platform reports none.
pub fn default_cache_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("mapcanvas")
        .join("tiles")
}
