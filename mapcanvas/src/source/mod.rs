//! Remote tile source resolution
//!
//! Turns a [`crate::tile::TileId`] into the URL to fetch, and optionally
//! discovers provider capabilities (URL template, subdomains, zoom range)
//! from provider metadata once at layer activation. The metadata document
//! parsing itself lives outside this crate; only the resolved result passes
//! this boundary.

mod discovery;
mod template;

pub use discovery::{ImageryMetadata, MetadataDiscovery};
pub use template::UrlTemplate;

use thiserror::Error;

use crate::tile::TileId;

/// Errors raised when resolving a tile source.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SourceError {
    /// The URL template is unusable (missing placeholders, empty).
    ///
    /// Fatal at layer activation; a validated source never fails per-tile.
    #[error("Invalid URL template: {0}")]
    Template(String),

    /// The source identifier is empty or not filesystem-safe.
    #[error("Invalid source id: {0}")]
    Id(String),
}

/// Resolves tiles of one imagery source to fetchable URLs.
pub trait TileSource: Send + Sync {
    /// Stable identifier used in cache keys; filesystem-safe.
    fn id(&self) -> &str;

    /// Builds the URL for one tile.
    fn url(&self, tile: &TileId) -> String;
}
