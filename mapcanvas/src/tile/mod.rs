//! Tile identity and tile matrix model
//!
//! Identifies tiles in the Web Mercator tile pyramid, describes the tile
//! matrix for a zoom level, and enumerates the tiles visible in a viewport.

mod grid;
mod runtime;

pub use grid::{visible_tiles, TileGridIterator};
pub use runtime::Tile;

use crate::coord::{zoom_to_scale, MapPoint, METERS_PER_DEGREE, TILE_SIZE};

/// Maximum supported zoom level.
pub const MAX_ZOOM: u8 = 22;

/// Uniquely identifies a tile in the pyramid.
///
/// Equality and hashing are structural; two `TileId`s with the same zoom,
/// column and row are the same tile regardless of which viewport generation
/// produced them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TileId {
    /// Zoom level (0 = whole world in one tile).
    pub zoom: u8,
    /// Column, increasing eastward, wrapped modulo `2^zoom`.
    pub column: u32,
    /// Row, increasing southward, clamped to `[0, 2^zoom)`.
    pub row: u32,
}

impl TileId {
    pub fn new(zoom: u8, column: u32, row: u32) -> Self {
        Self { zoom, column, row }
    }
}

impl std::fmt::Display for TileId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}/{}", self.zoom, self.column, self.row)
    }
}

/// Describes the full tile grid at one zoom level.
///
/// Derived purely from the zoom level: the matrix covers the square Web
/// Mercator world, its top-left corner sits at `(-180°, +180°)` in projected
/// meters, and its scale doubles with each zoom increment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TileMatrix {
    /// Zoom level of this matrix.
    pub zoom: u8,
    /// Matrix scale in pixels per meter.
    pub scale: f64,
    /// Top-left origin of the matrix in projected map meters.
    pub top_left: MapPoint,
    /// Tile edge length in pixels.
    pub tile_size: u32,
}

impl TileMatrix {
    /// Builds the tile matrix descriptor for a zoom level.
    ///
    /// Zoom levels beyond [`MAX_ZOOM`] are clamped; `tile_count` must stay
    /// representable as a `u32`.
    pub fn for_zoom(zoom: u8) -> Self {
        let zoom = zoom.min(MAX_ZOOM);
        Self {
            zoom,
            scale: zoom_to_scale(zoom as f64),
            top_left: MapPoint::new(
                -180.0 * METERS_PER_DEGREE,
                180.0 * METERS_PER_DEGREE,
            ),
            tile_size: TILE_SIZE as u32,
        }
    }

    /// Number of tiles along each axis (`2^zoom`).
    pub fn tile_count(&self) -> u32 {
        1u32 << self.zoom
    }
}
