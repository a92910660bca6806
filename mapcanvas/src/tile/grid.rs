//! Enumeration of the tiles visible in a viewport.

use crate::coord::Rect;

use super::{TileId, TileMatrix};

/// Enumerates the tiles of `matrix` intersecting the visible tile-matrix
/// pixel rectangle, expanded by `overscan` tiles on every side to mask
/// pop-in while panning.
///
/// Columns wrap modulo `2^zoom` — the map is cylindrical in longitude — and
/// rows are clamped to the matrix. The iterator is lazy and finite; a new
/// one is generated per viewport change and stale iterators are abandoned,
/// never resumed.
pub fn visible_tiles(matrix: &TileMatrix, bounds: Rect, overscan: u32) -> TileGridIterator {
    let tile_size = matrix.tile_size as f64;
    let count = matrix.tile_count() as i64;
    let overscan = overscan as i64;

    let mut col_start = (bounds.x / tile_size).floor() as i64 - overscan;
    let mut col_end = (bounds.right() / tile_size).floor() as i64 + overscan;

    // A view wider than the world collapses to exactly one wrap.
    if col_end - col_start + 1 > count {
        col_start = 0;
        col_end = count - 1;
    }

    // Rows are clamped, not wrapped; the resulting range may be empty when
    // the view sits entirely above or below the map.
    let row_start = ((bounds.y / tile_size).floor() as i64 - overscan).max(0);
    let row_end = ((bounds.bottom() / tile_size).floor() as i64 + overscan).min(count - 1);

    TileGridIterator {
        matrix: *matrix,
        col_start,
        col_end,
        row_end,
        col: col_start,
        row: row_start,
    }
}

/// Lazy iterator over the visible tile grid, in row-major order.
#[derive(Debug, Clone)]
pub struct TileGridIterator {
    matrix: TileMatrix,
    col_start: i64,
    col_end: i64,
    row_end: i64,
    col: i64,
    row: i64,
}

impl Iterator for TileGridIterator {
    type Item = TileId;

    fn next(&mut self) -> Option<TileId> {
        if self.row > self.row_end || self.col_start > self.col_end {
            return None;
        }

        let count = self.matrix.tile_count() as i64;
        let column = self.col.rem_euclid(count) as u32;
        let id = TileId::new(self.matrix.zoom, column, self.row as u32);

        self.col += 1;
        if self.col > self.col_end {
            self.col = self.col_start;
            self.row += 1;
        }

        Some(id)
    }
}
