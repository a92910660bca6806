//! Transformation between projected map coordinates and view coordinates.

use super::matrix::Affine;
use super::types::{MapPoint, Rect, ViewPoint};

/// Defines the transformation between projected map coordinates in meters
/// and view coordinates in pixels.
///
/// The forward and inverse matrices are always mutual inverses; they are
/// rebuilt together by [`ViewTransform::set_transform`] and never updated
/// partially. The viewport controller owns the transform and rebuilds it on
/// every pan/zoom/rotate commit; everything else only reads it.
#[derive(Debug, Clone, Default)]
pub struct ViewTransform {
    scale: f64,
    rotation: f64,
    map_to_view: Affine,
    view_to_map: Affine,
}

impl ViewTransform {
    /// Scaling factor from projected map coordinates to view coordinates,
    /// as pixels per meter.
    pub fn scale(&self) -> f64 {
        self.scale
    }

    /// Rotation angle of the transform, normalized to `[0, 360)` degrees.
    pub fn rotation(&self) -> f64 {
        self.rotation
    }

    /// Transforms a point from projected map coordinates to view coordinates.
    pub fn map_to_view(&self, point: MapPoint) -> ViewPoint {
        let (x, y) = self.map_to_view.apply(point.x, point.y);
        ViewPoint::new(x, y)
    }

    /// Transforms a point from view coordinates to projected map coordinates.
    pub fn view_to_map(&self, point: ViewPoint) -> MapPoint {
        let (x, y) = self.view_to_map.apply(point.x, point.y);
        MapPoint::new(x, y)
    }

    /// Rebuilds both matrices for the given viewport state.
    ///
    /// The forward matrix scales (with a Y flip, view Y grows downwards)
    /// about `map_center`, rotates by the normalized rotation, and
    /// translates to `view_center`. The inverse matrix is derived from it in
    /// the same call.
    pub fn set_transform(
        &mut self,
        map_center: MapPoint,
        view_center: ViewPoint,
        scale: f64,
        rotation: f64,
    ) {
        self.scale = scale;
        self.rotation = ((rotation % 360.0) + 360.0) % 360.0;

        let transform = Affine {
            a: scale,
            b: 0.0,
            c: 0.0,
            d: -scale,
            tx: -scale * map_center.x,
            ty: scale * map_center.y,
        }
        .then_rotate(self.rotation)
        .then_translate(view_center.x, view_center.y);

        self.map_to_view = transform;
        // A scale/rotate/translate composition with non-zero scale is
        // always invertible.
        self.view_to_map = transform.invert().unwrap_or(Affine::IDENTITY);
    }

    /// Transform from a tile matrix's local pixel space directly to view
    /// pixels.
    ///
    /// `tile_matrix_origin` is the pixel offset of the rendered tile block
    /// within the full tile matrix.
    pub fn tile_layer_transform(
        &self,
        tile_matrix_scale: f64,
        tile_matrix_top_left: MapPoint,
        tile_matrix_origin: ViewPoint,
    ) -> Affine {
        let transform_scale = self.scale / tile_matrix_scale;

        // Tile matrix origin in map coordinates.
        let map_origin = MapPoint::new(
            tile_matrix_top_left.x + tile_matrix_origin.x / tile_matrix_scale,
            tile_matrix_top_left.y - tile_matrix_origin.y / tile_matrix_scale,
        );

        // Tile matrix origin in view coordinates.
        let view_origin = self.map_to_view(map_origin);

        Affine::scale(transform_scale)
            .then_rotate(self.rotation)
            .then_translate(view_origin.x, view_origin.y)
    }

    /// The tile-matrix pixel rectangle visible in a view of `view_size`
    /// pixels — the inverse problem of [`ViewTransform::tile_layer_transform`].
    pub fn tile_matrix_bounds(
        &self,
        tile_matrix_scale: f64,
        tile_matrix_top_left: MapPoint,
        view_size: (f64, f64),
    ) -> Rect {
        let transform_scale = tile_matrix_scale / self.scale;

        // View origin in map coordinates, then translated to the tile
        // matrix origin in pixels.
        let origin = self.view_to_map(ViewPoint::default());

        let transform = Affine::scale(transform_scale)
            .then_rotate(-self.rotation)
            .then_translate(
                tile_matrix_scale * (origin.x - tile_matrix_top_left.x),
                tile_matrix_scale * (tile_matrix_top_left.y - origin.y),
            );

        transform.apply_bounds(Rect::new(0.0, 0.0, view_size.0, view_size.1))
    }
}
