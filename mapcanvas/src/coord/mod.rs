//! Coordinate conversion module
//!
//! Provides conversions between geographic coordinates (latitude/longitude),
//! projected Web Mercator map coordinates in meters, and view coordinates in
//! pixels, plus the zoom level / scale relationship used by tile matrices.

mod matrix;
mod types;
mod view;

pub use matrix::Affine;
pub use types::{CoordError, Location, MapPoint, Rect, ViewPoint, MAX_LAT, MIN_LAT, MIN_LON};
pub use view::ViewTransform;

use std::f64::consts::PI;

/// Tile edge length in pixels.
pub const TILE_SIZE: f64 = 256.0;

/// Meters per degree of longitude on the WGS84 equator.
pub const METERS_PER_DEGREE: f64 = 111_319.490_793_273_58;

/// Largest projected Y magnitude, the top/bottom edge of the square
/// Web Mercator world (the projection of [`MAX_LAT`]).
///
/// The cylindrical projection diverges towards the poles; callers of
/// [`location_to_map`] receive a Y clamped to this map edge instead, so
/// out-of-range latitudes never push coordinates past the tile matrix.
pub const MAX_PROJECTED_Y: f64 = 180.0 * METERS_PER_DEGREE;

/// Converts a zoom level to the map scale in pixels per meter.
///
/// At zoom `z` the full world (360° of longitude) spans `256 * 2^z` pixels.
#[inline]
pub fn zoom_to_scale(zoom: f64) -> f64 {
    TILE_SIZE * 2.0_f64.powf(zoom) / (360.0 * METERS_PER_DEGREE)
}

/// Converts a map scale in pixels per meter back to a zoom level.
///
/// Exact inverse of [`zoom_to_scale`] via `log2`.
#[inline]
pub fn scale_to_zoom(scale: f64) -> f64 {
    (scale * 360.0 * METERS_PER_DEGREE / TILE_SIZE).log2()
}

/// Projects a geographic location to Web Mercator map coordinates in meters.
///
/// The Y coordinate diverges towards the poles and is clamped to
/// [`MAX_PROJECTED_Y`], the edge of the square map.
#[inline]
pub fn location_to_map(location: Location) -> MapPoint {
    let x = METERS_PER_DEGREE * location.longitude;
    let lat_rad = location.latitude * PI / 180.0;
    let y = METERS_PER_DEGREE * 180.0 / PI * lat_rad.tan().asinh();

    MapPoint {
        x,
        y: y.clamp(-MAX_PROJECTED_Y, MAX_PROJECTED_Y),
    }
}

/// Inverse projection from Web Mercator map coordinates to a geographic
/// location.
#[inline]
pub fn map_to_location(point: MapPoint) -> Location {
    let longitude = point.x / METERS_PER_DEGREE;
    let y_rad = point.y * PI / (180.0 * METERS_PER_DEGREE);
    let latitude = y_rad.sinh().atan() * 180.0 / PI;

    Location {
        latitude,
        longitude,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f64 = 1e-9;

    #[test]
    fn test_zoom_zero_scale() {
        // At zoom 0 the world is one 256px tile wide.
        let scale = zoom_to_scale(0.0);
        let world_pixels = scale * 360.0 * METERS_PER_DEGREE;
        assert!((world_pixels - 256.0).abs() < EPSILON);
    }

    #[test]
    fn test_each_zoom_level_doubles_scale() {
        for zoom in 0..20 {
            let s0 = zoom_to_scale(zoom as f64);
            let s1 = zoom_to_scale((zoom + 1) as f64);
            assert!(
                (s1 / s0 - 2.0).abs() < EPSILON,
                "Zoom {} -> {} should double the scale",
                zoom,
                zoom + 1
            );
        }
    }

    #[test]
    fn test_scale_zoom_roundtrip() {
        for zoom in [0.0, 1.0, 5.5, 10.0, 18.25, 22.0] {
            let back = scale_to_zoom(zoom_to_scale(zoom));
            assert!(
                (back - zoom).abs() < EPSILON,
                "Zoom {} round-tripped to {}",
                zoom,
                back
            );
        }
    }

    #[test]
    fn test_equator_projects_to_origin_y() {
        let p = location_to_map(Location::new(0.0, 0.0));
        assert!(p.x.abs() < EPSILON);
        assert!(p.y.abs() < EPSILON);
    }

    #[test]
    fn test_longitude_is_linear() {
        let p = location_to_map(Location::new(0.0, 90.0));
        assert!((p.x - 90.0 * METERS_PER_DEGREE).abs() < EPSILON);
    }

    #[test]
    fn test_poles_clamp_to_map_edge() {
        let north = location_to_map(Location::new(90.0, 0.0));
        let south = location_to_map(Location::new(-90.0, 0.0));
        assert_eq!(north.y, MAX_PROJECTED_Y);
        assert_eq!(south.y, -MAX_PROJECTED_Y);
        assert!(north.y.is_finite() && south.y.is_finite());
    }

    #[test]
    fn test_max_latitude_projects_to_map_edge() {
        // The square world: MAX_LAT projects to the same Y as 180° of
        // longitude spans in X.
        let p = location_to_map(Location::new(MAX_LAT, 0.0));
        assert!((p.y - MAX_PROJECTED_Y).abs() < 1.0);
    }

    #[test]
    fn test_location_roundtrip() {
        let original = Location::new(40.7128, -74.0060);
        let back = map_to_location(location_to_map(original));
        assert!((back.latitude - original.latitude).abs() < 1e-9);
        assert!((back.longitude - original.longitude).abs() < 1e-9);
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn test_scale_zoom_roundtrip_property(zoom in 0.0..24.0_f64) {
                let back = scale_to_zoom(zoom_to_scale(zoom));
                prop_assert!(
                    (back - zoom).abs() < 1e-9,
                    "Zoom {} round-tripped to {}",
                    zoom, back
                );
            }

            #[test]
            fn test_projection_roundtrip_property(
                lat in -85.05..85.05_f64,
                lon in -180.0..180.0_f64
            ) {
                let original = Location::new(lat, lon);
                let back = map_to_location(location_to_map(original));
                prop_assert!((back.latitude - lat).abs() < 1e-9);
                prop_assert!((back.longitude - lon).abs() < 1e-9);
            }

            #[test]
            fn test_projected_y_monotonic(
                lat1 in -80.0..0.0_f64,
                lat2 in 0.0..80.0_f64
            ) {
                let p1 = location_to_map(Location::new(lat1, 0.0));
                let p2 = location_to_map(Location::new(lat2, 0.0));
                prop_assert!(p1.y < p2.y);
            }

            #[test]
            fn test_projected_y_always_finite(lat in -90.0..=90.0_f64) {
                let p = location_to_map(Location::new(lat, 0.0));
                prop_assert!(p.y.is_finite());
            }
        }
    }
}
