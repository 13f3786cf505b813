//! Geometry engine
//!
//! Containment, area and distance functions used by click hit-testing and by
//! the measurement tools. Every function is pure and total: degenerate input
//! (empty rings, zero-length segments, horizontal edges) yields a best-effort
//! value instead of an error.
//!
//! Coordinates follow the GeoJSON convention of `[lng, lat]` on input and are
//! held as [`LatLng`] afterwards.

mod measure;
mod polygon;
mod projection;
mod types;

pub use measure::{
    format_area, format_distance, geodesic_area, haversine_distance, path_length,
    AREA_EARTH_RADIUS_M, DISTANCE_EARTH_RADIUS_M,
};
pub use polygon::{point_in_polygon, point_in_ring, polygon_area, ring_area};
pub use projection::{distance_point_to_segment, project, within_pixel_margin, MAX_LAT, TILE_SIZE};
pub use types::{BoundingBox, LatLng, Point, Polygon, Ring, Shape};

pub(crate) use types::decode_ring;

#[cfg(test)]
mod tests;
