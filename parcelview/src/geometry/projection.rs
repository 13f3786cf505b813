//! Web Mercator pixel projection and screen-space distances.

use std::f64::consts::PI;

use super::types::{BoundingBox, LatLng, Point};

/// Latitude limit of the Web Mercator projection.
pub const MAX_LAT: f64 = 85.051_128_779_806_6;

/// Size of one tile edge in pixels.
pub const TILE_SIZE: f64 = 256.0;

/// Project a position to global pixel coordinates at `zoom`.
///
/// The world is `256 · 2^zoom` pixels wide; x grows eastwards and y
/// southwards. Latitudes beyond the projection limit are clamped.
pub fn project(p: LatLng, zoom: f64) -> Point {
    let scale = TILE_SIZE * 2.0_f64.powf(zoom);
    let lat_rad = p.lat.clamp(-MAX_LAT, MAX_LAT).to_radians();

    let x = (p.lng + 180.0) / 360.0 * scale;
    let y = (1.0 - lat_rad.tan().asinh() / PI) / 2.0 * scale;
    Point { x, y }
}

/// Distance from `p` to the segment `ab`, in the same units as the inputs.
///
/// The projection of `p` onto the line is clamped to the segment ends, so a
/// zero-length segment measures the distance to its single point.
pub fn distance_point_to_segment(p: Point, a: Point, b: Point) -> f64 {
    let (vx, vy) = (b.x - a.x, b.y - a.y);
    let (wx, wy) = (p.x - a.x, p.y - a.y);

    let c1 = vx * wx + vy * wy;
    if c1 <= 0.0 {
        return p.distance_to(a);
    }
    let c2 = vx * vx + vy * vy;
    if c2 <= c1 {
        return p.distance_to(b);
    }

    let t = c1 / c2;
    p.distance_to(Point::new(a.x + t * vx, a.y + t * vy))
}

/// Whether `p` lies within `bounds` grown by `tolerance_px` pixels at `zoom`.
pub fn within_pixel_margin(bounds: &BoundingBox, p: LatLng, zoom: f64, tolerance_px: f64) -> bool {
    // North-west corner has the smallest pixel coordinates
    let nw = project(LatLng::new(bounds.north, bounds.west), zoom);
    let se = project(LatLng::new(bounds.south, bounds.east), zoom);
    let q = project(p, zoom);

    q.x >= nw.x - tolerance_px
        && q.x <= se.x + tolerance_px
        && q.y >= nw.y - tolerance_px
        && q.y <= se.y + tolerance_px
}
