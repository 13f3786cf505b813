//! Planar containment and area in degree space.
//!
//! Areas here are in square degrees and only meaningful for comparing
//! shapes against each other; see [`super::geodesic_area`] for square metres.

use super::types::{LatLng, Ring, Shape};

/// Stand-in denominator for horizontal edges.
const EPSILON: f64 = 1e-16;

/// Even-odd crossing test of `p` against `ring`.
///
/// Points exactly on an edge may land on either side.
pub fn point_in_ring(p: LatLng, ring: &Ring) -> bool {
    let points = ring.points();
    let (x, y) = (p.lng, p.lat);
    let mut inside = false;

    let mut j = points.len().wrapping_sub(1);
    for (i, pi) in points.iter().enumerate() {
        let pj = points[j];
        let (xi, yi) = (pi.lng, pi.lat);
        let (xj, yj) = (pj.lng, pj.lat);

        let dy = yj - yi;
        let dy = if dy == 0.0 || dy.is_nan() { EPSILON } else { dy };
        if (yi > y) != (yj > y) && x < (xj - xi) * (y - yi) / dy + xi {
            inside = !inside;
        }
        j = i;
    }
    inside
}

/// Whether `p` is inside some polygon of `shape` and outside all of that
/// polygon's holes.
pub fn point_in_polygon(p: LatLng, shape: &Shape) -> bool {
    shape.parts().into_iter().any(|(outer, holes)| {
        point_in_ring(p, outer) && !holes.iter().any(|hole| point_in_ring(p, hole))
    })
}

/// Signed shoelace area of a ring.
pub fn ring_area(ring: &Ring) -> f64 {
    let points = ring.points();
    let mut area = 0.0;

    let mut j = points.len().wrapping_sub(1);
    for (i, pi) in points.iter().enumerate() {
        let pj = points[j];
        area += pj.lng * pi.lat - pi.lng * pj.lat;
        j = i;
    }
    area / 2.0
}

/// Sum over polygons of `|outer| - Σ|hole|`, each term clamped at zero.
pub fn polygon_area(shape: &Shape) -> f64 {
    shape
        .parts()
        .into_iter()
        .map(|(outer, holes)| {
            let area = ring_area(outer).abs() - holes.iter().map(|h| ring_area(h).abs()).sum::<f64>();
            area.max(0.0)
        })
        .sum()
}
