//! Real-world measurements on the sphere.

use super::types::LatLng;

/// Earth radius used for area, WGS84 semi-major axis in metres.
pub const AREA_EARTH_RADIUS_M: f64 = 6_378_137.0;

/// Mean Earth radius used for distances, in metres.
pub const DISTANCE_EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Approximate area of a closed polygon on the sphere, in square metres.
///
/// Uses the spherical excess approximation
/// `|Σ Δλ · (2 + sin φ1 + sin φ2)| · R² / 2` over consecutive vertices
/// (wrapping around). Fewer than three vertices yields 0.
pub fn geodesic_area(vertices: &[LatLng]) -> f64 {
    if vertices.len() < 3 {
        return 0.0;
    }

    let mut area = 0.0;
    for (i, p1) in vertices.iter().enumerate() {
        let p2 = vertices[(i + 1) % vertices.len()];
        area += (p2.lng - p1.lng).to_radians()
            * (2.0 + p1.lat.to_radians().sin() + p2.lat.to_radians().sin());
    }
    (area * AREA_EARTH_RADIUS_M * AREA_EARTH_RADIUS_M / 2.0).abs()
}

/// Great-circle distance between two positions, in metres.
pub fn haversine_distance(a: LatLng, b: LatLng) -> f64 {
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();
    let sin_dlat = ((b.lat - a.lat).to_radians() / 2.0).sin();
    let sin_dlng = ((b.lng - a.lng).to_radians() / 2.0).sin();

    let h = sin_dlat * sin_dlat + lat1.cos() * lat2.cos() * sin_dlng * sin_dlng;
    2.0 * DISTANCE_EARTH_RADIUS_M * h.sqrt().min(1.0).asin()
}

/// Total length of an open path, in metres.
pub fn path_length(points: &[LatLng]) -> f64 {
    points
        .windows(2)
        .map(|pair| haversine_distance(pair[0], pair[1]))
        .sum()
}

/// Human-readable distance: metres below 1 km, kilometres above.
///
/// # Example
///
/// ```
/// use parcelview::geometry::format_distance;
///
/// assert_eq!(format_distance(12.345), "12.35 m");
/// assert_eq!(format_distance(1500.0), "1.50 km");
/// ```
pub fn format_distance(meters: f64) -> String {
    if meters < 1000.0 {
        format!("{:.2} m", meters)
    } else {
        format!("{:.2} km", meters / 1000.0)
    }
}

/// Human-readable area: m² below one hectare, hectares below 1 km², km² above.
pub fn format_area(square_meters: f64) -> String {
    if square_meters < 10_000.0 {
        format!("{:.2} m²", square_meters)
    } else if square_meters < 1_000_000.0 {
        format!("{:.2} ha", square_meters / 10_000.0)
    } else {
        format!("{:.4} km²", square_meters / 1_000_000.0)
    }
}
