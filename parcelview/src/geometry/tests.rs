use super::*;
use serde_json::json;

/// Ring from `(lng, lat)` pairs.
fn ring(coords: &[(f64, f64)]) -> Ring {
    Ring::new(coords.iter().map(|&(lng, lat)| LatLng::new(lat, lng)).collect())
}

fn square() -> Ring {
    ring(&[(0.0, 0.0), (0.0, 10.0), (10.0, 10.0), (10.0, 0.0)])
}

fn hole() -> Ring {
    ring(&[(2.0, 2.0), (2.0, 8.0), (8.0, 8.0), (8.0, 2.0)])
}

fn at(lng: f64, lat: f64) -> LatLng {
    LatLng::new(lat, lng)
}

// =========================================================================
// Containment
// =========================================================================

#[test]
fn test_point_in_square_ring() {
    assert!(point_in_ring(at(5.0, 5.0), &square()));
    assert!(!point_in_ring(at(15.0, 15.0), &square()));
    assert!(!point_in_ring(at(-1.0, 5.0), &square()));
}

#[test]
fn test_point_in_polygon_with_hole() {
    let plain = Shape::Polygon(Polygon::new(square(), vec![]));
    let holed = Shape::Polygon(Polygon::new(square(), vec![hole()]));

    assert!(point_in_polygon(at(5.0, 5.0), &plain));
    assert!(!point_in_polygon(at(5.0, 5.0), &holed));
    // Between hole and outer edge
    assert!(point_in_polygon(at(1.0, 1.0), &holed));
    assert!(!point_in_polygon(at(15.0, 15.0), &holed));
}

#[test]
fn test_point_in_multipolygon() {
    let far = ring(&[(20.0, 20.0), (20.0, 30.0), (30.0, 30.0), (30.0, 20.0)]);
    let shape = Shape::MultiPolygon(vec![
        Polygon::new(square(), vec![hole()]),
        Polygon::new(far, vec![]),
    ]);

    assert!(point_in_polygon(at(25.0, 25.0), &shape));
    assert!(point_in_polygon(at(1.0, 1.0), &shape));
    assert!(!point_in_polygon(at(5.0, 5.0), &shape));
    assert!(!point_in_polygon(at(15.0, 15.0), &shape));
}

#[test]
fn test_degenerate_rings_never_contain() {
    assert!(!point_in_ring(at(0.0, 0.0), &Ring::default()));
    assert!(!point_in_ring(at(0.0, 0.0), &ring(&[(0.0, 0.0)])));
    // Flat ring made only of horizontal edges
    let flat = ring(&[(0.0, 1.0), (5.0, 1.0), (10.0, 1.0)]);
    assert!(!point_in_ring(at(5.0, 1.0), &flat));
}

#[test]
fn test_closing_point_does_not_change_result() {
    let closed = ring(&[(0.0, 0.0), (0.0, 10.0), (10.0, 10.0), (10.0, 0.0), (0.0, 0.0)]);
    assert!(point_in_ring(at(5.0, 5.0), &closed));
    assert!(!point_in_ring(at(15.0, 5.0), &closed));
}

// =========================================================================
// Planar area
// =========================================================================

#[test]
fn test_ring_area_is_signed() {
    let clockwise = square();
    let mut counter: Vec<LatLng> = clockwise.points().to_vec();
    counter.reverse();

    assert_eq!(ring_area(&clockwise).abs(), 100.0);
    assert_eq!(ring_area(&clockwise), -ring_area(&Ring::new(counter)));
}

#[test]
fn test_polygon_area_subtracts_holes() {
    let shape = Shape::Polygon(Polygon::new(square(), vec![hole()]));
    assert_eq!(polygon_area(&shape), 64.0);
}

#[test]
fn test_polygon_area_clamps_at_zero() {
    // Hole larger than its outer ring
    let shape = Shape::Polygon(Polygon::new(hole(), vec![square()]));
    assert_eq!(polygon_area(&shape), 0.0);
}

#[test]
fn test_multipolygon_area_sums_parts() {
    let shape = Shape::MultiPolygon(vec![
        Polygon::new(square(), vec![]),
        Polygon::new(hole(), vec![]),
    ]);
    assert_eq!(polygon_area(&shape), 136.0);
}

// =========================================================================
// Normalisation
// =========================================================================

#[test]
fn test_shape_from_coordinates_by_depth() {
    let ring_coords = json!([[0, 0], [0, 10], [10, 10], [10, 0]]);
    let polygon_coords = json!([[[0, 0], [0, 10], [10, 10], [10, 0]], [[2, 2], [2, 8], [8, 8], [8, 2]]]);
    let multi_coords = json!([[[[0, 0], [0, 1], [1, 1]]], [[[5, 5], [5, 6], [6, 6]]]]);

    assert!(matches!(Shape::from_coordinates(&ring_coords), Some(Shape::Ring(_))));

    match Shape::from_coordinates(&polygon_coords) {
        Some(Shape::Polygon(polygon)) => {
            assert_eq!(polygon.outer.len(), 4);
            assert_eq!(polygon.holes.len(), 1);
        }
        other => panic!("expected polygon, got {other:?}"),
    }

    match Shape::from_coordinates(&multi_coords) {
        Some(Shape::MultiPolygon(polygons)) => assert_eq!(polygons.len(), 2),
        other => panic!("expected multipolygon, got {other:?}"),
    }
}

#[test]
fn test_shape_from_coordinates_reads_lng_lat_order() {
    let shape = Shape::from_coordinates(&json!([[-77.0, -12.0], [-77.0, -11.0], [-76.0, -11.0]])).unwrap();
    let bounds = shape.bounds().unwrap();
    assert_eq!(bounds.west, -77.0);
    assert_eq!(bounds.east, -76.0);
    assert_eq!(bounds.south, -12.0);
    assert_eq!(bounds.north, -11.0);
}

#[test]
fn test_shape_from_malformed_coordinates() {
    assert!(Shape::from_coordinates(&json!([])).is_none());
    assert!(Shape::from_coordinates(&json!("nope")).is_none());
    assert!(Shape::from_coordinates(&json!([1.0, 2.0])).is_none());
    assert!(Shape::from_coordinates(&json!([[[[[0, 0]]]]])).is_none());
}

// =========================================================================
// Bounds
// =========================================================================

#[test]
fn test_bounding_box_skips_non_finite() {
    let bounds = BoundingBox::from_points(vec![
        LatLng::new(1.0, 2.0),
        LatLng::new(f64::NAN, 100.0),
        LatLng::new(-1.0, 4.0),
    ])
    .unwrap();

    assert_eq!(bounds.south, -1.0);
    assert_eq!(bounds.north, 1.0);
    assert_eq!(bounds.west, 2.0);
    assert_eq!(bounds.east, 4.0);
    assert!(BoundingBox::from_points(Vec::new()).is_none());
}

#[test]
fn test_bounding_box_contains_is_inclusive() {
    let bounds = square().points().iter().copied().collect::<Vec<_>>();
    let bounds = BoundingBox::from_points(bounds).unwrap();

    assert!(bounds.contains(at(0.0, 0.0)));
    assert!(bounds.contains(at(10.0, 10.0)));
    assert!(!bounds.contains(at(10.1, 5.0)));
}

// =========================================================================
// Measurement
// =========================================================================

#[test]
fn test_geodesic_area_of_small_equatorial_square() {
    // 100 m on a side at the equator, in degrees for R = 6378137
    let side = 100.0 / (AREA_EARTH_RADIUS_M.to_radians());
    let vertices = [
        LatLng::new(0.0, 0.0),
        LatLng::new(0.0, side),
        LatLng::new(side, side),
        LatLng::new(side, 0.0),
    ];

    let area = geodesic_area(&vertices);
    assert!(
        (area - 10_000.0).abs() < 10.0,
        "expected ~10000 m², got {area}"
    );
}

#[test]
fn test_geodesic_area_needs_three_vertices() {
    assert_eq!(geodesic_area(&[]), 0.0);
    assert_eq!(
        geodesic_area(&[LatLng::new(0.0, 0.0), LatLng::new(1.0, 1.0)]),
        0.0
    );
}

#[test]
fn test_geodesic_area_ignores_winding() {
    let mut vertices = vec![
        LatLng::new(-12.05, -77.05),
        LatLng::new(-12.05, -77.04),
        LatLng::new(-12.04, -77.04),
    ];
    let forward = geodesic_area(&vertices);
    vertices.reverse();
    assert!((forward - geodesic_area(&vertices)).abs() < 1e-6);
    assert!(forward > 0.0);
}

#[test]
fn test_haversine_one_degree_of_longitude_at_equator() {
    let d = haversine_distance(LatLng::new(0.0, 0.0), LatLng::new(0.0, 1.0));
    assert!((d - 111_194.93).abs() < 0.1, "got {d}");
    assert_eq!(haversine_distance(LatLng::new(5.0, 5.0), LatLng::new(5.0, 5.0)), 0.0);
}

#[test]
fn test_path_length_sums_legs() {
    let a = LatLng::new(0.0, 0.0);
    let b = LatLng::new(0.0, 1.0);
    let c = LatLng::new(0.0, 2.0);

    let total = path_length(&[a, b, c]);
    assert!((total - 2.0 * haversine_distance(a, b)).abs() < 1e-6);
    assert_eq!(path_length(&[a]), 0.0);
}

#[test]
fn test_format_distance() {
    assert_eq!(format_distance(0.0), "0.00 m");
    assert_eq!(format_distance(999.994), "999.99 m");
    assert_eq!(format_distance(1000.0), "1.00 km");
    assert_eq!(format_distance(12_346.0), "12.35 km");
}

#[test]
fn test_format_area() {
    assert_eq!(format_area(250.5), "250.50 m²");
    assert_eq!(format_area(10_000.0), "1.00 ha");
    assert_eq!(format_area(250_000.0), "25.00 ha");
    assert_eq!(format_area(1_000_000.0), "1.0000 km²");
    assert_eq!(format_area(2_345_678.0), "2.3457 km²");
}

// =========================================================================
// Projection
// =========================================================================

#[test]
fn test_project_origin() {
    let p = project(LatLng::new(0.0, 0.0), 0.0);
    assert!((p.x - 128.0).abs() < 1e-9);
    assert!((p.y - 128.0).abs() < 1e-9);

    let p = project(LatLng::new(0.0, 0.0), 1.0);
    assert!((p.x - 256.0).abs() < 1e-9);
    assert!((p.y - 256.0).abs() < 1e-9);
}

#[test]
fn test_project_axes_directions() {
    let zoom = 10.0;
    let origin = project(LatLng::new(0.0, 0.0), zoom);
    let east = project(LatLng::new(0.0, 1.0), zoom);
    let north = project(LatLng::new(1.0, 0.0), zoom);

    assert!(east.x > origin.x);
    assert!(north.y < origin.y);
}

#[test]
fn test_project_clamps_polar_latitudes() {
    let pole = project(LatLng::new(90.0, 0.0), 0.0);
    assert!(pole.y.is_finite());
    assert!(pole.y.abs() < 1e-6);
}

#[test]
fn test_distance_point_to_segment() {
    let a = Point::new(0.0, 0.0);
    let b = Point::new(10.0, 0.0);

    // Perpendicular foot inside the segment
    assert_eq!(distance_point_to_segment(Point::new(5.0, 3.0), a, b), 3.0);
    // Beyond either end clamps to the endpoint
    assert_eq!(distance_point_to_segment(Point::new(-3.0, 4.0), a, b), 5.0);
    assert_eq!(distance_point_to_segment(Point::new(13.0, 4.0), a, b), 5.0);
    // Zero-length segment
    assert_eq!(distance_point_to_segment(Point::new(3.0, 4.0), a, a), 5.0);
}

#[test]
fn test_within_pixel_margin() {
    let bounds = BoundingBox::from_points(vec![LatLng::new(0.0, 0.0), LatLng::new(0.001, 0.001)]).unwrap();
    let zoom = 18.0;
    let inside = LatLng::new(0.0005, 0.0005);
    // Just west of the box, well under a pixel at zoom 18
    let near = LatLng::new(0.0005, -0.000001);
    let far = LatLng::new(0.0005, -0.01);

    assert!(within_pixel_margin(&bounds, inside, zoom, 0.0));
    assert!(!within_pixel_margin(&bounds, near, zoom, 0.0));
    assert!(within_pixel_margin(&bounds, near, zoom, 6.0));
    assert!(!within_pixel_margin(&bounds, far, zoom, 6.0));
}
