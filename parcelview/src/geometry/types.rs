//! Geometry value types.

use serde_json::Value;

/// A geographic position in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    /// Create a position from latitude and longitude.
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Whether both components are finite.
    pub fn is_finite(&self) -> bool {
        self.lat.is_finite() && self.lng.is_finite()
    }

    /// Decode a GeoJSON position (`[lng, lat, ...]`).
    pub fn from_position(value: &Value) -> Option<Self> {
        let position = value.as_array()?;
        let lng = position.first()?.as_f64()?;
        let lat = position.get(1)?.as_f64()?;
        Some(Self { lat, lng })
    }
}

/// A point in projected pixel space.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to `other`.
    pub fn distance_to(&self, other: Point) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

/// A closed ring of positions. The last position connects back to the first;
/// a repeated closing position is harmless.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Ring(pub Vec<LatLng>);

impl Ring {
    pub fn new(points: Vec<LatLng>) -> Self {
        Self(points)
    }

    pub fn points(&self) -> &[LatLng] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<LatLng>> for Ring {
    fn from(points: Vec<LatLng>) -> Self {
        Self(points)
    }
}

/// An outer ring with zero or more holes.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Polygon {
    pub outer: Ring,
    pub holes: Vec<Ring>,
}

impl Polygon {
    pub fn new(outer: Ring, holes: Vec<Ring>) -> Self {
        Self { outer, holes }
    }
}

/// Areal geometry in one of its three nestings.
///
/// Built once from coordinates; containment and area functions then treat
/// every variant as a list of polygons.
#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    /// Bare ring, no holes
    Ring(Ring),
    /// Outer ring plus holes
    Polygon(Polygon),
    /// Several polygons
    MultiPolygon(Vec<Polygon>),
}

impl Shape {
    /// Normalise nested GeoJSON coordinates by their depth.
    ///
    /// * `[[lng, lat], ...]` is a ring
    /// * `[[[lng, lat], ...], ...]` is a polygon (first ring outer)
    /// * one level deeper is a multipolygon
    ///
    /// Returns `None` for anything else, including empty arrays.
    pub fn from_coordinates(coords: &Value) -> Option<Self> {
        match coordinate_depth(coords)? {
            1 => decode_ring(coords).map(Shape::Ring),
            2 => decode_polygon(coords).map(Shape::Polygon),
            3 => {
                let polygons: Vec<Polygon> = coords
                    .as_array()?
                    .iter()
                    .filter_map(decode_polygon)
                    .collect();
                (!polygons.is_empty()).then_some(Shape::MultiPolygon(polygons))
            }
            _ => None,
        }
    }

    /// Every polygon as `(outer, holes)`.
    pub fn parts(&self) -> Vec<(&Ring, &[Ring])> {
        match self {
            Shape::Ring(ring) => vec![(ring, &[][..])],
            Shape::Polygon(polygon) => vec![(&polygon.outer, polygon.holes.as_slice())],
            Shape::MultiPolygon(polygons) => polygons
                .iter()
                .map(|p| (&p.outer, p.holes.as_slice()))
                .collect(),
        }
    }

    /// Bounds of every outer ring.
    pub fn bounds(&self) -> Option<BoundingBox> {
        BoundingBox::from_points(
            self.parts()
                .into_iter()
                .flat_map(|(outer, _)| outer.points().iter().copied()),
        )
    }
}

/// Nesting depth above positions: 0 for a position, 1 for a list of
/// positions, and so on. Follows the first element only.
fn coordinate_depth(value: &Value) -> Option<usize> {
    let array = value.as_array()?;
    let first = array.first()?;
    if first.is_number() {
        Some(0)
    } else {
        coordinate_depth(first).map(|d| d + 1)
    }
}

pub(crate) fn decode_ring(value: &Value) -> Option<Ring> {
    let points: Vec<LatLng> = value
        .as_array()?
        .iter()
        .filter_map(LatLng::from_position)
        .collect();
    (!points.is_empty()).then_some(Ring(points))
}

fn decode_polygon(value: &Value) -> Option<Polygon> {
    let mut rings = value.as_array()?.iter().filter_map(decode_ring);
    let outer = rings.next()?;
    Some(Polygon {
        outer,
        holes: rings.collect(),
    })
}

/// Axis-aligned geographic bounds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub south: f64,
    pub west: f64,
    pub north: f64,
    pub east: f64,
}

impl BoundingBox {
    /// Degenerate box around one position.
    pub fn around(p: LatLng) -> Self {
        Self {
            south: p.lat,
            west: p.lng,
            north: p.lat,
            east: p.lng,
        }
    }

    /// Smallest box holding every finite position, or `None` if there are none.
    pub fn from_points(points: impl IntoIterator<Item = LatLng>) -> Option<Self> {
        let mut bounds: Option<Self> = None;
        for p in points.into_iter().filter(LatLng::is_finite) {
            match bounds.as_mut() {
                Some(b) => b.extend(p),
                None => bounds = Some(Self::around(p)),
            }
        }
        bounds
    }

    /// Grow to include `p`.
    pub fn extend(&mut self, p: LatLng) {
        self.south = self.south.min(p.lat);
        self.west = self.west.min(p.lng);
        self.north = self.north.max(p.lat);
        self.east = self.east.max(p.lng);
    }

    /// Inclusive containment.
    pub fn contains(&self, p: LatLng) -> bool {
        p.lat >= self.south && p.lat <= self.north && p.lng >= self.west && p.lng <= self.east
    }

    /// Grow to include another box.
    pub fn union(&mut self, other: &BoundingBox) {
        self.extend(LatLng::new(other.south, other.west));
        self.extend(LatLng::new(other.north, other.east));
    }

    pub fn south_west(&self) -> LatLng {
        LatLng::new(self.south, self.west)
    }

    pub fn north_east(&self) -> LatLng {
        LatLng::new(self.north, self.east)
    }

    pub fn center(&self) -> LatLng {
        LatLng::new(
            (self.south + self.north) / 2.0,
            (self.west + self.east) / 2.0,
        )
    }
}
