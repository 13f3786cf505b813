//! Candidate features decoded from GeoJSON collections.

use std::cmp::Ordering;

use serde_json::{Map, Value};
use tracing::trace;

use crate::fetch::FeatureCollection;
use crate::geometry::{decode_ring, BoundingBox, LatLng, Shape};

/// Geometry of a pickable feature.
#[derive(Debug, Clone, PartialEq)]
pub enum FeatureGeometry {
    /// Marker position
    Point(LatLng),
    /// Polygon, polygon with holes, or multipolygon
    Area(Shape),
    /// One or more polylines
    Line(Vec<Vec<LatLng>>),
}

/// One feature of a loaded layer.
#[derive(Debug, Clone, PartialEq)]
pub struct MapFeature {
    /// Index of the source feature in its collection
    pub id: usize,
    pub geometry: FeatureGeometry,
    /// Precomputed bounds; `None` only for geometry with no finite position
    pub bounds: Option<BoundingBox>,
    pub properties: Map<String, Value>,
}

impl MapFeature {
    /// Build a feature, computing its bounds.
    pub fn new(id: usize, geometry: FeatureGeometry, properties: Map<String, Value>) -> Self {
        let bounds = match &geometry {
            FeatureGeometry::Point(p) => BoundingBox::from_points([*p]),
            FeatureGeometry::Area(shape) => shape.bounds(),
            FeatureGeometry::Line(parts) => {
                BoundingBox::from_points(parts.iter().flatten().copied())
            }
        };
        Self {
            id,
            geometry,
            bounds,
            properties,
        }
    }

    /// A property rendered as trimmed text. Strings and numbers qualify;
    /// empty strings, nulls and other types do not.
    pub fn property_text(&self, name: &str) -> Option<String> {
        let text = match self.properties.get(name)? {
            Value::String(s) => s.trim().to_string(),
            Value::Number(n) => n.to_string(),
            _ => return None,
        };
        (!text.is_empty()).then_some(text)
    }
}

/// Decode every supported feature of a collection.
///
/// Points, lines and polygons (and their multi forms) are supported;
/// features with other or malformed geometry are skipped. A `MultiPoint`
/// becomes one candidate per position.
pub fn decode_features(collection: &FeatureCollection) -> Vec<MapFeature> {
    let mut features = Vec::with_capacity(collection.len());

    for (id, feature) in collection.features().iter().enumerate() {
        let properties = feature
            .get("properties")
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default();
        let Some(geometry) = feature.get("geometry") else {
            continue;
        };
        let kind = geometry.get("type").and_then(Value::as_str).unwrap_or("");
        let coords = geometry.get("coordinates").unwrap_or(&Value::Null);

        match kind {
            "Point" => {
                if let Some(p) = LatLng::from_position(coords) {
                    features.push(MapFeature::new(id, FeatureGeometry::Point(p), properties));
                }
            }
            "MultiPoint" => {
                let points = coords.as_array().map(Vec::as_slice).unwrap_or_default();
                for p in points.iter().filter_map(LatLng::from_position) {
                    features.push(MapFeature::new(
                        id,
                        FeatureGeometry::Point(p),
                        properties.clone(),
                    ));
                }
            }
            "LineString" => {
                if let Some(line) = decode_ring(coords) {
                    features.push(MapFeature::new(
                        id,
                        FeatureGeometry::Line(vec![line.0]),
                        properties,
                    ));
                }
            }
            "MultiLineString" => {
                let parts: Vec<Vec<LatLng>> = coords
                    .as_array()
                    .map(Vec::as_slice)
                    .unwrap_or_default()
                    .iter()
                    .filter_map(decode_ring)
                    .map(|ring| ring.0)
                    .collect();
                if !parts.is_empty() {
                    features.push(MapFeature::new(id, FeatureGeometry::Line(parts), properties));
                }
            }
            "Polygon" | "MultiPolygon" => {
                if let Some(shape) = Shape::from_coordinates(coords) {
                    features.push(MapFeature::new(id, FeatureGeometry::Area(shape), properties));
                }
            }
            other => {
                trace!(feature = id, geometry = other, "Skipping unsupported geometry");
            }
        }
    }

    features
}

/// A named, ordered set of features that is picked as a unit.
#[derive(Debug, Clone, PartialEq)]
pub struct LayerGroup {
    name: String,
    features: Vec<MapFeature>,
    visible: bool,
}

impl LayerGroup {
    /// A visible group.
    pub fn new(name: impl Into<String>, features: Vec<MapFeature>) -> Self {
        Self {
            name: name.into(),
            features,
            visible: true,
        }
    }

    /// Decode a collection into a visible group.
    pub fn from_collection(name: impl Into<String>, collection: &FeatureCollection) -> Self {
        Self::new(name, decode_features(collection))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn features(&self) -> &[MapFeature] {
        &self.features
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Split into one group per value of `field`, named after the value.
    ///
    /// Features without the field are left out. Groups are ordered
    /// numerically when both codes are numbers, lexically otherwise.
    pub fn by_floor(&self, field: &str) -> Vec<LayerGroup> {
        let mut floors: Vec<LayerGroup> = Vec::new();
        for feature in &self.features {
            let Some(code) = feature.property_text(field) else {
                continue;
            };
            match floors.iter_mut().find(|group| group.name == code) {
                Some(group) => group.features.push(feature.clone()),
                None => floors.push(LayerGroup::new(code, vec![feature.clone()])),
            }
        }
        floors.sort_by(|a, b| compare_codes(&a.name, &b.name));
        floors
    }
}

fn compare_codes(a: &str, b: &str) -> Ordering {
    match (a.parse::<f64>(), b.parse::<f64>()) {
        (Ok(x), Ok(y)) if x.is_finite() && y.is_finite() => {
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        _ => a.cmp(b),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn collection(features: Value) -> FeatureCollection {
        FeatureCollection::from_value(json!({ "type": "FeatureCollection", "features": features }))
            .unwrap()
    }

    #[test]
    fn test_decode_supported_geometries() {
        let fc = collection(json!([
            { "geometry": { "type": "Point", "coordinates": [-77.0, -12.0] }, "properties": { "n": 1 } },
            { "geometry": { "type": "LineString", "coordinates": [[0, 0], [1, 1]] } },
            { "geometry": { "type": "Polygon", "coordinates": [[[0, 0], [0, 1], [1, 1], [1, 0]]] } },
            { "geometry": { "type": "MultiPolygon", "coordinates": [[[[0, 0], [0, 1], [1, 1]]]] } },
            { "geometry": { "type": "MultiLineString", "coordinates": [[[0, 0], [1, 0]], [[0, 1], [1, 1]]] } }
        ]));

        let features = decode_features(&fc);
        assert_eq!(features.len(), 5);
        assert_eq!(
            features[0].geometry,
            FeatureGeometry::Point(LatLng::new(-12.0, -77.0))
        );
        assert_eq!(features[0].properties.get("n"), Some(&json!(1)));
        assert!(matches!(features[1].geometry, FeatureGeometry::Line(ref parts) if parts.len() == 1));
        assert!(matches!(features[2].geometry, FeatureGeometry::Area(Shape::Polygon(_))));
        assert!(matches!(features[3].geometry, FeatureGeometry::Area(Shape::MultiPolygon(_))));
        assert!(matches!(features[4].geometry, FeatureGeometry::Line(ref parts) if parts.len() == 2));
        assert_eq!(features[4].id, 4);
    }

    #[test]
    fn test_decode_skips_unsupported_and_malformed() {
        let fc = collection(json!([
            { "geometry": null },
            { "properties": {} },
            { "geometry": { "type": "GeometryCollection", "geometries": [] } },
            { "geometry": { "type": "Polygon", "coordinates": [] } },
            { "geometry": { "type": "Point", "coordinates": ["a", "b"] } },
            { "geometry": { "type": "Point", "coordinates": [1, 2] } }
        ]));

        let features = decode_features(&fc);
        assert_eq!(features.len(), 1);
        assert_eq!(features[0].id, 5);
    }

    #[test]
    fn test_multipoint_becomes_one_candidate_per_point() {
        let fc = collection(json!([
            { "geometry": { "type": "MultiPoint", "coordinates": [[0, 0], [1, 1]] }, "properties": { "k": "v" } }
        ]));

        let features = decode_features(&fc);
        assert_eq!(features.len(), 2);
        assert!(features.iter().all(|f| f.id == 0 && f.property_text("k").as_deref() == Some("v")));
    }

    #[test]
    fn test_feature_bounds_precomputed() {
        let fc = collection(json!([
            { "geometry": { "type": "Polygon", "coordinates": [[[-77.1, -12.1], [-77.1, -12.0], [-77.0, -12.0], [-77.0, -12.1]]] } }
        ]));
        let bounds = decode_features(&fc)[0].bounds.unwrap();
        assert_eq!(bounds.west, -77.1);
        assert_eq!(bounds.north, -12.0);
    }

    #[test]
    fn test_property_text() {
        let mut properties = Map::new();
        properties.insert("s".into(), json!("  015 "));
        properties.insert("n".into(), json!(15));
        properties.insert("empty".into(), json!("   "));
        properties.insert("null".into(), Value::Null);
        let feature = MapFeature::new(0, FeatureGeometry::Point(LatLng::default()), properties);

        assert_eq!(feature.property_text("s").as_deref(), Some("015"));
        assert_eq!(feature.property_text("n").as_deref(), Some("15"));
        assert_eq!(feature.property_text("empty"), None);
        assert_eq!(feature.property_text("null"), None);
        assert_eq!(feature.property_text("missing"), None);
    }

    #[test]
    fn test_by_floor_groups_and_orders() {
        let fc = collection(json!([
            { "geometry": { "type": "Point", "coordinates": [0, 0] }, "properties": { "cod_piso": "10" } },
            { "geometry": { "type": "Point", "coordinates": [0, 0] }, "properties": { "cod_piso": 2 } },
            { "geometry": { "type": "Point", "coordinates": [0, 0] }, "properties": { "cod_piso": "2" } },
            { "geometry": { "type": "Point", "coordinates": [0, 0] }, "properties": { "cod_piso": "S1" } },
            { "geometry": { "type": "Point", "coordinates": [0, 0] }, "properties": {} }
        ]));
        let group = LayerGroup::from_collection("construccion", &fc);

        let floors = group.by_floor("cod_piso");
        let names: Vec<&str> = floors.iter().map(LayerGroup::name).collect();
        assert_eq!(names, vec!["2", "10", "S1"]);
        assert_eq!(floors[0].len(), 2);
        assert!(floors.iter().all(LayerGroup::is_visible));
    }

    #[test]
    fn test_layer_group_visibility() {
        let mut group = LayerGroup::new("lote", Vec::new());
        assert!(group.is_visible());
        assert!(group.is_empty());

        group.set_visible(false);
        assert!(!group.is_visible());
    }
}
