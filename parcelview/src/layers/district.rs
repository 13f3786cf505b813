//! District bounds index.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::fetch::FeatureCollection;
use crate::geometry::{BoundingBox, LatLng};
use crate::layers::feature::MapFeature;

/// District code → bounds of every feature carrying that code.
///
/// Built from the block layer each time it loads; used to centre the view on
/// a district.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DistrictBoundsIndex {
    bounds: BTreeMap<String, BoundingBox>,
}

impl DistrictBoundsIndex {
    /// Walk every coordinate of every feature, grouped by the trimmed value
    /// of `field`. Features without a code or geometry are ignored, as are
    /// non-finite coordinates.
    pub fn from_collection(collection: &FeatureCollection, field: &str) -> Self {
        let mut bounds: BTreeMap<String, BoundingBox> = BTreeMap::new();

        for feature in collection.features() {
            let Some(code) = feature
                .get("properties")
                .and_then(|p| p.get(field))
                .and_then(code_text)
            else {
                continue;
            };
            let Some(coords) = feature.get("geometry").and_then(|g| g.get("coordinates")) else {
                continue;
            };

            walk_positions(coords, &mut |p| match bounds.get_mut(&code) {
                Some(b) => b.extend(p),
                None => {
                    bounds.insert(code.clone(), BoundingBox::around(p));
                }
            });
        }

        Self { bounds }
    }

    /// Same index from already decoded features, using their precomputed
    /// bounds.
    pub fn from_features(features: &[MapFeature], field: &str) -> Self {
        let mut bounds: BTreeMap<String, BoundingBox> = BTreeMap::new();

        for feature in features {
            let (Some(code), Some(feature_bounds)) = (
                feature.properties.get(field).and_then(code_text),
                feature.bounds,
            ) else {
                continue;
            };
            bounds
                .entry(code)
                .and_modify(|b| b.union(&feature_bounds))
                .or_insert(feature_bounds);
        }

        Self { bounds }
    }

    /// Bounds of a district, by trimmed code.
    pub fn get(&self, code: &str) -> Option<&BoundingBox> {
        self.bounds.get(code.trim())
    }

    /// Known district codes, sorted.
    pub fn codes(&self) -> impl Iterator<Item = &str> {
        self.bounds.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.bounds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bounds.is_empty()
    }
}

fn code_text(value: &Value) -> Option<String> {
    let text = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    (!text.is_empty()).then_some(text)
}

/// Visit every finite `[lng, lat]` pair in arbitrarily nested coordinates.
fn walk_positions(value: &Value, visit: &mut impl FnMut(LatLng)) {
    let Some(array) = value.as_array() else {
        return;
    };
    if let [Value::Number(lng), Value::Number(lat)] = array.as_slice() {
        if let (Some(lng), Some(lat)) = (lng.as_f64(), lat.as_f64()) {
            let p = LatLng::new(lat, lng);
            if p.is_finite() {
                visit(p);
            }
        }
        return;
    }
    for item in array {
        walk_positions(item, visit);
    }
}
