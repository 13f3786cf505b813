//! Per-group best-hit selection.

use tracing::trace;

use crate::geometry::{
    distance_point_to_segment, haversine_distance, point_in_polygon, polygon_area, project,
    within_pixel_margin, LatLng,
};
use crate::layers::{FeatureGeometry, LayerGroup, MapFeature};

/// Default distance within which a point feature is hit, in metres.
pub const DEFAULT_POINT_TOLERANCE_M: f64 = 8.0;

/// Default distance within which a line feature is hit, in screen pixels.
pub const DEFAULT_LINE_TOLERANCE_PX: f64 = 6.0;

/// Default zoom used to convert line distances to pixels.
pub const DEFAULT_PICK_ZOOM: f64 = 18.0;

/// Hit-test tolerances.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PickSettings {
    pub point_tolerance_m: f64,
    pub line_tolerance_px: f64,
    /// Map zoom at which pixel distances are measured
    pub zoom: f64,
}

impl Default for PickSettings {
    fn default() -> Self {
        Self {
            point_tolerance_m: DEFAULT_POINT_TOLERANCE_M,
            line_tolerance_px: DEFAULT_LINE_TOLERANCE_PX,
            zoom: DEFAULT_PICK_ZOOM,
        }
    }
}

/// The selected feature of a group.
#[derive(Debug, Clone, PartialEq)]
pub struct Hit<'a, P> {
    /// Group the feature belongs to
    pub group: &'a str,
    pub feature: &'a MapFeature,
    /// Application payload produced by the classifier
    pub payload: P,
    /// 0 for points, planar area for polygons; for lines the area of the
    /// polygon they replaced, or infinity
    pub area: f64,
}

/// One entry of a priority list for [`HitPicker::pick`].
///
/// Several groups in one entry are searched as a single group, e.g. one
/// group per building floor.
pub struct PickLayer<'a, P> {
    pub groups: Vec<&'a LayerGroup>,
    pub classify: Box<dyn Fn(&'a MapFeature) -> Option<P> + 'a>,
}

impl<'a, P> PickLayer<'a, P> {
    /// Entry for a single group.
    pub fn new(group: &'a LayerGroup, classify: impl Fn(&'a MapFeature) -> Option<P> + 'a) -> Self {
        Self {
            groups: vec![group],
            classify: Box::new(classify),
        }
    }

    /// Entry searching several groups as one.
    pub fn merged(
        groups: Vec<&'a LayerGroup>,
        classify: impl Fn(&'a MapFeature) -> Option<P> + 'a,
    ) -> Self {
        Self {
            groups,
            classify: Box::new(classify),
        }
    }
}

/// Selects the feature under a click.
///
/// Within a group:
///
/// * a point within the point tolerance wins outright; the first such point
///   is kept and nothing displaces it
/// * among polygons containing the click, the smallest area wins
/// * a line within the pixel tolerance replaces whatever polygon is held and
///   inherits its area, so only a smaller polygon found later displaces it
///
/// Polygons and lines are rejected by their bounds before the exact test.
/// A classifier returning `None` excludes the feature.
#[derive(Debug, Clone, Copy, Default)]
pub struct HitPicker {
    settings: PickSettings,
}

impl HitPicker {
    pub fn new(settings: PickSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &PickSettings {
        &self.settings
    }

    /// Best hit in one group, or `None` if the group is hidden or nothing
    /// qualifies.
    pub fn pick_best<'a, P>(
        &self,
        group: &'a LayerGroup,
        point: LatLng,
        classify: impl Fn(&'a MapFeature) -> Option<P>,
    ) -> Option<Hit<'a, P>> {
        self.pick_best_across([group], point, classify)
    }

    /// Best hit across several groups treated as one. Hidden groups are
    /// skipped.
    pub fn pick_best_across<'a, P>(
        &self,
        groups: impl IntoIterator<Item = &'a LayerGroup>,
        point: LatLng,
        classify: impl Fn(&'a MapFeature) -> Option<P>,
    ) -> Option<Hit<'a, P>> {
        let mut best: Option<Hit<'a, P>> = None;
        let mut point_locked = false;

        'groups: for group in groups.into_iter().filter(|g| g.is_visible()) {
            for feature in group.features() {
                if point_locked {
                    break 'groups;
                }

                match &feature.geometry {
                    FeatureGeometry::Point(position) => {
                        if haversine_distance(*position, point) > self.settings.point_tolerance_m {
                            continue;
                        }
                        if let Some(payload) = classify(feature) {
                            best = Some(Hit {
                                group: group.name(),
                                feature,
                                payload,
                                area: 0.0,
                            });
                            point_locked = true;
                        }
                    }
                    FeatureGeometry::Area(shape) => {
                        if !feature.bounds.is_some_and(|b| b.contains(point)) {
                            continue;
                        }
                        if !point_in_polygon(point, shape) {
                            continue;
                        }
                        let area = polygon_area(shape);
                        let best_area = best.as_ref().map_or(f64::INFINITY, |hit| hit.area);
                        if area >= best_area {
                            continue;
                        }
                        if let Some(payload) = classify(feature) {
                            best = Some(Hit {
                                group: group.name(),
                                feature,
                                payload,
                                area,
                            });
                        }
                    }
                    FeatureGeometry::Line(parts) => {
                        let Some(bounds) = feature.bounds else {
                            continue;
                        };
                        if !within_pixel_margin(
                            &bounds,
                            point,
                            self.settings.zoom,
                            self.settings.line_tolerance_px,
                        ) {
                            continue;
                        }
                        if !self.line_within_tolerance(parts, point) {
                            continue;
                        }
                        if let Some(payload) = classify(feature) {
                            // Inherits the held area: only a smaller polygon
                            // found later displaces the line.
                            let area = best.as_ref().map_or(f64::INFINITY, |hit| hit.area);
                            best = Some(Hit {
                                group: group.name(),
                                feature,
                                payload,
                                area,
                            });
                        }
                    }
                }
            }
        }

        if let Some(hit) = &best {
            trace!(group = hit.group, feature = hit.feature.id, area = hit.area, "Picked feature");
        }
        best
    }

    /// First hit in priority order. Results are never merged across
    /// entries: a lower-priority entry is only consulted when every earlier
    /// entry had no hit.
    pub fn pick<'a, P>(&self, point: LatLng, layers: &[PickLayer<'a, P>]) -> Option<Hit<'a, P>> {
        layers.iter().find_map(|layer| {
            self.pick_best_across(layer.groups.iter().copied(), point, |f| (layer.classify)(f))
        })
    }

    fn line_within_tolerance(&self, parts: &[Vec<LatLng>], point: LatLng) -> bool {
        let zoom = self.settings.zoom;
        let tolerance = self.settings.line_tolerance_px;
        let p = project(point, zoom);

        parts.iter().any(|part| {
            part.windows(2).any(|segment| {
                let a = project(segment[0], zoom);
                let b = project(segment[1], zoom);
                distance_point_to_segment(p, a, b) <= tolerance
            })
        })
    }
}
