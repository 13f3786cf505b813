//! Click hit-testing across prioritised layer groups.
//!
//! [`HitPicker::pick_best`] finds the best feature within one group using a
//! strategy per geometry type; [`HitPicker::pick`] walks a priority list of
//! groups and returns the first group's hit.

mod picker;

pub use picker::{
    Hit, HitPicker, PickLayer, PickSettings, DEFAULT_LINE_TOLERANCE_PX, DEFAULT_PICK_ZOOM,
    DEFAULT_POINT_TOLERANCE_M,
};
