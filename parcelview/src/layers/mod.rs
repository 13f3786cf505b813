//! Feature layers: decoding, district base loading and local search.

mod district;
mod feature;
mod loader;
mod search;

pub use district::DistrictBoundsIndex;
pub use feature::{decode_features, FeatureGeometry, LayerGroup, MapFeature};
pub use loader::{
    BaseLayerLoader, BaseLayers, LoadOutcome, LoaderError, LoaderSettings, BASE_MAX_FEATURES,
    OVERLAY_MAX_FEATURES,
};
pub use search::{
    codes_match, matches_bounds, pad_code, search_blocks, search_lots, SearchError, SearchFields,
    SearchQuery, BLOCK_CODE_WIDTH, LOT_CODE_WIDTH, SECTOR_CODE_WIDTH,
};
