//! Cached GeoJSON fetching.
//!
//! [`FetchOrchestrator`] is the single entry point every layer loader goes
//! through: it composes the cache tiers, de-duplicates concurrent requests
//! and validates responses.

mod collection;
mod error;
mod http;
mod orchestrator;
mod query;

pub use collection::FeatureCollection;
pub use error::{excerpt, FetchError, EXCERPT_CHARS};
pub use http::{AsyncHttpClient, AsyncReqwestClient, HttpResponse, DEFAULT_TIMEOUT};
pub use orchestrator::{ClearSummary, FetchOptions, FetchOrchestrator};
pub use query::{
    build_feature_query, build_feature_query_at, district_filter, FeatureQuery, WfsService,
    DEFAULT_SRS_NAME, DEFAULT_WFS_VERSION,
};
