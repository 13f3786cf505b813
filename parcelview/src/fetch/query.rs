//! Feature service request URLs.
//!
//! Builds WFS `GetFeature` URLs that ask for GeoJSON in EPSG:4326:
//!
//! ```text
//! {base_url}?service=WFS&version=1.0.0&request=GetFeature&typeName={workspace}:{layer}
//!   &outputFormat=application/json&srsName=EPSG:4326[&maxFeatures=N][&CQL_FILTER=...]
//!   [&bbox=west,south,east,north,EPSG:4326][&_t=now]
//! ```

use reqwest::Url;

use crate::fetch::error::FetchError;
use crate::geometry::BoundingBox;
use crate::time::{Clock, SystemClock};

/// Default WFS protocol version.
pub const DEFAULT_WFS_VERSION: &str = "1.0.0";

/// Default spatial reference of requested features.
pub const DEFAULT_SRS_NAME: &str = "EPSG:4326";

/// Feature service endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WfsService {
    /// OWS endpoint, without query
    pub base_url: String,
    /// Workspace prefixed to every layer name
    pub workspace: String,
    pub version: String,
    pub srs_name: String,
}

impl WfsService {
    pub fn new(base_url: impl Into<String>, workspace: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            workspace: workspace.into(),
            version: DEFAULT_WFS_VERSION.to_string(),
            srs_name: DEFAULT_SRS_NAME.to_string(),
        }
    }
}

/// Optional parts of a feature request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureQuery {
    pub max_features: Option<u32>,
    /// CQL filter expression
    pub filter: Option<String>,
    pub bbox: Option<BoundingBox>,
    /// Append a timestamp so intermediaries cannot serve a stale copy.
    /// The response cache ignores it when keying.
    pub bypass_cache: bool,
}

impl FeatureQuery {
    pub fn with_max_features(mut self, max: u32) -> Self {
        self.max_features = Some(max);
        self
    }

    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        let filter = filter.into();
        self.filter = (!filter.is_empty()).then_some(filter);
        self
    }

    pub fn with_bbox(mut self, bbox: BoundingBox) -> Self {
        self.bbox = Some(bbox);
        self
    }

    pub fn bypassing_cache(mut self) -> Self {
        self.bypass_cache = true;
        self
    }
}

/// Build the `GetFeature` URL for `layer`.
///
/// # Errors
///
/// [`FetchError::Client`] if the service base URL is not an absolute URL.
pub fn build_feature_query(
    service: &WfsService,
    layer: &str,
    query: &FeatureQuery,
) -> Result<String, FetchError> {
    build_feature_query_at(service, layer, query, &SystemClock)
}

/// As [`build_feature_query`], reading the cache-busting timestamp from `clock`.
pub fn build_feature_query_at(
    service: &WfsService,
    layer: &str,
    query: &FeatureQuery,
    clock: &dyn Clock,
) -> Result<String, FetchError> {
    let mut url = Url::parse(&service.base_url).map_err(|e| {
        FetchError::Client(format!("Invalid service URL '{}': {}", service.base_url, e))
    })?;

    {
        let mut params = url.query_pairs_mut();
        params
            .append_pair("service", "WFS")
            .append_pair("version", &service.version)
            .append_pair("request", "GetFeature")
            .append_pair("typeName", &format!("{}:{}", service.workspace, layer))
            .append_pair("outputFormat", "application/json")
            .append_pair("srsName", &service.srs_name);

        if let Some(max) = query.max_features {
            params.append_pair("maxFeatures", &max.to_string());
        }
        if let Some(filter) = &query.filter {
            params.append_pair("CQL_FILTER", filter);
        }
        if let Some(b) = &query.bbox {
            params.append_pair(
                "bbox",
                &format!("{},{},{},{},{}", b.west, b.south, b.east, b.north, service.srs_name),
            );
        }
        if query.bypass_cache {
            params.append_pair("_t", &clock.now_millis().to_string());
        }
    }

    Ok(url.into())
}

/// CQL filter selecting one district code.
///
/// Codes made only of digits may be stored as text or as numbers, so both
/// forms are matched: `(f='0150' OR f=150)`. Other codes match as text.
/// Returns an empty string for an empty code.
pub fn district_filter(field: &str, code: &str) -> String {
    let code = code.trim();
    if code.is_empty() {
        return String::new();
    }

    if code.bytes().all(|b| b.is_ascii_digit()) {
        let numeric = code.trim_start_matches('0');
        let numeric = if numeric.is_empty() { "0" } else { numeric };
        format!("({field}='{code}' OR {field}={numeric})")
    } else {
        format!("{}='{}'", field, code.replace('\'', "''"))
    }
}
