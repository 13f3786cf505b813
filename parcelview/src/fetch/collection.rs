//! Validated GeoJSON feature collections.

use std::sync::Arc;

use serde_json::Value;

use crate::fetch::error::{excerpt, FetchError};

/// A decoded JSON document with an array-valued `features` attribute.
///
/// Cloning is cheap; every cache tier and every waiter shares one document.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureCollection(Arc<Value>);

impl FeatureCollection {
    /// Parse and validate a raw response body.
    ///
    /// # Errors
    ///
    /// * [`FetchError::InvalidJson`] if the body does not parse
    /// * [`FetchError::NotFeatureCollection`] if `features` is missing or not an array
    pub fn parse(raw: &str) -> Result<Self, FetchError> {
        let value: Value = serde_json::from_str(raw).map_err(|_| FetchError::InvalidJson {
            excerpt: excerpt(raw),
        })?;
        Self::from_value(value)
    }

    /// Validate an already decoded document.
    pub fn from_value(value: Value) -> Result<Self, FetchError> {
        if value.get("features").is_some_and(Value::is_array) {
            Ok(Self(Arc::new(value)))
        } else {
            Err(FetchError::NotFeatureCollection)
        }
    }

    /// The feature objects.
    pub fn features(&self) -> &[Value] {
        self.0
            .get("features")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Number of features.
    pub fn len(&self) -> usize {
        self.features().len()
    }

    /// Whether the collection has no features.
    pub fn is_empty(&self) -> bool {
        self.features().is_empty()
    }

    /// The whole document.
    pub fn as_value(&self) -> &Value {
        &self.0
    }
}
