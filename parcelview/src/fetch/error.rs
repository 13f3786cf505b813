//! Fetch error types.

use thiserror::Error;

/// Length of the body excerpt carried by content errors, in characters.
pub const EXCERPT_CHARS: usize = 120;

/// Errors returned by [`crate::fetch::FetchOrchestrator::fetch_geojson`].
///
/// `Clone` so one outcome can be delivered to every caller that joined the
/// same in-flight request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// Server answered with a non-success status
    #[error("HTTP {status}")]
    Http { status: u16 },

    /// Connection or transport failure
    #[error("Network error: {0}")]
    Network(String),

    /// Request exceeded the client timeout
    #[error("Request timed out")]
    Timeout,

    /// Content type does not mention JSON
    #[error("Response is not JSON: {excerpt}")]
    NotJson { excerpt: String },

    /// Body claims JSON but does not parse
    #[error("Invalid JSON: {excerpt}")]
    InvalidJson { excerpt: String },

    /// JSON without a `features` array
    #[error("Response is not a GeoJSON feature collection")]
    NotFeatureCollection,

    /// Superseded by a newer request or aborted by the caller
    #[error("Request cancelled")]
    Cancelled,

    /// The HTTP client could not be built or the request URL was invalid
    #[error("HTTP client error: {0}")]
    Client(String),
}

impl FetchError {
    /// Whether this is a cancellation rather than a failure.
    ///
    /// Cancellations are expected when a newer request supersedes an older
    /// one and must not be reported as application errors.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// Short status line suitable for showing to an end user.
    pub fn user_message(&self) -> String {
        match self {
            Self::Http { status } => format!("The map server answered with HTTP {status}."),
            Self::Network(_) => "Could not reach the map server.".to_string(),
            Self::Timeout => "The map server took too long to answer.".to_string(),
            Self::NotJson { .. } | Self::InvalidJson { .. } => {
                "The map server returned an unexpected response.".to_string()
            }
            Self::NotFeatureCollection => "The map server returned no feature data.".to_string(),
            Self::Cancelled => "Request cancelled.".to_string(),
            Self::Client(_) => "The request could not be prepared.".to_string(),
        }
    }
}

/// First [`EXCERPT_CHARS`] characters of a response body.
pub fn excerpt(body: &str) -> String {
    body.chars().take(EXCERPT_CHARS).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_cancelled() {
        assert!(FetchError::Cancelled.is_cancelled());
        assert!(!FetchError::Timeout.is_cancelled());
        assert!(!FetchError::Http { status: 500 }.is_cancelled());
    }

    #[test]
    fn test_display_includes_status() {
        assert_eq!(FetchError::Http { status: 404 }.to_string(), "HTTP 404");
    }

    #[test]
    fn test_user_message_is_short() {
        let errors = [
            FetchError::Http { status: 502 },
            FetchError::Network("connection refused".to_string()),
            FetchError::Timeout,
            FetchError::NotJson {
                excerpt: "<html>".to_string(),
            },
            FetchError::NotFeatureCollection,
        ];
        for error in errors {
            let message = error.user_message();
            assert!(!message.is_empty());
            assert!(message.len() < 80, "too long: {message}");
        }
    }

    #[test]
    fn test_excerpt_counts_characters() {
        let body = "á".repeat(200);
        let cut = excerpt(&body);
        assert_eq!(cut.chars().count(), EXCERPT_CHARS);

        assert_eq!(excerpt("short"), "short");
    }
}
