//! Transport Errors

use thiserror::Error;

/// Errors talking to the assistant service
#[derive(Debug, Error)]
pub enum ApiError {
    /// The HTTP client could not be constructed
    #[error("Failed to create HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    /// The request could not be sent or the body could not be read
    #[error("Request to {endpoint} failed: {source}")]
    Request {
        /// Endpoint path (e.g. `/v1/streaming_query`)
        endpoint: String,
        /// The underlying HTTP error
        source: reqwest::Error,
    },

    /// The service answered with a non-success status
    #[error("{endpoint} returned {status}: {body}")]
    Status {
        /// Endpoint path
        endpoint: String,
        /// HTTP status code
        status: u16,
        /// Response body (may be empty)
        body: String,
    },

    /// A response body was not the expected JSON
    #[error("Invalid response from {endpoint}: {source}")]
    Decode {
        /// Endpoint path
        endpoint: String,
        /// The underlying JSON error
        source: serde_json::Error,
    },

    /// A request URL could not be built
    #[error("Invalid URL {url}: {reason}")]
    InvalidUrl {
        /// The URL being built
        url: String,
        /// What was wrong with it
        reason: String,
    },

    /// The byte stream of a streaming response failed mid-way
    #[error("Stream interrupted: {0}")]
    Stream(String),
}

impl ApiError {
    /// Whether the service answered at all (as opposed to a network failure)
    #[must_use]
    pub fn is_status(&self) -> bool {
        matches!(self, Self::Status { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_error_display() {
        let err = ApiError::Status {
            endpoint: "/v1/models".to_string(),
            status: 503,
            body: "unavailable".to_string(),
        };
        assert_eq!(err.to_string(), "/v1/models returned 503: unavailable");
        assert!(err.is_status());
        assert!(!ApiError::Stream("reset".to_string()).is_status());
    }
}
