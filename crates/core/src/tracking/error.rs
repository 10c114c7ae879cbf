//! Error types for the tracking client.

use thiserror::Error;

/// Errors that can occur when talking to the tracking service.
#[derive(Debug, Error)]
pub enum TrackingError {
    /// The service answered with a non-2xx status.
    #[error("Tracking service returned {status}: {body}")]
    Http { status: u16, body: String },

    /// The request did not complete in time.
    #[error("Tracking service request timed out: {0}")]
    Timeout(String),

    /// The service could not be reached.
    #[error("Failed to connect to tracking service: {0}")]
    ConnectionFailed(String),

    /// Any other transport failure.
    #[error("Tracking request failed: {0}")]
    Request(String),

    /// The response body could not be decoded.
    #[error("Failed to decode tracking service response: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for TrackingError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Timeout(e.to_string())
        } else if e.is_connect() {
            Self::ConnectionFailed(e.to_string())
        } else if e.is_decode() {
            Self::Decode(e.to_string())
        } else {
            Self::Request(e.to_string())
        }
    }
}
