//! Error type shared by every ownership and discovery operation.

use std::time::Duration;

use thiserror::Error;

/// Errors that can occur while reading, claiming or discovering resources.
///
/// Collaborator failures are surfaced verbatim: nothing in this crate retries,
/// and ownership is never inferred from a failed read or write.
#[derive(Error, Debug)]
pub enum CloudError {
    /// HTTP request failed before a response was received.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// API returned an error response.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Authentication or authorization failure.
    #[error("Authentication error: {0}")]
    Auth(String),

    /// Request was throttled by the remote service.
    #[error("Request throttled: {0}")]
    Throttled(String),

    /// Response body could not be decoded.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Resource not found.
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// The caller cancelled the operation.
    #[error("Operation cancelled")]
    Cancelled,

    /// The caller-supplied deadline elapsed.
    #[error("Operation timed out after {0:?}")]
    Timeout(Duration),

    /// Invalid configuration.
    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl CloudError {
    /// Whether this error came from the transport to the remote service
    /// (network, auth, throttling, service-side failure or an undecodable reply).
    #[must_use]
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Self::Http(_)
                | Self::Api { .. }
                | Self::Auth(_)
                | Self::Throttled(_)
                | Self::Serialization(_)
        )
    }

    /// Whether the referenced resource does not exist.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Whether the caller aborted the operation, by cancellation or deadline.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled | Self::Timeout(_))
    }
}
