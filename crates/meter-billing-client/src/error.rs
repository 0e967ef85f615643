//! Client error types.

/// Errors that can occur when using the meter billing client.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The server rejected the input (`validation_error`).
    #[error("validation error: {message}")]
    Validation {
        /// Server message.
        message: String,
    },

    /// The reading does not exist (`not_found`).
    #[error("not found: {message}")]
    NotFound {
        /// Server message.
        message: String,
    },

    /// The request conflicts with the reading's state (`conflict`).
    #[error("conflict: {message}")]
    Conflict {
        /// Server message.
        message: String,
    },

    /// Server returned any other error response.
    #[error("API error: {code} - {message}")]
    Api {
        /// Error code.
        code: String,
        /// Error message.
        message: String,
        /// HTTP status code.
        status: u16,
    },

    /// Invalid configuration.
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl ClientError {
    /// Whether retrying the same request may succeed.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Http(e) => e.is_timeout() || e.is_connect(),
            Self::Conflict { .. } => true,
            Self::Api { status, .. } => *status >= 500,
            Self::Validation { .. } | Self::NotFound { .. } | Self::Configuration(_) => false,
        }
    }
}
