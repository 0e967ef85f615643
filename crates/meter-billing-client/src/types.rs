//! Wire types that only exist at the HTTP boundary.
//!
//! Readings, payments and request bodies are the core types themselves.

use serde::Deserialize;

/// Error envelope returned by the service.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorResponse {
    /// Error details.
    pub error: ApiErrorBody,
}

/// API error body.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorBody {
    /// Machine-readable error kind.
    pub code: String,
    /// Error message.
    pub message: String,
}

/// Body of a successful delete.
#[derive(Debug, Clone, Deserialize)]
pub struct DeleteResponse {
    /// Always `true`.
    pub success: bool,
}

/// Health check response.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct HealthStatus {
    /// Service status.
    pub status: String,
    /// Service name.
    pub service: String,
    /// Service version.
    pub version: String,
}
