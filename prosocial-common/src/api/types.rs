//! Shared API request/response types
//!
//! Error and authentication shapes used by every ProSocial HTTP endpoint.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Authentication parameters carried by GET requests as query parameters
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AuthQuery {
    /// Unix epoch time in milliseconds
    pub timestamp: i64,

    /// SHA-256 hash (64 hex chars)
    pub hash: String,
}

/// Generic error response body: `{ "error": ..., "message": ... }`
///
/// Returned with 4xx/5xx statuses. `details` carries structured payloads
/// such as field-level validation messages.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    /// Error type identifier
    pub error: String,
    /// Human-readable error message
    pub message: String,
    /// Additional error details (optional)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(
        error: impl Into<String>,
        message: impl Into<String>,
        details: Value,
    ) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
            details: Some(details),
        }
    }
}
