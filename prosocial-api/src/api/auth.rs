//! Authentication middleware
//!
//! Protected routes carry a timestamp and a SHA-256 hash keyed by the
//! shared secret: in the JSON body for requests that have one, or as query
//! parameters for bodyless requests. A shared secret of 0 disables all
//! checking.

use axum::{
    body::Body,
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use prosocial_common::api::auth::{validate_hash, validate_timestamp, ApiAuthError};
use prosocial_common::api::types::{AuthQuery, ErrorResponse};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::warn;

use crate::AppState;

/// Authentication fields inside a JSON request body
#[derive(Debug, Deserialize)]
struct AuthFields {
    timestamp: i64,
    hash: String,
}

/// Authentication middleware for protected routes
///
/// Returns 401 Unauthorized if validation fails. The request body is
/// reconstructed for downstream handlers after hash validation.
pub async fn auth_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    // Secret 0 disables all auth checking
    if state.shared_secret == 0 {
        return Ok(next.run(request).await);
    }

    // Limit body size to keep hash validation memory-bounded
    let (parts, body) = request.into_parts();
    let body_bytes = axum::body::to_bytes(body, 10 * 1024 * 1024)
        .await
        .map_err(|e| AuthError::ParseError(format!("Failed to read body: {}", e)))?;

    if body_bytes.is_empty() {
        // Bodyless request: auth rides in the query string
        validate_query_auth(parts.uri.query().unwrap_or(""), state.shared_secret)?;
    } else {
        validate_body_auth(&body_bytes, state.shared_secret)?;
    }

    // Reconstruct request with restored body for downstream handlers
    let request = Request::from_parts(parts, Body::from(body_bytes));

    Ok(next.run(request).await)
}

fn validate_body_auth(body_bytes: &[u8], shared_secret: i64) -> Result<(), AuthError> {
    let json_value: Value = serde_json::from_slice(body_bytes)
        .map_err(|e| AuthError::ParseError(format!("Invalid JSON: {}", e)))?;

    let auth_fields: AuthFields = serde_json::from_value(json_value.clone())
        .map_err(|e| AuthError::MissingFields(format!("Missing auth fields: {}", e)))?;

    validate_timestamp(auth_fields.timestamp).map_err(|e| match e {
        ApiAuthError::InvalidTimestamp { reason, .. } => AuthError::InvalidTimestamp(reason),
        _ => AuthError::Other(e.to_string()),
    })?;

    validate_hash(&auth_fields.hash, &json_value, shared_secret).map_err(|e| match e {
        ApiAuthError::InvalidHash { provided, calculated } => {
            warn!(
                "Hash validation failed: provided={}, calculated={}",
                provided, calculated
            );
            AuthError::InvalidHash
        }
        _ => AuthError::Other(e.to_string()),
    })
}

fn validate_query_auth(query: &str, shared_secret: i64) -> Result<(), AuthError> {
    let auth = parse_auth_query(query)
        .ok_or_else(|| AuthError::MissingFields("Missing timestamp/hash query parameters".to_string()))?;

    validate_timestamp(auth.timestamp).map_err(|e| match e {
        ApiAuthError::InvalidTimestamp { reason, .. } => AuthError::InvalidTimestamp(reason),
        _ => AuthError::Other(e.to_string()),
    })?;

    // Bodyless requests hash the canonical {"hash", "timestamp"} object
    let json_value = json!({ "timestamp": auth.timestamp, "hash": auth.hash });
    validate_hash(&auth.hash, &json_value, shared_secret).map_err(|e| match e {
        ApiAuthError::InvalidHash { provided, calculated } => {
            warn!(
                "Hash validation failed: provided={}, calculated={}",
                provided, calculated
            );
            AuthError::InvalidHash
        }
        _ => AuthError::Other(e.to_string()),
    })
}

/// Minimal query-string parsing for the two auth fields
fn parse_auth_query(query: &str) -> Option<AuthQuery> {
    let mut timestamp = None;
    let mut hash = None;

    for pair in query.split('&') {
        let (key, value) = pair.split_once('=')?;
        match key {
            "timestamp" => timestamp = value.parse::<i64>().ok(),
            "hash" => hash = Some(value.to_string()),
            _ => {}
        }
    }

    Some(AuthQuery {
        timestamp: timestamp?,
        hash: hash?,
    })
}

/// Authentication error types for HTTP responses
#[derive(Debug)]
pub enum AuthError {
    InvalidTimestamp(String),
    InvalidHash,
    MissingFields(String),
    ParseError(String),
    Other(String),
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            AuthError::InvalidTimestamp(reason) => (
                StatusCode::UNAUTHORIZED,
                ErrorResponse::new("timestamp_invalid", format!("Invalid timestamp: {}", reason)),
            ),
            AuthError::InvalidHash => (
                StatusCode::UNAUTHORIZED,
                ErrorResponse::new("hash_invalid", "Invalid hash"),
            ),
            AuthError::MissingFields(msg) => (
                StatusCode::UNAUTHORIZED,
                ErrorResponse::new("auth_missing", format!("Missing required fields: {}", msg)),
            ),
            AuthError::ParseError(msg) => (
                StatusCode::BAD_REQUEST,
                ErrorResponse::new("parse_error", format!("Parse error: {}", msg)),
            ),
            AuthError::Other(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorResponse::new("auth_error", format!("Authentication error: {}", msg)),
            ),
        };

        (status, Json(body)).into_response()
    }
}
