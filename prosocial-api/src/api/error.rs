//! HTTP error mapping
//!
//! Translates the shared error type into status codes and the
//! `{ "error": ... }` JSON body every endpoint uses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use prosocial_common::validate::FieldErrors;
use prosocial_common::Error;
use serde_json::json;
use tracing::error;

/// API errors carried out of handlers
#[derive(Debug)]
pub enum ApiError {
    NotFound(String),
    BadRequest(String),
    Conflict(String),
    Validation(FieldErrors),
    Internal(String),
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        match err {
            Error::NotFound(msg) => ApiError::NotFound(msg),
            Error::InvalidInput(msg) => ApiError::BadRequest(msg),
            Error::Validation(fields) => ApiError::Validation(fields),
            Error::Conflict(msg) => ApiError::Conflict(msg),
            Error::Database(e) => ApiError::Internal(format!("Database error: {}", e)),
            Error::Io(e) => ApiError::Internal(format!("IO error: {}", e)),
            Error::Config(msg) => ApiError::Internal(format!("Configuration error: {}", msg)),
            Error::Internal(msg) => ApiError::Internal(msg),
        }
    }
}

impl From<FieldErrors> for ApiError {
    fn from(fields: FieldErrors) -> Self {
        ApiError::Validation(fields)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::NotFound(message) => {
                (StatusCode::NOT_FOUND, json!({ "error": message }))
            }
            ApiError::BadRequest(message) => {
                (StatusCode::BAD_REQUEST, json!({ "error": message }))
            }
            ApiError::Conflict(message) => {
                (StatusCode::CONFLICT, json!({ "error": message }))
            }
            ApiError::Validation(fields) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                json!({ "error": "Validation failed", "fields": fields.fields() }),
            ),
            ApiError::Internal(detail) => {
                // Detail goes to the log, not the caller
                error!("Internal error: {}", detail);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "error": "Internal server error" }),
                )
            }
        };

        (status, Json(body)).into_response()
    }
}
