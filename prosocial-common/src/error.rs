//! Common error types for the ProSocial Platform

use crate::validate::FieldErrors;
use thiserror::Error;

/// Common result type for ProSocial operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across ProSocial services
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation error (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Requested resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid user input or request parameter
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Payload rejected by the validation layer, with per-field messages
    #[error("Validation failed: {0}")]
    Validation(FieldErrors),

    /// Operation refused because another record still references the target
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}
