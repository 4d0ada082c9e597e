//! API authentication via timestamp and hash validation
//!
//! Protected requests carry a Unix-epoch-millisecond `timestamp` and a
//! SHA-256 `hash` of the canonical request body concatenated with a shared
//! secret. The secret lives in the `settings` table under
//! `api_shared_secret`; the special value `0` disables auth checking.
//!
//! This module contains only pure functions and database operations. The
//! axum middleware wiring lives in the service crate.

use serde_json::Value;
use sha2::{Digest, Sha256};
use sqlx::SqlitePool;
use std::time::{SystemTime, UNIX_EPOCH};

/// Accepted request age. Allows for processing and network delay.
const MAX_PAST_MS: i64 = 5000;
/// Accepted clock drift into the future.
const MAX_FUTURE_MS: i64 = 1000;

const DUMMY_HASH: &str = "0000000000000000000000000000000000000000000000000000000000000000";

/// Authentication error types
#[derive(Debug, Clone)]
pub enum ApiAuthError {
    /// Timestamp outside acceptable window
    InvalidTimestamp {
        timestamp: i64,
        now: i64,
        reason: String,
    },

    /// Hash does not match calculated value
    InvalidHash { provided: String, calculated: String },

    /// Timestamp field missing from request
    MissingTimestamp,

    /// Hash field missing from request
    MissingHash,

    /// Database error loading shared secret
    DatabaseError(String),

    /// Failed to parse request body
    ParseError(String),
}

impl std::fmt::Display for ApiAuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApiAuthError::InvalidTimestamp { reason, .. } => {
                write!(f, "Invalid timestamp: {}", reason)
            }
            ApiAuthError::InvalidHash { .. } => write!(f, "Invalid hash"),
            ApiAuthError::MissingTimestamp => write!(f, "Missing timestamp field"),
            ApiAuthError::MissingHash => write!(f, "Missing hash field"),
            ApiAuthError::DatabaseError(err) => write!(f, "Database error: {}", err),
            ApiAuthError::ParseError(err) => write!(f, "Parse error: {}", err),
        }
    }
}

impl std::error::Error for ApiAuthError {}

// ========================================
// Shared Secret Management
// ========================================

/// Load the shared secret from database settings
///
/// Generates and stores a new secret when none exists. A stored value of
/// `0` disables auth checking.
pub async fn load_shared_secret(db: &SqlitePool) -> Result<i64, ApiAuthError> {
    let result: Option<(String,)> =
        sqlx::query_as("SELECT value FROM settings WHERE key = 'api_shared_secret'")
            .fetch_optional(db)
            .await
            .map_err(|e| ApiAuthError::DatabaseError(e.to_string()))?;

    match result {
        Some((value,)) => value
            .parse::<i64>()
            .map_err(|e| ApiAuthError::DatabaseError(format!("Invalid i64: {}", e))),
        None => initialize_shared_secret(db).await,
    }
}

/// Generate a random non-zero secret and store it
pub async fn initialize_shared_secret(db: &SqlitePool) -> Result<i64, ApiAuthError> {
    use rand::Rng;

    let mut rng = rand::thread_rng();
    let secret: i64 = loop {
        let val = rng.gen::<i64>();
        if val != 0 {
            break val;
        }
    };

    sqlx::query("INSERT OR REPLACE INTO settings (key, value) VALUES ('api_shared_secret', ?)")
        .bind(secret.to_string())
        .execute(db)
        .await
        .map_err(|e| ApiAuthError::DatabaseError(e.to_string()))?;

    Ok(secret)
}

// ========================================
// Timestamp Validation
// ========================================

/// Validate a request timestamp against the acceptance window
pub fn validate_timestamp(timestamp: i64) -> Result<(), ApiAuthError> {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_millis() as i64;

    let age = now - timestamp;

    if age > MAX_PAST_MS {
        return Err(ApiAuthError::InvalidTimestamp {
            timestamp,
            now,
            reason: format!("Timestamp {}ms too old (max {}ms past)", age, MAX_PAST_MS),
        });
    }

    if age < -MAX_FUTURE_MS {
        return Err(ApiAuthError::InvalidTimestamp {
            timestamp,
            now,
            reason: format!(
                "Timestamp {}ms in future (max {}ms future)",
                age.abs(),
                MAX_FUTURE_MS
            ),
        });
    }

    Ok(())
}

// ========================================
// Hash Calculation and Validation
// ========================================

/// Calculate the request hash
///
/// The `hash` field is replaced with a dummy value, the body is rendered as
/// canonical JSON (sorted keys, no whitespace), the shared secret is
/// appended as a decimal string, and the result is SHA-256 hashed into 64
/// hex characters.
pub fn calculate_hash(json_value: &Value, shared_secret: i64) -> String {
    let mut value = json_value.clone();
    if let Some(obj) = value.as_object_mut() {
        obj.insert("hash".to_string(), Value::String(DUMMY_HASH.to_string()));
    }

    let canonical = to_canonical_json(&value);
    let to_hash = format!("{}{}", canonical, shared_secret);

    let mut hasher = Sha256::new();
    hasher.update(to_hash.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Convert JSON to canonical form (sorted keys, no whitespace)
pub fn to_canonical_json(value: &Value) -> String {
    match value {
        Value::Object(map) => {
            let mut pairs: Vec<_> = map.iter().collect();
            pairs.sort_by_key(|(k, _)| *k);
            let items: Vec<String> = pairs
                .into_iter()
                .map(|(k, v)| format!("\"{}\":{}", k, to_canonical_json(v)))
                .collect();
            format!("{{{}}}", items.join(","))
        }
        Value::Array(arr) => {
            let items: Vec<String> = arr.iter().map(to_canonical_json).collect();
            format!("[{}]", items.join(","))
        }
        Value::String(s) => format!("\"{}\"", s.replace('\\', "\\\\").replace('"', "\\\"")),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "null".to_string(),
    }
}

/// Validate that the provided hash matches the calculated value
pub fn validate_hash(
    provided_hash: &str,
    json_value: &Value,
    shared_secret: i64,
) -> Result<(), ApiAuthError> {
    let calculated = calculate_hash(json_value, shared_secret);

    if provided_hash != calculated {
        return Err(ApiAuthError::InvalidHash {
            provided: provided_hash.to_string(),
            calculated,
        });
    }

    Ok(())
}
