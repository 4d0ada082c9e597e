//! Typed payload validation
//!
//! Validation is a tagged result: a payload either produces a fully typed
//! value or a [`FieldErrors`] map of field name to message. Handlers run
//! validation before touching the database and surface failures as
//! field-level messages to the caller.
//!
//! The helpers here are pure functions; payload structs in `db::*` compose
//! them into per-entity `validate()` methods.

use serde::Serialize;
use std::collections::BTreeMap;

/// Validation outcome: the typed value or per-field messages
pub type ValidationResult<T> = std::result::Result<T, FieldErrors>;

/// Field name to message map collected during payload validation
#[derive(Debug, Clone, Default, Serialize)]
pub struct FieldErrors {
    errors: BTreeMap<String, String>,
}

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a message for a field. The first message per field wins.
    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.entry(field.into()).or_insert_with(|| message.into());
    }

    /// Capture the result of a field validator, recording the error side
    pub fn capture<T>(
        &mut self,
        field: &str,
        result: std::result::Result<T, String>,
    ) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(message) => {
                self.add(field, message);
                None
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.errors.get(field).map(String::as_str)
    }

    pub fn fields(&self) -> &BTreeMap<String, String> {
        &self.errors
    }

    /// Finish validation: the value if no field failed, the errors otherwise
    pub fn into_result<T>(self, value: T) -> ValidationResult<T> {
        if self.errors.is_empty() {
            Ok(value)
        } else {
            Err(self)
        }
    }
}

impl std::fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut first = true;
        for (field, message) in &self.errors {
            if !first {
                write!(f, "; ")?;
            }
            write!(f, "{}: {}", field, message)?;
            first = false;
        }
        Ok(())
    }
}

// ========================================
// Field validators
// ========================================

/// Required trimmed text with a length bound
pub fn required_text(value: &str, max_len: usize) -> std::result::Result<String, String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err("is required".to_string());
    }
    if trimmed.len() > max_len {
        return Err(format!("must be at most {} characters", max_len));
    }
    Ok(trimmed.to_string())
}

/// Optional trimmed text with a length bound; empty input becomes None
pub fn optional_text(
    value: Option<&str>,
    max_len: usize,
) -> std::result::Result<Option<String>, String> {
    match value.map(str::trim) {
        None | Some("") => Ok(None),
        Some(trimmed) if trimmed.len() > max_len => {
            Err(format!("must be at most {} characters", max_len))
        }
        Some(trimmed) => Ok(Some(trimmed.to_string())),
    }
}

/// Optional email address; checks the local@domain.tld shape only
pub fn optional_email(value: Option<&str>) -> std::result::Result<Option<String>, String> {
    let trimmed = match value.map(str::trim) {
        None | Some("") => return Ok(None),
        Some(v) => v,
    };

    if trimmed.len() > 254 || trimmed.contains(char::is_whitespace) {
        return Err("is not a valid email address".to_string());
    }

    let (local, domain) = match trimmed.split_once('@') {
        Some(parts) => parts,
        None => return Err("is not a valid email address".to_string()),
    };

    if local.is_empty() || domain.is_empty() || !domain.contains('.') || domain.contains('@') {
        return Err("is not a valid email address".to_string());
    }

    Ok(Some(trimmed.to_string()))
}

/// Parse a user-submitted amount string into non-negative integer cents
///
/// Accepts `"1234"`, `"1234.56"`, `"1234,5"`. Rejects empty, signed,
/// non-numeric, and more-than-two-decimal input.
pub fn money_cents(raw: &str) -> std::result::Result<i64, String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err("is required".to_string());
    }
    if trimmed.starts_with('-') {
        return Err("must not be negative".to_string());
    }

    let (whole, fraction) = match trimmed.split_once(['.', ',']) {
        Some((w, f)) => (w, f),
        None => (trimmed, ""),
    };

    if whole.is_empty()
        || !whole.chars().all(|c| c.is_ascii_digit())
        || !fraction.chars().all(|c| c.is_ascii_digit())
    {
        return Err("must be a number".to_string());
    }
    if fraction.len() > 2 {
        return Err("must have at most two decimal places".to_string());
    }

    let whole: i64 = whole
        .parse()
        .map_err(|_| "is too large".to_string())?;
    let cents_part: i64 = if fraction.is_empty() {
        0
    } else {
        // "5" means 50 cents, "05" means 5 cents
        let parsed: i64 = fraction.parse().map_err(|_| "must be a number".to_string())?;
        if fraction.len() == 1 {
            parsed * 10
        } else {
            parsed
        }
    };

    whole
        .checked_mul(100)
        .and_then(|v| v.checked_add(cents_part))
        .ok_or_else(|| "is too large".to_string())
}

/// Integer bounds check
pub fn int_in_range(value: i64, min: i64, max: i64) -> std::result::Result<i64, String> {
    if value < min || value > max {
        return Err(format!("must be between {} and {}", min, max));
    }
    Ok(value)
}

/// Closed enum set membership
pub fn one_of(value: &str, allowed: &[&str]) -> std::result::Result<String, String> {
    let trimmed = value.trim();
    if allowed.contains(&trimmed) {
        Ok(trimmed.to_string())
    } else {
        Err(format!("must be one of: {}", allowed.join(", ")))
    }
}

/// URL-safe slug: lowercase letters, digits and hyphens
pub fn slug(value: &str) -> std::result::Result<String, String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err("is required".to_string());
    }
    if trimmed.len() > 60 {
        return Err("must be at most 60 characters".to_string());
    }
    let valid = trimmed
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
        && !trimmed.starts_with('-')
        && !trimmed.ends_with('-');
    if !valid {
        return Err("must contain only lowercase letters, digits and hyphens".to_string());
    }
    Ok(trimmed.to_string())
}

/// ISO calendar date (`YYYY-MM-DD`)
pub fn iso_date(value: &str) -> std::result::Result<String, String> {
    let trimmed = value.trim();
    chrono::NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .map(|_| trimmed.to_string())
        .map_err(|_| "must be a date in YYYY-MM-DD format".to_string())
}

/// `#RRGGBB` hex color
pub fn hex_color(value: &str) -> std::result::Result<String, String> {
    let trimmed = value.trim();
    let digits = match trimmed.strip_prefix('#') {
        Some(rest) => rest,
        None => return Err("must be a #RRGGBB color".to_string()),
    };
    if digits.len() != 6 || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err("must be a #RRGGBB color".to_string());
    }
    Ok(format!("#{}", digits.to_ascii_lowercase()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_money_cents_whole_and_decimals() {
        assert_eq!(money_cents("1234"), Ok(123400));
        assert_eq!(money_cents("1234.56"), Ok(123456));
        assert_eq!(money_cents("1234,56"), Ok(123456));
        assert_eq!(money_cents("0.5"), Ok(50));
        assert_eq!(money_cents("0.05"), Ok(5));
        assert_eq!(money_cents(" 10 "), Ok(1000));
    }

    #[test]
    fn test_money_cents_rejects_bad_input() {
        assert!(money_cents("").is_err());
        assert!(money_cents("abc").is_err());
        assert!(money_cents("-5").is_err());
        assert!(money_cents("1.234").is_err());
        assert!(money_cents("1.2.3").is_err());
        assert!(money_cents("12a").is_err());
        assert!(money_cents(".50").is_err());
    }

    #[test]
    fn test_required_text_trims_and_bounds() {
        assert_eq!(required_text("  Ana  ", 10), Ok("Ana".to_string()));
        assert!(required_text("   ", 10).is_err());
        assert!(required_text("abcdef", 5).is_err());
    }

    #[test]
    fn test_optional_email_shapes() {
        assert_eq!(optional_email(None), Ok(None));
        assert_eq!(optional_email(Some("")), Ok(None));
        assert_eq!(
            optional_email(Some("ana@studio.com")),
            Ok(Some("ana@studio.com".to_string()))
        );
        assert!(optional_email(Some("not-an-email")).is_err());
        assert!(optional_email(Some("a@b")).is_err());
        assert!(optional_email(Some("a b@c.com")).is_err());
    }

    #[test]
    fn test_hex_color() {
        assert_eq!(hex_color("#FFAA00"), Ok("#ffaa00".to_string()));
        assert!(hex_color("FFAA00").is_err());
        assert!(hex_color("#FFF").is_err());
        assert!(hex_color("#GGGGGG").is_err());
    }

    #[test]
    fn test_slug_shapes() {
        assert_eq!(slug("estudio-luz"), Ok("estudio-luz".to_string()));
        assert!(slug("Estudio Luz").is_err());
        assert!(slug("-leading").is_err());
        assert!(slug("trailing-").is_err());
        assert!(slug("").is_err());
    }

    #[test]
    fn test_iso_date() {
        assert_eq!(iso_date("2026-02-28"), Ok("2026-02-28".to_string()));
        assert!(iso_date("2026-02-30").is_err());
        assert!(iso_date("28/02/2026").is_err());
    }

    #[test]
    fn test_field_errors_first_message_wins() {
        let mut errors = FieldErrors::new();
        errors.add("name", "is required");
        errors.add("name", "second message");
        assert_eq!(errors.get("name"), Some("is required"));
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn test_into_result_tags_outcome() {
        let errors = FieldErrors::new();
        assert!(errors.into_result(42).is_ok());

        let mut errors = FieldErrors::new();
        errors.add("price", "must be a number");
        let result = errors.into_result(42);
        assert!(result.is_err());
    }
}
