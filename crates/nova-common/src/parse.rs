//! Parsers for untyped request inputs.
//!
//! Request inputs arrive as JSON values where numbers, booleans and dates are
//! frequently encoded as strings. Each parser accepts both encodings and
//! fails with [`Error::InvalidInputs`] when the value cannot be interpreted.

use std::sync::LazyLock;

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use regex::Regex;
use serde_json::Value;

use crate::error::{Error, Result};

static INT_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[-+]?[0-9]+$").expect("valid integer regex"));
static NUM_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[-+]?[0-9]+(?:\.[0-9]+)?$").expect("valid number regex"));

fn invalid(value: &Value, what: &str) -> Error {
    match value {
        Value::String(s) => Error::InvalidInputs(format!("'{s}' is not a valid {what}")),
        other => Error::InvalidInputs(format!("'{other}' is not a valid {what}")),
    }
}

fn check_bounds<T: PartialOrd + std::fmt::Display>(
    num: T,
    min: Option<T>,
    max: Option<T>,
) -> Result<T> {
    if let Some(min) = min {
        if num < min {
            return Err(Error::InvalidInputs(format!(
                "value cannot be smaller than {min}"
            )));
        }
    }
    if let Some(max) = max {
        if num > max {
            return Err(Error::InvalidInputs(format!(
                "value cannot be greater than {max}"
            )));
        }
    }
    Ok(num)
}

/// Parse an integer from a JSON number or a decimal string.
pub fn parse_integer(value: &Value, min: Option<i64>, max: Option<i64>) -> Result<i64> {
    let num = match value {
        Value::String(s) => {
            let s = s.trim();
            if !INT_REGEX.is_match(s) {
                return Err(invalid(value, "integer"));
            }
            s.parse::<i64>().map_err(|_| invalid(value, "integer"))?
        }
        Value::Number(n) => n.as_i64().ok_or_else(|| invalid(value, "integer"))?,
        _ => return Err(invalid(value, "integer")),
    };
    check_bounds(num, min, max)
}

/// Parse a floating point number from a JSON number or a decimal string.
pub fn parse_number(value: &Value, min: Option<f64>, max: Option<f64>) -> Result<f64> {
    let num = match value {
        Value::String(s) => {
            let s = s.trim();
            if !NUM_REGEX.is_match(s) {
                return Err(invalid(value, "number"));
            }
            s.parse::<f64>().map_err(|_| invalid(value, "number"))?
        }
        Value::Number(n) => n.as_f64().ok_or_else(|| invalid(value, "number"))?,
        _ => return Err(invalid(value, "number")),
    };
    check_bounds(num, min, max)
}

/// Parse a boolean.
///
/// In strict mode only `true`/`false` (as JSON booleans or case-insensitive
/// strings) are accepted. In loose mode any value is coerced by truthiness:
/// `null`, `false`, `0` and the empty string are false.
pub fn parse_boolean(value: &Value, strict: bool) -> Result<bool> {
    if !strict {
        return Ok(match value {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
            Value::String(s) => !s.is_empty(),
            Value::Array(_) | Value::Object(_) => true,
        });
    }

    match value {
        Value::Bool(b) => Ok(*b),
        Value::String(s) => match s.trim().to_lowercase().as_str() {
            "true" => Ok(true),
            "false" => Ok(false),
            _ => Err(invalid(value, "boolean")),
        },
        _ => Err(invalid(value, "boolean")),
    }
}

/// Parse a UTC timestamp.
///
/// Accepts epoch milliseconds (as a number or a string of digits), RFC 3339
/// strings, and plain `YYYY-MM-DD` dates (midnight UTC).
pub fn parse_date(value: &Value) -> Result<DateTime<Utc>> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .and_then(|ms| Utc.timestamp_millis_opt(ms).single())
            .ok_or_else(|| invalid(value, "date")),
        Value::String(s) => {
            let s = s.trim();
            if INT_REGEX.is_match(s) {
                return s
                    .parse::<i64>()
                    .ok()
                    .and_then(|ms| Utc.timestamp_millis_opt(ms).single())
                    .ok_or_else(|| invalid(value, "date"));
            }
            if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
                return Ok(dt.with_timezone(&Utc));
            }
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
                .map(|naive| Utc.from_utc_datetime(&naive))
                .ok_or_else(|| invalid(value, "date"))
        }
        _ => Err(invalid(value, "date")),
    }
}

/// Parse and trim a string, enforcing optional length limits.
///
/// Missing (`null`) and empty values yield `Ok(None)` unless `min_length` is
/// set, in which case they are errors.
pub fn parse_string(
    value: &Value,
    min_length: Option<usize>,
    max_length: Option<usize>,
) -> Result<Option<String>> {
    let required = min_length.is_some_and(|min| min > 0);
    match value {
        Value::Null if required => Err(Error::InvalidInputs("value is missing".into())),
        Value::Null => Ok(None),
        Value::String(s) => {
            let trimmed = s.trim();
            let len = trimmed.chars().count();
            if let Some(min) = min_length {
                if len < min {
                    return Err(Error::InvalidInputs(format!(
                        "value must be at least {min} characters long"
                    )));
                }
            }
            if let Some(max) = max_length {
                if len > max {
                    return Err(Error::InvalidInputs(format!(
                        "value can be at most {max} characters long"
                    )));
                }
            }
            Ok((!trimmed.is_empty()).then(|| trimmed.to_string()))
        }
        other => Err(Error::InvalidInputs(format!(
            "value '{other}' is not a string"
        ))),
    }
}
