//! Typed interpretation of string-encoded property values
//!
//! Storage keeps every property as a string. Filters, sorts and summaries all
//! need the same number/date reading of those strings, so the parsing lives
//! here once and every stage goes through `parse_as` or its helpers.
//!
//! # Examples
//!
//! ```
//! use dbview::value::{parse_as, TypedValue};
//! use dbview::FieldType;
//!
//! assert_eq!(parse_as(FieldType::Number, " 42.5 "), Ok(TypedValue::Number(42.5)));
//! assert!(parse_as(FieldType::Number, "abc").is_err());
//! assert!(matches!(parse_as(FieldType::Date, "2024-03-01"), Ok(TypedValue::Date(_))));
//! ```

use crate::field::FieldType;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use std::cmp::Ordering;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("value is empty")]
    Empty,
    #[error("not a number: {0:?}")]
    InvalidNumber(String),
    #[error("not a date: {0:?}")]
    InvalidDate(String),
    #[error("not a boolean: {0:?}")]
    InvalidBool(String),
}

/// A property value read according to its field type.
#[derive(Debug, Clone, PartialEq)]
pub enum TypedValue {
    Text(String),
    Number(f64),
    Date(NaiveDateTime),
    Bool(bool),
}

impl TypedValue {
    /// Ordering between two values of the same kind; `None` across kinds.
    pub fn compare(&self, other: &TypedValue) -> Option<Ordering> {
        match (self, other) {
            (TypedValue::Text(a), TypedValue::Text(b)) => Some(a.cmp(b)),
            (TypedValue::Number(a), TypedValue::Number(b)) => Some(a.total_cmp(b)),
            (TypedValue::Date(a), TypedValue::Date(b)) => Some(a.cmp(b)),
            (TypedValue::Bool(a), TypedValue::Bool(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }
}

/// Full datetime layouts tried before the date-only ones.
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
];

/// Date-only layouts: ISO first, then the loose forms users type into
/// calendar cells.
const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%m/%d/%Y",
    "%b %d, %Y",
    "%B %d, %Y",
    "%d %b %Y",
    "%d %B %Y",
];

/// Parse `raw` according to `field_type`.
///
/// Number-like fields yield `Number`, date-like fields yield `Date`, checkboxes
/// yield `Bool`; every other type is kept as text.
pub fn parse_as(field_type: FieldType, raw: &str) -> Result<TypedValue, ParseError> {
    if field_type.is_number_like() {
        parse_number(raw).map(TypedValue::Number)
    } else if field_type.is_date_like() {
        parse_date(raw).map(TypedValue::Date)
    } else if field_type == FieldType::Checkbox {
        parse_bool(raw).map(TypedValue::Bool)
    } else {
        Ok(TypedValue::Text(raw.to_string()))
    }
}

/// Parse a finite float. `NaN` and infinities are rejected.
pub fn parse_number(raw: &str) -> Result<f64, ParseError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ParseError::Empty);
    }
    match trimmed.parse::<f64>() {
        Ok(n) if n.is_finite() => Ok(n),
        _ => Err(ParseError::InvalidNumber(raw.to_string())),
    }
}

/// Parse a date or datetime.
///
/// RFC 3339 timestamps are normalised to UTC so values written with
/// different offsets compare on one timeline. Plain dates resolve to midnight.
pub fn parse_date(raw: &str) -> Result<NaiveDateTime, ParseError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ParseError::Empty);
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(dt.naive_utc());
    }
    for format in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Ok(dt);
        }
    }
    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(trimmed, format) {
            return Ok(date.and_time(NaiveTime::MIN));
        }
    }

    Err(ParseError::InvalidDate(raw.to_string()))
}

/// Checkbox values as stored by the editor.
pub fn parse_bool(raw: &str) -> Result<bool, ParseError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "" => Err(ParseError::Empty),
        "true" | "1" | "yes" | "checked" => Ok(true),
        "false" | "0" | "no" | "unchecked" => Ok(false),
        _ => Err(ParseError::InvalidBool(raw.to_string())),
    }
}
