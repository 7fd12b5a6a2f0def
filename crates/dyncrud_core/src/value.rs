//! Typed field values and coercion from loosely-typed input.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use serde_json::Value as JsonValue;
use std::fmt;
use std::str::FromStr;

/// The declared type of a typed-entity field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldType {
    /// 64-bit signed integer.
    Integer,
    /// Exact decimal number.
    Decimal,
    /// UTF-8 text.
    Text,
    /// UTC timestamp.
    DateTime,
}

impl FieldType {
    /// Returns the lowercase name of the type.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            FieldType::Integer => "integer",
            FieldType::Decimal => "decimal",
            FieldType::Text => "text",
            FieldType::DateTime => "datetime",
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A value held by a typed-entity field.
///
/// Unlike loose input, a `Value` always matches one [`FieldType`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Value {
    /// Integer value.
    Integer(i64),
    /// Decimal value.
    Decimal(Decimal),
    /// Text value.
    Text(String),
    /// Timestamp value.
    DateTime(DateTime<Utc>),
}

impl Value {
    /// Returns the type of this value.
    #[must_use]
    pub const fn field_type(&self) -> FieldType {
        match self {
            Value::Integer(_) => FieldType::Integer,
            Value::Decimal(_) => FieldType::Decimal,
            Value::Text(_) => FieldType::Text,
            Value::DateTime(_) => FieldType::DateTime,
        }
    }

    /// Returns the integer if this is an integer value.
    #[must_use]
    pub const fn as_integer(&self) -> Option<i64> {
        match self {
            Value::Integer(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the decimal if this is a decimal value.
    #[must_use]
    pub const fn as_decimal(&self) -> Option<Decimal> {
        match self {
            Value::Decimal(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the text if this is a text value.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(v) => Some(v),
            _ => None,
        }
    }

    /// Returns the timestamp if this is a datetime value.
    #[must_use]
    pub const fn as_datetime(&self) -> Option<DateTime<Utc>> {
        match self {
            Value::DateTime(v) => Some(*v),
            _ => None,
        }
    }

    /// Renders the value as JSON.
    ///
    /// Decimals and timestamps render as strings so no precision is lost.
    #[must_use]
    pub fn to_json(&self) -> JsonValue {
        match self {
            Value::Integer(v) => JsonValue::from(*v),
            Value::Decimal(v) => JsonValue::String(v.to_string()),
            Value::Text(v) => JsonValue::String(v.clone()),
            Value::DateTime(v) => JsonValue::String(v.to_rfc3339()),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Integer(v) => write!(f, "{v}"),
            Value::Decimal(v) => write!(f, "{v}"),
            Value::Text(v) => f.write_str(v),
            Value::DateTime(v) => f.write_str(&v.to_rfc3339()),
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Integer(v)
    }
}

impl From<Decimal> for Value {
    fn from(v: Decimal) -> Self {
        Value::Decimal(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(v: DateTime<Utc>) -> Self {
        Value::DateTime(v)
    }
}

/// Conversion from a [`Value`] into a concrete field type.
pub trait FromValue: Sized {
    /// Extracts `Self`, or `None` if the value has another type.
    fn from_value(value: Value) -> Option<Self>;
}

impl FromValue for i64 {
    fn from_value(value: Value) -> Option<Self> {
        value.as_integer()
    }
}

impl FromValue for Decimal {
    fn from_value(value: Value) -> Option<Self> {
        value.as_decimal()
    }
}

impl FromValue for String {
    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Text(v) => Some(v),
            _ => None,
        }
    }
}

impl FromValue for DateTime<Utc> {
    fn from_value(value: Value) -> Option<Self> {
        value.as_datetime()
    }
}

/// Returns the name of a JSON value's type, for error messages.
#[must_use]
pub fn json_type_name(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "boolean",
        JsonValue::Number(_) => "number",
        JsonValue::String(_) => "string",
        JsonValue::Array(_) => "array",
        JsonValue::Object(_) => "object",
    }
}

/// Coerces a loose JSON value to the given field type.
///
/// Returns `None` when the value has no sensible reading as that type.
/// Null, arrays and objects never coerce.
#[must_use]
pub fn coerce_json(raw: &JsonValue, ty: FieldType) -> Option<Value> {
    match raw {
        JsonValue::String(s) => coerce_str(s, ty),
        JsonValue::Number(n) => match ty {
            FieldType::Integer => n
                .as_i64()
                .or_else(|| n.as_f64().and_then(integral_f64))
                .map(Value::Integer),
            FieldType::Decimal => parse_decimal(&n.to_string()).map(Value::Decimal),
            FieldType::Text => Some(Value::Text(n.to_string())),
            FieldType::DateTime => None,
        },
        JsonValue::Bool(b) => match ty {
            FieldType::Text => Some(Value::Text(b.to_string())),
            _ => None,
        },
        JsonValue::Null | JsonValue::Array(_) | JsonValue::Object(_) => None,
    }
}

/// Coerces a string to the given field type.
///
/// Text passes through verbatim; the other types are parsed from the
/// trimmed string.
#[must_use]
pub fn coerce_str(raw: &str, ty: FieldType) -> Option<Value> {
    match ty {
        FieldType::Text => Some(Value::Text(raw.to_string())),
        FieldType::Integer => raw.trim().parse::<i64>().ok().map(Value::Integer),
        FieldType::Decimal => parse_decimal(raw.trim()).map(Value::Decimal),
        FieldType::DateTime => parse_datetime(raw.trim()).map(Value::DateTime),
    }
}

#[allow(clippy::cast_possible_truncation)]
fn integral_f64(f: f64) -> Option<i64> {
    // 2^63; i64::MAX itself is not representable as f64
    const LIMIT: f64 = 9_223_372_036_854_775_808.0;
    if f.is_finite() && f.fract() == 0.0 && (-LIMIT..LIMIT).contains(&f) {
        Some(f as i64)
    } else {
        None
    }
}

fn parse_decimal(s: &str) -> Option<Decimal> {
    Decimal::from_str(s)
        .or_else(|_| Decimal::from_scientific(s))
        .ok()
}

fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, format) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}
