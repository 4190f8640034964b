//! Declared point types and value coercion.
//!
//! Coercion is total: a value that cannot be expressed in the requested type
//! falls back to the encoding inferred from its runtime shape.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::value::PointValue;

/// Closed set of encodings a point may declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum DeclaredType {
    /// Infer the encoding from the value itself.
    #[default]
    Auto,
    Boolean,
    SByte,
    Byte,
    Int16,
    UInt16,
    Int32,
    UInt32,
    Int64,
    UInt64,
    Float,
    Double,
    String,
    DateTime,
}

/// Returned when a type name matches none of the known encodings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownType(pub String);

impl fmt::Display for UnknownType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown declared type '{}'", self.0)
    }
}

impl std::error::Error for UnknownType {}

impl DeclaredType {
    /// Canonical name of the type.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Auto => "Auto",
            Self::Boolean => "Boolean",
            Self::SByte => "SByte",
            Self::Byte => "Byte",
            Self::Int16 => "Int16",
            Self::UInt16 => "UInt16",
            Self::Int32 => "Int32",
            Self::UInt32 => "UInt32",
            Self::Int64 => "Int64",
            Self::UInt64 => "UInt64",
            Self::Float => "Float",
            Self::Double => "Double",
            Self::String => "String",
            Self::DateTime => "DateTime",
        }
    }

    /// Lenient parse used for request-supplied names: unknown names mean `Auto`.
    #[must_use]
    pub fn lenient(name: &str) -> Self {
        name.parse().unwrap_or(Self::Auto)
    }

    /// Encode `value` with this type.
    #[must_use]
    pub fn coerce(self, value: &Value) -> PointValue {
        let coerced = match self {
            Self::Auto => None,
            Self::Boolean => boolean_of(value).map(PointValue::Boolean),
            Self::SByte => integer_of(value).map(|v| PointValue::SByte(v as i8)),
            Self::Byte => integer_of(value).map(|v| PointValue::Byte(v as u8)),
            Self::Int16 => integer_of(value).map(|v| PointValue::Int16(v as i16)),
            Self::UInt16 => integer_of(value).map(|v| PointValue::UInt16(v as u16)),
            Self::Int32 => integer_of(value).map(|v| PointValue::Int32(v as i32)),
            Self::UInt32 => integer_of(value).map(|v| PointValue::UInt32(v as u32)),
            Self::Int64 => integer_of(value).map(|v| PointValue::Int64(v as i64)),
            Self::UInt64 => integer_of(value).map(|v| PointValue::UInt64(v as u64)),
            Self::Float => float_of(value).map(|v| PointValue::Float(v as f32)),
            Self::Double => float_of(value).map(PointValue::Double),
            Self::String => Some(PointValue::String(text_of(value))),
            Self::DateTime => datetime_of(value).map(PointValue::DateTime),
        };
        coerced.unwrap_or_else(|| infer(value))
    }
}

impl FromStr for DeclaredType {
    type Err = UnknownType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let ty = match s.trim().to_ascii_lowercase().as_str() {
            "" | "auto" => Self::Auto,
            "boolean" | "bool" => Self::Boolean,
            "sbyte" => Self::SByte,
            "byte" => Self::Byte,
            "int16" => Self::Int16,
            "uint16" => Self::UInt16,
            "int32" => Self::Int32,
            "uint32" => Self::UInt32,
            "int64" => Self::Int64,
            "uint64" => Self::UInt64,
            "float" => Self::Float,
            "double" => Self::Double,
            "string" | "text" => Self::String,
            "datetime" | "timestamp" => Self::DateTime,
            _ => return Err(UnknownType(s.to_string())),
        };
        Ok(ty)
    }
}

impl TryFrom<String> for DeclaredType {
    type Error = UnknownType;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<DeclaredType> for String {
    fn from(value: DeclaredType) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for DeclaredType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Encoding chosen from the runtime shape of a value.
///
/// Booleans stay boolean, numbers become doubles, RFC 3339 strings become
/// timestamps and everything else is sent as text.
#[must_use]
pub fn infer(value: &Value) -> PointValue {
    match value {
        Value::Null => PointValue::Null,
        Value::Bool(b) => PointValue::Boolean(*b),
        Value::Number(n) => PointValue::Double(n.as_f64().unwrap_or_default()),
        Value::String(s) => match parse_datetime(s) {
            Some(ts) => PointValue::DateTime(ts),
            None => PointValue::String(s.clone()),
        },
        Value::Array(_) | Value::Object(_) => PointValue::String(value.to_string()),
    }
}

fn boolean_of(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => n.as_f64().map(|f| f != 0.0),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "on" | "yes" => Some(true),
            "false" | "0" | "off" | "no" | "" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

// Widened so every declared bit width can be truncated from it with `as`.
fn integer_of(value: &Value) -> Option<i128> {
    match value {
        Value::Bool(b) => Some(i128::from(*b)),
        Value::Number(n) => n
            .as_i64()
            .map(i128::from)
            .or_else(|| n.as_u64().map(i128::from))
            .or_else(|| n.as_f64().and_then(truncate_float)),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i128>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().and_then(truncate_float))
        }
        _ => None,
    }
}

fn truncate_float(f: f64) -> Option<i128> {
    f.is_finite().then(|| f.trunc() as i128)
}

fn float_of(value: &Value) -> Option<f64> {
    match value {
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

fn text_of(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn datetime_of(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(s) => parse_datetime(s),
        // Numbers are epoch milliseconds.
        Value::Number(n) => n
            .as_i64()
            .and_then(|ms| Utc.timestamp_millis_opt(ms).single()),
        _ => None,
    }
}

/// Parse an RFC 3339 date-time into UTC.
#[must_use]
pub fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s.trim())
        .ok()
        .map(|ts| ts.with_timezone(&Utc))
}
