//! Typed point values exchanged with the remote source.

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::Value;

/// A value encoded with one of the remote source's primitive types.
#[derive(Debug, Clone, PartialEq)]
pub enum PointValue {
    Null,
    Boolean(bool),
    SByte(i8),
    Byte(u8),
    Int16(i16),
    UInt16(u16),
    Int32(i32),
    UInt32(u32),
    Int64(i64),
    UInt64(u64),
    Float(f32),
    Double(f64),
    String(String),
    DateTime(DateTime<Utc>),
}

impl PointValue {
    /// Render the value the way the pipeline and the state store see it.
    #[must_use]
    pub fn to_json(&self) -> Value {
        match self {
            Self::Null => Value::Null,
            Self::Boolean(b) => Value::Bool(*b),
            Self::SByte(v) => Value::from(*v),
            Self::Byte(v) => Value::from(*v),
            Self::Int16(v) => Value::from(*v),
            Self::UInt16(v) => Value::from(*v),
            Self::Int32(v) => Value::from(*v),
            Self::UInt32(v) => Value::from(*v),
            Self::Int64(v) => Value::from(*v),
            Self::UInt64(v) => Value::from(*v),
            // Non-finite floats have no JSON form.
            Self::Float(v) => {
                serde_json::Number::from_f64(f64::from(*v)).map_or(Value::Null, Value::Number)
            }
            Self::Double(v) => serde_json::Number::from_f64(*v).map_or(Value::Null, Value::Number),
            Self::String(s) => Value::String(s.clone()),
            Self::DateTime(ts) => Value::String(ts.to_rfc3339_opts(SecondsFormat::Millis, true)),
        }
    }

    /// Name of the encoding carried by this value.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "Null",
            Self::Boolean(_) => "Boolean",
            Self::SByte(_) => "SByte",
            Self::Byte(_) => "Byte",
            Self::Int16(_) => "Int16",
            Self::UInt16(_) => "UInt16",
            Self::Int32(_) => "Int32",
            Self::UInt32(_) => "UInt32",
            Self::Int64(_) => "Int64",
            Self::UInt64(_) => "UInt64",
            Self::Float(_) => "Float",
            Self::Double(_) => "Double",
            Self::String(_) => "String",
            Self::DateTime(_) => "DateTime",
        }
    }
}

/// A value read from or pushed by the remote source, with its source time.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub value: PointValue,
    pub timestamp: DateTime<Utc>,
}

impl Sample {
    pub fn new(value: PointValue, timestamp: DateTime<Utc>) -> Self {
        Self { value, timestamp }
    }
}
