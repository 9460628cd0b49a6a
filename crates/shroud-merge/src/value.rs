//! Row values.

use std::fmt;

/// One field of a result row.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    /// Exact numeric kept in its textual form.
    Decimal(String),
    Text(String),
    Bytes(Vec<u8>),
}

/// The type a caller reads a field as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueType {
    /// The value as stored.
    Any,
    Bool,
    Int,
    Float,
    Decimal,
    Text,
    Bytes,
}

impl Value {
    pub fn text(value: impl Into<String>) -> Self {
        Value::Text(value.into())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) | Value::Decimal(s) => Some(s),
            _ => None,
        }
    }

    /// Convert to `ty`, `None` when the value has no such representation.
    ///
    /// NULL converts to every type.
    pub fn convert(self, ty: ValueType) -> Option<Value> {
        let converted = match (self, ty) {
            (value, ValueType::Any) | (value @ Value::Null, _) => value,
            (Value::Text(s), ValueType::Bytes) => Value::Bytes(s.into_bytes()),
            (Value::Bytes(b), ValueType::Text) => Value::Text(String::from_utf8(b).ok()?),
            (value @ Value::Bytes(_), ValueType::Bytes) => value,
            (Value::Bytes(_), _) | (_, ValueType::Bytes) => return None,
            (value, ValueType::Text) => Value::Text(value.to_string()),
            (value, ValueType::Decimal) => Value::Decimal(value.to_string()),
            (Value::Bool(b), ValueType::Bool) => Value::Bool(b),
            (Value::Int(i), ValueType::Bool) => Value::Bool(i != 0),
            (Value::Text(s), ValueType::Bool) => match s.trim().to_ascii_lowercase().as_str() {
                "1" | "true" => Value::Bool(true),
                "0" | "false" => Value::Bool(false),
                _ => return None,
            },
            (Value::Int(i), ValueType::Int) => Value::Int(i),
            (Value::Bool(b), ValueType::Int) => Value::Int(i64::from(b)),
            (Value::Text(s) | Value::Decimal(s), ValueType::Int) => Value::Int(s.trim().parse().ok()?),
            (Value::Float(f), ValueType::Float) => Value::Float(f),
            (Value::Int(i), ValueType::Float) => Value::Float(i as f64),
            (Value::Text(s) | Value::Decimal(s), ValueType::Float) => {
                Value::Float(s.trim().parse().ok()?)
            }
            _ => return None,
        };
        Some(converted)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("NULL"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(x) => write!(f, "{}", x),
            Value::Decimal(s) | Value::Text(s) => f.write_str(s),
            Value::Bytes(b) => f.write_str(&String::from_utf8_lossy(b)),
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Text(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}
