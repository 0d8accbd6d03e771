//! SQL value types for driver-agnostic parameter binding and row decoding.

use thiserror::Error;

/// Dynamically typed SQL value.
///
/// Covers the storage classes shared by the supported `?`-placeholder
/// backends. Parameters are always bound as one of these; returned columns
/// are decoded into them before being converted into record members.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Value {
    /// SQL NULL.
    #[default]
    Null,

    /// Boolean value.
    Bool(bool),

    /// 64-bit signed integer. Narrower integer columns widen losslessly.
    Int(i64),

    /// 64-bit floating point.
    Float(f64),

    /// Text data.
    Text(String),

    /// Binary data.
    Bytes(Vec<u8>),
}

impl Value {
    /// Check if this value is NULL.
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Human-readable name of the value's kind, for conversion errors.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Text(_) => "text",
            Value::Bytes(_) => "bytes",
        }
    }
}

// From implementations for common parameter types
impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i16> for Value {
    fn from(v: i16) -> Self {
        Value::Int(v.into())
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v.into())
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Value::Int(v.into())
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Float(v.into())
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
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

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Bytes(v)
    }
}

impl From<&[u8]> for Value {
    fn from(v: &[u8]) -> Self {
        Value::Bytes(v.to_vec())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}

/// A [`Value`] could not be converted into the requested member type.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("cannot convert {found} into {wanted}")]
pub struct ValueError {
    /// The Rust type that was requested.
    pub wanted: &'static str,
    /// The kind of value that was actually present.
    pub found: &'static str,
}

impl ValueError {
    fn new(wanted: &'static str, found: &Value) -> Self {
        Self {
            wanted,
            found: found.kind(),
        }
    }
}

/// Conversion from a dynamically typed [`Value`] into a record member type.
///
/// Implemented for the primitive types a persisted struct field may have.
/// `Option<T>` maps SQL NULL to `None`; non-optional members reject NULL.
pub trait FromValue: Sized {
    fn from_value(value: Value) -> std::result::Result<Self, ValueError>;
}

macro_rules! int_from_value {
    ($($ty:ty),+) => {
        $(
            impl FromValue for $ty {
                fn from_value(value: Value) -> std::result::Result<Self, ValueError> {
                    match value {
                        Value::Int(i) => <$ty>::try_from(i)
                            .map_err(|_| ValueError::new(stringify!($ty), &Value::Int(i))),
                        other => Err(ValueError::new(stringify!($ty), &other)),
                    }
                }
            }
        )+
    };
}

int_from_value!(i16, i32, i64, u16, u32, u64);

impl FromValue for bool {
    fn from_value(value: Value) -> std::result::Result<Self, ValueError> {
        match value {
            Value::Bool(b) => Ok(b),
            // Backends without a native boolean report integers.
            Value::Int(i) => Ok(i != 0),
            other => Err(ValueError::new("bool", &other)),
        }
    }
}

impl FromValue for f64 {
    fn from_value(value: Value) -> std::result::Result<Self, ValueError> {
        match value {
            Value::Float(f) => Ok(f),
            Value::Int(i) => Ok(i as f64),
            other => Err(ValueError::new("f64", &other)),
        }
    }
}

impl FromValue for f32 {
    fn from_value(value: Value) -> std::result::Result<Self, ValueError> {
        f64::from_value(value).map(|f| f as f32)
    }
}

impl FromValue for String {
    fn from_value(value: Value) -> std::result::Result<Self, ValueError> {
        match value {
            Value::Text(s) => Ok(s),
            Value::Bytes(b) => String::from_utf8(b.clone())
                .map_err(|_| ValueError::new("String", &Value::Bytes(b))),
            other => Err(ValueError::new("String", &other)),
        }
    }
}

impl FromValue for Vec<u8> {
    fn from_value(value: Value) -> std::result::Result<Self, ValueError> {
        match value {
            Value::Bytes(b) => Ok(b),
            Value::Text(s) => Ok(s.into_bytes()),
            other => Err(ValueError::new("Vec<u8>", &other)),
        }
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: Value) -> std::result::Result<Self, ValueError> {
        match value {
            Value::Null => Ok(None),
            other => T::from_value(other).map(Some),
        }
    }
}

/// Build a positional parameter list from expressions convertible to [`Value`].
///
/// ```
/// use quarry::{params, Value};
///
/// let args = params![18, "Dybala"];
/// assert_eq!(args, vec![Value::Int(18), Value::Text("Dybala".into())]);
/// ```
#[macro_export]
macro_rules! params {
    () => {
        ::std::vec::Vec::<$crate::Value>::new()
    };
    ($($v:expr),+ $(,)?) => {
        ::std::vec![$($crate::Value::from($v)),+]
    };
}
