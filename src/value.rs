use serde::{Deserialize, Serialize};

use crate::version::Version;

/// A value attached to a user property, a condition candidate, or a remote config parameter.
///
/// Workspace payloads deliver these untyped; the declared [ValueType] of the enclosing
/// condition decides how two values are compared.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(untagged)]
pub enum HackleValue {
    /// Stores a string value.
    String(String),
    /// Stores an integer number.
    Int(i64),
    /// Stores a floating point number.
    Float(f64),
    /// Stores a boolean.
    Bool(bool),
    /// Stores an array of values.
    Array(Vec<HackleValue>),
    /// Stores a null value.
    Null,
}

impl From<&str> for HackleValue {
    fn from(s: &str) -> HackleValue {
        HackleValue::String(s.to_owned())
    }
}

impl From<String> for HackleValue {
    fn from(s: String) -> HackleValue {
        HackleValue::String(s)
    }
}

impl From<bool> for HackleValue {
    fn from(b: bool) -> HackleValue {
        HackleValue::Bool(b)
    }
}

impl From<i64> for HackleValue {
    fn from(i: i64) -> Self {
        HackleValue::Int(i)
    }
}

impl From<f64> for HackleValue {
    fn from(f: f64) -> Self {
        HackleValue::Float(f)
    }
}

impl<T> From<Vec<T>> for HackleValue
where
    HackleValue: From<T>,
{
    fn from(v: Vec<T>) -> HackleValue {
        v.into_iter().collect()
    }
}

impl<T> FromIterator<T> for HackleValue
where
    HackleValue: From<T>,
{
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        HackleValue::Array(iter.into_iter().map(HackleValue::from).collect())
    }
}

impl HackleValue {
    /// Returns true for [HackleValue::Null].
    pub fn is_null(&self) -> bool {
        matches!(self, HackleValue::Null)
    }

    /// Coerce to a string.
    ///
    /// Numbers are formatted so that the conversion round-trips: `42` becomes `"42"` and
    /// `42.0` becomes `"42.0"`. Booleans, arrays and null do not convert.
    pub fn as_string(&self) -> Option<String> {
        match self {
            HackleValue::String(s) => Some(s.clone()),
            HackleValue::Int(i) => Some(i.to_string()),
            HackleValue::Float(f) => Some(format!("{:?}", f)),
            HackleValue::Bool(_) | HackleValue::Array(_) | HackleValue::Null => None,
        }
    }

    /// Coerce to a number.
    ///
    /// Integer and floating representations compare by value (`42 == 42.0`). Strings are
    /// parsed; a string that is not a number does not convert. Booleans never convert.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            HackleValue::Int(i) => Some(*i as f64),
            HackleValue::Float(f) => Some(*f),
            HackleValue::String(s) => s.parse().ok(),
            HackleValue::Bool(_) | HackleValue::Array(_) | HackleValue::Null => None,
        }
    }

    /// Coerce to a boolean.
    ///
    /// Only boolean values and the exact strings `"true"` / `"false"` (lowercase) convert.
    /// `1`, `"1"` and `"TRUE"` are not booleans.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            HackleValue::Bool(b) => Some(*b),
            HackleValue::String(s) => match s.as_str() {
                "true" => Some(true),
                "false" => Some(false),
                _ => None,
            },
            _ => None,
        }
    }

    /// The [ValueType] this value naturally carries, used for remote config type checks.
    pub fn value_type(&self) -> ValueType {
        match self {
            HackleValue::String(_) => ValueType::String,
            HackleValue::Int(_) | HackleValue::Float(_) => ValueType::Number,
            HackleValue::Bool(_) => ValueType::Boolean,
            HackleValue::Array(_) => ValueType::Json,
            HackleValue::Null => ValueType::Null,
        }
    }

    /// Parse a string value as a [Version]. Non-string values never parse.
    pub fn as_version(&self) -> Option<Version> {
        match self {
            HackleValue::String(s) => Version::parse(s),
            _ => None,
        }
    }
}

/// The declared type of a condition's candidate values, dictating which value matcher
/// performs the comparison.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ValueType {
    Null,
    String,
    Number,
    Boolean,
    Version,
    Json,
}
