//! Scalar metadata values.

use std::fmt;

#[cfg(feature = "serde")]
use serde::Serialize;

/// A leaf value in a metadata tree or a resolved metadata record.
///
/// The empty string is the "not found" value of a resolved field; see
/// [`MetadataValue::empty`].
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
#[cfg_attr(feature = "serde", serde(untagged))]
pub enum MetadataValue {
    /// Explicit null written by the upstream reader.
    Null,
    /// Boolean flag.
    Boolean(bool),
    /// Integral number.
    Integer(i64),
    /// Floating-point number.
    Float(f64),
    /// Text.
    String(String),
    /// Sequence of values stored under a single key.
    List(Vec<MetadataValue>),
}

impl MetadataValue {
    /// The empty-string value carried by fields that were never resolved.
    #[must_use]
    pub fn empty() -> Self {
        MetadataValue::String(String::new())
    }

    /// Returns true if this is the empty-string value.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        matches!(self, MetadataValue::String(s) if s.is_empty())
    }

    /// Returns the text if this is a string value.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            MetadataValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the value as `i64` if it is integral.
    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            MetadataValue::Integer(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the value as `f64` if it is numeric.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            MetadataValue::Integer(v) => Some(*v as f64),
            MetadataValue::Float(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the flag if this is a boolean value.
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            MetadataValue::Boolean(v) => Some(*v),
            _ => None,
        }
    }
}

impl Default for MetadataValue {
    fn default() -> Self {
        Self::empty()
    }
}

impl fmt::Display for MetadataValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetadataValue::Null => f.write_str("null"),
            MetadataValue::Boolean(v) => write!(f, "{v}"),
            MetadataValue::Integer(v) => write!(f, "{v}"),
            MetadataValue::Float(v) => write!(f, "{v}"),
            MetadataValue::String(s) => f.write_str(s),
            MetadataValue::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
        }
    }
}

impl From<&str> for MetadataValue {
    fn from(value: &str) -> Self {
        MetadataValue::String(value.to_string())
    }
}

impl From<String> for MetadataValue {
    fn from(value: String) -> Self {
        MetadataValue::String(value)
    }
}

impl From<i64> for MetadataValue {
    fn from(value: i64) -> Self {
        MetadataValue::Integer(value)
    }
}

impl From<i32> for MetadataValue {
    fn from(value: i32) -> Self {
        MetadataValue::Integer(i64::from(value))
    }
}

impl From<f64> for MetadataValue {
    fn from(value: f64) -> Self {
        MetadataValue::Float(value)
    }
}

impl From<bool> for MetadataValue {
    fn from(value: bool) -> Self {
        MetadataValue::Boolean(value)
    }
}

impl From<Vec<MetadataValue>> for MetadataValue {
    fn from(value: Vec<MetadataValue>) -> Self {
        MetadataValue::List(value)
    }
}
