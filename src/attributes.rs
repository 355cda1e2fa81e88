use std::collections::HashMap;

use derive_more::From;
use serde::Serialize;

use crate::value::{Array, Scalar, Timestamp, Value};

/// Type alias for a HashMap representing key-value pairs of attributes.
///
/// Keys are strings representing attribute names. Values may nest further maps and lists, which
/// predicates address with dotted key paths.
///
/// # Examples
/// ```
/// # use campaign_engine::{Attributes, AttributeValue};
/// let attributes = [
///     ("amount".to_owned(), 42.0.into()),
///     ("currency".to_owned(), "CAD".into()),
///     ("location".to_owned(), AttributeValue::from(vec![45.42, -75.69])),
/// ].into_iter().collect::<Attributes>();
/// ```
pub type Attributes = HashMap<String, AttributeValue>;

/// Enum representing possible values of an event or device attribute.
#[derive(Debug, Clone, PartialEq, Serialize, From)]
#[serde(untagged)]
pub enum AttributeValue {
    /// A numerical value.
    Number(f64),
    /// A string value.
    Text(String),
    /// A boolean value.
    Boolean(bool),
    /// An absolute instant.
    Timestamp(Timestamp),
    /// A list of values. Unlike operands, host-provided lists are not required to be homogeneous.
    List(Vec<AttributeValue>),
    /// A nested mapping.
    Map(Attributes),
}

impl AttributeValue {
    pub(crate) fn as_scalar(&self) -> Option<Scalar<'_>> {
        Some(match self {
            AttributeValue::Number(n) => Scalar::Number(*n),
            AttributeValue::Text(s) => Scalar::Text(s),
            AttributeValue::Boolean(b) => Scalar::Boolean(*b),
            AttributeValue::Timestamp(t) => Scalar::Timestamp(*t),
            AttributeValue::List(_) | AttributeValue::Map(_) => return None,
        })
    }

    /// Returns the string if this is a text value.
    pub fn as_str(&self) -> Option<&str> {
        if let AttributeValue::Text(s) = self {
            Some(s.as_str())
        } else {
            None
        }
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

impl From<Vec<f64>> for AttributeValue {
    fn from(value: Vec<f64>) -> Self {
        Self::List(value.into_iter().map(AttributeValue::Number).collect())
    }
}

impl From<Vec<&str>> for AttributeValue {
    fn from(value: Vec<&str>) -> Self {
        Self::List(value.into_iter().map(AttributeValue::from).collect())
    }
}

impl From<Array> for AttributeValue {
    fn from(value: Array) -> Self {
        let items = match value {
            Array::Numbers(v) => v.into_iter().map(AttributeValue::Number).collect(),
            Array::Texts(v) => v.into_iter().map(AttributeValue::Text).collect(),
            Array::Booleans(v) => v.into_iter().map(AttributeValue::Boolean).collect(),
            Array::Timestamps(v) => v.into_iter().map(AttributeValue::Timestamp).collect(),
        };
        Self::List(items)
    }
}

impl From<Value> for AttributeValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Number(n) => Self::Number(n),
            Value::Text(s) => Self::Text(s),
            Value::Boolean(b) => Self::Boolean(b),
            Value::Timestamp(t) => Self::Timestamp(t),
            Value::Array(array) => array.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::AttributeValue;
    use crate::value::Value;

    #[test]
    fn arrays_become_lists() {
        assert_eq!(
            AttributeValue::from(Value::from(vec!["a", "b"])),
            AttributeValue::List(vec!["a".into(), "b".into()])
        );
    }

    #[test]
    fn serializes_untagged() {
        let value = AttributeValue::from(vec![1.0, 2.5]);
        assert_eq!(serde_json::to_string(&value).unwrap(), "[1.0,2.5]");
    }
}
