use std::fmt;

use derive_more::From;
use serde::Serialize;

/// An absolute instant. All instants are kept in UTC; zones only matter when converting to civil
/// time.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// A typed predicate operand.
///
/// `Value` is a closed set: a single scalar or a homogeneous array of scalars. Arrays cannot be
/// mixed-type because each [`Array`] variant holds exactly one scalar type.
///
/// ```
/// # use campaign_engine::Value;
/// let number: Value = 42.0.into();
/// let text: Value = "gold".into();
/// let range: Value = vec![1.0, 10.0].into();
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, From)]
#[serde(untagged)]
pub enum Value {
    /// A numerical value.
    Number(f64),
    /// A string value.
    Text(String),
    /// A boolean value.
    Boolean(bool),
    /// An absolute instant.
    Timestamp(Timestamp),
    /// A homogeneous array of scalars.
    Array(Array),
}

/// A homogeneous array of scalar values.
#[derive(Debug, Clone, PartialEq, Serialize, From)]
#[serde(untagged)]
pub enum Array {
    #[allow(missing_docs)]
    Numbers(Vec<f64>),
    #[allow(missing_docs)]
    Texts(Vec<String>),
    #[allow(missing_docs)]
    Booleans(Vec<bool>),
    #[allow(missing_docs)]
    Timestamps(Vec<Timestamp>),
}

/// Scalar type of a [`Value`] or of the elements of an [`Array`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
#[allow(missing_docs)]
pub enum ValueKind {
    Number,
    Text,
    Boolean,
    Timestamp,
}

/// Shape of an operand: its scalar kind and whether it is an array.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OperandShape {
    /// Scalar kind (element kind for arrays).
    pub kind: ValueKind,
    /// `true` for [`Value::Array`].
    pub array: bool,
}

/// Borrowed view of a single scalar. This is what comparisons operate on, regardless of whether
/// the scalar came from an operand or from a subject attribute.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum Scalar<'a> {
    Number(f64),
    Text(&'a str),
    Boolean(bool),
    Timestamp(Timestamp),
}

impl Value {
    /// Shape of this value.
    pub fn shape(&self) -> OperandShape {
        let (kind, array) = match self {
            Value::Number(_) => (ValueKind::Number, false),
            Value::Text(_) => (ValueKind::Text, false),
            Value::Boolean(_) => (ValueKind::Boolean, false),
            Value::Timestamp(_) => (ValueKind::Timestamp, false),
            Value::Array(array) => (array.kind(), true),
        };
        OperandShape { kind, array }
    }

    pub(crate) fn as_scalar(&self) -> Option<Scalar<'_>> {
        Some(match self {
            Value::Number(n) => Scalar::Number(*n),
            Value::Text(s) => Scalar::Text(s),
            Value::Boolean(b) => Scalar::Boolean(*b),
            Value::Timestamp(t) => Scalar::Timestamp(*t),
            Value::Array(_) => return None,
        })
    }

    pub(crate) fn as_array(&self) -> Option<&Array> {
        match self {
            Value::Array(array) => Some(array),
            _ => None,
        }
    }
}

impl Array {
    /// Element kind of the array.
    pub fn kind(&self) -> ValueKind {
        match self {
            Array::Numbers(_) => ValueKind::Number,
            Array::Texts(_) => ValueKind::Text,
            Array::Booleans(_) => ValueKind::Boolean,
            Array::Timestamps(_) => ValueKind::Timestamp,
        }
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        match self {
            Array::Numbers(v) => v.len(),
            Array::Texts(v) => v.len(),
            Array::Booleans(v) => v.len(),
            Array::Timestamps(v) => v.len(),
        }
    }

    /// Returns `true` if the array has no elements.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub(crate) fn scalars(&self) -> Vec<Scalar<'_>> {
        match self {
            Array::Numbers(v) => v.iter().map(|n| Scalar::Number(*n)).collect(),
            Array::Texts(v) => v.iter().map(|s| Scalar::Text(s)).collect(),
            Array::Booleans(v) => v.iter().map(|b| Scalar::Boolean(*b)).collect(),
            Array::Timestamps(v) => v.iter().map(|t| Scalar::Timestamp(*t)).collect(),
        }
    }

    pub(crate) fn as_numbers(&self) -> Option<&[f64]> {
        match self {
            Array::Numbers(v) => Some(v),
            _ => None,
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

impl From<Vec<f64>> for Value {
    fn from(value: Vec<f64>) -> Self {
        Self::Array(Array::Numbers(value))
    }
}

impl From<Vec<String>> for Value {
    fn from(value: Vec<String>) -> Self {
        Self::Array(Array::Texts(value))
    }
}

impl From<Vec<&str>> for Value {
    fn from(value: Vec<&str>) -> Self {
        Self::Array(Array::Texts(value.into_iter().map(str::to_owned).collect()))
    }
}

impl From<Vec<bool>> for Value {
    fn from(value: Vec<bool>) -> Self {
        Self::Array(Array::Booleans(value))
    }
}

impl From<Vec<Timestamp>> for Value {
    fn from(value: Vec<Timestamp>) -> Self {
        Self::Array(Array::Timestamps(value))
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ValueKind::Number => "number",
            ValueKind::Text => "text",
            ValueKind::Boolean => "boolean",
            ValueKind::Timestamp => "timestamp",
        })
    }
}

impl fmt::Display for OperandShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.array {
            write!(f, "{} array", self.kind)
        } else {
            write!(f, "{}", self.kind)
        }
    }
}
