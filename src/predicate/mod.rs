//! Declarative predicate language evaluated over attribute mappings.
//!
//! A [`Predicate`] is a tree of [`Comparison`] leaves and [`Compound`] nodes. Predicates are
//! validated when constructed (see [`Comparison::new`]) so that evaluation only ever deals with
//! data-shape mismatches, which are reported through an [`EvalVisitor`] and evaluate to `false`.
mod eval;
mod eval_visitor;
mod geo;
mod wire;

use serde::{Deserialize, Serialize};

use crate::value::{OperandShape, Value, ValueKind};

pub use eval::MalformedComparison;
pub use eval_visitor::{EvalVisitor, NoopEvalVisitor};
pub use geo::{haversine_distance, GeoPoint, EARTH_RADIUS_METERS};
pub use wire::PredicateKind;

/// A boolean test over a typed attribute mapping.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    #[allow(missing_docs)]
    Comparison(Comparison),
    #[allow(missing_docs)]
    Compound(Compound),
}

/// How a comparison treats the value its key path resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Modifier {
    /// Compare the resolved value itself.
    #[default]
    Direct,
    /// The resolved value must be a collection; at least one element must pass.
    Any,
    /// The resolved value must be a collection; every element must pass.
    All,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[allow(missing_docs)]
pub enum ComparisonOperator {
    LessThan,
    LessThanOrEqualTo,
    GreaterThan,
    GreaterThanOrEqualTo,
    EqualTo,
    NotEqualTo,
    Like,
    BeginsWith,
    EndsWith,
    In,
    Contains,
    Between,
    /// Point-in-radius test. Operand is `[lat, long, radiusMeters]`.
    GeoWithin,
}

/// Boolean connective of a [`Compound`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Connective {
    #[allow(missing_docs)]
    And,
    #[allow(missing_docs)]
    Or,
    /// Negation of the conjunction of all children (NAND over the child set).
    Not,
}

/// Leaf predicate comparing the value at `key_path` with a typed operand.
#[derive(Debug, Clone, PartialEq)]
pub struct Comparison {
    key_path: String,
    modifier: Modifier,
    operator: ComparisonOperator,
    value: Value,
}

/// Boolean combination of child predicates.
#[derive(Debug, Clone, PartialEq)]
pub struct Compound {
    connective: Connective,
    children: Vec<Predicate>,
}

/// Error constructing or decoding a predicate.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum PredicateError {
    /// The operator cannot be applied to an operand of this shape.
    #[error("operator {operator:?} does not accept a {shape} operand")]
    IncompatibleOperand {
        #[allow(missing_docs)]
        operator: ComparisonOperator,
        #[allow(missing_docs)]
        shape: OperandShape,
    },
    /// A comparison must carry exactly one typed operand.
    #[error("comparison must have exactly one operand, found {0}")]
    OperandCount(usize),
    /// Compound discriminant list and child list differ in length.
    #[error("compound predicate lists {types} predicate types for {children} predicates")]
    ChildCountMismatch {
        #[allow(missing_docs)]
        types: usize,
        #[allow(missing_docs)]
        children: usize,
    },
    /// The payload of a predicate node could not be decoded.
    #[error("invalid {kind} predicate: {message}")]
    InvalidPayload {
        #[allow(missing_docs)]
        kind: PredicateKind,
        #[allow(missing_docs)]
        message: String,
    },
}

impl Comparison {
    /// Create a comparison, rejecting operator/operand combinations that can never be evaluated.
    ///
    /// ```
    /// # use campaign_engine::predicate::{Comparison, ComparisonOperator::*, Modifier};
    /// let comparison = Comparison::new("amount", Modifier::Direct, GreaterThan, 10.0);
    /// assert!(comparison.is_ok());
    ///
    /// let comparison = Comparison::new("amount", Modifier::Direct, Like, 10.0);
    /// assert!(comparison.is_err());
    /// ```
    pub fn new(
        key_path: impl Into<String>,
        modifier: Modifier,
        operator: ComparisonOperator,
        value: impl Into<Value>,
    ) -> Result<Comparison, PredicateError> {
        let value = value.into();
        let shape = value.shape();
        if !operator.accepts(shape) {
            return Err(PredicateError::IncompatibleOperand { operator, shape });
        }
        Ok(Comparison {
            key_path: key_path.into(),
            modifier,
            operator,
            value,
        })
    }

    #[allow(missing_docs)]
    pub fn key_path(&self) -> &str {
        &self.key_path
    }

    #[allow(missing_docs)]
    pub fn modifier(&self) -> Modifier {
        self.modifier
    }

    #[allow(missing_docs)]
    pub fn operator(&self) -> ComparisonOperator {
        self.operator
    }

    #[allow(missing_docs)]
    pub fn value(&self) -> &Value {
        &self.value
    }
}

impl ComparisonOperator {
    /// Return `true` if operands of `shape` can be used with this operator.
    ///
    /// Array arity (`between`, `geoWithin`) is data, not structure, and is checked at evaluation.
    pub fn accepts(self, shape: OperandShape) -> bool {
        use ValueKind::*;

        match self {
            Self::LessThan
            | Self::LessThanOrEqualTo
            | Self::GreaterThan
            | Self::GreaterThanOrEqualTo => {
                !shape.array && matches!(shape.kind, Number | Timestamp)
            }
            Self::EqualTo | Self::NotEqualTo => !shape.array,
            Self::Like | Self::BeginsWith | Self::EndsWith => !shape.array && shape.kind == Text,
            // `contains` is a substring test on text, or a membership test when the key path
            // resolves to a collection.
            Self::Contains => !shape.array,
            Self::In => shape.array,
            Self::Between => shape.array && matches!(shape.kind, Number | Timestamp),
            Self::GeoWithin => shape.array && shape.kind == Number,
        }
    }
}

impl Compound {
    #[allow(missing_docs)]
    pub fn new(connective: Connective, children: Vec<Predicate>) -> Compound {
        Compound {
            connective,
            children,
        }
    }

    #[allow(missing_docs)]
    pub fn connective(&self) -> Connective {
        self.connective
    }

    #[allow(missing_docs)]
    pub fn children(&self) -> &[Predicate] {
        &self.children
    }
}

impl Predicate {
    /// Shorthand for a `Direct` comparison predicate.
    pub fn compare(
        key_path: impl Into<String>,
        operator: ComparisonOperator,
        value: impl Into<Value>,
    ) -> Result<Predicate, PredicateError> {
        Comparison::new(key_path, Modifier::Direct, operator, value).map(Predicate::Comparison)
    }

    #[allow(missing_docs)]
    pub fn and(children: Vec<Predicate>) -> Predicate {
        Predicate::Compound(Compound::new(Connective::And, children))
    }

    #[allow(missing_docs)]
    pub fn or(children: Vec<Predicate>) -> Predicate {
        Predicate::Compound(Compound::new(Connective::Or, children))
    }

    #[allow(missing_docs)]
    pub fn not(children: Vec<Predicate>) -> Predicate {
        Predicate::Compound(Compound::new(Connective::Not, children))
    }
}

impl From<Comparison> for Predicate {
    fn from(value: Comparison) -> Self {
        Predicate::Comparison(value)
    }
}

impl From<Compound> for Predicate {
    fn from(value: Compound) -> Self {
        Predicate::Compound(value)
    }
}

#[cfg(test)]
mod tests {
    use super::{Comparison, ComparisonOperator, Modifier, PredicateError};
    use crate::value::{OperandShape, ValueKind};

    #[test]
    fn ordering_requires_number_or_timestamp() {
        assert!(Comparison::new("a", Modifier::Direct, ComparisonOperator::LessThan, 1.0).is_ok());
        assert_eq!(
            Comparison::new("a", Modifier::Direct, ComparisonOperator::LessThan, "1"),
            Err(PredicateError::IncompatibleOperand {
                operator: ComparisonOperator::LessThan,
                shape: OperandShape {
                    kind: ValueKind::Text,
                    array: false
                }
            })
        );
    }

    #[test]
    fn in_requires_array() {
        assert!(Comparison::new("a", Modifier::Direct, ComparisonOperator::In, vec!["x"]).is_ok());
        assert!(Comparison::new("a", Modifier::Direct, ComparisonOperator::In, "x").is_err());
    }

    #[test]
    fn between_accepts_any_arity_at_construction() {
        assert!(
            Comparison::new("a", Modifier::Direct, ComparisonOperator::Between, vec![1.0]).is_ok()
        );
        assert!(
            Comparison::new("a", Modifier::Direct, ComparisonOperator::Between, vec!["a", "b"])
                .is_err()
        );
    }

    #[test]
    fn geo_within_requires_number_array() {
        assert!(Comparison::new(
            "location",
            Modifier::Direct,
            ComparisonOperator::GeoWithin,
            vec![45.0, -75.0, 100.0]
        )
        .is_ok());
        assert!(
            Comparison::new("location", Modifier::Direct, ComparisonOperator::GeoWithin, 1.0)
                .is_err()
        );
    }

    #[test]
    fn string_operators_require_text() {
        for operator in [
            ComparisonOperator::Like,
            ComparisonOperator::BeginsWith,
            ComparisonOperator::EndsWith,
        ] {
            assert!(Comparison::new("a", Modifier::Direct, operator, "x").is_ok());
            assert!(Comparison::new("a", Modifier::Direct, operator, true).is_err());
        }
    }
}
