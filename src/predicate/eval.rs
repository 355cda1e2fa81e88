use std::cmp::Ordering;

use regex::Regex;
use serde::Serialize;

use crate::{
    value::{Array, Scalar},
    AttributeValue, Attributes,
};

use super::{
    eval_visitor::{EvalVisitor, NoopEvalVisitor},
    geo::{geo_within, GeoPoint},
    Comparison, ComparisonOperator, Compound, Connective, Modifier, Predicate,
};

/// Data-shape mismatch found while evaluating a comparison. The comparison evaluates to `false`.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "camelCase")]
pub enum MalformedComparison {
    /// `between` needs exactly `[lower, upper]`.
    #[error("between expects a 2-element operand, found {found} elements")]
    BetweenArity {
        #[allow(missing_docs)]
        found: usize,
    },
    /// `geoWithin` needs exactly `[lat, long, radiusMeters]`.
    #[error("geoWithin expects a [lat, long, radius] operand, found {found} elements")]
    GeoTargetArity {
        #[allow(missing_docs)]
        found: usize,
    },
    /// The key path of a `geoWithin` comparison did not resolve to a `[lat, long]` pair.
    #[error("geoWithin key path must resolve to a [lat, long] pair")]
    GeoPointShape,
    /// `Any`/`All` was applied to a value that is not a collection.
    #[error("{modifier:?} modifier requires the key path to resolve to a collection")]
    NotACollection {
        #[allow(missing_docs)]
        modifier: Modifier,
    },
}

impl Predicate {
    /// Evaluate the predicate against `subject`.
    ///
    /// Never fails: missing attributes and malformed comparisons evaluate to `false`.
    pub fn evaluate(&self, subject: &Attributes) -> bool {
        self.evaluate_with_visitor(subject, &mut NoopEvalVisitor)
    }

    /// Evaluate the predicate, reporting malformed comparisons to `visitor`.
    pub fn evaluate_with_visitor<V: EvalVisitor>(
        &self,
        subject: &Attributes,
        visitor: &mut V,
    ) -> bool {
        match self {
            Predicate::Comparison(comparison) => comparison.evaluate_with_visitor(subject, visitor),
            Predicate::Compound(compound) => compound.evaluate_with_visitor(subject, visitor),
        }
    }
}

impl Compound {
    fn evaluate_with_visitor<V: EvalVisitor>(&self, subject: &Attributes, visitor: &mut V) -> bool {
        let mut children = self.children.iter();
        let eval = |child: &Predicate| child.evaluate_with_visitor(subject, &mut *visitor);
        match self.connective {
            Connective::And => children.all(eval),
            Connective::Or => children.any(eval),
            // Not negates the conjunction of all children, whatever the arity.
            Connective::Not => !children.all(eval),
        }
    }
}

impl Comparison {
    fn evaluate_with_visitor<V: EvalVisitor>(&self, subject: &Attributes, visitor: &mut V) -> bool {
        self.try_evaluate(subject).unwrap_or_else(|reason| {
            visitor.on_malformed(self, reason);
            false
        })
    }

    /// Evaluate the comparison, returning `Err` if the data does not have the shape the operator
    /// expects. A key path that does not resolve is not an error and yields `Ok(false)`.
    pub fn try_evaluate(&self, subject: &Attributes) -> Result<bool, MalformedComparison> {
        let Some(resolved) = resolve(&self.key_path, subject) else {
            return Ok(false);
        };

        match self.modifier {
            Modifier::Direct => match resolved {
                Resolved::Scalar(scalar) => self.compare_scalar(scalar),
                Resolved::Collection(items) => self.compare_collection(&items),
            },
            Modifier::Any => {
                let Resolved::Collection(items) = resolved else {
                    return Err(MalformedComparison::NotACollection {
                        modifier: self.modifier,
                    });
                };
                for item in items {
                    if self.compare_element(item)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
            Modifier::All => {
                let Resolved::Collection(items) = resolved else {
                    return Err(MalformedComparison::NotACollection {
                        modifier: self.modifier,
                    });
                };
                for item in items {
                    if !self.compare_element(item)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
        }
    }

    /// Compare one element of a collection under `Any`/`All`. An element missing the addressed
    /// field never passes.
    fn compare_element(&self, item: Option<&AttributeValue>) -> Result<bool, MalformedComparison> {
        match item {
            None | Some(AttributeValue::Map(_)) => Ok(false),
            Some(AttributeValue::List(inner)) => {
                self.compare_collection(&inner.iter().map(Some).collect::<Vec<_>>())
            }
            Some(scalar) => match scalar.as_scalar() {
                Some(scalar) => self.compare_scalar(scalar),
                None => Ok(false),
            },
        }
    }

    fn compare_collection(
        &self,
        items: &[Option<&AttributeValue>],
    ) -> Result<bool, MalformedComparison> {
        match self.operator {
            ComparisonOperator::GeoWithin => {
                let Some(target) = self.value.as_array().and_then(Array::as_numbers) else {
                    return Ok(false);
                };
                let &[latitude, longitude, radius] = target else {
                    return Err(MalformedComparison::GeoTargetArity {
                        found: target.len(),
                    });
                };
                let point = match items {
                    [Some(AttributeValue::Number(lat)), Some(AttributeValue::Number(long))] => {
                        GeoPoint::new(*lat, *long)
                    }
                    _ => return Err(MalformedComparison::GeoPointShape),
                };
                Ok(geo_within(point, GeoPoint::new(latitude, longitude), radius))
            }
            ComparisonOperator::Contains => {
                let Some(operand) = self.value.as_scalar() else {
                    return Ok(false);
                };
                Ok(items
                    .iter()
                    .any(|item| item.and_then(AttributeValue::as_scalar) == Some(operand)))
            }
            // A collection is a different kind from any scalar operand.
            ComparisonOperator::NotEqualTo => Ok(true),
            // Other operators compare scalars; a collection never equals or orders against one.
            _ => Ok(false),
        }
    }

    fn compare_scalar(&self, attribute: Scalar<'_>) -> Result<bool, MalformedComparison> {
        use ComparisonOperator::*;

        match self.operator {
            LessThan => Ok(self.ordered(attribute, Ordering::is_lt)),
            LessThanOrEqualTo => Ok(self.ordered(attribute, Ordering::is_le)),
            GreaterThan => Ok(self.ordered(attribute, Ordering::is_gt)),
            GreaterThanOrEqualTo => Ok(self.ordered(attribute, Ordering::is_ge)),

            EqualTo | NotEqualTo => {
                let Some(operand) = self.value.as_scalar() else {
                    return Ok(false);
                };
                let is_equal = attribute == operand;
                Ok(is_equal == (self.operator == EqualTo))
            }

            Like => Ok(self.text_test(attribute, |s, pattern| {
                glob_to_regex(pattern).is_some_and(|regex| regex.is_match(s))
            })),
            BeginsWith => Ok(self.text_test(attribute, |s, prefix| s.starts_with(prefix))),
            EndsWith => Ok(self.text_test(attribute, |s, suffix| s.ends_with(suffix))),
            Contains => Ok(self.text_test(attribute, |s, needle| s.contains(needle))),

            In => {
                let Some(candidates) = self.value.as_array() else {
                    return Ok(false);
                };
                Ok(candidates.scalars().contains(&attribute))
            }

            Between => {
                let Some(bounds) = self.value.as_array() else {
                    return Ok(false);
                };
                let &[lower, upper] = bounds.scalars().as_slice() else {
                    return Err(MalformedComparison::BetweenArity {
                        found: bounds.len(),
                    });
                };
                Ok(order(lower, attribute).is_some_and(Ordering::is_le)
                    && order(attribute, upper).is_some_and(Ordering::is_le))
            }

            GeoWithin => Err(MalformedComparison::GeoPointShape),
        }
    }

    fn ordered(&self, attribute: Scalar<'_>, accept: fn(Ordering) -> bool) -> bool {
        self.value
            .as_scalar()
            .and_then(|operand| order(attribute, operand))
            .is_some_and(accept)
    }

    fn text_test(&self, attribute: Scalar<'_>, test: impl FnOnce(&str, &str) -> bool) -> bool {
        match (attribute, self.value.as_scalar()) {
            (Scalar::Text(s), Some(Scalar::Text(operand))) => test(s, operand),
            _ => false,
        }
    }
}

/// Total ordering between comparable scalars. Returns `None` for kinds that cannot be ordered
/// against each other.
fn order(a: Scalar<'_>, b: Scalar<'_>) -> Option<Ordering> {
    match (a, b) {
        (Scalar::Number(a), Scalar::Number(b)) => Some(a.total_cmp(&b)),
        (Scalar::Timestamp(a), Scalar::Timestamp(b)) => Some(a.cmp(&b)),
        _ => None,
    }
}

/// Translate a `like` pattern (`*` matches any run of characters, `?` matches exactly one) into an
/// anchored, case-sensitive regex.
fn glob_to_regex(pattern: &str) -> Option<Regex> {
    let mut regex = String::with_capacity(pattern.len() + 8);
    regex.push_str("(?s)^");
    let mut buf = [0u8; 4];
    for c in pattern.chars() {
        match c {
            '*' => regex.push_str(".*"),
            '?' => regex.push('.'),
            c => regex.push_str(&regex::escape(c.encode_utf8(&mut buf))),
        }
    }
    regex.push('$');
    Regex::new(&regex).ok()
}

/// Value a key path resolved to.
enum Resolved<'a> {
    Scalar(Scalar<'a>),
    /// `None` marks an element of a list of maps that lacks the addressed field.
    Collection(Vec<Option<&'a AttributeValue>>),
}

enum Node<'a> {
    One(&'a AttributeValue),
    /// Field collected from each map of a list.
    Many(Vec<Option<&'a AttributeValue>>),
}

/// Resolve a dotted key path against `subject`. An exact key takes precedence over traversal so
/// that flat mappings with dotted names keep working.
fn resolve<'a>(key_path: &str, subject: &'a Attributes) -> Option<Resolved<'a>> {
    let node = match subject.get(key_path) {
        Some(value) => Node::One(value),
        None => {
            let mut segments = key_path.split('.');
            let mut node = Node::One(subject.get(segments.next()?)?);
            for segment in segments {
                node = node.step(segment)?;
            }
            node
        }
    };

    match node {
        Node::One(AttributeValue::List(items)) => {
            Some(Resolved::Collection(items.iter().map(Some).collect()))
        }
        Node::One(AttributeValue::Map(_)) => None,
        Node::One(value) => value.as_scalar().map(Resolved::Scalar),
        Node::Many(items) => Some(Resolved::Collection(items)),
    }
}

impl<'a> Node<'a> {
    fn step(self, segment: &str) -> Option<Node<'a>> {
        match self {
            Node::One(AttributeValue::Map(map)) => map.get(segment).map(Node::One),
            Node::One(AttributeValue::List(items)) => {
                Some(Node::Many(field_of_each(items.iter().map(Some), segment)))
            }
            Node::One(_) => None,
            Node::Many(items) => Some(Node::Many(field_of_each(items.into_iter(), segment))),
        }
    }
}

fn field_of_each<'a>(
    items: impl Iterator<Item = Option<&'a AttributeValue>>,
    segment: &str,
) -> Vec<Option<&'a AttributeValue>> {
    items
        .map(|item| match item {
            Some(AttributeValue::Map(map)) => map.get(segment),
            _ => None,
        })
        .collect()
}
