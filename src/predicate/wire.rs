//! Transport format of predicates.
//!
//! The root of a tree travels in an envelope naming its kind:
//!
//! ```json
//! { "predicateType": "compound", "predicate": { ... } }
//! ```
//!
//! Compound nodes carry their children as two parallel arrays, `predicateTypes` and
//! `predicates`. Decoding first reads the complete discriminant list, checks that it lines up with
//! the payload list, and only then decodes each child as the kind its discriminant names.
//!
//! Comparison nodes spread their operand over several optional typed slots (`numberValue`,
//! `stringValues`, ...). Exactly one slot must be populated; it is normalized into a single
//! [`Value`].
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

use crate::{Timestamp, Value};

use super::{
    Comparison, ComparisonOperator, Compound, Connective, Modifier, Predicate, PredicateError,
};

/// Discriminant of a predicate node on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PredicateKind {
    #[allow(missing_docs)]
    Comparison,
    #[allow(missing_docs)]
    Compound,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PredicateEnvelope {
    predicate_type: PredicateKind,
    predicate: serde_json::Value,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CompoundWire {
    boolean_operator: Connective,
    #[serde(default)]
    predicate_types: Vec<PredicateKind>,
    #[serde(default)]
    predicates: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ComparisonWire {
    key_path: String,
    #[serde(default)]
    modifier: Modifier,
    operator: ComparisonOperator,
    number_value: Option<f64>,
    string_value: Option<String>,
    boolean_value: Option<bool>,
    date_value: Option<Timestamp>,
    number_values: Option<Vec<f64>>,
    string_values: Option<Vec<String>>,
    boolean_values: Option<Vec<bool>>,
    date_values: Option<Vec<Timestamp>>,
}

impl<'de> Deserialize<'de> for Predicate {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let envelope = PredicateEnvelope::deserialize(deserializer)?;
        decode(envelope.predicate_type, envelope.predicate).map_err(serde::de::Error::custom)
    }
}

fn decode(kind: PredicateKind, payload: serde_json::Value) -> Result<Predicate, PredicateError> {
    let invalid = |err: serde_json::Error| PredicateError::InvalidPayload {
        kind,
        message: err.to_string(),
    };

    match kind {
        PredicateKind::Comparison => {
            let wire: ComparisonWire = serde_json::from_value(payload).map_err(invalid)?;
            wire.into_comparison().map(Predicate::Comparison)
        }
        PredicateKind::Compound => {
            let wire: CompoundWire = serde_json::from_value(payload).map_err(invalid)?;
            wire.into_compound().map(Predicate::Compound)
        }
    }
}

impl CompoundWire {
    fn into_compound(self) -> Result<Compound, PredicateError> {
        // The discriminant list is fully known at this point; children are decoded only once it
        // is known to line up with the payloads.
        if self.predicate_types.len() != self.predicates.len() {
            return Err(PredicateError::ChildCountMismatch {
                types: self.predicate_types.len(),
                children: self.predicates.len(),
            });
        }

        let children = self
            .predicate_types
            .into_iter()
            .zip(self.predicates)
            .map(|(kind, payload)| decode(kind, payload))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Compound::new(self.boolean_operator, children))
    }
}

impl ComparisonWire {
    fn into_comparison(self) -> Result<Comparison, PredicateError> {
        let operands = [
            self.number_value.map(Value::from),
            self.string_value.map(Value::from),
            self.boolean_value.map(Value::from),
            self.date_value.map(Value::from),
            self.number_values.map(Value::from),
            self.string_values.map(Value::from),
            self.boolean_values.map(Value::from),
            self.date_values.map(Value::from),
        ]
        .into_iter()
        .flatten()
        .collect::<Vec<_>>();

        let [value] = <[Value; 1]>::try_from(operands)
            .map_err(|operands| PredicateError::OperandCount(operands.len()))?;

        Comparison::new(self.key_path, self.modifier, self.operator, value)
    }
}

impl fmt::Display for PredicateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PredicateKind::Comparison => "comparison",
            PredicateKind::Compound => "compound",
        })
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{decode, PredicateKind};
    use crate::{
        predicate::{
            Comparison, ComparisonOperator, Connective, Modifier, Predicate, PredicateError,
        },
        Value,
    };

    #[test]
    fn decodes_comparison() {
        let predicate: Predicate = serde_json::from_value(json!({
            "predicateType": "comparison",
            "predicate": {
                "keyPath": "amount",
                "operator": "greaterThan",
                "numberValue": 10.0
            }
        }))
        .unwrap();

        let expected =
            Comparison::new("amount", Modifier::Direct, ComparisonOperator::GreaterThan, 10.0)
                .unwrap();
        assert_eq!(predicate, Predicate::from(expected));
    }

    #[test]
    fn decodes_array_operands_and_modifier() {
        let predicate = decode(
            PredicateKind::Comparison,
            json!({
                "keyPath": "tags",
                "modifier": "any",
                "operator": "in",
                "stringValues": ["vip", "beta"]
            }),
        )
        .unwrap();

        let Predicate::Comparison(comparison) = predicate else {
            panic!("expected a comparison");
        };
        assert_eq!(comparison.modifier(), Modifier::Any);
        assert_eq!(comparison.value(), &Value::from(vec!["vip", "beta"]));
    }

    #[test]
    fn decodes_date_operand() {
        let predicate = decode(
            PredicateKind::Comparison,
            json!({
                "keyPath": "lastSeen",
                "operator": "lessThan",
                "dateValue": "2024-01-01T00:00:00Z"
            }),
        )
        .unwrap();
        let Predicate::Comparison(comparison) = predicate else {
            panic!("expected a comparison");
        };
        assert!(matches!(comparison.value(), Value::Timestamp(_)));
    }

    #[test]
    fn decodes_nested_compound() {
        let predicate = decode(
            PredicateKind::Compound,
            json!({
                "booleanOperator": "or",
                "predicateTypes": ["comparison", "compound"],
                "predicates": [
                    { "keyPath": "tier", "operator": "equalTo", "stringValue": "gold" },
                    {
                        "booleanOperator": "not",
                        "predicateTypes": ["comparison"],
                        "predicates": [
                            { "keyPath": "optedOut", "operator": "equalTo", "booleanValue": true }
                        ]
                    }
                ]
            }),
        )
        .unwrap();

        let Predicate::Compound(compound) = predicate else {
            panic!("expected a compound");
        };
        assert_eq!(compound.connective(), Connective::Or);
        assert_eq!(compound.children().len(), 2);
        assert!(matches!(
            &compound.children()[1],
            Predicate::Compound(inner) if inner.connective() == Connective::Not
        ));
    }

    #[test]
    fn rejects_missing_or_extra_operands() {
        assert_eq!(
            decode(
                PredicateKind::Comparison,
                json!({ "keyPath": "a", "operator": "equalTo" })
            ),
            Err(PredicateError::OperandCount(0))
        );
        assert_eq!(
            decode(
                PredicateKind::Comparison,
                json!({
                    "keyPath": "a",
                    "operator": "equalTo",
                    "numberValue": 1,
                    "stringValue": "1"
                })
            ),
            Err(PredicateError::OperandCount(2))
        );
    }

    #[test]
    fn rejects_incompatible_operand() {
        assert!(matches!(
            decode(
                PredicateKind::Comparison,
                json!({ "keyPath": "a", "operator": "like", "numberValue": 1 })
            ),
            Err(PredicateError::IncompatibleOperand {
                operator: ComparisonOperator::Like,
                ..
            })
        ));
    }

    #[test]
    fn rejects_misaligned_children() {
        assert_eq!(
            decode(
                PredicateKind::Compound,
                json!({
                    "booleanOperator": "and",
                    "predicateTypes": ["comparison", "comparison"],
                    "predicates": [{ "keyPath": "a", "operator": "equalTo", "numberValue": 1 }]
                })
            ),
            Err(PredicateError::ChildCountMismatch {
                types: 2,
                children: 1
            })
        );
    }

    #[test]
    fn rejects_unknown_discriminant() {
        assert!(matches!(
            decode(
                PredicateKind::Compound,
                json!({
                    "booleanOperator": "and",
                    "predicateTypes": ["regex"],
                    "predicates": [{}]
                })
            ),
            Err(PredicateError::InvalidPayload {
                kind: PredicateKind::Compound,
                ..
            })
        ));
    }

    #[test]
    fn child_kind_follows_discriminant() {
        // A comparison payload under a "compound" discriminant is rejected, not sniffed.
        assert!(matches!(
            decode(
                PredicateKind::Compound,
                json!({
                    "booleanOperator": "and",
                    "predicateTypes": ["compound"],
                    "predicates": [{ "keyPath": "a", "operator": "equalTo", "numberValue": 1 }]
                })
            ),
            Err(PredicateError::InvalidPayload {
                kind: PredicateKind::Compound,
                ..
            })
        ));
    }
}
