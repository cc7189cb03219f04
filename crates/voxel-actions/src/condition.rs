//! Predicates over an element's JSON view, used for visibility and locks.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use voxel_core::resolver::{get_field, has_field};

/// A predicate evaluated against an element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Condition {
    /// The field equals `value`. A missing field only equals `null`.
    CompareToValue { field: String, value: Value },
    /// The field is missing or `null`.
    IfFieldIsUndefined { field: String },
    /// A list field holds at least one of `values`; a scalar field is one of them.
    ContainsInList { field: String, values: Vec<Value> },
    AllOf { terms: Vec<Condition> },
    AnyOf { terms: Vec<Condition> },
    Inverted { term: Box<Condition> },
}

pub fn check_condition(condition: &Condition, element: &Map<String, Value>) -> bool {
    match condition {
        Condition::CompareToValue { field, value } => {
            get_field(element, field).unwrap_or(&Value::Null) == value
        }
        Condition::IfFieldIsUndefined { field } => !has_field(element, field),
        Condition::ContainsInList { field, values } => match get_field(element, field) {
            Some(Value::Array(items)) => items.iter().any(|item| values.contains(item)),
            Some(Value::Null) | None => false,
            Some(scalar) => values.contains(scalar),
        },
        Condition::AllOf { terms } => terms.iter().all(|t| check_condition(t, element)),
        Condition::AnyOf { terms } => terms.iter().any(|t| check_condition(t, element)),
        Condition::Inverted { term } => !check_condition(term, element),
    }
}

// ===========================================================================
// Locks
// ===========================================================================

/// Disables an editor control while `when` holds, showing `text`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lock {
    pub when: Condition,
    pub text: String,
}

/// The first lock whose condition holds.
pub fn is_locked<'a>(locks: &'a [Lock], element: &Map<String, Value>) -> Option<&'a Lock> {
    locks.iter().find(|lock| check_condition(&lock.when, element))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn element() -> Map<String, Value> {
        json!({
            "maxLevel": 3,
            "mode": "normal",
            "slots": ["mainhand", "offhand"],
            "exclusiveSet": null,
            "result": {"item": "minecraft:stone", "count": 2}
        })
        .as_object()
        .unwrap()
        .clone()
    }

    #[test]
    fn compare_to_value() {
        let e = element();
        let c = |field: &str, value: Value| Condition::CompareToValue {
            field: field.into(),
            value,
        };
        assert!(check_condition(&c("maxLevel", json!(3)), &e));
        assert!(!check_condition(&c("maxLevel", json!(4)), &e));
        assert!(check_condition(&c("result.count", json!(2)), &e));
        assert!(check_condition(&c("missing", Value::Null), &e));
    }

    #[test]
    fn undefined_includes_null() {
        let e = element();
        let c = |field: &str| Condition::IfFieldIsUndefined { field: field.into() };
        assert!(check_condition(&c("exclusiveSet"), &e));
        assert!(check_condition(&c("nope"), &e));
        assert!(!check_condition(&c("mode"), &e));
    }

    #[test]
    fn contains_in_list_handles_scalars() {
        let e = element();
        let c = |field: &str, values: Vec<Value>| Condition::ContainsInList {
            field: field.into(),
            values,
        };
        assert!(check_condition(&c("slots", vec![json!("offhand")]), &e));
        assert!(!check_condition(&c("slots", vec![json!("head")]), &e));
        assert!(check_condition(&c("mode", vec![json!("soft_delete"), json!("normal")]), &e));
        assert!(!check_condition(&c("exclusiveSet", vec![Value::Null]), &e));
    }

    #[test]
    fn combinators_nest() {
        let e = element();
        let condition: Condition = serde_json::from_value(json!({
            "type": "all_of",
            "terms": [
                {"type": "compare_to_value", "field": "mode", "value": "normal"},
                {"type": "inverted", "term": {
                    "type": "any_of",
                    "terms": [
                        {"type": "if_field_is_undefined", "field": "maxLevel"},
                        {"type": "contains_in_list", "field": "slots", "values": ["head"]}
                    ]
                }}
            ]
        }))
        .unwrap();
        assert!(check_condition(&condition, &e));
    }

    #[test]
    fn first_matching_lock_wins() {
        let e = element();
        let locks = vec![
            Lock {
                when: Condition::CompareToValue {
                    field: "mode".into(),
                    value: json!("soft_delete"),
                },
                text: "deleted".into(),
            },
            Lock {
                when: Condition::IfFieldIsUndefined {
                    field: "exclusiveSet".into(),
                },
                text: "no exclusive set".into(),
            },
        ];
        assert_eq!(is_locked(&locks, &e).map(|l| l.text.as_str()), Some("no exclusive set"));
        assert!(is_locked(&locks[..1], &e).is_none());
    }
}
