//! Unknown-field extraction.
//!
//! Every schema parser lists the canonical keys it models. Anything else is
//! split off into an [`UnknownFields`] bag so the compiler can write it back
//! untouched. Extraction works on one object level at a time; parsers nest
//! sub-object bags under the key of the sub-object (e.g. `placement`).

use serde_json::{Map, Value};

use crate::element::UnknownFields;

/// Copy every key of `obj` not listed in `known`.
///
/// Returns `None` rather than an empty map when every key is known.
pub fn extract_unknown_fields(obj: &Map<String, Value>, known: &[&str]) -> Option<UnknownFields> {
    let unknown: UnknownFields = obj
        .iter()
        .filter(|(key, _)| !known.contains(&key.as_str()))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect();

    (!unknown.is_empty()).then_some(unknown)
}

/// Combine a root-level bag with sub-object bags nested under their keys.
///
/// Returns `None` when all inputs are absent.
pub fn nest_unknown_fields(
    root: Option<UnknownFields>,
    nested: impl IntoIterator<Item = (&'static str, Option<UnknownFields>)>,
) -> Option<UnknownFields> {
    let mut combined = root.unwrap_or_default();
    for (key, bag) in nested {
        if let Some(bag) = bag {
            combined.insert(key.to_string(), Value::Object(bag));
        }
    }
    (!combined.is_empty()).then_some(combined)
}

/// Write `unknown` onto `target`, skipping the keys in `nested_keys` (those
/// belong to sub-objects and are merged separately).
pub fn merge_unknown_fields(
    target: &mut Map<String, Value>,
    unknown: Option<&UnknownFields>,
    nested_keys: &[&str],
) {
    let Some(unknown) = unknown else { return };
    for (key, value) in unknown {
        if nested_keys.contains(&key.as_str()) {
            continue;
        }
        target.insert(key.clone(), value.clone());
    }
}

/// The bag stored under `key` in `unknown`, when it is an object.
pub fn nested_unknown<'a>(unknown: Option<&'a UnknownFields>, key: &str) -> Option<&'a UnknownFields> {
    unknown?.get(key)?.as_object()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn obj(v: Value) -> Map<String, Value> {
        v.as_object().cloned().unwrap()
    }

    #[test]
    fn extracts_only_unknown_keys() {
        let o = obj(json!({"weight": 2, "mod:power": 9, "extra": {"a": 1}}));
        let unknown = extract_unknown_fields(&o, &["weight"]).unwrap();
        assert_eq!(unknown.len(), 2);
        assert_eq!(unknown["mod:power"], json!(9));
        assert_eq!(unknown["extra"], json!({"a": 1}));
    }

    #[test]
    fn returns_none_when_everything_is_known() {
        let o = obj(json!({"weight": 2}));
        assert!(extract_unknown_fields(&o, &["weight", "other"]).is_none());
        assert!(extract_unknown_fields(&Map::new(), &[]).is_none());
    }

    #[test]
    fn nests_sub_object_bags() {
        let root = Some(obj(json!({"comment": "x"})));
        let placement = Some(obj(json!({"mod_field": true})));
        let combined = nest_unknown_fields(root, [("placement", placement), ("other", None)]).unwrap();
        assert_eq!(combined["comment"], json!("x"));
        assert_eq!(combined["placement"], json!({"mod_field": true}));
        assert!(!combined.contains_key("other"));

        assert!(nest_unknown_fields(None, [("placement", None)]).is_none());
    }

    #[test]
    fn merge_skips_nested_keys() {
        let unknown = obj(json!({"comment": "x", "placement": {"mod_field": true}}));
        let mut target = Map::new();
        merge_unknown_fields(&mut target, Some(&unknown), &["placement"]);
        assert_eq!(Value::Object(target), json!({"comment": "x"}));

        assert_eq!(
            nested_unknown(Some(&unknown), "placement").unwrap()["mod_field"],
            json!(true)
        );
        assert!(nested_unknown(Some(&unknown), "comment").is_none());
    }
}
