//! Derived values read from an element, for labels and computed edits.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use voxel_core::resolver::get_field;

use crate::condition::{Condition, check_condition};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ValueRenderer {
    Hardcoded {
        value: Value,
    },
    FromField {
        field: String,
    },
    Conditional {
        term: Condition,
        on_true: Box<ValueRenderer>,
        on_false: Box<ValueRenderer>,
    },
}

/// Evaluate `renderer`; `None` when it reads a missing field.
pub fn render_value(renderer: &ValueRenderer, element: &Map<String, Value>) -> Option<Value> {
    match renderer {
        ValueRenderer::Hardcoded { value } => Some(value.clone()),
        ValueRenderer::FromField { field } => get_field(element, field).cloned(),
        ValueRenderer::Conditional {
            term,
            on_true,
            on_false,
        } => {
            let branch = if check_condition(term, element) {
                on_true
            } else {
                on_false
            };
            render_value(branch, element)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn renders_each_variant() {
        let element = json!({"weight": 10, "structures": [{"structure": "minecraft:igloo"}]})
            .as_object()
            .unwrap()
            .clone();

        let hardcoded = ValueRenderer::Hardcoded { value: json!("x") };
        assert_eq!(render_value(&hardcoded, &element), Some(json!("x")));

        let field = ValueRenderer::FromField {
            field: "structures.0.structure".into(),
        };
        assert_eq!(render_value(&field, &element), Some(json!("minecraft:igloo")));

        let missing = ValueRenderer::FromField { field: "salt".into() };
        assert_eq!(render_value(&missing, &element), None);

        let conditional: ValueRenderer = serde_json::from_value(json!({
            "type": "conditional",
            "term": {"type": "compare_to_value", "field": "weight", "value": 10},
            "on_true": {"type": "from_field", "field": "weight"},
            "on_false": {"type": "hardcoded", "value": 0}
        }))
        .unwrap();
        assert_eq!(render_value(&conditional, &element), Some(json!(10)));
    }
}
