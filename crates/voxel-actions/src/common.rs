//! Structural actions that work on any element through dotted field paths.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use voxel_core::resolver::{get_field, remove_field, set_field};

use crate::renderer::{ValueRenderer, render_value};
use crate::slot::SlotManager;
use crate::{Action, ActionError, apply_action};

// ===========================================================================
// Action definitions
// ===========================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CoreAction {
    /// Replace the field with a literal.
    SetValue { field: String, value: Value },
    /// Replace the field with a value derived from the element.
    SetComputedValue { field: String, value: ValueRenderer },
    /// Remove the field.
    SetUndefined { field: String },
    /// Remove the field when it equals `value`, otherwise set it.
    ToggleValue { field: String, value: Value },
    /// Remove `value` from a list field when present, otherwise append it.
    ToggleValueInList {
        field: String,
        value: Value,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        mode: Vec<ToggleMode>,
    },
    /// Remove every value when all are present, otherwise add the missing ones.
    ToggleAllValuesInList { field: String, values: Vec<Value> },
    /// Remove one key from an object field.
    RemoveKey { field: String, key: String },
    /// Toggle an equipment slot in a slot list field. Needs a version.
    SetComputedSlot { field: String, slot: String },
    /// Apply each action to the previous result; any rejection rejects all.
    Sequential { actions: Vec<Action> },
    /// Apply the action of the case whose `when` equals the field.
    Alternative { field: String, cases: Vec<Case> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToggleMode {
    /// A scalar field becomes a one-element list of the new value.
    Override,
    /// Remove the field instead of leaving an empty list.
    RemoveIfEmpty,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Case {
    pub when: Value,
    #[serde(rename = "do")]
    pub action: Action,
}

impl CoreAction {
    pub fn kind(&self) -> &'static str {
        match self {
            CoreAction::SetValue { .. } => "set_value",
            CoreAction::SetComputedValue { .. } => "set_computed_value",
            CoreAction::SetUndefined { .. } => "set_undefined",
            CoreAction::ToggleValue { .. } => "toggle_value",
            CoreAction::ToggleValueInList { .. } => "toggle_value_in_list",
            CoreAction::ToggleAllValuesInList { .. } => "toggle_all_values_in_list",
            CoreAction::RemoveKey { .. } => "remove_key",
            CoreAction::SetComputedSlot { .. } => "set_computed_slot",
            CoreAction::Sequential { .. } => "sequential",
            CoreAction::Alternative { .. } => "alternative",
        }
    }
}

// ===========================================================================
// Application
// ===========================================================================

pub(crate) fn apply(
    action: &CoreAction,
    element: &Map<String, Value>,
    version: Option<u32>,
) -> Result<Option<Map<String, Value>>, ActionError> {
    match action {
        CoreAction::SetValue { field, value } => Ok(with_field(element, field, value.clone())),
        CoreAction::SetComputedValue { field, value } => Ok(render_value(value, element)
            .and_then(|rendered| with_field(element, field, rendered))),
        CoreAction::SetUndefined { field } => Ok(without_field(element, field)),
        CoreAction::ToggleValue { field, value } => {
            if get_field(element, field) == Some(value) {
                Ok(without_field(element, field))
            } else {
                Ok(with_field(element, field, value.clone()))
            }
        }
        CoreAction::ToggleValueInList { field, value, mode } => {
            Ok(toggle_in_list(element, field, value, mode))
        }
        CoreAction::ToggleAllValuesInList { field, values } => {
            Ok(toggle_all_in_list(element, field, values))
        }
        CoreAction::RemoveKey { field, key } => {
            let Some(Value::Object(object)) = get_field(element, field) else {
                return Ok(None);
            };
            let mut object = object.clone();
            if object.shift_remove(key).is_none() {
                return Ok(None);
            }
            Ok(with_field(element, field, Value::Object(object)))
        }
        CoreAction::SetComputedSlot { field, slot } => {
            let version = version.ok_or(ActionError::MissingVersion {
                action: action.kind(),
            })?;
            let manager = SlotManager::new(version)?;
            let current = string_list(element, field)?;
            let next = manager.toggle_slot(&current, slot)?;
            Ok(with_field(element, field, Value::from(next)))
        }
        CoreAction::Sequential { actions } => {
            let mut current = element.clone();
            for (i, step) in actions.iter().enumerate() {
                match apply_action(step, &current, version)? {
                    Some(next) => current = next,
                    None => {
                        log::debug!("sequential: step {i} ('{}') rejected, sequence aborted", step.kind());
                        return Ok(None);
                    }
                }
            }
            Ok(Some(current))
        }
        CoreAction::Alternative { field, cases } => {
            let Some(current) = get_field(element, field) else {
                return Ok(None);
            };
            match cases.iter().find(|case| &case.when == current) {
                Some(case) => apply_action(&case.action, element, version),
                None => Ok(None),
            }
        }
    }
}

/// Copy of `element` with `value` at `field`; `None` when the path is unwritable.
fn with_field(element: &Map<String, Value>, field: &str, value: Value) -> Option<Map<String, Value>> {
    let mut out = element.clone();
    set_field(&mut out, field, value).then_some(out)
}

fn without_field(element: &Map<String, Value>, field: &str) -> Option<Map<String, Value>> {
    let mut out = element.clone();
    remove_field(&mut out, field).map(|_| out)
}

fn toggle_in_list(
    element: &Map<String, Value>,
    field: &str,
    value: &Value,
    mode: &[ToggleMode],
) -> Option<Map<String, Value>> {
    let mut items = match get_field(element, field) {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => items.clone(),
        Some(_) if mode.contains(&ToggleMode::Override) => {
            return with_field(element, field, Value::Array(vec![value.clone()]));
        }
        Some(scalar) => vec![scalar.clone()],
    };

    match items.iter().position(|item| item == value) {
        Some(i) => {
            items.remove(i);
        }
        None => items.push(value.clone()),
    }

    if items.is_empty() && mode.contains(&ToggleMode::RemoveIfEmpty) {
        let mut out = element.clone();
        remove_field(&mut out, field);
        return Some(out);
    }
    with_field(element, field, Value::Array(items))
}

fn toggle_all_in_list(
    element: &Map<String, Value>,
    field: &str,
    values: &[Value],
) -> Option<Map<String, Value>> {
    let mut items = match get_field(element, field) {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => items.clone(),
        Some(_) => return None,
    };

    if values.iter().all(|v| items.contains(v)) {
        items.retain(|item| !values.contains(item));
    } else {
        for v in values {
            if !items.contains(v) {
                items.push(v.clone());
            }
        }
    }
    with_field(element, field, Value::Array(items))
}

fn string_list(element: &Map<String, Value>, field: &str) -> Result<Vec<String>, ActionError> {
    match get_field(element, field) {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::String(s)) => Ok(vec![s.clone()]),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| {
                item.as_str()
                    .map(str::to_string)
                    .ok_or_else(|| ActionError::InvalidSlot(item.to_string()))
            })
            .collect(),
        Some(other) => Err(ActionError::InvalidValue {
            field: field.to_string(),
            detail: format!("expected a slot list, found {other}"),
        }),
    }
}
