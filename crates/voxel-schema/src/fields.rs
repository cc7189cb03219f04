//! Typed reads from canonical JSON objects and order-preserving writes back.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use voxel_core::element::DataDrivenRegistryElement;
use voxel_core::identifier::Identifier;

use crate::analyser::ConvertError;

// ===========================================================================
// Reading
// ===========================================================================

/// Read access to one level of a canonical object, producing
/// [`ConvertError::InvalidShape`] errors that name the element.
#[derive(Clone, Copy)]
pub(crate) struct Fields<'a> {
    obj: &'a Map<String, Value>,
    identifier: &'a Identifier,
    concept: &'static str,
}

impl<'a> Fields<'a> {
    /// The root object of `element`; fails when the data is not an object.
    pub fn root(element: &'a DataDrivenRegistryElement, concept: &'static str) -> Result<Self, ConvertError> {
        match &element.data {
            Value::Object(obj) => Ok(Self {
                obj,
                identifier: &element.identifier,
                concept,
            }),
            other => Err(ConvertError::InvalidShape {
                identifier: element.identifier.to_string(),
                concept,
                detail: format!("expected an object, found {}", kind(other)),
            }),
        }
    }

    /// Same element, another object level.
    pub fn nested(&self, obj: &'a Map<String, Value>) -> Self {
        Self { obj, ..*self }
    }

    pub fn map(&self) -> &'a Map<String, Value> {
        self.obj
    }

    pub fn invalid(&self, detail: impl Into<String>) -> ConvertError {
        ConvertError::InvalidShape {
            identifier: self.identifier.to_string(),
            concept: self.concept,
            detail: detail.into(),
        }
    }

    /// The raw value under `key`; `null` counts as absent.
    pub fn raw(&self, key: &str) -> Option<&'a Value> {
        self.obj.get(key).filter(|v| !v.is_null())
    }

    pub fn optional<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, ConvertError> {
        self.raw(key)
            .map(|v| {
                T::deserialize(v).map_err(|e| self.invalid(format!("field '{key}': {e}")))
            })
            .transpose()
    }

    pub fn required<T: DeserializeOwned>(&self, key: &str) -> Result<T, ConvertError> {
        self.optional(key)?
            .ok_or_else(|| self.invalid(format!("missing required field '{key}'")))
    }

    /// The list under `key`; absent reads as empty.
    pub fn array(&self, key: &str) -> Result<&'a [Value], ConvertError> {
        match self.raw(key) {
            None => Ok(&[]),
            Some(Value::Array(values)) => Ok(values.as_slice()),
            Some(other) => Err(self.invalid(format!(
                "field '{key}': expected a list, found {}",
                kind(other)
            ))),
        }
    }

    /// The object under `key`, if present.
    pub fn object(&self, key: &str) -> Result<Option<Fields<'a>>, ConvertError> {
        match self.raw(key) {
            None => Ok(None),
            Some(Value::Object(obj)) => Ok(Some(self.nested(obj))),
            Some(other) => Err(self.invalid(format!(
                "field '{key}': expected an object, found {}",
                kind(other)
            ))),
        }
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

// ===========================================================================
// Shared shapes
// ===========================================================================

/// A reference field that may hold one value or a list (`"#minecraft:x"` or
/// `["minecraft:a", "minecraft:b"]`). The original shape is kept.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SingleOrMany {
    Single(String),
    Many(Vec<String>),
}

impl SingleOrMany {
    pub fn to_vec(&self) -> Vec<String> {
        match self {
            SingleOrMany::Single(s) => vec![s.clone()],
            SingleOrMany::Many(v) => v.clone(),
        }
    }

    pub fn as_single(&self) -> Option<&str> {
        match self {
            SingleOrMany::Single(s) => Some(s),
            SingleOrMany::Many(_) => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            SingleOrMany::Single(s) => s.is_empty(),
            SingleOrMany::Many(v) => v.is_empty(),
        }
    }
}

impl From<&SingleOrMany> for Value {
    fn from(value: &SingleOrMany) -> Self {
        match value {
            SingleOrMany::Single(s) => Value::String(s.clone()),
            SingleOrMany::Many(v) => Value::from(v.clone()),
        }
    }
}

// ===========================================================================
// Writing
// ===========================================================================

pub(crate) fn insert_opt<V: Into<Value>>(map: &mut Map<String, Value>, key: &str, value: Option<V>) {
    if let Some(value) = value {
        map.insert(key.to_string(), value.into());
    }
}

/// Overlay freshly emitted fields onto `target`.
///
/// Keys listed in `modeled` but absent from `emitted` are removed; emitted
/// keys already present keep their position, new ones are appended.
pub(crate) fn overlay(target: &mut Map<String, Value>, emitted: Map<String, Value>, modeled: &[&str]) {
    for key in modeled {
        if !emitted.contains_key(*key) {
            target.shift_remove(*key);
        }
    }
    for (key, value) in emitted {
        target.insert(key, value);
    }
}

/// Clone of `original` when it is an object, else an empty map.
pub(crate) fn base_object(original: Option<&Value>) -> Map<String, Value> {
    original
        .and_then(Value::as_object)
        .cloned()
        .unwrap_or_default()
}
