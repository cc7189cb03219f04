//! Voxel Actions -- typed edits applied to Voxel elements.
//!
//! An [`Action`] is a serializable command discriminated by its `type`
//! string. Applying one never mutates the input: [`update_data`] returns a
//! new element, or `Ok(None)` when the action does not apply (a missing
//! field, an unmatched `alternative`, an out-of-range ordinal). `Err` is
//! reserved for caller misuse such as an unknown equipment slot or a
//! version-gated action without a version.
//!
//! # Key Types
//!
//! - [`Action`] -- core and per-concept actions.
//! - [`slot::SlotManager`] -- equipment slot algebra.
//! - [`condition::Condition`] / [`renderer::ValueRenderer`] -- rule DSLs
//!   evaluated against an element's JSON view.
//! - [`session::Session`] -- identifier-keyed store with a change log.

pub mod common;
pub mod condition;
pub mod loot_table;
pub mod recipe;
pub mod renderer;
pub mod session;
pub mod slot;
pub mod structure_set;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use voxel_core::element::VoxelElement;

pub use common::CoreAction;
pub use loot_table::LootTableAction;
pub use recipe::RecipeAction;
pub use structure_set::StructureSetAction;
pub use session::Session;
pub use slot::SlotManager;

// ===========================================================================
// Errors
// ===========================================================================

#[derive(Debug, thiserror::Error)]
pub enum ActionError {
    #[error("action '{action}' needs a pack format version")]
    MissingVersion { action: &'static str },

    #[error("pack format {version} has no data-driven slots (needs {minimum} or later)")]
    UnsupportedVersion { version: u32, minimum: u32 },

    #[error("unknown equipment slot '{0}'")]
    InvalidSlot(String),

    #[error("invalid value for '{field}': {detail}")]
    InvalidValue { field: String, detail: String },

    #[error("action '{action}' only applies to {expected} elements")]
    WrongConcept {
        action: &'static str,
        expected: &'static str,
    },

    #[error("action '{action}' produced an invalid element: {detail}")]
    InvalidResult { action: &'static str, detail: String },

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

// ===========================================================================
// Action
// ===========================================================================

/// One atomic edit. Serialized as an object with a `type` discriminator,
/// e.g. `{"type": "set_value", "field": "maxLevel", "value": 5}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Action {
    Core(CoreAction),
    Recipe(RecipeAction),
    StructureSet(StructureSetAction),
    LootTable(LootTableAction),
}

impl Action {
    /// The action's `type` tag.
    pub fn kind(&self) -> &'static str {
        match self {
            Action::Core(a) => a.kind(),
            Action::Recipe(a) => a.kind(),
            Action::StructureSet(a) => a.kind(),
            Action::LootTable(a) => a.kind(),
        }
    }
}

impl From<CoreAction> for Action {
    fn from(action: CoreAction) -> Self {
        Action::Core(action)
    }
}

impl From<RecipeAction> for Action {
    fn from(action: RecipeAction) -> Self {
        Action::Recipe(action)
    }
}

impl From<StructureSetAction> for Action {
    fn from(action: StructureSetAction) -> Self {
        Action::StructureSet(action)
    }
}

impl From<LootTableAction> for Action {
    fn from(action: LootTableAction) -> Self {
        Action::LootTable(action)
    }
}

// ===========================================================================
// Application
// ===========================================================================

/// Apply `action` to the JSON view of an element.
pub fn apply_action(
    action: &Action,
    element: &Map<String, Value>,
    version: Option<u32>,
) -> Result<Option<Map<String, Value>>, ActionError> {
    match action {
        Action::Core(a) => common::apply(a, element, version),
        Action::Recipe(a) => recipe::apply(a, element),
        Action::StructureSet(a) => structure_set::apply(a, element),
        Action::LootTable(a) => loot_table::apply(a, element),
    }
}

/// Apply `action` to a typed element, returning the replacement.
///
/// `version` is the pack format; only slot actions require it.
pub fn update_data<E: VoxelElement>(
    action: &Action,
    element: &E,
    version: Option<u32>,
) -> Result<Option<E>, ActionError> {
    let view = to_map(element)?;
    let Some(updated) = apply_action(action, &view, version)? else {
        log::debug!("{}: '{}' not applied", element.unique_key(), action.kind());
        return Ok(None);
    };
    serde_json::from_value(Value::Object(updated))
        .map(Some)
        .map_err(|e| ActionError::InvalidResult {
            action: action.kind(),
            detail: e.to_string(),
        })
}

// ===========================================================================
// JSON view helpers
// ===========================================================================

pub(crate) fn to_map<T: Serialize>(value: &T) -> Result<Map<String, Value>, ActionError> {
    match serde_json::to_value(value)? {
        Value::Object(map) => Ok(map),
        other => Err(ActionError::InvalidValue {
            field: String::new(),
            detail: format!("expected an object, found {other}"),
        }),
    }
}

/// Read the JSON view as the concept shape a domain action expects.
/// `marker` is a key every view of that concept carries.
pub(crate) fn typed<T: DeserializeOwned>(
    element: &Map<String, Value>,
    action: &'static str,
    expected: &'static str,
    marker: &str,
) -> Result<T, ActionError> {
    if !element.contains_key(marker) {
        return Err(ActionError::WrongConcept { action, expected });
    }
    serde_json::from_value(Value::Object(element.clone()))
        .map_err(|_| ActionError::WrongConcept { action, expected })
}
