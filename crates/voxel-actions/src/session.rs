//! Editor session store.
//!
//! A [`Session`] owns the parsed elements of one concept, keyed by unique
//! key, plus the current selection and pack version. Actions replace
//! entries wholesale; every effective edit is diffed into the change log.

use std::collections::BTreeMap;

use serde_json::Value;
use voxel_core::element::VoxelElement;
use voxel_core::logger::ChangeLogger;
use voxel_schema::SessionConfig;

use crate::{Action, ActionError, update_data};

// ===========================================================================
// Session
// ===========================================================================

#[derive(Debug, Clone)]
pub struct Session<E> {
    elements: BTreeMap<String, E>,
    selected: Option<String>,
    version: Option<u32>,
    logger: ChangeLogger,
}

impl<E: VoxelElement> Session<E> {
    /// Create an empty session with an unbounded change log.
    pub fn new(version: Option<u32>) -> Self {
        Self {
            elements: BTreeMap::new(),
            selected: None,
            version,
            logger: ChangeLogger::new(),
        }
    }

    /// Create an empty session using the configured version and log size.
    pub fn from_config(config: &SessionConfig) -> Self {
        Self {
            logger: ChangeLogger::with_max_entries(config.max_log_entries),
            ..Self::new(config.version)
        }
    }

    pub fn with_elements(mut self, elements: impl IntoIterator<Item = E>) -> Self {
        for element in elements {
            self.insert(element);
        }
        self
    }

    /// Insert or replace an element, returning the previous one.
    pub fn insert(&mut self, element: E) -> Option<E> {
        self.elements.insert(element.unique_key(), element)
    }

    pub fn remove(&mut self, key: &str) -> Option<E> {
        if self.selected.as_deref() == Some(key) {
            self.selected = None;
        }
        self.elements.remove(key)
    }

    pub fn get(&self, key: &str) -> Option<&E> {
        self.elements.get(key)
    }

    /// Elements in key order.
    pub fn elements(&self) -> impl Iterator<Item = &E> {
        self.elements.values()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.elements.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn version(&self) -> Option<u32> {
        self.version
    }

    pub fn set_version(&mut self, version: Option<u32>) {
        self.version = version;
    }

    /// Select an element for [`Session::handle_change`]. Unknown keys leave
    /// the selection unchanged.
    pub fn select(&mut self, key: &str) -> bool {
        if !self.elements.contains_key(key) {
            return false;
        }
        self.selected = Some(key.to_string());
        true
    }

    pub fn selected_key(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    pub fn selected(&self) -> Option<&E> {
        self.selected.as_deref().and_then(|key| self.elements.get(key))
    }

    /// Apply `action` to the selected element. Returns whether it changed.
    pub fn handle_change(&mut self, action: &Action) -> Result<bool, ActionError> {
        match self.selected.clone() {
            Some(key) => self.apply(&key, action),
            None => {
                log::debug!("'{}' ignored: nothing selected", action.kind());
                Ok(false)
            }
        }
    }

    /// Apply `action` to the element under `key`.
    pub fn apply(&mut self, key: &str, action: &Action) -> Result<bool, ActionError> {
        Ok(self.apply_actions(key, std::slice::from_ref(action))? == 1)
    }

    /// Apply `actions` in order to the element under `key`, skipping those
    /// that do not apply. An error discards the whole batch. Returns the
    /// number of actions that took effect.
    pub fn apply_actions(&mut self, key: &str, actions: &[Action]) -> Result<usize, ActionError> {
        let Some(original) = self.elements.get(key) else {
            log::debug!("{key}: no such element");
            return Ok(0);
        };

        let mut current = original.clone();
        let mut snapshots: Vec<(&'static str, Value, Value)> = Vec::new();
        for action in actions {
            if let Some(updated) = update_data(action, &current, self.version)? {
                let before = serde_json::to_value(&current)?;
                let after = serde_json::to_value(&updated)?;
                snapshots.push((action.kind(), before, after));
                current = updated;
            }
        }

        let applied = snapshots.len();
        if applied > 0 {
            for (kind, before, after) in &snapshots {
                self.logger.record(key, kind, before, after);
            }
            self.elements.insert(key.to_string(), current);
        }
        Ok(applied)
    }

    pub fn logger(&self) -> &ChangeLogger {
        &self.logger
    }

    pub fn logger_mut(&mut self) -> &mut ChangeLogger {
        &mut self.logger
    }

    /// Consume the session, returning its elements in key order.
    pub fn into_elements(self) -> Vec<E> {
        self.elements.into_values().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CoreAction;
    use crate::common::Case;
    use serde_json::json;
    use voxel_core::element::DataDrivenRegistryElement;
    use voxel_core::identifier::Identifier;
    use voxel_schema::enchantment::{EnchantmentAnalyser, EnchantmentProps};
    use voxel_schema::{Analyser, ParserParams};

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    fn enchantment(id: &str) -> EnchantmentProps {
        let element = DataDrivenRegistryElement::new(
            Identifier::of(id, "enchantment"),
            json!({
                "description": {"translate": "enchantment.test"},
                "supported_items": "#minecraft:enchantable/sword",
                "weight": 10,
                "max_level": 5,
                "min_cost": {"base": 1, "per_level_above_first": 11},
                "max_cost": {"base": 21, "per_level_above_first": 11},
                "anvil_cost": 1,
                "slots": ["mainhand"],
                "effects": {"minecraft:damage": []}
            }),
        );
        EnchantmentAnalyser::parse(ParserParams::new(&element)).unwrap()
    }

    fn session() -> Session<EnchantmentProps> {
        Session::new(Some(61))
            .with_elements([enchantment("minecraft:sharpness"), enchantment("minecraft:smite")])
    }

    fn set(field: &str, value: serde_json::Value) -> Action {
        CoreAction::SetValue {
            field: field.into(),
            value,
        }
        .into()
    }

    const SHARPNESS: &str = "minecraft:sharpness$enchantment";

    // -----------------------------------------------------------------------
    // Store
    // -----------------------------------------------------------------------

    #[test]
    fn elements_are_keyed_by_unique_key() {
        let s = session();
        assert_eq!(s.len(), 2);
        assert_eq!(
            s.keys().collect::<Vec<_>>(),
            vec![SHARPNESS, "minecraft:smite$enchantment"]
        );
    }

    #[test]
    fn selection_follows_known_keys() {
        let mut s = session();
        assert!(!s.select("minecraft:nope$enchantment"));
        assert!(s.selected().is_none());
        assert!(s.select(SHARPNESS));
        assert_eq!(s.selected().unwrap().max_level, 5);
        s.remove(SHARPNESS);
        assert!(s.selected_key().is_none());
    }

    // -----------------------------------------------------------------------
    // Edits
    // -----------------------------------------------------------------------

    #[test]
    fn handle_change_replaces_selected_and_logs() {
        let mut s = session();
        assert!(!s.handle_change(&set("maxLevel", json!(3))).unwrap());

        s.select(SHARPNESS);
        assert!(s.handle_change(&set("maxLevel", json!(3))).unwrap());
        assert_eq!(s.get(SHARPNESS).unwrap().max_level, 3);
        assert_eq!(s.get("minecraft:smite$enchantment").unwrap().max_level, 5);

        let entries = s.logger().entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].element, SHARPNESS);
        assert_eq!(entries[0].action, "set_value");
        assert_eq!(entries[0].differences[0].path, "maxLevel");
    }

    #[test]
    fn rejected_actions_leave_state_alone() {
        let mut s = session();
        let before = s.get(SHARPNESS).cloned();
        let unmatched: Action = CoreAction::Alternative {
            field: "mode".into(),
            cases: vec![Case {
                when: json!("only_creative"),
                action: set("weight", json!(1)),
            }],
        }
        .into();
        assert!(!s.apply(SHARPNESS, &unmatched).unwrap());
        assert_eq!(s.get(SHARPNESS).cloned(), before);
        assert!(s.logger().is_empty());
    }

    #[test]
    fn batch_counts_effective_actions() {
        let mut s = session();
        let actions = vec![
            set("weight", json!(2)),
            CoreAction::SetUndefined {
                field: "nothingHere".into(),
            }
            .into(),
            CoreAction::SetComputedSlot {
                field: "slots".into(),
                slot: "offhand".into(),
            }
            .into(),
        ];
        assert_eq!(s.apply_actions(SHARPNESS, &actions).unwrap(), 2);
        let e = s.get(SHARPNESS).unwrap();
        assert_eq!(e.weight, 2);
        assert_eq!(e.slots, vec!["hand"]);
        assert_eq!(s.logger().len(), 2);
    }

    #[test]
    fn batch_errors_discard_everything() {
        let mut s = Session::new(None)
            .with_elements([enchantment("minecraft:sharpness")]);
        let actions = vec![
            set("weight", json!(2)),
            CoreAction::SetComputedSlot {
                field: "slots".into(),
                slot: "head".into(),
            }
            .into(),
        ];
        assert!(matches!(
            s.apply_actions(SHARPNESS, &actions),
            Err(ActionError::MissingVersion { .. })
        ));
        assert_eq!(s.get(SHARPNESS).unwrap().weight, 10);
        assert!(s.logger().is_empty());
    }

    #[test]
    fn invalid_results_are_errors() {
        let mut s = session();
        let err = s.apply(SHARPNESS, &set("maxLevel", json!("five"))).unwrap_err();
        assert!(matches!(err, ActionError::InvalidResult { action: "set_value", .. }));
        assert_eq!(s.get(SHARPNESS).unwrap().max_level, 5);
    }

    #[test]
    fn config_bounds_the_log() {
        let config = SessionConfig {
            max_log_entries: 1,
            ..SessionConfig::default()
        };
        let mut s = Session::from_config(&config).with_elements([enchantment("minecraft:sharpness")]);
        s.apply(SHARPNESS, &set("weight", json!(1))).unwrap();
        s.apply(SHARPNESS, &set("weight", json!(2))).unwrap();
        assert_eq!(s.logger().len(), 1);
        assert_eq!(s.logger().entries()[0].sequence, 1);
        assert_eq!(s.version(), Some(61));
    }
}
