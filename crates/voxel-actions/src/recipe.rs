//! Recipe slot editing.
//!
//! Slots are addressed by decimal index: `row * 3 + col` on the crafting
//! grid, insertion order for shapeless recipes, and the kind's named inputs
//! (`template`, `base`, `addition`, ...) in declaration order otherwise.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use voxel_core::identifier::normalize_reference;
use voxel_schema::recipe::{RecipeKind, RecipeProps, TypeSpecific};

use crate::{ActionError, to_map, typed};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RecipeAction {
    /// Add `items` to a slot, or replace its contents when `replace` is set.
    AddIngredient {
        slot: String,
        items: Vec<String>,
        #[serde(default)]
        replace: bool,
    },
    /// Remove `items` from a slot, or empty the slot when `items` is absent.
    RemoveIngredient {
        slot: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        items: Option<Vec<String>>,
    },
    /// Put `items` in the first free slot of a shapeless recipe.
    AddShapelessIngredient { items: Vec<String> },
    ClearSlot { slot: String },
    RemoveItemEverywhere { items: Vec<String> },
    /// Swap one item for another in every slot and the result.
    ReplaceItemEverywhere { from: String, to: String },
    /// Change the recipe type, optionally carrying ingredients over in slot order.
    ConvertRecipeType {
        new_type: String,
        #[serde(default)]
        preserve_ingredients: bool,
    },
}

impl RecipeAction {
    pub fn kind(&self) -> &'static str {
        match self {
            RecipeAction::AddIngredient { .. } => "add_ingredient",
            RecipeAction::RemoveIngredient { .. } => "remove_ingredient",
            RecipeAction::AddShapelessIngredient { .. } => "add_shapeless_ingredient",
            RecipeAction::ClearSlot { .. } => "clear_slot",
            RecipeAction::RemoveItemEverywhere { .. } => "remove_item_everywhere",
            RecipeAction::ReplaceItemEverywhere { .. } => "replace_item_everywhere",
            RecipeAction::ConvertRecipeType { .. } => "convert_recipe_type",
        }
    }
}

pub(crate) fn apply(
    action: &RecipeAction,
    element: &Map<String, Value>,
) -> Result<Option<Map<String, Value>>, ActionError> {
    let mut recipe: RecipeProps = typed(element, action.kind(), "recipe", "slots")?;
    if !modify(action, &mut recipe) {
        return Ok(None);
    }
    to_map(&recipe).map(Some)
}

/// Apply the edit in place; `false` when it does not apply or changes nothing.
fn modify(action: &RecipeAction, recipe: &mut RecipeProps) -> bool {
    match action {
        RecipeAction::AddIngredient {
            slot,
            items,
            replace,
        } => {
            let Some(key) = slot_key(recipe, slot) else {
                return false;
            };
            if items.is_empty() {
                return false;
            }
            let current = recipe.slots.entry(key).or_default();
            let before = current.clone();
            if *replace {
                current.clear();
            }
            for item in items {
                if !current.contains(item) {
                    current.push(item.clone());
                }
            }
            *current != before
        }
        RecipeAction::RemoveIngredient { slot, items } => {
            let Some(key) = slot_key(recipe, slot) else {
                return false;
            };
            let Some(current) = recipe.slots.get_mut(&key) else {
                return false;
            };
            let removed = match items {
                None => {
                    current.clear();
                    true
                }
                Some(items) => {
                    let before = current.len();
                    current.retain(|i| !items.contains(i));
                    current.len() != before
                }
            };
            if current.is_empty() {
                recipe.slots.remove(&key);
            }
            removed
        }
        RecipeAction::AddShapelessIngredient { items } => {
            if recipe.kind() != RecipeKind::Shapeless || items.is_empty() {
                return false;
            }
            let free = (0..recipe.kind().slot_count())
                .map(|i| i.to_string())
                .find(|k| recipe.slots.get(k).is_none_or(|v| v.is_empty()));
            match free {
                Some(key) => {
                    recipe.slots.insert(key, dedup(items));
                    true
                }
                None => false,
            }
        }
        RecipeAction::ClearSlot { slot } => match slot_key(recipe, slot) {
            Some(key) => recipe.slots.remove(&key).is_some(),
            None => false,
        },
        RecipeAction::RemoveItemEverywhere { items } => {
            let mut changed = false;
            for current in recipe.slots.values_mut() {
                let before = current.len();
                current.retain(|i| !items.contains(i));
                changed |= current.len() != before;
            }
            recipe.slots.retain(|_, v| !v.is_empty());
            changed
        }
        RecipeAction::ReplaceItemEverywhere { from, to } => {
            if from == to {
                return false;
            }
            let mut changed = false;
            for current in recipe.slots.values_mut() {
                if let Some(i) = current.iter().position(|item| item == from) {
                    if current.contains(to) {
                        current.remove(i);
                    } else {
                        current[i] = to.clone();
                    }
                    changed = true;
                }
            }
            if let Some(result) = recipe.result.as_mut().filter(|r| r.item == *from) {
                result.item = to.clone();
                changed = true;
            }
            changed
        }
        RecipeAction::ConvertRecipeType {
            new_type,
            preserve_ingredients,
        } => {
            if normalize_reference(new_type) == normalize_reference(&recipe.recipe_type) {
                return false;
            }
            let target = RecipeKind::of(new_type);
            let ingredients: Vec<Vec<String>> = recipe
                .sorted_slots()
                .into_iter()
                .map(|(_, items)| items.to_vec())
                .collect();

            recipe.slots = if *preserve_ingredients {
                ingredients
                    .into_iter()
                    .take(target.slot_count())
                    .enumerate()
                    .map(|(i, items)| (i.to_string(), items))
                    .collect()
            } else {
                BTreeMap::new()
            };
            recipe.recipe_type = new_type.clone();
            recipe.grid_size = None;
            recipe.type_specific = recipe
                .type_specific
                .take()
                .and_then(|specific| retain_specific(specific, target));
            true
        }
    }
}

/// Canonical key for a slot index valid in this recipe kind.
fn slot_key(recipe: &RecipeProps, slot: &str) -> Option<String> {
    let index: usize = slot.parse().ok()?;
    (index < recipe.kind().slot_count()).then(|| index.to_string())
}

fn dedup(items: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(items.len());
    for item in items {
        if !out.contains(item) {
            out.push(item.clone());
        }
    }
    out
}

/// Keep the type-specific fields the target kind still uses.
fn retain_specific(specific: TypeSpecific, target: RecipeKind) -> Option<TypeSpecific> {
    let kept = match target {
        RecipeKind::Cooking => TypeSpecific {
            trim_pattern: None,
            ..specific
        },
        RecipeKind::SmithingTrim => TypeSpecific {
            cooking_time: None,
            experience: None,
            ..specific
        },
        _ => return None,
    };
    (kept != TypeSpecific::default()).then_some(kept)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use voxel_core::element::DataDrivenRegistryElement;
    use voxel_core::identifier::Identifier;
    use voxel_schema::recipe::RecipeAnalyser;
    use voxel_schema::{Analyser, ParserParams};

    fn view(data: Value) -> Map<String, Value> {
        let element = DataDrivenRegistryElement::new(Identifier::of("test:r", "recipe"), data);
        let props = RecipeAnalyser::parse(ParserParams::new(&element)).unwrap();
        to_map(&props).unwrap()
    }

    fn run(action: RecipeAction, element: &Map<String, Value>) -> Option<RecipeProps> {
        apply(&action, element)
            .unwrap()
            .map(|m| serde_json::from_value(Value::Object(m)).unwrap())
    }

    fn items(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    fn shaped() -> Map<String, Value> {
        view(json!({
            "type": "minecraft:crafting_shaped",
            "pattern": ["X", "#"],
            "key": {"X": "minecraft:coal", "#": "minecraft:stick"},
            "result": {"id": "minecraft:torch", "count": 4}
        }))
    }

    fn shapeless() -> Map<String, Value> {
        view(json!({
            "type": "minecraft:crafting_shapeless",
            "ingredients": ["minecraft:iron_ingot", "minecraft:flint"],
            "result": {"id": "minecraft:flint_and_steel"}
        }))
    }

    // -----------------------------------------------------------------------
    // Slot edits
    // -----------------------------------------------------------------------

    #[test]
    fn add_ingredient_appends_or_replaces() {
        let e = shaped();
        let out = run(
            RecipeAction::AddIngredient {
                slot: "0".into(),
                items: items(&["minecraft:charcoal"]),
                replace: false,
            },
            &e,
        )
        .unwrap();
        assert_eq!(out.slots["0"], items(&["minecraft:coal", "minecraft:charcoal"]));

        let out = run(
            RecipeAction::AddIngredient {
                slot: "4".into(),
                items: items(&["#minecraft:planks"]),
                replace: true,
            },
            &e,
        )
        .unwrap();
        assert_eq!(out.slots["4"], items(&["#minecraft:planks"]));
    }

    #[test]
    fn add_ingredient_rejects_bad_slots_and_noops() {
        let e = shaped();
        let add = |slot: &str, v: &[&str]| RecipeAction::AddIngredient {
            slot: slot.into(),
            items: items(v),
            replace: false,
        };
        assert!(run(add("9", &["minecraft:dirt"]), &e).is_none());
        assert!(run(add("top", &["minecraft:dirt"]), &e).is_none());
        assert!(run(add("0", &[]), &e).is_none());
        assert!(run(add("0", &["minecraft:coal"]), &e).is_none());
    }

    #[test]
    fn remove_ingredient_drops_empty_slots() {
        let e = shaped();
        let out = run(
            RecipeAction::RemoveIngredient {
                slot: "3".into(),
                items: Some(items(&["minecraft:stick"])),
            },
            &e,
        )
        .unwrap();
        assert!(!out.slots.contains_key("3"));

        let out = run(
            RecipeAction::RemoveIngredient {
                slot: "0".into(),
                items: None,
            },
            &e,
        )
        .unwrap();
        assert!(!out.slots.contains_key("0"));

        let missing = RecipeAction::RemoveIngredient {
            slot: "8".into(),
            items: None,
        };
        assert!(run(missing, &e).is_none());
    }

    #[test]
    fn shapeless_fills_first_gap() {
        let e = shapeless();
        let cleared = run(RecipeAction::ClearSlot { slot: "0".into() }, &e).unwrap();
        let cleared = to_map(&cleared).unwrap();
        let out = run(
            RecipeAction::AddShapelessIngredient {
                items: items(&["minecraft:gold_ingot"]),
            },
            &cleared,
        )
        .unwrap();
        assert_eq!(out.slots["0"], items(&["minecraft:gold_ingot"]));
        assert_eq!(out.slots["1"], items(&["minecraft:flint"]));

        let add = RecipeAction::AddShapelessIngredient {
            items: items(&["minecraft:dirt"]),
        };
        assert!(run(add, &shaped()).is_none());
    }

    #[test]
    fn shapeless_grid_can_fill_up() {
        let mut current = shapeless();
        for _ in 0..7 {
            let next = run(
                RecipeAction::AddShapelessIngredient {
                    items: items(&["minecraft:dirt"]),
                },
                &current,
            )
            .unwrap();
            current = to_map(&next).unwrap();
        }
        let full = RecipeAction::AddShapelessIngredient {
            items: items(&["minecraft:dirt"]),
        };
        assert!(run(full, &current).is_none());
    }

    // -----------------------------------------------------------------------
    // Whole-recipe edits
    // -----------------------------------------------------------------------

    #[test]
    fn remove_item_everywhere() {
        let out = run(
            RecipeAction::RemoveItemEverywhere {
                items: items(&["minecraft:stick"]),
            },
            &shaped(),
        )
        .unwrap();
        assert_eq!(out.slots.len(), 1);

        let none = RecipeAction::RemoveItemEverywhere {
            items: items(&["minecraft:bedrock"]),
        };
        assert!(run(none, &shaped()).is_none());
    }

    #[test]
    fn replace_item_everywhere_includes_result() {
        let out = run(
            RecipeAction::ReplaceItemEverywhere {
                from: "minecraft:torch".into(),
                to: "minecraft:soul_torch".into(),
            },
            &shaped(),
        )
        .unwrap();
        assert_eq!(out.result.unwrap().item, "minecraft:soul_torch");

        let out = run(
            RecipeAction::ReplaceItemEverywhere {
                from: "minecraft:coal".into(),
                to: "minecraft:stick".into(),
            },
            &shaped(),
        )
        .unwrap();
        assert_eq!(out.slots["0"], items(&["minecraft:stick"]));
    }

    #[test]
    fn convert_shaped_to_smelting_keeps_first_slot() {
        let out = run(
            RecipeAction::ConvertRecipeType {
                new_type: "minecraft:smelting".into(),
                preserve_ingredients: true,
            },
            &shaped(),
        )
        .unwrap();
        assert_eq!(out.kind(), RecipeKind::Cooking);
        assert_eq!(out.slots.len(), 1);
        assert_eq!(out.slots["0"], items(&["minecraft:coal"]));
        assert!(out.grid_size.is_none());
    }

    #[test]
    fn convert_without_preserving_clears_slots() {
        let smelting = view(json!({
            "type": "minecraft:smelting",
            "ingredient": "minecraft:iron_ore",
            "result": {"id": "minecraft:iron_ingot"},
            "cookingtime": 200,
            "experience": 0.7
        }));
        let out = run(
            RecipeAction::ConvertRecipeType {
                new_type: "minecraft:blasting".into(),
                preserve_ingredients: false,
            },
            &smelting,
        )
        .unwrap();
        assert!(out.slots.is_empty());
        assert_eq!(out.type_specific.unwrap().cooking_time, Some(200));

        let out = run(
            RecipeAction::ConvertRecipeType {
                new_type: "minecraft:stonecutting".into(),
                preserve_ingredients: true,
            },
            &smelting,
        )
        .unwrap();
        assert!(out.type_specific.is_none());

        let same = RecipeAction::ConvertRecipeType {
            new_type: "smelting".into(),
            preserve_ingredients: true,
        };
        assert!(run(same, &smelting).is_none());
    }

    #[test]
    fn recipe_actions_reject_other_concepts() {
        let structure_set = json!({"identifier": {"namespace": "a", "registry": "b", "resource": "c"}})
            .as_object()
            .unwrap()
            .clone();
        assert!(matches!(
            apply(&RecipeAction::ClearSlot { slot: "0".into() }, &structure_set),
            Err(ActionError::WrongConcept { expected: "recipe", .. })
        ));
    }
}
