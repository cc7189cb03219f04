//! Loot table pool and entry editing.
//!
//! Items and groups keep the `item_N` / `group_N` ids assigned at parse
//! time; new items take the next free id. Pools are addressed by index.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use voxel_core::resolver::set_field;
use voxel_schema::loot_table::{LootItem, LootPool, LootTableProps};

use crate::{ActionError, to_map, typed};

/// Fields of a new loot entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewLootItem {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entry_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quality: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LootTableAction {
    /// Append an entry to the end of a pool.
    AddLootItem { pool_index: usize, item: NewLootItem },
    /// Remove an item and every group reference to it.
    RemoveLootItem { item_id: String },
    /// Set one camelCase property of an item; nested paths are allowed.
    ModifyLootItem {
        item_id: String,
        property: String,
        value: Value,
    },
    AddLootPool {
        #[serde(default = "default_rolls")]
        rolls: Value,
    },
    /// Remove a pool with its entries; later pools shift down.
    RemoveLootPool { pool_index: usize },
}

fn default_rolls() -> Value {
    json!(1)
}

impl LootTableAction {
    pub fn kind(&self) -> &'static str {
        match self {
            LootTableAction::AddLootItem { .. } => "add_loot_item",
            LootTableAction::RemoveLootItem { .. } => "remove_loot_item",
            LootTableAction::ModifyLootItem { .. } => "modify_loot_item",
            LootTableAction::AddLootPool { .. } => "add_loot_pool",
            LootTableAction::RemoveLootPool { .. } => "remove_loot_pool",
        }
    }
}

pub(crate) fn apply(
    action: &LootTableAction,
    element: &Map<String, Value>,
) -> Result<Option<Map<String, Value>>, ActionError> {
    let mut table: LootTableProps = typed(element, action.kind(), "loot table", "pools")?;
    if !modify(action, &mut table)? {
        return Ok(None);
    }
    to_map(&table).map(Some)
}

fn modify(action: &LootTableAction, table: &mut LootTableProps) -> Result<bool, ActionError> {
    match action {
        LootTableAction::AddLootItem { pool_index, item } => {
            if *pool_index >= table.pools.len() {
                return Ok(false);
            }
            let entry_index = next_entry_index(table, *pool_index);
            let mut entry = LootItem::new(table.next_item_id(), *pool_index, entry_index, &item.name);
            if let Some(entry_type) = &item.entry_type {
                entry.entry_type = entry_type.clone();
            }
            entry.weight = item.weight;
            entry.quality = item.quality;
            table.items.push(entry);
            Ok(true)
        }
        LootTableAction::RemoveLootItem { item_id } => {
            let before = table.items.len();
            table.items.retain(|i| i.id != *item_id);
            if table.items.len() == before {
                return Ok(false);
            }
            for group in &mut table.groups {
                group.children.retain(|c| c != item_id);
            }
            Ok(true)
        }
        LootTableAction::ModifyLootItem {
            item_id,
            property,
            value,
        } => {
            if property == "id" {
                return Ok(false);
            }
            let Some(item) = table.items.iter_mut().find(|i| i.id == *item_id) else {
                return Ok(false);
            };
            let mut view = to_map(&*item)?;
            if !set_field(&mut view, property, value.clone()) {
                return Ok(false);
            }
            *item = serde_json::from_value(Value::Object(view)).map_err(|e| {
                ActionError::InvalidValue {
                    field: property.clone(),
                    detail: e.to_string(),
                }
            })?;
            Ok(true)
        }
        LootTableAction::AddLootPool { rolls } => {
            table.pools.push(LootPool::new(rolls.clone()));
            Ok(true)
        }
        LootTableAction::RemoveLootPool { pool_index } => {
            if *pool_index >= table.pools.len() {
                return Ok(false);
            }
            table.pools.remove(*pool_index);

            let removed: HashSet<String> = table
                .items
                .iter()
                .filter(|i| i.pool_index == *pool_index)
                .map(|i| i.id.clone())
                .chain(
                    table
                        .groups
                        .iter()
                        .filter(|g| g.pool_index == *pool_index)
                        .map(|g| g.id.clone()),
                )
                .collect();
            table.items.retain(|i| !removed.contains(&i.id));
            table.groups.retain(|g| !removed.contains(&g.id));

            for item in &mut table.items {
                if item.pool_index > *pool_index {
                    item.pool_index -= 1;
                }
            }
            for group in &mut table.groups {
                if group.pool_index > *pool_index {
                    group.pool_index -= 1;
                }
                group.children.retain(|c| !removed.contains(c));
            }
            Ok(true)
        }
    }
}

/// Position after the last top-level entry of a pool.
fn next_entry_index(table: &LootTableProps, pool_index: usize) -> usize {
    let nested: HashSet<&str> = table
        .groups
        .iter()
        .flat_map(|g| g.children.iter().map(String::as_str))
        .collect();
    table
        .items
        .iter()
        .map(|i| (i.id.as_str(), i.pool_index, i.entry_index))
        .chain(
            table
                .groups
                .iter()
                .map(|g| (g.id.as_str(), g.pool_index, g.entry_index)),
        )
        .filter(|(id, pool, _)| *pool == pool_index && !nested.contains(id))
        .map(|(_, _, entry)| entry + 1)
        .max()
        .unwrap_or(0)
}
