//! Loot table schema.
//!
//! Pool entries are flattened into two lists: leaf entries become `items`
//! (`item_N`) and composite entries become `groups` (`group_N`) that list
//! their children by id. Ids are ordinal, assigned in document order.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use voxel_core::element::{
    CompiledElement, ConfiguratorOverride, DataDrivenRegistryElement, UnknownFields, VoxelElement,
};
use voxel_core::identifier::{Identifier, normalize_reference, tags_to_identifiers};
use voxel_core::unknown::{extract_unknown_fields, merge_unknown_fields};

use crate::analyser::{Analyser, Concept, ConvertError, ParserParams};
use crate::fields::{Fields, base_object, insert_opt, overlay};

const ROOT_FIELDS: [&str; 4] = ["type", "random_sequence", "functions", "pools"];

const POOL_FIELDS: [&str; 5] = ["rolls", "bonus_rolls", "conditions", "functions", "entries"];

const ENTRY_FIELDS: [&str; 9] = [
    "type",
    "name",
    "value",
    "weight",
    "quality",
    "conditions",
    "functions",
    "expand",
    "children",
];

/// Entry types whose `children` are other entries.
pub const COMPOSITE_TYPES: [&str; 3] = [
    "minecraft:alternatives",
    "minecraft:group",
    "minecraft:sequence",
];

pub fn is_composite(entry_type: &str) -> bool {
    COMPOSITE_TYPES.contains(&normalize_reference(entry_type).as_str())
}

// ===========================================================================
// Voxel shape
// ===========================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LootPool {
    /// Number provider; kept as raw JSON.
    pub rolls: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bonus_rolls: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conditions: Option<Vec<Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub functions: Option<Vec<Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unknown_fields: Option<UnknownFields>,
}

impl LootPool {
    pub fn new(rolls: Value) -> Self {
        Self {
            rolls,
            bonus_rolls: None,
            conditions: None,
            functions: None,
            unknown_fields: None,
        }
    }
}

/// A leaf entry (`item`, `tag`, `loot_table`, `dynamic`, `empty`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LootItem {
    pub id: String,
    pub pool_index: usize,
    /// Position within the pool, or within the parent group.
    pub entry_index: usize,
    pub entry_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// `loot_table` entries reference a table by id or inline it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quality: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conditions: Option<Vec<Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub functions: Option<Vec<Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expand: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unknown_fields: Option<UnknownFields>,
}

impl LootItem {
    pub fn new(id: String, pool_index: usize, entry_index: usize, name: &str) -> Self {
        Self {
            id,
            pool_index,
            entry_index,
            entry_type: "minecraft:item".into(),
            name: Some(name.to_string()),
            value: None,
            weight: None,
            quality: None,
            conditions: None,
            functions: None,
            expand: None,
            unknown_fields: None,
        }
    }
}

/// A composite entry (`alternatives`, `group`, `sequence`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LootGroup {
    pub id: String,
    pub pool_index: usize,
    pub entry_index: usize,
    pub entry_type: String,
    /// Ids of child items and groups, in order.
    #[serde(default)]
    pub children: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conditions: Option<Vec<Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub functions: Option<Vec<Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unknown_fields: Option<UnknownFields>,
}

/// Flattened editor view of a loot table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LootTableProps {
    pub identifier: Identifier,
    #[serde(rename = "override", default, skip_serializing_if = "Option::is_none")]
    pub override_: Option<ConfiguratorOverride>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub loot_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub random_sequence: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub functions: Option<Vec<Value>>,
    #[serde(default)]
    pub pools: Vec<LootPool>,
    #[serde(default)]
    pub items: Vec<LootItem>,
    #[serde(default)]
    pub groups: Vec<LootGroup>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unknown_fields: Option<UnknownFields>,
}

impl LootTableProps {
    /// Ids referenced as a child of some group.
    fn nested_ids(&self) -> HashSet<&str> {
        self.groups
            .iter()
            .flat_map(|g| g.children.iter().map(String::as_str))
            .collect()
    }

    /// Next free `item_N` id.
    pub fn next_item_id(&self) -> String {
        next_id("item", self.items.iter().map(|i| i.id.as_str()))
    }

    pub fn next_group_id(&self) -> String {
        next_id("group", self.groups.iter().map(|g| g.id.as_str()))
    }
}

fn next_id<'a>(prefix: &str, ids: impl Iterator<Item = &'a str>) -> String {
    let next = ids
        .filter_map(|id| id.strip_prefix(prefix)?.strip_prefix('_')?.parse::<usize>().ok())
        .map(|n| n + 1)
        .max()
        .unwrap_or(0);
    format!("{prefix}_{next}")
}

impl VoxelElement for LootTableProps {
    fn identifier(&self) -> &Identifier {
        &self.identifier
    }

    fn tags(&self) -> &[String] {
        &self.tags
    }
}

// ===========================================================================
// Analyser
// ===========================================================================

pub struct LootTableAnalyser;

struct Flattener<'a> {
    fields: Fields<'a>,
    items: Vec<LootItem>,
    groups: Vec<LootGroup>,
}

impl<'a> Flattener<'a> {
    fn entry(&mut self, value: &'a Value, pool_index: usize, entry_index: usize) -> Result<String, ConvertError> {
        let Value::Object(obj) = value else {
            return Err(self.fields.invalid("loot entry is not an object"));
        };
        let e = self.fields.nested(obj);
        let entry_type: String = e.required("type")?;
        let conditions = e.optional("conditions")?;
        let functions = e.optional("functions")?;
        let unknown_fields = extract_unknown_fields(obj, &ENTRY_FIELDS);

        if is_composite(&entry_type) {
            let slot = self.groups.len();
            let id = format!("group_{slot}");
            self.groups.push(LootGroup {
                id: id.clone(),
                pool_index,
                entry_index,
                entry_type,
                children: Vec::new(),
                conditions,
                functions,
                unknown_fields,
            });
            let children = e.array("children")?;
            let mut ids = Vec::with_capacity(children.len());
            for (index, child) in children.iter().enumerate() {
                ids.push(self.entry(child, pool_index, index)?);
            }
            self.groups[slot].children = ids;
            return Ok(id);
        }

        let id = format!("item_{}", self.items.len());
        self.items.push(LootItem {
            id: id.clone(),
            pool_index,
            entry_index,
            entry_type,
            name: e.optional("name")?,
            value: e.raw("value").cloned(),
            weight: e.optional("weight")?,
            quality: e.optional("quality")?,
            conditions,
            functions,
            expand: e.optional("expand")?,
            unknown_fields,
        });
        Ok(id)
    }
}

impl Analyser for LootTableAnalyser {
    type Voxel = LootTableProps;

    const CONCEPT: Concept = Concept::LootTable;

    fn parse(params: ParserParams<'_>) -> Result<LootTableProps, ConvertError> {
        let f = Fields::root(params.element, "loot_table")?;
        let mut flattener = Flattener {
            fields: f,
            items: Vec::new(),
            groups: Vec::new(),
        };

        let mut pools = Vec::new();
        for (pool_index, pool) in f.array("pools")?.iter().enumerate() {
            let Value::Object(obj) = pool else {
                return Err(f.invalid(format!("pool {pool_index} is not an object")));
            };
            let p = f.nested(obj);
            for (entry_index, entry) in p.array("entries")?.iter().enumerate() {
                flattener.entry(entry, pool_index, entry_index)?;
            }
            pools.push(LootPool {
                rolls: p
                    .raw("rolls")
                    .cloned()
                    .ok_or_else(|| p.invalid(format!("pool {pool_index} has no 'rolls'")))?,
                bonus_rolls: p.raw("bonus_rolls").cloned(),
                conditions: p.optional("conditions")?,
                functions: p.optional("functions")?,
                unknown_fields: extract_unknown_fields(obj, &POOL_FIELDS),
            });
        }

        log::trace!(
            "flattened loot table {}: {} pools, {} items, {} groups",
            params.element.identifier,
            pools.len(),
            flattener.items.len(),
            flattener.groups.len()
        );
        Ok(LootTableProps {
            identifier: params.element.identifier.clone(),
            override_: params.configurator.cloned(),
            loot_type: f.optional("type")?,
            random_sequence: f.optional("random_sequence")?,
            functions: f.optional("functions")?,
            pools,
            items: flattener.items,
            groups: flattener.groups,
            tags: params.tags.iter().map(|t| normalize_reference(t)).collect(),
            unknown_fields: extract_unknown_fields(f.map(), &ROOT_FIELDS),
        })
    }

    fn compile(element: &LootTableProps, registry: &str, original: Option<&Value>) -> CompiledElement {
        let mut data = base_object(original);
        let had_pools = data.contains_key("pools");

        let mut emitted = Map::new();
        insert_opt(&mut emitted, "type", element.loot_type.clone());
        insert_opt(&mut emitted, "random_sequence", element.random_sequence.clone());
        insert_opt(&mut emitted, "functions", element.functions.clone());
        if !element.pools.is_empty() || had_pools {
            emitted.insert("pools".into(), Value::Array(build_pools(element)));
        }
        overlay(&mut data, emitted, &ROOT_FIELDS);
        merge_unknown_fields(&mut data, element.unknown_fields.as_ref(), &[]);

        let mut identifier = element.identifier.clone();
        identifier.registry = registry.to_string();
        CompiledElement {
            element: DataDrivenRegistryElement::new(identifier, Value::Object(data)),
            tags: tags_to_identifiers(&element.tags, &format!("tags/{registry}")),
        }
    }
}

// ===========================================================================
// Rebuilding entries
// ===========================================================================

struct Assembler<'a> {
    items: HashMap<&'a str, &'a LootItem>,
    groups: HashMap<&'a str, &'a LootGroup>,
    visiting: HashSet<&'a str>,
}

impl<'a> Assembler<'a> {
    fn entry(&mut self, id: &'a str) -> Option<Value> {
        if !self.visiting.insert(id) {
            log::warn!("loot entry {id} is nested in itself, dropping");
            return None;
        }
        let value = if let Some(item) = self.items.get(id).copied() {
            Some(item_value(item))
        } else if let Some(group) = self.groups.get(id).copied() {
            let children = group
                .children
                .iter()
                .filter_map(|child| self.entry(child.as_str()))
                .collect();
            Some(group_value(group, children))
        } else {
            log::warn!("unknown loot entry id {id}, dropping");
            None
        };
        self.visiting.remove(id);
        value
    }
}

fn build_pools(element: &LootTableProps) -> Vec<Value> {
    let nested = element.nested_ids();
    let mut top: Vec<(usize, usize, &str)> = element
        .items
        .iter()
        .map(|i| (i.pool_index, i.entry_index, i.id.as_str()))
        .chain(
            element
                .groups
                .iter()
                .map(|g| (g.pool_index, g.entry_index, g.id.as_str())),
        )
        .filter(|(_, _, id)| !nested.contains(id))
        .collect();
    top.sort();

    if let Some((pool, _, id)) = top.iter().find(|(pool, _, _)| *pool >= element.pools.len()) {
        log::warn!("loot entry {id} points at missing pool {pool}, dropping");
    }

    let mut assembler = Assembler {
        items: element.items.iter().map(|i| (i.id.as_str(), i)).collect(),
        groups: element.groups.iter().map(|g| (g.id.as_str(), g)).collect(),
        visiting: HashSet::new(),
    };

    element
        .pools
        .iter()
        .enumerate()
        .map(|(index, pool)| {
            let entries = top
                .iter()
                .filter(|(p, _, _)| *p == index)
                .filter_map(|&(_, _, id)| assembler.entry(id))
                .collect();

            let mut obj = Map::new();
            obj.insert("rolls".into(), pool.rolls.clone());
            insert_opt(&mut obj, "bonus_rolls", pool.bonus_rolls.clone());
            obj.insert("entries".into(), Value::Array(entries));
            insert_opt(&mut obj, "conditions", pool.conditions.clone());
            insert_opt(&mut obj, "functions", pool.functions.clone());
            merge_unknown_fields(&mut obj, pool.unknown_fields.as_ref(), &[]);
            Value::Object(obj)
        })
        .collect()
}

fn item_value(item: &LootItem) -> Value {
    let mut obj = Map::new();
    obj.insert("type".into(), item.entry_type.clone().into());
    insert_opt(&mut obj, "name", item.name.clone());
    insert_opt(&mut obj, "value", item.value.clone());
    insert_opt(&mut obj, "weight", item.weight);
    insert_opt(&mut obj, "quality", item.quality);
    insert_opt(&mut obj, "expand", item.expand);
    insert_opt(&mut obj, "conditions", item.conditions.clone());
    insert_opt(&mut obj, "functions", item.functions.clone());
    merge_unknown_fields(&mut obj, item.unknown_fields.as_ref(), &[]);
    Value::Object(obj)
}

fn group_value(group: &LootGroup, children: Vec<Value>) -> Value {
    let mut obj = Map::new();
    obj.insert("type".into(), group.entry_type.clone().into());
    obj.insert("children".into(), Value::Array(children));
    insert_opt(&mut obj, "conditions", group.conditions.clone());
    insert_opt(&mut obj, "functions", group.functions.clone());
    merge_unknown_fields(&mut obj, group.unknown_fields.as_ref(), &[]);
    Value::Object(obj)
}
