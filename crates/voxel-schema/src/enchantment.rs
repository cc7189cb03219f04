//! Enchantment schema.
//!
//! Flattens `min_cost` / `max_cost` into four top-level fields and derives
//! the editor-only [`EnchantmentMode`] from the element's tags and effects.

use std::collections::HashSet;
use std::sync::LazyLock;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use voxel_core::element::{
    CompiledElement, ConfiguratorOverride, DataDrivenRegistryElement, UnknownFields, VoxelElement,
};
use voxel_core::identifier::{Identifier, normalize_reference, tags_to_identifiers};
use voxel_core::unknown::{
    extract_unknown_fields, merge_unknown_fields, nest_unknown_fields, nested_unknown,
};

use crate::analyser::{Analyser, Concept, ConvertError, ParserParams};
use crate::fields::{Fields, SingleOrMany, base_object, insert_opt, overlay};

// ===========================================================================
// Constants
// ===========================================================================

/// Tags that give an enchantment game behaviour without making it
/// obtainable. An enchantment listed only in these is creative-only.
pub const FUNCTIONALITY_TAGS: [&str; 8] = [
    "minecraft:curse",
    "minecraft:double_trade_price",
    "minecraft:prevents_bee_spawns_when_mining",
    "minecraft:prevents_decorated_pot_shattering",
    "minecraft:prevents_ice_melting",
    "minecraft:prevents_infested_spawns",
    "minecraft:smelts_loot",
    "minecraft:tooltip_order",
];

static FUNCTIONALITY_TAG_SET: LazyLock<HashSet<&'static str>> =
    LazyLock::new(|| FUNCTIONALITY_TAGS.into_iter().collect());

pub fn is_functionality_tag(tag: &str) -> bool {
    FUNCTIONALITY_TAG_SET.contains(normalize_reference(tag).as_str())
}

const KNOWN_FIELDS: [&str; 11] = [
    "description",
    "exclusive_set",
    "supported_items",
    "primary_items",
    "weight",
    "max_level",
    "min_cost",
    "max_cost",
    "anvil_cost",
    "slots",
    "effects",
];

// ===========================================================================
// Voxel shape
// ===========================================================================

/// How the editor presents an enchantment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnchantmentMode {
    #[default]
    Normal,
    /// Not obtainable anywhere: no effects and no tags.
    SoftDelete,
    /// Only listed in functionality tags.
    OnlyCreative,
}

/// Flattened editor view of an enchantment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnchantmentProps {
    pub identifier: Identifier,
    #[serde(rename = "override", default, skip_serializing_if = "Option::is_none")]
    pub override_: Option<ConfiguratorOverride>,
    pub description: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exclusive_set: Option<SingleOrMany>,
    pub supported_items: SingleOrMany,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_items: Option<SingleOrMany>,
    pub max_level: i64,
    pub weight: i64,
    pub anvil_cost: i64,
    pub min_cost_base: i64,
    pub min_cost_per_level_above_first: i64,
    pub max_cost_base: i64,
    pub max_cost_per_level_above_first: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub effects: Option<Map<String, Value>>,
    #[serde(default)]
    pub slots: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub mode: EnchantmentMode,
    /// Effect keys dropped from `effects` when compiling.
    #[serde(default)]
    pub disabled_effects: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unknown_fields: Option<UnknownFields>,
}

impl VoxelElement for EnchantmentProps {
    fn identifier(&self) -> &Identifier {
        &self.identifier
    }

    fn tags(&self) -> &[String] {
        &self.tags
    }
}

const COST_FIELDS: [&str; 2] = ["base", "per_level_above_first"];

#[derive(Deserialize)]
struct Cost {
    base: i64,
    per_level_above_first: i64,
}

// ===========================================================================
// Mode derivation
// ===========================================================================

/// Classify an enchantment. Evaluated in order:
///
/// 1. Drop the exclusive-set tag from `tags`.
/// 2. Any remaining tags, all functionality tags → `OnlyCreative`
///    (even with effects).
/// 3. No effects and no remaining tags → `SoftDelete`.
/// 4. Otherwise `Normal`.
pub fn derive_mode(
    tags: &[String],
    exclusive_set: Option<&SingleOrMany>,
    effects: Option<&Map<String, Value>>,
) -> EnchantmentMode {
    let exclusive_tag = exclusive_set
        .and_then(SingleOrMany::as_single)
        .map(|s| normalize_reference(s));

    let remaining: Vec<&String> = tags
        .iter()
        .filter(|tag| exclusive_tag.as_deref() != Some(normalize_reference(tag).as_str()))
        .collect();

    if !remaining.is_empty() && remaining.iter().all(|tag| is_functionality_tag(tag)) {
        return EnchantmentMode::OnlyCreative;
    }

    let has_effects = effects.is_some_and(|e| !e.is_empty());
    if !has_effects && remaining.is_empty() {
        return EnchantmentMode::SoftDelete;
    }

    EnchantmentMode::Normal
}

// ===========================================================================
// Analyser
// ===========================================================================

pub struct EnchantmentAnalyser;

impl Analyser for EnchantmentAnalyser {
    type Voxel = EnchantmentProps;

    const CONCEPT: Concept = Concept::Enchantment;

    fn parse(params: ParserParams<'_>) -> Result<EnchantmentProps, ConvertError> {
        let f = Fields::root(params.element, "enchantment")?;

        let exclusive_set: Option<SingleOrMany> = f.optional("exclusive_set")?;
        let effects: Option<Map<String, Value>> = f.optional("effects")?;
        let min_cost: Cost = f.required("min_cost")?;
        let max_cost: Cost = f.required("max_cost")?;
        let tags: Vec<String> = params.tags.iter().map(|t| normalize_reference(t)).collect();
        let mode = derive_mode(&tags, exclusive_set.as_ref(), effects.as_ref());

        log::trace!("parsed enchantment {} as {mode:?}", params.element.identifier);
        Ok(EnchantmentProps {
            identifier: params.element.identifier.clone(),
            override_: params.configurator.cloned(),
            description: f.raw("description").cloned().unwrap_or(Value::String(String::new())),
            exclusive_set,
            supported_items: f.required("supported_items")?,
            primary_items: f.optional("primary_items")?,
            max_level: f.required("max_level")?,
            weight: f.required("weight")?,
            anvil_cost: f.required("anvil_cost")?,
            min_cost_base: min_cost.base,
            min_cost_per_level_above_first: min_cost.per_level_above_first,
            max_cost_base: max_cost.base,
            max_cost_per_level_above_first: max_cost.per_level_above_first,
            effects,
            slots: f.optional("slots")?.unwrap_or_default(),
            tags,
            mode,
            disabled_effects: Vec::new(),
            unknown_fields: nest_unknown_fields(
                extract_unknown_fields(f.map(), &KNOWN_FIELDS),
                [
                    ("min_cost", cost_unknown(&f, "min_cost")),
                    ("max_cost", cost_unknown(&f, "max_cost")),
                ],
            ),
        })
    }

    fn compile(element: &EnchantmentProps, registry: &str, original: Option<&Value>) -> CompiledElement {
        let mut data = base_object(original);
        let mut emitted = Map::new();
        let mut tags = element.tags.clone();

        emitted.insert("description".into(), element.description.clone());
        insert_opt(&mut emitted, "exclusive_set", element.exclusive_set.as_ref());

        let supported = element
            .primary_items
            .as_ref()
            .filter(|_| element.supported_items.is_empty())
            .unwrap_or(&element.supported_items);
        emitted.insert("supported_items".into(), supported.into());
        insert_opt(&mut emitted, "primary_items", element.primary_items.as_ref());

        emitted.insert("weight".into(), element.weight.into());
        emitted.insert("max_level".into(), element.max_level.into());
        emitted.insert(
            "min_cost".into(),
            cost(
                data.get("min_cost"),
                nested_unknown(element.unknown_fields.as_ref(), "min_cost"),
                element.min_cost_base,
                element.min_cost_per_level_above_first,
            ),
        );
        emitted.insert(
            "max_cost".into(),
            cost(
                data.get("max_cost"),
                nested_unknown(element.unknown_fields.as_ref(), "max_cost"),
                element.max_cost_base,
                element.max_cost_per_level_above_first,
            ),
        );
        emitted.insert("anvil_cost".into(), element.anvil_cost.into());
        emitted.insert("slots".into(), element.slots.clone().into());

        if let Some(effects) = &element.effects {
            let mut effects = effects.clone();
            for disabled in &element.disabled_effects {
                effects.shift_remove(disabled);
            }
            emitted.insert("effects".into(), Value::Object(effects));
        }

        match element.mode {
            EnchantmentMode::SoftDelete => {
                tags.clear();
                emitted.shift_remove("effects");
                emitted.shift_remove("exclusive_set");
            }
            EnchantmentMode::OnlyCreative => tags.retain(|t| is_functionality_tag(t)),
            EnchantmentMode::Normal => {
                if let Some(tag) = element
                    .exclusive_set
                    .as_ref()
                    .and_then(SingleOrMany::as_single)
                    .and_then(|s| s.strip_prefix('#'))
                {
                    let tag = normalize_reference(tag);
                    if !tags.contains(&tag) {
                        tags.push(tag);
                    }
                }
            }
        }

        overlay(&mut data, emitted, &KNOWN_FIELDS);
        merge_unknown_fields(
            &mut data,
            element.unknown_fields.as_ref(),
            &["min_cost", "max_cost"],
        );

        let mut identifier = element.identifier.clone();
        identifier.registry = registry.to_string();
        CompiledElement {
            element: DataDrivenRegistryElement::new(identifier, Value::Object(data)),
            tags: tags_to_identifiers(&tags, &format!("tags/{registry}")),
        }
    }
}

/// `{base, per_level_above_first}`, written over the original cost object
/// when there is one.
fn cost(
    original: Option<&Value>,
    unknown: Option<&UnknownFields>,
    base: i64,
    per_level: i64,
) -> Value {
    let mut cost = original
        .and_then(Value::as_object)
        .cloned()
        .unwrap_or_default();
    cost.insert("base".into(), base.into());
    cost.insert("per_level_above_first".into(), per_level.into());
    merge_unknown_fields(&mut cost, unknown, &[]);
    Value::Object(cost)
}

fn cost_unknown(f: &Fields<'_>, key: &str) -> Option<UnknownFields> {
    f.raw(key)
        .and_then(Value::as_object)
        .and_then(|cost| extract_unknown_fields(cost, &COST_FIELDS))
}

// ===========================================================================
// Tests
// ===========================================================================
