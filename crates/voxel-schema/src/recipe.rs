//! Recipe schema.
//!
//! Every recipe type is flattened into a single `slots` map (slot index →
//! accepted items). Shaped recipes index slots `row * 3 + col`; the other
//! types number their inputs from zero. The compiler rebuilds the
//! type-specific canonical keys from the slots.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};
use voxel_core::element::{
    CompiledElement, ConfiguratorOverride, DataDrivenRegistryElement, UnknownFields, VoxelElement,
};
use voxel_core::identifier::{Identifier, normalize_reference, tags_to_identifiers};
use voxel_core::unknown::{
    extract_unknown_fields, merge_unknown_fields, nest_unknown_fields, nested_unknown,
};

use crate::analyser::{Analyser, Concept, ConvertError, ParserParams};
use crate::fields::{Fields, base_object, insert_opt, overlay};

/// Width of the crafting grid; shaped slot index is `row * GRID + col`.
pub const GRID: usize = 3;

const COMMON_FIELDS: [&str; 5] = ["type", "group", "category", "show_notification", "result"];

/// Every canonical key some recipe type models.
const ALL_FIELDS: [&str; 16] = [
    "type",
    "group",
    "category",
    "show_notification",
    "result",
    "pattern",
    "key",
    "ingredients",
    "ingredient",
    "cookingtime",
    "experience",
    "template",
    "base",
    "addition",
    "input",
    "material",
];

const RESULT_FIELDS: [&str; 4] = ["id", "item", "count", "components"];

// ===========================================================================
// Recipe kinds
// ===========================================================================

/// Recipe types with a modeled layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecipeKind {
    Shaped,
    Shapeless,
    /// `smelting`, `blasting`, `smoking`, `campfire_cooking`.
    Cooking,
    Stonecutting,
    SmithingTransform,
    SmithingTrim,
    Transmute,
    Other,
}

impl RecipeKind {
    pub fn of(recipe_type: &str) -> Self {
        match normalize_reference(recipe_type).as_str() {
            "minecraft:crafting_shaped" => RecipeKind::Shaped,
            "minecraft:crafting_shapeless" => RecipeKind::Shapeless,
            "minecraft:smelting"
            | "minecraft:blasting"
            | "minecraft:smoking"
            | "minecraft:campfire_cooking" => RecipeKind::Cooking,
            "minecraft:stonecutting" => RecipeKind::Stonecutting,
            "minecraft:smithing_transform" => RecipeKind::SmithingTransform,
            "minecraft:smithing_trim" => RecipeKind::SmithingTrim,
            "minecraft:crafting_transmute" => RecipeKind::Transmute,
            _ => RecipeKind::Other,
        }
    }

    /// Number of input slots the kind has.
    pub fn slot_count(self) -> usize {
        match self {
            RecipeKind::Shaped | RecipeKind::Shapeless => GRID * GRID,
            RecipeKind::Cooking | RecipeKind::Stonecutting => 1,
            RecipeKind::SmithingTransform | RecipeKind::SmithingTrim => 3,
            RecipeKind::Transmute => 2,
            RecipeKind::Other => 0,
        }
    }

    /// Canonical keys holding single ingredients, by slot index.
    fn named_inputs(self) -> &'static [&'static str] {
        match self {
            RecipeKind::Cooking | RecipeKind::Stonecutting => &["ingredient"],
            RecipeKind::SmithingTransform | RecipeKind::SmithingTrim => {
                &["template", "base", "addition"]
            }
            RecipeKind::Transmute => &["input", "material"],
            _ => &[],
        }
    }

    fn known_fields(self) -> Vec<&'static str> {
        let specific: &[&str] = match self {
            RecipeKind::Shaped => &["pattern", "key"],
            RecipeKind::Shapeless => &["ingredients"],
            RecipeKind::Cooking => &["ingredient", "cookingtime", "experience"],
            RecipeKind::SmithingTrim => &["template", "base", "addition", "pattern"],
            RecipeKind::Other => return COMMON_FIELDS[..4].to_vec(),
            other => other.named_inputs(),
        };
        COMMON_FIELDS.iter().chain(specific).copied().collect()
    }
}

// ===========================================================================
// Voxel shape
// ===========================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridSize {
    pub width: usize,
    pub height: usize,
}

/// How the canonical result was written.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultForm {
    /// `{"id": ..., "count": ...}`
    #[default]
    Object,
    /// `{"item": ..., "count": ...}`
    Legacy,
    /// A bare item id string.
    Id,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecipeResult {
    pub item: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub components: Option<Map<String, Value>>,
    #[serde(default)]
    pub form: ResultForm,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypeSpecific {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cooking_time: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub experience: Option<Number>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trim_pattern: Option<String>,
}

/// Flattened editor view of a recipe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipeProps {
    pub identifier: Identifier,
    #[serde(rename = "override", default, skip_serializing_if = "Option::is_none")]
    pub override_: Option<ConfiguratorOverride>,
    #[serde(rename = "type")]
    pub recipe_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub show_notification: Option<bool>,
    /// Slot index (decimal string) → accepted items; tags as `#ns:id`.
    #[serde(default)]
    pub slots: BTreeMap<String, Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grid_size: Option<GridSize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<RecipeResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub type_specific: Option<TypeSpecific>,
    /// Ingredients were written as `{"item"}` / `{"tag"}` objects.
    #[serde(default)]
    pub legacy_ingredients: bool,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unknown_fields: Option<UnknownFields>,
}

impl RecipeProps {
    pub fn kind(&self) -> RecipeKind {
        RecipeKind::of(&self.recipe_type)
    }

    /// Occupied slots in numeric order. Non-numeric keys are skipped.
    pub fn sorted_slots(&self) -> Vec<(usize, &[String])> {
        let mut slots: Vec<(usize, &[String])> = self
            .slots
            .iter()
            .filter(|(_, items)| !items.is_empty())
            .filter_map(|(key, items)| Some((key.parse().ok()?, items.as_slice())))
            .collect();
        slots.sort_by_key(|(index, _)| *index);
        slots
    }
}

impl VoxelElement for RecipeProps {
    fn identifier(&self) -> &Identifier {
        &self.identifier
    }

    fn tags(&self) -> &[String] {
        &self.tags
    }
}

// ===========================================================================
// Ingredients
// ===========================================================================

/// Read an ingredient in either the modern (`"id"`, `"#tag"`, list) or the
/// legacy (`{"item"}`, `{"tag"}`, list) form. The flag reports the legacy form.
pub fn parse_ingredient(value: &Value) -> Option<(Vec<String>, bool)> {
    match value {
        Value::String(s) => Some((vec![s.clone()], false)),
        Value::Object(obj) => legacy_entry(obj).map(|id| (vec![id], true)),
        Value::Array(values) => {
            let mut items = Vec::with_capacity(values.len());
            let mut legacy = false;
            for value in values {
                match value {
                    Value::String(s) => items.push(s.clone()),
                    Value::Object(obj) => {
                        items.push(legacy_entry(obj)?);
                        legacy = true;
                    }
                    _ => return None,
                }
            }
            Some((items, legacy))
        }
        _ => None,
    }
}

fn legacy_entry(obj: &Map<String, Value>) -> Option<String> {
    if let Some(item) = obj.get("item").and_then(Value::as_str) {
        return Some(item.to_string());
    }
    obj.get("tag")
        .and_then(Value::as_str)
        .map(|tag| format!("#{tag}"))
}

fn legacy_value(item: &str) -> Value {
    let mut obj = Map::new();
    match item.strip_prefix('#') {
        Some(tag) => obj.insert("tag".into(), tag.into()),
        None => obj.insert("item".into(), item.into()),
    };
    Value::Object(obj)
}

pub fn emit_ingredient(items: &[String], legacy: bool) -> Value {
    match (items, legacy) {
        ([only], true) => legacy_value(only),
        (_, true) => Value::Array(items.iter().map(|i| legacy_value(i)).collect()),
        ([only], false) => Value::String(only.clone()),
        (_, false) => Value::from(items.to_vec()),
    }
}

/// The original ingredient value when it still holds `items`, else a fresh one.
fn emit_or_reuse(items: &[String], legacy: bool, original: Option<&Value>) -> Value {
    match original {
        Some(value) if parse_ingredient(value).is_some_and(|(old, _)| old == items) => value.clone(),
        _ => emit_ingredient(items, legacy),
    }
}

// ===========================================================================
// Analyser
// ===========================================================================

pub struct RecipeAnalyser;

impl Analyser for RecipeAnalyser {
    type Voxel = RecipeProps;

    const CONCEPT: Concept = Concept::Recipe;

    fn parse(params: ParserParams<'_>) -> Result<RecipeProps, ConvertError> {
        let f = Fields::root(params.element, "recipe")?;
        let recipe_type: String = f.required("type")?;
        let kind = RecipeKind::of(&recipe_type);

        let mut slots = BTreeMap::new();
        let mut legacy = false;
        let mut grid_size = None;
        let mut type_specific = None;

        let mut ingredient = |key: &str, value: &Value| -> Result<Vec<String>, ConvertError> {
            let (items, is_legacy) = parse_ingredient(value)
                .ok_or_else(|| f.invalid(format!("field '{key}' is not an ingredient")))?;
            legacy |= is_legacy;
            Ok(items)
        };

        match kind {
            RecipeKind::Shaped => {
                let pattern: Vec<String> = f.required("pattern")?;
                let key = f
                    .object("key")?
                    .ok_or_else(|| f.invalid("missing required field 'key'"))?;
                let mut width = 0;
                for (row, line) in pattern.iter().enumerate() {
                    width = width.max(line.chars().count());
                    for (col, symbol) in line.chars().enumerate() {
                        if symbol == ' ' {
                            continue;
                        }
                        if row >= GRID || col >= GRID {
                            return Err(f.invalid("pattern exceeds the 3x3 grid"));
                        }
                        let symbol = symbol.to_string();
                        let value = key.raw(&symbol).ok_or_else(|| {
                            f.invalid(format!("pattern symbol '{symbol}' missing from key"))
                        })?;
                        slots.insert((row * GRID + col).to_string(), ingredient(symbol.as_str(), value)?);
                    }
                }
                grid_size = Some(GridSize {
                    width,
                    height: pattern.len(),
                });
            }
            RecipeKind::Shapeless => {
                let ingredients: Vec<Value> = f.required("ingredients")?;
                for (index, value) in ingredients.iter().enumerate() {
                    slots.insert(index.to_string(), ingredient("ingredients", value)?);
                }
            }
            RecipeKind::Other => {
                log::debug!(
                    "recipe {} has unmodeled type {recipe_type}",
                    params.element.identifier
                );
            }
            _ => {}
        }

        for (index, &key) in kind.named_inputs().iter().enumerate() {
            if let Some(value) = f.raw(key) {
                slots.insert(index.to_string(), ingredient(key, value)?);
            }
        }

        match kind {
            RecipeKind::Cooking => {
                type_specific = Some(TypeSpecific {
                    cooking_time: f.optional("cookingtime")?,
                    experience: f.optional("experience")?,
                    trim_pattern: None,
                });
            }
            RecipeKind::SmithingTrim => {
                type_specific = Some(TypeSpecific {
                    trim_pattern: f.optional("pattern")?,
                    ..TypeSpecific::default()
                });
            }
            _ => {}
        }

        let (result, result_unknown) = match (kind, f.raw("result")) {
            (RecipeKind::Other, _) | (_, None) => (None, None),
            (_, Some(Value::String(id))) => (
                Some(RecipeResult {
                    item: id.clone(),
                    count: None,
                    components: None,
                    form: ResultForm::Id,
                }),
                None,
            ),
            (_, Some(Value::Object(obj))) => {
                let r = f.nested(obj);
                let (item, form) = match r.optional::<String>("id")? {
                    Some(id) => (id, ResultForm::Object),
                    None => (r.required("item")?, ResultForm::Legacy),
                };
                (
                    Some(RecipeResult {
                        item,
                        count: r.optional("count")?,
                        components: r.optional("components")?,
                        form,
                    }),
                    extract_unknown_fields(obj, &RESULT_FIELDS),
                )
            }
            (_, Some(_)) => return Err(f.invalid("field 'result' is not an item stack")),
        };

        Ok(RecipeProps {
            identifier: params.element.identifier.clone(),
            override_: params.configurator.cloned(),
            recipe_type,
            group: f.optional("group")?,
            category: f.optional("category")?,
            show_notification: f.optional("show_notification")?,
            slots,
            grid_size,
            result,
            type_specific,
            legacy_ingredients: legacy,
            tags: params.tags.iter().map(|t| normalize_reference(t)).collect(),
            unknown_fields: nest_unknown_fields(
                extract_unknown_fields(f.map(), &kind.known_fields()),
                [("result", result_unknown)],
            ),
        })
    }

    fn compile(element: &RecipeProps, registry: &str, original: Option<&Value>) -> CompiledElement {
        let mut data = base_object(original);
        let kind = element.kind();
        let legacy = element.legacy_ingredients;
        let mut emitted = Map::new();

        emitted.insert("type".into(), element.recipe_type.clone().into());
        insert_opt(&mut emitted, "group", element.group.clone());
        insert_opt(&mut emitted, "category", element.category.clone());
        insert_opt(&mut emitted, "show_notification", element.show_notification);

        match kind {
            RecipeKind::Shaped => {
                let (pattern, key) = compile_shaped(element, &data);
                emitted.insert("pattern".into(), pattern);
                emitted.insert("key".into(), key);
            }
            RecipeKind::Shapeless => {
                let previous = data.get("ingredients").and_then(Value::as_array);
                let ingredients = element
                    .sorted_slots()
                    .into_iter()
                    .enumerate()
                    .map(|(position, (_, items))| {
                        emit_or_reuse(items, legacy, previous.and_then(|p| p.get(position)))
                    })
                    .collect();
                emitted.insert("ingredients".into(), Value::Array(ingredients));
            }
            _ => {}
        }

        for (index, key) in kind.named_inputs().iter().enumerate() {
            if let Some(items) = element.slots.get(&index.to_string()).filter(|i| !i.is_empty()) {
                emitted.insert(key.to_string(), emit_or_reuse(items, legacy, data.get(*key)));
            }
        }

        if let Some(specific) = &element.type_specific {
            match kind {
                RecipeKind::Cooking => {
                    insert_opt(&mut emitted, "cookingtime", specific.cooking_time);
                    insert_opt(&mut emitted, "experience", specific.experience.clone());
                }
                RecipeKind::SmithingTrim => {
                    insert_opt(&mut emitted, "pattern", specific.trim_pattern.clone());
                }
                _ => {}
            }
        }

        if let Some(result) = element.result.as_ref().filter(|_| kind != RecipeKind::Other) {
            let unknown = nested_unknown(element.unknown_fields.as_ref(), "result");
            emitted.insert("result".into(), compile_result(result, data.get("result"), unknown));
        }

        // Unmodeled recipe types carry their whole body, `result` included,
        // in the unknown bag; those keys stay where the original put them.
        let carried = element
            .unknown_fields
            .as_ref()
            .filter(|_| kind == RecipeKind::Other);
        let modeled: Vec<&str> = ALL_FIELDS
            .iter()
            .copied()
            .filter(|key| !carried.is_some_and(|bag| bag.contains_key(*key)))
            .collect();
        overlay(&mut data, emitted, &modeled);
        let nested: &[&str] = if kind == RecipeKind::Other { &[] } else { &["result"] };
        merge_unknown_fields(&mut data, element.unknown_fields.as_ref(), nested);

        let mut identifier = element.identifier.clone();
        identifier.registry = registry.to_string();
        CompiledElement {
            element: DataDrivenRegistryElement::new(identifier, Value::Object(data)),
            tags: tags_to_identifiers(&element.tags, &format!("tags/{registry}")),
        }
    }
}

fn compile_result(
    result: &RecipeResult,
    original: Option<&Value>,
    unknown: Option<&UnknownFields>,
) -> Value {
    let bare = result.form == ResultForm::Id
        && result.count.is_none()
        && result.components.is_none()
        && unknown.is_none();
    if bare {
        return Value::String(result.item.clone());
    }

    let mut obj = base_object(original);
    let mut emitted = Map::new();
    let id_key = match result.form {
        ResultForm::Legacy => "item",
        _ => "id",
    };
    emitted.insert(id_key.into(), result.item.clone().into());
    insert_opt(&mut emitted, "count", result.count);
    insert_opt(&mut emitted, "components", result.components.clone());
    overlay(&mut obj, emitted, &RESULT_FIELDS);
    merge_unknown_fields(&mut obj, unknown, &[]);
    Value::Object(obj)
}

/// Rebuild `pattern` and `key` from the slots.
///
/// Symbols are reused from the original where possible: first the symbol at
/// the same grid position if it still holds the same items, then any
/// original symbol holding those items, then the symbol at the same
/// position. New ingredients get the first letter unused by the original key.
fn compile_shaped(element: &RecipeProps, original: &Map<String, Value>) -> (Value, Value) {
    let empty = Map::new();
    let original_key = original
        .get("key")
        .and_then(Value::as_object)
        .unwrap_or(&empty);
    let original_pattern: Vec<Vec<char>> = original
        .get("pattern")
        .and_then(Value::as_array)
        .map(|rows| {
            rows.iter()
                .map(|r| r.as_str().unwrap_or_default().chars().collect())
                .collect()
        })
        .unwrap_or_default();

    let slots: Vec<(usize, &[String])> = element
        .sorted_slots()
        .into_iter()
        .filter(|(index, _)| *index < GRID * GRID)
        .collect();

    let (mut width, mut height) = element
        .grid_size
        .map(|g| (g.width, g.height))
        .unwrap_or((0, 0));
    for (index, _) in &slots {
        width = width.max(index % GRID + 1);
        height = height.max(index / GRID + 1);
    }

    let holds = |symbol: char, items: &[String]| {
        original_key
            .get(&symbol.to_string())
            .and_then(parse_ingredient)
            .is_some_and(|(old, _)| old == items)
    };

    let mut assigned: Vec<(&[String], char)> = Vec::new();
    let mut grid = vec![vec![' '; width]; height];
    for &(index, items) in &slots {
        let (row, col) = (index / GRID, index % GRID);
        let symbol = match assigned.iter().find(|(i, _)| *i == items) {
            Some((_, symbol)) => *symbol,
            None => {
                let taken = |s: char| assigned.iter().any(|(_, t)| *t == s);
                let at_position = original_pattern
                    .get(row)
                    .and_then(|r| r.get(col))
                    .copied()
                    .filter(|s| *s != ' ' && !taken(*s));
                let symbol = at_position
                    .filter(|s| holds(*s, items))
                    .or_else(|| {
                        original_key
                            .keys()
                            .filter_map(|k| single_char(k))
                            .find(|s| !taken(*s) && holds(*s, items))
                    })
                    .or(at_position.filter(|s| original_key.contains_key(&s.to_string())))
                    .or_else(|| {
                        ('A'..='Z')
                            .chain('a'..='z')
                            .chain('0'..='9')
                            .find(|s| !taken(*s) && !original_key.contains_key(&s.to_string()))
                    })
                    .unwrap_or('#');
                assigned.push((items, symbol));
                symbol
            }
        };
        grid[row][col] = symbol;
    }

    let pattern: Vec<String> = grid.into_iter().map(|row| row.into_iter().collect()).collect();
    let mut key = Map::new();
    for (items, symbol) in assigned {
        let symbol = symbol.to_string();
        let value = emit_or_reuse(items, element.legacy_ingredients, original_key.get(&symbol));
        key.insert(symbol, value);
    }
    (Value::from(pattern), Value::Object(key))
}

fn single_char(s: &str) -> Option<char> {
    let mut chars = s.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Some(c),
        _ => None,
    }
}
