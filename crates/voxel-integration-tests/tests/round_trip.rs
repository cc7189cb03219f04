//! Integration test: whole-pack round trips.
//!
//! Builds one in-memory datapack holding every concept, parses each registry
//! into Voxel views, compiles them back, and checks that nothing changes
//! unless an element was edited or dropped.

use serde_json::{Value, json};
use voxel_core::tags::tag_values;
use voxel_schema::datapack::ElementLabel;
use voxel_schema::enchantment::{EnchantmentAnalyser, EnchantmentMode};
use voxel_schema::pipeline::{compile_registry_json, parse_registry_json};
use voxel_schema::{Concept, ConvertError, Datapack, MemoryDatapack, compile_registry, parse_registry};

// ---------------------------------------------------------------------------
// Fixture
// ---------------------------------------------------------------------------

fn pack() -> MemoryDatapack {
    let mut pack = MemoryDatapack::new();
    let mut put = |path: &str, value: Value| pack.insert_json(path, &value).unwrap();

    put(
        "pack.mcmeta",
        json!({"pack": {"pack_format": 61, "description": "fixture"}}),
    );

    put(
        "data/minecraft/enchantment/sharpness.json",
        json!({
            "description": {"translate": "enchantment.minecraft.sharpness"},
            "exclusive_set": "#minecraft:exclusive_set/damage",
            "supported_items": "#minecraft:enchantable/sharp_weapon",
            "primary_items": "#minecraft:enchantable/sword",
            "weight": 10,
            "max_level": 5,
            "min_cost": {"base": 1, "per_level_above_first": 11},
            "max_cost": {"base": 21, "per_level_above_first": 11},
            "anvil_cost": 1,
            "slots": ["mainhand"],
            "effects": {
                "minecraft:damage": [{"effect": {"type": "minecraft:add", "value": 1.0}}]
            },
            "neoforge:extra": {"kept": true}
        }),
    );
    put(
        "data/minecraft/enchantment/binding_curse.json",
        json!({
            "description": {"translate": "enchantment.minecraft.binding_curse"},
            "supported_items": "#minecraft:enchantable/equippable",
            "weight": 1,
            "max_level": 1,
            "min_cost": {"base": 25, "per_level_above_first": 0},
            "max_cost": {"base": 50, "per_level_above_first": 0},
            "anvil_cost": 8,
            "slots": ["armor"],
            "effects": {"minecraft:prevent_armor_change": {}}
        }),
    );
    put(
        "data/minecraft/tags/enchantment/exclusive_set/damage.json",
        json!({"values": ["minecraft:sharpness", "minecraft:smite"]}),
    );
    put(
        "data/minecraft/tags/enchantment/in_enchanting_table.json",
        json!({"values": ["minecraft:sharpness"]}),
    );
    put(
        "data/minecraft/tags/enchantment/curse.json",
        json!({"values": ["minecraft:binding_curse"]}),
    );

    put(
        "data/minecraft/worldgen/structure_set/villages.json",
        json!({
            "structures": [
                {"structure": "minecraft:village_plains", "weight": 1},
                {"structure": "minecraft:village_desert", "weight": 1}
            ],
            "placement": {
                "type": "minecraft:random_spread",
                "salt": 10387312,
                "spacing": 34,
                "separation": 8
            }
        }),
    );

    put(
        "data/minecraft/recipe/torch.json",
        json!({
            "type": "minecraft:crafting_shaped",
            "category": "misc",
            "pattern": ["C", "S"],
            "key": {"C": ["minecraft:coal", "minecraft:charcoal"], "S": "minecraft:stick"},
            "result": {"id": "minecraft:torch", "count": 4}
        }),
    );
    put(
        "data/minecraft/recipe/iron_ingot_from_smelting_iron_ore.json",
        json!({
            "type": "minecraft:smelting",
            "category": "misc",
            "group": "iron_ingot",
            "ingredient": "minecraft:iron_ore",
            "result": {"id": "minecraft:iron_ingot"},
            "experience": 0.7,
            "cookingtime": 200
        }),
    );

    put(
        "data/minecraft/loot_table/chests/simple_dungeon.json",
        json!({
            "type": "minecraft:chest",
            "pools": [
                {
                    "rolls": {"type": "minecraft:uniform", "min": 1, "max": 3},
                    "entries": [
                        {"type": "minecraft:item", "name": "minecraft:saddle", "weight": 20},
                        {"type": "minecraft:alternatives", "children": [
                            {"type": "minecraft:item", "name": "minecraft:golden_apple"},
                            {"type": "minecraft:empty"}
                        ]}
                    ]
                }
            ],
            "random_sequence": "minecraft:chests/simple_dungeon"
        }),
    );
    pack
}

fn data(pack: &MemoryDatapack, path: &str) -> Value {
    pack.read_json(path).unwrap().unwrap()
}

// ---------------------------------------------------------------------------
// Round trips
// ---------------------------------------------------------------------------

#[test]
fn every_concept_round_trips_unchanged() {
    let pack = pack();
    for concept in Concept::ALL {
        let views = parse_registry_json(concept, &pack, None).unwrap();
        assert!(!views.is_empty(), "{} parsed nothing", concept.name());

        let compiled =
            compile_registry_json(concept, &pack, views.into_values().collect()).unwrap();
        for labeled in &compiled.labels {
            assert_eq!(
                labeled.label,
                ElementLabel::Unchanged,
                "{} changed during the round trip",
                labeled.identifier
            );
        }
    }
}

#[test]
fn writing_an_unchanged_registry_keeps_the_files() {
    let pack = pack();
    let mut written = pack.clone();
    for concept in Concept::ALL {
        let views = parse_registry_json(concept, &pack, None).unwrap();
        compile_registry_json(concept, &pack, views.into_values().collect())
            .unwrap()
            .write_into(&mut written)
            .unwrap();
    }

    for path in pack.paths() {
        if path.contains("/tags/") {
            let mut before = tag_ids(&data(&pack, path));
            let mut after = tag_ids(&data(&written, path));
            before.sort();
            after.sort();
            assert_eq!(after, before, "{path} membership differs");
        } else {
            assert_eq!(data(&written, path), data(&pack, path), "{path} differs");
        }
    }
}

fn tag_ids(tag: &Value) -> Vec<String> {
    tag["values"]
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v.as_str().unwrap().to_string())
        .collect()
}

#[test]
fn unknown_keys_survive_compilation() {
    let pack = pack();
    let parsed = parse_registry::<EnchantmentAnalyser, _>(&pack, None).unwrap();
    let compiled = compile_registry::<EnchantmentAnalyser, _>(
        &pack,
        &parsed.into_values().collect::<Vec<_>>(),
    )
    .unwrap();

    let sharpness = compiled
        .elements
        .iter()
        .find(|e| e.identifier.resource == "sharpness")
        .unwrap();
    assert_eq!(sharpness.data["neoforge:extra"], json!({"kept": true}));
}

// ---------------------------------------------------------------------------
// Tags and modes
// ---------------------------------------------------------------------------

#[test]
fn modes_follow_tag_membership() {
    let pack = pack();
    let parsed = parse_registry::<EnchantmentAnalyser, _>(&pack, None).unwrap();

    let sharpness = &parsed["minecraft:sharpness$enchantment"];
    assert_eq!(sharpness.mode, EnchantmentMode::Normal);
    assert!(sharpness.tags.contains(&"minecraft:in_enchanting_table".to_string()));

    let curse = &parsed["minecraft:binding_curse$enchantment"];
    assert_eq!(curse.mode, EnchantmentMode::OnlyCreative);
    assert_eq!(curse.tags, vec!["minecraft:curse".to_string()]);
}

#[test]
fn dropped_elements_leave_files_and_tags() {
    let pack = pack();
    let parsed = parse_registry::<EnchantmentAnalyser, _>(&pack, None).unwrap();
    let kept: Vec<_> = parsed
        .into_values()
        .filter(|e| e.identifier.resource != "sharpness")
        .collect();

    let compiled = compile_registry::<EnchantmentAnalyser, _>(&pack, &kept).unwrap();
    let sharpness = compiled
        .labels
        .iter()
        .find(|l| l.identifier.resource == "sharpness")
        .unwrap();
    assert_eq!(sharpness.label, ElementLabel::Deleted);

    let damage = compiled
        .tags
        .iter()
        .find(|t| t.identifier.resource == "exclusive_set/damage")
        .unwrap();
    assert_eq!(tag_values(&damage.data), vec!["minecraft:smite"]);

    let mut written = pack.clone();
    compiled.write_into(&mut written).unwrap();
    assert!(written.file("data/minecraft/enchantment/sharpness.json").is_none());
    assert!(written.file("data/minecraft/enchantment/binding_curse.json").is_some());
}

#[test]
fn empty_registries_are_reported() {
    let mut pack = MemoryDatapack::new();
    pack.insert_json("pack.mcmeta", &json!({"pack": {"pack_format": 48}}))
        .unwrap();
    assert_eq!(pack.pack_format().unwrap(), Some(48));

    let err = parse_registry_json(Concept::Recipe, &pack, None).unwrap_err();
    assert!(matches!(err, ConvertError::NoElements { .. }));
    assert_eq!(err.warning_key(), Some("tools.warning.no_elements"));
}

// ---------------------------------------------------------------------------
// Directories
// ---------------------------------------------------------------------------

#[test]
fn directory_round_trip() {
    let pack = pack();
    let root = std::env::temp_dir().join(format!("voxel-round-trip-{}", std::process::id()));
    pack.write_dir(&root).unwrap();

    let reloaded = MemoryDatapack::from_dir(&root).unwrap();
    std::fs::remove_dir_all(&root).unwrap();

    assert_eq!(reloaded.len(), pack.len());
    for path in pack.paths() {
        assert_eq!(data(&reloaded, path), data(&pack, path), "{path} differs");
    }
}
