//! Registry-wide conversion.
//!
//! [`parse_registry`] turns every element of a concept's registry into its
//! Voxel form; [`compile_registry`] turns edited Voxel elements back into
//! canonical files plus the tag files their membership implies. The `_json`
//! variants dispatch on a runtime [`Concept`].

use std::collections::{BTreeMap, HashMap, HashSet};

use serde_json::Value;
use voxel_core::element::{
    CompiledElement, ConfiguratorOverride, DataDrivenRegistryElement, VoxelElement,
};
use voxel_core::identifier::{DEFAULT_BASE, Identifier, normalize_reference};
use voxel_core::tags::{self, TagElement};

use crate::analyser::{Analyser, Concept, ConvertError, ParserParams};
use crate::datapack::{Datapack, ElementLabel, LabeledElement, MemoryDatapack, label_elements};

// ===========================================================================
// Parsing
// ===========================================================================

/// One element with the context its parser needs.
struct ParseInput {
    element: DataDrivenRegistryElement,
    tags: Vec<String>,
    configurator: Option<ConfiguratorOverride>,
}

impl ParseInput {
    fn params(&self) -> ParserParams<'_> {
        ParserParams::new(&self.element)
            .with_tags(&self.tags)
            .with_configurator(self.configurator.as_ref())
    }
}

fn collect_inputs<D: Datapack>(
    datapack: &D,
    concept: Concept,
    configurator_subdir: Option<&str>,
) -> Result<Vec<ParseInput>, ConvertError> {
    let registry = concept.registry();
    let elements = datapack.registry(registry)?;
    if elements.is_empty() {
        return Err(ConvertError::NoElements {
            registry: registry.to_string(),
        });
    }
    let tag_files = datapack.tag_registry(registry)?;

    elements
        .into_iter()
        .map(|element| {
            let configurator = match configurator_subdir {
                Some(subdir) => datapack.read_file(&element.identifier, Some(subdir))?,
                None => None,
            };
            Ok(ParseInput {
                tags: tags::related_tags(&tag_files, &element.identifier),
                element,
                configurator,
            })
        })
        .collect()
}

fn parse_with<T, F>(inputs: &[ParseInput], parse: F) -> Result<Vec<T>, ConvertError>
where
    T: Send,
    F: Fn(ParserParams<'_>) -> Result<T, ConvertError> + Send + Sync,
{
    #[cfg(feature = "parallel")]
    let parsed = {
        use rayon::prelude::*;
        inputs.par_iter().map(|input| parse(input.params())).collect()
    };

    #[cfg(not(feature = "parallel"))]
    let parsed = inputs.iter().map(|input| parse(input.params())).collect();

    parsed
}

/// Parse every element of `A`'s registry, keyed by unique key.
///
/// Fails with [`ConvertError::NoElements`] when the registry is empty and
/// with the first parser error otherwise.
pub fn parse_registry<A, D>(
    datapack: &D,
    configurator_subdir: Option<&str>,
) -> Result<BTreeMap<String, A::Voxel>, ConvertError>
where
    A: Analyser,
    A::Voxel: Send,
    D: Datapack,
{
    let inputs = collect_inputs(datapack, A::CONCEPT, configurator_subdir)?;
    let parsed = parse_with(&inputs, A::parse)?;
    log::debug!("parsed {} {} elements", parsed.len(), A::CONCEPT.name());
    Ok(parsed.into_iter().map(|v| (v.unique_key(), v)).collect())
}

/// [`parse_registry`] for a runtime concept, producing Voxel JSON views.
pub fn parse_registry_json<D: Datapack>(
    concept: Concept,
    datapack: &D,
    configurator_subdir: Option<&str>,
) -> Result<BTreeMap<String, Value>, ConvertError> {
    let inputs = collect_inputs(datapack, concept, configurator_subdir)?;
    let parsed = parse_with(&inputs, |params| concept.parse_json(params))?;
    Ok(inputs
        .iter()
        .map(|input| input.element.identifier.to_unique_key())
        .zip(parsed)
        .collect())
}

// ===========================================================================
// Compiling
// ===========================================================================

/// Canonical output of one registry.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledRegistry {
    pub elements: Vec<DataDrivenRegistryElement>,
    /// Tag files to write, including ones that lost members.
    pub tags: Vec<TagElement>,
    /// Per-element change against the datapack's current files.
    pub labels: Vec<LabeledElement>,
}

impl CompiledRegistry {
    /// Write elements and tags into `pack`, removing deleted element files.
    pub fn write_into(&self, pack: &mut MemoryDatapack) -> Result<(), ConvertError> {
        let present: HashSet<&Identifier> = self.elements.iter().map(|e| &e.identifier).collect();
        for label in &self.labels {
            if !present.contains(&label.identifier) {
                pack.remove(&label.identifier.to_file_path(DEFAULT_BASE));
            }
        }
        for element in &self.elements {
            pack.insert_element(element)?;
        }
        for tag in &self.tags {
            pack.insert_element(tag)?;
        }
        Ok(())
    }
}

fn finish<D: Datapack>(
    datapack: &D,
    registry: &str,
    previous: &[DataDrivenRegistryElement],
    compiled: Vec<CompiledElement>,
) -> Result<CompiledRegistry, ConvertError> {
    let mut tags = datapack.compiled_tags(registry, &compiled)?;
    let elements: Vec<DataDrivenRegistryElement> =
        compiled.into_iter().map(|c| c.element).collect();
    let labels = label_elements(previous, &elements);

    let deleted: HashSet<String> = labels
        .iter()
        .filter(|l| l.label == ElementLabel::Deleted)
        .map(|l| l.identifier.reference())
        .collect();
    if !deleted.is_empty() {
        for tag in &mut tags {
            tag.data.values.retain(|v| {
                v.id().starts_with('#') || !deleted.contains(&normalize_reference(v.id()))
            });
        }
    }
    log::debug!(
        "compiled {} elements and {} tags into {registry}",
        elements.len(),
        tags.len()
    );
    Ok(CompiledRegistry {
        elements,
        tags,
        labels,
    })
}

fn originals(previous: &[DataDrivenRegistryElement]) -> HashMap<(&str, &str), &Value> {
    previous
        .iter()
        .map(|e| {
            (
                (e.identifier.namespace.as_str(), e.identifier.resource.as_str()),
                &e.data,
            )
        })
        .collect()
}

/// Compile edited elements of `A`'s registry. Each element is overlaid on
/// the datapack's current file of the same identifier, if any.
pub fn compile_registry<A, D>(datapack: &D, elements: &[A::Voxel]) -> Result<CompiledRegistry, ConvertError>
where
    A: Analyser,
    D: Datapack,
{
    let registry = A::CONCEPT.registry();
    let previous = datapack.registry(registry)?;
    let by_id = originals(&previous);

    let compiled = elements
        .iter()
        .map(|element| {
            let id = element.identifier();
            let original = by_id
                .get(&(id.namespace.as_str(), id.resource.as_str()))
                .copied();
            A::compile(element, registry, original)
        })
        .collect();

    finish(datapack, registry, &previous, compiled)
}

/// [`compile_registry`] for a runtime concept, from Voxel JSON views.
pub fn compile_registry_json<D: Datapack>(
    concept: Concept,
    datapack: &D,
    elements: Vec<Value>,
) -> Result<CompiledRegistry, ConvertError> {
    let registry = concept.registry();
    let previous = datapack.registry(registry)?;
    let by_id = originals(&previous);

    let compiled = elements
        .into_iter()
        .map(|voxel| {
            let identifier: Identifier = serde_json::from_value(
                voxel.get("identifier").cloned().unwrap_or(Value::Null),
            )?;
            let original = by_id
                .get(&(identifier.namespace.as_str(), identifier.resource.as_str()))
                .copied();
            concept.compile_json(voxel, original)
        })
        .collect::<Result<Vec<_>, ConvertError>>()?;

    finish(datapack, registry, &previous, compiled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enchantment::{EnchantmentAnalyser, EnchantmentMode};
    use serde_json::json;

    fn enchantment(weight: i64) -> Value {
        json!({
            "description": "x",
            "supported_items": "#minecraft:enchantable/sword",
            "weight": weight,
            "max_level": 1,
            "min_cost": {"base": 1, "per_level_above_first": 1},
            "max_cost": {"base": 2, "per_level_above_first": 1},
            "anvil_cost": 1,
            "slots": ["mainhand"],
            "effects": {"minecraft:damage": []}
        })
    }

    fn pack() -> MemoryDatapack {
        let mut pack = MemoryDatapack::new();
        pack.insert_json("data/minecraft/enchantment/sharpness.json", &enchantment(10))
            .unwrap();
        pack.insert_json("data/minecraft/enchantment/smite.json", &enchantment(5))
            .unwrap();
        pack.insert_json(
            "data/minecraft/tags/enchantment/curse.json",
            &json!({"values": ["minecraft:smite"]}),
        )
        .unwrap();
        pack.insert_json(
            "data/minecraft/voxel/enchantment/smite.json",
            &json!({"configurator": {"hide": true}}),
        )
        .unwrap();
        pack
    }

    #[test]
    fn empty_registry_is_no_elements() {
        let err = parse_registry::<EnchantmentAnalyser, _>(&MemoryDatapack::new(), None).unwrap_err();
        assert!(matches!(err, ConvertError::NoElements { .. }));
        assert_eq!(err.warning_key(), Some("tools.warning.no_elements"));
    }

    #[test]
    fn parse_attaches_tags_and_configurator() {
        let parsed = parse_registry::<EnchantmentAnalyser, _>(&pack(), Some("voxel")).unwrap();
        assert_eq!(parsed.len(), 2);
        let smite = &parsed["minecraft:smite$enchantment"];
        assert_eq!(smite.tags, vec!["minecraft:curse"]);
        assert_eq!(smite.mode, EnchantmentMode::OnlyCreative);
        assert!(smite.override_.as_ref().unwrap().configurator.hide);
        assert!(parsed["minecraft:sharpness$enchantment"].override_.is_none());
    }

    #[test]
    fn compile_round_trip_is_unchanged() {
        let pack = pack();
        let parsed = parse_registry::<EnchantmentAnalyser, _>(&pack, None).unwrap();
        let elements: Vec<_> = parsed.into_values().collect();
        let out = compile_registry::<EnchantmentAnalyser, _>(&pack, &elements).unwrap();
        assert!(out.labels.iter().all(|l| l.label == ElementLabel::Unchanged));
        let curse = out.tags.iter().find(|t| t.identifier.resource == "curse").unwrap();
        assert_eq!(tags::tag_values(&curse.data), vec!["minecraft:smite"]);
    }

    #[test]
    fn compile_moves_membership_and_labels_changes() {
        let mut pack = pack();
        let parsed = parse_registry::<EnchantmentAnalyser, _>(&pack, None).unwrap();
        let mut sharpness = parsed["minecraft:sharpness$enchantment"].clone();
        sharpness.weight = 1;
        sharpness.tags = vec!["minecraft:curse".into()];

        let out = compile_registry::<EnchantmentAnalyser, _>(&pack, &[sharpness]).unwrap();
        let labels: Vec<ElementLabel> = out.labels.iter().map(|l| l.label).collect();
        assert_eq!(labels, vec![ElementLabel::Updated, ElementLabel::Deleted]);

        let curse = out.tags.iter().find(|t| t.identifier.resource == "curse").unwrap();
        assert_eq!(tags::tag_values(&curse.data), vec!["minecraft:sharpness"]);

        out.write_into(&mut pack).unwrap();
        assert!(pack.file("data/minecraft/enchantment/smite.json").is_none());
        let written = pack.registry("enchantment").unwrap();
        assert_eq!(written.len(), 1);
        assert_eq!(written[0].data["weight"], json!(1));
    }

    #[test]
    fn json_variants_match_typed() {
        let pack = pack();
        let views = parse_registry_json(Concept::Enchantment, &pack, None).unwrap();
        assert_eq!(views["minecraft:smite$enchantment"]["mode"], json!("only_creative"));

        let out = compile_registry_json(Concept::Enchantment, &pack, views.into_values().collect())
            .unwrap();
        assert_eq!(out.elements.len(), 2);
        assert!(out.labels.iter().all(|l| l.label == ElementLabel::Unchanged));
    }
}
