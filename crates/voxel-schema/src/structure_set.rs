//! Structure set schema.
//!
//! `placement` is flattened into the root. Which placement fields exist
//! depends on the placement type; the compiler writes only the fields of the
//! current variant.

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

pub const RANDOM_SPREAD: &str = "minecraft:random_spread";
pub const CONCENTRIC_RINGS: &str = "minecraft:concentric_rings";

const ROOT_FIELDS: [&str; 2] = ["structures", "placement"];

const ENTRY_FIELDS: [&str; 2] = ["structure", "weight"];

const ZONE_FIELDS: [&str; 2] = ["other_set", "chunk_count"];

const COMMON_FIELDS: [&str; 6] = [
    "type",
    "salt",
    "frequency_reduction_method",
    "frequency",
    "locate_offset",
    "exclusion_zone",
];

const CONCENTRIC_FIELDS: [&str; 4] = ["distance", "spread", "count", "preferred_biomes"];

const RANDOM_SPREAD_FIELDS: [&str; 3] = ["spacing", "separation", "spread_type"];

// ===========================================================================
// Voxel shape
// ===========================================================================

/// Placement variant, derived from the placement type string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlacementVariant {
    RandomSpread,
    ConcentricRings,
    Other,
}

impl PlacementVariant {
    pub fn of(placement_type: &str) -> Self {
        match normalize_reference(placement_type).as_str() {
            RANDOM_SPREAD => PlacementVariant::RandomSpread,
            CONCENTRIC_RINGS => PlacementVariant::ConcentricRings,
            _ => PlacementVariant::Other,
        }
    }

    /// Canonical placement keys specific to this variant.
    pub fn fields(self) -> &'static [&'static str] {
        match self {
            PlacementVariant::RandomSpread => &RANDOM_SPREAD_FIELDS,
            PlacementVariant::ConcentricRings => &CONCENTRIC_FIELDS,
            PlacementVariant::Other => &[],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StructureEntry {
    pub structure: String,
    pub weight: i64,
    /// Extra keys of this `structures` entry.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unknown_fields: Option<UnknownFields>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExclusionZone {
    pub other_set: String,
    pub chunk_count: i64,
}

/// Flattened editor view of a structure set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StructureSetProps {
    pub identifier: Identifier,
    #[serde(rename = "override", default, skip_serializing_if = "Option::is_none")]
    pub override_: Option<ConfiguratorOverride>,
    pub structures: Vec<StructureEntry>,
    pub placement_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub salt: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frequency_reduction_method: Option<String>,
    /// Kept as a JSON number so integer and float spellings survive.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frequency: Option<Number>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locate_offset: Option<[i64; 3]>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exclusion_zone: Option<ExclusionZone>,

    // concentric rings
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distance: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spread: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preferred_biomes: Option<Vec<String>>,

    // random spread
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spacing: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub separation: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spread_type: Option<String>,

    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unknown_fields: Option<UnknownFields>,
}

impl StructureSetProps {
    pub fn variant(&self) -> PlacementVariant {
        PlacementVariant::of(&self.placement_type)
    }
}

impl VoxelElement for StructureSetProps {
    fn identifier(&self) -> &Identifier {
        &self.identifier
    }

    fn tags(&self) -> &[String] {
        &self.tags
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Biomes {
    One(String),
    Many(Vec<String>),
}

// ===========================================================================
// Analyser
// ===========================================================================

pub struct StructureSetAnalyser;

impl Analyser for StructureSetAnalyser {
    type Voxel = StructureSetProps;

    const CONCEPT: Concept = Concept::StructureSet;

    fn parse(params: ParserParams<'_>) -> Result<StructureSetProps, ConvertError> {
        let f = Fields::root(params.element, "structure_set")?;
        let placement = f
            .object("placement")?
            .ok_or_else(|| f.invalid("missing required field 'placement'"))?;

        let placement_type: String = placement.required("type")?;
        let variant = PlacementVariant::of(&placement_type);

        let mut zone_unknown = None;
        let exclusion_zone = match placement.object("exclusion_zone")? {
            Some(zone) => {
                zone_unknown = extract_unknown_fields(zone.map(), &ZONE_FIELDS);
                Some(ExclusionZone {
                    other_set: zone.required("other_set")?,
                    chunk_count: zone.required("chunk_count")?,
                })
            }
            None => None,
        };

        if f.raw("structures").is_none() {
            return Err(f.invalid("missing required field 'structures'"));
        }
        let structures = f
            .array("structures")?
            .iter()
            .map(|entry| {
                let Value::Object(obj) = entry else {
                    return Err(f.invalid("field 'structures': expected a list of objects"));
                };
                let e = f.nested(obj);
                Ok(StructureEntry {
                    structure: e.required("structure")?,
                    weight: e.required("weight")?,
                    unknown_fields: extract_unknown_fields(obj, &ENTRY_FIELDS),
                })
            })
            .collect::<Result<Vec<_>, ConvertError>>()?;

        let mut props = StructureSetProps {
            identifier: params.element.identifier.clone(),
            override_: params.configurator.cloned(),
            structures,
            placement_type,
            salt: placement.optional("salt")?,
            frequency_reduction_method: placement.optional("frequency_reduction_method")?,
            frequency: placement.optional("frequency")?,
            locate_offset: placement.optional("locate_offset")?,
            exclusion_zone,
            distance: None,
            spread: None,
            count: None,
            preferred_biomes: None,
            spacing: None,
            separation: None,
            spread_type: None,
            tags: params.tags.iter().map(|t| normalize_reference(t)).collect(),
            unknown_fields: None,
        };

        match variant {
            PlacementVariant::ConcentricRings => {
                props.distance = placement.optional("distance")?;
                props.spread = placement.optional("spread")?;
                props.count = placement.optional("count")?;
                props.preferred_biomes =
                    placement.optional::<Biomes>("preferred_biomes")?.map(|b| match b {
                        Biomes::One(biome) => vec![biome],
                        Biomes::Many(biomes) => biomes,
                    });
            }
            PlacementVariant::RandomSpread => {
                props.spacing = placement.optional("spacing")?;
                props.separation = placement.optional("separation")?;
                props.spread_type = placement.optional("spread_type")?;
            }
            PlacementVariant::Other => {
                log::debug!(
                    "structure set {} uses unmodeled placement {}",
                    params.element.identifier,
                    props.placement_type
                );
            }
        }

        let placement_known: Vec<&str> = COMMON_FIELDS
            .iter()
            .chain(variant.fields())
            .copied()
            .collect();
        props.unknown_fields = nest_unknown_fields(
            extract_unknown_fields(f.map(), &ROOT_FIELDS),
            [(
                "placement",
                nest_unknown_fields(
                    extract_unknown_fields(placement.map(), &placement_known),
                    [("exclusion_zone", zone_unknown)],
                ),
            )],
        );

        Ok(props)
    }

    fn compile(element: &StructureSetProps, registry: &str, original: Option<&Value>) -> CompiledElement {
        let mut data = base_object(original);
        let mut placement = data
            .get("placement")
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default();

        let mut emitted = Map::new();
        emitted.insert("type".into(), element.placement_type.clone().into());
        insert_opt(&mut emitted, "salt", element.salt);
        insert_opt(
            &mut emitted,
            "frequency_reduction_method",
            element.frequency_reduction_method.clone(),
        );
        insert_opt(&mut emitted, "frequency", element.frequency.clone());
        insert_opt(
            &mut emitted,
            "locate_offset",
            element.locate_offset.map(|o| Value::from(o.to_vec())),
        );
        if let Some(zone) = &element.exclusion_zone {
            let mut z = placement
                .get("exclusion_zone")
                .and_then(Value::as_object)
                .cloned()
                .unwrap_or_default();
            z.insert("other_set".into(), zone.other_set.clone().into());
            z.insert("chunk_count".into(), zone.chunk_count.into());
            merge_unknown_fields(
                &mut z,
                nested_unknown(
                    nested_unknown(element.unknown_fields.as_ref(), "placement"),
                    "exclusion_zone",
                ),
                &[],
            );
            emitted.insert("exclusion_zone".into(), Value::Object(z));
        }

        match element.variant() {
            PlacementVariant::ConcentricRings => {
                insert_opt(&mut emitted, "distance", element.distance);
                insert_opt(&mut emitted, "spread", element.spread);
                insert_opt(&mut emitted, "count", element.count);
                if let Some(biomes) = &element.preferred_biomes {
                    let was_single = placement
                        .get("preferred_biomes")
                        .is_some_and(Value::is_string);
                    let value = match biomes.as_slice() {
                        [only] if was_single => Value::String(only.clone()),
                        _ => Value::from(biomes.clone()),
                    };
                    emitted.insert("preferred_biomes".into(), value);
                }
            }
            PlacementVariant::RandomSpread => {
                insert_opt(&mut emitted, "spacing", element.spacing);
                insert_opt(&mut emitted, "separation", element.separation);
                insert_opt(&mut emitted, "spread_type", element.spread_type.clone());
            }
            PlacementVariant::Other => {}
        }

        let modeled: Vec<&str> = COMMON_FIELDS
            .iter()
            .chain(&CONCENTRIC_FIELDS)
            .chain(&RANDOM_SPREAD_FIELDS)
            .copied()
            .collect();
        overlay(&mut placement, emitted, &modeled);
        merge_unknown_fields(
            &mut placement,
            nested_unknown(element.unknown_fields.as_ref(), "placement"),
            &["exclusion_zone"],
        );

        let structures = element
            .structures
            .iter()
            .map(|s| {
                let mut entry = Map::new();
                entry.insert("structure".into(), s.structure.clone().into());
                entry.insert("weight".into(), s.weight.into());
                merge_unknown_fields(&mut entry, s.unknown_fields.as_ref(), &[]);
                Value::Object(entry)
            })
            .collect::<Vec<_>>();

        let mut root = Map::new();
        root.insert("structures".into(), Value::Array(structures));
        root.insert("placement".into(), Value::Object(placement));
        overlay(&mut data, root, &ROOT_FIELDS);
        merge_unknown_fields(&mut data, element.unknown_fields.as_ref(), &["placement"]);

        let mut identifier = element.identifier.clone();
        identifier.registry = registry.to_string();
        CompiledElement {
            element: DataDrivenRegistryElement::new(identifier, Value::Object(data)),
            tags: tags_to_identifiers(&element.tags, &format!("tags/{registry}")),
        }
    }
}
