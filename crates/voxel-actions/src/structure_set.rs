//! Structure list and placement editing for structure sets.
//!
//! Structures are addressed as `structure_N`, their position in the list.
//! Any insertion, removal or reorder shifts later ordinals, so callers must
//! re-read ids after every edit.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use voxel_core::identifier::normalize_reference;
use voxel_schema::structure_set::{ExclusionZone, PlacementVariant, StructureEntry, StructureSetProps};

use crate::{ActionError, to_map, typed};

/// Accepted `exclusion_zone.chunk_count` range.
pub const CHUNK_COUNT_RANGE: std::ops::RangeInclusive<i64> = 1..=16;
/// Accepted range for each `locate_offset` component.
pub const LOCATE_OFFSET_RANGE: std::ops::RangeInclusive<i64> = -16..=16;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StructureSetAction {
    /// Insert a structure at `position`, or append it.
    AddStructure {
        structure: String,
        #[serde(default = "default_weight")]
        weight: i64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        position: Option<usize>,
    },
    RemoveStructure { structure_id: String },
    /// Set `structure` or `weight` of one entry.
    ModifyStructure {
        structure_id: String,
        property: String,
        value: Value,
    },
    ReorderStructures { from_index: usize, to_index: usize },
    /// Switch placement type, dropping the old variant's fields.
    SetPlacementType { placement_type: String },
    SetExclusionZone { other_set: String, chunk_count: i64 },
    RemoveExclusionZone,
    SetLocateOffset { x: i64, y: i64, z: i64 },
}

fn default_weight() -> i64 {
    1
}

impl StructureSetAction {
    pub fn kind(&self) -> &'static str {
        match self {
            StructureSetAction::AddStructure { .. } => "add_structure",
            StructureSetAction::RemoveStructure { .. } => "remove_structure",
            StructureSetAction::ModifyStructure { .. } => "modify_structure",
            StructureSetAction::ReorderStructures { .. } => "reorder_structures",
            StructureSetAction::SetPlacementType { .. } => "set_placement_type",
            StructureSetAction::SetExclusionZone { .. } => "set_exclusion_zone",
            StructureSetAction::RemoveExclusionZone => "remove_exclusion_zone",
            StructureSetAction::SetLocateOffset { .. } => "set_locate_offset",
        }
    }
}

/// Ordinal id of the structure at `index`.
pub fn structure_id(index: usize) -> String {
    format!("structure_{index}")
}

fn structure_index(id: &str, len: usize) -> Option<usize> {
    let index: usize = id.strip_prefix("structure_")?.parse().ok()?;
    (index < len).then_some(index)
}

pub(crate) fn apply(
    action: &StructureSetAction,
    element: &Map<String, Value>,
) -> Result<Option<Map<String, Value>>, ActionError> {
    let mut set: StructureSetProps = typed(element, action.kind(), "structure set", "structures")?;
    if !modify(action, &mut set)? {
        return Ok(None);
    }
    to_map(&set).map(Some)
}

fn modify(action: &StructureSetAction, set: &mut StructureSetProps) -> Result<bool, ActionError> {
    match action {
        StructureSetAction::AddStructure {
            structure,
            weight,
            position,
        } => {
            check_weight(*weight)?;
            let at = position.unwrap_or(set.structures.len()).min(set.structures.len());
            set.structures.insert(
                at,
                StructureEntry {
                    structure: structure.clone(),
                    weight: *weight,
                    unknown_fields: None,
                },
            );
            Ok(true)
        }
        StructureSetAction::RemoveStructure { structure_id } => {
            match structure_index(structure_id, set.structures.len()) {
                Some(i) => {
                    set.structures.remove(i);
                    Ok(true)
                }
                None => Ok(false),
            }
        }
        StructureSetAction::ModifyStructure {
            structure_id,
            property,
            value,
        } => {
            let Some(i) = structure_index(structure_id, set.structures.len()) else {
                return Ok(false);
            };
            let entry = &mut set.structures[i];
            match property.as_str() {
                "structure" => {
                    let id = value.as_str().ok_or_else(|| invalid(property, value))?;
                    entry.structure = id.to_string();
                }
                "weight" => {
                    let weight = value.as_i64().ok_or_else(|| invalid(property, value))?;
                    check_weight(weight)?;
                    entry.weight = weight;
                }
                other => {
                    log::debug!("modify_structure: unknown property '{other}'");
                    return Ok(false);
                }
            }
            Ok(true)
        }
        StructureSetAction::ReorderStructures {
            from_index,
            to_index,
        } => {
            let len = set.structures.len();
            if from_index == to_index || *from_index >= len || *to_index >= len {
                return Ok(false);
            }
            let entry = set.structures.remove(*from_index);
            set.structures.insert(*to_index, entry);
            Ok(true)
        }
        StructureSetAction::SetPlacementType { placement_type } => {
            if normalize_reference(placement_type) == normalize_reference(&set.placement_type) {
                return Ok(false);
            }
            set.placement_type = placement_type.clone();
            reset_variant_fields(set);
            Ok(true)
        }
        StructureSetAction::SetExclusionZone {
            other_set,
            chunk_count,
        } => {
            if !CHUNK_COUNT_RANGE.contains(chunk_count) {
                return Err(ActionError::InvalidValue {
                    field: "chunk_count".into(),
                    detail: format!("{chunk_count} is outside {CHUNK_COUNT_RANGE:?}"),
                });
            }
            set.exclusion_zone = Some(ExclusionZone {
                other_set: other_set.clone(),
                chunk_count: *chunk_count,
            });
            Ok(true)
        }
        StructureSetAction::RemoveExclusionZone => Ok(set.exclusion_zone.take().is_some()),
        StructureSetAction::SetLocateOffset { x, y, z } => {
            for (axis, v) in [("x", x), ("y", y), ("z", z)] {
                if !LOCATE_OFFSET_RANGE.contains(v) {
                    return Err(ActionError::InvalidValue {
                        field: format!("locate_offset.{axis}"),
                        detail: format!("{v} is outside {LOCATE_OFFSET_RANGE:?}"),
                    });
                }
            }
            set.locate_offset = Some([*x, *y, *z]);
            Ok(true)
        }
    }
}

/// Clear fields the new variant does not use and default its required ones.
fn reset_variant_fields(set: &mut StructureSetProps) {
    let variant = set.variant();
    if variant != PlacementVariant::ConcentricRings {
        set.distance = None;
        set.spread = None;
        set.count = None;
        set.preferred_biomes = None;
    }
    if variant != PlacementVariant::RandomSpread {
        set.spacing = None;
        set.separation = None;
        set.spread_type = None;
    }
    match variant {
        PlacementVariant::RandomSpread => {
            set.spacing.get_or_insert(32);
            set.separation.get_or_insert(8);
        }
        PlacementVariant::ConcentricRings => {
            set.distance.get_or_insert(32);
            set.spread.get_or_insert(3);
            set.count.get_or_insert(128);
        }
        PlacementVariant::Other => {}
    }
}

fn check_weight(weight: i64) -> Result<(), ActionError> {
    if weight < 1 {
        return Err(ActionError::InvalidValue {
            field: "weight".into(),
            detail: format!("{weight} is not positive"),
        });
    }
    Ok(())
}

fn invalid(property: &str, value: &Value) -> ActionError {
    ActionError::InvalidValue {
        field: property.to_string(),
        detail: format!("unexpected value {value}"),
    }
}
