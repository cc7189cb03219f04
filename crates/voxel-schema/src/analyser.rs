//! The Parser/Compiler contract every schema concept implements, and the
//! concept table used to dispatch by registry name.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use voxel_core::element::{
    CompiledElement, ConfiguratorOverride, DataDrivenRegistryElement, VoxelElement,
};

use crate::enchantment::EnchantmentAnalyser;
use crate::loot_table::LootTableAnalyser;
use crate::recipe::RecipeAnalyser;
use crate::structure_set::StructureSetAnalyser;

// ===========================================================================
// Errors
// ===========================================================================

/// Errors raised while converting between the two formats.
#[derive(Debug, thiserror::Error)]
pub enum ConvertError {
    /// The datapack has no element in the requested registry.
    #[error("no elements found in registry '{registry}'")]
    NoElements { registry: String },

    /// Canonical data does not have the shape the schema models.
    #[error("invalid {concept} data in {identifier}: {detail}")]
    InvalidShape {
        identifier: String,
        concept: &'static str,
        detail: String,
    },

    /// A datapack file could not be parsed as JSON.
    #[error("parse error in {path}: {detail}")]
    Parse { path: String, detail: String },

    /// No analyser is registered under the given name.
    #[error("unknown concept '{0}'")]
    UnknownConcept(String),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl ConvertError {
    /// Translation key the editor shows instead of a crash, for conditions
    /// that are expected with user data.
    pub fn warning_key(&self) -> Option<&'static str> {
        match self {
            ConvertError::NoElements { .. } => Some("tools.warning.no_elements"),
            _ => None,
        }
    }
}

// ===========================================================================
// Contract
// ===========================================================================

/// Input of a schema parser.
#[derive(Debug, Clone, Copy)]
pub struct ParserParams<'a> {
    pub element: &'a DataDrivenRegistryElement,
    /// Tags (`ns:path`) the element is listed in.
    pub tags: &'a [String],
    pub configurator: Option<&'a ConfiguratorOverride>,
}

impl<'a> ParserParams<'a> {
    pub fn new(element: &'a DataDrivenRegistryElement) -> Self {
        Self {
            element,
            tags: &[],
            configurator: None,
        }
    }

    pub fn with_tags(mut self, tags: &'a [String]) -> Self {
        self.tags = tags;
        self
    }

    pub fn with_configurator(mut self, configurator: Option<&'a ConfiguratorOverride>) -> Self {
        self.configurator = configurator;
        self
    }
}

/// A {parser, compiler} pair for one schema concept.
///
/// Parsers never mutate their input. Compilers overlay Voxel fields on a
/// clone of `original` when one is given, so unmodeled canonical content
/// survives; without it they emit only modeled fields. Compilers re-derive
/// the tag list from the Voxel fields every time.
pub trait Analyser {
    type Voxel: VoxelElement;

    const CONCEPT: Concept;

    fn parse(params: ParserParams<'_>) -> Result<Self::Voxel, ConvertError>;

    fn compile(element: &Self::Voxel, registry: &str, original: Option<&Value>) -> CompiledElement;
}

// ===========================================================================
// Concept table
// ===========================================================================

/// The schema concepts this crate converts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Concept {
    Enchantment,
    StructureSet,
    Recipe,
    LootTable,
}

impl Concept {
    pub const ALL: [Concept; 4] = [
        Concept::Enchantment,
        Concept::StructureSet,
        Concept::Recipe,
        Concept::LootTable,
    ];

    /// Short name used in configuration and on the command line.
    pub fn name(self) -> &'static str {
        match self {
            Concept::Enchantment => "enchantment",
            Concept::StructureSet => "structure_set",
            Concept::Recipe => "recipe",
            Concept::LootTable => "loot_table",
        }
    }

    /// Registry directory of the concept's files.
    pub fn registry(self) -> &'static str {
        match self {
            Concept::Enchantment => "enchantment",
            Concept::StructureSet => "worldgen/structure_set",
            Concept::Recipe => "recipe",
            Concept::LootTable => "loot_table",
        }
    }

    /// Registry of the tag files listing this concept's elements.
    pub fn tag_registry(self) -> String {
        format!("tags/{}", self.registry())
    }

    pub fn from_name(name: &str) -> Result<Self, ConvertError> {
        Self::ALL
            .into_iter()
            .find(|c| c.name() == name || c.registry() == name)
            .ok_or_else(|| ConvertError::UnknownConcept(name.to_string()))
    }

    /// Parse with this concept's analyser, returning the Voxel JSON view.
    pub fn parse_json(self, params: ParserParams<'_>) -> Result<Value, ConvertError> {
        match self {
            Concept::Enchantment => to_json(EnchantmentAnalyser::parse(params)?),
            Concept::StructureSet => to_json(StructureSetAnalyser::parse(params)?),
            Concept::Recipe => to_json(RecipeAnalyser::parse(params)?),
            Concept::LootTable => to_json(LootTableAnalyser::parse(params)?),
        }
    }

    /// Compile a Voxel JSON view with this concept's analyser.
    pub fn compile_json(
        self,
        voxel: Value,
        original: Option<&Value>,
    ) -> Result<CompiledElement, ConvertError> {
        let registry = self.registry();
        Ok(match self {
            Concept::Enchantment => {
                EnchantmentAnalyser::compile(&serde_json::from_value(voxel)?, registry, original)
            }
            Concept::StructureSet => {
                StructureSetAnalyser::compile(&serde_json::from_value(voxel)?, registry, original)
            }
            Concept::Recipe => {
                RecipeAnalyser::compile(&serde_json::from_value(voxel)?, registry, original)
            }
            Concept::LootTable => {
                LootTableAnalyser::compile(&serde_json::from_value(voxel)?, registry, original)
            }
        })
    }
}

fn to_json<T: Serialize>(value: T) -> Result<Value, ConvertError> {
    Ok(serde_json::to_value(value)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn concept_names_round_trip() {
        for concept in Concept::ALL {
            assert_eq!(Concept::from_name(concept.name()).unwrap(), concept);
            assert_eq!(Concept::from_name(concept.registry()).unwrap(), concept);
        }
        assert!(matches!(
            Concept::from_name("biome"),
            Err(ConvertError::UnknownConcept(_))
        ));
    }

    #[test]
    fn tag_registries() {
        assert_eq!(Concept::Enchantment.tag_registry(), "tags/enchantment");
        assert_eq!(
            Concept::StructureSet.tag_registry(),
            "tags/worldgen/structure_set"
        );
    }

    #[test]
    fn only_missing_elements_have_a_warning_key() {
        let e = ConvertError::NoElements {
            registry: "enchantment".into(),
        };
        assert_eq!(e.warning_key(), Some("tools.warning.no_elements"));
        assert!(e.to_string().contains("enchantment"));
        assert_eq!(ConvertError::UnknownConcept("x".into()).warning_key(), None);
    }
}
