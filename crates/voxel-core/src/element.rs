//! Registry elements in both representations.
//!
//! A [`DataDrivenRegistryElement`] is a file as Minecraft reads it; a
//! [`VoxelElement`] is the flattened editor view of the same resource.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::identifier::Identifier;

/// One resource of a registry in canonical (data-driven) form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataDrivenRegistryElement<T = Value> {
    pub identifier: Identifier,
    pub data: T,
}

impl<T> DataDrivenRegistryElement<T> {
    pub fn new(identifier: Identifier, data: T) -> Self {
        Self { identifier, data }
    }
}

/// Per-element UI overrides read from the datapack's configurator files.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfiguratorOverride {
    pub configurator: ConfiguratorFlags,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfiguratorFlags {
    #[serde(default)]
    pub hide: bool,
}

/// Unmodeled canonical keys carried through a round trip.
pub type UnknownFields = Map<String, Value>;

/// Contract shared by every Voxel shape.
///
/// Voxel shapes serialize with camelCase field names; the action engine and
/// the rule DSLs address them through that JSON view.
pub trait VoxelElement: Clone + Serialize + DeserializeOwned {
    fn identifier(&self) -> &Identifier;

    fn unique_key(&self) -> String {
        self.identifier().to_unique_key()
    }

    /// Tags (`ns:path`, no `#`) this element declares membership in.
    fn tags(&self) -> &[String];
}

/// Output of a schema compiler: the canonical element plus the tags it
/// belongs to, re-derived from the Voxel fields.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledElement<T = Value> {
    pub element: DataDrivenRegistryElement<T>,
    pub tags: Vec<Identifier>,
}
