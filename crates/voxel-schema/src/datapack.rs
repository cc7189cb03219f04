//! Datapack access: registry listing, typed file reads, tag lookups.
//!
//! [`Datapack`] only needs raw file access; everything else is provided on
//! top of it. [`MemoryDatapack`] keeps the files in a path-keyed map and can
//! be filled from or written to a directory.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use voxel_core::element::{CompiledElement, DataDrivenRegistryElement};
use voxel_core::identifier::{DEFAULT_BASE, Identifier, normalize_reference};
use voxel_core::tags::{self, TagElement, create_tag_from_element, merge_data_driven_registry_element};

use crate::analyser::ConvertError;

/// File name of the pack metadata at the datapack root.
pub const PACK_METADATA: &str = "pack.mcmeta";

// ===========================================================================
// Datapack trait
// ===========================================================================

/// Read access to the files of one datapack.
///
/// Paths are relative to the pack root and use `/` separators
/// (`data/minecraft/enchantment/sharpness.json`).
pub trait Datapack {
    /// Every file path in the pack.
    fn paths(&self) -> Vec<&str>;

    /// Raw content of the file at `path`.
    fn file(&self, path: &str) -> Option<&[u8]>;

    /// Parse the file at `path` as JSON; `None` when there is no such file.
    fn read_json(&self, path: &str) -> Result<Option<Value>, ConvertError> {
        let Some(bytes) = self.file(path) else {
            return Ok(None);
        };
        serde_json::from_slice(bytes)
            .map(Some)
            .map_err(|e| ConvertError::Parse {
                path: path.to_string(),
                detail: e.to_string(),
            })
    }

    /// Every element of `registry` (`enchantment`, `tags/item`, ...), in path
    /// order.
    fn registry(&self, registry: &str) -> Result<Vec<DataDrivenRegistryElement>, ConvertError> {
        let mut elements = Vec::new();
        for path in self.paths() {
            let Some(identifier) = Identifier::from_file_path(path, registry) else {
                continue;
            };
            if let Some(data) = self.read_json(path)? {
                elements.push(DataDrivenRegistryElement::new(identifier, data));
            }
        }
        Ok(elements)
    }

    /// Tag files listing elements of `registry`.
    fn tag_registry(&self, registry: &str) -> Result<Vec<TagElement>, ConvertError> {
        self.registry(&format!("tags/{registry}"))?
            .into_iter()
            .map(|element| {
                let path = element.identifier.to_file_path(DEFAULT_BASE);
                let tag = serde_json::from_value(element.data).map_err(|e| ConvertError::Parse {
                    path,
                    detail: e.to_string(),
                })?;
                Ok(DataDrivenRegistryElement::new(element.identifier, tag))
            })
            .collect()
    }

    /// Read `data/<ns>/[<subdir>/]<registry>/<resource>.json` as `T`.
    fn read_file<T: DeserializeOwned>(
        &self,
        identifier: &Identifier,
        subdir: Option<&str>,
    ) -> Result<Option<T>, ConvertError>
    where
        Self: Sized,
    {
        let registry = match subdir {
            Some(subdir) => format!("{subdir}/{}", identifier.registry),
            None => identifier.registry.clone(),
        };
        let path = Identifier::new(&identifier.namespace, &registry, &identifier.resource)
            .to_file_path(DEFAULT_BASE);
        let Some(value) = self.read_json(&path)? else {
            return Ok(None);
        };
        serde_json::from_value(value)
            .map(Some)
            .map_err(|e| ConvertError::Parse {
                path,
                detail: e.to_string(),
            })
    }

    /// Tags of `registry` listing `identifier` directly.
    fn related_tags(&self, registry: &str, identifier: &Identifier) -> Result<Vec<String>, ConvertError> {
        Ok(tags::related_tags(&self.tag_registry(registry)?, identifier))
    }

    /// Tag files to write after compiling `compiled` elements of `registry`.
    ///
    /// Existing tags lose every compiled element (membership is re-derived
    /// from the compiled output), then the compiled membership is merged in.
    fn compiled_tags(
        &self,
        registry: &str,
        compiled: &[CompiledElement],
    ) -> Result<Vec<TagElement>, ConvertError> {
        let members: HashSet<String> = compiled
            .iter()
            .map(|c| c.element.identifier.reference())
            .collect();

        let existing = self
            .tag_registry(registry)?
            .into_iter()
            .map(|mut tag| {
                tag.data.values.retain(|v| {
                    v.id().starts_with('#') || !members.contains(&normalize_reference(v.id()))
                });
                tag
            })
            .collect();

        Ok(merge_data_driven_registry_element(
            existing,
            create_tag_from_element(compiled),
        ))
    }

    /// `pack.pack_format` from the pack metadata.
    fn pack_format(&self) -> Result<Option<u32>, ConvertError> {
        #[derive(Deserialize)]
        struct Metadata {
            pack: PackSection,
        }
        #[derive(Deserialize)]
        struct PackSection {
            pack_format: u32,
        }

        let Some(value) = self.read_json(PACK_METADATA)? else {
            return Ok(None);
        };
        let metadata: Metadata = serde_json::from_value(value).map_err(|e| ConvertError::Parse {
            path: PACK_METADATA.to_string(),
            detail: e.to_string(),
        })?;
        Ok(Some(metadata.pack.pack_format))
    }
}

// ===========================================================================
// In-memory datapack
// ===========================================================================

/// A datapack held as a path → bytes map.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryDatapack {
    files: BTreeMap<String, Vec<u8>>,
}

impl MemoryDatapack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_files<I, P>(files: I) -> Self
    where
        I: IntoIterator<Item = (P, Vec<u8>)>,
        P: Into<String>,
    {
        Self {
            files: files.into_iter().map(|(p, b)| (p.into(), b)).collect(),
        }
    }

    /// Load every file under `root`, keyed by its path relative to `root`.
    pub fn from_dir(root: &Path) -> Result<Self, ConvertError> {
        let mut pack = Self::new();
        let mut pending = vec![root.to_path_buf()];
        while let Some(dir) = pending.pop() {
            for entry in std::fs::read_dir(&dir)? {
                let path = entry?.path();
                if path.is_dir() {
                    pending.push(path);
                    continue;
                }
                let Ok(relative) = path.strip_prefix(root) else {
                    continue;
                };
                let key = relative
                    .components()
                    .map(|c| c.as_os_str().to_string_lossy())
                    .collect::<Vec<_>>()
                    .join("/");
                pack.files.insert(key, std::fs::read(&path)?);
            }
        }
        log::debug!("loaded {} files from {}", pack.files.len(), root.display());
        Ok(pack)
    }

    /// Write every file under `root`, creating directories as needed.
    pub fn write_dir(&self, root: &Path) -> Result<(), ConvertError> {
        for (path, bytes) in &self.files {
            let target = root.join(path);
            if let Some(parent) = target.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(target, bytes)?;
        }
        Ok(())
    }

    pub fn insert(&mut self, path: impl Into<String>, bytes: Vec<u8>) {
        self.files.insert(path.into(), bytes);
    }

    pub fn insert_json<T: Serialize>(&mut self, path: impl Into<String>, value: &T) -> Result<(), ConvertError> {
        let bytes = serde_json::to_vec_pretty(value)?;
        self.insert(path, bytes);
        Ok(())
    }

    /// Store an element at the path its identifier names.
    pub fn insert_element<T: Serialize>(&mut self, element: &DataDrivenRegistryElement<T>) -> Result<(), ConvertError> {
        self.insert_json(element.identifier.to_file_path(DEFAULT_BASE), &element.data)
    }

    pub fn remove(&mut self, path: &str) -> Option<Vec<u8>> {
        self.files.remove(path)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

impl Datapack for MemoryDatapack {
    fn paths(&self) -> Vec<&str> {
        self.files.keys().map(String::as_str).collect()
    }

    fn file(&self, path: &str) -> Option<&[u8]> {
        self.files.get(path).map(Vec::as_slice)
    }
}

// ===========================================================================
// Labels
// ===========================================================================

/// How an element changed between two versions of a registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElementLabel {
    New,
    Updated,
    Deleted,
    Unchanged,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabeledElement {
    pub identifier: Identifier,
    pub label: ElementLabel,
}

/// Compare two versions of a registry by identifier.
///
/// Current elements come first in their order, then deleted ones in their
/// previous order.
pub fn label_elements(
    previous: &[DataDrivenRegistryElement],
    current: &[DataDrivenRegistryElement],
) -> Vec<LabeledElement> {
    let before: HashMap<&Identifier, &Value> =
        previous.iter().map(|e| (&e.identifier, &e.data)).collect();
    let now: HashSet<&Identifier> = current.iter().map(|e| &e.identifier).collect();

    let mut labels: Vec<LabeledElement> = current
        .iter()
        .map(|e| {
            let label = match before.get(&e.identifier) {
                None => ElementLabel::New,
                Some(data) if **data == e.data => ElementLabel::Unchanged,
                Some(_) => ElementLabel::Updated,
            };
            LabeledElement {
                identifier: e.identifier.clone(),
                label,
            }
        })
        .collect();

    labels.extend(
        previous
            .iter()
            .filter(|e| !now.contains(&e.identifier))
            .map(|e| LabeledElement {
                identifier: e.identifier.clone(),
                label: ElementLabel::Deleted,
            }),
    );
    labels
}

// ===========================================================================
// Tests
// ===========================================================================
