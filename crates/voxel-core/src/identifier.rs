//! Namespaced resource identifiers (`namespace:resource`) scoped to a registry.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Namespace used when a reference carries no explicit `namespace:` prefix.
pub const DEFAULT_NAMESPACE: &str = "minecraft";

/// Base directory of every datapack resource path.
pub const DEFAULT_BASE: &str = "data";

/// Identifies one resource of a registry. Two identifiers are equal when all
/// three parts match exactly.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Identifier {
    pub namespace: String,
    pub registry: String,
    pub resource: String,
}

impl Identifier {
    pub fn new(
        namespace: impl Into<String>,
        registry: impl Into<String>,
        resource: impl Into<String>,
    ) -> Self {
        Self {
            namespace: namespace.into(),
            registry: registry.into(),
            resource: resource.into(),
        }
    }

    /// Parse a reference such as `minecraft:sharpness` or `#minecraft:curse`.
    ///
    /// A leading `#` is stripped and the string is split on the first `:`.
    /// Without a `:` the namespace defaults to [`DEFAULT_NAMESPACE`]. Never fails.
    pub fn of(reference: &str, registry: &str) -> Self {
        let reference = reference.strip_prefix('#').unwrap_or(reference);
        match reference.split_once(':') {
            Some((namespace, resource)) => Self::new(namespace, registry, resource),
            None => Self::new(DEFAULT_NAMESPACE, registry, reference),
        }
    }

    /// Inverse of [`Identifier::to_unique_key`].
    pub fn from_unique_key(key: &str) -> Option<Self> {
        let (reference, registry) = key.rsplit_once('$')?;
        Some(Self::of(reference, registry))
    }

    /// Recover an identifier from `<base>/<namespace>/<registry>/<resource>.json`.
    ///
    /// The registry must be supplied because registries may span several path
    /// segments (`worldgen/structure_set`, `tags/enchantment`).
    pub fn from_file_path(path: &str, registry: &str) -> Option<Self> {
        let path = path.strip_prefix('/').unwrap_or(path);
        let mut parts = path.splitn(3, '/');
        let _base = parts.next()?;
        let namespace = parts.next()?;
        let rest = parts.next()?;
        let resource = rest
            .strip_prefix(registry)?
            .strip_prefix('/')?
            .strip_suffix(".json")?;
        if namespace.is_empty() || resource.is_empty() {
            return None;
        }
        Some(Self::new(namespace, registry, resource))
    }

    /// Whether this identifier points into a tag registry.
    pub fn is_tag(&self) -> bool {
        self.registry.starts_with("tags/")
    }

    /// `namespace:resource` without the tag marker.
    pub fn reference(&self) -> String {
        format!("{}:{}", self.namespace, self.resource)
    }

    /// Key that stays unique across registries: `ns:resource$registry`.
    pub fn to_unique_key(&self) -> String {
        format!("{}:{}${}", self.namespace, self.resource, self.registry)
    }

    /// Path of the backing file, e.g. `data/minecraft/enchantment/sharpness.json`.
    pub fn to_file_path(&self, base: &str) -> String {
        format!(
            "{base}/{}/{}/{}.json",
            self.namespace, self.registry, self.resource
        )
    }

    /// Last path segment of the resource, optionally with `.json`.
    pub fn to_file_name(&self, with_extension: bool) -> String {
        let name = self
            .resource
            .rsplit('/')
            .next()
            .unwrap_or(&self.resource);
        if with_extension {
            format!("{name}.json")
        } else {
            name.to_string()
        }
    }

    /// UI label for the last resource segment: `fire_aspect` → `Fire Aspect`.
    pub fn to_resource_name(&self) -> String {
        title_case(&self.to_file_name(false).replace('_', " "))
    }

    /// UI label for the whole resource path: `village/plains_house` →
    /// `Village - Plains House`.
    pub fn to_resource_path(&self) -> String {
        title_case(&self.resource.replace('/', " - ").replace('_', " "))
    }

    /// UI label for the namespace.
    pub fn to_namespace(&self) -> String {
        title_case(&self.namespace.replace('_', " "))
    }

    /// Structural equality against an optional identifier; `false` when absent.
    pub fn equals(&self, other: Option<&Identifier>) -> bool {
        other.is_some_and(|o| o == self)
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_tag() {
            write!(f, "#{}:{}", self.namespace, self.resource)
        } else {
            write!(f, "{}:{}", self.namespace, self.resource)
        }
    }
}

fn title_case(s: &str) -> String {
    s.split(' ')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Normalize a reference to `namespace:resource` form (no `#`, namespace filled in).
pub fn normalize_reference(reference: &str) -> String {
    Identifier::of(reference, "").reference()
}

/// Convert `ns:path` tag strings into identifiers of `registry`.
pub fn tags_to_identifiers(tags: &[String], registry: &str) -> Vec<Identifier> {
    tags.iter().map(|t| Identifier::of(t, registry)).collect()
}

/// Convert identifiers back into `ns:path` strings.
pub fn identifiers_to_tags(identifiers: &[Identifier]) -> Vec<String> {
    identifiers.iter().map(Identifier::reference).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn of_splits_namespace() {
        let id = Identifier::of("minecraft:fire_aspect", "enchantment");
        assert_eq!(id.namespace, "minecraft");
        assert_eq!(id.resource, "fire_aspect");
        assert_eq!(id.registry, "enchantment");
    }

    #[test]
    fn of_defaults_namespace() {
        let id = Identifier::of("sharpness", "enchantment");
        assert_eq!(id.namespace, "minecraft");
        assert_eq!(id.resource, "sharpness");
    }

    #[test]
    fn of_strips_tag_marker_and_keeps_slashes() {
        let id = Identifier::of("#minecraft:exclusive_set/armor", "tags/enchantment");
        assert_eq!(id.resource, "exclusive_set/armor");
        assert!(id.is_tag());
        assert_eq!(id.to_string(), "#minecraft:exclusive_set/armor");
    }

    #[test]
    fn of_splits_on_first_colon_only() {
        let id = Identifier::of("mod:odd:name", "item");
        assert_eq!(id.namespace, "mod");
        assert_eq!(id.resource, "odd:name");
    }

    #[test]
    fn unique_key_round_trip() {
        let id = Identifier::of("enchantplus:bow/storm", "enchantment");
        let key = id.to_unique_key();
        assert_eq!(key, "enchantplus:bow/storm$enchantment");
        assert_eq!(Identifier::from_unique_key(&key), Some(id));
        assert_eq!(Identifier::from_unique_key("no_registry"), None);
    }

    #[test]
    fn file_paths() {
        let id = Identifier::of("minecraft:villages", "worldgen/structure_set");
        assert_eq!(
            id.to_file_path(DEFAULT_BASE),
            "data/minecraft/worldgen/structure_set/villages.json"
        );
        assert_eq!(id.to_file_name(true), "villages.json");

        let tag = Identifier::of("#minecraft:curse", "tags/enchantment");
        assert_eq!(
            tag.to_file_path(DEFAULT_BASE),
            "data/minecraft/tags/enchantment/curse.json"
        );
    }

    #[test]
    fn from_file_path_parses_multi_segment_registry() {
        let id = Identifier::from_file_path(
            "data/minecraft/worldgen/structure_set/villages.json",
            "worldgen/structure_set",
        )
        .unwrap();
        assert_eq!(id, Identifier::of("minecraft:villages", "worldgen/structure_set"));

        let nested = Identifier::from_file_path(
            "data/enchantplus/enchantment/sword/poison.json",
            "enchantment",
        )
        .unwrap();
        assert_eq!(nested.resource, "sword/poison");

        assert!(Identifier::from_file_path("data/minecraft/recipe/a.json", "enchantment").is_none());
        assert!(Identifier::from_file_path("data/minecraft/enchantment/a.txt", "enchantment").is_none());
    }

    #[test]
    fn display_labels() {
        let id = Identifier::of("my_pack:village/plains_house", "structure");
        assert_eq!(id.to_resource_name(), "Plains House");
        assert_eq!(id.to_resource_path(), "Village - Plains House");
        assert_eq!(id.to_namespace(), "My Pack");
    }

    #[test]
    fn equals_handles_absent() {
        let a = Identifier::of("minecraft:a", "item");
        let b = Identifier::of("minecraft:a", "item");
        let c = Identifier::of("minecraft:a", "block");
        assert!(a.equals(Some(&b)));
        assert!(!a.equals(Some(&c)));
        assert!(!a.equals(None));
    }

    #[test]
    fn tag_string_conversions() {
        let tags = vec!["minecraft:curse".to_string(), "smelts_loot".to_string()];
        let ids = tags_to_identifiers(&tags, "tags/enchantment");
        assert_eq!(ids[1].namespace, "minecraft");
        assert_eq!(
            identifiers_to_tags(&ids),
            vec!["minecraft:curse", "minecraft:smelts_loot"]
        );
        assert_eq!(normalize_reference("#foo"), "minecraft:foo");
    }
}
