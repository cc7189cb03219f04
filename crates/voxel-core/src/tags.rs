//! Tag files: recursive resolution, merging, and element ⇄ tag inversion.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::element::{CompiledElement, DataDrivenRegistryElement};
use crate::identifier::{DEFAULT_BASE, Identifier, normalize_reference};

// ===========================================================================
// Types
// ===========================================================================

/// Errors raised when building a tag resolver.
#[derive(Debug, thiserror::Error)]
pub enum TagError {
    #[error("cannot build a tag resolver from zero tags")]
    Empty,
    #[error("tags must share one registry: expected '{expected}', found '{found}' on {tag}")]
    MixedRegistries {
        expected: String,
        found: String,
        tag: String,
    },
}

/// A single entry of a tag's `values` list.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TagValue {
    /// `"minecraft:stone"` or `"#minecraft:logs"`.
    Plain(String),
    /// `{"id": "...", "required": false}`.
    Entry {
        id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        required: Option<bool>,
    },
}

impl TagValue {
    pub fn id(&self) -> &str {
        match self {
            TagValue::Plain(id) => id,
            TagValue::Entry { id, .. } => id,
        }
    }
}

impl From<&str> for TagValue {
    fn from(value: &str) -> Self {
        TagValue::Plain(value.to_string())
    }
}

/// Canonical tag file shape. Unmodeled keys stay in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Tag {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replace: Option<bool>,
    #[serde(default)]
    pub values: Vec<TagValue>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Tag {
    pub fn from_values<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            values: values.into_iter().map(|v| TagValue::Plain(v.into())).collect(),
            ..Self::default()
        }
    }
}

pub type TagElement = DataDrivenRegistryElement<Tag>;

// ===========================================================================
// TagsComparator
// ===========================================================================

/// Resolves tag references within exactly one tag registry.
pub struct TagsComparator<'a> {
    tags: &'a [TagElement],
    by_reference: HashMap<String, usize>,
}

impl<'a> TagsComparator<'a> {
    /// Build a resolver. Every tag must belong to the same registry.
    pub fn new(tags: &'a [TagElement]) -> Result<Self, TagError> {
        let first = tags.first().ok_or(TagError::Empty)?;
        let registry = &first.identifier.registry;

        let mut by_reference = HashMap::with_capacity(tags.len());
        for (i, tag) in tags.iter().enumerate() {
            if &tag.identifier.registry != registry {
                return Err(TagError::MixedRegistries {
                    expected: registry.clone(),
                    found: tag.identifier.registry.clone(),
                    tag: tag.identifier.to_string(),
                });
            }
            by_reference.insert(tag.identifier.reference(), i);
        }

        Ok(Self { tags, by_reference })
    }

    /// Union of the resolved values of every tag.
    pub fn get_all_values(&self) -> Vec<String> {
        let mut acc = Vec::new();
        let mut seen = HashSet::new();
        for tag in self.tags {
            let mut processed = HashSet::new();
            self.walk(tag, &mut processed, &mut seen, &mut acc);
        }
        acc
    }

    /// Concrete (non-tag) values reachable from `identifier`.
    ///
    /// Cycles are cut silently: a tag already visited during this call is
    /// not expanded again.
    pub fn get_recursive_values(&self, identifier: &Identifier) -> Vec<String> {
        let mut acc = Vec::new();
        let Some(tag) = self.find(&identifier.reference()) else {
            log::debug!("tag {identifier} not found in resolver");
            return acc;
        };
        let mut processed = HashSet::new();
        let mut seen = HashSet::new();
        self.walk(tag, &mut processed, &mut seen, &mut acc);
        acc
    }

    fn find(&self, reference: &str) -> Option<&'a TagElement> {
        self.by_reference.get(reference).map(|&i| &self.tags[i])
    }

    fn walk(
        &self,
        tag: &TagElement,
        processed: &mut HashSet<String>,
        seen: &mut HashSet<String>,
        acc: &mut Vec<String>,
    ) {
        if !processed.insert(tag.identifier.reference()) {
            return;
        }

        for value in &tag.data.values {
            let id = match value {
                TagValue::Plain(id) => id,
                TagValue::Entry { id, required } => {
                    if *required != Some(true) {
                        continue;
                    }
                    id
                }
            };

            if let Some(nested) = id.strip_prefix('#') {
                match self.find(&normalize_reference(nested)) {
                    Some(nested_tag) => self.walk(nested_tag, processed, seen, acc),
                    None => log::debug!("skipping unresolved nested tag #{nested}"),
                }
            } else if seen.insert(id.clone()) {
                acc.push(id.clone());
            }
        }
    }
}

// ===========================================================================
// Merging
// ===========================================================================

/// Set union of two tags' values. `replace` holds if either side sets it.
pub fn merge_tags(a: &Tag, b: &Tag) -> Tag {
    let mut seen: HashSet<&TagValue> = HashSet::new();
    let values = a
        .values
        .iter()
        .chain(&b.values)
        .filter(|v| seen.insert(*v))
        .cloned()
        .collect();

    let replace = match (a.replace, b.replace) {
        (None, None) => None,
        (x, y) => Some(x.unwrap_or(false) || y.unwrap_or(false)),
    };

    let mut extra = a.extra.clone();
    for (key, value) in &b.extra {
        extra.entry(key.clone()).or_insert_with(|| value.clone());
    }

    Tag {
        replace,
        values,
        extra,
    }
}

/// Merge two tag lists keyed by file path. Colliding tags are merged with
/// [`merge_tags`]; the rest pass through in first-seen order.
pub fn merge_data_driven_registry_element(a: Vec<TagElement>, b: Vec<TagElement>) -> Vec<TagElement> {
    let mut merged: Vec<TagElement> = Vec::with_capacity(a.len() + b.len());
    let mut index: HashMap<String, usize> = HashMap::new();

    for element in a.into_iter().chain(b) {
        let path = element.identifier.to_file_path(DEFAULT_BASE);
        match index.get(&path) {
            Some(&i) => merged[i].data = merge_tags(&merged[i].data, &element.data),
            None => {
                index.insert(path, merged.len());
                merged.push(element);
            }
        }
    }

    merged
}

/// Turn element-side membership ("this element is in tag X") into tag files
/// ("tag X contains these elements").
pub fn create_tag_from_element<T>(compiled: &[CompiledElement<T>]) -> Vec<TagElement> {
    let mut tags: Vec<TagElement> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for output in compiled {
        let member = output.element.identifier.reference();
        for tag in &output.tags {
            let key = tag.to_unique_key();
            let i = *index.entry(key).or_insert_with(|| {
                tags.push(DataDrivenRegistryElement::new(tag.clone(), Tag::default()));
                tags.len() - 1
            });
            let value = TagValue::Plain(member.clone());
            if !tags[i].data.values.contains(&value) {
                tags[i].data.values.push(value);
            }
        }
    }

    tags
}

// ===========================================================================
// Lookups
// ===========================================================================

/// Whether `value` is listed directly in `tag` (no recursion).
pub fn is_present_in_tag(tag: &Tag, value: &str) -> bool {
    let value = normalize_reference(value);
    tag.values
        .iter()
        .any(|v| !v.id().starts_with('#') && normalize_reference(v.id()) == value)
}

/// References (`ns:path`) of every tag listing `identifier` directly.
pub fn related_tags(tags: &[TagElement], identifier: &Identifier) -> Vec<String> {
    let reference = identifier.reference();
    tags.iter()
        .filter(|tag| is_present_in_tag(&tag.data, &reference))
        .map(|tag| tag.identifier.reference())
        .collect()
}

/// Plain string form of every value (object entries reduced to their id).
pub fn tag_values(tag: &Tag) -> Vec<String> {
    tag.values.iter().map(|v| v.id().to_string()).collect()
}

// ===========================================================================
// Tests
// ===========================================================================
