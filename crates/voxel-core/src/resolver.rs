//! Dotted-path access into the JSON view of a Voxel element.
//!
//! `maxLevel`, `result.count`, `structures.0.weight` and
//! `unknownFields.placement.mod_field` are all valid paths. Numeric segments
//! index arrays; every other segment is an object key. A key containing `.`
//! or `~` is written with [`escape_segment`] (`~1` for `.`, `~0` for `~`).

use std::borrow::Cow;

use serde_json::{Map, Value};

/// Escape an object key so it reads back as a single path segment.
pub fn escape_segment(key: &str) -> Cow<'_, str> {
    if key.contains(['.', '~']) {
        Cow::Owned(key.replace('~', "~0").replace('.', "~1"))
    } else {
        Cow::Borrowed(key)
    }
}

fn unescape(segment: &str) -> Cow<'_, str> {
    if segment.contains('~') {
        Cow::Owned(segment.replace("~1", ".").replace("~0", "~"))
    } else {
        Cow::Borrowed(segment)
    }
}

fn segments(path: &str) -> impl Iterator<Item = Cow<'_, str>> {
    path.split('.').map(unescape)
}

fn step<'a>(value: &'a Value, segment: &str) -> Option<&'a Value> {
    match value {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => items.get(segment.parse::<usize>().ok()?),
        _ => None,
    }
}

fn step_mut<'a>(value: &'a mut Value, segment: &str) -> Option<&'a mut Value> {
    match value {
        Value::Object(map) => map.get_mut(segment),
        Value::Array(items) => items.get_mut(segment.parse::<usize>().ok()?),
        _ => None,
    }
}

/// Like [`step_mut`], but fills `null` and missing object keys with empty
/// objects so a write can continue below them.
fn descend<'a>(value: &'a mut Value, segment: &str) -> Option<&'a mut Value> {
    if value.is_null() {
        *value = Value::Object(Map::new());
    }
    match value {
        Value::Object(map) => Some(
            map.entry(segment.to_string())
                .or_insert_with(|| Value::Object(Map::new())),
        ),
        Value::Array(items) => items.get_mut(segment.parse::<usize>().ok()?),
        _ => None,
    }
}

/// Read the value at `path`. `null` counts as present.
pub fn get_field<'a>(map: &'a Map<String, Value>, path: &str) -> Option<&'a Value> {
    let mut parts = segments(path);
    let mut current = map.get(&*parts.next()?)?;
    for segment in parts {
        current = step(current, &segment)?;
    }
    Some(current)
}

/// Whether `path` resolves to something other than `null`.
pub fn has_field(map: &Map<String, Value>, path: &str) -> bool {
    get_field(map, path).is_some_and(|v| !v.is_null())
}

/// Write `value` at `path`, creating missing intermediate objects.
///
/// Returns `false` when the path runs through a scalar or an out-of-range
/// array index.
pub fn set_field(map: &mut Map<String, Value>, path: &str, value: Value) -> bool {
    let (parent, last) = match path.rsplit_once('.') {
        Some((parent, last)) => (Some(parent), last),
        None => (None, path),
    };

    let last = unescape(last);
    let Some(parent) = parent else {
        map.insert(last.into_owned(), value);
        return true;
    };

    let mut parts = segments(parent);
    let Some(first) = parts.next() else {
        return false;
    };
    let mut current = map
        .entry(first.into_owned())
        .or_insert_with(|| Value::Object(Map::new()));
    for segment in parts {
        match descend(current, &segment) {
            Some(next) => current = next,
            None => return false,
        }
    }
    if current.is_null() {
        *current = Value::Object(Map::new());
    }

    match current {
        Value::Object(obj) => {
            obj.insert(last.into_owned(), value);
            true
        }
        Value::Array(items) => match last.parse::<usize>() {
            Ok(i) if i < items.len() => {
                items[i] = value;
                true
            }
            Ok(i) if i == items.len() => {
                items.push(value);
                true
            }
            _ => false,
        },
        _ => false,
    }
}

/// Remove and return the value at `path`.
pub fn remove_field(map: &mut Map<String, Value>, path: &str) -> Option<Value> {
    let Some((parent, last)) = path.rsplit_once('.') else {
        return map.shift_remove(&*unescape(path));
    };

    let mut parts = segments(parent);
    let mut current = map.get_mut(&*parts.next()?)?;
    for segment in parts {
        current = step_mut(current, &segment)?;
    }

    match current {
        Value::Object(obj) => obj.shift_remove(&*unescape(last)),
        Value::Array(items) => {
            let i = last.parse::<usize>().ok()?;
            (i < items.len()).then(|| items.remove(i))
        }
        _ => None,
    }
}
