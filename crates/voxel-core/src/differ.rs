//! Structural diff between two JSON snapshots of a Voxel element.
//!
//! Objects are compared key by key and arrays index by index. The resulting
//! list of [`Difference`]s can be replayed onto another snapshot with
//! [`apply_differences`], which is how migration logs carry edits from one
//! pack to another.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::resolver::{escape_segment, remove_field, set_field};

/// What happened at one path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DifferenceKind {
    Added { value: Value },
    Removed { value: Value },
    Changed { from: Value, to: Value },
}

/// A single change at a dotted path (empty path = the whole value). Object
/// keys are escaped with [`escape_segment`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Difference {
    pub path: String,
    #[serde(flatten)]
    pub kind: DifferenceKind,
}

/// Errors raised while replaying differences.
#[derive(Debug, thiserror::Error)]
pub enum PatchError {
    #[error("cannot apply difference at '{path}': path does not resolve")]
    InvalidPath { path: String },
    #[error("cannot apply a nested difference at '{path}' to a non-object value")]
    NotAnObject { path: String },
}

fn join(prefix: &str, segment: &str) -> String {
    if prefix.is_empty() {
        segment.to_string()
    } else {
        format!("{prefix}.{segment}")
    }
}

/// Compute the differences turning `before` into `after`.
pub fn diff(before: &Value, after: &Value) -> Vec<Difference> {
    let mut out = Vec::new();
    diff_into("", before, after, &mut out);
    out
}

fn diff_into(path: &str, before: &Value, after: &Value, out: &mut Vec<Difference>) {
    match (before, after) {
        (Value::Object(a), Value::Object(b)) => diff_objects(path, a, b, out),
        (Value::Array(a), Value::Array(b)) => {
            let shared = a.len().min(b.len());
            for i in 0..shared {
                diff_into(&join(path, &i.to_string()), &a[i], &b[i], out);
            }
            for (i, value) in b.iter().enumerate().skip(shared) {
                out.push(Difference {
                    path: join(path, &i.to_string()),
                    kind: DifferenceKind::Added {
                        value: value.clone(),
                    },
                });
            }
            // Highest index first so a replay can remove them one by one.
            for i in (shared..a.len()).rev() {
                out.push(Difference {
                    path: join(path, &i.to_string()),
                    kind: DifferenceKind::Removed {
                        value: a[i].clone(),
                    },
                });
            }
        }
        (a, b) if a != b => out.push(Difference {
            path: path.to_string(),
            kind: DifferenceKind::Changed {
                from: a.clone(),
                to: b.clone(),
            },
        }),
        _ => {}
    }
}

fn diff_objects(path: &str, a: &Map<String, Value>, b: &Map<String, Value>, out: &mut Vec<Difference>) {
    for (key, old) in a {
        let at = join(path, &escape_segment(key));
        match b.get(key) {
            Some(new) => diff_into(&at, old, new, out),
            None => out.push(Difference {
                path: at,
                kind: DifferenceKind::Removed { value: old.clone() },
            }),
        }
    }
    for (key, new) in b {
        if !a.contains_key(key) {
            out.push(Difference {
                path: join(path, &escape_segment(key)),
                kind: DifferenceKind::Added { value: new.clone() },
            });
        }
    }
}

/// Replay `differences` onto `target` in order.
pub fn apply_differences(target: &mut Value, differences: &[Difference]) -> Result<(), PatchError> {
    for difference in differences {
        if difference.path.is_empty() {
            match &difference.kind {
                DifferenceKind::Added { value } | DifferenceKind::Changed { to: value, .. } => {
                    *target = value.clone();
                }
                DifferenceKind::Removed { .. } => *target = Value::Null,
            }
            continue;
        }

        let Value::Object(map) = target else {
            return Err(PatchError::NotAnObject {
                path: difference.path.clone(),
            });
        };

        let applied = match &difference.kind {
            DifferenceKind::Added { value } | DifferenceKind::Changed { to: value, .. } => {
                set_field(map, &difference.path, value.clone())
            }
            DifferenceKind::Removed { .. } => remove_field(map, &difference.path).is_some(),
        };
        if !applied {
            return Err(PatchError::InvalidPath {
                path: difference.path.clone(),
            });
        }
    }
    Ok(())
}
