//! Change logger: records the structural differences each applied edit made
//! to a Voxel element, and exports them as a replayable migration log.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::differ::{Difference, PatchError, apply_differences, diff};

// ---------------------------------------------------------------------------
// Entries
// ---------------------------------------------------------------------------

/// One recorded edit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Monotonic sequence number, never reused after trimming.
    pub sequence: u64,
    /// Unique key of the edited element (`ns:resource$registry`).
    pub element: String,
    /// `type` tag of the action that produced the edit.
    pub action: String,
    pub differences: Vec<Difference>,
}

/// Serializable export of a logger's entries.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MigrationLog {
    pub entries: Vec<LogEntry>,
}

impl MigrationLog {
    /// Replay every entry recorded for `element` onto `target`, oldest first.
    pub fn apply_to(&self, element: &str, target: &mut Value) -> Result<usize, PatchError> {
        let mut applied = 0;
        for entry in self.entries.iter().filter(|e| e.element == element) {
            apply_differences(target, &entry.differences)?;
            applied += 1;
        }
        Ok(applied)
    }

    /// Unique keys of every element touched by the log, in first-edit order.
    pub fn elements(&self) -> Vec<&str> {
        let mut out: Vec<&str> = Vec::new();
        for entry in &self.entries {
            if !out.contains(&entry.element.as_str()) {
                out.push(&entry.element);
            }
        }
        out
    }
}

// ---------------------------------------------------------------------------
// ChangeLogger
// ---------------------------------------------------------------------------

/// Bounded history of edits.
#[derive(Debug, Clone)]
pub struct ChangeLogger {
    entries: Vec<LogEntry>,
    next_sequence: u64,
    /// Maximum entries to retain. 0 = unbounded.
    max_entries: usize,
}

impl Default for ChangeLogger {
    fn default() -> Self {
        Self::new()
    }
}

impl ChangeLogger {
    /// Create an unbounded logger.
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            next_sequence: 0,
            max_entries: 0,
        }
    }

    /// Create a logger retaining at most `max_entries` entries.
    pub fn with_max_entries(max_entries: usize) -> Self {
        Self {
            max_entries,
            ..Self::new()
        }
    }

    /// Diff two snapshots and record the result. Edits that changed nothing
    /// are not recorded; returns whether an entry was added.
    pub fn record(&mut self, element: &str, action: &str, before: &Value, after: &Value) -> bool {
        let differences = diff(before, after);
        if differences.is_empty() {
            return false;
        }

        log::trace!(
            "{element}: '{action}' changed {} path(s)",
            differences.len()
        );
        self.entries.push(LogEntry {
            sequence: self.next_sequence,
            element: element.to_string(),
            action: action.to_string(),
            differences,
        });
        self.next_sequence += 1;

        if self.max_entries > 0 {
            let excess = self.entries.len().saturating_sub(self.max_entries);
            if excess > 0 {
                self.entries.drain(..excess);
            }
        }
        true
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    /// Entries recorded for one element.
    pub fn entries_for<'a>(&'a self, element: &'a str) -> impl Iterator<Item = &'a LogEntry> + 'a {
        self.entries.iter().filter(move |e| e.element == element)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn export(&self) -> MigrationLog {
        MigrationLog {
            entries: self.entries.clone(),
        }
    }
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const KEY: &str = "minecraft:sharpness$enchantment";

    // -----------------------------------------------------------------------
    // Recording
    // -----------------------------------------------------------------------

    #[test]
    fn new_logger_is_empty() {
        let logger = ChangeLogger::new();
        assert!(logger.is_empty());
        assert_eq!(logger.len(), 0);
    }

    #[test]
    fn no_op_edits_are_not_recorded() {
        let mut logger = ChangeLogger::new();
        let v = json!({"maxLevel": 5});
        assert!(!logger.record(KEY, "set_value", &v, &v));
        assert!(logger.is_empty());
    }

    #[test]
    fn records_differences_with_sequence() {
        let mut logger = ChangeLogger::new();
        assert!(logger.record(KEY, "set_value", &json!({"maxLevel": 5}), &json!({"maxLevel": 3})));
        assert!(logger.record("other$enchantment", "set_value", &json!({"w": 1}), &json!({"w": 2})));

        assert_eq!(logger.len(), 2);
        assert_eq!(logger.entries()[0].sequence, 0);
        assert_eq!(logger.entries()[1].sequence, 1);
        assert_eq!(logger.entries()[0].action, "set_value");
        assert_eq!(logger.entries_for(KEY).count(), 1);
    }

    #[test]
    fn bounded_logger_trims_oldest() {
        let mut logger = ChangeLogger::with_max_entries(2);
        for i in 0..4 {
            logger.record(KEY, "set_value", &json!({"w": i}), &json!({"w": i + 1}));
        }
        assert_eq!(logger.len(), 2);
        assert_eq!(logger.entries()[0].sequence, 2);
        assert_eq!(logger.entries()[1].sequence, 3);
    }

    // -----------------------------------------------------------------------
    // Migration log
    // -----------------------------------------------------------------------

    #[test]
    fn migration_log_replays_per_element() {
        let mut logger = ChangeLogger::new();
        let v0 = json!({"maxLevel": 1, "slots": ["head"]});
        let v1 = json!({"maxLevel": 2, "slots": ["head"]});
        let v2 = json!({"maxLevel": 2, "slots": ["armor"]});
        logger.record(KEY, "set_value", &v0, &v1);
        logger.record("x$enchantment", "set_value", &json!({"a": 1}), &json!({"a": 2}));
        logger.record(KEY, "set_computed_slot", &v1, &v2);

        let log = logger.export();
        assert_eq!(log.elements(), vec![KEY, "x$enchantment"]);

        let mut target = v0.clone();
        assert_eq!(log.apply_to(KEY, &mut target).unwrap(), 2);
        assert_eq!(target, v2);

        let round: MigrationLog = serde_json::from_value(serde_json::to_value(&log).unwrap()).unwrap();
        assert_eq!(round, log);
    }
}
