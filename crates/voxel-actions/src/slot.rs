//! Equipment slot algebra for enchantments.
//!
//! Slots form a small lattice: `hand = {mainhand, offhand}`,
//! `armor = {head, chest, legs, feet}` and `any = hand ∪ armor`. Lists are
//! compared by the concrete slots they cover; every list this module returns
//! is normalized, collapsing complete groups upward.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use crate::ActionError;

/// First pack format with data-driven enchantments (Minecraft 1.21).
pub const MIN_SLOT_VERSION: u32 = 48;

// ===========================================================================
// Slot
// ===========================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Slot {
    Mainhand,
    Offhand,
    Head,
    Chest,
    Legs,
    Feet,
    Hand,
    Armor,
    Any,
}

impl Slot {
    pub const CONCRETE: [Slot; 6] = [
        Slot::Mainhand,
        Slot::Offhand,
        Slot::Head,
        Slot::Chest,
        Slot::Legs,
        Slot::Feet,
    ];

    pub const HAND: [Slot; 2] = [Slot::Mainhand, Slot::Offhand];

    pub const ARMOR: [Slot; 4] = [Slot::Head, Slot::Chest, Slot::Legs, Slot::Feet];

    pub fn as_str(self) -> &'static str {
        match self {
            Slot::Mainhand => "mainhand",
            Slot::Offhand => "offhand",
            Slot::Head => "head",
            Slot::Chest => "chest",
            Slot::Legs => "legs",
            Slot::Feet => "feet",
            Slot::Hand => "hand",
            Slot::Armor => "armor",
            Slot::Any => "any",
        }
    }

    /// Concrete slots covered by this token.
    pub fn members(self) -> &'static [Slot] {
        match self {
            Slot::Hand => &Self::HAND,
            Slot::Armor => &Self::ARMOR,
            Slot::Any => &Self::CONCRETE,
            Slot::Mainhand => &[Slot::Mainhand],
            Slot::Offhand => &[Slot::Offhand],
            Slot::Head => &[Slot::Head],
            Slot::Chest => &[Slot::Chest],
            Slot::Legs => &[Slot::Legs],
            Slot::Feet => &[Slot::Feet],
        }
    }

    pub fn is_compound(self) -> bool {
        matches!(self, Slot::Hand | Slot::Armor | Slot::Any)
    }
}

impl FromStr for Slot {
    type Err = ActionError;

    fn from_str(token: &str) -> Result<Self, Self::Err> {
        match token {
            "mainhand" => Ok(Slot::Mainhand),
            "offhand" => Ok(Slot::Offhand),
            "head" => Ok(Slot::Head),
            "chest" => Ok(Slot::Chest),
            "legs" => Ok(Slot::Legs),
            "feet" => Ok(Slot::Feet),
            "hand" => Ok(Slot::Hand),
            "armor" => Ok(Slot::Armor),
            "any" => Ok(Slot::Any),
            other => Err(ActionError::InvalidSlot(other.to_string())),
        }
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ===========================================================================
// SlotManager
// ===========================================================================

/// Slot operations for a given pack format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotManager {
    version: u32,
}

impl SlotManager {
    pub fn new(version: u32) -> Result<Self, ActionError> {
        if version < MIN_SLOT_VERSION {
            return Err(ActionError::UnsupportedVersion {
                version,
                minimum: MIN_SLOT_VERSION,
            });
        }
        Ok(Self { version })
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    /// Concrete slots a list covers.
    pub fn expand<S: AsRef<str>>(&self, slots: &[S]) -> Result<BTreeSet<Slot>, ActionError> {
        let mut covered = BTreeSet::new();
        for token in slots {
            let slot: Slot = token.as_ref().parse()?;
            covered.extend(slot.members().iter().copied());
        }
        Ok(covered)
    }

    /// Whether every slot `token` covers is already covered by `slots`.
    pub fn is_in<S: AsRef<str>>(&self, slots: &[S], token: &str) -> Result<bool, ActionError> {
        let slot: Slot = token.parse()?;
        let covered = self.expand(slots)?;
        Ok(slot.members().iter().all(|s| covered.contains(s)))
    }

    pub fn add_slot<S: AsRef<str>>(&self, slots: &[S], token: &str) -> Result<Vec<String>, ActionError> {
        let slot: Slot = token.parse()?;
        let mut covered = self.expand(slots)?;
        covered.extend(slot.members().iter().copied());
        Ok(normalize(&covered))
    }

    /// Remove `token`, splitting any group entry into its remaining members.
    pub fn remove_slot<S: AsRef<str>>(
        &self,
        slots: &[S],
        token: &str,
    ) -> Result<Vec<String>, ActionError> {
        let slot: Slot = token.parse()?;
        let mut covered = self.expand(slots)?;
        for member in slot.members() {
            covered.remove(member);
        }
        Ok(normalize(&covered))
    }

    /// Remove `token` when it is fully covered, otherwise add it.
    pub fn toggle_slot<S: AsRef<str>>(
        &self,
        slots: &[S],
        token: &str,
    ) -> Result<Vec<String>, ActionError> {
        if self.is_in(slots, token)? {
            self.remove_slot(slots, token)
        } else {
            self.add_slot(slots, token)
        }
    }
}

/// Canonical list for a set of concrete slots: `any` alone, otherwise the
/// hand part followed by the armor part, each collapsed when complete.
pub fn normalize(covered: &BTreeSet<Slot>) -> Vec<String> {
    if Slot::CONCRETE.iter().all(|s| covered.contains(s)) {
        return vec![Slot::Any.to_string()];
    }

    let mut out = Vec::new();
    for (group, members) in [(Slot::Hand, &Slot::HAND[..]), (Slot::Armor, &Slot::ARMOR[..])] {
        if members.iter().all(|s| covered.contains(s)) {
            out.push(group.to_string());
        } else {
            out.extend(
                members
                    .iter()
                    .filter(|s| covered.contains(*s))
                    .map(|s| s.to_string()),
            );
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager() -> SlotManager {
        SlotManager::new(61).unwrap()
    }

    // -----------------------------------------------------------------------
    // Version gate
    // -----------------------------------------------------------------------

    #[test]
    fn old_pack_formats_are_rejected() {
        assert!(matches!(
            SlotManager::new(41),
            Err(ActionError::UnsupportedVersion {
                version: 41,
                minimum: 48
            })
        ));
        assert_eq!(SlotManager::new(48).unwrap().version(), 48);
    }

    // -----------------------------------------------------------------------
    // Normalization
    // -----------------------------------------------------------------------

    #[test]
    fn completing_armor_collapses_upward() {
        let slots = manager()
            .add_slot(&["head", "chest", "feet"], "legs")
            .unwrap();
        assert_eq!(slots, vec!["armor"]);
    }

    #[test]
    fn completing_everything_collapses_to_any() {
        let slots = manager().add_slot(&["armor", "mainhand"], "offhand").unwrap();
        assert_eq!(slots, vec!["any"]);
    }

    #[test]
    fn removing_from_a_group_expands_it() {
        let slots = manager().remove_slot(&["armor"], "head").unwrap();
        assert_eq!(slots, vec!["chest", "legs", "feet"]);

        let slots = manager().remove_slot(&["any"], "offhand").unwrap();
        assert_eq!(slots, vec!["mainhand", "armor"]);
    }

    #[test]
    fn removing_a_group_removes_its_members() {
        let slots = manager().remove_slot(&["mainhand", "head", "feet"], "armor").unwrap();
        assert_eq!(slots, vec!["mainhand"]);
    }

    // -----------------------------------------------------------------------
    // Membership and toggling
    // -----------------------------------------------------------------------

    #[test]
    fn membership_sees_through_groups() {
        let m = manager();
        assert!(m.is_in(&["armor"], "legs").unwrap());
        assert!(m.is_in(&["any"], "hand").unwrap());
        assert!(!m.is_in(&["head"], "armor").unwrap());
        assert!(m.is_in(&["head", "chest", "legs", "feet"], "armor").unwrap());
    }

    #[test]
    fn toggle_twice_restores_the_list() {
        let m = manager();
        let start = vec!["mainhand".to_string(), "armor".to_string()];
        for token in ["head", "offhand", "mainhand", "legs"] {
            let once = m.toggle_slot(&start, token).unwrap();
            let twice = m.toggle_slot(&once, token).unwrap();
            assert_eq!(twice, start, "toggling {token}");
        }
    }

    #[test]
    fn unknown_tokens_are_errors() {
        let m = manager();
        assert!(matches!(
            m.add_slot(&["head"], "tail"),
            Err(ActionError::InvalidSlot(s)) if s == "tail"
        ));
        assert!(m.expand(&["body"]).is_err());
    }
}
