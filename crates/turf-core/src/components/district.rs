//! District Components
//!
//! Districts hold the bounded influence pool factions compete over.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use turf_events::{DistrictId, FactionId};

use super::capability::RollSelection;

/// Influence points per district, shared between factions and the free pool
pub const INFLUENCE_CAPACITY: i32 = 10;

/// Bounds of the weekly DC random walk
pub const WEEKLY_MODIFIER_MIN: i32 = -2;
pub const WEEKLY_MODIFIER_MAX: i32 = 2;

/// Bounds of a faction's likeability in a district
pub const LIKEABILITY_MIN: i32 = -3;
pub const LIKEABILITY_MAX: i32 = 3;

/// Base values of a district (each 0-10)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistrictValues {
    pub commerce: i32,
    pub muster: i32,
    pub aristocratic: i32,
}

impl DistrictValues {
    pub fn new(commerce: i32, muster: i32, aristocratic: i32) -> Self {
        Self {
            commerce: commerce.clamp(0, 10),
            muster: muster.clamp(0, 10),
            aristocratic: aristocratic.clamp(0, 10),
        }
    }
}

/// A district on the map
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct District {
    pub id: DistrictId,
    pub name: String,
    pub values: DistrictValues,
    /// Stats used for gain-influence rolls here when none are given
    pub preferred_gain: RollSelection,
    /// Stats used for monitor rolls here when none are given
    pub preferred_monitor: RollSelection,
    /// Invariant: sum + influence_pool == INFLUENCE_CAPACITY
    pub faction_influence: BTreeMap<FactionId, i32>,
    pub influence_pool: i32,
    /// Only meaningful where the faction holds influence
    #[serde(default)]
    pub strongholds: BTreeMap<FactionId, bool>,
    #[serde(default)]
    pub faction_likeability: BTreeMap<FactionId, i32>,
    #[serde(default)]
    pub weekly_dc_modifier: i32,
    #[serde(default)]
    pub adjacent: BTreeSet<DistrictId>,
    /// Map polygon, kept for external renderers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shape: Option<Vec<(f32, f32)>>,
}

impl District {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: DistrictId(id.into()),
            name: name.into(),
            values: DistrictValues::default(),
            preferred_gain: RollSelection::default(),
            preferred_monitor: RollSelection::default(),
            faction_influence: BTreeMap::new(),
            influence_pool: INFLUENCE_CAPACITY,
            strongholds: BTreeMap::new(),
            faction_likeability: BTreeMap::new(),
            weekly_dc_modifier: 0,
            adjacent: BTreeSet::new(),
            shape: None,
        }
    }

    pub fn with_values(mut self, values: DistrictValues) -> Self {
        self.values = values;
        self
    }

    pub fn with_preferred_gain(mut self, selection: RollSelection) -> Self {
        self.preferred_gain = selection;
        self
    }

    pub fn with_preferred_monitor(mut self, selection: RollSelection) -> Self {
        self.preferred_monitor = selection;
        self
    }

    pub fn with_adjacent(mut self, ids: &[&str]) -> Self {
        self.adjacent.extend(ids.iter().map(|id| DistrictId::from(*id)));
        self
    }

    /// Seed a faction's influence, drawing from the pool
    pub fn with_influence(mut self, faction_id: impl Into<String>, amount: i32) -> Self {
        let faction_id = FactionId(faction_id.into());
        let current = self.influence_of(&faction_id);
        let amount = amount.clamp(0, current + self.influence_pool);
        self.influence_pool -= amount - current;
        self.set_influence_raw(faction_id, amount);
        self
    }

    pub fn with_stronghold(mut self, faction_id: impl Into<String>) -> Self {
        self.strongholds.insert(FactionId(faction_id.into()), true);
        self
    }

    pub fn with_likeability(mut self, faction_id: impl Into<String>, value: i32) -> Self {
        self.faction_likeability.insert(
            FactionId(faction_id.into()),
            value.clamp(LIKEABILITY_MIN, LIKEABILITY_MAX),
        );
        self
    }

    pub fn with_weekly_modifier(mut self, value: i32) -> Self {
        self.weekly_dc_modifier = value.clamp(WEEKLY_MODIFIER_MIN, WEEKLY_MODIFIER_MAX);
        self
    }

    pub fn influence_of(&self, faction_id: &FactionId) -> i32 {
        self.faction_influence.get(faction_id).copied().unwrap_or(0)
    }

    pub fn likeability_of(&self, faction_id: &FactionId) -> i32 {
        self.faction_likeability.get(faction_id).copied().unwrap_or(0)
    }

    /// Stronghold only counts while the faction holds influence here
    pub fn has_stronghold(&self, faction_id: &FactionId) -> bool {
        self.influence_of(faction_id) > 0
            && self.strongholds.get(faction_id).copied().unwrap_or(false)
    }

    pub fn total_influence(&self) -> i32 {
        self.faction_influence.values().sum()
    }

    /// Factions holding at least one point here
    pub fn present_factions(&self) -> impl Iterator<Item = (&FactionId, i32)> {
        self.faction_influence
            .iter()
            .filter(|(_, &v)| v > 0)
            .map(|(id, &v)| (id, v))
    }

    pub fn is_adjacent_to(&self, other: &DistrictId) -> bool {
        self.adjacent.contains(other)
    }

    /// Check the pool invariant and per-faction bounds
    pub fn is_consistent(&self) -> bool {
        self.influence_pool >= 0
            && self.total_influence() + self.influence_pool == INFLUENCE_CAPACITY
            && self
                .faction_influence
                .values()
                .all(|&v| (0..=INFLUENCE_CAPACITY).contains(&v))
    }

    /// Write a faction's influence without touching the pool; zero drops the
    /// entry and any stronghold
    pub(crate) fn set_influence_raw(&mut self, faction_id: FactionId, amount: i32) {
        if amount <= 0 {
            self.faction_influence.remove(&faction_id);
            self.strongholds.remove(&faction_id);
        } else {
            self.faction_influence.insert(faction_id, amount);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_district_has_full_pool() {
        let district = District::new("docks", "The Docks");
        assert_eq!(district.influence_pool, INFLUENCE_CAPACITY);
        assert_eq!(district.total_influence(), 0);
        assert!(district.is_consistent());
    }

    #[test]
    fn test_with_influence_draws_from_pool() {
        let district = District::new("docks", "The Docks")
            .with_influence("ironmere", 4)
            .with_influence("thornwood", 3);
        assert_eq!(district.influence_pool, 3);
        assert!(district.is_consistent());

        // Cannot seed more than remains
        let district = district.with_influence("saltcliff", 8);
        assert_eq!(district.influence_of(&FactionId::from("saltcliff")), 3);
        assert_eq!(district.influence_pool, 0);
        assert!(district.is_consistent());
    }

    #[test]
    fn test_stronghold_requires_influence() {
        let district = District::new("docks", "The Docks")
            .with_stronghold("ironmere")
            .with_influence("thornwood", 2)
            .with_stronghold("thornwood");
        assert!(!district.has_stronghold(&FactionId::from("ironmere")));
        assert!(district.has_stronghold(&FactionId::from("thornwood")));
    }

    #[test]
    fn test_zero_influence_clears_stronghold() {
        let mut district = District::new("docks", "The Docks")
            .with_influence("thornwood", 2)
            .with_stronghold("thornwood");
        district.set_influence_raw(FactionId::from("thornwood"), 0);
        assert!(district.strongholds.is_empty());
        assert!(district.faction_influence.is_empty());
    }
}
