//! Faction Components
//!
//! Factions, their directed relationships, and their perceived-state cache.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use turf_events::{DistrictId, FactionId, PerceivedDistrict};

/// Relationship bounds
pub const RELATIONSHIP_MIN: i32 = -2;
pub const RELATIONSHIP_MAX: i32 = 2;

/// Named relationship levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stance {
    HotWar,
    ColdWar,
    Neutral,
    Friendly,
    Allied,
}

impl Stance {
    pub fn from_value(value: i32) -> Self {
        match value.clamp(RELATIONSHIP_MIN, RELATIONSHIP_MAX) {
            -2 => Stance::HotWar,
            -1 => Stance::ColdWar,
            0 => Stance::Neutral,
            1 => Stance::Friendly,
            _ => Stance::Allied,
        }
    }

    pub fn value(self) -> i32 {
        match self {
            Stance::HotWar => -2,
            Stance::ColdWar => -1,
            Stance::Neutral => 0,
            Stance::Friendly => 1,
            Stance::Allied => 2,
        }
    }

    pub fn is_hostile(self) -> bool {
        matches!(self, Stance::HotWar | Stance::ColdWar)
    }
}

/// A faction in the simulation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Faction {
    pub id: FactionId,
    pub name: String,
    /// Directed: how this faction regards others. Not required symmetric.
    #[serde(default)]
    pub relationships: BTreeMap<FactionId, i32>,
    /// Added to passive monitoring rolls
    #[serde(default)]
    pub monitoring_bonus: i32,
    /// Latest beliefs per district; written only by the perception engine
    #[serde(default)]
    pub perceived: BTreeMap<DistrictId, PerceivedDistrict>,
}

impl Faction {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: FactionId(id.into()),
            name: name.into(),
            relationships: BTreeMap::new(),
            monitoring_bonus: 0,
            perceived: BTreeMap::new(),
        }
    }

    pub fn with_relationship(mut self, other: impl Into<String>, value: i32) -> Self {
        self.relationships.insert(
            FactionId(other.into()),
            value.clamp(RELATIONSHIP_MIN, RELATIONSHIP_MAX),
        );
        self
    }

    pub fn with_monitoring_bonus(mut self, bonus: i32) -> Self {
        self.monitoring_bonus = bonus;
        self
    }

    /// How this faction regards `other`; unknown factions are neutral
    pub fn relationship_with(&self, other: &FactionId) -> i32 {
        self.relationships.get(other).copied().unwrap_or(0)
    }

    pub fn stance_toward(&self, other: &FactionId) -> Stance {
        Stance::from_value(self.relationship_with(other))
    }

    /// Record a new belief if it supersedes the cached one
    pub fn remember(&mut self, district_id: DistrictId, belief: PerceivedDistrict) {
        match self.perceived.get(&district_id) {
            Some(existing) if !existing.superseded_by(&belief) => {}
            _ => {
                self.perceived.insert(district_id, belief);
            }
        }
    }
}
