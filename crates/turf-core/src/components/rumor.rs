//! Rumor Components

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use turf_events::{DistrictId, FactionId, RumorId};

/// A secret circulating in a district, easier to uncover every turn
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rumor {
    pub id: RumorId,
    pub district_id: DistrictId,
    pub text: String,
    pub discovery_dc: i32,
    /// Faction -> turn it learned the rumor
    #[serde(default)]
    pub known_by: BTreeMap<FactionId, u32>,
}

impl Rumor {
    pub fn new(id: RumorId, district_id: DistrictId, text: impl Into<String>, discovery_dc: i32) -> Self {
        Self {
            id,
            district_id,
            text: text.into(),
            discovery_dc,
            known_by: BTreeMap::new(),
        }
    }

    pub fn is_known_by(&self, faction_id: &FactionId) -> bool {
        self.known_by.contains_key(faction_id)
    }

    /// Record discovery; the first discovery turn is kept
    pub fn learn(&mut self, faction_id: FactionId, turn: u32) {
        self.known_by.entry(faction_id).or_insert(turn);
    }

    /// Lower the discovery DC by one, never below `floor`
    pub fn ease(&mut self, floor: i32) {
        self.discovery_dc = (self.discovery_dc - 1).max(floor);
    }
}
