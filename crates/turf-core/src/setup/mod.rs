//! World Setup
//!
//! Scenario construction: a builder that loads factions, districts, pieces
//! and rumors into a fresh store, plus the built-in sample city.

pub mod agents;
pub mod factions;
pub mod world;

pub use agents::*;
pub use factions::*;
pub use world::*;

use std::collections::BTreeMap;

use turf_events::{DistrictId, RumorId, TurnPhase, TurnState};

use crate::components::{District, Faction, Piece, Rumor};
use crate::error::{EngineResult, ValidationError};
use crate::store::{MemoryStore, Store};

/// Collects scenario records and writes them to a [`MemoryStore`] in
/// dependency order
#[derive(Debug, Clone, Default)]
pub struct ScenarioBuilder {
    factions: Vec<Faction>,
    districts: Vec<District>,
    pieces: Vec<Piece>,
    rumors: Vec<(DistrictId, String, i32)>,
    turn: Option<u32>,
}

impl ScenarioBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn faction(mut self, faction: Faction) -> Self {
        self.factions.push(faction);
        self
    }

    pub fn district(mut self, district: District) -> Self {
        self.districts.push(district);
        self
    }

    pub fn piece(mut self, piece: Piece) -> Self {
        self.pieces.push(piece);
        self
    }

    pub fn rumor(mut self, district_id: &str, text: impl Into<String>, discovery_dc: i32) -> Self {
        self.rumors.push((DistrictId::from(district_id), text.into(), discovery_dc));
        self
    }

    /// Start at `turn` instead of turn 1
    pub fn turn(mut self, turn: u32) -> Self {
        self.turn = Some(turn);
        self
    }

    /// Write everything into a new store. Adjacency is made symmetric first.
    pub fn build(self) -> EngineResult<MemoryStore> {
        let mut districts: BTreeMap<DistrictId, District> = self
            .districts
            .into_iter()
            .map(|d| (d.id.clone(), d))
            .collect();

        let links: Vec<(DistrictId, DistrictId)> = districts
            .values()
            .flat_map(|d| d.adjacent.iter().map(move |a| (d.id.clone(), a.clone())))
            .collect();
        for (from, to) in links {
            let neighbour = districts.get_mut(&to).ok_or_else(|| {
                ValidationError::Rejected(format!("{} lists unknown neighbour {}", from, to))
            })?;
            neighbour.adjacent.insert(from);
        }

        let mut store = MemoryStore::new();
        if let Some(turn) = self.turn {
            store.set_turn_state(TurnState::new(turn, TurnPhase::Preparation))?;
        }
        for faction in self.factions {
            store.put_faction(faction)?;
        }
        for district in districts.into_values() {
            store.put_district(district)?;
        }
        for piece in self.pieces {
            store.put_piece(piece)?;
        }
        for (district_id, text, dc) in self.rumors {
            let id = RumorId(store.next_id()?);
            store.put_rumor(Rumor::new(id, district_id, text, dc.max(1)))?;
        }
        Ok(store)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use turf_events::FactionId;

    #[test]
    fn test_adjacency_is_symmetric() {
        let store = ScenarioBuilder::new()
            .district(District::new("docks", "The Docks").with_adjacent(&["market"]))
            .district(District::new("market", "Market"))
            .build()
            .unwrap();
        let market = store.district(&DistrictId::from("market")).unwrap().unwrap();
        assert!(market.is_adjacent_to(&DistrictId::from("docks")));
    }

    #[test]
    fn test_unknown_neighbour_is_rejected() {
        let result = ScenarioBuilder::new()
            .district(District::new("docks", "The Docks").with_adjacent(&["atlantis"]))
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn test_piece_needs_known_faction() {
        use crate::components::{AgentProfile, Capability};
        let result = ScenarioBuilder::new()
            .district(District::new("docks", "The Docks"))
            .piece(Piece::new("ag_1", "Vesna", "ghosts", Capability::Agent(AgentProfile::new())).in_district("docks"))
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn test_rumors_get_ids_and_turn_is_set() {
        let store = ScenarioBuilder::new()
            .faction(Faction::new("thornwood", "Thornwood"))
            .district(District::new("docks", "The Docks").with_influence("thornwood", 3))
            .rumor("docks", "a ship that never docks", 15)
            .rumor("docks", "bells at midnight", 0)
            .turn(5)
            .build()
            .unwrap();
        let rumors = store.rumors().unwrap();
        assert_eq!(rumors.len(), 2);
        assert_ne!(rumors[0].id, rumors[1].id);
        assert_eq!(rumors[1].discovery_dc, 1);
        assert_eq!(store.turn_state().unwrap().turn, 5);
        let docks = store.district(&DistrictId::from("docks")).unwrap().unwrap();
        assert_eq!(docks.influence_of(&FactionId::from("thornwood")), 3);
        assert_eq!(docks.influence_pool, 7);
    }
}
