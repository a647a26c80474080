//! World Setup
//!
//! The sample city: six districts around a harbour, seeded influence and a
//! few rumors, with the factions and pieces from the sibling modules.

use crate::components::{Aptitude, Attribute, District, DistrictValues, RollSelection, Skill};
use crate::error::EngineResult;
use crate::store::MemoryStore;

use super::{create_factions, create_pieces, ScenarioBuilder};

/// Create the districts of the sample city
pub fn create_districts() -> Vec<District> {
    let social = RollSelection::both(Attribute::Presence, Skill::Persuasion, Aptitude::Social);
    let streetwise = RollSelection::both(Attribute::Finesse, Skill::Streetwise, Aptitude::Underworld);
    let watchful = RollSelection::both(Attribute::Intellect, Skill::Streetwise, Aptitude::Monitoring);

    vec![
        District::new("docks", "The Docks")
            .with_values(DistrictValues::new(7, 4, 1))
            .with_preferred_gain(RollSelection::both(Attribute::Might, Skill::Streetwise, Aptitude::Labor))
            .with_preferred_monitor(watchful)
            .with_influence("thornwood", 4)
            .with_influence("ironmere", 2)
            .with_stronghold("thornwood")
            .with_adjacent(&["market", "foundry"]),
        District::new("market", "Lantern Market")
            .with_values(DistrictValues::new(9, 2, 3))
            .with_preferred_gain(social)
            .with_preferred_monitor(watchful)
            .with_influence("saltcliff", 4)
            .with_influence("thornwood", 2)
            .with_influence("ironmere", 1)
            .with_likeability("saltcliff", 2)
            .with_weekly_modifier(1)
            .with_adjacent(&["docks", "temple", "hill"]),
        District::new("foundry", "Foundry Row")
            .with_values(DistrictValues::new(5, 8, 0))
            .with_preferred_gain(RollSelection::both(Attribute::Might, Skill::Artifice, Aptitude::Technical))
            .with_preferred_monitor(watchful)
            .with_influence("ironmere", 6)
            .with_stronghold("ironmere")
            .with_adjacent(&["docks", "hill"]),
        District::new("temple", "Temple Steps")
            .with_values(DistrictValues::new(3, 1, 6))
            .with_preferred_gain(RollSelection::both(Attribute::Attunement, Skill::Arcana, Aptitude::Arcane))
            .with_preferred_monitor(watchful)
            .with_influence("saltcliff", 2)
            .with_likeability("ironmere", -2)
            .with_adjacent(&["market", "quarter"]),
        District::new("hill", "Hill Wards")
            .with_values(DistrictValues::new(2, 7, 5))
            .with_preferred_gain(social)
            .with_preferred_monitor(watchful)
            .with_influence("northern_hold", 5)
            .with_influence("ironmere", 1)
            .with_stronghold("northern_hold")
            .with_weekly_modifier(-1)
            .with_adjacent(&["market", "foundry"]),
        District::new("quarter", "Old Quarter")
            .with_values(DistrictValues::new(4, 3, 2))
            .with_preferred_gain(streetwise)
            .with_preferred_monitor(watchful)
            .with_influence("thornwood", 1)
            .with_influence("saltcliff", 1)
            .with_adjacent(&["temple"]),
    ]
}

/// Build the full sample city
pub fn sample_world() -> EngineResult<MemoryStore> {
    let mut builder = ScenarioBuilder::new()
        .rumor("docks", "smuggled powder under the fish market", 14)
        .rumor("market", "a Saltcliff factor is selling ledgers", 17)
        .rumor("foundry", "the great furnace is cracked", 12)
        .rumor("hill", "the garrison captain gambles", 19);
    for faction in create_factions() {
        builder = builder.faction(faction);
    }
    for district in create_districts() {
        builder = builder.district(district);
    }
    for piece in create_pieces()? {
        builder = builder.piece(piece);
    }
    builder.build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::INFLUENCE_CAPACITY;
    use crate::store::Store;

    #[test]
    fn test_sample_world_builds() {
        let store = sample_world().unwrap();
        assert_eq!(store.factions().unwrap().len(), 4);
        assert_eq!(store.districts().unwrap().len(), 6);
        assert_eq!(store.rumors().unwrap().len(), 4);
        for district in store.districts().unwrap() {
            assert!(district.is_consistent());
            assert_eq!(district.total_influence() + district.influence_pool, INFLUENCE_CAPACITY);
            for neighbour in &district.adjacent {
                let other = store.district(neighbour).unwrap().unwrap();
                assert!(other.is_adjacent_to(&district.id));
            }
        }
    }
}
