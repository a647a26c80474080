//! Faction Setup
//!
//! The four factions of the sample city and their standing toward each other.

use crate::components::Faction;

/// Create all factions of the sample city
pub fn create_factions() -> Vec<Faction> {
    // === THORNWOOD ===
    // Old river gangs with eyes on every quay; at open war with Ironmere
    let thornwood = Faction::new("thornwood", "Thornwood")
        .with_relationship("ironmere", -2)
        .with_relationship("saltcliff", 1)
        .with_relationship("northern_hold", 0)
        .with_monitoring_bonus(1);

    // === IRONMERE ===
    // Foundry guilds and their hired muscle
    let ironmere = Faction::new("ironmere", "Ironmere")
        .with_relationship("thornwood", -1)
        .with_relationship("saltcliff", -1)
        .with_relationship("northern_hold", 2);

    // === SALTCLIFF ===
    // Merchant houses controlling the harbour and the coin that moves through it
    let saltcliff = Faction::new("saltcliff", "Saltcliff")
        .with_relationship("thornwood", 1)
        .with_relationship("ironmere", -1)
        .with_relationship("northern_hold", 0)
        .with_monitoring_bonus(2);

    // === NORTHERN HOLD ===
    // Garrison families from the hill wards, slow to move and hard to dislodge
    let northern_hold = Faction::new("northern_hold", "Northern Hold")
        .with_relationship("ironmere", 2)
        .with_relationship("thornwood", 0)
        .with_relationship("saltcliff", 0);

    vec![thornwood, ironmere, saltcliff, northern_hold]
}
