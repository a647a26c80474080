//! Piece Setup
//!
//! Agents and squadrons of the sample city, each with a standing task.

use crate::components::{
    AgentProfile, Aptitude, Attribute, Capability, Piece, PieceKind, RollSelection, Skill,
    SquadronProfile, Task, TaskKind,
};
use crate::error::EngineResult;

fn agent(id: &str, name: &str, faction: &str, profile: AgentProfile) -> Piece {
    Piece::new(id, name, faction, Capability::Agent(profile))
}

fn squadron(id: &str, name: &str, faction: &str, profile: SquadronProfile) -> Piece {
    Piece::new(id, name, faction, Capability::Squadron(profile))
}

/// Create every piece of the sample city
pub fn create_pieces() -> EngineResult<Vec<Piece>> {
    let persuade = RollSelection::agent(Attribute::Presence, Skill::Persuasion);
    let brawl = RollSelection::agent(Attribute::Might, Skill::Combat);

    let pieces = vec![
        // === THORNWOOD ===
        agent(
            "ag_vesna",
            "Vesna Reed",
            "thornwood",
            AgentProfile::new()
                .with_attribute(Attribute::Presence, 3)
                .with_skill(Skill::Persuasion, 2)
                .with_skill(Skill::Streetwise, 3),
        )
        .in_district("docks")
        .with_task(Task::new(PieceKind::Agent, TaskKind::GainInfluence, persuade, 0)?),
        agent(
            "ag_corvin",
            "Corvin Ash",
            "thornwood",
            AgentProfile::new()
                .with_attribute(Attribute::Finesse, 4)
                .with_skill(Skill::Infiltration, 3),
        )
        .in_district("market")
        .with_task(Task::new(
            PieceKind::Agent,
            TaskKind::TakeInfluence { target: "ironmere".into() },
            RollSelection::agent(Attribute::Finesse, Skill::Infiltration),
            1,
        )?),
        squadron(
            "sq_eels",
            "The Eels",
            "thornwood",
            SquadronProfile::new(3)
                .with_aptitude(Aptitude::Underworld, 3)
                .with_aptitude(Aptitude::Monitoring, 1),
        )
        .in_district("docks")
        .with_task(Task::monitor()),
        // === IRONMERE ===
        agent(
            "ag_brannoc",
            "Brannoc Vale",
            "ironmere",
            AgentProfile::new()
                .with_attribute(Attribute::Might, 4)
                .with_skill(Skill::Combat, 3),
        )
        .in_district("docks")
        .with_task(Task::new(
            PieceKind::Agent,
            TaskKind::InitiateConflict {
                target: "thornwood".into(),
                dc: 13,
                description: "break the Eels' hold on the night quay".to_string(),
            },
            brawl,
            0,
        )?),
        squadron(
            "sq_hammers",
            "Red Hammers",
            "ironmere",
            SquadronProfile::new(2)
                .with_aptitude(Aptitude::Combat, 3)
                .with_aptitude(Aptitude::Labor, 2),
        )
        .in_district("foundry")
        .with_task(Task::new(
            PieceKind::Squadron,
            TaskKind::GainInfluence,
            RollSelection::squadron(Aptitude::Labor),
            0,
        )?),
        // === SALTCLIFF ===
        agent(
            "ag_imre",
            "Imre Salt",
            "saltcliff",
            AgentProfile::new()
                .with_attribute(Attribute::Presence, 4)
                .with_skill(Skill::Persuasion, 4),
        )
        .in_district("market")
        .with_task(Task::new(PieceKind::Agent, TaskKind::GainInfluence, persuade, 0)?),
        squadron(
            "sq_tide",
            "Tide Wardens",
            "saltcliff",
            SquadronProfile::new(4)
                .with_aptitude(Aptitude::Social, 2)
                .with_aptitude(Aptitude::Monitoring, 2),
        )
        .in_district("temple")
        .with_task(Task::new(
            PieceKind::Squadron,
            TaskKind::Freeform {
                dc: 12,
                description: "escort the pilgrim barges".to_string(),
            },
            RollSelection::squadron(Aptitude::Social),
            0,
        )?),
        // === NORTHERN HOLD ===
        agent(
            "ag_hesk",
            "Hesk Stonefold",
            "northern_hold",
            AgentProfile::new()
                .with_attribute(Attribute::Intellect, 3)
                .with_skill(Skill::Streetwise, 2),
        )
        .in_district("hill")
        .with_task(Task::monitor()),
        squadron(
            "sq_wardens",
            "Hill Wardens",
            "northern_hold",
            SquadronProfile::new(1).with_aptitude(Aptitude::Combat, 2),
        )
        .in_district("hill"),
    ];
    Ok(pieces)
}
