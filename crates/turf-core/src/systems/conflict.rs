//! Conflict Engine
//!
//! Groups hostile pieces into conflicts during detection, then applies the
//! adjudicated result: losers' actions auto-fail, drawers take a flat
//! penalty on their stored roll.

use rand::Rng;
use std::collections::{BTreeMap, BTreeSet};
use tracing::info;

use turf_events::{ConflictId, DistrictId, FactionId, PieceId};

use crate::components::{
    Action, ActionKind, Conflict, ConflictParticipant, ConflictType, ParticipantOutcome,
    Participation, Piece, PieceKind, Resolution, ResolutionStatus, ResolutionType, Stance,
    RELATIONSHIP_MAX,
};
use crate::config::ConflictConfig;
use crate::error::{EngineError, EngineResult, StateError, ValidationError};
use crate::store::Store;

use super::relationship::RelationshipLedger;

/// Result of a resolution request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolveOutcome {
    Resolved,
    /// The conflict was settled earlier; nothing changed
    AlreadyResolved,
}

/// Adjudication supplied by the human referee
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolutionRequest {
    pub resolution_type: ResolutionType,
    pub winners: Vec<FactionId>,
    pub losers: Vec<FactionId>,
    pub drawers: Vec<FactionId>,
    pub notes: String,
}

impl ResolutionRequest {
    pub fn new(resolution_type: ResolutionType) -> Self {
        Self {
            resolution_type,
            winners: Vec::new(),
            losers: Vec::new(),
            drawers: Vec::new(),
            notes: String::new(),
        }
    }

    pub fn with_winners(mut self, factions: &[&str]) -> Self {
        self.winners.extend(factions.iter().map(|f| FactionId::from(*f)));
        self
    }

    pub fn with_losers(mut self, factions: &[&str]) -> Self {
        self.losers.extend(factions.iter().map(|f| FactionId::from(*f)));
        self
    }

    pub fn with_drawers(mut self, factions: &[&str]) -> Self {
        self.drawers.extend(factions.iter().map(|f| FactionId::from(*f)));
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = notes.into();
        self
    }

    /// Every faction in the conflict draws
    pub fn draw_all(conflict: &Conflict) -> Self {
        Self {
            resolution_type: ResolutionType::Draw,
            winners: Vec::new(),
            losers: Vec::new(),
            drawers: conflict.factions().into_iter().collect(),
            notes: String::new(),
        }
    }

    fn assignments(&self) -> impl Iterator<Item = (&FactionId, ParticipantOutcome)> {
        self.winners
            .iter()
            .map(|f| (f, ParticipantOutcome::Win))
            .chain(self.losers.iter().map(|f| (f, ParticipantOutcome::Loss)))
            .chain(self.drawers.iter().map(|f| (f, ParticipantOutcome::Draw)))
    }

    fn validate(&self, conflict: &Conflict) -> Result<BTreeMap<FactionId, ParticipantOutcome>, ValidationError> {
        let participants = conflict.factions();
        let mut outcomes = BTreeMap::new();
        for (faction, outcome) in self.assignments() {
            if !participants.contains(faction) {
                return Err(ValidationError::NotAParticipant(faction.to_string()));
            }
            if outcomes.insert(faction.clone(), outcome).is_some() {
                return Err(ValidationError::DuplicateOutcome(faction.to_string()));
            }
        }
        match self.resolution_type {
            ResolutionType::Win if self.winners.is_empty() => {
                Err(ValidationError::InconsistentResolution("win"))
            }
            ResolutionType::Loss if self.losers.is_empty() => {
                Err(ValidationError::InconsistentResolution("loss"))
            }
            ResolutionType::Draw if !self.winners.is_empty() || self.drawers.is_empty() => {
                Err(ValidationError::InconsistentResolution("draw"))
            }
            _ => Ok(outcomes),
        }
    }
}

/// Mutable bookkeeping for one detection run
struct Detection<'a> {
    turn: u32,
    pieces: &'a [Piece],
    involved: BTreeSet<PieceId>,
    created: Vec<Conflict>,
}

impl<'a> Detection<'a> {
    fn uninvolved_in(&self, faction: &FactionId, district: &DistrictId) -> Vec<&'a Piece> {
        self.pieces
            .iter()
            .filter(|p| &p.faction_id == faction && p.is_in(district) && !self.involved.contains(&p.id))
            .collect()
    }

    fn open(
        &mut self,
        store: &mut dyn Store,
        district: &DistrictId,
        conflict_type: ConflictType,
        seats: Vec<(&Piece, Participation)>,
    ) -> EngineResult<()> {
        let id = ConflictId(store.next_id()?);
        let mut conflict = Conflict::new(id, self.turn, district.clone(), conflict_type);
        for (piece, participation) in seats {
            self.involved.insert(piece.id.clone());
            conflict.add_participant(ConflictParticipant::new(
                piece.id.clone(),
                piece.faction_id.clone(),
                participation,
            ));
        }
        info!(
            conflict_id = %id,
            district = %district,
            conflict_type = %conflict_type,
            participants = conflict.participants.len(),
            "conflict opened"
        );
        self.created.push(conflict);
        Ok(())
    }
}

/// Run the four detection passes for `turn`. Returns the new conflict ids.
pub fn detect_conflicts<R: Rng + ?Sized>(
    store: &mut dyn Store,
    turn: u32,
    config: &ConflictConfig,
    rng: &mut R,
) -> EngineResult<Vec<ConflictId>> {
    let actions = store.actions_for_turn(turn)?;
    let pieces = store.pieces()?;
    let districts = store.districts()?;
    let ledger = RelationshipLedger::load(store)?;

    let involved = store
        .conflicts_for_turn(turn)?
        .iter()
        .flat_map(|c| c.participants.iter().map(|p| p.piece_id.clone()))
        .collect();
    let mut detection = Detection {
        turn,
        pieces: &pieces,
        involved,
        created: Vec::new(),
    };

    manual_pass(store, &mut detection, &actions)?;
    relationship_pass(store, &mut detection, &districts, &ledger, config, rng)?;
    target_pass(store, &mut detection, &actions)?;
    adjacent_pass(&mut detection, &districts, config, rng);

    let ids: Vec<ConflictId> = detection.created.iter().map(|c| c.id).collect();
    let mut by_piece: BTreeMap<PieceId, ConflictId> = BTreeMap::new();
    for conflict in detection.created {
        for participant in &conflict.participants {
            by_piece.insert(participant.piece_id.clone(), conflict.id);
        }
        store.put_conflict(conflict)?;
    }
    link_actions(store, actions, &by_piece)?;
    Ok(ids)
}

fn link_actions(
    store: &mut dyn Store,
    actions: Vec<Action>,
    by_piece: &BTreeMap<PieceId, ConflictId>,
) -> EngineResult<()> {
    for mut action in actions {
        if action.in_conflict {
            continue;
        }
        if let Some(conflict_id) = by_piece.get(&action.piece_id) {
            action.link_conflict(*conflict_id);
            store.put_action(action)?;
        }
    }
    Ok(())
}

fn manual_pass(store: &mut dyn Store, detection: &mut Detection<'_>, actions: &[Action]) -> EngineResult<()> {
    let pieces = detection.pieces;
    for action in actions.iter().filter(|a| a.kind == ActionKind::InitiateConflict) {
        if detection.involved.contains(&action.piece_id) {
            continue;
        }
        let Some(target) = &action.target_faction else {
            continue;
        };
        let Some(initiator) = pieces.iter().find(|p| p.id == action.piece_id) else {
            continue;
        };
        let defenders = detection.uninvolved_in(target, &action.district_id);
        if defenders.is_empty() {
            continue;
        }
        let mut seats = vec![(initiator, Participation::Direct)];
        seats.extend(defenders.into_iter().map(|p| (p, Participation::Direct)));
        detection.open(store, &action.district_id, ConflictType::Manual, seats)?;
    }
    Ok(())
}

fn relationship_pass<R: Rng + ?Sized>(
    store: &mut dyn Store,
    detection: &mut Detection<'_>,
    districts: &[crate::components::District],
    ledger: &RelationshipLedger,
    config: &ConflictConfig,
    rng: &mut R,
) -> EngineResult<()> {
    for district in districts {
        let factions: BTreeSet<FactionId> = detection
            .pieces
            .iter()
            .filter(|p| p.is_in(&district.id))
            .map(|p| p.faction_id.clone())
            .collect();
        let factions: Vec<FactionId> = factions.into_iter().collect();

        for (i, a) in factions.iter().enumerate() {
            for b in &factions[i + 1..] {
                let chance = match ledger.mutual_stance(a, b) {
                    Stance::HotWar => config.hot_war_trigger_chance,
                    Stance::ColdWar => config.cold_war_trigger_chance,
                    _ => continue,
                };
                let side_a = detection.uninvolved_in(a, &district.id);
                let side_b = detection.uninvolved_in(b, &district.id);
                if side_a.is_empty() || side_b.is_empty() {
                    continue;
                }
                if !rng.gen_bool(chance.clamp(0.0, 1.0)) {
                    continue;
                }
                let seats = side_a
                    .into_iter()
                    .chain(side_b)
                    .map(|p| (p, Participation::Direct))
                    .collect();
                detection.open(store, &district.id, ConflictType::Relationship, seats)?;
            }
        }
    }
    Ok(())
}

fn target_pass(store: &mut dyn Store, detection: &mut Detection<'_>, actions: &[Action]) -> EngineResult<()> {
    let takes: Vec<&Action> = actions
        .iter()
        .filter(|a| a.kind == ActionKind::TakeInfluence && a.target_faction.is_some())
        .collect();

    let pieces = detection.pieces;
    for (i, first) in takes.iter().enumerate() {
        if detection.involved.contains(&first.piece_id) {
            continue;
        }
        let rival = takes[i + 1..].iter().find(|other| {
            other.district_id == first.district_id
                && other.target_faction == first.target_faction
                && other.faction_id != first.faction_id
                && !detection.involved.contains(&other.piece_id)
        });
        let Some(rival) = rival else {
            continue;
        };
        let seats: Vec<(&Piece, Participation)> = pieces
            .iter()
            .filter(|p| p.id == first.piece_id || p.id == rival.piece_id)
            .map(|p| (p, Participation::Direct))
            .collect();
        if seats.len() == 2 {
            detection.open(store, &first.district_id, ConflictType::Target, seats)?;
        }
    }
    Ok(())
}

fn adjacent_pass<R: Rng + ?Sized>(
    detection: &mut Detection<'_>,
    districts: &[crate::components::District],
    config: &ConflictConfig,
    rng: &mut R,
) {
    let pieces = detection.pieces;
    for idx in 0..detection.created.len() {
        let conflict = &detection.created[idx];
        if conflict.factions().len() < 2 || conflict.participants.len() < 2 {
            continue;
        }
        let Some(district) = districts.iter().find(|d| d.id == conflict.district_id) else {
            continue;
        };
        let factions = conflict.factions();

        let mut joiners = Vec::new();
        for squadron in pieces.iter().filter(|p| {
            p.kind() == PieceKind::Squadron
                && factions.contains(&p.faction_id)
                && p.district_id.as_ref().is_some_and(|d| district.is_adjacent_to(d))
        }) {
            if detection.involved.contains(&squadron.id) {
                continue;
            }
            let chance = (config.adjacent_join_chance_per_mobility * f64::from(squadron.mobility())).clamp(0.0, 1.0);
            if chance > 0.0 && rng.gen_bool(chance) {
                detection.involved.insert(squadron.id.clone());
                joiners.push(squadron);
            }
        }

        let conflict = &mut detection.created[idx];
        for squadron in joiners {
            info!(conflict_id = %conflict.id, piece = %squadron.id, "squadron reinforces from adjacent district");
            conflict.add_participant(ConflictParticipant::new(
                squadron.id.clone(),
                squadron.faction_id.clone(),
                Participation::Adjacent,
            ));
        }
    }
}

fn load_conflict(store: &dyn Store, conflict_id: ConflictId) -> EngineResult<Conflict> {
    store
        .conflict(conflict_id)?
        .ok_or_else(|| EngineError::not_found("conflict", conflict_id))
}

/// Settle a conflict and push the result onto the linked actions
pub fn resolve_conflict(
    store: &mut dyn Store,
    conflict_id: ConflictId,
    request: &ResolutionRequest,
    config: &ConflictConfig,
) -> EngineResult<ResolveOutcome> {
    let mut conflict = load_conflict(store, conflict_id)?;
    if !conflict.is_pending() {
        return Ok(ResolveOutcome::AlreadyResolved);
    }
    let outcomes = request.validate(&conflict)?;

    for participant in &mut conflict.participants {
        participant.outcome = outcomes.get(&participant.faction_id).copied();
        if participant.outcome == Some(ParticipantOutcome::Draw) {
            participant.conflict_penalty = config.draw_penalty;
        }
    }

    for mut action in store.actions_for_turn(conflict.turn)? {
        if action.conflict_id != Some(conflict_id) {
            continue;
        }
        match outcomes.get(&action.faction_id) {
            Some(ParticipantOutcome::Loss) => action.auto_fail = true,
            Some(ParticipantOutcome::Draw) => action.apply_conflict_penalty(config.draw_penalty),
            _ => continue,
        }
        store.put_action(action)?;
    }

    conflict.status = ResolutionStatus::Resolved;
    conflict.resolution = Some(Resolution {
        resolution_type: request.resolution_type,
        faction_outcomes: outcomes,
        notes: request.notes.clone(),
    });
    info!(conflict_id = %conflict_id, resolution = ?request.resolution_type, "conflict resolved");
    store.put_conflict(conflict)?;
    Ok(ResolveOutcome::Resolved)
}

/// Bring an allied piece into a pending conflict
pub fn declare_support(
    store: &mut dyn Store,
    conflict_id: ConflictId,
    piece_id: &PieceId,
) -> EngineResult<()> {
    let mut conflict = load_conflict(store, conflict_id)?;
    if !conflict.is_pending() {
        return Err(StateError::ConflictClosed(conflict_id.to_string()).into());
    }
    let piece = store
        .piece(piece_id)?
        .ok_or_else(|| EngineError::not_found("piece", piece_id))?;

    let district = store
        .district(&conflict.district_id)?
        .ok_or_else(|| EngineError::not_found("district", &conflict.district_id))?;
    let nearby = piece
        .district_id
        .as_ref()
        .is_some_and(|d| *d == district.id || district.is_adjacent_to(d));
    if !nearby {
        return Err(ValidationError::Rejected(format!(
            "{} is too far from {} to support",
            piece.id, district.id
        ))
        .into());
    }

    let already = store
        .conflicts_for_turn(conflict.turn)?
        .iter()
        .any(|c| c.involves_piece(piece_id));
    if already {
        return Err(ValidationError::Rejected(format!("{} is already in a conflict", piece.id)).into());
    }

    let ledger = RelationshipLedger::load(store)?;
    let allied = conflict
        .factions()
        .iter()
        .any(|f| *f != piece.faction_id && ledger.relationship(&piece.faction_id, f) == RELATIONSHIP_MAX);
    if !allied {
        return Err(ValidationError::Rejected(format!(
            "{} is not allied with any side of {}",
            piece.faction_id, conflict_id
        ))
        .into());
    }

    conflict.add_participant(ConflictParticipant::new(
        piece.id.clone(),
        piece.faction_id.clone(),
        Participation::AllySupport,
    ));
    if let Some(mut action) = store.action_for_piece(piece_id, conflict.turn)? {
        action.link_conflict(conflict_id);
        store.put_action(action)?;
    }
    info!(conflict_id = %conflict_id, piece = %piece_id, "ally support declared");
    store.put_conflict(conflict)?;
    Ok(())
}

/// Conflicts of `turn` still awaiting adjudication
pub fn pending_conflicts(store: &dyn Store, turn: u32) -> EngineResult<Vec<Conflict>> {
    Ok(store
        .conflicts_for_turn(turn)?
        .into_iter()
        .filter(Conflict::is_pending)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::{
        AgentProfile, Aptitude, Attribute, Capability, District, Faction, Outcome, RollBreakdown,
        RollSelection, Skill, SquadronProfile, Task, TaskKind,
    };
    use crate::config::InfluenceConfig;
    use crate::setup::ScenarioBuilder;
    use crate::store::MemoryStore;
    use crate::systems::action::create_action_for_task;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    fn agent(id: &str, faction: &str, district: &str) -> Piece {
        Piece::new(id, id, faction, Capability::Agent(AgentProfile::new())).in_district(district)
    }

    fn squadron(id: &str, faction: &str, district: &str, mobility: i32) -> Piece {
        Piece::new(id, id, faction, Capability::Squadron(SquadronProfile::new(mobility)))
            .in_district(district)
    }

    fn take_task(kind: crate::components::PieceKind, target: &str) -> Task {
        let selection = match kind {
            crate::components::PieceKind::Agent => RollSelection::agent(Attribute::Might, Skill::Combat),
            crate::components::PieceKind::Squadron => RollSelection::squadron(Aptitude::Combat),
        };
        Task::new(kind, TaskKind::TakeInfluence { target: FactionId::from(target) }, selection, 0).unwrap()
    }

    fn builder(thorn_iron: i32) -> ScenarioBuilder {
        ScenarioBuilder::new()
            .faction(Faction::new("thornwood", "Thornwood").with_relationship("ironmere", thorn_iron))
            .faction(Faction::new("ironmere", "Ironmere").with_relationship("saltcliff", 2))
            .faction(Faction::new("saltcliff", "Saltcliff").with_relationship("ironmere", 2))
            .district(
                District::new("docks", "The Docks")
                    .with_influence("saltcliff", 4)
                    .with_adjacent(&["market"]),
            )
            .district(District::new("market", "Market"))
    }

    fn materialise_all(store: &mut MemoryStore) {
        for piece in store.pieces().unwrap() {
            if piece.task.is_some() && piece.district_id.is_some() {
                create_action_for_task(store, &piece.id, &InfluenceConfig::default()).unwrap();
            }
        }
    }

    #[test]
    fn test_manual_conflict_needs_target_piece() {
        let initiate = Task::new(
            crate::components::PieceKind::Agent,
            TaskKind::InitiateConflict {
                target: FactionId::from("ironmere"),
                dc: 12,
                description: "burn the warehouse".to_string(),
            },
            RollSelection::agent(Attribute::Might, Skill::Combat),
            0,
        )
        .unwrap();
        let mut store = builder(0)
            .piece(agent("ag_thorn", "thornwood", "docks").with_task(initiate.clone()))
            .piece(agent("ag_thorn_2", "thornwood", "market").with_task(initiate))
            .piece(agent("ag_iron", "ironmere", "docks"))
            .build()
            .unwrap();
        materialise_all(&mut store);

        let mut rng = SmallRng::seed_from_u64(1);
        let ids = detect_conflicts(&mut store, 1, &ConflictConfig::default(), &mut rng).unwrap();
        assert_eq!(ids.len(), 1);
        let conflict = store.conflict(ids[0]).unwrap().unwrap();
        assert_eq!(conflict.conflict_type, ConflictType::Manual);
        assert!(conflict.involves_piece(&PieceId::from("ag_iron")));
        assert!(!conflict.involves_piece(&PieceId::from("ag_thorn_2")));

        let action = store.action_for_piece(&PieceId::from("ag_thorn"), 1).unwrap().unwrap();
        assert!(action.in_conflict);
        assert_eq!(action.conflict_id, Some(ids[0]));
    }

    #[test]
    fn test_hot_war_triggers_relationship_conflict() {
        let config = ConflictConfig {
            hot_war_trigger_chance: 1.0,
            ..ConflictConfig::default()
        };
        let mut store = builder(-2)
            .piece(agent("ag_thorn", "thornwood", "docks"))
            .piece(agent("ag_iron", "ironmere", "docks"))
            .build()
            .unwrap();
        let mut rng = SmallRng::seed_from_u64(1);
        let ids = detect_conflicts(&mut store, 1, &config, &mut rng).unwrap();
        assert_eq!(ids.len(), 1);
        let conflict = store.conflict(ids[0]).unwrap().unwrap();
        assert_eq!(conflict.conflict_type, ConflictType::Relationship);
        assert_eq!(conflict.factions().len(), 2);
    }

    #[test]
    fn test_neutral_factions_never_fight() {
        let config = ConflictConfig {
            hot_war_trigger_chance: 1.0,
            cold_war_trigger_chance: 1.0,
            ..ConflictConfig::default()
        };
        let mut store = builder(0)
            .piece(agent("ag_thorn", "thornwood", "docks"))
            .piece(agent("ag_iron", "ironmere", "docks"))
            .build()
            .unwrap();
        let mut rng = SmallRng::seed_from_u64(1);
        assert!(detect_conflicts(&mut store, 1, &config, &mut rng).unwrap().is_empty());
    }

    #[test]
    fn test_rival_takes_on_same_target_collide() {
        let mut store = builder(0)
            .piece(agent("ag_thorn", "thornwood", "docks").with_task(take_task(crate::components::PieceKind::Agent, "saltcliff")))
            .piece(squadron("sq_iron", "ironmere", "docks", 0).with_task(take_task(crate::components::PieceKind::Squadron, "saltcliff")))
            .build()
            .unwrap();
        materialise_all(&mut store);
        let mut rng = SmallRng::seed_from_u64(1);
        let ids = detect_conflicts(&mut store, 1, &ConflictConfig::default(), &mut rng).unwrap();
        assert_eq!(ids.len(), 1);
        let conflict = store.conflict(ids[0]).unwrap().unwrap();
        assert_eq!(conflict.conflict_type, ConflictType::Target);
        assert_eq!(conflict.participants.len(), 2);
    }

    #[test]
    fn test_adjacent_squadron_reinforces() {
        let config = ConflictConfig {
            hot_war_trigger_chance: 1.0,
            adjacent_join_chance_per_mobility: 0.5,
            ..ConflictConfig::default()
        };
        let mut store = builder(-2)
            .piece(agent("ag_thorn", "thornwood", "docks"))
            .piece(agent("ag_iron", "ironmere", "docks"))
            .piece(squadron("sq_iron", "ironmere", "market", 2))
            .piece(squadron("sq_salt", "saltcliff", "market", 5))
            .build()
            .unwrap();
        let mut rng = SmallRng::seed_from_u64(1);
        let ids = detect_conflicts(&mut store, 1, &config, &mut rng).unwrap();
        let conflict = store.conflict(ids[0]).unwrap().unwrap();
        let joined = conflict
            .participants
            .iter()
            .find(|p| p.piece_id == PieceId::from("sq_iron"))
            .unwrap();
        assert_eq!(joined.participation, Participation::Adjacent);
        // Saltcliff is not a side of this conflict
        assert!(!conflict.involves_piece(&PieceId::from("sq_salt")));
    }

    #[test]
    fn test_default_trigger_rates() {
        const TRIALS: u64 = 2000;
        let rate = |thorn_iron: i32, config: &ConflictConfig, joiner: bool| {
            let mut hits = 0;
            for seed in 0..TRIALS {
                let mut store = builder(thorn_iron)
                    .piece(agent("ag_thorn", "thornwood", "docks"))
                    .piece(agent("ag_iron", "ironmere", "docks"))
                    .piece(squadron("sq_iron", "ironmere", "market", 3))
                    .build()
                    .unwrap();
                let mut rng = SmallRng::seed_from_u64(seed);
                let ids = detect_conflicts(&mut store, 1, config, &mut rng).unwrap();
                let Some(id) = ids.first() else {
                    continue;
                };
                let conflict = store.conflict(*id).unwrap().unwrap();
                if !joiner || conflict.involves_piece(&PieceId::from("sq_iron")) {
                    hits += 1;
                }
            }
            hits as f64 / TRIALS as f64
        };

        let defaults = ConflictConfig::default();
        let hot = rate(-2, &defaults, false);
        assert!((0.35..=0.45).contains(&hot), "hot war rate {}", hot);
        let cold = rate(-1, &defaults, false);
        assert!((0.07..=0.13).contains(&cold), "cold war rate {}", cold);

        // Every hot war fires; mobility 3 joins about three times in ten
        let always = ConflictConfig {
            hot_war_trigger_chance: 1.0,
            ..ConflictConfig::default()
        };
        let joined = rate(-2, &always, true);
        assert!((0.25..=0.35).contains(&joined), "adjacent join rate {}", joined);
    }

    #[test]
    fn test_detection_is_not_repeated_for_involved_pieces() {
        let config = ConflictConfig {
            hot_war_trigger_chance: 1.0,
            ..ConflictConfig::default()
        };
        let mut store = builder(-2)
            .piece(agent("ag_thorn", "thornwood", "docks"))
            .piece(agent("ag_iron", "ironmere", "docks"))
            .build()
            .unwrap();
        let mut rng = SmallRng::seed_from_u64(1);
        assert_eq!(detect_conflicts(&mut store, 1, &config, &mut rng).unwrap().len(), 1);
        assert!(detect_conflicts(&mut store, 1, &config, &mut rng).unwrap().is_empty());
    }

    fn conflict_with_rolls() -> (MemoryStore, ConflictId) {
        let mut store = builder(0)
            .piece(agent("ag_thorn", "thornwood", "docks").with_task(take_task(crate::components::PieceKind::Agent, "saltcliff")))
            .piece(agent("ag_iron", "ironmere", "docks").with_task(take_task(crate::components::PieceKind::Agent, "saltcliff")))
            .build()
            .unwrap();
        materialise_all(&mut store);
        let mut rng = SmallRng::seed_from_u64(1);
        let ids = detect_conflicts(&mut store, 1, &ConflictConfig::default(), &mut rng).unwrap();
        for mut action in store.actions_for_turn(1).unwrap() {
            action.record_roll(RollBreakdown::new(vec![15], 0, 0));
            store.put_action(action).unwrap();
        }
        (store, ids[0])
    }

    #[test]
    fn test_draw_penalizes_stored_roll() {
        let (mut store, id) = conflict_with_rolls();
        let request = ResolutionRequest::new(ResolutionType::Draw).with_drawers(&["thornwood", "ironmere"]);
        assert_eq!(
            resolve_conflict(&mut store, id, &request, &ConflictConfig::default()).unwrap(),
            ResolveOutcome::Resolved
        );

        let action = store.action_for_piece(&PieceId::from("ag_thorn"), 1).unwrap().unwrap();
        assert_eq!(action.conflict_penalty, 2);
        assert_eq!(action.total(), Some(13));
        assert_eq!(action.outcome, Some(Outcome::evaluate(13, action.dc)));

        let conflict = store.conflict(id).unwrap().unwrap();
        assert!(conflict.participants.iter().all(|p| p.conflict_penalty == 2));
        assert!(pending_conflicts(&store, 1).unwrap().is_empty());
    }

    #[test]
    fn test_loser_actions_auto_fail() {
        let (mut store, id) = conflict_with_rolls();
        let request = ResolutionRequest::new(ResolutionType::Win)
            .with_winners(&["thornwood"])
            .with_losers(&["ironmere"])
            .with_notes("ironmere routed at the quay");
        resolve_conflict(&mut store, id, &request, &ConflictConfig::default()).unwrap();

        let loser = store.action_for_piece(&PieceId::from("ag_iron"), 1).unwrap().unwrap();
        let winner = store.action_for_piece(&PieceId::from("ag_thorn"), 1).unwrap().unwrap();
        assert!(loser.auto_fail);
        assert!(!winner.auto_fail);
        assert_eq!(winner.total(), Some(15));
    }

    #[test]
    fn test_resolve_twice_reports_already_resolved() {
        let (mut store, id) = conflict_with_rolls();
        let request = ResolutionRequest::new(ResolutionType::Special).with_notes("truce brokered");
        resolve_conflict(&mut store, id, &request, &ConflictConfig::default()).unwrap();
        assert_eq!(
            resolve_conflict(&mut store, id, &request, &ConflictConfig::default()).unwrap(),
            ResolveOutcome::AlreadyResolved
        );
    }

    #[test]
    fn test_resolution_validation() {
        let (mut store, id) = conflict_with_rolls();
        let config = ConflictConfig::default();

        let outsider = ResolutionRequest::new(ResolutionType::Win).with_winners(&["saltcliff"]);
        let err = resolve_conflict(&mut store, id, &outsider, &config).unwrap_err();
        assert!(matches!(err, EngineError::Validation(ValidationError::NotAParticipant(_))));

        let twice = ResolutionRequest::new(ResolutionType::Win)
            .with_winners(&["thornwood"])
            .with_losers(&["thornwood"]);
        let err = resolve_conflict(&mut store, id, &twice, &config).unwrap_err();
        assert!(matches!(err, EngineError::Validation(ValidationError::DuplicateOutcome(_))));

        let no_winner = ResolutionRequest::new(ResolutionType::Win).with_losers(&["ironmere"]);
        assert!(resolve_conflict(&mut store, id, &no_winner, &config).is_err());

        let draw_with_winner = ResolutionRequest::new(ResolutionType::Draw)
            .with_winners(&["thornwood"])
            .with_drawers(&["ironmere"]);
        assert!(resolve_conflict(&mut store, id, &draw_with_winner, &config).is_err());

        assert_eq!(pending_conflicts(&store, 1).unwrap().len(), 1);
        assert!(resolve_conflict(&mut store, ConflictId(777), &outsider, &config)
            .unwrap_err()
            .is_not_found());
    }

    #[test]
    fn test_declare_support_from_ally() {
        let (mut store, id) = conflict_with_rolls();
        store.put_piece(squadron("sq_salt", "saltcliff", "market", 2)).unwrap();
        store.put_piece(agent("ag_thorn_far", "thornwood", "market")).unwrap();

        declare_support(&mut store, id, &PieceId::from("sq_salt")).unwrap();
        let conflict = store.conflict(id).unwrap().unwrap();
        let seat = conflict
            .participants
            .iter()
            .find(|p| p.piece_id == PieceId::from("sq_salt"))
            .unwrap();
        assert_eq!(seat.participation, Participation::AllySupport);

        // Not allied with anyone in the fight
        assert!(declare_support(&mut store, id, &PieceId::from("ag_thorn_far")).is_err());
        // Already seated
        assert!(declare_support(&mut store, id, &PieceId::from("sq_salt")).is_err());

        resolve_conflict(&mut store, id, &ResolutionRequest::draw_all(&conflict), &ConflictConfig::default()).unwrap();
        store.put_piece(squadron("sq_salt_2", "saltcliff", "docks", 1)).unwrap();
        let err = declare_support(&mut store, id, &PieceId::from("sq_salt_2")).unwrap_err();
        assert!(matches!(err, EngineError::State(StateError::ConflictClosed(_))));
    }
}
