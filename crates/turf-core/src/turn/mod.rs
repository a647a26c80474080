//! Turn Coordinator
//!
//! Drives the thirteen-phase turn. The first half runs preparation through
//! the action rolls and parks at the manual conflict gate; the second half
//! refuses to pass the gate while any conflict of the turn is pending.
//!
//! Every phase runs inside one store transaction. A failing phase rolls
//! back all of its writes, leaves the cursor on itself, and can be rerun.

mod phases;

use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};

use turf_events::{
    ConflictId, FactionId, IntelligenceSummary, LogCategory, LogEntryId, MonitoringReport, PieceId,
    TurnLogEntry, TurnPhase, TurnState,
};

use crate::config::EngineConfig;
use crate::error::{EngineResult, StateError};
use crate::events::{HistoryLogger, PendingHistory};
use crate::store::Store;
use crate::systems::conflict::{self, pending_conflicts, ResolutionRequest, ResolveOutcome};
use crate::systems::penalty::PenaltyTracker;
use crate::systems::{intelligence, monitoring};
use crate::SimRng;

/// Whether the manual conflict gate may be passed
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "conflicts", rename_all = "snake_case")]
pub enum GateStatus {
    Open,
    ConflictsPending(Vec<ConflictId>),
}

/// What one phase did
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PhaseReport {
    pub turn: u32,
    pub phase: TurnPhase,
    pub summary: String,
    /// History entries the phase committed
    pub entries: Vec<TurnLogEntry>,
}

/// Phases run by one half of a turn
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PhasedResult {
    pub turn: u32,
    pub phases: Vec<PhaseReport>,
    pub pending_conflicts: Vec<ConflictId>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum TurnOutcome {
    Completed(PhasedResult),
    /// The gate is closed; nothing ran
    ConflictsPending { conflicts: Vec<ConflictId> },
}

/// Sequences the rule systems over a store
pub struct TurnCoordinator<S: Store> {
    store: S,
    config: EngineConfig,
    rng: SimRng,
    tracker: PenaltyTracker,
    logger: HistoryLogger,
    pending: PendingHistory,
}

/// Cursor position after `state` completes
fn advance(state: TurnState) -> TurnState {
    match state.phase {
        TurnPhase::TurnCompletion => TurnState::new(state.turn + 1, TurnPhase::Preparation),
        phase => TurnState::new(state.turn, phase.next()),
    }
}

impl<S: Store> TurnCoordinator<S> {
    pub fn new(store: S, config: EngineConfig, seed: u64) -> Self {
        Self {
            store,
            config,
            rng: SimRng::seed_from_u64(seed),
            tracker: PenaltyTracker::new(),
            logger: HistoryLogger::null(),
            pending: PendingHistory::new(),
        }
    }

    /// Mirror committed history entries to a JSONL logger
    pub fn with_logger(mut self, logger: HistoryLogger) -> Self {
        self.logger = logger;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn turn_state(&self) -> EngineResult<TurnState> {
        Ok(self.store.turn_state()?)
    }

    fn pending_ids(&self, turn: u32) -> EngineResult<Vec<ConflictId>> {
        Ok(pending_conflicts(&self.store, turn)?
            .into_iter()
            .map(|c| c.id)
            .collect())
    }

    /// Read-only gate check for the current turn
    pub fn check_gate(&self) -> EngineResult<GateStatus> {
        let state = self.store.turn_state()?;
        let pending = self.pending_ids(state.turn)?;
        if pending.is_empty() {
            Ok(GateStatus::Open)
        } else {
            Ok(GateStatus::ConflictsPending(pending))
        }
    }

    /// Append a history entry inside the open transaction
    fn note(
        &mut self,
        state: TurnState,
        category: LogCategory,
        message: impl Into<String>,
        data: Value,
    ) -> EngineResult<()> {
        let entry_id = LogEntryId(self.store.next_id()?);
        let entry = TurnLogEntry::new(entry_id, state.turn, state.phase, category, message).with_data(data);
        self.store.append_history(entry.clone())?;
        self.pending.push(entry);
        Ok(())
    }

    /// Run `op` in a transaction. On success the history it wrote is
    /// returned and mirrored to the logger; on failure every write is undone
    /// and the generator rewinds to where the transaction began.
    fn transact<T>(
        &mut self,
        op: impl FnOnce(&mut Self) -> EngineResult<T>,
    ) -> EngineResult<(T, Vec<TurnLogEntry>)> {
        self.store.begin()?;
        let rng_checkpoint = self.rng.0.clone();
        let result = op(self).and_then(|value| {
            self.store.commit()?;
            Ok(value)
        });
        match result {
            Ok(value) => {
                let entries = self.pending.drain();
                if let Err(e) = self.logger.log_batch(&entries) {
                    warn!(error = %e, "failed to write turn history");
                }
                Ok((value, entries))
            }
            Err(err) => {
                self.pending.discard();
                self.rng.0 = rng_checkpoint;
                if self.store.rollback().is_err() {
                    warn!("no transaction left to roll back");
                }
                Err(err)
            }
        }
    }

    /// Run the phase under the cursor and advance it
    pub fn run_phase(&mut self) -> EngineResult<PhaseReport> {
        let state = self.store.turn_state()?;
        let (summary, entries) = self.transact(|this| {
            let summary = this.execute_phase(state)?;
            this.note(state, LogCategory::Phase, summary.clone(), Value::Null)?;
            this.store.set_turn_state(advance(state))?;
            Ok(summary)
        })?;
        info!(turn = state.turn, phase = %state.phase, "{}", summary);
        Ok(PhaseReport {
            turn: state.turn,
            phase: state.phase,
            summary,
            entries,
        })
    }

    /// Run preparation through action_roll, resuming wherever the cursor
    /// stopped, and park at the conflict gate
    pub fn process_turn_part1(&mut self) -> EngineResult<PhasedResult> {
        let start = self.store.turn_state()?;
        if !TurnPhase::PART_ONE.contains(&start.phase) {
            return Err(StateError::WrongPhase {
                expected: TurnPhase::Preparation,
                actual: start.phase,
            }
            .into());
        }

        let mut phases = Vec::new();
        while TurnPhase::PART_ONE.contains(&self.store.turn_state()?.phase) {
            phases.push(self.run_phase()?);
        }
        let pending_conflicts = self.pending_ids(start.turn)?;
        if !pending_conflicts.is_empty() {
            info!(turn = start.turn, pending = pending_conflicts.len(), "waiting on conflict resolution");
        }
        Ok(PhasedResult {
            turn: start.turn,
            phases,
            pending_conflicts,
        })
    }

    /// Pass the gate and run action_resolution through turn_completion
    pub fn process_turn_part2(&mut self) -> EngineResult<TurnOutcome> {
        let start = self.store.turn_state()?;
        let mut phases = Vec::new();
        match start.phase {
            TurnPhase::ManualConflictResolution => {
                if let GateStatus::ConflictsPending(conflicts) = self.check_gate()? {
                    info!(turn = start.turn, pending = conflicts.len(), "gate closed");
                    return Ok(TurnOutcome::ConflictsPending { conflicts });
                }
                phases.push(self.run_phase()?);
            }
            phase if TurnPhase::PART_TWO.contains(&phase) => {}
            actual => {
                return Err(StateError::WrongPhase {
                    expected: TurnPhase::ManualConflictResolution,
                    actual,
                }
                .into())
            }
        }

        loop {
            let state = self.store.turn_state()?;
            if state.turn != start.turn || !TurnPhase::PART_TWO.contains(&state.phase) {
                break;
            }
            phases.push(self.run_phase()?);
        }
        Ok(TurnOutcome::Completed(PhasedResult {
            turn: start.turn,
            phases,
            pending_conflicts: Vec::new(),
        }))
    }

    /// Run a whole turn. With `auto_resolve`, pending conflicts are settled
    /// as draws between every side; otherwise the turn stops at the gate.
    pub fn run_turn(&mut self, auto_resolve: bool) -> EngineResult<TurnOutcome> {
        let state = self.store.turn_state()?;
        let mut phases = Vec::new();
        if TurnPhase::PART_ONE.contains(&state.phase) {
            phases = self.process_turn_part1()?.phases;
        }
        if auto_resolve {
            for pending in pending_conflicts(&self.store, state.turn)? {
                let request = ResolutionRequest::draw_all(&pending).with_notes("settled automatically as a draw");
                self.resolve_conflict(pending.id, &request)?;
            }
        }
        match self.process_turn_part2()? {
            TurnOutcome::Completed(mut result) => {
                phases.append(&mut result.phases);
                result.phases = phases;
                Ok(TurnOutcome::Completed(result))
            }
            closed => Ok(closed),
        }
    }

    /// Record the referee's verdict on a conflict
    pub fn resolve_conflict(
        &mut self,
        conflict_id: ConflictId,
        request: &ResolutionRequest,
    ) -> EngineResult<ResolveOutcome> {
        let state = self.store.turn_state()?;
        let (outcome, _) = self.transact(|this| {
            let outcome = conflict::resolve_conflict(&mut this.store, conflict_id, request, &this.config.conflict)?;
            if outcome == ResolveOutcome::Resolved {
                this.note(
                    state,
                    LogCategory::Conflict,
                    format!("conflict {} resolved", conflict_id),
                    serde_json::json!({
                        "conflict_id": conflict_id,
                        "resolution": request.resolution_type,
                        "winners": request.winners,
                        "losers": request.losers,
                        "drawers": request.drawers,
                        "notes": request.notes,
                    }),
                )?;
            }
            Ok(outcome)
        })?;
        Ok(outcome)
    }

    pub fn declare_support(&mut self, conflict_id: ConflictId, piece_id: &PieceId) -> EngineResult<()> {
        let state = self.store.turn_state()?;
        self.transact(|this| {
            conflict::declare_support(&mut this.store, conflict_id, piece_id)?;
            this.note(
                state,
                LogCategory::Conflict,
                format!("{} joins conflict {} in support", piece_id, conflict_id),
                Value::Null,
            )
        })?;
        Ok(())
    }

    /// Generate monitoring reports for `turn` outside the phase sequence
    pub fn process_monitoring(&mut self, turn: u32) -> EngineResult<Vec<MonitoringReport>> {
        let (reports, _) = self.transact(|this| {
            monitoring::process_monitoring(&mut this.store, turn, &this.config.monitoring, &mut this.rng.0)
        })?;
        Ok(reports)
    }

    pub fn generate_weekly_intelligence_summary(
        &self,
        faction_id: &FactionId,
        turn: u32,
    ) -> EngineResult<IntelligenceSummary> {
        intelligence::generate_weekly_intelligence_summary(&self.store, faction_id, turn)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::{AgentProfile, Capability, District, Faction, Piece, Task};
    use crate::config::ConflictConfig;
    use crate::error::EngineError;
    use crate::setup::ScenarioBuilder;
    use crate::store::MemoryStore;
    use turf_events::DistrictId;

    fn world(thorn_iron: i32) -> MemoryStore {
        ScenarioBuilder::new()
            .faction(Faction::new("thornwood", "Thornwood").with_relationship("ironmere", thorn_iron))
            .faction(Faction::new("ironmere", "Ironmere"))
            .district(
                District::new("docks", "The Docks")
                    .with_influence("thornwood", 5)
                    .with_influence("ironmere", 3)
                    .with_adjacent(&["market"]),
            )
            .district(District::new("market", "Market").with_influence("ironmere", 4))
            .piece(
                Piece::new("ag_vesna", "Vesna", "thornwood", Capability::Agent(AgentProfile::new()))
                    .in_district("docks")
                    .with_task(Task::monitor()),
            )
            .piece(
                Piece::new("ag_brannoc", "Brannoc", "ironmere", Capability::Agent(AgentProfile::new()))
                    .in_district("docks")
                    .with_task(Task::monitor()),
            )
            .rumor("docks", "the lighthouse keeper is bribed", 8)
            .build()
            .unwrap()
    }

    fn hot_war_config() -> EngineConfig {
        EngineConfig {
            conflict: ConflictConfig {
                hot_war_trigger_chance: 1.0,
                ..ConflictConfig::default()
            },
            ..EngineConfig::default()
        }
    }

    #[test]
    fn test_quiet_turn_runs_every_phase() {
        let mut coordinator = TurnCoordinator::new(world(0), EngineConfig::default(), 7);
        let first = coordinator.process_turn_part1().unwrap();
        assert_eq!(first.phases.len(), 5);
        assert!(first.pending_conflicts.is_empty());
        assert_eq!(
            coordinator.turn_state().unwrap(),
            TurnState::new(1, TurnPhase::ManualConflictResolution)
        );

        let TurnOutcome::Completed(second) = coordinator.process_turn_part2().unwrap() else {
            panic!("gate should be open");
        };
        let ran: Vec<TurnPhase> = second.phases.iter().map(|p| p.phase).collect();
        let mut expected = vec![TurnPhase::ManualConflictResolution];
        expected.extend_from_slice(&TurnPhase::PART_TWO);
        assert_eq!(ran, expected);
        assert_eq!(coordinator.turn_state().unwrap(), TurnState::new(2, TurnPhase::Preparation));

        // Both monitors reported, and the rumor DC eased once
        let store = coordinator.store();
        assert!(!store.reports_for(&FactionId::from("thornwood"), 1).unwrap().is_empty());
        assert_eq!(store.rumors().unwrap()[0].discovery_dc, 7);
        let phase_entries = store
            .history()
            .unwrap()
            .iter()
            .filter(|e| e.category == LogCategory::Phase)
            .count();
        assert_eq!(phase_entries, 13);
    }

    #[test]
    fn test_gate_holds_until_conflicts_resolved() {
        let mut coordinator = TurnCoordinator::new(world(-2), hot_war_config(), 7);
        let first = coordinator.process_turn_part1().unwrap();
        assert_eq!(first.pending_conflicts.len(), 1);
        let conflict_id = first.pending_conflicts[0];

        let before = coordinator.store().data().clone();
        assert_eq!(
            coordinator.check_gate().unwrap(),
            GateStatus::ConflictsPending(vec![conflict_id])
        );
        assert_eq!(
            coordinator.process_turn_part2().unwrap(),
            TurnOutcome::ConflictsPending { conflicts: vec![conflict_id] }
        );
        assert_eq!(coordinator.store().data(), &before);

        let request = ResolutionRequest::new(crate::components::ResolutionType::Win)
            .with_winners(&["thornwood"])
            .with_losers(&["ironmere"]);
        assert_eq!(
            coordinator.resolve_conflict(conflict_id, &request).unwrap(),
            ResolveOutcome::Resolved
        );
        assert_eq!(coordinator.check_gate().unwrap(), GateStatus::Open);
        assert!(matches!(coordinator.process_turn_part2().unwrap(), TurnOutcome::Completed(_)));

        // The loser's monitor auto-failed, so only thornwood watched the docks
        let store = coordinator.store();
        assert!(store.reports_for(&FactionId::from("ironmere"), 1).unwrap().iter().all(|r| {
            !matches!(r.source, turf_events::ReportSource::Action { .. })
        }));
    }

    #[test]
    fn test_halves_refuse_wrong_phase() {
        let mut coordinator = TurnCoordinator::new(world(0), EngineConfig::default(), 1);
        let err = coordinator.process_turn_part2().unwrap_err();
        assert!(matches!(err, EngineError::State(StateError::WrongPhase { .. })));

        coordinator.process_turn_part1().unwrap();
        let err = coordinator.process_turn_part1().unwrap_err();
        assert!(matches!(err, EngineError::State(StateError::WrongPhase { .. })));
    }

    #[test]
    fn test_failed_phase_rolls_back_and_resumes() {
        let mut coordinator = TurnCoordinator::new(world(0), EngineConfig::default(), 3);
        for _ in 0..2 {
            coordinator.run_phase().unwrap();
        }
        assert_eq!(coordinator.turn_state().unwrap().phase, TurnPhase::Assignment);

        let before = coordinator.store().data().clone();
        coordinator.store_mut().fail_after_writes(1);
        let err = coordinator.run_phase().unwrap_err();
        assert!(err.is_fatal());
        assert_eq!(coordinator.store().data(), &before);
        assert!(!coordinator.store().in_transaction());

        coordinator.store_mut().clear_write_failures();
        let result = coordinator.process_turn_part1().unwrap();
        assert_eq!(result.phases[0].phase, TurnPhase::Assignment);
        assert_eq!(coordinator.store().actions_for_turn(1).unwrap().len(), 2);
    }

    #[test]
    fn test_run_turn_auto_resolves() {
        let mut coordinator = TurnCoordinator::new(world(-2), hot_war_config(), 11);
        let TurnOutcome::Completed(result) = coordinator.run_turn(true).unwrap() else {
            panic!("auto resolution should open the gate");
        };
        assert_eq!(result.phases.len(), 13);
        let conflicts = coordinator.store().conflicts_for_turn(1).unwrap();
        assert_eq!(conflicts.len(), 1);
        assert!(!conflicts[0].is_pending());

        let docks = coordinator.store().district(&DistrictId::from("docks")).unwrap().unwrap();
        assert!(docks.is_consistent());
    }

    #[test]
    fn test_run_turn_without_auto_resolve_stops_at_gate() {
        let mut coordinator = TurnCoordinator::new(world(-2), hot_war_config(), 11);
        let outcome = coordinator.run_turn(false).unwrap();
        assert!(matches!(outcome, TurnOutcome::ConflictsPending { .. }));
        assert_eq!(
            coordinator.turn_state().unwrap().phase,
            TurnPhase::ManualConflictResolution
        );
    }

    #[test]
    fn test_monitoring_on_demand() {
        let mut coordinator = TurnCoordinator::new(world(0), EngineConfig::default(), 13);
        coordinator.process_turn_part1().unwrap();
        let reports = coordinator.process_monitoring(1).unwrap();
        assert_eq!(reports.len(), 2);
        assert!(reports.iter().all(|r| r.district_id == DistrictId::from("docks")));
        assert_eq!(coordinator.store().reports_for(&FactionId::from("ironmere"), 1).unwrap().len(), 1);
    }

    #[test]
    fn test_on_demand_monitoring_not_repeated_by_phase() {
        let mut coordinator = TurnCoordinator::new(world(0), EngineConfig::default(), 7);
        coordinator.process_turn_part1().unwrap();
        coordinator.process_monitoring(1).unwrap();
        assert!(matches!(coordinator.process_turn_part2().unwrap(), TurnOutcome::Completed(_)));

        let from_actions = coordinator
            .store()
            .reports_for(&FactionId::from("thornwood"), 1)
            .unwrap()
            .iter()
            .filter(|r| matches!(r.source, turf_events::ReportSource::Action { .. }))
            .count();
        assert_eq!(from_actions, 1);

        let summary = coordinator
            .generate_weekly_intelligence_summary(&FactionId::from("thornwood"), 1)
            .unwrap();
        let docks = summary
            .districts
            .iter()
            .find(|d| d.district_id == DistrictId::from("docks"))
            .unwrap();
        // One monitor action plus thornwood's passive roll on 5 influence
        assert_eq!(docks.report_count, 2);

        // Confidence is logged on its 1..=10 scale
        let watched: Vec<String> = coordinator
            .store()
            .history()
            .unwrap()
            .into_iter()
            .filter(|e| e.message.contains(" watched "))
            .map(|e| e.message)
            .collect();
        assert!(!watched.is_empty());
        assert!(watched.iter().all(|m| m.contains("(confidence ") && m.ends_with("/10)")));
    }

    #[test]
    fn test_retried_phase_draws_same_dice() {
        let mut clean = TurnCoordinator::new(world(0), EngineConfig::default(), 17);
        clean.process_turn_part1().unwrap();

        let mut retried = TurnCoordinator::new(world(0), EngineConfig::default(), 17);
        while retried.turn_state().unwrap().phase != TurnPhase::ActionRoll {
            retried.run_phase().unwrap();
        }
        // The first roll is stored, then its history note fails
        retried.store_mut().fail_after_writes(1);
        assert!(retried.run_phase().unwrap_err().is_fatal());
        retried.store_mut().clear_write_failures();
        retried.process_turn_part1().unwrap();

        assert_eq!(retried.store().data(), clean.store().data());
    }

    #[test]
    fn test_summary_through_coordinator() {
        let mut coordinator = TurnCoordinator::new(world(0), EngineConfig::default(), 5);
        coordinator.run_turn(false).unwrap();
        let summary = coordinator
            .generate_weekly_intelligence_summary(&FactionId::from("thornwood"), 1)
            .unwrap();
        assert!(summary.districts.iter().any(|d| d.district_id == DistrictId::from("docks")));
    }
}
