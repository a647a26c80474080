//! Phase Handlers
//!
//! One handler per turn phase. Each runs inside the transaction opened by
//! [`TurnCoordinator::run_phase`] and returns a one-line summary.

use rand::seq::SliceRandom;
use serde_json::{json, Value};
use tracing::{debug, warn};

use turf_events::{ActionId, LogCategory, MonitoringReport, TurnPhase, TurnState};

use super::TurnCoordinator;
use crate::error::{EngineResult, StateError};
use crate::store::Store;
use crate::systems::action::{
    apply_action_outcome, create_action_for_task, roll_with_context, ActionEffect, RollContext,
};
use crate::systems::conflict::{detect_conflicts, pending_conflicts};
use crate::systems::influence::{decay, random_walk};
use crate::systems::monitoring::{passive_monitoring, process_monitoring, update_rumor_dcs};

impl<S: Store> TurnCoordinator<S> {
    pub(super) fn execute_phase(&mut self, state: TurnState) -> EngineResult<String> {
        match state.phase {
            TurnPhase::Preparation => self.prepare(state),
            TurnPhase::InfluenceDecay => self.decay_influence(state),
            TurnPhase::Assignment => self.assign_actions(state),
            TurnPhase::ConflictDetection => self.detect(state),
            TurnPhase::ActionRoll => self.roll_actions(state),
            TurnPhase::ManualConflictResolution => self.pass_gate(state),
            TurnPhase::ActionResolution => self.resolve_actions(state),
            TurnPhase::RandomWalkUpdate => self.walk_modifiers(state),
            TurnPhase::Monitoring => self.monitor(state),
            TurnPhase::FactionPassiveMonitoring => self.monitor_passively(state),
            TurnPhase::RumorDcUpdate => self.ease_rumors(state),
            TurnPhase::MapUpdate => Ok("map refresh left to the caller".to_string()),
            TurnPhase::TurnCompletion => Ok(format!("turn {} complete", state.turn)),
        }
    }

    // === PART ONE ===

    fn prepare(&mut self, state: TurnState) -> EngineResult<String> {
        self.tracker.reset();
        Ok(format!("turn {} begins", state.turn))
    }

    fn decay_influence(&mut self, state: TurnState) -> EngineResult<String> {
        let mut lost = 0;
        for district in self.store.districts()? {
            let losses = decay(&mut self.store, &district.id, &self.config.influence, &mut self.rng.0)?;
            for loss in losses {
                lost += loss.points;
                self.note(
                    state,
                    LogCategory::Influence,
                    format!("{}: {} lost {} influence", district.id, loss.faction_id, loss.points),
                    json!({ "district_id": district.id, "loss": loss }),
                )?;
            }
        }
        Ok(format!("{} influence lost to decay", lost))
    }

    fn assign_actions(&mut self, state: TurnState) -> EngineResult<String> {
        let mut created = 0;
        let mut skipped = 0;
        for piece in self.store.pieces()? {
            if piece.task.is_none() || piece.district_id.is_none() {
                continue;
            }
            let existing = self.store.action_for_piece(&piece.id, state.turn)?;
            if existing.as_ref().is_some_and(|a| a.is_rolled()) {
                continue;
            }
            match create_action_for_task(&mut self.store, &piece.id, &self.config.influence) {
                Ok(action_id) => {
                    created += 1;
                    debug!(piece = %piece.id, action_id = %action_id, "action assigned");
                }
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    skipped += 1;
                    warn!(piece = %piece.id, error = %e, "task could not become an action");
                    self.note(
                        state,
                        LogCategory::Action,
                        format!("{} skipped: {}", piece.id, e),
                        Value::Null,
                    )?;
                }
            }
        }
        Ok(format!("{} action(s) assigned, {} skipped", created, skipped))
    }

    fn detect(&mut self, state: TurnState) -> EngineResult<String> {
        let opened = detect_conflicts(&mut self.store, state.turn, &self.config.conflict, &mut self.rng.0)?;
        for conflict_id in &opened {
            if let Some(conflict) = self.store.conflict(*conflict_id)? {
                let factions: Vec<String> = conflict.factions().iter().map(|f| f.to_string()).collect();
                self.note(
                    state,
                    LogCategory::Conflict,
                    format!("conflict {} opened in {} between {}", conflict.id, conflict.district_id, factions.join(", ")),
                    json!({ "conflict_id": conflict.id, "type": conflict.conflict_type }),
                )?;
            }
        }
        Ok(format!("{} conflict(s) detected", opened.len()))
    }

    fn roll_actions(&mut self, state: TurnState) -> EngineResult<String> {
        self.tracker.reset();
        let context = RollContext::load(&self.store, state.turn)?;
        let mut unrolled: Vec<ActionId> = self
            .store
            .actions_for_turn(state.turn)?
            .into_iter()
            .filter(|a| !a.is_rolled())
            .map(|a| a.id)
            .collect();
        unrolled.shuffle(&mut self.rng.0);

        for action_id in &unrolled {
            let result = roll_with_context(
                &mut self.store,
                &context,
                *action_id,
                &mut self.tracker,
                &self.config.penalties,
                &mut self.rng.0,
            )?;
            self.note(
                state,
                LogCategory::Action,
                format!("{} rolled {} ({})", result.action_id, result.roll.total, result.outcome),
                json!({ "action_id": result.action_id, "roll": result.roll, "penalty": result.penalty }),
            )?;
        }
        Ok(format!("{} action(s) rolled", unrolled.len()))
    }

    fn pass_gate(&mut self, state: TurnState) -> EngineResult<String> {
        let pending = pending_conflicts(&self.store, state.turn)?;
        if !pending.is_empty() {
            return Err(StateError::GateClosed(pending.len()).into());
        }
        Ok("all conflicts resolved".to_string())
    }

    // === PART TWO ===

    fn resolve_actions(&mut self, state: TurnState) -> EngineResult<String> {
        let mut open: Vec<ActionId> = self
            .store
            .actions_for_turn(state.turn)?
            .into_iter()
            .filter(|a| !a.resolved)
            .map(|a| a.id)
            .collect();
        open.shuffle(&mut self.rng.0);

        let mut applied = 0;
        for action_id in open {
            let effect = apply_action_outcome(&mut self.store, action_id)?;
            let message = match &effect {
                ActionEffect::Skipped => continue,
                ActionEffect::AutoFailed => format!("{} auto-failed after a lost conflict", action_id),
                ActionEffect::Gained { amount } => format!("{} gained {} influence", action_id, amount),
                ActionEffect::Took { target, amount } => {
                    format!("{} took {} influence from {}", action_id, amount, target)
                }
                ActionEffect::Recorded { outcome } => format!("{} resolved as {}", action_id, outcome),
            };
            applied += 1;
            self.note(
                state,
                LogCategory::Action,
                message,
                json!({ "action_id": action_id, "effect": effect }),
            )?;
        }
        Ok(format!("{} action(s) resolved", applied))
    }

    fn walk_modifiers(&mut self, state: TurnState) -> EngineResult<String> {
        let changes = random_walk(&mut self.store, &mut self.rng.0)?;
        for (district_id, before, after) in &changes {
            self.note(
                state,
                LogCategory::District,
                format!("{} weekly modifier {} -> {}", district_id, before, after),
                json!({ "district_id": district_id, "before": before, "after": after }),
            )?;
        }
        Ok(format!("{} weekly modifier(s) moved", changes.len()))
    }

    fn monitor(&mut self, state: TurnState) -> EngineResult<String> {
        let reports = process_monitoring(&mut self.store, state.turn, &self.config.monitoring, &mut self.rng.0)?;
        self.note_reports(state, &reports)?;
        Ok(format!("{} monitoring report(s)", reports.len()))
    }

    fn monitor_passively(&mut self, state: TurnState) -> EngineResult<String> {
        let reports = passive_monitoring(&mut self.store, state.turn, &self.config.monitoring, &mut self.rng.0)?;
        self.note_reports(state, &reports)?;
        Ok(format!("{} passive report(s)", reports.len()))
    }

    fn note_reports(&mut self, state: TurnState, reports: &[MonitoringReport]) -> EngineResult<()> {
        for report in reports {
            self.note(
                state,
                LogCategory::Monitoring,
                format!(
                    "{} watched {}: {} (confidence {}/10)",
                    report.faction_id, report.district_id, report.quality, report.confidence
                ),
                json!({ "report_id": report.report_id, "source": report.source }),
            )?;
            if !report.discovered_rumors.is_empty() {
                self.note(
                    state,
                    LogCategory::Rumor,
                    format!("{} learned {} rumor(s)", report.faction_id, report.discovered_rumors.len()),
                    json!({ "rumors": report.discovered_rumors }),
                )?;
            }
        }
        Ok(())
    }

    fn ease_rumors(&mut self, _state: TurnState) -> EngineResult<String> {
        let eased = update_rumor_dcs(&mut self.store, self.config.monitoring.rumor_dc_floor)?;
        Ok(format!("{} rumor DC(s) eased", eased))
    }
}
