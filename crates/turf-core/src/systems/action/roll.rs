//! Action Rolls
//!
//! d20 + stat bonus + manual modifier, minus enemy and conflict penalties.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

use turf_events::{ActionId, DistrictId, PieceId};

use crate::components::{Aptitude, District, Outcome, Piece, RollBreakdown, RollSelection, RollSource};
use crate::config::PenaltyConfig;
use crate::error::{EngineError, EngineResult, ValidationError};
use crate::store::Store;
use crate::systems::penalty::{calculate_enemy_penalty, EnemyPenalty, PenaltyTracker};
use crate::systems::relationship::RelationshipLedger;
use crate::systems::roll_d20;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RollResult {
    pub action_id: ActionId,
    pub roll: RollBreakdown,
    pub outcome: Outcome,
    pub penalty: EnemyPenalty,
}

/// World state a roll pass reads but never changes
#[derive(Debug, Clone)]
pub struct RollContext {
    pub ledger: RelationshipLedger,
    pub pieces: Vec<Piece>,
    pub districts: BTreeMap<DistrictId, District>,
    /// Pieces seated in a pending conflict this turn
    pub engaged: BTreeSet<PieceId>,
}

impl RollContext {
    pub fn load(store: &dyn Store, turn: u32) -> EngineResult<Self> {
        let engaged = store
            .conflicts_for_turn(turn)?
            .iter()
            .filter(|c| c.is_pending())
            .flat_map(|c| c.participants.iter().map(|p| p.piece_id.clone()))
            .collect();
        Ok(Self {
            ledger: RelationshipLedger::load(store)?,
            pieces: store.pieces()?,
            districts: store
                .districts()?
                .into_iter()
                .map(|d| (d.id.clone(), d))
                .collect(),
            engaged,
        })
    }

    fn piece(&self, piece_id: &PieceId) -> EngineResult<&Piece> {
        self.pieces
            .iter()
            .find(|p| &p.id == piece_id)
            .ok_or_else(|| EngineError::not_found("piece", piece_id))
    }
}

/// Roll one action, loading what the roll needs from the store
pub fn roll_for_action<R: Rng + ?Sized>(
    store: &mut dyn Store,
    action_id: ActionId,
    tracker: &mut PenaltyTracker,
    config: &PenaltyConfig,
    rng: &mut R,
) -> EngineResult<RollResult> {
    let action = store
        .action(action_id)?
        .ok_or_else(|| EngineError::not_found("action", action_id))?;
    let context = RollContext::load(store, action.turn)?;
    roll_with_context(store, &context, action_id, tracker, config, rng)
}

/// Roll one action against a preloaded context
pub fn roll_with_context<R: Rng + ?Sized>(
    store: &mut dyn Store,
    context: &RollContext,
    action_id: ActionId,
    tracker: &mut PenaltyTracker,
    config: &PenaltyConfig,
    rng: &mut R,
) -> EngineResult<RollResult> {
    let mut action = store
        .action(action_id)?
        .ok_or_else(|| EngineError::not_found("action", action_id))?;
    if action.is_rolled() {
        return Err(ValidationError::AlreadyRolled(action_id.to_string()).into());
    }
    let piece = context.piece(&action.piece_id)?;
    let district = context
        .districts
        .get(&action.district_id)
        .ok_or_else(|| EngineError::not_found("district", &action.district_id))?;

    let bonus = piece.capability.roll_bonus(&action.selection).unwrap_or(0);
    let penalty = calculate_enemy_penalty(
        tracker,
        &action.faction_id,
        district,
        &context.ledger,
        &context.pieces,
        &context.engaged,
        config,
    );
    let roll = RollBreakdown::new(roll_d20(rng, false), bonus, action.manual_modifier)
        .with_penalties(penalty.total, action.conflict_penalty);
    action.record_roll(roll.clone());
    let outcome = action.outcome.unwrap_or(Outcome::Failure);

    debug!(
        action_id = %action_id,
        piece = %action.piece_id,
        total = roll.total,
        enemy_penalty = penalty.total,
        outcome = %outcome,
        "action rolled"
    );
    store.put_action(action)?;

    Ok(RollResult {
        action_id,
        roll,
        outcome,
        penalty,
    })
}

/// Monitoring roll a squadron makes alongside another task: two d20 keep
/// the lower, plus its monitoring aptitude
pub fn secondary_monitoring_roll<R: Rng + ?Sized>(piece: &Piece, rng: &mut R) -> RollBreakdown {
    let bonus = piece
        .capability
        .roll_bonus(&RollSelection::squadron(Aptitude::Monitoring))
        .unwrap_or(0);
    RollBreakdown::new(roll_d20(rng, true), bonus, 0)
}
