//! Rule Systems
//!
//! The rule subsystems the turn coordinator sequences: relationships,
//! influence, enemy penalties, actions, conflicts, perception, monitoring
//! and intelligence summaries. All state flows through [`Store`](crate::store::Store).

pub mod action;
pub mod conflict;
pub mod influence;
pub mod intelligence;
pub mod monitoring;
pub mod penalty;
pub mod perception;
pub mod relationship;

pub use action::{
    apply_action_outcome, assign_task, clear_task, create_action, create_action_for_task,
    roll_for_action, ActionEffect, ActionParams, RollResult,
};
pub use conflict::{
    declare_support, detect_conflicts, pending_conflicts, resolve_conflict, ResolutionRequest,
    ResolveOutcome,
};
pub use influence::{
    calculate_control_dc, control_dc, decay, gain, pool, random_walk, set_likeability,
    set_stronghold, take, DecayCause, DecayLoss,
};
pub use intelligence::generate_weekly_intelligence_summary;
pub use monitoring::{passive_monitoring, process_monitoring, update_rumor_dcs};
pub use penalty::{calculate_enemy_penalty, EnemyPenalty, PenaltySource, PenaltyTracker, SlotBudget, SlotKind};
pub use perception::{generate_report, record_report, MonitoringInput};
pub use relationship::{set_relationship, RelationshipLedger};

use rand::Rng;

/// Pick an index with probability proportional to its weight.
/// Returns `None` when no weight is positive.
pub(crate) fn weighted_index<R: Rng + ?Sized>(rng: &mut R, weights: &[f64]) -> Option<usize> {
    let total: f64 = weights.iter().filter(|w| **w > 0.0).sum();
    if total <= 0.0 {
        return None;
    }

    let mut roll = rng.gen::<f64>() * total;
    for (idx, &weight) in weights.iter().enumerate() {
        if weight <= 0.0 {
            continue;
        }
        if roll < weight {
            return Some(idx);
        }
        roll -= weight;
    }

    // Float rounding: fall back to the last positive weight
    weights.iter().rposition(|w| *w > 0.0)
}

/// One d20, or two keeping the lower when at disadvantage
pub(crate) fn roll_d20<R: Rng + ?Sized>(rng: &mut R, disadvantage: bool) -> Vec<i32> {
    let count = if disadvantage { 2 } else { 1 };
    (0..count).map(|_| rng.gen_range(1..=20)).collect()
}
