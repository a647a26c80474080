//! Action Resolution
//!
//! Applies a rolled action's effects once its conflicts are settled.

use serde::{Deserialize, Serialize};
use tracing::debug;

use turf_events::{ActionId, FactionId};

use crate::components::{ActionKind, Outcome};
use crate::error::{EngineError, EngineResult};
use crate::store::Store;
use crate::systems::influence::{apply_gain, apply_take};

/// What resolving an action did
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "effect", rename_all = "snake_case")]
pub enum ActionEffect {
    /// Never rolled, or already applied
    Skipped,
    /// The faction lost the action's conflict
    AutoFailed,
    Gained { amount: i32 },
    Took { target: FactionId, amount: i32 },
    /// Outcome stands; nothing else changes
    Recorded { outcome: Outcome },
}

/// Apply one action's effects and mark it resolved
pub fn apply_action_outcome(store: &mut dyn Store, action_id: ActionId) -> EngineResult<ActionEffect> {
    let mut action = store
        .action(action_id)?
        .ok_or_else(|| EngineError::not_found("action", action_id))?;
    if action.resolved || !action.is_rolled() {
        return Ok(ActionEffect::Skipped);
    }

    let effect = if action.auto_fail {
        action.outcome = Some(Outcome::Failure);
        ActionEffect::AutoFailed
    } else {
        let outcome = action.outcome.unwrap_or(Outcome::Failure);
        let steps = outcome.influence_steps();
        match action.kind {
            ActionKind::GainInfluence if steps > 0 => {
                let mut district = store
                    .district(&action.district_id)?
                    .ok_or_else(|| EngineError::not_found("district", &action.district_id))?;
                let amount = steps.min(district.influence_pool);
                if amount > 0 {
                    apply_gain(&mut district, &action.faction_id, amount)?;
                    store.put_district(district)?;
                }
                ActionEffect::Gained { amount }
            }
            ActionKind::TakeInfluence if steps > 0 => {
                let target = action
                    .target_faction
                    .clone()
                    .ok_or_else(|| EngineError::not_found("target faction", action_id))?;
                let mut district = store
                    .district(&action.district_id)?
                    .ok_or_else(|| EngineError::not_found("district", &action.district_id))?;
                let amount = steps.min(district.influence_of(&target));
                if amount > 0 {
                    apply_take(&mut district, &action.faction_id, &target, amount)?;
                    store.put_district(district)?;
                }
                ActionEffect::Took { target, amount }
            }
            _ => ActionEffect::Recorded { outcome },
        }
    };

    debug!(action_id = %action_id, effect = ?effect, "action resolved");
    action.resolved = true;
    store.put_action(action)?;
    Ok(effect)
}
