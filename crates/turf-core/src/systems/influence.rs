//! Influence Economy
//!
//! Each district holds `INFLUENCE_CAPACITY` points split between factions and
//! the free pool. Gain draws from the pool, take moves points between
//! factions, and decay returns points to the pool. Every mutator keeps
//! `sum(faction_influence) + influence_pool == INFLUENCE_CAPACITY`.

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use turf_events::{DistrictId, FactionId};

use crate::components::{
    District, LIKEABILITY_MAX, LIKEABILITY_MIN, INFLUENCE_CAPACITY, WEEKLY_MODIFIER_MAX,
    WEEKLY_MODIFIER_MIN,
};
use crate::config::InfluenceConfig;
use crate::error::{EngineError, EngineResult, StateError, ValidationError};
use crate::store::Store;

use super::relationship::RelationshipLedger;
use super::weighted_index;

/// Control-DC adjustment for a faction's current influence
pub fn influence_dc_adjustment(influence: i32) -> i32 {
    match influence {
        i32::MIN..=0 => 3,
        1 => 1,
        2 | 3 => -1,
        4 | 5 => 0,
        6 => 1,
        7 => 2,
        8 => 3,
        9 => 4,
        _ => 5,
    }
}

/// Why a point was lost during decay
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecayCause {
    /// Unprotected point eroded
    Erosion,
    /// Extra loss from a (near) full district
    Saturation,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecayLoss {
    pub faction_id: FactionId,
    pub points: i32,
    pub cause: DecayCause,
}

fn load_district(store: &dyn Store, district_id: &DistrictId) -> EngineResult<District> {
    store
        .district(district_id)?
        .ok_or_else(|| EngineError::not_found("district", district_id))
}

fn require_faction(store: &dyn Store, faction_id: &FactionId) -> EngineResult<()> {
    match store.faction(faction_id)? {
        Some(_) => Ok(()),
        None => Err(EngineError::not_found("faction", faction_id)),
    }
}

/// Add `amount` from the pool to a faction. Returns the new influence.
pub fn apply_gain(district: &mut District, faction_id: &FactionId, amount: i32) -> EngineResult<i32> {
    if amount <= 0 {
        return Err(ValidationError::NonPositiveAmount(amount).into());
    }
    if amount > district.influence_pool {
        return Err(StateError::Influence(format!(
            "{} wants {} but only {} remain in the pool of {}",
            faction_id, amount, district.influence_pool, district.id
        ))
        .into());
    }
    let updated = district.influence_of(faction_id) + amount;
    district.influence_pool -= amount;
    district.set_influence_raw(faction_id.clone(), updated);
    Ok(updated)
}

/// Move `amount` from `target` to `source`, all or nothing
pub fn apply_take(
    district: &mut District,
    source: &FactionId,
    target: &FactionId,
    amount: i32,
) -> EngineResult<()> {
    if amount <= 0 {
        return Err(ValidationError::NonPositiveAmount(amount).into());
    }
    if source == target {
        return Err(ValidationError::Rejected(format!("{} cannot take from itself", source)).into());
    }
    let held = district.influence_of(target);
    if held < amount {
        return Err(StateError::Influence(format!(
            "{} holds {} in {}, cannot take {}",
            target, held, district.id, amount
        ))
        .into());
    }
    let gained = district.influence_of(source) + amount;
    district.set_influence_raw(target.clone(), held - amount);
    district.set_influence_raw(source.clone(), gained);
    Ok(())
}

/// Roll erosion and saturation losses for one district
pub fn decay_district<R: Rng + ?Sized>(
    district: &mut District,
    config: &InfluenceConfig,
    rng: &mut R,
) -> Vec<DecayLoss> {
    let mut losses = Vec::new();

    let holdings: Vec<(FactionId, i32)> = district
        .present_factions()
        .map(|(id, v)| (id.clone(), v))
        .collect();

    for (faction_id, influence) in holdings {
        if influence <= config.protected_threshold {
            continue;
        }
        let protected = if district.has_stronghold(&faction_id) {
            config.stronghold_protected_threshold
        } else {
            config.protected_threshold
        };
        let at_risk = (influence - protected).max(0);
        let lost = (0..at_risk)
            .filter(|_| rng.gen_bool(config.decay_chance))
            .count() as i32;
        if lost > 0 {
            district.set_influence_raw(faction_id.clone(), influence - lost);
            district.influence_pool += lost;
            losses.push(DecayLoss {
                faction_id,
                points: lost,
                cause: DecayCause::Erosion,
            });
        }
    }

    let total = district.total_influence();
    let extra_chance = if total >= INFLUENCE_CAPACITY {
        config.saturated_loss_chance
    } else if total == INFLUENCE_CAPACITY - 1 {
        config.near_saturated_loss_chance
    } else {
        0.0
    };

    if extra_chance > 0.0 && rng.gen_bool(extra_chance) {
        let holders: Vec<(FactionId, i32)> = district
            .present_factions()
            .map(|(id, v)| (id.clone(), v))
            .collect();
        let weights: Vec<f64> = holders.iter().map(|(_, v)| f64::from(*v)).collect();
        if let Some(idx) = weighted_index(rng, &weights) {
            let (faction_id, influence) = holders[idx].clone();
            district.set_influence_raw(faction_id.clone(), influence - 1);
            district.influence_pool += 1;
            losses.push(DecayLoss {
                faction_id,
                points: 1,
                cause: DecayCause::Saturation,
            });
        }
    }

    losses
}

/// Control DC for `faction_id` acting in `district`. `target` carries the
/// targeted faction's id and how the actor regards it.
pub fn calculate_control_dc(
    district: &District,
    faction_id: &FactionId,
    target: Option<i32>,
    config: &InfluenceConfig,
) -> i32 {
    let mut dc = config.control_dc_base - district.likeability_of(faction_id)
        + influence_dc_adjustment(district.influence_of(faction_id))
        + district.weekly_dc_modifier;
    if district.has_stronghold(faction_id) {
        dc -= config.stronghold_dc_bonus;
    }
    if let Some(relationship) = target {
        dc += config.targeted_dc_surcharge + relationship;
    }
    dc.max(config.control_dc_floor)
}

/// Store-backed control DC
pub fn control_dc(
    store: &dyn Store,
    district_id: &DistrictId,
    faction_id: &FactionId,
    target: Option<&FactionId>,
    config: &InfluenceConfig,
) -> EngineResult<i32> {
    let district = load_district(store, district_id)?;
    let relationship = match target {
        Some(target) => {
            require_faction(store, target)?;
            let ledger = RelationshipLedger::load(store)?;
            Some(ledger.relationship(faction_id, target))
        }
        None => None,
    };
    Ok(calculate_control_dc(&district, faction_id, relationship, config))
}

pub fn gain(
    store: &mut dyn Store,
    district_id: &DistrictId,
    faction_id: &FactionId,
    amount: i32,
) -> EngineResult<i32> {
    require_faction(store, faction_id)?;
    let mut district = load_district(store, district_id)?;
    let updated = apply_gain(&mut district, faction_id, amount)?;
    store.put_district(district)?;
    debug!(district = %district_id, faction = %faction_id, amount, updated, "influence gained");
    Ok(updated)
}

pub fn take(
    store: &mut dyn Store,
    district_id: &DistrictId,
    source: &FactionId,
    target: &FactionId,
    amount: i32,
) -> EngineResult<()> {
    require_faction(store, source)?;
    require_faction(store, target)?;
    let mut district = load_district(store, district_id)?;
    apply_take(&mut district, source, target, amount)?;
    store.put_district(district)?;
    debug!(district = %district_id, source = %source, target = %target, amount, "influence taken");
    Ok(())
}

pub fn decay<R: Rng + ?Sized>(
    store: &mut dyn Store,
    district_id: &DistrictId,
    config: &InfluenceConfig,
    rng: &mut R,
) -> EngineResult<Vec<DecayLoss>> {
    let mut district = load_district(store, district_id)?;
    let losses = decay_district(&mut district, config, rng);
    if !losses.is_empty() {
        store.put_district(district)?;
    }
    Ok(losses)
}

/// Mark or clear a stronghold; marking needs influence in the district
pub fn set_stronghold(
    store: &mut dyn Store,
    district_id: &DistrictId,
    faction_id: &FactionId,
    present: bool,
) -> EngineResult<()> {
    let mut district = load_district(store, district_id)?;
    if present {
        if district.influence_of(faction_id) <= 0 {
            return Err(StateError::Influence(format!(
                "{} holds no influence in {} and cannot keep a stronghold there",
                faction_id, district_id
            ))
            .into());
        }
        district.strongholds.insert(faction_id.clone(), true);
    } else {
        district.strongholds.remove(faction_id);
    }
    store.put_district(district)?;
    Ok(())
}

pub fn set_likeability(
    store: &mut dyn Store,
    district_id: &DistrictId,
    faction_id: &FactionId,
    value: i32,
) -> EngineResult<()> {
    if !(LIKEABILITY_MIN..=LIKEABILITY_MAX).contains(&value) {
        return Err(ValidationError::OutOfRange {
            field: "likeability",
            value,
            min: LIKEABILITY_MIN,
            max: LIKEABILITY_MAX,
        }
        .into());
    }
    require_faction(store, faction_id)?;
    let mut district = load_district(store, district_id)?;
    district.faction_likeability.insert(faction_id.clone(), value);
    store.put_district(district)?;
    Ok(())
}

/// Free points left in a district
pub fn pool(store: &dyn Store, district_id: &DistrictId) -> EngineResult<i32> {
    Ok(load_district(store, district_id)?.influence_pool)
}

/// Points held by factions in a district
pub fn district_total(store: &dyn Store, district_id: &DistrictId) -> EngineResult<i32> {
    Ok(load_district(store, district_id)?.total_influence())
}

/// Nudge the weekly modifier by -1, 0 or +1 within bounds
pub fn random_walk_step<R: Rng + ?Sized>(district: &mut District, rng: &mut R) -> i32 {
    let current = district.weekly_dc_modifier;
    let steps: &[i32] = if current <= WEEKLY_MODIFIER_MIN {
        &[0, 1]
    } else if current >= WEEKLY_MODIFIER_MAX {
        &[-1, 0]
    } else {
        &[-1, 0, 1]
    };
    let step = steps[rng.gen_range(0..steps.len())];
    district.weekly_dc_modifier = (current + step).clamp(WEEKLY_MODIFIER_MIN, WEEKLY_MODIFIER_MAX);
    district.weekly_dc_modifier
}

/// Random-walk every district's weekly modifier. Returns the changed ones.
pub fn random_walk<R: Rng + ?Sized>(
    store: &mut dyn Store,
    rng: &mut R,
) -> EngineResult<Vec<(DistrictId, i32, i32)>> {
    let mut changes = Vec::new();
    for mut district in store.districts()? {
        let before = district.weekly_dc_modifier;
        let after = random_walk_step(&mut district, rng);
        if after != before {
            changes.push((district.id.clone(), before, after));
            store.put_district(district)?;
        }
    }
    Ok(changes)
}
