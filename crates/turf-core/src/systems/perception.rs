//! Perception Engine
//!
//! Turns a monitoring roll into a noisy report of a district. Quality tier
//! drives detection odds, value error, phantom factions, stronghold
//! accuracy, modifier intel and confidence. Every random draw for a report
//! comes from a generator derived from (turn, faction, district, roll), so
//! the same inputs always reproduce the same report.

use rand::rngs::SmallRng;
use rand::Rng;
use std::collections::BTreeMap;
use tracing::debug;

use turf_events::{
    DistrictId, FactionId, ModifierDirection, ModifierIntel, MonitoringReport, PerceivedDistrict,
    QualityTier, ReportId, ReportSource, RumorId,
};

use crate::components::{District, Rumor, INFLUENCE_CAPACITY};
use crate::config::MonitoringConfig;
use crate::error::{EngineError, EngineResult};
use crate::store::Store;
use crate::{derive_rng, stable_hash};

use super::weighted_index;

/// Probability tables indexed by [`QualityTier::index`]
pub mod perception_tables {
    /// Detection chance per influence band (low 1-2, medium 3-5, high 6+)
    pub const DETECTION: [[f64; 3]; 8] = [
        [1.0, 1.0, 1.0],
        [1.0, 1.0, 1.0],
        [0.9, 1.0, 1.0],
        [0.75, 0.9, 1.0],
        [0.6, 0.8, 0.95],
        [0.4, 0.65, 0.85],
        [0.25, 0.5, 0.75],
        [0.1, 0.3, 0.5],
    ];

    /// Chance of exact, off by 1, off by 2 and off by 3, per influence band.
    /// Abysmal has no row: its values are drawn uniformly.
    pub const VALUE_ERROR: [[[f64; 4]; 3]; 7] = [
        [[1.0, 0.0, 0.0, 0.0]; 3],
        [[0.9, 0.1, 0.0, 0.0]; 3],
        [[0.8, 0.2, 0.0, 0.0]; 3],
        [
            [0.7, 0.25, 0.05, 0.0],
            [0.65, 0.3, 0.05, 0.0],
            [0.6, 0.3, 0.1, 0.0],
        ],
        [
            [0.5, 0.35, 0.15, 0.0],
            [0.45, 0.35, 0.15, 0.05],
            [0.4, 0.35, 0.2, 0.05],
        ],
        [
            [0.35, 0.35, 0.2, 0.1],
            [0.3, 0.35, 0.25, 0.1],
            [0.25, 0.35, 0.25, 0.15],
        ],
        [
            [0.2, 0.35, 0.3, 0.15],
            [0.15, 0.35, 0.3, 0.2],
            [0.1, 0.35, 0.3, 0.25],
        ],
    ];

    pub const PHANTOM_CHANCE: [f64; 8] = [0.0, 0.0, 0.05, 0.1, 0.2, 0.3, 0.45, 0.6];
    pub const MAX_PHANTOMS: [usize; 8] = [0, 0, 1, 1, 2, 2, 3, 3];
    /// Phantom candidates seen next door are this much more likely
    pub const ADJACENT_PHANTOM_WEIGHT: f64 = 3.0;

    /// (real stronghold spotted, false stronghold reported)
    pub const STRONGHOLD_ACCURACY: [(f64, f64); 8] = [
        (1.0, 0.0),
        (0.95, 0.02),
        (0.9, 0.05),
        (0.8, 0.1),
        (0.65, 0.15),
        (0.5, 0.25),
        (0.35, 0.3),
        (0.2, 0.4),
    ];

    /// Weights for exact, direction-only and unknown modifier intel
    pub const MODIFIER_INTEL: [[f64; 3]; 8] = [
        [1.0, 0.0, 0.0],
        [0.8, 0.2, 0.0],
        [0.6, 0.35, 0.05],
        [0.4, 0.45, 0.15],
        [0.2, 0.5, 0.3],
        [0.1, 0.4, 0.5],
        [0.0, 0.35, 0.65],
        [0.0, 0.3, 0.7],
    ];
    /// Chance a direction-only reading points the wrong way
    pub const MODIFIER_WRONG_DIRECTION: [f64; 8] = [0.0, 0.0, 0.05, 0.1, 0.15, 0.25, 0.35, 0.5];
}

use perception_tables::*;

/// One monitoring roll to turn into a report
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitoringInput {
    pub turn: u32,
    pub faction_id: FactionId,
    pub district_id: DistrictId,
    pub roll: i32,
    pub source: ReportSource,
}

impl MonitoringInput {
    pub fn new(
        turn: u32,
        faction_id: impl Into<FactionId>,
        district_id: impl Into<DistrictId>,
        roll: i32,
        source: ReportSource,
    ) -> Self {
        Self {
            turn,
            faction_id: faction_id.into(),
            district_id: district_id.into(),
            roll,
            source,
        }
    }

    /// Generator for every draw this report makes
    fn rng(&self) -> SmallRng {
        derive_rng(&[
            u64::from(self.turn),
            stable_hash(self.faction_id.as_str()),
            stable_hash(self.district_id.as_str()),
            i64::from(self.roll) as u64,
        ])
    }
}

/// What the observer could possibly see, gathered from the store
struct DistrictView<'a> {
    district: &'a District,
    /// Factions holding influence in a neighbouring district
    near: Vec<FactionId>,
    factions: Vec<FactionId>,
    rumors: Vec<Rumor>,
}

fn influence_band(actual: i32) -> usize {
    match actual {
        i32::MIN..=2 => 0,
        3..=5 => 1,
        _ => 2,
    }
}

fn perturb(actual: i32, tier: QualityTier, rng: &mut SmallRng) -> i32 {
    if tier == QualityTier::Abysmal {
        return rng.gen_range(1..=INFLUENCE_CAPACITY);
    }
    let weights = VALUE_ERROR[tier.index()][influence_band(actual)];
    let offset = weighted_index(rng, &weights).unwrap_or(0) as i32;
    let signed = if offset > 0 && rng.gen_bool(0.5) { -offset } else { offset };
    (actual + signed).clamp(1, INFLUENCE_CAPACITY)
}

fn detect_factions(
    view: &DistrictView<'_>,
    observer: &FactionId,
    tier: QualityTier,
    rng: &mut SmallRng,
) -> BTreeMap<FactionId, i32> {
    let mut perceived = BTreeMap::new();
    for (faction_id, actual) in view.district.present_factions() {
        if faction_id == observer {
            perceived.insert(faction_id.clone(), actual);
            continue;
        }
        let chance = DETECTION[tier.index()][influence_band(actual)];
        if rng.gen_bool(chance) {
            perceived.insert(faction_id.clone(), perturb(actual, tier, rng));
        }
    }
    perceived
}

fn inject_phantoms(
    view: &DistrictView<'_>,
    observer: &FactionId,
    tier: QualityTier,
    perceived: &mut BTreeMap<FactionId, i32>,
    rng: &mut SmallRng,
) -> Vec<FactionId> {
    let max = MAX_PHANTOMS[tier.index()];
    if max == 0 || !rng.gen_bool(PHANTOM_CHANCE[tier.index()]) {
        return Vec::new();
    }

    let mut candidates: Vec<&FactionId> = view
        .factions
        .iter()
        .filter(|f| *f != observer && view.district.influence_of(f) == 0)
        .collect();
    let count = rng.gen_range(1..=max).min(candidates.len());

    let mut phantoms = Vec::with_capacity(count);
    for _ in 0..count {
        let weights: Vec<f64> = candidates
            .iter()
            .map(|f| {
                if view.near.contains(f) {
                    ADJACENT_PHANTOM_WEIGHT
                } else {
                    1.0
                }
            })
            .collect();
        let Some(idx) = weighted_index(rng, &weights) else {
            break;
        };
        let phantom = candidates.swap_remove(idx).clone();
        perceived.insert(phantom.clone(), rng.gen_range(1..=2));
        phantoms.push(phantom);
    }
    phantoms.sort();
    phantoms
}

/// Trim perceived values until they fit the district capacity
fn normalise_overflow(
    observer: &FactionId,
    perceived: &mut BTreeMap<FactionId, i32>,
    phantoms: &mut Vec<FactionId>,
    rng: &mut SmallRng,
) {
    while perceived.values().sum::<i32>() > INFLUENCE_CAPACITY {
        let reducible: Vec<(FactionId, i32)> = perceived
            .iter()
            .filter(|(f, v)| *f != observer && **v > 1)
            .map(|(f, v)| (f.clone(), *v))
            .collect();
        let weights: Vec<f64> = reducible.iter().map(|(_, v)| f64::from(*v)).collect();
        if let Some(idx) = weighted_index(rng, &weights) {
            if let Some(value) = perceived.get_mut(&reducible[idx].0) {
                *value -= 1;
            }
            continue;
        }

        // Everything left is at 1: drop a whole entry instead
        let victim = if phantoms.is_empty() {
            let others: Vec<FactionId> = perceived.keys().filter(|f| *f != observer).cloned().collect();
            if others.is_empty() {
                break;
            }
            others[rng.gen_range(0..others.len())].clone()
        } else {
            phantoms.remove(rng.gen_range(0..phantoms.len()))
        };
        perceived.remove(&victim);
    }
}

fn judge_strongholds(
    district: &District,
    observer: &FactionId,
    tier: QualityTier,
    perceived: &BTreeMap<FactionId, i32>,
    rng: &mut SmallRng,
) -> BTreeMap<FactionId, bool> {
    let (spotted, false_positive) = STRONGHOLD_ACCURACY[tier.index()];
    perceived
        .keys()
        .map(|faction_id| {
            let actual = district.has_stronghold(faction_id);
            let seen = if faction_id == observer {
                actual
            } else if actual {
                rng.gen_bool(spotted)
            } else {
                rng.gen_bool(false_positive)
            };
            (faction_id.clone(), seen)
        })
        .collect()
}

fn read_modifier(value: i32, tier: QualityTier, rng: &mut SmallRng) -> ModifierIntel {
    match weighted_index(rng, &MODIFIER_INTEL[tier.index()]) {
        Some(0) => ModifierIntel::Exact { value },
        Some(1) => {
            let actual = ModifierDirection::of(value);
            let direction = if rng.gen_bool(MODIFIER_WRONG_DIRECTION[tier.index()]) {
                let others: Vec<ModifierDirection> = [
                    ModifierDirection::Positive,
                    ModifierDirection::Neutral,
                    ModifierDirection::Negative,
                ]
                .into_iter()
                .filter(|d| *d != actual)
                .collect();
                others[rng.gen_range(0..others.len())]
            } else {
                actual
            };
            ModifierIntel::Direction { direction }
        }
        _ => ModifierIntel::Unknown,
    }
}

/// Auto-discover rumors beaten by a wide margin; of the rest that were
/// beaten, reveal one weighted by margin + 1
pub fn discover_rumors<R: Rng + ?Sized>(
    rumors: &[Rumor],
    roll: i32,
    auto_margin: i32,
    rng: &mut R,
) -> Vec<RumorId> {
    let mut found = Vec::new();
    let mut pool = Vec::new();
    for rumor in rumors {
        let margin = roll - rumor.discovery_dc;
        if margin >= auto_margin {
            found.push(rumor.id);
        } else if margin >= 0 {
            pool.push((rumor.id, f64::from(margin + 1)));
        }
    }
    let weights: Vec<f64> = pool.iter().map(|(_, w)| *w).collect();
    if let Some(idx) = weighted_index(rng, &weights) {
        found.push(pool[idx].0);
    }
    found.sort();
    found
}

/// Base confidence for a roll, before jitter
pub fn base_confidence(roll: i32) -> i32 {
    match roll {
        r if r >= 30 => 10,
        r if r >= 25 => 9,
        r if r >= 20 => 8,
        r if r >= 15 => 6,
        r if r >= 10 => 5,
        r if r >= 5 => 3,
        r if r >= 1 => 2,
        _ => 1,
    }
}

fn confidence_band(roll: i32) -> i32 {
    match roll {
        r if r >= 30 => 0,
        r if r >= 20 => 1,
        r if r >= 10 => 2,
        _ => 3,
    }
}

fn rate_confidence(roll: i32, rng: &mut SmallRng) -> u8 {
    let band = confidence_band(roll);
    let upward = rng.gen_bool(0.5);
    let jitter = rng.gen_range(0..=band);
    let value = if upward { base_confidence(roll) + jitter } else { base_confidence(roll) - jitter };
    value.clamp(1, 10) as u8
}

fn perceive(view: &DistrictView<'_>, input: &MonitoringInput, auto_margin: i32, report_id: ReportId) -> MonitoringReport {
    let mut rng = input.rng();
    let tier = QualityTier::from_roll(input.roll);
    let observer = &input.faction_id;

    let mut perceived = detect_factions(view, observer, tier, &mut rng);
    let mut phantoms = inject_phantoms(view, observer, tier, &mut perceived, &mut rng);
    normalise_overflow(observer, &mut perceived, &mut phantoms, &mut rng);
    let perceived_strongholds = judge_strongholds(view.district, observer, tier, &perceived, &mut rng);
    let modifier_intel = read_modifier(view.district.weekly_dc_modifier, tier, &mut rng);
    let discovered_rumors = discover_rumors(&view.rumors, input.roll, auto_margin, &mut rng);
    let confidence = rate_confidence(input.roll, &mut rng);

    MonitoringReport {
        report_id,
        turn: input.turn,
        faction_id: observer.clone(),
        district_id: input.district_id.clone(),
        source: input.source.clone(),
        roll: input.roll,
        quality: tier,
        perceived_influence: perceived,
        phantom_factions: phantoms,
        perceived_strongholds,
        modifier_intel,
        discovered_rumors,
        confidence,
    }
}

/// Compute a report without writing anything. Calling this twice with the
/// same input and store contents gives identical reports.
pub fn generate_report(
    store: &dyn Store,
    input: &MonitoringInput,
    config: &MonitoringConfig,
    report_id: ReportId,
) -> EngineResult<MonitoringReport> {
    let district = store
        .district(&input.district_id)?
        .ok_or_else(|| EngineError::not_found("district", &input.district_id))?;
    if store.faction(&input.faction_id)?.is_none() {
        return Err(EngineError::not_found("faction", &input.faction_id));
    }

    let mut near = Vec::new();
    for adjacent_id in &district.adjacent {
        if let Some(adjacent) = store.district(adjacent_id)? {
            near.extend(adjacent.present_factions().map(|(f, _)| f.clone()));
        }
    }
    let rumors = store
        .rumors_in_district(&district.id)?
        .into_iter()
        .filter(|r| !r.is_known_by(&input.faction_id))
        .collect();
    let view = DistrictView {
        district: &district,
        near,
        factions: store.factions()?.into_iter().map(|f| f.id).collect(),
        rumors,
    };

    Ok(perceive(&view, input, config.rumor_auto_margin, report_id))
}

/// Generate a report, store it, and fold it into the faction's beliefs and
/// the rumors' known-by records
pub fn record_report(
    store: &mut dyn Store,
    input: &MonitoringInput,
    config: &MonitoringConfig,
) -> EngineResult<MonitoringReport> {
    let report_id = ReportId(store.next_id()?);
    let report = generate_report(store, input, config, report_id)?;
    store.append_report(report.clone())?;

    let mut faction = store
        .faction(&input.faction_id)?
        .ok_or_else(|| EngineError::not_found("faction", &input.faction_id))?;
    faction.remember(input.district_id.clone(), PerceivedDistrict::from_report(&report));
    store.put_faction(faction)?;

    for rumor_id in &report.discovered_rumors {
        if let Some(mut rumor) = store.rumor(*rumor_id)? {
            rumor.learn(input.faction_id.clone(), input.turn);
            store.put_rumor(rumor)?;
        }
    }

    debug!(
        faction = %report.faction_id,
        district = %report.district_id,
        quality = %report.quality,
        confidence = report.confidence,
        rumors = report.discovered_rumors.len(),
        "monitoring report recorded"
    );
    Ok(report)
}
