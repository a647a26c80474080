//! Weekly Intelligence Summary
//!
//! Rolls a faction's reports for one turn up into a per-district digest.

use std::collections::{BTreeMap, BTreeSet};

use turf_events::{DistrictIntel, FactionId, IntelligenceSummary, MonitoringReport};

use crate::error::{EngineError, EngineResult};
use crate::store::Store;

/// Summarise what `faction_id` learned on `turn`. Districts without a
/// report are listed as unmonitored.
pub fn generate_weekly_intelligence_summary(
    store: &dyn Store,
    faction_id: &FactionId,
    turn: u32,
) -> EngineResult<IntelligenceSummary> {
    if store.faction(faction_id)?.is_none() {
        return Err(EngineError::not_found("faction", faction_id));
    }

    let mut by_district: BTreeMap<_, Vec<MonitoringReport>> = BTreeMap::new();
    for report in store.reports_for(faction_id, turn)? {
        by_district.entry(report.district_id.clone()).or_default().push(report);
    }

    let mut districts = Vec::new();
    let mut unmonitored = Vec::new();
    for district in store.districts()? {
        let Some(reports) = by_district.get(&district.id) else {
            unmonitored.push(district.id);
            continue;
        };
        // Most confident report wins; ties go to the higher roll
        let Some(best) = reports.iter().max_by_key(|r| (r.confidence, r.roll)) else {
            unmonitored.push(district.id);
            continue;
        };
        let best_quality = reports
            .iter()
            .map(|r| r.quality)
            .min_by_key(|q| q.index())
            .unwrap_or(best.quality);
        let rumors: BTreeSet<_> = reports
            .iter()
            .flat_map(|r| r.discovered_rumors.iter().copied())
            .collect();

        districts.push(DistrictIntel {
            district_id: district.id,
            report_count: reports.len(),
            best_confidence: best.confidence,
            best_quality,
            perceived_leader: best.perceived_leader().cloned(),
            perceived_influence: best.perceived_influence.clone(),
            rumors_learned: rumors.into_iter().collect(),
        });
    }

    Ok(IntelligenceSummary {
        faction_id: faction_id.clone(),
        turn,
        districts,
        unmonitored,
    })
}
