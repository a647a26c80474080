//! Sample data fixtures for testing.
//!
//! Ready-made records for other crates' tests. Enable the `test-fixtures`
//! feature to access these helpers.
//!
//! ```ignore
//! // [dev-dependencies]
//! // turf-events = { path = "../turf-events", features = ["test-fixtures"] }
//!
//! use turf_events::fixtures;
//!
//! let report = fixtures::sample_report();
//! ```

use std::collections::BTreeMap;

use crate::{
    DistrictId, FactionId, LogCategory, LogEntryId, ModifierIntel, MonitoringReport, QualityTier,
    ReportId, ReportSource, RumorId, TurnLogEntry, TurnPhase,
};

/// A passive, average-quality report by thornwood on the docks, turn 1
pub fn sample_report() -> MonitoringReport {
    let mut perceived = BTreeMap::new();
    perceived.insert(FactionId::from("thornwood"), 3);
    perceived.insert(FactionId::from("ironmere"), 5);
    let mut strongholds = BTreeMap::new();
    strongholds.insert(FactionId::from("ironmere"), true);
    strongholds.insert(FactionId::from("thornwood"), false);

    MonitoringReport {
        report_id: ReportId(1),
        turn: 1,
        faction_id: FactionId::from("thornwood"),
        district_id: DistrictId::from("docks"),
        source: ReportSource::Passive,
        roll: 12,
        quality: QualityTier::Average,
        perceived_influence: perceived,
        phantom_factions: Vec::new(),
        perceived_strongholds: strongholds,
        modifier_intel: ModifierIntel::Unknown,
        discovered_rumors: vec![RumorId(1)],
        confidence: 5,
    }
}

/// A short history: one entry per first-half phase of turn 1
pub fn sample_history() -> Vec<TurnLogEntry> {
    TurnPhase::PART_ONE
        .iter()
        .enumerate()
        .map(|(i, phase)| {
            TurnLogEntry::new(
                LogEntryId(i as u64 + 1),
                1,
                *phase,
                LogCategory::Phase,
                format!("{} complete", phase),
            )
        })
        .collect()
}
