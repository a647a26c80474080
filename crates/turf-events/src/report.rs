//! Monitoring Report Types
//!
//! Write-once intelligence snapshots produced by the perception engine, the
//! per-faction perceived-state cache derived from them, and the weekly
//! intelligence summary.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::ids::{ActionId, DistrictId, FactionId, PieceId, ReportId, RumorId};
use crate::quality::QualityTier;

/// What produced a monitoring roll
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReportSource {
    /// A piece's monitor action
    Action {
        action_id: ActionId,
        piece_id: PieceId,
    },
    /// A squadron's disadvantaged monitoring roll alongside another task
    SquadronSecondary { piece_id: PieceId },
    /// Faction-wide passive monitoring from held influence
    Passive,
}

/// Direction of the district's weekly DC modifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModifierDirection {
    Positive,
    Neutral,
    Negative,
}

impl ModifierDirection {
    pub fn of(value: i32) -> Self {
        match value {
            v if v > 0 => ModifierDirection::Positive,
            v if v < 0 => ModifierDirection::Negative,
            _ => ModifierDirection::Neutral,
        }
    }
}

/// What the observer learned about the weekly DC modifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ModifierIntel {
    Exact { value: i32 },
    /// Direction only; may be deliberately wrong at low quality
    Direction { direction: ModifierDirection },
    Unknown,
}

/// Immutable snapshot of one faction's view of one district on one turn
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonitoringReport {
    pub report_id: ReportId,
    pub turn: u32,
    pub faction_id: FactionId,
    pub district_id: DistrictId,
    pub source: ReportSource,
    pub roll: i32,
    pub quality: QualityTier,
    /// Perceived influence per faction, phantoms included
    pub perceived_influence: BTreeMap<FactionId, i32>,
    /// Factions reported present that actually hold nothing here
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub phantom_factions: Vec<FactionId>,
    pub perceived_strongholds: BTreeMap<FactionId, bool>,
    pub modifier_intel: ModifierIntel,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub discovered_rumors: Vec<RumorId>,
    /// 1 (guesswork) to 10 (certain)
    pub confidence: u8,
}

impl MonitoringReport {
    /// Sum of all perceived influence values
    pub fn total_perceived(&self) -> i32 {
        self.perceived_influence.values().sum()
    }

    /// Faction with the highest perceived influence; ties go to the lower id
    pub fn perceived_leader(&self) -> Option<&FactionId> {
        self.perceived_influence
            .iter()
            .fold(None, |best: Option<(&FactionId, i32)>, (id, &v)| match best {
                Some((_, bv)) if bv >= v => best,
                _ => Some((id, v)),
            })
            .map(|(id, _)| id)
    }

    pub fn is_phantom(&self, faction_id: &FactionId) -> bool {
        self.phantom_factions.contains(faction_id)
    }
}

/// A faction's most recent belief about a district
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PerceivedDistrict {
    pub turn: u32,
    pub report_id: ReportId,
    pub confidence: u8,
    pub perceived_influence: BTreeMap<FactionId, i32>,
    pub perceived_strongholds: BTreeMap<FactionId, bool>,
    pub modifier_intel: ModifierIntel,
}

impl PerceivedDistrict {
    pub fn from_report(report: &MonitoringReport) -> Self {
        Self {
            turn: report.turn,
            report_id: report.report_id,
            confidence: report.confidence,
            perceived_influence: report.perceived_influence.clone(),
            perceived_strongholds: report.perceived_strongholds.clone(),
            modifier_intel: report.modifier_intel,
        }
    }

    /// Whether `other` should replace this belief: newer turns win, and
    /// within a turn the more confident report wins
    pub fn superseded_by(&self, other: &PerceivedDistrict) -> bool {
        other.turn > self.turn || (other.turn == self.turn && other.confidence > self.confidence)
    }
}

/// Per-district line of a weekly intelligence summary
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistrictIntel {
    pub district_id: DistrictId,
    pub report_count: usize,
    pub best_confidence: u8,
    pub best_quality: QualityTier,
    pub perceived_leader: Option<FactionId>,
    pub perceived_influence: BTreeMap<FactionId, i32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rumors_learned: Vec<RumorId>,
}

/// Everything a faction learned during one turn
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntelligenceSummary {
    pub faction_id: FactionId,
    pub turn: u32,
    pub districts: Vec<DistrictIntel>,
    /// Districts no report covered this turn
    pub unmonitored: Vec<DistrictId>,
}

impl IntelligenceSummary {
    pub fn rumors_learned(&self) -> usize {
        self.districts.iter().map(|d| d.rumors_learned.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_report() -> MonitoringReport {
        let mut perceived = BTreeMap::new();
        perceived.insert(FactionId::from("ironmere"), 4);
        perceived.insert(FactionId::from("saltcliff"), 4);
        perceived.insert(FactionId::from("thornwood"), 2);
        MonitoringReport {
            report_id: ReportId(1),
            turn: 3,
            faction_id: FactionId::from("thornwood"),
            district_id: DistrictId::from("docks"),
            source: ReportSource::Passive,
            roll: 17,
            quality: QualityTier::Good,
            perceived_influence: perceived,
            phantom_factions: vec![FactionId::from("saltcliff")],
            perceived_strongholds: BTreeMap::new(),
            modifier_intel: ModifierIntel::Unknown,
            discovered_rumors: Vec::new(),
            confidence: 6,
        }
    }

    #[test]
    fn test_total_and_leader() {
        let report = sample_report();
        assert_eq!(report.total_perceived(), 10);
        // Tie between ironmere and saltcliff resolves to the lower id
        assert_eq!(report.perceived_leader(), Some(&FactionId::from("ironmere")));
        assert!(report.is_phantom(&FactionId::from("saltcliff")));
    }

    #[test]
    fn test_modifier_direction() {
        assert_eq!(ModifierDirection::of(2), ModifierDirection::Positive);
        assert_eq!(ModifierDirection::of(0), ModifierDirection::Neutral);
        assert_eq!(ModifierDirection::of(-1), ModifierDirection::Negative);
    }

    #[test]
    fn test_perceived_district_supersession() {
        let report = sample_report();
        let older = PerceivedDistrict::from_report(&report);
        let mut newer = older.clone();
        newer.turn = 4;
        newer.confidence = 2;
        assert!(older.superseded_by(&newer));
        assert!(!newer.superseded_by(&older));

        let mut sharper = older.clone();
        sharper.confidence = 9;
        assert!(older.superseded_by(&sharper));
    }

    #[test]
    fn test_report_source_tagging() {
        let json = serde_json::to_string(&ReportSource::SquadronSecondary {
            piece_id: PieceId::from("sq_1"),
        })
        .unwrap();
        assert!(json.contains("\"kind\":\"squadron_secondary\""));
    }
}
