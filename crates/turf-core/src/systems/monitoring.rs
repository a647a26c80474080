//! Monitoring Systems
//!
//! Feeds monitoring rolls into the perception engine: monitor actions,
//! squadrons' secondary rolls, and passive monitoring from held influence.

use rand::Rng;
use tracing::{debug, info};

use turf_events::{MonitoringReport, ReportSource};

use crate::components::{ActionKind, PieceKind};
use crate::config::MonitoringConfig;
use crate::error::EngineResult;
use crate::store::Store;

use super::action::secondary_monitoring_roll;
use super::perception::{record_report, MonitoringInput};
use super::roll_d20;

/// Reports already filed for `turn`, across every faction
fn filed_reports(store: &dyn Store, turn: u32) -> EngineResult<Vec<MonitoringReport>> {
    let mut filed = Vec::new();
    for faction in store.factions()? {
        filed.extend(store.reports_for(&faction.id, turn)?);
    }
    Ok(filed)
}

/// Reports for this turn's rolled monitor actions, then a disadvantaged
/// secondary roll for every squadron busy with something else. A source
/// that already reported this turn is skipped.
pub fn process_monitoring<R: Rng + ?Sized>(
    store: &mut dyn Store,
    turn: u32,
    config: &MonitoringConfig,
    rng: &mut R,
) -> EngineResult<Vec<MonitoringReport>> {
    let actions = store.actions_for_turn(turn)?;
    let filed = filed_reports(store, turn)?;
    let already_filed = |source: &ReportSource| filed.iter().any(|r| &r.source == source);
    let mut reports = Vec::new();

    for action in actions
        .iter()
        .filter(|a| a.kind == ActionKind::Monitor && !a.auto_fail)
    {
        let Some(total) = action.total() else {
            continue;
        };
        let source = ReportSource::Action {
            action_id: action.id,
            piece_id: action.piece_id.clone(),
        };
        if already_filed(&source) {
            continue;
        }
        let input = MonitoringInput {
            turn,
            faction_id: action.faction_id.clone(),
            district_id: action.district_id.clone(),
            roll: total,
            source,
        };
        reports.push(record_report(store, &input, config)?);
    }

    for piece in store.pieces()? {
        if piece.kind() != PieceKind::Squadron {
            continue;
        }
        let Some(district_id) = piece.district_id.clone() else {
            continue;
        };
        let busy = actions
            .iter()
            .any(|a| a.piece_id == piece.id && a.kind != ActionKind::Monitor);
        let source = ReportSource::SquadronSecondary { piece_id: piece.id.clone() };
        if !busy || already_filed(&source) {
            continue;
        }
        let roll = secondary_monitoring_roll(&piece, rng);
        debug!(piece = %piece.id, total = roll.total, "secondary monitoring roll");
        let input = MonitoringInput {
            turn,
            faction_id: piece.faction_id.clone(),
            district_id,
            roll: roll.total,
            source,
        };
        reports.push(record_report(store, &input, config)?);
    }

    info!(turn, reports = reports.len(), "monitoring processed");
    Ok(reports)
}

/// Every faction rolls d20 + influence/2 + its monitoring bonus in each
/// district where it holds at least the passive threshold, once per turn
pub fn passive_monitoring<R: Rng + ?Sized>(
    store: &mut dyn Store,
    turn: u32,
    config: &MonitoringConfig,
    rng: &mut R,
) -> EngineResult<Vec<MonitoringReport>> {
    let districts = store.districts()?;
    let factions = store.factions()?;
    let filed = filed_reports(store, turn)?;
    let mut reports = Vec::new();

    for faction in &factions {
        for district in &districts {
            let held = district.influence_of(&faction.id);
            if held < config.passive_threshold {
                continue;
            }
            let passive_done = filed.iter().any(|r| {
                r.source == ReportSource::Passive && r.faction_id == faction.id && r.district_id == district.id
            });
            if passive_done {
                continue;
            }
            let die = roll_d20(rng, false).first().copied().unwrap_or(1);
            let input = MonitoringInput {
                turn,
                faction_id: faction.id.clone(),
                district_id: district.id.clone(),
                roll: die + held / 2 + faction.monitoring_bonus,
                source: ReportSource::Passive,
            };
            reports.push(record_report(store, &input, config)?);
        }
    }

    info!(turn, reports = reports.len(), "passive monitoring processed");
    Ok(reports)
}

/// Ease every rumor by one, never below `floor`. Returns how many changed.
pub fn update_rumor_dcs(store: &mut dyn Store, floor: i32) -> EngineResult<usize> {
    let mut changed = 0;
    for mut rumor in store.rumors()? {
        let before = rumor.discovery_dc;
        rumor.ease(floor);
        if rumor.discovery_dc != before {
            changed += 1;
            store.put_rumor(rumor)?;
        }
    }
    Ok(changed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::{
        Aptitude, Capability, District, Faction, Piece, RollSelection, SquadronProfile, Task, TaskKind,
    };
    use crate::config::{InfluenceConfig, PenaltyConfig};
    use crate::setup::ScenarioBuilder;
    use crate::store::MemoryStore;
    use crate::systems::action::{create_action_for_task, roll_for_action};
    use crate::systems::penalty::PenaltyTracker;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;
    use turf_events::{DistrictId, FactionId, PieceId, RumorId};

    fn world() -> MemoryStore {
        let scouts = SquadronProfile::new(2).with_aptitude(Aptitude::Monitoring, 3);
        let labor = Task::new(
            PieceKind::Squadron,
            TaskKind::GainInfluence,
            RollSelection::squadron(Aptitude::Labor),
            0,
        )
        .unwrap();
        ScenarioBuilder::new()
            .faction(Faction::new("thornwood", "Thornwood").with_monitoring_bonus(2))
            .faction(Faction::new("ironmere", "Ironmere"))
            .district(
                District::new("docks", "The Docks")
                    .with_influence("thornwood", 4)
                    .with_influence("ironmere", 3),
            )
            .district(District::new("market", "Market").with_influence("ironmere", 6))
            .piece(
                Piece::new("sq_watch", "Gull Watch", "thornwood", Capability::Squadron(scouts.clone()))
                    .in_district("docks")
                    .with_task(Task::monitor()),
            )
            .piece(
                Piece::new("sq_haul", "Haulers", "thornwood", Capability::Squadron(scouts.clone()))
                    .in_district("market")
                    .with_task(labor),
            )
            .piece(
                Piece::new("sq_idle", "Reserve", "ironmere", Capability::Squadron(scouts))
                    .in_district("market"),
            )
            .rumor("docks", "a ledger went missing", 20)
            .build()
            .unwrap()
    }

    fn roll_all(store: &mut MemoryStore, rng: &mut SmallRng) {
        let mut tracker = PenaltyTracker::new();
        for piece in store.pieces().unwrap() {
            if piece.task.is_some() {
                let id = create_action_for_task(store, &piece.id, &InfluenceConfig::default()).unwrap();
                roll_for_action(store, id, &mut tracker, &PenaltyConfig::default(), rng).unwrap();
            }
        }
    }

    #[test]
    fn test_monitor_and_secondary_reports() {
        let mut store = world();
        let mut rng = SmallRng::seed_from_u64(11);
        roll_all(&mut store, &mut rng);

        let reports = process_monitoring(&mut store, 1, &MonitoringConfig::default(), &mut rng).unwrap();
        assert_eq!(reports.len(), 2);
        assert!(reports.iter().any(|r| matches!(
            &r.source,
            ReportSource::Action { piece_id, .. } if piece_id.as_str() == "sq_watch"
        )));
        let secondary = reports
            .iter()
            .find(|r| matches!(r.source, ReportSource::SquadronSecondary { .. }))
            .unwrap();
        assert_eq!(secondary.district_id, DistrictId::from("market"));
        // Idle squadrons have no primary task to be distracted from
        assert!(!reports.iter().any(|r| r.faction_id == FactionId::from("ironmere")));
    }

    #[test]
    fn test_auto_failed_monitor_yields_nothing() {
        let mut store = world();
        let mut rng = SmallRng::seed_from_u64(11);
        roll_all(&mut store, &mut rng);
        let mut watch = store
            .action_for_piece(&PieceId::from("sq_watch"), 1)
            .unwrap()
            .unwrap();
        watch.auto_fail = true;
        store.put_action(watch).unwrap();

        let reports = process_monitoring(&mut store, 1, &MonitoringConfig::default(), &mut rng).unwrap();
        assert_eq!(reports.len(), 1);
    }

    #[test]
    fn test_second_pass_files_nothing_new() {
        let mut store = world();
        let mut rng = SmallRng::seed_from_u64(11);
        roll_all(&mut store, &mut rng);
        let config = MonitoringConfig::default();

        let first = process_monitoring(&mut store, 1, &config, &mut rng).unwrap();
        assert_eq!(first.len(), 2);
        let again = process_monitoring(&mut store, 1, &config, &mut rng).unwrap();
        assert!(again.is_empty());
        assert_eq!(store.reports_for(&FactionId::from("thornwood"), 1).unwrap().len(), 2);

        let passive = passive_monitoring(&mut store, 1, &config, &mut rng).unwrap();
        assert_eq!(passive.len(), 2);
        assert!(passive_monitoring(&mut store, 1, &config, &mut rng).unwrap().is_empty());
        // Passive reports sit alongside the action reports for the same district
        assert_eq!(store.reports_for(&FactionId::from("thornwood"), 1).unwrap().len(), 3);
    }

    #[test]
    fn test_passive_monitoring_threshold_and_bonus() {
        let mut store = world();
        let mut rng = SmallRng::seed_from_u64(2);
        let reports = passive_monitoring(&mut store, 1, &MonitoringConfig::default(), &mut rng).unwrap();

        // thornwood 4 in docks, ironmere 6 in market; ironmere's 3 in docks is below threshold
        assert_eq!(reports.len(), 2);
        let thorn = reports.iter().find(|r| r.faction_id.as_str() == "thornwood").unwrap();
        assert_eq!(thorn.district_id, DistrictId::from("docks"));
        assert!((5..=24).contains(&thorn.roll));
        let iron = reports.iter().find(|r| r.faction_id.as_str() == "ironmere").unwrap();
        assert!((4..=23).contains(&iron.roll));
        assert!(reports.iter().all(|r| r.source == ReportSource::Passive));
    }

    #[test]
    fn test_rumor_dcs_ease_to_floor() {
        let mut store = world();
        for _ in 0..25 {
            update_rumor_dcs(&mut store, 1).unwrap();
        }
        let rumor = store.rumors().unwrap().remove(0);
        assert_eq!(rumor.discovery_dc, 1);
        assert_eq!(update_rumor_dcs(&mut store, 1).unwrap(), 0);
        assert!(store.rumor(RumorId(999)).unwrap().is_none());
    }
}
