//! Turn flow tests
//!
//! Whole turns over the sample city: the conflict gate, automatic draws,
//! the influence pool invariant and the JSONL history mirror.

use std::fs;

use turf_core::events::HistoryLogger;
use turf_core::setup::sample_world;
use turf_core::systems::ResolutionRequest;
use turf_core::{
    EngineConfig, GateStatus, ParticipantOutcome, ResolutionType, Store, TurnCoordinator, TurnOutcome,
    INFLUENCE_CAPACITY,
};
use turf_events::{fixtures, FactionId, TurnLogEntry, TurnPhase, TurnState};

fn coordinator(seed: u64) -> TurnCoordinator<turf_core::MemoryStore> {
    TurnCoordinator::new(sample_world().unwrap(), EngineConfig::default(), seed)
}

fn assert_pools_hold(store: &dyn Store) {
    for district in store.districts().unwrap() {
        assert!(district.is_consistent(), "{} is inconsistent", district.id);
        assert_eq!(
            district.total_influence() + district.influence_pool,
            INFLUENCE_CAPACITY,
            "{} leaks influence",
            district.id
        );
        assert!(district.faction_influence.values().all(|v| *v >= 0));
    }
}

/// Several automatically resolved turns keep every district's books balanced
#[test]
fn test_auto_resolved_turns_keep_pool_invariant() {
    let mut coordinator = coordinator(42);
    for expected_turn in 1..=4 {
        assert_eq!(coordinator.turn_state().unwrap().turn, expected_turn);
        let outcome = coordinator.run_turn(true).unwrap();
        assert!(matches!(outcome, TurnOutcome::Completed(_)));
        assert_pools_hold(coordinator.store());
    }
    assert_eq!(coordinator.turn_state().unwrap(), TurnState::new(5, TurnPhase::Preparation));

    // Every conflict ever opened was settled before its turn moved on
    let store = coordinator.store();
    for turn in 1..=4 {
        assert!(store.conflicts_for_turn(turn).unwrap().iter().all(|c| !c.is_pending()));
    }
}

/// Brannoc's standing order opens a manual conflict that blocks the gate
#[test]
fn test_manual_conflict_holds_gate_until_ruled() {
    let mut coordinator = coordinator(9);
    let first = coordinator.process_turn_part1().unwrap();
    assert!(!first.pending_conflicts.is_empty());

    let GateStatus::ConflictsPending(pending) = coordinator.check_gate().unwrap() else {
        panic!("gate should be closed");
    };
    assert_eq!(pending, first.pending_conflicts);
    assert!(matches!(
        coordinator.process_turn_part2().unwrap(),
        TurnOutcome::ConflictsPending { .. }
    ));

    for conflict_id in pending {
        let conflict = coordinator.store().conflict(conflict_id).unwrap().unwrap();
        let sides: Vec<String> = conflict.factions().iter().map(|f| f.to_string()).collect();
        let (winner, losers) = sides.split_first().unwrap();
        let losers: Vec<&str> = losers.iter().map(String::as_str).collect();
        let request = ResolutionRequest::new(ResolutionType::Win)
            .with_winners(&[winner.as_str()])
            .with_losers(&losers)
            .with_notes("ruled at the table");
        coordinator.resolve_conflict(conflict_id, &request).unwrap();
    }

    assert_eq!(coordinator.check_gate().unwrap(), GateStatus::Open);
    let TurnOutcome::Completed(second) = coordinator.process_turn_part2().unwrap() else {
        panic!("gate should be open");
    };
    assert_eq!(second.phases.first().unwrap().phase, TurnPhase::ManualConflictResolution);
    assert_eq!(second.phases.last().unwrap().phase, TurnPhase::TurnCompletion);
    assert_pools_hold(coordinator.store());

    // Losers' actions were failed rather than applied
    let store = coordinator.store();
    for conflict in store.conflicts_for_turn(1).unwrap() {
        for participant in &conflict.participants {
            if conflict.outcome_for(&participant.faction_id) != Some(ParticipantOutcome::Loss) {
                continue;
            }
            if let Some(action) = store.action_for_piece(&participant.piece_id, 1).unwrap() {
                assert!(action.auto_fail);
                assert!(action.resolved);
            }
        }
    }
}

/// Committed history is mirrored line for line to the JSONL file
#[test]
fn test_history_mirrored_to_jsonl() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("history.jsonl");

    let logger = HistoryLogger::new(&path).unwrap();
    let mut coordinator = coordinator(5).with_logger(logger);
    coordinator.run_turn(true).unwrap();
    coordinator.run_turn(true).unwrap();
    let store = coordinator.into_store();

    let content = fs::read_to_string(&path).unwrap();
    let mirrored: Vec<TurnLogEntry> = content
        .lines()
        .map(|line| TurnLogEntry::from_jsonl(line).unwrap())
        .collect();
    assert_eq!(mirrored, store.history().unwrap());
    assert!(mirrored.iter().any(|e| e.turn == 2 && e.phase == TurnPhase::TurnCompletion));
}

/// A failed write during monitoring leaves no trace; rerunning finishes the turn
#[test]
fn test_store_failure_mid_turn_is_resumable() {
    let mut coordinator = coordinator(21);
    coordinator.run_turn(true).unwrap();
    coordinator.process_turn_part1().unwrap();
    let pending = coordinator.store().conflicts_for_turn(2).unwrap();
    for conflict in pending.iter().filter(|c| c.is_pending()) {
        coordinator
            .resolve_conflict(conflict.id, &ResolutionRequest::draw_all(conflict))
            .unwrap();
    }

    while coordinator.turn_state().unwrap().phase != TurnPhase::Monitoring {
        coordinator.run_phase().unwrap();
    }
    let before = coordinator.store().data().clone();
    coordinator.store_mut().fail_after_writes(2);
    assert!(coordinator.run_phase().unwrap_err().is_fatal());
    assert_eq!(coordinator.store().data(), &before);

    coordinator.store_mut().clear_write_failures();
    let TurnOutcome::Completed(rest) = coordinator.process_turn_part2().unwrap() else {
        panic!("already past the gate");
    };
    assert_eq!(rest.phases[0].phase, TurnPhase::Monitoring);
    assert_eq!(coordinator.turn_state().unwrap(), TurnState::new(3, TurnPhase::Preparation));
    assert!(!coordinator
        .store()
        .reports_for(&FactionId::from("thornwood"), 2)
        .unwrap()
        .is_empty());
}

/// The shared fixture history survives a trip through the logger
#[test]
fn test_fixture_history_through_logger() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("fixture.jsonl");
    let history = fixtures::sample_history();
    {
        let mut logger = HistoryLogger::new(&path).unwrap();
        logger.log_batch(&history).unwrap();
        assert_eq!(logger.entry_count(), history.len() as u64);
    }
    let parsed: Vec<TurnLogEntry> = fs::read_to_string(&path)
        .unwrap()
        .lines()
        .map(|line| TurnLogEntry::from_jsonl(line).unwrap())
        .collect();
    assert_eq!(parsed, history);
}
