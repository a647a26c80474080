//! Turn Phases
//!
//! The ordered phases of a turn and the persisted turn cursor.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One phase of the turn state machine, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnPhase {
    Preparation,
    InfluenceDecay,
    Assignment,
    ConflictDetection,
    ActionRoll,
    /// Human-gated: blocks until every conflict of the turn is resolved
    ManualConflictResolution,
    ActionResolution,
    RandomWalkUpdate,
    Monitoring,
    FactionPassiveMonitoring,
    RumorDcUpdate,
    /// Rendering is external; the engine only passes through
    MapUpdate,
    TurnCompletion,
}

impl TurnPhase {
    /// All phases in execution order
    pub const ALL: [TurnPhase; 13] = [
        TurnPhase::Preparation,
        TurnPhase::InfluenceDecay,
        TurnPhase::Assignment,
        TurnPhase::ConflictDetection,
        TurnPhase::ActionRoll,
        TurnPhase::ManualConflictResolution,
        TurnPhase::ActionResolution,
        TurnPhase::RandomWalkUpdate,
        TurnPhase::Monitoring,
        TurnPhase::FactionPassiveMonitoring,
        TurnPhase::RumorDcUpdate,
        TurnPhase::MapUpdate,
        TurnPhase::TurnCompletion,
    ];

    /// Phases run by the first half of a turn, before the gate
    pub const PART_ONE: [TurnPhase; 5] = [
        TurnPhase::Preparation,
        TurnPhase::InfluenceDecay,
        TurnPhase::Assignment,
        TurnPhase::ConflictDetection,
        TurnPhase::ActionRoll,
    ];

    /// Phases run by the second half of a turn, after the gate
    pub const PART_TWO: [TurnPhase; 7] = [
        TurnPhase::ActionResolution,
        TurnPhase::RandomWalkUpdate,
        TurnPhase::Monitoring,
        TurnPhase::FactionPassiveMonitoring,
        TurnPhase::RumorDcUpdate,
        TurnPhase::MapUpdate,
        TurnPhase::TurnCompletion,
    ];

    /// The phase that follows this one; turn completion wraps to preparation
    pub fn next(self) -> TurnPhase {
        let idx = Self::ALL.iter().position(|p| *p == self).unwrap_or(0);
        Self::ALL[(idx + 1) % Self::ALL.len()]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TurnPhase::Preparation => "preparation",
            TurnPhase::InfluenceDecay => "influence_decay",
            TurnPhase::Assignment => "assignment",
            TurnPhase::ConflictDetection => "conflict_detection",
            TurnPhase::ActionRoll => "action_roll",
            TurnPhase::ManualConflictResolution => "manual_conflict_resolution",
            TurnPhase::ActionResolution => "action_resolution",
            TurnPhase::RandomWalkUpdate => "random_walk_update",
            TurnPhase::Monitoring => "monitoring",
            TurnPhase::FactionPassiveMonitoring => "faction_passive_monitoring",
            TurnPhase::RumorDcUpdate => "rumor_dc_update",
            TurnPhase::MapUpdate => "map_update",
            TurnPhase::TurnCompletion => "turn_completion",
        }
    }

    /// Whether pieces may still receive new actions for the current turn
    pub fn accepts_assignments(self) -> bool {
        matches!(
            self,
            TurnPhase::Preparation | TurnPhase::InfluenceDecay | TurnPhase::Assignment
        )
    }
}

impl fmt::Display for TurnPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Persisted cursor: which turn we are on and where in it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnState {
    pub turn: u32,
    pub phase: TurnPhase,
}

impl TurnState {
    pub fn new(turn: u32, phase: TurnPhase) -> Self {
        Self { turn, phase }
    }
}

impl Default for TurnState {
    fn default() -> Self {
        Self {
            turn: 1,
            phase: TurnPhase::Preparation,
        }
    }
}
