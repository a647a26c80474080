//! Action Components
//!
//! One action per (piece, turn). Immutable once rolled apart from the
//! conflict-derived penalty, auto-fail flag and re-evaluated outcome.

use serde::{Deserialize, Serialize};
use std::fmt;

use turf_events::{ActionId, ConflictId, DistrictId, FactionId, PieceId, QualityTier};

use super::capability::{PieceKind, RollSelection};
use super::piece::ActionKind;

/// Margin over/under the DC that makes a result critical
pub const CRITICAL_MARGIN: i32 = 10;

/// Result grade of a roll
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    CriticalSuccess,
    Success,
    Failure,
    CriticalFailure,
    /// No DC: the roll is graded by quality instead
    Quality(QualityTier),
}

impl Outcome {
    /// Grade `total` against `dc`, or by quality tier when there is none
    pub fn evaluate(total: i32, dc: Option<i32>) -> Self {
        match dc {
            None => Outcome::Quality(QualityTier::from_roll(total)),
            Some(dc) if total >= dc + CRITICAL_MARGIN => Outcome::CriticalSuccess,
            Some(dc) if total >= dc => Outcome::Success,
            Some(dc) if total <= dc - CRITICAL_MARGIN => Outcome::CriticalFailure,
            Some(_) => Outcome::Failure,
        }
    }

    pub fn is_success(self) -> bool {
        matches!(self, Outcome::CriticalSuccess | Outcome::Success)
    }

    /// Influence points an influence action moves at this grade
    pub fn influence_steps(self) -> i32 {
        match self {
            Outcome::CriticalSuccess => 2,
            Outcome::Success => 1,
            _ => 0,
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::CriticalSuccess => f.write_str("critical_success"),
            Outcome::Success => f.write_str("success"),
            Outcome::Failure => f.write_str("failure"),
            Outcome::CriticalFailure => f.write_str("critical_failure"),
            Outcome::Quality(tier) => write!(f, "{}", tier),
        }
    }
}

/// Every term that went into a roll total
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RollBreakdown {
    /// All d20s thrown; two when rolled with disadvantage
    pub dice: Vec<i32>,
    /// The die kept
    pub base: i32,
    pub bonus: i32,
    pub manual_modifier: i32,
    pub enemy_penalty: i32,
    pub conflict_penalty: i32,
    pub total: i32,
}

impl RollBreakdown {
    pub fn new(dice: Vec<i32>, bonus: i32, manual_modifier: i32) -> Self {
        let base = dice.iter().copied().min().unwrap_or(0);
        let mut roll = Self {
            dice,
            base,
            bonus,
            manual_modifier,
            enemy_penalty: 0,
            conflict_penalty: 0,
            total: 0,
        };
        roll.recompute();
        roll
    }

    pub fn with_penalties(mut self, enemy_penalty: i32, conflict_penalty: i32) -> Self {
        self.enemy_penalty = enemy_penalty;
        self.conflict_penalty = conflict_penalty;
        self.recompute();
        self
    }

    pub fn has_disadvantage(&self) -> bool {
        self.dice.len() > 1
    }

    fn recompute(&mut self) {
        self.total =
            self.base + self.bonus + self.manual_modifier - self.enemy_penalty - self.conflict_penalty;
    }
}

/// A piece's action for one turn
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Action {
    pub id: ActionId,
    pub turn: u32,
    pub piece_id: PieceId,
    pub faction_id: FactionId,
    pub district_id: DistrictId,
    pub piece_kind: PieceKind,
    pub kind: ActionKind,
    #[serde(default)]
    pub target_faction: Option<FactionId>,
    #[serde(default)]
    pub dc: Option<i32>,
    #[serde(default)]
    pub selection: RollSelection,
    #[serde(default)]
    pub manual_modifier: i32,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub roll: Option<RollBreakdown>,
    #[serde(default)]
    pub outcome: Option<Outcome>,
    #[serde(default)]
    pub conflict_id: Option<ConflictId>,
    #[serde(default)]
    pub in_conflict: bool,
    /// Set when the faction lost this action's conflict
    #[serde(default)]
    pub auto_fail: bool,
    #[serde(default)]
    pub conflict_penalty: i32,
    /// Effects applied during action resolution
    #[serde(default)]
    pub resolved: bool,
}

impl Action {
    pub fn is_rolled(&self) -> bool {
        self.roll.is_some()
    }

    pub fn total(&self) -> Option<i32> {
        self.roll.as_ref().map(|r| r.total)
    }

    pub fn link_conflict(&mut self, conflict_id: ConflictId) {
        self.conflict_id = Some(conflict_id);
        self.in_conflict = true;
    }

    /// Store a roll and grade it
    pub fn record_roll(&mut self, roll: RollBreakdown) {
        self.outcome = Some(Outcome::evaluate(roll.total, self.dc));
        self.roll = Some(roll);
    }

    /// Apply a conflict draw penalty; a stored roll is re-totalled and re-graded
    pub fn apply_conflict_penalty(&mut self, penalty: i32) {
        self.conflict_penalty = penalty;
        if let Some(roll) = self.roll.take() {
            let enemy = roll.enemy_penalty;
            self.record_roll(roll.with_penalties(enemy, penalty));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_boundaries_are_exact() {
        let dc = 11;
        assert_eq!(Outcome::evaluate(dc + 10, Some(dc)), Outcome::CriticalSuccess);
        assert_eq!(Outcome::evaluate(dc + 9, Some(dc)), Outcome::Success);
        assert_eq!(Outcome::evaluate(dc, Some(dc)), Outcome::Success);
        assert_eq!(Outcome::evaluate(dc - 1, Some(dc)), Outcome::Failure);
        assert_eq!(Outcome::evaluate(dc - 9, Some(dc)), Outcome::Failure);
        assert_eq!(Outcome::evaluate(dc - 10, Some(dc)), Outcome::CriticalFailure);
    }

    #[test]
    fn test_outcome_without_dc_is_quality() {
        assert_eq!(
            Outcome::evaluate(22, None),
            Outcome::Quality(QualityTier::VeryGood)
        );
        assert_eq!(Outcome::Quality(QualityTier::Poor).to_string(), "poor");
    }

    #[test]
    fn test_roll_breakdown_totals() {
        let roll = RollBreakdown::new(vec![14], 5, 2).with_penalties(6, 0);
        assert_eq!(roll.total, 14 + 5 + 2 - 6);
        assert!(!roll.has_disadvantage());

        let disadvantaged = RollBreakdown::new(vec![17, 6], 1, 0);
        assert_eq!(disadvantaged.base, 6);
        assert_eq!(disadvantaged.total, 7);
        assert!(disadvantaged.has_disadvantage());
    }

    #[test]
    fn test_influence_steps() {
        assert_eq!(Outcome::CriticalSuccess.influence_steps(), 2);
        assert_eq!(Outcome::Success.influence_steps(), 1);
        assert_eq!(Outcome::CriticalFailure.influence_steps(), 0);
    }
}
