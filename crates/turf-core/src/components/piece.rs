//! Piece Components
//!
//! Agents and squadrons, and the task a faction assigns them for the turn.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use turf_events::{DistrictId, FactionId, PieceId};

use super::capability::{Capability, PieceKind, RollSelection, RollSource};
use crate::error::ValidationError;

/// Manual modifier bounds
pub const MANUAL_MODIFIER_MIN: i32 = -10;
pub const MANUAL_MODIFIER_MAX: i32 = 10;

/// What an action tries to do
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Monitor,
    GainInfluence,
    TakeInfluence,
    Freeform,
    InitiateConflict,
}

impl ActionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ActionKind::Monitor => "monitor",
            ActionKind::GainInfluence => "gain_influence",
            ActionKind::TakeInfluence => "take_influence",
            ActionKind::Freeform => "freeform",
            ActionKind::InitiateConflict => "initiate_conflict",
        }
    }

    /// Whether the action names a target faction
    pub fn requires_target(self) -> bool {
        matches!(self, ActionKind::TakeInfluence | ActionKind::InitiateConflict)
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActionKind {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "monitor" => Ok(ActionKind::Monitor),
            "gain_influence" => Ok(ActionKind::GainInfluence),
            "take_influence" => Ok(ActionKind::TakeInfluence),
            "freeform" => Ok(ActionKind::Freeform),
            "initiate_conflict" => Ok(ActionKind::InitiateConflict),
            other => Err(ValidationError::UnknownName {
                kind: "ActionKind",
                name: other.to_string(),
            }),
        }
    }
}

/// Task payload, one variant per action kind
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TaskKind {
    Monitor,
    GainInfluence,
    TakeInfluence {
        target: FactionId,
    },
    Freeform {
        dc: i32,
        description: String,
    },
    InitiateConflict {
        target: FactionId,
        dc: i32,
        description: String,
    },
}

impl TaskKind {
    pub fn action_kind(&self) -> ActionKind {
        match self {
            TaskKind::Monitor => ActionKind::Monitor,
            TaskKind::GainInfluence => ActionKind::GainInfluence,
            TaskKind::TakeInfluence { .. } => ActionKind::TakeInfluence,
            TaskKind::Freeform { .. } => ActionKind::Freeform,
            TaskKind::InitiateConflict { .. } => ActionKind::InitiateConflict,
        }
    }

    pub fn target(&self) -> Option<&FactionId> {
        match self {
            TaskKind::TakeInfluence { target } | TaskKind::InitiateConflict { target, .. } => {
                Some(target)
            }
            _ => None,
        }
    }

    /// Author-supplied DC; influence tasks derive theirs from the district
    pub fn fixed_dc(&self) -> Option<i32> {
        match self {
            TaskKind::Freeform { dc, .. } | TaskKind::InitiateConflict { dc, .. } => Some(*dc),
            _ => None,
        }
    }

    pub fn description(&self) -> Option<&str> {
        match self {
            TaskKind::Freeform { description, .. }
            | TaskKind::InitiateConflict { description, .. } => Some(description),
            _ => None,
        }
    }
}

/// A validated task for one piece
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub kind: TaskKind,
    #[serde(default)]
    pub selection: RollSelection,
    #[serde(default)]
    pub manual_modifier: i32,
}

impl Task {
    /// Build a task for a piece of `piece_kind`, checking every field up front
    pub fn new(
        piece_kind: PieceKind,
        kind: TaskKind,
        selection: RollSelection,
        manual_modifier: i32,
    ) -> Result<Self, ValidationError> {
        validate_task_fields(piece_kind, kind.action_kind(), &selection, manual_modifier)?;
        if let Some(target) = kind.target() {
            if target.as_str().is_empty() {
                return Err(ValidationError::MissingTarget(kind.action_kind()));
            }
        }
        Ok(Self {
            kind,
            selection,
            manual_modifier,
        })
    }

    pub fn monitor() -> Self {
        Self {
            kind: TaskKind::Monitor,
            selection: RollSelection::default(),
            manual_modifier: 0,
        }
    }
}

/// Checks shared by tasks and actions
pub fn validate_task_fields(
    piece_kind: PieceKind,
    action_kind: ActionKind,
    selection: &RollSelection,
    manual_modifier: i32,
) -> Result<(), ValidationError> {
    if !(MANUAL_MODIFIER_MIN..=MANUAL_MODIFIER_MAX).contains(&manual_modifier) {
        return Err(ValidationError::ModifierOutOfRange(manual_modifier));
    }
    if action_kind != ActionKind::Monitor && !selection.complete_for(piece_kind) {
        return Err(match piece_kind {
            PieceKind::Agent => ValidationError::MissingAttributeOrSkill(action_kind),
            PieceKind::Squadron => ValidationError::MissingAptitude(action_kind),
        });
    }
    Ok(())
}

/// An agent or squadron owned by a faction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Piece {
    pub id: PieceId,
    pub name: String,
    pub faction_id: FactionId,
    #[serde(default)]
    pub district_id: Option<DistrictId>,
    #[serde(default)]
    pub task: Option<Task>,
    pub capability: Capability,
}

impl Piece {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        faction_id: impl Into<String>,
        capability: Capability,
    ) -> Self {
        Self {
            id: PieceId(id.into()),
            name: name.into(),
            faction_id: FactionId(faction_id.into()),
            district_id: None,
            task: None,
            capability,
        }
    }

    pub fn in_district(mut self, district_id: impl Into<String>) -> Self {
        self.district_id = Some(DistrictId(district_id.into()));
        self
    }

    pub fn with_task(mut self, task: Task) -> Self {
        self.task = Some(task);
        self
    }

    pub fn kind(&self) -> PieceKind {
        self.capability.kind()
    }

    pub fn mobility(&self) -> i32 {
        self.capability.mobility()
    }

    pub fn is_in(&self, district_id: &DistrictId) -> bool {
        self.district_id.as_ref() == Some(district_id)
    }
}
