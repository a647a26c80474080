//! Conflict Components
//!
//! Turn-scoped groupings of opposing pieces awaiting adjudication.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use turf_events::{ConflictId, DistrictId, FactionId, PieceId};

use crate::error::ValidationError;

/// Which detection pass opened the conflict
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictType {
    Manual,
    Relationship,
    Target,
    Adjacent,
}

impl fmt::Display for ConflictType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ConflictType::Manual => "manual",
            ConflictType::Relationship => "relationship",
            ConflictType::Target => "target",
            ConflictType::Adjacent => "adjacent",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionStatus {
    Pending,
    Resolved,
}

/// How a piece came to be in the conflict
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Participation {
    Direct,
    /// Reinforcement from a neighbouring district
    Adjacent,
    /// Declared support from an allied faction
    AllySupport,
}

/// Per-faction result of a conflict
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParticipantOutcome {
    Win,
    Loss,
    Draw,
}

/// Overall shape of a resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionType {
    Win,
    Loss,
    Draw,
    Special,
}

impl FromStr for ResolutionType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "win" => Ok(ResolutionType::Win),
            "loss" => Ok(ResolutionType::Loss),
            "draw" => Ok(ResolutionType::Draw),
            "special" => Ok(ResolutionType::Special),
            other => Err(ValidationError::UnknownName {
                kind: "ResolutionType",
                name: other.to_string(),
            }),
        }
    }
}

/// One piece's seat in a conflict
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConflictParticipant {
    pub piece_id: PieceId,
    pub faction_id: FactionId,
    pub participation: Participation,
    #[serde(default)]
    pub outcome: Option<ParticipantOutcome>,
    #[serde(default)]
    pub conflict_penalty: i32,
}

impl ConflictParticipant {
    pub fn new(piece_id: PieceId, faction_id: FactionId, participation: Participation) -> Self {
        Self {
            piece_id,
            faction_id,
            participation,
            outcome: None,
            conflict_penalty: 0,
        }
    }
}

/// The adjudicated result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    pub resolution_type: ResolutionType,
    pub faction_outcomes: BTreeMap<FactionId, ParticipantOutcome>,
    #[serde(default)]
    pub notes: String,
}

/// A conflict in one district on one turn
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conflict {
    pub id: ConflictId,
    pub turn: u32,
    pub district_id: DistrictId,
    pub conflict_type: ConflictType,
    pub status: ResolutionStatus,
    pub participants: Vec<ConflictParticipant>,
    #[serde(default)]
    pub resolution: Option<Resolution>,
}

impl Conflict {
    pub fn new(id: ConflictId, turn: u32, district_id: DistrictId, conflict_type: ConflictType) -> Self {
        Self {
            id,
            turn,
            district_id,
            conflict_type,
            status: ResolutionStatus::Pending,
            participants: Vec::new(),
            resolution: None,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.status == ResolutionStatus::Pending
    }

    pub fn add_participant(&mut self, participant: ConflictParticipant) {
        if !self.involves_piece(&participant.piece_id) {
            self.participants.push(participant);
        }
    }

    pub fn involves_piece(&self, piece_id: &PieceId) -> bool {
        self.participants.iter().any(|p| &p.piece_id == piece_id)
    }

    pub fn involves_faction(&self, faction_id: &FactionId) -> bool {
        self.participants.iter().any(|p| &p.faction_id == faction_id)
    }

    pub fn factions(&self) -> BTreeSet<FactionId> {
        self.participants.iter().map(|p| p.faction_id.clone()).collect()
    }

    pub fn outcome_for(&self, faction_id: &FactionId) -> Option<ParticipantOutcome> {
        self.resolution
            .as_ref()
            .and_then(|r| r.faction_outcomes.get(faction_id).copied())
    }
}
