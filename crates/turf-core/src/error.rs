//! Engine Errors
//!
//! Validation problems are rejected before any write, missing entities are
//! distinguishable from store failures, and state conflicts are reported as
//! values rather than panics.

use thiserror::Error;

use turf_events::TurnPhase;

use crate::components::ActionKind;
use crate::store::StoreError;

/// Malformed input; the caller must fix it and retry
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("unknown {kind} '{name}'")]
    UnknownName { kind: &'static str, name: String },
    #[error("manual modifier {0} outside -10..=10")]
    ModifierOutOfRange(i32),
    #[error("agent {0} actions need an attribute and a skill")]
    MissingAttributeOrSkill(ActionKind),
    #[error("squadron {0} actions need an aptitude")]
    MissingAptitude(ActionKind),
    #[error("{0} actions need a target faction")]
    MissingTarget(ActionKind),
    #[error("piece type does not match piece: expected {expected}, got {got}")]
    PieceKindMismatch { expected: String, got: String },
    #[error("piece {0} is not assigned to a district")]
    Unassigned(String),
    #[error("action {0} has already been rolled and cannot be replaced")]
    AlreadyRolled(String),
    #[error("influence amount must be positive, got {0}")]
    NonPositiveAmount(i32),
    #[error("{value} outside {min}..={max} for {field}")]
    OutOfRange {
        field: &'static str,
        value: i32,
        min: i32,
        max: i32,
    },
    #[error("faction {0} does not take part in this conflict")]
    NotAParticipant(String),
    #[error("faction {0} assigned more than one conflict outcome")]
    DuplicateOutcome(String),
    #[error("a {0} resolution is inconsistent with the assigned outcomes")]
    InconsistentResolution(&'static str),
    #[error("{0}")]
    Rejected(String),
}

/// The operation is not allowed in the current turn state
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StateError {
    #[error("operation requires phase {expected}, current phase is {actual}")]
    WrongPhase {
        expected: TurnPhase,
        actual: TurnPhase,
    },
    #[error("conflict {0} is no longer pending")]
    ConflictClosed(String),
    #[error("{0} conflict(s) still await resolution")]
    GateClosed(usize),
    #[error("influence operation refused: {0}")]
    Influence(String),
}

/// Top-level error for engine operations
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },
    #[error(transparent)]
    State(#[from] StateError),
    #[error("store failure: {0}")]
    Store(#[from] StoreError),
}

impl EngineError {
    pub fn not_found(kind: &'static str, id: impl ToString) -> Self {
        EngineError::NotFound {
            kind,
            id: id.to_string(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, EngineError::NotFound { .. })
    }

    /// Whether the enclosing phase must be rolled back
    pub fn is_fatal(&self) -> bool {
        matches!(self, EngineError::Store(_))
    }
}

pub type EngineResult<T> = Result<T, EngineError>;
