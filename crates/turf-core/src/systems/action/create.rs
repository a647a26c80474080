//! Action Creation
//!
//! Validates requests and materialises one action per (piece, turn).
//! Nothing is written unless every check passes.

use tracing::debug;

use turf_events::{ActionId, FactionId, PieceId};

use crate::components::{
    validate_task_fields, Action, ActionKind, Aptitude, Attribute, District, Piece, PieceKind,
    RollSelection, Skill, Task, TaskKind,
};
use crate::config::InfluenceConfig;
use crate::error::{EngineError, EngineResult, StateError, ValidationError};
use crate::store::Store;
use crate::systems::influence::calculate_control_dc;
use crate::systems::relationship::RelationshipLedger;

/// Loosely typed action request, as it arrives from a UI or script
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActionParams {
    pub piece_id: String,
    pub piece_type: String,
    pub action_type: String,
    pub target_faction: Option<String>,
    pub dc: Option<i32>,
    pub attribute: Option<String>,
    pub skill: Option<String>,
    pub aptitude: Option<String>,
    pub manual_modifier: i32,
    pub description: Option<String>,
}

impl ActionParams {
    pub fn new(piece_id: impl Into<String>, piece_type: impl Into<String>, action_type: impl Into<String>) -> Self {
        Self {
            piece_id: piece_id.into(),
            piece_type: piece_type.into(),
            action_type: action_type.into(),
            ..Default::default()
        }
    }

    pub fn with_target(mut self, faction: impl Into<String>) -> Self {
        self.target_faction = Some(faction.into());
        self
    }

    pub fn with_dc(mut self, dc: i32) -> Self {
        self.dc = Some(dc);
        self
    }

    pub fn with_agent_stats(mut self, attribute: impl Into<String>, skill: impl Into<String>) -> Self {
        self.attribute = Some(attribute.into());
        self.skill = Some(skill.into());
        self
    }

    pub fn with_aptitude(mut self, aptitude: impl Into<String>) -> Self {
        self.aptitude = Some(aptitude.into());
        self
    }

    pub fn with_modifier(mut self, modifier: i32) -> Self {
        self.manual_modifier = modifier;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Typed form of a request, after parsing
#[derive(Debug, Clone)]
struct ActionDraft {
    kind: ActionKind,
    target: Option<FactionId>,
    fixed_dc: Option<i32>,
    selection: RollSelection,
    manual_modifier: i32,
    description: Option<String>,
}

impl ActionDraft {
    fn from_task(task: &Task) -> Self {
        Self {
            kind: task.kind.action_kind(),
            target: task.kind.target().cloned(),
            fixed_dc: task.kind.fixed_dc(),
            selection: task.selection,
            manual_modifier: task.manual_modifier,
            description: task.kind.description().map(str::to_string),
        }
    }
}

fn parse_optional<T: std::str::FromStr<Err = ValidationError>>(
    value: &Option<String>,
) -> Result<Option<T>, ValidationError> {
    value.as_deref().map(|v| v.parse::<T>()).transpose()
}

fn parse_params(params: &ActionParams) -> Result<(PieceKind, ActionDraft), ValidationError> {
    let piece_kind: PieceKind = params.piece_type.parse()?;
    let kind: ActionKind = params.action_type.parse()?;
    let selection = RollSelection {
        attribute: parse_optional::<Attribute>(&params.attribute)?,
        skill: parse_optional::<Skill>(&params.skill)?,
        aptitude: parse_optional::<Aptitude>(&params.aptitude)?,
    };
    validate_task_fields(piece_kind, kind, &selection, params.manual_modifier)?;

    let target = params
        .target_faction
        .as_deref()
        .filter(|t| !t.is_empty())
        .map(FactionId::from);
    if kind.requires_target() && target.is_none() {
        return Err(ValidationError::MissingTarget(kind));
    }

    let fixed_dc = match kind {
        ActionKind::Freeform | ActionKind::InitiateConflict => params.dc,
        _ => None,
    };

    Ok((
        piece_kind,
        ActionDraft {
            kind,
            target: if kind.requires_target() { target } else { None },
            fixed_dc,
            selection,
            manual_modifier: params.manual_modifier,
            description: params.description.clone(),
        },
    ))
}

pub(crate) fn load_piece(store: &dyn Store, piece_id: &PieceId) -> EngineResult<Piece> {
    store
        .piece(piece_id)?
        .ok_or_else(|| EngineError::not_found("piece", piece_id))
}

fn require_assignable(store: &dyn Store) -> EngineResult<u32> {
    let state = store.turn_state()?;
    if !state.phase.accepts_assignments() {
        return Err(StateError::WrongPhase {
            expected: turf_events::TurnPhase::Assignment,
            actual: state.phase,
        }
        .into());
    }
    Ok(state.turn)
}

fn draft_dc(
    store: &dyn Store,
    district: &District,
    piece: &Piece,
    draft: &ActionDraft,
    config: &InfluenceConfig,
) -> EngineResult<Option<i32>> {
    Ok(match draft.kind {
        ActionKind::Monitor => None,
        ActionKind::GainInfluence => Some(calculate_control_dc(district, &piece.faction_id, None, config)),
        ActionKind::TakeInfluence => {
            let ledger = RelationshipLedger::load(store)?;
            let relationship = draft
                .target
                .as_ref()
                .map(|target| ledger.relationship(&piece.faction_id, target));
            Some(calculate_control_dc(district, &piece.faction_id, relationship, config))
        }
        ActionKind::Freeform | ActionKind::InitiateConflict => draft.fixed_dc,
    })
}

fn materialise(
    store: &mut dyn Store,
    piece: &Piece,
    draft: ActionDraft,
    turn: u32,
    config: &InfluenceConfig,
) -> EngineResult<ActionId> {
    let district_id = piece
        .district_id
        .clone()
        .ok_or_else(|| ValidationError::Unassigned(piece.id.to_string()))?;
    let district = store
        .district(&district_id)?
        .ok_or_else(|| EngineError::not_found("district", &district_id))?;
    if let Some(target) = &draft.target {
        if store.faction(target)?.is_none() {
            return Err(EngineError::not_found("faction", target));
        }
        if target == &piece.faction_id {
            return Err(ValidationError::Rejected(format!("{} cannot target itself", target)).into());
        }
    }

    let previous = store.action_for_piece(&piece.id, turn)?;
    if let Some(previous) = &previous {
        if previous.is_rolled() {
            return Err(ValidationError::AlreadyRolled(previous.id.to_string()).into());
        }
    }

    let selection = if draft.kind == ActionKind::Monitor {
        draft.selection.or(district.preferred_monitor)
    } else {
        draft.selection
    };
    let dc = draft_dc(store, &district, piece, &draft, config)?;

    let id = ActionId(store.next_id()?);
    let mut action = Action {
        id,
        turn,
        piece_id: piece.id.clone(),
        faction_id: piece.faction_id.clone(),
        district_id,
        piece_kind: piece.kind(),
        kind: draft.kind,
        target_faction: draft.target,
        dc,
        selection,
        manual_modifier: draft.manual_modifier,
        description: draft.description,
        roll: None,
        outcome: None,
        conflict_id: None,
        in_conflict: false,
        auto_fail: false,
        conflict_penalty: 0,
        resolved: false,
    };

    if let Some(previous) = previous {
        // A replaced assignment keeps its conflict seat
        if let Some(conflict_id) = previous.conflict_id {
            action.link_conflict(conflict_id);
            action.conflict_penalty = previous.conflict_penalty;
            action.auto_fail = previous.auto_fail;
        }
        store.delete_action(previous.id)?;
        debug!(piece = %piece.id, replaced = %previous.id, "assignment replaced");
    }

    debug!(action_id = %id, piece = %piece.id, kind = %action.kind, dc = ?action.dc, "action created");
    store.put_action(action)?;
    Ok(id)
}

/// Create an action from loosely typed parameters
pub fn create_action(
    store: &mut dyn Store,
    params: &ActionParams,
    config: &InfluenceConfig,
) -> EngineResult<ActionId> {
    let (piece_kind, draft) = parse_params(params)?;
    let turn = require_assignable(store)?;
    let piece = load_piece(store, &PieceId::from(params.piece_id.as_str()))?;
    if piece.kind() != piece_kind {
        return Err(ValidationError::PieceKindMismatch {
            expected: piece.kind().to_string(),
            got: piece_kind.to_string(),
        }
        .into());
    }
    materialise(store, &piece, draft, turn, config)
}

/// Create the action for a piece's current task
pub fn create_action_for_task(
    store: &mut dyn Store,
    piece_id: &PieceId,
    config: &InfluenceConfig,
) -> EngineResult<ActionId> {
    let turn = require_assignable(store)?;
    let piece = load_piece(store, piece_id)?;
    let task = piece
        .task
        .as_ref()
        .ok_or_else(|| ValidationError::Rejected(format!("piece {} has no task", piece.id)))?;
    validate_task_fields(piece.kind(), task.kind.action_kind(), &task.selection, task.manual_modifier)?;
    let draft = ActionDraft::from_task(task);
    materialise(store, &piece, draft, turn, config)
}

/// Give a piece a task for the coming assignment phase
pub fn assign_task(store: &mut dyn Store, piece_id: &PieceId, task: Task) -> EngineResult<()> {
    require_assignable(store)?;
    let mut piece = load_piece(store, piece_id)?;
    validate_task_fields(piece.kind(), task.kind.action_kind(), &task.selection, task.manual_modifier)?;
    if piece.district_id.is_none() {
        return Err(ValidationError::Unassigned(piece.id.to_string()).into());
    }
    if let Some(target) = task.kind.target() {
        if store.faction(target)?.is_none() {
            return Err(EngineError::not_found("faction", target));
        }
    }
    if let TaskKind::Freeform { dc, .. } | TaskKind::InitiateConflict { dc, .. } = &task.kind {
        if *dc < 1 {
            return Err(ValidationError::OutOfRange {
                field: "dc",
                value: *dc,
                min: 1,
                max: i32::MAX,
            }
            .into());
        }
    }
    piece.task = Some(task);
    store.put_piece(piece)?;
    Ok(())
}

pub fn clear_task(store: &mut dyn Store, piece_id: &PieceId) -> EngineResult<()> {
    let mut piece = load_piece(store, piece_id)?;
    piece.task = None;
    store.put_piece(piece)?;
    Ok(())
}
