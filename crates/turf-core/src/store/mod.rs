//! Persistence Interface
//!
//! The engine reads and writes every entity through [`Store`]. Storage is an
//! external collaborator: any keyed, transactional store that keeps
//! referential integrity will do. [`MemoryStore`] is the reference
//! implementation used by the CLI and the tests.

pub mod memory;

pub use memory::{MemoryStore, StoreData};

use thiserror::Error;

use turf_events::{
    ActionId, ConflictId, DistrictId, FactionId, MonitoringReport, PieceId, RumorId, TurnLogEntry,
    TurnState,
};

use crate::components::{Action, Conflict, District, Faction, Piece, Rumor};

/// Failure of the underlying store; aborts the enclosing phase
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("no transaction is open")]
    NoTransaction,
    #[error("a transaction is already open")]
    TransactionOpen,
    #[error("referential integrity violated: {0}")]
    Integrity(String),
    #[error("serialization failed: {0}")]
    Serialization(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Keyed entity store consumed by the engine
pub trait Store {
    fn begin(&mut self) -> StoreResult<()>;
    fn commit(&mut self) -> StoreResult<()>;
    fn rollback(&mut self) -> StoreResult<()>;

    /// Monotonic id shared by every engine-created record
    fn next_id(&mut self) -> StoreResult<u64>;

    fn turn_state(&self) -> StoreResult<TurnState>;
    fn set_turn_state(&mut self, state: TurnState) -> StoreResult<()>;

    fn district(&self, id: &DistrictId) -> StoreResult<Option<District>>;
    fn districts(&self) -> StoreResult<Vec<District>>;
    fn put_district(&mut self, district: District) -> StoreResult<()>;

    fn faction(&self, id: &FactionId) -> StoreResult<Option<Faction>>;
    fn factions(&self) -> StoreResult<Vec<Faction>>;
    fn put_faction(&mut self, faction: Faction) -> StoreResult<()>;

    fn piece(&self, id: &PieceId) -> StoreResult<Option<Piece>>;
    fn pieces(&self) -> StoreResult<Vec<Piece>>;
    fn put_piece(&mut self, piece: Piece) -> StoreResult<()>;

    fn pieces_in_district(&self, district_id: &DistrictId) -> StoreResult<Vec<Piece>> {
        Ok(self
            .pieces()?
            .into_iter()
            .filter(|p| p.is_in(district_id))
            .collect())
    }

    fn pieces_of_faction(&self, faction_id: &FactionId) -> StoreResult<Vec<Piece>> {
        Ok(self
            .pieces()?
            .into_iter()
            .filter(|p| &p.faction_id == faction_id)
            .collect())
    }

    fn action(&self, id: ActionId) -> StoreResult<Option<Action>>;
    fn actions_for_turn(&self, turn: u32) -> StoreResult<Vec<Action>>;
    fn put_action(&mut self, action: Action) -> StoreResult<()>;
    fn delete_action(&mut self, id: ActionId) -> StoreResult<()>;

    fn action_for_piece(&self, piece_id: &PieceId, turn: u32) -> StoreResult<Option<Action>> {
        Ok(self
            .actions_for_turn(turn)?
            .into_iter()
            .find(|a| &a.piece_id == piece_id))
    }

    fn conflict(&self, id: ConflictId) -> StoreResult<Option<Conflict>>;
    fn conflicts_for_turn(&self, turn: u32) -> StoreResult<Vec<Conflict>>;
    fn put_conflict(&mut self, conflict: Conflict) -> StoreResult<()>;

    fn rumor(&self, id: RumorId) -> StoreResult<Option<Rumor>>;
    fn rumors(&self) -> StoreResult<Vec<Rumor>>;
    fn put_rumor(&mut self, rumor: Rumor) -> StoreResult<()>;

    fn rumors_in_district(&self, district_id: &DistrictId) -> StoreResult<Vec<Rumor>> {
        Ok(self
            .rumors()?
            .into_iter()
            .filter(|r| &r.district_id == district_id)
            .collect())
    }

    /// Reports are write-once; re-appending an id is an integrity error
    fn append_report(&mut self, report: MonitoringReport) -> StoreResult<()>;
    fn reports_for(&self, faction_id: &FactionId, turn: u32) -> StoreResult<Vec<MonitoringReport>>;

    fn append_history(&mut self, entry: TurnLogEntry) -> StoreResult<()>;
    fn history(&self) -> StoreResult<Vec<TurnLogEntry>>;
}
