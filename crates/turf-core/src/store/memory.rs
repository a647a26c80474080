//! In-Memory Store
//!
//! Reference [`Store`] backed by ordered maps. Transactions snapshot the
//! whole dataset on `begin` and restore it on `rollback`. A write budget
//! can be set to simulate the backing store going away mid-phase.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use turf_events::{
    ActionId, ConflictId, DistrictId, FactionId, MonitoringReport, PieceId, RumorId, TurnLogEntry,
    TurnState,
};

use super::{Store, StoreError, StoreResult};
use crate::components::{Action, Conflict, District, Faction, Piece, Rumor};

/// Everything the store holds; also the scenario/save file format
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoreData {
    #[serde(default)]
    pub turn_state: TurnState,
    #[serde(default)]
    pub next_id: u64,
    #[serde(default)]
    pub districts: BTreeMap<DistrictId, District>,
    #[serde(default)]
    pub factions: BTreeMap<FactionId, Faction>,
    #[serde(default)]
    pub pieces: BTreeMap<PieceId, Piece>,
    #[serde(default)]
    pub actions: BTreeMap<ActionId, Action>,
    #[serde(default)]
    pub conflicts: BTreeMap<ConflictId, Conflict>,
    #[serde(default)]
    pub rumors: BTreeMap<RumorId, Rumor>,
    #[serde(default)]
    pub reports: Vec<MonitoringReport>,
    #[serde(default)]
    pub history: Vec<TurnLogEntry>,
}

/// In-memory [`Store`]
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    data: StoreData,
    checkpoint: Option<Box<StoreData>>,
    write_budget: Option<usize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_data(data: StoreData) -> Self {
        Self {
            data,
            checkpoint: None,
            write_budget: None,
        }
    }

    pub fn data(&self) -> &StoreData {
        &self.data
    }

    pub fn into_data(self) -> StoreData {
        self.data
    }

    pub fn in_transaction(&self) -> bool {
        self.checkpoint.is_some()
    }

    /// Fail every write after the next `writes` succeed
    pub fn fail_after_writes(&mut self, writes: usize) {
        self.write_budget = Some(writes);
    }

    pub fn clear_write_failures(&mut self) {
        self.write_budget = None;
    }

    pub fn from_json(json: &str) -> StoreResult<Self> {
        let data: StoreData =
            serde_json::from_str(json).map_err(|e| StoreError::Serialization(e.to_string()))?;
        Ok(Self::from_data(data))
    }

    pub fn to_json(&self) -> StoreResult<String> {
        serde_json::to_string_pretty(&self.data).map_err(|e| StoreError::Serialization(e.to_string()))
    }

    pub fn load(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref();
        let json = fs::read_to_string(path)
            .map_err(|e| StoreError::Unavailable(format!("{}: {}", path.display(), e)))?;
        Self::from_json(&json)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> StoreResult<()> {
        let path = path.as_ref();
        fs::write(path, self.to_json()?)
            .map_err(|e| StoreError::Unavailable(format!("{}: {}", path.display(), e)))
    }

    fn charge_write(&mut self) -> StoreResult<()> {
        match self.write_budget.as_mut() {
            Some(0) => Err(StoreError::Unavailable("write budget exhausted".to_string())),
            Some(remaining) => {
                *remaining -= 1;
                Ok(())
            }
            None => Ok(()),
        }
    }

    fn require_faction(&self, id: &FactionId) -> StoreResult<()> {
        if self.data.factions.contains_key(id) {
            Ok(())
        } else {
            Err(StoreError::Integrity(format!("unknown faction {}", id)))
        }
    }

    fn require_district(&self, id: &DistrictId) -> StoreResult<()> {
        if self.data.districts.contains_key(id) {
            Ok(())
        } else {
            Err(StoreError::Integrity(format!("unknown district {}", id)))
        }
    }
}

impl Store for MemoryStore {
    fn begin(&mut self) -> StoreResult<()> {
        if self.checkpoint.is_some() {
            return Err(StoreError::TransactionOpen);
        }
        self.checkpoint = Some(Box::new(self.data.clone()));
        Ok(())
    }

    fn commit(&mut self) -> StoreResult<()> {
        self.checkpoint
            .take()
            .map(|_| ())
            .ok_or(StoreError::NoTransaction)
    }

    fn rollback(&mut self) -> StoreResult<()> {
        let snapshot = self.checkpoint.take().ok_or(StoreError::NoTransaction)?;
        self.data = *snapshot;
        Ok(())
    }

    fn next_id(&mut self) -> StoreResult<u64> {
        self.charge_write()?;
        self.data.next_id += 1;
        Ok(self.data.next_id)
    }

    fn turn_state(&self) -> StoreResult<TurnState> {
        Ok(self.data.turn_state)
    }

    fn set_turn_state(&mut self, state: TurnState) -> StoreResult<()> {
        self.charge_write()?;
        self.data.turn_state = state;
        Ok(())
    }

    fn district(&self, id: &DistrictId) -> StoreResult<Option<District>> {
        Ok(self.data.districts.get(id).cloned())
    }

    fn districts(&self) -> StoreResult<Vec<District>> {
        Ok(self.data.districts.values().cloned().collect())
    }

    fn put_district(&mut self, district: District) -> StoreResult<()> {
        if !district.is_consistent() {
            return Err(StoreError::Integrity(format!(
                "district {} breaks the influence pool invariant",
                district.id
            )));
        }
        self.charge_write()?;
        self.data.districts.insert(district.id.clone(), district);
        Ok(())
    }

    fn faction(&self, id: &FactionId) -> StoreResult<Option<Faction>> {
        Ok(self.data.factions.get(id).cloned())
    }

    fn factions(&self) -> StoreResult<Vec<Faction>> {
        Ok(self.data.factions.values().cloned().collect())
    }

    fn put_faction(&mut self, faction: Faction) -> StoreResult<()> {
        self.charge_write()?;
        self.data.factions.insert(faction.id.clone(), faction);
        Ok(())
    }

    fn piece(&self, id: &PieceId) -> StoreResult<Option<Piece>> {
        Ok(self.data.pieces.get(id).cloned())
    }

    fn pieces(&self) -> StoreResult<Vec<Piece>> {
        Ok(self.data.pieces.values().cloned().collect())
    }

    fn put_piece(&mut self, piece: Piece) -> StoreResult<()> {
        self.require_faction(&piece.faction_id)?;
        if let Some(district_id) = &piece.district_id {
            self.require_district(district_id)?;
        }
        self.charge_write()?;
        self.data.pieces.insert(piece.id.clone(), piece);
        Ok(())
    }

    fn action(&self, id: ActionId) -> StoreResult<Option<Action>> {
        Ok(self.data.actions.get(&id).cloned())
    }

    fn actions_for_turn(&self, turn: u32) -> StoreResult<Vec<Action>> {
        Ok(self
            .data
            .actions
            .values()
            .filter(|a| a.turn == turn)
            .cloned()
            .collect())
    }

    fn put_action(&mut self, action: Action) -> StoreResult<()> {
        if !self.data.pieces.contains_key(&action.piece_id) {
            return Err(StoreError::Integrity(format!("unknown piece {}", action.piece_id)));
        }
        self.require_district(&action.district_id)?;
        self.charge_write()?;
        self.data.actions.insert(action.id, action);
        Ok(())
    }

    fn delete_action(&mut self, id: ActionId) -> StoreResult<()> {
        self.charge_write()?;
        self.data.actions.remove(&id);
        Ok(())
    }

    fn conflict(&self, id: ConflictId) -> StoreResult<Option<Conflict>> {
        Ok(self.data.conflicts.get(&id).cloned())
    }

    fn conflicts_for_turn(&self, turn: u32) -> StoreResult<Vec<Conflict>> {
        Ok(self
            .data
            .conflicts
            .values()
            .filter(|c| c.turn == turn)
            .cloned()
            .collect())
    }

    fn put_conflict(&mut self, conflict: Conflict) -> StoreResult<()> {
        self.require_district(&conflict.district_id)?;
        self.charge_write()?;
        self.data.conflicts.insert(conflict.id, conflict);
        Ok(())
    }

    fn rumor(&self, id: RumorId) -> StoreResult<Option<Rumor>> {
        Ok(self.data.rumors.get(&id).cloned())
    }

    fn rumors(&self) -> StoreResult<Vec<Rumor>> {
        Ok(self.data.rumors.values().cloned().collect())
    }

    fn put_rumor(&mut self, rumor: Rumor) -> StoreResult<()> {
        self.require_district(&rumor.district_id)?;
        self.charge_write()?;
        self.data.rumors.insert(rumor.id, rumor);
        Ok(())
    }

    fn append_report(&mut self, report: MonitoringReport) -> StoreResult<()> {
        if self
            .data
            .reports
            .iter()
            .any(|r| r.report_id == report.report_id)
        {
            return Err(StoreError::Integrity(format!(
                "report {} already written",
                report.report_id
            )));
        }
        self.charge_write()?;
        self.data.reports.push(report);
        Ok(())
    }

    fn reports_for(&self, faction_id: &FactionId, turn: u32) -> StoreResult<Vec<MonitoringReport>> {
        Ok(self
            .data
            .reports
            .iter()
            .filter(|r| &r.faction_id == faction_id && r.turn == turn)
            .cloned()
            .collect())
    }

    fn append_history(&mut self, entry: TurnLogEntry) -> StoreResult<()> {
        self.charge_write()?;
        self.data.history.push(entry);
        Ok(())
    }

    fn history(&self) -> StoreResult<Vec<TurnLogEntry>> {
        Ok(self.data.history.clone())
    }
}
