//! Turn History
//!
//! Append-only log entries describing what each phase did. Entries are
//! stored through the persistence interface and exported as JSONL.

use serde::{Deserialize, Serialize};

use crate::ids::LogEntryId;
use crate::phase::TurnPhase;

/// Broad classification of a history entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogCategory {
    Phase,
    Influence,
    Action,
    Conflict,
    Monitoring,
    Rumor,
    District,
}

/// One entry in the turn history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TurnLogEntry {
    pub entry_id: LogEntryId,
    pub turn: u32,
    pub phase: TurnPhase,
    pub category: LogCategory,
    pub message: String,
    /// Structured payload; omitted when empty
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub data: serde_json::Value,
}

impl TurnLogEntry {
    pub fn new(
        entry_id: LogEntryId,
        turn: u32,
        phase: TurnPhase,
        category: LogCategory,
        message: impl Into<String>,
    ) -> Self {
        Self {
            entry_id,
            turn,
            phase,
            category,
            message: message.into(),
            data: serde_json::Value::Null,
        }
    }

    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = data;
        self
    }

    /// Serialize as a single JSONL line (no trailing newline)
    pub fn to_jsonl(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_jsonl(line: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(line)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_entry_without_data_omits_field() {
        let entry = TurnLogEntry::new(
            LogEntryId(1),
            2,
            TurnPhase::InfluenceDecay,
            LogCategory::Influence,
            "docks: thornwood lost 1 influence to decay",
        );
        let line = entry.to_jsonl().unwrap();
        assert!(!line.contains("\"data\""));
        assert!(line.contains("\"phase\":\"influence_decay\""));
    }

    #[test]
    fn test_entry_parses_back() {
        let entry = TurnLogEntry::new(
            LogEntryId(9),
            4,
            TurnPhase::ConflictDetection,
            LogCategory::Conflict,
            "conflict opened",
        )
        .with_data(json!({ "conflict_id": 3, "type": "target" }));
        let parsed = TurnLogEntry::from_jsonl(&entry.to_jsonl().unwrap()).unwrap();
        assert_eq!(parsed.data["type"], "target");
        assert_eq!(parsed.category, LogCategory::Conflict);
    }
}
