//! Shared record types for the turf turn engine.
//!
//! This crate contains pure data structures with no simulation logic:
//! identifiers, the turn phase cursor, quality tiers, monitoring reports and
//! turn-history entries. It is a dependency for all other crates in the
//! workspace.

pub mod history;
pub mod ids;
pub mod phase;
pub mod quality;
pub mod report;

#[cfg(feature = "test-fixtures")]
pub mod fixtures;

pub use history::{LogCategory, TurnLogEntry};
pub use ids::{ActionId, ConflictId, DistrictId, FactionId, LogEntryId, PieceId, ReportId, RumorId};
pub use phase::{TurnPhase, TurnState};
pub use quality::QualityTier;
pub use report::{
    DistrictIntel, IntelligenceSummary, ModifierDirection, ModifierIntel, MonitoringReport,
    PerceivedDistrict, ReportSource,
};
