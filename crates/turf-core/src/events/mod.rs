//! Turn History
//!
//! JSONL export of the turn history entries each phase appends.

pub mod logger;

pub use logger::{HistoryLogger, PendingHistory};
