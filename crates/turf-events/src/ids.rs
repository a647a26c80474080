//! Entity Identifiers
//!
//! Newtype ids for every record the engine reads or writes through the store.
//! Named entities (districts, factions, pieces) carry string ids chosen by the
//! scenario author; records the engine creates (actions, conflicts, rumors,
//! reports, log entries) carry store-allocated sequence numbers.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

macro_rules! sequence_id {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "_{:06}"), self.0)
            }
        }
    };
}

string_id!(
    /// Unique identifier for a district
    DistrictId
);
string_id!(
    /// Unique identifier for a faction
    FactionId
);
string_id!(
    /// Unique identifier for a piece (agent or squadron)
    PieceId
);

sequence_id!(
    /// Store-allocated action id
    ActionId,
    "act"
);
sequence_id!(
    /// Store-allocated conflict id
    ConflictId,
    "cfl"
);
sequence_id!(
    /// Store-allocated rumor id
    RumorId,
    "rum"
);
sequence_id!(
    /// Store-allocated monitoring report id
    ReportId,
    "rpt"
);
sequence_id!(
    /// Store-allocated turn-history entry id
    LogEntryId,
    "log"
);
