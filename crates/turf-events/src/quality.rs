//! Quality Tiers
//!
//! Roll-derived labels used when an action has no DC, and by the
//! perception engine to drive detection and noise.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Quality of an undc'd roll, best first
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QualityTier {
    Legendary,
    Exceptional,
    VeryGood,
    Good,
    Average,
    Poor,
    VeryPoor,
    Abysmal,
}

impl QualityTier {
    pub const ALL: [QualityTier; 8] = [
        QualityTier::Legendary,
        QualityTier::Exceptional,
        QualityTier::VeryGood,
        QualityTier::Good,
        QualityTier::Average,
        QualityTier::Poor,
        QualityTier::VeryPoor,
        QualityTier::Abysmal,
    ];

    /// Map a roll total onto its tier
    pub fn from_roll(roll: i32) -> Self {
        match roll {
            r if r >= 30 => QualityTier::Legendary,
            r if r >= 25 => QualityTier::Exceptional,
            r if r >= 20 => QualityTier::VeryGood,
            r if r >= 15 => QualityTier::Good,
            r if r >= 10 => QualityTier::Average,
            r if r >= 5 => QualityTier::Poor,
            r if r >= 1 => QualityTier::VeryPoor,
            _ => QualityTier::Abysmal,
        }
    }

    /// Position in [`QualityTier::ALL`]; 0 is best. Used to index tables.
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn as_str(self) -> &'static str {
        match self {
            QualityTier::Legendary => "legendary",
            QualityTier::Exceptional => "exceptional",
            QualityTier::VeryGood => "very_good",
            QualityTier::Good => "good",
            QualityTier::Average => "average",
            QualityTier::Poor => "poor",
            QualityTier::VeryPoor => "very_poor",
            QualityTier::Abysmal => "abysmal",
        }
    }
}

impl fmt::Display for QualityTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
