//! Turf Turn Engine Library
//!
//! Turn resolution for a faction-conflict strategy game: influence economy,
//! dice resolution with enemy penalties, conflict detection, fog-of-war
//! monitoring, and the phased turn coordinator that sequences them.

use rand::rngs::SmallRng;
use rand::SeedableRng;

pub mod components;
pub mod config;
pub mod error;
pub mod events;
pub mod setup;
pub mod store;
pub mod systems;
pub mod turn;

pub use components::*;
pub use config::{ConfigError, EngineConfig};
pub use error::{EngineError, EngineResult, StateError, ValidationError};
pub use store::{MemoryStore, Store, StoreError};
pub use turn::{GateStatus, PhaseReport, PhasedResult, TurnCoordinator, TurnOutcome};

pub use turf_events as records;

/// Seeded random number generator owned by the turn coordinator
pub struct SimRng(pub SmallRng);

impl SimRng {
    pub fn seed_from_u64(seed: u64) -> Self {
        Self(SmallRng::seed_from_u64(seed))
    }
}

/// Derive an independent generator from a key tuple. The same parts always
/// give the same stream, regardless of what else has been drawn.
pub fn derive_rng(parts: &[u64]) -> SmallRng {
    let seed = parts
        .iter()
        .fold(0x5EED_u64, |acc, part| splitmix64(acc ^ *part));
    SmallRng::seed_from_u64(seed)
}

/// Stable 64-bit hash of a string key (FNV-1a)
pub fn stable_hash(key: &str) -> u64 {
    key.bytes().fold(0xcbf2_9ce4_8422_2325_u64, |hash, byte| {
        (hash ^ u64::from(byte)).wrapping_mul(0x0000_0100_0000_01b3)
    })
}

fn splitmix64(x: u64) -> u64 {
    let mut z = x.wrapping_add(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    #[test]
    fn test_derived_rng_is_reproducible() {
        let key = [3, stable_hash("thornwood"), stable_hash("docks"), 22];
        let a: Vec<u32> = derive_rng(&key).sample_iter(rand::distributions::Standard).take(8).collect();
        let b: Vec<u32> = derive_rng(&key).sample_iter(rand::distributions::Standard).take(8).collect();
        assert_eq!(a, b);
    }

    #[test]
    fn test_derived_rng_depends_on_every_part() {
        let base: u64 = derive_rng(&[3, 1, 2, 22]).gen();
        assert_ne!(base, derive_rng(&[4, 1, 2, 22]).gen::<u64>());
        assert_ne!(base, derive_rng(&[3, 1, 2, 23]).gen::<u64>());
    }

    #[test]
    fn test_stable_hash_known_value() {
        // FNV-1a offset basis for the empty string
        assert_eq!(stable_hash(""), 0xcbf2_9ce4_8422_2325);
        assert_ne!(stable_hash("docks"), stable_hash("dock"));
    }
}
