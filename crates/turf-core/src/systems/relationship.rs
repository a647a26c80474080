//! Relationship Ledger
//!
//! Directed faction relationships in -2..=2. Consulted by conflict
//! detection, enemy penalties, the control DC and support declarations.

use std::collections::{BTreeMap, BTreeSet};

use turf_events::FactionId;

use crate::components::{Faction, Stance, RELATIONSHIP_MAX, RELATIONSHIP_MIN};
use crate::error::{EngineError, EngineResult, ValidationError};
use crate::store::Store;

/// Read-only view of every faction's relationships
#[derive(Debug, Clone, Default)]
pub struct RelationshipLedger {
    factions: BTreeSet<FactionId>,
    relations: BTreeMap<(FactionId, FactionId), i32>,
}

impl RelationshipLedger {
    pub fn from_factions<'a>(factions: impl IntoIterator<Item = &'a Faction>) -> Self {
        let mut ledger = Self::default();
        for faction in factions {
            ledger.factions.insert(faction.id.clone());
            for (other, &value) in &faction.relationships {
                ledger
                    .relations
                    .insert((faction.id.clone(), other.clone()), value);
            }
        }
        ledger
    }

    pub fn load(store: &dyn Store) -> EngineResult<Self> {
        Ok(Self::from_factions(&store.factions()?))
    }

    /// How `from` regards `to`; 0 when unset
    pub fn relationship(&self, from: &FactionId, to: &FactionId) -> i32 {
        self.relations
            .get(&(from.clone(), to.clone()))
            .copied()
            .unwrap_or(0)
    }

    pub fn stance(&self, from: &FactionId, to: &FactionId) -> Stance {
        Stance::from_value(self.relationship(from, to))
    }

    pub fn is_hostile(&self, from: &FactionId, to: &FactionId) -> bool {
        from != to && self.relationship(from, to) < 0
    }

    /// The more hostile of the two directions
    pub fn mutual_stance(&self, a: &FactionId, b: &FactionId) -> Stance {
        Stance::from_value(self.relationship(a, b).min(self.relationship(b, a)))
    }

    /// Factions `faction` regards as enemies, in id order
    pub fn hostile_factions(&self, faction: &FactionId) -> Vec<FactionId> {
        self.factions
            .iter()
            .filter(|other| self.is_hostile(faction, other))
            .cloned()
            .collect()
    }

    /// Factions `faction` is allied with
    pub fn allies_of(&self, faction: &FactionId) -> Vec<FactionId> {
        self.factions
            .iter()
            .filter(|other| *other != faction && self.relationship(faction, other) == RELATIONSHIP_MAX)
            .cloned()
            .collect()
    }
}

/// Set how `from` regards `to`
pub fn set_relationship(
    store: &mut dyn Store,
    from: &FactionId,
    to: &FactionId,
    value: i32,
) -> EngineResult<()> {
    if !(RELATIONSHIP_MIN..=RELATIONSHIP_MAX).contains(&value) {
        return Err(ValidationError::OutOfRange {
            field: "relationship",
            value,
            min: RELATIONSHIP_MIN,
            max: RELATIONSHIP_MAX,
        }
        .into());
    }
    if from == to {
        return Err(ValidationError::Rejected(format!("{} cannot relate to itself", from)).into());
    }
    if store.faction(to)?.is_none() {
        return Err(EngineError::not_found("faction", to));
    }
    let mut faction = store
        .faction(from)?
        .ok_or_else(|| EngineError::not_found("faction", from))?;
    faction.relationships.insert(to.clone(), value);
    store.put_faction(faction)?;
    Ok(())
}
