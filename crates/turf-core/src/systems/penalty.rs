//! Enemy Penalties
//!
//! Hostile pieces near an acting piece subtract from its roll. Agents can
//! penalize once per turn in total. Squadrons spend slots whose shape comes
//! from their mobility. The tracker lives for one roll pass and is threaded
//! through it explicitly.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use turf_events::{DistrictId, FactionId, PieceId};

use crate::components::{District, Piece, PieceKind, Stance};
use crate::config::PenaltyConfig;

use super::relationship::RelationshipLedger;

/// Which kind of slot a squadron spent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotKind {
    Same,
    Adjacent,
    Either,
}

/// Remaining penalty slots of one squadron
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotBudget {
    pub same: u8,
    pub adjacent: u8,
    pub either: u8,
}

impl SlotBudget {
    pub fn for_mobility(mobility: i32) -> Self {
        let (same, adjacent, either) = match mobility {
            i32::MIN..=0 => (0, 0, 0),
            1 => (1, 0, 0),
            2 => (1, 1, 0),
            3 => (1, 0, 1),
            4 => (0, 0, 2),
            _ => (1, 0, 2),
        };
        Self {
            same,
            adjacent,
            either,
        }
    }

    pub fn total(&self) -> u8 {
        self.same + self.adjacent + self.either
    }

    /// Spend a slot for a target in the squadron's own district
    fn spend_same(&mut self) -> Option<SlotKind> {
        if self.same > 0 {
            self.same -= 1;
            Some(SlotKind::Same)
        } else if self.either > 0 {
            self.either -= 1;
            Some(SlotKind::Either)
        } else {
            None
        }
    }

    /// Spend a slot for a target in a neighbouring district
    fn spend_adjacent(&mut self) -> Option<SlotKind> {
        if self.adjacent > 0 {
            self.adjacent -= 1;
            Some(SlotKind::Adjacent)
        } else if self.either > 0 {
            self.either -= 1;
            Some(SlotKind::Either)
        } else {
            None
        }
    }
}

/// Per-pass record of spent agents and squadron slots
#[derive(Debug, Clone, Default)]
pub struct PenaltyTracker {
    used_agents: BTreeSet<PieceId>,
    squadrons: BTreeMap<PieceId, (SlotBudget, u8)>,
}

impl PenaltyTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        self.used_agents.clear();
        self.squadrons.clear();
    }

    pub fn agent_available(&self, agent_id: &PieceId) -> bool {
        !self.used_agents.contains(agent_id)
    }

    pub fn mark_agent_used(&mut self, agent_id: &PieceId) {
        self.used_agents.insert(agent_id.clone());
    }

    /// Slots this squadron has spent so far
    pub fn slots_used(&self, squadron_id: &PieceId) -> u8 {
        self.squadrons.get(squadron_id).map(|(_, used)| *used).unwrap_or(0)
    }

    pub fn remaining(&self, squadron: &Piece) -> SlotBudget {
        self.squadrons
            .get(&squadron.id)
            .map(|(budget, _)| *budget)
            .unwrap_or_else(|| SlotBudget::for_mobility(squadron.mobility()))
    }

    /// Spend a slot if one fits; adjacent targets need `min_adjacent_mobility`
    pub fn try_consume_slot(
        &mut self,
        squadron: &Piece,
        same_district: bool,
        min_adjacent_mobility: i32,
    ) -> Option<SlotKind> {
        if !same_district && squadron.mobility() < min_adjacent_mobility {
            return None;
        }
        let entry = self
            .squadrons
            .entry(squadron.id.clone())
            .or_insert_with(|| (SlotBudget::for_mobility(squadron.mobility()), 0));
        let spent = if same_district {
            entry.0.spend_same()
        } else {
            entry.0.spend_adjacent()
        };
        if spent.is_some() {
            entry.1 += 1;
        }
        spent
    }
}

/// One hostile piece's contribution to a penalty
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PenaltySource {
    pub piece_id: PieceId,
    pub faction_id: FactionId,
    pub amount: i32,
    #[serde(default)]
    pub slot: Option<SlotKind>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnemyPenalty {
    pub total: i32,
    pub sources: Vec<PenaltySource>,
}

impl EnemyPenalty {
    fn push(&mut self, source: PenaltySource) {
        self.total += source.amount;
        self.sources.push(source);
    }
}

/// Penalty for a piece of `defender` acting in `district`.
///
/// For each hostile faction, in id order, the first co-located agent that has
/// not yet penalized anyone this pass contributes and is spent. Then every
/// squadron of that faction in the district or a neighbour with a matching
/// slot contributes and spends the slot. Pieces in `engaged` are tied up in
/// a pending conflict and impose nothing.
pub fn calculate_enemy_penalty(
    tracker: &mut PenaltyTracker,
    defender: &FactionId,
    district: &District,
    ledger: &RelationshipLedger,
    pieces: &[Piece],
    engaged: &BTreeSet<PieceId>,
    config: &PenaltyConfig,
) -> EnemyPenalty {
    let mut penalty = EnemyPenalty::default();
    let mut reach: Vec<&DistrictId> = vec![&district.id];
    reach.extend(district.adjacent.iter());

    for enemy in ledger.hostile_factions(defender) {
        let hot = ledger.stance(defender, &enemy) == Stance::HotWar;
        let (agent_amount, squadron_amount) = if hot {
            (config.agent_hot_war, config.squadron_hot_war)
        } else {
            (config.agent_cold_war, config.squadron_cold_war)
        };

        let agent = pieces.iter().find(|p| {
            p.faction_id == enemy
                && p.kind() == PieceKind::Agent
                && p.is_in(&district.id)
                && !engaged.contains(&p.id)
                && tracker.agent_available(&p.id)
        });
        if let Some(agent) = agent {
            tracker.mark_agent_used(&agent.id);
            penalty.push(PenaltySource {
                piece_id: agent.id.clone(),
                faction_id: enemy.clone(),
                amount: agent_amount,
                slot: None,
            });
        }

        for district_id in &reach {
            let same = *district_id == &district.id;
            let squadrons = pieces.iter().filter(|p| {
                p.faction_id == enemy
                    && p.kind() == PieceKind::Squadron
                    && p.is_in(district_id)
                    && !engaged.contains(&p.id)
            });
            for squadron in squadrons {
                if let Some(slot) =
                    tracker.try_consume_slot(squadron, same, config.adjacent_min_mobility)
                {
                    penalty.push(PenaltySource {
                        piece_id: squadron.id.clone(),
                        faction_id: enemy.clone(),
                        amount: squadron_amount,
                        slot: Some(slot),
                    });
                }
            }
        }
    }

    penalty
}
