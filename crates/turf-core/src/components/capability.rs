//! Capability Profiles
//!
//! Agents roll attribute + skill, squadrons roll a single aptitude. Both sit
//! behind [`RollSource`] so roll code never inspects the piece variant.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ValidationError;

macro_rules! named_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(rename_all = "snake_case")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn index(self) -> usize {
                self as usize
            }

            pub fn as_str(self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = ValidationError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok($name::$variant),)+
                    other => Err(ValidationError::UnknownName {
                        kind: stringify!($name),
                        name: other.to_string(),
                    }),
                }
            }
        }
    };
}

named_enum!(
    /// Agent attribute (0-5)
    Attribute {
        Might => "might",
        Finesse => "finesse",
        Presence => "presence",
        Intellect => "intellect",
        Attunement => "attunement",
    }
);

named_enum!(
    /// Agent skill (0-5)
    Skill {
        Combat => "combat",
        Infiltration => "infiltration",
        Persuasion => "persuasion",
        Streetwise => "streetwise",
        Survival => "survival",
        Artifice => "artifice",
        Arcana => "arcana",
    }
);

named_enum!(
    /// Squadron aptitude (-3..5)
    Aptitude {
        Combat => "combat",
        Underworld => "underworld",
        Social => "social",
        Technical => "technical",
        Labor => "labor",
        Arcane => "arcane",
        Wilderness => "wilderness",
        Monitoring => "monitoring",
    }
);

named_enum!(
    /// Which kind of piece an action belongs to
    PieceKind {
        Agent => "agent",
        Squadron => "squadron",
    }
);

/// Which stats a roll draws on
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RollSelection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attribute: Option<Attribute>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skill: Option<Skill>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aptitude: Option<Aptitude>,
}

impl RollSelection {
    pub fn agent(attribute: Attribute, skill: Skill) -> Self {
        Self {
            attribute: Some(attribute),
            skill: Some(skill),
            aptitude: None,
        }
    }

    pub fn squadron(aptitude: Aptitude) -> Self {
        Self {
            attribute: None,
            skill: None,
            aptitude: Some(aptitude),
        }
    }

    /// Selection usable by both piece kinds
    pub fn both(attribute: Attribute, skill: Skill, aptitude: Aptitude) -> Self {
        Self {
            attribute: Some(attribute),
            skill: Some(skill),
            aptitude: Some(aptitude),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.attribute.is_none() && self.skill.is_none() && self.aptitude.is_none()
    }

    /// Whether this selection carries what `kind` needs to roll
    pub fn complete_for(&self, kind: PieceKind) -> bool {
        match kind {
            PieceKind::Agent => self.attribute.is_some() && self.skill.is_some(),
            PieceKind::Squadron => self.aptitude.is_some(),
        }
    }

    /// Fill missing fields from `fallback`
    pub fn or(self, fallback: RollSelection) -> Self {
        Self {
            attribute: self.attribute.or(fallback.attribute),
            skill: self.skill.or(fallback.skill),
            aptitude: self.aptitude.or(fallback.aptitude),
        }
    }
}

/// Anything that can turn a stat selection into a roll bonus
pub trait RollSource {
    fn kind(&self) -> PieceKind;

    /// Bonus for the selection, or `None` if it lacks the fields this source needs
    fn roll_bonus(&self, selection: &RollSelection) -> Option<i32>;

    /// Squadron mobility; agents have none
    fn mobility(&self) -> i32 {
        0
    }
}

/// Agent stats: 5 attributes and 7 skills, each 0-5
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentProfile {
    pub attributes: [i32; 5],
    pub skills: [i32; 7],
}

impl AgentProfile {
    pub fn new() -> Self {
        Self {
            attributes: [0; 5],
            skills: [0; 7],
        }
    }

    pub fn with_attribute(mut self, attribute: Attribute, value: i32) -> Self {
        self.attributes[attribute.index()] = value.clamp(0, 5);
        self
    }

    pub fn with_skill(mut self, skill: Skill, value: i32) -> Self {
        self.skills[skill.index()] = value.clamp(0, 5);
        self
    }

    pub fn attribute(&self, attribute: Attribute) -> i32 {
        self.attributes[attribute.index()]
    }

    pub fn skill(&self, skill: Skill) -> i32 {
        self.skills[skill.index()]
    }
}

impl Default for AgentProfile {
    fn default() -> Self {
        Self::new()
    }
}

impl RollSource for AgentProfile {
    fn kind(&self) -> PieceKind {
        PieceKind::Agent
    }

    fn roll_bonus(&self, selection: &RollSelection) -> Option<i32> {
        let attribute = selection.attribute?;
        let skill = selection.skill?;
        Some(self.attribute(attribute) + self.skill(skill))
    }
}

/// Squadron stats: mobility 0-5 and 8 aptitudes, each -3..5
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SquadronProfile {
    pub mobility: i32,
    pub aptitudes: [i32; 8],
}

impl SquadronProfile {
    pub fn new(mobility: i32) -> Self {
        Self {
            mobility: mobility.clamp(0, 5),
            aptitudes: [0; 8],
        }
    }

    pub fn with_aptitude(mut self, aptitude: Aptitude, value: i32) -> Self {
        self.aptitudes[aptitude.index()] = value.clamp(-3, 5);
        self
    }

    pub fn aptitude(&self, aptitude: Aptitude) -> i32 {
        self.aptitudes[aptitude.index()]
    }
}

impl RollSource for SquadronProfile {
    fn kind(&self) -> PieceKind {
        PieceKind::Squadron
    }

    fn roll_bonus(&self, selection: &RollSelection) -> Option<i32> {
        selection.aptitude.map(|a| self.aptitude(a))
    }

    fn mobility(&self) -> i32 {
        self.mobility
    }
}

/// A piece's stat block
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Capability {
    Agent(AgentProfile),
    Squadron(SquadronProfile),
}

impl Capability {
    fn source(&self) -> &dyn RollSource {
        match self {
            Capability::Agent(profile) => profile,
            Capability::Squadron(profile) => profile,
        }
    }
}

impl RollSource for Capability {
    fn kind(&self) -> PieceKind {
        self.source().kind()
    }

    fn roll_bonus(&self, selection: &RollSelection) -> Option<i32> {
        self.source().roll_bonus(selection)
    }

    fn mobility(&self) -> i32 {
        self.source().mobility()
    }
}
