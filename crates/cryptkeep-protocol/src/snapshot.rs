//! Entity snapshots and the small enums that appear on the wire.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{Direction, MonsterId, ObjectId, ParticipantId};

/// A player's class. Fixed at spawn, determines maximum hit points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlayerClass {
    Mage,
    Knight,
    Rogue,
}

impl PlayerClass {
    pub const ALL: [PlayerClass; 3] = [Self::Mage, Self::Knight, Self::Rogue];
}

/// A monster's kind. Fixed at spawn, selects its AI and stats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MonsterKind {
    Archer,
    Skeleton,
    Demon,
}

impl MonsterKind {
    /// Parses a spawn point name (`"archer"`, `"skeleton"`, `"demon"`).
    pub fn from_spawn_name(name: &str) -> Option<Self> {
        match name {
            "archer" => Some(Self::Archer),
            "skeleton" => Some(Self::Skeleton),
            "demon" => Some(Self::Demon),
            _ => None,
        }
    }
}

impl fmt::Display for MonsterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Archer => "archer",
            Self::Skeleton => "skeleton",
            Self::Demon => "demon",
        })
    }
}

/// An interactive object's kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectKind {
    Chest,
    Trigger,
    TrapArrow,
    TrapSpikes,
}

impl ObjectKind {
    /// Parses a Tiled object type (`"chest"`, `"trap_arrow"`, ...).
    pub fn from_map_type(kind: &str) -> Option<Self> {
        match kind {
            "chest" => Some(Self::Chest),
            "trigger" => Some(Self::Trigger),
            "trap_arrow" => Some(Self::TrapArrow),
            "trap_spikes" => Some(Self::TrapSpikes),
            _ => None,
        }
    }

    /// The state every object of this kind starts in.
    pub fn initial_state(self) -> ObjectState {
        match self {
            Self::Chest => ObjectState::Closed,
            Self::Trigger | Self::TrapArrow | Self::TrapSpikes => ObjectState::Ready,
        }
    }
}

/// An object's state. Legal values depend on the kind:
/// chest `closed → open`, trigger `ready → activated`, traps `ready`
/// (or `passive` when disabled by the map).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObjectState {
    Closed,
    Open,
    Ready,
    Activated,
    Passive,
}

// ---------------------------------------------------------------------------
// Snapshots
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerPosition {
    pub client_id: ParticipantId,
    pub x: i32,
    pub y: i32,
    pub direction: Direction,
    pub is_moving: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerStats {
    #[serde(flatten)]
    pub position: PlayerPosition,
    pub class: PlayerClass,
    pub nickname: String,
    /// `0xRRGGBB`.
    pub color: String,
    pub max_hp: i32,
    pub hp: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonsterPosition {
    pub id: MonsterId,
    pub x: i32,
    pub y: i32,
    pub direction: Direction,
    pub is_moving: bool,
    pub is_attacking: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonsterStats {
    #[serde(flatten)]
    pub position: MonsterPosition,
    pub kind: MonsterKind,
    pub hp: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectSnapshot {
    pub id: ObjectId,
    pub kind: ObjectKind,
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
    pub state: ObjectState,
}
