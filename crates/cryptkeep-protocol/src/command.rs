//! Inbound commands.
//!
//! Every frame a client sends is a [`RawCommand`]:
//!
//! ```json
//! {"type": "game", "subType": "PlayerMoveCommand", "data": {"x": 10, "y": 20, "direction": "left", "isMoving": true}}
//! ```
//!
//! [`RawCommand::classify`] selects the variant by `(type, subType)` and
//! decodes `data` into its strongly-typed fields. An unknown subtype is not
//! an error; it classifies to `None` and the caller ignores it.

use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::{Direction, MonsterId, ParticipantId, ProtocolError, RoomId};

/// Which part of the server a command is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommandScope {
    Lobby,
    Room,
    Game,
}

/// The inbound envelope, before classification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawCommand {
    #[serde(rename = "type")]
    pub scope: CommandScope,
    #[serde(rename = "subType", alias = "subtype")]
    pub subtype: String,
    #[serde(default)]
    pub data: serde_json::Value,
}

impl RawCommand {
    pub fn new(scope: CommandScope, subtype: impl Into<String>, data: serde_json::Value) -> Self {
        Self {
            scope,
            subtype: subtype.into(),
            data,
        }
    }

    /// Classifies the envelope and decodes its payload.
    ///
    /// # Errors
    /// Returns `ProtocolError::Payload` when the subtype is known but `data`
    /// does not decode into its payload type.
    pub fn classify(self) -> Result<Option<Command>, ProtocolError> {
        let Self {
            scope,
            subtype,
            data,
        } = self;
        let command = match scope {
            CommandScope::Lobby => LobbyCommand::decode(&subtype, data)?.map(Command::Lobby),
            CommandScope::Room => RoomCommand::decode(&subtype).map(Command::Room),
            CommandScope::Game => GameCommand::decode(&subtype, data)?.map(Command::Game),
        };
        Ok(command)
    }
}

fn payload<T: DeserializeOwned>(subtype: &str, data: serde_json::Value) -> Result<T, ProtocolError> {
    serde_json::from_value(data).map_err(|source| ProtocolError::Payload {
        subtype: subtype.to_string(),
        source,
    })
}

/// A classified command.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Lobby(LobbyCommand),
    Room(RoomCommand),
    Game(GameCommand),
}

// ---------------------------------------------------------------------------
// Lobby scope
// ---------------------------------------------------------------------------

/// Free-form matchmaking settings (`{"roomName": "crypt-1"}`).
pub type MatchSettings = BTreeMap<String, serde_json::Value>;

#[derive(Debug, Clone, PartialEq)]
pub enum LobbyCommand {
    /// `join`: set the nickname and receive the lobby snapshot.
    JoinLobby { nickname: String },
    /// `createRoom`: create a room owned by the sender.
    CreateRoom,
    /// `joinRoom`: join an existing room by id.
    JoinRoom { room_id: RoomId },
    /// `makeMatch`: let the matchmaking policy pick a room.
    RequestMatch { settings: MatchSettings },
}

impl LobbyCommand {
    pub const JOIN: &'static str = "join";
    pub const CREATE_ROOM: &'static str = "createRoom";
    pub const JOIN_ROOM: &'static str = "joinRoom";
    pub const MAKE_MATCH: &'static str = "makeMatch";

    fn decode(subtype: &str, data: serde_json::Value) -> Result<Option<Self>, ProtocolError> {
        let command = match subtype {
            Self::JOIN => Self::JoinLobby {
                nickname: payload(subtype, data)?,
            },
            Self::CREATE_ROOM => Self::CreateRoom,
            Self::JOIN_ROOM => Self::JoinRoom {
                room_id: payload(subtype, data)?,
            },
            Self::MAKE_MATCH => Self::RequestMatch {
                // A bare `makeMatch` without data means "default settings".
                settings: if data.is_null() {
                    MatchSettings::new()
                } else {
                    payload(subtype, data)?
                },
            },
            _ => return Ok(None),
        };
        Ok(Some(command))
    }
}

// ---------------------------------------------------------------------------
// Room scope
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoomCommand {
    /// `startGame`: start the room's engine if none is running.
    StartGame,
    /// `leaveRoom`: leave the current room.
    LeaveRoom,
}

impl RoomCommand {
    pub const START_GAME: &'static str = "startGame";
    pub const LEAVE_ROOM: &'static str = "leaveRoom";

    fn decode(subtype: &str) -> Option<Self> {
        match subtype {
            Self::START_GAME => Some(Self::StartGame),
            Self::LEAVE_ROOM => Some(Self::LeaveRoom),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Game scope
// ---------------------------------------------------------------------------

/// Absolute position report. Trusted as sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveCommand {
    pub x: i32,
    pub y: i32,
    pub direction: Direction,
    pub is_moving: bool,
}

/// Shared payload of the three attack commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttackCommand {
    pub x: i32,
    pub y: i32,
    pub direction: Direction,
}

/// A client-predicted hit on a player (usually by a monster projectile).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HitPlayerCommand {
    #[serde(rename = "targetClientId")]
    pub target: ParticipantId,
    #[serde(default)]
    pub monster_id: Option<MonsterId>,
}

/// A client-predicted hit on a monster (usually by a fireball).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HitMonsterCommand {
    pub monster_id: MonsterId,
    #[serde(default, rename = "originClientId")]
    pub origin: Option<ParticipantId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameCommand {
    Move(MoveCommand),
    CastFireball(AttackCommand),
    SwordAttack(AttackCommand),
    ShootArrow(AttackCommand),
    HitPlayer(HitPlayerCommand),
    HitMonster(HitMonsterCommand),
}

impl GameCommand {
    pub const MOVE: &'static str = "PlayerMoveCommand";
    pub const CAST_FIREBALL: &'static str = "CastFireballCommand";
    pub const SWORD_ATTACK: &'static str = "SwordAttackCommand";
    pub const SHOOT_ARROW: &'static str = "ShootArrowCommand";
    pub const HIT_PLAYER: &'static str = "HitPlayerCommand";
    pub const HIT_MONSTER: &'static str = "HitMonsterCommand";

    fn decode(subtype: &str, data: serde_json::Value) -> Result<Option<Self>, ProtocolError> {
        let command = match subtype {
            Self::MOVE => Self::Move(payload(subtype, data)?),
            Self::CAST_FIREBALL => Self::CastFireball(payload(subtype, data)?),
            Self::SWORD_ATTACK => Self::SwordAttack(payload(subtype, data)?),
            Self::SHOOT_ARROW => Self::ShootArrow(payload(subtype, data)?),
            Self::HIT_PLAYER => Self::HitPlayer(payload(subtype, data)?),
            Self::HIT_MONSTER => Self::HitMonster(payload(subtype, data)?),
            _ => return Ok(None),
        };
        Ok(Some(command))
    }

    /// The wire subtype of this command, for logging.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Move(_) => Self::MOVE,
            Self::CastFireball(_) => Self::CAST_FIREBALL,
            Self::SwordAttack(_) => Self::SWORD_ATTACK,
            Self::ShootArrow(_) => Self::SHOOT_ARROW,
            Self::HitPlayer(_) => Self::HIT_PLAYER,
            Self::HitMonster(_) => Self::HIT_MONSTER,
        }
    }
}
