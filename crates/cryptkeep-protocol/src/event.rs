//! Outbound events.
//!
//! Every event is serialized as `{"name": "<EventName>", "data": {...}}`;
//! the names are the ones browsers already dispatch on.

use std::collections::BTreeMap;
use std::sync::Arc;

use cryptkeep_map::TileMap;
use serde::{Deserialize, Serialize};

use crate::{
    Direction, MonsterId, MonsterStats, ObjectId, ObjectSnapshot, ParticipantId, PlayerPosition,
    PlayerStats, MonsterPosition, RoomId,
};

// ---------------------------------------------------------------------------
// Registry events
// ---------------------------------------------------------------------------

/// A participant as listed in the lobby.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticipantSummary {
    pub id: ParticipantId,
    pub nickname: String,
}

/// A room as listed in the lobby.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomSummary {
    pub id: RoomId,
    pub owner: ParticipantSummary,
    pub members: Vec<ParticipantSummary>,
    pub game_running: bool,
}

/// Policy violation codes sent back to the offending participant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// The participant already owns a room.
    RoomAlreadyExists,
    /// The requested room id is unknown.
    RoomDoesNotExist,
    /// The room has reached its member limit.
    RoomFull,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "name", content = "data", rename_all_fields = "camelCase")]
pub enum LobbyEvent {
    /// Sent to a participant after `join`: who they are and what exists.
    #[serde(rename = "ClientJoinedEvent")]
    Joined {
        your_id: ParticipantId,
        your_nickname: String,
        clients: Vec<ParticipantSummary>,
        rooms: Vec<RoomSummary>,
    },
    #[serde(rename = "ClientBroadCastJoinedEvent")]
    ParticipantJoined { id: ParticipantId, nickname: String },
    #[serde(rename = "ClientLeftEvent")]
    ParticipantLeft { id: ParticipantId },
    #[serde(rename = "ClientCreatedRoomEvent")]
    RoomCreated { room: RoomSummary },
    /// Sent to the participant that just entered a room.
    #[serde(rename = "RoomJoinedEvent")]
    RoomJoined { room: RoomSummary },
    #[serde(rename = "RoomInListUpdatedEvent")]
    RoomUpdated { room: RoomSummary },
    #[serde(rename = "RoomInListRemovedEvent")]
    RoomRemoved { room_id: RoomId },
    #[serde(rename = "ClientCommandError")]
    Error { code: ErrorCode },
}

// ---------------------------------------------------------------------------
// Game events
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TileUpdate {
    pub x: i32,
    pub y: i32,
    pub tile_id: u32,
}

/// A batch of tile replacements on one layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TileBatch {
    pub layer_name: String,
    pub tiles: Vec<TileUpdate>,
}

/// A spike hazard appearing at a tile-aligned position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpikeSpawn {
    pub x: i32,
    pub y: i32,
    pub start_frame: String,
}

/// Everything a participant needs to render a game it just entered.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitialGameData {
    pub map_data: Arc<TileMap>,
    pub game_objects: BTreeMap<ObjectId, ObjectSnapshot>,
    pub player_data: PlayerStats,
    pub keys_collected: BTreeMap<String, bool>,
    /// Tile batches already broadcast, replayed for late joiners.
    pub update_tiles_events: Vec<TileBatch>,
    /// Spikes already spawned, replayed for late joiners.
    pub spike_events: Vec<SpikeSpawn>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "name", content = "data", rename_all_fields = "camelCase")]
pub enum GameEvent {
    #[serde(rename = "JoinToStartedGameEvent")]
    JoinToStartedGame { game_data: Box<InitialGameData> },

    /// Sparse: only creatures that are moving or attacking.
    #[serde(rename = "CreaturesPosUpdateEvent")]
    CreaturesPosUpdate {
        players: Vec<PlayerPosition>,
        monsters: Vec<MonsterPosition>,
    },
    /// Full: every player and monster.
    #[serde(rename = "CreaturesStatsUpdateEvent")]
    CreaturesStatsUpdate {
        players: Vec<PlayerStats>,
        monsters: Vec<MonsterStats>,
    },

    #[serde(rename = "FireballEvent")]
    Fireball {
        client_id: ParticipantId,
        x: i32,
        y: i32,
        direction: Direction,
    },
    #[serde(rename = "ShootArrowEvent")]
    ShootArrow {
        client_id: ParticipantId,
        x1: i32,
        y1: i32,
        x2: i32,
        y2: i32,
        velocity: i32,
    },
    #[serde(rename = "SwordAttackPrepareEvent")]
    SwordAttackPrepare {
        client_id: ParticipantId,
        x: i32,
        y: i32,
        direction: Direction,
    },
    #[serde(rename = "SwordAttackEvent")]
    SwordAttack {
        client_id: ParticipantId,
        x: i32,
        y: i32,
        direction: Direction,
        attack_line_x: i32,
        attack_line_y: i32,
    },
    /// Exactly one of the two targets is set.
    #[serde(rename = "DamageEvent")]
    Damage {
        damage: i32,
        #[serde(skip_serializing_if = "Option::is_none", default)]
        target_player_id: Option<ParticipantId>,
        #[serde(skip_serializing_if = "Option::is_none", default)]
        target_monster_id: Option<MonsterId>,
        /// Hit points left after the damage.
        hp: i32,
    },
    #[serde(rename = "PlayerDeathEvent")]
    PlayerDeath { client_id: ParticipantId },
    #[serde(rename = "MonsterDeathEvent")]
    MonsterDeath { monster_id: MonsterId },

    /// A monster or trap arrow. `monster_id` is `None` for traps.
    #[serde(rename = "ArrowEvent")]
    Arrow {
        monster_id: Option<MonsterId>,
        x1: i32,
        y1: i32,
        x2: i32,
        y2: i32,
    },
    #[serde(rename = "DemonLightningEvent")]
    DemonLightning { monster_id: MonsterId, x: i32, y: i32 },
    #[serde(rename = "FireCircleEvent")]
    FireCircle { monster_id: MonsterId, x: i32, y: i32 },
    #[serde(rename = "DemonFireballEvent")]
    DemonFireball {
        monster_id: MonsterId,
        x1: i32,
        y1: i32,
        x2: i32,
        y2: i32,
    },
    #[serde(rename = "MonsterSpawnedEvent")]
    MonsterSpawned { monster: MonsterStats },

    #[serde(rename = "ChestOpenEvent")]
    ChestOpen { object_id: ObjectId },
    #[serde(rename = "KeyCollectedEvent")]
    KeyCollected { number: String },
    #[serde(rename = "UpdateTilesEvent")]
    UpdateTiles(TileBatch),
    #[serde(rename = "SpawnSpikeEvent")]
    SpawnSpike(SpikeSpawn),

    /// `winner_player_id` is `None` when nobody survived.
    #[serde(rename = "EndGameEvent")]
    EndGame { winner_player_id: Option<ParticipantId> },
}

impl GameEvent {
    /// The wire name, for logging.
    pub fn name(&self) -> &'static str {
        match self {
            Self::JoinToStartedGame { .. } => "JoinToStartedGameEvent",
            Self::CreaturesPosUpdate { .. } => "CreaturesPosUpdateEvent",
            Self::CreaturesStatsUpdate { .. } => "CreaturesStatsUpdateEvent",
            Self::Fireball { .. } => "FireballEvent",
            Self::ShootArrow { .. } => "ShootArrowEvent",
            Self::SwordAttackPrepare { .. } => "SwordAttackPrepareEvent",
            Self::SwordAttack { .. } => "SwordAttackEvent",
            Self::Damage { .. } => "DamageEvent",
            Self::PlayerDeath { .. } => "PlayerDeathEvent",
            Self::MonsterDeath { .. } => "MonsterDeathEvent",
            Self::Arrow { .. } => "ArrowEvent",
            Self::DemonLightning { .. } => "DemonLightningEvent",
            Self::FireCircle { .. } => "FireCircleEvent",
            Self::DemonFireball { .. } => "DemonFireballEvent",
            Self::MonsterSpawned { .. } => "MonsterSpawnedEvent",
            Self::ChestOpen { .. } => "ChestOpenEvent",
            Self::KeyCollected { .. } => "KeyCollectedEvent",
            Self::UpdateTiles(_) => "UpdateTilesEvent",
            Self::SpawnSpike(_) => "SpawnSpikeEvent",
            Self::EndGame { .. } => "EndGameEvent",
        }
    }
}

// ---------------------------------------------------------------------------
// ServerEvent
// ---------------------------------------------------------------------------

/// Anything pushed to a participant's connection.
///
/// Untagged: the inner event already carries its `name`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ServerEvent {
    Lobby(LobbyEvent),
    Game(GameEvent),
}

impl ServerEvent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Lobby(e) => match e {
                LobbyEvent::Joined { .. } => "ClientJoinedEvent",
                LobbyEvent::ParticipantJoined { .. } => "ClientBroadCastJoinedEvent",
                LobbyEvent::ParticipantLeft { .. } => "ClientLeftEvent",
                LobbyEvent::RoomCreated { .. } => "ClientCreatedRoomEvent",
                LobbyEvent::RoomJoined { .. } => "RoomJoinedEvent",
                LobbyEvent::RoomUpdated { .. } => "RoomInListUpdatedEvent",
                LobbyEvent::RoomRemoved { .. } => "RoomInListRemovedEvent",
                LobbyEvent::Error { .. } => "ClientCommandError",
            },
            Self::Game(e) => e.name(),
        }
    }
}

impl From<LobbyEvent> for ServerEvent {
    fn from(event: LobbyEvent) -> Self {
        Self::Lobby(event)
    }
}

impl From<GameEvent> for ServerEvent {
    fn from(event: GameEvent) -> Self {
        Self::Game(event)
    }
}
