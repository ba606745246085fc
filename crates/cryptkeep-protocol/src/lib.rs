//! Wire protocol for Cryptkeep.
//!
//! This crate defines what clients and the server say to each other:
//!
//! - **Identities** ([`ParticipantId`], [`RoomId`], [`MonsterId`],
//!   [`ObjectId`]) and addressing ([`Recipient`]).
//! - **Commands**: the inbound envelope [`RawCommand`]
//!   (`{type, subType, data}`) and the closed per-scope command types it
//!   classifies into ([`LobbyCommand`], [`RoomCommand`], [`GameCommand`]).
//! - **Events**: outbound records ([`LobbyEvent`], [`GameEvent`]) sent as
//!   `{name, data}`.
//! - **Participants** ([`ParticipantHandle`]): an id, a nickname and a
//!   channel that events are pushed into.
//! - **Codec** ([`Codec`], [`JsonCodec`]): bytes in, bytes out.
//!
//! ```text
//! Transport (text frames) → RawCommand → Command::{Lobby, Room, Game}
//! Game / Registry → ServerEvent → ParticipantHandle → Transport
//! ```

mod codec;
mod command;
mod error;
mod event;
mod ids;
mod participant;
mod snapshot;

pub use codec::{Codec, JsonCodec};
pub use command::{
    AttackCommand, Command, CommandScope, GameCommand, HitMonsterCommand, HitPlayerCommand,
    LobbyCommand, MatchSettings, MoveCommand, RawCommand, RoomCommand,
};
pub use error::ProtocolError;
pub use event::{
    ErrorCode, GameEvent, InitialGameData, LobbyEvent, ParticipantSummary, RoomSummary,
    ServerEvent, SpikeSpawn, TileBatch, TileUpdate,
};
pub use ids::{Direction, MonsterId, ObjectId, ParticipantId, Recipient, RoomId};
pub use participant::{EventReceiver, EventSender, ParticipantHandle};
pub use snapshot::{
    MonsterKind, MonsterPosition, MonsterStats, ObjectKind, ObjectSnapshot, ObjectState,
    PlayerClass, PlayerPosition, PlayerStats,
};
