//! Participant and room registry for Cryptkeep.
//!
//! A single actor task owns every participant and room. Transports talk to
//! it through a [`RegistryHandle`]; rooms talk to their games through the
//! [`RoomGame`] seam, so this crate does not depend on the simulation.
//!
//! # Key types
//!
//! - [`spawn_registry`]: starts the actor
//! - [`RegistryHandle`]: register, unregister, route commands, snapshot
//! - [`GameFactory`] / [`RoomGame`]: how rooms start and drive games
//! - [`GameEndSignal`]: how a game reports that it ended
//! - [`MatchMaker`]: where a match request lands ([`NamedRoomMatchMaker`])
//! - [`LobbyConfig`]: room size limits and channel capacity

mod config;
mod error;
mod game;
mod matchmaking;
mod registry;
mod room;

pub use config::LobbyConfig;
pub use error::LobbyError;
pub use game::{GameEndSignal, GameFactory, RoomGame};
pub use matchmaking::{MatchMaker, MatchTarget, NamedRoomMatchMaker, ROOM_NAME_KEY};
pub use registry::{RegistryHandle, RegistrySnapshot, spawn_registry};
