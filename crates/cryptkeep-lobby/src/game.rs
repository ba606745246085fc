//! The seam between rooms and the simulation.
//!
//! The registry never looks inside a game. It starts one through a
//! [`GameFactory`], forwards commands and membership changes through
//! [`RoomGame`], and learns that a game is over through the
//! [`GameEndSignal`] it handed to the factory.

use std::future::Future;

use cryptkeep_protocol::{GameCommand, ParticipantHandle, ParticipantId, RoomId};
use tokio::sync::mpsc;

/// A running game as seen from its room.
///
/// Calls arrive from the registry in command order. Each returns once the
/// game has applied the change.
pub trait RoomGame: Send + Sync + 'static {
    /// Applies one game-scope command from a member.
    fn dispatch(
        &self,
        sender: ParticipantId,
        command: GameCommand,
    ) -> impl Future<Output = ()> + Send;

    /// A participant joined the room while the game is running.
    fn add_participant(&self, participant: ParticipantHandle) -> impl Future<Output = ()> + Send;

    /// A participant left the room or disconnected.
    fn remove_participant(&self, id: ParticipantId) -> impl Future<Output = ()> + Send;

    /// The room is going away. The game must stop without signalling its end.
    fn stop(&self) -> impl Future<Output = ()> + Send;
}

/// Builds games for rooms.
pub trait GameFactory: Send + 'static {
    type Game: RoomGame;

    /// Starts a game for `participants`. The game fires `on_end` once when
    /// it ends on its own.
    fn start(
        &self,
        room_id: RoomId,
        participants: Vec<ParticipantHandle>,
        on_end: GameEndSignal,
    ) -> Self::Game;
}

/// Notification that a room's game ended.
#[derive(Debug)]
pub(crate) struct GameEnded {
    pub room_id: RoomId,
    /// Distinguishes successive games of the same room.
    pub generation: u64,
    pub winner: Option<ParticipantId>,
}

/// One-shot handle a game uses to tell the registry it has ended.
///
/// Firing never blocks, so it is safe from inside the game's own locks.
#[derive(Debug)]
pub struct GameEndSignal {
    room_id: RoomId,
    generation: u64,
    sender: mpsc::UnboundedSender<GameEnded>,
}

impl GameEndSignal {
    pub(crate) fn new(
        room_id: RoomId,
        generation: u64,
        sender: mpsc::UnboundedSender<GameEnded>,
    ) -> Self {
        Self {
            room_id,
            generation,
            sender,
        }
    }

    pub fn room_id(&self) -> RoomId {
        self.room_id
    }

    /// Reports the end of the game. Dropped silently if the registry has
    /// shut down.
    pub fn fire(self, winner: Option<ParticipantId>) {
        let _ = self.sender.send(GameEnded {
            room_id: self.room_id,
            generation: self.generation,
            winner,
        });
    }
}
