//! Matchmaking policies.
//!
//! A policy only decides where a participant should go. The registry
//! carries the decision out and reports back what it created, so a policy
//! never touches rooms directly.

use std::collections::BTreeMap;

use cryptkeep_protocol::{MatchSettings, ParticipantId, RoomId};
use tracing::debug;

/// Where a match request should land.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchTarget {
    /// Join this existing room.
    Join(RoomId),
    /// Create a new room owned by the requester.
    Create,
}

/// Decides which room a participant requesting a match should join.
pub trait MatchMaker: Send + 'static {
    fn find_room(&mut self, participant: ParticipantId, settings: &MatchSettings) -> MatchTarget;

    /// The registry created `room` for a [`MatchTarget::Create`] decision.
    fn on_room_created(&mut self, _room: RoomId, _settings: &MatchSettings) {}

    /// The participant disconnected. Policies with queues drop it here.
    fn cancel(&mut self, _participant: ParticipantId) {}

    /// The room emptied and was removed.
    fn on_room_removed(&mut self, _room: RoomId) {}
}

/// Settings key naming the room to meet in.
pub const ROOM_NAME_KEY: &str = "roomName";

/// Groups participants by room name: the first request for a name creates
/// the room, later ones join it.
#[derive(Debug)]
pub struct NamedRoomMatchMaker {
    default_name: String,
    rooms: BTreeMap<String, RoomId>,
}

impl NamedRoomMatchMaker {
    pub fn new(default_name: impl Into<String>) -> Self {
        Self {
            default_name: default_name.into(),
            rooms: BTreeMap::new(),
        }
    }

    fn room_name<'a>(&'a self, settings: &'a MatchSettings) -> &'a str {
        settings
            .get(ROOM_NAME_KEY)
            .and_then(|v| v.as_str())
            .unwrap_or(self.default_name.as_str())
    }

    /// The room currently bound to `name`.
    pub fn room_for(&self, name: &str) -> Option<RoomId> {
        self.rooms.get(name).copied()
    }
}

impl Default for NamedRoomMatchMaker {
    fn default() -> Self {
        Self::new("default")
    }
}

impl MatchMaker for NamedRoomMatchMaker {
    fn find_room(&mut self, participant: ParticipantId, settings: &MatchSettings) -> MatchTarget {
        let name = self.room_name(settings);
        match self.rooms.get(name) {
            Some(room) => {
                debug!(%participant, name, %room, "matched to named room");
                MatchTarget::Join(*room)
            }
            None => MatchTarget::Create,
        }
    }

    fn on_room_created(&mut self, room: RoomId, settings: &MatchSettings) {
        let name = self.room_name(settings).to_string();
        debug!(name = %name, %room, "named room bound");
        self.rooms.insert(name, room);
    }

    fn on_room_removed(&mut self, room: RoomId) {
        self.rooms.retain(|_, r| *r != room);
    }
}
