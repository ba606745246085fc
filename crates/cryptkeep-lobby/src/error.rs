//! Error types for the registry.

use cryptkeep_protocol::{ErrorCode, ParticipantId, RoomId};

/// Errors that can occur during registry operations.
#[derive(Debug, thiserror::Error)]
pub enum LobbyError {
    /// A participant may own one room at a time.
    #[error("participant {0} already owns a room")]
    RoomAlreadyExists(ParticipantId),

    #[error("room {0} not found")]
    RoomNotFound(RoomId),

    #[error("room {0} is full")]
    RoomFull(RoomId),

    #[error("participant {0} is not in a room")]
    NotInRoom(ParticipantId),

    #[error("participant {0} is not registered")]
    UnknownParticipant(ParticipantId),

    /// The registry's command channel is full or closed.
    #[error("registry is unavailable")]
    Unavailable,
}

impl LobbyError {
    /// The code reported back to the participant, for policy violations.
    /// Other errors are only logged.
    pub fn code(&self) -> Option<ErrorCode> {
        match self {
            Self::RoomAlreadyExists(_) => Some(ErrorCode::RoomAlreadyExists),
            Self::RoomNotFound(_) => Some(ErrorCode::RoomDoesNotExist),
            Self::RoomFull(_) => Some(ErrorCode::RoomFull),
            Self::NotInRoom(_) | Self::UnknownParticipant(_) | Self::Unavailable => None,
        }
    }
}
