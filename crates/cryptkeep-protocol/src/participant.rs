//! The handle through which events reach a connected participant.

use std::sync::Arc;

use tokio::sync::mpsc;

use crate::{ParticipantId, ParticipantSummary, ServerEvent};

/// Sending half of a participant's event queue. Events are shared, so one
/// broadcast allocates once no matter how many participants receive it.
pub type EventSender = mpsc::UnboundedSender<Arc<ServerEvent>>;

/// Receiving half, drained by the connection's write loop.
pub type EventReceiver = mpsc::UnboundedReceiver<Arc<ServerEvent>>;

/// A participant as seen by rooms and games: an id, a display name and an
/// event queue. The registry owns the canonical entry; everyone else holds
/// clones.
#[derive(Debug, Clone)]
pub struct ParticipantHandle {
    id: ParticipantId,
    nickname: String,
    sender: EventSender,
}

impl ParticipantHandle {
    pub fn new(id: ParticipantId, nickname: impl Into<String>, sender: EventSender) -> Self {
        Self {
            id,
            nickname: nickname.into(),
            sender,
        }
    }

    pub fn id(&self) -> ParticipantId {
        self.id
    }

    pub fn nickname(&self) -> &str {
        &self.nickname
    }

    pub fn set_nickname(&mut self, nickname: impl Into<String>) {
        self.nickname = nickname.into();
    }

    pub fn summary(&self) -> ParticipantSummary {
        ParticipantSummary {
            id: self.id,
            nickname: self.nickname.clone(),
        }
    }

    /// Queues an event. Returns `false` if the connection is gone; callers
    /// ignore that, the registry cleans up on deregistration.
    pub fn send(&self, event: Arc<ServerEvent>) -> bool {
        self.sender.send(event).is_ok()
    }

    /// Whether the connection's write loop has gone away.
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::LobbyEvent;

    #[test]
    fn test_send_reports_closed_receiver() {
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = ParticipantHandle::new(ParticipantId(1), "ada", tx);
        let event = Arc::new(ServerEvent::from(LobbyEvent::ParticipantLeft {
            id: ParticipantId(2),
        }));
        assert!(handle.send(event.clone()));
        drop(rx);
        assert!(!handle.send(event));
        assert!(handle.is_closed());
    }
}
