//! Per-connection handler.
//!
//! Each accepted connection gets its own Tokio task running this handler:
//!   1. Register with the registry → participant id + event queue
//!   2. Spawn the write loop: event queue → codec → writer
//!   3. Read loop: frame → `RawCommand` → classified `Command` → registry
//!
//! Undecodable frames and unknown subtypes are logged and dropped. When the
//! read loop ends the participant is unregistered, which drops the
//! registry's end of the event queue and lets the write loop finish.

use cryptkeep_lobby::RegistryHandle;
use cryptkeep_protocol::{Codec, EventReceiver, ParticipantId, RawCommand};
use cryptkeep_transport::{
    Connection, FrameReader, FrameWriter, WebSocketConnection, WebSocketReader, WebSocketWriter,
};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::CryptkeepError;

/// Unregisters the participant when the handler exits, even by panic.
/// `Drop` is synchronous, so the unregister is sent from a spawned task.
struct RegistrationGuard {
    participant: ParticipantId,
    registry: RegistryHandle,
}

impl Drop for RegistrationGuard {
    fn drop(&mut self) {
        let participant = self.participant;
        let registry = self.registry.clone();
        tokio::spawn(async move {
            let _ = registry.unregister(participant).await;
        });
    }
}

/// Handles a single connection from accept to close.
pub(crate) async fn handle_connection<C>(
    conn: WebSocketConnection,
    registry: RegistryHandle,
    codec: C,
) -> Result<(), CryptkeepError>
where
    C: Codec + Clone,
{
    let conn_id = conn.id();
    let peer = conn.peer_addr();
    let (mut reader, writer) = conn.split();

    let (events_tx, events_rx) = mpsc::unbounded_channel();
    let participant = registry.register(events_tx).await?;
    let _guard = RegistrationGuard {
        participant,
        registry: registry.clone(),
    };
    info!(%conn_id, %peer, participant_id = %participant, "participant connected");

    tokio::spawn(write_loop(writer, events_rx, codec.clone(), participant));

    read_loop(&mut reader, &registry, &codec, participant).await?;

    info!(participant_id = %participant, "participant disconnected");
    Ok(())
}

async fn read_loop<C: Codec>(
    reader: &mut WebSocketReader,
    registry: &RegistryHandle,
    codec: &C,
    participant: ParticipantId,
) -> Result<(), CryptkeepError> {
    loop {
        let frame = match reader.recv().await {
            Ok(Some(frame)) => frame,
            Ok(None) => {
                debug!(participant_id = %participant, "connection closed cleanly");
                return Ok(());
            }
            Err(e) => {
                debug!(participant_id = %participant, error = %e, "recv error");
                return Ok(());
            }
        };

        let raw: RawCommand = match codec.decode(&frame) {
            Ok(raw) => raw,
            Err(e) => {
                debug!(participant_id = %participant, error = %e, "failed to decode command");
                continue;
            }
        };

        let subtype = raw.subtype.clone();
        match raw.classify() {
            Ok(Some(command)) => registry.command(participant, command).await?,
            Ok(None) => debug!(participant_id = %participant, subtype, "unknown command ignored"),
            Err(e) => debug!(participant_id = %participant, error = %e, "invalid command payload"),
        }
    }
}

/// Drains the participant's event queue into the connection. Ends when the
/// queue closes or the peer stops accepting frames.
async fn write_loop<C: Codec>(
    mut writer: WebSocketWriter,
    mut events: EventReceiver,
    codec: C,
    participant: ParticipantId,
) {
    while let Some(event) = events.recv().await {
        let frame = match codec.encode(event.as_ref()) {
            Ok(frame) => frame,
            Err(e) => {
                warn!(participant_id = %participant, event = event.name(), error = %e, "failed to encode event");
                continue;
            }
        };
        if let Err(e) = writer.send(frame).await {
            debug!(participant_id = %participant, error = %e, "send failed, stopping writer");
            return;
        }
    }
    let _ = writer.close().await;
}
