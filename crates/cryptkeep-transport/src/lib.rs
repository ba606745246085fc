//! Connection transports for Cryptkeep.
//!
//! A [`Transport`] accepts [`Connection`]s. A connection is split once into
//! a [`FrameReader`] and a [`FrameWriter`] so the connection handler can
//! read commands and push events from two tasks without sharing a lock.
//!
//! # Feature Flags
//!
//! - `websocket` (default): WebSocket transport via `tokio-tungstenite`

#![allow(async_fn_in_trait)]

mod error;
#[cfg(feature = "websocket")]
mod websocket;

pub use error::TransportError;
#[cfg(feature = "websocket")]
pub use websocket::{WebSocketConnection, WebSocketReader, WebSocketTransport, WebSocketWriter};

use std::fmt;
use std::net::SocketAddr;

/// Identifies a connection in logs. Unrelated to participant ids, which the
/// registry assigns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn into_inner(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Accepts incoming connections.
pub trait Transport: Send + 'static {
    type Connection: Connection;
    type Error: std::error::Error + Send + Sync;

    /// Waits for the next connection and completes its handshake.
    async fn accept(&mut self) -> Result<Self::Connection, Self::Error>;

    /// The address the transport is listening on.
    fn local_addr(&self) -> Result<SocketAddr, Self::Error>;
}

/// An accepted connection, before it is split.
pub trait Connection: Send + 'static {
    type Reader: FrameReader;
    type Writer: FrameWriter;

    fn id(&self) -> ConnectionId;

    fn peer_addr(&self) -> SocketAddr;

    /// Splits the connection into independently owned halves.
    fn split(self) -> (Self::Reader, Self::Writer);
}

/// The inbound half of a connection.
pub trait FrameReader: Send + 'static {
    type Error: std::error::Error + Send + Sync;

    /// Receives the next data frame. Control frames are skipped.
    ///
    /// Returns `Ok(None)` when the peer closed the connection.
    async fn recv(&mut self) -> Result<Option<Vec<u8>>, Self::Error>;
}

/// The outbound half of a connection.
pub trait FrameWriter: Send + 'static {
    type Error: std::error::Error + Send + Sync;

    /// Sends one frame. UTF-8 frames go out as text.
    async fn send(&mut self, frame: Vec<u8>) -> Result<(), Self::Error>;

    /// Sends a close frame.
    async fn close(&mut self) -> Result<(), Self::Error>;
}
