//! `CryptkeepServer` builder and accept loop.
//!
//! Ties the layers together: transport → handler → registry → games.

use std::future::{Future, pending};
use std::net::SocketAddr;
use std::sync::Arc;

use cryptkeep_lobby::{NamedRoomMatchMaker, RegistryHandle, spawn_registry};
use cryptkeep_map::GameMap;
use cryptkeep_protocol::JsonCodec;
use cryptkeep_transport::{Transport, TransportError, WebSocketTransport};
use tracing::{debug, error, info};

use crate::factory::DungeonGameFactory;
use crate::handler::handle_connection;
use crate::{CryptkeepError, ServerConfig};

/// Builder for configuring and starting a Cryptkeep server.
///
/// ```rust,no_run
/// # async fn run() -> Result<(), cryptkeep::CryptkeepError> {
/// let server = cryptkeep::CryptkeepServer::builder()
///     .bind("0.0.0.0:9001")
///     .build()
///     .await?;
/// server.run().await
/// # }
/// ```
pub struct CryptkeepServerBuilder {
    config: ServerConfig,
    map: Option<Arc<GameMap>>,
}

impl CryptkeepServerBuilder {
    pub fn new() -> Self {
        Self::from_config(ServerConfig::default())
    }

    pub fn from_config(config: ServerConfig) -> Self {
        Self { config, map: None }
    }

    pub fn bind(mut self, addr: &str) -> Self {
        self.config.addr = addr.to_string();
        self
    }

    /// Uses an already loaded level instead of reading `map_path`.
    pub fn map(mut self, map: Arc<GameMap>) -> Self {
        self.map = Some(map);
        self
    }

    /// Loads the level, binds the listener and starts the registry.
    ///
    /// # Errors
    /// Fails if the level cannot be loaded or the address cannot be bound.
    pub async fn build(self) -> Result<CryptkeepServer, CryptkeepError> {
        let Self { config, map } = self;
        let map = match map {
            Some(map) => map,
            None => Arc::new(GameMap::load(&config.map_path)?),
        };

        let transport = WebSocketTransport::bind(&config.addr).await?;
        let factory = DungeonGameFactory::new(map, config.game);
        let matchmaker = NamedRoomMatchMaker::new(config.lobby.default_match_room.clone());
        let registry = spawn_registry(config.lobby, factory, matchmaker);

        Ok(CryptkeepServer {
            transport,
            registry,
            codec: JsonCodec,
        })
    }
}

impl Default for CryptkeepServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A bound Cryptkeep server. Call [`run`](Self::run) to accept connections.
pub struct CryptkeepServer {
    transport: WebSocketTransport,
    registry: RegistryHandle,
    codec: JsonCodec,
}

impl CryptkeepServer {
    pub fn builder() -> CryptkeepServerBuilder {
        CryptkeepServerBuilder::new()
    }

    pub fn local_addr(&self) -> Result<SocketAddr, CryptkeepError> {
        Ok(self.transport.local_addr()?)
    }

    pub fn registry(&self) -> &RegistryHandle {
        &self.registry
    }

    /// Accepts connections until the process is terminated.
    pub async fn run(self) -> Result<(), CryptkeepError> {
        self.run_until(pending()).await
    }

    /// Accepts connections until `shutdown` completes, then stops the
    /// registry and every running game.
    pub async fn run_until(mut self, shutdown: impl Future<Output = ()>) -> Result<(), CryptkeepError> {
        info!("cryptkeep server running");
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                () = &mut shutdown => break,
                accepted = self.transport.accept() => match accepted {
                    Ok(conn) => {
                        let registry = self.registry.clone();
                        let codec = self.codec;
                        tokio::spawn(async move {
                            if let Err(e) = handle_connection(conn, registry, codec).await {
                                debug!(error = %e, "connection ended with error");
                            }
                        });
                    }
                    Err(TransportError::HandshakeFailed(reason)) => {
                        debug!(%reason, "WebSocket handshake failed");
                    }
                    Err(e) => error!(error = %e, "accept failed"),
                },
            }
        }

        info!("cryptkeep server shutting down");
        self.registry.shutdown().await?;
        Ok(())
    }
}
