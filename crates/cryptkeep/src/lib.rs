//! # Cryptkeep
//!
//! Real-time multiplayer dungeon-crawler server.
//!
//! Browsers connect over WebSocket and send `{type, subType, data}`
//! commands. Lobby and room commands are applied by the registry actor;
//! game commands reach the room's running engine. Events flow back to each
//! participant through its own queue.
//!
//! ```text
//! WebSocket ─► handler ─► RegistryHandle ─► registry actor ─► DungeonGame
//!     ▲                                            │               │
//!     └──────── write loop ◄── participant queue ◄─┴───────────────┘
//! ```

mod config;
mod error;
mod factory;
mod handler;
mod server;

pub use config::{DEFAULT_ADDR, DEFAULT_MAP, ServerConfig};
pub use error::CryptkeepError;
pub use factory::{DungeonGame, DungeonGameFactory};
pub use server::{CryptkeepServer, CryptkeepServerBuilder};
