//! Server settings, read from the environment.
//!
//! | variable           | default              |
//! |--------------------|----------------------|
//! | `CRYPTKEEP_ADDR`   | `127.0.0.1:9001`     |
//! | `CRYPTKEEP_MAP`    | `assets/dungeon.tmj` |
//! | `CRYPTKEEP_SEED`   | unset (OS entropy)   |
//!
//! Engine and registry tunables keep their defaults; embedders that need
//! different values build a [`ServerConfig`] directly.

use std::net::SocketAddr;
use std::path::PathBuf;

use cryptkeep_game::GameConfig;
use cryptkeep_lobby::LobbyConfig;
use tracing::warn;

pub const DEFAULT_ADDR: &str = "127.0.0.1:9001";
pub const DEFAULT_MAP: &str = "assets/dungeon.tmj";

#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address the WebSocket listener binds to.
    pub addr: String,
    /// Tiled JSON level every room plays on.
    pub map_path: PathBuf,
    pub game: GameConfig,
    pub lobby: LobbyConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: DEFAULT_ADDR.to_string(),
            map_path: PathBuf::from(DEFAULT_MAP),
            game: GameConfig::default(),
            lobby: LobbyConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Reads the process environment. Invalid values are logged and replaced
    /// by their defaults.
    pub fn load_or_default() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Like [`load_or_default`](Self::load_or_default), reading variables
    /// through `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(addr) = lookup("CRYPTKEEP_ADDR") {
            match addr.parse::<SocketAddr>() {
                Ok(_) => config.addr = addr,
                Err(e) => warn!(value = %addr, error = %e, "invalid CRYPTKEEP_ADDR, using {DEFAULT_ADDR}"),
            }
        }

        if let Some(path) = lookup("CRYPTKEEP_MAP") {
            if path.trim().is_empty() {
                warn!("empty CRYPTKEEP_MAP, using {DEFAULT_MAP}");
            } else {
                config.map_path = PathBuf::from(path);
            }
        }

        if let Some(seed) = lookup("CRYPTKEEP_SEED") {
            match seed.parse::<u64>() {
                Ok(seed) => config.game.seed = Some(seed),
                Err(e) => warn!(value = %seed, error = %e, "invalid CRYPTKEEP_SEED, ignoring"),
            }
        }

        config
    }
}
