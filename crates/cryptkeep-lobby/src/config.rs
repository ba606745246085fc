//! Registry settings.

use serde::{Deserialize, Serialize};

/// Limits and sizes for the registry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LobbyConfig {
    /// Members a room needs before a game can start in it.
    pub min_members_to_start: usize,

    /// Maximum members in one room.
    pub max_members: usize,

    /// Capacity of the registry's command channel. Senders wait when it
    /// is full.
    pub channel_size: usize,

    /// Room name used by matchmaking requests that do not name one.
    pub default_match_room: String,
}

impl Default for LobbyConfig {
    fn default() -> Self {
        Self {
            min_members_to_start: 1,
            max_members: 20,
            channel_size: 256,
            default_match_room: "default".to_string(),
        }
    }
}
