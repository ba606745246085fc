//! Runs the dungeon engine behind the registry's game seam.

use std::sync::Arc;

use cryptkeep_game::{Game, GameConfig};
use cryptkeep_lobby::{GameEndSignal, GameFactory, RoomGame};
use cryptkeep_map::GameMap;
use cryptkeep_protocol::{GameCommand, ParticipantHandle, ParticipantId, RoomId};

/// Starts one [`Game`] per room, all on the same level.
pub struct DungeonGameFactory {
    map: Arc<GameMap>,
    config: GameConfig,
}

impl DungeonGameFactory {
    pub fn new(map: Arc<GameMap>, config: GameConfig) -> Self {
        Self { map, config }
    }
}

impl GameFactory for DungeonGameFactory {
    type Game = DungeonGame;

    fn start(
        &self,
        room_id: RoomId,
        participants: Vec<ParticipantHandle>,
        on_end: GameEndSignal,
    ) -> DungeonGame {
        let game = Game::start(
            room_id,
            Arc::clone(&self.map),
            self.config.clone(),
            participants,
            move |winner| on_end.fire(winner),
        );
        DungeonGame(game)
    }
}

/// A room's running engine.
pub struct DungeonGame(Game);

impl DungeonGame {
    pub fn game(&self) -> &Game {
        &self.0
    }
}

impl RoomGame for DungeonGame {
    async fn dispatch(&self, sender: ParticipantId, command: GameCommand) {
        self.0.dispatch(sender, command).await;
    }

    async fn add_participant(&self, participant: ParticipantHandle) {
        self.0.add_participant(participant).await;
    }

    async fn remove_participant(&self, id: ParticipantId) {
        self.0.remove_participant(id).await;
    }

    async fn stop(&self) {
        self.0.stop().await;
    }
}
