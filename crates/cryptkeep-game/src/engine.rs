//! The running game: shared state, periodic tasks and deferred effects.
//!
//! A [`Game`] is a cheap handle. Commands, the four periodic tasks and the
//! deferred attack resolutions all go through one transition path:
//!
//! 1. bail out if the game has ended,
//! 2. lock the state and apply one synchronous [`GameState`] transition,
//! 3. settle the outcome while still holding the lock,
//! 4. release the lock, then push the queued events to their recipients.
//!
//! Lock order is always state, then status. Events are never sent with the
//! state lock held.

use std::sync::{Arc, Weak};
use std::time::Duration;

use cryptkeep_map::GameMap;
use cryptkeep_protocol::{
    GameCommand, GameEvent, ParticipantHandle, ParticipantId, Recipient, RoomId, ServerEvent,
};
use cryptkeep_tick::{TickConfig, TickScheduler};
use tokio::sync::{Mutex, RwLock};
use tokio::time::Instant;
use tracing::{debug, info, trace};

use crate::{GameConfig, GameState};

/// Called once when the game ends on its own, with the winner if any.
pub type EndCallback = Box<dyn FnOnce(Option<ParticipantId>) + Send + 'static>;

/// One-way lifecycle of a game.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameStatus {
    Started,
    Ended,
}

struct Shared {
    room_id: RoomId,
    config: Arc<GameConfig>,
    state: Mutex<GameState>,
    status: RwLock<GameStatus>,
    on_end: std::sync::Mutex<Option<EndCallback>>,
}

type Delivery = (ParticipantHandle, Arc<ServerEvent>);

/// Handle to a running game. Clones share the same game.
#[derive(Clone)]
pub struct Game {
    shared: Arc<Shared>,
}

impl Game {
    /// Builds the world, sends every participant its join confirmation and
    /// starts the periodic tasks. Must be called inside a Tokio runtime.
    pub fn start(
        room_id: RoomId,
        map: Arc<GameMap>,
        config: GameConfig,
        participants: Vec<ParticipantHandle>,
        on_end: impl FnOnce(Option<ParticipantId>) + Send + 'static,
    ) -> Self {
        let config = Arc::new(config);
        let mut state = GameState::new(map, Arc::clone(&config), participants);
        let initial = state.take_outbox();
        for (handle, event) in deliveries(&state, initial) {
            handle.send(event);
        }

        let game = Self {
            shared: Arc::new(Shared {
                room_id,
                config,
                state: Mutex::new(state),
                status: RwLock::new(GameStatus::Started),
                on_end: std::sync::Mutex::new(Some(Box::new(on_end))),
            }),
        };

        let c = &game.shared.config;
        game.spawn_periodic("positions", c.positions_period, |s, _| {
            s.broadcast_positions()
        });
        game.spawn_periodic("stats", c.stats_period, |s, _| s.broadcast_stats());
        game.spawn_periodic("ai", c.ai_period, |s, now| s.run_ai(now));
        game.spawn_periodic("objects", c.objects_period, |s, _| s.tick_objects());

        info!(%room_id, "game started");
        game
    }

    pub fn room_id(&self) -> RoomId {
        self.shared.room_id
    }

    pub async fn status(&self) -> GameStatus {
        *self.shared.status.read().await
    }

    pub async fn is_ended(&self) -> bool {
        self.status().await == GameStatus::Ended
    }

    /// Applies one command from `sender`. Ignored once the game has ended.
    pub async fn dispatch(&self, sender: ParticipantId, command: GameCommand) {
        trace!(room_id = %self.shared.room_id, %sender, command = command.name(), "game command");
        match command {
            GameCommand::Move(cmd) => {
                self.transition(move |s, _| s.move_player(sender, cmd)).await;
            }
            GameCommand::CastFireball(cmd) => {
                self.transition(move |s, now| s.cast_fireball(sender, cmd, now))
                    .await;
            }
            GameCommand::SwordAttack(cmd) => {
                let strike = self
                    .transition(move |s, now| s.begin_sword(sender, cmd, now))
                    .await
                    .flatten();
                if let Some(strike) = strike {
                    self.defer(self.shared.config.sword_delay, move |s, _| {
                        s.resolve_sword(strike)
                    });
                }
            }
            GameCommand::ShootArrow(cmd) => {
                let shot = self
                    .transition(move |s, now| s.begin_arrow(sender, cmd, now))
                    .await
                    .flatten();
                if let Some(shot) = shot {
                    self.defer(self.shared.config.arrow_delay, move |s, _| {
                        s.resolve_arrow(shot)
                    });
                }
            }
            GameCommand::HitPlayer(cmd) => {
                self.transition(move |s, _| s.hit_player(cmd)).await;
            }
            GameCommand::HitMonster(cmd) => {
                self.transition(move |s, _| s.hit_monster(sender, cmd)).await;
            }
        }
    }

    /// Adds a participant to a game in progress.
    pub async fn add_participant(&self, participant: ParticipantHandle) {
        self.transition(move |s, _| s.add_player(participant)).await;
    }

    /// Kills and removes a departing participant's player.
    pub async fn remove_participant(&self, id: ParticipantId) {
        self.transition(move |s, _| s.remove_player(id)).await;
    }

    /// Ends the game without an end event or callback. Periodic tasks stop
    /// at their next tick.
    pub async fn stop(&self) {
        *self.shared.status.write().await = GameStatus::Ended;
        debug!(room_id = %self.shared.room_id, "game stopped");
    }

    /// Runs `f` against the current state under the lock.
    pub async fn inspect<R>(&self, f: impl FnOnce(&GameState) -> R) -> R {
        f(&*self.shared.state.lock().await)
    }

    /// The single path every state change goes through. Returns `None` if the
    /// game had already ended.
    async fn transition<R, F>(&self, f: F) -> Option<R>
    where
        F: FnOnce(&mut GameState, Instant) -> R + Send,
        R: Send,
    {
        if self.is_ended().await {
            return None;
        }

        let mut state = self.shared.state.lock().await;
        if *self.shared.status.read().await == GameStatus::Ended {
            return None;
        }
        let result = f(&mut *state, Instant::now());

        let outcome = state.take_outcome();
        if let Some(outcome) = outcome {
            state.outbox.push((
                Recipient::All,
                GameEvent::EndGame {
                    winner_player_id: outcome.winner,
                },
            ));
            *self.shared.status.write().await = GameStatus::Ended;
        }
        let events = state.take_outbox();
        let batch = deliveries(&state, events);
        drop(state);

        for (handle, event) in batch {
            handle.send(event);
        }

        if let Some(outcome) = outcome {
            info!(room_id = %self.shared.room_id, winner = ?outcome.winner, "game ended");
            let callback = self.shared.on_end.lock().ok().and_then(|mut cb| cb.take());
            if let Some(callback) = callback {
                callback(outcome.winner);
            }
        }
        Some(result)
    }

    /// Applies `f` after `delay`, unless the game has ended by then.
    fn defer(&self, delay: Duration, f: impl FnOnce(&mut GameState, Instant) + Send + 'static) {
        let game = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            game.transition(f).await;
        });
    }

    /// Spawns a task that applies `tick` every `period` until the game ends
    /// or every handle is dropped.
    fn spawn_periodic(
        &self,
        label: &'static str,
        period: Duration,
        tick: fn(&mut GameState, Instant),
    ) {
        let weak: Weak<Shared> = Arc::downgrade(&self.shared);
        let mut ticks = TickScheduler::new(
            TickConfig::every(label, period).with_jitter(self.shared.config.tick_jitter),
        );
        tokio::spawn(async move {
            loop {
                ticks.wait_for_tick().await;
                let Some(shared) = weak.upgrade() else {
                    break;
                };
                let game = Game { shared };
                if game.transition(tick).await.is_none() {
                    break;
                }
                ticks.record_tick_end();
            }
            debug!(label, ticks = ticks.tick_count(), "periodic task stopped");
        });
    }
}

/// Fans queued events out to the players they address.
fn deliveries(state: &GameState, events: Vec<(Recipient, GameEvent)>) -> Vec<Delivery> {
    let mut batch = Vec::new();
    for (recipient, event) in events {
        let event = Arc::new(ServerEvent::Game(event));
        for player in state.players() {
            if recipient.includes(player.id()) {
                batch.push((player.participant.clone(), Arc::clone(&event)));
            }
        }
    }
    batch
}
