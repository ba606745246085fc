//! Authoritative dungeon simulation for Cryptkeep.
//!
//! One [`Game`] runs per room. It owns players, monsters and interactive
//! objects, and is advanced from two directions:
//!
//! - **Commands** dispatched by the registry ([`Game::dispatch`]): movement,
//!   the three player attacks, and client-reported hits.
//! - **Periodic tasks**, each on its own [`cryptkeep_tick::TickScheduler`]:
//!   sparse positions (60 Hz), full stats (3 Hz), monster AI (5 Hz) and
//!   objects (10 Hz).
//!
//! ```text
//! dispatch / tick / deferred effect
//!        │
//!        ▼
//!   Mutex<GameState> ── transition ──► outbox ──► ParticipantHandle::send
//!        │                                      (after the lock is released)
//!        └── boss dead / nobody alive ──► EndGame + end callback
//! ```
//!
//! [`GameState`] holds the rules and is fully synchronous, so it can be
//! driven directly in tests with explicit instants.

mod ai;
mod combat;
mod config;
mod engine;
mod entity;
mod objects;
mod state;

pub use combat::capsule_contains;
pub use config::GameConfig;
pub use engine::{EndCallback, Game, GameStatus};
pub use entity::{AttackKind, AttackWindow, GameObject, Monster, Player, WindowPhase, WindowTiming};
pub use objects::BOSS_SPAWN;
pub use state::{ArrowShot, GameState, Outcome, PLAYER_SPAWN, SwordStrike};
