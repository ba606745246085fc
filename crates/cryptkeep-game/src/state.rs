//! The mutable world of one game.
//!
//! [`GameState`] is plain data plus synchronous transitions. It never sends
//! anything: every transition appends `(Recipient, GameEvent)` pairs to an
//! outbox which the engine drains after releasing its lock.

use std::collections::BTreeMap;
use std::sync::Arc;

use cryptkeep_map::{GameMap, OBJECT_LAYER, Point, Rect, SPAWN_LAYER};
use cryptkeep_protocol::{
    AttackCommand, Direction, GameEvent, HitMonsterCommand, HitPlayerCommand, InitialGameData,
    MonsterId, MonsterKind, MoveCommand, ObjectId, ObjectKind, ParticipantHandle, ParticipantId,
    PlayerClass, Recipient, SpikeSpawn, TileBatch,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::ai::{AiContext, brain_for};
use crate::combat::{Outbox, capsule_contains, damage_monster, damage_player};
use crate::{AttackKind, GameConfig, GameObject, Monster, Player};

/// Spawn point name for players.
pub const PLAYER_SPAWN: &str = "player";

/// How a game ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Outcome {
    /// The participant who killed the boss, or `None` if nobody survived.
    pub winner: Option<ParticipantId>,
}

/// A melee swing waiting for its wind-up to pass.
#[derive(Debug, Clone, Copy)]
pub struct SwordStrike {
    pub attacker: ParticipantId,
    pub direction: Direction,
}

/// A bow shot waiting for its draw delay to pass.
#[derive(Debug, Clone, Copy)]
pub struct ArrowShot {
    pub shooter: ParticipantId,
    pub x: i32,
    pub y: i32,
    pub direction: Direction,
}

pub struct GameState {
    pub(crate) config: Arc<GameConfig>,
    pub(crate) map: Arc<GameMap>,
    pub(crate) players: BTreeMap<ParticipantId, Player>,
    pub(crate) monsters: Vec<Monster>,
    pub(crate) objects: BTreeMap<ObjectId, GameObject>,
    pub(crate) keys: BTreeMap<String, bool>,
    pub(crate) boss_spawned: bool,
    pub(crate) tile_history: Vec<TileBatch>,
    pub(crate) spike_history: Vec<SpikeSpawn>,
    rng: StdRng,
    pub(crate) outbox: Outbox,
    outcome: Option<Outcome>,
    outcome_reported: bool,
}

impl GameState {
    /// Populates monsters and objects from the map and spawns one player per
    /// participant. Each participant gets a join confirmation in the outbox.
    pub fn new(
        map: Arc<GameMap>,
        config: Arc<GameConfig>,
        participants: impl IntoIterator<Item = ParticipantHandle>,
    ) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        let mut keys: BTreeMap<String, bool> = config
            .tracked_keys
            .iter()
            .map(|k| (k.clone(), false))
            .collect();
        for key in &config.precollected_keys {
            keys.insert(key.clone(), true);
        }

        let mut state = Self {
            monsters: spawn_monsters(&map, &config),
            objects: spawn_objects(&map),
            config,
            map,
            players: BTreeMap::new(),
            keys,
            boss_spawned: false,
            tile_history: Vec::new(),
            spike_history: Vec::new(),
            rng,
            outbox: Outbox::new(),
            outcome: None,
            outcome_reported: false,
        };
        for participant in participants {
            state.add_player(participant);
        }
        info!(
            players = state.players.len(),
            monsters = state.monsters.len(),
            objects = state.objects.len(),
            "game state created"
        );
        state
    }

    // -----------------------------------------------------------------------
    // Membership
    // -----------------------------------------------------------------------

    /// Spawns a player for `participant` and queues its join confirmation,
    /// which replays tile updates and spikes already broadcast.
    pub fn add_player(&mut self, participant: ParticipantHandle) {
        let id = participant.id();
        if self.players.contains_key(&id) {
            debug!(participant = %id, "participant already in game");
            return;
        }
        let class = PlayerClass::ALL[self.rng.random_range(0..PlayerClass::ALL.len())];
        let color = format!("0x{:06x}", self.rng.random_range(0..=0x00FF_FFFFu32));
        let spawn = self
            .map
            .spawn_point(PLAYER_SPAWN)
            .unwrap_or(self.config.player_spawn);
        let player = Player::new(participant, class, color, self.config.class_hp(class), spawn);
        debug!(participant = %id, ?class, "player spawned");

        let data = self.initial_data(&player);
        self.players.insert(id, player);
        self.outbox.push((
            Recipient::Participant(id),
            GameEvent::JoinToStartedGame {
                game_data: Box::new(data),
            },
        ));
    }

    /// Kills the participant's player (one death event if alive) and removes
    /// it from the game.
    pub fn remove_player(&mut self, id: ParticipantId) {
        let Some(player) = self.players.get_mut(&id) else {
            return;
        };
        if player.is_alive() {
            player.hp = 0;
            self.outbox
                .push((Recipient::All, GameEvent::PlayerDeath { client_id: id }));
        }
        self.players.remove(&id);
        debug!(participant = %id, "player removed");
    }

    pub fn initial_data(&self, player: &Player) -> InitialGameData {
        InitialGameData {
            map_data: Arc::clone(self.map.tile_map()),
            game_objects: self
                .objects
                .iter()
                .map(|(id, o)| (*id, o.snapshot()))
                .collect(),
            player_data: player.stats(),
            keys_collected: self.keys.clone(),
            update_tiles_events: self.tile_history.clone(),
            spike_events: self.spike_history.clone(),
        }
    }

    // -----------------------------------------------------------------------
    // Commands
    // -----------------------------------------------------------------------

    /// Trusts the client's reported position.
    pub fn move_player(&mut self, id: ParticipantId, cmd: MoveCommand) {
        if let Some(p) = self.players.get_mut(&id) {
            p.x = cmd.x;
            p.y = cmd.y;
            p.direction = cmd.direction;
            p.moving = cmd.is_moving;
        }
    }

    pub fn cast_fireball(&mut self, id: ParticipantId, cmd: AttackCommand, now: Instant) {
        let cooldown = self.config.fireball_cooldown;
        let Some(p) = self.attacker(id, AttackKind::Fireball, cooldown, now) else {
            return;
        };
        let client_id = p.id();
        self.outbox.push((
            Recipient::All,
            GameEvent::Fireball {
                client_id,
                x: cmd.x,
                y: cmd.y,
                direction: cmd.direction,
            },
        ));
    }

    /// Broadcasts the wind-up of a sword swing. The caller resolves the
    /// returned strike after `sword_delay`.
    pub fn begin_sword(
        &mut self,
        id: ParticipantId,
        cmd: AttackCommand,
        now: Instant,
    ) -> Option<SwordStrike> {
        let cooldown = self.config.sword_cooldown;
        let p = self.attacker(id, AttackKind::Sword, cooldown, now)?;
        let event = GameEvent::SwordAttackPrepare {
            client_id: p.id(),
            x: p.x,
            y: p.y,
            direction: cmd.direction,
        };
        self.outbox.push((Recipient::All, event));
        Some(SwordStrike {
            attacker: id,
            direction: cmd.direction,
        })
    }

    /// Damages every other living player and monster inside the swing's
    /// capsule that the attacker can see. A no-op if the attacker has died
    /// or left since the wind-up.
    pub fn resolve_sword(&mut self, strike: SwordStrike) {
        let Some(attacker) = self.players.get(&strike.attacker).filter(|p| p.is_alive()) else {
            debug!(participant = %strike.attacker, "sword strike dropped, attacker gone");
            return;
        };
        let origin = attacker.position();
        let (vx, vy) = strike.direction.vector();
        let tip = Point::new(
            origin.x + vx * self.config.sword_length,
            origin.y + vy * self.config.sword_length,
        );
        let radius = self.config.sword_radius;
        let damage = self.config.sword_damage;

        self.outbox.push((
            Recipient::All,
            GameEvent::SwordAttack {
                client_id: strike.attacker,
                x: origin.x,
                y: origin.y,
                direction: strike.direction,
                attack_line_x: tip.x,
                attack_line_y: tip.y,
            },
        ));

        let map = &self.map;
        let in_reach = |p: Point| capsule_contains(origin, tip, radius, p) && map.is_visible(origin, p);

        for player in self.players.values_mut() {
            if player.id() != strike.attacker && player.is_alive() && in_reach(player.position()) {
                damage_player(player, damage, &mut self.outbox);
            }
        }
        let mut boss_killed = false;
        for monster in self.monsters.iter_mut() {
            if monster.is_alive() && in_reach(monster.position()) {
                boss_killed |=
                    damage_monster(monster, damage, &mut self.outbox) == Some(MonsterKind::Demon);
            }
        }
        if boss_killed {
            self.record_boss_kill(strike.attacker);
        }
    }

    /// Checks the bow cooldown. The caller resolves the returned shot after
    /// `arrow_delay`.
    pub fn begin_arrow(
        &mut self,
        id: ParticipantId,
        cmd: AttackCommand,
        now: Instant,
    ) -> Option<ArrowShot> {
        let cooldown = self.config.arrow_cooldown;
        self.attacker(id, AttackKind::Arrow, cooldown, now)?;
        Some(ArrowShot {
            shooter: id,
            x: cmd.x,
            y: cmd.y,
            direction: cmd.direction,
        })
    }

    /// Broadcasts the arrow's flight segment with a random spread.
    pub fn resolve_arrow(&mut self, shot: ArrowShot) {
        if !self.players.get(&shot.shooter).is_some_and(Player::is_alive) {
            debug!(participant = %shot.shooter, "arrow dropped, shooter gone");
            return;
        }
        let (vx, vy) = shot.direction.vector();
        let spread = self.config.arrow_spread;
        let reach = self.config.arrow_reach;
        let jitter_x = (self.rng.random::<f64>() * 2.0 - 1.0) * spread;
        let jitter_y = (self.rng.random::<f64>() * 2.0 - 1.0) * spread;
        let muzzle = self.config.arrow_muzzle_offset;

        self.outbox.push((
            Recipient::All,
            GameEvent::ShootArrow {
                client_id: shot.shooter,
                x1: shot.x + muzzle * vx,
                y1: shot.y + muzzle * vy,
                x2: (shot.x as f64 + vx as f64 * reach + jitter_x) as i32,
                y2: (shot.y as f64 + vy as f64 * reach + jitter_y) as i32,
                velocity: self.config.arrow_velocity,
            },
        ));
    }

    /// A client-reported hit on a player.
    pub fn hit_player(&mut self, cmd: HitPlayerCommand) {
        let damage = self.config.fireball_damage;
        match self.players.get_mut(&cmd.target) {
            Some(target) => {
                damage_player(target, damage, &mut self.outbox);
            }
            None => debug!(target = %cmd.target, "hit on unknown player ignored"),
        }
    }

    /// A client-reported hit on a monster. The hit is credited to the
    /// reported origin, or to the sender when none is given.
    pub fn hit_monster(&mut self, sender: ParticipantId, cmd: HitMonsterCommand) {
        let damage = self.config.fireball_damage;
        let Some(monster) = self.monsters.iter_mut().find(|m| m.id == cmd.monster_id) else {
            debug!(monster = %cmd.monster_id, "hit on unknown monster ignored");
            return;
        };
        if damage_monster(monster, damage, &mut self.outbox) == Some(MonsterKind::Demon) {
            self.record_boss_kill(cmd.origin.unwrap_or(sender));
        }
    }

    /// The living player `id`, if its cooldown for `kind` has elapsed. The
    /// cooldown restarts on success.
    fn attacker(
        &mut self,
        id: ParticipantId,
        kind: AttackKind,
        cooldown: std::time::Duration,
        now: Instant,
    ) -> Option<&mut Player> {
        let p = self.players.get_mut(&id).filter(|p| p.is_alive())?;
        if !p.try_start_attack(kind, cooldown, now) {
            debug!(participant = %id, ?kind, "attack on cooldown");
            return None;
        }
        Some(p)
    }

    // -----------------------------------------------------------------------
    // Periodic work
    // -----------------------------------------------------------------------

    /// Steps monster movement, then broadcasts the creatures that are moving
    /// or attacking. Nothing is sent when nothing is in motion.
    pub fn broadcast_positions(&mut self) {
        let speed = self.config.monster_speed;
        for m in self.monsters.iter_mut().filter(|m| m.is_alive()) {
            m.step_toward_target(speed);
        }

        let players: Vec<_> = self
            .players
            .values()
            .filter(|p| p.moving)
            .map(Player::position_snapshot)
            .collect();
        let monsters: Vec<_> = self
            .monsters
            .iter()
            .filter(|m| m.is_alive() && (m.moving || m.attacking))
            .map(Monster::position_snapshot)
            .collect();
        if players.is_empty() && monsters.is_empty() {
            return;
        }
        self.outbox.push((
            Recipient::All,
            GameEvent::CreaturesPosUpdate { players, monsters },
        ));
    }

    /// Full snapshot of every player and monster.
    pub fn broadcast_stats(&mut self) {
        let players = self.players.values().map(Player::stats).collect();
        let monsters = self.monsters.iter().map(Monster::stats).collect();
        self.outbox.push((
            Recipient::All,
            GameEvent::CreaturesStatsUpdate { players, monsters },
        ));
    }

    /// One AI pass over every living monster.
    pub fn run_ai(&mut self, now: Instant) {
        let mut ctx = AiContext {
            players: &mut self.players,
            map: &self.map,
            config: &self.config,
            outbox: &mut self.outbox,
            now,
        };
        for monster in self.monsters.iter_mut().filter(|m| m.is_alive()) {
            brain_for(monster.kind).on_tick(monster, &mut ctx);
        }
    }

    // -----------------------------------------------------------------------
    // Outcome
    // -----------------------------------------------------------------------

    fn record_boss_kill(&mut self, killer: ParticipantId) {
        if self.outcome.is_none() {
            info!(winner = %killer, "boss killed");
            self.outcome = Some(Outcome {
                winner: Some(killer),
            });
        }
    }

    /// Decides the outcome if the game is over and returns it, once.
    pub fn take_outcome(&mut self) -> Option<Outcome> {
        if self.outcome_reported {
            return None;
        }
        if self.outcome.is_none() && !self.players.values().any(Player::is_alive) {
            info!("no living players left");
            self.outcome = Some(Outcome { winner: None });
        }
        let outcome = self.outcome?;
        self.outcome_reported = true;
        Some(outcome)
    }

    /// Drains the events queued since the last call.
    pub fn take_outbox(&mut self) -> Vec<(Recipient, GameEvent)> {
        std::mem::take(&mut self.outbox)
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    pub fn player(&self, id: ParticipantId) -> Option<&Player> {
        self.players.get(&id)
    }

    pub fn players(&self) -> impl Iterator<Item = &Player> {
        self.players.values()
    }

    pub fn monster(&self, id: MonsterId) -> Option<&Monster> {
        self.monsters.iter().find(|m| m.id == id)
    }

    pub fn monsters(&self) -> &[Monster] {
        &self.monsters
    }

    pub fn object(&self, id: ObjectId) -> Option<&GameObject> {
        self.objects.get(&id)
    }

    pub fn keys_collected(&self) -> &BTreeMap<String, bool> {
        &self.keys
    }

    pub fn boss_spawned(&self) -> bool {
        self.boss_spawned
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub(crate) fn next_monster_id(&self) -> MonsterId {
        MonsterId(self.monsters.iter().map(|m| m.id.0).max().unwrap_or(0) + 1)
    }
}

/// Regular monsters from the spawns layer. The boss is held back until
/// every key is collected.
fn spawn_monsters(map: &GameMap, config: &GameConfig) -> Vec<Monster> {
    let mut monsters = Vec::new();
    for point in map.objects_in(SPAWN_LAYER) {
        let kind = match MonsterKind::from_spawn_name(&point.name) {
            Some(MonsterKind::Demon) | None => continue,
            Some(kind) => kind,
        };
        let id = MonsterId(monsters.len() as u32 + 1);
        let at = Point::new(point.x as i32, point.y as i32);
        monsters.push(Monster::new(id, kind, config.monster_hp(kind), at));
    }
    monsters
}

fn spawn_objects(map: &GameMap) -> BTreeMap<ObjectId, GameObject> {
    let mut objects = BTreeMap::new();
    for obj in map.objects_in(OBJECT_LAYER) {
        let Some(kind) = ObjectKind::from_map_type(&obj.kind) else {
            if !obj.kind.is_empty() {
                warn!(object = obj.id, kind = %obj.kind, "unknown object type skipped");
            }
            continue;
        };
        let id = ObjectId(objects.len() as u32 + 1);
        objects.insert(
            id,
            GameObject {
                id,
                kind,
                bounds: Rect::new(
                    obj.x as i32,
                    obj.y as i32,
                    obj.width as i32,
                    obj.height as i32,
                ),
                state: kind.initial_state(),
                properties: obj.property_map(),
            },
        );
    }
    objects
}
