//! Monster behaviour.
//!
//! Each monster kind is a [`MonsterBrain`]: it picks targets, then advances
//! its [`AttackWindow`](crate::AttackWindow) by elapsed time. All timers are
//! instants compared against [`GameConfig`] durations; nothing is scheduled.

use std::collections::BTreeMap;

use cryptkeep_map::{GameMap, Point};
use cryptkeep_protocol::{Direction, GameEvent, MonsterKind, ParticipantId, Recipient};
use tokio::time::Instant;

use crate::combat::{Outbox, damage_player};
use crate::{GameConfig, Monster, Player, WindowPhase};

/// What a brain sees and touches during one AI pass.
pub(crate) struct AiContext<'a> {
    pub players: &'a mut BTreeMap<ParticipantId, Player>,
    pub map: &'a GameMap,
    pub config: &'a GameConfig,
    pub outbox: &'a mut Outbox,
    pub now: Instant,
}

/// A living, visible player within some range of a monster.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Sighting {
    pub id: ParticipantId,
    pub position: Point,
    /// Manhattan distance in pixels.
    pub distance: i32,
}

impl AiContext<'_> {
    /// Living players within `range` pixels of `from` with a clear line of
    /// sight, closest first.
    fn sightings(&self, from: Point, range: i32) -> Vec<Sighting> {
        let mut seen: Vec<Sighting> = self
            .players
            .values()
            .filter(|p| p.is_alive())
            .map(|p| Sighting {
                id: p.id(),
                position: p.position(),
                distance: from.manhattan(p.position()),
            })
            .filter(|s| s.distance <= range && self.map.is_visible(from, s.position))
            .collect();
        seen.sort_by_key(|s| (s.distance, s.id));
        seen
    }

    fn emit(&mut self, event: GameEvent) {
        self.outbox.push((Recipient::All, event));
    }
}

pub(crate) trait MonsterBrain {
    /// Players this monster cares about this tick, closest first.
    fn acquire_target(&self, monster: &Monster, ctx: &AiContext<'_>) -> Vec<Sighting>;

    /// Moves the attack window along and fires its effect when due.
    fn advance_attack_window(
        &self,
        monster: &mut Monster,
        targets: &[Sighting],
        ctx: &mut AiContext<'_>,
    );

    fn on_tick(&self, monster: &mut Monster, ctx: &mut AiContext<'_>) {
        let targets = self.acquire_target(monster, ctx);
        self.advance_attack_window(monster, &targets, ctx);
    }
}

pub(crate) fn brain_for(kind: MonsterKind) -> &'static dyn MonsterBrain {
    match kind {
        MonsterKind::Archer => &ArcherBrain,
        MonsterKind::Skeleton => &SkeletonBrain,
        MonsterKind::Demon => &DemonBrain,
    }
}

// ---------------------------------------------------------------------------
// Archer
// ---------------------------------------------------------------------------

/// Shoots the closest visible player, one arrow per window.
pub(crate) struct ArcherBrain;

impl MonsterBrain for ArcherBrain {
    fn acquire_target(&self, monster: &Monster, ctx: &AiContext<'_>) -> Vec<Sighting> {
        let range = ctx.config.tiles(ctx.config.archer_vision_tiles);
        ctx.sightings(monster.position(), range)
            .into_iter()
            .take(1)
            .collect()
    }

    fn advance_attack_window(
        &self,
        monster: &mut Monster,
        targets: &[Sighting],
        ctx: &mut AiContext<'_>,
    ) {
        let timing = ctx.config.archer_window;
        match monster.window.phase(&timing, ctx.now) {
            WindowPhase::Idle => {
                let Some(target) = targets.first() else {
                    return;
                };
                monster.window.open(ctx.now);
                monster.attacking = true;
                monster.direction = Direction::towards(
                    monster.x,
                    monster.y,
                    target.position.x,
                    target.position.y,
                );
            }
            WindowPhase::WindUp | WindowPhase::Active => {}
            WindowPhase::Strike => {
                monster.window.spend_effect();
                if let Some(target) = targets.first() {
                    ctx.emit(GameEvent::Arrow {
                        monster_id: Some(monster.id),
                        x1: monster.x,
                        y1: monster.y,
                        x2: target.position.x,
                        y2: target.position.y,
                    });
                }
            }
            WindowPhase::Cooldown => monster.attacking = false,
            WindowPhase::Expired => {
                monster.window.reset();
                monster.attacking = false;
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Skeleton
// ---------------------------------------------------------------------------

/// Chases the closest visible player and hits it in melee.
pub(crate) struct SkeletonBrain;

impl MonsterBrain for SkeletonBrain {
    fn acquire_target(&self, monster: &Monster, ctx: &AiContext<'_>) -> Vec<Sighting> {
        let range = ctx.config.tiles(ctx.config.skeleton_vision_tiles);
        ctx.sightings(monster.position(), range)
            .into_iter()
            .take(1)
            .collect()
    }

    fn advance_attack_window(
        &self,
        monster: &mut Monster,
        targets: &[Sighting],
        ctx: &mut AiContext<'_>,
    ) {
        monster.moving = false;
        monster.attacking = false;
        let Some(target) = targets.first().copied() else {
            monster.window.reset();
            return;
        };

        let config = ctx.config;
        if target.distance > config.tiles(config.skeleton_melee_tiles) {
            monster.window.reset();
            monster.moving = true;
            monster.move_target = target.position;
            monster.attacking = target.distance <= config.tiles(config.skeleton_pre_attack_tiles);
            return;
        }

        monster.attacking = true;
        let timing = config.skeleton_window;
        match monster.window.phase(&timing, ctx.now) {
            WindowPhase::Idle => monster.window.open(ctx.now),
            WindowPhase::Strike => {
                monster.window.spend_effect();
                if let Some(player) = ctx.players.get_mut(&target.id) {
                    damage_player(player, config.skeleton_damage, ctx.outbox);
                }
                if monster.window.has_elapsed(&timing, ctx.now) {
                    monster.window.reset();
                }
            }
            WindowPhase::Expired => monster.window.reset(),
            WindowPhase::WindUp | WindowPhase::Active | WindowPhase::Cooldown => {}
        }
    }
}

// ---------------------------------------------------------------------------
// Demon
// ---------------------------------------------------------------------------

/// The boss. Lightning on a timer, a fire circle when someone lines up with
/// it, and a fireball volley at every visible player.
pub(crate) struct DemonBrain;

impl MonsterBrain for DemonBrain {
    fn acquire_target(&self, monster: &Monster, ctx: &AiContext<'_>) -> Vec<Sighting> {
        let range = ctx.config.tiles(ctx.config.demon_vision_tiles);
        ctx.sightings(monster.position(), range)
    }

    fn advance_attack_window(
        &self,
        monster: &mut Monster,
        targets: &[Sighting],
        ctx: &mut AiContext<'_>,
    ) {
        let config = ctx.config;
        let now = ctx.now;
        let due = |last: Option<Instant>, period| {
            last.is_none_or(|t| now.saturating_duration_since(t) >= period)
        };

        if due(monster.last_lightning, config.demon_lightning_period) {
            monster.last_lightning = Some(now);
            ctx.emit(GameEvent::DemonLightning {
                monster_id: monster.id,
                x: monster.x,
                y: monster.y,
            });
        }

        let tile = config.tile_size;
        let lined_up = targets.iter().any(|t| {
            (t.position.x - monster.x).abs() < tile || (t.position.y - monster.y).abs() < tile
        });
        if lined_up && due(monster.last_fire_circle, config.demon_fire_circle_period) {
            monster.last_fire_circle = Some(now);
            ctx.emit(GameEvent::FireCircle {
                monster_id: monster.id,
                x: monster.x,
                y: monster.y,
            });
        }

        let timing = config.demon_window;
        match monster.window.phase(&timing, now) {
            WindowPhase::Idle => {
                let reach = config.tiles(config.demon_attack_range_tiles);
                if targets.iter().any(|t| t.distance <= reach) {
                    monster.window.open(now);
                    monster.attacking = true;
                }
            }
            WindowPhase::WindUp | WindowPhase::Active => {}
            WindowPhase::Strike => {
                monster.window.spend_effect();
                for target in targets {
                    ctx.emit(GameEvent::DemonFireball {
                        monster_id: monster.id,
                        x1: monster.x,
                        y1: monster.y,
                        x2: target.position.x,
                        y2: target.position.y,
                    });
                }
            }
            WindowPhase::Cooldown => monster.attacking = false,
            WindowPhase::Expired => {
                monster.window.reset();
                monster.attacking = false;
            }
        }
    }
}
