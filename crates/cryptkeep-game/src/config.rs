//! Engine tunables.
//!
//! Every damage amount, cooldown, range and period the simulation uses is a
//! named field here. `Default` holds the values the live game plays with.

use std::time::Duration;

use cryptkeep_map::Point;
use cryptkeep_protocol::{MonsterKind, PlayerClass};

use crate::WindowTiming;

#[derive(Debug, Clone)]
pub struct GameConfig {
    // ----- periodic tasks -------------------------------------------------
    /// Sparse position broadcast and monster movement.
    pub positions_period: Duration,
    /// Full stats snapshot broadcast.
    pub stats_period: Duration,
    pub ai_period: Duration,
    pub objects_period: Duration,
    /// Upper bound of the random delay before each task's first tick.
    pub tick_jitter: Duration,

    // ----- player attacks -------------------------------------------------
    pub fireball_damage: i32,
    pub fireball_cooldown: Duration,
    pub sword_damage: i32,
    pub sword_cooldown: Duration,
    /// Wind-up between the prepare broadcast and hit resolution.
    pub sword_delay: Duration,
    pub sword_length: i32,
    pub sword_radius: i32,
    pub arrow_cooldown: Duration,
    pub arrow_delay: Duration,
    /// Maximum random offset on each axis of the arrow's end point.
    pub arrow_spread: f64,
    pub arrow_reach: f64,
    pub arrow_velocity: i32,
    /// Distance from the shooter's centre at which the arrow appears.
    pub arrow_muzzle_offset: i32,

    // ----- monsters -------------------------------------------------------
    /// Pixels per positions tick, per axis.
    pub monster_speed: i32,
    pub tile_size: i32,
    pub archer_vision_tiles: f64,
    pub archer_window: WindowTiming,
    pub skeleton_vision_tiles: f64,
    pub skeleton_melee_tiles: f64,
    /// Range at which a chasing skeleton starts its attack animation.
    pub skeleton_pre_attack_tiles: f64,
    pub skeleton_damage: i32,
    pub skeleton_window: WindowTiming,
    pub demon_vision_tiles: f64,
    pub demon_attack_range_tiles: f64,
    pub demon_window: WindowTiming,
    pub demon_lightning_period: Duration,
    pub demon_fire_circle_period: Duration,
    pub archer_hp: i32,
    pub skeleton_hp: i32,
    pub demon_hp: i32,

    // ----- players --------------------------------------------------------
    pub mage_hp: i32,
    pub knight_hp: i32,
    pub rogue_hp: i32,
    /// Used when the map has no `player` spawn point.
    pub player_spawn: Point,

    // ----- objects --------------------------------------------------------
    pub chest_range_tiles: f64,
    /// Keys that must all be collected before the boss appears.
    pub tracked_keys: Vec<String>,
    /// Keys that count as collected from the start.
    pub precollected_keys: Vec<String>,
    /// Layer name clients apply trigger tile replacements to.
    pub replacement_target_layer: String,

    /// Seed for class, colour and arrow spread rolls. `None` seeds from the OS.
    pub seed: Option<u64>,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            positions_period: Duration::from_secs(1) / 60,
            stats_period: Duration::from_secs(1) / 3,
            ai_period: Duration::from_millis(200),
            objects_period: Duration::from_millis(100),
            tick_jitter: Duration::from_millis(2),

            fireball_damage: 25,
            fireball_cooldown: Duration::from_millis(500),
            sword_damage: 50,
            sword_cooldown: Duration::from_secs(1),
            sword_delay: Duration::from_millis(700),
            sword_length: 160,
            sword_radius: 50,
            arrow_cooldown: Duration::from_millis(250),
            arrow_delay: Duration::from_millis(200),
            arrow_spread: 100.0,
            arrow_reach: 1000.0,
            arrow_velocity: 700,
            arrow_muzzle_offset: 20,

            monster_speed: 2,
            tile_size: 32,
            archer_vision_tiles: 30.0,
            archer_window: WindowTiming {
                wind_up: Duration::from_millis(200),
                active: Duration::from_millis(600),
                total: Duration::from_millis(600),
            },
            skeleton_vision_tiles: 10.0,
            skeleton_melee_tiles: 1.0,
            skeleton_pre_attack_tiles: 1.5,
            skeleton_damage: 30,
            skeleton_window: WindowTiming {
                wind_up: Duration::from_millis(500),
                active: Duration::from_millis(500),
                total: Duration::from_millis(500),
            },
            demon_vision_tiles: 30.0,
            demon_attack_range_tiles: 30.0,
            demon_window: WindowTiming {
                wind_up: Duration::from_millis(300),
                active: Duration::from_secs(1),
                total: Duration::from_secs(2),
            },
            demon_lightning_period: Duration::from_secs(6),
            demon_fire_circle_period: Duration::from_secs(5),
            archer_hp: 100,
            skeleton_hp: 200,
            demon_hp: 1000,

            mage_hp: 150,
            knight_hp: 250,
            rogue_hp: 200,
            player_spawn: Point::new(120, 140),

            chest_range_tiles: 3.0,
            tracked_keys: vec!["1".into(), "2".into(), "3".into()],
            precollected_keys: Vec::new(),
            replacement_target_layer: "floor".into(),

            seed: None,
        }
    }
}

impl GameConfig {
    /// Converts a distance in tiles to pixels.
    pub fn tiles(&self, tiles: f64) -> i32 {
        (tiles * self.tile_size as f64) as i32
    }

    pub fn class_hp(&self, class: PlayerClass) -> i32 {
        match class {
            PlayerClass::Mage => self.mage_hp,
            PlayerClass::Knight => self.knight_hp,
            PlayerClass::Rogue => self.rogue_hp,
        }
    }

    pub fn monster_hp(&self, kind: MonsterKind) -> i32 {
        match kind {
            MonsterKind::Archer => self.archer_hp,
            MonsterKind::Skeleton => self.skeleton_hp,
            MonsterKind::Demon => self.demon_hp,
        }
    }

    /// A config whose periodic tasks start exactly on their period, for
    /// deterministic timing.
    pub fn without_jitter(mut self) -> Self {
        self.tick_jitter = Duration::ZERO;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_periods() {
        let c = GameConfig::default();
        assert_eq!(c.positions_period, Duration::from_secs(1) / 60);
        assert_eq!(c.stats_period, Duration::from_secs(1) / 3);
        assert_eq!(c.ai_period, Duration::from_millis(200));
        assert_eq!(c.objects_period, Duration::from_millis(100));
    }

    #[test]
    fn test_tiles_converts_to_pixels() {
        let c = GameConfig::default();
        assert_eq!(c.tiles(1.5), 48);
        assert_eq!(c.tiles(30.0), 960);
    }

    #[test]
    fn test_class_hp_matches_classes() {
        let c = GameConfig::default();
        assert_eq!(c.class_hp(PlayerClass::Mage), 150);
        assert_eq!(c.class_hp(PlayerClass::Knight), 250);
        assert_eq!(c.class_hp(PlayerClass::Rogue), 200);
    }
}
