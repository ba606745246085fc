//! Chests, triggers and traps.
//!
//! Every transition is one-way: a chest only opens from `closed`, a trigger
//! only fires from `ready`. Re-satisfying a condition does nothing.

use cryptkeep_map::{Point, REPLACEMENT_LAYER, Rect};
use cryptkeep_protocol::{
    GameEvent, MonsterKind, ObjectId, ObjectKind, ObjectState, Recipient, SpikeSpawn, TileBatch,
    TileUpdate,
};
use tracing::{debug, info, warn};

use crate::{GameState, Monster};

/// Spawn point name for the boss.
pub const BOSS_SPAWN: &str = "demon";

/// A triggered effect on a linked object, collected before it is applied.
enum TrapEffect {
    Arrow { from: Point, to: Point },
    Spikes(SpikeSpawn),
}

impl GameState {
    /// One pass over every object.
    pub fn tick_objects(&mut self) {
        let ids: Vec<ObjectId> = self.objects.keys().copied().collect();
        for id in ids {
            let Some(obj) = self.objects.get(&id) else {
                continue;
            };
            match (obj.kind, obj.state) {
                (ObjectKind::Chest, ObjectState::Closed) => self.tick_chest(id),
                (ObjectKind::Trigger, ObjectState::Ready) => self.tick_trigger(id),
                _ => {}
            }
        }
    }

    fn tick_chest(&mut self, id: ObjectId) {
        let Some(chest) = self.objects.get(&id) else {
            return;
        };
        let at = chest.origin();
        let range = self.config.tiles(self.config.chest_range_tiles);
        let map = &self.map;
        let opened = self.players.values().any(|p| {
            p.is_alive() && at.manhattan(p.position()) <= range && map.is_visible(at, p.position())
        });
        if !opened {
            return;
        }

        let key = chest
            .property("key")
            .map(|k| k.to_string())
            .filter(|k| !k.is_empty());
        if let Some(chest) = self.objects.get_mut(&id) {
            chest.state = ObjectState::Open;
        }
        debug!(object = %id, "chest opened");
        self.outbox
            .push((Recipient::All, GameEvent::ChestOpen { object_id: id }));

        if let Some(key) = key {
            self.collect_key(key);
        }
    }

    fn collect_key(&mut self, key: String) {
        let collected = self.keys.entry(key.clone()).or_insert(false);
        if *collected {
            return;
        }
        *collected = true;
        info!(key = %key, "key collected");
        self.outbox
            .push((Recipient::All, GameEvent::KeyCollected { number: key }));

        let all_collected = self
            .config
            .tracked_keys
            .iter()
            .all(|k| self.keys.get(k).copied().unwrap_or(false));
        if all_collected && !self.boss_spawned {
            self.spawn_boss();
        }
    }

    fn spawn_boss(&mut self) {
        self.boss_spawned = true;
        let Some(at) = self.map.spawn_point(BOSS_SPAWN) else {
            warn!(spawn = BOSS_SPAWN, "all keys collected but the map has no boss spawn");
            return;
        };
        let boss = Monster::new(
            self.next_monster_id(),
            MonsterKind::Demon,
            self.config.monster_hp(MonsterKind::Demon),
            at,
        );
        info!(monster = %boss.id, x = at.x, y = at.y, "boss spawned");
        self.outbox.push((
            Recipient::All,
            GameEvent::MonsterSpawned {
                monster: boss.stats(),
            },
        ));
        self.monsters.push(boss);
    }

    fn tick_trigger(&mut self, id: ObjectId) {
        let Some(trigger) = self.objects.get(&id) else {
            return;
        };
        let bounds = trigger.bounds;
        if !self
            .players
            .values()
            .any(|p| p.is_alive() && bounds.contains(p.position()))
        {
            return;
        }
        let target = trigger.property("target").map(|t| t.to_string());
        if let Some(trigger) = self.objects.get_mut(&id) {
            trigger.state = ObjectState::Activated;
        }
        debug!(object = %id, target = ?target, "trigger activated");

        let tiles = self.replacement_tiles_in(bounds);
        if !tiles.is_empty() {
            let batch = TileBatch {
                layer_name: self.config.replacement_target_layer.clone(),
                tiles,
            };
            self.tile_history.push(batch.clone());
            self.outbox
                .push((Recipient::All, GameEvent::UpdateTiles(batch)));
        }

        let Some(target) = target else {
            return;
        };
        let effects = self.linked_trap_effects(&target);
        for effect in effects {
            match effect {
                TrapEffect::Arrow { from, to } => self.outbox.push((
                    Recipient::All,
                    GameEvent::Arrow {
                        monster_id: None,
                        x1: from.x,
                        y1: from.y,
                        x2: to.x,
                        y2: to.y,
                    },
                )),
                TrapEffect::Spikes(spike) => {
                    self.spike_history.push(spike.clone());
                    self.outbox
                        .push((Recipient::All, GameEvent::SpawnSpike(spike)));
                }
            }
        }
    }

    /// Non-empty tiles of the replacements layer whose top-left corner lies
    /// inside `bounds`.
    fn replacement_tiles_in(&self, bounds: Rect) -> Vec<TileUpdate> {
        let Some(layer) = self.map.layer_by_name(REPLACEMENT_LAYER) else {
            return Vec::new();
        };
        let tw = self.map.tile_width();
        let th = self.map.tile_height();
        let mut tiles = Vec::new();
        for row in 0..layer.height {
            for col in 0..layer.width {
                let tile_id = layer.tile_at(col, row);
                let corner = Point::new(col as i32 * tw, row as i32 * th);
                if tile_id > 0 && bounds.contains(corner) {
                    tiles.push(TileUpdate {
                        x: corner.x,
                        y: corner.y,
                        tile_id,
                    });
                }
            }
        }
        tiles
    }

    fn linked_trap_effects(&self, group: &str) -> Vec<TrapEffect> {
        let tile = self.config.tile_size;
        self.objects
            .values()
            .filter(|o| o.state != ObjectState::Passive)
            .filter(|o| o.property("group").is_some_and(|g| g.to_string() == group))
            .filter_map(|o| match o.kind {
                ObjectKind::TrapArrow => {
                    let from = o.origin();
                    let dx = match o.property("direction").and_then(|d| d.as_str()) {
                        Some("right") => tile,
                        Some("left") => -tile,
                        _ => 0,
                    };
                    Some(TrapEffect::Arrow {
                        from,
                        to: Point::new(from.x + dx, from.y),
                    })
                }
                ObjectKind::TrapSpikes => Some(TrapEffect::Spikes(SpikeSpawn {
                    x: o.bounds.x.div_euclid(tile) * tile,
                    y: o.bounds.y.div_euclid(tile) * tile,
                    start_frame: o
                        .property("frame")
                        .map(|f| f.to_string())
                        .unwrap_or_else(|| "0".to_string()),
                })),
                ObjectKind::Chest | ObjectKind::Trigger => None,
            })
            .collect()
    }
}
