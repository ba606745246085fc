//! Shared fixtures: a 40×40 open dungeon built from JSON, and participants
//! whose event queues can be drained synchronously.

#![allow(dead_code)]

use std::sync::Arc;

use cryptkeep_game::GameConfig;
use cryptkeep_map::GameMap;
use cryptkeep_protocol::{
    EventReceiver, GameEvent, ParticipantHandle, ParticipantId, ServerEvent,
};
use serde_json::{Value, json};

pub const SIZE: usize = 40;

/// A named spawn point.
pub fn spawn(id: u32, name: &str, x: i32, y: i32) -> Value {
    json!({"id": id, "name": name, "type": "", "x": x, "y": y, "point": true})
}

/// An interactive object with string properties.
pub fn object(id: u32, kind: &str, rect: (i32, i32, i32, i32), props: &[(&str, &str)]) -> Value {
    let properties: Vec<Value> = props
        .iter()
        .map(|(name, value)| json!({"name": name, "type": "string", "value": value}))
        .collect();
    json!({
        "id": id, "name": "", "type": kind,
        "x": rect.0, "y": rect.1, "width": rect.2, "height": rect.3,
        "properties": properties
    })
}

/// Builds the dungeon. `walls` and `replacements` are `(col, row, gid)`.
pub fn dungeon(
    walls: &[(usize, usize)],
    spawns: Vec<Value>,
    objects: Vec<Value>,
    replacements: &[(usize, usize, u32)],
) -> Arc<GameMap> {
    let mut wall_data = vec![0u32; SIZE * SIZE];
    for &(col, row) in walls {
        wall_data[row * SIZE + col] = 1;
    }
    let mut replacement_data = vec![0u32; SIZE * SIZE];
    for &(col, row, gid) in replacements {
        replacement_data[row * SIZE + col] = gid;
    }
    let map = json!({
        "width": SIZE, "height": SIZE, "tilewidth": 32, "tileheight": 32,
        "layers": [
            {"id": 1, "name": "walls", "type": "tilelayer", "width": SIZE, "height": SIZE, "data": wall_data},
            {"id": 2, "name": "spawns", "type": "objectgroup", "objects": spawns},
            {"id": 3, "name": "objects", "type": "objectgroup", "objects": objects},
            {"id": 4, "name": "replacements", "type": "tilelayer", "width": SIZE, "height": SIZE, "data": replacement_data}
        ],
        "tilesets": []
    });
    Arc::new(GameMap::from_json(&map.to_string()).unwrap())
}

pub fn participant(id: u64) -> (ParticipantHandle, EventReceiver) {
    let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
    (ParticipantHandle::new(ParticipantId(id), format!("hero{id}"), tx), rx)
}

/// A deterministic config: fixed seed, no tick jitter.
pub fn config() -> GameConfig {
    GameConfig {
        seed: Some(7),
        ..GameConfig::default()
    }
    .without_jitter()
}

/// Everything queued for a participant so far.
pub fn drain(rx: &mut EventReceiver) -> Vec<Arc<ServerEvent>> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

pub fn game_events(rx: &mut EventReceiver) -> Vec<GameEvent> {
    drain(rx)
        .into_iter()
        .filter_map(|e| match &*e {
            ServerEvent::Game(g) => Some(g.clone()),
            ServerEvent::Lobby(_) => None,
        })
        .collect()
}

pub fn names(events: &[GameEvent]) -> Vec<&'static str> {
    events.iter().map(GameEvent::name).collect()
}
