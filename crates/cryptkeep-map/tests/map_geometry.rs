//! Integration tests for level loading and visibility.

use cryptkeep_map::{
    COLLISION_LAYER, GameMap, MapError, Point, PropertyValue, SolidGrid, rasterize, TileRect,
};
use serde_json::{Value, json};

// =========================================================================
// Helpers
// =========================================================================

/// Builds a Tiled map from ASCII rows: `#` is gid 1, `+` is gid 2 (a
/// decorative non-solid tile when solidity is declared), `.` is empty.
fn map_json(rows: &[&str], declare_solidity: bool) -> Value {
    let height = rows.len();
    let width = rows[0].len();
    let data: Vec<u32> = rows
        .iter()
        .flat_map(|r| r.bytes())
        .map(|b| match b {
            b'#' => 1,
            b'+' => 2,
            _ => 0,
        })
        .collect();

    let tiles = if declare_solidity {
        json!([
            {"id": 0, "properties": [{"name": "collides", "type": "bool", "value": true}]},
            {"id": 1, "properties": [{"name": "collides", "type": "bool", "value": false}]}
        ])
    } else {
        json!([])
    };

    json!({
        "width": width,
        "height": height,
        "tilewidth": 32,
        "tileheight": 32,
        "orientation": "orthogonal",
        "layers": [
            {"id": 1, "name": "walls", "type": "tilelayer", "width": width, "height": height, "data": data},
            {"id": 2, "name": "spawns", "type": "objectgroup", "objects": [
                {"id": 1, "name": "player", "type": "", "x": 64, "y": 96, "point": true},
                {"id": 2, "name": "archer", "type": "", "x": 128, "y": 96, "point": true}
            ]}
        ],
        "tilesets": [{"firstgid": 1, "tiles": tiles}]
    })
}

fn load(rows: &[&str], declare_solidity: bool) -> GameMap {
    GameMap::from_json(&map_json(rows, declare_solidity).to_string()).unwrap()
}

fn p(x: i32, y: i32) -> Point {
    Point::new(x, y)
}

const ROOM: &[&str] = &[
    "##########",
    "#........#",
    "#...##...#",
    "#...##...#",
    "#........#",
    "##########",
];

// =========================================================================
// Loading
// =========================================================================

#[test]
fn test_load_without_wall_layer_fails() {
    let mut value = map_json(ROOM, true);
    value["layers"][0]["name"] = json!("floor");
    let err = GameMap::from_json(&value.to_string()).unwrap_err();
    assert!(matches!(err, MapError::NoWallLayer(name) if name == "walls"));
}

#[test]
fn test_load_short_wall_layer_fails() {
    let mut value = map_json(ROOM, true);
    value["layers"][0]["data"] = json!([1, 1, 1]);
    let err = GameMap::from_json(&value.to_string()).unwrap_err();
    assert!(matches!(err, MapError::LayerSizeMismatch { actual: 3, .. }));
}

#[test]
fn test_load_missing_file_is_io_error() {
    let err = GameMap::load("/definitely/not/here.tmj").unwrap_err();
    assert!(matches!(err, MapError::Io(_)));
}

#[test]
fn test_load_without_optional_layers_succeeds() {
    let mut value = map_json(ROOM, true);
    value["layers"].as_array_mut().unwrap().truncate(1);
    let map = GameMap::from_json(&value.to_string()).unwrap();
    assert!(map.layer_by_name("spawns").is_none());
    assert!(map.spawn_point("player").is_none());
    assert!(!map.rectangles_blocking_visibility().is_empty());
}

#[test]
fn test_spawn_point_reads_named_object() {
    let map = load(ROOM, true);
    assert_eq!(map.spawn_point("player"), Some(p(64, 96)));
    assert_eq!(map.spawn_point("demon"), None);
}

// =========================================================================
// Solidity and compaction
// =========================================================================

fn wall_grid(map: &GameMap) -> SolidGrid {
    let tw = map.tile_width();
    let th = map.tile_height();
    let rects: Vec<TileRect> = map
        .rectangles_blocking_visibility()
        .iter()
        .map(|r| TileRect {
            x: (r.x / tw) as usize,
            y: (r.y / th) as usize,
            width: (r.width / tw) as usize,
            height: (r.height / th) as usize,
        })
        .collect();
    let walls = map.layer_by_name("walls").unwrap();
    rasterize(&rects, walls.width as usize, walls.height as usize)
}

#[test]
fn test_rectangles_rasterize_back_to_wall_layer() {
    let map = load(ROOM, true);
    let expected = SolidGrid::from_fn(10, 6, |x, y| ROOM[y].as_bytes()[x] == b'#');
    assert_eq!(wall_grid(&map), expected);
}

#[test]
fn test_solidity_uses_collides_property() {
    let rows = &["#+#", "+++", "#.#"];
    let map = load(rows, true);
    let expected = SolidGrid::from_fn(3, 3, |x, y| rows[y].as_bytes()[x] == b'#');
    assert_eq!(wall_grid(&map), expected);
}

#[test]
fn test_solidity_falls_back_to_non_zero_tiles() {
    let rows = &["#+#", "+++", "#.#"];
    let map = load(rows, false);
    let expected = SolidGrid::from_fn(3, 3, |x, y| rows[y].as_bytes()[x] != b'.');
    assert_eq!(wall_grid(&map), expected);
}

#[test]
fn test_collision_layer_is_appended_with_area_tags() {
    let map = load(ROOM, true);
    let layer = map.layer_by_name(COLLISION_LAYER).unwrap();
    assert_eq!(layer.kind, "objectgroup");
    assert_eq!(layer.objects.len(), map.solid_rects().len());

    for (object, solid) in layer.objects.iter().zip(map.solid_rects()) {
        assert_eq!(object.x as i32, solid.bounds.x);
        assert_eq!(object.property("collides"), Some(&PropertyValue::Bool(true)));
        assert!(!solid.areas.is_empty());
        let tagged: Vec<u32> = object
            .property("areas")
            .and_then(PropertyValue::as_str)
            .unwrap()
            .split(',')
            .map(|s| s.parse().unwrap())
            .collect();
        assert_eq!(tagged, solid.areas);
    }
}

#[test]
fn test_area_tags_match_overlap() {
    let map = load(ROOM, true);
    for solid in map.solid_rects() {
        for area in map.areas().areas() {
            assert_eq!(
                solid.areas.contains(&area.id),
                area.bounds.intersects(&solid.bounds)
            );
        }
    }
}

// =========================================================================
// Line of sight
// =========================================================================

#[test]
fn test_is_visible_open_floor_returns_true() {
    let map = load(ROOM, true);
    assert!(map.is_visible(p(48, 48), p(100, 48)));
}

#[test]
fn test_is_visible_through_pillar_returns_false() {
    let map = load(ROOM, true);
    // Pillar covers x 128..192, y 64..128.
    assert!(!map.is_visible(p(48, 96), p(280, 96)));
}

#[test]
fn test_is_visible_is_symmetric() {
    let map = load(ROOM, true);
    let points = [
        p(40, 40),
        p(100, 140),
        p(280, 40),
        p(200, 150),
        p(160, 48),
        p(48, 96),
        p(280, 96),
        p(150, 150),
    ];
    for a in points {
        for b in points {
            assert_eq!(map.is_visible(a, b), map.is_visible(b, a), "{a:?} {b:?}");
        }
    }
}
