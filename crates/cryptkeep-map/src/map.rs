//! [`GameMap`]: a loaded level with its derived geometry.

use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::tiled::clean_gid;
use crate::{
    AreaGrid, MapError, MapLayer, MapObject, MapProperty, Point, PropertyValue, Rect, SolidGrid,
    TileMap, compact,
};

/// Tile layer whose tiles become solid rectangles. Required.
pub const WALL_LAYER: &str = "walls";
/// Object group of named points (player, monsters, boss).
pub const SPAWN_LAYER: &str = "spawns";
/// Object group of interactive objects (chests, triggers, traps).
pub const OBJECT_LAYER: &str = "objects";
/// Tile layer holding the tiles triggers paint over the floor.
pub const REPLACEMENT_LAYER: &str = "replacements";
/// Object group appended at load time with one object per solid rectangle.
pub const COLLISION_LAYER: &str = "collision-rects";

/// Tile metadata flag marking a tile as solid.
const SOLID_PROPERTY: &str = "collides";

/// Load-time knobs.
#[derive(Debug, Clone)]
pub struct MapOptions {
    /// Name of the required wall layer.
    pub wall_layer: String,
    /// Side of one partition area, in tiles.
    pub area_size_tiles: u32,
}

impl Default for MapOptions {
    fn default() -> Self {
        Self {
            wall_layer: WALL_LAYER.to_string(),
            area_size_tiles: 16,
        }
    }
}

/// A solid rectangle in world pixels, tagged with the partition areas it
/// overlaps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SolidRect {
    pub bounds: Rect,
    pub areas: Vec<u32>,
}

/// An immutable loaded level.
///
/// Cheap to share: wrap in an `Arc` and hand one to every game.
#[derive(Debug, Clone)]
pub struct GameMap {
    tiles: Arc<TileMap>,
    solids: Vec<SolidRect>,
    blockers: Vec<Rect>,
    areas: AreaGrid,
}

impl GameMap {
    /// Reads and prepares a Tiled JSON map from disk.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, MapError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)?;
        info!(path = %path.display(), "loading map");
        Self::from_json(&json)
    }

    /// Parses and prepares a Tiled JSON map with default options.
    pub fn from_json(json: &str) -> Result<Self, MapError> {
        let tiles: TileMap = serde_json::from_str(json)?;
        Self::from_tile_map(tiles, &MapOptions::default())
    }

    /// Derives solid rectangles and the area partition from a parsed map,
    /// then appends the [`COLLISION_LAYER`] export layer.
    pub fn from_tile_map(mut tiles: TileMap, options: &MapOptions) -> Result<Self, MapError> {
        let walls = tiles
            .layer(&options.wall_layer)
            .ok_or_else(|| MapError::NoWallLayer(options.wall_layer.clone()))?;

        let (cols, rows) = layer_dimensions(walls, &tiles);
        let expected = (cols * rows) as usize;
        if walls.data.len() < expected {
            return Err(MapError::LayerSizeMismatch {
                layer: walls.name.clone(),
                expected,
                actual: walls.data.len(),
            });
        }

        let solid = solidity_predicate(&tiles);
        let grid = SolidGrid::from_fn(cols as usize, rows as usize, |x, y| {
            solid(walls.tile_at(x as u32, y as u32))
        });

        let tw = tiles.tile_width as i32;
        let th = tiles.tile_height as i32;
        let areas = AreaGrid::cover(
            cols as i32 * tw,
            rows as i32 * th,
            options.area_size_tiles as i32 * tw.max(th),
        );

        let solids: Vec<SolidRect> = compact(&grid)
            .into_iter()
            .map(|r| {
                let bounds = Rect::new(
                    r.x as i32 * tw,
                    r.y as i32 * th,
                    r.width as i32 * tw,
                    r.height as i32 * th,
                );
                SolidRect {
                    areas: areas.areas_overlapping(&bounds),
                    bounds,
                }
            })
            .collect();

        for optional in [SPAWN_LAYER, OBJECT_LAYER, REPLACEMENT_LAYER] {
            if tiles.layer(optional).is_none() {
                warn!(layer = optional, "map has no such layer, feature disabled");
            }
        }

        let export = collision_layer(tiles.next_layer_id(), &solids);
        tiles.layers.retain(|l| l.name != COLLISION_LAYER);
        tiles.layers.push(export);

        info!(
            solid_tiles = grid.solid_count(),
            rectangles = solids.len(),
            areas = areas.areas().len(),
            "map geometry prepared"
        );

        let blockers = solids.iter().map(|s| s.bounds).collect();
        Ok(Self {
            tiles: Arc::new(tiles),
            solids,
            blockers,
            areas,
        })
    }

    /// Every rectangle that occludes line of sight.
    pub fn rectangles_blocking_visibility(&self) -> &[Rect] {
        &self.blockers
    }

    /// Solid rectangles with their area tags.
    pub fn solid_rects(&self) -> &[SolidRect] {
        &self.solids
    }

    pub fn areas(&self) -> &AreaGrid {
        &self.areas
    }

    pub fn layer_by_name(&self, name: &str) -> Option<&MapLayer> {
        self.tiles.layer(name)
    }

    /// The full map including the appended collision layer, as shipped to
    /// clients.
    pub fn tile_map(&self) -> &Arc<TileMap> {
        &self.tiles
    }

    pub fn tile_width(&self) -> i32 {
        self.tiles.tile_width as i32
    }

    pub fn tile_height(&self) -> i32 {
        self.tiles.tile_height as i32
    }

    /// Objects of the named object group; empty when the layer is absent.
    pub fn objects_in(&self, layer: &str) -> &[MapObject] {
        self.layer_by_name(layer)
            .map(|l| l.objects.as_slice())
            .unwrap_or(&[])
    }

    /// Looks up a point on the spawns layer by name.
    pub fn spawn_point(&self, name: &str) -> Option<Point> {
        self.objects_in(SPAWN_LAYER)
            .iter()
            .find(|o| o.name == name)
            .map(|o| Point::new(o.x as i32, o.y as i32))
    }

    /// Whether nothing solid lies on the segment between `a` and `b`.
    ///
    /// Symmetric in its arguments.
    pub fn is_visible(&self, a: Point, b: Point) -> bool {
        !self.blockers.iter().any(|r| r.intersects_segment(a, b))
    }
}

fn layer_dimensions(layer: &MapLayer, map: &TileMap) -> (u32, u32) {
    let cols = if layer.width > 0 { layer.width } else { map.width };
    let rows = if layer.height > 0 { layer.height } else { map.height };
    (cols, rows)
}

/// Builds the "is this gid solid" test from tileset metadata.
///
/// Tiles flagged `collides = true` are solid. A map that never declares the
/// flag falls back to treating every non-empty tile as solid.
fn solidity_predicate(map: &TileMap) -> impl Fn(u32) -> bool + use<> {
    let mut declared = false;
    let mut solid_gids = HashSet::new();
    for tileset in &map.tilesets {
        for tile in &tileset.tiles {
            if let Some(flag) = tile.property(SOLID_PROPERTY) {
                declared = true;
                if flag.as_bool() == Some(true) {
                    solid_gids.insert(tileset.firstgid + tile.id);
                }
            }
        }
    }

    if !declared {
        warn!(
            property = SOLID_PROPERTY,
            "no tile declares solidity, treating every wall tile as solid"
        );
    } else {
        debug!(solid_tiles = solid_gids.len(), "tile solidity read from tilesets");
    }

    move |gid: u32| {
        let gid = clean_gid(gid);
        if declared {
            solid_gids.contains(&gid)
        } else {
            gid != 0
        }
    }
}

fn collision_layer(id: u32, solids: &[SolidRect]) -> MapLayer {
    let objects = solids
        .iter()
        .enumerate()
        .map(|(i, s)| {
            let areas = s
                .areas
                .iter()
                .map(u32::to_string)
                .collect::<Vec<_>>()
                .join(",");
            MapObject {
                id: i as u32 + 1,
                kind: "collision".to_string(),
                x: s.bounds.x as f64,
                y: s.bounds.y as f64,
                width: s.bounds.width as f64,
                height: s.bounds.height as f64,
                visible: true,
                properties: vec![
                    MapProperty::new(SOLID_PROPERTY, PropertyValue::Bool(true)),
                    MapProperty::new("areas", PropertyValue::Text(areas)),
                ],
                ..MapObject::default()
            }
        })
        .collect();
    MapLayer::object_group(id, COLLISION_LAYER, objects)
}
