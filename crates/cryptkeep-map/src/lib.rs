//! Static level geometry for Cryptkeep.
//!
//! A level is a Tiled JSON map. Loading one produces a [`GameMap`], which
//! keeps the raw layers (spawn points, objects, replacement tiles) and
//! derives two immutable artifacts from the wall layer:
//!
//! - **Solid rectangles** ([`SolidRect`]): the wall tiles compacted into
//!   axis-aligned boxes by a run-length pass followed by a vertical merge.
//! - **Area partition** ([`AreaGrid`]): overlapping square areas laid on a
//!   half-size stride. Every solid rectangle is tagged with the areas it
//!   overlaps.
//!
//! Line of sight ([`GameMap::is_visible`]) always scans the full rectangle
//! list; the area tags are exported metadata only.
//!
//! ```text
//! walls layer → SolidGrid → compact() → TileRect → world Rect → SolidRect{areas}
//! ```

mod compaction;
mod error;
mod geometry;
mod map;
mod partition;
mod tiled;

pub use compaction::{SolidGrid, TileRect, compact, rasterize};
pub use error::MapError;
pub use geometry::{Point, Rect, segments_intersect};
pub use map::{
    COLLISION_LAYER, GameMap, MapOptions, OBJECT_LAYER, REPLACEMENT_LAYER, SPAWN_LAYER,
    SolidRect, WALL_LAYER,
};
pub use partition::{Area, AreaGrid};
pub use tiled::{MapLayer, MapObject, MapProperty, PropertyValue, TileMap, TileMeta, Tileset};
