//! Serde model of the Tiled JSON map format.
//!
//! Only the fields the server consumes are typed. Everything else is kept
//! in `extra` so a map can be shipped back to clients unchanged.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Tiled stores horizontal/vertical/diagonal flip flags in the top bits of
/// every gid.
const GID_FLAGS_MASK: u32 = 0x1FFF_FFFF;

/// Strips the flip flags from a raw tile gid.
pub(crate) fn clean_gid(raw: u32) -> u32 {
    raw & GID_FLAGS_MASK
}

/// A whole Tiled map.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TileMap {
    /// Width in tiles.
    pub width: u32,
    /// Height in tiles.
    pub height: u32,
    #[serde(rename = "tilewidth")]
    pub tile_width: u32,
    #[serde(rename = "tileheight")]
    pub tile_height: u32,
    #[serde(default)]
    pub layers: Vec<MapLayer>,
    #[serde(default)]
    pub tilesets: Vec<Tileset>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl TileMap {
    /// Looks up a layer by exact name.
    pub fn layer(&self, name: &str) -> Option<&MapLayer> {
        self.layers.iter().find(|l| l.name == name)
    }

    /// Next free layer id (Tiled layer ids are positive and unique).
    pub(crate) fn next_layer_id(&self) -> u32 {
        self.layers.iter().map(|l| l.id).max().unwrap_or(0) + 1
    }
}

/// A tile layer (`data`) or an object group (`objects`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MapLayer {
    #[serde(default)]
    pub id: u32,
    pub name: String,
    /// `tilelayer` or `objectgroup`.
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub data: Vec<u32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub objects: Vec<MapObject>,
    #[serde(default)]
    pub width: u32,
    #[serde(default)]
    pub height: u32,
    #[serde(default = "default_true")]
    pub visible: bool,
    #[serde(default = "default_opacity")]
    pub opacity: f64,
    #[serde(default)]
    pub x: i32,
    #[serde(default)]
    pub y: i32,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

fn default_true() -> bool {
    true
}

fn default_opacity() -> f64 {
    1.0
}

impl MapLayer {
    /// Creates an empty object group.
    pub fn object_group(id: u32, name: impl Into<String>, objects: Vec<MapObject>) -> Self {
        Self {
            id,
            name: name.into(),
            kind: "objectgroup".to_string(),
            data: Vec::new(),
            objects,
            width: 0,
            height: 0,
            visible: true,
            opacity: 1.0,
            x: 0,
            y: 0,
            extra: BTreeMap::new(),
        }
    }

    /// Raw tile gid at `(x, y)` with flip flags removed. `0` means empty;
    /// coordinates outside the layer read as empty.
    pub fn tile_at(&self, x: u32, y: u32) -> u32 {
        if x >= self.width || y >= self.height {
            return 0;
        }
        let index = (y * self.width + x) as usize;
        self.data.get(index).copied().map(clean_gid).unwrap_or(0)
    }
}

/// A rectangle or point placed on an object group.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MapObject {
    pub id: u32,
    #[serde(default)]
    pub name: String,
    /// Tiled 1.9 renamed `type` to `class`; both are accepted.
    #[serde(rename = "type", alias = "class", default)]
    pub kind: String,
    pub x: f64,
    pub y: f64,
    #[serde(default)]
    pub width: f64,
    #[serde(default)]
    pub height: f64,
    #[serde(default)]
    pub rotation: f64,
    #[serde(default = "default_true")]
    pub visible: bool,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub point: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub properties: Vec<MapProperty>,
}

impl MapObject {
    /// Looks up a custom property by name.
    pub fn property(&self, name: &str) -> Option<&PropertyValue> {
        self.properties
            .iter()
            .find(|p| p.name == name)
            .map(|p| &p.value)
    }

    /// Custom properties as a name → value mapping.
    pub fn property_map(&self) -> BTreeMap<String, PropertyValue> {
        self.properties
            .iter()
            .map(|p| (p.name.clone(), p.value.clone()))
            .collect()
    }
}

/// A custom property as Tiled writes it: `{name, type, value}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapProperty {
    pub name: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    pub value: PropertyValue,
}

impl MapProperty {
    pub fn new(name: impl Into<String>, value: PropertyValue) -> Self {
        let kind = match &value {
            PropertyValue::Bool(_) => "bool",
            PropertyValue::Int(_) => "int",
            PropertyValue::Float(_) => "float",
            PropertyValue::Text(_) => "string",
        };
        Self {
            name: name.into(),
            kind: kind.to_string(),
            value,
        }
    }
}

/// The value of a custom property.
///
/// Maps only ever carry a handful of shapes (group names, directions, frame
/// identifiers, flags) so this stays a small closed set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl PropertyValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            Self::Float(f) => Some(*f as i64),
            Self::Text(s) => s.parse().ok(),
            Self::Bool(_) => None,
        }
    }
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

impl From<&str> for PropertyValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<bool> for PropertyValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

/// A tileset reference. Embedded tilesets carry per-tile metadata.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Tileset {
    pub firstgid: u32,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tiles: Vec<TileMeta>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

/// Metadata for one tile of a tileset. `id` is local to the tileset.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TileMeta {
    pub id: u32,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub properties: Vec<MapProperty>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl TileMeta {
    pub fn property(&self, name: &str) -> Option<&PropertyValue> {
        self.properties
            .iter()
            .find(|p| p.name == name)
            .map(|p| &p.value)
    }
}
