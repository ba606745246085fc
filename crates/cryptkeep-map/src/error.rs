//! Error types for map loading.

/// Errors that can occur while loading a level.
///
/// Every variant is fatal for the map being loaded. Missing optional layers
/// are not errors; they are logged and the dependent feature is skipped.
#[derive(Debug, thiserror::Error)]
pub enum MapError {
    /// The designated wall layer is absent.
    #[error("map has no wall layer named {0:?}")]
    NoWallLayer(String),

    /// The map file could not be read.
    #[error("failed to read map file: {0}")]
    Io(#[from] std::io::Error),

    /// The map file is not valid Tiled JSON.
    #[error("failed to parse map: {0}")]
    Parse(#[from] serde_json::Error),

    /// A tile layer holds fewer cells than its declared size.
    #[error("layer {layer:?} has {actual} tiles, expected {expected}")]
    LayerSizeMismatch {
        layer: String,
        expected: usize,
        actual: usize,
    },
}
