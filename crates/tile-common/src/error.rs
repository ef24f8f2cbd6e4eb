//! Error types shared across the point-tiles crates.

use thiserror::Error;

/// Result type alias using TileError.
pub type TileResult<T> = Result<T, TileError>;

/// Errors raised by the shared tile types and the on-disk tile codec.
#[derive(Debug, Error)]
pub enum TileError {
    #[error("Invalid zoom level {zoom}: must be in [0, {max}]")]
    InvalidZoom { zoom: u32, max: u32 },

    #[error("Tile payload is not valid gzip: {0}")]
    Decompression(String),

    #[error("Tile payload is not a valid feature collection: {0}")]
    MalformedTile(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
