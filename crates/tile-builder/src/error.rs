//! Error types for the tile builder.

use thiserror::Error;

/// Errors that abort a build.
///
/// Record-level problems (bad coordinates, malformed rows) are not errors;
/// they surface as [`crate::SkipReason`] counts in the build report.
#[derive(Error, Debug)]
pub enum BuildError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to read source: {0}")]
    Csv(#[from] csv::Error),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Source is missing required column '{0}'")]
    MissingColumn(String),

    #[error("Tile encoding error: {0}")]
    Tile(#[from] tile_common::TileError),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

/// Result type for build operations.
pub type Result<T> = std::result::Result<T, BuildError>;
