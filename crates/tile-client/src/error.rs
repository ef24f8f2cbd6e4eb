//! Error types for tile retrieval.

use thiserror::Error;

/// A failure to retrieve one tile payload.
///
/// Fetch errors are scoped to a single tile: the client degrades the tile,
/// never the whole view. A missing tile is not an error; fetchers report
/// it as `Ok(None)`.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Unexpected status {status} for {url}")]
    Status { status: u16, url: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
