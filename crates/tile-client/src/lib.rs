//! MapClient: the viewport-driven tile consumer.
//!
//! Maintains the set of tiles needed for the active viewport, fetches the
//! missing ones, caches what arrived, evicts what is no longer shown, and
//! exposes the loaded features for rendering. The base map itself is drawn
//! by an external collaborator; this crate only owns tile state.

pub mod cache;
pub mod client;
pub mod error;
pub mod fetch;

pub use cache::{TileCache, TileCacheStats};
pub use client::{MapClient, TileState};
pub use error::FetchError;
pub use fetch::{FileTileFetcher, HttpTileFetcher, TileFetcher};
