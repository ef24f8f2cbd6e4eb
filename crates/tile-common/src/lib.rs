//! Common types shared by the tile builder, the map client, and the binaries.

pub mod bbox;
pub mod error;
pub mod geojson;
pub mod store;
pub mod tile;
pub mod viewport;

pub use bbox::BoundingBox;
pub use error::{TileError, TileResult};
pub use geojson::{Feature, FeatureCollection, Geometry};
pub use store::{decode_tile, encode_tile, tile_relative_path, TILE_EXTENSION};
pub use tile::{tile_bounds, tile_for_lonlat, TileCoord, MAX_ZOOM, MERCATOR_LAT_LIMIT};
pub use viewport::Viewport;
