//! The on-disk tile store contract: key-to-path mapping and payload codec.
//!
//! The store itself is not a process, just a file layout any static server
//! can expose: `{root}/{z}/{x}/{y}.geojson.gz`, each file a gzip-compressed
//! compact-JSON FeatureCollection. Readers must treat a missing path as an
//! empty tile and must validate payloads before trusting them.

use std::io::{Read, Write};
use std::path::PathBuf;

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;

use crate::error::{TileError, TileResult};
use crate::geojson::FeatureCollection;
use crate::tile::TileCoord;

/// File extension for tile payloads.
pub const TILE_EXTENSION: &str = "geojson.gz";

/// Gzip magic bytes, used to sniff whether a payload is still compressed.
const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Relative path of a tile within the store root: `z/x/y.geojson.gz`.
pub fn tile_relative_path(coord: &TileCoord) -> PathBuf {
    PathBuf::from(coord.z.to_string())
        .join(coord.x.to_string())
        .join(format!("{}.{}", coord.y, TILE_EXTENSION))
}

/// Serialize a feature collection to a compressed tile payload.
pub fn encode_tile(collection: &FeatureCollection) -> TileResult<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    serde_json::to_writer(&mut encoder, collection)?;
    Ok(encoder.finish()?)
}

/// Decode a tile payload into a feature collection.
///
/// Payloads are sniffed via the gzip magic: a server that transparently
/// decompressed the transfer hands us plain JSON, one that served the file
/// verbatim hands us gzip. Both are accepted. Anything that decodes to
/// something other than a FeatureCollection is an error; callers degrade
/// that to an empty tile.
pub fn decode_tile(payload: &[u8]) -> TileResult<FeatureCollection> {
    let json: Vec<u8> = if payload.starts_with(&GZIP_MAGIC) {
        let mut decoder = GzDecoder::new(payload);
        let mut buf = Vec::new();
        decoder
            .read_to_end(&mut buf)
            .map_err(|e| TileError::Decompression(e.to_string()))?;
        buf
    } else {
        payload.to_vec()
    };

    let collection: FeatureCollection = serde_json::from_slice(&json)
        .map_err(|e| TileError::MalformedTile(e.to_string()))?;

    if collection.collection_type != "FeatureCollection" {
        return Err(TileError::MalformedTile(format!(
            "unexpected type '{}'",
            collection.collection_type
        )));
    }

    Ok(collection)
}
