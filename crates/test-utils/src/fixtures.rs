//! Common fixtures: CSV sources and on-disk tile trees.

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};
use tempfile::TempDir;

use tile_common::{encode_tile, tile_relative_path, Feature, FeatureCollection, TileCoord};

/// Write a CSV file with the given header and rows into `dir`.
pub fn write_csv(dir: &Path, name: &str, header: &str, rows: &[&str]) -> PathBuf {
    let path = dir.join(name);
    let mut content = String::from(header);
    content.push('\n');
    for row in rows {
        content.push_str(row);
        content.push('\n');
    }
    fs::write(&path, content).expect("write csv fixture");
    path
}

/// A small observation CSV around Zurich, Bern and New York, including
/// rows that must be skipped (out-of-range and non-finite coordinates).
///
/// Valid rows: 4. Skipped rows: 4.
pub fn observations_csv(dir: &Path) -> PathBuf {
    write_csv(
        dir,
        "observations.csv",
        "observation_uuid,latitude,longitude,taxon_id,quality_grade",
        &[
            "obs-1,47.3769,8.5417,4321,research",
            "obs-2,47.3800,8.5500,4321,casual",
            "obs-3,46.9480,7.4474,1111,research",
            "obs-4,40.7128,-74.0060,2222,research",
            "obs-bad-lat,91.0,8.5,9999,research",
            "obs-bad-lon,47.0,200.0,9999,research",
            "obs-nan,NaN,8.5,9999,research",
            "obs-empty,,8.5,9999,research",
        ],
    )
}

/// Number of valid rows in [`observations_csv`].
pub const OBSERVATIONS_VALID: u64 = 4;
/// Number of skipped rows in [`observations_csv`].
pub const OBSERVATIONS_SKIPPED: u64 = 4;

/// Build a Point feature with a single `id` property.
pub fn point_feature(lon: f64, lat: f64, id: &str) -> Feature {
    let mut props = Map::new();
    props.insert("id".to_string(), Value::String(id.to_string()));
    Feature::point(lon, lat, props)
}

/// Write a tile tree under `root` from pre-grouped feature collections.
pub fn write_tile_tree(root: &Path, tiles: &[(TileCoord, FeatureCollection)]) {
    for (coord, collection) in tiles {
        let path = root.join(tile_relative_path(coord));
        fs::create_dir_all(path.parent().unwrap()).expect("create tile dir");
        let payload = encode_tile(collection).expect("encode tile");
        fs::write(&path, payload).expect("write tile");
    }
}

/// Temporary directory holding a tile tree.
pub fn temp_tile_tree(tiles: &[(TileCoord, FeatureCollection)]) -> TempDir {
    let dir = TempDir::new().expect("create temp dir");
    write_tile_tree(dir.path(), tiles);
    dir
}

#[cfg(test)]
mod tests {
    use super::*;
    use tile_common::decode_tile;

    #[test]
    fn test_tile_tree_roundtrip() {
        let coord = TileCoord::new(8, 11, 11);
        let fc = FeatureCollection::new(vec![point_feature(-164.0, 83.4, "a")]);
        let dir = temp_tile_tree(&[(coord, fc.clone())]);

        let payload = fs::read(dir.path().join(tile_relative_path(&coord))).unwrap();
        assert_eq!(decode_tile(&payload).unwrap(), fc);
    }

    #[test]
    fn test_observations_csv_shape() {
        let dir = TempDir::new().unwrap();
        let path = observations_csv(dir.path());
        let content = fs::read_to_string(path).unwrap();
        assert_eq!(
            content.lines().count() as u64,
            1 + OBSERVATIONS_VALID + OBSERVATIONS_SKIPPED
        );
    }
}
