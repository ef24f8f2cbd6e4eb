//! End-to-end builder tests over real temp directories.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;

use tempfile::TempDir;
use walkdir::WalkDir;

use test_utils::{observations_csv, OBSERVATIONS_SKIPPED, OBSERVATIONS_VALID};
use tile_builder::{BuildConfig, BuildError, TileBuilder};
use tile_common::{decode_tile, tile_for_lonlat, FeatureCollection, TileCoord};

const MIN_ZOOM: u32 = 5;
const MAX_ZOOM: u32 = 8;

fn build(config: BuildConfig) -> tile_builder::BuildReport {
    TileBuilder::new(config).run().expect("build should succeed")
}

/// Decode every tile file at one zoom level.
fn read_zoom(root: &Path, zoom: u32) -> BTreeMap<TileCoord, FeatureCollection> {
    let mut tiles = BTreeMap::new();
    let zoom_dir = root.join(zoom.to_string());
    if !zoom_dir.exists() {
        return tiles;
    }
    for entry in WalkDir::new(&zoom_dir)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
    {
        let x: u32 = entry
            .path()
            .parent()
            .unwrap()
            .file_name()
            .unwrap()
            .to_str()
            .unwrap()
            .parse()
            .unwrap();
        let y: u32 = entry
            .file_name()
            .to_str()
            .unwrap()
            .trim_end_matches(".geojson.gz")
            .parse()
            .unwrap();
        let payload = fs::read(entry.path()).unwrap();
        tiles.insert(
            TileCoord::new(zoom, x, y),
            decode_tile(&payload).expect("tile payload must decode"),
        );
    }
    tiles
}

/// Tile membership at one zoom as (tile, record ids).
fn membership(root: &Path, zoom: u32) -> BTreeMap<TileCoord, Vec<String>> {
    read_zoom(root, zoom)
        .into_iter()
        .map(|(coord, fc)| {
            let ids = fc
                .features
                .iter()
                .map(|f| f.properties["observation_uuid"].as_str().unwrap().to_string())
                .collect();
            (coord, ids)
        })
        .collect()
}

#[test]
fn test_coverage_uniqueness_and_conservation() {
    let dir = TempDir::new().unwrap();
    let csv = observations_csv(dir.path());
    let out = dir.path().join("tiles");

    let report = build(BuildConfig::new(&csv, &out, MIN_ZOOM, MAX_ZOOM));
    assert_eq!(report.valid_records, OBSERVATIONS_VALID);

    for zoom in MIN_ZOOM..=MAX_ZOOM {
        let tiles = read_zoom(&out, zoom);

        // Conservation: feature counts across all tiles sum to the number
        // of valid records.
        let total: usize = tiles.values().map(|fc| fc.len()).sum();
        assert_eq!(total as u64, OBSERVATIONS_VALID, "zoom {}", zoom);

        // Uniqueness: each record id appears exactly once per zoom, and in
        // the tile its coordinates map to.
        let mut seen = BTreeSet::new();
        for (coord, fc) in &tiles {
            for feature in &fc.features {
                let id = feature.properties["observation_uuid"].as_str().unwrap();
                assert!(seen.insert(id.to_string()), "{} duplicated at zoom {}", id, zoom);
                assert_eq!(
                    tile_for_lonlat(feature.lon(), feature.lat(), zoom),
                    *coord,
                    "{} in wrong tile",
                    id
                );
            }
        }
        assert_eq!(seen.len() as u64, OBSERVATIONS_VALID);
    }
}

#[test]
fn test_determinism_across_builds() {
    let dir = TempDir::new().unwrap();
    let csv = observations_csv(dir.path());
    let out_a = dir.path().join("tiles_a");
    let out_b = dir.path().join("tiles_b");

    build(BuildConfig::new(&csv, &out_a, MIN_ZOOM, MAX_ZOOM));
    build(BuildConfig::new(&csv, &out_b, MIN_ZOOM, MAX_ZOOM));

    for zoom in MIN_ZOOM..=MAX_ZOOM {
        assert_eq!(membership(&out_a, zoom), membership(&out_b, zoom));
    }
}

#[test]
fn test_invalid_rows_excluded_and_counted() {
    let dir = TempDir::new().unwrap();
    let csv = observations_csv(dir.path());
    let out = dir.path().join("tiles");

    let report = build(BuildConfig::new(&csv, &out, MIN_ZOOM, MAX_ZOOM));

    assert_eq!(report.skipped_records, OBSERVATIONS_SKIPPED);
    assert_eq!(report.skips_by_reason["coordinate_out_of_range"], 2);
    assert_eq!(report.skips_by_reason["non_finite_coordinate"], 1);
    assert_eq!(report.skips_by_reason["missing_value"], 1);

    // Skipped records appear in zero tiles at every zoom
    for zoom in MIN_ZOOM..=MAX_ZOOM {
        for ids in membership(&out, zoom).values() {
            assert!(ids.iter().all(|id| !id.starts_with("obs-bad") && !id.starts_with("obs-nan")));
        }
    }
}

#[test]
fn test_batched_flushes_preserve_membership_and_order() {
    let dir = TempDir::new().unwrap();
    let csv = observations_csv(dir.path());
    let out_single = dir.path().join("tiles_single");
    let out_batched = dir.path().join("tiles_batched");

    build(BuildConfig::new(&csv, &out_single, MIN_ZOOM, MAX_ZOOM));

    let mut config = BuildConfig::new(&csv, &out_batched, MIN_ZOOM, MAX_ZOOM);
    config.batch_rows = 2; // force multiple append flushes
    build(config);

    for zoom in MIN_ZOOM..=MAX_ZOOM {
        // Same membership and same source order within each tile
        assert_eq!(membership(&out_single, zoom), membership(&out_batched, zoom));
    }
}

#[test]
fn test_rebuild_overwrites_stale_tiles() {
    let dir = TempDir::new().unwrap();
    let csv = observations_csv(dir.path());
    let out = dir.path().join("tiles");

    // Plant a stale tile inside the zoom range
    let stale = out.join("5/0/0.geojson.gz");
    fs::create_dir_all(stale.parent().unwrap()).unwrap();
    fs::write(&stale, b"stale").unwrap();

    build(BuildConfig::new(&csv, &out, MIN_ZOOM, MAX_ZOOM));
    assert!(!stale.exists(), "stale tile must not survive a rebuild");
}

#[test]
fn test_missing_coordinate_column_aborts() {
    let dir = TempDir::new().unwrap();
    let csv = test_utils::write_csv(
        dir.path(),
        "bad.csv",
        "id,lat,lng",
        &["a,47.0,8.0"],
    );
    let out = dir.path().join("tiles");

    let result = TileBuilder::new(BuildConfig::new(&csv, &out, MIN_ZOOM, MAX_ZOOM)).run();
    assert!(matches!(result, Err(BuildError::MissingColumn(_))));
}

#[test]
fn test_oversized_tile_guard_counts_but_keeps_records() {
    let dir = TempDir::new().unwrap();
    let csv = observations_csv(dir.path());
    let out = dir.path().join("tiles");

    let mut config = BuildConfig::new(&csv, &out, 5, 5);
    config.max_tile_records = Some(1);
    let report = build(config);

    // Zurich + Bern share tiles at low zoom, so the guard trips,
    // but conservation still holds.
    assert!(report.oversized_tiles >= 1);
    let total: usize = read_zoom(&out, 5).values().map(|fc| fc.len()).sum();
    assert_eq!(total as u64, OBSERVATIONS_VALID);
}

#[test]
fn test_keep_columns_restricts_properties() {
    let dir = TempDir::new().unwrap();
    let csv = observations_csv(dir.path());
    let out = dir.path().join("tiles");

    let mut config = BuildConfig::new(&csv, &out, 5, 5);
    config.keep_columns = Some(vec!["taxon_id".to_string()]);
    build(config);

    for fc in read_zoom(&out, 5).values() {
        for feature in &fc.features {
            assert_eq!(feature.properties.len(), 1);
            assert!(feature.properties.contains_key("taxon_id"));
        }
    }
}

#[test]
fn test_empty_source_builds_empty_tree() {
    let dir = TempDir::new().unwrap();
    let csv = test_utils::write_csv(
        dir.path(),
        "empty.csv",
        "observation_uuid,latitude,longitude",
        &[],
    );
    let out = dir.path().join("tiles");

    let report = build(BuildConfig::new(&csv, &out, MIN_ZOOM, MAX_ZOOM));
    assert_eq!(report.rows_read, 0);
    assert_eq!(report.valid_records, 0);
    assert_eq!(report.tiles_written, 0);
    assert!(out.exists());
}
