//! The build pipeline: stream rows, bucket per tile, flush in batches.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;

use chrono::Utc;
use rayon::prelude::*;
use tracing::{debug, info, warn};

use tile_common::{
    decode_tile, encode_tile, tile_for_lonlat, tile_relative_path, Feature, FeatureCollection,
    TileCoord,
};

use crate::config::BuildConfig;
use crate::error::Result;
use crate::record::{ColumnLayout, RecordOutcome};
use crate::report::BuildReport;

/// One-shot transform of a record source into a tile pyramid.
///
/// Tile assignment is a pure function of `(lon, lat, zoom)`, so two runs
/// over identical input produce identical tile membership. Within a tile,
/// features keep source order.
pub struct TileBuilder {
    config: BuildConfig,
}

impl TileBuilder {
    pub fn new(config: BuildConfig) -> Self {
        Self { config }
    }

    /// Run the build. Returns the report on success.
    ///
    /// Record-level problems are counted and skipped. Any filesystem error
    /// aborts the run: downstream readers cannot tell "empty" from "not
    /// yet written", so a partial tree must never be left as if complete.
    pub fn run(&self) -> Result<BuildReport> {
        self.config.validate()?;

        let mut report = BuildReport::start(self.config.min_zoom, self.config.max_zoom);

        // Rebuilds overwrite wholesale: drop the zoom directories this
        // build owns before writing anything, since flushes append.
        self.clear_output()?;
        fs::create_dir_all(&self.config.output_root)?;

        let mut reader = csv::Reader::from_path(&self.config.source)?;
        let layout = ColumnLayout::from_headers(reader.headers()?, &self.config)?;

        info!(
            source = %self.config.source.display(),
            output = %self.config.output_root.display(),
            min_zoom = self.config.min_zoom,
            max_zoom = self.config.max_zoom,
            "Starting tile build"
        );

        let mut buckets: HashMap<TileCoord, Vec<Feature>> = HashMap::new();
        let mut written: HashSet<TileCoord> = HashSet::new();
        let mut tile_counts: HashMap<TileCoord, u64> = HashMap::new();
        let mut oversized: HashSet<TileCoord> = HashSet::new();

        for row in reader.records() {
            report.rows_read += 1;

            let row = match row {
                Ok(row) => row,
                Err(e) => {
                    // A transport-level failure is fatal; a bad row is not.
                    if matches!(e.kind(), csv::ErrorKind::Io(_)) {
                        return Err(e.into());
                    }
                    debug!(row = report.rows_read, error = %e, "Skipping malformed row");
                    report.record_skip(crate::record::SkipReason::MalformedRow);
                    continue;
                }
            };

            let record = match layout.parse_row(&row) {
                RecordOutcome::Valid(record) => record,
                RecordOutcome::Skipped(reason) => {
                    debug!(row = report.rows_read, reason = reason.as_str(), "Skipping row");
                    report.record_skip(reason);
                    continue;
                }
            };

            report.valid_records += 1;
            let feature = Feature::point(record.lon, record.lat, record.properties);

            // One bucket per zoom level; the same feature appears at every
            // zoom so each level is fully covered.
            for zoom in self.config.min_zoom..=self.config.max_zoom {
                let coord = tile_for_lonlat(record.lon, record.lat, zoom);
                buckets.entry(coord).or_default().push(feature.clone());

                let count = tile_counts.entry(coord).or_insert(0);
                *count += 1;
                if let Some(cap) = self.config.max_tile_records {
                    if *count as usize > cap && oversized.insert(coord) {
                        warn!(
                            tile = %coord,
                            records = *count,
                            cap = cap,
                            "Tile exceeds configured record guard"
                        );
                    }
                }
            }

            if report.rows_read % self.config.batch_rows as u64 == 0 {
                report.bytes_written += self.flush(&mut buckets, &mut written)?;
            }
        }

        report.bytes_written += self.flush(&mut buckets, &mut written)?;

        report.tiles_written = written.len() as u64;
        report.oversized_tiles = oversized.len() as u64;
        report.finished_at = Utc::now();

        info!(
            rows = report.rows_read,
            valid = report.valid_records,
            skipped = report.skipped_records,
            tiles = report.tiles_written,
            bytes = report.bytes_written,
            "Tile build completed"
        );

        Ok(report)
    }

    /// Remove the zoom directories this build will rewrite.
    fn clear_output(&self) -> Result<()> {
        for zoom in self.config.min_zoom..=self.config.max_zoom {
            let dir = self.config.output_root.join(zoom.to_string());
            if dir.exists() {
                fs::remove_dir_all(&dir)?;
            }
        }
        Ok(())
    }

    /// Write every buffered bucket to disk and clear the buffer.
    ///
    /// Distinct tile files are independent, so buckets are written in
    /// parallel; within one flush each path has exactly one writer. Any
    /// write failure aborts the whole build.
    fn flush(
        &self,
        buckets: &mut HashMap<TileCoord, Vec<Feature>>,
        written: &mut HashSet<TileCoord>,
    ) -> Result<u64> {
        if buckets.is_empty() {
            return Ok(0);
        }

        let drained: Vec<(TileCoord, Vec<Feature>)> = buckets.drain().collect();
        let flushed = drained.len();

        let sizes: Result<Vec<(TileCoord, u64)>> = drained
            .into_par_iter()
            .map(|(coord, features)| {
                write_tile(&self.config.output_root, coord, features).map(|bytes| (coord, bytes))
            })
            .collect();

        let mut total = 0u64;
        for (coord, bytes) in sizes? {
            written.insert(coord);
            total += bytes;
        }

        debug!(tiles = flushed, bytes = total, "Flushed tile batch");
        Ok(total)
    }
}

/// Write (or append to) a single tile file.
///
/// A tile touched by an earlier flush is read back, extended, and
/// rewritten; feature order stays source order across flushes.
fn write_tile(root: &Path, coord: TileCoord, features: Vec<Feature>) -> Result<u64> {
    let path = root.join(tile_relative_path(&coord));
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let collection = if path.exists() {
        let existing = fs::read(&path)?;
        let mut collection = decode_tile(&existing)?;
        collection.features.extend(features);
        collection
    } else {
        FeatureCollection::new(features)
    };

    let payload = encode_tile(&collection)?;
    fs::write(&path, &payload)?;
    Ok(payload.len() as u64)
}
