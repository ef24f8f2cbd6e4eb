//! Aggregated outcome of a build run.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::record::SkipReason;

/// Summary of one build: what was read, what was skipped and why, and what
/// landed on disk. Skips are non-fatal; a report only exists for builds
/// that completed.
#[derive(Debug, Clone, Serialize)]
pub struct BuildReport {
    /// Rows the source yielded, including malformed ones.
    pub rows_read: u64,
    /// Records that passed validation and were tiled.
    pub valid_records: u64,
    /// Rows excluded from every zoom level.
    pub skipped_records: u64,
    /// Skip counts keyed by reason.
    pub skips_by_reason: BTreeMap<String, u64>,
    /// Distinct tile files written.
    pub tiles_written: u64,
    /// Total compressed bytes written.
    pub bytes_written: u64,
    /// Tiles that exceeded the configured record guard, if any.
    pub oversized_tiles: u64,
    pub min_zoom: u32,
    pub max_zoom: u32,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl BuildReport {
    pub(crate) fn start(min_zoom: u32, max_zoom: u32) -> Self {
        Self {
            rows_read: 0,
            valid_records: 0,
            skipped_records: 0,
            skips_by_reason: BTreeMap::new(),
            tiles_written: 0,
            bytes_written: 0,
            oversized_tiles: 0,
            min_zoom,
            max_zoom,
            started_at: Utc::now(),
            finished_at: Utc::now(),
        }
    }

    pub(crate) fn record_skip(&mut self, reason: SkipReason) {
        self.skipped_records += 1;
        *self
            .skips_by_reason
            .entry(reason.as_str().to_string())
            .or_insert(0) += 1;
    }

    pub fn duration(&self) -> chrono::Duration {
        self.finished_at - self.started_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_skip_tally() {
        let mut report = BuildReport::start(5, 12);
        report.record_skip(SkipReason::CoordinateOutOfRange);
        report.record_skip(SkipReason::CoordinateOutOfRange);
        report.record_skip(SkipReason::MalformedRow);

        assert_eq!(report.skipped_records, 3);
        assert_eq!(report.skips_by_reason["coordinate_out_of_range"], 2);
        assert_eq!(report.skips_by_reason["malformed_row"], 1);
    }
}
