//! Build configuration.

use std::path::PathBuf;

use tile_common::MAX_ZOOM;

use crate::error::{BuildError, Result};

/// Default name of the latitude column in the source file.
pub const DEFAULT_LAT_COLUMN: &str = "latitude";
/// Default name of the longitude column in the source file.
pub const DEFAULT_LON_COLUMN: &str = "longitude";
/// Default number of rows buffered between flushes.
pub const DEFAULT_BATCH_ROWS: usize = 200_000;

/// Configuration for one build run.
#[derive(Debug, Clone)]
pub struct BuildConfig {
    /// Delimited text source with named columns.
    pub source: PathBuf,
    /// Root of the tile tree this build produces.
    pub output_root: PathBuf,
    /// Inclusive zoom range of the pyramid.
    pub min_zoom: u32,
    pub max_zoom: u32,
    /// Names of the coordinate columns.
    pub lat_column: String,
    pub lon_column: String,
    /// Columns to carry into feature properties. `None` keeps every column
    /// except the coordinate columns.
    pub keep_columns: Option<Vec<String>>,
    /// Rows buffered per flush; bounds memory on large inputs.
    pub batch_rows: usize,
    /// Optional guard: tiles holding more records than this are reported
    /// as oversized. Records are never dropped or split.
    pub max_tile_records: Option<usize>,
}

impl BuildConfig {
    pub fn new(
        source: impl Into<PathBuf>,
        output_root: impl Into<PathBuf>,
        min_zoom: u32,
        max_zoom: u32,
    ) -> Self {
        Self {
            source: source.into(),
            output_root: output_root.into(),
            min_zoom,
            max_zoom,
            lat_column: DEFAULT_LAT_COLUMN.to_string(),
            lon_column: DEFAULT_LON_COLUMN.to_string(),
            keep_columns: None,
            batch_rows: DEFAULT_BATCH_ROWS,
            max_tile_records: None,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.min_zoom > self.max_zoom {
            return Err(BuildError::InvalidConfig(format!(
                "min_zoom {} > max_zoom {}",
                self.min_zoom, self.max_zoom
            )));
        }
        if self.max_zoom > MAX_ZOOM {
            return Err(BuildError::InvalidConfig(format!(
                "max_zoom {} exceeds supported maximum {}",
                self.max_zoom, MAX_ZOOM
            )));
        }
        if self.batch_rows == 0 {
            return Err(BuildError::InvalidConfig(
                "batch_rows must be positive".to_string(),
            ));
        }
        if self.lat_column == self.lon_column {
            return Err(BuildError::InvalidConfig(format!(
                "latitude and longitude columns are both '{}'",
                self.lat_column
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = BuildConfig::new("obs.csv", "tiles", 5, 12);
        assert_eq!(config.lat_column, "latitude");
        assert_eq!(config.lon_column, "longitude");
        assert_eq!(config.batch_rows, DEFAULT_BATCH_ROWS);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_ranges() {
        assert!(BuildConfig::new("a", "b", 10, 5).validate().is_err());
        assert!(BuildConfig::new("a", "b", 0, 23).validate().is_err());

        let mut config = BuildConfig::new("a", "b", 0, 5);
        config.batch_rows = 0;
        assert!(config.validate().is_err());

        let mut config = BuildConfig::new("a", "b", 0, 5);
        config.lon_column = "latitude".to_string();
        assert!(config.validate().is_err());
    }
}
