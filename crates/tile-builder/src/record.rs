//! Per-row validation: each source row becomes an explicit outcome, either
//! a valid record or a counted skip with a reason.

use csv::StringRecord;
use serde_json::{Map, Value};

use crate::config::BuildConfig;
use crate::error::{BuildError, Result};

/// A validated input record: a point plus its attribute properties.
#[derive(Debug, Clone)]
pub struct Record {
    pub lon: f64,
    pub lat: f64,
    pub properties: Map<String, Value>,
}

/// Why a row was excluded from the build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SkipReason {
    /// Coordinate cell is empty.
    MissingValue,
    /// Coordinate cell does not parse as a number.
    InvalidNumber,
    /// Coordinate parsed but is NaN or infinite.
    NonFiniteCoordinate,
    /// Latitude outside [-90, 90] or longitude outside [-180, 180].
    CoordinateOutOfRange,
    /// The row itself could not be read (wrong field count, bad UTF-8).
    MalformedRow,
}

impl SkipReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            SkipReason::MissingValue => "missing_value",
            SkipReason::InvalidNumber => "invalid_number",
            SkipReason::NonFiniteCoordinate => "non_finite_coordinate",
            SkipReason::CoordinateOutOfRange => "coordinate_out_of_range",
            SkipReason::MalformedRow => "malformed_row",
        }
    }
}

/// Outcome of validating one source row.
#[derive(Debug, Clone)]
pub enum RecordOutcome {
    Valid(Record),
    Skipped(SkipReason),
}

/// Column layout resolved once from the source header.
#[derive(Debug, Clone)]
pub struct ColumnLayout {
    lat_index: usize,
    lon_index: usize,
    /// (index, name) of every column carried into properties.
    property_columns: Vec<(usize, String)>,
}

impl ColumnLayout {
    /// Resolve coordinate and property columns against the header row.
    ///
    /// Missing coordinate columns are a fatal configuration error. The
    /// property set is every remaining column, optionally restricted by
    /// `keep_columns`.
    pub fn from_headers(headers: &StringRecord, config: &BuildConfig) -> Result<Self> {
        let find = |name: &str| headers.iter().position(|h| h.trim() == name);

        let lat_index = find(&config.lat_column)
            .ok_or_else(|| BuildError::MissingColumn(config.lat_column.clone()))?;
        let lon_index = find(&config.lon_column)
            .ok_or_else(|| BuildError::MissingColumn(config.lon_column.clone()))?;

        let property_columns = headers
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != lat_index && *i != lon_index)
            .map(|(i, h)| (i, h.trim().to_string()))
            .filter(|(_, name)| match &config.keep_columns {
                Some(keep) => keep.iter().any(|k| k == name),
                None => true,
            })
            .collect();

        Ok(Self {
            lat_index,
            lon_index,
            property_columns,
        })
    }

    /// Validate one row.
    pub fn parse_row(&self, row: &StringRecord) -> RecordOutcome {
        let lat = match parse_coordinate(row.get(self.lat_index), -90.0, 90.0) {
            Ok(v) => v,
            Err(reason) => return RecordOutcome::Skipped(reason),
        };
        let lon = match parse_coordinate(row.get(self.lon_index), -180.0, 180.0) {
            Ok(v) => v,
            Err(reason) => return RecordOutcome::Skipped(reason),
        };

        let mut properties = Map::new();
        for (index, name) in &self.property_columns {
            let value = row.get(*index).unwrap_or("");
            properties.insert(name.clone(), Value::String(value.to_string()));
        }

        RecordOutcome::Valid(Record {
            lon,
            lat,
            properties,
        })
    }
}

fn parse_coordinate(cell: Option<&str>, min: f64, max: f64) -> std::result::Result<f64, SkipReason> {
    let cell = cell.map(str::trim).unwrap_or("");
    if cell.is_empty() {
        return Err(SkipReason::MissingValue);
    }
    let value: f64 = cell.parse().map_err(|_| SkipReason::InvalidNumber)?;
    if !value.is_finite() {
        return Err(SkipReason::NonFiniteCoordinate);
    }
    if value < min || value > max {
        return Err(SkipReason::CoordinateOutOfRange);
    }
    Ok(value)
}
