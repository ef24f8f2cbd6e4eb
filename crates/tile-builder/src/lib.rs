//! TileBuilder: one-shot batch transform of geolocated records into a
//! pyramid of compressed GeoJSON tiles on disk.
//!
//! Records stream from a delimited text source, are validated, assigned to
//! a tile at every configured zoom level, and flushed in batches so memory
//! stays bounded regardless of input size. Bad rows are counted and
//! skipped; filesystem failures abort the build so a partial tree is never
//! mistaken for a complete one.

pub mod builder;
pub mod config;
pub mod error;
pub mod record;
pub mod report;

pub use builder::TileBuilder;
pub use config::{BuildConfig, DEFAULT_BATCH_ROWS, DEFAULT_LAT_COLUMN, DEFAULT_LON_COLUMN};
pub use error::{BuildError, Result};
pub use record::{Record, RecordOutcome, SkipReason};
pub use report::BuildReport;
