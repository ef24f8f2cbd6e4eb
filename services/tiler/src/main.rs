//! Tile pyramid builder CLI.
//!
//! Transforms a CSV of point records into a gzipped GeoJSON tile tree that
//! any static file server can expose.

use anyhow::Result;
use clap::Parser;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use tile_builder::{BuildConfig, TileBuilder, DEFAULT_BATCH_ROWS};

#[derive(Parser, Debug)]
#[command(name = "tiler")]
#[command(about = "Build a slippy-map tile pyramid from a CSV of point records")]
struct Args {
    /// Source CSV with named coordinate columns
    #[arg(short, long)]
    csv: String,

    /// Root directory of the tile tree to write
    #[arg(short, long)]
    out: String,

    /// Lowest zoom level of the pyramid (inclusive)
    #[arg(long, default_value_t = 0)]
    min_zoom: u32,

    /// Highest zoom level of the pyramid (inclusive)
    #[arg(long, default_value_t = 12)]
    max_zoom: u32,

    /// Name of the latitude column
    #[arg(long, default_value = tile_builder::DEFAULT_LAT_COLUMN)]
    lat_col: String,

    /// Name of the longitude column
    #[arg(long, default_value = tile_builder::DEFAULT_LON_COLUMN)]
    lon_col: String,

    /// Columns to carry into feature properties (default: all non-coordinate
    /// columns)
    #[arg(long, value_delimiter = ',')]
    keep_cols: Option<Vec<String>>,

    /// Rows buffered between flushes
    #[arg(long, default_value_t = DEFAULT_BATCH_ROWS)]
    batch: usize,

    /// Report tiles holding more records than this as oversized
    #[arg(long)]
    max_tile_records: Option<usize>,

    /// Log level
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize tracing
    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .with_writer(std::io::stderr)
        .json()
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    info!("Starting tile build");

    let mut config = BuildConfig::new(&args.csv, &args.out, args.min_zoom, args.max_zoom);
    config.lat_column = args.lat_col;
    config.lon_column = args.lon_col;
    config.keep_columns = args.keep_cols;
    config.batch_rows = args.batch;
    config.max_tile_records = args.max_tile_records;

    let report = TileBuilder::new(config).run()?;

    info!(
        tiles = report.tiles_written,
        valid = report.valid_records,
        skipped = report.skipped_records,
        seconds = report.duration().num_seconds(),
        "Build finished"
    );

    // Machine-readable summary on stdout; logs go to stderr
    println!("{}", serde_json::to_string_pretty(&report)?);

    Ok(())
}
