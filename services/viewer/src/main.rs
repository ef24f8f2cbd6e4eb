//! Headless viewport inspector.
//!
//! Resolves a viewport against a tile tree (local directory or static HTTP
//! server), loads the covered tiles through the map client, and prints the
//! per-tile marker counts. Useful for smoke-testing a freshly built tree.

use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use tile_client::{FileTileFetcher, HttpTileFetcher, MapClient, TileFetcher, TileState};
use tile_common::Viewport;

#[derive(Parser, Debug)]
#[command(name = "viewer")]
#[command(about = "Resolve a viewport against a tile tree and report its contents")]
struct Args {
    /// Tile tree location: a directory or an http(s) base URL
    #[arg(short, long)]
    tiles: String,

    /// Viewport centre latitude
    #[arg(long)]
    lat: f64,

    /// Viewport centre longitude
    #[arg(long)]
    lon: f64,

    /// Zoom level
    #[arg(short, long)]
    zoom: u32,

    /// Viewport width in degrees of longitude
    #[arg(long, default_value_t = 0.5)]
    lon_span: f64,

    /// Viewport height in degrees of latitude
    #[arg(long, default_value_t = 0.3)]
    lat_span: f64,

    /// Maximum number of cached tiles
    #[arg(long, default_value_t = 256)]
    max_tiles: usize,

    /// Log level
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
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

    let fetcher: Arc<dyn TileFetcher> =
        if args.tiles.starts_with("http://") || args.tiles.starts_with("https://") {
            Arc::new(HttpTileFetcher::new(&args.tiles)?)
        } else {
            Arc::new(FileTileFetcher::new(&args.tiles))
        };

    let viewport = Viewport::centered(args.lon, args.lat, args.zoom, args.lon_span, args.lat_span)?;
    let coverage = viewport.tile_coverage();

    info!(
        tiles = %args.tiles,
        zoom = args.zoom,
        coverage = coverage.len(),
        "Resolving viewport"
    );

    let client = MapClient::new(fetcher, args.max_tiles);
    client.set_viewport(viewport).await;
    client.settled().await;

    let mut failed = 0usize;
    for coord in &coverage {
        if client.tile_state(coord).await == TileState::Failed {
            failed += 1;
            println!("{coord}: fetch failed");
        }
    }

    let visible = client.visible_features().await;
    let mut total = 0usize;
    for (coord, collection) in &visible {
        total += collection.len();
        println!("{coord}: {} markers", collection.len());
    }
    println!("total: {total} markers across {} tiles", visible.len());

    if failed == coverage.len() && !coverage.is_empty() {
        println!("no tile could be loaded; is the tile tree reachable?");
    }

    let stats = client.stats();
    info!(
        hits = stats.hits(),
        misses = stats.misses(),
        fetch_failures = stats.fetch_failures(),
        decode_failures = stats.decode_failures(),
        "Viewport resolved"
    );

    Ok(())
}
