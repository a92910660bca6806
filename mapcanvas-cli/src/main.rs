//! MapCanvas CLI - Command-line interface
//!
//! Headless front end to the mapcanvas library: warms the tile cache for a
//! bounding box so an embedding application (or a later offline session)
//! starts with every tile already on disk.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use mapcanvas::cache::TileCache;
use mapcanvas::config::LayerConfig;
use mapcanvas::coord::{location_to_map, Location, Rect, MAX_LAT, MIN_LAT};
use mapcanvas::decode::ImageDecoder;
use mapcanvas::fetch::HttpTileFetcher;
use mapcanvas::loader::{LoadOutcome, TileLoader};
use mapcanvas::source::UrlTemplate;
use mapcanvas::tile::{visible_tiles, TileMatrix};

#[derive(Parser)]
#[command(name = "mapcanvas", version, about = "Slippy-map tile cache tooling")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Prefetch the tiles covering a bounding box into the cache.
    Fetch(FetchArgs),
}

#[derive(Args)]
struct FetchArgs {
    /// Tile URL template with {x}, {y}, {z} and optional {s} placeholders.
    #[arg(long)]
    template: String,

    /// Source identifier used in cache keys (filesystem-safe).
    #[arg(long, default_value = "default")]
    source_id: String,

    /// Subdomains substituted for {s}, comma separated.
    #[arg(long, value_delimiter = ',')]
    subdomains: Vec<String>,

    /// Zoom level to fetch.
    #[arg(long)]
    zoom: u8,

    /// Western edge of the bounding box in degrees.
    #[arg(long, allow_hyphen_values = true)]
    west: f64,

    /// Southern edge of the bounding box in degrees.
    #[arg(long, allow_hyphen_values = true)]
    south: f64,

    /// Eastern edge of the bounding box in degrees.
    #[arg(long, allow_hyphen_values = true)]
    east: f64,

    /// Northern edge of the bounding box in degrees.
    #[arg(long, allow_hyphen_values = true)]
    north: f64,

    /// Cache directory (defaults to the platform cache dir).
    #[arg(long)]
    cache_dir: Option<PathBuf>,

    /// Maximum simultaneous downloads.
    #[arg(long, default_value_t = 4)]
    concurrency: usize,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cli = Cli::parse();
    let result = match cli.command {
        Command::Fetch(args) => fetch(args).await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

async fn fetch(args: FetchArgs) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = LayerConfig::default().with_max_concurrent_fetches(args.concurrency);
    if let Some(dir) = args.cache_dir {
        config = config.with_cache_dir(dir);
    }
    config.validate()?;

    if args.zoom < config.min_zoom || args.zoom > config.max_zoom {
        return Err(format!(
            "zoom {} outside the supported range {}..={}",
            args.zoom, config.min_zoom, config.max_zoom
        )
        .into());
    }

    let mut source = UrlTemplate::new(args.source_id, args.template)?;
    if !args.subdomains.is_empty() {
        source = source.with_subdomains(args.subdomains)?;
    }
    source.validate()?;

    let cache = Arc::new(TileCache::new(
        config.cache_dir.clone(),
        config.max_memory_bytes,
    )?);
    let fetcher = Arc::new(HttpTileFetcher::new(config.fetch_timeout)?);
    let loader = TileLoader::new(cache, fetcher, Arc::new(ImageDecoder), &config);

    let matrix = TileMatrix::for_zoom(args.zoom);
    let bounds = pixel_bounds(&matrix, args.west, args.south, args.east, args.north);

    let generation = loader.begin_generation();
    let tiles: Vec<_> = visible_tiles(&matrix, bounds, 0)
        .map(|id| generation.tile(id))
        .collect();

    info!(
        tiles = tiles.len(),
        zoom = args.zoom,
        "Prefetching tiles into {}",
        config.cache_dir.display()
    );

    let outcomes = loader.load(&source, &tiles).await;

    let fetched = count(&outcomes, LoadOutcome::Fetched);
    let cached = count(&outcomes, LoadOutcome::CacheHit);
    let failed = count(&outcomes, LoadOutcome::Failed);

    println!(
        "{} tiles: {} downloaded, {} already cached, {} failed",
        outcomes.len(),
        fetched,
        cached,
        failed
    );

    if failed > 0 {
        return Err(format!("{} tiles failed to download", failed).into());
    }
    Ok(())
}

/// Converts a geographic bounding box to tile-matrix pixel bounds.
fn pixel_bounds(matrix: &TileMatrix, west: f64, south: f64, east: f64, north: f64) -> Rect {
    let north_west = location_to_map(Location::new(north.clamp(MIN_LAT, MAX_LAT), west));
    let south_east = location_to_map(Location::new(south.clamp(MIN_LAT, MAX_LAT), east));

    let x0 = matrix.scale * (north_west.x - matrix.top_left.x);
    let y0 = matrix.scale * (matrix.top_left.y - north_west.y);
    let x1 = matrix.scale * (south_east.x - matrix.top_left.x);
    let y1 = matrix.scale * (matrix.top_left.y - south_east.y);

    Rect::new(x0, y0, x1 - x0, y1 - y0)
}

fn count(outcomes: &[(mapcanvas::tile::TileId, LoadOutcome)], which: LoadOutcome) -> usize {
    outcomes.iter().filter(|(_, o)| *o == which).count()
}
