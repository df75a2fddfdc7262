//! Merge command - stitch a tile cache into blocks, then into a GeoTIFF.

use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::Args;
use tilemosaic::fetch::TileCache;
use tilemosaic::merge::{
    merge_blocks_into_geotiff, merge_tiles_into_blocks, remove_tile_cache_if_complete,
};
use tilemosaic::orchestrator::{OrchestratorError, TileGrid};

use super::common::{
    resolve_compression, resolve_tile_format, resolve_zoom, CompressionArg, RegionArgs,
    TileFormatArg,
};
use crate::error::CliError;
use crate::runner::{ensure_dir, CliRunner};

/// Arguments for the merge command.
///
/// The region and zoom must be the ones the tile cache was fetched with.
#[derive(Debug, Args)]
pub struct MergeArgs {
    #[command(flatten)]
    pub region: RegionArgs,

    /// Zoom level (default: from config)
    #[arg(long, short)]
    pub zoom: Option<u8>,

    /// Tile cache directory written by `fetch`
    #[arg(long)]
    pub tiles: PathBuf,

    /// Output GeoTIFF path
    #[arg(long, short)]
    pub output: PathBuf,

    /// Directory for merged blocks (default: <tiles>_blocks)
    #[arg(long)]
    pub blocks: Option<PathBuf>,

    /// Block edge in tiles (default: from config)
    #[arg(long)]
    pub block_size: Option<u32>,

    /// GeoTIFF compression (default: from config)
    #[arg(long, value_enum)]
    pub compression: Option<CompressionArg>,

    /// Encoding of the cached tiles (default: detected from the cache)
    #[arg(long, value_enum)]
    pub tile_format: Option<TileFormatArg>,

    /// Encoding of the merged blocks (default: jpeg)
    #[arg(long, value_enum)]
    pub block_format: Option<TileFormatArg>,

    /// Delete the tile cache once the GeoTIFF is written and every tile was present
    #[arg(long)]
    pub remove_tiles: bool,
}

/// Run the merge command.
pub fn run(args: MergeArgs, runner: &CliRunner) -> Result<(), CliError> {
    runner.log_startup("merge");
    let config = runner.config();

    let request = args.region.to_request()?;
    let zoom = resolve_zoom(args.zoom, config);
    let grid = TileGrid::from_request(&request, zoom).map_err(OrchestratorError::from)?;

    if !args.tiles.is_dir() {
        return Err(CliError::InvalidArgument(format!(
            "Tile cache '{}' does not exist",
            args.tiles.display()
        )));
    }

    let mut options = config.merge_options();
    options.block_format = resolve_tile_format(args.block_format, config);
    options.compression = resolve_compression(args.compression, config);
    if let Some(block_size) = args.block_size {
        options.block_size = block_size;
    }

    let cache = open_cache(&args, runner)?;
    let blocks_dir = args
        .blocks
        .clone()
        .unwrap_or_else(|| default_blocks_dir(&args.tiles));
    if let Some(parent) = args.output.parent().filter(|p| !p.as_os_str().is_empty()) {
        ensure_dir(parent)?;
    }

    println!(
        "Merging {} x {} tiles from {} ({})",
        grid.cols(),
        grid.rows(),
        args.tiles.display(),
        cache.format().extension()
    );
    println!("  Blocks: {} ({} tiles per side)", blocks_dir.display(), options.block_size);
    println!("  Output: {} ({})", args.output.display(), options.compression);
    println!();

    let start = Instant::now();
    let blocks = merge_tiles_into_blocks(&cache, grid.cols(), grid.rows(), &blocks_dir, &options)?;
    println!(
        "Blocks: {} written, {} already merged, {} failed",
        blocks.written, blocks.skipped, blocks.failed
    );
    if blocks.missing_tiles > 0 {
        println!(
            "  {} of {} tiles missing from the cache, left black",
            blocks.missing_tiles,
            grid.tile_count()
        );
    }

    let transform = merge_blocks_into_geotiff(&blocks_dir, &grid, &args.output, &options)?;
    println!(
        "GeoTIFF written to {} in {:.1}s",
        args.output.display(),
        start.elapsed().as_secs_f64()
    );
    println!(
        "  Origin: {:.6}, {:.6}  Pixel size: {:.9} x {:.9} deg",
        transform.origin_lng, transform.origin_lat, transform.pixel_width, transform.pixel_height
    );

    if args.remove_tiles {
        if !blocks.is_complete() {
            println!(
                "Kept tile cache {}: {} tile(s) missing, {} block(s) failed",
                args.tiles.display(),
                blocks.missing_tiles,
                blocks.failed
            );
        } else {
            let removed = remove_tile_cache_if_complete(&cache, grid.cols(), grid.rows())
                .map_err(|error| CliError::Io {
                    path: args.tiles.clone(),
                    error,
                })?;
            if removed {
                println!("Removed tile cache {}", args.tiles.display());
            } else {
                println!(
                    "Kept tile cache {}: it does not hold exactly {} tiles",
                    args.tiles.display(),
                    grid.tile_count()
                );
            }
        }
    }

    Ok(())
}

/// Opens the tile cache. `--tile-format` wins; otherwise the format is
/// detected from the files, falling back to the configured one.
fn open_cache(args: &MergeArgs, runner: &CliRunner) -> Result<TileCache, CliError> {
    let fallback = resolve_tile_format(args.tile_format, runner.config());
    let cache = match args.tile_format {
        Some(_) => TileCache::create(&args.tiles, fallback),
        None => TileCache::open(&args.tiles, fallback),
    };
    cache.map_err(|error| CliError::Io {
        path: args.tiles.clone(),
        error,
    })
}

/// `<tiles>_blocks` next to the tile cache.
fn default_blocks_dir(tiles: &Path) -> PathBuf {
    let name = tiles
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "tiles".to_string());
    tiles.with_file_name(format!("{}_blocks", name))
}
