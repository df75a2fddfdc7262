//! Fetch command - fetch a region into an image, a tile cache or a GeoTIFF.

use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::{Args, ValueEnum};
use tilemosaic::orchestrator::{
    crop_centered, format_bytes, FetchReport, GridFetch, GridOutput, GridRequest, OutputMode,
    TileGrid,
};

use super::common::{
    resolve_compression, resolve_tile_format, resolve_zoom, save_image, CompressionArg,
    DownloadOverrides, RegionArgs, TileFormatArg,
};
use crate::error::CliError;
use crate::runner::{ensure_dir, CliRunner};

/// Where fetched tiles go.
#[derive(Debug, Clone, Copy, PartialEq, ValueEnum)]
pub enum OutputKind {
    /// One JPEG or PNG image held in memory until saved
    Image,
    /// One file per tile in a directory, for large regions and `merge`
    Cache,
    /// Georeferenced GeoTIFF
    Geotiff,
}

impl OutputKind {
    /// Output kind implied by the extension of `path`.
    pub fn infer(path: &Path) -> Self {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());
        match ext.as_deref() {
            Some("tif") | Some("tiff") => OutputKind::Geotiff,
            Some("jpg") | Some("jpeg") | Some("png") => OutputKind::Image,
            _ => OutputKind::Cache,
        }
    }
}

/// Arguments for the fetch command.
#[derive(Debug, Args)]
pub struct FetchArgs {
    #[command(flatten)]
    pub region: RegionArgs,

    /// Zoom level (default: from config)
    #[arg(long, short)]
    pub zoom: Option<u8>,

    /// Output path: an image file, a tile directory or a .tif
    #[arg(long, short)]
    pub output: PathBuf,

    /// Output kind (default: from the output extension)
    #[arg(long, value_enum)]
    pub mode: Option<OutputKind>,

    /// GeoTIFF compression (default: from config)
    #[arg(long, value_enum)]
    pub compression: Option<CompressionArg>,

    /// Encoding of cached tiles (default: jpeg)
    #[arg(long, value_enum)]
    pub tile_format: Option<TileFormatArg>,

    #[command(flatten)]
    pub download: DownloadOverrides,
}

/// Run the fetch command.
pub fn run(args: FetchArgs, runner: &CliRunner) -> Result<(), CliError> {
    runner.log_startup("fetch");
    let config = runner.config();

    let request = args.region.to_request()?;
    let zoom = resolve_zoom(args.zoom, config);
    let kind = args.mode.unwrap_or_else(|| OutputKind::infer(&args.output));
    let output = match kind {
        OutputKind::Image => OutputMode::Canvas,
        OutputKind::Cache => OutputMode::TileCache {
            dir: args.output.clone(),
            format: resolve_tile_format(args.tile_format, config),
        },
        OutputKind::Geotiff => {
            if let Some(parent) = args.output.parent().filter(|p| !p.as_os_str().is_empty()) {
                ensure_dir(parent)?;
            }
            OutputMode::GeoTiff {
                path: args.output.clone(),
                compression: resolve_compression(args.compression, config),
            }
        }
    };

    let progress = runner.progress();
    let orchestrator = runner.orchestrator(&args.download, progress.clone())?;

    println!("Fetching region at zoom {}", zoom);
    println!("  Provider: {}", orchestrator.resolver().kind());
    println!("  Output:   {} ({:?})", args.output.display(), kind);
    println!();

    let start = Instant::now();
    let result = orchestrator.fetch(&request, zoom, output);
    progress.finish();
    let GridFetch {
        grid,
        output,
        report,
    } = result?;

    print_report(&grid, &report, start.elapsed().as_secs_f64());

    match output {
        GridOutput::Canvas(canvas) => {
            let image = match request {
                GridRequest::CenterPixels {
                    center,
                    width,
                    height,
                } => crop_centered(&canvas, &grid, center, width, height),
                _ => canvas,
            };
            save_image(&args.output, &image, config)?;
            println!(
                "Saved {}x{} image to {}",
                image.width(),
                image.height(),
                args.output.display()
            );
        }
        GridOutput::TileCache { dir } => {
            println!("Tiles written to {}", dir.display());
            println!("Merge them with: tilemosaic merge --tiles {} ...", dir.display());
        }
        GridOutput::GeoTiff { path, transform } => {
            println!("GeoTIFF written to {}", path.display());
            println!(
                "  Origin: {:.6}, {:.6}  Pixel size: {:.9} x {:.9} deg",
                transform.origin_lng,
                transform.origin_lat,
                transform.pixel_width,
                transform.pixel_height
            );
        }
    }

    Ok(())
}

fn print_report(grid: &TileGrid, report: &FetchReport, elapsed_secs: f64) {
    println!(
        "Grid: {} x {} tiles ({} x {} px) from {}",
        grid.cols(),
        grid.rows(),
        grid.pixel_width(),
        grid.pixel_height(),
        grid.top_left()
    );
    println!(
        "Fetched {} tiles, {} already present, in {:.1}s ({}, {}/s)",
        report.stats.tiles_fetched,
        report.stats.tiles_skipped,
        elapsed_secs,
        format_bytes(report.stats.bytes_downloaded),
        format_bytes(report.stats.avg_bytes_per_sec as u64)
    );
    if report.pass1_failed > 0 {
        println!(
            "Retried {} failed tiles, recovered {}",
            report.pass1_failed,
            report.recovered()
        );
    }
    if !report.is_complete() {
        println!(
            "Warning: {} tiles could not be fetched and are left black",
            report.unrecovered.len()
        );
    }
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_kind_from_extension() {
        assert_eq!(OutputKind::infer(Path::new("out/wuhan.TIF")), OutputKind::Geotiff);
        assert_eq!(OutputKind::infer(Path::new("a.tiff")), OutputKind::Geotiff);
        assert_eq!(OutputKind::infer(Path::new("a.jpg")), OutputKind::Image);
        assert_eq!(OutputKind::infer(Path::new("a.png")), OutputKind::Image);
        assert_eq!(OutputKind::infer(Path::new("tiles")), OutputKind::Cache);
    }
}
