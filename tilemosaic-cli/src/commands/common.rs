//! Common types and utilities shared across CLI commands.

use clap::{Args, ValueEnum};
use image::RgbImage;
use std::fs;
use std::path::Path;
use tilemosaic::config::{ConfigFile, DownloadConfig};
use tilemosaic::coord::GeoPoint;
use tilemosaic::fetch::TileFormat;
use tilemosaic::orchestrator::GridRequest;
use tilemosaic::provider::ProviderKind;
use tilemosaic::raster::Compression;

use crate::error::CliError;

/// Imagery provider selection for CLI arguments.
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq)]
pub enum ProviderType {
    /// Tianditu satellite imagery (developer key from config, max zoom 18)
    Tianditu,
    /// Google satellite tiles (max zoom 20)
    Google,
    /// Bing aerial imagery (max zoom 19)
    Bing,
    /// ArcGIS World Imagery (max zoom 19)
    Arcgis,
}

impl From<ProviderType> for ProviderKind {
    fn from(provider: ProviderType) -> Self {
        match provider {
            ProviderType::Tianditu => ProviderKind::Tianditu,
            ProviderType::Google => ProviderKind::Google,
            ProviderType::Bing => ProviderKind::Bing,
            ProviderType::Arcgis => ProviderKind::ArcGis,
        }
    }
}

/// GeoTIFF compression selection for CLI arguments.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum CompressionArg {
    None,
    Lzw,
    Deflate,
}

impl From<CompressionArg> for Compression {
    fn from(arg: CompressionArg) -> Self {
        match arg {
            CompressionArg::None => Compression::None,
            CompressionArg::Lzw => Compression::Lzw,
            CompressionArg::Deflate => Compression::Deflate,
        }
    }
}

/// Encoding of cached tiles and merge blocks.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum TileFormatArg {
    /// JPEG at the configured quality
    Jpeg,
    /// Lossless PNG
    Png,
}

/// Resolve the tile encoding from CLI args and config.
pub fn resolve_tile_format(cli: Option<TileFormatArg>, config: &ConfigFile) -> TileFormat {
    match cli {
        Some(TileFormatArg::Png) => TileFormat::Png,
        Some(TileFormatArg::Jpeg) | None => config.tile_format(),
    }
}

/// Resolve GeoTIFF compression from CLI args and config.
pub fn resolve_compression(cli: Option<CompressionArg>, config: &ConfigFile) -> Compression {
    cli.map(Compression::from)
        .unwrap_or(config.merge.compression)
}

/// Resolve the zoom level from CLI args and config.
pub fn resolve_zoom(cli: Option<u8>, config: &ConfigFile) -> u8 {
    cli.unwrap_or(config.grid.zoom)
}

/// Download settings that override `[download]` and `[provider]` in config.
#[derive(Debug, Clone, Default, Args)]
pub struct DownloadOverrides {
    /// Imagery provider (default: from config)
    #[arg(long, value_enum)]
    pub provider: Option<ProviderType>,

    /// Concurrent tile downloads per column batch
    #[arg(long)]
    pub concurrency: Option<usize>,

    /// HTTP attempts per tile within one pass
    #[arg(long)]
    pub retries: Option<u32>,

    /// Per-attempt HTTP timeout in seconds
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Share of failed tiles in the first pass that aborts the request (0-1)
    #[arg(long)]
    pub abort_ratio: Option<f64>,

    /// Number of second-pass sweeps over failed tiles
    #[arg(long)]
    pub retry_sweeps: Option<u32>,
}

impl DownloadOverrides {
    /// Applies the given overrides on top of `config`.
    pub fn apply(&self, config: DownloadConfig) -> Result<DownloadConfig, CliError> {
        let mut config = config;
        if self.concurrency == Some(0) || self.retries == Some(0) || self.timeout == Some(0) {
            return Err(CliError::InvalidArgument(
                "--concurrency, --retries and --timeout must be at least 1".to_string(),
            ));
        }
        if let Some(ratio) = self.abort_ratio.filter(|r| !(0.0..=1.0).contains(r)) {
            return Err(CliError::InvalidArgument(format!(
                "--abort-ratio must be between 0 and 1, got {}",
                ratio
            )));
        }

        if let Some(concurrency) = self.concurrency {
            config = config.with_concurrency(concurrency);
        }
        if let Some(retries) = self.retries {
            config = config.with_max_retries(retries);
        }
        if let Some(timeout) = self.timeout {
            config = config.with_timeout_secs(timeout);
        }
        if let Some(ratio) = self.abort_ratio {
            config = config.with_abort_ratio(ratio);
        }
        if let Some(sweeps) = self.retry_sweeps {
            config = config.with_retry_sweeps(sweeps);
        }
        Ok(config)
    }
}

/// Region of a request: two corners, a centre with a ground radius, or a
/// centre with a pixel size.
#[derive(Debug, Clone, Default, Args)]
pub struct RegionArgs {
    /// Top-left corner as "lng,lat"
    #[arg(long, value_parser = parse_point, allow_hyphen_values = true)]
    pub top_left: Option<GeoPoint>,

    /// Bottom-right corner as "lng,lat"
    #[arg(long, value_parser = parse_point, allow_hyphen_values = true)]
    pub bottom_right: Option<GeoPoint>,

    /// Centre point as "lng,lat"
    #[arg(long, value_parser = parse_point, allow_hyphen_values = true)]
    pub center: Option<GeoPoint>,

    /// Half of the region width in km, around --center
    #[arg(long)]
    pub half_width_km: Option<f64>,

    /// Half of the region height in km (default: --half-width-km)
    #[arg(long)]
    pub half_height_km: Option<f64>,

    /// Output width in pixels, around --center
    #[arg(long)]
    pub width: Option<u32>,

    /// Output height in pixels (default: --width)
    #[arg(long)]
    pub height: Option<u32>,
}

impl RegionArgs {
    /// Builds the grid request these arguments describe.
    pub fn to_request(&self) -> Result<GridRequest, CliError> {
        match (self.top_left, self.bottom_right, self.center) {
            (Some(top_left), Some(bottom_right), None) => Ok(GridRequest::Corners {
                top_left,
                bottom_right,
            }),
            (None, None, Some(center)) => match (self.half_width_km, self.width) {
                (Some(half_width_km), None) => Ok(GridRequest::CenterRadius {
                    center,
                    half_width_km,
                    half_height_km: self.half_height_km.unwrap_or(half_width_km),
                }),
                (None, Some(width)) => Ok(GridRequest::CenterPixels {
                    center,
                    width,
                    height: self.height.unwrap_or(width),
                }),
                _ => Err(CliError::InvalidArgument(
                    "--center needs exactly one of --half-width-km or --width".to_string(),
                )),
            },
            _ => Err(CliError::InvalidArgument(
                "Give either --top-left and --bottom-right, or --center".to_string(),
            )),
        }
    }
}

/// Saves `image` as PNG or JPEG depending on the extension of `path`.
///
/// JPEG uses the configured quality. Missing parent directories are created.
pub fn save_image(path: &Path, image: &RgbImage, config: &ConfigFile) -> Result<(), CliError> {
    let io_error = |error: std::io::Error| CliError::Io {
        path: path.to_path_buf(),
        error,
    };
    let format = match path.extension().and_then(|e| e.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("png") => TileFormat::Png,
        _ => config.tile_format(),
    };
    let bytes = format.encode(image).map_err(|error| CliError::ImageWrite {
        path: path.to_path_buf(),
        error,
    })?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(io_error)?;
    }
    fs::write(path, bytes).map_err(io_error)
}

/// Parses "lng,lat" into a point.
pub fn parse_point(s: &str) -> Result<GeoPoint, String> {
    let (lng, lat) = s
        .split_once(',')
        .ok_or_else(|| format!("expected \"lng,lat\", got '{}'", s))?;
    let lng: f64 = lng
        .trim()
        .parse()
        .map_err(|_| format!("invalid longitude '{}'", lng.trim()))?;
    let lat: f64 = lat
        .trim()
        .parse()
        .map_err(|_| format!("invalid latitude '{}'", lat.trim()))?;
    Ok(GeoPoint::new(lng, lat))
}
