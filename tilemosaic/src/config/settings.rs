//! Settings structs for all configuration sections.
//!
//! Each struct represents one `[section]` of the INI config file.
//! These are pure data types with no parsing or serialization logic.

use crate::provider::ProviderKind;
use crate::raster::Compression;
use std::path::PathBuf;

/// Complete application configuration loaded from config.ini.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigFile {
    pub provider: ProviderSettings,
    pub download: DownloadSettings,
    pub grid: GridSettings,
    pub merge: MergeSettings,
    pub logging: LoggingSettings,
}

/// Provider configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderSettings {
    /// Imagery provider
    pub provider_type: ProviderKind,
    /// Tianditu developer key (only used when type = tianditu)
    pub tianditu_key: String,
}

/// Download configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct DownloadSettings {
    /// Per-attempt HTTP timeout in seconds
    pub timeout: u64,
    /// HTTP attempts per tile
    pub max_retries: u32,
    /// Worker threads per batch
    pub concurrency: usize,
    /// Fraction of failed tiles at which pass 1 aborts
    pub abort_ratio: f64,
    /// Retry sweeps over pass 1 failures
    pub retry_sweeps: u32,
}

/// Grid configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct GridSettings {
    pub zoom: u8,
}

/// Merge configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct MergeSettings {
    /// Tiles per block side
    pub block_size: u32,
    /// Decode attempts per block
    pub merge_retries: u32,
    /// GeoTIFF compression
    pub compression: Compression,
    /// JPEG quality for tiles and blocks (1-100)
    pub jpeg_quality: u8,
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct LoggingSettings {
    /// Log file path
    pub file: PathBuf,
}
