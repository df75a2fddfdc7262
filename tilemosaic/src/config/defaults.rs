//! Default values for all configuration settings.
//!
//! Contains the `DEFAULT_*` constants and the `ConfigFile::default()`
//! implementation.

use std::path::PathBuf;

use super::file::config_directory;
use super::settings::*;
use crate::provider::{ProviderKind, DEFAULT_TIANDITU_KEY};
use crate::raster::Compression;

// =============================================================================
// Provider
// =============================================================================

/// Provider used when none is configured.
pub const DEFAULT_PROVIDER: ProviderKind = ProviderKind::Google;

// =============================================================================
// Download
// =============================================================================

/// Per-attempt HTTP timeout in seconds.
pub const DEFAULT_DOWNLOAD_TIMEOUT_SECS: u64 = 2;

/// HTTP attempts per tile.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Worker threads per batch.
pub const DEFAULT_CONCURRENCY: usize = 8;

/// Pass 1 aborts once this fraction of the grid has failed.
pub const DEFAULT_ABORT_RATIO: f64 = 0.10;

/// Retry sweeps over pass 1 failures.
pub const DEFAULT_RETRY_SWEEPS: u32 = 1;

// =============================================================================
// Grid
// =============================================================================

pub const DEFAULT_ZOOM: u8 = 19;

// =============================================================================
// Merge
// =============================================================================

pub const DEFAULT_BLOCK_SIZE: u32 = crate::merge::DEFAULT_BLOCK_SIZE;

pub const DEFAULT_MERGE_RETRIES: u32 = crate::merge::DEFAULT_MERGE_RETRIES;

/// JPEG quality for cached tiles and merge blocks.
pub const DEFAULT_JPEG_QUALITY: u8 = 90;

// =============================================================================
// Logging
// =============================================================================

/// Default log file (~/.tilemosaic/tilemosaic.log).
pub fn default_log_file() -> PathBuf {
    config_directory().join("tilemosaic.log")
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            provider: ProviderSettings {
                provider_type: DEFAULT_PROVIDER,
                tianditu_key: DEFAULT_TIANDITU_KEY.to_string(),
            },
            download: DownloadSettings {
                timeout: DEFAULT_DOWNLOAD_TIMEOUT_SECS,
                max_retries: DEFAULT_MAX_RETRIES,
                concurrency: DEFAULT_CONCURRENCY,
                abort_ratio: DEFAULT_ABORT_RATIO,
                retry_sweeps: DEFAULT_RETRY_SWEEPS,
            },
            grid: GridSettings { zoom: DEFAULT_ZOOM },
            merge: MergeSettings {
                block_size: DEFAULT_BLOCK_SIZE,
                merge_retries: DEFAULT_MERGE_RETRIES,
                compression: Compression::default(),
                jpeg_quality: DEFAULT_JPEG_QUALITY,
            },
            logging: LoggingSettings {
                file: default_log_file(),
            },
        }
    }
}
