//! Orchestrator types

use super::grid::{GridError, TileGrid};
use super::stats::NetworkStatsSnapshot;
use crate::batch::BatchError;
use crate::config::DownloadConfig;
use crate::coord::{GeoPoint, GeoTransform};
use crate::fetch::TileFormat;
use crate::provider::ProviderError;
use crate::raster::{Compression, RasterError};
use image::RgbImage;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that abort a grid request.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// Pass 1 failures reached the abort threshold; nothing is returned
    #[error(
        "Too many failed tiles: {failed} of {total} (abort threshold {threshold:.1})"
    )]
    TooManyFailures {
        failed: usize,
        total: usize,
        threshold: f64,
    },

    #[error("Invalid grid: {0}")]
    Grid(#[from] GridError),

    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// Two tasks in one batch target the same region
    #[error("Overlapping fetch tasks at offset ({dx}, {dy})")]
    OverlappingTasks { dx: u32, dy: u32 },

    #[error("Batch error: {0}")]
    Batch(#[from] BatchError),

    #[error("Raster error: {0}")]
    Raster(#[from] RasterError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// How the region to fetch is described.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GridRequest {
    /// Explicit north-west and south-east corners
    Corners {
        top_left: GeoPoint,
        bottom_right: GeoPoint,
    },
    /// Center plus ground half-extents in kilometres per axis
    CenterRadius {
        center: GeoPoint,
        half_width_km: f64,
        half_height_km: f64,
    },
    /// Center plus desired output size in pixels
    CenterPixels {
        center: GeoPoint,
        width: u32,
        height: u32,
    },
}

/// Where fetched tiles go.
#[derive(Debug, Clone, PartialEq)]
pub enum OutputMode {
    /// One in-memory RGB canvas
    Canvas,
    /// One file per tile in `dir`, for a later merge
    TileCache { dir: PathBuf, format: TileFormat },
    /// Straight into a GeoTIFF at `path`
    GeoTiff {
        path: PathBuf,
        compression: Compression,
    },
}

/// Final product of a successful grid request.
#[derive(Debug)]
pub enum GridOutput {
    Canvas(RgbImage),
    TileCache { dir: PathBuf },
    GeoTiff {
        path: PathBuf,
        transform: GeoTransform,
    },
}

impl GridOutput {
    /// The canvas, if this output is one.
    pub fn into_canvas(self) -> Option<RgbImage> {
        match self {
            GridOutput::Canvas(canvas) => Some(canvas),
            _ => None,
        }
    }
}

/// Fetch policy knobs.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchPolicy {
    /// Pass 1 aborts once failures reach this fraction of the grid
    pub abort_ratio: f64,
    /// Number of retry sweeps over pass 1 failures
    pub retry_sweeps: u32,
    /// HTTP attempts per tile
    pub retry_limit: u32,
    /// Worker threads per batch
    pub concurrency: usize,
}

impl Default for FetchPolicy {
    fn default() -> Self {
        Self {
            abort_ratio: 0.10,
            retry_sweeps: 1,
            retry_limit: 3,
            concurrency: 8,
        }
    }
}

impl FetchPolicy {
    /// Builds a policy from download settings.
    pub fn from_config(config: &DownloadConfig) -> Self {
        Self {
            abort_ratio: config.abort_ratio(),
            retry_sweeps: config.retry_sweeps(),
            retry_limit: config.max_retries(),
            concurrency: config.concurrency(),
        }
    }

    /// Failure count at which pass 1 aborts.
    pub fn abort_threshold(&self, total: usize) -> f64 {
        self.abort_ratio * total as f64
    }

    /// Whether `failed` failures out of `total` tiles abort the request.
    pub fn should_abort(&self, failed: usize, total: usize) -> bool {
        failed > 0 && failed as f64 >= self.abort_threshold(total)
    }
}

/// What happened during a successful request.
#[derive(Debug, Clone)]
pub struct FetchReport {
    pub total: usize,
    /// Tiles that failed in pass 1
    pub pass1_failed: usize,
    /// Offsets still missing after the retry sweeps
    pub unrecovered: Vec<(u32, u32)>,
    pub stats: NetworkStatsSnapshot,
}

impl FetchReport {
    pub fn recovered(&self) -> usize {
        self.pass1_failed - self.unrecovered.len()
    }

    pub fn is_complete(&self) -> bool {
        self.unrecovered.is_empty()
    }
}

/// Result of [`GridOrchestrator::fetch`](super::GridOrchestrator::fetch).
#[derive(Debug)]
pub struct GridFetch {
    pub grid: TileGrid,
    pub output: GridOutput,
    pub report: FetchReport,
}
