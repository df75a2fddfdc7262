//! Raster merge engine
//!
//! Turns a tile cache into a GeoTIFF in two steps, both resumable:
//!
//! 1. [`merge_tiles_into_blocks`] stitches `block_size × block_size` tiles
//!    into block images and records them in a sidecar [`BlockIndex`].
//! 2. [`merge_blocks_into_geotiff`] streams the blocks, one block row at a
//!    time, into a georeferenced GeoTIFF.
//!
//! [`remove_tile_cache_if_complete`] cleans the cache up afterwards.

mod blocks;
mod cleanup;
mod index;
mod stream;

pub use blocks::{merge_tiles_into_blocks, BlockMergeReport};
pub use cleanup::remove_tile_cache_if_complete;
pub use index::{plan_blocks, BlockEntry, BlockIndex, INDEX_FILE};
pub use stream::merge_blocks_into_geotiff;

use crate::batch::BatchError;
use crate::fetch::TileFormat;
use crate::raster::{Compression, RasterError};
use std::path::PathBuf;
use thiserror::Error;

/// Tiles per block side.
pub const DEFAULT_BLOCK_SIZE: u32 = 60;

/// Decode attempts per block when merging into a GeoTIFF.
pub const DEFAULT_MERGE_RETRIES: u32 = 3;

/// Errors from the merge engine.
#[derive(Debug, Error)]
pub enum MergeError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid block index: {0}")]
    Index(#[from] serde_json::Error),

    #[error("No block index in {}", .0.display())]
    MissingIndex(PathBuf),

    /// The index on disk was built for another grid or block size
    #[error("Block index mismatch: {0}")]
    IndexMismatch(String),

    #[error("Block size must be at least 1")]
    InvalidBlockSize,

    #[error("Cannot read {}: {source}", path.display())]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("Block {file} is {found:?} pixels, expected {expected:?}")]
    BlockSize {
        file: String,
        expected: (u32, u32),
        found: (u32, u32),
    },

    /// Blocks still missing or unreadable after all retries
    #[error("Merge incomplete, {} block(s) unavailable: {}", blocks.len(), blocks.join(", "))]
    Incomplete { blocks: Vec<String> },

    #[error("Batch error: {0}")]
    Batch(#[from] BatchError),

    #[error("Raster error: {0}")]
    Raster(#[from] RasterError),
}

/// Merge settings.
#[derive(Debug, Clone, PartialEq)]
pub struct MergeOptions {
    /// Tiles per block side
    pub block_size: u32,
    /// Decode attempts per block in the GeoTIFF merge
    pub merge_retries: u32,
    /// Worker threads per batch
    pub concurrency: usize,
    /// Encoding of block images
    pub block_format: TileFormat,
    /// GeoTIFF compression
    pub compression: Compression,
}

impl Default for MergeOptions {
    fn default() -> Self {
        Self {
            block_size: DEFAULT_BLOCK_SIZE,
            merge_retries: DEFAULT_MERGE_RETRIES,
            concurrency: 8,
            block_format: TileFormat::default(),
            compression: Compression::default(),
        }
    }
}
