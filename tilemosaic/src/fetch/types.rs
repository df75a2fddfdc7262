//! Fetch task and error types

use crate::coord::TileIndex;
use crate::provider::{TileRequest, TransportError};
use std::fmt;
use thiserror::Error;

/// One tile to fetch: where it lives in the pyramid, where it goes in the
/// grid, and how to request it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchTask {
    /// Absolute tile index
    pub tile: TileIndex,
    /// Column offset inside the grid
    pub dx: u32,
    /// Row offset inside the grid
    pub dy: u32,
    pub request: TileRequest,
}

/// Outcome of one fetch task as reported to the batch runner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskStatus {
    Success,
    Failed,
}

impl TaskStatus {
    pub fn is_success(&self) -> bool {
        matches!(self, TaskStatus::Success)
    }

    /// Numeric status code: 0 for success, 1 for failure.
    pub fn code(&self) -> u8 {
        match self {
            TaskStatus::Success => 0,
            TaskStatus::Failed => 1,
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskStatus::Success => write!(f, "success"),
            TaskStatus::Failed => write!(f, "failed"),
        }
    }
}

/// Errors writing a decoded tile to its destination.
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image encode error: {0}")]
    Encode(#[from] image::ImageError),

    /// The sink region does not cover the tile's offset
    #[error("Tile offset ({dx}, {dy}) is outside the sink region")]
    OutOfBounds { dx: u32, dy: u32 },
}

/// Errors from fetching a single tile.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Every attempt failed at the transport level
    #[error("Fetch failed after {attempts} attempt(s): {source}")]
    Transport {
        attempts: u32,
        #[source]
        source: TransportError,
    },

    /// The payload is not a 256×256 image
    #[error("Tile payload could not be decoded: {0}")]
    Decode(String),

    #[error("Tile sink write failed: {0}")]
    Sink(#[from] SinkError),
}
