//! Single-tile fetch with bounded retries

use super::sink::TileSink;
use super::types::{FetchError, FetchTask, TaskStatus};
use crate::coord::TILE_SIZE;
use crate::orchestrator::NetworkStats;
use crate::provider::{HttpClient, TileRequest};
use image::RgbImage;
use tracing::{debug, warn};

/// Default number of attempts per tile.
pub const DEFAULT_RETRY_LIMIT: u32 = 3;

/// Fetches a tile's bytes, making up to `retry_limit` attempts in total.
///
/// Any transport error or non-200 status uses up one attempt. A limit of 0
/// still makes one attempt.
pub fn fetch_tile_bytes<C: HttpClient + ?Sized>(
    client: &C,
    request: &TileRequest,
    retry_limit: u32,
) -> Result<Vec<u8>, FetchError> {
    fetch_with_retries(client, request, retry_limit, None)
}

fn fetch_with_retries<C: HttpClient + ?Sized>(
    client: &C,
    request: &TileRequest,
    retry_limit: u32,
    stats: Option<&NetworkStats>,
) -> Result<Vec<u8>, FetchError> {
    let attempts = retry_limit.max(1);
    let mut attempt = 1;
    loop {
        match client.get(&request.url, request.headers) {
            Ok(bytes) => return Ok(bytes),
            Err(e) if attempt < attempts => {
                debug!(url = %request.url, attempt, error = %e, "Tile fetch attempt failed, retrying");
                if let Some(stats) = stats {
                    stats.record_retry();
                }
                attempt += 1;
            }
            Err(e) => {
                return Err(FetchError::Transport {
                    attempts,
                    source: e,
                })
            }
        }
    }
}

/// Decodes a tile payload into a 256×256 RGB image.
///
/// Decoding is attempted once; a corrupt body is not retried.
pub fn decode_tile(bytes: &[u8]) -> Result<RgbImage, FetchError> {
    let img = image::load_from_memory(bytes).map_err(|e| FetchError::Decode(e.to_string()))?;
    if img.width() != TILE_SIZE || img.height() != TILE_SIZE {
        return Err(FetchError::Decode(format!(
            "expected {}x{} tile, got {}x{}",
            TILE_SIZE,
            TILE_SIZE,
            img.width(),
            img.height()
        )));
    }
    Ok(img.to_rgb8())
}

/// Fetches, decodes and stores one tile.
pub struct FetchWorker<'a, C: HttpClient + ?Sized> {
    client: &'a C,
    retry_limit: u32,
    stats: Option<&'a NetworkStats>,
}

impl<'a, C: HttpClient + ?Sized> FetchWorker<'a, C> {
    pub fn new(client: &'a C, retry_limit: u32) -> Self {
        Self {
            client,
            retry_limit,
            stats: None,
        }
    }

    /// Records downloads, retries and failures into `stats`.
    pub fn with_stats(mut self, stats: &'a NetworkStats) -> Self {
        self.stats = Some(stats);
        self
    }

    /// Runs one task. Failures are logged and reported as a status, never
    /// returned as errors.
    pub fn run<S: TileSink + ?Sized>(&self, task: &FetchTask, sink: &mut S) -> TaskStatus {
        if sink.is_present(task) {
            debug!(dx = task.dx, dy = task.dy, "Tile already present, skipping");
            if let Some(stats) = self.stats {
                stats.record_tile_skipped();
            }
            return TaskStatus::Success;
        }

        match self.fetch_into(task, sink) {
            Ok(()) => TaskStatus::Success,
            Err(e) => {
                warn!(tile = %task.tile, dx = task.dx, dy = task.dy, error = %e, "Tile failed");
                if let Some(stats) = self.stats {
                    stats.record_tile_failure();
                }
                TaskStatus::Failed
            }
        }
    }

    /// Like [`run`](Self::run) but returns the error.
    pub fn fetch_into<S: TileSink + ?Sized>(
        &self,
        task: &FetchTask,
        sink: &mut S,
    ) -> Result<(), FetchError> {
        let bytes = fetch_with_retries(self.client, &task.request, self.retry_limit, self.stats)?;
        let tile = decode_tile(&bytes)?;
        sink.write(task, &tile)?;
        // Counted only once the tile is in the sink
        if let Some(stats) = self.stats {
            stats.record_tile_success(bytes.len());
        }
        Ok(())
    }
}
