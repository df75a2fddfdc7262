//! Network statistics for a grid fetch.
//!
//! Thread-safe accumulation of download metrics across every fetch worker
//! of a request.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Instant;
use tracing::info;

/// Thread-safe network statistics.
///
/// Updated by fetch workers from any pool thread and read once the request
/// finishes.
///
/// # Example
///
/// ```
/// use tilemosaic::orchestrator::NetworkStats;
///
/// let stats = NetworkStats::new();
/// stats.record_tile_success(1024);
/// stats.record_tile_failure();
/// stats.record_retry();
///
/// let snapshot = stats.snapshot();
/// assert_eq!(snapshot.tiles_fetched, 1);
/// ```
pub struct NetworkStats {
    bytes_downloaded: AtomicU64,
    /// Tiles fetched over the network
    tiles_fetched: AtomicU64,
    /// Tiles already present in the sink
    tiles_skipped: AtomicU64,
    /// Failed task runs, one per pass a tile failed in
    tiles_failed: AtomicU64,
    retries: AtomicU64,
    started: Instant,
    /// Time of the last successful download
    last_download: Mutex<Option<Instant>>,
}

/// Snapshot of network statistics at a point in time.
#[derive(Debug, Clone)]
pub struct NetworkStatsSnapshot {
    /// Total bytes downloaded
    pub bytes_downloaded: u64,
    /// Tiles fetched over the network
    pub tiles_fetched: u64,
    /// Tiles already present in the sink
    pub tiles_skipped: u64,
    /// Failed task runs
    pub tiles_failed: u64,
    /// Number of retry attempts
    pub retries: u64,
    /// Seconds from the start of the request to the last download
    pub active_time_secs: f64,
    /// Average download speed over the active time
    pub avg_bytes_per_sec: f64,
}

impl NetworkStats {
    pub fn new() -> Self {
        Self {
            bytes_downloaded: AtomicU64::new(0),
            tiles_fetched: AtomicU64::new(0),
            tiles_skipped: AtomicU64::new(0),
            tiles_failed: AtomicU64::new(0),
            retries: AtomicU64::new(0),
            started: Instant::now(),
            last_download: Mutex::new(None),
        }
    }

    /// Record a successful tile download of `bytes` response bytes.
    pub fn record_tile_success(&self, bytes: usize) {
        self.bytes_downloaded
            .fetch_add(bytes as u64, Ordering::Relaxed);
        self.tiles_fetched.fetch_add(1, Ordering::Relaxed);

        if let Ok(mut last) = self.last_download.lock() {
            *last = Some(Instant::now());
        }
    }

    /// Record a tile that needed no fetch.
    pub fn record_tile_skipped(&self) {
        self.tiles_skipped.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a failed tile.
    pub fn record_tile_failure(&self) {
        self.tiles_failed.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a retry attempt.
    pub fn record_retry(&self) {
        self.retries.fetch_add(1, Ordering::Relaxed);
    }

    /// Get a snapshot of current statistics.
    pub fn snapshot(&self) -> NetworkStatsSnapshot {
        let bytes_downloaded = self.bytes_downloaded.load(Ordering::Relaxed);

        let active_time_secs = self
            .last_download
            .lock()
            .ok()
            .and_then(|last| *last)
            .map(|last| last.duration_since(self.started).as_secs_f64())
            .unwrap_or(0.0);

        let avg_bytes_per_sec = if active_time_secs > 0.0 {
            bytes_downloaded as f64 / active_time_secs
        } else {
            0.0
        };

        NetworkStatsSnapshot {
            bytes_downloaded,
            tiles_fetched: self.tiles_fetched.load(Ordering::Relaxed),
            tiles_skipped: self.tiles_skipped.load(Ordering::Relaxed),
            tiles_failed: self.tiles_failed.load(Ordering::Relaxed),
            retries: self.retries.load(Ordering::Relaxed),
            active_time_secs,
            avg_bytes_per_sec,
        }
    }
}

impl Default for NetworkStats {
    fn default() -> Self {
        Self::new()
    }
}

impl NetworkStatsSnapshot {
    /// Logs a one-line summary at info level.
    pub fn log_summary(&self) {
        info!(
            fetched = self.tiles_fetched,
            skipped = self.tiles_skipped,
            failed = self.tiles_failed,
            retries = self.retries,
            downloaded = %format_bytes(self.bytes_downloaded),
            elapsed_secs = self.active_time_secs,
            avg_speed = %format!("{}/s", format_bytes(self.avg_bytes_per_sec as u64)),
            "Network statistics"
        );
    }
}

/// Formats a byte count with a binary unit suffix.
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KiB", "MiB", "GiB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} {}", bytes, UNITS[0])
    } else {
        format!("{:.1} {}", value, UNITS[unit])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rayon::prelude::*;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_counts_by_outcome() {
        let stats = NetworkStats::default();
        stats.record_tile_success(1024);
        stats.record_tile_success(2048);
        stats.record_tile_skipped();
        stats.record_tile_failure();
        stats.record_retry();
        stats.record_retry();

        let snapshot = stats.snapshot();
        assert_eq!(
            (
                snapshot.tiles_fetched,
                snapshot.tiles_skipped,
                snapshot.tiles_failed,
                snapshot.retries
            ),
            (2, 1, 1, 2)
        );
        assert_eq!(snapshot.bytes_downloaded, 3072);
    }

    #[test]
    fn test_no_download_means_no_active_time() {
        let stats = NetworkStats::new();
        stats.record_tile_skipped();
        thread::sleep(Duration::from_millis(10));

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.active_time_secs, 0.0);
        assert_eq!(snapshot.avg_bytes_per_sec, 0.0);
    }

    #[test]
    fn test_speed_spans_start_to_last_download() {
        let stats = NetworkStats::new();
        thread::sleep(Duration::from_millis(40));
        stats.record_tile_success(400_000);

        let snapshot = stats.snapshot();
        assert!(snapshot.active_time_secs >= 0.04);
        assert!(snapshot.avg_bytes_per_sec > 0.0);
        assert!(snapshot.avg_bytes_per_sec <= 400_000.0 / 0.04);
    }

    #[test]
    fn test_counts_from_pool_threads() {
        let stats = NetworkStats::new();
        (0..500u32).into_par_iter().for_each(|i| {
            if i % 5 == 0 {
                stats.record_tile_failure();
            } else {
                stats.record_tile_success(256);
            }
        });

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.tiles_fetched, 400);
        assert_eq!(snapshot.tiles_failed, 100);
        assert_eq!(snapshot.bytes_downloaded, 400 * 256);
    }

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(0), "0 B");
        assert_eq!(format_bytes(1023), "1023 B");
        assert_eq!(format_bytes(2048), "2.0 KiB");
        assert_eq!(format_bytes(3 * 1024 * 1024 / 2), "1.5 MiB");
        assert_eq!(format_bytes(5 * 1024 * 1024 * 1024), "5.0 GiB");
    }
}
