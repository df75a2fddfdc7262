//! Download configuration.

use super::defaults::{
    DEFAULT_ABORT_RATIO, DEFAULT_CONCURRENCY, DEFAULT_DOWNLOAD_TIMEOUT_SECS, DEFAULT_MAX_RETRIES,
    DEFAULT_RETRY_SWEEPS,
};
use std::time::Duration;

/// Configuration for tile downloading and orchestration.
///
/// Groups all parameters needed to configure the fetch pipeline,
/// providing sensible defaults while allowing customization.
///
/// # Example
///
/// ```
/// use tilemosaic::config::DownloadConfig;
///
/// // Using defaults
/// let config = DownloadConfig::default();
/// assert_eq!(config.timeout_secs(), 2);
/// assert_eq!(config.max_retries(), 3);
/// assert_eq!(config.concurrency(), 8);
///
/// // Custom configuration
/// let config = DownloadConfig::new()
///     .with_timeout_secs(10)
///     .with_max_retries(5)
///     .with_abort_ratio(0.25);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DownloadConfig {
    /// Per-attempt HTTP timeout (in seconds)
    timeout_secs: u64,
    /// HTTP attempts per tile
    max_retries: u32,
    /// Worker threads per batch
    concurrency: usize,
    /// Fraction of failed tiles at which pass 1 aborts
    abort_ratio: f64,
    /// Retry sweeps over pass 1 failures
    retry_sweeps: u32,
}

impl DownloadConfig {
    /// Create a new download configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the per-attempt HTTP timeout in seconds. Default: 2 seconds.
    pub fn with_timeout_secs(mut self, timeout: u64) -> Self {
        self.timeout_secs = timeout;
        self
    }

    /// Set the number of HTTP attempts per tile.
    ///
    /// A tile is tried at most this many times within one pass before it
    /// counts as failed. Default: 3.
    pub fn with_max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    /// Set the number of worker threads per batch. Default: 8.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    /// Set the fraction of failed tiles at which pass 1 aborts.
    /// Default: 0.10.
    pub fn with_abort_ratio(mut self, ratio: f64) -> Self {
        self.abort_ratio = ratio;
        self
    }

    /// Set the number of retry sweeps over pass 1 failures. Default: 1.
    pub fn with_retry_sweeps(mut self, sweeps: u32) -> Self {
        self.retry_sweeps = sweeps;
        self
    }

    pub fn timeout_secs(&self) -> u64 {
        self.timeout_secs
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    pub fn abort_ratio(&self) -> f64 {
        self.abort_ratio
    }

    pub fn retry_sweeps(&self) -> u32 {
        self.retry_sweeps
    }
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            timeout_secs: DEFAULT_DOWNLOAD_TIMEOUT_SECS,
            max_retries: DEFAULT_MAX_RETRIES,
            concurrency: DEFAULT_CONCURRENCY,
            abort_ratio: DEFAULT_ABORT_RATIO,
            retry_sweeps: DEFAULT_RETRY_SWEEPS,
        }
    }
}
