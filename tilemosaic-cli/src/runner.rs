//! CLI runner for common setup and operations.
//!
//! Encapsulates config loading, logging initialization and orchestrator
//! construction to reduce duplication across command handlers.

use crate::commands::common::DownloadOverrides;
use crate::error::CliError;
use crate::progress::BarProgress;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tilemosaic::config::{config_file_path, ConfigFile};
use tilemosaic::logging::{init_logging, split_log_path, LoggingGuard};
use tilemosaic::orchestrator::{FetchPolicy, GridOrchestrator};
use tilemosaic::provider::{ReqwestClient, TileUrlResolver};
use tracing::info;

/// Runner that manages CLI lifecycle and common operations.
pub struct CliRunner {
    /// Logging guard - keeps logging active while runner exists
    #[allow(dead_code)]
    logging_guard: LoggingGuard,
    /// Loaded configuration file
    config: ConfigFile,
    /// Whether log lines also go to stdout
    verbose: bool,
}

impl CliRunner {
    /// Create a new CLI runner, loading config and initializing logging.
    ///
    /// With `verbose` set, log output is mirrored to stdout and progress
    /// bars are hidden so the two do not interleave.
    pub fn new(config_path: Option<&Path>, verbose: bool) -> Result<Self, CliError> {
        let path = config_path
            .map(Path::to_path_buf)
            .unwrap_or_else(config_file_path);
        let config = ConfigFile::load_from(&path)?;

        let (log_dir, log_file) = split_log_path(&config.logging.file);
        let logging_guard = init_logging(&log_dir, &log_file, verbose)
            .map_err(|e| CliError::LoggingInit(e.to_string()))?;

        Ok(Self {
            logging_guard,
            config,
            verbose,
        })
    }

    /// Get the loaded configuration.
    pub fn config(&self) -> &ConfigFile {
        &self.config
    }

    /// Log startup information for a command.
    pub fn log_startup(&self, command: &str) {
        info!("tilemosaic v{}", tilemosaic::VERSION);
        info!("tilemosaic CLI: {} command", command);
    }

    /// Progress display for one fetch, hidden in verbose mode.
    pub fn progress(&self) -> Arc<BarProgress> {
        if self.verbose {
            Arc::new(BarProgress::hidden())
        } else {
            Arc::new(BarProgress::new())
        }
    }

    /// Builds an orchestrator from the config with CLI overrides applied.
    pub fn orchestrator(
        &self,
        overrides: &DownloadOverrides,
        progress: Arc<BarProgress>,
    ) -> Result<GridOrchestrator<ReqwestClient>, CliError> {
        let download = overrides.apply(self.config.download_config())?;
        let client =
            ReqwestClient::with_timeout(download.timeout()).map_err(CliError::HttpClient)?;

        let mut resolver = self.config.resolver();
        if let Some(provider) = overrides.provider {
            resolver = TileUrlResolver::new(provider.into())
                .with_tianditu_key(self.config.provider.tianditu_key.clone());
        }
        info!(
            provider = %resolver.kind(),
            concurrency = download.concurrency(),
            retries = download.max_retries(),
            timeout_secs = download.timeout_secs(),
            "Orchestrator configured"
        );

        Ok(
            GridOrchestrator::new(client, resolver, FetchPolicy::from_config(&download))
                .with_progress(progress),
        )
    }
}

/// Creates `dir` and its parents.
pub fn ensure_dir(dir: &Path) -> Result<PathBuf, CliError> {
    std::fs::create_dir_all(dir).map_err(|error| CliError::Io {
        path: dir.to_path_buf(),
        error,
    })?;
    Ok(dir.to_path_buf())
}
