//! Configuration file handling for ~/.tilemosaic/config.ini.
//!
//! Loads and saves user configuration with sensible defaults.

use super::download::DownloadConfig;
use super::settings::ConfigFile;
use crate::fetch::TileFormat;
use crate::merge::MergeOptions;
use crate::provider::TileUrlResolver;
use ini::Ini;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Configuration file errors.
#[derive(Debug, Error)]
pub enum ConfigFileError {
    /// Failed to read config file
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] ini::Error),

    /// Failed to write config file
    #[error("Failed to write config file: {0}")]
    WriteError(String),

    /// Invalid configuration value
    #[error("Invalid configuration: {section}.{key} = '{value}' - {reason}")]
    InvalidValue {
        section: String,
        key: String,
        value: String,
        reason: String,
    },

    /// Failed to create config directory
    #[error("Failed to create config directory: {0}")]
    DirectoryError(std::io::Error),
}

impl ConfigFile {
    /// Load configuration from the default path (~/.tilemosaic/config.ini).
    pub fn load() -> Result<Self, ConfigFileError> {
        let path = config_file_path();
        Self::load_from(&path)
    }

    /// Load configuration from a specific path.
    ///
    /// If the file doesn't exist, returns defaults.
    pub fn load_from(path: &Path) -> Result<Self, ConfigFileError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let ini = Ini::load_from_file(path)?;
        super::parser::parse_ini(&ini)
    }

    /// Save configuration to the default path (~/.tilemosaic/config.ini).
    pub fn save(&self) -> Result<(), ConfigFileError> {
        let path = config_file_path();
        self.save_to(&path)
    }

    /// Save configuration to a specific path.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigFileError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(ConfigFileError::DirectoryError)?;
        }

        std::fs::write(path, self.to_ini_string())
            .map_err(|e| ConfigFileError::WriteError(e.to_string()))
    }

    /// The commented INI text [`save_to`](Self::save_to) writes.
    pub fn to_ini_string(&self) -> String {
        super::writer::to_config_string(self)
    }

    /// Download settings as a [`DownloadConfig`].
    pub fn download_config(&self) -> DownloadConfig {
        DownloadConfig::new()
            .with_timeout_secs(self.download.timeout)
            .with_max_retries(self.download.max_retries)
            .with_concurrency(self.download.concurrency)
            .with_abort_ratio(self.download.abort_ratio)
            .with_retry_sweeps(self.download.retry_sweeps)
    }

    /// Resolver for the configured provider.
    pub fn resolver(&self) -> TileUrlResolver {
        TileUrlResolver::new(self.provider.provider_type)
            .with_tianditu_key(self.provider.tianditu_key.clone())
    }

    /// Encoding for cached tiles and merge blocks.
    pub fn tile_format(&self) -> TileFormat {
        TileFormat::Jpeg {
            quality: self.merge.jpeg_quality,
        }
    }

    /// Merge settings as [`MergeOptions`].
    pub fn merge_options(&self) -> MergeOptions {
        MergeOptions {
            block_size: self.merge.block_size,
            merge_retries: self.merge.merge_retries,
            concurrency: self.download.concurrency,
            block_format: self.tile_format(),
            compression: self.merge.compression,
        }
    }
}

/// Get the path to the config directory (~/.tilemosaic).
pub fn config_directory() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".tilemosaic")
}

/// Get the path to the config file (~/.tilemosaic/config.ini).
pub fn config_file_path() -> PathBuf {
    config_directory().join("config.ini")
}
