//! Configuration for tilemosaic.
//!
//! The user configuration lives in `~/.tilemosaic/config.ini`. Settings
//! structs live in [`settings`], constants in [`defaults`], parsing in
//! `parser` and serialization in `writer`. [`DownloadConfig`] groups the
//! knobs of the fetch pipeline.
//!
//! # Example
//!
//! ```
//! use tilemosaic::config::DownloadConfig;
//!
//! let config = DownloadConfig::new()
//!     .with_concurrency(16)
//!     .with_max_retries(5);
//! assert_eq!(config.concurrency(), 16);
//! ```

mod defaults;
mod download;
mod file;
mod parser;
mod settings;
mod writer;

pub use defaults::*;
pub use download::DownloadConfig;
pub use file::{config_directory, config_file_path, ConfigFileError};
pub use settings::{
    ConfigFile, DownloadSettings, GridSettings, LoggingSettings, MergeSettings, ProviderSettings,
};
