//! CLI error handling with user-friendly messages.
//!
//! Centralizes error handling for the CLI, providing consistent formatting
//! and appropriate exit codes.

use std::fmt;
use std::path::PathBuf;
use std::process;
use tilemosaic::config::ConfigFileError;
use tilemosaic::merge::MergeError;
use tilemosaic::orchestrator::OrchestratorError;
use tilemosaic::provider::TransportError;
use tilemosaic::raster::RasterError;

/// CLI-specific errors with user-friendly messages.
#[derive(Debug)]
pub enum CliError {
    /// Failed to initialize logging
    LoggingInit(String),
    /// Configuration file could not be read or written
    Config(ConfigFileError),
    /// Invalid or conflicting command-line arguments
    InvalidArgument(String),
    /// Failed to build the HTTP client
    HttpClient(TransportError),
    /// Grid fetch failed or was aborted
    Fetch(OrchestratorError),
    /// Tile or block merge failed
    Merge(MergeError),
    /// GeoTIFF could not be read
    Inspect(RasterError),
    /// Failed to write an output image
    ImageWrite {
        path: PathBuf,
        error: image::ImageError,
    },
    /// Failed to create or read a file or directory
    Io { path: PathBuf, error: std::io::Error },
    /// Some locations of a batch run failed
    BatchIncomplete { failed: usize, total: usize },
}

impl CliError {
    /// Exit the process with an appropriate error message and code.
    pub fn exit(&self) -> ! {
        eprintln!("Error: {}", self);

        // Print additional help for specific errors
        match self {
            CliError::Fetch(OrchestratorError::TooManyFailures { .. }) => {
                eprintln!();
                eprintln!("Too many tiles failed in the first pass. Common causes:");
                eprintln!("  1. The provider is rate limiting: lower --concurrency");
                eprintln!("  2. The network is slow: raise --timeout");
                eprintln!("  3. The region is partly outside provider coverage");
            }
            CliError::Merge(MergeError::Incomplete { .. }) => {
                eprintln!();
                eprintln!("Rerun the merge once the missing tiles or blocks are in place.");
                eprintln!("Blocks already merged are kept and will be skipped.");
            }
            _ => {}
        }

        process::exit(1)
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::LoggingInit(msg) => write!(f, "Failed to initialize logging: {}", msg),
            CliError::Config(e) => write!(f, "Configuration error: {}", e),
            CliError::InvalidArgument(msg) => write!(f, "{}", msg),
            CliError::HttpClient(e) => write!(f, "{}", e),
            CliError::Fetch(e) => write!(f, "Fetch failed: {}", e),
            CliError::Merge(MergeError::Incomplete { blocks }) => write!(
                f,
                "Merge incomplete, {} block(s) unavailable: {}",
                blocks.len(),
                blocks.join(", ")
            ),
            CliError::Merge(e) => write!(f, "Merge failed: {}", e),
            CliError::Inspect(e) => write!(f, "Failed to read GeoTIFF: {}", e),
            CliError::ImageWrite { path, error } => {
                write!(f, "Failed to write image '{}': {}", path.display(), error)
            }
            CliError::Io { path, error } => write!(f, "'{}': {}", path.display(), error),
            CliError::BatchIncomplete { failed, total } => {
                write!(f, "{} of {} locations failed", failed, total)
            }
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::Config(e) => Some(e),
            CliError::HttpClient(e) => Some(e),
            CliError::Fetch(e) => Some(e),
            CliError::Merge(e) => Some(e),
            CliError::Inspect(e) => Some(e),
            CliError::ImageWrite { error, .. } => Some(error),
            CliError::Io { error, .. } => Some(error),
            _ => None,
        }
    }
}

impl From<ConfigFileError> for CliError {
    fn from(e: ConfigFileError) -> Self {
        CliError::Config(e)
    }
}

impl From<OrchestratorError> for CliError {
    fn from(e: OrchestratorError) -> Self {
        CliError::Fetch(e)
    }
}

impl From<MergeError> for CliError {
    fn from(e: MergeError) -> Self {
        CliError::Merge(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_incomplete_merge_lists_blocks() {
        let err = CliError::from(MergeError::Incomplete {
            blocks: vec!["block_0_0_2_2.jpg".to_string(), "block_2_0_3_2.jpg".to_string()],
        });
        assert_eq!(
            err.to_string(),
            "Merge incomplete, 2 block(s) unavailable: block_0_0_2_2.jpg, block_2_0_3_2.jpg"
        );
    }

    #[test]
    fn test_batch_incomplete_message() {
        let err = CliError::BatchIncomplete {
            failed: 2,
            total: 5,
        };
        assert_eq!(err.to_string(), "2 of 5 locations failed");
    }
}
