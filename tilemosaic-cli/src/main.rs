//! tilemosaic CLI - Command-line interface
//!
//! This binary provides a command-line interface to the tilemosaic library.

mod commands;
mod error;
mod progress;
mod runner;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use commands::batch::BatchArgs;
use commands::config::ConfigCommands;
use commands::fetch::FetchArgs;
use commands::inspect::InspectArgs;
use commands::merge::MergeArgs;
use error::CliError;
use runner::CliRunner;

#[derive(Parser)]
#[command(name = "tilemosaic")]
#[command(version)]
#[command(about = "Fetch satellite tile grids into images, tile caches and GeoTIFFs", long_about = None)]
struct Cli {
    /// Configuration file (default: ~/.tilemosaic/config.ini)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Mirror log output to stdout and hide progress bars
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch a region into an image, a tile cache or a GeoTIFF
    Fetch(FetchArgs),

    /// Merge a tile cache into a GeoTIFF through intermediate blocks
    Merge(MergeArgs),

    /// Fetch a fixed-size image around each of many locations
    Batch(BatchArgs),

    /// Show size and georeferencing of a GeoTIFF
    Inspect(InspectArgs),

    /// Manage the configuration file
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Config { command } => commands::config::run(command, cli.config.as_deref()),
        Commands::Inspect(args) => commands::inspect::run(args),
        command => run_with_runner(command, cli.config, cli.verbose),
    };

    if let Err(e) = result {
        e.exit();
    }
}

/// Runs the commands that need config, logging and network access.
fn run_with_runner(
    command: Commands,
    config: Option<PathBuf>,
    verbose: bool,
) -> Result<(), CliError> {
    let runner = CliRunner::new(config.as_deref(), verbose)?;
    match command {
        Commands::Fetch(args) => commands::fetch::run(args, &runner),
        Commands::Merge(args) => commands::merge::run(args, &runner),
        Commands::Batch(args) => commands::batch::run(args, &runner),
        Commands::Inspect(args) => commands::inspect::run(args),
        Commands::Config { command } => commands::config::run(command, config.as_deref()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_fetch_with_negative_coordinates() {
        let cli = Cli::try_parse_from([
            "tilemosaic",
            "fetch",
            "--top-left",
            "-70.70,-33.40",
            "--bottom-right",
            "-70.60,-33.48",
            "--zoom",
            "17",
            "--output",
            "santiago.tif",
            "--concurrency",
            "4",
        ])
        .unwrap();

        match cli.command {
            Commands::Fetch(args) => {
                assert_eq!(args.zoom, Some(17));
                assert_eq!(args.download.concurrency, Some(4));
                assert!(args.region.to_request().is_ok());
            }
            _ => panic!("expected fetch"),
        }
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "tilemosaic",
            "config",
            "show",
            "--config",
            "/tmp/other.ini",
            "-v",
        ])
        .unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/other.ini")));
        assert!(cli.verbose);
    }
}
