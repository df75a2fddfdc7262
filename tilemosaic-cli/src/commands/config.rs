//! Configuration management CLI commands.
//!
//! Provides `config path`, `config init` and `config show` for locating,
//! creating and viewing the configuration file.

use std::path::Path;

use clap::Subcommand;
use tilemosaic::config::{config_file_path, ConfigFile};

use crate::error::CliError;

/// Config subcommands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommands {
    /// Show the configuration file path
    Path,

    /// Write a configuration file with default values
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Print the effective configuration, defaults included
    Show,
}

/// Run a config subcommand against `path` (default: ~/.tilemosaic/config.ini).
pub fn run(command: ConfigCommands, path: Option<&Path>) -> Result<(), CliError> {
    let path = path.map(Path::to_path_buf).unwrap_or_else(config_file_path);
    match command {
        ConfigCommands::Path => run_path(&path),
        ConfigCommands::Init { force } => run_init(&path, force),
        ConfigCommands::Show => run_show(&path),
    }
}

fn run_path(path: &Path) -> Result<(), CliError> {
    println!("{}", path.display());
    if !path.exists() {
        println!("(file does not exist, defaults are used)");
    }
    Ok(())
}

fn run_init(path: &Path, force: bool) -> Result<(), CliError> {
    if path.exists() && !force {
        println!("Configuration already exists at {}", path.display());
        println!("Use --force to overwrite it with defaults.");
        return Ok(());
    }
    ConfigFile::default().save_to(path)?;
    println!("Wrote default configuration to {}", path.display());
    Ok(())
}

fn run_show(path: &Path) -> Result<(), CliError> {
    let config = ConfigFile::load_from(path)?;
    print!("{}", config.to_ini_string());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_init_writes_loadable_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested/config.ini");

        run(ConfigCommands::Init { force: false }, Some(&path)).unwrap();

        assert!(path.exists());
        assert_eq!(ConfigFile::load_from(&path).unwrap(), ConfigFile::default());
    }

    #[test]
    fn test_init_keeps_existing_file_without_force() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.ini");
        std::fs::write(&path, "[grid]\nzoom = 12\n").unwrap();

        run(ConfigCommands::Init { force: false }, Some(&path)).unwrap();
        assert_eq!(ConfigFile::load_from(&path).unwrap().grid.zoom, 12);

        run(ConfigCommands::Init { force: true }, Some(&path)).unwrap();
        assert_eq!(
            ConfigFile::load_from(&path).unwrap().grid.zoom,
            ConfigFile::default().grid.zoom
        );
    }
}
