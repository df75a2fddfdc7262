//! CLI command implementations.
//!
//! Each subcommand has its own module with argument definitions and handlers.
//!
//! # Command Modules
//!
//! - [`batch`] - Fixed-size images around many locations
//! - [`config`] - Configuration management (path, init, show)
//! - [`fetch`] - Fetch a region into an image, tile cache or GeoTIFF
//! - [`inspect`] - Size and georeferencing of a GeoTIFF
//! - [`merge`] - Tile cache to blocks to GeoTIFF

pub mod batch;
pub mod common;
pub mod config;
pub mod fetch;
pub mod inspect;
pub mod merge;
