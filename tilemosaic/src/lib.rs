//! tilemosaic - satellite tile grids into canvases, tile caches and GeoTIFFs
//!
//! Fetches map tiles from Tianditu, Google, Bing or ArcGIS for a geographic
//! region, stitches them into one raster and optionally writes it as a
//! georeferenced GeoTIFF (EPSG:4326).
//!
//! # High-Level API
//!
//! The [`orchestrator`] module drives a whole request:
//!
//! ```ignore
//! use tilemosaic::coord::GeoPoint;
//! use tilemosaic::orchestrator::{FetchPolicy, GridOrchestrator, GridRequest, OutputMode};
//! use tilemosaic::provider::{ProviderKind, ReqwestClient, TileUrlResolver};
//!
//! let orchestrator = GridOrchestrator::new(
//!     ReqwestClient::new()?,
//!     TileUrlResolver::new(ProviderKind::ArcGis),
//!     FetchPolicy::default(),
//! );
//! let request = GridRequest::Corners {
//!     top_left: GeoPoint::new(114.341316, 30.553657),
//!     bottom_right: GeoPoint::new(114.37745, 30.517285),
//! };
//! let fetch = orchestrator.fetch(&request, 18, OutputMode::Canvas)?;
//! ```
//!
//! Large regions go through a tile cache and the [`merge`] engine instead
//! of an in-memory canvas.

pub mod batch;
pub mod config;
pub mod coord;
pub mod fetch;
pub mod logging;
pub mod merge;
pub mod orchestrator;
pub mod provider;
pub mod raster;

/// Version of the tilemosaic library and CLI.
///
/// This is synchronized across all components in the workspace.
/// The version is defined in `Cargo.toml` and injected at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
