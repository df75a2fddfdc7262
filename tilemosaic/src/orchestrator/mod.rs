//! Tile grid orchestration
//!
//! Turns a region request into a tile grid, fetches it column by column on
//! a bounded worker pool, retries failures in a second pass and writes the
//! result to a canvas, a tile cache or a GeoTIFF.

mod download;
mod grid;
mod locations;
mod plan;
mod progress;
mod stats;
mod types;

pub use download::GridOrchestrator;
pub use grid::{odd_tile_count, GridError, TileGrid};
pub use locations::{crop_centered, run_locations, LocationSummary, NamedLocation};
pub use plan::{ensure_disjoint, group_by_column, FetchPlan};
pub use progress::{NoProgress, Phase, ProgressObserver};
pub use stats::{format_bytes, NetworkStats, NetworkStatsSnapshot};
pub use types::{
    FetchPolicy, FetchReport, GridFetch, GridOutput, GridRequest, OrchestratorError, OutputMode,
};
