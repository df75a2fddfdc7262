//! Progress reporting for grid fetches.
//!
//! The orchestrator reports phase changes and finished tiles to a
//! [`ProgressObserver`]. Tiles finish on pool threads, so observers must be
//! `Send + Sync`.

use std::fmt;

/// Steps of a grid request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    ComputeGrid,
    FetchPass1,
    FetchPass2,
    Abort,
    Finalize,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::ComputeGrid => "compute grid",
            Phase::FetchPass1 => "fetch",
            Phase::FetchPass2 => "retry",
            Phase::Abort => "abort",
            Phase::Finalize => "finalize",
        };
        f.write_str(name)
    }
}

/// Receives progress from a running grid request.
pub trait ProgressObserver: Send + Sync {
    /// A phase started. `total` is the number of tiles it covers.
    fn on_phase(&self, _phase: Phase, _total: usize) {}

    /// One tile finished, successfully or not.
    fn on_tile_finished(&self, _ok: bool) {}
}

/// Observer that ignores everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressObserver for NoProgress {}
