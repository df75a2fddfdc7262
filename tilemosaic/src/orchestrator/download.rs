//! Grid fetch orchestration
//!
//! A request runs as a small state machine:
//!
//! ```text
//! ComputeGrid -> FetchPass1(col 0) -> Evaluate -> FetchPass1(col 1) -> ...
//!                                        |
//!                                        +-> Abort (failures >= threshold)
//! ... -> FetchPass2(sweep 0..n) -> Finalize
//! ```
//!
//! Every batch is one grid column. Tasks in a column differ in `dy`, so each
//! one owns a distinct row band of the canvas, or a distinct cache file, and
//! writes without locking. GeoTIFF output is spooled through a tile cache
//! and streamed into the file at the end.

use super::grid::TileGrid;
use super::plan::{ensure_disjoint, group_by_column, FetchPlan};
use super::progress::{NoProgress, Phase, ProgressObserver};
use super::stats::NetworkStats;
use super::types::{
    FetchPolicy, FetchReport, GridFetch, GridOutput, GridRequest, OrchestratorError, OutputMode,
};
use crate::batch;
use crate::fetch::{canvas_bands, FetchTask, FetchWorker, TaskStatus, TileCache};
use crate::provider::{HttpClient, TileUrlResolver};
use crate::raster::SpooledGeoTiff;
use image::RgbImage;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Fetches tile grids from one provider.
///
/// # Example
///
/// ```ignore
/// use tilemosaic::orchestrator::{FetchPolicy, GridOrchestrator, GridRequest, OutputMode};
/// use tilemosaic::provider::{ProviderKind, ReqwestClient, TileUrlResolver};
///
/// let orchestrator = GridOrchestrator::new(
///     ReqwestClient::new()?,
///     TileUrlResolver::new(ProviderKind::Google),
///     FetchPolicy::default(),
/// );
/// let fetch = orchestrator.fetch(&request, 18, OutputMode::Canvas)?;
/// ```
pub struct GridOrchestrator<C: HttpClient> {
    client: C,
    resolver: TileUrlResolver,
    policy: FetchPolicy,
    progress: Arc<dyn ProgressObserver>,
}

/// Steps of one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    FetchColumn(usize),
    Evaluate { next: usize },
    Retry { sweep: u32 },
    Abort,
    Finalize,
}

/// Where a running request writes its tiles.
enum Target {
    Canvas(RgbImage),
    Cache(TileCache),
    Raster(SpooledGeoTiff),
}

impl Target {
    fn create(grid: &TileGrid, output: OutputMode) -> Result<Self, OrchestratorError> {
        let target = match output {
            OutputMode::Canvas => Target::Canvas(RgbImage::new(grid.pixel_width(), grid.pixel_height())),
            OutputMode::TileCache { dir, format } => Target::Cache(TileCache::create(dir, format)?),
            OutputMode::GeoTiff { path, compression } => Target::Raster(SpooledGeoTiff::create(
                path,
                grid.cols(),
                grid.rows(),
                grid.geo_transform(),
                compression,
            )?),
        };
        Ok(target)
    }

    fn finalize(self) -> Result<GridOutput, OrchestratorError> {
        match self {
            Target::Canvas(canvas) => Ok(GridOutput::Canvas(canvas)),
            Target::Cache(cache) => Ok(GridOutput::TileCache {
                dir: cache.dir().to_path_buf(),
            }),
            Target::Raster(spool) => {
                let transform = *spool.transform();
                let path = spool.finish()?;
                Ok(GridOutput::GeoTiff { path, transform })
            }
        }
    }
}

/// Pairs every task with the band of its row. A row claimed twice means two
/// tasks would write the same region.
fn claim_bands<'t, B>(
    bands: Vec<B>,
    tasks: &[&'t FetchTask],
) -> Result<Vec<(&'t FetchTask, B)>, OrchestratorError> {
    let mut slots: Vec<Option<B>> = bands.into_iter().map(Some).collect();
    tasks
        .iter()
        .map(|task| {
            slots
                .get_mut(task.dy as usize)
                .and_then(Option::take)
                .map(|band| (*task, band))
                .ok_or(OrchestratorError::OverlappingTasks {
                    dx: task.dx,
                    dy: task.dy,
                })
        })
        .collect()
}

impl<C: HttpClient> GridOrchestrator<C> {
    pub fn new(client: C, resolver: TileUrlResolver, policy: FetchPolicy) -> Self {
        Self {
            client,
            resolver,
            policy,
            progress: Arc::new(NoProgress),
        }
    }

    /// Reports phases and finished tiles to `progress`.
    pub fn with_progress(mut self, progress: Arc<dyn ProgressObserver>) -> Self {
        self.progress = progress;
        self
    }

    pub fn policy(&self) -> &FetchPolicy {
        &self.policy
    }

    pub fn resolver(&self) -> &TileUrlResolver {
        &self.resolver
    }

    /// Computes the grid for `request` at `zoom` and fetches it into `output`.
    ///
    /// The zoom ceiling and the grid are checked before any network call.
    pub fn fetch(
        &self,
        request: &GridRequest,
        zoom: u8,
        output: OutputMode,
    ) -> Result<GridFetch, OrchestratorError> {
        self.progress.on_phase(Phase::ComputeGrid, 0);
        self.resolver.check_zoom(zoom)?;
        let grid = TileGrid::from_request(request, zoom)?;
        self.fetch_grid(grid, output)
    }

    /// Fetches an already computed grid.
    ///
    /// Pass 1 fetches column by column and aborts as soon as failures reach
    /// the policy threshold; nothing is returned then. Pass 2 retries the
    /// failed tiles and never aborts: tiles still missing afterwards stay
    /// black (canvas, GeoTIFF) or absent (tile cache) and are listed in the
    /// report.
    pub fn fetch_grid(
        &self,
        grid: TileGrid,
        output: OutputMode,
    ) -> Result<GridFetch, OrchestratorError> {
        let plan = FetchPlan::build(&grid, &self.resolver)?;
        let total = plan.len();
        info!(
            provider = %self.resolver.kind(),
            zoom = grid.zoom(),
            top_left = %grid.top_left(),
            cols = grid.cols(),
            rows = grid.rows(),
            tiles = total,
            "Fetching tile grid"
        );

        let mut target = Target::create(&grid, output)?;
        let stats = NetworkStats::new();
        let worker = FetchWorker::new(&self.client, self.policy.retry_limit).with_stats(&stats);

        let columns: Vec<Vec<&FetchTask>> = plan
            .columns()
            .iter()
            .map(|column| column.iter().collect())
            .collect();
        let mut failed: Vec<&FetchTask> = Vec::new();
        let mut pass1_failed = 0;

        self.progress.on_phase(Phase::FetchPass1, total);
        let mut step = Step::FetchColumn(0);
        loop {
            step = match step {
                Step::FetchColumn(i) => match columns.get(i) {
                    Some(column) => {
                        let statuses = self.run_column(&mut target, column, &worker)?;
                        failed.extend(
                            column
                                .iter()
                                .zip(&statuses)
                                .filter(|(_, status)| !status.is_success())
                                .map(|(task, _)| *task),
                        );
                        pass1_failed = failed.len();
                        Step::Evaluate { next: i + 1 }
                    }
                    None => Step::Retry { sweep: 0 },
                },
                Step::Evaluate { next } => {
                    if self.policy.should_abort(pass1_failed, total) {
                        Step::Abort
                    } else {
                        Step::FetchColumn(next)
                    }
                }
                Step::Retry { sweep } => {
                    if failed.is_empty() || sweep >= self.policy.retry_sweeps {
                        Step::Finalize
                    } else {
                        debug!(sweep = sweep + 1, tiles = failed.len(), "Retrying failed tiles");
                        self.progress.on_phase(Phase::FetchPass2, failed.len());
                        let mut still_failed = Vec::new();
                        for column in group_by_column(failed.iter().copied()) {
                            let statuses = self.run_column(&mut target, &column, &worker)?;
                            still_failed.extend(
                                column
                                    .iter()
                                    .zip(&statuses)
                                    .filter(|(_, status)| !status.is_success())
                                    .map(|(task, _)| *task),
                            );
                        }
                        failed = still_failed;
                        Step::Retry { sweep: sweep + 1 }
                    }
                }
                Step::Abort => {
                    let threshold = self.policy.abort_threshold(total);
                    self.progress.on_phase(Phase::Abort, pass1_failed);
                    warn!(
                        failed = pass1_failed,
                        total,
                        threshold,
                        "Too many failed tiles, aborting"
                    );
                    stats.snapshot().log_summary();
                    return Err(OrchestratorError::TooManyFailures {
                        failed: pass1_failed,
                        total,
                        threshold,
                    });
                }
                Step::Finalize => break,
            };
        }

        self.progress.on_phase(Phase::Finalize, total);
        let unrecovered: Vec<(u32, u32)> = failed.iter().map(|task| (task.dx, task.dy)).collect();
        if !unrecovered.is_empty() {
            warn!(
                count = unrecovered.len(),
                tiles = ?unrecovered,
                "Tiles still missing after retries"
            );
        }

        let output = target.finalize()?;
        let snapshot = stats.snapshot();
        snapshot.log_summary();

        Ok(GridFetch {
            grid,
            output,
            report: FetchReport {
                total,
                pass1_failed,
                unrecovered,
                stats: snapshot,
            },
        })
    }

    /// Runs one column batch against the target, in task order.
    fn run_column(
        &self,
        target: &mut Target,
        tasks: &[&FetchTask],
        worker: &FetchWorker<'_, C>,
    ) -> Result<Vec<TaskStatus>, OrchestratorError> {
        ensure_disjoint(tasks)?;
        let concurrency = self.policy.concurrency;
        let progress = self.progress.as_ref();
        let finish = |status: TaskStatus| {
            progress.on_tile_finished(status.is_success());
            status
        };

        let cache = match target {
            Target::Canvas(canvas) => {
                let jobs = claim_bands(canvas_bands(canvas), tasks)?;
                let statuses = batch::run_batch(jobs, concurrency, |(task, mut band)| {
                    finish(worker.run(task, &mut band))
                })?;
                return Ok(statuses);
            }
            Target::Cache(cache) => &*cache,
            Target::Raster(spool) => spool.cache(),
        };
        let statuses = batch::run_batch(tasks.to_vec(), concurrency, |task| {
            let mut sink = cache;
            finish(worker.run(task, &mut sink))
        })?;
        Ok(statuses)
    }
}
