//! Fetch plan: one task per tile, grouped into column batches

use super::grid::TileGrid;
use super::types::OrchestratorError;
use crate::fetch::FetchTask;
use crate::provider::{ProviderError, TileUrlResolver};
use std::collections::{BTreeMap, HashSet};

/// Every fetch task of a grid, one batch per grid column.
#[derive(Debug, Clone)]
pub struct FetchPlan {
    columns: Vec<Vec<FetchTask>>,
}

impl FetchPlan {
    /// Resolves a request for every tile of `grid`.
    ///
    /// Fails on the first tile the provider cannot address, before any
    /// network call.
    pub fn build(grid: &TileGrid, resolver: &TileUrlResolver) -> Result<Self, ProviderError> {
        let top_left = grid.top_left();
        let columns = (0..grid.cols())
            .map(|dx| {
                (0..grid.rows())
                    .map(|dy| {
                        Ok(FetchTask {
                            tile: grid.tile_at(dx, dy),
                            dx,
                            dy,
                            request: resolver.resolve(&top_left, dx, dy, grid.zoom())?,
                        })
                    })
                    .collect::<Result<Vec<_>, ProviderError>>()
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { columns })
    }

    pub fn columns(&self) -> &[Vec<FetchTask>] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.iter().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Rejects a batch in which two tasks target the same grid offset.
pub fn ensure_disjoint(tasks: &[&FetchTask]) -> Result<(), OrchestratorError> {
    let mut seen = HashSet::with_capacity(tasks.len());
    for task in tasks {
        if !seen.insert((task.dx, task.dy)) {
            return Err(OrchestratorError::OverlappingTasks {
                dx: task.dx,
                dy: task.dy,
            });
        }
    }
    Ok(())
}

/// Groups tasks into column batches, ordered by column.
pub fn group_by_column<'a>(
    tasks: impl IntoIterator<Item = &'a FetchTask>,
) -> Vec<Vec<&'a FetchTask>> {
    let mut columns: BTreeMap<u32, Vec<&FetchTask>> = BTreeMap::new();
    for task in tasks {
        columns.entry(task.dx).or_default().push(task);
    }
    columns.into_values().collect()
}
