//! Fixed-size images around a list of points

use super::download::GridOrchestrator;
use super::grid::TileGrid;
use super::types::{GridRequest, OutputMode};
use crate::coord::GeoPoint;
use crate::provider::HttpClient;
use image::{imageops, RgbImage};
use std::fmt;
use tracing::{info, warn};

/// A point to image, optionally named.
#[derive(Debug, Clone, PartialEq)]
pub struct NamedLocation {
    pub name: Option<String>,
    pub point: GeoPoint,
}

impl NamedLocation {
    pub fn new(point: GeoPoint) -> Self {
        Self { name: None, point }
    }

    pub fn named(name: impl Into<String>, point: GeoPoint) -> Self {
        Self {
            name: Some(name.into()),
            point,
        }
    }

    /// Label for logs and file names: the name, or the list index.
    pub fn label(&self, index: usize) -> String {
        match &self.name {
            Some(name) => name.clone(),
            None => index.to_string(),
        }
    }
}

/// Outcome counts of [`run_locations`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LocationSummary {
    pub succeeded: usize,
    pub failed: usize,
}

impl LocationSummary {
    pub fn total(&self) -> usize {
        self.succeeded + self.failed
    }
}

/// Crops `width × height` pixels out of a grid canvas, centred on `center`.
///
/// The window is shifted to stay inside the canvas and shrunk if the canvas
/// is smaller than requested.
pub fn crop_centered(
    canvas: &RgbImage,
    grid: &TileGrid,
    center: GeoPoint,
    width: u32,
    height: u32,
) -> RgbImage {
    let (px, py) = grid.pixel_of(center);
    let w = width.min(canvas.width());
    let h = height.min(canvas.height());
    let x0 = px.saturating_sub(w / 2).min(canvas.width() - w);
    let y0 = py.saturating_sub(h / 2).min(canvas.height() - h);
    imageops::crop_imm(canvas, x0, y0, w, h).to_image()
}

/// Fetches a `width × height` image around every location.
///
/// Each image goes to `on_each` together with its index. A location whose
/// fetch or handler fails is logged and counted; the run continues with the
/// next one.
pub fn run_locations<C, F, E>(
    orchestrator: &GridOrchestrator<C>,
    locations: &[NamedLocation],
    width: u32,
    height: u32,
    zoom: u8,
    mut on_each: F,
) -> LocationSummary
where
    C: HttpClient,
    F: FnMut(usize, &NamedLocation, RgbImage) -> Result<(), E>,
    E: fmt::Display,
{
    let mut summary = LocationSummary::default();

    for (index, location) in locations.iter().enumerate() {
        let label = location.label(index);
        let request = GridRequest::CenterPixels {
            center: location.point,
            width,
            height,
        };

        let fetch = match orchestrator.fetch(&request, zoom, OutputMode::Canvas) {
            Ok(fetch) => fetch,
            Err(e) => {
                warn!(location = %label, point = %location.point, error = %e, "Location failed");
                summary.failed += 1;
                continue;
            }
        };

        let grid = fetch.grid;
        let Some(canvas) = fetch.output.into_canvas() else {
            summary.failed += 1;
            continue;
        };
        let image = crop_centered(&canvas, &grid, location.point, width, height);

        match on_each(index, location, image) {
            Ok(()) => {
                info!(location = %label, "Location done");
                summary.succeeded += 1;
            }
            Err(e) => {
                warn!(location = %label, error = %e, "Could not save location image");
                summary.failed += 1;
            }
        }
    }

    info!(
        succeeded = summary.succeeded,
        failed = summary.failed,
        "Locations finished"
    );
    summary
}
