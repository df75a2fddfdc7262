//! Georeferenced raster output
//!
//! GeoTIFF writing and reading, and the tile spool used when a grid is
//! fetched straight into a GeoTIFF.

mod geotiff;
mod reader;
mod spool;

pub use geotiff::{Compression, GeoTiffWriter, RowSource, EPSG_WGS84, STRIP_ROWS};
pub use reader::{read_geotiff, read_geotiff_info, GeoRasterImage, GeoRasterInfo};
pub use spool::{spool_dir, SpooledGeoTiff, TileRows};

use thiserror::Error;

/// Errors from raster I/O.
#[derive(Debug, Error)]
pub enum RasterError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TIFF error: {0}")]
    Tiff(#[from] tiff::TiffError),

    #[error("Invalid raster data: {0}")]
    InvalidData(String),

    #[error("GeoTIFF has no georeferencing tags")]
    MissingGeoreference,

    /// A row source could not produce its rows
    #[error("Row source failed: {0}")]
    Source(String),
}
