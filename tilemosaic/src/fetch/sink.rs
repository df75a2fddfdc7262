//! Tile sinks: where a decoded tile ends up.
//!
//! Every sink covers exactly one grid row (`dy`) and is handed out to one
//! task at a time, so concurrent writers never share a region.

use super::types::{FetchTask, SinkError};
use crate::coord::TILE_SIZE;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::RgbImage;
use std::fs;
use std::io::{self, Cursor};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

const TILE_PX: usize = TILE_SIZE as usize;

/// Encoding used for cached tiles and merge blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TileFormat {
    Jpeg { quality: u8 },
    Png,
}

impl Default for TileFormat {
    fn default() -> Self {
        TileFormat::Jpeg { quality: 90 }
    }
}

impl TileFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            TileFormat::Jpeg { .. } => "jpg",
            TileFormat::Png => "png",
        }
    }

    /// Encodes an image into memory.
    pub fn encode(&self, img: &RgbImage) -> Result<Vec<u8>, image::ImageError> {
        let mut buffer = Cursor::new(Vec::new());
        match *self {
            TileFormat::Jpeg { quality } => {
                img.write_with_encoder(JpegEncoder::new_with_quality(&mut buffer, quality))?
            }
            TileFormat::Png => img.write_with_encoder(PngEncoder::new(&mut buffer))?,
        }
        Ok(buffer.into_inner())
    }
}

/// Writes `bytes` to `path` via a temporary sibling and a rename.
pub(crate) fn write_atomic(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let temp_path = path.with_extension("tmp");
    fs::write(&temp_path, bytes)?;
    fs::rename(&temp_path, path)
}

/// Destination for decoded tiles.
pub trait TileSink {
    /// Whether the tile is already in place. Present tiles are not fetched.
    fn is_present(&self, _task: &FetchTask) -> bool {
        false
    }

    /// Writes a decoded 256×256 tile.
    fn write(&mut self, task: &FetchTask, tile: &RgbImage) -> Result<(), SinkError>;
}

/// One 256-pixel row band of an RGB canvas.
pub struct CanvasBand<'a> {
    pixels: &'a mut [u8],
    width: u32,
    dy: u32,
}

impl<'a> CanvasBand<'a> {
    /// Wraps the band of grid row `dy`. `pixels` holds 256 canvas rows.
    pub fn new(pixels: &'a mut [u8], width: u32, dy: u32) -> Self {
        Self { pixels, width, dy }
    }

    pub fn dy(&self) -> u32 {
        self.dy
    }
}

/// Splits a canvas into one exclusive band per grid row.
pub fn canvas_bands(canvas: &mut RgbImage) -> Vec<CanvasBand<'_>> {
    let width = canvas.width();
    let band_len = TILE_PX * width as usize * 3;
    canvas
        .chunks_mut(band_len)
        .enumerate()
        .map(|(dy, pixels)| CanvasBand::new(pixels, width, dy as u32))
        .collect()
}

fn check_band(
    task: &FetchTask,
    dy: u32,
    width: u32,
    len: usize,
) -> Result<(), SinkError> {
    let out_of_bounds = task.dy != dy
        || (task.dx as u64 + 1) * TILE_SIZE as u64 > width as u64
        || len < TILE_PX * width as usize * 3;
    if out_of_bounds {
        return Err(SinkError::OutOfBounds {
            dx: task.dx,
            dy: task.dy,
        });
    }
    Ok(())
}

impl TileSink for CanvasBand<'_> {
    fn write(&mut self, task: &FetchTask, tile: &RgbImage) -> Result<(), SinkError> {
        check_band(task, self.dy, self.width, self.pixels.len())?;

        let row_bytes = TILE_PX * 3;
        let stride = self.width as usize * 3;
        let x0 = task.dx as usize * row_bytes;
        for (row, src) in tile.as_raw().chunks_exact(row_bytes).enumerate() {
            let start = row * stride + x0;
            self.pixels[start..start + row_bytes].copy_from_slice(src);
        }
        Ok(())
    }
}

/// On-disk tile cache: one file per grid offset, `"{dx}_{dy}.{ext}"`.
#[derive(Debug, Clone)]
pub struct TileCache {
    dir: PathBuf,
    format: TileFormat,
}

impl TileCache {
    /// Creates the cache, making the directory if needed.
    pub fn create(dir: impl Into<PathBuf>, format: TileFormat) -> io::Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir, format })
    }

    /// Opens an existing cache, taking the format from the tiles on disk.
    ///
    /// `fallback` is used when the directory holds no tiles yet. When both
    /// encodings are present the more common one wins. A detected JPEG cache
    /// keeps the quality of `fallback` if that is JPEG too.
    pub fn open(dir: impl Into<PathBuf>, fallback: TileFormat) -> io::Result<Self> {
        let dir = dir.into();
        let (mut jpeg, mut png) = (0usize, 0usize);
        for entry in fs::read_dir(&dir)? {
            let name = entry?.file_name();
            let Some(name) = name.to_str() else {
                continue;
            };
            if parse_tile_file_name(name).is_none() {
                continue;
            }
            if name.ends_with(".png") {
                png += 1;
            } else {
                jpeg += 1;
            }
        }

        let format = match (jpeg, png) {
            (0, 0) => fallback,
            (jpeg, png) if png > jpeg => TileFormat::Png,
            _ => match fallback {
                TileFormat::Jpeg { .. } => fallback,
                TileFormat::Png => TileFormat::default(),
            },
        };
        if jpeg > 0 && png > 0 {
            warn!(dir = %dir.display(), jpeg, png, "Tile cache mixes JPEG and PNG tiles");
        }
        debug!(dir = %dir.display(), format = format.extension(), "Opened tile cache");
        Ok(Self { dir, format })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn format(&self) -> TileFormat {
        self.format
    }

    pub fn path_for(&self, dx: u32, dy: u32) -> PathBuf {
        self.dir.join(tile_file_name(dx, dy, self.format))
    }
}

/// File name of a cached tile.
pub fn tile_file_name(dx: u32, dy: u32, format: TileFormat) -> String {
    format!("{}_{}.{}", dx, dy, format.extension())
}

/// Parses `"{dx}_{dy}.{ext}"` back into an offset.
pub fn parse_tile_file_name(name: &str) -> Option<(u32, u32)> {
    let (stem, ext) = name.rsplit_once('.')?;
    if ext != "jpg" && ext != "png" {
        return None;
    }
    let (dx, dy) = stem.split_once('_')?;
    Some((dx.parse().ok()?, dy.parse().ok()?))
}

impl TileSink for &TileCache {
    fn is_present(&self, task: &FetchTask) -> bool {
        self.path_for(task.dx, task.dy).exists()
    }

    fn write(&mut self, task: &FetchTask, tile: &RgbImage) -> Result<(), SinkError> {
        let bytes = self.format.encode(tile)?;
        write_atomic(&self.path_for(task.dx, task.dy), &bytes)?;
        Ok(())
    }
}
