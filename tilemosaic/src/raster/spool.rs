//! GeoTIFF output spooled through a tile cache
//!
//! Fetched tiles land as lossless PNG files in a spool directory next to the
//! output. Once every tile is in, the GeoTIFF is streamed from the spool one
//! tile row at a time, so memory stays at one row of tiles whatever the
//! size of the region.

use super::geotiff::{Compression, GeoTiffWriter, RowSource};
use super::RasterError;
use crate::coord::{GeoTransform, TILE_SIZE};
use crate::fetch::{TileCache, TileFormat};
use image::{imageops, RgbImage};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Spool directory for the GeoTIFF at `path`: `<file name>.tiles` beside it.
pub fn spool_dir(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "raster".into());
    name.push(".tiles");
    path.with_file_name(name)
}

/// A GeoTIFF under construction.
///
/// Workers write tiles into [`cache`](Self::cache); [`finish`](Self::finish)
/// streams them into the file and removes the spool. A spool left behind by
/// an aborted request is picked up again by the next one, so tiles already
/// fetched are not downloaded twice.
#[derive(Debug)]
pub struct SpooledGeoTiff {
    cache: TileCache,
    path: PathBuf,
    cols: u32,
    rows: u32,
    transform: GeoTransform,
    compression: Compression,
}

impl SpooledGeoTiff {
    /// Prepares a `cols × rows` tile raster for `path`.
    pub fn create(
        path: PathBuf,
        cols: u32,
        rows: u32,
        transform: GeoTransform,
        compression: Compression,
    ) -> io::Result<Self> {
        let cache = TileCache::create(spool_dir(&path), TileFormat::Png)?;
        debug!(spool = %cache.dir().display(), "Spooling GeoTIFF tiles");
        Ok(Self {
            cache,
            path,
            cols,
            rows,
            transform,
            compression,
        })
    }

    pub fn cache(&self) -> &TileCache {
        &self.cache
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn transform(&self) -> &GeoTransform {
        &self.transform
    }

    /// Writes the GeoTIFF from the spooled tiles and removes the spool.
    ///
    /// Tiles missing from the spool are written black. On error no partial
    /// GeoTIFF is left and the spool is kept.
    pub fn finish(self) -> Result<PathBuf, RasterError> {
        let width = self.cols * TILE_SIZE;
        let height = self.rows * TILE_SIZE;
        let mut source = TileRows::new(&self.cache, self.cols);
        let written = GeoTiffWriter::new(width, height, self.transform)
            .compression(self.compression)
            .write(&self.path, &mut source);

        if let Err(e) = written {
            if let Err(remove) = fs::remove_file(&self.path) {
                debug!(error = %remove, "No partial GeoTIFF to remove");
            }
            return Err(e);
        }

        if let Err(e) = fs::remove_dir_all(self.cache.dir()) {
            warn!(spool = %self.cache.dir().display(), error = %e, "Could not remove spool");
        }
        info!(path = %self.path.display(), width, height, "GeoTIFF written");
        Ok(self.path)
    }
}

/// Row source over a tile cache, decoding one tile row at a time.
pub struct TileRows<'a> {
    cache: &'a TileCache,
    cols: u32,
    /// Decoded tile row: grid row and its 256 pixel rows
    current: Option<(u32, RgbImage)>,
}

impl<'a> TileRows<'a> {
    pub fn new(cache: &'a TileCache, cols: u32) -> Self {
        Self {
            cache,
            cols,
            current: None,
        }
    }

    fn load(&mut self, dy: u32) -> Result<&RgbImage, RasterError> {
        let loaded = matches!(&self.current, Some((row, _)) if *row == dy);
        if !loaded {
            let mut band = RgbImage::new(self.cols * TILE_SIZE, TILE_SIZE);
            for dx in 0..self.cols {
                let path = self.cache.path_for(dx, dy);
                if !path.exists() {
                    continue;
                }
                let tile = image::open(&path)
                    .map_err(|e| RasterError::Source(format!("{}: {}", path.display(), e)))?
                    .to_rgb8();
                imageops::replace(&mut band, &tile, (dx * TILE_SIZE) as i64, 0);
            }
            self.current = Some((dy, band));
        }
        match &self.current {
            Some((_, band)) => Ok(band),
            None => Err(RasterError::Source(format!("tile row {} not loaded", dy))),
        }
    }
}

impl RowSource for TileRows<'_> {
    fn read_rows(&mut self, y: u32, rows: u32, buf: &mut [u8]) -> Result<(), RasterError> {
        let row_bytes = self.cols as usize * TILE_SIZE as usize * 3;
        for (i, out) in buf.chunks_exact_mut(row_bytes).take(rows as usize).enumerate() {
            let py = y + i as u32;
            let band = self.load(py / TILE_SIZE)?;
            let start = (py % TILE_SIZE) as usize * row_bytes;
            out.copy_from_slice(&band.as_raw()[start..start + row_bytes]);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raster::read_geotiff;
    use image::Rgb;
    use tempfile::TempDir;

    fn transform() -> GeoTransform {
        GeoTransform {
            origin_lng: 10.0,
            pixel_width: 0.001,
            origin_lat: 50.0,
            pixel_height: -0.001,
        }
    }

    fn put(cache: &TileCache, dx: u32, dy: u32, color: [u8; 3]) {
        RgbImage::from_pixel(256, 256, Rgb(color))
            .save(cache.path_for(dx, dy))
            .unwrap();
    }

    #[test]
    fn test_spool_dir_is_sibling() {
        assert_eq!(
            spool_dir(Path::new("/data/wuhan.tif")),
            PathBuf::from("/data/wuhan.tif.tiles")
        );
    }

    #[test]
    fn test_tile_rows_straddle_tile_rows() {
        let dir = TempDir::new().unwrap();
        let cache = TileCache::create(dir.path(), TileFormat::Png).unwrap();
        put(&cache, 0, 0, [1, 1, 1]);
        put(&cache, 1, 1, [2, 2, 2]);

        // Rows 255 and 256 come from different tile rows
        let mut rows = TileRows::new(&cache, 2);
        let row_bytes = 2 * 256 * 3;
        let mut buf = vec![9u8; 2 * row_bytes];
        rows.read_rows(255, 2, &mut buf).unwrap();

        assert_eq!(&buf[..3], &[1, 1, 1]);
        assert_eq!(&buf[256 * 3..256 * 3 + 3], &[0, 0, 0]);
        assert_eq!(&buf[row_bytes..row_bytes + 3], &[0, 0, 0]);
        assert_eq!(&buf[row_bytes + 256 * 3..row_bytes + 256 * 3 + 3], &[2, 2, 2]);
    }

    #[test]
    fn test_finish_writes_raster_and_removes_spool() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.tif");
        let spool = SpooledGeoTiff::create(path.clone(), 2, 1, transform(), Compression::Lzw)
            .unwrap();
        put(spool.cache(), 1, 0, [40, 50, 60]);
        let spool_path = spool.cache().dir().to_path_buf();

        assert_eq!(spool.finish().unwrap(), path);
        assert!(!spool_path.exists());

        let raster = read_geotiff(&path).unwrap();
        assert_eq!(raster.info.transform, transform());
        assert_eq!(raster.pixels.dimensions(), (512, 256));
        assert_eq!(raster.pixels.get_pixel(300, 100).0, [40, 50, 60]);
        assert_eq!(raster.pixels.get_pixel(100, 100).0, [0, 0, 0]);
    }

    #[test]
    fn test_unreadable_tile_keeps_spool_and_leaves_no_raster() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.tif");
        let spool = SpooledGeoTiff::create(path.clone(), 1, 1, transform(), Compression::None)
            .unwrap();
        fs::write(spool.cache().path_for(0, 0), b"not a png").unwrap();
        let spool_path = spool.cache().dir().to_path_buf();

        assert!(matches!(spool.finish(), Err(RasterError::Source(_))));
        assert!(!path.exists());
        assert!(spool_path.exists());
    }
}
