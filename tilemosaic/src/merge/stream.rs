//! Block → GeoTIFF merge

use super::index::{BlockEntry, BlockIndex};
use super::{MergeError, MergeOptions};
use crate::batch;
use crate::coord::{GeoTransform, TILE_SIZE};
use crate::orchestrator::TileGrid;
use crate::raster::{GeoTiffWriter, RasterError, RowSource};
use image::{imageops, RgbImage};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tracing::{debug, info, warn};

/// Streams the blocks in `blocks_dir` into a GeoTIFF at `path` covering
/// `grid`, and returns the GeoTransform written.
///
/// The index must list every block of the grid. Blocks are decoded one block
/// row at a time, in parallel; a block that fails to decode is retried up to
/// `merge_retries` times. If any block stays unavailable no GeoTIFF is left
/// behind and [`MergeError::Incomplete`] names the blocks.
pub fn merge_blocks_into_geotiff(
    blocks_dir: &Path,
    grid: &TileGrid,
    path: &Path,
    options: &MergeOptions,
) -> Result<GeoTransform, MergeError> {
    let index = BlockIndex::load(blocks_dir)?
        .ok_or_else(|| MergeError::MissingIndex(blocks_dir.to_path_buf()))?;
    if index.cols != grid.cols() || index.rows != grid.rows() {
        return Err(MergeError::IndexMismatch(format!(
            "index is for {}x{} tiles, grid is {}x{}",
            index.cols,
            index.rows,
            grid.cols(),
            grid.rows()
        )));
    }

    let mut unavailable: Vec<String> = index
        .missing(options.block_format)
        .into_iter()
        .map(|block| block.file)
        .collect();
    unavailable.extend(
        index
            .blocks
            .iter()
            .filter(|block| !blocks_dir.join(&block.file).exists())
            .map(|block| block.file.clone()),
    );
    if !unavailable.is_empty() {
        return Err(MergeError::Incomplete {
            blocks: unavailable,
        });
    }

    let transform = grid.geo_transform();
    info!(
        width = grid.pixel_width(),
        height = grid.pixel_height(),
        blocks = index.blocks.len(),
        path = %path.display(),
        "Merging blocks into GeoTIFF"
    );

    let mut source = BlockRows::new(blocks_dir, &index, grid.pixel_width(), options);
    let written = GeoTiffWriter::new(grid.pixel_width(), grid.pixel_height(), transform)
        .compression(options.compression)
        .write(path, &mut source);

    if let Err(e) = written {
        if let Err(remove) = fs::remove_file(path) {
            debug!(error = %remove, "No partial GeoTIFF to remove");
        }
        if !source.failed.is_empty() {
            return Err(MergeError::Incomplete {
                blocks: source.failed,
            });
        }
        return Err(e.into());
    }

    info!(path = %path.display(), "GeoTIFF written");
    Ok(transform)
}

/// Row source over the block images, one decoded block row at a time.
struct BlockRows<'a> {
    dir: &'a Path,
    /// Blocks keyed by their first tile row
    rows: BTreeMap<u32, Vec<&'a BlockEntry>>,
    width: u32,
    options: &'a MergeOptions,
    /// Decoded block row: first pixel row and pixels
    current: Option<(u32, RgbImage)>,
    failed: Vec<String>,
}

impl<'a> BlockRows<'a> {
    fn new(dir: &'a Path, index: &'a BlockIndex, width: u32, options: &'a MergeOptions) -> Self {
        let mut rows: BTreeMap<u32, Vec<&BlockEntry>> = BTreeMap::new();
        for block in &index.blocks {
            rows.entry(block.y0).or_default().push(block);
        }
        Self {
            dir,
            rows,
            width,
            options,
            current: None,
            failed: Vec::new(),
        }
    }

    /// Makes the block row holding pixel row `y` current.
    fn load_row_containing(&mut self, y: u32) -> Result<(), RasterError> {
        if let Some((y0, band)) = &self.current {
            if y >= *y0 && y < y0 + band.height() {
                return Ok(());
            }
        }
        let tile_row = y / TILE_SIZE;
        let blocks = self
            .rows
            .range(..=tile_row)
            .next_back()
            .map(|(_, blocks)| blocks.clone())
            .ok_or_else(|| RasterError::Source(format!("no block covers row {}", y)))?;

        // Every block of one block row shares the same tile rows
        let first = blocks[0];
        let mut band = RgbImage::new(self.width, first.pixel_height());
        for (block, image) in self.decode_with_retries(&blocks)? {
            imageops::replace(&mut band, &image, (block.x0 * TILE_SIZE) as i64, 0);
        }
        debug!(row = first.y0, blocks = blocks.len(), "Block row decoded");
        self.current = Some((first.y0 * TILE_SIZE, band));
        Ok(())
    }

    fn decode_with_retries(
        &mut self,
        blocks: &[&'a BlockEntry],
    ) -> Result<Vec<(&'a BlockEntry, RgbImage)>, RasterError> {
        let mut decoded = Vec::with_capacity(blocks.len());
        let mut pending: Vec<&BlockEntry> = blocks.to_vec();
        let attempts = self.options.merge_retries.max(1);
        let dir = self.dir;

        for attempt in 1..=attempts {
            if pending.is_empty() {
                break;
            }
            let results = batch::run_batch_with(pending.clone(), self.options.concurrency, |block| {
                decode_block(dir, block)
            })
            .map_err(|e| RasterError::Source(e.to_string()))?;

            let mut retry = Vec::new();
            for (block, result) in pending.into_iter().zip(results) {
                match result {
                    Ok(Ok(image)) => decoded.push((block, image)),
                    Ok(Err(e)) => {
                        warn!(file = %block.file, attempt, error = %e, "Block decode failed");
                        retry.push(block);
                    }
                    Err(e) => {
                        warn!(file = %block.file, attempt, error = %e, "Block decode did not complete");
                        retry.push(block);
                    }
                }
            }
            pending = retry;
        }

        if !pending.is_empty() {
            self.failed = pending.iter().map(|block| block.file.clone()).collect();
            return Err(RasterError::Source(format!(
                "{} block(s) could not be decoded",
                pending.len()
            )));
        }
        Ok(decoded)
    }
}

impl RowSource for BlockRows<'_> {
    fn read_rows(&mut self, y: u32, rows: u32, buf: &mut [u8]) -> Result<(), RasterError> {
        let row_bytes = self.width as usize * 3;
        for (i, out) in buf.chunks_exact_mut(row_bytes).take(rows as usize).enumerate() {
            let row = y + i as u32;
            self.load_row_containing(row)?;
            if let Some((y0, band)) = &self.current {
                let start = (row - y0) as usize * row_bytes;
                out.copy_from_slice(&band.as_raw()[start..start + row_bytes]);
            }
        }
        Ok(())
    }
}

fn decode_block(dir: &Path, block: &BlockEntry) -> Result<RgbImage, MergeError> {
    let path = dir.join(&block.file);
    let image = image::open(&path)
        .map_err(|source| MergeError::Image { path, source })?
        .to_rgb8();
    let expected = (block.pixel_width(), block.pixel_height());
    if image.dimensions() != expected {
        return Err(MergeError::BlockSize {
            file: block.file.clone(),
            expected,
            found: image.dimensions(),
        });
    }
    Ok(image)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coord::TileIndex;
    use crate::fetch::{TileCache, TileFormat};
    use crate::merge::merge_tiles_into_blocks;
    use crate::raster::read_geotiff;
    use image::Rgb;
    use tempfile::TempDir;

    fn options() -> MergeOptions {
        MergeOptions {
            block_size: 2,
            block_format: TileFormat::Png,
            concurrency: 2,
            ..MergeOptions::default()
        }
    }

    /// 3 x 3 tiles at (40, 50) zoom 7, blocks already merged
    fn setup(dir: &Path) -> (TileGrid, std::path::PathBuf) {
        let cache = TileCache::create(dir.join("tiles"), TileFormat::Png).unwrap();
        for x in 0..3u32 {
            for y in 0..3u32 {
                RgbImage::from_pixel(256, 256, Rgb([x as u8 + 1, y as u8 + 1, 9]))
                    .save(cache.path_for(x, y))
                    .unwrap();
            }
        }
        let blocks_dir = dir.join("blocks");
        merge_tiles_into_blocks(&cache, 3, 3, &blocks_dir, &options()).unwrap();
        let grid = TileGrid::new(TileIndex::new(40, 50, 7).unwrap(), 3, 3).unwrap();
        (grid, blocks_dir)
    }

    #[test]
    fn test_geotiff_matches_tiles() {
        let dir = TempDir::new().unwrap();
        let (grid, blocks_dir) = setup(dir.path());
        let path = dir.path().join("out.tif");

        let transform = merge_blocks_into_geotiff(&blocks_dir, &grid, &path, &options()).unwrap();
        assert_eq!(transform, grid.geo_transform());

        let raster = read_geotiff(&path).unwrap();
        assert_eq!((raster.info.width, raster.info.height), (768, 768));
        assert_eq!(raster.info.transform, grid.geo_transform());
        for x in 0..3u32 {
            for y in 0..3u32 {
                let pixel = raster.pixels.get_pixel(x * 256 + 128, y * 256 + 128);
                assert_eq!(pixel.0, [x as u8 + 1, y as u8 + 1, 9]);
            }
        }
    }

    #[test]
    fn test_missing_block_is_incomplete() {
        let dir = TempDir::new().unwrap();
        let (grid, blocks_dir) = setup(dir.path());
        fs::remove_file(blocks_dir.join("block_2_2_3_3.png")).unwrap();
        let path = dir.path().join("out.tif");

        match merge_blocks_into_geotiff(&blocks_dir, &grid, &path, &options()) {
            Err(MergeError::Incomplete { blocks }) => {
                assert_eq!(blocks, vec!["block_2_2_3_3.png".to_string()])
            }
            other => panic!("expected incomplete merge, got {:?}", other),
        }
        assert!(!path.exists());
    }

    #[test]
    fn test_corrupt_block_is_incomplete_after_retries() {
        let dir = TempDir::new().unwrap();
        let (grid, blocks_dir) = setup(dir.path());
        fs::write(blocks_dir.join("block_0_2_2_3.png"), b"garbage").unwrap();
        let path = dir.path().join("out.tif");

        let result = merge_blocks_into_geotiff(&blocks_dir, &grid, &path, &options());
        match result {
            Err(MergeError::Incomplete { blocks }) => {
                assert_eq!(blocks, vec!["block_0_2_2_3.png".to_string()])
            }
            other => panic!("expected incomplete merge, got {:?}", other),
        }
        assert!(!path.exists());
    }

    #[test]
    fn test_grid_mismatch_and_missing_index() {
        let dir = TempDir::new().unwrap();
        let (_, blocks_dir) = setup(dir.path());
        let other = TileGrid::new(TileIndex::new(40, 50, 7).unwrap(), 4, 3).unwrap();
        let path = dir.path().join("out.tif");

        assert!(matches!(
            merge_blocks_into_geotiff(&blocks_dir, &other, &path, &options()),
            Err(MergeError::IndexMismatch(_))
        ));
        assert!(matches!(
            merge_blocks_into_geotiff(&dir.path().join("nowhere"), &other, &path, &options()),
            Err(MergeError::MissingIndex(_))
        ));
    }
}
