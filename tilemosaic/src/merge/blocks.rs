//! Tile → block merge

use super::index::{plan_blocks, BlockEntry, BlockIndex};
use super::{MergeError, MergeOptions};
use crate::batch;
use crate::coord::TILE_SIZE;
use crate::fetch::{write_atomic, TileCache};
use image::{imageops, RgbImage};
use std::fs;
use std::path::Path;
use tracing::{debug, info, warn};

/// Outcome of [`merge_tiles_into_blocks`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BlockMergeReport {
    /// Blocks assembled by this run
    pub written: usize,
    /// Blocks already indexed and on disk
    pub skipped: usize,
    /// Blocks that could not be assembled
    pub failed: usize,
    /// Grid positions with no tile in the cache, written black
    pub missing_tiles: usize,
}

impl BlockMergeReport {
    /// Every block was assembled from a full set of tiles.
    pub fn is_complete(&self) -> bool {
        self.failed == 0 && self.missing_tiles == 0
    }
}

/// Stitches the tiles of a `cols × rows` grid into block images in
/// `blocks_dir`.
///
/// Blocks already in the index and on disk are skipped, so an interrupted
/// merge resumes where it stopped. Missing tiles are left black; a tile that
/// exists but cannot be read fails its block. Blocks are assembled in
/// parallel and the index is rewritten only when new blocks were produced.
pub fn merge_tiles_into_blocks(
    cache: &TileCache,
    cols: u32,
    rows: u32,
    blocks_dir: &Path,
    options: &MergeOptions,
) -> Result<BlockMergeReport, MergeError> {
    if options.block_size == 0 {
        return Err(MergeError::InvalidBlockSize);
    }
    fs::create_dir_all(blocks_dir)?;

    let mut index = match BlockIndex::load(blocks_dir)? {
        Some(index) if index.matches(cols, rows, options.block_size) => index,
        Some(index) => {
            return Err(MergeError::IndexMismatch(format!(
                "index is for {}x{} tiles in blocks of {}, requested {}x{} in blocks of {}",
                index.cols, index.rows, index.block_size, cols, rows, options.block_size
            )))
        }
        None => BlockIndex::new(cols, rows, options.block_size),
    };

    let mut report = BlockMergeReport {
        missing_tiles: count_missing_tiles(cache, cols, rows),
        ..BlockMergeReport::default()
    };
    if report.missing_tiles > 0 {
        warn!(
            dir = %cache.dir().display(),
            format = cache.format().extension(),
            missing = report.missing_tiles,
            "Tiles missing from cache, their area stays black"
        );
    }
    let mut pending = Vec::new();
    for block in plan_blocks(cols, rows, options.block_size, options.block_format) {
        let done = index.get(block.x0, block.y0) == Some(&block)
            && blocks_dir.join(&block.file).exists();
        if done {
            report.skipped += 1;
        } else {
            pending.push(block);
        }
    }

    info!(
        blocks = pending.len() + report.skipped,
        pending = pending.len(),
        block_size = options.block_size,
        "Merging tiles into blocks"
    );

    let results = batch::run_batch_with(pending.clone(), options.concurrency, |block| {
        write_block(cache, &block, blocks_dir, options)
    })?;

    for (block, result) in pending.into_iter().zip(results) {
        match result {
            Ok(Ok(())) => {
                debug!(file = %block.file, "Block written");
                index.insert(block);
                report.written += 1;
            }
            Ok(Err(e)) => {
                warn!(file = %block.file, error = %e, "Block failed");
                report.failed += 1;
            }
            Err(e) => {
                warn!(file = %block.file, error = %e, "Block task did not complete");
                report.failed += 1;
            }
        }
    }

    if report.written > 0 {
        index.save(blocks_dir)?;
    }

    info!(
        written = report.written,
        skipped = report.skipped,
        failed = report.failed,
        missing_tiles = report.missing_tiles,
        "Block merge finished"
    );
    Ok(report)
}

/// Grid positions of a `cols × rows` grid with no tile file in `cache`.
pub(crate) fn count_missing_tiles(cache: &TileCache, cols: u32, rows: u32) -> usize {
    (0..rows)
        .flat_map(|y| (0..cols).map(move |x| (x, y)))
        .filter(|&(x, y)| !cache.path_for(x, y).exists())
        .count()
}

/// Assembles one block and writes it atomically.
fn write_block(
    cache: &TileCache,
    block: &BlockEntry,
    blocks_dir: &Path,
    options: &MergeOptions,
) -> Result<(), MergeError> {
    let image = assemble_block(cache, block)?;
    let bytes = options
        .block_format
        .encode(&image)
        .map_err(|source| MergeError::Image {
            path: blocks_dir.join(&block.file),
            source,
        })?;
    write_atomic(&blocks_dir.join(&block.file), &bytes)?;
    Ok(())
}

fn assemble_block(cache: &TileCache, block: &BlockEntry) -> Result<RgbImage, MergeError> {
    let mut image = RgbImage::new(block.pixel_width(), block.pixel_height());
    for y in block.y0..block.y1 {
        for x in block.x0..block.x1 {
            let path = cache.path_for(x, y);
            if !path.exists() {
                continue;
            }
            let tile = image::open(&path)
                .map_err(|source| MergeError::Image {
                    path: path.clone(),
                    source,
                })?
                .to_rgb8();
            let ox = ((x - block.x0) * TILE_SIZE) as i64;
            let oy = ((y - block.y0) * TILE_SIZE) as i64;
            imageops::replace(&mut image, &tile, ox, oy);
        }
    }
    Ok(image)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::TileFormat;
    use crate::merge::INDEX_FILE;
    use image::Rgb;
    use tempfile::TempDir;

    fn cache_with_tiles(dir: &Path, cols: u32, rows: u32, skip: &[(u32, u32)]) -> TileCache {
        let cache = TileCache::create(dir, TileFormat::Png).unwrap();
        for x in 0..cols {
            for y in 0..rows {
                if skip.contains(&(x, y)) {
                    continue;
                }
                let tile = RgbImage::from_pixel(256, 256, Rgb([x as u8 * 40, y as u8 * 40, 1]));
                tile.save(cache.path_for(x, y)).unwrap();
            }
        }
        cache
    }

    fn options(block_size: u32) -> MergeOptions {
        MergeOptions {
            block_size,
            block_format: TileFormat::Png,
            concurrency: 2,
            ..MergeOptions::default()
        }
    }

    #[test]
    fn test_blocks_hold_their_tiles() {
        let dir = TempDir::new().unwrap();
        let cache = cache_with_tiles(&dir.path().join("tiles"), 3, 3, &[(2, 2)]);
        let blocks_dir = dir.path().join("blocks");

        let report = merge_tiles_into_blocks(&cache, 3, 3, &blocks_dir, &options(2)).unwrap();
        assert_eq!(
            report,
            BlockMergeReport { written: 4, skipped: 0, failed: 0, missing_tiles: 1 }
        );
        assert!(!report.is_complete());

        let corner = image::open(blocks_dir.join("block_2_2_3_3.png")).unwrap().to_rgb8();
        assert_eq!(corner.dimensions(), (256, 256));
        // Missing tile stays black
        assert_eq!(corner.get_pixel(10, 10).0, [0, 0, 0]);

        let first = image::open(blocks_dir.join("block_0_0_2_2.png")).unwrap().to_rgb8();
        assert_eq!(first.dimensions(), (512, 512));
        assert_eq!(first.get_pixel(300, 10).0, [40, 0, 1]);
        assert_eq!(first.get_pixel(10, 300).0, [0, 40, 1]);

        let index = BlockIndex::load(&blocks_dir).unwrap().unwrap();
        assert_eq!(index.blocks.len(), 4);
    }

    #[test]
    fn test_second_run_skips_and_keeps_files() {
        let dir = TempDir::new().unwrap();
        let cache = cache_with_tiles(&dir.path().join("tiles"), 2, 2, &[]);
        let blocks_dir = dir.path().join("blocks");

        merge_tiles_into_blocks(&cache, 2, 2, &blocks_dir, &options(1)).unwrap();
        let block = fs::read(blocks_dir.join("block_1_0_2_1.png")).unwrap();
        let index_before = fs::metadata(blocks_dir.join(INDEX_FILE)).unwrap().modified().unwrap();

        let report = merge_tiles_into_blocks(&cache, 2, 2, &blocks_dir, &options(1)).unwrap();
        assert_eq!(report, BlockMergeReport { written: 0, skipped: 4, ..Default::default() });
        assert!(report.is_complete());
        assert_eq!(fs::read(blocks_dir.join("block_1_0_2_1.png")).unwrap(), block);
        let index_after = fs::metadata(blocks_dir.join(INDEX_FILE)).unwrap().modified().unwrap();
        assert_eq!(index_before, index_after);
    }

    #[test]
    fn test_deleted_block_is_rebuilt() {
        let dir = TempDir::new().unwrap();
        let cache = cache_with_tiles(&dir.path().join("tiles"), 2, 1, &[]);
        let blocks_dir = dir.path().join("blocks");

        merge_tiles_into_blocks(&cache, 2, 1, &blocks_dir, &options(1)).unwrap();
        fs::remove_file(blocks_dir.join("block_0_0_1_1.png")).unwrap();

        let report = merge_tiles_into_blocks(&cache, 2, 1, &blocks_dir, &options(1)).unwrap();
        assert_eq!(report, BlockMergeReport { written: 1, skipped: 1, ..Default::default() });
    }

    #[test]
    fn test_unreadable_tile_fails_its_block() {
        let dir = TempDir::new().unwrap();
        let cache = cache_with_tiles(&dir.path().join("tiles"), 2, 1, &[]);
        fs::write(cache.path_for(1, 0), b"not a png").unwrap();
        let blocks_dir = dir.path().join("blocks");

        let report = merge_tiles_into_blocks(&cache, 2, 1, &blocks_dir, &options(1)).unwrap();
        assert_eq!(report, BlockMergeReport { written: 1, failed: 1, ..Default::default() });
        assert!(!report.is_complete());

        let index = BlockIndex::load(&blocks_dir).unwrap().unwrap();
        assert_eq!(index.blocks.len(), 1);
        assert!(index.get(1, 0).is_none());
    }

    #[test]
    fn test_cache_in_other_format_reports_every_tile_missing() {
        let dir = TempDir::new().unwrap();
        let tiles = dir.path().join("tiles");
        cache_with_tiles(&tiles, 2, 2, &[]);

        // A PNG cache read as JPEG finds nothing
        let wrong = TileCache::create(&tiles, TileFormat::default()).unwrap();
        let report =
            merge_tiles_into_blocks(&wrong, 2, 2, &dir.path().join("wrong"), &options(2)).unwrap();
        assert_eq!(report.missing_tiles, 4);
        assert!(!report.is_complete());

        let detected = TileCache::open(&tiles, TileFormat::default()).unwrap();
        let blocks_dir = dir.path().join("blocks");
        let report = merge_tiles_into_blocks(&detected, 2, 2, &blocks_dir, &options(2)).unwrap();
        assert_eq!(report.missing_tiles, 0);
        assert!(report.is_complete());
        let block = image::open(blocks_dir.join("block_0_0_2_2.png")).unwrap().to_rgb8();
        assert_eq!(block.get_pixel(300, 300).0, [40, 40, 1]);
    }

    #[test]
    fn test_index_for_other_grid_rejected() {
        let dir = TempDir::new().unwrap();
        let cache = cache_with_tiles(&dir.path().join("tiles"), 2, 2, &[]);
        let blocks_dir = dir.path().join("blocks");

        merge_tiles_into_blocks(&cache, 2, 2, &blocks_dir, &options(1)).unwrap();
        let result = merge_tiles_into_blocks(&cache, 2, 2, &blocks_dir, &options(2));
        assert!(matches!(result, Err(MergeError::IndexMismatch(_))));
        assert!(matches!(
            merge_tiles_into_blocks(&cache, 2, 2, &blocks_dir, &options(0)),
            Err(MergeError::InvalidBlockSize)
        ));
    }
}
