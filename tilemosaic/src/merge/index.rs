//! Sidecar index of merged blocks
//!
//! Blocks are listed with their tile bounds in `blocks.json` next to the
//! block files, so the block→raster merge never has to parse file names.

use super::MergeError;
use crate::fetch::{write_atomic, TileFormat};
use crate::coord::TILE_SIZE;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::Path;

/// File name of the index inside a blocks directory.
pub const INDEX_FILE: &str = "blocks.json";

/// One block: tiles `x0..x1` × `y0..y1` of the grid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockEntry {
    pub file: String,
    pub x0: u32,
    pub y0: u32,
    pub x1: u32,
    pub y1: u32,
}

impl BlockEntry {
    pub fn new(x0: u32, y0: u32, x1: u32, y1: u32, format: TileFormat) -> Self {
        Self {
            file: format!("block_{}_{}_{}_{}.{}", x0, y0, x1, y1, format.extension()),
            x0,
            y0,
            x1,
            y1,
        }
    }

    pub fn cols(&self) -> u32 {
        self.x1 - self.x0
    }

    pub fn rows(&self) -> u32 {
        self.y1 - self.y0
    }

    pub fn pixel_width(&self) -> u32 {
        self.cols() * TILE_SIZE
    }

    pub fn pixel_height(&self) -> u32 {
        self.rows() * TILE_SIZE
    }
}

/// Splits a `cols × rows` grid into blocks of at most `block_size` tiles per
/// side, ordered by block row then column.
pub fn plan_blocks(cols: u32, rows: u32, block_size: u32, format: TileFormat) -> Vec<BlockEntry> {
    let step = block_size.max(1);
    let mut blocks = Vec::new();
    for y0 in (0..rows).step_by(step as usize) {
        for x0 in (0..cols).step_by(step as usize) {
            let x1 = (x0 + step).min(cols);
            let y1 = (y0 + step).min(rows);
            blocks.push(BlockEntry::new(x0, y0, x1, y1, format));
        }
    }
    blocks
}

/// Index of the blocks written for one grid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockIndex {
    /// Grid extent in tiles
    pub cols: u32,
    pub rows: u32,
    pub block_size: u32,
    pub blocks: Vec<BlockEntry>,
}

impl BlockIndex {
    pub fn new(cols: u32, rows: u32, block_size: u32) -> Self {
        Self {
            cols,
            rows,
            block_size,
            blocks: Vec::new(),
        }
    }

    /// Loads the index from `dir`. A missing index is `None`.
    pub fn load(dir: &Path) -> Result<Option<Self>, MergeError> {
        let path = dir.join(INDEX_FILE);
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let index = serde_json::from_slice(&bytes)?;
        Ok(Some(index))
    }

    /// Writes the index to `dir` atomically.
    pub fn save(&self, dir: &Path) -> Result<(), MergeError> {
        let bytes = serde_json::to_vec_pretty(self)?;
        write_atomic(&dir.join(INDEX_FILE), &bytes)?;
        Ok(())
    }

    /// Whether this index was built for the same grid and block size.
    pub fn matches(&self, cols: u32, rows: u32, block_size: u32) -> bool {
        self.cols == cols && self.rows == rows && self.block_size == block_size
    }

    pub fn get(&self, x0: u32, y0: u32) -> Option<&BlockEntry> {
        self.blocks.iter().find(|b| b.x0 == x0 && b.y0 == y0)
    }

    /// Adds or replaces the block at the same origin, keeping plan order.
    pub fn insert(&mut self, entry: BlockEntry) {
        self.blocks.retain(|b| !(b.x0 == entry.x0 && b.y0 == entry.y0));
        self.blocks.push(entry);
        self.blocks.sort_by_key(|b| (b.y0, b.x0));
    }

    /// Planned blocks the index does not list with the same bounds.
    /// `format` only names the returned entries.
    pub fn missing(&self, format: TileFormat) -> Vec<BlockEntry> {
        plan_blocks(self.cols, self.rows, self.block_size, format)
            .into_iter()
            .filter(|planned| {
                self.get(planned.x0, planned.y0)
                    .map_or(true, |b| (b.x1, b.y1) != (planned.x1, planned.y1))
            })
            .collect()
    }
}
