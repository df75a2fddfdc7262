//! Tile cache cleanup

use super::blocks::count_missing_tiles;
use crate::fetch::{parse_tile_file_name, TileCache};
use std::fs;
use std::io;
use tracing::{info, warn};

/// Deletes `cache` if it holds exactly the tiles of a `cols × rows` grid.
///
/// Every grid position must have a tile in the cache's own format, and the
/// directory must hold no other tile files. Returns whether the directory
/// was removed. A directory that does not exist is left alone.
pub fn remove_tile_cache_if_complete(cache: &TileCache, cols: u32, rows: u32) -> io::Result<bool> {
    let dir = cache.dir();
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(false),
        Err(e) => return Err(e),
    };

    let mut tiles = 0;
    for entry in entries {
        let entry = entry?;
        let is_tile = entry
            .file_name()
            .to_str()
            .and_then(parse_tile_file_name)
            .is_some();
        if is_tile {
            tiles += 1;
        }
    }

    let expected = cols as usize * rows as usize;
    let missing = count_missing_tiles(cache, cols, rows);
    if missing > 0 || tiles != expected {
        warn!(
            dir = %dir.display(),
            format = cache.format().extension(),
            tiles,
            expected,
            missing,
            "Tile cache incomplete, keeping it"
        );
        return Ok(false);
    }

    fs::remove_dir_all(dir)?;
    info!(dir = %dir.display(), tiles, "Tile cache removed");
    Ok(true)
}
