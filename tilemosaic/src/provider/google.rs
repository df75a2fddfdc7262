//! Google satellite tiles.
//!
//! # URL Pattern
//!
//! `http://mt{0,1,2,3}.google.com/vt/lyrs=s&x={x}&y={y}&z={zoom}`
//!
//! - `mt{0-3}` - Load balancing across 4 tile servers
//! - `lyrs=s` - Satellite imagery layer
//! - `x`, `y`, `z` - Standard XYZ tile coordinates

use crate::coord::TileIndex;

/// Builds the tile URL on server `mt{shard}`.
pub(crate) fn tile_url(shard: u8, tile: &TileIndex) -> String {
    format!(
        "http://mt{}.google.com/vt/lyrs=s&x={}&y={}&z={}",
        shard, tile.x, tile.y, tile.zoom
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_format() {
        let tile = TileIndex::new(857331, 430749, 20).unwrap();
        assert_eq!(
            tile_url(2, &tile),
            "http://mt2.google.com/vt/lyrs=s&x=857331&y=430749&z=20"
        );
    }
}
