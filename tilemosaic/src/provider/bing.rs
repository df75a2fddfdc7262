//! Bing Maps aerial tiles.
//!
//! Bing addresses tiles by quadkey rather than by x/y, on servers
//! `ecn.t0` to `ecn.t3`.

use crate::coord::{tile_to_quadkey, TileIndex};

/// Builds the tile URL on server `ecn.t{shard}`.
pub(crate) fn tile_url(shard: u8, tile: &TileIndex) -> String {
    format!(
        "http://ecn.t{}.tiles.virtualearth.net/tiles/a{}.jpeg?g=0",
        shard,
        tile_to_quadkey(tile)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_uses_quadkey() {
        let tile = TileIndex::new(3, 5, 3).unwrap();
        assert_eq!(
            tile_url(0, &tile),
            "http://ecn.t0.tiles.virtualearth.net/tiles/a213.jpeg?g=0"
        );
    }
}
