//! Tianditu (天地图) imagery tiles.
//!
//! Served from `t1` to `t4` and requires a developer key (`tk`). The layer
//! is `img_w`, imagery in Web Mercator.

use crate::coord::TileIndex;

/// Public browser key used when no key is configured.
pub const DEFAULT_TIANDITU_KEY: &str = "9a02b3cdd29cd346de4df04229797710";

/// Builds the tile URL. `shard` is 0-based; hosts are numbered from 1.
pub(crate) fn tile_url(shard: u8, tile: &TileIndex, key: &str) -> String {
    format!(
        "http://t{}.tianditu.gov.cn/DataServer?T=img_w&x={}&y={}&l={}&tk={}",
        shard + 1,
        tile.x,
        tile.y,
        tile.zoom,
        key
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_hosts_start_at_one() {
        let tile = TileIndex::new(100, 200, 9).unwrap();
        assert_eq!(
            tile_url(0, &tile, "abc"),
            "http://t1.tianditu.gov.cn/DataServer?T=img_w&x=100&y=200&l=9&tk=abc"
        );
        assert!(tile_url(3, &tile, "abc").starts_with("http://t4."));
    }
}
