//! ArcGIS World Imagery tiles.
//!
//! The REST endpoint orders the path as `{z}/{y}/{x}`, row before column.
//! There is a single host, so no sharding.

use crate::coord::TileIndex;

const BASE_URL: &str =
    "http://server.arcgisonline.com/ArcGIS/rest/services/World_Imagery/MapServer/tile";

pub(crate) fn tile_url(tile: &TileIndex) -> String {
    format!("{}/{}/{}/{}", BASE_URL, tile.zoom, tile.y, tile.x)
}
