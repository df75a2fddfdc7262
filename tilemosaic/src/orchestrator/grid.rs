//! Tile grid computation

use super::types::GridRequest;
use crate::coord::{
    compute_geo_transform, ground_distance_to_degrees, lng_lat_to_tile, tiles_per_axis, Axis,
    CoordError, GeoPoint, GeoTransform, TileIndex, TILE_SIZE,
};
use thiserror::Error;

/// Errors computing a tile grid.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GridError {
    /// Corners inverted or a zero extent requested
    #[error("Grid extent is empty")]
    EmptyExtent,

    /// Part of the grid falls outside the world at this zoom
    #[error("Grid of {cols}x{rows} tiles from {top_left} leaves the world at zoom {zoom}")]
    OutOfWorld {
        top_left: TileIndex,
        cols: u32,
        rows: u32,
        zoom: u8,
    },

    #[error(transparent)]
    Coord(#[from] CoordError),
}

/// A rectangle of tiles: top-left index plus extents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileGrid {
    top_left: TileIndex,
    cols: u32,
    rows: u32,
}

impl TileGrid {
    /// Creates a grid, checking it is non-empty and inside the world.
    pub fn new(top_left: TileIndex, cols: u32, rows: u32) -> Result<Self, GridError> {
        if cols == 0 || rows == 0 {
            return Err(GridError::EmptyExtent);
        }
        let n = tiles_per_axis(top_left.zoom) as u64;
        if top_left.x as u64 + cols as u64 > n || top_left.y as u64 + rows as u64 > n {
            return Err(GridError::OutOfWorld {
                top_left,
                cols,
                rows,
                zoom: top_left.zoom,
            });
        }
        Ok(Self {
            top_left,
            cols,
            rows,
        })
    }

    /// Grid spanning the tiles of two corner points.
    pub fn from_corners(
        top_left: GeoPoint,
        bottom_right: GeoPoint,
        zoom: u8,
    ) -> Result<Self, GridError> {
        let tl = lng_lat_to_tile(top_left.lng, top_left.lat, zoom)?;
        let br = lng_lat_to_tile(bottom_right.lng, bottom_right.lat, zoom)?;
        if br.x < tl.x || br.y < tl.y {
            return Err(GridError::EmptyExtent);
        }
        Self::new(tl, br.x - tl.x + 1, br.y - tl.y + 1)
    }

    /// Grid covering `center` ± the given ground half-extents.
    pub fn from_center_radius(
        center: GeoPoint,
        half_width_km: f64,
        half_height_km: f64,
        zoom: u8,
    ) -> Result<Self, GridError> {
        if !(half_width_km >= 0.0 && half_height_km >= 0.0) {
            return Err(GridError::EmptyExtent);
        }
        let dlng = ground_distance_to_degrees(half_width_km, center.lat, Axis::Longitude);
        let dlat = ground_distance_to_degrees(half_height_km, center.lat, Axis::Latitude);
        Self::from_corners(
            GeoPoint::new(center.lng - dlng, center.lat + dlat),
            GeoPoint::new(center.lng + dlng, center.lat - dlat),
            zoom,
        )
    }

    /// Grid of an odd number of tiles per axis, centred on the tile holding
    /// `center`, whose pixel extent covers `width × height`.
    pub fn from_center_pixels(
        center: GeoPoint,
        width: u32,
        height: u32,
        zoom: u8,
    ) -> Result<Self, GridError> {
        if width == 0 || height == 0 {
            return Err(GridError::EmptyExtent);
        }
        let c = lng_lat_to_tile(center.lng, center.lat, zoom)?;
        let cols = odd_tile_count(width);
        let rows = odd_tile_count(height);

        let out_of_world = GridError::OutOfWorld {
            top_left: c,
            cols,
            rows,
            zoom,
        };
        let x = c.x.checked_sub(cols / 2).ok_or_else(|| out_of_world.clone())?;
        let y = c.y.checked_sub(rows / 2).ok_or(out_of_world)?;
        Self::new(TileIndex::new(x, y, zoom)?, cols, rows)
    }

    /// Builds the grid for any request mode.
    pub fn from_request(request: &GridRequest, zoom: u8) -> Result<Self, GridError> {
        match *request {
            GridRequest::Corners {
                top_left,
                bottom_right,
            } => Self::from_corners(top_left, bottom_right, zoom),
            GridRequest::CenterRadius {
                center,
                half_width_km,
                half_height_km,
            } => Self::from_center_radius(center, half_width_km, half_height_km, zoom),
            GridRequest::CenterPixels {
                center,
                width,
                height,
            } => Self::from_center_pixels(center, width, height, zoom),
        }
    }

    pub fn top_left(&self) -> TileIndex {
        self.top_left
    }

    pub fn zoom(&self) -> u8 {
        self.top_left.zoom
    }

    pub fn cols(&self) -> u32 {
        self.cols
    }

    pub fn rows(&self) -> u32 {
        self.rows
    }

    pub fn tile_count(&self) -> usize {
        self.cols as usize * self.rows as usize
    }

    pub fn pixel_width(&self) -> u32 {
        self.cols * TILE_SIZE
    }

    pub fn pixel_height(&self) -> u32 {
        self.rows * TILE_SIZE
    }

    /// Absolute tile at grid offset `(dx, dy)`. Offsets must be in range.
    pub fn tile_at(&self, dx: u32, dy: u32) -> TileIndex {
        TileIndex {
            x: self.top_left.x + dx,
            y: self.top_left.y + dy,
            zoom: self.top_left.zoom,
        }
    }

    pub fn geo_transform(&self) -> GeoTransform {
        compute_geo_transform(&self.top_left, self.cols, self.rows)
    }

    /// Pixel position of `point` inside the grid's canvas, clamped to it.
    pub fn pixel_of(&self, point: GeoPoint) -> (u32, u32) {
        let t = self.geo_transform();
        let px = ((point.lng - t.origin_lng) / t.pixel_width).floor();
        let py = ((point.lat - t.origin_lat) / t.pixel_height).floor();
        let clamp = |v: f64, max: u32| v.max(0.0).min(max.saturating_sub(1) as f64) as u32;
        (clamp(px, self.pixel_width()), clamp(py, self.pixel_height()))
    }
}

/// Smallest odd tile count whose pixel extent covers `pixels`.
pub fn odd_tile_count(pixels: u32) -> u32 {
    let n = pixels.div_ceil(TILE_SIZE).max(1);
    if n % 2 == 0 {
        n + 1
    } else {
        n
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_corners_matches_reference_extent() {
        let grid = TileGrid::from_corners(
            GeoPoint::new(114.341316, 30.553657),
            GeoPoint::new(114.37745, 30.517285),
            20,
        )
        .unwrap();
        assert_eq!(grid.top_left(), TileIndex::new(857331, 430749, 20).unwrap());
        assert_eq!((grid.cols(), grid.rows()), (106, 124));
        assert_eq!(grid.tile_count(), 106 * 124);
        assert_eq!(grid.pixel_width(), 106 * 256);
    }

    #[test]
    fn test_inverted_corners_rejected() {
        let result = TileGrid::from_corners(
            GeoPoint::new(10.0, 10.0),
            GeoPoint::new(9.0, 11.0),
            10,
        );
        assert_eq!(result, Err(GridError::EmptyExtent));
    }

    #[test]
    fn test_single_point_is_one_tile() {
        let p = GeoPoint::new(2.35, 48.85);
        let grid = TileGrid::from_corners(p, p, 15).unwrap();
        assert_eq!((grid.cols(), grid.rows()), (1, 1));
    }

    #[test]
    fn test_odd_tile_count() {
        assert_eq!(odd_tile_count(1), 1);
        assert_eq!(odd_tile_count(256), 1);
        assert_eq!(odd_tile_count(257), 3);
        assert_eq!(odd_tile_count(512), 3);
        assert_eq!(odd_tile_count(768), 3);
        assert_eq!(odd_tile_count(20000), 79);
    }

    #[test]
    fn test_center_pixels_is_centred() {
        let center = GeoPoint::new(-74.0060, 40.7128);
        let grid = TileGrid::from_center_pixels(center, 1000, 600, 16).unwrap();
        assert_eq!((grid.cols(), grid.rows()), (5, 3));

        let c = lng_lat_to_tile(center.lng, center.lat, 16).unwrap();
        assert_eq!(grid.tile_at(2, 1), c);
        assert!(grid.pixel_width() >= 1000 && grid.pixel_height() >= 600);
    }

    #[test]
    fn test_center_pixels_at_world_edge() {
        let result = TileGrid::from_center_pixels(GeoPoint::new(-179.99, 0.0), 1024, 256, 4);
        assert!(matches!(result, Err(GridError::OutOfWorld { .. })));
    }

    #[test]
    fn test_center_radius_grows_with_latitude() {
        let equator = TileGrid::from_center_radius(GeoPoint::new(0.5, 0.5), 2.0, 2.0, 14).unwrap();
        let north = TileGrid::from_center_radius(GeoPoint::new(0.5, 60.0), 2.0, 2.0, 14).unwrap();
        assert!(north.cols() >= equator.cols());
        assert!(TileGrid::from_center_radius(GeoPoint::new(0.0, 0.0), -1.0, 1.0, 14).is_err());
    }

    #[test]
    fn test_new_rejects_empty_and_overflow() {
        let tl = TileIndex::new(2, 2, 2).unwrap();
        assert_eq!(TileGrid::new(tl, 0, 1), Err(GridError::EmptyExtent));
        assert!(matches!(
            TileGrid::new(tl, 3, 1),
            Err(GridError::OutOfWorld { .. })
        ));
        assert!(TileGrid::new(tl, 2, 2).is_ok());
    }

    #[test]
    fn test_pixel_of_center_tile() {
        let center = GeoPoint::new(-74.0060, 40.7128);
        let grid = TileGrid::from_center_pixels(center, 256, 256, 16).unwrap();
        let (px, py) = grid.pixel_of(center);
        // Same pixel as the in-tile offset (158, 71), up to rounding
        assert!((157..=158).contains(&px));
        assert!((70..=71).contains(&py));
    }
}
