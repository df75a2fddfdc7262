//! Coordinate type definitions

use std::fmt;

/// Web Mercator valid latitude range
pub const MIN_LAT: f64 = -85.05112878;
pub const MAX_LAT: f64 = 85.05112878;

/// Valid longitude range
pub const MIN_LON: f64 = -180.0;
pub const MAX_LON: f64 = 180.0;

/// Zoom range accepted by the coordinate functions.
///
/// Provider ceilings are lower (18-20) and are enforced by the URL resolver.
pub const MIN_ZOOM: u8 = 0;
pub const MAX_ZOOM: u8 = 23;

/// Edge length of a slippy-map tile in pixels.
pub const TILE_SIZE: u32 = 256;

/// Geographic point in degrees (WGS-84).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoPoint {
    /// Longitude, east positive
    pub lng: f64,
    /// Latitude, north positive
    pub lat: f64,
}

impl GeoPoint {
    pub const fn new(lng: f64, lat: f64) -> Self {
        Self { lng, lat }
    }
}

impl fmt::Display for GeoPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.6}, {:.6})", self.lng, self.lat)
    }
}

/// Tile index in the Web Mercator / Slippy Map pyramid.
///
/// Identifies one 256×256 tile. `x` grows eastward from 180°W, `y` grows
/// southward from ~85.05°N.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TileIndex {
    /// Column (east-west), 0 at west
    pub x: u32,
    /// Row (north-south), 0 at north
    pub y: u32,
    /// Zoom level
    pub zoom: u8,
}

impl TileIndex {
    /// Creates a tile index, checking it lies inside the pyramid at `zoom`.
    pub fn new(x: u32, y: u32, zoom: u8) -> Result<Self, CoordError> {
        if zoom > MAX_ZOOM {
            return Err(CoordError::InvalidZoom(zoom));
        }
        let n = tiles_per_axis(zoom);
        if x >= n || y >= n {
            return Err(CoordError::TileOutOfRange { x, y, zoom });
        }
        Ok(Self { x, y, zoom })
    }

    /// Returns the tile shifted by a grid offset, range checked.
    pub fn offset(&self, dx: u32, dy: u32) -> Result<Self, CoordError> {
        // Saturated values are always past the pyramid edge and get rejected.
        Self::new(self.x.saturating_add(dx), self.y.saturating_add(dy), self.zoom)
    }
}

impl fmt::Display for TileIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.zoom, self.x, self.y)
    }
}

/// Number of tiles along one axis at `zoom`.
#[inline]
pub fn tiles_per_axis(zoom: u8) -> u32 {
    1u32 << zoom
}

/// Axis selector for ground-distance conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    /// East-west distance, converted to a longitude delta
    Longitude,
    /// North-south distance, converted to a latitude delta
    Latitude,
}

/// Affine transform from raster pixel space to geographic coordinates.
///
/// Same layout as a GDAL GeoTransform:
/// `lng = origin_lng + px * pixel_width`, `lat = origin_lat + py * pixel_height`.
/// The two rotation terms are always zero for north-up rasters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoTransform {
    pub origin_lng: f64,
    pub pixel_width: f64,
    pub origin_lat: f64,
    /// Negative for north-up rasters
    pub pixel_height: f64,
}

impl GeoTransform {
    /// Returns the transform as the standard 6-tuple.
    pub fn to_array(&self) -> [f64; 6] {
        [
            self.origin_lng,
            self.pixel_width,
            0.0,
            self.origin_lat,
            0.0,
            self.pixel_height,
        ]
    }

    /// Geographic coordinate of a pixel's top-left corner.
    pub fn pixel_to_geo(&self, px: f64, py: f64) -> GeoPoint {
        GeoPoint::new(
            self.origin_lng + px * self.pixel_width,
            self.origin_lat + py * self.pixel_height,
        )
    }
}

/// Errors that can occur during coordinate conversion.
#[derive(Debug, Clone, PartialEq)]
pub enum CoordError {
    /// Latitude is outside valid range (-85.05112878 to 85.05112878)
    InvalidLatitude(f64),
    /// Longitude is outside valid range (-180.0 to 180.0)
    InvalidLongitude(f64),
    /// Zoom level is outside valid range
    InvalidZoom(u8),
    /// Tile index outside the pyramid at its zoom
    TileOutOfRange { x: u32, y: u32, zoom: u8 },
    /// Quadkey contains invalid characters or is too long
    InvalidQuadkey(String),
}

impl fmt::Display for CoordError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CoordError::InvalidLatitude(lat) => {
                write!(
                    f,
                    "Invalid latitude: {} (must be between {} and {})",
                    lat, MIN_LAT, MAX_LAT
                )
            }
            CoordError::InvalidLongitude(lon) => {
                write!(
                    f,
                    "Invalid longitude: {} (must be between {} and {})",
                    lon, MIN_LON, MAX_LON
                )
            }
            CoordError::InvalidZoom(zoom) => {
                write!(
                    f,
                    "Invalid zoom level: {} (must be between {} and {})",
                    zoom, MIN_ZOOM, MAX_ZOOM
                )
            }
            CoordError::TileOutOfRange { x, y, zoom } => {
                write!(f, "Tile x={} y={} is outside the pyramid at zoom {}", x, y, zoom)
            }
            CoordError::InvalidQuadkey(quadkey) => {
                write!(
                    f,
                    "Invalid quadkey: '{}' (must contain only digits 0-3 and length <= {})",
                    quadkey, MAX_ZOOM
                )
            }
        }
    }
}

impl std::error::Error for CoordError {}
