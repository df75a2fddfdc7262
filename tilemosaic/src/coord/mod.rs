//! Coordinate conversion module
//!
//! Provides conversions between geographic coordinates (longitude/latitude),
//! Web Mercator tile indices and pixel offsets, plus the affine transform
//! used to georeference an assembled raster.

mod types;

#[cfg(test)]
mod tests;

pub use types::{
    tiles_per_axis, Axis, CoordError, GeoPoint, GeoTransform, TileIndex, MAX_LAT, MAX_LON,
    MAX_ZOOM, MIN_LAT, MIN_LON, MIN_ZOOM, TILE_SIZE,
};

use std::f64::consts::PI;

/// Kilometres per degree of latitude (and of longitude at the equator).
pub const KM_PER_DEGREE: f64 = 111.32;

/// Ground resolution of zoom 0 at the equator, in metres per pixel.
const EQUATOR_RESOLUTION_M: f64 = 156_543.03;

fn validate(lng: f64, lat: f64, zoom: u8) -> Result<(), CoordError> {
    if !(MIN_LAT..=MAX_LAT).contains(&lat) {
        return Err(CoordError::InvalidLatitude(lat));
    }
    if !(MIN_LON..=MAX_LON).contains(&lng) {
        return Err(CoordError::InvalidLongitude(lng));
    }
    if zoom > MAX_ZOOM {
        return Err(CoordError::InvalidZoom(zoom));
    }
    Ok(())
}

/// Converts geographic coordinates to the index of the tile containing them.
///
/// # Arguments
///
/// * `lng` - Longitude in degrees (-180.0 to 180.0)
/// * `lat` - Latitude in degrees (-85.05112878 to 85.05112878)
/// * `zoom` - Zoom level (0 to 23)
///
/// Points on the eastern or southern edge of the world map to the last tile.
#[inline]
pub fn lng_lat_to_tile(lng: f64, lat: f64, zoom: u8) -> Result<TileIndex, CoordError> {
    validate(lng, lat, zoom)?;

    let n = 2.0_f64.powi(zoom as i32);
    let last = tiles_per_axis(zoom) - 1;

    let x = ((lng + 180.0) / 360.0 * n).floor() as u32;

    // (1 - asinh(tan φ)/π) · 2^(z-1) is the usual slippy-map row formula
    let lat_rad = lat.to_radians();
    let y = ((1.0 - lat_rad.tan().asinh() / PI) * 2.0_f64.powi(zoom as i32 - 1)).floor() as u32;

    Ok(TileIndex {
        x: x.min(last),
        y: y.min(last),
        zoom,
    })
}

/// Converts a tile index back to the coordinates of its north-west corner.
///
/// `x` and `y` may equal `2^zoom`, which addresses the far (east/south) edge
/// of the world; grid extents rely on that.
#[inline]
pub fn tile_to_lng_lat(x: u32, y: u32, zoom: u8) -> GeoPoint {
    let n = 2.0_f64.powi(zoom as i32);

    let lng = x as f64 / n * 360.0 - 180.0;

    // Inverse Web Mercator
    let lat_rad = (PI * (1.0 - 2.0 * y as f64 / n)).sinh().atan();

    GeoPoint::new(lng, lat_rad.to_degrees())
}

/// Returns the pixel offset (0-255) of a point inside its containing tile.
pub fn lng_lat_to_pixel(lng: f64, lat: f64, zoom: u8) -> Result<(u32, u32), CoordError> {
    validate(lng, lat, zoom)?;

    let world_px = 2.0_f64.powi(zoom as i32) * TILE_SIZE as f64;
    let lat_rad = lat.to_radians();

    let gx = (lng + 180.0) / 360.0 * world_px;
    let gy = (1.0 - (lat_rad.tan() + 1.0 / lat_rad.cos()).ln() / PI) / 2.0 * world_px;

    // Rounding can land exactly on the next tile's first pixel.
    let px = (gx % TILE_SIZE as f64).round() as u32 % TILE_SIZE;
    let py = (gy % TILE_SIZE as f64).round() as u32 % TILE_SIZE;
    Ok((px, py))
}

/// Converts a pixel inside a tile back to geographic coordinates.
pub fn pixel_to_lng_lat(tile: &TileIndex, px: f64, py: f64) -> GeoPoint {
    let n = 2.0_f64.powi(tile.zoom as i32);
    let fx = tile.x as f64 + px / TILE_SIZE as f64;
    let fy = tile.y as f64 + py / TILE_SIZE as f64;

    let lng = fx / n * 360.0 - 180.0;
    let lat = (PI - 2.0 * PI * fy / n).sinh().atan().to_degrees();
    GeoPoint::new(lng, lat)
}

/// Ground resolution at the equator in metres per pixel.
#[inline]
pub fn ground_resolution(zoom: u8) -> f64 {
    EQUATOR_RESOLUTION_M * 2.0_f64.powi(-(zoom as i32))
}

/// Converts a ground distance to a degree delta along one axis.
///
/// Latitude uses a fixed kilometres-per-degree constant. Longitude degrees
/// shrink toward the poles, so the delta is scaled by `1 / cos(reference_lat)`.
pub fn ground_distance_to_degrees(distance_km: f64, reference_lat: f64, axis: Axis) -> f64 {
    match axis {
        Axis::Latitude => distance_km / KM_PER_DEGREE,
        Axis::Longitude => distance_km / (KM_PER_DEGREE * reference_lat.to_radians().cos()),
    }
}

/// Derives the GeoTransform of a raster covering `cols × rows` tiles.
///
/// Origin is the north-west corner of `top_left`; pixel sizes are the
/// geographic extent divided by the pixel extent, so `pixel_height` is
/// negative.
pub fn compute_geo_transform(top_left: &TileIndex, cols: u32, rows: u32) -> GeoTransform {
    let origin = tile_to_lng_lat(top_left.x, top_left.y, top_left.zoom);
    let corner = tile_to_lng_lat(top_left.x + cols, top_left.y + rows, top_left.zoom);

    GeoTransform {
        origin_lng: origin.lng,
        pixel_width: (corner.lng - origin.lng) / (cols as f64 * TILE_SIZE as f64),
        origin_lat: origin.lat,
        pixel_height: (corner.lat - origin.lat) / (rows as f64 * TILE_SIZE as f64),
    }
}

/// Encodes a tile as a Bing Maps quadkey.
///
/// One base-4 digit per level, most significant level first; bit `i` of `x`
/// adds 1 and bit `i` of `y` adds 2.
pub fn tile_to_quadkey(tile: &TileIndex) -> String {
    let mut quadkey = String::with_capacity(tile.zoom as usize);
    for level in (1..=tile.zoom).rev() {
        let mask = 1u32 << (level - 1);
        let mut digit = b'0';
        if tile.x & mask != 0 {
            digit += 1;
        }
        if tile.y & mask != 0 {
            digit += 2;
        }
        quadkey.push(digit as char);
    }
    quadkey
}

/// Decodes a quadkey back into a tile index.
pub fn quadkey_to_tile(quadkey: &str) -> Result<TileIndex, CoordError> {
    if quadkey.len() > MAX_ZOOM as usize {
        return Err(CoordError::InvalidQuadkey(quadkey.to_string()));
    }

    let zoom = quadkey.len() as u8;
    let mut x = 0u32;
    let mut y = 0u32;
    for (i, c) in quadkey.chars().enumerate() {
        let mask = 1u32 << (zoom as usize - 1 - i);
        match c {
            '0' => {}
            '1' => x |= mask,
            '2' => y |= mask,
            '3' => {
                x |= mask;
                y |= mask;
            }
            _ => return Err(CoordError::InvalidQuadkey(quadkey.to_string())),
        }
    }
    Ok(TileIndex { x, y, zoom })
}
