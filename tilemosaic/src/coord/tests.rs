//! Tests for coordinate conversion

use super::*;
use proptest::prelude::*;

#[test]
fn test_new_york_city_at_zoom_16() {
    // New York City: 40.7128°N, 74.0060°W
    let tile = lng_lat_to_tile(-74.0060, 40.7128, 16).unwrap();
    assert_eq!(tile.x, 19295);
    assert_eq!(tile.y, 24640);
    assert_eq!(tile.zoom, 16);
}

#[test]
fn test_london_at_zoom_10() {
    let tile = lng_lat_to_tile(-0.1278, 51.5074, 10).unwrap();
    assert_eq!(tile.x, 511);
    assert_eq!(tile.y, 340);
}

#[test]
fn test_equator_prime_meridian() {
    // At zoom 1 the world is 2×2 tiles; (0, 0) is the corner of tile (1, 1)
    let tile = lng_lat_to_tile(0.0, 0.0, 1).unwrap();
    assert_eq!((tile.x, tile.y), (1, 1));

    let corner = tile_to_lng_lat(1, 1, 1);
    assert!(corner.lng.abs() < 1e-12);
    assert!(corner.lat.abs() < 1e-12);
}

#[test]
fn test_wuhan_university_corners_at_zoom_20() {
    let tl = lng_lat_to_tile(114.341316, 30.553657, 20).unwrap();
    let br = lng_lat_to_tile(114.37745, 30.517285, 20).unwrap();
    assert_eq!((tl.x, tl.y), (857331, 430749));
    assert_eq!((br.x, br.y), (857436, 430872));
}

#[test]
fn test_east_edge_maps_to_last_tile() {
    let tile = lng_lat_to_tile(180.0, 0.0, 4).unwrap();
    assert_eq!(tile.x, 15);
}

#[test]
fn test_invalid_inputs() {
    assert!(matches!(
        lng_lat_to_tile(0.0, 90.0, 10),
        Err(CoordError::InvalidLatitude(_))
    ));
    assert!(matches!(
        lng_lat_to_tile(0.0, -90.0, 10),
        Err(CoordError::InvalidLatitude(_))
    ));
    assert!(matches!(
        lng_lat_to_tile(181.0, 0.0, 10),
        Err(CoordError::InvalidLongitude(_))
    ));
    assert!(matches!(
        lng_lat_to_tile(0.0, 0.0, MAX_ZOOM + 1),
        Err(CoordError::InvalidZoom(_))
    ));
}

#[test]
fn test_tile_index_range_check() {
    assert!(TileIndex::new(3, 3, 2).is_ok());
    assert!(matches!(
        TileIndex::new(4, 0, 2),
        Err(CoordError::TileOutOfRange { .. })
    ));

    let tile = TileIndex::new(2, 2, 2).unwrap();
    assert_eq!(tile.offset(1, 1).unwrap(), TileIndex::new(3, 3, 2).unwrap());
    assert!(tile.offset(2, 0).is_err());
    assert!(tile.offset(u32::MAX, 0).is_err());
}

#[test]
fn test_pixel_offset_inside_tile() {
    assert_eq!(lng_lat_to_pixel(-74.0060, 40.7128, 16).unwrap(), (158, 71));
}

#[test]
fn test_pixel_round_trip() {
    let tile = lng_lat_to_tile(-74.0060, 40.7128, 16).unwrap();
    let (px, py) = lng_lat_to_pixel(-74.0060, 40.7128, 16).unwrap();
    let point = pixel_to_lng_lat(&tile, px as f64, py as f64);

    // One pixel at zoom 16 is well under 1e-4 degrees
    assert!((point.lng - -74.0060).abs() < 1e-4);
    assert!((point.lat - 40.7128).abs() < 1e-4);
}

#[test]
fn test_ground_resolution_halves_per_zoom() {
    assert!((ground_resolution(0) - 156_543.03).abs() < 1e-6);
    assert!((ground_resolution(19) * 2.0 - ground_resolution(18)).abs() < 1e-9);
}

#[test]
fn test_latitude_distance_ignores_reference() {
    let a = ground_distance_to_degrees(10.0, 0.0, Axis::Latitude);
    let b = ground_distance_to_degrees(10.0, 60.0, Axis::Latitude);
    assert_eq!(a, b);
    assert!((a - 10.0 / KM_PER_DEGREE).abs() < 1e-12);
}

#[test]
fn test_longitude_distance_grows_toward_pole() {
    let equator = ground_distance_to_degrees(10.0, 0.0, Axis::Longitude);
    let mid = ground_distance_to_degrees(10.0, 45.0, Axis::Longitude);
    let north = ground_distance_to_degrees(10.0, 70.0, Axis::Longitude);
    assert!(equator < mid && mid < north);
    assert!((mid - equator / 45f64.to_radians().cos()).abs() < 1e-12);
}

#[test]
fn test_geo_transform_matches_reference() {
    let tl = TileIndex::new(857331, 430749, 20).unwrap();
    let gt = compute_geo_transform(&tl, 2, 2);

    assert!((gt.origin_lng - 114.34123992919922).abs() < 1e-9);
    assert!((gt.origin_lat - 30.553687377978715).abs() < 1e-9);
    assert!((gt.pixel_width - 1.341104507446289e-06).abs() < 1e-15);
    assert!((gt.pixel_height - -1.1548999665628168e-06).abs() < 1e-15);

    let arr = gt.to_array();
    assert_eq!(arr[2], 0.0);
    assert_eq!(arr[4], 0.0);
}

#[test]
fn test_geo_transform_far_corner() {
    let tl = TileIndex::new(10, 20, 6).unwrap();
    let gt = compute_geo_transform(&tl, 3, 2);
    let corner = gt.pixel_to_geo(3.0 * 256.0, 2.0 * 256.0);
    let expected = tile_to_lng_lat(13, 22, 6);
    assert!((corner.lng - expected.lng).abs() < 1e-9);
    assert!((corner.lat - expected.lat).abs() < 1e-9);
}

#[test]
fn test_quadkey_reference_values() {
    let tile = TileIndex::new(3, 5, 3).unwrap();
    assert_eq!(tile_to_quadkey(&tile), "213");

    let tile = TileIndex::new(857331, 430749, 20).unwrap();
    assert_eq!(tile_to_quadkey(&tile), "13212003012031132213");
}

#[test]
fn test_quadkey_zoom_zero_is_empty() {
    let tile = TileIndex::new(0, 0, 0).unwrap();
    assert_eq!(tile_to_quadkey(&tile), "");
    assert_eq!(quadkey_to_tile("").unwrap(), tile);
}

#[test]
fn test_quadkey_rejects_bad_digits() {
    assert!(matches!(
        quadkey_to_tile("0124"),
        Err(CoordError::InvalidQuadkey(_))
    ));
}

proptest! {
    #[test]
    fn prop_tile_round_trip_within_one_tile(
        lng in -179.999f64..179.999,
        lat in -85.0f64..85.0,
        zoom in 0u8..=20,
    ) {
        let tile = lng_lat_to_tile(lng, lat, zoom).unwrap();
        let nw = tile_to_lng_lat(tile.x, tile.y, zoom);
        let se = tile_to_lng_lat(tile.x + 1, tile.y + 1, zoom);

        // The point lies inside its tile (tolerance for float edges)
        let eps = 1e-9;
        prop_assert!(nw.lng <= lng + eps && lng <= se.lng + eps);
        prop_assert!(se.lat <= lat + eps && lat <= nw.lat + eps);
    }

    #[test]
    fn prop_quadkey_round_trip(x in 0u32..1 << 18, y in 0u32..1 << 18) {
        let tile = TileIndex::new(x, y, 18).unwrap();
        prop_assert_eq!(quadkey_to_tile(&tile_to_quadkey(&tile)).unwrap(), tile);
    }

    #[test]
    fn prop_latitude_degrees_monotonic(a in 0.0f64..500.0, b in 0.0f64..500.0, lat in -80.0f64..80.0) {
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        prop_assert!(
            ground_distance_to_degrees(lo, lat, Axis::Longitude)
                <= ground_distance_to_degrees(hi, lat, Axis::Longitude)
        );
        prop_assert!(
            ground_distance_to_degrees(lo, lat, Axis::Latitude)
                <= ground_distance_to_degrees(hi, lat, Axis::Latitude)
        );
    }
}
