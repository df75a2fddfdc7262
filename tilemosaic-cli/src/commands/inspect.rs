//! Inspect command - show the size and georeferencing of a GeoTIFF.

use std::path::PathBuf;

use clap::Args;
use tilemosaic::coord::GeoPoint;
use tilemosaic::raster::{read_geotiff, read_geotiff_info, GeoRasterInfo};

use super::common::parse_point;
use crate::error::CliError;

/// Arguments for the inspect command.
#[derive(Debug, Args)]
pub struct InspectArgs {
    /// GeoTIFF to inspect
    pub path: PathBuf,

    /// Also print the pixel at "lng,lat" (decodes the whole raster)
    #[arg(long, value_parser = parse_point, allow_hyphen_values = true)]
    pub at: Option<GeoPoint>,
}

/// Run the inspect command.
pub fn run(args: InspectArgs) -> Result<(), CliError> {
    let info = read_geotiff_info(&args.path).map_err(CliError::Inspect)?;
    let top_left = info.transform.pixel_to_geo(0.0, 0.0);
    let bottom_right = info
        .transform
        .pixel_to_geo(info.width as f64, info.height as f64);

    println!("{}", args.path.display());
    println!("  Size:         {} x {} px", info.width, info.height);
    match info.epsg {
        Some(code) => println!("  CRS:          EPSG:{}", code),
        None => println!("  CRS:          (not declared)"),
    }
    println!(
        "  Pixel size:   {:.9} x {:.9} deg",
        info.transform.pixel_width, info.transform.pixel_height
    );
    println!("  Top-left:     {}", top_left);
    println!("  Bottom-right: {}", bottom_right);
    println!("  GeoTransform: {:?}", info.transform.to_array());

    if let Some(point) = args.at {
        let (px, py) = pixel_at(&info, point).ok_or_else(|| {
            CliError::InvalidArgument(format!("{} is outside the raster", point))
        })?;
        let raster = read_geotiff(&args.path).map_err(CliError::Inspect)?;
        let [r, g, b] = raster.pixels.get_pixel(px, py).0;
        println!("  Pixel ({}, {}) at {}: rgb({}, {}, {})", px, py, point, r, g, b);
    }

    Ok(())
}

/// Pixel holding `point`, if it falls inside the raster.
fn pixel_at(info: &GeoRasterInfo, point: GeoPoint) -> Option<(u32, u32)> {
    let px = ((point.lng - info.transform.origin_lng) / info.transform.pixel_width).floor();
    let py = ((point.lat - info.transform.origin_lat) / info.transform.pixel_height).floor();
    let inside = px >= 0.0 && py >= 0.0 && px < info.width as f64 && py < info.height as f64;
    inside.then_some((px as u32, py as u32))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tilemosaic::coord::GeoTransform;

    fn info() -> GeoRasterInfo {
        GeoRasterInfo {
            width: 100,
            height: 50,
            transform: GeoTransform {
                origin_lng: 10.0,
                pixel_width: 0.5,
                origin_lat: 20.0,
                pixel_height: -0.5,
            },
            epsg: Some(4326),
        }
    }

    #[test]
    fn test_pixel_at() {
        assert_eq!(pixel_at(&info(), GeoPoint::new(10.25, 19.75)), Some((0, 0)));
        assert_eq!(pixel_at(&info(), GeoPoint::new(30.1, 10.1)), Some((40, 19)));
        assert_eq!(pixel_at(&info(), GeoPoint::new(9.9, 19.0)), None);
        assert_eq!(pixel_at(&info(), GeoPoint::new(60.0, 19.0)), None);
        assert_eq!(pixel_at(&info(), GeoPoint::new(11.0, -6.0)), None);
    }
}
