//! GeoTIFF reader for verification and inspection

use super::geotiff::{
    epsg_from_geokeys, GEOTIFF_GEOKEYDIRECTORY, GEOTIFF_MODELPIXELSCALE, GEOTIFF_MODELTIEPOINT,
};
use super::RasterError;
use crate::coord::GeoTransform;
use image::RgbImage;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use tiff::decoder::{Decoder, DecodingResult, Limits};
use tiff::tags::Tag;

/// Georeferencing and size of a GeoTIFF, without its pixels.
#[derive(Debug, Clone, PartialEq)]
pub struct GeoRasterInfo {
    pub width: u32,
    pub height: u32,
    pub transform: GeoTransform,
    /// EPSG code from the GeoKeyDirectory, if declared
    pub epsg: Option<u16>,
}

/// A decoded RGB GeoTIFF.
#[derive(Debug, Clone)]
pub struct GeoRasterImage {
    pub info: GeoRasterInfo,
    pub pixels: RgbImage,
}

fn open(path: &Path) -> Result<Decoder<BufReader<File>>, RasterError> {
    let file = File::open(path)?;
    Ok(Decoder::new(BufReader::new(file))?.with_limits(Limits::unlimited()))
}

fn read_info(decoder: &mut Decoder<BufReader<File>>) -> Result<GeoRasterInfo, RasterError> {
    let (width, height) = decoder.dimensions()?;

    let scale = decoder
        .find_tag(Tag::Unknown(GEOTIFF_MODELPIXELSCALE))?
        .ok_or(RasterError::MissingGeoreference)?
        .into_f64_vec()?;
    let tiepoint = decoder
        .find_tag(Tag::Unknown(GEOTIFF_MODELTIEPOINT))?
        .ok_or(RasterError::MissingGeoreference)?
        .into_f64_vec()?;
    if scale.len() < 2 || tiepoint.len() < 6 {
        return Err(RasterError::MissingGeoreference);
    }

    let epsg = match decoder.find_tag(Tag::Unknown(GEOTIFF_GEOKEYDIRECTORY))? {
        Some(value) => epsg_from_geokeys(&value.into_u16_vec()?),
        None => None,
    };

    Ok(GeoRasterInfo {
        width,
        height,
        transform: GeoTransform {
            origin_lng: tiepoint[3],
            pixel_width: scale[0],
            origin_lat: tiepoint[4],
            pixel_height: -scale[1],
        },
        epsg,
    })
}

/// Reads size and georeferencing only.
pub fn read_geotiff_info<P: AsRef<Path>>(path: P) -> Result<GeoRasterInfo, RasterError> {
    let mut decoder = open(path.as_ref())?;
    read_info(&mut decoder)
}

/// Reads a 3-band 8-bit GeoTIFF including its pixels.
pub fn read_geotiff<P: AsRef<Path>>(path: P) -> Result<GeoRasterImage, RasterError> {
    let mut decoder = open(path.as_ref())?;
    let info = read_info(&mut decoder)?;

    let data = match decoder.read_image()? {
        DecodingResult::U8(data) => data,
        _ => {
            return Err(RasterError::InvalidData(
                "expected 8-bit samples".to_string(),
            ))
        }
    };

    let pixels = RgbImage::from_raw(info.width, info.height, data).ok_or_else(|| {
        RasterError::InvalidData("pixel data is not 3-band RGB".to_string())
    })?;

    Ok(GeoRasterImage { info, pixels })
}
