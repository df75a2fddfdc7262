//! GeoTIFF writer
//!
//! Writes 3-band 8-bit rasters strip by strip, pulling rows from a
//! [`RowSource`] so the full image never has to be in memory. Georeferencing
//! uses the ModelPixelScale / ModelTiepoint / GeoKeyDirectory tags with
//! EPSG:4326.

use super::RasterError;
use crate::coord::GeoTransform;
use std::fmt;
use std::fs::File;
use std::io::{BufWriter, Seek, Write};
use std::path::Path;
use std::str::FromStr;
use tiff::encoder::compression::{CompressionAlgorithm, Deflate, DeflateLevel, Lzw};
use tiff::encoder::{DirectoryEncoder, TiffEncoder, TiffKind};
use tiff::tags::{
    CompressionMethod, PhotometricInterpretation, PlanarConfiguration, SampleFormat, Tag,
};
use tracing::debug;

// GeoTIFF tag IDs (not in the tiff crate)
pub(crate) const GEOTIFF_MODELPIXELSCALE: u16 = 33550;
pub(crate) const GEOTIFF_MODELTIEPOINT: u16 = 33922;
pub(crate) const GEOTIFF_GEOKEYDIRECTORY: u16 = 34735;

// GeoKey IDs and values
const GT_MODEL_TYPE_GEO_KEY: u16 = 1024;
const GT_RASTER_TYPE_GEO_KEY: u16 = 1025;
const GEOGRAPHIC_TYPE_GEO_KEY: u16 = 2048;
const MODEL_TYPE_GEOGRAPHIC: u16 = 2;
const RASTER_PIXEL_IS_AREA: u16 = 1;

/// EPSG code of WGS-84 geographic coordinates.
pub const EPSG_WGS84: u16 = 4326;

/// Rows per strip; matches the tile edge so each strip is one tile row.
pub const STRIP_ROWS: u32 = 256;

/// Above this many pixel bytes the file is written as BigTIFF.
const BIGTIFF_THRESHOLD: u64 = 3 * 1024 * 1024 * 1024;

/// Compression method for GeoTIFF output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Compression {
    None,
    #[default]
    Lzw,
    Deflate,
}

impl Compression {
    fn method(self) -> CompressionMethod {
        match self {
            Compression::None => CompressionMethod::None,
            Compression::Lzw => CompressionMethod::LZW,
            Compression::Deflate => CompressionMethod::Deflate,
        }
    }

    /// Compresses one strip into `out`, replacing its contents.
    fn encode_strip(self, strip: &[u8], out: &mut Vec<u8>) -> Result<(), RasterError> {
        out.clear();
        match self {
            Compression::None => out.extend_from_slice(strip),
            Compression::Lzw => {
                Lzw.write_to(out, strip)?;
            }
            Compression::Deflate => {
                Deflate::with_level(DeflateLevel::Fast).write_to(out, strip)?;
            }
        }
        Ok(())
    }
}

impl fmt::Display for Compression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Compression::None => write!(f, "none"),
            Compression::Lzw => write!(f, "lzw"),
            Compression::Deflate => write!(f, "deflate"),
        }
    }
}

impl FromStr for Compression {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" => Ok(Compression::None),
            "lzw" => Ok(Compression::Lzw),
            "deflate" => Ok(Compression::Deflate),
            other => Err(format!(
                "unknown compression '{}' (expected none, lzw or deflate)",
                other
            )),
        }
    }
}

/// Supplies interleaved RGB rows to the writer, top to bottom.
pub trait RowSource {
    /// Fills `buf` with rows `y..y + rows`, `width * 3` bytes per row.
    fn read_rows(&mut self, y: u32, rows: u32, buf: &mut [u8]) -> Result<(), RasterError>;
}

/// Builder for a GeoTIFF output file.
#[derive(Debug, Clone)]
pub struct GeoTiffWriter {
    width: u32,
    height: u32,
    transform: GeoTransform,
    compression: Compression,
}

impl GeoTiffWriter {
    pub fn new(width: u32, height: u32, transform: GeoTransform) -> Self {
        Self {
            width,
            height,
            transform,
            compression: Compression::default(),
        }
    }

    #[must_use]
    pub fn compression(mut self, compression: Compression) -> Self {
        self.compression = compression;
        self
    }

    /// Writes the file at `path`, pulling every row from `source`.
    pub fn write<P: AsRef<Path>>(
        &self,
        path: P,
        source: &mut dyn RowSource,
    ) -> Result<(), RasterError> {
        let file = File::create(path.as_ref())?;
        let mut writer = BufWriter::new(file);
        self.write_to(&mut writer, source)?;
        writer.flush()?;
        Ok(())
    }

    /// Writes to any seekable writer.
    pub fn write_to<W: Write + Seek>(
        &self,
        writer: W,
        source: &mut dyn RowSource,
    ) -> Result<(), RasterError> {
        if self.width == 0 || self.height == 0 {
            return Err(RasterError::InvalidData(
                "raster has zero dimensions".to_string(),
            ));
        }

        let pixel_bytes = self.width as u64 * self.height as u64 * 3;
        if pixel_bytes > BIGTIFF_THRESHOLD {
            debug!(pixel_bytes, "Writing BigTIFF");
            self.write_image(TiffEncoder::new_big(writer)?, source)
        } else {
            self.write_image(TiffEncoder::new(writer)?, source)
        }
    }

    /// Writes the strips and then the image directory describing them.
    ///
    /// Strips are compressed here and written as opaque data, so the
    /// Compression tag always matches the bytes on disk.
    fn write_image<W: Write + Seek, K: TiffKind>(
        &self,
        mut encoder: TiffEncoder<W, K>,
        source: &mut dyn RowSource,
    ) -> Result<(), RasterError> {
        let mut dir = encoder.image_directory()?;

        let row_bytes = self.width as usize * 3;
        let mut raw = Vec::with_capacity(row_bytes * STRIP_ROWS as usize);
        let mut packed = Vec::new();
        let mut offsets = Vec::new();
        let mut byte_counts = Vec::new();

        let mut y = 0;
        while y < self.height {
            let rows = STRIP_ROWS.min(self.height - y);
            raw.clear();
            raw.resize(row_bytes * rows as usize, 0);
            source.read_rows(y, rows, &mut raw)?;

            self.compression.encode_strip(&raw, &mut packed)?;
            let offset = dir.write_data(packed.as_slice())?;
            offsets.push(K::convert_offset(offset)?);
            byte_counts.push(K::convert_offset(packed.len() as u64)?);
            // Keep the next strip and the directory word aligned
            if packed.len() % 2 == 1 {
                dir.write_data(0u8)?;
            }
            y += rows;
        }

        dir.write_tag(Tag::ImageWidth, self.width)?;
        dir.write_tag(Tag::ImageLength, self.height)?;
        dir.write_tag(Tag::BitsPerSample, [8u16, 8, 8].as_slice())?;
        dir.write_tag(Tag::Compression, self.compression.method().to_u16())?;
        dir.write_tag(
            Tag::PhotometricInterpretation,
            PhotometricInterpretation::RGB.to_u16(),
        )?;
        dir.write_tag(Tag::StripOffsets, K::convert_slice(&offsets))?;
        dir.write_tag(Tag::SamplesPerPixel, 3u16)?;
        dir.write_tag(Tag::RowsPerStrip, STRIP_ROWS)?;
        dir.write_tag(Tag::StripByteCounts, K::convert_slice(&byte_counts))?;
        dir.write_tag(
            Tag::PlanarConfiguration,
            PlanarConfiguration::Chunky.to_u16(),
        )?;
        let sample_format = [SampleFormat::Uint.to_u16(); 3];
        dir.write_tag(Tag::SampleFormat, sample_format.as_slice())?;
        self.write_geotiff_tags(&mut dir)?;

        dir.finish()?;
        Ok(())
    }

    fn write_geotiff_tags<W: Write + Seek, K: TiffKind>(
        &self,
        dir: &mut DirectoryEncoder<W, K>,
    ) -> Result<(), RasterError> {
        let t = &self.transform;

        // ModelPixelScale: [ScaleX, ScaleY, ScaleZ], ScaleY positive
        let pixel_scale = [t.pixel_width, -t.pixel_height, 0.0];
        dir.write_tag(Tag::Unknown(GEOTIFF_MODELPIXELSCALE), pixel_scale.as_slice())?;

        // ModelTiepoint: pixel (0, 0) ↔ raster origin
        let tiepoint = [0.0, 0.0, 0.0, t.origin_lng, t.origin_lat, 0.0];
        dir.write_tag(Tag::Unknown(GEOTIFF_MODELTIEPOINT), tiepoint.as_slice())?;

        let geokeys = geokey_directory();
        dir.write_tag(Tag::Unknown(GEOTIFF_GEOKEYDIRECTORY), geokeys.as_slice())?;
        Ok(())
    }
}

/// GeoKeyDirectory for a geographic EPSG:4326 raster, pixel-is-area.
fn geokey_directory() -> Vec<u16> {
    vec![
        // KeyDirectoryVersion, KeyRevision, MinorRevision, NumberOfKeys
        1,
        1,
        0,
        3,
        GT_MODEL_TYPE_GEO_KEY,
        0,
        1,
        MODEL_TYPE_GEOGRAPHIC,
        GT_RASTER_TYPE_GEO_KEY,
        0,
        1,
        RASTER_PIXEL_IS_AREA,
        GEOGRAPHIC_TYPE_GEO_KEY,
        0,
        1,
        EPSG_WGS84,
    ]
}

/// Returns the EPSG code declared in a GeoKeyDirectory, if any.
pub(crate) fn epsg_from_geokeys(keys: &[u16]) -> Option<u16> {
    let count = *keys.get(3)? as usize;
    keys.get(4..4 + count * 4)?
        .chunks_exact(4)
        .find(|entry| entry[0] == GEOGRAPHIC_TYPE_GEO_KEY && entry[1] == 0)
        .map(|entry| entry[3])
}
