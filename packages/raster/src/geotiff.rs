//! GeoTIFF decoding into a [`RasterHandle`].
//!
//! Georeferencing comes from the ModelTiepoint and ModelPixelScale tags.
//! The raster is treated as projected when its GeoKey directory names the
//! fixed projected system; otherwise coordinates are taken as degrees.

use std::io::{Cursor, Read, Seek};
use std::path::Path;

use siting_geometry::projection::PROJECTED_EPSG;
use tiff::decoder::{Decoder, DecodingResult, Limits};
use tiff::tags::Tag;

use crate::{RasterBounds, RasterCrs, RasterError, RasterHandle};

const MODEL_PIXEL_SCALE: u16 = 33550;
const MODEL_TIEPOINT: u16 = 33922;
const GEO_KEY_DIRECTORY: u16 = 34735;
const GDAL_NODATA: u16 = 42113;

const PROJECTED_CS_TYPE_GEO_KEY: u32 = 3072;

/// Decoding buffers are capped at 1 GiB.
const BUFFER_LIMIT: usize = 1024 * 1024 * 1024;

/// Decodes a GeoTIFF file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or decoded, or lacks
/// georeferencing tags.
pub fn read_path(path: &Path) -> Result<RasterHandle, RasterError> {
    let file = std::fs::File::open(path)?;
    decode(std::io::BufReader::new(file))
}

/// Decodes a GeoTIFF held in memory.
///
/// # Errors
///
/// Returns an error if the bytes cannot be decoded or lack georeferencing
/// tags.
pub fn read_bytes(bytes: Vec<u8>) -> Result<RasterHandle, RasterError> {
    decode(Cursor::new(bytes))
}

fn decode<R: Read + Seek>(reader: R) -> Result<RasterHandle, RasterError> {
    let mut limits = Limits::default();
    limits.decoding_buffer_size = BUFFER_LIMIT;
    limits.intermediate_buffer_size = BUFFER_LIMIT;
    limits.ifd_value_size = BUFFER_LIMIT;

    let mut decoder = Decoder::new(reader)?.with_limits(limits);
    let (width, height) = decoder.dimensions()?;
    let (width, height) = (width as usize, height as usize);

    let bounds = read_bounds(&mut decoder, width, height)?;
    let crs = read_crs(&mut decoder);
    let no_data = read_no_data(&mut decoder);
    let data = first_band(decode_values(&mut decoder)?, width, height)?;

    log::debug!(
        "Decoded {width}x{height} GeoTIFF ({crs:?}), bounds {bounds:?}, no-data {no_data:?}"
    );

    RasterHandle::new(bounds, width, height, crs, no_data, data)
}

#[allow(clippy::cast_precision_loss)]
fn read_bounds<R: Read + Seek>(
    decoder: &mut Decoder<R>,
    width: usize,
    height: usize,
) -> Result<RasterBounds, RasterError> {
    let tiepoint = decoder
        .get_tag_f64_vec(Tag::Unknown(MODEL_TIEPOINT))
        .map_err(|_| RasterError::InvalidGeoTiff("missing ModelTiepoint tag".to_string()))?;
    let scale = decoder
        .get_tag_f64_vec(Tag::Unknown(MODEL_PIXEL_SCALE))
        .map_err(|_| RasterError::InvalidGeoTiff("missing ModelPixelScale tag".to_string()))?;

    let ([i, j, _, tie_x, tie_y, ..], [scale_x, scale_y, ..]) =
        (tiepoint.as_slice(), scale.as_slice())
    else {
        return Err(RasterError::InvalidGeoTiff(format!(
            "malformed georeferencing: {} tiepoint values, {} scale values",
            tiepoint.len(),
            scale.len()
        )));
    };

    // The tiepoint pins raster cell (i, j) to model (x, y); rows run south.
    let min_x = tie_x - i * scale_x;
    let max_y = tie_y + j * scale_y;

    Ok(RasterBounds {
        min_x,
        min_y: max_y - height as f64 * scale_y,
        max_x: min_x + width as f64 * scale_x,
        max_y,
    })
}

/// Looks up ProjectedCSTypeGeoKey in the GeoKey directory.
fn read_crs<R: Read + Seek>(decoder: &mut Decoder<R>) -> RasterCrs {
    let Ok(directory) = decoder.get_tag_u32_vec(Tag::Unknown(GEO_KEY_DIRECTORY)) else {
        return RasterCrs::Geographic;
    };

    // Header is four shorts, then one (id, location, count, value) entry
    // per key. Location 0 means the value is stored inline.
    let projected_cs = directory
        .get(4..)
        .unwrap_or_default()
        .chunks_exact(4)
        .find(|entry| entry[0] == PROJECTED_CS_TYPE_GEO_KEY && entry[1] == 0)
        .map(|entry| entry[3]);

    if projected_cs == Some(u32::from(PROJECTED_EPSG)) {
        RasterCrs::Projected
    } else {
        RasterCrs::Geographic
    }
}

fn read_no_data<R: Read + Seek>(decoder: &mut Decoder<R>) -> Option<f32> {
    decoder
        .get_tag_ascii_string(Tag::Unknown(GDAL_NODATA))
        .ok()
        .and_then(|s| s.trim_matches(char::from(0)).trim().parse().ok())
}

#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
fn decode_values<R: Read + Seek>(decoder: &mut Decoder<R>) -> Result<Vec<f32>, RasterError> {
    Ok(match decoder.read_image()? {
        DecodingResult::F32(data) => data,
        DecodingResult::F64(data) => data.into_iter().map(|v| v as f32).collect(),
        DecodingResult::I8(data) => data.into_iter().map(f32::from).collect(),
        DecodingResult::I16(data) => data.into_iter().map(f32::from).collect(),
        DecodingResult::I32(data) => data.into_iter().map(|v| v as f32).collect(),
        DecodingResult::I64(data) => data.into_iter().map(|v| v as f32).collect(),
        DecodingResult::U8(data) => data.into_iter().map(f32::from).collect(),
        DecodingResult::U16(data) => data.into_iter().map(f32::from).collect(),
        DecodingResult::U32(data) => data.into_iter().map(|v| v as f32).collect(),
        DecodingResult::U64(data) => data.into_iter().map(|v| v as f32).collect(),
    })
}

/// Keeps only the first band of pixel-interleaved data.
fn first_band(data: Vec<f32>, width: usize, height: usize) -> Result<Vec<f32>, RasterError> {
    let cells = width * height;
    if cells == 0 || data.len() % cells != 0 {
        return Err(RasterError::DimensionMismatch {
            width,
            height,
            len: data.len(),
        });
    }

    let bands = data.len() / cells;
    if bands == 1 {
        return Ok(data);
    }

    log::debug!("GeoTIFF has {bands} bands, using the first");
    Ok(data.into_iter().step_by(bands).collect())
}
