//! Native GeoTIFF reading/writing
//!
//! Uses the `tiff` crate. The affine transform comes from ModelPixelScale +
//! ModelTiepoint (or ModelTransformation) and the CRS from the EPSG code in
//! the GeoKeyDirectory.

use crate::crs::CRS;
use crate::error::{Error, Result};
use crate::raster::{GeoTransform, Mask, Raster, RasterElement};
use std::fs::File;
use std::io::{BufWriter, Cursor, Read, Seek, Write};
use std::path::Path;
use tiff::decoder::{Decoder, DecodingResult, Limits};
use tiff::encoder::colortype::{Gray32Float, Gray8};
use tiff::encoder::{DirectoryEncoder, TiffEncoder, TiffKind};
use tiff::tags::Tag;

const GT_MODEL_TYPE: u16 = 1024;
const GT_RASTER_TYPE: u16 = 1025;
const GEOGRAPHIC_TYPE: u16 = 2048;
const PROJECTED_CS_TYPE: u16 = 3072;
const USER_DEFINED: u16 = 32767;

/// Read one band of a GeoTIFF file into a Raster.
///
/// `band` is 1-based; `None` reads the first band.
pub fn read_geotiff<T, P>(path: P, band: Option<usize>) -> Result<Raster<T>>
where
    T: RasterElement,
    P: AsRef<Path>,
{
    let bands = read_geotiff_bands(path)?;
    select_band(bands, band)
}

/// Read every band of a GeoTIFF file.
///
/// Bands share the transform and CRS of the file.
pub fn read_geotiff_bands<T, P>(path: P) -> Result<Vec<Raster<T>>>
where
    T: RasterElement,
    P: AsRef<Path>,
{
    let file = File::open(path.as_ref())?;
    decode_geotiff(file)
}

/// Read one band of a GeoTIFF held in memory
pub fn read_geotiff_from_buffer<T>(data: &[u8], band: Option<usize>) -> Result<Raster<T>>
where
    T: RasterElement,
{
    let bands = decode_geotiff(Cursor::new(data))?;
    select_band(bands, band)
}

fn select_band<T: RasterElement>(mut bands: Vec<Raster<T>>, band: Option<usize>) -> Result<Raster<T>> {
    let index = band.unwrap_or(1);
    let count = bands.len();
    if index == 0 || index > count {
        return Err(Error::InvalidParameter {
            name: "band",
            value: index.to_string(),
            reason: format!("file has {} band(s)", count),
        });
    }
    Ok(bands.swap_remove(index - 1))
}

fn cast_samples<S, T>(buf: Vec<S>) -> Vec<T>
where
    S: num_traits::NumCast + Copy,
    T: RasterElement,
{
    buf.into_iter()
        .map(|v| num_traits::cast(v).unwrap_or_else(T::default_nodata))
        .collect()
}

/// Decode all bands from any `Read + Seek` source
fn decode_geotiff<T, R>(reader: R) -> Result<Vec<Raster<T>>>
where
    T: RasterElement,
    R: Read + Seek,
{
    let mut decoder = Decoder::new(reader)?.with_limits(Limits::unlimited());

    let (width, height) = decoder.dimensions()?;
    let rows = height as usize;
    let cols = width as usize;
    if rows == 0 || cols == 0 {
        return Err(Error::InvalidDimensions {
            width: cols,
            height: rows,
        });
    }

    let samples: Vec<T> = match decoder.read_image()? {
        DecodingResult::U8(buf) => cast_samples(buf),
        DecodingResult::U16(buf) => cast_samples(buf),
        DecodingResult::U32(buf) => cast_samples(buf),
        DecodingResult::U64(buf) => cast_samples(buf),
        DecodingResult::I8(buf) => cast_samples(buf),
        DecodingResult::I16(buf) => cast_samples(buf),
        DecodingResult::I32(buf) => cast_samples(buf),
        DecodingResult::I64(buf) => cast_samples(buf),
        DecodingResult::F32(buf) => cast_samples(buf),
        DecodingResult::F64(buf) => cast_samples(buf),
        #[allow(unreachable_patterns)]
        _ => return Err(Error::UnsupportedDataType("Unsupported TIFF pixel format".to_string())),
    };

    let pixels = rows * cols;
    if samples.is_empty() || samples.len() % pixels != 0 {
        return Err(Error::InvalidDimensions {
            width: cols,
            height: rows,
        });
    }
    let band_count = samples.len() / pixels;

    let transform = read_geotransform(&mut decoder).unwrap_or_default();
    let crs = read_crs(&mut decoder);

    // Samples are interleaved per pixel
    let mut bands = Vec::with_capacity(band_count);
    for b in 0..band_count {
        let data: Vec<T> = samples.iter().skip(b).step_by(band_count).copied().collect();
        bands.push(Raster::from_vec(data, rows, cols)?.with_geo(transform, crs.clone()));
    }

    Ok(bands)
}

/// Read the affine transform from GeoTIFF model tags
fn read_geotransform<R: Read + Seek>(decoder: &mut Decoder<R>) -> Result<GeoTransform> {
    let scale = decoder.get_tag_f64_vec(Tag::ModelPixelScaleTag);
    let tiepoint = decoder.get_tag_f64_vec(Tag::ModelTiepointTag);

    if let (Ok(scale), Ok(tiepoint)) = (&scale, &tiepoint) {
        if scale.len() >= 2 && tiepoint.len() >= 6 {
            // tiepoint: [I, J, K, X, Y, Z]; scale: [ScaleX, ScaleY, ScaleZ]
            let origin_x = tiepoint[3] - tiepoint[0] * scale[0];
            let origin_y = tiepoint[4] + tiepoint[1] * scale[1];
            return Ok(GeoTransform::new(origin_x, origin_y, scale[0], -scale[1]));
        }
    }

    // Row-major 4x4 matrix
    if let Ok(t) = decoder.get_tag_f64_vec(Tag::ModelTransformationTag) {
        if t.len() >= 16 {
            return Ok(GeoTransform {
                origin_x: t[3],
                origin_y: t[7],
                pixel_width: t[0],
                pixel_height: t[5],
                row_rotation: t[1],
                col_rotation: t[4],
            });
        }
    }

    Err(Error::Other("Cannot determine geotransform".into()))
}

/// EPSG code from the GeoKeyDirectory, when present
fn read_crs<R: Read + Seek>(decoder: &mut Decoder<R>) -> Option<CRS> {
    let keys = decoder.get_tag_u16_vec(Tag::GeoKeyDirectoryTag).ok()?;
    parse_geokeys(&keys)
}

/// Parse `[version, revision, minor, count, (key, location, count, value)*]`.
/// Only inline values (location 0) are considered.
fn parse_geokeys(keys: &[u16]) -> Option<CRS> {
    if keys.len() < 4 {
        return None;
    }
    let num_keys = keys[3] as usize;
    let mut geographic = None;

    for entry in keys[4..].chunks_exact(4).take(num_keys) {
        let (key_id, location, value) = (entry[0], entry[1], entry[3]);
        if location != 0 || value == 0 || value == USER_DEFINED {
            continue;
        }
        match key_id {
            PROJECTED_CS_TYPE => return Some(CRS::from_epsg(value as u32)),
            GEOGRAPHIC_TYPE => geographic = Some(CRS::from_epsg(value as u32)),
            _ => {}
        }
    }

    geographic
}

/// GeoKeyDirectory entries describing a CRS
fn build_geokeys(crs: Option<&CRS>) -> Vec<u16> {
    let mut entries: Vec<[u16; 4]> = Vec::new();

    match crs.and_then(|c| c.epsg().map(|code| (c, code))) {
        Some((c, code)) if code <= u16::MAX as u32 => {
            let code = code as u16;
            if c.is_geographic() {
                entries.push([GT_MODEL_TYPE, 0, 1, 2]);
                entries.push([GT_RASTER_TYPE, 0, 1, 1]);
                entries.push([GEOGRAPHIC_TYPE, 0, 1, code]);
            } else {
                entries.push([GT_MODEL_TYPE, 0, 1, 1]);
                entries.push([GT_RASTER_TYPE, 0, 1, 1]);
                entries.push([PROJECTED_CS_TYPE, 0, 1, code]);
            }
        }
        _ => {
            entries.push([GT_MODEL_TYPE, 0, 1, 1]);
            entries.push([GT_RASTER_TYPE, 0, 1, 1]);
        }
    }

    let mut keys = vec![1, 1, 0, entries.len() as u16];
    for e in entries {
        keys.extend_from_slice(&e);
    }
    keys
}

fn write_geo_tags<W, K>(
    encoder: &mut DirectoryEncoder<'_, W, K>,
    transform: &GeoTransform,
    crs: Option<&CRS>,
) -> Result<()>
where
    W: Write + Seek,
    K: TiffKind,
{
    if transform.row_rotation == 0.0 && transform.col_rotation == 0.0 {
        let scale = [transform.pixel_width, transform.pixel_height.abs(), 0.0];
        encoder.write_tag(Tag::ModelPixelScaleTag, &scale[..])?;
        let tiepoint = [0.0, 0.0, 0.0, transform.origin_x, transform.origin_y, 0.0];
        encoder.write_tag(Tag::ModelTiepointTag, &tiepoint[..])?;
    } else {
        let t = transform;
        let matrix = [
            t.pixel_width, t.row_rotation, 0.0, t.origin_x,
            t.col_rotation, t.pixel_height, 0.0, t.origin_y,
            0.0, 0.0, 0.0, 0.0,
            0.0, 0.0, 0.0, 1.0,
        ];
        encoder.write_tag(Tag::ModelTransformationTag, &matrix[..])?;
    }

    let geokeys = build_geokeys(crs);
    encoder.write_tag(Tag::GeoKeyDirectoryTag, &geokeys[..])?;
    Ok(())
}

/// Write a Raster to a GeoTIFF file as 32-bit float
pub fn write_geotiff<T, P>(raster: &Raster<T>, path: P) -> Result<()>
where
    T: RasterElement,
    P: AsRef<Path>,
{
    let file = BufWriter::new(File::create(path.as_ref())?);
    encode_f32(raster, file)
}

fn encode_f32<T, W>(raster: &Raster<T>, writer: W) -> Result<()>
where
    T: RasterElement,
    W: Write + Seek,
{
    let mut encoder = TiffEncoder::new(writer)?;
    let (rows, cols) = raster.shape();

    let data: Vec<f32> = raster
        .data()
        .iter()
        .map(|&v| num_traits::cast(v).unwrap_or(f32::NAN))
        .collect();

    let mut image = encoder.new_image::<Gray32Float>(cols as u32, rows as u32)?;
    write_geo_tags(image.encoder(), raster.transform(), raster.crs())?;
    image.write_data(&data)?;
    Ok(())
}

/// Write a mask as a single-band `u8` GeoTIFF with values in {0, 1}
pub fn write_mask<P: AsRef<Path>>(mask: &Mask, path: P) -> Result<()> {
    let file = BufWriter::new(File::create(path.as_ref())?);
    encode_mask(mask, file)
}

/// Encode a mask into an in-memory GeoTIFF buffer
pub fn write_mask_to_buffer(mask: &Mask) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    encode_mask(mask, Cursor::new(&mut buf))?;
    Ok(buf)
}

fn encode_mask<W: Write + Seek>(mask: &Mask, writer: W) -> Result<()> {
    let mut encoder = TiffEncoder::new(writer)?;
    let (rows, cols) = mask.shape();
    let data: Vec<u8> = mask.data().iter().map(|&v| if v { 1 } else { 0 }).collect();

    let mut image = encoder.new_image::<Gray8>(cols as u32, rows as u32)?;
    write_geo_tags(image.encoder(), mask.transform(), mask.crs())?;
    image.write_data(&data)?;
    Ok(())
}
