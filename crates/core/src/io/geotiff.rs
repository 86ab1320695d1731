//! Native single-band GeoTIFF reading and writing
//!
//! Uses the `tiff` crate. Georeferencing is read from and written to the
//! standard GeoTIFF tags:
//! - ModelPixelScaleTag (33550) + ModelTiepointTag (33922) → [`GeoTransform`]
//! - GeoKeyDirectoryTag (34735) → EPSG code of the [`CRS`]
//! - GDAL_NODATA (42113) → nodata value

use crate::crs::CRS;
use crate::error::{Error, Result};
use crate::raster::{GeoTransform, Raster, RasterElement};
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Seek, Write};
use std::path::Path;
use tiff::decoder::{Decoder, DecodingResult};
use tiff::encoder::colortype::Gray32Float;
use tiff::encoder::TiffEncoder;
use tiff::tags::Tag;
use tracing::debug;

// The decoder maps known codes to named variants, so lookups must use them
const MODEL_PIXEL_SCALE: Tag = Tag::ModelPixelScaleTag;
const MODEL_TIEPOINT: Tag = Tag::ModelTiepointTag;
const GEO_KEY_DIRECTORY: Tag = Tag::GeoKeyDirectoryTag;
const GDAL_NODATA: Tag = Tag::GdalNodata;

const GT_MODEL_TYPE: u16 = 1024;
const GT_RASTER_TYPE: u16 = 1025;
const GEOGRAPHIC_TYPE: u16 = 2048;
const PROJECTED_CS_TYPE: u16 = 3072;
const USER_DEFINED: u16 = 32767;

const MODEL_TYPE_PROJECTED: u16 = 1;
const MODEL_TYPE_GEOGRAPHIC: u16 = 2;
const RASTER_PIXEL_IS_AREA: u16 = 1;

/// Options for writing GeoTIFF files
#[derive(Debug, Clone)]
pub struct GeoTiffOptions {
    /// Write the GDAL_NODATA tag when the raster has a nodata value
    pub write_nodata: bool,
}

impl Default for GeoTiffOptions {
    fn default() -> Self {
        Self { write_nodata: true }
    }
}

/// Read band 1 of a GeoTIFF file into a Raster
///
/// Any open or decode failure is reported as [`Error::InputAccess`]
/// naming the path.
///
/// # Example
/// ```ignore
/// let ndvi: Raster<f32> = read_geotiff("data/inputs/July_2024_Sentinel-2_L2A_NDVI.tiff")?;
/// ```
pub fn read_geotiff<T, P>(path: P) -> Result<Raster<T>>
where
    T: RasterElement,
    P: AsRef<Path>,
{
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| Error::input(path, e))?;
    let raster = decode_geotiff(BufReader::new(file)).map_err(|reason| Error::input(path, reason))?;
    debug!(
        "read {} ({} x {}, crs {})",
        path.display(),
        raster.cols(),
        raster.rows(),
        raster.crs().map_or("none".to_string(), |c| c.to_string())
    );
    Ok(raster)
}

/// Decode a GeoTIFF from any `Read + Seek` source
fn decode_geotiff<T, R>(reader: R) -> std::result::Result<Raster<T>, String>
where
    T: RasterElement,
    R: Read + Seek,
{
    let mut decoder = Decoder::new(reader).map_err(|e| format!("TIFF decode error: {}", e))?;

    let (width, height) = decoder
        .dimensions()
        .map_err(|e| format!("cannot read dimensions: {}", e))?;
    let rows = height as usize;
    let cols = width as usize;

    let result = decoder
        .read_image()
        .map_err(|e| format!("cannot read image data: {}", e))?;

    let data: Vec<T> = match result {
        DecodingResult::F32(buf) => cast_samples(&buf),
        DecodingResult::F64(buf) => cast_samples(&buf),
        DecodingResult::U8(buf) => cast_samples(&buf),
        DecodingResult::U16(buf) => cast_samples(&buf),
        DecodingResult::I16(buf) => cast_samples(&buf),
        DecodingResult::I32(buf) => cast_samples(&buf),
        _ => return Err("unsupported TIFF sample format".to_string()),
    };

    // Interleaved multi-band images decode to a multiple of the pixel count
    let data = match data.len() {
        n if n == rows * cols => data,
        n if rows * cols > 0 && n % (rows * cols) == 0 => {
            let bands = n / (rows * cols);
            data.into_iter().step_by(bands).collect()
        }
        n => return Err(format!("expected {} samples, decoded {}", rows * cols, n)),
    };

    let mut raster = Raster::from_vec(data, rows, cols).map_err(|e| e.to_string())?;

    if let Some(transform) = read_geotransform(&mut decoder) {
        raster.set_transform(transform);
    }
    raster.set_crs(read_crs(&mut decoder));

    if let Ok(text) = decoder.get_tag_ascii_string(GDAL_NODATA) {
        let nodata = parse_nodata(&text).and_then(T::from_f64);
        raster.set_nodata(nodata);
    }

    Ok(raster)
}

fn cast_samples<S: num_traits::NumCast + Copy, T: RasterElement>(buf: &[S]) -> Vec<T> {
    buf.iter()
        .map(|&v| num_traits::cast(v).unwrap_or_else(T::default_nodata))
        .collect()
}

fn parse_nodata(text: &str) -> Option<f64> {
    let text = text.trim_matches(|c: char| c.is_whitespace() || c == '\0');
    if text.eq_ignore_ascii_case("nan") {
        return Some(f64::NAN);
    }
    text.parse().ok()
}

/// GeoTransform from ModelPixelScaleTag + ModelTiepointTag
fn read_geotransform<R: Read + Seek>(decoder: &mut Decoder<R>) -> Option<GeoTransform> {
    let scale = decoder.get_tag_f64_vec(MODEL_PIXEL_SCALE).ok()?;
    let tiepoint = decoder.get_tag_f64_vec(MODEL_TIEPOINT).ok()?;

    if scale.len() < 2 || tiepoint.len() < 6 {
        return None;
    }

    // tiepoint: [I, J, K, X, Y, Z], scale: [ScaleX, ScaleY, ScaleZ]
    let origin_x = tiepoint[3] - tiepoint[0] * scale[0];
    let origin_y = tiepoint[4] + tiepoint[1] * scale[1];
    Some(GeoTransform::new(origin_x, origin_y, scale[0], -scale[1]))
}

/// EPSG code from the GeoKey directory; ProjectedCSType wins over GeographicType
fn read_crs<R: Read + Seek>(decoder: &mut Decoder<R>) -> Option<CRS> {
    let keys = decoder.get_tag_u16_vec(GEO_KEY_DIRECTORY).ok()?;
    if keys.len() < 4 {
        return None;
    }

    let count = keys[3] as usize;
    let mut projected = None;
    let mut geographic = None;

    for entry in keys[4..].chunks_exact(4).take(count) {
        let (key_id, location, value) = (entry[0], entry[1], entry[3]);
        // Only short values stored inline are EPSG codes
        if location != 0 || value == 0 || value == USER_DEFINED {
            continue;
        }
        match key_id {
            PROJECTED_CS_TYPE => projected = Some(value),
            GEOGRAPHIC_TYPE => geographic = Some(value),
            _ => {}
        }
    }

    projected.or(geographic).map(|code| CRS::from_epsg(code as u32))
}

/// Write a Raster to a float32 GeoTIFF file
///
/// Failures to create or encode the file are reported as
/// [`Error::OutputWrite`] naming the path.
pub fn write_geotiff<T, P>(raster: &Raster<T>, path: P, options: Option<GeoTiffOptions>) -> Result<()>
where
    T: RasterElement,
    P: AsRef<Path>,
{
    let path = path.as_ref();
    let options = options.unwrap_or_default();
    let file = File::create(path).map_err(|e| Error::output(path, e))?;
    let mut writer = BufWriter::new(file);
    encode_geotiff(raster, &mut writer, &options).map_err(|reason| Error::output(path, reason))?;
    writer.flush().map_err(|e| Error::output(path, e))?;
    debug!("wrote {} ({} x {})", path.display(), raster.cols(), raster.rows());
    Ok(())
}

/// Encode a Raster as GeoTIFF into any `Write + Seek` sink
fn encode_geotiff<T, W>(raster: &Raster<T>, writer: W, options: &GeoTiffOptions) -> std::result::Result<(), String>
where
    T: RasterElement,
    W: Write + Seek,
{
    let mut encoder = TiffEncoder::new(writer).map_err(|e| format!("TIFF encoder error: {}", e))?;

    let (rows, cols) = raster.shape();
    let data: Vec<f32> = raster
        .data()
        .iter()
        .map(|&v| num_traits::cast(v).unwrap_or(f32::NAN))
        .collect();

    let mut image = encoder
        .new_image::<Gray32Float>(cols as u32, rows as u32)
        .map_err(|e| format!("cannot create TIFF image: {}", e))?;

    let gt = raster.transform();

    let scale = [gt.pixel_width, gt.pixel_height.abs(), 0.0];
    image
        .encoder()
        .write_tag(MODEL_PIXEL_SCALE, &scale[..])
        .map_err(|e| format!("cannot write scale tag: {}", e))?;

    let tiepoint = [0.0, 0.0, 0.0, gt.origin_x, gt.origin_y, 0.0];
    image
        .encoder()
        .write_tag(MODEL_TIEPOINT, &tiepoint[..])
        .map_err(|e| format!("cannot write tiepoint tag: {}", e))?;

    let geokeys = geo_key_directory(raster.crs());
    image
        .encoder()
        .write_tag(GEO_KEY_DIRECTORY, geokeys.as_slice())
        .map_err(|e| format!("cannot write geokey tag: {}", e))?;

    if options.write_nodata {
        if let Some(nodata) = raster.nodata().and_then(|v| v.to_f64()) {
            let text = if nodata.is_nan() {
                "nan".to_string()
            } else {
                nodata.to_string()
            };
            image
                .encoder()
                .write_tag(GDAL_NODATA, text.as_str())
                .map_err(|e| format!("cannot write nodata tag: {}", e))?;
        }
    }

    image
        .write_data(&data)
        .map_err(|e| format!("cannot write image data: {}", e))?;

    Ok(())
}

/// GeoKey directory with model type, raster type and, when the EPSG code is
/// known and fits a short, the geographic or projected CRS key.
fn geo_key_directory(crs: Option<&CRS>) -> Vec<u16> {
    let epsg = crs.and_then(|c| c.epsg()).and_then(|code| u16::try_from(code).ok());
    let geographic = crs.map_or(false, |c| c.is_geographic());

    let model_type = if geographic {
        MODEL_TYPE_GEOGRAPHIC
    } else {
        MODEL_TYPE_PROJECTED
    };

    let mut entries = vec![
        [GT_MODEL_TYPE, 0, 1, model_type],
        [GT_RASTER_TYPE, 0, 1, RASTER_PIXEL_IS_AREA],
    ];
    if let Some(code) = epsg {
        let key = if geographic { GEOGRAPHIC_TYPE } else { PROJECTED_CS_TYPE };
        entries.push([key, 0, 1, code]);
    }

    // Header: version 1.1.0, key count
    let mut keys = vec![1, 1, 0, entries.len() as u16];
    keys.extend(entries.into_iter().flatten());
    keys
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    fn sample_raster() -> Raster<f32> {
        let mut raster: Raster<f32> = Raster::new(20, 30);
        raster.set_transform(GeoTransform::new(-79.9, 43.8, 0.0001, -0.0001));
        raster.set_crs(Some(CRS::wgs84()));
        raster.set_nodata(Some(f32::NAN));
        for i in 0..20 {
            for j in 0..30 {
                raster.set(i, j, (i as f32 - j as f32) / 50.0).unwrap();
            }
        }
        raster.set(3, 4, f32::NAN).unwrap();
        raster
    }

    #[test]
    fn test_write_read_roundtrip() {
        let raster = sample_raster();
        let tmp = NamedTempFile::with_suffix(".tif").unwrap();
        write_geotiff(&raster, tmp.path(), None).unwrap();

        let loaded: Raster<f32> = read_geotiff(tmp.path()).unwrap();

        assert_eq!(loaded.shape(), raster.shape());
        assert_eq!(loaded.get(10, 15).unwrap(), raster.get(10, 15).unwrap());
        assert!(loaded.get(3, 4).unwrap().is_nan());
        assert!(loaded.transform().same_grid(raster.transform(), 1e-9));
        assert_eq!(loaded.crs().and_then(|c| c.epsg()), Some(4326));
        assert!(loaded.nodata().map_or(false, |v| v.is_nan()));
    }

    #[test]
    fn test_projected_crs_roundtrip() {
        let mut raster: Raster<f32> = Raster::filled(4, 4, 0.5);
        raster.set_transform(GeoTransform::new(600_000.0, 4_840_000.0, 10.0, -10.0));
        raster.set_crs(Some(CRS::utm(17, true)));

        let tmp = NamedTempFile::with_suffix(".tif").unwrap();
        write_geotiff(&raster, tmp.path(), None).unwrap();
        let loaded: Raster<f64> = read_geotiff(tmp.path()).unwrap();

        assert_eq!(loaded.crs().and_then(|c| c.epsg()), Some(32617));
        assert_eq!(loaded.nodata(), None);
        assert_eq!(loaded.get(2, 2).unwrap(), 0.5);
        assert_eq!(loaded.transform(), raster.transform());
    }

    #[test]
    fn test_georeferencing_tags_are_read_back() {
        let mut raster: Raster<f32> = Raster::filled(2, 2, 0.5);
        raster.set_transform(GeoTransform::new(-79.42, 43.71, 0.0001, -0.0001));
        raster.set_crs(Some(CRS::wgs84()));
        raster.set_nodata(Some(-9999.0));

        let tmp = NamedTempFile::with_suffix(".tif").unwrap();
        write_geotiff(&raster, tmp.path(), None).unwrap();
        let loaded: Raster<f32> = read_geotiff(tmp.path()).unwrap();

        // a default transform here means the tags were not found
        assert_ne!(*loaded.transform(), GeoTransform::default());
        assert_eq!(loaded.transform(), raster.transform());
        assert_eq!(loaded.crs().and_then(|c| c.epsg()), Some(4326));
        assert_eq!(loaded.nodata(), Some(-9999.0));
    }

    #[test]
    fn test_missing_file_is_input_access_error() {
        let result = read_geotiff::<f32, _>("definitely/not/here.tiff");
        match result {
            Err(Error::InputAccess { path, .. }) => {
                assert!(path.ends_with("here.tiff"));
            }
            other => panic!("expected InputAccess, got {:?}", other.map(|r| r.shape())),
        }
    }

    #[test]
    fn test_garbage_file_is_input_access_error() {
        let tmp = NamedTempFile::with_suffix(".tif").unwrap();
        std::fs::write(tmp.path(), b"not a tiff").unwrap();
        assert!(matches!(
            read_geotiff::<f32, _>(tmp.path()),
            Err(Error::InputAccess { .. })
        ));
    }

    #[test]
    fn test_unwritable_destination_is_output_write_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing_dir").join("delta.tif");
        assert!(matches!(
            write_geotiff(&sample_raster(), &path, None),
            Err(Error::OutputWrite { .. })
        ));
    }

    #[test]
    fn test_geo_key_directory_layout() {
        let keys = geo_key_directory(Some(&CRS::wgs84()));
        assert_eq!(keys, vec![1, 1, 0, 3, 1024, 0, 1, 2, 1025, 0, 1, 1, 2048, 0, 1, 4326]);

        let keys = geo_key_directory(None);
        assert_eq!(keys, vec![1, 1, 0, 2, 1024, 0, 1, 1, 1025, 0, 1, 1]);
    }

    #[test]
    fn test_parse_nodata() {
        assert!(parse_nodata("nan").unwrap().is_nan());
        assert_eq!(parse_nodata("-9999\0"), Some(-9999.0));
        assert_eq!(parse_nodata("abc"), None);
    }
}
