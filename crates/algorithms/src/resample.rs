//! Grid alignment by bilinear resampling
//!
//! Every destination pixel centre is carried into the source CRS, located in
//! the source grid through the inverse geotransform, and interpolated from
//! the four surrounding source pixel centres.

use crate::maybe_rayon::collect_rows;
use ndarray::Array2;
use verdant_core::raster::{GeoTransform, Raster};
use verdant_core::{CrsTransform, Error, Result, CRS};

/// Resample `src` onto the grid described by `dst_shape` (rows, cols),
/// `dst_transform` and `dst_crs` using bilinear interpolation.
///
/// - NaN and nodata neighbours are dropped and the remaining weights
///   renormalised; all four invalid gives NaN.
/// - Sample points closer than half a pixel to the source edge clamp to the
///   edge pixels.
/// - Destination pixels whose centre lies outside the source extent are NaN.
///
/// The result has nodata NaN.
///
/// # Errors
/// `UnsupportedCrs` when no transform exists between the two CRSs.
pub fn resample_bilinear(
    src: &Raster<f32>,
    dst_shape: (usize, usize),
    dst_transform: &GeoTransform,
    dst_crs: Option<&CRS>,
) -> Result<Raster<f32>> {
    let (dst_rows, dst_cols) = dst_shape;
    let to_src = CrsTransform::new(dst_crs, src.crs())?;
    let src_transform = *src.transform();

    tracing::debug!(
        src_rows = src.rows(),
        src_cols = src.cols(),
        dst_rows,
        dst_cols,
        identity_crs = to_src.is_identity(),
        "bilinear resample"
    );

    let values = collect_rows(dst_rows, |row| {
        (0..dst_cols)
            .map(|col| {
                let (x, y) = dst_transform.pixel_to_geo(col, row);
                let (sx, sy) = to_src.transform(x, y);
                let (fc, fr) = src_transform.geo_to_pixel(sx, sy);
                sample_bilinear(src, fc, fr)
            })
            .collect()
    });

    let data = Array2::from_shape_vec((dst_rows, dst_cols), values)
        .map_err(|e| Error::Other(e.to_string()))?;

    let mut out = Raster::from_array(data);
    out.set_transform(*dst_transform);
    out.set_crs(dst_crs.cloned());
    out.set_nodata(Some(f32::NAN));
    Ok(out)
}

/// Put `comparison` on the pixel grid of `reference`.
///
/// The reference is never resampled. A comparison that already shares the
/// reference footprint is returned unchanged.
pub fn align_to_reference(reference: &Raster<f32>, comparison: &Raster<f32>) -> Result<Raster<f32>> {
    if reference.same_footprint(comparison) {
        tracing::debug!("comparison already on the reference grid");
        return Ok(comparison.clone());
    }

    resample_bilinear(
        comparison,
        reference.shape(),
        reference.transform(),
        reference.crs(),
    )
}

/// Interpolate `src` at fractional pixel coordinates (pixel centres at .5)
fn sample_bilinear(src: &Raster<f32>, fc: f64, fr: f64) -> f32 {
    let (rows, cols) = src.shape();
    if rows == 0 || cols == 0 || !fc.is_finite() || !fr.is_finite() {
        return f32::NAN;
    }
    if fc < 0.0 || fr < 0.0 || fc >= cols as f64 || fr >= rows as f64 {
        return f32::NAN;
    }

    // centre-based coordinates, clamped to the outermost centres
    let u = (fc - 0.5).clamp(0.0, (cols - 1) as f64);
    let v = (fr - 0.5).clamp(0.0, (rows - 1) as f64);

    let c0 = u.floor() as usize;
    let r0 = v.floor() as usize;
    let c1 = (c0 + 1).min(cols - 1);
    let r1 = (r0 + 1).min(rows - 1);
    let tx = u - c0 as f64;
    let ty = v - r0 as f64;

    let data = src.data();
    let neighbours = [
        (data[(r0, c0)], (1.0 - tx) * (1.0 - ty)),
        (data[(r0, c1)], tx * (1.0 - ty)),
        (data[(r1, c0)], (1.0 - tx) * ty),
        (data[(r1, c1)], tx * ty),
    ];

    let mut sum = 0.0;
    let mut weight = 0.0;
    for (value, w) in neighbours {
        if src.is_nodata(value) || w == 0.0 {
            continue;
        }
        sum += value as f64 * w;
        weight += w;
    }

    if weight > 0.0 {
        (sum / weight) as f32
    } else {
        f32::NAN
    }
}
