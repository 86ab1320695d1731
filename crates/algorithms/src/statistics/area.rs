//! Loss and gain area from a change class raster
//!
//! Pixel area uses an equirectangular approximation at a fixed reference
//! latitude, so it is only meaningful for geographic grids near that latitude.

use crate::imagery::ChangeClass;
use serde::{Deserialize, Serialize};
use verdant_core::raster::{GeoTransform, Raster};
use verdant_core::{CrsKind, Error, Result};

/// Constants for the degree-to-metre pixel area approximation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AreaParams {
    /// Latitude (degrees) at which a degree of longitude is measured
    pub reference_latitude: f64,
    /// Metres per degree of latitude
    pub m_per_deg_lat: f64,
    /// Metres per degree of longitude at the equator
    pub m_per_deg_lon_equator: f64,
}

impl Default for AreaParams {
    fn default() -> Self {
        Self {
            reference_latitude: 43.7,
            m_per_deg_lat: 111_132.92,
            m_per_deg_lon_equator: 111_412.84,
        }
    }
}

impl AreaParams {
    pub fn validate(&self) -> Result<()> {
        if !self.reference_latitude.is_finite() || self.reference_latitude.abs() >= 90.0 {
            return Err(Error::InvalidParameter {
                name: "reference_latitude",
                value: self.reference_latitude.to_string(),
                reason: "must lie strictly between -90 and 90 degrees".into(),
            });
        }
        for (name, value) in [
            ("m_per_deg_lat", self.m_per_deg_lat),
            ("m_per_deg_lon_equator", self.m_per_deg_lon_equator),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(Error::InvalidParameter {
                    name,
                    value: value.to_string(),
                    reason: "must be positive".into(),
                });
            }
        }
        Ok(())
    }

    /// Area of one pixel in square metres
    pub fn pixel_area_m2(&self, transform: &GeoTransform) -> f64 {
        let (pw, ph) = transform.pixel_size();
        let width_m = pw * self.m_per_deg_lon_equator * self.reference_latitude.to_radians().cos();
        let height_m = ph * self.m_per_deg_lat;
        width_m * height_m
    }
}

/// Pixel count per change class
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ClassHistogram {
    counts: [u64; 6],
    /// Pixels holding a code outside 0..=5
    other: u64,
}

impl ClassHistogram {
    pub fn from_raster(classes: &Raster<u8>) -> Self {
        let mut hist = Self::default();
        for &code in classes.data().iter() {
            match hist.counts.get_mut(code as usize) {
                Some(count) => *count += 1,
                None => hist.other += 1,
            }
        }
        hist
    }

    pub fn count(&self, class: ChangeClass) -> u64 {
        self.counts[class.code() as usize]
    }

    pub fn other(&self) -> u64 {
        self.other
    }

    pub fn loss_pixels(&self) -> u64 {
        ChangeClass::DECREASE.iter().map(|&c| self.count(c)).sum()
    }

    pub fn gain_pixels(&self) -> u64 {
        ChangeClass::INCREASE.iter().map(|&c| self.count(c)).sum()
    }

    /// All pixels, including unclassified and unknown codes
    pub fn total(&self) -> u64 {
        self.counts.iter().sum::<u64>() + self.other
    }

    /// (class, count) pairs in class-code order
    pub fn iter(&self) -> impl Iterator<Item = (ChangeClass, u64)> + '_ {
        self.counts
            .iter()
            .enumerate()
            .filter_map(|(code, &n)| ChangeClass::from_code(code as u8).map(|c| (c, n)))
    }
}

/// Loss and gain totals for one class raster
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeAreas {
    pub pixel_area_m2: f64,
    pub histogram: ClassHistogram,
    pub loss_m2: f64,
    pub gain_m2: f64,
}

impl ChangeAreas {
    pub fn loss_km2(&self) -> f64 {
        self.loss_m2 / 1e6
    }

    pub fn gain_km2(&self) -> f64 {
        self.gain_m2 / 1e6
    }

    /// Area of the whole raster, every class included
    pub fn total_m2(&self) -> f64 {
        self.histogram.total() as f64 * self.pixel_area_m2
    }
}

/// Aggregate loss (classes 4, 5) and gain (classes 1, 2) areas
pub fn change_areas(classes: &Raster<u8>, params: &AreaParams) -> Result<ChangeAreas> {
    params.validate()?;

    if let Some(crs) = classes.crs() {
        if matches!(crs.kind(), Some(CrsKind::Utm { .. } | CrsKind::WebMercator)) {
            tracing::warn!(
                crs = %crs,
                "grid is projected; degree-based pixel area will not be in square metres"
            );
        }
    }

    let pixel_area_m2 = params.pixel_area_m2(classes.transform());
    let histogram = ClassHistogram::from_raster(classes);
    let loss_m2 = histogram.loss_pixels() as f64 * pixel_area_m2;
    let gain_m2 = histogram.gain_pixels() as f64 * pixel_area_m2;

    tracing::debug!(
        pixel_area_m2,
        loss_pixels = histogram.loss_pixels(),
        gain_pixels = histogram.gain_pixels(),
        "aggregated change areas"
    );

    Ok(ChangeAreas {
        pixel_area_m2,
        histogram,
        loss_m2,
        gain_m2,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn classes(data: Vec<u8>, rows: usize, cols: usize) -> Raster<u8> {
        let mut r = Raster::from_vec(data, rows, cols).unwrap();
        r.set_transform(GeoTransform::new(-79.5, 43.8, 0.0001, -0.0001));
        r
    }

    #[test]
    fn pixel_area_at_reference_latitude() {
        let params = AreaParams::default();
        let gt = GeoTransform::new(0.0, 0.0, 0.0001, -0.0001);
        let expected = 0.0001 * 111_412.84 * 43.7f64.to_radians().cos() * 0.0001 * 111_132.92;
        assert_relative_eq!(params.pixel_area_m2(&gt), expected, max_relative = 1e-12);
        assert_relative_eq!(params.pixel_area_m2(&gt), 89.515, epsilon = 1e-3);
    }

    #[test]
    fn loss_and_gain_follow_class_sets() {
        let grid = classes(vec![0, 1, 2, 3, 4, 5, 5, 4, 1], 3, 3);
        let areas = change_areas(&grid, &AreaParams::default()).unwrap();

        assert_eq!(areas.histogram.loss_pixels(), 4);
        assert_eq!(areas.histogram.gain_pixels(), 3);
        assert_relative_eq!(areas.loss_m2, 4.0 * areas.pixel_area_m2);
        assert_relative_eq!(areas.gain_m2, 3.0 * areas.pixel_area_m2);
        assert_relative_eq!(areas.loss_km2(), areas.loss_m2 / 1e6);
    }

    #[test]
    fn class_counts_conserve_total_area() {
        let grid = classes(vec![0, 1, 2, 3, 4, 5, 3, 3, 0, 2, 9, 1], 3, 4);
        let areas = change_areas(&grid, &AreaParams::default()).unwrap();

        assert_eq!(areas.histogram.other(), 1);
        let summed: u64 = areas.histogram.iter().map(|(_, n)| n).sum::<u64>() + areas.histogram.other();
        assert_eq!(summed, 12);
        assert_relative_eq!(areas.total_m2(), 12.0 * areas.pixel_area_m2);
    }

    #[test]
    fn no_change_classes_give_zero_area() {
        let grid = classes(vec![3, 3, 0, 0], 2, 2);
        let areas = change_areas(&grid, &AreaParams::default()).unwrap();
        assert_eq!(areas.loss_m2, 0.0);
        assert_eq!(areas.gain_m2, 0.0);
    }

    #[test]
    fn invalid_latitude_is_rejected() {
        let params = AreaParams {
            reference_latitude: 95.0,
            ..AreaParams::default()
        };
        let grid = classes(vec![1], 1, 1);
        assert!(matches!(
            change_areas(&grid, &params),
            Err(Error::InvalidParameter { name: "reference_latitude", .. })
        ));
    }
}
