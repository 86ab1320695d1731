//! NDVI change detection
//!
//! Differences two co-registered index rasters and buckets every pixel into
//! an ordinal change class:
//!
//! | difference `d`              | class |
//! |-----------------------------|-------|
//! | `d <= -0.30`                | 5 large decrease |
//! | `-0.30 < d <= -0.15`        | 4 moderate decrease |
//! | `abs(d) < 0.10`             | 3 stable |
//! | `0.15 <= d < 0.30`          | 2 moderate increase |
//! | `d >= 0.30`                 | 1 large increase |
//! | otherwise, or invalid       | 0 unclassified |
//!
//! Differences outside `[-1, 1]` are treated as artifacts and become NaN.

use crate::maybe_rayon::collect_rows;
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use verdant_core::raster::Raster;
use verdant_core::{Algorithm, Error, Result};

/// Difference thresholds for the five change buckets
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChangeThresholds {
    /// Upper bound (inclusive) of the large decrease bucket
    pub large_decrease: f64,
    /// Upper bound (inclusive) of the moderate decrease bucket
    pub moderate_decrease: f64,
    /// Half-width (exclusive) of the stable bucket around zero
    pub stable_band: f64,
    /// Lower bound (inclusive) of the moderate increase bucket
    pub moderate_increase: f64,
    /// Lower bound (inclusive) of the large increase bucket
    pub large_increase: f64,
    /// Differences with a larger magnitude are invalid
    pub valid_range: f64,
}

impl Default for ChangeThresholds {
    fn default() -> Self {
        Self {
            large_decrease: -0.30,
            moderate_decrease: -0.15,
            stable_band: 0.10,
            moderate_increase: 0.15,
            large_increase: 0.30,
            valid_range: 1.0,
        }
    }
}

impl ChangeThresholds {
    /// Reject non-finite thresholds and a non-positive valid range
    pub fn validate(&self) -> Result<()> {
        let fields = [
            ("large_decrease", self.large_decrease),
            ("moderate_decrease", self.moderate_decrease),
            ("stable_band", self.stable_band),
            ("moderate_increase", self.moderate_increase),
            ("large_increase", self.large_increase),
            ("valid_range", self.valid_range),
        ];
        for (name, value) in fields {
            if !value.is_finite() {
                return Err(Error::InvalidParameter {
                    name,
                    value: value.to_string(),
                    reason: "must be finite".into(),
                });
            }
        }
        if self.valid_range <= 0.0 {
            return Err(Error::InvalidParameter {
                name: "valid_range",
                value: self.valid_range.to_string(),
                reason: "must be positive".into(),
            });
        }
        Ok(())
    }

    /// Classify a single difference value
    pub fn classify(&self, d: f32) -> ChangeClass {
        Cutoffs::from(self).classify(d)
    }

    /// Whether `d` lies inside the closed valid interval
    pub fn is_valid(&self, d: f32) -> bool {
        Cutoffs::from(self).is_valid(d)
    }
}

/// Thresholds narrowed once to the raster precision
#[derive(Debug, Clone, Copy)]
struct Cutoffs {
    large_decrease: f32,
    moderate_decrease: f32,
    stable_band: f32,
    moderate_increase: f32,
    large_increase: f32,
    valid_range: f32,
}

impl From<&ChangeThresholds> for Cutoffs {
    fn from(t: &ChangeThresholds) -> Self {
        Self {
            large_decrease: t.large_decrease as f32,
            moderate_decrease: t.moderate_decrease as f32,
            stable_band: t.stable_band as f32,
            moderate_increase: t.moderate_increase as f32,
            large_increase: t.large_increase as f32,
            valid_range: t.valid_range as f32,
        }
    }
}

impl Cutoffs {
    #[inline]
    fn is_valid(&self, d: f32) -> bool {
        d >= -self.valid_range && d <= self.valid_range
    }

    /// Buckets are tested in decrease-to-increase order and a later match
    /// overrides an earlier one, which only matters for overlapping
    /// custom thresholds.
    #[inline]
    fn classify(&self, d: f32) -> ChangeClass {
        if !self.is_valid(d) {
            return ChangeClass::Unclassified;
        }

        let mut class = ChangeClass::Unclassified;
        if d <= self.large_decrease {
            class = ChangeClass::LargeDecrease;
        }
        if d > self.large_decrease && d <= self.moderate_decrease {
            class = ChangeClass::ModerateDecrease;
        }
        if d.abs() < self.stable_band {
            class = ChangeClass::Stable;
        }
        if d >= self.moderate_increase && d < self.large_increase {
            class = ChangeClass::ModerateIncrease;
        }
        if d >= self.large_increase {
            class = ChangeClass::LargeIncrease;
        }
        class
    }
}

/// Ordinal change class stored in the class raster
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(u8)]
pub enum ChangeClass {
    Unclassified = 0,
    LargeIncrease = 1,
    ModerateIncrease = 2,
    Stable = 3,
    ModerateDecrease = 4,
    LargeDecrease = 5,
}

impl ChangeClass {
    /// Classes counted as vegetation loss
    pub const DECREASE: [ChangeClass; 2] = [ChangeClass::ModerateDecrease, ChangeClass::LargeDecrease];
    /// Classes counted as vegetation gain
    pub const INCREASE: [ChangeClass; 2] = [ChangeClass::LargeIncrease, ChangeClass::ModerateIncrease];

    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::Unclassified),
            1 => Some(Self::LargeIncrease),
            2 => Some(Self::ModerateIncrease),
            3 => Some(Self::Stable),
            4 => Some(Self::ModerateDecrease),
            5 => Some(Self::LargeDecrease),
            _ => None,
        }
    }

    pub fn is_loss(self) -> bool {
        Self::DECREASE.contains(&self)
    }

    pub fn is_gain(self) -> bool {
        Self::INCREASE.contains(&self)
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Unclassified => "unclassified",
            Self::LargeIncrease => "large increase",
            Self::ModerateIncrease => "moderate increase",
            Self::Stable => "stable",
            Self::ModerateDecrease => "moderate decrease",
            Self::LargeDecrease => "large decrease",
        }
    }
}

/// Difference raster and class raster on the reference grid
#[derive(Debug, Clone)]
pub struct ChangeGrids {
    /// comparison - reference, NaN where invalid
    pub difference: Raster<f32>,
    /// Change class codes, 0 where unclassified
    pub classes: Raster<u8>,
}

/// NDVI change classification algorithm
#[derive(Debug, Clone, Default)]
pub struct ChangeClassification;

impl Algorithm for ChangeClassification {
    type Input = (Raster<f32>, Raster<f32>);
    type Output = ChangeGrids;
    type Params = ChangeThresholds;
    type Error = Error;

    fn name(&self) -> &'static str {
        "ChangeClassification"
    }

    fn description(&self) -> &'static str {
        "Difference two aligned index rasters and bucket each pixel into an ordinal change class"
    }

    fn execute(&self, input: Self::Input, params: Self::Params) -> Result<Self::Output> {
        let (reference, comparison) = input;
        classify_change(&reference, &comparison, &params)
    }
}

/// Compute the difference and class rasters for two aligned index rasters.
///
/// `difference = comparison - reference`. NaN on either side, and differences
/// outside `[-valid_range, valid_range]`, give NaN and class 0. Declared nodata
/// values are not masked; they only drop out when the difference leaves the
/// valid range.
/// The outputs carry the reference transform and CRS.
///
/// # Errors
/// `SizeMismatch` when the rasters are not the same shape, and
/// `InvalidParameter` for unusable thresholds.
pub fn classify_change(
    reference: &Raster<f32>,
    comparison: &Raster<f32>,
    thresholds: &ChangeThresholds,
) -> Result<ChangeGrids> {
    thresholds.validate()?;

    let (rows, cols) = reference.shape();
    if comparison.shape() != (rows, cols) {
        return Err(Error::SizeMismatch {
            er: rows,
            ec: cols,
            ar: comparison.rows(),
            ac: comparison.cols(),
        });
    }

    let cutoffs = Cutoffs::from(thresholds);
    let ref_data = reference.data();
    let cmp_data = comparison.data();

    let pixels: Vec<(f32, u8)> = collect_rows(rows, |row| {
        (0..cols)
            .map(|col| {
                let r = ref_data[(row, col)];
                let c = cmp_data[(row, col)];
                let d = c - r;
                if !cutoffs.is_valid(d) {
                    return (f32::NAN, ChangeClass::Unclassified.code());
                }
                (d, cutoffs.classify(d).code())
            })
            .collect()
    });

    let (diff_vec, class_vec): (Vec<f32>, Vec<u8>) = pixels.into_iter().unzip();

    let diff_array = Array2::from_shape_vec((rows, cols), diff_vec)
        .map_err(|e| Error::Other(e.to_string()))?;
    let class_array = Array2::from_shape_vec((rows, cols), class_vec)
        .map_err(|e| Error::Other(e.to_string()))?;

    let mut difference = reference.with_data(diff_array)?;
    difference.set_nodata(Some(f32::NAN));
    let mut classes = reference.with_data(class_array)?;
    classes.set_nodata(Some(ChangeClass::Unclassified.code()));

    Ok(ChangeGrids {
        difference,
        classes,
    })
}
