//! Raster element trait for generic cell values

use num_traits::{NumCast, Zero};
use std::fmt::Debug;

/// Trait for types that can be stored in a raster cell.
///
/// Index rasters use `f32`, class rasters use `u8`; the remaining
/// implementations exist so GeoTIFFs of other sample types can be read.
pub trait RasterElement:
    Copy + Clone + Debug + PartialOrd + PartialEq + NumCast + Zero + Send + Sync + 'static
{
    /// Default no-data value for this type
    fn default_nodata() -> Self;

    /// Check if this value represents no-data
    fn is_nodata(&self, nodata: Option<Self>) -> bool;

    /// Convert self to f64
    fn to_f64(self) -> Option<f64> {
        NumCast::from(self)
    }

    /// Convert an f64 into this type, `None` when out of range
    fn from_f64(value: f64) -> Option<Self> {
        NumCast::from(value)
    }
}

macro_rules! impl_raster_element_int {
    ($($t:ty),*) => {
        $(
            impl RasterElement for $t {
                fn default_nodata() -> Self {
                    <$t>::MAX
                }

                fn is_nodata(&self, nodata: Option<Self>) -> bool {
                    nodata.map_or(false, |nd| *self == nd)
                }
            }
        )*
    };
}

macro_rules! impl_raster_element_float {
    ($($t:ty),*) => {
        $(
            impl RasterElement for $t {
                fn default_nodata() -> Self {
                    <$t>::NAN
                }

                fn is_nodata(&self, nodata: Option<Self>) -> bool {
                    if self.is_nan() {
                        return true;
                    }
                    nodata.map_or(false, |nd| *self == nd)
                }
            }
        )*
    };
}

impl_raster_element_int!(u8, u16, i16, i32);
impl_raster_element_float!(f32, f64);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nan_is_always_nodata_for_floats() {
        assert!(f32::NAN.is_nodata(None));
        assert!(f32::NAN.is_nodata(Some(-9999.0)));
        assert!(!0.25_f32.is_nodata(Some(f32::NAN)));
    }

    #[test]
    fn float_nodata_is_exact_match() {
        assert!(0.0_f32.is_nodata(Some(0.0)));
        assert!(!1e-6_f32.is_nodata(Some(0.0)));
        assert!(!(-9998.999_f64).is_nodata(Some(-9999.0)));
        assert!((-9999.0_f64).is_nodata(Some(-9999.0)));
    }

    #[test]
    fn integer_nodata_is_exact_match() {
        assert!(255_u8.is_nodata(Some(255)));
        assert!(!0_u8.is_nodata(Some(255)));
        assert!(!0_u8.is_nodata(None));
    }

    #[test]
    fn from_f64_rejects_out_of_range() {
        assert_eq!(<u8 as RasterElement>::from_f64(300.0), None);
        assert_eq!(<u8 as RasterElement>::from_f64(5.0), Some(5));
    }
}
