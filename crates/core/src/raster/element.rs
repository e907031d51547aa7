//! Cell value trait for terrain and depth rasters

use num_traits::{NumCast, Zero};
use std::fmt::Debug;

/// Trait for types that can be stored in a raster cell.
///
/// Terrain models arrive as integer or float GeoTIFFs; every value is
/// widened to `f64` before it takes part in resampling or differencing.
pub trait RasterElement:
    Copy + Debug + PartialOrd + NumCast + Zero + Send + Sync + 'static
{
    /// No-data sentinel used when a source value cannot be represented
    fn default_nodata() -> Self;

    /// Whether this value marks a cell without data
    fn is_nodata(&self, nodata: Option<Self>) -> bool;

    /// Widen to f64
    fn as_f64(self) -> Option<f64> {
        NumCast::from(self)
    }

    /// Narrow from f64, falling back to the no-data sentinel
    fn from_f64(value: f64) -> Self {
        NumCast::from(value).unwrap_or_else(Self::default_nodata)
    }
}

macro_rules! impl_raster_element_int {
    ($($t:ty),*) => {$(
        impl RasterElement for $t {
            fn default_nodata() -> Self {
                <$t>::MIN
            }

            fn is_nodata(&self, nodata: Option<Self>) -> bool {
                nodata.is_some_and(|nd| *self == nd)
            }
        }
    )*};
}

macro_rules! impl_raster_element_float {
    ($($t:ty),*) => {$(
        impl RasterElement for $t {
            fn default_nodata() -> Self {
                <$t>::NAN
            }

            fn is_nodata(&self, nodata: Option<Self>) -> bool {
                if self.is_nan() {
                    return true;
                }
                match nodata {
                    Some(nd) => (self - nd).abs() < <$t>::EPSILON * 100.0,
                    None => false,
                }
            }
        }
    )*};
}

impl_raster_element_int!(i8, i16, i32, u8, u16, u32);
impl_raster_element_float!(f32, f64);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_float_nan_is_always_nodata() {
        assert!(f64::NAN.is_nodata(None));
        assert!(f32::NAN.is_nodata(Some(-9999.0)));
        assert!(!1.5_f64.is_nodata(None));
    }

    #[test]
    fn test_sentinel_nodata() {
        assert!((-9999.0_f64).is_nodata(Some(-9999.0)));
        assert!((-32768_i16).is_nodata(Some(i16::MIN)));
        assert!(!0_i16.is_nodata(Some(i16::MIN)));
        assert!(!0_i16.is_nodata(None));
    }

    #[test]
    fn test_from_f64_falls_back_to_sentinel() {
        assert_eq!(<u8 as RasterElement>::from_f64(300.0), u8::MIN);
        assert_eq!(<i16 as RasterElement>::from_f64(12.0), 12);
    }
}
