//! Grid refinement
//!
//! Resamples a smooth field from the coarse estimation grid onto a finer
//! display grid with a natural bicubic spline. The refined surface passes
//! through every coarse value exactly; fine nodes outside the coarse extent
//! take the value at the nearest coarse edge.

mod spline;

pub use spline::{CubicSpline1d, CubicSpline2d};

use ndarray::Array2;
use tidewatch_core::{Error, Grid, Result};
use tracing::debug;

/// Refine `field` (co-indexed with `coarse`) onto `fine`.
///
/// # Errors
/// - [`Error::SizeMismatch`] if `field` does not match `coarse.shape()`
/// - [`Error::InvalidParameter`] if the field holds non-finite values;
///   mask after refining rather than before
pub fn refine_field(coarse: &Grid, fine: &Grid, field: &Array2<f64>) -> Result<Array2<f64>> {
    coarse.check_field(field)?;
    if let Some(bad) = field.iter().position(|v| !v.is_finite()) {
        let (lon, lat) = coarse.node(bad);
        return Err(Error::invalid_parameter(
            "field",
            format!("non-finite at ({lon}, {lat})"),
            "refinement requires a fully defined coarse field",
        ));
    }

    debug!(
        coarse = ?coarse.shape(),
        fine = ?fine.shape(),
        "refining field"
    );

    let spline = CubicSpline2d::new(coarse.lon(), coarse.lat(), field)?;
    spline.evaluate_grid(fine.lon(), fine.lat())
}
