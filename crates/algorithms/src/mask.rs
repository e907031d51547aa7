//! Confidence masking
//!
//! A node is trusted when its normalized error variance is strictly below
//! a threshold. The mask is multiplicative: `1.0` keeps a value, `NaN`
//! removes it, so applying it is a plain element-wise product.

use ndarray::{Array2, Zip};
use tidewatch_core::{Error, Result};

/// Build a mask from an error-variance field: `1.0` where
/// `error < threshold`, `NaN` elsewhere (including where `error` is NaN).
pub fn confidence_mask(error: &Array2<f64>, threshold: f64) -> Result<Array2<f64>> {
    if !threshold.is_finite() {
        return Err(Error::invalid_parameter(
            "error_threshold",
            threshold,
            "must be finite",
        ));
    }
    Ok(error.mapv(|e| if e < threshold { 1.0 } else { f64::NAN }))
}

/// Multiply `field` by `mask`, leaving NaN wherever the mask is NaN.
pub fn apply_mask(field: &Array2<f64>, mask: &Array2<f64>) -> Result<Array2<f64>> {
    if field.dim() != mask.dim() {
        let (er, ec) = field.dim();
        let (ar, ac) = mask.dim();
        return Err(Error::SizeMismatch { er, ec, ar, ac });
    }
    Ok(Zip::from(field).and(mask).map_collect(|&v, &m| v * m))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_threshold_is_exclusive() {
        let error = array![[0.0, 0.19], [0.2, 1.0]];
        let mask = confidence_mask(&error, 0.2).unwrap();
        assert_eq!(mask[(0, 0)], 1.0);
        assert_eq!(mask[(0, 1)], 1.0);
        assert!(mask[(1, 0)].is_nan());
        assert!(mask[(1, 1)].is_nan());
    }

    #[test]
    fn test_nan_error_is_masked() {
        let mask = confidence_mask(&array![[f64::NAN]], 0.5).unwrap();
        assert!(mask[(0, 0)].is_nan());
    }

    #[test]
    fn test_apply_mask_keeps_values_and_removes_masked() {
        let field = array![[2.5, -1.0], [3.0, 4.0]];
        let mask = array![[1.0, f64::NAN], [1.0, f64::NAN]];
        let masked = apply_mask(&field, &mask).unwrap();
        assert_eq!(masked[(0, 0)], 2.5);
        assert_eq!(masked[(1, 0)], 3.0);
        assert!(masked[(0, 1)].is_nan());
        assert!(masked[(1, 1)].is_nan());
    }

    #[test]
    fn test_rejects_bad_inputs() {
        assert!(confidence_mask(&array![[0.1]], f64::INFINITY).is_err());
        assert!(confidence_mask(&array![[0.1]], f64::NAN).is_err());
        let field = Array2::zeros((2, 3));
        let mask = Array2::zeros((3, 2));
        assert!(matches!(
            apply_mask(&field, &mask),
            Err(Error::SizeMismatch { .. })
        ));
    }
}
