//! Kriging error variance
//!
//! The estimation error covariance is `E = GG − A·GD`. Only its diagonal is
//! ever used, so `GG` is never formed: for the Gaussian kernel
//! `GG[m, m] = 1` and the variance at node `m` reduces to
//! `1 − Σₙ A[m, n]·GD[n, m]`. Variances are relative to the prior (unit)
//! variance: near 0 next to a sensor, approaching 1 far from all of them.

use crate::maybe_rayon::*;
use nalgebra::DMatrix;
use tidewatch_core::{Error, Result};

use super::GaussianKernel;

/// Per-node error variance from the data-grid covariance `gd` (N×M) and the
/// transposed weight operator `weights = Aᵀ` (N×M).
///
/// Values are clamped at 0 to absorb round-off next to sensors.
pub fn error_variance(
    kernel: &GaussianKernel,
    gd: &DMatrix<f64>,
    weights: &DMatrix<f64>,
) -> Result<Vec<f64>> {
    if gd.shape() != weights.shape() {
        let (er, ec) = gd.shape();
        let (ar, ac) = weights.shape();
        return Err(Error::SizeMismatch { er, ec, ar, ac });
    }

    let prior = kernel.variance();
    let variance = (0..gd.ncols())
        .into_par_iter()
        .map(|m| (prior - weights.column(m).dot(&gd.column(m))).max(0.0))
        .collect();

    Ok(variance)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::KernelParams;

    #[test]
    fn test_zero_weights_give_prior_variance() {
        let kernel = GaussianKernel::new(&KernelParams::default()).unwrap();
        let gd = DMatrix::from_element(2, 3, 0.5);
        let weights = DMatrix::zeros(2, 3);
        let var = error_variance(&kernel, &gd, &weights).unwrap();
        assert_eq!(var, vec![1.0; 3]);
    }

    #[test]
    fn test_subtracts_explained_covariance() {
        let kernel = GaussianKernel::new(&KernelParams::default()).unwrap();
        let gd = DMatrix::from_row_slice(1, 2, &[0.8, 0.1]);
        let weights = DMatrix::from_row_slice(1, 2, &[0.5, 0.2]);
        let var = error_variance(&kernel, &gd, &weights).unwrap();
        assert!((var[0] - 0.6).abs() < 1e-12);
        assert!((var[1] - 0.98).abs() < 1e-12);
    }

    #[test]
    fn test_shape_mismatch() {
        let kernel = GaussianKernel::new(&KernelParams::default()).unwrap();
        let gd = DMatrix::zeros(2, 3);
        let weights = DMatrix::zeros(3, 2);
        assert!(matches!(
            error_variance(&kernel, &gd, &weights),
            Err(Error::SizeMismatch { .. })
        ));
    }
}
