//! Separable Gaussian covariance kernel
//!
//! ```text
//! K(p, q) = exp( -((p.lon - q.lon) / a)² - ((p.lat - q.lat) / b)² )
//! ```
//!
//! Values lie in (0, 1], equal 1 on coincident points, and are negligible
//! beyond a few length scales. The length scales are fixed, externally
//! supplied properties of the sensor network rather than fitted per batch.

use crate::maybe_rayon::*;
use nalgebra::DMatrix;
use tidewatch_core::Result;

use super::KernelParams;

/// Gaussian covariance with independent longitude/latitude length scales.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GaussianKernel {
    lon_scale: f64,
    lat_scale: f64,
}

impl GaussianKernel {
    /// Build a kernel from validated parameters
    pub fn new(params: &KernelParams) -> Result<Self> {
        params.validate()?;
        Ok(Self {
            lon_scale: params.lon_scale,
            lat_scale: params.lat_scale,
        })
    }

    /// Covariance between two locations
    #[inline]
    pub fn evaluate(&self, p: (f64, f64), q: (f64, f64)) -> f64 {
        let u = (p.0 - q.0) / self.lon_scale;
        let v = (p.1 - q.1) / self.lat_scale;
        (-(u * u) - v * v).exp()
    }

    /// Prior variance at a single location, `K(p, p)`
    #[inline]
    pub fn variance(&self) -> f64 {
        1.0
    }

    /// Covariance matrix `K[i, j] = K(xs[i], ys[j])`, shape `(xs.len(), ys.len())`
    pub fn covariance(&self, xs: &[(f64, f64)], ys: &[(f64, f64)]) -> DMatrix<f64> {
        let m = ys.len();
        let data: Vec<f64> = (0..xs.len())
            .into_par_iter()
            .flat_map(|i| {
                let p = xs[i];
                ys.iter().map(|&q| self.evaluate(p, q)).collect::<Vec<_>>()
            })
            .collect();
        DMatrix::from_row_slice(xs.len(), m, &data)
    }

    /// Data-data covariance with `nugget` added to the diagonal
    pub fn data_covariance(&self, points: &[(f64, f64)], nugget: f64) -> DMatrix<f64> {
        let mut dd = self.covariance(points, points);
        for i in 0..points.len() {
            dd[(i, i)] += nugget;
        }
        dd
    }
}
