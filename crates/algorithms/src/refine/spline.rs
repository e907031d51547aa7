//! Natural cubic splines on rectilinear axes
//!
//! The 2-D surface is the tensor product of 1-D natural cubic splines:
//! interpolate along longitude for every source row, then along latitude
//! for every target column. It passes exactly through the source nodes and
//! is C² inside the source domain. Coordinates outside the source axes are
//! clamped to the nearest edge, so the surface continues flat instead of
//! extrapolating.

use crate::maybe_rayon::*;
use ndarray::Array2;
use tidewatch_core::{Error, Result};

/// 1-D natural cubic spline (zero second derivative at both ends).
#[derive(Debug, Clone)]
pub struct CubicSpline1d {
    x: Vec<f64>,
    y: Vec<f64>,
    /// Second derivatives at the knots
    m: Vec<f64>,
}

impl CubicSpline1d {
    /// Fit through `(x[i], y[i])`. `x` must be strictly ascending and the
    /// same length as `y`; one knot gives a constant, two a straight line.
    pub fn new(x: &[f64], y: &[f64]) -> Result<Self> {
        if x.is_empty() || x.len() != y.len() {
            return Err(Error::invalid_parameter(
                "knots",
                format!("{} x / {} y", x.len(), y.len()),
                "need at least one knot and matching lengths",
            ));
        }
        if x.windows(2).any(|w| w[1] <= w[0]) {
            return Err(Error::invalid_parameter(
                "knots",
                format!("{} values", x.len()),
                "knot positions must be strictly ascending",
            ));
        }

        let m = natural_second_derivatives(x, y);
        Ok(Self {
            x: x.to_vec(),
            y: y.to_vec(),
            m,
        })
    }

    /// Evaluate at `t`, clamped to the knot range
    pub fn evaluate(&self, t: f64) -> f64 {
        let n = self.x.len();
        if n == 1 {
            return self.y[0];
        }
        let t = t.clamp(self.x[0], self.x[n - 1]);

        // Interval k with x[k] <= t <= x[k + 1]
        let k = self.x.partition_point(|&xi| xi <= t).clamp(1, n - 1) - 1;
        let (x0, x1) = (self.x[k], self.x[k + 1]);
        let (y0, y1) = (self.y[k], self.y[k + 1]);
        let (m0, m1) = (self.m[k], self.m[k + 1]);
        let h = x1 - x0;
        let a = x1 - t;
        let b = t - x0;

        m0 * a * a * a / (6.0 * h)
            + m1 * b * b * b / (6.0 * h)
            + (y0 / h - m0 * h / 6.0) * a
            + (y1 / h - m1 * h / 6.0) * b
    }
}

/// Solve the tridiagonal system for knot second derivatives (Thomas algorithm).
fn natural_second_derivatives(x: &[f64], y: &[f64]) -> Vec<f64> {
    let n = x.len();
    let mut m = vec![0.0; n];
    if n < 3 {
        return m;
    }

    let interior = n - 2;
    let mut diag = vec![0.0; interior];
    let mut upper = vec![0.0; interior];
    let mut rhs = vec![0.0; interior];

    for i in 1..n - 1 {
        let h0 = x[i] - x[i - 1];
        let h1 = x[i + 1] - x[i];
        diag[i - 1] = 2.0 * (h0 + h1);
        upper[i - 1] = h1;
        rhs[i - 1] = 6.0 * ((y[i + 1] - y[i]) / h1 - (y[i] - y[i - 1]) / h0);
    }

    // Forward sweep; the sub-diagonal entry of row r is h_{r} = x[r+1] - x[r].
    for r in 1..interior {
        let lower = x[r + 1] - x[r];
        let w = lower / diag[r - 1];
        diag[r] -= w * upper[r - 1];
        rhs[r] -= w * rhs[r - 1];
    }

    m[interior] = rhs[interior - 1] / diag[interior - 1];
    for r in (0..interior - 1).rev() {
        m[r + 1] = (rhs[r] - upper[r] * m[r + 2]) / diag[r];
    }

    m
}

/// Tensor-product natural cubic spline over a lon/lat field.
#[derive(Debug, Clone)]
pub struct CubicSpline2d {
    lat: Vec<f64>,
    /// One longitude spline per source row
    rows: Vec<CubicSpline1d>,
}

impl CubicSpline2d {
    /// Fit through `values[(i, j)]` at `(lon[j], lat[i])`.
    pub fn new(lon: &[f64], lat: &[f64], values: &Array2<f64>) -> Result<Self> {
        let (n_lat, n_lon) = values.dim();
        if (n_lat, n_lon) != (lat.len(), lon.len()) {
            return Err(Error::SizeMismatch {
                er: lat.len(),
                ec: lon.len(),
                ar: n_lat,
                ac: n_lon,
            });
        }

        let rows = values
            .rows()
            .into_iter()
            .map(|row| CubicSpline1d::new(lon, &row.to_vec()))
            .collect::<Result<Vec<_>>>()?;

        // Validate the latitude axis once; per-column splines reuse it.
        CubicSpline1d::new(lat, &vec![0.0; lat.len()])?;

        Ok(Self {
            lat: lat.to_vec(),
            rows,
        })
    }

    /// Latitude spline through one column; the axis was validated in `new`.
    fn lat_spline(&self, y: Vec<f64>) -> CubicSpline1d {
        let m = natural_second_derivatives(&self.lat, &y);
        CubicSpline1d {
            x: self.lat.clone(),
            y,
            m,
        }
    }

    /// Evaluate at a single location
    pub fn evaluate(&self, lon: f64, lat: f64) -> f64 {
        let across = self.rows.iter().map(|s| s.evaluate(lon)).collect();
        self.lat_spline(across).evaluate(lat)
    }

    /// Evaluate on the tensor grid `lon_out × lat_out`, shape `(lat_out.len(), lon_out.len())`
    pub fn evaluate_grid(&self, lon_out: &[f64], lat_out: &[f64]) -> Result<Array2<f64>> {
        // Pass 1: along longitude for every source row
        let n_src = self.rows.len();
        let pass1: Vec<f64> = (0..n_src)
            .into_par_iter()
            .flat_map(|i| {
                let spline = &self.rows[i];
                lon_out.iter().map(|&x| spline.evaluate(x)).collect::<Vec<_>>()
            })
            .collect();
        let pass1 = Array2::from_shape_vec((n_src, lon_out.len()), pass1)
            .map_err(|e| Error::Other(e.to_string()))?;

        // Pass 2: along latitude for every target column
        let columns: Vec<Vec<f64>> = (0..lon_out.len())
            .into_par_iter()
            .map(|j| {
                let spline = self.lat_spline(pass1.column(j).to_vec());
                lat_out.iter().map(|&y| spline.evaluate(y)).collect()
            })
            .collect();

        let mut out = Array2::zeros((lat_out.len(), lon_out.len()));
        for (j, column) in columns.into_iter().enumerate() {
            for (i, v) in column.into_iter().enumerate() {
                out[(i, j)] = v;
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_1d_passes_through_knots() {
        let x = [0.0, 0.5, 1.5, 2.0, 3.5];
        let y = [1.0, -2.0, 0.5, 4.0, 3.0];
        let s = CubicSpline1d::new(&x, &y).unwrap();
        for (xi, yi) in x.iter().zip(&y) {
            assert_abs_diff_eq!(s.evaluate(*xi), *yi, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_1d_reproduces_straight_lines() {
        let x = [0.0, 1.0, 2.0, 4.0];
        let y: Vec<f64> = x.iter().map(|v| 3.0 * v - 1.0).collect();
        let s = CubicSpline1d::new(&x, &y).unwrap();
        for t in [0.25, 1.7, 3.3] {
            assert_abs_diff_eq!(s.evaluate(t), 3.0 * t - 1.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_1d_clamps_outside_range() {
        let s = CubicSpline1d::new(&[0.0, 1.0, 2.0], &[0.0, 1.0, 0.0]).unwrap();
        assert_abs_diff_eq!(s.evaluate(-5.0), 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(s.evaluate(7.0), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_1d_degenerate_knot_counts() {
        let one = CubicSpline1d::new(&[2.0], &[5.0]).unwrap();
        assert_eq!(one.evaluate(-1.0), 5.0);
        let two = CubicSpline1d::new(&[0.0, 2.0], &[0.0, 4.0]).unwrap();
        assert_abs_diff_eq!(two.evaluate(0.5), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_1d_rejects_bad_knots() {
        assert!(CubicSpline1d::new(&[0.0, 0.0], &[1.0, 2.0]).is_err());
        assert!(CubicSpline1d::new(&[0.0, 1.0], &[1.0]).is_err());
        assert!(CubicSpline1d::new(&[], &[]).is_err());
    }

    #[test]
    fn test_2d_matches_pointwise_evaluation() {
        let lon = [0.0, 1.0, 2.0, 3.0];
        let lat = [10.0, 11.0, 12.0];
        let values = Array2::from_shape_fn((3, 4), |(i, j)| ((i * 7 + j * 3) % 5) as f64);
        let s = CubicSpline2d::new(&lon, &lat, &values).unwrap();

        let lon_out = [0.0, 0.4, 1.5, 2.9, 3.0];
        let lat_out = [10.0, 10.7, 11.5, 12.0];
        let grid = s.evaluate_grid(&lon_out, &lat_out).unwrap();
        assert_eq!(grid.dim(), (4, 5));
        for (i, &y) in lat_out.iter().enumerate() {
            for (j, &x) in lon_out.iter().enumerate() {
                assert_abs_diff_eq!(grid[(i, j)], s.evaluate(x, y), epsilon = 1e-12);
            }
        }
        assert_abs_diff_eq!(grid[(3, 4)], values[(2, 3)], epsilon = 1e-12);
    }

    #[test]
    fn test_2d_shape_mismatch() {
        let values = Array2::zeros((2, 3));
        assert!(matches!(
            CubicSpline2d::new(&[0.0, 1.0], &[0.0, 1.0, 2.0], &values),
            Err(Error::SizeMismatch { .. })
        ));
    }
}
