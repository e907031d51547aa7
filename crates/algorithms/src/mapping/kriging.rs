//! Objective mapping (simple kriging of detrended residuals)
//!
//! For N usable sensors and M grid nodes:
//! ```text
//! DD = K(data, data) + nugget·I          (N×N)
//! GD = K(data, grid)                      (N×M)
//! A  : A·DD ≈ GDᵀ   (least squares)       (M×N)
//! field = A·d + trend(grid)
//! ```
//! where `d` are the residuals left after removing the planar trend. Since
//! `DD` is symmetric the solve is carried out as `Aᵀ = DD⁺·GD` with an SVD
//! pseudo-inverse, which is the least-squares solution when `DD` is
//! rank-deficient. The nugget keeps `DD` well conditioned even with
//! duplicate sensor sites; a system that is still numerically singular is
//! reported rather than papered over.
//!
//! Reference:
//! Bretherton, F.P., Davis, R.E. & Fandry, C.B. (1976). A technique for
//! objective analysis and design of oceanographic experiments. Deep-Sea Research.

use nalgebra::{DMatrix, DVector};
use ndarray::Array2;
use std::time::Instant;
use tidewatch_core::{Algorithm, Error, Grid, Result};
use tracing::debug;

use super::covariance::GaussianKernel;
use super::trend::{detrend, PlanarTrend};
use super::variance::error_variance;
use super::{MappingConfig, SensorPoint};

/// Reciprocal condition number of `DD` below which the solve is rejected.
const MIN_RCOND: f64 = 1e-14;

/// Interpolated water level (and optionally its error variance) on a grid.
#[derive(Debug, Clone)]
pub struct ObjectiveMap {
    /// Water level with the trend restored, shape `grid.shape()`
    pub field: Array2<f64>,
    /// Normalized error variance; `None` when error computation is off
    pub error: Option<Array2<f64>>,
    /// Trend removed before interpolation
    pub trend: PlanarTrend,
    /// Number of sensors that contributed
    pub sensor_count: usize,
}

/// Interpolate scattered sensor values onto `grid`.
///
/// # Errors
/// - [`Error::InvalidParameter`] for non-positive length scales or nugget
/// - [`Error::InsufficientData`] when no point has a finite value
/// - [`Error::IllConditionedSystem`] when the covariance system cannot be
///   solved to finite weights
pub fn objective_map(
    points: &[SensorPoint],
    grid: &Grid,
    config: &MappingConfig,
) -> Result<ObjectiveMap> {
    config.validate()?;
    let kernel = GaussianKernel::new(&config.kernel)?;
    let start = Instant::now();

    let (residuals, trend) = detrend(points, config.trend_ridge)?;
    let n = residuals.len();
    let m = grid.len();
    debug!(
        sensors = n,
        dropped = points.len() - n,
        nodes = m,
        "building covariance system"
    );

    let locations: Vec<(f64, f64)> = residuals.iter().map(SensorPoint::location).collect();
    let d = DVector::from_iterator(n, residuals.iter().map(|p| p.value));

    let dd = kernel.data_covariance(&locations, config.kernel.nugget);
    let gd = kernel.covariance(&locations, &grid.nodes());

    let weights = solve_weights(dd, &gd)?;

    // A·d with A = weightsᵀ
    let residual_field = grid.reshape(weights.tr_mul(&d).iter().copied().collect())?;
    let field = trend.restore(grid, &residual_field)?;

    let error = if config.compute_error {
        Some(grid.reshape(error_variance(&kernel, &gd, &weights)?)?)
    } else {
        None
    };

    debug!(elapsed = ?start.elapsed(), "objective map complete");

    Ok(ObjectiveMap {
        field,
        error,
        trend,
        sensor_count: n,
    })
}

/// Least-squares solve of `DD·W = GD` for `W = Aᵀ` (N×M).
fn solve_weights(dd: DMatrix<f64>, gd: &DMatrix<f64>) -> Result<DMatrix<f64>> {
    let n = dd.nrows();
    let svd = dd.svd(true, true);

    let max_sv = svd.singular_values.max();
    let min_sv = svd.singular_values.min();
    let rcond = min_sv / max_sv;
    if !rcond.is_finite() || rcond < MIN_RCOND {
        return Err(Error::IllConditionedSystem(format!(
            "data covariance has reciprocal condition {rcond:e} (minimum {MIN_RCOND:e}); \
             increase the nugget or merge duplicate sensors"
        )));
    }

    let eps = max_sv * n as f64 * f64::EPSILON;
    let weights = svd
        .solve(gd, eps)
        .map_err(|e| Error::IllConditionedSystem(e.to_string()))?;

    if weights.iter().any(|w| !w.is_finite()) {
        return Err(Error::IllConditionedSystem(
            "kriging weights are not finite".into(),
        ));
    }

    Ok(weights)
}

/// Objective mapping exposed through the [`Algorithm`] trait.
#[derive(Debug, Clone, Default)]
pub struct ObjectiveMapping;

impl Algorithm for ObjectiveMapping {
    type Input = (Vec<SensorPoint>, Grid);
    type Output = ObjectiveMap;
    type Params = MappingConfig;
    type Error = Error;

    fn name(&self) -> &'static str {
        "ObjectiveMapping"
    }

    fn description(&self) -> &'static str {
        "Gaussian-covariance kriging of detrended sensor values onto a regular grid"
    }

    fn execute(&self, input: Self::Input, params: Self::Params) -> Result<Self::Output> {
        let (points, grid) = input;
        objective_map(&points, &grid, &params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::KernelParams;
    use approx::assert_abs_diff_eq;

    fn generate_points(n: usize, seed: u64) -> Vec<SensorPoint> {
        let mut points = Vec::with_capacity(n);
        let mut rng = seed;
        let mut next = || {
            rng = rng.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            (rng >> 33) as f64 / (1u64 << 31) as f64
        };
        for _ in 0..n {
            let lon = -81.2 + 0.2 * next();
            let lat = 31.9 + 0.2 * next();
            let value = 4.0 + 3.0 * (lon + 81.1) + 10.0 * ((lat - 32.0) * 30.0).sin();
            points.push(SensorPoint::new(lon, lat, value));
        }
        points
    }

    fn grid() -> Grid {
        let lon: Vec<f64> = (0..11).map(|i| -81.2 + 0.02 * i as f64).collect();
        let lat: Vec<f64> = (0..11).map(|i| 31.9 + 0.02 * i as f64).collect();
        Grid::new(lon, lat).unwrap()
    }

    fn config(scale: f64, nugget: f64) -> MappingConfig {
        MappingConfig {
            kernel: KernelParams {
                lon_scale: scale,
                lat_scale: scale,
                nugget,
            },
            ..Default::default()
        }
    }

    #[test]
    fn test_field_is_finite_and_bounded() {
        let points = generate_points(25, 42);
        let result = objective_map(&points, &grid(), &config(0.05, 0.01)).unwrap();
        assert_eq!(result.field.dim(), (11, 11));
        assert_eq!(result.sensor_count, 25);

        let lo = points.iter().map(|p| p.value).fold(f64::INFINITY, f64::min);
        let hi = points.iter().map(|p| p.value).fold(f64::NEG_INFINITY, f64::max);
        let span = hi - lo;
        for &v in result.field.iter() {
            assert!(v.is_finite());
            assert!(v > lo - span && v < hi + span, "value {v} outside plausible range");
        }
    }

    #[test]
    fn test_converges_to_sensor_value_at_coincident_node() {
        let g = grid();
        let points = vec![
            SensorPoint::new(g.lon()[2], g.lat()[3], 7.5),
            SensorPoint::new(g.lon()[8], g.lat()[7], 2.0),
            SensorPoint::new(g.lon()[5], g.lat()[9], 4.0),
        ];
        let result = objective_map(&points, &g, &config(0.04, 1e-8)).unwrap();
        assert_abs_diff_eq!(result.field[(3, 2)], 7.5, epsilon = 1e-5);
        assert_abs_diff_eq!(result.field[(7, 8)], 2.0, epsilon = 1e-5);

        let error = result.error.unwrap();
        assert!(error[(3, 2)] < 1e-6);
    }

    #[test]
    fn test_level_water_maps_to_its_level_between_sensors() {
        let points = vec![
            SensorPoint::new(-81.2, 31.9, 5.0),
            SensorPoint::new(-81.0, 31.9, 5.0),
            SensorPoint::new(-81.2, 32.1, 5.0),
            SensorPoint::new(-81.0, 32.1, 5.0),
        ];
        let result = objective_map(&points, &grid(), &config(0.05, 0.01)).unwrap();
        assert_abs_diff_eq!(result.trend.intercept, 5.0, epsilon = 1e-8);
        // (5, 5) is the midway node, far from every sensor
        assert_abs_diff_eq!(result.field[(5, 5)], 5.0, epsilon = 1e-8);
        for &v in result.field.iter() {
            assert_abs_diff_eq!(v, 5.0, epsilon = 1e-8);
        }
    }

    #[test]
    fn test_nugget_bounds_duplicate_sites() {
        let g = grid();
        let site = (g.lon()[4], g.lat()[4]);
        let points = vec![
            SensorPoint::new(site.0, site.1, 3.0),
            SensorPoint::new(site.0, site.1, 3.2),
            SensorPoint::new(site.0 + 0.1, site.1 + 0.1, 5.0),
        ];
        let result = objective_map(&points, &g, &config(0.05, 0.01)).unwrap();
        for &v in result.field.iter() {
            assert!(v.is_finite() && v.abs() < 100.0, "unbounded value {v}");
        }
        // Smoothed towards the mean of the duplicate pair
        assert!((result.field[(4, 4)] - 3.1).abs() < 0.2);
    }

    #[test]
    fn test_error_grows_away_from_single_sensor() {
        let lon: Vec<f64> = (0..20).map(|i| i as f64 * 0.01).collect();
        let g = Grid::new(lon, vec![0.0]).unwrap();
        let points = vec![SensorPoint::new(0.0, 0.0, 1.0)];
        let result = objective_map(&points, &g, &config(0.05, 0.01)).unwrap();
        let error = result.error.unwrap();
        for j in 1..20 {
            assert!(
                error[(0, j)] >= error[(0, j - 1)],
                "variance decreased at node {j}: {} < {}",
                error[(0, j)],
                error[(0, j - 1)]
            );
        }
        assert!(error[(0, 0)] < 0.02);
        assert!(error[(0, 19)] > 0.99);
    }

    #[test]
    fn test_no_usable_points_is_insufficient_data() {
        let points = vec![SensorPoint::new(-81.0, 32.0, f64::NAN)];
        let err = objective_map(&points, &grid(), &MappingConfig::default()).unwrap_err();
        assert!(err.is_recoverable());
        assert!(objective_map(&[], &grid(), &MappingConfig::default()).is_err());
    }

    #[test]
    fn test_error_computation_can_be_skipped() {
        let config = MappingConfig {
            compute_error: false,
            ..config(0.05, 0.01)
        };
        let result = objective_map(&generate_points(10, 7), &grid(), &config).unwrap();
        assert!(result.error.is_none());
    }

    #[test]
    fn test_ill_conditioned_system_is_reported() {
        // Two coincident sites with a vanishing nugget leave DD singular.
        let points = vec![
            SensorPoint::new(-81.0, 32.0, 1.0),
            SensorPoint::new(-81.0, 32.0, 2.0),
        ];
        let result = objective_map(&points, &grid(), &config(0.05, 1e-300));
        assert!(matches!(result, Err(Error::IllConditionedSystem(_))));
    }

    #[test]
    fn test_algorithm_trait() {
        let alg = ObjectiveMapping;
        assert_eq!(alg.name(), "ObjectiveMapping");
        let result = alg
            .execute((generate_points(12, 3), grid()), config(0.05, 0.01))
            .unwrap();
        assert_eq!(result.sensor_count, 12);
    }
}
