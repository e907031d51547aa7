//! Planar trend removal
//!
//! Fits `value ≈ a + b·lon + c·lat` by least squares. Coordinates are
//! centred on the sensor centroid first and a small ridge is added to the
//! two slope terms only, so a single site, or sites on one line, still give a
//! unique plane without pulling the level towards zero.

use nalgebra::{Matrix3, Vector3};
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use tidewatch_core::{Error, Grid, Result};

use super::{usable_points, SensorPoint};

/// A fitted plane `intercept + lon_slope·lon + lat_slope·lat`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlanarTrend {
    pub intercept: f64,
    pub lon_slope: f64,
    pub lat_slope: f64,
}

impl PlanarTrend {
    /// Coefficients as `[a, b, c]`
    pub fn coefficients(&self) -> [f64; 3] {
        [self.intercept, self.lon_slope, self.lat_slope]
    }

    #[inline]
    pub fn evaluate(&self, lon: f64, lat: f64) -> f64 {
        self.intercept + self.lon_slope * lon + self.lat_slope * lat
    }

    /// The trend sampled at every node of `grid`
    pub fn field(&self, grid: &Grid) -> Result<Array2<f64>> {
        let values = grid
            .nodes()
            .into_iter()
            .map(|(lon, lat)| self.evaluate(lon, lat))
            .collect();
        grid.reshape(values)
    }

    /// Add the trend back onto a residual field defined on `grid`
    pub fn restore(&self, grid: &Grid, residual: &Array2<f64>) -> Result<Array2<f64>> {
        grid.check_field(residual)?;
        Ok(residual + &self.field(grid)?)
    }
}

/// Fit a plane to finite points with ridge `ridge` on the normal equations.
///
/// # Errors
/// - [`Error::InsufficientData`] if no point has a finite value
/// - [`Error::IllConditionedSystem`] if the normal equations cannot be solved
pub fn fit_trend(points: &[SensorPoint], ridge: f64) -> Result<PlanarTrend> {
    let points = usable_points(points);
    if points.is_empty() {
        return Err(Error::InsufficientData {
            required: 1,
            available: 0,
        });
    }

    let n = points.len() as f64;
    let mean_lon = points.iter().map(|p| p.lon).sum::<f64>() / n;
    let mean_lat = points.iter().map(|p| p.lat).sum::<f64>() / n;

    // (XᵀX + λD) β = Xᵀz with rows of X = [lon − l̄on, lat − l̄at, 1], D = diag(1, 1, 0)
    let mut xtx = Matrix3::<f64>::zeros();
    let mut xtz = Vector3::<f64>::zeros();
    for p in &points {
        let row = Vector3::new(p.lon - mean_lon, p.lat - mean_lat, 1.0);
        xtx += row * row.transpose();
        xtz += row * p.value;
    }
    xtx[(0, 0)] += ridge;
    xtx[(1, 1)] += ridge;

    let beta = xtx
        .lu()
        .solve(&xtz)
        .filter(|b| b.iter().all(|v| v.is_finite()))
        .ok_or_else(|| {
            Error::IllConditionedSystem(format!(
                "planar trend normal equations are singular for {} points",
                points.len()
            ))
        })?;

    Ok(PlanarTrend {
        intercept: beta[2] - beta[0] * mean_lon - beta[1] * mean_lat,
        lon_slope: beta[0],
        lat_slope: beta[1],
    })
}

/// Remove the planar trend from a batch of sensor values.
///
/// Points with a non-finite value are dropped first. Returns the surviving
/// points carrying their residual `value − trend(lon, lat)`, and the trend
/// that must be added back to anything interpolated from them.
pub fn detrend(points: &[SensorPoint], ridge: f64) -> Result<(Vec<SensorPoint>, PlanarTrend)> {
    let trend = fit_trend(points, ridge)?;
    let residuals = usable_points(points)
        .into_iter()
        .map(|p| SensorPoint::new(p.lon, p.lat, p.value - trend.evaluate(p.lon, p.lat)))
        .collect();
    Ok((residuals, trend))
}
