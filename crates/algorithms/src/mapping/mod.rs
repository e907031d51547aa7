//! Objective mapping of scattered sensor values onto a regular grid
//!
//! The estimator is simple kriging of planar-detrended residuals under a
//! separable Gaussian covariance:
//! - trend: least-squares plane `a + b·lon + c·lat`, removed before and
//!   restored after interpolation
//! - covariance: `exp(-(Δlon/a)² - (Δlat/b)²)` with a nugget on the
//!   data-data diagonal
//! - kriging: weights `A` solving `A·DD ≈ GDᵀ`, field `A·d + trend`
//! - variance: `diag(GG − A·GD)`, the normalized estimation error

pub mod covariance;
pub mod kriging;
pub mod trend;
pub mod variance;

pub use covariance::GaussianKernel;
pub use kriging::{objective_map, ObjectiveMap, ObjectiveMapping};
pub use trend::{detrend, fit_trend, PlanarTrend};
pub use variance::error_variance;

use serde::{Deserialize, Serialize};
use tidewatch_core::{Error, Result};

/// A sensor location with one measured value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SensorPoint {
    pub lon: f64,
    pub lat: f64,
    pub value: f64,
}

impl SensorPoint {
    pub fn new(lon: f64, lat: f64, value: f64) -> Self {
        Self { lon, lat, value }
    }

    /// Location as (lon, lat)
    #[inline]
    pub fn location(&self) -> (f64, f64) {
        (self.lon, self.lat)
    }
}

/// Drop points whose value (or location) is not finite.
///
/// A point is invalid only through its own measurement; nothing else about
/// the batch is inspected.
pub fn usable_points(points: &[SensorPoint]) -> Vec<SensorPoint> {
    points
        .iter()
        .filter(|p| p.value.is_finite() && p.lon.is_finite() && p.lat.is_finite())
        .copied()
        .collect()
}

/// Covariance kernel parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KernelParams {
    /// Decorrelation length scale along longitude (degrees)
    pub lon_scale: f64,
    /// Decorrelation length scale along latitude (degrees)
    pub lat_scale: f64,
    /// Noise variance added to the data-data diagonal
    pub nugget: f64,
}

impl Default for KernelParams {
    fn default() -> Self {
        Self {
            lon_scale: 0.05,
            lat_scale: 0.05,
            nugget: 0.01,
        }
    }
}

impl KernelParams {
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("lon_scale", self.lon_scale),
            ("lat_scale", self.lat_scale),
            ("nugget", self.nugget),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(Error::invalid_parameter(name, value, "must be positive and finite"));
            }
        }
        Ok(())
    }
}

/// Everything the mapping pipeline needs besides its data.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MappingConfig {
    pub kernel: KernelParams,
    /// Ridge added to the trend normal equations
    pub trend_ridge: f64,
    /// Cells with error variance at or above this are masked out
    pub error_threshold: f64,
    /// Depth that maps to full intensity in output records
    pub max_display_depth: f64,
    /// Whether to compute the error variance field (and apply the mask)
    pub compute_error: bool,
}

impl Default for MappingConfig {
    fn default() -> Self {
        Self {
            kernel: KernelParams::default(),
            trend_ridge: 1e-4,
            error_threshold: 0.2,
            max_display_depth: 10.0,
            compute_error: true,
        }
    }
}

impl MappingConfig {
    pub fn validate(&self) -> Result<()> {
        self.kernel.validate()?;
        if !(self.trend_ridge.is_finite() && self.trend_ridge >= 0.0) {
            return Err(Error::invalid_parameter(
                "trend_ridge",
                self.trend_ridge,
                "must be non-negative and finite",
            ));
        }
        if !self.error_threshold.is_finite() {
            return Err(Error::invalid_parameter(
                "error_threshold",
                self.error_threshold,
                "must be finite",
            ));
        }
        if !(self.max_display_depth.is_finite() && self.max_display_depth > 0.0) {
            return Err(Error::invalid_parameter(
                "max_display_depth",
                self.max_display_depth,
                "must be positive and finite",
            ));
        }
        Ok(())
    }
}
