//! Sensor measurements and batch selection
//!
//! Sensors report water height in metres relative to their own mount.
//! Adding the surveyed NAVD88 elevation of the site and converting to feet
//! gives the water level the mapper interpolates. Each run then takes one
//! value per sensor, the most recent inside the requested time window.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use tidewatch_core::{Error, Result};
use tracing::{debug, warn};

use crate::mapping::SensorPoint;

/// Conversion factor applied to NAVD88 metres
pub const FEET_PER_METRE: f64 = 3.28;

/// A normalized water-level reading.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
    pub lon: f64,
    pub lat: f64,
    /// Water level in feet NAVD88; NaN when the reading is missing.
    /// JSON `null` or an absent field deserializes to NaN.
    #[serde(default = "missing_value", deserialize_with = "nan_when_null")]
    pub value: f64,
    pub timestamp: DateTime<Utc>,
}

fn missing_value() -> f64 {
    f64::NAN
}

fn nan_when_null<'de, D>(deserializer: D) -> std::result::Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(f64::NAN))
}

/// A deployed sensor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorSite {
    pub id: u64,
    pub name: String,
    pub lon: f64,
    pub lat: f64,
    /// Surveyed elevation of the sensor datum in metres NAVD88
    pub elevation_navd88: Option<f64>,
}

/// A raw reading relative to the sensor datum, in metres.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub phenomenon_time: DateTime<Utc>,
    pub result: f64,
}

/// Convert a raw observation to feet NAVD88, rounded to hundredths.
///
/// Returns `None` for sites without a surveyed elevation; their readings
/// cannot be placed on the common datum.
pub fn normalize_observation(site: &SensorSite, obs: &Observation) -> Option<Measurement> {
    let elevation = site.elevation_navd88?;
    let feet = (elevation + obs.result) * FEET_PER_METRE;
    Some(Measurement {
        lon: site.lon,
        lat: site.lat,
        value: (feet * 100.0).round() / 100.0,
        timestamp: obs.phenomenon_time,
    })
}

/// Closed time interval `[start, end]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self> {
        let window = Self { start, end };
        window.validate()?;
        Ok(window)
    }

    /// The `hours` leading up to and including `end`
    pub fn last_hours(end: DateTime<Utc>, hours: u32) -> Self {
        Self {
            start: end - Duration::hours(i64::from(hours)),
            end,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.start > self.end {
            return Err(Error::invalid_parameter(
                "time_window",
                format!("{} .. {}", self.start, self.end),
                "start must not be after end",
            ));
        }
        Ok(())
    }

    pub fn contains(&self, t: DateTime<Utc>) -> bool {
        self.start <= t && t <= self.end
    }
}

/// Latest finite reading per sensor location inside `window`.
///
/// Sensors are identified by their exact coordinates. Output order follows
/// the first in-window reading of each sensor, by time. Non-finite readings
/// are dropped and counted in a warning. An empty result is not an error
/// here; the mapper reports it as insufficient data.
pub fn latest_per_sensor(
    measurements: &[Measurement],
    window: &TimeWindow,
) -> Result<Vec<SensorPoint>> {
    window.validate()?;

    let mut in_window: Vec<&Measurement> = measurements
        .iter()
        .filter(|m| window.contains(m.timestamp))
        .collect();
    let total = in_window.len();
    in_window.retain(|m| m.value.is_finite() && m.lon.is_finite() && m.lat.is_finite());

    let dropped = total - in_window.len();
    if dropped > 0 {
        warn!(dropped, "ignoring non-finite measurements");
    }

    in_window.sort_by_key(|m| m.timestamp);

    let mut slot: HashMap<(u64, u64), usize> = HashMap::new();
    let mut latest: Vec<SensorPoint> = Vec::new();
    for m in in_window {
        let point = SensorPoint::new(m.lon, m.lat, m.value);
        match slot.get(&(m.lon.to_bits(), m.lat.to_bits())) {
            Some(&i) => latest[i] = point,
            None => {
                slot.insert((m.lon.to_bits(), m.lat.to_bits()), latest.len());
                latest.push(point);
            }
        }
    }

    debug!(
        sensors = latest.len(),
        readings = total,
        start = %window.start,
        end = %window.end,
        "selected latest readings"
    );
    Ok(latest)
}
