//! # tidewatch algorithms
//!
//! Water-level mapping and inundation depth for tidewatch.
//!
//! ## Modules
//!
//! - **mapping**: planar trend, Gaussian covariance, objective mapping (kriging), error variance
//! - **refine**: bicubic spline refinement from the coarse to the fine grid
//! - **mask**: error-variance confidence mask
//! - **inundation**: terrain sampling, depth differencing, output records
//! - **measurement**: datum normalization and per-sensor selection in a time window
//! - **pipeline**: the full sensors-to-records run

pub(crate) mod maybe_rayon;

pub mod inundation;
pub mod mapping;
pub mod mask;
pub mod measurement;
pub mod pipeline;
pub mod refine;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::inundation::{
        inundation_depth, resample_bilinear, to_records, InundationRecord, RasterTerrain,
        RowOrder, TerrainSample, TerrainSource,
    };
    pub use crate::mapping::{
        detrend, error_variance, fit_trend, objective_map, GaussianKernel, KernelParams,
        MappingConfig, ObjectiveMap, ObjectiveMapping, PlanarTrend, SensorPoint,
    };
    pub use crate::mask::{apply_mask, confidence_mask};
    pub use crate::measurement::{
        latest_per_sensor, normalize_observation, Measurement, Observation, SensorSite,
        TimeWindow,
    };
    pub use crate::pipeline::{map_inundation, Diagnostics, InundationMap};
    pub use crate::refine::{refine_field, CubicSpline2d};
    pub use tidewatch_core::prelude::*;
}
