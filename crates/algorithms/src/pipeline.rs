//! End-to-end inundation mapping
//!
//! ```text
//! sensors ─► objective map (coarse) ─► refine ─► mask ─► − terrain ─► records
//!                     └─ error variance ─► refine ─┘
//! ```
//!
//! Either every stage completes and a (possibly empty) record list is
//! returned, or the first failing stage's error is returned and no records
//! are produced.

use std::time::Instant;

use ndarray::Array2;
use tidewatch_core::{Error, Grid, GridSpec, Result};
use tracing::{debug, info, warn};

use crate::inundation::{
    extent_covers, inundation_depth, to_records, InundationRecord, TerrainSource,
};
use crate::mapping::{objective_map, MappingConfig, PlanarTrend, SensorPoint};
use crate::mask::{apply_mask, confidence_mask};
use crate::refine::refine_field;

/// Intermediate fields kept for inspection and export.
#[derive(Debug, Clone)]
pub struct Diagnostics {
    pub coarse_grid: Grid,
    pub fine_grid: Grid,
    /// Water level on the coarse grid
    pub coarse_field: Array2<f64>,
    /// Error variance on the coarse grid, when computed
    pub error_field: Option<Array2<f64>>,
    /// Refined water level after masking
    pub fine_field: Array2<f64>,
    /// Refined error variance, when computed
    pub fine_error: Option<Array2<f64>>,
    /// Inundation depth on the fine grid (NaN where dry or undefined)
    pub depth: Array2<f64>,
    pub trend: PlanarTrend,
    pub sensor_count: usize,
    /// Whether the terrain extent spans every fine node; `None` when the
    /// source does not report an extent
    pub terrain_covers_grid: Option<bool>,
}

/// Result of one mapping run.
#[derive(Debug, Clone)]
pub struct InundationMap {
    pub records: Vec<InundationRecord>,
    pub diagnostics: Diagnostics,
}

/// Map sensor water levels to inundation depth over `terrain`.
///
/// # Errors
/// - [`Error::InvalidParameter`] for bad configuration or grid specs
/// - [`Error::InsufficientData`] when no sensor has a finite value
/// - [`Error::IllConditionedSystem`] when the kriging solve fails
/// - [`Error::GridMismatch`] when the terrain cannot be sampled onto the
///   fine grid
pub fn map_inundation(
    measurements: &[SensorPoint],
    coarse: &GridSpec,
    fine: &GridSpec,
    config: &MappingConfig,
    terrain: &dyn TerrainSource,
) -> Result<InundationMap> {
    config.validate()?;
    let coarse_grid = coarse.build()?;
    let fine_grid = fine.build()?;
    let start = Instant::now();

    info!(
        sensors = measurements.len(),
        coarse = ?coarse_grid.shape(),
        fine = ?fine_grid.shape(),
        "mapping inundation"
    );

    let map = objective_map(measurements, &coarse_grid, config)?;
    debug!(elapsed = ?start.elapsed(), "coarse field ready");

    let mut fine_field = refine_field(&coarse_grid, &fine_grid, &map.field)?;
    let fine_error = match &map.error {
        Some(error) => {
            let refined = refine_field(&coarse_grid, &fine_grid, error)?;
            let mask = confidence_mask(&refined, config.error_threshold)?;
            fine_field = apply_mask(&fine_field, &mask)?;
            let kept = mask.iter().filter(|m| !m.is_nan()).count();
            debug!(kept, total = mask.len(), "confidence mask applied");
            Some(refined)
        }
        None => None,
    };

    let terrain_covers_grid = terrain.extent().map(|extent| extent_covers(extent, &fine_grid));
    if terrain_covers_grid == Some(false) {
        warn!(
            extent = ?terrain.extent(),
            "terrain does not cover the fine grid; depth near the edges is stretched"
        );
    }

    let out_shape = fine_grid.shape();
    let sample = terrain.read(out_shape)?;
    if sample.shape() != out_shape {
        let (source_rows, source_cols) = sample.shape();
        return Err(Error::GridMismatch {
            source_rows,
            source_cols,
            target_rows: out_shape.0,
            target_cols: out_shape.1,
            reason: "terrain source returned the wrong shape".into(),
        });
    }

    let depth = inundation_depth(&fine_field, sample)?;
    let records = to_records(&fine_grid, &depth, config.max_display_depth)?;

    info!(
        records = records.len(),
        elapsed = ?start.elapsed(),
        "inundation map complete"
    );

    Ok(InundationMap {
        records,
        diagnostics: Diagnostics {
            coarse_grid,
            fine_grid,
            coarse_field: map.field,
            error_field: map.error,
            fine_field,
            fine_error,
            depth,
            trend: map.trend,
            sensor_count: map.sensor_count,
            terrain_covers_grid,
        },
    })
}
