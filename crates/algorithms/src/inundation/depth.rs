//! Water level minus terrain

use ndarray::{Array2, Zip};
use tidewatch_core::{Error, Result};

use super::terrain::TerrainSample;

/// Inundation depth on the fine grid.
///
/// The terrain sample is first brought into field row order. Cells are
/// then NaN where the terrain has no data, where the water level is NaN
/// (masked or undefined) or where the ground stands above the water.
/// Every remaining value is `>= 0`.
///
/// # Errors
/// [`Error::GridMismatch`] when the terrain sample and field shapes differ.
pub fn inundation_depth(water: &Array2<f64>, terrain: TerrainSample) -> Result<Array2<f64>> {
    if terrain.shape() != water.dim() {
        let (source_rows, source_cols) = terrain.shape();
        let (target_rows, target_cols) = water.dim();
        return Err(Error::GridMismatch {
            source_rows,
            source_cols,
            target_rows,
            target_cols,
            reason: "terrain sample does not match the water-level field".into(),
        });
    }

    let terrain = terrain.into_grid_convention();
    Ok(Zip::from(water)
        .and(&terrain.elevation)
        .and(&terrain.valid)
        .map_collect(|&level, &ground, &valid| {
            if !valid || !ground.is_finite() || level.is_nan() {
                return f64::NAN;
            }
            let depth = level - ground;
            if depth < 0.0 {
                f64::NAN
            } else {
                depth
            }
        }))
}
