//! Terrain fusion
//!
//! Turns a refined water-level field into inundation depth:
//! 1. read terrain resampled to the fine grid shape ([`TerrainSource`])
//! 2. align terrain rows and columns with the field ([`TerrainSample::into_grid_convention`])
//! 3. difference and discard dry or undefined cells ([`inundation_depth`])
//! 4. emit sparse records ([`to_records`])

mod depth;
mod records;
mod resample;
mod terrain;

pub use depth::inundation_depth;
pub use records::{to_records, InundationRecord};
pub use resample::resample_bilinear;
pub use terrain::{
    extent_covers, ColumnOrder, RasterTerrain, RowOrder, TerrainSample, TerrainSource,
};
