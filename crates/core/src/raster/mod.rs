//! Raster data structures

mod buffer;
mod element;
mod geotransform;

pub use buffer::{Raster, RasterStatistics};
pub use element::RasterElement;
pub use geotransform::GeoTransform;
