//! # tidewatch core
//!
//! Core types, traits and I/O for the tidewatch inundation mapper.
//!
//! This crate provides:
//! - `Raster<T>`: georeferenced raster container (terrain, exported depth)
//! - `GeoTransform`: affine transformation for georeferencing
//! - `Grid` / `GridSpec`: the regular lon/lat estimation mesh and the one
//!   flatten/reshape convention every field follows
//! - the `Algorithm` trait for a consistent API
//! - native GeoTIFF I/O

pub mod error;
pub mod grid;
pub mod io;
pub mod raster;

pub use error::{Error, Result};
pub use grid::{AxisSpec, Grid, GridSpec};
pub use raster::{GeoTransform, Raster, RasterElement};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::error::{Error, Result};
    pub use crate::grid::{AxisSpec, Grid, GridSpec};
    pub use crate::raster::{GeoTransform, Raster, RasterElement};
    pub use crate::Algorithm;
}

/// Core trait for algorithms in tidewatch.
///
/// Algorithms are pure functions that transform input data according to parameters.
pub trait Algorithm {
    /// Input type for the algorithm
    type Input;
    /// Output type for the algorithm
    type Output;
    /// Parameters controlling algorithm behavior
    type Params: Default;
    /// Error type for algorithm execution
    type Error: std::error::Error;

    /// Returns the algorithm name
    fn name(&self) -> &'static str;

    /// Returns a description of what the algorithm does
    fn description(&self) -> &'static str;

    /// Execute the algorithm
    fn execute(&self, input: Self::Input, params: Self::Params) -> std::result::Result<Self::Output, Self::Error>;

    /// Execute with default parameters
    fn execute_default(&self, input: Self::Input) -> std::result::Result<Self::Output, Self::Error> {
        self.execute(input, Self::Params::default())
    }
}
