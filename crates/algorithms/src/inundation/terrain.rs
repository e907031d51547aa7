//! Terrain elevation sources
//!
//! Fusion only needs one capability from a terrain store: give me the
//! elevation resampled to this shape, with a validity flag per cell, and
//! tell me which way the rows and columns run. Raster files are north-up
//! (row 0 is the northern edge) while estimation fields run south to north,
//! and a raster with a negative pixel width has column 0 at its eastern
//! edge. Both orders travel with the sample and are resolved in exactly one
//! place, [`TerrainSample::into_grid_convention`].

use std::path::Path;

use ndarray::{Array2, Axis};
use tidewatch_core::io::read_geotiff;
use tidewatch_core::{Error, Grid, Raster, RasterElement, Result};

use super::resample::resample_bilinear;

/// Direction of increasing row index in a terrain sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowOrder {
    /// Row 0 is the northern edge (north-up rasters)
    NorthToSouth,
    /// Row 0 is the southern edge (the field convention)
    SouthToNorth,
}

/// Direction of increasing column index in a terrain sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnOrder {
    /// Column 0 is the western edge (the field convention)
    WestToEast,
    /// Column 0 is the eastern edge (negative pixel width)
    EastToWest,
}

/// Elevation resampled to a requested shape.
#[derive(Debug, Clone)]
pub struct TerrainSample {
    pub elevation: Array2<f64>,
    /// `true` where the raster holds data
    pub valid: Array2<bool>,
    pub row_order: RowOrder,
    pub column_order: ColumnOrder,
}

impl TerrainSample {
    /// Sample with columns running west to east; see [`Self::with_column_order`].
    pub fn new(elevation: Array2<f64>, valid: Array2<bool>, row_order: RowOrder) -> Result<Self> {
        if elevation.dim() != valid.dim() {
            let (source_rows, source_cols) = valid.dim();
            let (target_rows, target_cols) = elevation.dim();
            return Err(Error::GridMismatch {
                source_rows,
                source_cols,
                target_rows,
                target_cols,
                reason: "validity mask does not match the elevation array".into(),
            });
        }
        Ok(Self {
            elevation,
            valid,
            row_order,
            column_order: ColumnOrder::WestToEast,
        })
    }

    pub fn with_column_order(mut self, column_order: ColumnOrder) -> Self {
        self.column_order = column_order;
        self
    }

    /// Shape as (rows, cols)
    pub fn shape(&self) -> (usize, usize) {
        self.elevation.dim()
    }

    /// Reorder rows and columns so that cell `(i, j)` matches field cell
    /// `(i, j)`: rows south to north, columns west to east.
    pub fn into_grid_convention(mut self) -> Self {
        if self.row_order == RowOrder::NorthToSouth {
            self.elevation.invert_axis(Axis(0));
            self.valid.invert_axis(Axis(0));
            self.row_order = RowOrder::SouthToNorth;
        }
        if self.column_order == ColumnOrder::EastToWest {
            self.elevation.invert_axis(Axis(1));
            self.valid.invert_axis(Axis(1));
            self.column_order = ColumnOrder::WestToEast;
        }
        self.elevation = self.elevation.as_standard_layout().into_owned();
        self.valid = self.valid.as_standard_layout().into_owned();
        self
    }
}

/// Anything that can produce terrain elevation at an arbitrary output shape.
///
/// Implementations must return a sample of exactly `out_shape`; fusion
/// reports anything else as [`Error::GridMismatch`].
pub trait TerrainSource {
    fn read(&self, out_shape: (usize, usize)) -> Result<TerrainSample>;

    /// Georeferenced extent `(min_x, min_y, max_x, max_y)`, when known
    fn extent(&self) -> Option<(f64, f64, f64, f64)> {
        None
    }
}

/// Whether `extent` contains every node of `grid`.
pub fn extent_covers(extent: (f64, f64, f64, f64), grid: &Grid) -> bool {
    const TOLERANCE: f64 = 1e-9;
    let (min_x, min_y, max_x, max_y) = extent;
    let (lon, lat) = (grid.lon(), grid.lat());
    let (west, east) = (lon[0], lon[lon.len() - 1]);
    let (south, north) = (lat[0], lat[lat.len() - 1]);
    west >= min_x - TOLERANCE
        && east <= max_x + TOLERANCE
        && south >= min_y - TOLERANCE
        && north <= max_y + TOLERANCE
}

/// In-memory terrain raster.
///
/// The whole raster is resampled onto the requested shape, so it should
/// span the fine grid extent; [`TerrainSource::extent`] lets callers check.
#[derive(Debug, Clone)]
pub struct RasterTerrain {
    raster: Raster<f64>,
}

impl RasterTerrain {
    /// Wrap a raster. Its rows must be axis-aligned with the grid.
    ///
    /// # Errors
    /// [`Error::GridMismatch`] for empty, rotated or degenerate rasters.
    pub fn new<T: RasterElement>(raster: &Raster<T>) -> Result<Self> {
        let (rows, cols) = raster.shape();
        let reject = |reason: &str| Error::GridMismatch {
            source_rows: rows,
            source_cols: cols,
            target_rows: 0,
            target_cols: 0,
            reason: reason.to_string(),
        };

        if raster.is_empty() {
            return Err(reject("terrain raster is empty"));
        }
        let transform = raster.transform();
        if transform.is_degenerate() {
            return Err(reject("terrain raster has a degenerate extent"));
        }
        if !transform.is_axis_aligned() {
            return Err(reject("rotated terrain rasters are not supported"));
        }

        Ok(Self {
            raster: raster.to_f64(),
        })
    }

    /// Load a single-band GeoTIFF
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let raster: Raster<f64> = read_geotiff(path)?;
        Self::new(&raster)
    }

    pub fn raster(&self) -> &Raster<f64> {
        &self.raster
    }

    fn row_order(&self) -> RowOrder {
        if self.raster.transform().pixel_height < 0.0 {
            RowOrder::NorthToSouth
        } else {
            RowOrder::SouthToNorth
        }
    }

    fn column_order(&self) -> ColumnOrder {
        if self.raster.transform().pixel_width < 0.0 {
            ColumnOrder::EastToWest
        } else {
            ColumnOrder::WestToEast
        }
    }
}

impl TerrainSource for RasterTerrain {
    fn read(&self, out_shape: (usize, usize)) -> Result<TerrainSample> {
        let valid = self.raster.validity_mask();
        let (elevation, valid) = resample_bilinear(self.raster.data(), &valid, out_shape)?;
        Ok(TerrainSample::new(elevation, valid, self.row_order())?
            .with_column_order(self.column_order()))
    }

    fn extent(&self) -> Option<(f64, f64, f64, f64)> {
        Some(self.raster.bounds())
    }
}
