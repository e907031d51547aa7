//! Regular longitude/latitude estimation grids
//!
//! Every field in tidewatch (water level, error variance, mask, depth) is an
//! `Array2<f64>` co-indexed with a [`Grid`] under one convention:
//!
//! ```text
//! field[(i, j)]  ↔  node (lon[j], lat[i])
//! shape          =  (lat.len(), lon.len())
//! flat index k   =  i * lon.len() + j
//! ```
//!
//! Rows run south to north (latitude ascending) and columns west to east.
//! Only [`Grid::nodes`], [`Grid::flatten`] and [`Grid::reshape`] translate
//! between the flat node ordering used by the covariance algebra and the 2-D
//! field layout; nothing else re-derives the ordering.

use crate::error::{Error, Result};
use crate::raster::{GeoTransform, Raster};
use ndarray::Array2;
use serde::{Deserialize, Serialize};

/// One axis of a regular grid: `start, start + step, …` up to and including `stop`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AxisSpec {
    pub start: f64,
    pub stop: f64,
    pub step: f64,
}

impl AxisSpec {
    pub fn new(start: f64, stop: f64, step: f64) -> Self {
        Self { start, stop, step }
    }

    fn validate(&self, name: &'static str) -> Result<()> {
        if !(self.start.is_finite() && self.stop.is_finite()) {
            return Err(Error::invalid_parameter(
                name,
                format!("{}..{}", self.start, self.stop),
                "axis bounds must be finite",
            ));
        }
        if !(self.step.is_finite() && self.step > 0.0) {
            return Err(Error::invalid_parameter(name, self.step, "axis step must be positive"));
        }
        if self.stop < self.start {
            return Err(Error::invalid_parameter(
                name,
                format!("{}..{}", self.start, self.stop),
                "axis stop must not precede start",
            ));
        }
        Ok(())
    }

    /// Number of nodes on this axis
    pub fn node_count(&self) -> usize {
        // Tolerance keeps `stop` when (stop - start) / step lands just under an integer.
        ((self.stop - self.start) / self.step + 1e-9).floor() as usize + 1
    }

    /// Materialize the axis coordinates
    pub fn values(&self) -> Vec<f64> {
        (0..self.node_count())
            .map(|i| self.start + i as f64 * self.step)
            .collect()
    }
}

/// Axis bounds and spacing for a lon/lat grid.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridSpec {
    pub lon: AxisSpec,
    pub lat: AxisSpec,
}

impl GridSpec {
    pub fn new(lon: AxisSpec, lat: AxisSpec) -> Self {
        Self { lon, lat }
    }

    /// Build the grid described by this spec
    pub fn build(&self) -> Result<Grid> {
        self.lon.validate("lon_axis")?;
        self.lat.validate("lat_axis")?;
        Grid::new(self.lon.values(), self.lat.values())
    }
}

/// A rectangular mesh of (lon, lat) nodes defined by two ascending axes.
#[derive(Debug, Clone, PartialEq)]
pub struct Grid {
    lon: Vec<f64>,
    lat: Vec<f64>,
}

impl Grid {
    /// Create a grid from explicit axes. Both must be non-empty, finite and
    /// strictly ascending.
    pub fn new(lon: Vec<f64>, lat: Vec<f64>) -> Result<Self> {
        check_axis("lon_axis", &lon)?;
        check_axis("lat_axis", &lat)?;
        Ok(Self { lon, lat })
    }

    /// Longitude axis (columns)
    pub fn lon(&self) -> &[f64] {
        &self.lon
    }

    /// Latitude axis (rows)
    pub fn lat(&self) -> &[f64] {
        &self.lat
    }

    /// Field shape as (rows, cols) = (n_lat, n_lon)
    pub fn shape(&self) -> (usize, usize) {
        (self.lat.len(), self.lon.len())
    }

    /// Number of nodes
    pub fn len(&self) -> usize {
        self.lat.len() * self.lon.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Flat index of node (row, col)
    #[inline]
    pub fn index(&self, row: usize, col: usize) -> usize {
        row * self.lon.len() + col
    }

    /// Coordinates (lon, lat) of the node at flat index `k`
    #[inline]
    pub fn node(&self, k: usize) -> (f64, f64) {
        let n_lon = self.lon.len();
        (self.lon[k % n_lon], self.lat[k / n_lon])
    }

    /// All node coordinates in flat order
    pub fn nodes(&self) -> Vec<(f64, f64)> {
        self.lat
            .iter()
            .flat_map(|&lat| self.lon.iter().map(move |&lon| (lon, lat)))
            .collect()
    }

    /// Verify that a field is co-indexed with this grid
    pub fn check_field(&self, field: &Array2<f64>) -> Result<()> {
        let (er, ec) = self.shape();
        let (ar, ac) = field.dim();
        if (er, ec) != (ar, ac) {
            return Err(Error::SizeMismatch { er, ec, ar, ac });
        }
        Ok(())
    }

    /// Field values in flat node order
    pub fn flatten(&self, field: &Array2<f64>) -> Result<Vec<f64>> {
        self.check_field(field)?;
        Ok(field.iter().copied().collect())
    }

    /// Arrange flat node values into a field
    pub fn reshape(&self, values: Vec<f64>) -> Result<Array2<f64>> {
        if values.len() != self.len() {
            let (er, ec) = self.shape();
            return Err(Error::SizeMismatch {
                er,
                ec,
                ar: values.len(),
                ac: 1,
            });
        }
        Array2::from_shape_vec(self.shape(), values).map_err(|e| Error::Other(e.to_string()))
    }

    /// Export a field as a north-up raster whose pixel centers are the grid nodes.
    ///
    /// Raster row 0 is the northernmost latitude, so rows are flipped
    /// relative to the field. Requires at least two nodes per axis to
    /// infer the pixel size.
    pub fn to_raster(&self, field: &Array2<f64>) -> Result<Raster<f64>> {
        self.check_field(field)?;
        let (rows, cols) = self.shape();
        if rows < 2 || cols < 2 {
            return Err(Error::InvalidDimensions {
                width: cols,
                height: rows,
            });
        }

        let dx = (self.lon[cols - 1] - self.lon[0]) / (cols - 1) as f64;
        let dy = (self.lat[rows - 1] - self.lat[0]) / (rows - 1) as f64;
        let transform = GeoTransform::new(
            self.lon[0] - dx / 2.0,
            self.lat[rows - 1] + dy / 2.0,
            dx,
            -dy,
        );

        let mut flipped = field.clone();
        flipped.invert_axis(ndarray::Axis(0));
        let data = flipped.as_standard_layout().into_owned();

        Ok(Raster::from_array(data)
            .with_transform(transform)
            .with_nodata(Some(f64::NAN)))
    }
}

fn check_axis(name: &'static str, axis: &[f64]) -> Result<()> {
    if axis.is_empty() {
        return Err(Error::invalid_parameter(name, "[]", "axis must have at least one node"));
    }
    if axis.iter().any(|v| !v.is_finite()) {
        return Err(Error::invalid_parameter(name, "non-finite", "axis values must be finite"));
    }
    if axis.windows(2).any(|w| w[1] <= w[0]) {
        return Err(Error::invalid_parameter(
            name,
            format!("{} nodes", axis.len()),
            "axis must be strictly ascending",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn small_grid() -> Grid {
        Grid::new(vec![10.0, 11.0, 12.0], vec![50.0, 51.0]).unwrap()
    }

    #[test]
    fn test_axis_spec_includes_stop() {
        let axis = AxisSpec::new(-81.2, -81.0, 0.05);
        assert_eq!(axis.node_count(), 5);
        let values = axis.values();
        assert_relative_eq!(values[4], -81.0, epsilon = 1e-12);
    }

    #[test]
    fn test_axis_spec_single_node() {
        let axis = AxisSpec::new(3.0, 3.0, 1.0);
        assert_eq!(axis.values(), vec![3.0]);
    }

    #[test]
    fn test_spec_rejects_bad_step() {
        let spec = GridSpec::new(AxisSpec::new(0.0, 1.0, 0.0), AxisSpec::new(0.0, 1.0, 0.5));
        assert!(matches!(spec.build(), Err(Error::InvalidParameter { .. })));
        let spec = GridSpec::new(AxisSpec::new(1.0, 0.0, 0.1), AxisSpec::new(0.0, 1.0, 0.5));
        assert!(spec.build().is_err());
    }

    #[test]
    fn test_grid_rejects_unsorted_axis() {
        assert!(Grid::new(vec![1.0, 0.0], vec![0.0]).is_err());
        assert!(Grid::new(vec![], vec![0.0]).is_err());
    }

    #[test]
    fn test_nodes_follow_row_major_lat_lon_order() {
        let grid = small_grid();
        let nodes = grid.nodes();
        assert_eq!(nodes.len(), 6);
        assert_eq!(nodes[0], (10.0, 50.0));
        assert_eq!(nodes[1], (11.0, 50.0));
        assert_eq!(nodes[3], (10.0, 51.0));
        for (k, node) in nodes.iter().enumerate() {
            assert_eq!(grid.node(k), *node);
        }
        assert_eq!(grid.index(1, 2), 5);
    }

    #[test]
    fn test_flatten_reshape_agree_with_nodes() {
        let grid = small_grid();
        // Encode each node's coordinates in its value so a transposition would show.
        let values: Vec<f64> = grid.nodes().iter().map(|(lon, lat)| lon * 100.0 + lat).collect();
        let field = grid.reshape(values.clone()).unwrap();
        assert_eq!(field.dim(), (2, 3));
        assert_eq!(field[(1, 2)], 12.0 * 100.0 + 51.0);
        assert_eq!(grid.flatten(&field).unwrap(), values);
    }

    #[test]
    fn test_reshape_rejects_wrong_length() {
        let grid = small_grid();
        assert!(matches!(
            grid.reshape(vec![0.0; 5]),
            Err(Error::SizeMismatch { .. })
        ));
        let transposed = Array2::<f64>::zeros((3, 2));
        assert!(grid.flatten(&transposed).is_err());
    }

    #[test]
    fn test_to_raster_flips_rows_north_up() {
        let grid = small_grid();
        let field = grid
            .reshape(grid.nodes().iter().map(|(_, lat)| *lat).collect())
            .unwrap();
        let raster = grid.to_raster(&field).unwrap();
        assert!(raster.transform().is_north_up());
        // Row 0 of the raster is the northern latitude
        assert_eq!(raster.get(0, 0).unwrap(), 51.0);
        assert_eq!(raster.get(1, 0).unwrap(), 50.0);
        // Pixel centers coincide with grid nodes
        let (lon, lat) = raster.transform().pixel_to_geo(2, 0);
        assert_relative_eq!(lon, 12.0, epsilon = 1e-12);
        assert_relative_eq!(lat, 51.0, epsilon = 1e-12);
    }
}
