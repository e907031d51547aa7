//! Sparse output records

use serde::{Deserialize, Serialize};
use tidewatch_core::{Error, Grid, Result};

/// One flooded grid node.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InundationRecord {
    pub lon: f64,
    pub lat: f64,
    /// Water depth above ground, `>= 0`
    pub depth: f64,
    /// `depth / max_display_depth`, clamped to `[0, 1]`
    pub intensity: f64,
}

/// Flatten a depth field into records, skipping NaN cells.
///
/// Records follow the flat node order of `grid`.
pub fn to_records(
    grid: &Grid,
    depth: &ndarray::Array2<f64>,
    max_display_depth: f64,
) -> Result<Vec<InundationRecord>> {
    if !(max_display_depth.is_finite() && max_display_depth > 0.0) {
        return Err(Error::invalid_parameter(
            "max_display_depth",
            max_display_depth,
            "must be positive",
        ));
    }

    let values = grid.flatten(depth)?;
    Ok(values
        .into_iter()
        .enumerate()
        .filter(|(_, d)| !d.is_nan())
        .map(|(k, depth)| {
            let (lon, lat) = grid.node(k);
            InundationRecord {
                lon,
                lat,
                depth,
                intensity: (depth / max_display_depth).clamp(0.0, 1.0),
            }
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    #[test]
    fn test_skips_nan_and_normalizes_intensity() {
        let grid = Grid::new(vec![-81.1, -81.0], vec![32.0, 32.1]).unwrap();
        let depth = array![[2.5, f64::NAN], [f64::NAN, 14.0]];
        let records = to_records(&grid, &depth, 10.0).unwrap();
        assert_eq!(records.len(), 2);

        assert_eq!((records[0].lon, records[0].lat), (-81.1, 32.0));
        assert_abs_diff_eq!(records[0].intensity, 0.25, epsilon = 1e-12);

        assert_eq!((records[1].lon, records[1].lat), (-81.0, 32.1));
        assert_eq!(records[1].depth, 14.0);
        assert_eq!(records[1].intensity, 1.0);
    }

    #[test]
    fn test_all_nan_gives_no_records() {
        let grid = Grid::new(vec![0.0, 1.0], vec![0.0]).unwrap();
        let depth = array![[f64::NAN, f64::NAN]];
        assert!(to_records(&grid, &depth, 10.0).unwrap().is_empty());
    }

    #[test]
    fn test_rejects_bad_display_depth_and_shape() {
        let grid = Grid::new(vec![0.0, 1.0], vec![0.0]).unwrap();
        assert!(to_records(&grid, &array![[1.0, 1.0]], 0.0).is_err());
        assert!(to_records(&grid, &array![[1.0], [1.0]], 10.0).is_err());
    }

    #[test]
    fn test_serializes_as_flat_object() {
        let record = InundationRecord {
            lon: -81.0,
            lat: 32.0,
            depth: 1.5,
            intensity: 0.15,
        };
        let json = serde_json::to_value(record).unwrap();
        assert_eq!(json["depth"], 1.5);
        assert_eq!(json["lon"], -81.0);
    }
}
