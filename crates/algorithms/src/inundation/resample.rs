//! Bilinear raster resampling with no-data propagation
//!
//! Output cell centres are mapped onto the source pixel grid with
//! `src = (dst + 0.5) · in / out − 0.5`, clamped to the source extent.
//! An output cell is valid only when every source pixel that carries a
//! non-zero bilinear weight is valid; a single no-data neighbour
//! invalidates it rather than bleeding an average across the hole.

use crate::maybe_rayon::*;
use ndarray::Array2;
use tidewatch_core::{Error, Result};

/// Source index pair and fractional offset along one axis
#[derive(Debug, Clone, Copy)]
struct Tap {
    lo: usize,
    hi: usize,
    frac: f64,
}

fn taps(n_in: usize, n_out: usize) -> Vec<Tap> {
    let scale = n_in as f64 / n_out as f64;
    let last = (n_in - 1) as f64;
    (0..n_out)
        .map(|dst| {
            let src = ((dst as f64 + 0.5) * scale - 0.5).clamp(0.0, last);
            let lo = src.floor() as usize;
            let hi = (lo + 1).min(n_in - 1);
            Tap {
                lo,
                hi,
                frac: src - lo as f64,
            }
        })
        .collect()
}

/// Resample `values` (with per-pixel `valid` flags) to `out_shape`.
///
/// Returns the resampled values and validity. Invalid output cells hold NaN.
///
/// # Errors
/// [`Error::GridMismatch`] when the source is empty, the target shape has
/// a zero dimension, or `valid` does not match `values`.
pub fn resample_bilinear(
    values: &Array2<f64>,
    valid: &Array2<bool>,
    out_shape: (usize, usize),
) -> Result<(Array2<f64>, Array2<bool>)> {
    let (in_rows, in_cols) = values.dim();
    let (out_rows, out_cols) = out_shape;
    let mismatch = |reason: &str| Error::GridMismatch {
        source_rows: in_rows,
        source_cols: in_cols,
        target_rows: out_rows,
        target_cols: out_cols,
        reason: reason.to_string(),
    };

    if in_rows == 0 || in_cols == 0 {
        return Err(mismatch("source raster is empty"));
    }
    if out_rows == 0 || out_cols == 0 {
        return Err(mismatch("target shape has a zero dimension"));
    }
    if valid.dim() != values.dim() {
        return Err(mismatch("validity mask does not match the raster"));
    }

    let row_taps = taps(in_rows, out_rows);
    let col_taps = taps(in_cols, out_cols);

    let cells: Vec<(f64, bool)> = (0..out_rows)
        .into_par_iter()
        .flat_map(|r| {
            let rt = row_taps[r];
            col_taps
                .iter()
                .map(|ct| sample(values, valid, rt, *ct))
                .collect::<Vec<_>>()
        })
        .collect();

    let (data, mask): (Vec<f64>, Vec<bool>) = cells.into_iter().unzip();
    let data = Array2::from_shape_vec(out_shape, data).map_err(|e| Error::Other(e.to_string()))?;
    let mask = Array2::from_shape_vec(out_shape, mask).map_err(|e| Error::Other(e.to_string()))?;
    Ok((data, mask))
}

fn sample(values: &Array2<f64>, valid: &Array2<bool>, rt: Tap, ct: Tap) -> (f64, bool) {
    let corners = [
        (rt.lo, ct.lo, (1.0 - rt.frac) * (1.0 - ct.frac)),
        (rt.lo, ct.hi, (1.0 - rt.frac) * ct.frac),
        (rt.hi, ct.lo, rt.frac * (1.0 - ct.frac)),
        (rt.hi, ct.hi, rt.frac * ct.frac),
    ];

    let mut sum = 0.0;
    for (r, c, w) in corners {
        if w == 0.0 {
            continue;
        }
        let v = values[(r, c)];
        if !valid[(r, c)] || !v.is_finite() {
            return (f64::NAN, false);
        }
        sum += w * v;
    }
    (sum, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    fn all_valid(values: &Array2<f64>) -> Array2<bool> {
        Array2::from_elem(values.dim(), true)
    }

    #[test]
    fn test_identity_shape_is_exact() {
        let values = array![[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]];
        let (out, valid) = resample_bilinear(&values, &all_valid(&values), (2, 3)).unwrap();
        assert_eq!(out, values);
        assert!(valid.iter().all(|&v| v));
    }

    #[test]
    fn test_downsample_by_two_averages_blocks() {
        let values = Array2::from_shape_fn((4, 4), |(r, c)| (r * 4 + c) as f64);
        let (out, _) = resample_bilinear(&values, &all_valid(&values), (2, 2)).unwrap();
        // Output centre (0, 0) lands at source (0.5, 0.5)
        assert_abs_diff_eq!(out[(0, 0)], (0.0 + 1.0 + 4.0 + 5.0) / 4.0, epsilon = 1e-12);
        assert_abs_diff_eq!(out[(1, 1)], (10.0 + 11.0 + 14.0 + 15.0) / 4.0, epsilon = 1e-12);
    }

    #[test]
    fn test_linear_ramp_is_preserved_when_upsampling() {
        let values = Array2::from_shape_fn((3, 5), |(_, c)| 2.0 * c as f64);
        let (out, _) = resample_bilinear(&values, &all_valid(&values), (3, 10)).unwrap();
        // Interior output columns sample a linear ramp; edges are clamped.
        for c in 1..9 {
            let src = (c as f64 + 0.5) * 0.5 - 0.5;
            assert_abs_diff_eq!(out[(1, c)], 2.0 * src, epsilon = 1e-12);
        }
        assert_abs_diff_eq!(out[(0, 0)], 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(out[(0, 9)], 8.0, epsilon = 1e-12);
    }

    #[test]
    fn test_nodata_invalidates_every_touching_cell() {
        let values = Array2::from_elem((4, 4), 1.0);
        let mut valid = all_valid(&values);
        valid[(0, 0)] = false;
        let (out, mask) = resample_bilinear(&values, &valid, (2, 2)).unwrap();
        assert!(!mask[(0, 0)]);
        assert!(out[(0, 0)].is_nan());
        assert!(mask[(0, 1)] && mask[(1, 0)] && mask[(1, 1)]);
        assert_eq!(out[(1, 1)], 1.0);
    }

    #[test]
    fn test_nan_values_count_as_nodata() {
        let values = array![[1.0, f64::NAN], [1.0, 1.0]];
        let (_, mask) = resample_bilinear(&values, &all_valid(&values), (2, 2)).unwrap();
        assert!(!mask[(0, 1)]);
        assert!(mask[(1, 0)]);
    }

    #[test]
    fn test_degenerate_shapes_are_grid_mismatch() {
        let empty = Array2::<f64>::zeros((0, 3));
        let r = resample_bilinear(&empty, &Array2::from_elem((0, 3), true), (2, 2));
        assert!(matches!(r, Err(Error::GridMismatch { .. })));

        let values = Array2::<f64>::zeros((2, 2));
        let r = resample_bilinear(&values, &all_valid(&values), (0, 4));
        assert!(matches!(r, Err(Error::GridMismatch { .. })));

        let r = resample_bilinear(&values, &Array2::from_elem((3, 2), true), (2, 2));
        assert!(matches!(r, Err(Error::GridMismatch { .. })));
    }
}
