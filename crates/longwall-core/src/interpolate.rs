//! Inverse-distance weighting of scattered borehole values onto a grid,
//! masked by the mining-area polygon.
//!
//! Power is fixed at 2. A query within `IDW_EPSILON` of a sample returns the
//! sample's value exactly, so grid nodes that coincide with boreholes honour
//! the measured value and the weighted sum never divides by zero.

use crate::cancel::RunControl;
use crate::error::Error;
use crate::geometry::{point_in_polygon, Point};
use crate::grid::{GridInfo, ScalarGrid};

#[cfg(feature = "threading")]
use rayon::prelude::*;

pub const IDW_EPSILON: f64 = 1e-6;

/// A scattered sample contributing to one interpolated field.
#[derive(Debug, Clone, Copy)]
pub struct Sample {
    pub x: f64,
    pub y: f64,
    pub value: f64,
}

impl Sample {
    pub fn new(x: f64, y: f64, value: f64) -> Self {
        Self { x, y, value }
    }
}

/// IDW estimate at `(x, y)`. `None` when there are no samples.
pub fn idw_at(x: f64, y: f64, samples: &[Sample]) -> Option<f64> {
    if samples.is_empty() {
        return None;
    }
    let mut num = 0.0;
    let mut den = 0.0;
    for s in samples {
        let d = (x - s.x).hypot(y - s.y);
        if d < IDW_EPSILON {
            return Some(s.value);
        }
        let w = 1.0 / (d * d);
        num += s.value * w;
        den += w;
    }
    Some(num / den)
}

fn compute_row(row: usize, info: &GridInfo, boundary: &[Point], samples: &[Sample]) -> Vec<Option<f64>> {
    let y = info.y(row);
    (0..info.side())
        .map(|col| {
            let x = info.x(col);
            if !point_in_polygon(Point::new(x, y), boundary) {
                return None;
            }
            idw_at(x, y, samples)
        })
        .collect()
}

#[cfg(not(feature = "threading"))]
fn compute_rows(
    info: &GridInfo,
    boundary: &[Point],
    samples: &[Sample],
    ctl: &RunControl,
) -> Result<Vec<Vec<Option<f64>>>, Error> {
    (0..info.side())
        .map(|row| {
            ctl.checkpoint()?;
            Ok(compute_row(row, info, boundary, samples))
        })
        .collect()
}

/// Row-parallel variant. Each node is independent and rows are collected in
/// index order, so the output is bit-identical to the sequential path.
#[cfg(feature = "threading")]
fn compute_rows(
    info: &GridInfo,
    boundary: &[Point],
    samples: &[Sample],
    ctl: &RunControl,
) -> Result<Vec<Vec<Option<f64>>>, Error> {
    (0..info.side())
        .into_par_iter()
        .map(|row| {
            ctl.checkpoint()?;
            Ok(compute_row(row, info, boundary, samples))
        })
        .collect()
}

/// Interpolate `samples` onto every node of `info`, masking nodes outside the
/// boundary polygon. Values are full precision; callers round for exposure.
pub fn idw_grid(
    info: GridInfo,
    boundary: &[Point],
    samples: &[Sample],
    ctl: &RunControl,
) -> Result<ScalarGrid, Error> {
    let rows = compute_rows(&info, boundary, samples, ctl)?;
    Ok(ScalarGrid::from_rows(info, rows))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn square(side: f64) -> Vec<Point> {
        vec![
            Point::new(0.0, 0.0),
            Point::new(side, 0.0),
            Point::new(side, side),
            Point::new(0.0, side),
        ]
    }

    #[test]
    fn exact_at_sample_locations() {
        let samples = vec![Sample::new(20.0, 20.0, 7.5), Sample::new(80.0, 80.0, 2.5)];
        assert_eq!(idw_at(20.0, 20.0, &samples), Some(7.5));
        // Within epsilon still snaps to the measured value.
        assert_eq!(idw_at(20.0 + 1e-7, 20.0, &samples), Some(7.5));
    }

    #[test]
    fn weighted_mean_between_samples() {
        let samples = vec![Sample::new(0.0, 0.0, 0.0), Sample::new(10.0, 0.0, 10.0)];
        // Equidistant: plain mean.
        assert_relative_eq!(idw_at(5.0, 0.0, &samples).unwrap(), 5.0);
        // Closer to the second sample: pulled toward 10.
        assert!(idw_at(8.0, 0.0, &samples).unwrap() > 5.0);
    }

    #[test]
    fn grid_masks_outside_cells() {
        let boundary = square(100.0);
        let info = GridInfo::from_extents(-50.0, 150.0, -50.0, 150.0, 10);
        let samples = vec![Sample::new(50.0, 50.0, 3.0)];
        let grid = idw_grid(info, &boundary, &samples, &RunControl::unbounded()).unwrap();
        for (row, col, _) in grid.defined() {
            let p = info.node(row, col);
            assert!(point_in_polygon(p, &boundary), "defined node outside boundary at {p:?}");
        }
        // Node at (-50, -50) is outside.
        assert_eq!(grid.value(0, 0), None);
    }

    #[test]
    fn single_sample_gives_constant_field() {
        let boundary = square(100.0);
        let info = GridInfo::from_extents(0.0, 100.0, 0.0, 100.0, 10);
        let samples = vec![Sample::new(50.0, 50.0, 3.0)];
        let grid = idw_grid(info, &boundary, &samples, &RunControl::unbounded()).unwrap();
        for (_, _, v) in grid.defined() {
            assert_relative_eq!(v, 3.0);
        }
        assert!(grid.defined_count() > 0);
    }

    #[test]
    fn no_samples_yields_all_no_data() {
        let boundary = square(100.0);
        let info = GridInfo::from_extents(0.0, 100.0, 0.0, 100.0, 5);
        let grid = idw_grid(info, &boundary, &[], &RunControl::unbounded()).unwrap();
        assert_eq!(grid.defined_count(), 0);
    }

    #[test]
    fn cancelled_grid_emits_no_result() {
        let boundary = square(100.0);
        let info = GridInfo::from_extents(0.0, 100.0, 0.0, 100.0, 50);
        let ctl = RunControl::unbounded();
        ctl.cancel();
        let err = idw_grid(info, &boundary, &[Sample::new(1.0, 1.0, 1.0)], &ctl).unwrap_err();
        assert_eq!(err, Error::Cancelled);
    }
}
