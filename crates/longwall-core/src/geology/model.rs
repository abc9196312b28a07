//! Gridded seam model: top/bottom elevation surfaces, thickness, and the
//! least-squares seam plane.

use serde::{Deserialize, Serialize};

use crate::cancel::RunControl;
use crate::error::{Error, Warning};
use crate::geometry::{polygon_extents, Point};
use crate::grid::{GridInfo, ScalarGrid};
use crate::interpolate::{idw_grid, Sample};

use super::borehole::{resolve_borehole, Borehole, BoreholeInput, SeamSelection};

/// Determinant threshold below which the plane fit degenerates to a
/// horizontal plane through the mean elevation.
const PLANE_FIT_DET_EPS: f64 = 1e-10;

const DEFAULT_AVG_THICKNESS: f64 = 3.0;
const DEFAULT_AVG_DEPTH: f64 = 400.0;

/// Min/max/mean over the defined cells of one grid.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FieldStats {
    pub min: f64,
    pub max: f64,
    pub mean: f64,
}

impl FieldStats {
    fn of(grid: &ScalarGrid) -> Option<Self> {
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        let mut sum = 0.0;
        let mut n = 0usize;
        for (_, _, v) in grid.defined() {
            min = min.min(v);
            max = max.max(v);
            sum += v;
            n += 1;
        }
        (n > 0).then(|| Self {
            min,
            max,
            mean: sum / n as f64,
        })
    }
}

/// The gridded geological model of the selected coal seam. Azimuths are
/// degrees in `[0, 360)`, dip in `[0, 90]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeologyModel {
    pub top_grid: ScalarGrid,
    pub bottom_grid: ScalarGrid,
    pub thickness_grid: ScalarGrid,
    pub strike: f64,
    pub dip_direction: f64,
    pub dip_angle: f64,
    pub avg_thickness: f64,
    pub avg_depth: f64,
    pub min_depth: f64,
    pub max_depth: f64,
    pub thickness_field: Option<FieldStats>,
    pub grid_info: GridInfo,
    pub warnings: Vec<Warning>,
}

/// Reject boundaries with fewer than 3 vertices or non-finite coordinates.
pub fn validate_boundary(boundary: &[Point]) -> Result<(), Error> {
    if boundary.len() < 3 {
        return Err(Error::InvalidBoundary(format!(
            "{} vertices, need at least 3",
            boundary.len()
        )));
    }
    if let Some(p) = boundary.iter().find(|p| !p.x.is_finite() || !p.y.is_finite()) {
        return Err(Error::InvalidBoundary(format!(
            "non-finite vertex ({}, {})",
            p.x, p.y
        )));
    }
    Ok(())
}

/// Least-squares fit of `z = a·x + b·y + c` through the 3×3 normal
/// equations, solved by Cramer's rule. Near-singular systems fall back to
/// the horizontal plane through the mean elevation.
fn fit_plane(points: &[(f64, f64, f64)]) -> (f64, f64, f64) {
    let n = points.len() as f64;
    if points.is_empty() {
        return (0.0, 0.0, 0.0);
    }
    let (mut sxx, mut sxy, mut syy, mut sx, mut sy) = (0.0, 0.0, 0.0, 0.0, 0.0);
    let (mut sxz, mut syz, mut sz) = (0.0, 0.0, 0.0);
    for &(x, y, z) in points {
        sxx += x * x;
        sxy += x * y;
        syy += y * y;
        sx += x;
        sy += y;
        sxz += x * z;
        syz += y * z;
        sz += z;
    }
    let det = sxx * (syy * n - sy * sy) - sxy * (sxy * n - sy * sx) + sx * (sxy * sy - syy * sx);
    if det.abs() < PLANE_FIT_DET_EPS {
        return (0.0, 0.0, sz / n);
    }
    let det_a =
        sxz * (syy * n - sy * sy) - sxy * (syz * n - sy * sz) + sx * (syz * sy - syy * sz);
    let det_b =
        sxx * (syz * n - sy * sz) - sxz * (sxy * n - sy * sx) + sx * (sxy * sz - syz * sx);
    let det_c =
        sxx * (syy * sz - syz * sy) - sxy * (sxy * sz - syz * sx) + sxz * (sxy * sy - syy * sx);
    (det_a / det, det_b / det, det_c / det)
}

/// Strike, dip direction and dip angle (degrees) from the fitted gradient.
/// Dip direction is the planar azimuth (counter-clockwise from +X) of the
/// steepest-descent vector `(−a, −b)` of the elevation plane.
fn orientation_from_gradient(a: f64, b: f64) -> (f64, f64, f64) {
    let dip_angle = (a * a + b * b).sqrt().atan().to_degrees();
    if a == 0.0 && b == 0.0 {
        // Horizontal plane: azimuths are unconstrained but must be stable.
        return (90.0, 0.0, 0.0);
    }
    let dip_direction = (-b).atan2(-a).to_degrees().rem_euclid(360.0);
    let strike = (dip_direction + 90.0).rem_euclid(360.0);
    (strike, dip_direction, dip_angle)
}

/// Build the full geological model plus the resolved borehole set consumed
/// by the scoring stage.
pub fn build_geology(
    boundary: &[Point],
    inputs: &[BoreholeInput],
    resolution: usize,
    selection: &SeamSelection,
    coal_markers: &[String],
    ctl: &RunControl,
) -> Result<(GeologyModel, Vec<Borehole>), Error> {
    validate_boundary(boundary)?;
    if inputs.is_empty() {
        return Err(Error::NoBoreholes);
    }
    ctl.checkpoint()?;

    let mut warnings = Vec::new();
    let mut boreholes = Vec::with_capacity(inputs.len());
    for input in inputs {
        if !input.x.is_finite() || !input.y.is_finite() {
            warnings.push(Warning::new(
                "invalid-borehole",
                format!("borehole {} has non-finite coordinates and was skipped", input.id),
            ));
            continue;
        }
        boreholes.push(resolve_borehole(input, selection, coal_markers)?);
    }
    if boreholes.is_empty() {
        return Err(Error::NoValidBorehole(
            "all boreholes have non-finite coordinates".into(),
        ));
    }
    if boreholes.len() < 3 {
        warnings.push(Warning::new(
            "few-boreholes",
            format!(
                "{} borehole(s); at least 3 are recommended for a stable model",
                boreholes.len()
            ),
        ));
    }
    if boreholes.iter().all(|b| b.top_elevation.is_none() && b.bottom_elevation.is_none()) {
        return Err(Error::NoValidBorehole(
            "no borehole carries seam elevation data".into(),
        ));
    }

    let (min_x, max_x, min_y, max_y) = polygon_extents(boundary);
    let info = GridInfo::from_extents(min_x, max_x, min_y, max_y, resolution);

    let top_samples: Vec<Sample> = boreholes
        .iter()
        .filter_map(|b| b.top_elevation.map(|v| Sample::new(b.x, b.y, v)))
        .collect();
    let bottom_samples: Vec<Sample> = boreholes
        .iter()
        .filter_map(|b| b.bottom_elevation.map(|v| Sample::new(b.x, b.y, v)))
        .collect();

    let top_grid = idw_grid(info, boundary, &top_samples, ctl)?.rounded_tenths();
    let bottom_grid = idw_grid(info, boundary, &bottom_samples, ctl)?.rounded_tenths();

    // Thickness from the exposed (rounded) surfaces so the published
    // identity |top − bottom| holds exactly.
    let mut thickness_grid = ScalarGrid::empty(info);
    for row in 0..info.side() {
        for col in 0..info.side() {
            if let (Some(t), Some(b)) = (top_grid.value(row, col), bottom_grid.value(row, col)) {
                thickness_grid.set(row, col, Some((t - b).abs()));
            }
        }
    }

    let fit_points: Vec<(f64, f64, f64)> = boreholes
        .iter()
        .filter_map(|b| b.top_elevation.map(|z| (b.x, b.y, z)))
        .collect();
    let (a, b, _c) = fit_plane(&fit_points);
    let (strike, dip_direction, dip_angle) = orientation_from_gradient(a, b);

    let thicknesses: Vec<f64> = boreholes
        .iter()
        .map(|b| b.coal_thickness)
        .filter(|&t| t > 0.0)
        .collect();
    let avg_thickness = if thicknesses.is_empty() {
        DEFAULT_AVG_THICKNESS
    } else {
        thicknesses.iter().sum::<f64>() / thicknesses.len() as f64
    };

    let depths: Vec<f64> = boreholes
        .iter()
        .filter_map(|b| b.depth.or_else(|| b.top_elevation.map(f64::abs)))
        .collect();
    let (avg_depth, min_depth, max_depth) = if depths.is_empty() {
        (DEFAULT_AVG_DEPTH, DEFAULT_AVG_DEPTH, DEFAULT_AVG_DEPTH)
    } else {
        (
            depths.iter().sum::<f64>() / depths.len() as f64,
            depths.iter().cloned().fold(f64::INFINITY, f64::min),
            depths.iter().cloned().fold(f64::NEG_INFINITY, f64::max),
        )
    };

    let thickness_field = FieldStats::of(&thickness_grid);

    Ok((
        GeologyModel {
            top_grid,
            bottom_grid,
            thickness_grid,
            strike,
            dip_direction,
            dip_angle,
            avg_thickness,
            avg_depth,
            min_depth,
            max_depth,
            thickness_field,
            grid_info: info,
            warnings,
        },
        boreholes,
    ))
}
