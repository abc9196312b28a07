//! Design-parameter derivation: pillar width, face width, face length, and
//! packing orientation from the geological model, with caller overrides
//! re-clamped into the safe bands.

use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::geology::GeologyModel;
use crate::geometry::{polygon_centroid, polygon_extents, rotate_about, Point};
use crate::score::ScoreMode;

use super::roadways::Roadway;

// Empirically safe bands for the derived parameters.
const PILLAR_MIN: f64 = 20.0;
const PILLAR_MAX: f64 = 35.0;
const PILLAR_DEEP_MIN: f64 = 30.0;
const DEEP_MINING_DEPTH: f64 = 700.0;
const FACE_WIDTH_MIN: f64 = 100.0;
const FACE_WIDTH_MAX: f64 = 300.0;
const FACE_LENGTH_MAX: f64 = 2000.0;

/// Dip threshold above which the seam attitude dictates the packing frame.
const DIP_RULE_DEG: f64 = 5.0;

pub const DEFAULT_ROADWAY_WIDTH: f64 = 4.0;
pub const DEFAULT_MIN_SCORE: f64 = 50.0;
pub const DEFAULT_BOUNDARY_MARGIN: f64 = 30.0;

/// Direction of the panel length (advance) axis in the world frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    /// Advance along the X axis.
    Horizontal,
    /// Advance along the Y axis.
    Vertical,
}

/// Which structural axis the panels run along.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayoutDirection {
    /// Dip ≥ 5°: along strike; otherwise along the bounding-box long axis.
    #[default]
    Auto,
    Strike,
    Dip,
}

/// A caller-locked panel rectangle, world-axis-aligned, corner + extents.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LockedRect {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserEdits {
    pub locked_panels: Vec<LockedRect>,
    pub locked_roadways: Vec<Roadway>,
}

/// Planner inputs. Every `Option` overrides the geology-derived value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlanRequest {
    pub mode: ScoreMode,
    pub face_width: Option<f64>,
    pub pillar_width: Option<f64>,
    pub roadway_width: f64,
    pub min_score: f64,
    pub boundary_margin: f64,
    pub dip_angle: Option<f64>,
    pub dip_direction: Option<f64>,
    pub layout_direction: LayoutDirection,
    pub user_edits: UserEdits,
}

impl Default for PlanRequest {
    fn default() -> Self {
        Self {
            mode: ScoreMode::Composite,
            face_width: None,
            pillar_width: None,
            roadway_width: DEFAULT_ROADWAY_WIDTH,
            min_score: DEFAULT_MIN_SCORE,
            boundary_margin: DEFAULT_BOUNDARY_MARGIN,
            dip_angle: None,
            dip_direction: None,
            layout_direction: LayoutDirection::Auto,
            user_edits: UserEdits::default(),
        }
    }
}

/// Resolved design parameters driving packing, roadways, and validation.
/// `rotation` is the world angle (radians) of the panel length axis; the
/// packing frame is the world rotated by `−rotation` about the centroid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DesignParams {
    pub pillar_width: f64,
    pub face_width: f64,
    pub face_length: f64,
    pub roadway_width: f64,
    pub min_score: f64,
    pub boundary_margin: f64,
    pub orientation: Orientation,
    pub rotation: f64,
    pub dip_angle: f64,
    pub dip_direction: f64,
}

fn pillar_width(depth: f64, thickness: f64, dip_deg: f64, override_w: Option<f64>) -> f64 {
    let w = match override_w {
        Some(w) => w.clamp(PILLAR_MIN, PILLAR_MAX),
        None => (0.1 * depth + 2.0 * thickness + 0.2 * dip_deg).clamp(PILLAR_MIN, PILLAR_MAX),
    };
    if depth > DEEP_MINING_DEPTH {
        w.max(PILLAR_DEEP_MIN)
    } else {
        w
    }
}

fn face_width(depth: f64, thickness: f64, dip_deg: f64, override_w: Option<f64>) -> f64 {
    match override_w {
        Some(w) => w.clamp(FACE_WIDTH_MIN, FACE_WIDTH_MAX),
        None => (180.0 + 20.0 * (thickness - 3.0) - 0.05 * (depth - 400.0) - 2.0 * dip_deg)
            .clamp(FACE_WIDTH_MIN, FACE_WIDTH_MAX),
    }
}

/// Length-axis world angle in radians, folded into `[0, π)`.
fn length_axis_angle(
    direction: LayoutDirection,
    dip_deg: f64,
    dip_direction_deg: f64,
    width: f64,
    height: f64,
) -> f64 {
    let strike_rad = (dip_direction_deg + 90.0).to_radians();
    let dip_rad = dip_direction_deg.to_radians();
    let angle = match direction {
        LayoutDirection::Strike => strike_rad,
        LayoutDirection::Dip => dip_rad,
        LayoutDirection::Auto => {
            if dip_deg >= DIP_RULE_DEG {
                strike_rad
            } else if width >= height {
                0.0
            } else {
                std::f64::consts::FRAC_PI_2
            }
        }
    };
    let folded = angle.rem_euclid(std::f64::consts::PI);
    // A length axis of π is the X axis again; fold the seam exactly.
    if (folded - std::f64::consts::PI).abs() < 1e-9 {
        0.0
    } else {
        folded
    }
}

fn orientation_of(angle: f64) -> Orientation {
    use std::f64::consts::FRAC_PI_4;
    if !(FRAC_PI_4..=3.0 * FRAC_PI_4).contains(&angle) {
        Orientation::Horizontal
    } else {
        Orientation::Vertical
    }
}

/// Extent of the boundary along the length axis, measured in the packing
/// frame.
fn length_axis_extent(boundary: &[Point], rotation: f64) -> f64 {
    let pivot = polygon_centroid(boundary);
    let local: Vec<Point> = boundary
        .iter()
        .map(|&p| rotate_about(p, -rotation, pivot))
        .collect();
    let (min_x, max_x, _, _) = polygon_extents(&local);
    max_x - min_x
}

/// Derive the full parameter set. Fails with [`Error::DegenerateBoundary`]
/// when the bounding box has zero area.
pub fn derive_params(
    geo: &GeologyModel,
    boundary: &[Point],
    req: &PlanRequest,
) -> Result<DesignParams, Error> {
    let (min_x, max_x, min_y, max_y) = polygon_extents(boundary);
    let width = max_x - min_x;
    let height = max_y - min_y;
    if width <= 0.0 || height <= 0.0 {
        return Err(Error::DegenerateBoundary);
    }

    let dip_angle = req.dip_angle.unwrap_or(geo.dip_angle);
    let dip_direction = req.dip_direction.unwrap_or(geo.dip_direction);
    let depth = geo.avg_depth;
    let thickness = geo.avg_thickness;

    let rotation = length_axis_angle(req.layout_direction, dip_angle, dip_direction, width, height);
    let margin = req.boundary_margin.max(0.0);
    let face_length =
        (length_axis_extent(boundary, rotation) - 2.0 * margin).min(FACE_LENGTH_MAX).max(0.0);

    Ok(DesignParams {
        pillar_width: pillar_width(depth, thickness, dip_angle, req.pillar_width),
        face_width: face_width(depth, thickness, dip_angle, req.face_width),
        face_length,
        roadway_width: req.roadway_width,
        min_score: req.min_score,
        boundary_margin: margin,
        orientation: orientation_of(rotation),
        rotation,
        dip_angle,
        dip_direction,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn pillar_band_and_monotonicity() {
        // Shallow, thin, flat: clamps to the lower band edge.
        assert_relative_eq!(pillar_width(100.0, 2.0, 0.0, None), 20.0);
        // Reference form inside the band.
        assert_relative_eq!(pillar_width(200.0, 3.0, 10.0, None), 28.0);
        // Deeper seams need wider pillars.
        assert!(pillar_width(300.0, 3.0, 0.0, None) > pillar_width(200.0, 3.0, 0.0, None));
        // Band ceiling.
        assert_relative_eq!(pillar_width(600.0, 8.0, 20.0, None), 35.0);
    }

    #[test]
    fn deep_mining_floor_applies_to_overrides_too() {
        assert!(pillar_width(750.0, 0.5, 0.0, None) >= 30.0);
        assert_relative_eq!(pillar_width(750.0, 0.5, 0.0, Some(22.0)), 30.0);
        // Not deep: the override stands, clamped to the band.
        assert_relative_eq!(pillar_width(300.0, 3.0, 0.0, Some(22.0)), 22.0);
        assert_relative_eq!(pillar_width(300.0, 3.0, 0.0, Some(50.0)), 35.0);
    }

    #[test]
    fn face_width_reference_form() {
        assert_relative_eq!(face_width(400.0, 3.0, 0.0, None), 180.0);
        // Thicker seam widens, deeper and steeper narrow.
        assert!(face_width(400.0, 5.0, 0.0, None) > 180.0);
        assert!(face_width(700.0, 3.0, 0.0, None) < 180.0);
        assert!(face_width(400.0, 3.0, 12.0, None) < 180.0);
        assert_relative_eq!(face_width(400.0, 3.0, 0.0, Some(80.0)), 100.0);
        assert_relative_eq!(face_width(400.0, 3.0, 0.0, Some(400.0)), 300.0);
    }

    #[test]
    fn flat_seam_follows_bounding_box_long_axis() {
        let a = length_axis_angle(LayoutDirection::Auto, 0.0, 0.0, 800.0, 400.0);
        assert_relative_eq!(a, 0.0);
        assert_eq!(orientation_of(a), Orientation::Horizontal);
        let b = length_axis_angle(LayoutDirection::Auto, 0.0, 0.0, 400.0, 800.0);
        assert_relative_eq!(b, std::f64::consts::FRAC_PI_2);
        assert_eq!(orientation_of(b), Orientation::Vertical);
    }

    #[test]
    fn steep_seam_runs_along_strike() {
        // Dip toward +Y (90°): strike is the X axis.
        let a = length_axis_angle(LayoutDirection::Auto, 15.0, 90.0, 400.0, 800.0);
        assert!(a.abs() < 1e-9, "length axis {a} should fold onto the X axis");
        assert_eq!(orientation_of(a), Orientation::Horizontal);
        // Dip toward +X (0°): strike is the Y axis.
        let b = length_axis_angle(LayoutDirection::Auto, 15.0, 0.0, 800.0, 400.0);
        assert_relative_eq!(b, std::f64::consts::FRAC_PI_2, epsilon = 1e-12);
        assert_eq!(orientation_of(b), Orientation::Vertical);
    }

    #[test]
    fn length_axis_is_perpendicular_to_dip_direction() {
        for dd in [0.0, 30.0, 90.0, 135.0, 200.0, 310.0] {
            let a = length_axis_angle(LayoutDirection::Auto, 10.0, dd, 500.0, 500.0);
            let dip_rad: f64 = (dd as f64).to_radians();
            // cos of the angle between the axes is 0 for perpendicular lines.
            let cross = (a - dip_rad).cos().abs();
            assert!(cross < 1e-9, "dd={dd}: axis not perpendicular ({cross})");
        }
    }
}
