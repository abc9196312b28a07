//! Orientation-aware strip packing of long-wall panels.
//!
//! Packing happens in a frame rotated so the panel length axis is local X;
//! strips stack along local Y spaced by the pillar width. All published
//! corners are world-frame.

use serde::{Deserialize, Serialize};

use crate::cancel::RunControl;
use crate::error::{Error, Warning};
use crate::geometry::{
    distance_to_boundary, point_in_polygon, polygon_centroid, polygon_extents, rects_overlap,
    rotate_about, Point, Rect,
};
use crate::grid::{round1, ScalarGrid};

use super::params::{DesignParams, LockedRect, Orientation};

/// Acceptance factor: a candidate panel needs a mean grid score of at least
/// `0.6 · min_score`.
const PANEL_SCORE_FACTOR: f64 = 0.6;

const GEOM_EPS: f64 = 1e-6;

/// A long-wall panel. Corners are world coordinates, ordered counter-
/// clockwise in the packing frame starting at the minimum corner, so
/// corners 0–3 and 1–2 are the short (advance-end) edges.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Panel {
    pub id: String,
    pub center: Point,
    pub corners: [Point; 4],
    pub width: f64,
    pub length: f64,
    pub area: f64,
    pub orientation: Orientation,
    pub avg_score: f64,
    pub strip: usize,
    pub locked: bool,
}

/// The coal pillar between two neighbouring panels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pillar {
    pub id: String,
    pub corners: [Point; 4],
    pub width: f64,
    pub length: f64,
}

/// Packing output: locked panels first, then accepted strips in order.
#[derive(Debug, Clone, PartialEq)]
pub struct PackResult {
    pub panels: Vec<Panel>,
    pub pillars: Vec<Pillar>,
    pub warnings: Vec<Warning>,
}

/// World ⇄ packing-frame transform: rotate by the length-axis angle about
/// the boundary centroid.
#[derive(Debug, Clone, Copy)]
pub struct Frame {
    pivot: Point,
    angle: f64,
}

impl Frame {
    pub fn for_boundary(boundary: &[Point], angle: f64) -> Self {
        Self {
            pivot: polygon_centroid(boundary),
            angle,
        }
    }

    pub fn to_local(&self, p: Point) -> Point {
        rotate_about(p, -self.angle, self.pivot)
    }

    pub fn to_world(&self, p: Point) -> Point {
        rotate_about(p, self.angle, self.pivot)
    }
}

/// Mean of the score-grid nodes whose position falls inside the local-frame
/// rectangle, iterated in fixed row-major order. `None` when no node does.
fn mean_in_rect(grid: &ScalarGrid, frame: &Frame, rect: &Rect) -> Option<f64> {
    let mut sum = 0.0;
    let mut n = 0usize;
    for (row, col, v) in grid.defined() {
        let local = frame.to_local(grid.info.node(row, col));
        if rect.contains(local) {
            sum += v;
            n += 1;
        }
    }
    (n > 0).then(|| sum / n as f64)
}

/// A candidate must keep all corners and edge midpoints inside the boundary
/// polygon at `margin` or more from every boundary edge.
fn fits_shrunk_boundary(corners: &[Point; 4], boundary: &[Point], margin: f64) -> bool {
    let mut probes = corners.to_vec();
    for i in 0..4 {
        let a = corners[i];
        let b = corners[(i + 1) % 4];
        probes.push(Point::new((a.x + b.x) / 2.0, (a.y + b.y) / 2.0));
    }
    probes.iter().all(|&p| {
        point_in_polygon(p, boundary) && distance_to_boundary(p, boundary) >= margin - GEOM_EPS
    })
}

fn world_corners(frame: &Frame, rect: &Rect) -> [Point; 4] {
    let c = rect.corners();
    [
        frame.to_world(c[0]),
        frame.to_world(c[1]),
        frame.to_world(c[2]),
        frame.to_world(c[3]),
    ]
}

fn locked_panel(
    index: usize,
    rect: &LockedRect,
    grid: &ScalarGrid,
    frame: &Frame,
    orientation: Orientation,
) -> (Panel, Rect) {
    let world = Rect::from_origin(rect.x, rect.y, rect.w, rect.h);
    // Local-frame AABB of the locked rectangle, used for overlap tests.
    let local_pts: Vec<Point> = world.corners().iter().map(|&p| frame.to_local(p)).collect();
    let (min_x, max_x, min_y, max_y) = polygon_extents(&local_pts);
    let local_aabb = Rect::new(min_x, min_y, max_x, max_y);
    let avg = mean_in_rect(grid, frame, &local_aabb).unwrap_or(0.0);
    let panel = Panel {
        id: format!("L{}", index + 1),
        center: world.center(),
        corners: world.corners(),
        width: world.width().min(world.height()),
        length: world.width().max(world.height()),
        area: world.width() * world.height(),
        orientation,
        avg_score: round1(avg),
        strip: 0,
        locked: true,
    };
    (panel, local_aabb)
}

/// Strip-pack panels into the boundary. Locked panels are reproduced
/// verbatim ahead of the packed strips.
pub fn pack_panels(
    boundary: &[Point],
    grid: &ScalarGrid,
    params: &DesignParams,
    locked: &[LockedRect],
    ctl: &RunControl,
) -> Result<PackResult, Error> {
    let frame = Frame::for_boundary(boundary, params.rotation);
    let local: Vec<Point> = boundary.iter().map(|&p| frame.to_local(p)).collect();
    let (lx0, lx1, ly0, ly1) = polygon_extents(&local);

    let mut warnings = Vec::new();
    let mut panels = Vec::new();
    let mut locked_aabbs = Vec::new();
    for (i, rect) in locked.iter().enumerate() {
        let (panel, aabb) = locked_panel(i, rect, grid, &frame, params.orientation);
        panels.push(panel);
        locked_aabbs.push(aabb);
    }

    let margin = params.boundary_margin;
    let face_w = params.face_width;
    let face_l = params.face_length;
    let threshold = PANEL_SCORE_FACTOR * params.min_score;

    let mut accepted: Vec<(usize, Rect)> = Vec::new();
    if face_l > 0.0 {
        // Centre the advance span on the length axis; a full-length panel
        // starts exactly at the margin.
        let x0 = (lx0 + lx1) / 2.0 - face_l / 2.0;
        let mut y = ly0 + margin;
        let mut strip = 0usize;
        while y + face_w <= ly1 - margin + GEOM_EPS {
            ctl.checkpoint()?;
            let rect = Rect::new(x0, y, x0 + face_l, y + face_w);
            let corners = world_corners(&frame, &rect);
            let label = format!("strip {strip}");
            if !fits_shrunk_boundary(&corners, boundary, margin) {
                warnings.push(Warning::new(
                    "panel-outside",
                    format!("{label}: candidate leaves the margin-shrunk boundary"),
                ));
            } else if locked_aabbs.iter().any(|aabb| rects_overlap(&rect, aabb)) {
                warnings.push(Warning::new(
                    "panel-locked-overlap",
                    format!("{label}: candidate overlaps a locked panel"),
                ));
            } else {
                match mean_in_rect(grid, &frame, &rect) {
                    Some(avg) if avg >= threshold => {
                        let n = accepted.len() + 1;
                        panels.push(Panel {
                            id: format!("P{n}"),
                            center: frame.to_world(rect.center()),
                            corners,
                            width: face_w,
                            length: face_l,
                            area: face_w * face_l,
                            orientation: params.orientation,
                            avg_score: round1(avg),
                            strip,
                            locked: false,
                        });
                        accepted.push((strip, rect));
                    }
                    avg => {
                        warnings.push(Warning::new(
                            "panel-low-score",
                            format!(
                                "{label}: mean score {:?} below {threshold}",
                                avg.map(round1)
                            ),
                        ));
                    }
                }
            }
            y += face_w + params.pillar_width;
            strip += 1;
        }
    }

    // Pillars between panels in adjacent strips.
    let mut pillars = Vec::new();
    for pair in accepted.windows(2) {
        let ((sa, ra), (sb, _rb)) = (&pair[0], &pair[1]);
        if sb - sa != 1 {
            continue;
        }
        let rect = Rect::new(ra.min_x, ra.max_y, ra.max_x, ra.max_y + params.pillar_width);
        pillars.push(Pillar {
            id: format!("W{}", pillars.len() + 1),
            corners: world_corners(&frame, &rect),
            width: params.pillar_width,
            length: face_l,
        });
    }

    if accepted.is_empty() {
        warnings.push(Warning::new(
            "no-panels",
            "strip packing produced no panels inside the boundary",
        ));
    }

    Ok(PackResult {
        panels,
        pillars,
        warnings,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::GridInfo;
    use approx::assert_relative_eq;

    fn rect_boundary(w: f64, h: f64) -> Vec<Point> {
        vec![
            Point::new(0.0, 0.0),
            Point::new(w, 0.0),
            Point::new(w, h),
            Point::new(0.0, h),
        ]
    }

    fn constant_grid(w: f64, h: f64, value: f64) -> ScalarGrid {
        let info = GridInfo::from_extents(0.0, w, 0.0, h, 20);
        let mut g = ScalarGrid::empty(info);
        for row in 0..info.side() {
            for col in 0..info.side() {
                g.set(row, col, Some(value));
            }
        }
        g
    }

    fn params(face_w: f64, pillar_w: f64, face_l: f64) -> DesignParams {
        DesignParams {
            pillar_width: pillar_w,
            face_width: face_w,
            face_length: face_l,
            roadway_width: 4.0,
            min_score: 50.0,
            boundary_margin: 30.0,
            orientation: Orientation::Horizontal,
            rotation: 0.0,
            dip_angle: 0.0,
            dip_direction: 0.0,
        }
    }

    #[test]
    fn strip_count_saturates_the_cross_extent() {
        // 800×400 with margin 30: one 180-wide strip fits, a second would
        // cross the upper margin.
        let boundary = rect_boundary(800.0, 400.0);
        let grid = constant_grid(800.0, 400.0, 80.0);
        let result = pack_panels(
            &boundary,
            &grid,
            &params(180.0, 25.0, 740.0),
            &[],
            &RunControl::unbounded(),
        )
        .unwrap();
        assert_eq!(result.panels.len(), 1);
        let p = &result.panels[0];
        assert_relative_eq!(p.corners[0].x, 30.0);
        assert_relative_eq!(p.corners[0].y, 30.0);
        assert_relative_eq!(p.corners[2].x, 770.0);
        assert_relative_eq!(p.corners[2].y, 210.0);
        // One more strip would start at y = 235 and end at 415 > 370.
        assert!(235.0 + 180.0 > 400.0 - 30.0);
    }

    #[test]
    fn wider_area_packs_multiple_strips_with_pillars() {
        let boundary = rect_boundary(800.0, 700.0);
        let grid = constant_grid(800.0, 700.0, 80.0);
        let result = pack_panels(
            &boundary,
            &grid,
            &params(180.0, 25.0, 740.0),
            &[],
            &RunControl::unbounded(),
        )
        .unwrap();
        assert_eq!(result.panels.len(), 3);
        assert_eq!(result.pillars.len(), 2);
        // Centre-to-centre spacing equals face width + pillar width.
        let spacing = result.panels[1].center.y - result.panels[0].center.y;
        assert_relative_eq!(spacing, 205.0, epsilon = 1e-9);
        let pillar = &result.pillars[0];
        assert_relative_eq!(pillar.width, 25.0);
        assert_relative_eq!(pillar.corners[0].y, 210.0);
    }

    #[test]
    fn panels_respect_the_margin_shrunk_polygon() {
        let boundary = rect_boundary(800.0, 700.0);
        let grid = constant_grid(800.0, 700.0, 80.0);
        let result = pack_panels(
            &boundary,
            &grid,
            &params(180.0, 25.0, 740.0),
            &[],
            &RunControl::unbounded(),
        )
        .unwrap();
        for p in &result.panels {
            for c in p.corners {
                assert!(point_in_polygon(c, &boundary));
                assert!(distance_to_boundary(c, &boundary) >= 30.0 - 1e-6);
            }
        }
    }

    #[test]
    fn locked_panel_is_reproduced_and_never_overlapped() {
        let boundary = rect_boundary(800.0, 700.0);
        let grid = constant_grid(800.0, 700.0, 80.0);
        let locked = [LockedRect {
            x: 100.0,
            y: 100.0,
            w: 180.0,
            h: 100.0,
        }];
        let result = pack_panels(
            &boundary,
            &grid,
            &params(180.0, 25.0, 740.0),
            &locked,
            &RunControl::unbounded(),
        )
        .unwrap();
        let lp = &result.panels[0];
        assert!(lp.locked);
        assert_eq!(lp.corners[0], Point::new(100.0, 100.0));
        assert_eq!(lp.corners[2], Point::new(280.0, 200.0));
        let locked_rect = Rect::new(100.0, 100.0, 280.0, 200.0);
        for p in result.panels.iter().filter(|p| !p.locked) {
            let (min_x, max_x, min_y, max_y) = polygon_extents(&p.corners);
            let r = Rect::new(min_x, min_y, max_x, max_y);
            assert!(!rects_overlap(&r, &locked_rect), "panel {} overlaps lock", p.id);
        }
        assert!(result
            .warnings
            .iter()
            .any(|w| w.code == "panel-locked-overlap"));
    }

    #[test]
    fn low_score_field_yields_empty_plan_with_warning() {
        let boundary = rect_boundary(800.0, 400.0);
        let grid = constant_grid(800.0, 400.0, 10.0);
        let result = pack_panels(
            &boundary,
            &grid,
            &params(180.0, 25.0, 740.0),
            &[],
            &RunControl::unbounded(),
        )
        .unwrap();
        assert!(result.panels.is_empty());
        assert!(result.warnings.iter().any(|w| w.code == "panel-low-score"));
        assert!(result.warnings.iter().any(|w| w.code == "no-panels"));
    }

    #[test]
    fn rotated_frame_keeps_world_corners_in_boundary() {
        // 30° length axis inside a generous square.
        let boundary = rect_boundary(1000.0, 1000.0);
        let grid = constant_grid(1000.0, 1000.0, 80.0);
        let mut p = params(150.0, 25.0, 500.0);
        p.rotation = 30f64.to_radians();
        let result = pack_panels(&boundary, &grid, &p, &[], &RunControl::unbounded()).unwrap();
        assert!(!result.panels.is_empty());
        for panel in &result.panels {
            for c in panel.corners {
                assert!(point_in_polygon(c, &boundary));
            }
            // Length axis direction is 30° within tolerance.
            let d = Point::new(
                panel.corners[1].x - panel.corners[0].x,
                panel.corners[1].y - panel.corners[0].y,
            );
            let angle = d.y.atan2(d.x).to_degrees();
            assert!((angle - 30.0).abs() < 1e-6, "angle {angle}");
        }
    }

    #[test]
    fn cancellation_aborts_packing() {
        let boundary = rect_boundary(800.0, 700.0);
        let grid = constant_grid(800.0, 700.0, 80.0);
        let ctl = RunControl::unbounded();
        ctl.cancel();
        assert_eq!(
            pack_panels(&boundary, &grid, &params(180.0, 25.0, 740.0), &[], &ctl).unwrap_err(),
            Error::Cancelled
        );
    }
}
