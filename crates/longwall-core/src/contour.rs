//! Marching-squares iso-contour extraction.
//!
//! Cells with any undefined corner are skipped. Output is raw segments in the
//! grid's world frame; no polyline stitching is attempted, consumers receive
//! `[{p, q}, …]` per level.

use serde::{Deserialize, Serialize};

use crate::cancel::RunControl;
use crate::error::Error;
use crate::geometry::Point;
use crate::grid::ScalarGrid;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub p: Point,
    pub q: Point,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContourLine {
    pub level: f64,
    pub segments: Vec<Segment>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContourSet {
    pub lines: Vec<ContourLine>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Edge {
    Bottom,
    Right,
    Top,
    Left,
}

/// Corner values of one cell: bottom-left, bottom-right, top-right, top-left.
struct Cell {
    v: [f64; 4],
    x0: f64,
    y0: f64,
    sx: f64,
    sy: f64,
}

impl Cell {
    /// Linear interpolation point where `level` crosses the edge.
    fn edge_point(&self, edge: Edge, level: f64) -> Point {
        // Endpoint values along the edge, first endpoint → second.
        let (v0, v1) = match edge {
            Edge::Bottom => (self.v[0], self.v[1]),
            Edge::Right => (self.v[1], self.v[2]),
            Edge::Top => (self.v[3], self.v[2]),
            Edge::Left => (self.v[0], self.v[3]),
        };
        let t = (level - v0) / (v1 - v0);
        match edge {
            Edge::Bottom => Point::new(self.x0 + t * self.sx, self.y0),
            Edge::Right => Point::new(self.x0 + self.sx, self.y0 + t * self.sy),
            Edge::Top => Point::new(self.x0 + t * self.sx, self.y0 + self.sy),
            Edge::Left => Point::new(self.x0, self.y0 + t * self.sy),
        }
    }

    fn crossed(&self, edge: Edge, level: f64) -> bool {
        let (v0, v1) = match edge {
            Edge::Bottom => (self.v[0], self.v[1]),
            Edge::Right => (self.v[1], self.v[2]),
            Edge::Top => (self.v[3], self.v[2]),
            Edge::Left => (self.v[0], self.v[3]),
        };
        (v0 >= level) != (v1 >= level)
    }

    fn segment(&self, a: Edge, b: Edge, level: f64) -> Segment {
        Segment {
            p: self.edge_point(a, level),
            q: self.edge_point(b, level),
        }
    }
}

const EDGES: [Edge; 4] = [Edge::Bottom, Edge::Right, Edge::Top, Edge::Left];

fn march_level(grid: &ScalarGrid, level: f64) -> Vec<Segment> {
    let info = grid.info;
    let mut segments = Vec::new();
    for i in 0..info.resolution {
        for j in 0..info.resolution {
            // All four corners must be defined, else the cell emits nothing.
            let (Some(bl), Some(br), Some(tr), Some(tl)) = (
                grid.value(i, j),
                grid.value(i, j + 1),
                grid.value(i + 1, j + 1),
                grid.value(i + 1, j),
            ) else {
                continue;
            };
            let mask = (bl >= level) as u8
                | ((br >= level) as u8) << 1
                | ((tr >= level) as u8) << 2
                | ((tl >= level) as u8) << 3;
            if mask == 0 || mask == 0b1111 {
                continue;
            }
            let cell = Cell {
                v: [bl, br, tr, tl],
                x0: info.x(j),
                y0: info.y(i),
                sx: info.step_x,
                sy: info.step_y,
            };
            match mask {
                // Saddles: all four edges cross, two segments with a fixed pairing.
                0b0101 => {
                    segments.push(cell.segment(Edge::Left, Edge::Bottom, level));
                    segments.push(cell.segment(Edge::Right, Edge::Top, level));
                }
                0b1010 => {
                    segments.push(cell.segment(Edge::Bottom, Edge::Right, level));
                    segments.push(cell.segment(Edge::Top, Edge::Left, level));
                }
                _ => {
                    // Exactly two crossed edges remain for the other 12 cases.
                    let crossed: Vec<Edge> =
                        EDGES.iter().copied().filter(|&e| cell.crossed(e, level)).collect();
                    debug_assert_eq!(crossed.len(), 2, "mask {mask:04b}");
                    segments.push(cell.segment(crossed[0], crossed[1], level));
                }
            }
        }
    }
    segments
}

/// Extract contour segments for each of `levels` over `grid`.
pub fn extract_contours(
    grid: &ScalarGrid,
    levels: &[f64],
    ctl: &RunControl,
) -> Result<ContourSet, Error> {
    let mut lines = Vec::with_capacity(levels.len());
    for &level in levels {
        ctl.checkpoint()?;
        lines.push(ContourLine {
            level,
            segments: march_level(grid, level),
        });
    }
    Ok(ContourSet { lines })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::GridInfo;

    /// z(x, y) = x + y over [0, 100]².
    fn ramp_grid(resolution: usize) -> ScalarGrid {
        let info = GridInfo::from_extents(0.0, 100.0, 0.0, 100.0, resolution);
        let mut g = ScalarGrid::empty(info);
        for row in 0..info.side() {
            for col in 0..info.side() {
                g.set(row, col, Some(info.x(col) + info.y(row)));
            }
        }
        g
    }

    #[test]
    fn diagonal_ramp_level_lies_on_iso_line() {
        let g = ramp_grid(10);
        let set = extract_contours(&g, &[50.0], &RunControl::unbounded()).unwrap();
        let line = &set.lines[0];
        assert!(!line.segments.is_empty());
        for s in &line.segments {
            for p in [s.p, s.q] {
                assert!(
                    (p.x + p.y - 50.0).abs() <= 1e-6,
                    "endpoint off the iso-line: {p:?}"
                );
            }
        }
    }

    #[test]
    fn level_outside_range_emits_nothing() {
        let g = ramp_grid(10);
        let set = extract_contours(&g, &[500.0, -10.0], &RunControl::unbounded()).unwrap();
        assert!(set.lines.iter().all(|l| l.segments.is_empty()));
    }

    #[test]
    fn cells_with_no_data_corners_are_skipped() {
        let mut g = ramp_grid(4);
        // Undefine one interior corner; its four adjacent cells go silent.
        g.set(2, 2, None);
        let with_hole = extract_contours(&g, &[100.0], &RunControl::unbounded()).unwrap();
        let full = extract_contours(&ramp_grid(4), &[100.0], &RunControl::unbounded()).unwrap();
        assert!(with_hole.lines[0].segments.len() < full.lines[0].segments.len());
    }

    #[test]
    fn saddle_emits_two_segments() {
        // One cell with high opposite corners: bl, tr ≥ level; br, tl < level.
        let info = GridInfo::from_extents(0.0, 1.0, 0.0, 1.0, 1);
        let mut g = ScalarGrid::empty(info);
        g.set(0, 0, Some(10.0));
        g.set(0, 1, Some(0.0));
        g.set(1, 1, Some(10.0));
        g.set(1, 0, Some(0.0));
        let set = extract_contours(&g, &[5.0], &RunControl::unbounded()).unwrap();
        assert_eq!(set.lines[0].segments.len(), 2);
    }

    #[test]
    fn cancellation_checked_per_level() {
        let g = ramp_grid(10);
        let ctl = RunControl::unbounded();
        ctl.cancel();
        assert_eq!(
            extract_contours(&g, &[50.0], &ctl).unwrap_err(),
            Error::Cancelled
        );
    }
}
