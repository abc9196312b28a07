//! Main gateroads along the boundary and per-panel cut-throughs.

use serde::{Deserialize, Serialize};

use crate::cancel::RunControl;
use crate::error::{Error, Warning};
use crate::geometry::{
    boundary_line, closest_point_on_polyline, polyline_length, Point, Side,
};
use crate::grid::{round1, ScalarGrid};

use super::packing::Panel;
use super::params::Orientation;

/// Threshold factor: a cut-through needs a sampled mean score of at least
/// `0.8 · min_score` along its trace.
const CUT_SCORE_FACTOR: f64 = 0.8;

/// Points sampled along a candidate cut-through.
const CUT_SAMPLES: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoadwayKind {
    Main,
    Transport,
    Return,
    Cut,
    Branch,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Roadway {
    pub id: String,
    pub kind: RoadwayKind,
    pub path: Vec<Point>,
    pub width: f64,
    pub length: f64,
}

impl Roadway {
    fn new(id: String, kind: RoadwayKind, path: Vec<Point>, width: f64) -> Self {
        let length = polyline_length(&path);
        Self {
            id,
            kind,
            path,
            width,
            length,
        }
    }
}

/// The two main roadways run along the boundary sides parallel to the panel
/// length axis: south + north for horizontal advance, west + east for
/// vertical. The transport main comes first.
pub fn main_roadways(boundary: &[Point], orientation: Orientation, width: f64) -> Vec<Roadway> {
    let sides = match orientation {
        Orientation::Horizontal => [Side::South, Side::North],
        Orientation::Vertical => [Side::West, Side::East],
    };
    sides
        .iter()
        .enumerate()
        .map(|(i, &side)| {
            Roadway::new(
                format!("M{}", i + 1),
                RoadwayKind::Main,
                boundary_line(boundary, side),
                width,
            )
        })
        .collect()
}

/// Mean score along the segment, sampled at `CUT_SAMPLES` equally spaced
/// points via nearest-node lookup. Undefined nodes are skipped; a fully
/// undefined trace yields `None`.
fn sampled_mean(grid: &ScalarGrid, from: Point, to: Point) -> Option<f64> {
    let mut sum = 0.0;
    let mut n = 0usize;
    for i in 0..CUT_SAMPLES {
        let t = i as f64 / (CUT_SAMPLES - 1) as f64;
        let x = from.x + t * (to.x - from.x);
        let y = from.y + t * (to.y - from.y);
        if let Some(v) = grid.value_at(x, y) {
            sum += v;
            n += 1;
        }
    }
    (n > 0).then(|| sum / n as f64)
}

/// Build the transport and return cut-throughs for every panel: straight
/// segments from the midpoints of the panel's short edges to the closest
/// points on the corresponding main roadway.
pub fn cut_throughs(
    panels: &[Panel],
    mains: &[Roadway],
    grid: &ScalarGrid,
    min_score: f64,
    width: f64,
    ctl: &RunControl,
) -> Result<(Vec<Roadway>, Vec<Warning>), Error> {
    let mut cuts = Vec::new();
    let mut warnings = Vec::new();
    if mains.len() < 2 {
        return Ok((cuts, warnings));
    }
    let threshold = CUT_SCORE_FACTOR * min_score;
    for panel in panels {
        ctl.checkpoint()?;
        // Corners are ordered [near-low, near-high, far-high, far-low] in the
        // packing frame; the short edges are (0,3) and (1,2).
        let ends = [
            (midpoint(panel.corners[0], panel.corners[3]), &mains[0], RoadwayKind::Transport, "T"),
            (midpoint(panel.corners[1], panel.corners[2]), &mains[1], RoadwayKind::Return, "R"),
        ];
        for (from, main, kind, tag) in ends {
            let to = closest_point_on_polyline(from, &main.path);
            match sampled_mean(grid, from, to) {
                Some(mean) if mean >= threshold => {
                    cuts.push(Roadway::new(
                        format!("{}-{tag}", panel.id),
                        kind,
                        vec![from, to],
                        width,
                    ));
                }
                sampled => {
                    let mean = sampled.map(round1);
                    warnings.push(Warning::new(
                        "cut-suppressed",
                        format!(
                            "cut-through {}-{tag} suppressed: mean score {mean:?} below {threshold}",
                            panel.id
                        ),
                    ));
                }
            }
        }
    }
    Ok((cuts, warnings))
}

fn midpoint(a: Point, b: Point) -> Point {
    Point::new((a.x + b.x) / 2.0, (a.y + b.y) / 2.0)
}
