//! Weighted suitability scoring: per-borehole scores, four IDW grids with
//! shared geometry, per-grid statistics, and iso-contour sets.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::cancel::RunControl;
use crate::contour::{extract_contours, ContourSet};
use crate::error::{Error, Warning};
use crate::geology::Borehole;
use crate::geometry::{polygon_extents, Point};
use crate::grid::{round1, GridInfo, ScalarGrid};
use crate::interpolate::{idw_grid, Sample};

use super::policy::ScorePolicy;

/// Iso-levels published for every score grid.
pub const CONTOUR_LEVELS: [f64; 7] = [30.0, 40.0, 50.0, 60.0, 70.0, 80.0, 90.0];

// Histogram bucket edges: low < 40 ≤ medium < 70 ≤ high.
const BUCKET_LOW: f64 = 40.0;
const BUCKET_HIGH: f64 = 70.0;

/// Dimension weights. Zero disables a dimension; all-zero means equal.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Weights {
    pub safety: f64,
    pub economic: f64,
    pub env: f64,
}

impl Default for Weights {
    fn default() -> Self {
        Self {
            safety: 1.0,
            economic: 1.0,
            env: 1.0,
        }
    }
}

impl Weights {
    /// Non-negative weights normalised to sum 1; equal weights when all zero.
    fn normalised(&self) -> (f64, f64, f64) {
        let s = self.safety.max(0.0);
        let e = self.economic.max(0.0);
        let v = self.env.max(0.0);
        let total = s + e + v;
        if total == 0.0 {
            (1.0 / 3.0, 1.0 / 3.0, 1.0 / 3.0)
        } else {
            (s / total, e / total, v / total)
        }
    }
}

/// Which score grid drives the layout planner.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScoreMode {
    Safety,
    Economic,
    Env,
    #[default]
    Composite,
}

impl FromStr for ScoreMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Error> {
        match s {
            "safety" => Ok(ScoreMode::Safety),
            "economic" => Ok(ScoreMode::Economic),
            "env" => Ok(ScoreMode::Env),
            "composite" => Ok(ScoreMode::Composite),
            other => Err(Error::InvalidMode(other.to_string())),
        }
    }
}

/// All four scores of one borehole, rounded to 0.1 for output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoreholeScore {
    pub id: String,
    pub safety: f64,
    pub economic: f64,
    pub env: f64,
    pub composite: f64,
}

/// Defined-cell statistics of one score grid.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridStats {
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub low: usize,
    pub medium: usize,
    pub high: usize,
}

impl GridStats {
    fn of(grid: &ScalarGrid) -> Self {
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        let mut sum = 0.0;
        let (mut low, mut medium, mut high) = (0, 0, 0);
        let mut n = 0usize;
        for (_, _, v) in grid.defined() {
            min = min.min(v);
            max = max.max(v);
            sum += v;
            n += 1;
            if v < BUCKET_LOW {
                low += 1;
            } else if v < BUCKET_HIGH {
                medium += 1;
            } else {
                high += 1;
            }
        }
        if n == 0 {
            return Self {
                min: 0.0,
                max: 0.0,
                mean: 0.0,
                low: 0,
                medium: 0,
                high: 0,
            };
        }
        Self {
            min,
            max,
            mean: round1(sum / n as f64),
            low,
            medium,
            high,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreGrids {
    pub safety: ScalarGrid,
    pub economic: ScalarGrid,
    pub env: ScalarGrid,
    pub composite: ScalarGrid,
}

impl ScoreGrids {
    pub fn select(&self, mode: ScoreMode) -> &ScalarGrid {
        match mode {
            ScoreMode::Safety => &self.safety,
            ScoreMode::Economic => &self.economic,
            ScoreMode::Env => &self.env,
            ScoreMode::Composite => &self.composite,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreContours {
    pub safety: ContourSet,
    pub economic: ContourSet,
    pub env: ContourSet,
    pub composite: ContourSet,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreStats {
    pub safety: GridStats,
    pub economic: GridStats,
    pub env: GridStats,
    pub composite: GridStats,
}

impl ScoreStats {
    pub fn select(&self, mode: ScoreMode) -> GridStats {
        match mode {
            ScoreMode::Safety => self.safety,
            ScoreMode::Economic => self.economic,
            ScoreMode::Env => self.env,
            ScoreMode::Composite => self.composite,
        }
    }
}

/// Full scoring result for one request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreBundle {
    pub per_borehole: Vec<BoreholeScore>,
    pub grids: ScoreGrids,
    pub contours: ScoreContours,
    pub stats: ScoreStats,
    pub weights: Weights,
    pub resolution: usize,
    pub boundary: Vec<Point>,
    pub warnings: Vec<Warning>,
}

/// Raw (unrounded) per-borehole scores feeding the grid interpolation.
struct RawScores {
    safety: f64,
    economic: f64,
    env: f64,
    composite: f64,
}

fn raw_scores(b: &Borehole, weights: &Weights, policy: &dyn ScorePolicy) -> RawScores {
    let (ws, we, wv) = weights.normalised();
    let safety = policy.safety(b).clamp(0.0, 100.0);
    let economic = policy.economic(b).clamp(0.0, 100.0);
    let env = policy.environment(b).clamp(0.0, 100.0);
    RawScores {
        safety,
        economic,
        env,
        composite: safety * ws + economic * we + env * wv,
    }
}

fn field_grid(
    info: GridInfo,
    boundary: &[Point],
    boreholes: &[Borehole],
    value: impl Fn(usize) -> f64,
    ctl: &RunControl,
) -> Result<ScalarGrid, Error> {
    let samples: Vec<Sample> = boreholes
        .iter()
        .enumerate()
        .filter(|(i, _)| value(*i).is_finite())
        .map(|(i, b)| Sample::new(b.x, b.y, value(i)))
        .collect();
    Ok(idw_grid(info, boundary, &samples, ctl)?.rounded_tenths())
}

/// Score every borehole, interpolate the four grids, and derive statistics
/// and contour sets. The four grids share one geometry.
pub fn score_bundle(
    boundary: &[Point],
    boreholes: &[Borehole],
    weights: Weights,
    resolution: usize,
    policy: &dyn ScorePolicy,
    ctl: &RunControl,
) -> Result<ScoreBundle, Error> {
    if boreholes.is_empty() {
        return Err(Error::NoBoreholes);
    }
    ctl.checkpoint()?;

    let raw: Vec<RawScores> = boreholes
        .iter()
        .map(|b| raw_scores(b, &weights, policy))
        .collect();

    let per_borehole = boreholes
        .iter()
        .zip(&raw)
        .map(|(b, r)| BoreholeScore {
            id: b.id.clone(),
            safety: round1(r.safety),
            economic: round1(r.economic),
            env: round1(r.env),
            composite: round1(r.composite),
        })
        .collect();

    let (min_x, max_x, min_y, max_y) = polygon_extents(boundary);
    let info = GridInfo::from_extents(min_x, max_x, min_y, max_y, resolution);

    let grids = ScoreGrids {
        safety: field_grid(info, boundary, boreholes, |i| raw[i].safety, ctl)?,
        economic: field_grid(info, boundary, boreholes, |i| raw[i].economic, ctl)?,
        env: field_grid(info, boundary, boreholes, |i| raw[i].env, ctl)?,
        composite: field_grid(info, boundary, boreholes, |i| raw[i].composite, ctl)?,
    };

    let contours = ScoreContours {
        safety: extract_contours(&grids.safety, &CONTOUR_LEVELS, ctl)?,
        economic: extract_contours(&grids.economic, &CONTOUR_LEVELS, ctl)?,
        env: extract_contours(&grids.env, &CONTOUR_LEVELS, ctl)?,
        composite: extract_contours(&grids.composite, &CONTOUR_LEVELS, ctl)?,
    };

    let stats = ScoreStats {
        safety: GridStats::of(&grids.safety),
        economic: GridStats::of(&grids.economic),
        env: GridStats::of(&grids.env),
        composite: GridStats::of(&grids.composite),
    };

    let mut warnings = Vec::new();
    if grids.composite.defined_count() == 0 {
        warnings.push(Warning::new(
            "empty-score-grid",
            "no grid node falls inside the boundary polygon",
        ));
    }

    Ok(ScoreBundle {
        per_borehole,
        grids,
        contours,
        stats,
        weights,
        resolution,
        boundary: boundary.to_vec(),
        warnings,
    })
}
