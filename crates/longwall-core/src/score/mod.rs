//! Suitability scoring: policy formulas, weighted composites, score grids,
//! statistics, and contour sets.

pub mod engine;
pub mod policy;

pub use engine::{
    score_bundle, BoreholeScore, GridStats, ScoreBundle, ScoreContours, ScoreGrids, ScoreMode,
    ScoreStats, Weights, CONTOUR_LEVELS,
};
pub use policy::{DefaultPolicy, ScorePolicy};
