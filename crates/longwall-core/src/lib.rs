//! Decision-support engine for the layout of underground coal-mining panels.
//!
//! Given a polygonal mining-area boundary, boreholes with horizon data, and
//! a weighted rule set, the pipeline produces a gridded geological model,
//! weighted suitability score fields with iso-contours, and a complete
//! mine-panel plan (panels, pillars, gateroads, cut-throughs) with
//! rule-based validation.
//!
//! Stages run strictly forward and are pure functions of their inputs:
//!
//! 1. geology — borehole resolution, seam grids, fitted seam plane
//! 2. scoring — per-borehole scores, four IDW grids, contour sets
//! 3. layout — design parameters, strip packing, roadways
//! 4. validation — pillar compliance, per-panel factor scores
//!
//! [`pipeline::Engine`] threads the stages behind a per-session cache.

pub mod cancel;
pub mod contour;
pub mod error;
pub mod geology;
pub mod geometry;
pub mod grid;
pub mod interpolate;
pub mod layout;
pub mod pipeline;
pub mod score;
pub mod validate;

pub use cancel::RunControl;
pub use contour::{extract_contours, ContourLine, ContourSet, Segment};
pub use error::{Error, Warning};
pub use geology::{
    Borehole, BoreholeAttributes, BoreholeInput, GeologyModel, Layer, SeamSelection,
};
pub use geometry::{Point, Rect, Side};
pub use grid::{GridInfo, ScalarGrid};
pub use layout::{
    DesignParams, LayoutDirection, LockedRect, Orientation, Panel, Pillar, PlanRequest, Roadway,
    RoadwayKind, UserEdits,
};
pub use pipeline::{DesignResult, Engine, GeologyRequest};
pub use score::{ScoreBundle, ScoreMode, ScorePolicy, Weights};
pub use validate::Validation;
