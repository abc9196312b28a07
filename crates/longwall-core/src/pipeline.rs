//! Pipeline façade: geology → scoring → layout, sharing an in-memory bundle
//! keyed by a caller-supplied session token.
//!
//! Stage order is fixed. Each call validates its preconditions, runs to
//! completion, and only then mutates the session, so errors never leave
//! partial state behind. One exclusive lock per session serialises
//! concurrent requests for the same token.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};

use crate::cancel::RunControl;
use crate::error::{Error, Warning};
use crate::geology::{
    build_geology, default_coal_markers, Borehole, BoreholeInput, GeologyModel, SeamSelection,
};
use crate::geometry::Point;
use crate::grid::{round1, GridInfo};
use crate::layout::{
    cut_throughs, derive_params, main_roadways, pack_panels, Panel, Pillar, PlanRequest, Roadway,
};
use crate::score::{
    score_bundle, DefaultPolicy, GridStats, ScoreBundle, ScoreMode, ScorePolicy, Weights,
};
use crate::validate::{validate_design, Validation, DEFAULT_PILLAR_TOLERANCE};

/// Inputs of the geology stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeologyRequest {
    pub boundary: Vec<Point>,
    pub boreholes: Vec<BoreholeInput>,
    pub resolution: usize,
    #[serde(default)]
    pub seam: SeamSelection,
    #[serde(default = "default_coal_markers")]
    pub coal_markers: Vec<String>,
}

/// The geological numbers echoed into the design result.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeologyParams {
    pub strike: f64,
    pub dip_direction: f64,
    pub dip_angle: f64,
    pub avg_thickness: f64,
    pub avg_depth: f64,
}

impl From<&GeologyModel> for GeologyParams {
    fn from(geo: &GeologyModel) -> Self {
        Self {
            strike: geo.strike,
            dip_direction: geo.dip_direction,
            dip_angle: geo.dip_angle,
            avg_thickness: geo.avg_thickness,
            avg_depth: geo.avg_depth,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DesignStats {
    pub panel_count: usize,
    pub pillar_count: usize,
    pub roadway_count: usize,
    pub total_panel_area: f64,
    pub total_roadway_length: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreSummary {
    pub mode: ScoreMode,
    pub grid: GridStats,
    pub mean_panel_score: f64,
}

/// Complete output of the layout stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DesignResult {
    pub geology_params: GeologyParams,
    pub design_params: crate::layout::DesignParams,
    pub roadways: Vec<Roadway>,
    pub panels: Vec<Panel>,
    pub pillars: Vec<Pillar>,
    pub stats: DesignStats,
    pub validation: Validation,
    pub score_summary: ScoreSummary,
    pub grid_info: GridInfo,
    pub warnings: Vec<Warning>,
}

#[derive(Default)]
struct Session {
    boundary: Vec<Point>,
    boreholes: Vec<Borehole>,
    geology: Option<GeologyModel>,
    scores: Option<ScoreBundle>,
}

/// The façade. Cheap to share; sessions are created on first use.
#[derive(Default)]
pub struct Engine {
    sessions: Mutex<HashMap<String, Arc<Mutex<Session>>>>,
}

fn lock<'a, T>(mutex: &'a Mutex<T>) -> std::sync::MutexGuard<'a, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl Engine {
    pub fn new() -> Self {
        Self::default()
    }

    fn session(&self, id: &str) -> Arc<Mutex<Session>> {
        let mut sessions = lock(&self.sessions);
        sessions.entry(id.to_string()).or_default().clone()
    }

    /// Stage 1 — build the geological model. Replaces any previous model for
    /// the session and invalidates its score bundle.
    pub fn build_geology(
        &self,
        session_id: &str,
        req: &GeologyRequest,
        ctl: &RunControl,
    ) -> Result<GeologyModel, Error> {
        let session = self.session(session_id);
        let mut session = lock(&session);
        let (model, boreholes) = build_geology(
            &req.boundary,
            &req.boreholes,
            req.resolution,
            &req.seam,
            &req.coal_markers,
            ctl,
        )?;
        session.boundary = req.boundary.clone();
        session.boreholes = boreholes;
        session.geology = Some(model.clone());
        session.scores = None;
        Ok(model)
    }

    /// Stage 2 — score the session's boreholes with the default policy.
    pub fn score(
        &self,
        session_id: &str,
        weights: Weights,
        resolution: usize,
        ctl: &RunControl,
    ) -> Result<ScoreBundle, Error> {
        self.score_with_policy(session_id, weights, resolution, &DefaultPolicy, ctl)
    }

    /// Stage 2 with a caller-supplied score policy.
    pub fn score_with_policy(
        &self,
        session_id: &str,
        weights: Weights,
        resolution: usize,
        policy: &dyn ScorePolicy,
        ctl: &RunControl,
    ) -> Result<ScoreBundle, Error> {
        let session = self.session(session_id);
        let mut session = lock(&session);
        if session.geology.is_none() {
            return Err(Error::DependencyMissing(
                "geology model not built for this session".into(),
            ));
        }
        let bundle = score_bundle(
            &session.boundary,
            &session.boreholes,
            weights,
            resolution,
            policy,
            ctl,
        )?;
        session.scores = Some(bundle.clone());
        Ok(bundle)
    }

    /// Stage 3 — plan the panel layout against the chosen score grid.
    pub fn plan(
        &self,
        session_id: &str,
        req: &PlanRequest,
        ctl: &RunControl,
    ) -> Result<DesignResult, Error> {
        let session = self.session(session_id);
        let session = lock(&session);
        let geo = session.geology.as_ref().ok_or_else(|| {
            Error::DependencyMissing("geology model not built for this session".into())
        })?;
        let scores = session.scores.as_ref().ok_or_else(|| {
            Error::DependencyMissing("score grids not built for this session".into())
        })?;

        let params = derive_params(geo, &session.boundary, req)?;
        let grid = scores.grids.select(req.mode);

        let mut warnings = Vec::new();
        let pack = pack_panels(
            &session.boundary,
            grid,
            &params,
            &req.user_edits.locked_panels,
            ctl,
        )?;
        warnings.extend(pack.warnings.iter().cloned());

        let mut roadways =
            main_roadways(&session.boundary, params.orientation, params.roadway_width);
        let (cuts, cut_warnings) = cut_throughs(
            &pack.panels,
            &roadways,
            grid,
            params.min_score,
            params.roadway_width,
            ctl,
        )?;
        roadways.extend(cuts);
        roadways.extend(req.user_edits.locked_roadways.iter().cloned());
        warnings.extend(cut_warnings);

        let validation = validate_design(
            &pack.panels,
            geo,
            &scores.grids,
            &roadways,
            &session.boreholes,
            &params,
            DEFAULT_PILLAR_TOLERANCE,
        );

        let mean_panel_score = if pack.panels.is_empty() {
            0.0
        } else {
            round1(
                pack.panels.iter().map(|p| p.avg_score).sum::<f64>() / pack.panels.len() as f64,
            )
        };
        let stats = DesignStats {
            panel_count: pack.panels.len(),
            pillar_count: pack.pillars.len(),
            roadway_count: roadways.len(),
            total_panel_area: pack.panels.iter().map(|p| p.area).sum(),
            total_roadway_length: roadways.iter().map(|r| r.length).sum(),
        };

        Ok(DesignResult {
            geology_params: GeologyParams::from(geo),
            score_summary: ScoreSummary {
                mode: req.mode,
                grid: scores.stats.select(req.mode),
                mean_panel_score,
            },
            design_params: params,
            roadways,
            panels: pack.panels,
            pillars: pack.pillars,
            stats,
            validation,
            grid_info: scores.grids.composite.info,
            warnings,
        })
    }
}
