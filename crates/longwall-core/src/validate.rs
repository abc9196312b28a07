//! Design validation: pillar-width compliance, per-panel multi-factor
//! scoring with veto rules, letter grades, and the overall design score.

use serde::{Deserialize, Serialize};

use crate::error::Warning;
use crate::geology::{Borehole, GeologyModel};
use crate::geometry::{closest_point_on_polyline, point_in_polygon, Point};
use crate::grid::{round1, ScalarGrid};
use crate::layout::{DesignParams, Panel, Roadway, RoadwayKind};
use crate::score::ScoreGrids;

/// Default allowed deviation between measured and designed pillar width.
pub const DEFAULT_PILLAR_TOLERANCE: f64 = 2.0;

// Factor ceilings, summing to 100.
const W_UNIFORMITY: f64 = 20.0;
const W_SAFETY: f64 = 20.0;
const W_ECONOMIC: f64 = 15.0;
const W_TECHNICAL: f64 = 15.0;
const W_EFFICIENCY: f64 = 10.0;
const W_VENTILATION: f64 = 10.0;
const W_TRANSPORT: f64 = 5.0;
const W_ENVIRONMENT: f64 = 5.0;

// Veto thresholds.
const VETO_SAFETY_FLOOR: f64 = 10.0;
const VETO_PILLAR_RATIO: f64 = 0.9;
const VETO_GAS: f64 = 15.0;
const VETO_DEPTH: f64 = 500.0;

/// Clear spacing between two neighbouring panels along the packing axis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PillarMeasurement {
    pub first: String,
    pub second: String,
    pub measured: f64,
    pub designed: f64,
    pub compliant: bool,
}

/// The eight bounded factor scores of one panel.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FactorScores {
    pub geological_uniformity: f64,
    pub safety: f64,
    pub economic: f64,
    pub technical_fit: f64,
    pub efficiency: f64,
    pub ventilation: f64,
    pub transport: f64,
    pub environmental: f64,
}

impl FactorScores {
    pub fn total(&self) -> f64 {
        self.geological_uniformity
            + self.safety
            + self.economic
            + self.technical_fit
            + self.efficiency
            + self.ventilation
            + self.transport
            + self.environmental
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PanelAssessment {
    pub panel_id: String,
    pub factors: FactorScores,
    pub total: f64,
    pub grade: String,
    pub vetoed: bool,
    pub veto_reasons: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Validation {
    pub pillar_tolerance: f64,
    pub measurements: Vec<PillarMeasurement>,
    pub assessments: Vec<PanelAssessment>,
    pub overall_score: f64,
    pub warnings: Vec<Warning>,
}

fn grade_of(total: f64) -> &'static str {
    match total {
        t if t >= 90.0 => "A+",
        t if t >= 80.0 => "A",
        t if t >= 70.0 => "B+",
        t if t >= 60.0 => "B",
        t if t >= 50.0 => "C",
        _ => "D",
    }
}

/// Mean of the grid nodes whose position falls inside the panel quad,
/// iterated in fixed row-major order.
fn mean_in_quad(grid: &ScalarGrid, corners: &[Point; 4]) -> Option<f64> {
    let quad = corners.to_vec();
    let mut sum = 0.0;
    let mut n = 0usize;
    for (row, col, v) in grid.defined() {
        if point_in_polygon(grid.info.node(row, col), &quad) {
            sum += v;
            n += 1;
        }
    }
    (n > 0).then(|| sum / n as f64)
}

/// Standard deviation of the thickness cells inside the quad, as a fraction
/// of their mean. `None` with fewer than two cells.
fn thickness_variation(grid: &ScalarGrid, corners: &[Point; 4]) -> Option<f64> {
    let quad = corners.to_vec();
    let cells: Vec<f64> = grid
        .defined()
        .filter(|&(row, col, _)| point_in_polygon(grid.info.node(row, col), &quad))
        .map(|(_, _, v)| v)
        .collect();
    if cells.len() < 2 {
        return None;
    }
    let mean = cells.iter().sum::<f64>() / cells.len() as f64;
    let var = cells.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / cells.len() as f64;
    Some(var.sqrt() / (mean.abs() + 1e-9))
}

fn measure_pillars(
    panels: &[&Panel],
    params: &DesignParams,
    tolerance: f64,
) -> Vec<PillarMeasurement> {
    // Packing axis: perpendicular to the length axis.
    let (sin, cos) = params.rotation.sin_cos();
    let axis = Point::new(-sin, cos);
    panels
        .windows(2)
        .map(|pair| {
            let (a, b) = (pair[0], pair[1]);
            let dx = b.center.x - a.center.x;
            let dy = b.center.y - a.center.y;
            let centre_spacing = (dx * axis.x + dy * axis.y).abs();
            let measured = centre_spacing - params.face_width;
            PillarMeasurement {
                first: a.id.clone(),
                second: b.id.clone(),
                measured: round1(measured),
                designed: params.pillar_width,
                compliant: (measured - params.pillar_width).abs() <= tolerance,
            }
        })
        .collect()
}

fn distance_to_mains(center: Point, roadways: &[Roadway]) -> Option<f64> {
    roadways
        .iter()
        .filter(|r| r.kind == RoadwayKind::Main)
        .map(|r| center.distance_to(closest_point_on_polyline(center, &r.path)))
        .min_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal))
}

fn cut_count(panel_id: &str, roadways: &[Roadway]) -> usize {
    let prefix = format!("{panel_id}-");
    roadways
        .iter()
        .filter(|r| {
            matches!(r.kind, RoadwayKind::Transport | RoadwayKind::Return)
                && r.id.starts_with(&prefix)
        })
        .count()
}

fn assess_panel(
    panel: &Panel,
    geo: &GeologyModel,
    grids: &ScoreGrids,
    roadways: &[Roadway],
    pillar_ratio: f64,
    mean_gas: f64,
) -> PanelAssessment {
    // Neutral defaults when a grid has no node inside the panel.
    let safety_mean = mean_in_quad(&grids.safety, &panel.corners).unwrap_or(50.0);
    let economic_mean = mean_in_quad(&grids.economic, &panel.corners).unwrap_or(50.0);
    let env_mean = mean_in_quad(&grids.env, &panel.corners).unwrap_or(50.0);

    let uniformity = match thickness_variation(&geo.thickness_grid, &panel.corners) {
        Some(cv) => W_UNIFORMITY * (1.0 - cv).clamp(0.0, 1.0),
        None => W_UNIFORMITY * 0.7,
    };
    let safety = W_SAFETY * safety_mean / 100.0;
    let economic = W_ECONOMIC * economic_mean / 100.0;
    // Sweet band for the advance-to-face aspect ratio.
    let ratio = panel.length / panel.width.max(1e-9);
    let technical_fit =
        W_TECHNICAL * ((ratio - 1.0) / 2.0).min((20.0 - ratio) / 8.0).clamp(0.0, 1.0);
    let efficiency = W_EFFICIENCY * (panel.length / 1000.0).min(1.0);
    let ventilation = match cut_count(&panel.id, roadways) {
        2 => W_VENTILATION,
        1 => W_VENTILATION * 0.6,
        _ => W_VENTILATION * 0.2,
    };
    let transport = match distance_to_mains(panel.center, roadways) {
        Some(d) => W_TRANSPORT * (1.0 - d / 1000.0).clamp(0.0, 1.0),
        None => W_TRANSPORT * 0.5,
    };
    let environmental = W_ENVIRONMENT * env_mean / 100.0;

    let factors = FactorScores {
        geological_uniformity: round1(uniformity),
        safety: round1(safety),
        economic: round1(economic),
        technical_fit: round1(technical_fit),
        efficiency: round1(efficiency),
        ventilation: round1(ventilation),
        transport: round1(transport),
        environmental: round1(environmental),
    };

    let mut veto_reasons = Vec::new();
    if factors.safety < VETO_SAFETY_FLOOR {
        veto_reasons.push("safety-floor".to_string());
    }
    if pillar_ratio < VETO_PILLAR_RATIO {
        veto_reasons.push("thin-pillar".to_string());
    }
    if mean_gas > VETO_GAS && geo.avg_depth > VETO_DEPTH {
        veto_reasons.push("gas-at-depth".to_string());
    }

    let total = round1(factors.total());
    PanelAssessment {
        panel_id: panel.id.clone(),
        grade: grade_of(total).to_string(),
        vetoed: !veto_reasons.is_empty(),
        veto_reasons,
        factors,
        total,
    }
}

/// Validate the full design.
pub fn validate_design(
    panels: &[Panel],
    geo: &GeologyModel,
    grids: &ScoreGrids,
    roadways: &[Roadway],
    boreholes: &[Borehole],
    params: &DesignParams,
    pillar_tolerance: f64,
) -> Validation {
    let mut warnings = Vec::new();

    let mut packed: Vec<&Panel> = panels.iter().filter(|p| !p.locked).collect();
    packed.sort_by_key(|p| p.strip);
    let measurements = measure_pillars(&packed, params, pillar_tolerance);
    for m in measurements.iter().filter(|m| !m.compliant) {
        warnings.push(Warning::new(
            "pillar-deviation",
            format!(
                "pillar between {} and {} measures {} against designed {}",
                m.first, m.second, m.measured, m.designed
            ),
        ));
    }

    let mean_gas = if boreholes.is_empty() {
        0.0
    } else {
        boreholes.iter().map(|b| b.gas_content).sum::<f64>() / boreholes.len() as f64
    };

    let assessments: Vec<PanelAssessment> = panels
        .iter()
        .map(|panel| {
            // Worst adjacent pillar ratio; edge panels default to 1.
            let ratio = measurements
                .iter()
                .filter(|m| m.first == panel.id || m.second == panel.id)
                .map(|m| m.measured / m.designed)
                .fold(f64::INFINITY, f64::min);
            let ratio = if ratio.is_finite() { ratio } else { 1.0 };
            assess_panel(panel, geo, grids, roadways, ratio, mean_gas)
        })
        .collect();

    let overall_score = if assessments.is_empty() {
        0.0
    } else {
        let mean_total =
            assessments.iter().map(|a| a.total).sum::<f64>() / assessments.len() as f64;
        let total_area: f64 = panels.iter().map(|p| p.area).sum();
        round1(0.7 * mean_total + 0.3 * (total_area / 1000.0).min(100.0))
    };

    Validation {
        pillar_tolerance,
        measurements,
        assessments,
        overall_score,
        warnings,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cancel::RunControl;
    use crate::geology::{build_geology, default_coal_markers, BoreholeAttributes, BoreholeInput, SeamSelection};
    use crate::layout::{derive_params, main_roadways, pack_panels, Orientation, PlanRequest};
    use crate::score::{score_bundle, DefaultPolicy, Weights};
    use approx::assert_relative_eq;

    fn boundary() -> Vec<Point> {
        vec![
            Point::new(0.0, 0.0),
            Point::new(800.0, 0.0),
            Point::new(800.0, 700.0),
            Point::new(0.0, 700.0),
        ]
    }

    fn borehole(id: &str, x: f64, y: f64, gas: f64) -> BoreholeInput {
        BoreholeInput {
            id: id.into(),
            x,
            y,
            surface_elevation: None,
            total_depth: None,
            layers: vec![],
            attributes: Some(BoreholeAttributes {
                top_elevation: Some(-300.0),
                bottom_elevation: Some(-303.0),
                coal_thickness: Some(3.0),
                rock_hardness: Some(7.0),
                gas_content: Some(gas),
                ..Default::default()
            }),
        }
    }

    struct Fixture {
        geo: crate::geology::GeologyModel,
        boreholes: Vec<crate::geology::Borehole>,
        bundle: crate::score::ScoreBundle,
        params: DesignParams,
        panels: Vec<Panel>,
        roadways: Vec<Roadway>,
    }

    fn fixture(gas: f64) -> Fixture {
        let ctl = RunControl::unbounded();
        let boundary = boundary();
        let inputs = vec![
            borehole("B1", 100.0, 100.0, gas),
            borehole("B2", 700.0, 100.0, gas),
            borehole("B3", 400.0, 600.0, gas),
        ];
        let (geo, boreholes) = build_geology(
            &boundary,
            &inputs,
            30,
            &SeamSelection::Auto,
            &default_coal_markers(),
            &ctl,
        )
        .unwrap();
        let bundle =
            score_bundle(&boundary, &boreholes, Weights::default(), 30, &DefaultPolicy, &ctl)
                .unwrap();
        let req = PlanRequest {
            face_width: Some(180.0),
            pillar_width: Some(25.0),
            ..Default::default()
        };
        let params = derive_params(&geo, &boundary, &req).unwrap();
        let pack = pack_panels(&boundary, &bundle.grids.composite, &params, &[], &ctl).unwrap();
        let mut roadways = main_roadways(&boundary, params.orientation, params.roadway_width);
        let (cuts, _) = crate::layout::cut_throughs(
            &pack.panels,
            &roadways,
            &bundle.grids.composite,
            params.min_score,
            params.roadway_width,
            &ctl,
        )
        .unwrap();
        roadways.extend(cuts);
        Fixture {
            geo,
            boreholes,
            bundle,
            params,
            panels: pack.panels,
            roadways,
        }
    }

    #[test]
    fn packed_spacing_is_compliant() {
        let f = fixture(0.0);
        assert!(f.panels.len() >= 2);
        let v = validate_design(
            &f.panels,
            &f.geo,
            &f.bundle.grids,
            &f.roadways,
            &f.boreholes,
            &f.params,
            DEFAULT_PILLAR_TOLERANCE,
        );
        assert_eq!(v.measurements.len(), f.panels.len() - 1);
        for m in &v.measurements {
            assert!(m.compliant, "{m:?}");
            assert_relative_eq!(m.measured, 25.0, epsilon = 0.11);
        }
        assert!(v.warnings.is_empty());
    }

    #[test]
    fn factor_totals_are_bounded_and_graded() {
        let f = fixture(0.0);
        let v = validate_design(
            &f.panels,
            &f.geo,
            &f.bundle.grids,
            &f.roadways,
            &f.boreholes,
            &f.params,
            DEFAULT_PILLAR_TOLERANCE,
        );
        for a in &v.assessments {
            assert!((0.0..=100.0).contains(&a.total), "total {}", a.total);
            assert!(["A+", "A", "B+", "B", "C", "D"].contains(&a.grade.as_str()));
            assert!(!a.vetoed, "clean fixture should not veto: {:?}", a.veto_reasons);
            // Both cut-throughs exist, so ventilation is at its ceiling.
            assert_relative_eq!(a.factors.ventilation, 10.0);
        }
        assert!(v.overall_score > 0.0 && v.overall_score <= 100.0);
    }

    #[test]
    fn gas_at_depth_vetoes() {
        // 20 m³/t of gas at ~300 m is fine; the veto needs depth > 500 too.
        let shallow = fixture(20.0);
        let v = validate_design(
            &shallow.panels,
            &shallow.geo,
            &shallow.bundle.grids,
            &shallow.roadways,
            &shallow.boreholes,
            &shallow.params,
            DEFAULT_PILLAR_TOLERANCE,
        );
        assert!(v.assessments.iter().all(|a| !a
            .veto_reasons
            .contains(&"gas-at-depth".to_string())));

        let mut deep = fixture(20.0);
        deep.geo.avg_depth = 600.0;
        let v = validate_design(
            &deep.panels,
            &deep.geo,
            &deep.bundle.grids,
            &deep.roadways,
            &deep.boreholes,
            &deep.params,
            DEFAULT_PILLAR_TOLERANCE,
        );
        assert!(v
            .assessments
            .iter()
            .all(|a| a.vetoed && a.veto_reasons.contains(&"gas-at-depth".to_string())));
    }

    #[test]
    fn displaced_panel_trips_the_tolerance() {
        let f = fixture(0.0);
        let mut panels = f.panels.clone();
        assert!(panels.len() >= 2);
        // Shift the second strip 5 units further out.
        for c in panels[1].corners.iter_mut() {
            c.y += 5.0;
        }
        panels[1].center.y += 5.0;
        let v = validate_design(
            &panels,
            &f.geo,
            &f.bundle.grids,
            &f.roadways,
            &f.boreholes,
            &f.params,
            DEFAULT_PILLAR_TOLERANCE,
        );
        assert!(!v.measurements[0].compliant);
        assert!(v.warnings.iter().any(|w| w.code == "pillar-deviation"));
    }

    #[test]
    fn empty_design_scores_zero() {
        let f = fixture(0.0);
        let v = validate_design(
            &[],
            &f.geo,
            &f.bundle.grids,
            &f.roadways,
            &f.boreholes,
            &f.params,
            DEFAULT_PILLAR_TOLERANCE,
        );
        assert_eq!(v.overall_score, 0.0);
        assert!(v.measurements.is_empty());
    }

    #[test]
    fn orientation_is_horizontal_for_wide_flat_area() {
        let f = fixture(0.0);
        assert_eq!(f.params.orientation, Orientation::Horizontal);
    }
}
