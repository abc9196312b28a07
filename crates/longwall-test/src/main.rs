/// Offline pipeline runner: loads a scenario JSON (boundary, boreholes,
/// weights, plan parameters) and drives geology → score → plan, printing a
/// JSON summary of the requested stage.
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Parser;
use serde::Deserialize;
use serde_json::json;

use longwall_core::{Engine, GeologyRequest, PlanRequest, RunControl, Weights};

#[derive(Parser, Debug)]
#[command(name = "longwall-test", about = "Offline panel-layout pipeline runner")]
struct Args {
    /// Path to a scenario JSON file.
    #[arg(short, long)]
    input: String,

    /// Stop after this stage: geology, score, or plan.
    #[arg(short, long, default_value = "plan")]
    stage: String,

    /// Wall-clock budget in milliseconds.
    #[arg(long)]
    budget_ms: Option<u64>,

    /// Print the full result instead of the summary.
    #[arg(long)]
    full: bool,
}

#[derive(Debug, Deserialize)]
struct Scenario {
    #[serde(flatten)]
    geology: GeologyRequest,
    #[serde(default)]
    weights: Weights,
    /// Grid resolution of the scoring stage; defaults to the geology one.
    #[serde(default)]
    score_resolution: Option<usize>,
    #[serde(default)]
    plan: PlanRequest,
}

fn main() -> Result<()> {
    let args = Args::parse();
    let text = std::fs::read_to_string(&args.input)
        .with_context(|| format!("reading scenario {}", args.input))?;
    let scenario: Scenario =
        serde_json::from_str(&text).with_context(|| format!("parsing scenario {}", args.input))?;

    let ctl = match args.budget_ms {
        Some(ms) => RunControl::with_budget(Duration::from_millis(ms)),
        None => RunControl::unbounded(),
    };

    let engine = Engine::new();
    let session = "cli";

    let model = engine
        .build_geology(session, &scenario.geology, &ctl)
        .context("geology stage")?;
    if args.stage == "geology" {
        let out = if args.full {
            serde_json::to_value(&model)?
        } else {
            json!({
                "strike": model.strike,
                "dip_direction": model.dip_direction,
                "dip_angle": model.dip_angle,
                "avg_thickness": model.avg_thickness,
                "avg_depth": model.avg_depth,
                "warnings": model.warnings,
            })
        };
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    let resolution = scenario.score_resolution.unwrap_or(scenario.geology.resolution);
    let bundle = engine
        .score(session, scenario.weights, resolution, &ctl)
        .context("score stage")?;
    if args.stage == "score" {
        let out = if args.full {
            serde_json::to_value(&bundle)?
        } else {
            json!({
                "per_borehole": bundle.per_borehole,
                "stats": bundle.stats,
                "warnings": bundle.warnings,
            })
        };
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    if args.stage != "plan" {
        bail!("unknown stage {:?}; expected geology, score, or plan", args.stage);
    }

    let design = engine
        .plan(session, &scenario.plan, &ctl)
        .context("plan stage")?;
    let out = if args.full {
        serde_json::to_value(&design)?
    } else {
        json!({
            "design_params": design.design_params,
            "stats": design.stats,
            "overall_score": design.validation.overall_score,
            "grades": design
                .validation
                .assessments
                .iter()
                .map(|a| json!({ "panel": a.panel_id, "grade": a.grade, "vetoed": a.vetoed }))
                .collect::<Vec<_>>(),
            "warnings": design.warnings,
        })
    };
    println!("{}", serde_json::to_string_pretty(&out)?);
    Ok(())
}
