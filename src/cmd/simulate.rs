//! Scripted end-to-end workflow: `atelier simulate`.
//!
//! Drives one drawing through every phase with fixed strokes and fixed
//! quality numbers, including a stretch of poor rendering passes that
//! regresses to stylization and a rollback to the settled line work.

use anyhow::{Context, Result};
use console::style;
use std::path::Path;

use atelier::Metadata;
use atelier::canvas::{SketchCanvas, Stroke};
use atelier::config::AtelierConfig;
use atelier::intent::{Intent, suggest_intent};
use atelier::orchestrator::{ActionRequest, Orchestrator};
use atelier::phase::{Metrics, Phase};

type Workflow = Orchestrator<SketchCanvas, Stroke>;

/// Upper bound on poor rendering passes, for thresholds that never regress.
const MAX_RENDER_PASSES: usize = 8;

fn metrics(pairs: &[(&str, f64)]) -> Metrics {
    pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
}

/// Paint each segment and record it as an action.
fn draw(
    workflow: &mut Workflow,
    segments: &[((f64, f64), (f64, f64))],
    brush: f64,
    request: impl Fn(usize) -> ActionRequest,
) -> Result<()> {
    for (i, (start, end)) in segments.iter().enumerate() {
        let stroke = Stroke::line(*start, *end, 8).with_brush(brush, "#202020");
        workflow.canvas_mut().paint(&stroke);
        workflow.execute_action(stroke, request(i))?;
    }
    Ok(())
}

/// Ask for a recommendation and follow it if there is one.
fn evaluate(workflow: &mut Workflow, scores: Metrics, reason: &str) -> Result<Option<Phase>> {
    let from = workflow.current_phase();
    let Some(next) = workflow.recommend_transition(&scores) else {
        println!(
            "  {} {} stays ({})",
            style("·").dim(),
            from,
            style(reason).dim()
        );
        return Ok(None);
    };

    let checkpoint = workflow.settings().checkpoint_on_transition;
    if workflow.transition_to(next, reason, scores, checkpoint)? {
        println!(
            "  {} {} → {} ({})",
            style("→").green(),
            from,
            style(next).cyan(),
            style(reason).dim()
        );
    }
    Ok(Some(next))
}

fn run_script(workflow: &mut Workflow) -> Result<()> {
    // Sketch: gesture and construction
    draw(
        workflow,
        &[
            ((400.0, 80.0), (400.0, 460.0)),
            ((330.0, 180.0), (470.0, 180.0)),
            ((360.0, 300.0), (440.0, 300.0)),
        ],
        6.0,
        |i| {
            let task = if i == 0 { "fix_pose" } else { "fix_proportions" };
            ActionRequest::new("block in figure")
                .intent(suggest_intent(Phase::Sketch, task))
                .task(task)
                .evaluated(
                    metrics(&[("pose", 0.3 + 0.1 * i as f64)]),
                    metrics(&[("pose", 0.5 + 0.1 * i as f64)]),
                )
        },
    )?;
    evaluate(
        workflow,
        metrics(&[("pose", 0.78), ("proportion", 0.72)]),
        "pose and proportions read clearly",
    )?;

    // Refinement: contour
    workflow.canvas_mut().add_layer("Refinement");
    draw(
        workflow,
        &[
            ((380.0, 90.0), (420.0, 90.0)),
            ((350.0, 190.0), (360.0, 300.0)),
            ((450.0, 190.0), (440.0, 300.0)),
        ],
        3.0,
        |_| ActionRequest::new("define anatomy").task("refine_anatomy"),
    )?;
    evaluate(
        workflow,
        metrics(&[("anatomy", 0.81), ("symmetry", 0.76)]),
        "anatomy resolved",
    )?;

    // Stylization: line work, then a named checkpoint to come back to
    workflow.canvas_mut().add_layer("Ink");
    draw(
        workflow,
        &[((352.0, 188.0), (362.0, 302.0)), ((448.0, 188.0), (438.0, 302.0))],
        2.0,
        |_| ActionRequest::new("commit line work").intent(Intent::Contour),
    )?;
    let mut metadata = Metadata::new();
    metadata.insert("type".to_string(), "manual".into());
    let settled = workflow.create_checkpoint("Line work settled", metadata)?;
    evaluate(workflow, metrics(&[("line_quality", 0.74)]), "line work clean")?;

    // Rendering: passes that keep scoring badly until a regression is advised
    workflow.canvas_mut().add_layer("Shading");
    for _ in 0..MAX_RENDER_PASSES {
        draw(
            workflow,
            &[((360.0, 200.0), (380.0, 280.0))],
            12.0,
            |_| ActionRequest::new("shade torso").intent(Intent::Shading),
        )?;
        let poor = metrics(&[("tonal_balance", 0.3), ("readability", 0.35)]);
        if evaluate(workflow, poor, "shading muddies the form")?.is_some() {
            break;
        }
        workflow.transition_to(Phase::Rendering, "another shading pass", Metrics::new(), false)?;
    }

    if workflow.rollback_to_checkpoint(settled)? {
        println!(
            "  {} rolled back to \"Line work settled\" ({} actions kept)",
            style("↺").yellow(),
            workflow.action_history().len()
        );
    } else {
        println!(
            "  {} checkpoint \"Line work settled\" was evicted, continuing from {}",
            style("!").yellow(),
            workflow.current_phase()
        );
    }

    // Second attempt at rendering, then finish
    evaluate(workflow, metrics(&[("line_quality", 0.8)]), "line work confirmed")?;
    draw(
        workflow,
        &[((440.0, 200.0), (420.0, 280.0)), ((390.0, 100.0), (410.0, 110.0))],
        8.0,
        |_| ActionRequest::new("light shading").intent(Intent::Shading),
    )?;
    evaluate(
        workflow,
        metrics(&[("tonal_balance", 0.86), ("readability", 0.9)]),
        "rendering complete",
    )?;
    Ok(())
}

pub fn cmd_simulate(config: &AtelierConfig, output: Option<&Path>) -> Result<()> {
    let settings = config.workflow_settings();
    let mut workflow: Workflow = Orchestrator::with_settings(SketchCanvas::default(), settings)?;

    println!();
    println!(
        "Simulating {}",
        style(workflow.state().workflow_id()).bold()
    );
    println!();

    run_script(&mut workflow)?;

    let summary = workflow.workflow_summary();
    let export_path = match output {
        Some(path) => path.to_path_buf(),
        None => config
            .exports_dir()
            .join(format!("{}.json", workflow.state().workflow_id())),
    };
    workflow
        .export()
        .context("Failed to build workflow export")?
        .save(&export_path)?;

    println!();
    println!("Phase:        {}", style(summary.state.current_phase).cyan());
    println!("Transitions:  {}", summary.state.total_transitions);
    println!("Actions:      {}", summary.total_actions);
    println!("Checkpoints:  {}", summary.checkpoint_count);
    if let Some(log) = &summary.decision_log {
        println!("Phase logs:   {}", log.phase_count);
        println!("Decisions:    {}", log.total_actions);
    }
    if workflow.is_complete() {
        println!("{}", style("Workflow complete").green().bold());
    }
    println!("Exported to {}", export_path.display());
    println!();
    Ok(())
}
