//! Export summary: `atelier inspect`.

use anyhow::Result;
use console::style;
use std::path::Path;

use atelier::orchestrator::WorkflowExport;

fn format_improvement(value: Option<f64>) -> String {
    match value {
        Some(v) if v >= 0.0 => style(format!("+{:.3}", v)).green().to_string(),
        Some(v) => style(format!("{:.3}", v)).red().to_string(),
        None => "-".to_string(),
    }
}

pub fn cmd_inspect(path: &Path) -> Result<()> {
    let export = WorkflowExport::load(path)?;
    let state = &export.workflow_state;

    println!();
    println!("Workflow {}", style(state.workflow_id()).bold());
    println!("=========");
    println!();
    println!("Phase:        {}", style(state.current_phase()).cyan());
    println!("Iteration:    {}", state.iteration_in_phase());
    println!("Actions:      {}", state.total_actions());
    println!("In history:   {}", export.action_history.len());
    println!();

    println!("Transitions ({})", state.phase_history().len());
    for t in state.phase_history() {
        let marker = if t.is_regression() {
            style("↩").yellow()
        } else if t.is_iteration() {
            style("↻").dim()
        } else {
            style("→").green()
        };
        println!(
            "  {} {:<12} {} {:<12} {}",
            t.timestamp.format("%H:%M:%S"),
            t.from_phase,
            marker,
            t.to_phase,
            style(&t.reason).dim()
        );
    }
    println!();

    println!("Checkpoints ({})", export.checkpoints.len());
    for cp in &export.checkpoints {
        println!(
            "  {}  {:<12} {:>4} actions  {}",
            &cp.id.to_string()[..8],
            cp.phase,
            cp.action_count,
            cp.description
        );
    }
    println!();

    match &export.decision_log {
        Some(log) => {
            let summary = log.workflow_summary();
            println!(
                "Decision log ({} phases, {} decisions)",
                summary.phase_count, summary.total_actions
            );
            println!(
                "  {:<12} {:>7} {:>11} {:>11}  Closed because",
                "Phase", "Actions", "Evaluations", "Improvement"
            );
            for phase in &summary.phases {
                let reason = if phase.ended_at.is_some() {
                    phase.transition_reason.as_str()
                } else {
                    "(open)"
                };
                println!(
                    "  {:<12} {:>7} {:>11} {:>11}  {}",
                    phase.phase,
                    phase.action_count,
                    phase.evaluation_count,
                    format_improvement(phase.total_improvement),
                    reason
                );
            }
        }
        None => println!("Decision log: disabled"),
    }
    println!();
    Ok(())
}
