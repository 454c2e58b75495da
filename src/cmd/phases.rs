//! Phase table listing: `atelier phases`.

use anyhow::Result;
use console::style;

use atelier::intent::{primary_intent, recommended_intents};
use atelier::phase::Phase;

fn join<T: ToString>(items: &[T]) -> String {
    if items.is_empty() {
        return "-".to_string();
    }
    items
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

pub fn cmd_phases() -> Result<()> {
    println!();
    println!(
        "{:<13} {:<36} {:<10} Recommended intents",
        "Phase", "Can move to", "Primary"
    );
    println!(
        "{:<13} {:<36} {:<10} -------------------",
        "-------------", "------------------------------------", "----------"
    );

    for phase in Phase::ALL {
        let primary = primary_intent(phase)
            .map(|i| i.to_string())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:<13} {:<36} {:<10} {}",
            style(phase).cyan(),
            join(phase.valid_next_phases()),
            primary,
            join(recommended_intents(phase))
        );
    }
    println!();
    println!(
        "{}",
        style("Self-loops start another iteration of the same phase.").dim()
    );
    println!();
    Ok(())
}
