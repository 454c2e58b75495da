//! Configuration view and validation commands: `atelier config`.

use anyhow::Result;
use std::path::Path;

use atelier::config::{AtelierConfig, AtelierToml, CONFIG_FILE_NAME};
use atelier::logging::LOG_ENV;

use super::super::ConfigCommands;

fn print_toml(toml: &AtelierToml) {
    println!("[workflow]");
    println!("  max_checkpoints = {}", toml.workflow.max_checkpoints);
    println!(
        "  enable_decision_log = {}",
        toml.workflow.enable_decision_log
    );
    println!(
        "  checkpoint_on_transition = {}",
        toml.workflow.checkpoint_on_transition
    );
    println!();
    println!("[recommendation]");
    println!(
        "  quality_threshold = {}",
        toml.recommendation.quality_threshold
    );
    println!(
        "  regression_threshold = {}",
        toml.recommendation.regression_threshold
    );
    println!(
        "  regression_min_iterations = {}",
        toml.recommendation.regression_min_iterations
    );
    println!();
    println!("[logging]");
    println!("  level = \"{}\"", toml.logging.level);
    println!("  json = {}", toml.logging.json);
    println!();
}

pub fn cmd_config(project_dir: &Path, command: Option<ConfigCommands>) -> Result<()> {
    let atelier_dir = project_dir.join(".atelier");
    let config_path = atelier_dir.join(CONFIG_FILE_NAME);

    match command {
        None | Some(ConfigCommands::Show) => {
            println!();
            println!("Atelier Configuration");
            println!("=====================");
            println!();

            if config_path.exists() {
                println!("Config file: {}", config_path.display());
                println!();
                let config = AtelierConfig::new(project_dir.to_path_buf())?;
                print_toml(&config.toml);

                println!("Effective values (with env overrides):");
                match std::env::var(LOG_ENV) {
                    Ok(filter) => println!("  log filter = \"{}\" (from {})", filter, LOG_ENV),
                    Err(_) => println!("  log filter = \"{}\"", config.log_level()),
                }
                println!();
            } else {
                println!("No atelier.toml found at {}", config_path.display());
                println!();
                println!("Using default configuration:");
                print_toml(&AtelierToml::default());
                println!("Run 'atelier config init' to create an atelier.toml file.");
                println!();
            }
        }
        Some(ConfigCommands::Validate) => {
            if !config_path.exists() {
                println!(
                    "{} not present; built-in defaults apply and need no checking.",
                    CONFIG_FILE_NAME
                );
                return Ok(());
            }

            let toml = AtelierToml::load(&config_path)?;
            let warnings = toml.validate();

            if warnings.is_empty() {
                println!("{}: no problems found.", config_path.display());
            } else {
                println!("{}: {} problem(s)", config_path.display(), warnings.len());
                for warning in warnings {
                    println!("  ! {}", warning);
                }
            }
        }
        Some(ConfigCommands::Init) => {
            if config_path.exists() {
                println!(
                    "Keeping existing {}; remove it to write fresh defaults.",
                    config_path.display()
                );
                return Ok(());
            }

            std::fs::create_dir_all(&atelier_dir)?;
            AtelierToml::default().save(&config_path)?;

            println!("Wrote default settings to {}", config_path.display());
            println!();
            println!("  [workflow]        max_checkpoints: checkpoint ring size (oldest evicted first)");
            println!("                    enable_decision_log: keep per-phase stroke decisions");
            println!("                    checkpoint_on_transition: snapshot at each phase change");
            println!("  [recommendation]  quality_threshold: mean score that advances a phase");
            println!("                    regression_threshold, regression_min_iterations: when to step back");
            println!("  [logging]         level, json (the {} env var overrides level)", LOG_ENV);
            println!();
        }
    }

    Ok(())
}
