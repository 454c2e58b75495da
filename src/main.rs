use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use atelier::config::AtelierConfig;

mod cmd;

#[derive(Parser)]
#[command(name = "atelier")]
#[command(version, about = "Art workflow orchestrator with checkpoints and a decision log")]
pub struct Cli {
    /// Force debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true)]
    pub project_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show the phase transition table and the intents suited to each phase
    Phases,
    /// Run a scripted workflow end to end and export it
    Simulate {
        /// Where to write the export (defaults to .atelier/exports/<workflow_id>.json)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Checkpoint store capacity. Overrides atelier.toml.
        #[arg(long)]
        max_checkpoints: Option<usize>,
    },
    /// Summarize a workflow export
    Inspect {
        /// Path to an export written by `atelier simulate`
        export: PathBuf,
    },
    /// View or validate configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
}

#[derive(Subcommand, Clone)]
pub enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Validate configuration and show any warnings
    Validate,
    /// Initialize a default atelier.toml file
    Init,
}

/// Load project configuration and install logging from it.
fn load_config(
    project_dir: PathBuf,
    verbose: bool,
    max_checkpoints: Option<usize>,
) -> Result<AtelierConfig> {
    let config = AtelierConfig::with_cli_args(project_dir, verbose, max_checkpoints)?;
    atelier::logging::init(config.log_level(), config.json_logs())?;
    Ok(config)
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let project_dir = match cli.project_dir.clone() {
        Some(dir) => dir,
        None => std::env::current_dir().context("Failed to get current directory")?,
    };

    match cli.command {
        Commands::Phases => {
            load_config(project_dir, cli.verbose, None)?;
            cmd::cmd_phases()?;
        }
        Commands::Simulate {
            output,
            max_checkpoints,
        } => {
            let config = load_config(project_dir, cli.verbose, max_checkpoints)?;
            cmd::cmd_simulate(&config, output.as_deref())?;
        }
        Commands::Inspect { export } => {
            load_config(project_dir, cli.verbose, None)?;
            cmd::cmd_inspect(&export)?;
        }
        Commands::Config { command } => {
            // Must work even when atelier.toml is broken, so no config-driven logging here.
            atelier::logging::init(if cli.verbose { "debug" } else { "warn" }, false)?;
            cmd::cmd_config(&project_dir, command)?;
        }
    }

    Ok(())
}
