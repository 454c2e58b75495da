//! Configuration for atelier, read from `.atelier/atelier.toml`.
//!
//! Every key is optional. Values are layered file → environment → CLI:
//! `ATELIER_LOG` overrides the configured log filter, and `--verbose` or
//! `--max-checkpoints` override the file.
//!
//! # Configuration File Format
//!
//! ```toml
//! [workflow]
//! max_checkpoints = 10
//! enable_decision_log = true
//! checkpoint_on_transition = true
//!
//! [recommendation]
//! quality_threshold = 0.7
//! regression_threshold = 0.4
//! regression_min_iterations = 2
//!
//! [logging]
//! level = "info"
//! json = false
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::checkpoint::DEFAULT_MAX_CHECKPOINTS;
use crate::orchestrator::{RecommendationPolicy, WorkflowSettings};

pub const CONFIG_FILE_NAME: &str = "atelier.toml";

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowConfig {
    /// Checkpoint store capacity
    #[serde(default = "default_max_checkpoints")]
    pub max_checkpoints: usize,
    #[serde(default = "default_true")]
    pub enable_decision_log: bool,
    #[serde(default = "default_true")]
    pub checkpoint_on_transition: bool,
}

fn default_max_checkpoints() -> usize {
    DEFAULT_MAX_CHECKPOINTS
}

fn default_true() -> bool {
    true
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            max_checkpoints: default_max_checkpoints(),
            enable_decision_log: true,
            checkpoint_on_transition: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendationConfig {
    #[serde(default = "default_quality_threshold")]
    pub quality_threshold: f64,
    #[serde(default = "default_regression_threshold")]
    pub regression_threshold: f64,
    #[serde(default = "default_regression_min_iterations")]
    pub regression_min_iterations: u32,
}

fn default_quality_threshold() -> f64 {
    0.7
}

fn default_regression_threshold() -> f64 {
    0.4
}

fn default_regression_min_iterations() -> u32 {
    2
}

impl Default for RecommendationConfig {
    fn default() -> Self {
        Self {
            quality_threshold: default_quality_threshold(),
            regression_threshold: default_regression_threshold(),
            regression_min_iterations: default_regression_min_iterations(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter when `ATELIER_LOG` is unset
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Emit JSON lines instead of human-readable output
    #[serde(default)]
    pub json: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

/// Contents of `atelier.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AtelierToml {
    #[serde(default)]
    pub workflow: WorkflowConfig,
    #[serde(default)]
    pub recommendation: RecommendationConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AtelierToml {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse atelier.toml")
    }

    /// Load `atelier.toml` from `atelier_dir`, or defaults if it does not exist.
    pub fn load_or_default(atelier_dir: &Path) -> Result<Self> {
        let config_path = atelier_dir.join(CONFIG_FILE_NAME);
        if config_path.exists() {
            Self::load(&config_path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize atelier.toml")?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;
        Ok(())
    }

    /// Validate the configuration and return any warnings.
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        if self.workflow.max_checkpoints == 0 {
            warnings.push(
                "workflow.max_checkpoints is 0: at least one checkpoint is always kept".to_string(),
            );
        }

        let rec = &self.recommendation;
        for (name, value) in [
            ("quality_threshold", rec.quality_threshold),
            ("regression_threshold", rec.regression_threshold),
        ] {
            if !(0.0..=1.0).contains(&value) {
                warnings.push(format!(
                    "recommendation.{} = {} is outside [0, 1]: metrics are scores in that range",
                    name, value
                ));
            }
        }

        if rec.regression_threshold > rec.quality_threshold {
            warnings.push(format!(
                "recommendation.regression_threshold ({}) is above quality_threshold ({})",
                rec.regression_threshold, rec.quality_threshold
            ));
        }

        if !LOG_LEVELS.contains(&self.logging.level.to_lowercase().as_str()) {
            warnings.push(format!(
                "Invalid logging.level '{}'. Valid values: {}",
                self.logging.level,
                LOG_LEVELS.join(", ")
            ));
        }

        warnings
    }

    pub fn recommendation_policy(&self) -> RecommendationPolicy {
        RecommendationPolicy {
            quality_threshold: self.recommendation.quality_threshold,
            regression_threshold: self.recommendation.regression_threshold,
            regression_min_iterations: self.recommendation.regression_min_iterations,
        }
    }
}

/// Effective configuration for one project directory.
#[derive(Debug, Clone)]
pub struct AtelierConfig {
    pub project_dir: PathBuf,
    pub toml: AtelierToml,
    /// CLI override: force debug logging
    pub verbose: bool,
    /// CLI override for `workflow.max_checkpoints`
    pub cli_max_checkpoints: Option<usize>,
}

impl AtelierConfig {
    pub fn new(project_dir: PathBuf) -> Result<Self> {
        let project_dir = project_dir
            .canonicalize()
            .context("Failed to resolve project directory")?;
        let toml = AtelierToml::load_or_default(&project_dir.join(".atelier"))?;

        Ok(Self {
            project_dir,
            toml,
            verbose: false,
            cli_max_checkpoints: None,
        })
    }

    pub fn with_cli_args(
        project_dir: PathBuf,
        verbose: bool,
        max_checkpoints: Option<usize>,
    ) -> Result<Self> {
        let mut config = Self::new(project_dir)?;
        config.verbose = verbose;
        config.cli_max_checkpoints = max_checkpoints;
        Ok(config)
    }

    pub fn atelier_dir(&self) -> PathBuf {
        self.project_dir.join(".atelier")
    }

    pub fn exports_dir(&self) -> PathBuf {
        self.atelier_dir().join("exports")
    }

    pub fn config_file(&self) -> PathBuf {
        self.atelier_dir().join(CONFIG_FILE_NAME)
    }

    /// Log filter before `ATELIER_LOG` is consulted (CLI → file).
    pub fn log_level(&self) -> &str {
        if self.verbose {
            "debug"
        } else {
            &self.toml.logging.level
        }
    }

    pub fn json_logs(&self) -> bool {
        self.toml.logging.json
    }

    /// Checkpoint capacity (CLI → file → default).
    pub fn max_checkpoints(&self) -> usize {
        self.cli_max_checkpoints
            .unwrap_or(self.toml.workflow.max_checkpoints)
    }

    pub fn workflow_settings(&self) -> WorkflowSettings {
        WorkflowSettings {
            max_checkpoints: self.max_checkpoints(),
            enable_decision_log: self.toml.workflow.enable_decision_log,
            checkpoint_on_transition: self.toml.workflow.checkpoint_on_transition,
            recommendation: self.toml.recommendation_policy(),
        }
    }

    pub fn validate(&self) -> Vec<String> {
        self.toml.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_parse_empty_uses_defaults() {
        let config = AtelierToml::parse("").unwrap();
        assert_eq!(config, AtelierToml::default());
        assert_eq!(config.workflow.max_checkpoints, 10);
        assert!(config.workflow.enable_decision_log);
        assert_eq!(config.recommendation.quality_threshold, 0.7);
        assert_eq!(config.logging.level, "info");
        assert!(config.validate().is_empty());
    }

    #[test]
    fn test_parse_partial_sections() {
        let config = AtelierToml::parse(
            r#"
[workflow]
max_checkpoints = 4

[recommendation]
quality_threshold = 0.8
"#,
        )
        .unwrap();
        assert_eq!(config.workflow.max_checkpoints, 4);
        assert!(config.workflow.checkpoint_on_transition);
        assert_eq!(config.recommendation.quality_threshold, 0.8);
        assert_eq!(config.recommendation.regression_threshold, 0.4);
        assert!(!config.logging.json);
    }

    #[test]
    fn test_parse_invalid_toml() {
        let err = AtelierToml::parse("[workflow\nmax_checkpoints = ").unwrap_err();
        assert!(err.to_string().contains("Failed to parse atelier.toml"));
    }

    #[test]
    fn test_validate_reports_problems() {
        let mut config = AtelierToml::default();
        config.workflow.max_checkpoints = 0;
        config.recommendation.quality_threshold = 1.5;
        config.recommendation.regression_threshold = 0.9;
        config.logging.level = "loud".to_string();

        let warnings = config.validate();
        assert_eq!(warnings.len(), 3);
        assert!(warnings.iter().any(|w| w.contains("max_checkpoints")));
        assert!(warnings.iter().any(|w| w.contains("outside [0, 1]")));
        assert!(warnings.iter().any(|w| w.contains("loud")));
    }

    #[test]
    fn test_validate_regression_above_quality() {
        let mut config = AtelierToml::default();
        config.recommendation.regression_threshold = 0.8;
        let warnings = config.validate();
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("above quality_threshold"));
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);

        let mut config = AtelierToml::default();
        config.workflow.max_checkpoints = 3;
        config.logging.json = true;
        config.save(&path).unwrap();

        assert_eq!(AtelierToml::load(&path).unwrap(), config);
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let dir = tempdir().unwrap();
        let config = AtelierToml::load_or_default(dir.path()).unwrap();
        assert_eq!(config, AtelierToml::default());
    }

    #[test]
    fn test_atelier_config_paths() {
        let dir = tempdir().unwrap();
        let config = AtelierConfig::new(dir.path().to_path_buf()).unwrap();
        let root = dir.path().canonicalize().unwrap();
        assert_eq!(config.atelier_dir(), root.join(".atelier"));
        assert_eq!(config.exports_dir(), root.join(".atelier/exports"));
        assert_eq!(config.config_file(), root.join(".atelier/atelier.toml"));
    }

    #[test]
    fn test_atelier_config_reads_file_and_cli_overrides() {
        let dir = tempdir().unwrap();
        let atelier_dir = dir.path().join(".atelier");
        fs::create_dir_all(&atelier_dir).unwrap();
        fs::write(
            atelier_dir.join(CONFIG_FILE_NAME),
            "[workflow]\nmax_checkpoints = 5\nenable_decision_log = false\n\n[logging]\nlevel = \"warn\"\n",
        )
        .unwrap();

        let config = AtelierConfig::new(dir.path().to_path_buf()).unwrap();
        assert_eq!(config.max_checkpoints(), 5);
        assert_eq!(config.log_level(), "warn");
        assert!(!config.workflow_settings().enable_decision_log);

        let config =
            AtelierConfig::with_cli_args(dir.path().to_path_buf(), true, Some(2)).unwrap();
        assert_eq!(config.max_checkpoints(), 2);
        assert_eq!(config.workflow_settings().max_checkpoints, 2);
        assert_eq!(config.log_level(), "debug");
    }

    #[test]
    fn test_atelier_config_missing_project_dir() {
        let dir = tempdir().unwrap();
        assert!(AtelierConfig::new(dir.path().join("nope")).is_err());
    }
}
