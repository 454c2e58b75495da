use super::{ActionDecision, LogSummary, PhaseDecisionLog};
use crate::Metadata;
use crate::phase::{Metrics, Phase};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Per-phase decision log for a whole workflow.
///
/// At most one phase log is open at a time. Opening a new one always closes
/// the previous, and closed logs are kept in the order they were opened.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DecisionLog {
    phase_logs: Vec<PhaseDecisionLog>,
    open: Option<PhaseDecisionLog>,
}

impl DecisionLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a log for `phase`, closing any open one with "Phase transition".
    pub fn start_phase(&mut self, phase: Phase, metadata: Metadata) {
        self.close_phase("Phase transition");
        tracing::debug!(phase = %phase, "Opened phase decision log");
        self.open = Some(PhaseDecisionLog::new(phase, metadata));
    }

    /// Append a decision to the open log, opening one for its phase if needed.
    pub fn log_action(&mut self, decision: ActionDecision) {
        let open = self
            .open
            .get_or_insert_with(|| PhaseDecisionLog::new(decision.phase, Metadata::new()));
        open.add_action(decision);
    }

    /// Record an evaluation against the open log. Ignored when no log is open.
    pub fn log_evaluation(&mut self, metrics: Metrics) {
        match self.open.as_mut() {
            Some(open) => open.add_evaluation(metrics),
            None => tracing::debug!("Dropped evaluation, no phase log is open"),
        }
    }

    /// Close the open log. Returns the closed log, or `None` if none was open.
    pub fn close_phase(&mut self, reason: &str) -> Option<&PhaseDecisionLog> {
        let mut log = self.open.take()?;
        log.close(reason);
        tracing::debug!(
            phase = %log.phase,
            actions = log.action_count(),
            improvement = ?log.total_improvement,
            "Closed phase decision log"
        );
        self.phase_logs.push(log);
        self.phase_logs.last()
    }

    pub fn open_log(&self) -> Option<&PhaseDecisionLog> {
        self.open.as_ref()
    }

    /// Every phase log in the order it was opened, the open one last.
    pub fn logs(&self) -> impl Iterator<Item = &PhaseDecisionLog> {
        self.phase_logs.iter().chain(self.open.iter())
    }

    /// The most recently opened log for `phase`.
    pub fn phase_log(&self, phase: Phase) -> Option<&PhaseDecisionLog> {
        self.open
            .iter()
            .chain(self.phase_logs.iter().rev())
            .find(|log| log.phase == phase)
    }

    /// All logs for `phase`, oldest first.
    pub fn all_logs(&self, phase: Phase) -> Vec<&PhaseDecisionLog> {
        self.logs().filter(|log| log.phase == phase).collect()
    }

    /// Every recorded decision across all phase logs, in order.
    pub fn all_actions(&self) -> Vec<&ActionDecision> {
        self.logs().flat_map(|log| log.actions.iter()).collect()
    }

    pub fn total_action_count(&self) -> usize {
        self.logs().map(PhaseDecisionLog::action_count).sum()
    }

    pub fn workflow_summary(&self) -> LogSummary {
        let phases: Vec<_> = self.logs().map(PhaseDecisionLog::summary).collect();
        LogSummary {
            phase_count: phases.len(),
            total_actions: self.total_action_count(),
            phases,
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("Failed to serialize decision log")?;
        fs::write(path, json)
            .with_context(|| format!("Failed to write decision log to {}", path.display()))?;
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read decision log {}", path.display()))?;
        let log: DecisionLog =
            serde_json::from_str(&content).context("Failed to parse decision log")?;
        Ok(log)
    }
}
