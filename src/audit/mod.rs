use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::Metadata;
use crate::intent::Intent;
use crate::phase::{Metrics, Phase, mean_score};

/// Record of one executed action and the quality numbers around it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionDecision {
    pub action_id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub intent: Intent,
    pub phase: Phase,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub directive_id: Option<String>,
    #[serde(default)]
    pub purpose: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pre_evaluation: Option<Metrics>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub post_evaluation: Option<Metrics>,
    /// Serialized action, when the caller chose to keep it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
    #[serde(default)]
    pub metadata: Metadata,
}

impl ActionDecision {
    pub fn new(action_id: Uuid, intent: Intent, phase: Phase) -> Self {
        Self {
            action_id,
            timestamp: Utc::now(),
            intent,
            phase,
            task_id: None,
            directive_id: None,
            purpose: String::new(),
            pre_evaluation: None,
            post_evaluation: None,
            payload: None,
            metadata: Metadata::new(),
        }
    }

    pub fn with_purpose(mut self, purpose: &str) -> Self {
        self.purpose = purpose.to_string();
        self
    }

    pub fn with_task_id(mut self, task_id: Option<String>) -> Self {
        self.task_id = task_id;
        self
    }

    pub fn with_directive_id(mut self, directive_id: Option<String>) -> Self {
        self.directive_id = directive_id;
        self
    }

    pub fn with_evaluations(mut self, pre: Option<Metrics>, post: Option<Metrics>) -> Self {
        self.pre_evaluation = pre;
        self.post_evaluation = post;
        self
    }

    pub fn with_payload(mut self, payload: Value) -> Self {
        self.payload = Some(payload);
        self
    }

    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = metadata;
        self
    }

    /// Mean post-evaluation score minus mean pre-evaluation score.
    ///
    /// `None` unless both maps are present and non-empty.
    pub fn improvement(&self) -> Option<f64> {
        let pre = mean_score(self.pre_evaluation.as_ref()?)?;
        let post = mean_score(self.post_evaluation.as_ref()?)?;
        Some(post - pre)
    }
}

/// A quality evaluation taken during a phase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationSnapshot {
    pub timestamp: DateTime<Utc>,
    pub metrics: Metrics,
}

/// Everything decided while one phase was open.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhaseDecisionLog {
    pub phase: Phase,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub actions: Vec<ActionDecision>,
    pub evaluations: Vec<EvaluationSnapshot>,
    #[serde(default)]
    pub transition_reason: String,
    /// Mean improvement over actions that carry both evaluations, set on close
    pub total_improvement: Option<f64>,
    #[serde(default)]
    pub metadata: Metadata,
}

impl PhaseDecisionLog {
    pub fn new(phase: Phase, metadata: Metadata) -> Self {
        Self {
            phase,
            started_at: Utc::now(),
            ended_at: None,
            actions: Vec::new(),
            evaluations: Vec::new(),
            transition_reason: String::new(),
            total_improvement: None,
            metadata,
        }
    }

    pub fn add_action(&mut self, decision: ActionDecision) {
        self.actions.push(decision);
    }

    pub fn add_evaluation(&mut self, metrics: Metrics) {
        self.evaluations.push(EvaluationSnapshot {
            timestamp: Utc::now(),
            metrics,
        });
    }

    pub fn close(&mut self, reason: &str) {
        self.ended_at = Some(Utc::now());
        self.transition_reason = reason.to_string();

        let improvements: Vec<f64> = self
            .actions
            .iter()
            .filter_map(ActionDecision::improvement)
            .collect();
        if !improvements.is_empty() {
            self.total_improvement =
                Some(improvements.iter().sum::<f64>() / improvements.len() as f64);
        }
    }

    pub fn is_open(&self) -> bool {
        self.ended_at.is_none()
    }

    /// Seconds between open and close. `None` while the phase is open.
    pub fn duration(&self) -> Option<f64> {
        self.ended_at
            .map(|end| (end - self.started_at).num_milliseconds() as f64 / 1000.0)
    }

    pub fn action_count(&self) -> usize {
        self.actions.len()
    }

    pub fn actions_by_intent(&self, intent: Intent) -> Vec<&ActionDecision> {
        self.actions.iter().filter(|a| a.intent == intent).collect()
    }

    pub fn summary(&self) -> PhaseLogSummary {
        PhaseLogSummary {
            phase: self.phase,
            started_at: self.started_at,
            ended_at: self.ended_at,
            duration_secs: self.duration(),
            action_count: self.action_count(),
            evaluation_count: self.evaluations.len(),
            total_improvement: self.total_improvement,
            transition_reason: self.transition_reason.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhaseLogSummary {
    pub phase: Phase,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub duration_secs: Option<f64>,
    pub action_count: usize,
    pub evaluation_count: usize,
    pub total_improvement: Option<f64>,
    pub transition_reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogSummary {
    pub phase_count: usize,
    pub total_actions: usize,
    pub phases: Vec<PhaseLogSummary>,
}

pub mod logger;
pub use logger::DecisionLog;
