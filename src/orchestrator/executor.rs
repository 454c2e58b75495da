use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use super::state::{StateSummary, WorkflowState};
use crate::Metadata;
use crate::audit::{ActionDecision, DecisionLog, LogSummary};
use crate::canvas::{Snapshot, WorkflowAction};
use crate::checkpoint::{
    Checkpoint, CheckpointStore, CheckpointSummary, DEFAULT_MAX_CHECKPOINTS,
};
use crate::errors::{SnapshotPart, WorkflowError};
use crate::intent::{self, ActionMetadata, Intent};
use crate::phase::{self, Metrics, Phase, mean_score};

/// Thresholds used by `Orchestrator::recommend_transition`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RecommendationPolicy {
    /// Advance when the mean metric reaches this
    pub quality_threshold: f64,
    /// Regress when the mean metric falls below this...
    pub regression_threshold: f64,
    /// ...and more than this many self-loops have been taken in the phase
    pub regression_min_iterations: u32,
}

impl Default for RecommendationPolicy {
    fn default() -> Self {
        Self {
            quality_threshold: 0.7,
            regression_threshold: 0.4,
            regression_min_iterations: 2,
        }
    }
}

impl RecommendationPolicy {
    /// Suggest where to go from `current` given fresh metrics.
    ///
    /// `None` means stay: empty metrics, middling quality, or no neighbour
    /// phase in the suggested direction.
    pub fn recommend(&self, current: Phase, iteration_in_phase: u32, metrics: &Metrics) -> Option<Phase> {
        let avg = mean_score(metrics)?;
        if avg >= self.quality_threshold {
            current.next()
        } else if avg < self.regression_threshold
            && iteration_in_phase > self.regression_min_iterations
        {
            current.previous()
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowSettings {
    pub max_checkpoints: usize,
    pub enable_decision_log: bool,
    /// Default for `make_checkpoint` when callers follow a recommendation
    pub checkpoint_on_transition: bool,
    pub recommendation: RecommendationPolicy,
}

impl Default for WorkflowSettings {
    fn default() -> Self {
        Self {
            max_checkpoints: DEFAULT_MAX_CHECKPOINTS,
            enable_decision_log: true,
            checkpoint_on_transition: true,
            recommendation: RecommendationPolicy::default(),
        }
    }
}

/// Caller-supplied context for `Orchestrator::execute_action`.
#[derive(Debug, Clone, Default)]
pub struct ActionRequest {
    /// Falls back to the current phase's primary intent
    pub intent: Option<Intent>,
    pub purpose: String,
    pub task_id: Option<String>,
    pub directive_id: Option<String>,
    pub pre_evaluation: Option<Metrics>,
    pub post_evaluation: Option<Metrics>,
    /// Stored on the logged decision, not on the action
    pub metadata: Metadata,
}

impl ActionRequest {
    pub fn new(purpose: &str) -> Self {
        Self {
            purpose: purpose.to_string(),
            ..Self::default()
        }
    }

    pub fn intent(mut self, intent: Intent) -> Self {
        self.intent = Some(intent);
        self
    }

    pub fn task(mut self, task_id: &str) -> Self {
        self.task_id = Some(task_id.to_string());
        self
    }

    pub fn directive(mut self, directive_id: &str) -> Self {
        self.directive_id = Some(directive_id.to_string());
        self
    }

    pub fn evaluated(mut self, pre: Metrics, post: Metrics) -> Self {
        self.pre_evaluation = Some(pre);
        self.post_evaluation = Some(post);
        self
    }

    pub fn metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = metadata;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowSummary {
    pub state: StateSummary,
    pub checkpoint_count: usize,
    pub total_actions: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decision_log: Option<LogSummary>,
}

/// Everything needed to persist or inspect a workflow.
///
/// Checkpoints are exported as summaries, without their snapshots.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowExport {
    pub workflow_state: WorkflowState,
    pub canvas: Value,
    pub action_history: Vec<Value>,
    pub checkpoints: Vec<CheckpointSummary>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decision_log: Option<DecisionLog>,
}

impl WorkflowExport {
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let json = serde_json::to_string_pretty(self).context("Failed to serialize workflow export")?;
        fs::write(path, json)
            .with_context(|| format!("Failed to write workflow export to {}", path.display()))?;
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read workflow export {}", path.display()))?;
        let export: WorkflowExport =
            serde_json::from_str(&content).context("Failed to parse workflow export")?;
        Ok(export)
    }
}

/// Drives one workflow: phase, canvas, action history, checkpoints and
/// decision log move together through this type only.
///
/// Every mutating operation either applies all of its effects or, when it
/// returns `Ok(false)`, `None` or an error, none of them.
#[derive(Debug)]
pub struct Orchestrator<C, A> {
    canvas: C,
    action_history: Vec<A>,
    state: WorkflowState,
    checkpoints: CheckpointStore,
    decision_log: Option<DecisionLog>,
    settings: WorkflowSettings,
}

impl<C: Snapshot, A: WorkflowAction> Orchestrator<C, A> {
    pub fn new(canvas: C) -> Result<Self, WorkflowError> {
        Self::with_settings(canvas, WorkflowSettings::default())
    }

    /// Start a workflow at Sketch with an open Sketch log and a baseline checkpoint.
    pub fn with_settings(canvas: C, settings: WorkflowSettings) -> Result<Self, WorkflowError> {
        let mut orchestrator = Self {
            canvas,
            action_history: Vec::new(),
            state: WorkflowState::new(Phase::Sketch),
            checkpoints: CheckpointStore::new(settings.max_checkpoints),
            decision_log: settings.enable_decision_log.then(DecisionLog::new),
            settings,
        };

        if let Some(log) = orchestrator.decision_log.as_mut() {
            log.start_phase(Phase::Sketch, Metadata::new());
        }

        let mut metadata = Metadata::new();
        metadata.insert("type".to_string(), Value::from("initial"));
        orchestrator.create_checkpoint("Initial canvas state", metadata)?;

        tracing::info!(
            workflow_id = %orchestrator.state.workflow_id(),
            max_checkpoints = orchestrator.checkpoints.max_checkpoints(),
            decision_log = orchestrator.decision_log.is_some(),
            "Workflow started"
        );
        Ok(orchestrator)
    }

    pub fn settings(&self) -> &WorkflowSettings {
        &self.settings
    }

    pub fn canvas(&self) -> &C {
        &self.canvas
    }

    /// Mutable canvas access for the renderer.
    pub fn canvas_mut(&mut self) -> &mut C {
        &mut self.canvas
    }

    pub fn action_history(&self) -> &[A] {
        &self.action_history
    }

    pub fn state(&self) -> &WorkflowState {
        &self.state
    }

    pub fn checkpoints(&self) -> &CheckpointStore {
        &self.checkpoints
    }

    pub fn decision_log(&self) -> Option<&DecisionLog> {
        self.decision_log.as_ref()
    }

    pub fn current_phase(&self) -> Phase {
        self.state.current_phase()
    }

    pub fn is_complete(&self) -> bool {
        self.state.is_complete()
    }

    /// Move to `new_phase` if the transition table allows it.
    ///
    /// Returns `Ok(false)` with no side effects for an illegal move. On
    /// success the outgoing decision log is closed with `reason`, a new one
    /// is opened, and with `make_checkpoint` a "phase_transition" checkpoint
    /// carrying `reason` and `metrics` is stored.
    pub fn transition_to(
        &mut self,
        new_phase: Phase,
        reason: &str,
        metrics: Metrics,
        make_checkpoint: bool,
    ) -> Result<bool, WorkflowError> {
        let from = self.state.current_phase();
        if !phase::is_valid_transition(from, new_phase) {
            tracing::warn!(
                workflow_id = %self.state.workflow_id(),
                from = %from,
                to = %new_phase,
                "Rejected invalid phase transition"
            );
            return Ok(false);
        }

        // Captured before any mutation so an encode failure leaves the workflow as it was.
        let checkpoint = if make_checkpoint {
            let mut metadata = Metadata::new();
            metadata.insert("type".to_string(), Value::from("phase_transition"));
            metadata.insert("reason".to_string(), Value::from(reason));
            metadata.insert(
                "metrics".to_string(),
                Value::Object(
                    metrics
                        .iter()
                        .map(|(name, score)| (name.clone(), Value::from(*score)))
                        .collect(),
                ),
            );
            Some(Checkpoint::capture(
                &self.canvas,
                new_phase,
                &self.action_history,
                &format!("Phase transition to {new_phase}"),
                metadata,
            )?)
        } else {
            None
        };

        if !self.state.transition_to(new_phase, reason, metrics, 1.0) {
            return Ok(false);
        }

        if let Some(log) = self.decision_log.as_mut() {
            log.close_phase(reason);
            log.start_phase(new_phase, Metadata::new());
        }

        let checkpoint_id = checkpoint.map(|cp| self.checkpoints.push(cp).id);

        tracing::info!(
            workflow_id = %self.state.workflow_id(),
            from = %from,
            to = %new_phase,
            iteration = self.state.iteration_in_phase(),
            checkpoint_id = ?checkpoint_id,
            reason,
            "Phase transition"
        );
        Ok(true)
    }

    /// Record an action in the current phase and return its new id.
    ///
    /// The action gets its workflow metadata attached, is appended to the
    /// action history, counted in the workflow state and mirrored into the
    /// decision log together with its serialized form.
    pub fn execute_action(&mut self, mut action: A, request: ActionRequest) -> Result<Uuid, WorkflowError> {
        let phase = self.state.current_phase();
        let intent = request
            .intent
            .unwrap_or_else(|| intent::default_intent(phase));
        let action_id = Uuid::new_v4();

        let metadata = ActionMetadata {
            intent,
            phase,
            purpose: request.purpose.clone(),
            task_id: request.task_id.clone(),
            directive_id: request.directive_id.clone(),
            confidence: 1.0,
            iteration: self.state.iteration_in_phase(),
            evaluation_score: request.post_evaluation.as_ref().and_then(mean_score),
        };
        action.attach_workflow_metadata(action_id, metadata);

        let decision = match self.decision_log {
            Some(_) => {
                let payload = serde_json::to_value(&action).map_err(WorkflowError::PayloadEncode)?;
                Some(
                    ActionDecision::new(action_id, intent, phase)
                        .with_purpose(&request.purpose)
                        .with_task_id(request.task_id)
                        .with_directive_id(request.directive_id)
                        .with_evaluations(request.pre_evaluation, request.post_evaluation)
                        .with_payload(payload)
                        .with_metadata(request.metadata),
                )
            }
            None => None,
        };

        self.action_history.push(action);
        self.state.record_action();
        if let (Some(log), Some(decision)) = (self.decision_log.as_mut(), decision) {
            log.log_action(decision);
        }

        tracing::debug!(
            workflow_id = %self.state.workflow_id(),
            action_id = %action_id,
            intent = %intent,
            phase = %phase,
            appropriate = intent::is_appropriate(phase, intent),
            "Recorded action"
        );
        Ok(action_id)
    }

    /// Snapshot the current phase, canvas and action history.
    pub fn create_checkpoint(&mut self, description: &str, metadata: Metadata) -> Result<Uuid, WorkflowError> {
        let phase = self.state.current_phase();
        let checkpoint = self.checkpoints.create(
            &self.canvas,
            phase,
            &self.action_history,
            description,
            metadata,
        )?;
        tracing::info!(
            workflow_id = %self.state.workflow_id(),
            checkpoint_id = %checkpoint.id,
            phase = %phase,
            actions = checkpoint.action_count(),
            "Created checkpoint"
        );
        Ok(checkpoint.id)
    }

    /// Restore canvas, action history and phase from checkpoint `id`.
    ///
    /// `Ok(false)` for an unknown id. A snapshot that fails to decode is an
    /// error and leaves the live workflow untouched. Checkpoints taken after
    /// the target are kept, and no transition is recorded.
    pub fn rollback_to_checkpoint(&mut self, id: Uuid) -> Result<bool, WorkflowError> {
        let Some(checkpoint) = self.checkpoints.rollback_to(id) else {
            tracing::warn!(
                workflow_id = %self.state.workflow_id(),
                checkpoint_id = %id,
                "Rollback requested for unknown checkpoint"
            );
            return Ok(false);
        };

        let canvas: C = self.checkpoints.restore(checkpoint)?;
        let history: Vec<A> = self.checkpoints.action_history_at(checkpoint)?;
        let (phase, taken_at) = (checkpoint.phase, checkpoint.timestamp);

        let from = self.state.current_phase();
        let discarded = self.action_history.len().saturating_sub(history.len());
        self.canvas = canvas;
        self.action_history = history;
        self.state.rewind(phase, taken_at, self.action_history.len());

        tracing::info!(
            workflow_id = %self.state.workflow_id(),
            checkpoint_id = %id,
            from = %from,
            to = %phase,
            discarded_actions = discarded,
            "Rolled back to checkpoint"
        );
        Ok(true)
    }

    /// Roll back to the most recent checkpoint taken in `phase`.
    pub fn rollback_to_phase(&mut self, phase: Phase) -> Result<bool, WorkflowError> {
        match self.checkpoints.rollback_to_phase(phase).map(|cp| cp.id) {
            Some(id) => self.rollback_to_checkpoint(id),
            None => {
                tracing::warn!(
                    workflow_id = %self.state.workflow_id(),
                    phase = %phase,
                    "No checkpoint to roll back to for phase"
                );
                Ok(false)
            }
        }
    }

    /// Advise on the next phase using the configured policy.
    ///
    /// The metrics are logged as an evaluation either way. Nothing moves:
    /// the caller decides whether to act via `transition_to`.
    pub fn recommend_transition(&mut self, metrics: &Metrics) -> Option<Phase> {
        let policy = self.settings.recommendation;
        self.recommend_with_policy(metrics, policy)
    }

    /// `recommend_transition` with an explicit quality threshold.
    pub fn recommend_transition_with(&mut self, metrics: &Metrics, quality_threshold: f64) -> Option<Phase> {
        let policy = RecommendationPolicy {
            quality_threshold,
            ..self.settings.recommendation
        };
        self.recommend_with_policy(metrics, policy)
    }

    fn recommend_with_policy(&mut self, metrics: &Metrics, policy: RecommendationPolicy) -> Option<Phase> {
        if let Some(log) = self.decision_log.as_mut() {
            log.log_evaluation(metrics.clone());
        }

        let current = self.state.current_phase();
        let recommended = policy.recommend(current, self.state.iteration_in_phase(), metrics);
        tracing::debug!(
            workflow_id = %self.state.workflow_id(),
            phase = %current,
            mean = ?mean_score(metrics),
            recommended = ?recommended,
            "Evaluated phase quality"
        );
        recommended
    }

    pub fn action_count_by_intent(&self, intent: Intent) -> usize {
        self.action_history
            .iter()
            .filter(|a| a.workflow_metadata().is_some_and(|m| m.intent == intent))
            .count()
    }

    pub fn action_count_by_phase(&self, phase: Phase) -> usize {
        self.action_history
            .iter()
            .filter(|a| a.workflow_metadata().is_some_and(|m| m.phase == phase))
            .count()
    }

    pub fn workflow_summary(&self) -> WorkflowSummary {
        WorkflowSummary {
            state: self.state.summary(),
            checkpoint_count: self.checkpoints.count(),
            total_actions: self.action_history.len(),
            decision_log: self.decision_log.as_ref().map(DecisionLog::workflow_summary),
        }
    }

    pub fn export(&self) -> Result<WorkflowExport, WorkflowError> {
        let canvas = serde_json::to_value(&self.canvas).map_err(|source| {
            WorkflowError::SnapshotEncode {
                part: SnapshotPart::Canvas,
                source,
            }
        })?;
        let action_history = self
            .action_history
            .iter()
            .map(serde_json::to_value)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|source| WorkflowError::SnapshotEncode {
                part: SnapshotPart::ActionHistory,
                source,
            })?;

        Ok(WorkflowExport {
            workflow_state: self.state.clone(),
            canvas,
            action_history,
            checkpoints: self.checkpoints.summary(),
            decision_log: self.decision_log.clone(),
        })
    }
}
