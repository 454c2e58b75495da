use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::Metadata;
use crate::phase::{self, Metrics, Phase, PhaseTransition};

/// Where the workflow is now: phase, counters and transition history.
///
/// `current_phase` always equals the `to_phase` of the last history entry
/// (or the initial phase when history is empty), except after a rollback,
/// which rewinds the phase without recording a transition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowState {
    workflow_id: String,
    current_phase: Phase,
    phase_history: Vec<PhaseTransition>,
    phase_start_time: DateTime<Utc>,
    /// Self-loops taken since last entering the current phase
    iteration_in_phase: u32,
    total_actions: usize,
    /// Actions recorded since the last transition
    phase_action_count: usize,
    #[serde(default)]
    metadata: Metadata,
}

impl WorkflowState {
    pub fn new(initial_phase: Phase) -> Self {
        Self {
            workflow_id: format!("workflow_{}", Uuid::new_v4().simple()),
            current_phase: initial_phase,
            phase_history: Vec::new(),
            phase_start_time: Utc::now(),
            iteration_in_phase: 0,
            total_actions: 0,
            phase_action_count: 0,
            metadata: Metadata::new(),
        }
    }

    pub fn workflow_id(&self) -> &str {
        &self.workflow_id
    }

    pub fn current_phase(&self) -> Phase {
        self.current_phase
    }

    pub fn phase_history(&self) -> &[PhaseTransition] {
        &self.phase_history
    }

    pub fn phase_start_time(&self) -> DateTime<Utc> {
        self.phase_start_time
    }

    pub fn iteration_in_phase(&self) -> u32 {
        self.iteration_in_phase
    }

    pub fn total_actions(&self) -> usize {
        self.total_actions
    }

    pub fn phase_action_count(&self) -> usize {
        self.phase_action_count
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    pub fn metadata_mut(&mut self) -> &mut Metadata {
        &mut self.metadata
    }

    /// Count one executed action.
    pub fn record_action(&mut self) {
        self.total_actions += 1;
        self.phase_action_count += 1;
    }

    /// Move to `new_phase` if the transition table allows it.
    ///
    /// Returns `false` and leaves the state untouched otherwise. A self-loop
    /// bumps `iteration_in_phase`; any other move resets it. The per-phase
    /// action counter is reset on every accepted transition.
    pub fn transition_to(
        &mut self,
        new_phase: Phase,
        reason: &str,
        metrics: Metrics,
        confidence: f64,
    ) -> bool {
        let from = self.current_phase;
        if !phase::is_valid_transition(from, new_phase) {
            return false;
        }

        let transition = PhaseTransition::new(from, new_phase, reason, metrics, confidence);
        self.phase_start_time = transition.timestamp;
        self.phase_history.push(transition);
        self.current_phase = new_phase;

        if new_phase == from {
            self.iteration_in_phase += 1;
        } else {
            self.iteration_in_phase = 0;
        }
        self.phase_action_count = 0;

        true
    }

    /// Rewind phase, phase start and total action count to a checkpoint.
    ///
    /// `iteration_in_phase` and `phase_action_count` are left as they are.
    pub(crate) fn rewind(
        &mut self,
        phase: Phase,
        phase_start_time: DateTime<Utc>,
        total_actions: usize,
    ) {
        self.current_phase = phase;
        self.phase_start_time = phase_start_time;
        self.total_actions = total_actions;
    }

    pub fn time_in_phase(&self) -> TimeDelta {
        Utc::now() - self.phase_start_time
    }

    /// Transitions into or out of `phase`.
    pub fn transitions_involving(&self, phase: Phase) -> Vec<&PhaseTransition> {
        self.phase_history
            .iter()
            .filter(|t| t.from_phase == phase || t.to_phase == phase)
            .collect()
    }

    /// Total time spent in `phase` according to the transition history.
    ///
    /// Each transition into the phase opens an interval that the next
    /// transition out of it closes. An interval still open in the current
    /// phase runs until now; one left open elsewhere is ignored.
    pub fn phase_duration(&self, phase: Phase) -> TimeDelta {
        if self.phase_history.is_empty() {
            return if self.current_phase == phase {
                self.time_in_phase()
            } else {
                TimeDelta::zero()
            };
        }

        let mut total = TimeDelta::zero();
        for (i, entered) in self.phase_history.iter().enumerate() {
            if entered.to_phase != phase {
                continue;
            }
            let exit = self.phase_history[i + 1..]
                .iter()
                .find(|t| t.from_phase == phase)
                .map(|t| t.timestamp);
            let end = match exit {
                Some(ts) => ts,
                None if self.current_phase == phase => Utc::now(),
                None => continue,
            };
            total += end - entered.timestamp;
        }
        total
    }

    pub fn is_complete(&self) -> bool {
        self.current_phase == Phase::Complete
    }

    pub fn summary(&self) -> StateSummary {
        StateSummary {
            workflow_id: self.workflow_id.clone(),
            current_phase: self.current_phase,
            iteration_in_phase: self.iteration_in_phase,
            time_in_phase_secs: self.time_in_phase().num_milliseconds() as f64 / 1000.0,
            total_actions: self.total_actions,
            phase_action_count: self.phase_action_count,
            total_transitions: self.phase_history.len(),
            is_complete: self.is_complete(),
        }
    }
}

impl Default for WorkflowState {
    fn default() -> Self {
        Self::new(Phase::Sketch)
    }
}

/// Point-in-time view of a `WorkflowState`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateSummary {
    pub workflow_id: String,
    pub current_phase: Phase,
    pub iteration_in_phase: u32,
    pub time_in_phase_secs: f64,
    pub total_actions: usize,
    pub phase_action_count: usize,
    pub total_transitions: usize,
    pub is_complete: bool,
}
