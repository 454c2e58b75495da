//! Drawing phase definitions and the transition table.
//!
//! This module provides:
//! - `Phase`, the closed, ordered set of creative phases
//! - The legal transition table and its predicates
//! - `PhaseTransition`, the immutable record of an accepted transition

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Metric name to score, as produced by the perception collaborator.
pub type Metrics = BTreeMap<String, f64>;

/// A stage in the iterative drawing process.
///
/// Variants are declared in workflow order; `Ord` follows that order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    /// Gesture and rough proportions
    Sketch,
    /// Anatomy and perspective construction
    Refinement,
    /// Clean, expressive line work
    Stylization,
    /// Color, shading and final touch-up
    Rendering,
    /// Artwork finished
    Complete,
}

impl Phase {
    /// Every phase in workflow order.
    pub const ALL: [Phase; 5] = [
        Phase::Sketch,
        Phase::Refinement,
        Phase::Stylization,
        Phase::Rendering,
        Phase::Complete,
    ];

    /// Position of this phase in workflow order.
    pub fn index(self) -> usize {
        match self {
            Phase::Sketch => 0,
            Phase::Refinement => 1,
            Phase::Stylization => 2,
            Phase::Rendering => 3,
            Phase::Complete => 4,
        }
    }

    /// The phase one step forward, if any.
    pub fn next(self) -> Option<Phase> {
        Phase::ALL.get(self.index() + 1).copied()
    }

    /// The phase one step back, if any.
    pub fn previous(self) -> Option<Phase> {
        self.index().checked_sub(1).map(|i| Phase::ALL[i])
    }

    /// Phases reachable from `self` in a single transition, self-loop included.
    pub fn valid_next_phases(self) -> &'static [Phase] {
        use Phase::*;
        match self {
            Sketch => &[Sketch, Refinement],
            Refinement => &[Sketch, Refinement, Stylization],
            Stylization => &[Refinement, Stylization, Rendering],
            Rendering => &[Stylization, Rendering, Complete],
            Complete => &[Complete, Rendering],
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Sketch => "sketch",
            Phase::Refinement => "refinement",
            Phase::Stylization => "stylization",
            Phase::Rendering => "rendering",
            Phase::Complete => "complete",
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

impl std::str::FromStr for Phase {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "sketch" => Ok(Phase::Sketch),
            "refinement" => Ok(Phase::Refinement),
            "stylization" => Ok(Phase::Stylization),
            "rendering" => Ok(Phase::Rendering),
            "complete" => Ok(Phase::Complete),
            _ => anyhow::bail!(
                "Invalid phase '{}'. Valid values: sketch, refinement, stylization, rendering, complete",
                s
            ),
        }
    }
}

/// Check whether `from -> to` appears in the transition table.
pub fn is_valid_transition(from: Phase, to: Phase) -> bool {
    from.valid_next_phases().contains(&to)
}

/// Check whether `from -> to` moves later in workflow order.
pub fn is_forward(from: Phase, to: Phase) -> bool {
    to.index() > from.index()
}

/// Check whether `from -> to` moves earlier in workflow order.
pub fn is_regression(from: Phase, to: Phase) -> bool {
    to.index() < from.index()
}

/// Record of an accepted phase transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhaseTransition {
    pub from_phase: Phase,
    pub to_phase: Phase,
    pub timestamp: DateTime<Utc>,
    /// Why the transition was made
    #[serde(default)]
    pub reason: String,
    /// Metrics that motivated the move
    #[serde(default)]
    pub metrics: Metrics,
    /// Confidence in this transition (0.0-1.0)
    pub confidence: f64,
}

impl PhaseTransition {
    pub fn new(
        from_phase: Phase,
        to_phase: Phase,
        reason: impl Into<String>,
        metrics: Metrics,
        confidence: f64,
    ) -> Self {
        Self {
            from_phase,
            to_phase,
            timestamp: Utc::now(),
            reason: reason.into(),
            metrics,
            confidence,
        }
    }

    /// Check if this transition stays in the same phase.
    pub fn is_iteration(&self) -> bool {
        self.from_phase == self.to_phase
    }

    pub fn is_regression(&self) -> bool {
        is_regression(self.from_phase, self.to_phase)
    }
}

/// Arithmetic mean of the metric values, `None` for an empty map.
pub fn mean_score(metrics: &Metrics) -> Option<f64> {
    if metrics.is_empty() {
        return None;
    }
    Some(metrics.values().sum::<f64>() / metrics.len() as f64)
}
