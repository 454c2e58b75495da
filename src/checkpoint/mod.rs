//! Point-in-time snapshots of phase, canvas and action history.
//!
//! A `Checkpoint` owns serialized copies of everything it captured, so later
//! changes to the live canvas or action history never reach it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::Metadata;
use crate::canvas::Snapshot;
use crate::errors::{SnapshotPart, WorkflowError};
use crate::phase::Phase;

pub mod store;
pub use store::{CheckpointStore, DEFAULT_MAX_CHECKPOINTS};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    /// Phase current when the checkpoint was taken
    pub phase: Phase,
    canvas_state: Value,
    action_history: Vec<Value>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub metadata: Metadata,
}

impl Checkpoint {
    /// Serialize `canvas` and `actions` into a new, independent checkpoint.
    pub fn capture<C: Snapshot, A: Snapshot>(
        canvas: &C,
        phase: Phase,
        actions: &[A],
        description: &str,
        metadata: Metadata,
    ) -> Result<Self, WorkflowError> {
        let canvas_state =
            serde_json::to_value(canvas).map_err(|source| WorkflowError::SnapshotEncode {
                part: SnapshotPart::Canvas,
                source,
            })?;
        let action_history = actions
            .iter()
            .map(serde_json::to_value)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|source| WorkflowError::SnapshotEncode {
                part: SnapshotPart::ActionHistory,
                source,
            })?;

        Ok(Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            phase,
            canvas_state,
            action_history,
            description: description.to_string(),
            metadata,
        })
    }

    /// Deserialize a fresh canvas value from this checkpoint.
    pub fn restore_canvas<C: Snapshot>(&self) -> Result<C, WorkflowError> {
        C::deserialize(&self.canvas_state).map_err(|source| WorkflowError::SnapshotDecode {
            checkpoint_id: self.id,
            part: SnapshotPart::Canvas,
            source,
        })
    }

    /// Deserialize the action history captured with this checkpoint.
    pub fn restore_actions<A: Snapshot>(&self) -> Result<Vec<A>, WorkflowError> {
        self.action_history
            .iter()
            .map(A::deserialize)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|source| WorkflowError::SnapshotDecode {
                checkpoint_id: self.id,
                part: SnapshotPart::ActionHistory,
                source,
            })
    }

    pub fn canvas_state(&self) -> &Value {
        &self.canvas_state
    }

    pub fn action_count(&self) -> usize {
        self.action_history.len()
    }

    pub fn summary(&self) -> CheckpointSummary {
        CheckpointSummary {
            id: self.id,
            timestamp: self.timestamp,
            phase: self.phase,
            description: self.description.clone(),
            action_count: self.action_count(),
        }
    }
}

/// The export form of a checkpoint: no snapshot payloads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckpointSummary {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub phase: Phase,
    pub description: String,
    pub action_count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::{SketchCanvas, Stroke};
    use std::collections::HashMap;

    #[test]
    fn test_capture_and_restore_canvas() {
        let mut canvas = SketchCanvas::default();
        canvas.paint(&Stroke::line((0.0, 0.0), (10.0, 10.0), 4));
        let strokes = vec![Stroke::line((0.0, 0.0), (10.0, 10.0), 4)];

        let cp = Checkpoint::capture(&canvas, Phase::Sketch, &strokes, "first", Metadata::new())
            .unwrap();
        assert_eq!(cp.action_count(), 1);
        assert_eq!(cp.restore_canvas::<SketchCanvas>().unwrap(), canvas);
        assert_eq!(cp.restore_actions::<Stroke>().unwrap(), strokes);
    }

    #[test]
    fn test_capture_is_isolated_from_live_values() {
        let mut canvas = SketchCanvas::default();
        let mut strokes = vec![Stroke::line((0.0, 0.0), (1.0, 1.0), 2)];
        let cp = Checkpoint::capture(&canvas, Phase::Sketch, &strokes, "", Metadata::new())
            .unwrap();

        canvas.paint(&Stroke::line((5.0, 5.0), (6.0, 6.0), 2));
        strokes.push(Stroke::line((5.0, 5.0), (6.0, 6.0), 2));

        assert_eq!(cp.restore_canvas::<SketchCanvas>().unwrap().stroke_count(), 0);
        assert_eq!(cp.restore_actions::<Stroke>().unwrap().len(), 1);
    }

    #[test]
    fn test_restored_values_are_independent() {
        let canvas = SketchCanvas::default();
        let cp = Checkpoint::capture(&canvas, Phase::Sketch, &[] as &[Stroke], "", Metadata::new())
            .unwrap();

        let mut restored: SketchCanvas = cp.restore_canvas().unwrap();
        restored.paint(&Stroke::line((0.0, 0.0), (1.0, 1.0), 2));

        let again: SketchCanvas = cp.restore_canvas().unwrap();
        assert_eq!(again.stroke_count(), 0);
    }

    #[test]
    fn test_restore_wrong_shape_is_decode_error() {
        let cp = Checkpoint::capture(
            &String::from("not a canvas"),
            Phase::Refinement,
            &[42u32],
            "",
            Metadata::new(),
        )
        .unwrap();

        let err = cp.restore_canvas::<SketchCanvas>().unwrap_err();
        assert!(matches!(
            err,
            WorkflowError::SnapshotDecode {
                part: SnapshotPart::Canvas,
                ..
            }
        ));
        let err = cp.restore_actions::<Stroke>().unwrap_err();
        assert!(matches!(
            err,
            WorkflowError::SnapshotDecode {
                part: SnapshotPart::ActionHistory,
                ..
            }
        ));
    }

    #[test]
    fn test_unserializable_canvas_is_encode_error() {
        // JSON object keys must be strings
        let canvas: HashMap<(u8, u8), u8> = HashMap::from([((1, 2), 3)]);
        let err = Checkpoint::capture(&canvas, Phase::Sketch, &[] as &[Stroke], "", Metadata::new())
            .unwrap_err();
        assert!(matches!(
            err,
            WorkflowError::SnapshotEncode {
                part: SnapshotPart::Canvas,
                ..
            }
        ));
    }

    #[test]
    fn test_summary_omits_payloads() {
        let canvas = SketchCanvas::default();
        let strokes = vec![
            Stroke::line((0.0, 0.0), (1.0, 1.0), 2),
            Stroke::line((1.0, 1.0), (2.0, 2.0), 2),
        ];
        let cp = Checkpoint::capture(&canvas, Phase::Rendering, &strokes, "shading", Metadata::new())
            .unwrap();
        let summary = cp.summary();
        assert_eq!(summary.id, cp.id);
        assert_eq!(summary.phase, Phase::Rendering);
        assert_eq!(summary.description, "shading");
        assert_eq!(summary.action_count, 2);

        let value = serde_json::to_value(&summary).unwrap();
        assert!(value.get("canvas_state").is_none());
    }
}
