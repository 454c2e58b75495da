//! End-to-end workflow scenarios through the public library API.

use atelier::Metadata;
use atelier::canvas::{SketchCanvas, Stroke, WorkflowAction};
use atelier::errors::{SnapshotPart, WorkflowError};
use atelier::intent::{ActionMetadata, Intent};
use atelier::orchestrator::{ActionRequest, Orchestrator, WorkflowExport, WorkflowSettings};
use atelier::phase::{Metrics, Phase};
use serde::{Deserialize, Serialize};
use tempfile::tempdir;
use uuid::Uuid;

fn quality(value: f64) -> Metrics {
    Metrics::from([("quality".to_string(), value)])
}

fn sketch_workflow() -> Orchestrator<SketchCanvas, Stroke> {
    Orchestrator::new(SketchCanvas::default()).unwrap()
}

/// A canvas that can be put into a state it cannot be restored from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
enum Paper {
    Clean { marks: u32 },
    #[serde(skip_deserializing)]
    Torn,
}

/// A minimal action type from outside the crate.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct Note {
    text: String,
    id: Option<Uuid>,
    meta: Option<ActionMetadata>,
}

impl Note {
    fn new(text: &str) -> Self {
        Self {
            text: text.to_string(),
            id: None,
            meta: None,
        }
    }
}

impl WorkflowAction for Note {
    fn attach_workflow_metadata(&mut self, action_id: Uuid, metadata: ActionMetadata) {
        self.id = Some(action_id);
        self.meta = Some(metadata);
    }

    fn workflow_metadata(&self) -> Option<&ActionMetadata> {
        self.meta.as_ref()
    }

    fn action_id(&self) -> Option<Uuid> {
        self.id
    }
}

#[test]
fn good_sketch_quality_recommends_refinement() {
    let mut workflow = sketch_workflow();
    assert_eq!(
        workflow.recommend_transition(&quality(0.8)),
        Some(Phase::Refinement)
    );
}

#[test]
fn poor_rendering_after_three_passes_recommends_stylization() {
    let mut workflow = sketch_workflow();
    for phase in [Phase::Refinement, Phase::Stylization, Phase::Rendering] {
        assert!(workflow.transition_to(phase, "", Metrics::new(), true).unwrap());
    }
    for _ in 0..3 {
        assert!(workflow
            .transition_to(Phase::Rendering, "another pass", Metrics::new(), false)
            .unwrap());
    }
    assert_eq!(
        workflow.recommend_transition(&quality(0.2)),
        Some(Phase::Stylization)
    );
}

#[test]
fn middling_quality_never_moves() {
    let mut workflow = sketch_workflow();
    let route = [
        Phase::Refinement,
        Phase::Stylization,
        Phase::Rendering,
        Phase::Complete,
    ];
    assert_eq!(workflow.recommend_transition(&quality(0.55)), None);
    for phase in route {
        workflow.transition_to(phase, "", Metrics::new(), false).unwrap();
        assert_eq!(workflow.recommend_transition(&quality(0.55)), None);
    }
}

#[test]
fn skipping_phases_is_rejected() {
    let mut workflow = sketch_workflow();
    assert!(!workflow
        .transition_to(Phase::Rendering, "rush", Metrics::new(), true)
        .unwrap());
    assert_eq!(workflow.current_phase(), Phase::Sketch);
    assert_eq!(workflow.checkpoints().count(), 1);
}

#[test]
fn full_route_reaches_complete() {
    let mut workflow = sketch_workflow();
    let mut strokes = 0;
    while !workflow.is_complete() {
        let stroke = Stroke::line((0.0, strokes as f64), (10.0, strokes as f64), 4);
        workflow.canvas_mut().paint(&stroke);
        workflow
            .execute_action(stroke, ActionRequest::new("progress"))
            .unwrap();
        strokes += 1;

        let next = workflow.recommend_transition(&quality(0.9)).unwrap();
        assert!(workflow.transition_to(next, "good", quality(0.9), true).unwrap());
    }

    assert_eq!(strokes, 4);
    assert_eq!(workflow.state().phase_history().len(), 4);
    assert_eq!(workflow.action_count_by_intent(Intent::Gesture), 1);
    assert_eq!(workflow.action_count_by_intent(Intent::Contour), 2);
    assert_eq!(workflow.action_count_by_intent(Intent::Detail), 1);
    // complete still allows going back to rendering
    assert!(workflow
        .transition_to(Phase::Rendering, "touch up", Metrics::new(), false)
        .unwrap());
}

#[test]
fn rollback_forgets_later_actions_but_keeps_later_checkpoints() {
    let mut workflow = sketch_workflow();
    for i in 0..2 {
        let stroke = Stroke::line((0.0, i as f64), (5.0, i as f64), 3);
        workflow.canvas_mut().paint(&stroke);
        workflow.execute_action(stroke, ActionRequest::default()).unwrap();
    }
    let target = workflow
        .create_checkpoint("two strokes", Metadata::new())
        .unwrap();
    for i in 2..5 {
        let stroke = Stroke::line((0.0, i as f64), (5.0, i as f64), 3);
        workflow.canvas_mut().paint(&stroke);
        workflow.execute_action(stroke, ActionRequest::default()).unwrap();
    }
    let later = workflow.create_checkpoint("five strokes", Metadata::new()).unwrap();

    assert!(workflow.rollback_to_checkpoint(target).unwrap());
    assert_eq!(workflow.action_history().len(), 2);
    assert_eq!(workflow.canvas().stroke_count(), 2);
    assert!(workflow.checkpoints().get(later).is_some());
    assert_eq!(workflow.decision_log().unwrap().total_action_count(), 5);

    // the retained later checkpoint is still a valid target
    assert!(workflow.rollback_to_checkpoint(later).unwrap());
    assert_eq!(workflow.action_history().len(), 5);
}

#[test]
fn eviction_is_oldest_first() {
    let settings = WorkflowSettings {
        max_checkpoints: 3,
        ..WorkflowSettings::default()
    };
    let mut workflow: Orchestrator<SketchCanvas, Stroke> =
        Orchestrator::with_settings(SketchCanvas::default(), settings).unwrap();
    let baseline = workflow.checkpoints().latest().unwrap().id;

    let ids: Vec<Uuid> = (0..5)
        .map(|i| {
            workflow
                .create_checkpoint(&format!("cp {i}"), Metadata::new())
                .unwrap()
        })
        .collect();

    assert_eq!(workflow.checkpoints().count(), 3);
    assert!(!workflow.rollback_to_checkpoint(baseline).unwrap());
    let kept: Vec<Uuid> = workflow.checkpoints().iter().map(|cp| cp.id).collect();
    assert_eq!(kept, ids[2..].to_vec());
}

#[test]
fn corrupt_snapshot_fails_rollback_without_touching_state() {
    let mut workflow: Orchestrator<Paper, Note> =
        Orchestrator::new(Paper::Clean { marks: 0 }).unwrap();
    workflow.execute_action(Note::new("first"), ActionRequest::default()).unwrap();

    *workflow.canvas_mut() = Paper::Torn;
    let torn = workflow.create_checkpoint("torn", Metadata::new()).unwrap();

    *workflow.canvas_mut() = Paper::Clean { marks: 2 };
    workflow.execute_action(Note::new("second"), ActionRequest::default()).unwrap();
    workflow
        .transition_to(Phase::Refinement, "", Metrics::new(), false)
        .unwrap();

    let err = workflow.rollback_to_checkpoint(torn).unwrap_err();
    match err {
        WorkflowError::SnapshotDecode {
            checkpoint_id,
            part,
            ..
        } => {
            assert_eq!(checkpoint_id, torn);
            assert_eq!(part, SnapshotPart::Canvas);
        }
        other => panic!("Expected SnapshotDecode, got {other:?}"),
    }

    assert_eq!(workflow.canvas(), &Paper::Clean { marks: 2 });
    assert_eq!(workflow.action_history().len(), 2);
    assert_eq!(workflow.current_phase(), Phase::Refinement);
    assert_eq!(workflow.state().total_actions(), 2);
}

#[test]
fn custom_action_type_carries_metadata() {
    let mut workflow: Orchestrator<Paper, Note> =
        Orchestrator::new(Paper::Clean { marks: 0 }).unwrap();
    let id = workflow
        .execute_action(
            Note::new("outline"),
            ActionRequest::new("outline figure").intent(Intent::Construction),
        )
        .unwrap();

    let note = &workflow.action_history()[0];
    assert_eq!(note.text, "outline");
    assert_eq!(note.action_id(), Some(id));
    assert_eq!(
        note.workflow_metadata().map(|m| m.intent),
        Some(Intent::Construction)
    );
    assert_eq!(workflow.action_count_by_phase(Phase::Sketch), 1);
}

#[test]
fn export_round_trips_through_disk() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("workflow.json");

    let mut workflow = sketch_workflow();
    workflow
        .execute_action(
            Stroke::line((0.0, 0.0), (1.0, 1.0), 2),
            ActionRequest::new("mark").evaluated(quality(0.1), quality(0.5)),
        )
        .unwrap();
    workflow
        .transition_to(Phase::Refinement, "ok", quality(0.8), true)
        .unwrap();
    workflow.export().unwrap().save(&path).unwrap();

    let loaded = WorkflowExport::load(&path).unwrap();
    assert_eq!(loaded.workflow_state.current_phase(), Phase::Refinement);
    assert_eq!(loaded.checkpoints.len(), 2);
    let log = loaded.decision_log.unwrap();
    let sketch = log.phase_log(Phase::Sketch).unwrap();
    assert_eq!(sketch.transition_reason, "ok");
    assert!((sketch.total_improvement.unwrap() - 0.4).abs() < 1e-9);

    let canvas: SketchCanvas = serde_json::from_value(loaded.canvas).unwrap();
    assert_eq!(canvas, *workflow.canvas());
}
