//! Boundary with the canvas and stroke collaborators.
//!
//! The workflow core never inspects pixels. It needs a canvas value it can
//! serialize into a checkpoint and deserialize back, and an action value
//! that can carry workflow metadata on a side channel. `SketchCanvas` and
//! `Stroke` are a minimal in-memory pair used by the CLI simulation.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::intent::ActionMetadata;

/// A value the checkpoint store can freeze and thaw.
pub trait Snapshot: Serialize + DeserializeOwned {}

impl<T: Serialize + DeserializeOwned> Snapshot for T {}

/// An action the orchestrator can record.
///
/// Attaching metadata must not change what the action draws.
pub trait WorkflowAction: Snapshot {
    fn attach_workflow_metadata(&mut self, action_id: Uuid, metadata: ActionMetadata);

    fn workflow_metadata(&self) -> Option<&ActionMetadata>;

    fn action_id(&self) -> Option<Uuid>;
}

/// A single sampled point along a stroke.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StrokePoint {
    pub x: f64,
    pub y: f64,
    pub pressure: f64,
}

/// A brush stroke.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stroke {
    pub points: Vec<StrokePoint>,
    pub brush_size: f64,
    pub color: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workflow: Option<ActionMetadata>,
}

impl Stroke {
    pub fn new(points: Vec<StrokePoint>) -> Self {
        Self {
            points,
            brush_size: 2.0,
            color: "#000000".to_string(),
            action_id: None,
            workflow: None,
        }
    }

    /// A straight stroke of `samples` points, heavier at both ends.
    pub fn line(start: (f64, f64), end: (f64, f64), samples: usize) -> Self {
        let samples = samples.max(2);
        let points = (0..samples)
            .map(|i| {
                let t = i as f64 / (samples - 1) as f64;
                StrokePoint {
                    x: start.0 + t * (end.0 - start.0),
                    y: start.1 + t * (end.1 - start.1),
                    pressure: 0.5 + (0.5 - t).abs(),
                }
            })
            .collect();
        Self::new(points)
    }

    pub fn with_brush(mut self, brush_size: f64, color: &str) -> Self {
        self.brush_size = brush_size;
        self.color = color.to_string();
        self
    }
}

impl WorkflowAction for Stroke {
    fn attach_workflow_metadata(&mut self, action_id: Uuid, metadata: ActionMetadata) {
        self.action_id = Some(action_id);
        self.workflow = Some(metadata);
    }

    fn workflow_metadata(&self) -> Option<&ActionMetadata> {
        self.workflow.as_ref()
    }

    fn action_id(&self) -> Option<Uuid> {
        self.action_id
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Layer {
    pub name: String,
    pub opacity: f64,
    pub visible: bool,
    pub strokes: Vec<Stroke>,
}

impl Layer {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            opacity: 1.0,
            visible: true,
            strokes: Vec::new(),
        }
    }
}

/// In-memory layered canvas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SketchCanvas {
    pub width: u32,
    pub height: u32,
    pub background: String,
    pub layers: Vec<Layer>,
    pub active_layer: usize,
}

impl SketchCanvas {
    /// Create a canvas with a single "Background" layer.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            background: "#FFFFFF".to_string(),
            layers: vec![Layer::new("Background")],
            active_layer: 0,
        }
    }

    /// Add a layer on top and make it active. Returns its index.
    pub fn add_layer(&mut self, name: &str) -> usize {
        self.layers.push(Layer::new(name));
        self.active_layer = self.layers.len() - 1;
        self.active_layer
    }

    /// Paint a stroke onto the active layer.
    pub fn paint(&mut self, stroke: &Stroke) {
        if let Some(layer) = self.layers.get_mut(self.active_layer) {
            layer.strokes.push(stroke.clone());
        }
    }

    pub fn stroke_count(&self) -> usize {
        self.layers.iter().map(|l| l.strokes.len()).sum()
    }
}

impl Default for SketchCanvas {
    fn default() -> Self {
        Self::new(800, 600)
    }
}
