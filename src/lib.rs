pub mod audit;
pub mod canvas;
pub mod checkpoint;
pub mod config;
pub mod errors;
pub mod intent;
pub mod logging;
pub mod orchestrator;
pub mod phase;

/// Free-form metadata attached to workflows, checkpoints and decisions.
pub type Metadata = serde_json::Map<String, serde_json::Value>;

pub use errors::WorkflowError;
pub use intent::Intent;
pub use orchestrator::{ActionRequest, Orchestrator};
pub use phase::{Metrics, Phase};
