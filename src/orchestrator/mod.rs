pub mod executor;
pub mod state;

pub use executor::{
    ActionRequest, Orchestrator, RecommendationPolicy, WorkflowExport, WorkflowSettings,
    WorkflowSummary,
};
pub use state::{StateSummary, WorkflowState};
