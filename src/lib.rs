// TrustShield Library - Workplace Complaint Workflow
// This exposes the workflow engine, storage backends and request layer for testing and integration

pub mod access;
pub mod audit;
pub mod cli;
pub mod config;
pub mod error;
pub mod seed;
pub mod storage;
pub mod telemetry;
pub mod workflow;

// Re-export key types for easy access
pub use access::Caller;
pub use audit::{AuthAction, AuthEventLog};
pub use config::{config, init_config, TrustShieldConfig};
pub use error::{StoreError, WorkflowError, WorkflowResult};
pub use storage::{ComplaintStore, JsonFileStore, MemoryStore, UserStore};
pub use telemetry::{create_workflow_span, generate_correlation_id, init_telemetry};
pub use workflow::{
    project, ComplaintDetail, ComplaintId, ComplaintView, ComplaintWorkflowEngine, EngineSettings,
    Role, Stage, SubmitComplaint, UserId, Viewer,
};
