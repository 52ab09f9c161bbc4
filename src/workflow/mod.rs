pub mod engine;
pub mod projection;
pub mod scoring;
pub mod stage;
pub mod types;

pub use engine::{
    ComplaintWorkflowEngine, EngineSettings, FallbackReporter, FileUpload, SubmitComplaint,
};
pub use projection::{project, project_all, ComplaintView, Viewer};
pub use scoring::{ConfidenceScorer, FixedScorer, RandomScorer};
pub use stage::Stage;
pub use types::{
    AuthoredComment, Comment, Complaint, ComplaintDetail, ComplaintId, FileRecord, Role, User,
    UserId, WorkflowStepRecord,
};
