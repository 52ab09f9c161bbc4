use thiserror::Error;

use crate::workflow::stage::Stage;

/// Failures raised by storage backends.
///
/// These never carry domain meaning; the engine wraps them in
/// [`WorkflowError::Infrastructure`].
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[cfg(feature = "database")]
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    #[cfg(feature = "database")]
    #[error("Migration error: {0}")]
    MigrationError(#[from] sqlx::migrate::MigrateError),

    #[error("Operation '{operation}' timed out after {duration_ms}ms")]
    Timeout { operation: String, duration_ms: u64 },

    #[error("Duplicate {entity}: {key}")]
    Duplicate { entity: &'static str, key: String },

    #[error("Dangling reference: {reason}")]
    DanglingReference { reason: String },

    #[error("Lock acquisition failed: {reason}")]
    LockError { reason: String },

    #[error("Stored data is corrupt: {reason}")]
    Corrupt { reason: String },
}

impl StoreError {
    pub fn is_retriable(&self) -> bool {
        matches!(
            self,
            StoreError::Timeout { .. } | StoreError::LockError { .. } | StoreError::IoError(_)
        )
    }
}

/// Error taxonomy of the complaint workflow.
///
/// Domain variants carry a message that is safe to show to the caller.
/// `Infrastructure` keeps its diagnostic source for server-side logging and
/// only exposes an opaque message through [`WorkflowError::public_message`].
#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    #[error(
        "Invalid workflow transition from {current} to '{requested}'. {}",
        required_hint(.required)
    )]
    InvalidTransition {
        current: Stage,
        requested: String,
        required: Option<Stage>,
    },

    #[error("Please add a comment for the {stage} step before proceeding to the next step")]
    Precondition { stage: Stage },

    #[error("{0}")]
    Authorization(String),

    #[error("Storage failure during {operation}: {source}")]
    Infrastructure {
        operation: &'static str,
        #[source]
        source: StoreError,
    },
}

fn required_hint(required: &Option<Stage>) -> String {
    match required {
        Some(next) => format!(
            "The next stage must be {next} (workflow: {})",
            Stage::workflow_path()
        ),
        None => "CLOSED is terminal; no further transitions are allowed".to_string(),
    }
}

impl WorkflowError {
    pub fn validation(msg: impl Into<String>) -> Self {
        WorkflowError::Validation(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        WorkflowError::NotFound(msg.into())
    }

    pub fn infrastructure(operation: &'static str, source: StoreError) -> Self {
        WorkflowError::Infrastructure { operation, source }
    }

    /// True for domain rule violations; false for infrastructure and
    /// request-layer failures.
    pub fn is_domain(&self) -> bool {
        matches!(
            self,
            WorkflowError::Validation(_)
                | WorkflowError::NotFound(_)
                | WorkflowError::InvalidTransition { .. }
                | WorkflowError::Precondition { .. }
        )
    }

    pub fn is_retriable(&self) -> bool {
        match self {
            WorkflowError::Infrastructure { source, .. } => source.is_retriable(),
            _ => false,
        }
    }

    /// Message suitable for returning to the caller.
    pub fn public_message(&self) -> String {
        match self {
            WorkflowError::Infrastructure { operation, .. } => {
                format!("Failed to {}", operation.replace('_', " "))
            }
            other => other.to_string(),
        }
    }
}

pub type WorkflowResult<T> = Result<T, WorkflowError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_transition_names_required_stage() {
        let err = WorkflowError::InvalidTransition {
            current: Stage::Received,
            requested: "ACTION".to_string(),
            required: Some(Stage::Review),
        };
        let msg = err.to_string();
        assert!(msg.contains("The next stage must be REVIEW"));
        assert!(msg.contains("RECEIVED → REVIEW → INVESTIGATION → ACTION → CLOSED"));
        assert!(err.is_domain());
    }

    #[test]
    fn test_terminal_transition_message() {
        let err = WorkflowError::InvalidTransition {
            current: Stage::Closed,
            requested: "RECEIVED".to_string(),
            required: None,
        };
        assert!(err.to_string().contains("CLOSED is terminal"));
    }

    #[test]
    fn test_infrastructure_message_is_opaque() {
        let err = WorkflowError::infrastructure(
            "fetch_complaint",
            StoreError::Corrupt {
                reason: "row 7 has no title".to_string(),
            },
        );
        assert_eq!(err.public_message(), "Failed to fetch complaint");
        assert!(!err.public_message().contains("row 7"));
        assert!(!err.is_domain());
        assert!(!err.is_retriable());
    }

    #[test]
    fn test_timeout_is_retriable() {
        let err = WorkflowError::infrastructure(
            "advance_stage",
            StoreError::Timeout {
                operation: "transition_stage".to_string(),
                duration_ms: 500,
            },
        );
        assert!(err.is_retriable());
    }
}
