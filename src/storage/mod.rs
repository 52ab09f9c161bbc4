// Storage collaborators for the workflow engine.
//
// Backends return rows in any order; ordering rules belong to the engine.

pub mod document;
pub mod file;
pub mod memory;
#[cfg(feature = "database")]
pub mod sqlite;

use async_trait::async_trait;

#[cfg(test)]
use mockall::automock;

use crate::error::StoreError;
use crate::workflow::stage::Stage;
use crate::workflow::types::{
    Comment, Complaint, ComplaintId, FileRecord, NewComment, NewComplaint, NewFile, NewUser,
    User, UserId, WorkflowStepRecord,
};

pub use file::JsonFileStore;
pub use memory::MemoryStore;
#[cfg(feature = "database")]
pub use sqlite::SqliteStore;

/// Durable record store for complaints and everything attached to them.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ComplaintStore: Send + Sync {
    /// Create the complaint and its initial workflow record in one unit.
    async fn insert_complaint(&self, new: NewComplaint) -> Result<Complaint, StoreError>;

    async fn get_complaint(&self, id: ComplaintId) -> Result<Option<Complaint>, StoreError>;

    /// All complaints, or only those reported by `reporter`.
    async fn list_complaints(&self, reporter: Option<UserId>) -> Result<Vec<Complaint>, StoreError>;

    async fn comments_for(&self, id: ComplaintId) -> Result<Vec<Comment>, StoreError>;

    async fn count_comments_for_stage(
        &self,
        id: ComplaintId,
        stage: Stage,
    ) -> Result<usize, StoreError>;

    async fn workflow_for(&self, id: ComplaintId) -> Result<Vec<WorkflowStepRecord>, StoreError>;

    async fn files_for(&self, id: ComplaintId) -> Result<Vec<FileRecord>, StoreError>;

    /// Compare-and-swap the complaint's stage from `expected` to `next`,
    /// appending a workflow record with `note`. Returns `None` without
    /// writing anything when the stored stage is no longer `expected`.
    async fn transition_stage(
        &self,
        id: ComplaintId,
        expected: Stage,
        next: Stage,
        note: String,
    ) -> Result<Option<Complaint>, StoreError>;

    async fn insert_comment(&self, new: NewComment) -> Result<Comment, StoreError>;

    async fn insert_file(&self, new: NewFile) -> Result<FileRecord, StoreError>;
}

/// Account lookup and registration.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_user(&self, id: UserId) -> Result<Option<User>, StoreError>;

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;

    /// Fails with [`StoreError::Duplicate`] when the e-mail is taken.
    async fn insert_user(&self, new: NewUser) -> Result<User, StoreError>;
}

/// Normalise an e-mail for uniqueness checks.
pub fn email_key(email: &str) -> String {
    email.trim().to_ascii_lowercase()
}
