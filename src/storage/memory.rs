use async_trait::async_trait;
use tokio::sync::RwLock;

use super::document::StoreDocument;
use super::{ComplaintStore, UserStore};
use crate::error::StoreError;
use crate::workflow::stage::Stage;
use crate::workflow::types::{
    Comment, Complaint, ComplaintId, FileRecord, NewComment, NewComplaint, NewFile, NewUser,
    User, UserId, WorkflowStepRecord,
};

/// In-process store. Each write holds the lock for the whole operation, so
/// `transition_stage` is atomic per complaint.
#[derive(Debug, Default)]
pub struct MemoryStore {
    document: RwLock<StoreDocument>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_document(mut document: StoreDocument) -> Result<Self, StoreError> {
        document.normalize()?;
        Ok(Self {
            document: RwLock::new(document),
        })
    }

    pub async fn snapshot(&self) -> StoreDocument {
        self.document.read().await.clone()
    }
}

#[async_trait]
impl ComplaintStore for MemoryStore {
    async fn insert_complaint(&self, new: NewComplaint) -> Result<Complaint, StoreError> {
        self.document.write().await.insert_complaint(new)
    }

    async fn get_complaint(&self, id: ComplaintId) -> Result<Option<Complaint>, StoreError> {
        Ok(self.document.read().await.get_complaint(id))
    }

    async fn list_complaints(&self, reporter: Option<UserId>) -> Result<Vec<Complaint>, StoreError> {
        Ok(self.document.read().await.list_complaints(reporter))
    }

    async fn comments_for(&self, id: ComplaintId) -> Result<Vec<Comment>, StoreError> {
        Ok(self.document.read().await.comments_for(id))
    }

    async fn count_comments_for_stage(
        &self,
        id: ComplaintId,
        stage: Stage,
    ) -> Result<usize, StoreError> {
        Ok(self.document.read().await.count_comments_for_stage(id, stage))
    }

    async fn workflow_for(&self, id: ComplaintId) -> Result<Vec<WorkflowStepRecord>, StoreError> {
        Ok(self.document.read().await.workflow_for(id))
    }

    async fn files_for(&self, id: ComplaintId) -> Result<Vec<FileRecord>, StoreError> {
        Ok(self.document.read().await.files_for(id))
    }

    async fn transition_stage(
        &self,
        id: ComplaintId,
        expected: Stage,
        next: Stage,
        note: String,
    ) -> Result<Option<Complaint>, StoreError> {
        Ok(self
            .document
            .write()
            .await
            .transition_stage(id, expected, next, note))
    }

    async fn insert_comment(&self, new: NewComment) -> Result<Comment, StoreError> {
        self.document.write().await.insert_comment(new)
    }

    async fn insert_file(&self, new: NewFile) -> Result<FileRecord, StoreError> {
        self.document.write().await.insert_file(new)
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn find_user(&self, id: UserId) -> Result<Option<User>, StoreError> {
        Ok(self.document.read().await.find_user(id))
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        Ok(self.document.read().await.find_user_by_email(email))
    }

    async fn insert_user(&self, new: NewUser) -> Result<User, StoreError> {
        self.document.write().await.insert_user(new)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::types::Role;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_concurrent_transitions_only_one_wins() {
        let store = Arc::new(MemoryStore::new());
        let user = store
            .insert_user(NewUser {
                name: "Jane Smith".to_string(),
                email: "hr@example.com".to_string(),
                role: Role::Hr,
            })
            .await
            .unwrap();
        let complaint = store
            .insert_complaint(NewComplaint {
                title: "Noise".to_string(),
                description: "Open office noise".to_string(),
                is_anonymous: false,
                reported_by_id: user.id,
                confidence_score: 0.1,
                stage: Stage::Received,
                initial_note: "Complaint received".to_string(),
            })
            .await
            .unwrap();

        let id = complaint.id;
        let mut handles = Vec::new();
        for i in 0..8 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store
                    .transition_stage(
                        id,
                        Stage::Received,
                        Stage::Review,
                        format!("attempt {i}"),
                    )
                    .await
                    .unwrap()
            }));
        }

        let mut winners = 0;
        for handle in handles {
            if handle.await.unwrap().is_some() {
                winners += 1;
            }
        }
        assert_eq!(winners, 1);
        assert_eq!(store.workflow_for(complaint.id).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_from_document_normalizes() {
        let mut doc = StoreDocument::default();
        doc.next_id = -5;
        let store = MemoryStore::from_document(doc).unwrap();
        assert_eq!(store.snapshot().await.next_id, 0);
    }
}
