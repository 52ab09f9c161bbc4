use chrono::Utc;
use serde::{Deserialize, Serialize};

use super::email_key;
use crate::error::StoreError;
use crate::workflow::stage::Stage;
use crate::workflow::types::{
    Comment, Complaint, ComplaintId, FileRecord, NewComment, NewComplaint, NewFile, NewUser,
    User, UserId, WorkflowStepRecord,
};

pub const DOCUMENT_VERSION: u32 = 1;

/// Whole-dataset snapshot shared by the in-memory and JSON file backends.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreDocument {
    pub version: u32,
    #[serde(default)]
    pub users: Vec<User>,
    #[serde(default)]
    pub complaints: Vec<Complaint>,
    #[serde(default)]
    pub workflow: Vec<WorkflowStepRecord>,
    #[serde(default)]
    pub comments: Vec<Comment>,
    #[serde(default)]
    pub files: Vec<FileRecord>,
    #[serde(default)]
    pub next_id: i64,
}

impl Default for StoreDocument {
    fn default() -> Self {
        Self {
            version: DOCUMENT_VERSION,
            users: Vec::new(),
            complaints: Vec::new(),
            workflow: Vec::new(),
            comments: Vec::new(),
            files: Vec::new(),
            next_id: 0,
        }
    }
}

impl StoreDocument {
    /// Repair derived fields after loading external data and make sure the
    /// id sequence is ahead of every stored row.
    pub fn normalize(&mut self) -> Result<(), StoreError> {
        if self.version > DOCUMENT_VERSION {
            return Err(StoreError::Corrupt {
                reason: format!(
                    "document version {} is newer than supported version {}",
                    self.version, DOCUMENT_VERSION
                ),
            });
        }
        for complaint in &mut self.complaints {
            complaint.current_step = complaint.status.step_number();
        }
        for comment in &mut self.comments {
            comment.step_order = comment.derived_step_order();
        }
        let max_id = self
            .users
            .iter()
            .map(|u| u.id.0)
            .chain(self.complaints.iter().map(|c| c.id.0))
            .chain(self.workflow.iter().map(|w| w.id))
            .chain(self.comments.iter().map(|c| c.id))
            .chain(self.files.iter().map(|f| f.id))
            .max()
            .unwrap_or(0);
        self.next_id = self.next_id.max(max_id);
        self.version = DOCUMENT_VERSION;
        Ok(())
    }

    fn allocate_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn has_complaint(&self, id: ComplaintId) -> bool {
        self.complaints.iter().any(|c| c.id == id)
    }

    fn has_user(&self, id: UserId) -> bool {
        self.users.iter().any(|u| u.id == id)
    }

    pub fn insert_complaint(&mut self, new: NewComplaint) -> Result<Complaint, StoreError> {
        if !self.has_user(new.reported_by_id) {
            return Err(StoreError::DanglingReference {
                reason: format!("reporter {} does not exist", new.reported_by_id),
            });
        }
        let now = Utc::now();
        let complaint = Complaint {
            id: ComplaintId(self.allocate_id()),
            title: new.title,
            description: new.description,
            is_anonymous: new.is_anonymous,
            reported_by_id: new.reported_by_id,
            confidence_score: new.confidence_score,
            status: new.stage,
            current_step: new.stage.step_number(),
            created_at: now,
        };
        let record = WorkflowStepRecord {
            id: self.allocate_id(),
            complaint_id: complaint.id,
            step: new.stage,
            notes: new.initial_note,
            completed_at: now,
        };
        self.complaints.push(complaint.clone());
        self.workflow.push(record);
        Ok(complaint)
    }

    pub fn get_complaint(&self, id: ComplaintId) -> Option<Complaint> {
        self.complaints.iter().find(|c| c.id == id).cloned()
    }

    pub fn list_complaints(&self, reporter: Option<UserId>) -> Vec<Complaint> {
        self.complaints
            .iter()
            .filter(|c| reporter.map_or(true, |r| c.reported_by_id == r))
            .cloned()
            .collect()
    }

    pub fn comments_for(&self, id: ComplaintId) -> Vec<Comment> {
        self.comments
            .iter()
            .filter(|c| c.complaint_id == id)
            .cloned()
            .collect()
    }

    pub fn count_comments_for_stage(&self, id: ComplaintId, stage: Stage) -> usize {
        self.comments
            .iter()
            .filter(|c| c.complaint_id == id && c.is_tagged(stage))
            .count()
    }

    pub fn workflow_for(&self, id: ComplaintId) -> Vec<WorkflowStepRecord> {
        self.workflow
            .iter()
            .filter(|w| w.complaint_id == id)
            .cloned()
            .collect()
    }

    pub fn files_for(&self, id: ComplaintId) -> Vec<FileRecord> {
        self.files
            .iter()
            .filter(|f| f.complaint_id == id)
            .cloned()
            .collect()
    }

    pub fn transition_stage(
        &mut self,
        id: ComplaintId,
        expected: Stage,
        next: Stage,
        note: String,
    ) -> Option<Complaint> {
        let position = self
            .complaints
            .iter()
            .position(|c| c.id == id && c.status == expected)?;
        let record_id = self.allocate_id();
        let complaint = &mut self.complaints[position];
        complaint.status = next;
        complaint.current_step = next.step_number();
        let updated = complaint.clone();
        self.workflow.push(WorkflowStepRecord {
            id: record_id,
            complaint_id: id,
            step: next,
            notes: note,
            completed_at: Utc::now(),
        });
        Some(updated)
    }

    pub fn insert_comment(&mut self, new: NewComment) -> Result<Comment, StoreError> {
        if !self.has_complaint(new.complaint_id) {
            return Err(StoreError::DanglingReference {
                reason: format!("complaint {} does not exist", new.complaint_id),
            });
        }
        let comment = Comment {
            id: self.allocate_id(),
            complaint_id: new.complaint_id,
            author_id: new.author_id,
            step_order: new.step_order(),
            step: Some(new.step),
            content: new.content,
            created_at: Utc::now(),
        };
        self.comments.push(comment.clone());
        Ok(comment)
    }

    pub fn insert_file(&mut self, new: NewFile) -> Result<FileRecord, StoreError> {
        if !self.has_complaint(new.complaint_id) {
            return Err(StoreError::DanglingReference {
                reason: format!("complaint {} does not exist", new.complaint_id),
            });
        }
        let file = FileRecord {
            id: self.allocate_id(),
            complaint_id: new.complaint_id,
            filename: new.filename,
            filepath: new.filepath,
            mime_type: new.mime_type,
            uploaded_at: Utc::now(),
        };
        self.files.push(file.clone());
        Ok(file)
    }

    pub fn find_user(&self, id: UserId) -> Option<User> {
        self.users.iter().find(|u| u.id == id).cloned()
    }

    pub fn find_user_by_email(&self, email: &str) -> Option<User> {
        let key = email_key(email);
        self.users.iter().find(|u| email_key(&u.email) == key).cloned()
    }

    pub fn insert_user(&mut self, new: NewUser) -> Result<User, StoreError> {
        if self.find_user_by_email(&new.email).is_some() {
            return Err(StoreError::Duplicate {
                entity: "user email",
                key: email_key(&new.email),
            });
        }
        let user = User {
            id: UserId(self.allocate_id()),
            name: new.name,
            email: new.email.trim().to_string(),
            role: new.role,
            created_at: Utc::now(),
        };
        self.users.push(user.clone());
        Ok(user)
    }
}
