use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

use super::stage::Stage;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ComplaintId(pub i64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub i64);

impl fmt::Display for ComplaintId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Employee,
    Hr,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Employee => "EMPLOYEE",
            Role::Hr => "HR",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "EMPLOYEE" => Ok(Role::Employee),
            "HR" => Ok(Role::Hr),
            other => Err(format!("unknown role '{other}', expected EMPLOYEE or HR")),
        }
    }
}

/// A registered account. Credentials live with the authentication
/// collaborator and are never held here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub role: Role,
}

/// Stored complaint row. `current_step` always equals
/// `status.step_number()`; stores derive it, callers never set it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Complaint {
    pub id: ComplaintId,
    pub title: String,
    pub description: String,
    pub is_anonymous: bool,
    pub reported_by_id: UserId,
    pub confidence_score: f64,
    pub status: Stage,
    pub current_step: u8,
    pub created_at: DateTime<Utc>,
}

impl Complaint {
    pub fn step_is_consistent(&self) -> bool {
        self.current_step == self.status.step_number()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewComplaint {
    pub title: String,
    pub description: String,
    pub is_anonymous: bool,
    pub reported_by_id: UserId,
    pub confidence_score: f64,
    pub stage: Stage,
    /// Note for the workflow record written together with the complaint.
    pub initial_note: String,
}

/// Append-only history entry, one per stage entered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowStepRecord {
    pub id: i64,
    pub complaint_id: ComplaintId,
    pub step: Stage,
    pub notes: String,
    pub completed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: i64,
    pub complaint_id: ComplaintId,
    pub author_id: UserId,
    pub content: String,
    /// `None` for legacy rows whose tag is missing or unrecognised.
    #[serde(default, deserialize_with = "lenient_stage")]
    pub step: Option<Stage>,
    #[serde(default = "default_step_order")]
    pub step_order: u8,
    pub created_at: DateTime<Utc>,
}

fn default_step_order() -> u8 {
    Stage::order_of(None)
}

impl Comment {
    /// Stage the comment counts towards for the advance gate.
    pub fn is_tagged(&self, stage: Stage) -> bool {
        self.step == Some(stage)
    }

    /// `stepOrder` implied by the tag, RECEIVED when untagged.
    pub fn derived_step_order(&self) -> u8 {
        self.step.unwrap_or(Stage::Received).step_number()
    }
}

fn lenient_stage<'de, D>(deserializer: D) -> Result<Option<Stage>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.as_deref().and_then(|tag| tag.parse().ok()))
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewComment {
    pub complaint_id: ComplaintId,
    pub author_id: UserId,
    pub content: String,
    pub step: Stage,
}

impl NewComment {
    pub fn step_order(&self) -> u8 {
        self.step.step_number()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileRecord {
    pub id: i64,
    pub complaint_id: ComplaintId,
    pub filename: String,
    pub filepath: String,
    pub mime_type: String,
    pub uploaded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewFile {
    pub complaint_id: ComplaintId,
    pub filename: String,
    pub filepath: String,
    pub mime_type: String,
}

/// Comment joined with its author. Authors are never hidden.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthoredComment {
    pub comment: Comment,
    pub author: User,
}

/// Everything the engine knows about one complaint, before any
/// viewer-specific filtering.
#[derive(Debug, Clone, PartialEq)]
pub struct ComplaintDetail {
    pub complaint: Complaint,
    pub reporter: Option<User>,
    pub comments: Vec<AuthoredComment>,
    pub workflow: Vec<WorkflowStepRecord>,
    pub files: Vec<FileRecord>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_parsing() {
        assert_eq!("hr".parse::<Role>(), Ok(Role::Hr));
        assert_eq!("Employee".parse::<Role>(), Ok(Role::Employee));
        assert!("ADMIN".parse::<Role>().is_err());
    }

    #[test]
    fn test_complaint_serializes_with_client_field_names() {
        let complaint = Complaint {
            id: ComplaintId(3),
            title: "Late-night message".to_string(),
            description: "Received messages after hours".to_string(),
            is_anonymous: false,
            reported_by_id: UserId(1),
            confidence_score: 0.25,
            status: Stage::Review,
            current_step: 2,
            created_at: Utc::now(),
        };
        let value = serde_json::to_value(&complaint).unwrap();
        assert_eq!(value["isAnonymous"], false);
        assert_eq!(value["status"], "REVIEW");
        assert_eq!(value["currentStep"], 2);
        assert_eq!(value["confidenceScore"], 0.25);
        assert!(value.get("createdAt").is_some());
        assert!(complaint.step_is_consistent());
    }

    #[test]
    fn test_comment_with_unknown_tag_loads_as_untagged() {
        let json = r#"{
            "id": 4,
            "complaintId": 1,
            "authorId": 2,
            "content": "Recommended training for team.",
            "step": "ESCALATION",
            "stepOrder": 9,
            "createdAt": "2026-01-28T10:00:00Z"
        }"#;
        let comment: Comment = serde_json::from_str(json).unwrap();
        assert_eq!(comment.step, None);
        assert_eq!(comment.derived_step_order(), 1);

        let untagged = r#"{
            "id": 5,
            "complaintId": 1,
            "authorId": 2,
            "content": "Manager interviewed.",
            "stepOrder": 1,
            "createdAt": "2026-01-28T10:00:00Z"
        }"#;
        let comment: Comment = serde_json::from_str(untagged).unwrap();
        assert_eq!(comment.step, None);
        assert!(!comment.is_tagged(Stage::Received));
    }

    #[test]
    fn test_new_comment_step_order_tracks_stage() {
        let comment = NewComment {
            complaint_id: ComplaintId(1),
            author_id: UserId(2),
            content: "Interviewed manager".to_string(),
            step: Stage::Investigation,
        };
        assert_eq!(comment.step_order(), 3);
    }
}
