//! Client-facing views of stored complaints.
//!
//! Confidentiality is applied here and nowhere else: storage and the engine
//! always keep the reporter reference, and [`project`] decides per viewer
//! whether it leaves the process.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::stage::Stage;
use super::types::{
    AuthoredComment, ComplaintDetail, ComplaintId, FileRecord, Role, User, UserId,
    WorkflowStepRecord,
};

/// Who a projection is being rendered for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Viewer {
    Hr,
    Employee(UserId),
    Public,
}

impl Viewer {
    pub fn for_user(user: Option<&User>) -> Self {
        match user {
            Some(u) if u.role == Role::Hr => Viewer::Hr,
            Some(u) => Viewer::Employee(u.id),
            None => Viewer::Public,
        }
    }

    pub fn sees_anonymous_reporters(self) -> bool {
        matches!(self, Viewer::Hr)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserView {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub role: Role,
}

impl From<&User> for UserView {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
            role: user.role,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentView {
    pub id: i64,
    pub content: String,
    pub step: Option<Stage>,
    pub step_order: u8,
    pub author: UserView,
    pub created_at: DateTime<Utc>,
}

impl From<&AuthoredComment> for CommentView {
    fn from(c: &AuthoredComment) -> Self {
        Self {
            id: c.comment.id,
            content: c.comment.content.clone(),
            step: c.comment.step,
            step_order: c.comment.step_order,
            author: UserView::from(&c.author),
            created_at: c.comment.created_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComplaintView {
    pub id: ComplaintId,
    pub title: String,
    pub description: String,
    pub is_anonymous: bool,
    pub reported_by_id: Option<UserId>,
    pub reported_by: Option<UserView>,
    pub confidence_score: f64,
    pub status: Stage,
    pub current_step: u8,
    pub created_at: DateTime<Utc>,
    pub comments: Vec<CommentView>,
    pub workflow: Vec<WorkflowStepRecord>,
    pub files: Vec<FileRecord>,
}

/// Render `detail` for `viewer`. Anonymous complaints lose their reporter
/// fields for every viewer except HR.
pub fn project(detail: &ComplaintDetail, viewer: Viewer) -> ComplaintView {
    let c = &detail.complaint;
    let reveal = !c.is_anonymous || viewer.sees_anonymous_reporters();

    ComplaintView {
        id: c.id,
        title: c.title.clone(),
        description: c.description.clone(),
        is_anonymous: c.is_anonymous,
        reported_by_id: reveal.then_some(c.reported_by_id),
        reported_by: if reveal {
            detail.reporter.as_ref().map(UserView::from)
        } else {
            None
        },
        confidence_score: c.confidence_score,
        status: c.status,
        current_step: c.current_step,
        created_at: c.created_at,
        comments: detail.comments.iter().map(CommentView::from).collect(),
        workflow: detail.workflow.clone(),
        files: detail.files.clone(),
    }
}

pub fn project_all(details: &[ComplaintDetail], viewer: Viewer) -> Vec<ComplaintView> {
    details.iter().map(|d| project(d, viewer)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::types::{Comment, Complaint};

    fn user(id: i64, role: Role) -> User {
        User {
            id: UserId(id),
            name: format!("user{id}"),
            email: format!("user{id}@example.com"),
            role,
            created_at: Utc::now(),
        }
    }

    fn detail(is_anonymous: bool) -> ComplaintDetail {
        let reporter = user(1, Role::Employee);
        let hr = user(2, Role::Hr);
        ComplaintDetail {
            complaint: Complaint {
                id: ComplaintId(10),
                title: "Hostile environment".to_string(),
                description: "Excluded from meetings".to_string(),
                is_anonymous,
                reported_by_id: reporter.id,
                confidence_score: 0.5,
                status: Stage::Received,
                current_step: 1,
                created_at: Utc::now(),
            },
            reporter: Some(reporter),
            comments: vec![AuthoredComment {
                comment: Comment {
                    id: 1,
                    complaint_id: ComplaintId(10),
                    author_id: hr.id,
                    content: "Acknowledged".to_string(),
                    step: Some(Stage::Received),
                    step_order: 1,
                    created_at: Utc::now(),
                },
                author: hr,
            }],
            workflow: vec![],
            files: vec![],
        }
    }

    #[test]
    fn test_anonymous_reporter_hidden_from_non_hr() {
        let d = detail(true);
        for viewer in [Viewer::Public, Viewer::Employee(UserId(1)), Viewer::Employee(UserId(9))] {
            let view = project(&d, viewer);
            assert_eq!(view.reported_by_id, None);
            assert_eq!(view.reported_by, None);
            assert!(view.is_anonymous);
        }
    }

    #[test]
    fn test_hr_sees_reporter_of_anonymous_complaint() {
        let view = project(&detail(true), Viewer::Hr);
        assert_eq!(view.reported_by_id, Some(UserId(1)));
        assert_eq!(view.reported_by.unwrap().email, "user1@example.com");
    }

    #[test]
    fn test_named_complaint_shows_reporter_to_everyone() {
        let view = project(&detail(false), Viewer::Public);
        assert_eq!(view.reported_by_id, Some(UserId(1)));
        assert!(view.reported_by.is_some());
    }

    #[test]
    fn test_comment_author_never_hidden() {
        let view = project(&detail(true), Viewer::Public);
        assert_eq!(view.comments[0].author.role, Role::Hr);
        assert_eq!(view.comments[0].author.name, "user2");
    }

    #[test]
    fn test_anonymous_projection_json_has_null_reporter() {
        let value = serde_json::to_value(project(&detail(true), Viewer::Public)).unwrap();
        assert!(value["reportedBy"].is_null());
        assert!(value["reportedById"].is_null());
        assert_eq!(value["comments"][0]["stepOrder"], 1);
        assert_eq!(value["comments"][0]["step"], "RECEIVED");
    }

    #[test]
    fn test_viewer_for_user() {
        assert_eq!(Viewer::for_user(None), Viewer::Public);
        assert_eq!(Viewer::for_user(Some(&user(2, Role::Hr))), Viewer::Hr);
        assert_eq!(
            Viewer::for_user(Some(&user(1, Role::Employee))),
            Viewer::Employee(UserId(1))
        );
    }
}
