use regex::Regex;
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, LazyLock};
use std::time::Duration;
use tracing::{error, info, warn};

use super::scoring::{normalize_score, ConfidenceScorer};
use super::stage::Stage;
use super::types::{
    AuthoredComment, Comment, Complaint, ComplaintDetail, ComplaintId, FileRecord, NewComment,
    NewComplaint, NewFile, NewUser, Role, User, UserId, WorkflowStepRecord,
};
use crate::error::{StoreError, WorkflowError, WorkflowResult};
use crate::storage::{email_key, ComplaintStore, UserStore};

static EMAIL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("Invalid email regex pattern")
});

const DEFAULT_MIME_TYPE: &str = "application/octet-stream";

/// Identity recorded as reporter when a complaint arrives without one.
#[derive(Debug, Clone, PartialEq)]
pub struct FallbackReporter {
    pub name: String,
    pub email: String,
}

impl Default for FallbackReporter {
    fn default() -> Self {
        Self {
            name: "Anonymous Reporter".to_string(),
            email: "anonymous@trustshield.local".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct EngineSettings {
    /// Upper bound for every storage call.
    pub storage_timeout: Duration,
    pub fallback_reporter: FallbackReporter,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            storage_timeout: Duration::from_secs(5),
            fallback_reporter: FallbackReporter::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SubmitComplaint {
    pub title: String,
    pub description: String,
    pub is_anonymous: bool,
    /// Authenticated reporter, if any.
    pub reporter: Option<UserId>,
}

/// Metadata of a file whose bytes were already stored by the upload layer.
#[derive(Debug, Clone, PartialEq)]
pub struct FileUpload {
    pub filename: String,
    pub storage_path: String,
    pub mime_type: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommentOrder {
    /// Stage order first, then creation time.
    Workflow,
    NewestFirst,
}

pub fn order_comments(comments: &mut [Comment], order: CommentOrder) {
    match order {
        CommentOrder::Workflow => {
            comments.sort_by(|a, b| {
                (a.step_order, a.created_at, a.id).cmp(&(b.step_order, b.created_at, b.id))
            });
        }
        CommentOrder::NewestFirst => {
            comments.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));
        }
    }
}

pub fn order_workflow(records: &mut [WorkflowStepRecord]) {
    records.sort_by(|a, b| (a.completed_at, a.id).cmp(&(b.completed_at, b.id)));
}

pub fn order_newest_first(complaints: &mut [Complaint]) {
    complaints.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));
}

/// The fallback identity only ever files complaints, so any other role
/// means the account was tampered with.
fn checked_fallback(operation: &'static str, user: User) -> WorkflowResult<User> {
    if user.role == Role::Employee {
        return Ok(user);
    }
    Err(storage_failure(
        operation,
        StoreError::Corrupt {
            reason: format!(
                "fallback reporter {} has role {}, expected EMPLOYEE",
                user.id, user.role
            ),
        },
    ))
}

fn storage_failure(operation: &'static str, source: StoreError) -> WorkflowError {
    error!(
        operation = operation,
        retriable = source.is_retriable(),
        error = %source,
        "Storage operation failed"
    );
    WorkflowError::infrastructure(operation, source)
}

/// Owns the complaint lifecycle: intake, stage transitions, stage-tagged
/// comments and evidence metadata.
///
/// Callers are trusted to have made the authorization decision; the engine
/// enforces only workflow rules.
pub struct ComplaintWorkflowEngine {
    complaints: Arc<dyn ComplaintStore>,
    users: Arc<dyn UserStore>,
    scorer: Arc<dyn ConfidenceScorer>,
    settings: EngineSettings,
}

impl ComplaintWorkflowEngine {
    pub fn new(
        complaints: Arc<dyn ComplaintStore>,
        users: Arc<dyn UserStore>,
        scorer: Arc<dyn ConfidenceScorer>,
        settings: EngineSettings,
    ) -> Self {
        Self {
            complaints,
            users,
            scorer,
            settings,
        }
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// Run a storage call under the configured timeout.
    async fn timed<T, F>(&self, operation: &'static str, fut: F) -> Result<T, StoreError>
    where
        F: Future<Output = Result<T, StoreError>>,
    {
        let limit = self.settings.storage_timeout;
        match tokio::time::timeout(limit, fut).await {
            Ok(result) => result,
            Err(_) => Err(StoreError::Timeout {
                operation: operation.to_string(),
                duration_ms: limit.as_millis() as u64,
            }),
        }
    }

    /// Like [`Self::timed`], mapping every failure to
    /// [`WorkflowError::Infrastructure`].
    async fn call<T, F>(&self, operation: &'static str, fut: F) -> WorkflowResult<T>
    where
        F: Future<Output = Result<T, StoreError>>,
    {
        self.timed(operation, fut)
            .await
            .map_err(|source| storage_failure(operation, source))
    }

    async fn require_complaint(
        &self,
        operation: &'static str,
        id: ComplaintId,
    ) -> WorkflowResult<Complaint> {
        self.call(operation, self.complaints.get_complaint(id))
            .await?
            .ok_or_else(|| WorkflowError::not_found("Complaint not found"))
    }

    /// Submit a new complaint. Without a reporter the complaint is recorded
    /// against the fallback identity and is always anonymous.
    pub async fn submit(&self, request: SubmitComplaint) -> WorkflowResult<ComplaintDetail> {
        const OP: &str = "submit_complaint";

        let title = request.title.trim();
        let description = request.description.trim();
        if title.is_empty() || description.is_empty() {
            return Err(WorkflowError::validation("Title and description required"));
        }

        let reporter = match request.reporter {
            Some(id) => self
                .call(OP, self.users.find_user(id))
                .await?
                .ok_or_else(|| WorkflowError::not_found("reporter account not found"))?,
            None => self.fallback_reporter(OP).await?,
        };
        let is_anonymous = request.is_anonymous || request.reporter.is_none();
        let confidence_score = normalize_score(self.scorer.score(title, description));

        let complaint = self
            .call(
                OP,
                self.complaints.insert_complaint(NewComplaint {
                    title: title.to_string(),
                    description: description.to_string(),
                    is_anonymous,
                    reported_by_id: reporter.id,
                    confidence_score,
                    stage: Stage::Received,
                    initial_note: "Complaint received".to_string(),
                }),
            )
            .await?;

        info!(
            complaint_id = %complaint.id,
            is_anonymous = is_anonymous,
            confidence_score = confidence_score,
            "Complaint submitted"
        );

        self.assemble(OP, complaint, CommentOrder::Workflow).await
    }

    async fn fallback_reporter(&self, operation: &'static str) -> WorkflowResult<User> {
        let fallback = &self.settings.fallback_reporter;
        if let Some(user) = self
            .call(operation, self.users.find_user_by_email(&fallback.email))
            .await?
        {
            return checked_fallback(operation, user);
        }

        let created = self.users.insert_user(NewUser {
            name: fallback.name.clone(),
            email: fallback.email.clone(),
            role: Role::Employee,
        });
        match self.timed(operation, created).await {
            Ok(user) => {
                info!(user_id = %user.id, email = %user.email, "Created fallback reporter identity");
                Ok(user)
            }
            // Another submission created it first.
            Err(StoreError::Duplicate { .. }) => {
                let user = self
                    .call(operation, self.users.find_user_by_email(&fallback.email))
                    .await?
                    .ok_or_else(|| {
                        storage_failure(
                            operation,
                            StoreError::DanglingReference {
                                reason: "fallback reporter vanished after duplicate insert"
                                    .to_string(),
                            },
                        )
                    })?;
                checked_fallback(operation, user)
            }
            Err(e) => Err(storage_failure(operation, e)),
        }
    }

    pub async fn get_by_id(&self, id: ComplaintId) -> WorkflowResult<ComplaintDetail> {
        const OP: &str = "fetch_complaint";
        let complaint = self.require_complaint(OP, id).await?;
        self.assemble(OP, complaint, CommentOrder::Workflow).await
    }

    /// Every complaint, newest first. Intended for HR callers only.
    pub async fn list_all(&self) -> WorkflowResult<Vec<ComplaintDetail>> {
        const OP: &str = "fetch_complaints";
        let complaints = self.call(OP, self.complaints.list_complaints(None)).await?;
        self.assemble_many(OP, complaints, CommentOrder::Workflow)
            .await
    }

    /// Complaints owned by `reporter`, newest first, comments newest first.
    pub async fn list_by_reporter(&self, reporter: UserId) -> WorkflowResult<Vec<ComplaintDetail>> {
        const OP: &str = "fetch_your_complaints";
        let complaints = self
            .call(OP, self.complaints.list_complaints(Some(reporter)))
            .await?;
        self.assemble_many(OP, complaints, CommentOrder::NewestFirst)
            .await
    }

    /// Move a complaint to the next stage.
    ///
    /// The requested stage must be the immediate successor of the current
    /// one (checked first), and the current stage must have at least one
    /// comment (checked second). The write is a compare-and-swap on the
    /// stage read here; losing a race reports the stage now required.
    pub async fn advance_stage(
        &self,
        id: ComplaintId,
        requested: &str,
        note: Option<String>,
    ) -> WorkflowResult<ComplaintDetail> {
        const OP: &str = "update_complaint_status";

        let complaint = self.require_complaint(OP, id).await?;
        let current = complaint.status;
        let requested_stage = requested.trim().parse::<Stage>().ok();

        let next = match current.next() {
            Some(next) if requested_stage == Some(next) => next,
            required => {
                warn!(
                    complaint_id = %id,
                    current = %current,
                    requested = requested,
                    "Rejected out-of-order stage transition"
                );
                return Err(WorkflowError::InvalidTransition {
                    current,
                    requested: requested.trim().to_string(),
                    required,
                });
            }
        };

        let documented = self
            .call(OP, self.complaints.count_comments_for_stage(id, current))
            .await?;
        if documented == 0 {
            warn!(
                complaint_id = %id,
                stage = %current,
                "Stage transition blocked: no comment for current stage"
            );
            return Err(WorkflowError::Precondition { stage: current });
        }

        let note = note
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| format!("Moved to {next}"));

        match self
            .call(OP, self.complaints.transition_stage(id, current, next, note))
            .await?
        {
            Some(updated) => {
                info!(
                    complaint_id = %id,
                    from = %current,
                    to = %next,
                    current_step = updated.current_step,
                    "Complaint advanced"
                );
                self.assemble(OP, updated, CommentOrder::Workflow).await
            }
            None => {
                let latest = self.require_complaint(OP, id).await?;
                warn!(
                    complaint_id = %id,
                    expected = %current,
                    actual = %latest.status,
                    "Stage changed concurrently; transition rejected"
                );
                Err(WorkflowError::InvalidTransition {
                    current: latest.status,
                    requested: requested.trim().to_string(),
                    required: latest.status.next(),
                })
            }
        }
    }

    /// Record a comment against any stage of the complaint, past or current.
    pub async fn add_comment(
        &self,
        complaint_id: ComplaintId,
        author_id: UserId,
        content: &str,
        stage: Option<&str>,
    ) -> WorkflowResult<AuthoredComment> {
        const OP: &str = "add_comment";

        let content = content.trim();
        if content.is_empty() {
            return Err(WorkflowError::validation("Comment content required"));
        }
        let tag = stage.map(str::trim).filter(|s| !s.is_empty()).ok_or_else(|| {
            WorkflowError::validation("Workflow step required for comment")
        })?;
        let step = tag.parse::<Stage>().map_err(|_| {
            WorkflowError::validation(format!(
                "Unknown workflow step '{tag}'. Expected one of: {}",
                Stage::workflow_path()
            ))
        })?;

        self.require_complaint(OP, complaint_id).await?;
        let author = self
            .call(OP, self.users.find_user(author_id))
            .await?
            .ok_or_else(|| WorkflowError::not_found("Author account not found"))?;

        let comment = self
            .call(
                OP,
                self.complaints.insert_comment(NewComment {
                    complaint_id,
                    author_id,
                    content: content.to_string(),
                    step,
                }),
            )
            .await?;

        info!(
            complaint_id = %complaint_id,
            comment_id = comment.id,
            step = %step,
            author_id = %author_id,
            "Comment added"
        );

        Ok(AuthoredComment { comment, author })
    }

    /// Record metadata for evidence whose bytes are already stored.
    pub async fn attach_file(
        &self,
        complaint_id: ComplaintId,
        upload: Option<FileUpload>,
    ) -> WorkflowResult<FileRecord> {
        const OP: &str = "upload_file";

        let upload = upload.ok_or_else(|| WorkflowError::validation("No file provided"))?;
        let filename = upload.filename.trim();
        if filename.is_empty() {
            return Err(WorkflowError::validation("File name required"));
        }
        let mime_type = match upload.mime_type.trim() {
            "" => DEFAULT_MIME_TYPE,
            m => m,
        };

        self.require_complaint(OP, complaint_id).await?;
        let file = self
            .call(
                OP,
                self.complaints.insert_file(NewFile {
                    complaint_id,
                    filename: filename.to_string(),
                    filepath: upload.storage_path.clone(),
                    mime_type: mime_type.to_string(),
                }),
            )
            .await?;

        info!(
            complaint_id = %complaint_id,
            file_id = file.id,
            mime_type = %file.mime_type,
            "Evidence file attached"
        );
        Ok(file)
    }

    pub async fn register_user(&self, name: &str, email: &str, role: Role) -> WorkflowResult<User> {
        const OP: &str = "register_user";

        let name = name.trim();
        let email = email.trim();
        if name.is_empty() {
            return Err(WorkflowError::validation("Name is required"));
        }
        if !EMAIL_PATTERN.is_match(email) {
            return Err(WorkflowError::validation("A valid email address is required"));
        }
        if email_key(email) == email_key(&self.settings.fallback_reporter.email) {
            warn!("Registration attempted with the reserved fallback reporter address");
            return Err(WorkflowError::validation(
                "This email address is reserved for anonymous submissions",
            ));
        }

        let inserted = self.users.insert_user(NewUser {
            name: name.to_string(),
            email: email.to_string(),
            role,
        });
        match self.timed(OP, inserted).await {
            Ok(user) => {
                info!(user_id = %user.id, role = %user.role, "User registered");
                Ok(user)
            }
            Err(StoreError::Duplicate { .. }) => Err(WorkflowError::validation(
                "An account with this email already exists",
            )),
            Err(e) => Err(storage_failure(OP, e)),
        }
    }

    pub async fn find_user(&self, id: UserId) -> WorkflowResult<Option<User>> {
        self.call("resolve_user", self.users.find_user(id)).await
    }

    pub async fn find_user_by_email(&self, email: &str) -> WorkflowResult<Option<User>> {
        self.call("resolve_user", self.users.find_user_by_email(email))
            .await
    }

    async fn assemble_many(
        &self,
        operation: &'static str,
        mut complaints: Vec<Complaint>,
        order: CommentOrder,
    ) -> WorkflowResult<Vec<ComplaintDetail>> {
        order_newest_first(&mut complaints);
        let mut details = Vec::with_capacity(complaints.len());
        for complaint in complaints {
            details.push(self.assemble(operation, complaint, order).await?);
        }
        Ok(details)
    }

    async fn assemble(
        &self,
        operation: &'static str,
        complaint: Complaint,
        order: CommentOrder,
    ) -> WorkflowResult<ComplaintDetail> {
        let id = complaint.id;
        let mut comments = self.call(operation, self.complaints.comments_for(id)).await?;
        let mut workflow = self.call(operation, self.complaints.workflow_for(id)).await?;
        let files = self.call(operation, self.complaints.files_for(id)).await?;

        order_comments(&mut comments, order);
        order_workflow(&mut workflow);

        let mut people: HashMap<UserId, Option<User>> = HashMap::new();
        let reporter = self
            .lookup_user(operation, &mut people, complaint.reported_by_id)
            .await?;

        let mut authored = Vec::with_capacity(comments.len());
        for comment in comments {
            let author = self
                .lookup_user(operation, &mut people, comment.author_id)
                .await?
                .ok_or_else(|| {
                    storage_failure(
                        operation,
                        StoreError::DanglingReference {
                            reason: format!(
                                "comment {} references missing author {}",
                                comment.id, comment.author_id
                            ),
                        },
                    )
                })?;
            authored.push(AuthoredComment { comment, author });
        }

        Ok(ComplaintDetail {
            complaint,
            reporter,
            comments: authored,
            workflow,
            files,
        })
    }

    async fn lookup_user(
        &self,
        operation: &'static str,
        cache: &mut HashMap<UserId, Option<User>>,
        id: UserId,
    ) -> WorkflowResult<Option<User>> {
        if let Some(hit) = cache.get(&id) {
            return Ok(hit.clone());
        }
        let user = self.call(operation, self.users.find_user(id)).await?;
        cache.insert(id, user.clone());
        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{MemoryStore, MockComplaintStore};
    use crate::workflow::scoring::FixedScorer;
    use chrono::{Duration as ChronoDuration, Utc};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn engine_with(complaints: Arc<dyn ComplaintStore>, users: Arc<dyn UserStore>) -> ComplaintWorkflowEngine {
        ComplaintWorkflowEngine::new(
            complaints,
            users,
            Arc::new(FixedScorer(0.5)),
            EngineSettings::default(),
        )
    }

    fn memory_engine() -> ComplaintWorkflowEngine {
        let store = Arc::new(MemoryStore::new());
        engine_with(store.clone(), store)
    }

    fn complaint_at(stage: Stage) -> Complaint {
        Complaint {
            id: ComplaintId(1),
            title: "t".to_string(),
            description: "d".to_string(),
            is_anonymous: false,
            reported_by_id: UserId(1),
            confidence_score: 0.5,
            status: stage,
            current_step: stage.step_number(),
            created_at: Utc::now(),
        }
    }

    fn comment(id: i64, step: Stage, minutes_ago: i64) -> Comment {
        Comment {
            id,
            complaint_id: ComplaintId(1),
            author_id: UserId(2),
            content: format!("comment {id}"),
            step: Some(step),
            step_order: step.step_number(),
            created_at: Utc::now() - ChronoDuration::minutes(minutes_ago),
        }
    }

    #[test]
    fn test_workflow_comment_order_ignores_authoring_time() {
        let mut comments = vec![
            comment(1, Stage::Review, 30),
            comment(2, Stage::Received, 5),
            comment(3, Stage::Received, 20),
        ];
        order_comments(&mut comments, CommentOrder::Workflow);
        let ids: Vec<i64> = comments.iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![3, 2, 1]);
    }

    #[test]
    fn test_newest_first_comment_order() {
        let mut comments = vec![
            comment(1, Stage::Review, 30),
            comment(2, Stage::Received, 5),
            comment(3, Stage::Received, 20),
        ];
        order_comments(&mut comments, CommentOrder::NewestFirst);
        let ids: Vec<i64> = comments.iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![2, 3, 1]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_storage_surfaces_as_retriable_infrastructure_error() {
        let engine = memory_engine();
        let slow = async {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok::<_, StoreError>(())
        };
        let err = engine.call("fetch_complaint", slow).await.unwrap_err();
        assert!(matches!(
            err,
            WorkflowError::Infrastructure {
                source: StoreError::Timeout { .. },
                ..
            }
        ));
        assert!(err.is_retriable());
        assert!(!err.is_domain());
    }

    #[tokio::test]
    async fn test_storage_failure_is_opaque_to_caller() {
        let mut store = MockComplaintStore::new();
        store.expect_get_complaint().returning(|_| {
            Err(StoreError::Corrupt {
                reason: "complaints row 1 unreadable".to_string(),
            })
        });
        let engine = engine_with(Arc::new(store), Arc::new(MemoryStore::new()));

        let err = engine.get_by_id(ComplaintId(1)).await.unwrap_err();
        assert!(matches!(err, WorkflowError::Infrastructure { .. }));
        assert_eq!(err.public_message(), "Failed to fetch complaint");
    }

    #[tokio::test]
    async fn test_lost_race_reports_newly_required_stage() {
        let reads = Arc::new(AtomicUsize::new(0));
        let mut store = MockComplaintStore::new();
        let counter = reads.clone();
        store.expect_get_complaint().returning(move |_| {
            if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                Ok(Some(complaint_at(Stage::Received)))
            } else {
                Ok(Some(complaint_at(Stage::Review)))
            }
        });
        store
            .expect_count_comments_for_stage()
            .returning(|_, _| Ok(1));
        store
            .expect_transition_stage()
            .times(1)
            .returning(|_, _, _, _| Ok(None));
        let engine = engine_with(Arc::new(store), Arc::new(MemoryStore::new()));

        let err = engine
            .advance_stage(ComplaintId(1), "REVIEW", None)
            .await
            .unwrap_err();
        match err {
            WorkflowError::InvalidTransition {
                current, required, ..
            } => {
                assert_eq!(current, Stage::Review);
                assert_eq!(required, Some(Stage::Investigation));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(reads.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_order_check_runs_before_comment_gate() {
        let mut store = MockComplaintStore::new();
        store
            .expect_get_complaint()
            .returning(|_| Ok(Some(complaint_at(Stage::Received))));
        store.expect_count_comments_for_stage().never();
        store.expect_transition_stage().never();
        let engine = engine_with(Arc::new(store), Arc::new(MemoryStore::new()));

        let err = engine
            .advance_stage(ComplaintId(1), "ACTION", None)
            .await
            .unwrap_err();
        assert!(matches!(err, WorkflowError::InvalidTransition { .. }));
    }

    #[tokio::test]
    async fn test_fallback_reporter_created_once() {
        let engine = memory_engine();
        let first = engine
            .submit(SubmitComplaint {
                title: "Anonymous tip".to_string(),
                description: "Something happened".to_string(),
                is_anonymous: false,
                reporter: None,
            })
            .await
            .unwrap();
        let second = engine
            .submit(SubmitComplaint {
                title: "Another tip".to_string(),
                description: "Something else".to_string(),
                is_anonymous: true,
                reporter: None,
            })
            .await
            .unwrap();

        assert!(first.complaint.is_anonymous);
        assert_eq!(
            first.complaint.reported_by_id,
            second.complaint.reported_by_id
        );
        let reporter = first.reporter.unwrap();
        assert_eq!(reporter.email, "anonymous@trustshield.local");
        assert_eq!(reporter.role, Role::Employee);
    }

    #[tokio::test]
    async fn test_register_user_validation() {
        let engine = memory_engine();
        let err = engine
            .register_user("  ", "a@b.com", Role::Hr)
            .await
            .unwrap_err();
        assert!(matches!(err, WorkflowError::Validation(_)));

        let err = engine
            .register_user("Jane", "not-an-email", Role::Hr)
            .await
            .unwrap_err();
        assert!(matches!(err, WorkflowError::Validation(_)));

        engine
            .register_user("Jane Smith", "hr@example.com", Role::Hr)
            .await
            .unwrap();
        let err = engine
            .register_user("Jane Again", "HR@example.com", Role::Hr)
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "An account with this email already exists"
        );
    }

    #[tokio::test]
    async fn test_fallback_address_cannot_be_registered() {
        let engine = memory_engine();
        for email in ["anonymous@trustshield.local", " Anonymous@TrustShield.local "] {
            let err = engine
                .register_user("Squatter", email, Role::Hr)
                .await
                .unwrap_err();
            assert!(matches!(err, WorkflowError::Validation(_)));
        }
        assert!(engine
            .find_user_by_email("anonymous@trustshield.local")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_fallback_identity_with_wrong_role_is_refused() {
        let store = Arc::new(MemoryStore::new());
        let engine = engine_with(store.clone(), store.clone());
        store
            .insert_user(NewUser {
                name: "Squatter".to_string(),
                email: "anonymous@trustshield.local".to_string(),
                role: Role::Hr,
            })
            .await
            .unwrap();

        let err = engine
            .submit(SubmitComplaint {
                title: "Anonymous tip".to_string(),
                description: "Something happened".to_string(),
                is_anonymous: true,
                reporter: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            WorkflowError::Infrastructure {
                source: StoreError::Corrupt { .. },
                ..
            }
        ));
        assert!(engine.list_all().await.unwrap().is_empty());
    }
}
