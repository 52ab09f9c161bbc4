use serde::Serialize;
use std::collections::HashSet;
use tracing::info;

use crate::error::WorkflowResult;
use crate::workflow::engine::{ComplaintWorkflowEngine, SubmitComplaint};
use crate::workflow::stage::Stage;
use crate::workflow::types::{ComplaintId, Role, User, UserId};

pub const DEMO_EMPLOYEE_EMAIL: &str = "employee@example.com";
pub const DEMO_HR_EMAIL: &str = "hr@example.com";

const LANGUAGE_TITLE: &str = "Inappropriate Language in Team Meeting";
const DISCRIMINATION_TITLE: &str = "Discrimination Concern";
const HOSTILE_TITLE: &str = "Hostile Work Environment";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SeedSummary {
    pub users_created: usize,
    pub complaints_created: usize,
}

/// Populate a store with the demo accounts and three complaints at
/// RECEIVED, REVIEW and INVESTIGATION.
///
/// Everything goes through the engine, so the seeded data satisfies the
/// same rules as live data. Demo complaints are recognised by title, so
/// running it twice does not duplicate them and real complaints filed by
/// the demo employee do not suppress them.
pub async fn seed_demo_data(engine: &ComplaintWorkflowEngine) -> WorkflowResult<SeedSummary> {
    let mut summary = SeedSummary::default();

    let employee = ensure_user(engine, "John Doe", DEMO_EMPLOYEE_EMAIL, Role::Employee, &mut summary)
        .await?;
    let hr = ensure_user(engine, "Jane Smith", DEMO_HR_EMAIL, Role::Hr, &mut summary).await?;

    let existing: HashSet<String> = engine
        .list_by_reporter(employee.id)
        .await?
        .into_iter()
        .map(|d| d.complaint.title)
        .collect();

    if !existing.contains(LANGUAGE_TITLE) {
        let id = submit(
            engine,
            employee.id,
            LANGUAGE_TITLE,
            "During the team sync meeting on Jan 28, inappropriate language was used that made me uncomfortable.",
            false,
        )
        .await?;
        engine
            .add_comment(id, hr.id, "Complaint received and logged.", Some("RECEIVED"))
            .await?;
        engine
            .advance_stage(id, "REVIEW", Some("Initial review completed".to_string()))
            .await?;
        engine
            .add_comment(id, hr.id, "Manager interviewed, incident confirmed.", Some("REVIEW"))
            .await?;
        engine
            .add_comment(id, hr.id, "Recommended training for team.", Some("REVIEW"))
            .await?;
        summary.complaints_created += 1;
    }

    if !existing.contains(DISCRIMINATION_TITLE) {
        submit(
            engine,
            employee.id,
            DISCRIMINATION_TITLE,
            "I feel I was not promoted due to my background.",
            true,
        )
        .await?;
        summary.complaints_created += 1;
    }

    if !existing.contains(HOSTILE_TITLE) {
        let id = submit(
            engine,
            employee.id,
            HOSTILE_TITLE,
            "Ongoing exclusion from team activities and projects.",
            false,
        )
        .await?;
        engine
            .add_comment(id, hr.id, "Complaint received.", Some(Stage::Received.as_str()))
            .await?;
        engine
            .advance_stage(id, "REVIEW", Some("Review started".to_string()))
            .await?;
        engine
            .add_comment(id, hr.id, "Pattern of exclusion corroborated by two colleagues.", Some(Stage::Review.as_str()))
            .await?;
        engine
            .advance_stage(id, "INVESTIGATION", Some("Investigation in progress".to_string()))
            .await?;
        summary.complaints_created += 1;
    }

    if summary.complaints_created == 0 {
        info!("Demo complaints already present, skipping");
        return Ok(summary);
    }

    info!(
        users_created = summary.users_created,
        complaints_created = summary.complaints_created,
        "Demo data seeded"
    );
    Ok(summary)
}

async fn ensure_user(
    engine: &ComplaintWorkflowEngine,
    name: &str,
    email: &str,
    role: Role,
    summary: &mut SeedSummary,
) -> WorkflowResult<User> {
    if let Some(user) = engine.find_user_by_email(email).await? {
        return Ok(user);
    }
    let user = engine.register_user(name, email, role).await?;
    summary.users_created += 1;
    Ok(user)
}

async fn submit(
    engine: &ComplaintWorkflowEngine,
    reporter: UserId,
    title: &str,
    description: &str,
    is_anonymous: bool,
) -> WorkflowResult<ComplaintId> {
    let detail = engine
        .submit(SubmitComplaint {
            title: title.to_string(),
            description: description.to_string(),
            is_anonymous,
            reporter: Some(reporter),
        })
        .await?;
    Ok(detail.complaint.id)
}
