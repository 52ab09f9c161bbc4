use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqlitePoolOptions, SqliteRow};
use sqlx::{migrate::MigrateDatabase, Row, SqlitePool};
use tracing::info;

use super::{email_key, ComplaintStore, UserStore};
use crate::error::StoreError;
use crate::workflow::stage::Stage;
use crate::workflow::types::{
    Comment, Complaint, ComplaintId, FileRecord, NewComment, NewComplaint, NewFile, NewUser,
    Role, User, UserId, WorkflowStepRecord,
};

/// SQLite-backed store for persistent deployments.
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Connect, creating the database file and running migrations if asked.
    pub async fn connect(
        database_url: &str,
        max_connections: u32,
        auto_migrate: bool,
    ) -> Result<Self, StoreError> {
        if !sqlx::Sqlite::database_exists(database_url).await? {
            info!("Creating database at {}", database_url);
            sqlx::Sqlite::create_database(database_url).await?;
        }

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections.max(1))
            .connect(database_url)
            .await?;

        if auto_migrate {
            info!("Running database migrations...");
            sqlx::migrate!("./migrations").run(&pool).await?;
            info!("Database migrations completed");
        }

        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn shutdown(&self) {
        info!("Shutting down database connections...");
        self.pool.close().await;
        info!("Database connections closed");
    }
}

fn parse_stage(raw: &str) -> Result<Stage, StoreError> {
    raw.parse().map_err(|_| StoreError::Corrupt {
        reason: format!("unknown stage '{raw}' in stored row"),
    })
}

fn complaint_from_row(row: &SqliteRow) -> Result<Complaint, StoreError> {
    let status = parse_stage(row.try_get::<String, _>("status")?.as_str())?;
    Ok(Complaint {
        id: ComplaintId(row.try_get("id")?),
        title: row.try_get("title")?,
        description: row.try_get("description")?,
        is_anonymous: row.try_get("is_anonymous")?,
        reported_by_id: UserId(row.try_get("reported_by_id")?),
        confidence_score: row.try_get("confidence_score")?,
        status,
        current_step: status.step_number(),
        created_at: row.try_get::<DateTime<Utc>, _>("created_at")?,
    })
}

fn workflow_from_row(row: &SqliteRow) -> Result<WorkflowStepRecord, StoreError> {
    Ok(WorkflowStepRecord {
        id: row.try_get("id")?,
        complaint_id: ComplaintId(row.try_get("complaint_id")?),
        step: parse_stage(row.try_get::<String, _>("step")?.as_str())?,
        notes: row.try_get("notes")?,
        completed_at: row.try_get("completed_at")?,
    })
}

fn comment_from_row(row: &SqliteRow) -> Result<Comment, StoreError> {
    let tag: Option<String> = row.try_get("step")?;
    let step = tag.as_deref().and_then(|t| t.parse::<Stage>().ok());
    Ok(Comment {
        id: row.try_get("id")?,
        complaint_id: ComplaintId(row.try_get("complaint_id")?),
        author_id: UserId(row.try_get("author_id")?),
        content: row.try_get("content")?,
        step,
        step_order: Stage::order_of(tag.as_deref()),
        created_at: row.try_get("created_at")?,
    })
}

fn file_from_row(row: &SqliteRow) -> Result<FileRecord, StoreError> {
    Ok(FileRecord {
        id: row.try_get("id")?,
        complaint_id: ComplaintId(row.try_get("complaint_id")?),
        filename: row.try_get("filename")?,
        filepath: row.try_get("filepath")?,
        mime_type: row.try_get("mime_type")?,
        uploaded_at: row.try_get("uploaded_at")?,
    })
}

fn user_from_row(row: &SqliteRow) -> Result<User, StoreError> {
    let role: String = row.try_get("role")?;
    Ok(User {
        id: UserId(row.try_get("id")?),
        name: row.try_get("name")?,
        email: row.try_get("email")?,
        role: role
            .parse::<Role>()
            .map_err(|reason| StoreError::Corrupt { reason })?,
        created_at: row.try_get("created_at")?,
    })
}

const COMPLAINT_COLUMNS: &str = "id, title, description, is_anonymous, reported_by_id, \
     confidence_score, status, current_step, created_at";

#[async_trait]
impl ComplaintStore for SqliteStore {
    async fn insert_complaint(&self, new: NewComplaint) -> Result<Complaint, StoreError> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        let inserted = sqlx::query(
            r#"
            INSERT INTO complaints
                (title, description, is_anonymous, reported_by_id, confidence_score,
                 status, current_step, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(&new.title)
        .bind(&new.description)
        .bind(new.is_anonymous)
        .bind(new.reported_by_id.0)
        .bind(new.confidence_score)
        .bind(new.stage.as_str())
        .bind(new.stage.step_number() as i64)
        .bind(now)
        .execute(&mut *tx)
        .await?;
        let id = ComplaintId(inserted.last_insert_rowid());

        sqlx::query(
            r#"
            INSERT INTO workflow_step_records (complaint_id, step, notes, completed_at)
            VALUES (?1, ?2, ?3, ?4)
            "#,
        )
        .bind(id.0)
        .bind(new.stage.as_str())
        .bind(&new.initial_note)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(Complaint {
            id,
            title: new.title,
            description: new.description,
            is_anonymous: new.is_anonymous,
            reported_by_id: new.reported_by_id,
            confidence_score: new.confidence_score,
            status: new.stage,
            current_step: new.stage.step_number(),
            created_at: now,
        })
    }

    async fn get_complaint(&self, id: ComplaintId) -> Result<Option<Complaint>, StoreError> {
        let row = sqlx::query(&format!(
            "SELECT {COMPLAINT_COLUMNS} FROM complaints WHERE id = ?1"
        ))
        .bind(id.0)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(complaint_from_row).transpose()
    }

    async fn list_complaints(&self, reporter: Option<UserId>) -> Result<Vec<Complaint>, StoreError> {
        let rows = match reporter {
            Some(reporter) => {
                sqlx::query(&format!(
                    "SELECT {COMPLAINT_COLUMNS} FROM complaints WHERE reported_by_id = ?1"
                ))
                .bind(reporter.0)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query(&format!("SELECT {COMPLAINT_COLUMNS} FROM complaints"))
                    .fetch_all(&self.pool)
                    .await?
            }
        };

        rows.iter().map(complaint_from_row).collect()
    }

    async fn comments_for(&self, id: ComplaintId) -> Result<Vec<Comment>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT id, complaint_id, author_id, content, step, step_order, created_at
            FROM comments
            WHERE complaint_id = ?1
            "#,
        )
        .bind(id.0)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(comment_from_row).collect()
    }

    async fn count_comments_for_stage(
        &self,
        id: ComplaintId,
        stage: Stage,
    ) -> Result<usize, StoreError> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM comments WHERE complaint_id = ?1 AND step = ?2",
        )
        .bind(id.0)
        .bind(stage.as_str())
        .fetch_one(&self.pool)
        .await?;

        Ok(count.max(0) as usize)
    }

    async fn workflow_for(&self, id: ComplaintId) -> Result<Vec<WorkflowStepRecord>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT id, complaint_id, step, notes, completed_at
            FROM workflow_step_records
            WHERE complaint_id = ?1
            "#,
        )
        .bind(id.0)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(workflow_from_row).collect()
    }

    async fn files_for(&self, id: ComplaintId) -> Result<Vec<FileRecord>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT id, complaint_id, filename, filepath, mime_type, uploaded_at
            FROM files
            WHERE complaint_id = ?1
            "#,
        )
        .bind(id.0)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(file_from_row).collect()
    }

    async fn transition_stage(
        &self,
        id: ComplaintId,
        expected: Stage,
        next: Stage,
        note: String,
    ) -> Result<Option<Complaint>, StoreError> {
        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query(
            r#"
            UPDATE complaints
            SET status = ?1, current_step = ?2
            WHERE id = ?3 AND status = ?4
            "#,
        )
        .bind(next.as_str())
        .bind(next.step_number() as i64)
        .bind(id.0)
        .bind(expected.as_str())
        .execute(&mut *tx)
        .await?;

        if updated.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(None);
        }

        sqlx::query(
            r#"
            INSERT INTO workflow_step_records (complaint_id, step, notes, completed_at)
            VALUES (?1, ?2, ?3, ?4)
            "#,
        )
        .bind(id.0)
        .bind(next.as_str())
        .bind(&note)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;

        let row = sqlx::query(&format!(
            "SELECT {COMPLAINT_COLUMNS} FROM complaints WHERE id = ?1"
        ))
        .bind(id.0)
        .fetch_one(&mut *tx)
        .await?;
        let complaint = complaint_from_row(&row)?;

        tx.commit().await?;
        Ok(Some(complaint))
    }

    async fn insert_comment(&self, new: NewComment) -> Result<Comment, StoreError> {
        let now = Utc::now();
        let inserted = sqlx::query(
            r#"
            INSERT INTO comments (complaint_id, author_id, content, step, step_order, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(new.complaint_id.0)
        .bind(new.author_id.0)
        .bind(&new.content)
        .bind(new.step.as_str())
        .bind(new.step_order() as i64)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(Comment {
            id: inserted.last_insert_rowid(),
            complaint_id: new.complaint_id,
            author_id: new.author_id,
            step_order: new.step_order(),
            step: Some(new.step),
            content: new.content,
            created_at: now,
        })
    }

    async fn insert_file(&self, new: NewFile) -> Result<FileRecord, StoreError> {
        let now = Utc::now();
        let inserted = sqlx::query(
            r#"
            INSERT INTO files (complaint_id, filename, filepath, mime_type, uploaded_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
        )
        .bind(new.complaint_id.0)
        .bind(&new.filename)
        .bind(&new.filepath)
        .bind(&new.mime_type)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(FileRecord {
            id: inserted.last_insert_rowid(),
            complaint_id: new.complaint_id,
            filename: new.filename,
            filepath: new.filepath,
            mime_type: new.mime_type,
            uploaded_at: now,
        })
    }
}

#[async_trait]
impl UserStore for SqliteStore {
    async fn find_user(&self, id: UserId) -> Result<Option<User>, StoreError> {
        let row = sqlx::query("SELECT id, name, email, role, created_at FROM users WHERE id = ?1")
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(user_from_row).transpose()
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let row = sqlx::query(
            "SELECT id, name, email, role, created_at FROM users WHERE email = ?1 COLLATE NOCASE",
        )
        .bind(email.trim())
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(user_from_row).transpose()
    }

    async fn insert_user(&self, new: NewUser) -> Result<User, StoreError> {
        let now = Utc::now();
        let email = new.email.trim().to_string();
        let inserted = sqlx::query(
            "INSERT INTO users (name, email, role, created_at) VALUES (?1, ?2, ?3, ?4)",
        )
        .bind(&new.name)
        .bind(&email)
        .bind(new.role.as_str())
        .bind(now)
        .execute(&self.pool)
        .await;

        let inserted = match inserted {
            Ok(done) => done,
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
                return Err(StoreError::Duplicate {
                    entity: "user email",
                    key: email_key(&email),
                });
            }
            Err(e) => return Err(e.into()),
        };

        Ok(User {
            id: UserId(inserted.last_insert_rowid()),
            name: new.name,
            email,
            role: new.role,
            created_at: now,
        })
    }
}
