use anyhow::Result;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, Instrument};

use super::Commands;
use crate::access::Caller;
use crate::audit::{AuthAction, AuthEventLog};
use crate::config::{StorageBackend, TrustShieldConfig};
use crate::error::{WorkflowError, WorkflowResult};
use crate::seed::{seed_demo_data, SeedSummary};
use crate::storage::{ComplaintStore, JsonFileStore, MemoryStore, UserStore};
use crate::telemetry::{create_workflow_span, generate_correlation_id};
use crate::workflow::engine::{ComplaintWorkflowEngine, FileUpload, SubmitComplaint};
use crate::workflow::projection::{project, project_all, CommentView, ComplaintView, UserView};
use crate::workflow::scoring::RandomScorer;
use crate::workflow::types::{ComplaintId, FileRecord};

/// What a command prints on success.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum CommandOutput {
    Complaint(ComplaintView),
    Complaints(Vec<ComplaintView>),
    Comment(CommentView),
    File(FileRecord),
    User(UserView),
    Seeded(SeedSummary),
}

/// Everything a command needs: the engine and the auth audit log.
pub struct AppContext {
    pub engine: ComplaintWorkflowEngine,
    pub audit: AuthEventLog,
}

impl AppContext {
    pub fn new(engine: ComplaintWorkflowEngine, audit: AuthEventLog) -> Self {
        Self { engine, audit }
    }

    /// Build the storage backend and engine described by `config`.
    pub async fn from_config(config: &TrustShieldConfig) -> Result<Self> {
        let (complaints, users): (Arc<dyn ComplaintStore>, Arc<dyn UserStore>) =
            match config.storage.backend {
                StorageBackend::Memory => shared(MemoryStore::new()),
                StorageBackend::File => shared(JsonFileStore::new(&config.storage.path)),
                StorageBackend::Sqlite => connect_sqlite(config).await?,
            };
        info!(backend = ?config.storage.backend, "Storage backend ready");

        let engine = ComplaintWorkflowEngine::new(
            complaints,
            users,
            Arc::new(RandomScorer),
            config.engine_settings(),
        );
        let audit = if config.audit.enabled {
            AuthEventLog::new(&config.audit.auth_log_path)
        } else {
            AuthEventLog::disabled()
        };
        Ok(Self::new(engine, audit))
    }

    /// Resolve `--as <email>` to a caller. An unknown e-mail is rejected
    /// rather than silently treated as anonymous.
    pub async fn resolve_caller(&self, email: Option<&str>) -> WorkflowResult<Caller> {
        let Some(email) = email else {
            return Ok(Caller::anonymous());
        };
        self.engine
            .find_user_by_email(email)
            .await?
            .map(Caller::authenticated)
            .ok_or_else(|| WorkflowError::Authorization("Invalid credentials".to_string()))
    }

    /// Run one command on behalf of the account selected with `--as`.
    pub async fn dispatch(
        &self,
        caller_email: Option<&str>,
        command: Commands,
    ) -> WorkflowResult<CommandOutput> {
        let correlation_id = generate_correlation_id();
        let span = create_workflow_span(
            command_name(&command),
            command_complaint_id(&command),
            caller_email,
            Some(&correlation_id),
        );
        async {
            let caller = self.resolve_caller(caller_email).await?;
            self.execute(&caller, command).await
        }
        .instrument(span)
        .await
    }

    pub async fn execute(&self, caller: &Caller, command: Commands) -> WorkflowResult<CommandOutput> {
        match command {
            Commands::Submit {
                title,
                description,
                anonymous,
            } => {
                let detail = self
                    .engine
                    .submit(SubmitComplaint {
                        title,
                        description,
                        is_anonymous: anonymous,
                        reporter: caller.user_id(),
                    })
                    .await?;
                Ok(CommandOutput::Complaint(project(&detail, caller.viewer())))
            }
            Commands::Show { id } => {
                let detail = self.engine.get_by_id(ComplaintId(id)).await?;
                Ok(CommandOutput::Complaint(project(&detail, caller.viewer())))
            }
            Commands::List => {
                caller.require_hr()?;
                let details = self.engine.list_all().await?;
                Ok(CommandOutput::Complaints(project_all(&details, caller.viewer())))
            }
            Commands::Mine => {
                let user = caller.require_authenticated()?;
                let details = self.engine.list_by_reporter(user.id).await?;
                Ok(CommandOutput::Complaints(project_all(&details, caller.viewer())))
            }
            Commands::Advance { id, stage, note } => {
                caller.require_hr()?;
                let detail = self
                    .engine
                    .advance_stage(ComplaintId(id), &stage, note)
                    .await?;
                Ok(CommandOutput::Complaint(project(&detail, caller.viewer())))
            }
            Commands::Comment { id, content, step } => {
                let author = caller.require_hr()?;
                let comment = self
                    .engine
                    .add_comment(ComplaintId(id), author.id, &content, step.as_deref())
                    .await?;
                Ok(CommandOutput::Comment(CommentView::from(&comment)))
            }
            Commands::Attach { id, path } => {
                let upload = path.as_deref().map(upload_from_path).transpose()?;
                let file = self.engine.attach_file(ComplaintId(id), upload).await?;
                Ok(CommandOutput::File(file))
            }
            Commands::Register { name, email, role } => {
                let user = self.engine.register_user(&name, &email, role).await?;
                self.audit.record(AuthAction::Signup, &user.email, user.role);
                Ok(CommandOutput::User(UserView::from(&user)))
            }
            Commands::Login { email } => {
                if email.trim().is_empty() {
                    return Err(WorkflowError::validation("Email required"));
                }
                let user = self
                    .engine
                    .find_user_by_email(&email)
                    .await?
                    .ok_or_else(|| WorkflowError::Authorization("Invalid credentials".to_string()))?;
                self.audit.record(AuthAction::Login, &user.email, user.role);
                Ok(CommandOutput::User(UserView::from(&user)))
            }
            Commands::Seed => Ok(CommandOutput::Seeded(seed_demo_data(&self.engine).await?)),
            // Handled in main before any store is opened.
            Commands::Init { .. } => unreachable!("init is dispatched without a store"),
        }
    }
}

/// One backend serving both store roles.
fn shared<S>(store: S) -> (Arc<dyn ComplaintStore>, Arc<dyn UserStore>)
where
    S: ComplaintStore + UserStore + 'static,
{
    let store = Arc::new(store);
    (store.clone(), store)
}

#[cfg(feature = "database")]
async fn connect_sqlite(
    config: &TrustShieldConfig,
) -> Result<(Arc<dyn ComplaintStore>, Arc<dyn UserStore>)> {
    use crate::storage::SqliteStore;

    let url = &config.storage.database_url;
    if let Some(parent) = url
        .strip_prefix("sqlite://")
        .map(Path::new)
        .and_then(Path::parent)
    {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let store =
        SqliteStore::connect(url, config.storage.max_connections, config.storage.auto_migrate)
            .await?;
    Ok(shared(store))
}

#[cfg(not(feature = "database"))]
async fn connect_sqlite(
    _config: &TrustShieldConfig,
) -> Result<(Arc<dyn ComplaintStore>, Arc<dyn UserStore>)> {
    anyhow::bail!("the sqlite backend requires building with the `database` feature")
}

/// Evidence metadata for a file that already sits on disk.
fn upload_from_path(path: &Path) -> WorkflowResult<FileUpload> {
    if !path.is_file() {
        return Err(WorkflowError::validation(format!(
            "File not found: {}",
            path.display()
        )));
    }
    let filename = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let storage_path: PathBuf = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
    let mime_type = mime_guess::from_path(path)
        .first_or_octet_stream()
        .essence_str()
        .to_string();
    Ok(FileUpload {
        filename,
        storage_path: storage_path.display().to_string(),
        mime_type,
    })
}

/// Write a configuration template, refusing to clobber an existing file.
pub fn init_config_file(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        anyhow::bail!(
            "{} already exists; pass --force to overwrite it",
            path.display()
        );
    }
    TrustShieldConfig::default().save_to_file(path)?;
    println!("✅ Wrote configuration template to {}", path.display());
    Ok(())
}

fn command_name(command: &Commands) -> &'static str {
    match command {
        Commands::Submit { .. } => "submit",
        Commands::Show { .. } => "get_by_id",
        Commands::List => "list_all",
        Commands::Mine => "list_by_reporter",
        Commands::Advance { .. } => "advance_stage",
        Commands::Comment { .. } => "add_comment",
        Commands::Attach { .. } => "attach_file",
        Commands::Register { .. } => "register",
        Commands::Login { .. } => "login",
        Commands::Seed => "seed",
        Commands::Init { .. } => "init",
    }
}

fn command_complaint_id(command: &Commands) -> Option<i64> {
    match command {
        Commands::Show { id }
        | Commands::Advance { id, .. }
        | Commands::Comment { id, .. }
        | Commands::Attach { id, .. } => Some(*id),
        _ => None,
    }
}
