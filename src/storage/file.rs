use async_trait::async_trait;
use fd_lock::RwLock as FileLock;
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use tracing::debug;

use super::document::StoreDocument;
use super::{ComplaintStore, UserStore};
use crate::error::StoreError;
use crate::workflow::stage::Stage;
use crate::workflow::types::{
    Comment, Complaint, ComplaintId, FileRecord, NewComment, NewComplaint, NewFile, NewUser,
    User, UserId, WorkflowStepRecord,
};

/// Single JSON document on disk.
///
/// Every operation takes an advisory lock on `<path>.lock` (shared for
/// reads, exclusive for writes) and writes go to a temporary file that is
/// renamed over the document, so concurrent processes never observe a torn
/// write and a stage compare-and-swap cannot interleave with another.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
    lock_path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let mut lock_name = path.as_os_str().to_owned();
        lock_name.push(".lock");
        Self {
            path,
            lock_path: PathBuf::from(lock_name),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read<T, F>(&self, op: F) -> Result<T, StoreError>
    where
        F: FnOnce(&StoreDocument) -> T + Send + 'static,
        T: Send + 'static,
    {
        let path = self.path.clone();
        let lock_path = self.lock_path.clone();
        tokio::task::spawn_blocking(move || -> Result<T, StoreError> {
            let lock = FileLock::new(open_lock_file(&lock_path)?);
            let _guard = lock.read()?;
            let document = load_document(&path)?;
            Ok(op(&document))
        })
        .await
        .map_err(|e| StoreError::LockError {
            reason: format!("storage task failed: {e}"),
        })?
    }

    async fn write<T, F>(&self, op: F) -> Result<T, StoreError>
    where
        F: FnOnce(&mut StoreDocument) -> Result<T, StoreError> + Send + 'static,
        T: Send + 'static,
    {
        let path = self.path.clone();
        let lock_path = self.lock_path.clone();
        tokio::task::spawn_blocking(move || -> Result<T, StoreError> {
            let mut lock = FileLock::new(open_lock_file(&lock_path)?);
            let _guard = lock.write()?;
            let mut document = load_document(&path)?;
            let result = op(&mut document)?;
            save_document(&path, &document)?;
            Ok(result)
        })
        .await
        .map_err(|e| StoreError::LockError {
            reason: format!("storage task failed: {e}"),
        })?
    }
}

fn open_lock_file(lock_path: &Path) -> Result<fs::File, StoreError> {
    if let Some(parent) = lock_path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let file = OpenOptions::new()
        .create(true)
        .truncate(false)
        .read(true)
        .write(true)
        .open(lock_path)?;
    Ok(file)
}

fn load_document(path: &Path) -> Result<StoreDocument, StoreError> {
    if !path.exists() {
        debug!(file = ?path, "No store document yet, starting empty");
        return Ok(StoreDocument::default());
    }
    let contents = fs::read_to_string(path)?;
    if contents.trim().is_empty() {
        return Ok(StoreDocument::default());
    }
    let mut document: StoreDocument = serde_json::from_str(&contents)?;
    document.normalize()?;
    Ok(document)
}

fn save_document(path: &Path, document: &StoreDocument) -> Result<(), StoreError> {
    let serialized = serde_json::to_string_pretty(document)?;
    let mut temp_name = path.as_os_str().to_owned();
    temp_name.push(".tmp");
    let temp_path = PathBuf::from(temp_name);
    fs::write(&temp_path, serialized)?;
    fs::rename(&temp_path, path)?;
    Ok(())
}

#[async_trait]
impl ComplaintStore for JsonFileStore {
    async fn insert_complaint(&self, new: NewComplaint) -> Result<Complaint, StoreError> {
        self.write(move |doc| doc.insert_complaint(new)).await
    }

    async fn get_complaint(&self, id: ComplaintId) -> Result<Option<Complaint>, StoreError> {
        self.read(move |doc| doc.get_complaint(id)).await
    }

    async fn list_complaints(&self, reporter: Option<UserId>) -> Result<Vec<Complaint>, StoreError> {
        self.read(move |doc| doc.list_complaints(reporter)).await
    }

    async fn comments_for(&self, id: ComplaintId) -> Result<Vec<Comment>, StoreError> {
        self.read(move |doc| doc.comments_for(id)).await
    }

    async fn count_comments_for_stage(
        &self,
        id: ComplaintId,
        stage: Stage,
    ) -> Result<usize, StoreError> {
        self.read(move |doc| doc.count_comments_for_stage(id, stage))
            .await
    }

    async fn workflow_for(&self, id: ComplaintId) -> Result<Vec<WorkflowStepRecord>, StoreError> {
        self.read(move |doc| doc.workflow_for(id)).await
    }

    async fn files_for(&self, id: ComplaintId) -> Result<Vec<FileRecord>, StoreError> {
        self.read(move |doc| doc.files_for(id)).await
    }

    async fn transition_stage(
        &self,
        id: ComplaintId,
        expected: Stage,
        next: Stage,
        note: String,
    ) -> Result<Option<Complaint>, StoreError> {
        self.write(move |doc| Ok(doc.transition_stage(id, expected, next, note)))
            .await
    }

    async fn insert_comment(&self, new: NewComment) -> Result<Comment, StoreError> {
        self.write(move |doc| doc.insert_comment(new)).await
    }

    async fn insert_file(&self, new: NewFile) -> Result<FileRecord, StoreError> {
        self.write(move |doc| doc.insert_file(new)).await
    }
}

#[async_trait]
impl UserStore for JsonFileStore {
    async fn find_user(&self, id: UserId) -> Result<Option<User>, StoreError> {
        self.read(move |doc| doc.find_user(id)).await
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let email = email.to_string();
        self.read(move |doc| doc.find_user_by_email(&email)).await
    }

    async fn insert_user(&self, new: NewUser) -> Result<User, StoreError> {
        self.write(move |doc| doc.insert_user(new)).await
    }
}
