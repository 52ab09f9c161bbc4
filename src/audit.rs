use chrono::{SecondsFormat, Utc};
use std::fmt;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::workflow::types::Role;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthAction {
    Login,
    Signup,
}

impl fmt::Display for AuthAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthAction::Login => write!(f, "LOGIN"),
            AuthAction::Signup => write!(f, "SIGNUP"),
        }
    }
}

/// Append-only log of authentication events, kept for security audits.
///
/// Recording is best effort: a failed write is logged and swallowed so it
/// never aborts the login or signup it describes.
#[derive(Debug, Clone)]
pub struct AuthEventLog {
    path: Option<PathBuf>,
}

impl AuthEventLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
        }
    }

    pub fn disabled() -> Self {
        Self { path: None }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn record(&self, action: AuthAction, email: &str, role: Role) {
        let Some(path) = &self.path else {
            return;
        };
        let entry = format_entry(action, email, role);
        match append(path, &entry) {
            Ok(()) => debug!(action = %action, email = email, "Auth event logged"),
            Err(e) => warn!(
                action = %action,
                file = ?path,
                error = %e,
                "Failed to write auth log"
            ),
        }
    }
}

fn format_entry(action: AuthAction, email: &str, role: Role) -> String {
    let timestamp = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
    format!("[{timestamp}] {action} | {email} | {role}\n")
}

fn append(path: &Path, entry: &str) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    file.write_all(entry.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_entries_are_appended_in_order() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("logs").join("auth.log");
        let log = AuthEventLog::new(&path);

        log.record(AuthAction::Signup, "new@example.com", Role::Employee);
        log.record(AuthAction::Login, "hr@example.com", Role::Hr);

        let contents = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with('['));
        assert!(lines[0].ends_with("] SIGNUP | new@example.com | EMPLOYEE"));
        assert!(lines[1].ends_with("] LOGIN | hr@example.com | HR"));
    }

    #[test]
    fn test_unwritable_path_does_not_panic() {
        let dir = TempDir::new().unwrap();
        // A directory cannot be opened for appending.
        let log = AuthEventLog::new(dir.path());
        log.record(AuthAction::Login, "hr@example.com", Role::Hr);
    }

    #[test]
    fn test_disabled_log_is_noop() {
        let log = AuthEventLog::disabled();
        assert!(log.path().is_none());
        log.record(AuthAction::Login, "hr@example.com", Role::Hr);
    }
}
