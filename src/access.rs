//! Caller identity and role checks for the request layer.
//!
//! The engine trusts whoever calls it; these checks run before any engine
//! operation that is restricted by role.

use crate::error::{WorkflowError, WorkflowResult};
use crate::workflow::projection::Viewer;
use crate::workflow::types::{Role, User, UserId};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Caller {
    user: Option<User>,
}

impl Caller {
    pub fn anonymous() -> Self {
        Self { user: None }
    }

    pub fn authenticated(user: User) -> Self {
        Self { user: Some(user) }
    }

    pub fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    pub fn user_id(&self) -> Option<UserId> {
        self.user.as_ref().map(|u| u.id)
    }

    pub fn is_hr(&self) -> bool {
        matches!(&self.user, Some(u) if u.role == Role::Hr)
    }

    pub fn require_authenticated(&self) -> WorkflowResult<&User> {
        self.user
            .as_ref()
            .ok_or_else(|| WorkflowError::Authorization("Not authenticated".to_string()))
    }

    pub fn require_hr(&self) -> WorkflowResult<&User> {
        let user = self.require_authenticated()?;
        if user.role != Role::Hr {
            return Err(WorkflowError::Authorization("HR access required".to_string()));
        }
        Ok(user)
    }

    pub fn viewer(&self) -> Viewer {
        Viewer::for_user(self.user.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn user(role: Role) -> User {
        User {
            id: UserId(7),
            name: "Test".to_string(),
            email: "t@example.com".to_string(),
            role,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_anonymous_caller_is_rejected() {
        let caller = Caller::anonymous();
        let err = caller.require_authenticated().unwrap_err();
        assert!(matches!(err, WorkflowError::Authorization(_)));
        assert!(!err.is_domain());
        assert_eq!(caller.viewer(), Viewer::Public);
    }

    #[test]
    fn test_employee_cannot_act_as_hr() {
        let caller = Caller::authenticated(user(Role::Employee));
        assert!(caller.require_authenticated().is_ok());
        assert_eq!(
            caller.require_hr().unwrap_err().to_string(),
            "HR access required"
        );
        assert_eq!(caller.viewer(), Viewer::Employee(UserId(7)));
    }

    #[test]
    fn test_hr_caller() {
        let caller = Caller::authenticated(user(Role::Hr));
        assert!(caller.is_hr());
        assert!(caller.require_hr().is_ok());
        assert_eq!(caller.viewer(), Viewer::Hr);
    }
}
