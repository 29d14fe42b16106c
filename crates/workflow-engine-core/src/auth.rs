//! # Authenticated caller
//!
//! The engine trusts that the caller has already been authenticated
//! upstream (reverse proxy, gateway, whatever) — see the Non-goals on
//! authentication. All the core needs is a concrete, duck-typed shape
//! to carry the caller's identity and roles through a request so
//! authorisation checks (`WorkflowError::AuthorizationError`) have
//! something to check against.

use crate::ids::UserId;
use serde::{Deserialize, Serialize};

/// The authenticated identity of whoever issued the current request or
/// owns the current task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentUser {
    pub user_id: UserId,
    pub username: String,
    pub roles: Vec<String>,
}

impl CurrentUser {
    pub fn new(user_id: UserId, username: impl Into<String>) -> Self {
        Self { user_id, username: username.into(), roles: Vec::new() }
    }

    pub fn with_roles(mut self, roles: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.roles = roles.into_iter().map(Into::into).collect();
        self
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn has_role_checks_membership() {
        let user = CurrentUser::new(UserId::new(), "alice").with_roles(["workflow_admin", "reviewer"]);
        assert!(user.has_role("reviewer"));
        assert!(!user.has_role("superadmin"));
    }
}
