//! The authenticated user as seen by the client.

use serde::{Deserialize, Serialize};

use capstone_core::UserId;

use crate::Role;

/// User payload returned by the login and refresh endpoints.
///
/// # Invariants
/// - A user has exactly one role at a time.
/// - Role predicates are computed from `role` on every call; there is no
///   cached flag that could drift from it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentUser {
    pub id: UserId,
    pub role: Role,
    pub display_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl CurrentUser {
    pub fn new(id: UserId, role: Role, display_name: impl Into<String>) -> Self {
        Self {
            id,
            role,
            display_name: display_name.into(),
            email: None,
        }
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn has_role(&self, role: &Role) -> bool {
        &self.role == role
    }

    pub fn is_student(&self) -> bool {
        self.has_role(&Role::STUDENT)
    }

    pub fn is_engineer(&self) -> bool {
        self.has_role(&Role::ENGINEER)
    }

    pub fn is_reviewer(&self) -> bool {
        self.has_role(&Role::REVIEWER)
    }

    pub fn is_teacher(&self) -> bool {
        self.has_role(&Role::TEACHER)
    }

    pub fn is_super_admin(&self) -> bool {
        self.has_role(&Role::SUPER_ADMIN)
    }
}
