use std::borrow::Cow;

use serde::{Deserialize, Serialize};

/// Role tag attached to a user.
///
/// The set of roles is owned by the backend, so roles stay opaque strings at
/// this layer. The well-known roles are provided as constants; an unknown tag
/// is still a valid role, it simply maps to no pages.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Role(Cow<'static, str>);

impl Role {
    pub const STUDENT: Role = Role(Cow::Borrowed("Student"));
    pub const ENGINEER: Role = Role(Cow::Borrowed("Engineer"));
    pub const REVIEWER: Role = Role(Cow::Borrowed("Reviewer"));
    /// Teacher / supervisor of a capstone team.
    pub const TEACHER: Role = Role(Cow::Borrowed("Teacher"));
    pub const SUPER_ADMIN: Role = Role(Cow::Borrowed("SuperAdmin"));

    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The roles the backend is known to issue.
    pub fn standard() -> [Role; 5] {
        [
            Role::STUDENT,
            Role::ENGINEER,
            Role::REVIEWER,
            Role::TEACHER,
            Role::SUPER_ADMIN,
        ]
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}
