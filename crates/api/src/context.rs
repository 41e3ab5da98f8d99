use capstone_auth::{AccessClaims, CurrentUser, Role};
use capstone_core::UserId;

/// Principal context for a request (authenticated identity + role).
///
/// Built from verified access-token claims by the bearer middleware.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrincipalContext {
    user_id: UserId,
    role: Role,
    display_name: String,
}

impl PrincipalContext {
    pub fn new(user_id: UserId, role: Role, display_name: impl Into<String>) -> Self {
        Self {
            user_id,
            role,
            display_name: display_name.into(),
        }
    }

    pub fn from_claims(claims: AccessClaims) -> Self {
        Self::new(claims.sub, claims.role, claims.name)
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    pub fn role(&self) -> &Role {
        &self.role
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    /// The principal as a user, for gate decisions.
    pub fn as_user(&self) -> CurrentUser {
        CurrentUser::new(self.user_id, self.role.clone(), self.display_name.clone())
    }
}
