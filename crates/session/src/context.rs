//! The session capability handed to the UI shell.
//!
//! Built once at startup and passed explicitly; there is no global session.

use std::sync::Arc;

use capstone_auth::{AccessPolicy, CurrentUser};

use crate::bootstrap::{Bootstrap, BootstrapPhase};
use crate::config::ClientConfig;
use crate::error::{AuthError, TransportError};
use crate::manager::SessionManager;
use crate::navigation::Navigator;
use crate::token_store::TokenStore;
use crate::transport::{AuthTransport, Credentials, HttpTransport};

#[derive(Debug)]
pub struct SessionContext {
    manager: Arc<SessionManager>,
    navigator: Navigator,
    bootstrap: Bootstrap,
}

impl SessionContext {
    pub fn new(transport: Arc<dyn AuthTransport>, policy: AccessPolicy) -> Self {
        let store = Arc::new(TokenStore::new());
        let manager = Arc::new(SessionManager::new(store.clone(), transport));
        Self {
            navigator: Navigator::new(store, Arc::new(policy)),
            bootstrap: Bootstrap::new(manager.clone()),
            manager,
        }
    }

    /// HTTP transport against `config.api_url` and the standard access policy.
    pub fn from_config(config: ClientConfig) -> Result<Self, TransportError> {
        let transport = HttpTransport::new(config)?;
        Ok(Self::new(Arc::new(transport), AccessPolicy::standard().clone()))
    }

    pub fn manager(&self) -> &Arc<SessionManager> {
        &self.manager
    }

    pub fn navigator(&self) -> &Navigator {
        &self.navigator
    }

    pub fn bootstrap(&self) -> &Bootstrap {
        &self.bootstrap
    }

    pub fn is_authenticated(&self) -> bool {
        self.manager.is_authenticated()
    }

    pub fn current_user(&self) -> Option<CurrentUser> {
        self.manager.current_user()
    }

    /// Run the bootstrap sequence and land on the default page if restored.
    pub async fn start(&self) -> BootstrapPhase {
        let phase = self.bootstrap.run().await;
        if phase.user().is_some() {
            self.navigator.enter_session();
        }
        phase
    }

    pub async fn login(&self, credentials: &Credentials) -> Result<CurrentUser, AuthError> {
        let user = self.manager.login(credentials).await?;
        self.navigator.enter_session();
        Ok(user)
    }

    /// Clear everything local now; server revocation runs in the background.
    pub fn logout(&self) {
        self.navigator.leave_session();
        self.manager.logout_detached();
    }
}

#[cfg(test)]
mod tests {
    use capstone_auth::{Page, Role};

    use super::*;
    use crate::navigation::NavigationOutcome;
    use crate::testing::{FakeTransport, auth_ok, user};

    #[tokio::test]
    async fn student_login_lands_on_dashboard_and_is_gated() {
        let student = user(Role::STUDENT);
        let transport = Arc::new(FakeTransport::new().with_login(Ok(auth_ok("t", Some(student.clone())))));
        let ctx = SessionContext::new(transport, AccessPolicy::standard().clone());

        assert_eq!(ctx.start().await, BootstrapPhase::LoggedOut);
        assert_eq!(ctx.login(&Credentials::new("s1234", "pw")).await, Ok(student));
        assert!(ctx.is_authenticated());
        assert_eq!(ctx.navigator().current_page(), Some(Page::Dashboard));

        assert!(matches!(ctx.navigator().navigate(Page::AdminTasks), NavigationOutcome::Denied { .. }));
        assert_eq!(ctx.navigator().current_page(), Some(Page::Dashboard));
    }

    #[tokio::test]
    async fn logout_resets_everything_synchronously() {
        let transport = Arc::new(FakeTransport::new().with_refresh(Ok(auth_ok("t", Some(user(Role::ENGINEER))))));
        let ctx = SessionContext::new(transport, AccessPolicy::standard().clone());

        assert!(ctx.start().await.user().is_some());
        assert_eq!(ctx.navigator().current_page(), Some(Page::Dashboard));

        ctx.logout();
        assert!(!ctx.is_authenticated());
        assert_eq!(ctx.current_user(), None);
        assert_eq!(ctx.navigator().current_page(), None);
    }
}
