//! Current-page state, changed only through the access policy.

use std::sync::{Arc, PoisonError, RwLock};

use tracing::debug;

use capstone_auth::{AccessPolicy, Page};

use crate::token_store::TokenStore;

/// Result of a navigation request. None of these is an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigationOutcome {
    /// The page changed (or already was the target).
    Moved(Page),
    /// The role may not open the target; the current page is unchanged.
    Denied { current: Option<Page> },
    /// Nobody is signed in.
    SignedOut,
}

/// Page the shell is showing. Reads the user from the [`TokenStore`] and never
/// mutates it.
#[derive(Debug)]
pub struct Navigator {
    store: Arc<TokenStore>,
    policy: Arc<AccessPolicy>,
    current: RwLock<Option<Page>>,
}

impl Navigator {
    pub fn new(store: Arc<TokenStore>, policy: Arc<AccessPolicy>) -> Self {
        Self {
            store,
            policy,
            current: RwLock::new(None),
        }
    }

    pub fn policy(&self) -> &AccessPolicy {
        &self.policy
    }

    pub fn current_page(&self) -> Option<Page> {
        *self.current.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn set_current(&self, page: Option<Page>) {
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = page;
    }

    /// Gate check first; the page only changes when it passes.
    ///
    /// Decided on the stored user, not on token freshness: a locally expired
    /// access token still leaves the user signed in until a refresh is
    /// rejected, and the store is cleared then. Calls made from the page go
    /// through [`SessionManager::authorized`](crate::SessionManager::authorized),
    /// which refreshes first.
    pub fn navigate(&self, target: Page) -> NavigationOutcome {
        let Some(user) = self.store.stored_user() else {
            return NavigationOutcome::SignedOut;
        };

        if self.policy.can_access_page(&user, target) {
            self.set_current(Some(target));
            return NavigationOutcome::Moved(target);
        }

        let explanation = self.policy.explain(&user, target);
        debug!(
            user_id = %user.id,
            role = %user.role,
            page = %target,
            reason = %explanation.reason,
            "navigation denied"
        );
        NavigationOutcome::Denied {
            current: self.current_page(),
        }
    }

    /// Land on the role's default page after login or restore.
    pub fn enter_session(&self) -> Option<Page> {
        let landing = self
            .store
            .stored_user()
            .and_then(|user| self.policy.landing_page(&user.role));
        self.set_current(landing);
        landing
    }

    pub fn leave_session(&self) {
        self.set_current(None);
    }

    /// Page to render right now, re-checked against the current role.
    ///
    /// Falls back to the landing page if the role no longer permits the
    /// current page (e.g. a refresh returned a different role).
    pub fn visible_page(&self) -> Option<Page> {
        let user = self.store.stored_user()?;
        match self.current_page() {
            Some(page) if self.policy.can_access_page(&user, page) => Some(page),
            _ => self.policy.landing_page(&user.role),
        }
    }

    /// Sidebar entries for the signed-in user.
    pub fn menu(&self) -> Vec<Page> {
        self.store
            .stored_user()
            .map(|user| self.policy.allowed_pages(&user.role))
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use capstone_auth::Role;

    use super::*;
    use crate::testing::user;

    fn navigator() -> (Arc<TokenStore>, Navigator) {
        let store = Arc::new(TokenStore::new());
        let nav = Navigator::new(store.clone(), Arc::new(AccessPolicy::standard().clone()));
        (store, nav)
    }

    #[test]
    fn student_cannot_leave_allow_list() {
        let (store, nav) = navigator();
        store.set_session("t", user(Role::STUDENT));

        assert_eq!(nav.enter_session(), Some(Page::Dashboard));
        assert_eq!(
            nav.navigate(Page::AdminTasks),
            NavigationOutcome::Denied {
                current: Some(Page::Dashboard)
            }
        );
        assert_eq!(nav.current_page(), Some(Page::Dashboard));

        assert_eq!(nav.navigate(Page::Reports), NavigationOutcome::Moved(Page::Reports));
        assert_eq!(nav.current_page(), Some(Page::Reports));
    }

    #[test]
    fn signed_out_navigation_is_a_no_op() {
        let (_, nav) = navigator();
        assert_eq!(nav.navigate(Page::Dashboard), NavigationOutcome::SignedOut);
        assert_eq!(nav.current_page(), None);
        assert!(nav.menu().is_empty());
    }

    #[test]
    fn visible_page_follows_role_changes() {
        let (store, nav) = navigator();
        store.set_session("t", user(Role::TEACHER));
        nav.enter_session();
        assert_eq!(nav.navigate(Page::AdminTasks), NavigationOutcome::Moved(Page::AdminTasks));

        store.set_session("t2", user(Role::STUDENT));
        assert_eq!(nav.visible_page(), Some(Page::Dashboard));
    }

    #[test]
    fn menu_lists_allowed_pages() {
        let (store, nav) = navigator();
        store.set_session("t", user(Role::REVIEWER));
        let menu = nav.menu();
        assert!(menu.contains(&Page::Panel));
        assert!(!menu.contains(&Page::AdminTasks));
    }

    #[test]
    fn expired_access_token_does_not_sign_the_user_out_of_navigation() {
        let (store, nav) = navigator();
        let student = user(Role::STUDENT);
        let signer = capstone_auth::Hs256JwtValidator::new(b"k".to_vec());
        let (token, _) = signer
            .issue(
                &student,
                chrono::Utc::now() - chrono::Duration::hours(1),
                chrono::Duration::minutes(15),
            )
            .unwrap();
        store.set_session(token, student);

        assert!(!store.is_authenticated());
        assert_eq!(nav.navigate(Page::Reports), NavigationOutcome::Moved(Page::Reports));

        store.clear_session();
        assert_eq!(nav.navigate(Page::Reports), NavigationOutcome::SignedOut);
    }
}
