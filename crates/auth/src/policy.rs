//! Authorization gate: static role → page allow-list.
//!
//! Pure and synchronous. No IO, no panics, no mutable state. Every navigation
//! and every rendered route consults the same table.

use std::collections::{BTreeSet, HashMap};
use std::sync::LazyLock;

use serde::Serialize;

use crate::{CurrentUser, Page, Role};

static STANDARD: LazyLock<AccessPolicy> = LazyLock::new(|| {
    use Page::*;

    AccessPolicy::from_table(&[
        (Role::STUDENT, &[Dashboard, Phases, TaskDetails, Reports, TeamsProgress]),
        (
            Role::ENGINEER,
            &[
                Dashboard, Phases, TaskDetails, Reports, TeamsProgress, ViewTasks, AdminTasks, QuizAdd,
                QuizSee, Expo,
            ],
        ),
        (Role::REVIEWER, &[Dashboard, Reports, TeamsProgress, QuizSee, Expo, Panel]),
        (
            Role::TEACHER,
            &[
                Dashboard, Phases, TaskDetails, Reports, TeamsProgress, ViewTasks, AdminTasks, QuizAdd,
                QuizSee, Expo, Panel,
            ],
        ),
        (Role::SUPER_ADMIN, &Page::ALL),
    ])
});

/// Allow-list of pages per role.
///
/// A role absent from the table (including any tag the backend adds later)
/// is granted nothing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessPolicy {
    grants: HashMap<Role, BTreeSet<Page>>,
}

impl AccessPolicy {
    /// The table shipped with this build.
    pub fn standard() -> &'static AccessPolicy {
        &STANDARD
    }

    pub fn from_table(table: &[(Role, &[Page])]) -> Self {
        let mut grants: HashMap<Role, BTreeSet<Page>> = HashMap::new();
        for (role, pages) in table {
            grants.entry(role.clone()).or_default().extend(pages.iter().copied());
        }
        Self { grants }
    }

    pub fn allows(&self, role: &Role, page: Page) -> bool {
        self.grants.get(role).is_some_and(|pages| pages.contains(&page))
    }

    pub fn can_access_page(&self, user: &CurrentUser, page: Page) -> bool {
        self.allows(&user.role, page)
    }

    /// Pages the role may open, in sidebar order.
    pub fn allowed_pages(&self, role: &Role) -> Vec<Page> {
        self.grants
            .get(role)
            .map(|pages| pages.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Page shown right after login: the dashboard when permitted, otherwise
    /// the first permitted page.
    pub fn landing_page(&self, role: &Role) -> Option<Page> {
        let pages = self.grants.get(role)?;
        if pages.contains(&Page::Dashboard) {
            Some(Page::Dashboard)
        } else {
            pages.iter().next().copied()
        }
    }

    /// Roles permitted to open `page`, sorted by name.
    pub fn roles_for(&self, page: Page) -> Vec<Role> {
        let mut roles: Vec<Role> = self
            .grants
            .iter()
            .filter(|(_, pages)| pages.contains(&page))
            .map(|(role, _)| role.clone())
            .collect();
        roles.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        roles
    }

    pub fn explain(&self, user: &CurrentUser, page: Page) -> AccessExplanation {
        let granted = self.can_access_page(user, page);
        let allowed_pages = self.allowed_pages(&user.role);

        let reason = if granted {
            format!("role '{}' is allowed to open '{}'", user.role, page)
        } else if !self.grants.contains_key(&user.role) {
            format!("role '{}' has no pages in the access policy", user.role)
        } else {
            format!("page '{}' is not in the allow-list of role '{}'", page, user.role)
        };

        AccessExplanation {
            page,
            role: user.role.clone(),
            granted,
            reason,
            allowed_pages,
            granting_roles: self.roles_for(page),
        }
    }
}

/// Audit record of a gate decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessExplanation {
    pub page: Page,
    pub role: Role,
    pub granted: bool,
    pub reason: String,
    /// Everything the role may open.
    pub allowed_pages: Vec<Page>,
    /// Roles that would be allowed to open `page`.
    pub granting_roles: Vec<Role>,
}

/// Gate decision against the standard table.
pub fn can_access_page(user: &CurrentUser, page: Page) -> bool {
    AccessPolicy::standard().can_access_page(user, page)
}

/// Explain a gate decision against the standard table.
pub fn explain_access(user: &CurrentUser, page: Page) -> AccessExplanation {
    AccessPolicy::standard().explain(user, page)
}
