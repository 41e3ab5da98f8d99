//! Request/response bodies (camelCase on the wire).

use serde::{Deserialize, Serialize};

use capstone_auth::{CurrentUser, Page};

#[derive(Deserialize)]
pub struct LoginRequest {
    pub identifier: String,
    pub secret: String,
}

impl core::fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("LoginRequest")
            .field("identifier", &self.identifier)
            .field("secret", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthBody {
    pub access_token: String,
    pub user: CurrentUser,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WhoAmI {
    pub user_id: String,
    pub role: String,
    pub display_name: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AllowedPages {
    pub role: String,
    pub landing_page: Option<Page>,
    pub pages: Vec<Page>,
    /// Sidebar entries, in table order.
    pub menu: Vec<MenuEntry>,
}

#[derive(Debug, Serialize)]
pub struct MenuEntry {
    pub page: Page,
    pub title: &'static str,
}

impl From<Page> for MenuEntry {
    fn from(page: Page) -> Self {
        Self {
            page,
            title: page.title(),
        }
    }
}
