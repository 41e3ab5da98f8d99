//! Access-policy endpoints for the calling principal.
//!
//! The client decides navigation locally; these let an operator ask the
//! server the same question ("why can't this user open that page?").

use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    routing::get,
    Json, Router,
};

use capstone_auth::{AccessExplanation, Page};

use crate::app::dto::{AllowedPages, MenuEntry};
use crate::app::errors::ApiError;
use crate::app::services::AppServices;
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new()
        .route("/pages", get(allowed_pages))
        .route("/explain/:page", get(explain))
}

/// GET /access/pages
pub async fn allowed_pages(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> Json<AllowedPages> {
    let role = principal.role();
    let pages = services.policy.allowed_pages(role);
    Json(AllowedPages {
        role: role.to_string(),
        landing_page: services.policy.landing_page(role),
        menu: pages.iter().copied().map(MenuEntry::from).collect(),
        pages,
    })
}

/// GET /access/explain/:page
pub async fn explain(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(page): Path<String>,
) -> Result<Json<AccessExplanation>, ApiError> {
    let page: Page = page.parse().map_err(|_| ApiError::UnknownPage(page.clone()))?;
    Ok(Json(services.policy.explain(&principal.as_user(), page)))
}
