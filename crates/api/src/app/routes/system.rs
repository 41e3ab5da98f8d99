use axum::{extract::Extension, http::StatusCode, Json};

use crate::app::dto::WhoAmI;
use crate::context::PrincipalContext;

pub async fn health() -> StatusCode {
    StatusCode::OK
}

pub async fn whoami(Extension(principal): Extension<PrincipalContext>) -> Json<WhoAmI> {
    Json(WhoAmI {
        user_id: principal.user_id().to_string(),
        role: principal.role().to_string(),
        display_name: principal.display_name().to_string(),
    })
}
