use axum::{routing::get, Router};

pub mod access;
pub mod auth;
pub mod system;

/// Router for all endpoints behind the bearer middleware.
pub fn router() -> Router {
    Router::new()
        .route("/whoami", get(system::whoami))
        .nest("/access", access::router())
}
