//! Login, refresh and logout. The refresh credential only ever travels in
//! the `refresh_token` cookie; the access token only in response bodies.

use std::sync::Arc;

use axum::{
    extract::Extension,
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use chrono::{DateTime, Utc};

use crate::app::cookies::{clear_refresh_cookie, read_cookie, set_refresh_cookie, REFRESH_COOKIE};
use crate::app::dto::{AuthBody, LoginRequest};
use crate::app::errors::{json_error, ApiError};
use crate::app::services::{AppServices, IssuedSession};
use crate::refresh_tokens::RefreshError;

pub fn router() -> Router {
    Router::new()
        .route("/login", post(login))
        .route("/refresh", post(refresh))
        .route("/logout", post(logout))
}

/// POST /auth/login
pub async fn login(
    Extension(services): Extension<Arc<AppServices>>,
    Json(req): Json<LoginRequest>,
) -> Response {
    let now = Utc::now();
    let identifier = req.identifier.clone();

    // argon2 verification is deliberately slow; keep it off the reactor.
    let worker = services.clone();
    let outcome = tokio::task::spawn_blocking(move || worker.login(&req.identifier, &req.secret, now))
        .await
        .unwrap_or_else(|e| Err(ApiError::Internal(e.to_string())));

    match outcome {
        Ok(session) => {
            tracing::info!(%identifier, user_id = %session.user.id, role = %session.user.role, "login succeeded");
            session_response(&services, session, now)
        }
        Err(e) => {
            tracing::info!(%identifier, error = %e, "login rejected");
            e.into_response()
        }
    }
}

/// POST /auth/refresh
pub async fn refresh(Extension(services): Extension<Arc<AppServices>>, headers: HeaderMap) -> Response {
    let now = Utc::now();
    let secure = services.config.cookie_secure;

    let Some(token) = read_cookie(&headers, REFRESH_COOKIE) else {
        tracing::debug!("refresh without credential");
        return with_cleared_cookie(
            json_error(StatusCode::UNAUTHORIZED, "refresh_failed", "missing refresh credential"),
            secure,
        );
    };

    match services.refresh(token, now) {
        Ok(session) => {
            tracing::debug!(user_id = %session.user.id, family = %session.refresh.family, "refresh rotated");
            session_response(&services, session, now)
        }
        Err(ApiError::Refresh(e)) if e != RefreshError::Entropy => {
            tracing::debug!(error = %e, "refresh rejected");
            with_cleared_cookie(ApiError::Refresh(e).into_response(), secure)
        }
        Err(e) => e.into_response(),
    }
}

/// POST /auth/logout. Always 204, with or without a credential.
pub async fn logout(Extension(services): Extension<Arc<AppServices>>, headers: HeaderMap) -> Response {
    if let Some(token) = read_cookie(&headers, REFRESH_COOKIE) {
        let revoked = services.logout(token);
        tracing::debug!(revoked, "logout");
    }
    with_cleared_cookie(StatusCode::NO_CONTENT.into_response(), services.config.cookie_secure)
}

fn session_response(services: &AppServices, session: IssuedSession, now: DateTime<Utc>) -> Response {
    let max_age = session.refresh.expires_at - now;
    let Some(cookie) = set_refresh_cookie(&session.refresh.token, max_age, services.config.cookie_secure) else {
        return ApiError::Internal("refresh credential is not a valid header value".to_string()).into_response();
    };

    (
        [(header::SET_COOKIE, cookie)],
        Json(AuthBody {
            access_token: session.access_token,
            user: session.user,
        }),
    )
        .into_response()
}

fn with_cleared_cookie(mut response: Response, secure: bool) -> Response {
    response
        .headers_mut()
        .append(header::SET_COOKIE, clear_refresh_cookie(secure));
    response
}
