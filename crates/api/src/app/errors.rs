use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;
use thiserror::Error;

use capstone_auth::TokenError;

use crate::accounts::AccountError;
use crate::refresh_tokens::RefreshError;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Account(#[from] AccountError),

    #[error(transparent)]
    Refresh(#[from] RefreshError),

    #[error(transparent)]
    Token(#[from] TokenError),

    #[error("unknown page: {0}")]
    UnknownPage(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        match self {
            ApiError::Account(AccountError::InvalidCredentials) => json_error(
                StatusCode::UNAUTHORIZED,
                "invalid_credentials",
                "invalid identifier or password",
            ),
            ApiError::Account(AccountError::Disabled) => {
                json_error(StatusCode::FORBIDDEN, "account_disabled", "this account is disabled")
            }
            ApiError::Account(AccountError::Duplicate(id)) => json_error(
                StatusCode::CONFLICT,
                "duplicate_account",
                format!("identifier already registered: {id}"),
            ),
            ApiError::Refresh(RefreshError::Entropy) => internal("random source unavailable"),
            ApiError::Refresh(e) => json_error(StatusCode::UNAUTHORIZED, "refresh_failed", e.to_string()),
            ApiError::UnknownPage(page) => {
                json_error(StatusCode::NOT_FOUND, "unknown_page", format!("unknown page: {page}"))
            }
            ApiError::Account(AccountError::Hashing(msg)) | ApiError::Internal(msg) => internal(msg),
            ApiError::Token(e) => internal(e.to_string()),
        }
    }
}

fn internal(message: impl Into<String>) -> axum::response::Response {
    let message = message.into();
    tracing::error!(%message, "internal error");
    json_error(StatusCode::INTERNAL_SERVER_ERROR, "internal_error", "internal server error")
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}
