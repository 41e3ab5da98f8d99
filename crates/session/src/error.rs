//! Error taxonomy of the session layer.
//!
//! [`TransportError`] is what the wire produced; [`AuthError`] is what the
//! rest of the client sees after the session manager has classified it.

use thiserror::Error;

/// Failure of a single HTTP exchange.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// The server answered with a non-success status.
    #[error("server rejected request ({status}): {message}")]
    Rejected {
        status: u16,
        /// Machine-readable `error` field of the body, when present.
        code: Option<String>,
        message: String,
    },

    /// The server could not be reached or the request timed out.
    #[error("network error: {0}")]
    Network(String),

    /// The body did not match the expected shape.
    #[error("unexpected response body: {0}")]
    Decode(String),
}

impl TransportError {
    pub fn rejected(status: u16, code: Option<String>, message: impl Into<String>) -> Self {
        Self::Rejected {
            status,
            code,
            message: message.into(),
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            TransportError::Rejected { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn code(&self) -> Option<&str> {
        match self {
            TransportError::Rejected { code, .. } => code.as_deref(),
            _ => None,
        }
    }

    /// The access token was missing, invalid or expired.
    pub fn is_unauthorized(&self) -> bool {
        self.status() == Some(401)
    }
}

/// Session failures as seen by the UI layer.
///
/// Gate denials are not represented here: the gate answers with `bool`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("invalid identifier or password")]
    InvalidCredentials,

    #[error("account is disabled")]
    AccountDisabled,

    /// The refresh credential is expired, revoked or absent.
    #[error("session could not be refreshed")]
    RefreshFailed,

    /// A protected call was still rejected after one refresh.
    #[error("request was not authorized")]
    Unauthorized,

    #[error("network error: {0}")]
    Network(String),

    #[error("malformed server response: {0}")]
    MalformedResponse(String),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },
}

impl AuthError {
    /// Classify a failed login exchange.
    pub fn from_login(err: TransportError) -> Self {
        match err {
            TransportError::Rejected { status: 403, .. } => AuthError::AccountDisabled,
            TransportError::Rejected { ref code, .. } if code.as_deref() == Some("account_disabled") => {
                AuthError::AccountDisabled
            }
            TransportError::Rejected { status: 400 | 401, .. } => AuthError::InvalidCredentials,
            other => AuthError::from_request(other),
        }
    }

    /// Classify a failed refresh exchange.
    pub fn from_refresh(err: TransportError) -> Self {
        match err {
            TransportError::Rejected { status: 400 | 401 | 403, .. } => AuthError::RefreshFailed,
            other => AuthError::from_request(other),
        }
    }

    /// Classify any other failed exchange.
    pub fn from_request(err: TransportError) -> Self {
        match err {
            TransportError::Rejected { status: 401, .. } => AuthError::Unauthorized,
            TransportError::Rejected { status, message, .. } => AuthError::Api { status, message },
            TransportError::Network(msg) => AuthError::Network(msg),
            TransportError::Decode(msg) => AuthError::MalformedResponse(msg),
        }
    }

    /// Worth retrying by hand (the client never retries on its own).
    pub fn is_transient(&self) -> bool {
        matches!(self, AuthError::Network(_))
    }

    /// Text for the login form's error banner.
    pub fn user_message(&self) -> String {
        match self {
            AuthError::InvalidCredentials => "The identifier or password is incorrect.".to_string(),
            AuthError::AccountDisabled => "This account has been disabled. Contact your supervisor.".to_string(),
            AuthError::RefreshFailed | AuthError::Unauthorized => {
                "Your session has ended. Please sign in again.".to_string()
            }
            AuthError::Network(_) => "The server could not be reached. Please try again.".to_string(),
            AuthError::MalformedResponse(_) | AuthError::Api { .. } => {
                "Something went wrong on the server. Please try again later.".to_string()
            }
        }
    }
}
