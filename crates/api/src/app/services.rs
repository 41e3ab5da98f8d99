//! Auth service wiring: accounts, token signing and refresh credentials.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use capstone_auth::{AccessPolicy, CurrentUser, Hs256JwtValidator};

use crate::accounts::{AccountDirectory, AccountError};
use crate::app::errors::ApiError;
use crate::config::ServerConfig;
use crate::refresh_tokens::{IssuedRefresh, RefreshError, RefreshTokenStore};

#[derive(Debug)]
pub struct AppServices {
    pub config: ServerConfig,
    pub jwt: Arc<Hs256JwtValidator>,
    pub accounts: AccountDirectory,
    pub refresh_tokens: RefreshTokenStore,
    pub policy: &'static AccessPolicy,
}

/// Result of a successful login or refresh.
#[derive(Debug, Clone)]
pub struct IssuedSession {
    pub access_token: String,
    pub user: CurrentUser,
    pub refresh: IssuedRefresh,
}

pub fn build_services(config: ServerConfig) -> Result<AppServices, ApiError> {
    let accounts = AccountDirectory::from_seed(&config.seed_accounts)?;
    if !accounts.is_empty() {
        tracing::info!(accounts = accounts.len(), "seed accounts loaded");
    }
    Ok(AppServices {
        jwt: Arc::new(Hs256JwtValidator::new(config.jwt_secret.clone().into_bytes())),
        refresh_tokens: RefreshTokenStore::new(config.refresh_token_ttl),
        accounts,
        policy: AccessPolicy::standard(),
        config,
    })
}

impl AppServices {
    /// Verify credentials and open a new refresh family.
    ///
    /// Password verification is CPU-bound, callers on the async runtime
    /// should run this on a blocking thread.
    pub fn login(&self, identifier: &str, secret: &str, now: DateTime<Utc>) -> Result<IssuedSession, ApiError> {
        let user = self.accounts.authenticate(identifier, secret)?;
        let refresh = self.refresh_tokens.issue(user.id, now)?;
        self.session_for(user, refresh, now)
    }

    /// Rotate a refresh credential into a new access token.
    ///
    /// Every failure reads as `refresh_failed`; a disabled or deleted
    /// account also loses its refresh family.
    pub fn refresh(&self, token: &str, now: DateTime<Utc>) -> Result<IssuedSession, ApiError> {
        let refresh = self.refresh_tokens.rotate(token, now)?;
        let user = match self.accounts.active_user(refresh.user_id) {
            Ok(user) => user,
            Err(e) => {
                self.refresh_tokens.revoke_user(refresh.user_id);
                return Err(match e {
                    AccountError::Disabled | AccountError::InvalidCredentials => RefreshError::Revoked.into(),
                    other => other.into(),
                });
            }
        };
        self.session_for(user, refresh, now)
    }

    pub fn logout(&self, token: &str) -> bool {
        self.refresh_tokens.revoke(token)
    }

    fn session_for(
        &self,
        user: CurrentUser,
        refresh: IssuedRefresh,
        now: DateTime<Utc>,
    ) -> Result<IssuedSession, ApiError> {
        let (access_token, _claims) = self.jwt.issue(&user, now, self.config.access_token_ttl)?;
        Ok(IssuedSession {
            access_token,
            user,
            refresh,
        })
    }
}
