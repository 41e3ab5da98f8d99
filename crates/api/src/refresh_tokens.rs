//! Rotating refresh credentials.
//!
//! Each login starts a token family. Presenting a credential rotates it: the
//! old value is retired and a new one in the same family is returned.
//! Presenting a retired value again means it leaked, so the whole family is
//! revoked.

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, PoisonError};

use base64::Engine;
use chrono::{DateTime, Duration, Utc};
use thiserror::Error;

use capstone_core::{TokenFamilyId, UserId};

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum RefreshError {
    #[error("unknown refresh credential")]
    Unknown,

    #[error("refresh credential has expired")]
    Expired,

    #[error("refresh credential was already used")]
    Reused,

    #[error("refresh credential was revoked")]
    Revoked,

    #[error("random source unavailable")]
    Entropy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RecordState {
    Active,
    Rotated,
    Revoked,
}

#[derive(Debug, Clone)]
struct RefreshRecord {
    user_id: UserId,
    family: TokenFamilyId,
    expires_at: DateTime<Utc>,
    state: RecordState,
}

/// A freshly minted credential; `token` is what goes into the cookie.
#[derive(Clone, PartialEq, Eq)]
pub struct IssuedRefresh {
    pub token: String,
    pub user_id: UserId,
    pub family: TokenFamilyId,
    pub expires_at: DateTime<Utc>,
}

impl core::fmt::Debug for IssuedRefresh {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("IssuedRefresh")
            .field("token", &"<redacted>")
            .field("user_id", &self.user_id)
            .field("family", &self.family)
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

pub struct RefreshTokenStore {
    ttl: Duration,
    records: Mutex<HashMap<String, RefreshRecord>>,
}

impl core::fmt::Debug for RefreshTokenStore {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("RefreshTokenStore")
            .field("ttl", &self.ttl)
            .field("records", &self.len())
            .finish()
    }
}

/// 256 random bits, base64url without padding.
fn generate_token() -> Result<String, RefreshError> {
    let mut buf = [0u8; 32];
    getrandom::getrandom(&mut buf).map_err(|_| RefreshError::Entropy)?;
    Ok(base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(buf))
}

impl RefreshTokenStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            records: Mutex::new(HashMap::new()),
        }
    }

    /// Start a new family for `user_id` (called on login).
    pub fn issue(&self, user_id: UserId, now: DateTime<Utc>) -> Result<IssuedRefresh, RefreshError> {
        let mut records = self.records.lock().unwrap_or_else(PoisonError::into_inner);
        Self::insert(&mut records, user_id, TokenFamilyId::new(), now + self.ttl)
    }

    fn insert(
        records: &mut HashMap<String, RefreshRecord>,
        user_id: UserId,
        family: TokenFamilyId,
        expires_at: DateTime<Utc>,
    ) -> Result<IssuedRefresh, RefreshError> {
        let token = generate_token()?;
        records.insert(
            token.clone(),
            RefreshRecord {
                user_id,
                family,
                expires_at,
                state: RecordState::Active,
            },
        );
        Ok(IssuedRefresh {
            token,
            user_id,
            family,
            expires_at,
        })
    }

    fn revoke_family(records: &mut HashMap<String, RefreshRecord>, family: TokenFamilyId) -> usize {
        let mut revoked = 0;
        for record in records.values_mut().filter(|r| r.family == family) {
            if record.state != RecordState::Revoked {
                record.state = RecordState::Revoked;
                revoked += 1;
            }
        }
        revoked
    }

    /// Exchange `token` for a new credential in the same family.
    ///
    /// The new credential's lifetime restarts from `now`.
    pub fn rotate(&self, token: &str, now: DateTime<Utc>) -> Result<IssuedRefresh, RefreshError> {
        let mut records = self.records.lock().unwrap_or_else(PoisonError::into_inner);

        let record = records.get(token).cloned().ok_or(RefreshError::Unknown)?;
        let next_state = match record.state {
            RecordState::Revoked => return Err(RefreshError::Revoked),
            RecordState::Rotated => {
                let revoked = Self::revoke_family(&mut records, record.family);
                tracing::warn!(family = %record.family, revoked, "refresh credential replayed; family revoked");
                return Err(RefreshError::Reused);
            }
            RecordState::Active if now >= record.expires_at => RecordState::Revoked,
            RecordState::Active => RecordState::Rotated,
        };
        if let Some(current) = records.get_mut(token) {
            current.state = next_state;
        }
        if next_state == RecordState::Revoked {
            return Err(RefreshError::Expired);
        }

        Self::insert(&mut records, record.user_id, record.family, now + self.ttl)
    }

    /// Revoke the family `token` belongs to. Unknown tokens are ignored.
    pub fn revoke(&self, token: &str) -> bool {
        let mut records = self.records.lock().unwrap_or_else(PoisonError::into_inner);
        match records.get(token).map(|r| r.family) {
            Some(family) => Self::revoke_family(&mut records, family) > 0,
            None => false,
        }
    }

    /// Revoke every family owned by `user_id`; returns how many families
    /// still had live records.
    pub fn revoke_user(&self, user_id: UserId) -> usize {
        let mut records = self.records.lock().unwrap_or_else(PoisonError::into_inner);
        let mut families = HashSet::new();
        for record in records.values_mut().filter(|r| r.user_id == user_id) {
            if record.state != RecordState::Revoked {
                record.state = RecordState::Revoked;
                families.insert(record.family);
            }
        }
        families.len()
    }

    /// Drop records whose lifetime has passed. Retired records are kept until
    /// then so a replay can still be recognised.
    pub fn purge_expired(&self, now: DateTime<Utc>) -> usize {
        let mut records = self.records.lock().unwrap_or_else(PoisonError::into_inner);
        let before = records.len();
        records.retain(|_, record| record.expires_at > now);
        before - records.len()
    }

    pub fn len(&self) -> usize {
        self.records.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
