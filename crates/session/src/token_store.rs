//! Volatile, in-memory holder of the access token and its user.
//!
//! Nothing here is ever written to disk. After a restart the store is empty
//! and the session is recovered through the refresh cookie instead.

use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};

use capstone_auth::{CurrentUser, inspect_unverified};

#[derive(Clone)]
struct StoredSession {
    access_token: String,
    user: CurrentUser,
    /// `exp` of the token, when its claims could be read.
    expires_at: Option<DateTime<Utc>>,
}

impl core::fmt::Debug for StoredSession {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("StoredSession")
            .field("access_token", &"<redacted>")
            .field("user", &self.user)
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

#[derive(Debug, Default)]
struct Slot {
    session: Option<StoredSession>,
    /// Bumped by every mutation.
    epoch: u64,
}

/// Access token + user, always set and cleared together.
#[derive(Debug, Default)]
pub struct TokenStore {
    slot: RwLock<Slot>,
}

impl TokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, Slot> {
        self.slot.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Slot> {
        self.slot.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn set_session(&self, access_token: impl Into<String>, user: CurrentUser) {
        let session = stored(access_token.into(), user);
        let mut slot = self.write();
        slot.session = Some(session);
        slot.epoch += 1;
    }

    /// Commit only if nothing touched the store since `epoch` was read.
    ///
    /// Returns whether the session was stored.
    pub fn set_session_if_epoch(&self, epoch: u64, access_token: impl Into<String>, user: CurrentUser) -> bool {
        let session = stored(access_token.into(), user);
        let mut slot = self.write();
        if slot.epoch != epoch {
            return false;
        }
        slot.session = Some(session);
        slot.epoch += 1;
        true
    }

    pub fn clear_session(&self) {
        let mut slot = self.write();
        slot.session = None;
        slot.epoch += 1;
    }

    /// Clear only if nothing touched the store since `epoch` was read.
    pub fn clear_session_if_epoch(&self, epoch: u64) -> bool {
        let mut slot = self.write();
        if slot.epoch != epoch {
            return false;
        }
        slot.session = None;
        slot.epoch += 1;
        true
    }

    pub fn epoch(&self) -> u64 {
        self.read().epoch
    }

    pub fn access_token(&self) -> Option<String> {
        self.read().session.as_ref().map(|s| s.access_token.clone())
    }

    pub fn stored_user(&self) -> Option<CurrentUser> {
        self.read().session.as_ref().map(|s| s.user.clone())
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.read().session.as_ref().and_then(|s| s.expires_at)
    }

    /// A token is present and not known to be expired.
    pub fn is_authenticated(&self) -> bool {
        self.is_authenticated_at(Utc::now())
    }

    pub fn is_authenticated_at(&self, now: DateTime<Utc>) -> bool {
        match self.read().session.as_ref() {
            Some(session) => session.expires_at.is_none_or(|exp| now < exp),
            None => false,
        }
    }
}

fn stored(access_token: String, user: CurrentUser) -> StoredSession {
    // Opaque tokens are allowed; they just carry no local expiry.
    let expires_at = inspect_unverified(&access_token).ok().map(|c| c.expires_at);
    StoredSession {
        access_token,
        user,
        expires_at,
    }
}
