//! In-memory account directory with argon2 password hashes.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use argon2::{Argon2, PasswordHasher, PasswordVerifier};
use password_hash::{PasswordHash, SaltString};
use thiserror::Error;

use capstone_auth::{CurrentUser, Role};
use capstone_core::UserId;

use crate::config::SeedAccount;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AccountError {
    #[error("invalid identifier or password")]
    InvalidCredentials,

    #[error("account is disabled")]
    Disabled,

    #[error("identifier already registered: {0}")]
    Duplicate(String),

    #[error("password hashing failed: {0}")]
    Hashing(String),
}

#[derive(Clone)]
struct Account {
    user: CurrentUser,
    password_hash: String,
    disabled: bool,
}

/// Accounts keyed by lower-cased identifier (student number or email).
#[derive(Default)]
pub struct AccountDirectory {
    accounts: RwLock<HashMap<String, Account>>,
}

impl core::fmt::Debug for AccountDirectory {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("AccountDirectory").field("accounts", &self.len()).finish()
    }
}

fn key(identifier: &str) -> String {
    identifier.trim().to_lowercase()
}

fn hash_password(secret: &str) -> Result<String, AccountError> {
    let mut salt_bytes = [0u8; 16];
    getrandom::getrandom(&mut salt_bytes).map_err(|e| AccountError::Hashing(e.to_string()))?;
    let salt = SaltString::encode_b64(&salt_bytes).map_err(|e| AccountError::Hashing(e.to_string()))?;
    let phc = Argon2::default()
        .hash_password(secret.as_bytes(), &salt)
        .map_err(|e| AccountError::Hashing(e.to_string()))?
        .to_string();
    Ok(phc)
}

fn verify_password(hash: &str, secret: &str) -> bool {
    match PasswordHash::new(hash) {
        Ok(parsed) => Argon2::default().verify_password(secret.as_bytes(), &parsed).is_ok(),
        Err(_) => false,
    }
}

impl AccountDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_seed(seed: &[SeedAccount]) -> Result<Self, AccountError> {
        let directory = Self::new();
        for account in seed {
            directory.register(
                &account.identifier,
                &account.secret,
                account.role.clone(),
                &account.display_name,
            )?;
        }
        Ok(directory)
    }

    pub fn register(
        &self,
        identifier: &str,
        secret: &str,
        role: Role,
        display_name: &str,
    ) -> Result<CurrentUser, AccountError> {
        let key = key(identifier);
        let password_hash = hash_password(secret)?;

        let mut accounts = self.accounts.write().unwrap_or_else(PoisonError::into_inner);
        if accounts.contains_key(&key) {
            return Err(AccountError::Duplicate(identifier.trim().to_string()));
        }

        let mut user = CurrentUser::new(UserId::new(), role, display_name);
        if identifier.contains('@') {
            user = user.with_email(identifier.trim());
        }
        tracing::debug!(user_id = %user.id, role = %user.role, "account registered");
        accounts.insert(
            key,
            Account {
                user: user.clone(),
                password_hash,
                disabled: false,
            },
        );
        Ok(user)
    }

    /// Returns `false` when no such account exists.
    pub fn set_disabled(&self, identifier: &str, disabled: bool) -> bool {
        let mut accounts = self.accounts.write().unwrap_or_else(PoisonError::into_inner);
        match accounts.get_mut(&key(identifier)) {
            Some(account) => {
                account.disabled = disabled;
                true
            }
            None => false,
        }
    }

    /// Credentials are checked before the disabled flag, so a wrong password
    /// on a disabled account still reads as invalid credentials.
    pub fn authenticate(&self, identifier: &str, secret: &str) -> Result<CurrentUser, AccountError> {
        let account = {
            let accounts = self.accounts.read().unwrap_or_else(PoisonError::into_inner);
            accounts.get(&key(identifier)).cloned()
        };
        let Some(account) = account else {
            return Err(AccountError::InvalidCredentials);
        };
        if !verify_password(&account.password_hash, secret) {
            return Err(AccountError::InvalidCredentials);
        }
        if account.disabled {
            return Err(AccountError::Disabled);
        }
        Ok(account.user)
    }

    /// Active account by id; disabled accounts yield `Disabled`.
    pub fn active_user(&self, id: UserId) -> Result<CurrentUser, AccountError> {
        let accounts = self.accounts.read().unwrap_or_else(PoisonError::into_inner);
        match accounts.values().find(|account| account.user.id == id) {
            Some(account) if account.disabled => Err(AccountError::Disabled),
            Some(account) => Ok(account.user.clone()),
            None => Err(AccountError::InvalidCredentials),
        }
    }

    pub fn len(&self) -> usize {
        self.accounts.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn authenticate_checks_secret_and_disabled_flag() {
        let directory = AccountDirectory::new();
        let user = directory
            .register("S1234", "correct horse", Role::STUDENT, "Ada")
            .unwrap();

        assert_eq!(directory.authenticate("s1234", "correct horse").unwrap(), user);
        assert_eq!(
            directory.authenticate("s1234", "wrong").unwrap_err(),
            AccountError::InvalidCredentials
        );
        assert_eq!(
            directory.authenticate("nobody", "correct horse").unwrap_err(),
            AccountError::InvalidCredentials
        );

        assert!(directory.set_disabled("S1234", true));
        assert_eq!(
            directory.authenticate("s1234", "correct horse").unwrap_err(),
            AccountError::Disabled
        );
        assert_eq!(directory.active_user(user.id).unwrap_err(), AccountError::Disabled);
    }

    #[test]
    fn hashes_are_salted_phc_strings() {
        let a = hash_password("pw").unwrap();
        let b = hash_password("pw").unwrap();
        assert!(a.starts_with("$argon2"));
        assert_ne!(a, b);
        assert!(verify_password(&a, "pw"));
        assert!(!verify_password("not-a-hash", "pw"));
    }

    #[test]
    fn email_identifiers_populate_email_and_duplicates_fail() {
        let directory = AccountDirectory::new();
        let user = directory
            .register("ada@example.edu", "pw", Role::TEACHER, "Ada")
            .unwrap();
        assert_eq!(user.email.as_deref(), Some("ada@example.edu"));

        let err = directory
            .register("ADA@example.edu", "pw", Role::TEACHER, "Ada")
            .unwrap_err();
        assert!(matches!(err, AccountError::Duplicate(_)));
        assert_eq!(directory.len(), 1);
    }
}
