//! Scriptable transport for unit tests.

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::Semaphore;

use capstone_auth::{CurrentUser, Role};
use capstone_core::UserId;

use crate::error::TransportError;
use crate::transport::{AuthResponse, AuthTransport, Credentials};

pub(crate) fn user(role: Role) -> CurrentUser {
    CurrentUser::new(UserId::new(), role, "Test User")
}

pub(crate) fn auth_ok(token: &str, user: Option<CurrentUser>) -> AuthResponse {
    AuthResponse {
        access_token: token.to_string(),
        user,
    }
}

/// Defaults: every login and refresh is rejected with 401, logout succeeds.
pub(crate) struct FakeTransport {
    login_result: Mutex<Result<AuthResponse, TransportError>>,
    refresh_result: Mutex<Result<AuthResponse, TransportError>>,
    logout_result: Mutex<Result<(), TransportError>>,
    login_calls: AtomicUsize,
    refresh_calls: AtomicUsize,
    logout_calls: AtomicUsize,
    /// Exchange names in the order they reached the transport.
    history: Mutex<Vec<&'static str>>,
    /// When set, refresh waits for a permit before answering.
    gate: Option<Semaphore>,
}

impl FakeTransport {
    pub(crate) fn new() -> Self {
        Self {
            login_result: Mutex::new(Err(TransportError::rejected(401, Some("invalid_credentials".into()), ""))),
            refresh_result: Mutex::new(Err(TransportError::rejected(401, Some("refresh_failed".into()), ""))),
            logout_result: Mutex::new(Ok(())),
            login_calls: AtomicUsize::new(0),
            refresh_calls: AtomicUsize::new(0),
            logout_calls: AtomicUsize::new(0),
            history: Mutex::new(Vec::new()),
            gate: None,
        }
    }

    pub(crate) fn with_login(self, result: Result<AuthResponse, TransportError>) -> Self {
        *self.login_result.lock().unwrap() = result;
        self
    }

    pub(crate) fn with_refresh(self, result: Result<AuthResponse, TransportError>) -> Self {
        *self.refresh_result.lock().unwrap() = result;
        self
    }

    pub(crate) fn with_logout(self, result: Result<(), TransportError>) -> Self {
        *self.logout_result.lock().unwrap() = result;
        self
    }

    pub(crate) fn gated(mut self) -> Self {
        self.gate = Some(Semaphore::new(0));
        self
    }

    pub(crate) fn open_gate(&self) {
        if let Some(gate) = &self.gate {
            gate.add_permits(Semaphore::MAX_PERMITS / 2);
        }
    }

    pub(crate) fn login_calls(&self) -> usize {
        self.login_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn refresh_calls(&self) -> usize {
        self.refresh_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn logout_calls(&self) -> usize {
        self.logout_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn history(&self) -> Vec<&'static str> {
        self.history.lock().unwrap().clone()
    }
}

#[async_trait]
impl AuthTransport for FakeTransport {
    async fn login(&self, _credentials: &Credentials) -> Result<AuthResponse, TransportError> {
        self.login_calls.fetch_add(1, Ordering::SeqCst);
        self.history.lock().unwrap().push("login");
        self.login_result.lock().unwrap().clone()
    }

    async fn refresh(&self) -> Result<AuthResponse, TransportError> {
        self.refresh_calls.fetch_add(1, Ordering::SeqCst);
        self.history.lock().unwrap().push("refresh");
        if let Some(gate) = &self.gate {
            let _permit = gate.acquire().await.unwrap();
        }
        self.refresh_result.lock().unwrap().clone()
    }

    async fn logout(&self) -> Result<(), TransportError> {
        self.logout_calls.fetch_add(1, Ordering::SeqCst);
        self.history.lock().unwrap().push("logout");
        self.logout_result.lock().unwrap().clone()
    }
}
