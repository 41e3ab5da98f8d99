//! Login, single-flight refresh and logout.

use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::{OnceCell, watch};
use tracing::{debug, info, warn};

use capstone_auth::CurrentUser;

use crate::error::{AuthError, TransportError};
use crate::token_store::TokenStore;
use crate::transport::{AuthTransport, Credentials};

/// Result of a refresh that reached the server successfully.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// New token and user are in the store.
    Restored(CurrentUser),
    /// The server issued a token but no user; nothing was stored.
    MissingUser,
    /// The store changed while the request was in flight (logout or a newer
    /// login), so the response was dropped.
    Discarded,
}

type RefreshResult = Result<RefreshOutcome, AuthError>;
type Flight = Arc<OnceCell<RefreshResult>>;

/// Owns every mutation of the [`TokenStore`].
pub struct SessionManager {
    store: Arc<TokenStore>,
    transport: Arc<dyn AuthTransport>,
    /// The one refresh currently on the wire, if any.
    in_flight: Mutex<Option<Flight>>,
    /// Completion of the latest server-side revocation; `true` once done.
    revocation: Mutex<Option<watch::Receiver<bool>>>,
}

impl core::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SessionManager")
            .field("store", &self.store)
            .finish_non_exhaustive()
    }
}

impl SessionManager {
    pub fn new(store: Arc<TokenStore>, transport: Arc<dyn AuthTransport>) -> Self {
        Self {
            store,
            transport,
            in_flight: Mutex::new(None),
            revocation: Mutex::new(None),
        }
    }

    pub fn store(&self) -> &Arc<TokenStore> {
        &self.store
    }

    pub fn is_authenticated(&self) -> bool {
        self.store.is_authenticated()
    }

    pub fn current_user(&self) -> Option<CurrentUser> {
        self.store.stored_user()
    }

    /// Exchange credentials for a session. Never retried.
    #[tracing::instrument(skip_all, fields(identifier = %credentials.identifier))]
    pub async fn login(&self, credentials: &Credentials) -> Result<CurrentUser, AuthError> {
        if credentials.is_blank() {
            return Err(AuthError::InvalidCredentials);
        }

        // The previous session's revocation must reach the server before a
        // new refresh credential lands in the jar.
        let pending = self
            .revocation
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        if let Some(done) = pending {
            wait_revoked(done).await;
        }

        let response = self.transport.login(credentials).await.map_err(|e| {
            let err = AuthError::from_login(e);
            info!(error = %err, "login failed");
            err
        })?;

        let Some(user) = response.user else {
            warn!("login response carried a token but no user");
            return Err(AuthError::MalformedResponse("login response carried no user".to_string()));
        };

        self.store.set_session(response.access_token, user.clone());
        info!(user_id = %user.id, role = %user.role, "login succeeded");
        Ok(user)
    }

    /// Recover a session from the refresh cookie.
    ///
    /// Concurrent callers share one request and all observe its result. A
    /// caller arriving after the flight finished starts a new one.
    pub async fn refresh(&self) -> RefreshResult {
        let flight = {
            let mut slot = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(slot.get_or_insert_with(|| Arc::new(OnceCell::new())))
        };

        flight.get_or_init(|| self.run_refresh(&flight)).await.clone()
    }

    #[tracing::instrument(skip_all)]
    async fn run_refresh(&self, flight: &Flight) -> RefreshResult {
        let epoch = self.store.epoch();
        let result = self.transport.refresh().await;
        let outcome = self.settle_refresh(epoch, result);

        let mut slot = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
        if slot.as_ref().is_some_and(|current| Arc::ptr_eq(current, flight)) {
            *slot = None;
        }
        outcome
    }

    fn settle_refresh(
        &self,
        epoch: u64,
        result: Result<crate::transport::AuthResponse, TransportError>,
    ) -> RefreshResult {
        match result {
            Ok(response) => match response.user {
                Some(user) => {
                    if self.store.set_session_if_epoch(epoch, response.access_token, user.clone()) {
                        debug!(user_id = %user.id, "session refreshed");
                        Ok(RefreshOutcome::Restored(user))
                    } else {
                        debug!("session changed during refresh; dropping response");
                        Ok(RefreshOutcome::Discarded)
                    }
                }
                None => {
                    warn!("refresh response carried a token but no user");
                    Ok(RefreshOutcome::MissingUser)
                }
            },
            Err(e) => {
                let err = AuthError::from_refresh(e);
                if err == AuthError::RefreshFailed {
                    self.store.clear_session_if_epoch(epoch);
                }
                debug!(error = %err, "refresh failed");
                Err(err)
            }
        }
    }

    /// Drop the local session now and revoke its refresh credential.
    ///
    /// Local state is cleared before this returns, and a refresh still in
    /// flight will be discarded on arrival. Inside a runtime the revocation
    /// request is spawned immediately, so it carries this session's
    /// credential even if the returned future is awaited after a new login;
    /// the future only waits for it. Outside a runtime nothing is sent until
    /// the future is polled.
    pub fn logout(&self) -> impl Future<Output = ()> + Send + 'static {
        self.store.clear_session();
        // Later refreshes start their own flight.
        *self.in_flight.lock().unwrap_or_else(PoisonError::into_inner) = None;
        info!("session cleared");

        let transport = Arc::clone(&self.transport);
        let revoke = async move {
            if let Err(e) = transport.logout().await {
                debug!(error = %e, "server-side logout failed; credential will expire on its own");
            }
        };

        let mut deferred = Some(revoke);
        let spawned = match tokio::runtime::Handle::try_current() {
            Ok(handle) => deferred.take().map(|revoke| {
                let (done_tx, done_rx) = watch::channel(false);
                handle.spawn(async move {
                    revoke.await;
                    done_tx.send_replace(true);
                });
                *self.revocation.lock().unwrap_or_else(PoisonError::into_inner) = Some(done_rx.clone());
                done_rx
            }),
            Err(_) => {
                debug!("no runtime; revocation runs only if awaited");
                None
            }
        };

        async move {
            if let Some(revoke) = deferred {
                revoke.await;
            }
            if let Some(done) = spawned {
                wait_revoked(done).await;
            }
        }
    }

    /// [`logout`](Self::logout) without waiting for the server.
    pub fn logout_detached(&self) {
        let _revocation = self.logout();
    }

    /// Run a protected call with the current access token.
    ///
    /// A 401 triggers one (shared) refresh and one retry. If the retry is
    /// rejected too, the session is logged out.
    pub async fn authorized<T, F, Fut>(&self, mut call: F) -> Result<T, AuthError>
    where
        F: FnMut(String) -> Fut,
        Fut: Future<Output = Result<T, TransportError>>,
    {
        let token = match self.store.access_token() {
            Some(token) if self.store.is_authenticated() => token,
            _ => self.token_after_refresh().await?,
        };

        match call(token).await {
            Err(e) if e.is_unauthorized() => {
                debug!("access token rejected; refreshing once");
                let token = self.token_after_refresh().await?;
                match call(token).await {
                    Err(e) if e.is_unauthorized() => {
                        self.logout_detached();
                        Err(AuthError::Unauthorized)
                    }
                    other => other.map_err(AuthError::from_request),
                }
            }
            other => other.map_err(AuthError::from_request),
        }
    }

    async fn token_after_refresh(&self) -> Result<String, AuthError> {
        match self.refresh().await {
            Ok(RefreshOutcome::Restored(_)) => self.store.access_token().ok_or(AuthError::RefreshFailed),
            Ok(RefreshOutcome::MissingUser) => {
                self.logout_detached();
                Err(AuthError::RefreshFailed)
            }
            Ok(RefreshOutcome::Discarded) => Err(AuthError::RefreshFailed),
            Err(AuthError::RefreshFailed) => {
                self.logout_detached();
                Err(AuthError::RefreshFailed)
            }
            Err(e) => Err(e),
        }
    }
}

async fn wait_revoked(mut done: watch::Receiver<bool>) {
    loop {
        let finished = *done.borrow_and_update();
        // A dropped sender means the task is gone; nothing left to wait for.
        if finished || done.changed().await.is_err() {
            return;
        }
    }
}
