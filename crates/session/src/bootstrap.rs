//! One-shot session restore at process start.
//!
//! ```text
//! CHECK_MEMORY ──authenticated──────────────────────────▶ AUTHENTICATED
//!      │
//!      └─▶ ATTEMPT_REFRESH ──restored──────────────────▶ AUTHENTICATED
//!                 ├──token without user (logout)───────▶ LOGGED_OUT
//!                 └──failed / discarded────────────────▶ LOGGED_OUT
//! ```
//!
//! At most one refresh attempt per process, never retried, even when a run
//! is cancelled mid-attempt and started again; the sequencer never fails.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::{OnceCell, watch};
use tracing::{debug, info, warn};

use capstone_auth::CurrentUser;

use crate::manager::{RefreshOutcome, SessionManager};

/// What the shell should render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BootstrapPhase {
    /// Show the (single) loading indicator.
    Loading,
    Authenticated(CurrentUser),
    LoggedOut,
}

impl BootstrapPhase {
    pub fn is_loading(&self) -> bool {
        matches!(self, BootstrapPhase::Loading)
    }

    pub fn user(&self) -> Option<&CurrentUser> {
        match self {
            BootstrapPhase::Authenticated(user) => Some(user),
            _ => None,
        }
    }
}

pub struct Bootstrap {
    manager: Arc<SessionManager>,
    phase: watch::Sender<BootstrapPhase>,
    done: OnceCell<BootstrapPhase>,
    /// Set before the refresh request goes out.
    refresh_attempted: AtomicBool,
}

impl core::fmt::Debug for Bootstrap {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Bootstrap")
            .field("phase", &*self.phase.borrow())
            .finish_non_exhaustive()
    }
}

impl Bootstrap {
    pub fn new(manager: Arc<SessionManager>) -> Self {
        let (phase, _) = watch::channel(BootstrapPhase::Loading);
        Self {
            manager,
            phase,
            done: OnceCell::new(),
            refresh_attempted: AtomicBool::new(false),
        }
    }

    /// Follow phase changes (the shell waits on this instead of polling).
    pub fn subscribe(&self) -> watch::Receiver<BootstrapPhase> {
        self.phase.subscribe()
    }

    pub fn phase(&self) -> BootstrapPhase {
        self.phase.borrow().clone()
    }

    /// Run the sequence. Later calls return the first run's terminal phase.
    pub async fn run(&self) -> BootstrapPhase {
        self.done.get_or_init(|| self.sequence()).await.clone()
    }

    #[tracing::instrument(skip_all)]
    async fn sequence(&self) -> BootstrapPhase {
        let terminal = match self.check_memory() {
            Some(user) => {
                debug!(user_id = %user.id, "session already in memory");
                BootstrapPhase::Authenticated(user)
            }
            None => self.attempt_refresh().await,
        };

        match &terminal {
            BootstrapPhase::Authenticated(user) => info!(user_id = %user.id, role = %user.role, "session restored"),
            _ => info!("no session; showing login"),
        }
        self.phase.send_replace(terminal.clone());
        terminal
    }

    fn check_memory(&self) -> Option<CurrentUser> {
        if self.manager.is_authenticated() {
            self.manager.current_user()
        } else {
            None
        }
    }

    async fn attempt_refresh(&self) -> BootstrapPhase {
        // A cancelled earlier run may already have spent the credential;
        // presenting it again would look like a replay to the server.
        if self.refresh_attempted.swap(true, Ordering::SeqCst) {
            debug!("startup refresh already attempted; not retrying");
            return BootstrapPhase::LoggedOut;
        }

        match self.manager.refresh().await {
            Ok(RefreshOutcome::Restored(user)) => BootstrapPhase::Authenticated(user),
            Ok(RefreshOutcome::MissingUser) => {
                warn!("refresh returned no user; treating session as corrupt");
                self.manager.logout_detached();
                BootstrapPhase::LoggedOut
            }
            Ok(RefreshOutcome::Discarded) => BootstrapPhase::LoggedOut,
            Err(e) => {
                debug!(error = %e, "refresh at startup failed");
                BootstrapPhase::LoggedOut
            }
        }
    }
}
