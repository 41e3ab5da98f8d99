//! `capstone-session` — client-side session lifecycle.
//!
//! Access tokens live only in memory ([`TokenStore`]); the refresh credential
//! lives in the HTTP client's cookie jar and is never visible here. The
//! [`SessionManager`] runs login, single-flight refresh and logout;
//! [`Bootstrap`] restores a session once per process; [`Navigator`] pushes
//! every page change through the access policy.

pub mod bootstrap;
pub mod config;
pub mod context;
pub mod error;
pub mod manager;
pub mod navigation;
pub mod token_store;
pub mod transport;

#[cfg(test)]
mod testing;

pub use bootstrap::{Bootstrap, BootstrapPhase};
pub use config::{AuthEndpoints, ClientConfig, ConfigError};
pub use context::SessionContext;
pub use error::{AuthError, TransportError};
pub use manager::{RefreshOutcome, SessionManager};
pub use navigation::{NavigationOutcome, Navigator};
pub use token_store::TokenStore;
pub use transport::{AuthResponse, AuthTransport, Credentials, HttpTransport};
