//! Reference auth API: login, refresh-cookie rotation, logout and a bearer
//! protected probe. Accounts and refresh credentials are kept in memory.

pub mod accounts;
pub mod app;
pub mod config;
pub mod context;
pub mod middleware;
pub mod refresh_tokens;
