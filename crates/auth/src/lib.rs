//! `capstone-auth` — pure authentication/authorization boundary.
//!
//! Roles, pages, the current-user model, access-token claims and the
//! role→page access policy. No HTTP, no storage, no async.

pub mod claims;
pub mod pages;
pub mod policy;
pub mod roles;
pub mod token;
pub mod user;

pub use claims::{AccessClaims, TokenValidationError, validate_claims};
pub use pages::Page;
pub use policy::{AccessExplanation, AccessPolicy, can_access_page, explain_access};
pub use roles::Role;
pub use token::{Hs256JwtValidator, JwtValidator, TokenError, inspect_unverified};
pub use user::CurrentUser;
