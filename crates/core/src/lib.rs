//! `capstone-core` — shared primitives for the capstone tracker.
//!
//! Identifiers and the domain error model. No transport or storage concerns.

pub mod error;
pub mod id;

pub use error::DomainError;
pub use id::{TokenFamilyId, UserId};
