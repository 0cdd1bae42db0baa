//! `arkedia-core`: shared building blocks for the Arkedia Homes client.
//!
//! This crate contains identifiers and the domain error model (no IO).

pub mod error;
pub mod id;

pub use error::{DomainError, DomainResult};
pub use id::{FormId, RecordId, UserId};
