//! `arkedia-auth`: pure session and permission model.
//!
//! This crate is intentionally decoupled from HTTP and storage: it holds the
//! records exchanged with the backend and the policies evaluated on them
//! (landing route by role, access-guard ordering, permission edit rules).

pub mod authorize;
pub mod claims;
pub mod permissions;
pub mod roles;
pub mod session;
pub mod user;

pub use authorize::{AccessDecision, AccessRequirements, decide_access};
pub use claims::{TokenClaims, TokenValidationError, check_token, decode_unverified, validate_claims};
pub use permissions::{
    Capability, PermissionGrant, PermissionRecord, PermissionState, PermissionUpdate,
};
pub use roles::Role;
pub use session::{LandingRoute, Session};
pub use user::UserRecord;
