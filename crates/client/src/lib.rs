//! `arkedia-client`
//!
//! **Responsibility:** session and permission layer of the Arkedia Homes client.
//!
//! This crate provides:
//! - The REST client with a shared default Authorization header and a
//!   response-interceptor seam
//! - Token persistence and the auth session manager (login, logout, 401 expiry)
//! - Per-page permission resolution, the access guard and the navigation menu
//! - Admin editing of user permission matrices
//!
//! UI concerns (toasts, routing) are reached through the [`Notifier`] and
//! [`Navigator`] traits.

pub mod access_guard;
pub mod config;
pub mod error;
pub mod http;
pub mod navigation;
pub mod notify;
pub mod payload;
pub mod permission_admin;
pub mod permission_resolver;
pub mod routes;
pub mod session;
pub mod token_store;

#[cfg(test)]
pub(crate) mod test_support;

pub use access_guard::{AccessGuard, GuardView};
pub use config::{ClientConfig, ConfigError};
pub use error::ClientError;
pub use http::{ApiClient, ApiRequest, ApiResponse, HttpTransport, ReqwestTransport};
pub use navigation::{Category, NavigationComposer, NavigationMenu};
pub use notify::{HistoryNavigator, Navigator, Notification, NotificationLevel, Notifier, TracingNotifier};
pub use permission_admin::PermissionAdmin;
pub use permission_resolver::{PermissionResolver, PermissionTracker};
pub use session::{AuthSession, Credentials, PasswordChange, PasswordReset, Registration};
pub use token_store::{FileTokenStore, MemoryTokenStore, TokenStore};
