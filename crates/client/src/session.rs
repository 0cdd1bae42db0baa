//! Auth session manager: the single owner of who is logged in.
//!
//! It is the only writer of the token store and of the client's default
//! Authorization header.

use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock, Weak};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use arkedia_auth::{LandingRoute, Session, UserRecord, check_token};

use crate::error::{ClientError, extract_message};
use crate::http::{ApiClient, ApiRequest, ApiResponse, InterceptorSubscription, ResponseInterceptor};
use crate::notify::{Navigator, Notification, Notifier};
use crate::payload::{LoginPayload, extract_role, extract_user, normalize_login_response};
use crate::routes;
use crate::token_store::{SessionStorage, StoredSession, TokenStore};

pub const SESSION_EXPIRED_MESSAGE: &str = "Your session has expired. Please log in again.";

const LOGIN_PATH: &str = "/auth/login";
const REGISTER_PATH: &str = "/auth/register";
const PROFILE_PATH: &str = "/auth/profile";
const CHANGE_PASSWORD_PATH: &str = "/auth/change-password";
const FORGOT_PASSWORD_PATH: &str = "/auth/forgot-password";
const RESET_PASSWORD_PATH: &str = "/auth/reset-password";

// ─────────────────────────────────────────────────────────────────────────────
// Request bodies
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Clone, Serialize, Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }
}

impl core::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Sign-up form. Fields beyond the basics (phone, id number, ...) go in `extra`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Registration {
    pub name: String,
    pub email: String,
    pub password: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Clone, Serialize, Deserialize)]
pub struct PasswordChange {
    pub current_password: String,
    pub new_password: String,
}

impl core::fmt::Debug for PasswordChange {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("PasswordChange").finish_non_exhaustive()
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct PasswordReset {
    pub token: String,
    pub new_password: String,
}

impl core::fmt::Debug for PasswordReset {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("PasswordReset").finish_non_exhaustive()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Shared state
// ─────────────────────────────────────────────────────────────────────────────

struct SessionInner {
    client: ApiClient,
    storage: SessionStorage,
    notifier: Arc<dyn Notifier>,
    navigator: Arc<dyn Navigator>,
    state: RwLock<Session>,
    /// Credential flows currently awaiting the backend.
    in_flight: AtomicUsize,
    interceptor: Mutex<Option<InterceptorSubscription>>,
}

impl SessionInner {
    /// The stored state, reported as loading while any flow is in flight.
    fn read_state(&self) -> Session {
        let mut state = self
            .state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        state.is_loading |= self.in_flight.load(Ordering::Acquire) > 0;
        state
    }

    fn begin_flow(&self) -> FlowGuard<'_> {
        self.in_flight.fetch_add(1, Ordering::AcqRel);
        FlowGuard(&self.in_flight)
    }

    fn set_loading(&self, loading: bool) {
        self.state
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .is_loading = loading;
    }

    fn set_user(&self, user: UserRecord) {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        state.user = Some(user);
        state.is_loading = false;
    }

    /// Remove the user, returning whether one was logged in.
    fn take_user(&self) -> bool {
        self.state
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .user
            .take()
            .is_some()
    }

    fn clear_credentials(&self) {
        if let Err(e) = self.storage.clear() {
            tracing::error!("failed to clear stored session: {e}");
        }
        self.client.set_default_token(None);
    }

    fn end_session(&self, notification: Notification) {
        self.clear_credentials();
        *self.state.write().unwrap_or_else(PoisonError::into_inner) = Session::logged_out();
        self.notifier.notify(notification);
        self.navigator.navigate(routes::HOME);
    }
}

/// Counts one in-flight flow; released on drop, including cancellation.
struct FlowGuard<'a>(&'a AtomicUsize);

impl Drop for FlowGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::AcqRel);
    }
}

/// Logs the user out when any API call answers 401.
struct SessionExpiryInterceptor {
    session: Weak<SessionInner>,
}

impl ResponseInterceptor for SessionExpiryInterceptor {
    fn on_response(&self, request: &ApiRequest, response: &ApiResponse) {
        if response.status != 401 {
            return;
        }
        let Some(inner) = self.session.upgrade() else {
            return;
        };

        // Bad credentials and repeated 401s arrive while logged out.
        if !inner.take_user() {
            tracing::debug!(path = %request.path, "401 while logged out; ignoring");
            return;
        }

        tracing::warn!(
            request_id = %request.request_id,
            path = %request.path,
            "session rejected by backend; logging out"
        );
        inner.end_session(Notification::warning(SESSION_EXPIRED_MESSAGE));
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Public handle
// ─────────────────────────────────────────────────────────────────────────────

/// Handle to the auth session. Clones share state.
#[derive(Clone)]
pub struct AuthSession {
    inner: Arc<SessionInner>,
}

impl AuthSession {
    /// Create the session and install its 401 interceptor on `client`.
    ///
    /// The session starts in the loading state until [`bootstrap`](Self::bootstrap).
    pub fn new(
        client: ApiClient,
        store: Arc<dyn TokenStore>,
        notifier: Arc<dyn Notifier>,
        navigator: Arc<dyn Navigator>,
    ) -> Self {
        let inner = Arc::new(SessionInner {
            client: client.clone(),
            storage: SessionStorage::new(store),
            notifier,
            navigator,
            state: RwLock::new(Session::starting()),
            in_flight: AtomicUsize::new(0),
            interceptor: Mutex::new(None),
        });

        let subscription = client.install_interceptor(Arc::new(SessionExpiryInterceptor {
            session: Arc::downgrade(&inner),
        }));
        *inner
            .interceptor
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(subscription);

        Self { inner }
    }

    /// Uninstall the 401 interceptor. Idempotent.
    pub fn teardown(&self) {
        let subscription = self
            .inner
            .interceptor
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(subscription) = subscription {
            subscription.dispose();
            tracing::debug!("session interceptor uninstalled");
        }
    }

    pub fn client(&self) -> &ApiClient {
        &self.inner.client
    }

    // ── Read access ─────────────────────────────────────────────────────────

    pub fn snapshot(&self) -> Session {
        self.inner.read_state()
    }

    pub fn current_user(&self) -> Option<UserRecord> {
        self.inner.read_state().user
    }

    pub fn is_authenticated(&self) -> bool {
        self.inner.read_state().is_authenticated()
    }

    pub fn is_loading(&self) -> bool {
        self.inner.read_state().is_loading
    }

    /// The bearer token currently attached to requests.
    pub fn token(&self) -> Option<String> {
        self.inner.client.default_token()
    }

    // ── Flows ───────────────────────────────────────────────────────────────

    /// Restore a cached session. Always ends with `is_loading == false`.
    pub fn bootstrap(&self) -> Session {
        self.bootstrap_at(Utc::now())
    }

    pub fn bootstrap_at(&self, now: DateTime<Utc>) -> Session {
        let restored = match self.inner.storage.load() {
            Ok(StoredSession::Empty) => Ok(None),
            Ok(StoredSession::Valid { user, token }) => check_token(&token, now)
                .map(|()| Some((user, token)))
                .map_err(|e| e.to_string()),
            Ok(StoredSession::Invalid(reason)) => Err(reason),
            Err(e) => Err(e.to_string()),
        };

        match restored {
            Ok(Some((user, token))) => {
                tracing::info!(user_id = %user.id, "restored cached session");
                self.inner.client.set_default_token(Some(token));
                self.inner.set_user(user);
            }
            Ok(None) => self.inner.set_loading(false),
            Err(reason) => {
                tracing::info!("discarding cached session: {reason}");
                self.inner.clear_credentials();
                *self.inner.state.write().unwrap_or_else(PoisonError::into_inner) =
                    Session::logged_out();
            }
        }

        self.snapshot()
    }

    pub async fn login(&self, credentials: &Credentials) -> Result<UserRecord, ClientError> {
        self.run("Login failed", self.perform_login(credentials)).await
    }

    async fn perform_login(&self, credentials: &Credentials) -> Result<UserRecord, ClientError> {
        let inner = &self.inner;
        let body = inner
            .client
            .send(ApiRequest::post(LOGIN_PATH).anonymous().json(credentials)?)
            .await?;
        let LoginPayload { mut user, token } = normalize_login_response(&body)?;

        if user.role.is_none() {
            let lookup = ApiRequest::get(format!("/users/{}", user.id)).bearer(token.clone());
            let body = inner.client.send(lookup).await?;
            user.role = extract_role(&body);
            if user.role.is_none() {
                tracing::warn!(user_id = %user.id, "user lookup returned no role");
            }
        }

        inner.storage.persist(&user, &token)?;
        inner.client.set_default_token(Some(token));
        inner.set_user(user.clone());

        let landing = routes::landing_path(LandingRoute::for_role(user.role.as_ref()));
        inner.navigator.navigate(landing);
        inner.notifier.notify(Notification::success("Login successful"));

        tracing::info!(user_id = %user.id, role = ?user.role, "logged in");
        Ok(user)
    }

    /// Create an account. Does not log in.
    pub async fn register(&self, registration: &Registration) -> Result<Value, ClientError> {
        self.run("Registration failed", async {
            let body = self
                .inner
                .client
                .send(ApiRequest::post(REGISTER_PATH).anonymous().json(registration)?)
                .await?;
            self.notify_success(&body, "Registration successful. Please log in.");
            Ok(body)
        })
        .await
    }

    pub fn logout(&self) {
        tracing::info!("logging out");
        self.inner
            .end_session(Notification::info("You have been logged out"));
    }

    /// Update the profile and replace the session user with the response.
    pub async fn update_profile<T: Serialize + ?Sized>(
        &self,
        profile: &T,
    ) -> Result<UserRecord, ClientError> {
        self.run("Profile update failed", async {
            let inner = &self.inner;
            let token = inner.client.default_token().ok_or(ClientError::NotAuthenticated)?;

            let body = inner
                .client
                .send(ApiRequest::put(PROFILE_PATH).json(profile)?)
                .await?;
            let mut user = extract_user(&body).ok_or_else(|| {
                ClientError::InvalidResponse("profile response has no user".into())
            })?;
            if user.role.is_none() {
                user.role = inner.read_state().role().cloned();
            }

            inner.storage.persist(&user, &token)?;
            inner.set_user(user.clone());
            self.notify_success(&body, "Profile updated successfully");
            Ok(user)
        })
        .await
    }

    pub async fn change_password(&self, change: &PasswordChange) -> Result<(), ClientError> {
        self.run("Password change failed", async {
            let body = self
                .inner
                .client
                .send(ApiRequest::post(CHANGE_PASSWORD_PATH).json(change)?)
                .await?;
            self.notify_success(&body, "Password changed successfully");
            Ok(())
        })
        .await
    }

    pub async fn forgot_password(&self, email: &str) -> Result<(), ClientError> {
        self.run("Could not send password reset email", async {
            let body = self
                .inner
                .client
                .send(
                    ApiRequest::post(FORGOT_PASSWORD_PATH)
                        .anonymous()
                        .json(&json!({ "email": email }))?,
                )
                .await?;
            self.notify_success(&body, "Password reset instructions sent to your email");
            Ok(())
        })
        .await
    }

    pub async fn reset_password(&self, reset: &PasswordReset) -> Result<(), ClientError> {
        self.run("Password reset failed", async {
            let body = self
                .inner
                .client
                .send(ApiRequest::post(RESET_PASSWORD_PATH).anonymous().json(reset)?)
                .await?;
            self.notify_success(&body, "Password has been reset. Please log in.");
            Ok(())
        })
        .await
    }

    // ── Helpers ─────────────────────────────────────────────────────────────

    /// Hold `is_loading` for the duration of a credential flow and report failures.
    async fn run<T, F>(&self, failure: &str, flow: F) -> Result<T, ClientError>
    where
        F: Future<Output = Result<T, ClientError>>,
    {
        let guard = self.inner.begin_flow();
        let result = flow.await;
        drop(guard);

        if let Err(e) = &result {
            tracing::warn!("{failure}: {e}");
            self.inner
                .notifier
                .notify(Notification::error(e.message_or(failure)));
        }
        result
    }

    fn notify_success(&self, body: &Value, fallback: &str) {
        let message = extract_message(body).unwrap_or_else(|| fallback.to_string());
        self.inner.notifier.notify(Notification::success(message));
    }
}

impl core::fmt::Debug for AuthSession {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("AuthSession")
            .field("state", &self.inner.read_state())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::Method;
    use crate::notify::{HistoryNavigator, NotificationLevel};
    use crate::test_support::{RecordingNotifier, ScriptedTransport};
    use crate::token_store::{MemoryTokenStore, TOKEN_KEY, USER_KEY};
    use arkedia_auth::Role;
    use chrono::Duration;
    use jsonwebtoken::{EncodingKey, Header, encode};

    struct Harness {
        transport: Arc<ScriptedTransport>,
        store: Arc<MemoryTokenStore>,
        notifier: Arc<RecordingNotifier>,
        navigator: Arc<HistoryNavigator>,
        session: AuthSession,
    }

    fn harness() -> Harness {
        let transport = ScriptedTransport::new();
        let store = MemoryTokenStore::arc();
        let notifier = RecordingNotifier::new();
        let navigator = Arc::new(HistoryNavigator::default());
        let session = AuthSession::new(
            ApiClient::new(transport.clone()),
            store.clone(),
            notifier.clone(),
            navigator.clone(),
        );
        Harness {
            transport,
            store,
            notifier,
            navigator,
            session,
        }
    }

    fn jwt(exp: DateTime<Utc>) -> String {
        encode(
            &Header::default(),
            &json!({ "sub": 1, "exp": exp.timestamp() }),
            &EncodingKey::from_secret(b"test-secret"),
        )
        .unwrap()
    }

    fn creds() -> Credentials {
        Credentials::new("a@example.com", "pw")
    }

    async fn logged_in_admin() -> Harness {
        let h = harness();
        h.transport.respond(
            Method::Post,
            "/auth/login",
            200,
            json!({ "user": { "id": 1, "name": "Ann", "role": "admin" }, "token": "tok" }),
        );
        h.session.bootstrap();
        h.session.login(&creds()).await.unwrap();
        h
    }

    fn body_keys(request: &ApiRequest) -> Vec<String> {
        let mut keys: Vec<String> = request
            .body
            .as_ref()
            .and_then(Value::as_object)
            .map(|o| o.keys().cloned().collect())
            .unwrap_or_default();
        keys.sort();
        keys
    }

    #[tokio::test]
    async fn login_persists_then_redirects_admin() {
        let h = harness();
        h.transport.respond(
            Method::Post,
            "/auth/login",
            200,
            json!({ "data": { "user": { "id": 1, "name": "Ann", "role": "admin" }, "token": "tok" } }),
        );
        h.session.bootstrap();

        let user = h.session.login(&creds()).await.unwrap();

        assert!(user.is_admin());
        assert_eq!(h.session.token().as_deref(), Some("tok"));
        assert_eq!(h.store.read(TOKEN_KEY).unwrap().as_deref(), Some("tok"));
        assert_eq!(h.navigator.current_route(), routes::ADMIN_DASHBOARD);
        assert_eq!(h.notifier.messages(NotificationLevel::Success), vec!["Login successful"]);
        assert!(!h.session.is_loading());

        let login = &h.transport.requests_to("/auth/login")[0];
        assert_eq!(login.bearer_token(), None);
    }

    #[tokio::test]
    async fn missing_role_is_looked_up_with_new_token() {
        let h = harness();
        h.transport.respond(
            Method::Post,
            "/auth/login",
            200,
            json!({ "user": { "id": 4, "name": "Tia" }, "token": "fresh" }),
        );
        h.transport
            .respond(Method::Get, "/users/4", 200, json!({ "data": { "id": 4, "role": "tenant" } }));

        let user = h.session.login(&creds()).await.unwrap();

        assert_eq!(user.role, Some(Role::Tenant));
        assert_eq!(h.navigator.current_route(), routes::TENANT_DASHBOARD);
        let lookup = &h.transport.requests_to("/users/4")[0];
        assert_eq!(lookup.bearer_token(), Some("fresh"));
    }

    #[tokio::test]
    async fn failed_role_lookup_fails_the_login() {
        let h = harness();
        h.transport.respond(
            Method::Post,
            "/auth/login",
            200,
            json!({ "user": { "id": 4 }, "token": "fresh" }),
        );
        h.transport
            .respond(Method::Get, "/users/4", 500, json!({ "message": "lookup broke" }));

        let err = h.session.login(&creds()).await.unwrap_err();

        assert_eq!(err.status(), Some(500));
        assert!(!h.session.is_authenticated());
        assert!(!h.session.is_loading());
        assert_eq!(h.session.token(), None);
        assert_eq!(h.store.read(TOKEN_KEY).unwrap(), None);
        assert_eq!(h.notifier.messages(NotificationLevel::Error), vec!["lookup broke"]);
    }

    #[tokio::test]
    async fn bad_credentials_do_not_trigger_expiry() {
        let h = harness();
        h.transport.respond(
            Method::Post,
            "/auth/login",
            401,
            json!({ "message": "Invalid credentials" }),
        );

        let err = h.session.login(&creds()).await.unwrap_err();

        assert!(err.is_unauthorized());
        assert_eq!(h.notifier.messages(NotificationLevel::Error), vec!["Invalid credentials"]);
        assert!(h.notifier.messages(NotificationLevel::Warning).is_empty());
    }

    #[tokio::test]
    async fn unauthorized_response_logs_out_once() {
        let h = harness();
        h.transport.respond(
            Method::Post,
            "/auth/login",
            200,
            json!({ "user": { "id": 1, "role": "admin" }, "token": "tok" }),
        );
        h.transport.respond(Method::Get, "/permissions", 401, json!({}));
        h.session.login(&creds()).await.unwrap();

        let client = h.session.client().clone();
        let _ = client.send(ApiRequest::get("/permissions")).await;

        assert!(!h.session.is_authenticated());
        assert_eq!(h.session.token(), None);
        assert_eq!(h.store.read(TOKEN_KEY).unwrap(), None);
        assert_eq!(h.navigator.current_route(), routes::HOME);

        let _ = client.send(ApiRequest::get("/permissions")).await;
        assert_eq!(
            h.notifier.messages(NotificationLevel::Warning),
            vec![SESSION_EXPIRED_MESSAGE]
        );
    }

    #[tokio::test]
    async fn logout_clears_everything() {
        let h = harness();
        h.transport.respond(
            Method::Post,
            "/auth/login",
            200,
            json!({ "user": { "id": 1, "role": "tenant" }, "token": "tok" }),
        );
        h.session.login(&creds()).await.unwrap();

        h.session.logout();

        assert!(!h.session.is_authenticated());
        assert_eq!(h.session.token(), None);
        assert_eq!(h.store.read(TOKEN_KEY).unwrap(), None);
        assert_eq!(h.navigator.current_route(), routes::HOME);
    }

    #[test]
    fn bootstrap_restores_live_session() {
        let h = harness();
        let now = Utc::now();
        let token = jwt(now + Duration::hours(1));
        SessionStorage::new(h.store.clone())
            .persist(&UserRecord::new(2_i64, "Bo", "bo@example.com").with_role(Role::Tenant), &token)
            .unwrap();

        let session = h.session.bootstrap_at(now);

        assert!(session.is_authenticated());
        assert!(!session.is_loading);
        assert_eq!(h.session.token(), Some(token));
    }

    #[test]
    fn bootstrap_discards_expired_token() {
        let h = harness();
        let now = Utc::now();
        SessionStorage::new(h.store.clone())
            .persist(&UserRecord::new(2_i64, "Bo", "bo@example.com"), &jwt(now - Duration::hours(1)))
            .unwrap();

        let session = h.session.bootstrap_at(now);

        assert!(!session.is_authenticated());
        assert!(!session.is_loading);
        assert_eq!(h.session.token(), None);
        assert_eq!(h.store.read(TOKEN_KEY).unwrap(), None);
    }

    #[test]
    fn bootstrap_with_empty_store_stops_loading() {
        let h = harness();
        assert!(h.session.is_loading());
        let session = h.session.bootstrap();
        assert_eq!(session, Session::logged_out());
    }

    #[tokio::test]
    async fn profile_update_keeps_known_role() {
        let h = harness();
        h.transport.respond(
            Method::Post,
            "/auth/login",
            200,
            json!({ "user": { "id": 1, "name": "Ann", "role": "admin" }, "token": "tok" }),
        );
        h.transport.respond(
            Method::Put,
            "/auth/profile",
            200,
            json!({ "data": { "id": 1, "name": "Ann B." }, "message": "Saved" }),
        );
        h.session.login(&creds()).await.unwrap();

        let user = h.session.update_profile(&json!({ "name": "Ann B." })).await.unwrap();

        assert_eq!(user.name, "Ann B.");
        assert_eq!(user.role, Some(Role::Admin));
        assert_eq!(h.session.current_user(), Some(user));
        assert_eq!(h.store.read(TOKEN_KEY).unwrap().as_deref(), Some("tok"));
        assert!(h.notifier.messages(NotificationLevel::Success).contains(&"Saved".to_string()));
    }

    #[tokio::test]
    async fn profile_update_requires_login() {
        let h = harness();
        let err = h.session.update_profile(&json!({})).await.unwrap_err();
        assert_eq!(err, ClientError::NotAuthenticated);
        assert!(h.transport.requests().is_empty());
    }

    #[tokio::test]
    async fn register_does_not_log_in() {
        let h = harness();
        h.transport
            .respond(Method::Post, "/auth/register", 201, json!({ "success": true }));
        let registration = Registration {
            name: "New".into(),
            email: "new@example.com".into(),
            password: "pw".into(),
            extra: Map::new(),
        };

        h.session.register(&registration).await.unwrap();

        assert!(!h.session.is_authenticated());
        assert_eq!(h.session.token(), None);
        assert_eq!(
            h.notifier.messages(NotificationLevel::Success),
            vec!["Registration successful. Please log in."]
        );
    }

    #[test]
    fn bootstrap_discards_garbled_user() {
        let h = harness();
        h.store
            .write(&[(USER_KEY, "{not json".to_string()), (TOKEN_KEY, "tok".to_string())])
            .unwrap();

        let session = h.session.bootstrap();

        assert_eq!(session, Session::logged_out());
        assert!(!h.session.is_loading());
        assert_eq!(h.session.token(), None);
        assert_eq!(h.store.read(USER_KEY).unwrap(), None);
        assert_eq!(h.store.read(TOKEN_KEY).unwrap(), None);
    }

    #[tokio::test]
    async fn change_password_uses_the_session_token() {
        let h = logged_in_admin().await;
        h.transport.respond(
            Method::Post,
            "/auth/change-password",
            200,
            json!({ "success": true, "message": "Password updated" }),
        );
        let change = PasswordChange {
            current_password: "old".into(),
            new_password: "new".into(),
        };

        h.session.change_password(&change).await.unwrap();

        let sent = &h.transport.requests_to("/auth/change-password")[0];
        assert_eq!(sent.method, Method::Post);
        assert_eq!(sent.bearer_token(), Some("tok"));
        assert_eq!(body_keys(sent), vec!["current_password", "new_password"]);
        assert!(h.notifier.messages(NotificationLevel::Success).contains(&"Password updated".to_string()));
        assert!(!h.session.is_loading());
        assert!(h.session.is_authenticated());
    }

    #[tokio::test]
    async fn change_password_reports_backend_message() {
        let h = logged_in_admin().await;
        h.transport.respond(
            Method::Post,
            "/auth/change-password",
            400,
            json!({ "success": false, "message": "Current password is incorrect" }),
        );
        let change = PasswordChange {
            current_password: "wrong".into(),
            new_password: "new".into(),
        };

        let err = h.session.change_password(&change).await.unwrap_err();

        assert_eq!(err.status(), Some(400));
        assert_eq!(
            h.notifier.messages(NotificationLevel::Error),
            vec!["Current password is incorrect"]
        );
        assert!(!h.session.is_loading());
        assert!(h.session.is_authenticated());
    }

    #[tokio::test]
    async fn forgot_password_is_sent_anonymously() {
        let h = logged_in_admin().await;
        h.transport
            .respond(Method::Post, "/auth/forgot-password", 200, json!({ "success": true }));

        h.session.forgot_password("a@example.com").await.unwrap();

        let sent = &h.transport.requests_to("/auth/forgot-password")[0];
        assert_eq!(sent.bearer_token(), None);
        assert_eq!(sent.body, Some(json!({ "email": "a@example.com" })));
        assert!(
            h.notifier
                .messages(NotificationLevel::Success)
                .contains(&"Password reset instructions sent to your email".to_string())
        );
        assert!(!h.session.is_loading());
    }

    #[tokio::test]
    async fn forgot_password_network_failure_uses_fallback_text() {
        let h = harness();
        h.session.bootstrap();
        h.transport.fail(
            Method::Post,
            "/auth/forgot-password",
            ClientError::Network("connection reset".into()),
        );

        let err = h.session.forgot_password("a@example.com").await.unwrap_err();

        assert!(matches!(err, ClientError::Network(_)));
        assert_eq!(
            h.notifier.messages(NotificationLevel::Error),
            vec!["Could not send password reset email"]
        );
        assert!(!h.session.is_loading());
    }

    #[tokio::test]
    async fn reset_password_is_anonymous_and_reports_expired_links() {
        let h = logged_in_admin().await;
        h.transport.respond(
            Method::Post,
            "/auth/reset-password",
            400,
            json!({ "message": "Reset link has expired" }),
        );
        h.transport.respond(
            Method::Post,
            "/auth/reset-password",
            200,
            json!({ "message": "Password reset" }),
        );
        let reset = PasswordReset {
            token: "reset-123".into(),
            new_password: "new".into(),
        };

        let err = h.session.reset_password(&reset).await.unwrap_err();
        assert_eq!(err.status(), Some(400));
        assert_eq!(h.notifier.messages(NotificationLevel::Error), vec!["Reset link has expired"]);

        h.session.reset_password(&reset).await.unwrap();
        assert!(h.notifier.messages(NotificationLevel::Success).contains(&"Password reset".to_string()));

        let sent = h.transport.requests_to("/auth/reset-password");
        assert_eq!(sent.len(), 2);
        assert!(sent.iter().all(|r| r.bearer_token().is_none()));
        assert_eq!(body_keys(&sent[0]), vec!["new_password", "token"]);
        assert!(!h.session.is_loading());
    }

    #[tokio::test]
    async fn overlapping_flows_stay_loading_until_the_last_one_ends() {
        let h = harness();
        h.session.bootstrap();
        h.transport.respond(
            Method::Post,
            "/auth/login",
            200,
            json!({ "user": { "id": 1, "role": "tenant" }, "token": "tok" }),
        );
        h.transport
            .respond(Method::Post, "/auth/forgot-password", 200, json!({ "success": true }));
        let release = h.transport.hold("/auth/login");

        let session = h.session.clone();
        let login = tokio::spawn(async move {
            let credentials = creds();
            session.login(&credentials).await
        });
        while h.transport.requests_to("/auth/login").is_empty() {
            tokio::task::yield_now().await;
        }
        assert!(h.session.is_loading());

        h.session.forgot_password("b@example.com").await.unwrap();
        assert!(h.session.is_loading());

        release.send(()).unwrap();
        login.await.unwrap().unwrap();
        assert!(!h.session.is_loading());
        assert!(h.session.is_authenticated());
    }

    #[tokio::test]
    async fn teardown_uninstalls_interceptor() {
        let h = harness();
        assert_eq!(h.session.client().interceptor_count(), 1);
        h.session.teardown();
        h.session.teardown();
        assert_eq!(h.session.client().interceptor_count(), 0);
    }
}
