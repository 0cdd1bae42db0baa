//! HTTP plumbing: request model, transports, default Authorization header and
//! response interceptors.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock, Weak};

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

use crate::config::ClientConfig;
use crate::error::ClientError;

pub const REQUEST_ID_HEADER: &str = "X-Request-Id";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
}

impl core::fmt::Display for Method {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
        })
    }
}

/// How a request is authenticated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Auth {
    /// Use the client's default Authorization header, if one is set.
    Default,
    /// Use this bearer token regardless of the default.
    Bearer(String),
    /// Send no Authorization header.
    Anonymous,
}

/// A request against the Arkedia REST API.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    /// Endpoint path relative to the configured base URL, e.g. `/auth/login`.
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
    pub auth: Auth,
    pub request_id: Uuid,
}

impl ApiRequest {
    fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
            auth: Auth::Default,
            request_id: Uuid::now_v7(),
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::Get, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::Post, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::Put, path)
    }

    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    /// Attach a JSON body.
    pub fn json<T: Serialize + ?Sized>(mut self, body: &T) -> Result<Self, ClientError> {
        let value = serde_json::to_value(body).map_err(|e| ClientError::Parse(e.to_string()))?;
        self.body = Some(value);
        Ok(self)
    }

    pub fn bearer(mut self, token: impl Into<String>) -> Self {
        self.auth = Auth::Bearer(token.into());
        self
    }

    pub fn anonymous(mut self) -> Self {
        self.auth = Auth::Anonymous;
        self
    }

    /// The bearer token that will actually be sent (after default resolution).
    pub fn bearer_token(&self) -> Option<&str> {
        match &self.auth {
            Auth::Bearer(token) => Some(token),
            _ => None,
        }
    }

    pub fn query_value(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// Status and decoded body of a completed request.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Value,
}

impl ApiResponse {
    pub fn new(status: u16, body: Value) -> Self {
        Self { status, body }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Sends a fully resolved request. Implementations never interpret status codes.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn send(&self, request: &ApiRequest) -> Result<ApiResponse, ClientError>;
}

// ─────────────────────────────────────────────────────────────────────────────
// reqwest transport
// ─────────────────────────────────────────────────────────────────────────────

/// Production transport backed by `reqwest`.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    config: ClientConfig,
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(config: ClientConfig) -> Result<Self, ClientError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| ClientError::Network(e.to_string()))?;
        Ok(Self { config, client })
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: &ApiRequest) -> Result<ApiResponse, ClientError> {
        let url = self.config.endpoint(&request.path);
        let mut req = match request.method {
            Method::Get => self.client.get(&url),
            Method::Post => self.client.post(&url),
            Method::Put => self.client.put(&url),
        };

        req = req.header(REQUEST_ID_HEADER, request.request_id.to_string());
        if !request.query.is_empty() {
            req = req.query(&request.query);
        }
        if let Some(body) = &request.body {
            req = req.json(body);
        }
        if let Some(token) = request.bearer_token() {
            req = req.bearer_auth(token);
        }

        let resp = req
            .send()
            .await
            .map_err(|e| ClientError::Network(e.to_string()))?;

        let status = resp.status().as_u16();
        let text = resp
            .text()
            .await
            .map_err(|e| ClientError::Network(e.to_string()))?;

        let body = if text.trim().is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&text).unwrap_or(Value::String(text))
        };

        Ok(ApiResponse { status, body })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Interceptors
// ─────────────────────────────────────────────────────────────────────────────

/// Observes every completed response before the caller sees it.
///
/// Called without any client lock held, so implementations may call back
/// into the client (e.g. clear the default Authorization header).
pub trait ResponseInterceptor: Send + Sync {
    fn on_response(&self, request: &ApiRequest, response: &ApiResponse);
}

#[derive(Default)]
struct InterceptorRegistry {
    next_id: AtomicU64,
    entries: Mutex<Vec<(u64, Arc<dyn ResponseInterceptor>)>>,
}

impl InterceptorRegistry {
    fn insert(&self, interceptor: Arc<dyn ResponseInterceptor>) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((id, interceptor));
        id
    }

    fn remove(&self, id: u64) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|(entry_id, _)| *entry_id != id);
    }

    fn snapshot(&self) -> Vec<Arc<dyn ResponseInterceptor>> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(_, i)| Arc::clone(i))
            .collect()
    }

    fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

/// Handle for an installed interceptor. Dropping it (or calling `dispose`)
/// uninstalls the interceptor.
#[must_use = "dropping the subscription uninstalls the interceptor"]
pub struct InterceptorSubscription {
    id: u64,
    registry: Weak<InterceptorRegistry>,
}

impl InterceptorSubscription {
    pub fn dispose(self) {}
}

impl Drop for InterceptorSubscription {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            registry.remove(self.id);
        }
    }
}

impl core::fmt::Debug for InterceptorSubscription {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("InterceptorSubscription")
            .field("id", &self.id)
            .finish()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// API client
// ─────────────────────────────────────────────────────────────────────────────

/// Shared handle to the REST API.
///
/// Cloning is cheap; all clones share the default Authorization header and
/// the interceptor list. Only the session manager writes the header.
#[derive(Clone)]
pub struct ApiClient {
    transport: Arc<dyn HttpTransport>,
    default_token: Arc<RwLock<Option<String>>>,
    interceptors: Arc<InterceptorRegistry>,
}

impl ApiClient {
    pub fn new(transport: Arc<dyn HttpTransport>) -> Self {
        Self {
            transport,
            default_token: Arc::new(RwLock::new(None)),
            interceptors: Arc::new(InterceptorRegistry::default()),
        }
    }

    pub fn set_default_token(&self, token: Option<String>) {
        *self
            .default_token
            .write()
            .unwrap_or_else(PoisonError::into_inner) = token;
    }

    pub fn default_token(&self) -> Option<String> {
        self.default_token
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn install_interceptor(
        &self,
        interceptor: Arc<dyn ResponseInterceptor>,
    ) -> InterceptorSubscription {
        let id = self.interceptors.insert(interceptor);
        InterceptorSubscription {
            id,
            registry: Arc::downgrade(&self.interceptors),
        }
    }

    pub fn interceptor_count(&self) -> usize {
        self.interceptors.len()
    }

    /// Send a request and return the body of a 2xx response.
    ///
    /// Interceptors see every response (success or not) before the status is
    /// turned into an error.
    pub async fn send(&self, mut request: ApiRequest) -> Result<Value, ClientError> {
        if request.auth == Auth::Default {
            request.auth = match self.default_token() {
                Some(token) => Auth::Bearer(token),
                None => Auth::Anonymous,
            };
        }

        tracing::debug!(
            request_id = %request.request_id,
            method = %request.method,
            path = %request.path,
            authenticated = request.bearer_token().is_some(),
            "sending API request"
        );

        let response = self.transport.send(&request).await.inspect_err(|e| {
            tracing::warn!(request_id = %request.request_id, path = %request.path, "request failed: {e}");
        })?;

        for interceptor in self.interceptors.snapshot() {
            interceptor.on_response(&request, &response);
        }

        if response.is_success() {
            Ok(response.body)
        } else {
            tracing::debug!(
                request_id = %request.request_id,
                status = response.status,
                path = %request.path,
                "API returned an error status"
            );
            Err(ClientError::api(response.status, &response.body))
        }
    }
}

impl core::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ApiClient")
            .field("authenticated", &self.default_token().is_some())
            .field("interceptors", &self.interceptor_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::ScriptedTransport;
    use serde_json::json;

    struct CountingInterceptor(AtomicU64);

    impl ResponseInterceptor for CountingInterceptor {
        fn on_response(&self, _request: &ApiRequest, _response: &ApiResponse) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[tokio::test]
    async fn default_token_is_applied_and_cleared() {
        let transport = ScriptedTransport::new();
        transport.respond(Method::Get, "/ping", 200, json!({ "ok": true }));
        let client = ApiClient::new(transport.clone());

        client.set_default_token(Some("t-1".into()));
        client.send(ApiRequest::get("/ping")).await.unwrap();
        client.set_default_token(None);
        client.send(ApiRequest::get("/ping")).await.unwrap();

        let sent = transport.requests();
        assert_eq!(sent[0].bearer_token(), Some("t-1"));
        assert_eq!(sent[1].bearer_token(), None);
    }

    #[tokio::test]
    async fn explicit_bearer_and_anonymous_override_default() {
        let transport = ScriptedTransport::new();
        transport.respond(Method::Get, "/ping", 200, json!({}));
        let client = ApiClient::new(transport.clone());
        client.set_default_token(Some("default".into()));

        client.send(ApiRequest::get("/ping").bearer("explicit")).await.unwrap();
        client.send(ApiRequest::get("/ping").anonymous()).await.unwrap();

        let sent = transport.requests();
        assert_eq!(sent[0].bearer_token(), Some("explicit"));
        assert_eq!(sent[1].bearer_token(), None);
    }

    #[tokio::test]
    async fn error_status_becomes_api_error_with_message() {
        let transport = ScriptedTransport::new();
        transport.respond(Method::Post, "/auth/login", 400, json!({ "message": "Invalid credentials" }));
        let client = ApiClient::new(transport);

        let err = client.send(ApiRequest::post("/auth/login")).await.unwrap_err();
        assert_eq!(
            err,
            ClientError::Api {
                status: 400,
                message: Some("Invalid credentials".into())
            }
        );
    }

    #[tokio::test]
    async fn interceptors_see_failures_until_disposed() {
        let transport = ScriptedTransport::new();
        transport.respond(Method::Get, "/users/1", 401, json!({}));
        let client = ApiClient::new(transport);

        let counter = Arc::new(CountingInterceptor(AtomicU64::new(0)));
        let subscription = client.install_interceptor(counter.clone());
        assert_eq!(client.interceptor_count(), 1);

        let _ = client.send(ApiRequest::get("/users/1")).await;
        assert_eq!(counter.0.load(Ordering::SeqCst), 1);

        subscription.dispose();
        assert_eq!(client.interceptor_count(), 0);

        let _ = client.send(ApiRequest::get("/users/1")).await;
        assert_eq!(counter.0.load(Ordering::SeqCst), 1);
    }
}
