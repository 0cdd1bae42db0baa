//! In-process fakes shared by the unit tests.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use serde_json::{Value, json};
use tokio::sync::oneshot;

use crate::error::ClientError;
use crate::http::{ApiRequest, ApiResponse, HttpTransport, Method};
use crate::notify::{Notification, NotificationLevel, Notifier};

/// Transport answering from a script keyed by method and path.
///
/// Responses queued for a route are served in order; the last one repeats.
/// Unscripted routes answer 404.
#[derive(Default)]
pub(crate) struct ScriptedTransport {
    routes: Mutex<HashMap<(String, String), VecDeque<Result<ApiResponse, ClientError>>>>,
    gates: Mutex<HashMap<String, oneshot::Receiver<()>>>,
    sent: Mutex<Vec<ApiRequest>>,
}

impl ScriptedTransport {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub(crate) fn respond(&self, method: Method, path: &str, status: u16, body: Value) {
        self.script(method, path, Ok(ApiResponse::new(status, body)));
    }

    /// Fail the route at the transport level, as a dropped connection would.
    pub(crate) fn fail(&self, method: Method, path: &str, error: ClientError) {
        self.script(method, path, Err(error));
    }

    /// Park the next request to `path` until the returned sender fires.
    pub(crate) fn hold(&self, path: &str) -> oneshot::Sender<()> {
        let (release, gate) = oneshot::channel();
        self.gates
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(path.to_string(), gate);
        release
    }

    fn script(&self, method: Method, path: &str, outcome: Result<ApiResponse, ClientError>) {
        self.routes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry((method.to_string(), path.to_string()))
            .or_default()
            .push_back(outcome);
    }

    pub(crate) fn requests(&self) -> Vec<ApiRequest> {
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub(crate) fn requests_to(&self, path: &str) -> Vec<ApiRequest> {
        self.requests()
            .into_iter()
            .filter(|r| r.path == path)
            .collect()
    }
}

#[async_trait]
impl HttpTransport for ScriptedTransport {
    async fn send(&self, request: &ApiRequest) -> Result<ApiResponse, ClientError> {
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(request.clone());

        let gate = self
            .gates
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&request.path);
        if let Some(gate) = gate {
            let _ = gate.await;
        }

        let mut routes = self.routes.lock().unwrap_or_else(PoisonError::into_inner);
        let key = (request.method.to_string(), request.path.clone());
        let response = match routes.get_mut(&key) {
            Some(queue) if queue.len() > 1 => queue.pop_front(),
            Some(queue) => queue.front().cloned(),
            None => None,
        };
        response.unwrap_or_else(|| Ok(ApiResponse::new(404, json!({ "message": "Not found" }))))
    }
}

/// Notifier that remembers everything it was asked to show.
#[derive(Default)]
pub(crate) struct RecordingNotifier {
    seen: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub(crate) fn all(&self) -> Vec<Notification> {
        self.seen
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub(crate) fn messages(&self, level: NotificationLevel) -> Vec<String> {
        self.all()
            .into_iter()
            .filter(|n| n.level == level)
            .map(|n| n.message)
            .collect()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notification: Notification) {
        self.seen
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(notification);
    }
}
