//! Page-level permission lookups and the stale-result tracker.

use std::sync::{Mutex, PoisonError};

use serde_json::Value;

use arkedia_auth::{PermissionGrant, PermissionState, UserRecord};
use arkedia_core::UserId;

use crate::error::{ClientError, GENERIC_ERROR_MESSAGE};
use crate::http::{ApiClient, ApiRequest};
use crate::payload::flag;

const PERMISSIONS_PATH: &str = "/permissions";

/// Interpret a `GET /permissions` body.
///
/// The request succeeding means the page is viewable unless the payload says
/// `success: false`; an explicit `can_view` overrides both.
pub fn grant_from_payload(body: &Value) -> PermissionGrant {
    let can_view = flag(body, "can_view").unwrap_or_else(|| flag(body, "success") != Some(false));
    let right = |key: &str, alias: &str| flag(body, key).or_else(|| flag(body, alias)).unwrap_or(false);

    PermissionGrant {
        can_view,
        can_add: right("has_add_right", "can_add"),
        can_update: right("has_update_right", "can_update"),
        can_delete: right("has_delete_right", "can_delete"),
    }
}

#[derive(Debug, Clone)]
pub struct PermissionResolver {
    client: ApiClient,
}

impl PermissionResolver {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    pub async fn fetch(&self, user_id: &UserId, page_url: &str) -> Result<PermissionGrant, ClientError> {
        let request = ApiRequest::get(PERMISSIONS_PATH)
            .query("userId", user_id.to_string())
            .query("pageUrl", page_url);
        let body = self.client.send(request).await?;
        Ok(grant_from_payload(&body))
    }

    /// Resolve rights for a (user, page) pair. Never fails: errors are folded
    /// into the returned state with every right denied.
    pub async fn resolve(&self, user: Option<&UserRecord>, page_url: Option<&str>) -> PermissionState {
        match (user, non_empty(page_url)) {
            (Some(user), Some(page_url)) => self.resolve_pair(&user.id, page_url).await,
            _ => PermissionState::idle(),
        }
    }

    async fn resolve_pair(&self, user_id: &UserId, page_url: &str) -> PermissionState {
        match self.fetch(user_id, page_url).await {
            Ok(grant) => PermissionState::granted(grant),
            Err(e) => {
                tracing::warn!(user_id = %user_id, page_url, "permission check failed: {e}");
                PermissionState::failed(e.message_or(GENERIC_ERROR_MESSAGE))
            }
        }
    }

    /// Drive `tracker` to the state for (user, page), fetching only when the
    /// pair changed. Results that arrive after a newer pair or an unmount are
    /// dropped.
    pub async fn track(
        &self,
        tracker: &PermissionTracker,
        user: Option<&UserRecord>,
        page_url: Option<&str>,
    ) -> PermissionState {
        if let Some(ticket) = tracker.update(user, page_url) {
            let outcome = self.resolve_pair(&ticket.user_id, &ticket.page_url).await;
            if !tracker.commit(&ticket, outcome) {
                tracing::debug!(page_url = %ticket.page_url, "discarding stale permission result");
            }
        }
        tracker.state()
    }
}

fn non_empty(page_url: Option<&str>) -> Option<&str> {
    page_url.map(str::trim).filter(|p| !p.is_empty())
}

// ─────────────────────────────────────────────────────────────────────────────
// Tracker
// ─────────────────────────────────────────────────────────────────────────────

/// Claim on the tracker for one fetch. Only the newest ticket may commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermissionTicket {
    generation: u64,
    pub user_id: UserId,
    pub page_url: String,
}

#[derive(Debug)]
struct TrackerState {
    generation: u64,
    key: Option<(UserId, String)>,
    state: PermissionState,
    mounted: bool,
}

/// Per-consumer permission state (one per mounted page).
#[derive(Debug)]
pub struct PermissionTracker {
    inner: Mutex<TrackerState>,
}

impl PermissionTracker {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(TrackerState {
                generation: 0,
                key: None,
                state: PermissionState::loading(),
                mounted: true,
            }),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, TrackerState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Point the tracker at a (user, page) pair.
    ///
    /// Returns a ticket when a fetch is needed. An incomplete pair settles the
    /// state to idle and invalidates any fetch in flight.
    pub fn update(&self, user: Option<&UserRecord>, page_url: Option<&str>) -> Option<PermissionTicket> {
        let mut s = self.lock();
        let key = match (user, non_empty(page_url)) {
            (Some(user), Some(page_url)) => (user.id.clone(), page_url.to_string()),
            _ => {
                if s.key.is_some() || s.state != PermissionState::idle() {
                    s.generation += 1;
                    s.key = None;
                    s.state = PermissionState::idle();
                }
                return None;
            }
        };

        if s.key.as_ref() == Some(&key) {
            return None;
        }

        s.generation += 1;
        s.state = PermissionState::loading();
        let (user_id, page_url) = key.clone();
        s.key = Some(key);
        Some(PermissionTicket {
            generation: s.generation,
            user_id,
            page_url,
        })
    }

    /// Force a new fetch for the current pair.
    pub fn refresh(&self) -> Option<PermissionTicket> {
        let mut s = self.lock();
        let (user_id, page_url) = s.key.clone()?;
        s.generation += 1;
        s.state = PermissionState::loading();
        Some(PermissionTicket {
            generation: s.generation,
            user_id,
            page_url,
        })
    }

    /// Apply a fetch result. Returns false when the ticket is stale or the
    /// consumer is gone.
    pub fn commit(&self, ticket: &PermissionTicket, outcome: PermissionState) -> bool {
        let mut s = self.lock();
        if !s.mounted || ticket.generation != s.generation {
            return false;
        }
        s.state = outcome;
        true
    }

    pub fn unmount(&self) {
        self.lock().mounted = false;
    }

    pub fn state(&self) -> PermissionState {
        self.lock().state.clone()
    }
}

impl Default for PermissionTracker {
    fn default() -> Self {
        Self::new()
    }
}
