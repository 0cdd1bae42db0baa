//! Page protection: applies the access policy to a view and performs the redirect.

use arkedia_auth::{AccessDecision, AccessRequirements, PermissionState, UserRecord, decide_access};

use crate::notify::Navigator;
use crate::permission_resolver::{PermissionResolver, PermissionTracker};
use crate::routes;

pub const ACCESS_DENIED_MESSAGE: &str = "You do not have permission to view this page.";

/// What a guarded view shows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardView<V> {
    /// Permissions are loading; show a placeholder only.
    Loading,
    Children(V),
    /// A required capability is missing.
    Fallback(Option<V>),
    /// No view right. The navigator has been sent to the default dashboard;
    /// show the fallback, or [`ACCESS_DENIED_MESSAGE`] when there is none.
    Redirected(Option<V>),
}

impl<V> GuardView<V> {
    pub fn children(&self) -> Option<&V> {
        match self {
            GuardView::Children(v) => Some(v),
            _ => None,
        }
    }

    /// The denial text for a redirect without a fallback.
    pub fn denial_message(&self) -> Option<&'static str> {
        matches!(self, GuardView::Redirected(None)).then_some(ACCESS_DENIED_MESSAGE)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccessGuard {
    page_url: Option<String>,
    requirements: AccessRequirements,
}

impl AccessGuard {
    /// Guard the navigator's current route.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn for_page(page_url: impl Into<String>) -> Self {
        Self {
            page_url: Some(page_url.into()),
            ..Self::default()
        }
    }

    pub fn require_add(mut self) -> Self {
        self.requirements = self.requirements.add();
        self
    }

    pub fn require_update(mut self) -> Self {
        self.requirements = self.requirements.update();
        self
    }

    pub fn require_delete(mut self) -> Self {
        self.requirements = self.requirements.delete();
        self
    }

    pub fn requirements(&self) -> AccessRequirements {
        self.requirements
    }

    pub fn page_url(&self, navigator: &dyn Navigator) -> String {
        self.page_url
            .clone()
            .unwrap_or_else(|| navigator.current_route())
    }

    pub fn decide(&self, state: &PermissionState) -> AccessDecision {
        decide_access(state, &self.requirements)
    }

    /// Render for an already resolved state. `children` is built only when shown.
    pub fn render<V>(
        &self,
        state: &PermissionState,
        navigator: &dyn Navigator,
        children: impl FnOnce() -> V,
        fallback: Option<V>,
    ) -> GuardView<V> {
        match self.decide(state) {
            AccessDecision::Loading => GuardView::Loading,
            AccessDecision::FailOpen { error } => {
                tracing::warn!(
                    page_url = %self.page_url(navigator),
                    "permission check failed, rendering anyway: {error}"
                );
                GuardView::Children(children())
            }
            AccessDecision::Redirect => {
                tracing::info!(page_url = %self.page_url(navigator), "no view right; redirecting");
                navigator.navigate(routes::DEFAULT_DASHBOARD);
                GuardView::Redirected(fallback)
            }
            AccessDecision::Missing { capability } => {
                tracing::debug!(%capability, "required capability missing");
                GuardView::Fallback(fallback)
            }
            AccessDecision::Allow => GuardView::Children(children()),
        }
    }

    /// Resolve permissions through `tracker` and render.
    pub async fn protect<V>(
        &self,
        resolver: &PermissionResolver,
        tracker: &PermissionTracker,
        user: Option<&UserRecord>,
        navigator: &dyn Navigator,
        children: impl FnOnce() -> V,
        fallback: Option<V>,
    ) -> GuardView<V> {
        let page_url = self.page_url(navigator);
        let state = resolver.track(tracker, user, Some(&page_url)).await;
        self.render(&state, navigator, children, fallback)
    }
}
