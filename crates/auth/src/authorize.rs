//! Access-guard policy (pure, no IO).
//!
//! The order of checks is a deliberate security posture:
//! loading → error (fail open) → view gate → capability gate.

use serde::Serialize;

use crate::{Capability, PermissionState};

/// Capabilities a protected view needs beyond viewing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AccessRequirements {
    pub require_add: bool,
    pub require_update: bool,
    pub require_delete: bool,
}

impl AccessRequirements {
    pub fn view_only() -> Self {
        Self::default()
    }

    pub fn add(mut self) -> Self {
        self.require_add = true;
        self
    }

    pub fn update(mut self) -> Self {
        self.require_update = true;
        self
    }

    pub fn delete(mut self) -> Self {
        self.require_delete = true;
        self
    }

    /// Required capabilities in check order.
    pub fn required(&self) -> impl Iterator<Item = Capability> + '_ {
        [
            (self.require_add, Capability::Add),
            (self.require_update, Capability::Update),
            (self.require_delete, Capability::Delete),
        ]
        .into_iter()
        .filter_map(|(required, cap)| required.then_some(cap))
    }
}

/// Outcome of evaluating a [`PermissionState`] against [`AccessRequirements`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum AccessDecision {
    /// Permissions still loading: show a placeholder only.
    Loading,
    /// The permission service failed: render anyway.
    FailOpen { error: String },
    /// No view right: redirect to the default dashboard.
    Redirect,
    /// Viewable, but a required capability is missing.
    Missing { capability: Capability },
    /// Everything requested holds.
    Allow,
}

impl AccessDecision {
    pub fn renders_children(&self) -> bool {
        matches!(self, AccessDecision::Allow | AccessDecision::FailOpen { .. })
    }
}

/// Decide what a protected view may render.
///
/// A permission-service error fails open for rendering only; the flags in the
/// state stay false, so capability checks made elsewhere still deny.
pub fn decide_access(state: &PermissionState, requirements: &AccessRequirements) -> AccessDecision {
    if state.is_loading {
        return AccessDecision::Loading;
    }

    if let Some(error) = &state.error {
        return AccessDecision::FailOpen {
            error: error.clone(),
        };
    }

    if !state.can_view {
        return AccessDecision::Redirect;
    }

    match requirements.required().find(|cap| !state.allows(*cap)) {
        Some(capability) => AccessDecision::Missing { capability },
        None => AccessDecision::Allow,
    }
}
