use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use arkedia_core::{DomainError, DomainResult, FormId};

/// Something a user can do on a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    View,
    Add,
    Update,
    Delete,
}

impl core::fmt::Display for Capability {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(match self {
            Capability::View => "view",
            Capability::Add => "add",
            Capability::Update => "update",
            Capability::Delete => "delete",
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Resolved rights for one (user, page) pair
// ─────────────────────────────────────────────────────────────────────────────

/// Definite answer from the permissions endpoint.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionGrant {
    pub can_view: bool,
    pub can_add: bool,
    pub can_update: bool,
    pub can_delete: bool,
}

impl PermissionGrant {
    pub fn allows(&self, capability: Capability) -> bool {
        match capability {
            Capability::View => self.can_view,
            Capability::Add => self.can_add,
            Capability::Update => self.can_update,
            Capability::Delete => self.can_delete,
        }
    }
}

/// Tri-state permission answer: loading, failed, or a definite grant.
///
/// The rights are fail-closed: every flag is false unless a grant was
/// received for the current (user, page) pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionState {
    pub can_view: bool,
    pub can_add: bool,
    pub can_update: bool,
    pub can_delete: bool,
    pub is_loading: bool,
    pub error: Option<String>,
}

impl PermissionState {
    /// Waiting for the backend.
    pub fn loading() -> Self {
        Self {
            is_loading: true,
            ..Self::idle()
        }
    }

    /// Nothing to check yet (no user or no page).
    pub fn idle() -> Self {
        Self {
            can_view: false,
            can_add: false,
            can_update: false,
            can_delete: false,
            is_loading: false,
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
            ..Self::idle()
        }
    }

    pub fn granted(grant: PermissionGrant) -> Self {
        Self {
            can_view: grant.can_view,
            can_add: grant.can_add,
            can_update: grant.can_update,
            can_delete: grant.can_delete,
            is_loading: false,
            error: None,
        }
    }

    pub fn grant(&self) -> PermissionGrant {
        PermissionGrant {
            can_view: self.can_view,
            can_add: self.can_add,
            can_update: self.can_update,
            can_delete: self.can_delete,
        }
    }

    pub fn allows(&self, capability: Capability) -> bool {
        self.grant().allows(capability)
    }

    /// True once the state can no longer change for the current pair.
    pub fn is_settled(&self) -> bool {
        !self.is_loading
    }
}

impl Default for PermissionState {
    fn default() -> Self {
        Self::loading()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Admin-editable permission matrix (user × form)
// ─────────────────────────────────────────────────────────────────────────────

/// One row of a user's permission matrix.
///
/// `default_*` is the ceiling configured for the form: a right can never be
/// granted above it, and nothing is granted while the form is inactive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionRecord {
    /// Form id.
    pub id: FormId,
    #[serde(default)]
    pub page_name: String,
    #[serde(default)]
    pub page_url: String,
    #[serde(default, deserialize_with = "flexible_bool")]
    pub is_active: bool,
    #[serde(default, deserialize_with = "flexible_bool")]
    pub has_add_right: bool,
    #[serde(default, deserialize_with = "flexible_bool")]
    pub has_update_right: bool,
    #[serde(default, deserialize_with = "flexible_bool")]
    pub has_delete_right: bool,
    #[serde(default, deserialize_with = "flexible_bool")]
    pub default_add: bool,
    #[serde(default, deserialize_with = "flexible_bool")]
    pub default_update: bool,
    #[serde(default, deserialize_with = "flexible_bool")]
    pub default_delete: bool,
}

/// Wire shape of one entry in a bulk permission save.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionUpdate {
    pub form_id: FormId,
    pub has_add_right: bool,
    pub has_update_right: bool,
    pub has_delete_right: bool,
    pub is_active: bool,
}

impl PermissionRecord {
    /// The form-level ceiling for a capability. Viewing is governed by `is_active`.
    pub fn default_allows(&self, capability: Capability) -> bool {
        match capability {
            Capability::View => true,
            Capability::Add => self.default_add,
            Capability::Update => self.default_update,
            Capability::Delete => self.default_delete,
        }
    }

    fn has_right(&self, capability: Capability) -> bool {
        match capability {
            Capability::View => self.is_active,
            Capability::Add => self.has_add_right,
            Capability::Update => self.has_update_right,
            Capability::Delete => self.has_delete_right,
        }
    }

    /// Whether a toggle for `capability` should be enabled in an editor.
    pub fn can_edit(&self, capability: Capability) -> bool {
        capability != Capability::View && self.is_active && self.default_allows(capability)
    }

    /// The right as it will be saved: active, granted and within the default.
    pub fn effective(&self, capability: Capability) -> bool {
        self.is_active && self.has_right(capability) && self.default_allows(capability)
    }

    pub fn set_active(&mut self, active: bool) {
        self.is_active = active;
    }

    /// Grant or revoke a right.
    ///
    /// Edits are rejected while the form is inactive, and a grant is rejected
    /// when the form's default does not allow it. Revoking is always allowed
    /// on an active form.
    pub fn set_right(&mut self, capability: Capability, granted: bool) -> DomainResult<()> {
        if capability == Capability::View {
            return Err(DomainError::validation(
                "view access is controlled by the form's active flag",
            ));
        }
        if !self.is_active {
            return Err(DomainError::form_inactive(&self.page_name));
        }
        if granted && !self.default_allows(capability) {
            return Err(DomainError::right_not_allowed(capability.to_string(), &self.page_name));
        }

        match capability {
            Capability::Add => self.has_add_right = granted,
            Capability::Update => self.has_update_right = granted,
            Capability::Delete => self.has_delete_right = granted,
            Capability::View => {}
        }
        Ok(())
    }

    /// Build the save payload entry, clamping every right to what is allowed.
    pub fn to_update(&self) -> PermissionUpdate {
        PermissionUpdate {
            form_id: self.id.clone(),
            has_add_right: self.effective(Capability::Add),
            has_update_right: self.effective(Capability::Update),
            has_delete_right: self.effective(Capability::Delete),
            is_active: self.is_active,
        }
    }
}

/// Accept `true`/`false`, `0`/`1` and their string forms; `null` is false.
fn flexible_bool<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Bool(b) => b,
        Value::Number(n) => n.as_i64().is_some_and(|n| n != 0),
        Value::String(s) => matches!(s.trim().to_ascii_lowercase().as_str(), "true" | "1" | "yes"),
        _ => false,
    })
}
