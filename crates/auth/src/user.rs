//! User record as returned by the backend and cached by the token store.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use arkedia_core::UserId;

use crate::Role;

/// Authenticated user as known to the client.
///
/// Only the fields the session layer needs are typed; everything else the
/// backend sends (phone, avatar, room assignment, ...) is kept in `extra` so
/// the cached record round-trips unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: UserId,

    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub email: String,

    /// Resolved role. May be missing straight out of the login endpoint.
    #[serde(
        default,
        deserialize_with = "deserialize_role",
        skip_serializing_if = "Option::is_none"
    )]
    pub role: Option<Role>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl UserRecord {
    pub fn new(id: impl Into<UserId>, name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            email: email.into(),
            role: None,
            extra: Map::new(),
        }
    }

    pub fn with_role(mut self, role: Role) -> Self {
        self.role = Some(role);
        self
    }

    pub fn is_admin(&self) -> bool {
        self.role.as_ref().is_some_and(Role::is_admin)
    }

    /// Parse a user out of an arbitrary JSON value.
    ///
    /// Returns `None` when the value is not an object or lacks an id.
    pub fn from_value(value: &Value) -> Option<Self> {
        if !value.is_object() {
            return None;
        }
        serde_json::from_value(value.clone()).ok()
    }
}

/// `null`, missing and blank roles all mean "role not resolved yet".
fn deserialize_role<'de, D>(deserializer: D) -> Result<Option<Role>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw
        .filter(|s| !s.trim().is_empty())
        .map(Role::from))
}
