//! Normalization of backend response shapes.
//!
//! The backend is inconsistent about envelopes: the same field may arrive
//! under `data` or at the top level. Everything is resolved here, once, so the
//! rest of the crate only sees typed values.

use serde::de::DeserializeOwned;
use serde_json::Value;

use arkedia_auth::{Role, UserRecord};

use crate::error::ClientError;

/// Typed result of `POST /auth/login`.
#[derive(Debug, Clone, PartialEq)]
pub struct LoginPayload {
    pub user: UserRecord,
    pub token: String,
}

/// `body.data.<key>` when present and non-null, else `body.<key>`.
fn field<'a>(body: &'a Value, key: &str) -> Option<&'a Value> {
    body.get("data")
        .and_then(|data| data.get(key))
        .filter(|v| !v.is_null())
        .or_else(|| body.get(key).filter(|v| !v.is_null()))
}

pub fn normalize_login_response(body: &Value) -> Result<LoginPayload, ClientError> {
    let user = field(body, "user")
        .and_then(UserRecord::from_value)
        .ok_or_else(|| ClientError::InvalidResponse("login response has no user".into()))?;

    let token = field(body, "token")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| ClientError::InvalidResponse("login response has no token".into()))?;

    Ok(LoginPayload {
        user,
        token: token.to_string(),
    })
}

/// Find a user record in a response: `data.user`, `data`, `user`, then the body.
pub fn extract_user(body: &Value) -> Option<UserRecord> {
    let data = body.get("data");
    [
        data.and_then(|d| d.get("user")),
        data,
        body.get("user"),
        Some(body),
    ]
    .into_iter()
    .flatten()
    .find_map(UserRecord::from_value)
}

/// The role carried by a `GET /users/:id` response, if any.
pub fn extract_role(body: &Value) -> Option<Role> {
    extract_user(body)
        .and_then(|u| u.role)
        .or_else(|| {
            field(body, "role")
                .and_then(Value::as_str)
                .filter(|s| !s.trim().is_empty())
                .map(Role::from)
        })
}

/// Decode a list that is either `{ "data": [...] }` or a bare array.
pub fn data_array<T: DeserializeOwned>(body: &Value) -> Result<Vec<T>, ClientError> {
    let items = match body.get("data") {
        Some(data) if data.is_array() => data,
        _ if body.is_array() => body,
        _ => return Err(ClientError::InvalidResponse("expected a list".into())),
    };
    serde_json::from_value(items.clone()).map_err(|e| ClientError::Parse(e.to_string()))
}

/// Read a loosely typed boolean (`true`, `1`, `"true"`) from the envelope.
///
/// `None` when the key is absent or not boolean-like.
pub fn flag(body: &Value, key: &str) -> Option<bool> {
    match field(body, key)? {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => n.as_i64().map(|n| n != 0),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" => Some(true),
            "false" | "0" | "no" => Some(false),
            _ => None,
        },
        _ => None,
    }
}
