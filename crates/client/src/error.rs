//! Client-side error taxonomy.

use serde_json::Value;
use thiserror::Error;

use crate::config::ConfigError;
use crate::token_store::TokenStoreError;

/// Fallback text when neither the backend nor the caller supplies a message.
pub const GENERIC_ERROR_MESSAGE: &str = "Something went wrong. Please try again.";

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ClientError {
    /// The backend answered 2xx but the payload is missing what we need.
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("network error: {0}")]
    Network(String),

    #[error("API error ({status}): {}", .message.as_deref().unwrap_or("no message"))]
    Api { status: u16, message: Option<String> },

    #[error("parse error: {0}")]
    Parse(String),

    #[error("not logged in")]
    NotAuthenticated,

    #[error("storage error: {0}")]
    Storage(#[from] TokenStoreError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl ClientError {
    /// Build an API error from a non-2xx status and its body.
    pub fn api(status: u16, body: &Value) -> Self {
        ClientError::Api {
            status,
            message: extract_message(body),
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status() == Some(401)
    }

    /// User-facing text: the backend's message when it sent one, else `fallback`.
    pub fn message_or(&self, fallback: &str) -> String {
        match self {
            ClientError::Api {
                message: Some(message),
                ..
            } => message.clone(),
            _ => fallback.to_string(),
        }
    }
}

/// Pull a human-readable message out of an error body (`message`, then `error`).
pub fn extract_message(body: &Value) -> Option<String> {
    ["message", "error"]
        .iter()
        .filter_map(|key| body.get(*key).and_then(Value::as_str))
        .map(str::trim)
        .find(|s| !s.is_empty())
        .map(str::to_string)
}
