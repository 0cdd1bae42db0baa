use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Duration, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Clock skew tolerated when checking `iat`.
const ISSUED_AT_LEEWAY_SECS: i64 = 60;

/// Bearer-token claims the client cares about.
///
/// The client never verifies signatures (the backend is the authority); it
/// only reads `exp` so an expired token is not restored at startup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenClaims {
    #[serde(default)]
    pub sub: Option<Value>,

    /// Expiration, seconds since the epoch.
    #[serde(default)]
    pub exp: Option<i64>,

    /// Issued-at, seconds since the epoch.
    #[serde(default)]
    pub iat: Option<i64>,
}

impl TokenClaims {
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.exp.and_then(|s| Utc.timestamp_opt(s, 0).single())
    }

    pub fn issued_at(&self) -> Option<DateTime<Utc>> {
        self.iat.and_then(|s| Utc.timestamp_opt(s, 0).single())
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenValidationError {
    #[error("token has expired")]
    Expired,

    #[error("token not yet valid (issued_at is in the future)")]
    NotYetValid,

    #[error("malformed token: {0}")]
    Malformed(String),
}

/// Decode the payload segment of a JWT without verifying it.
///
/// Opaque (non-JWT) tokens yield `Ok(None)`: there is nothing to check.
pub fn decode_unverified(token: &str) -> Result<Option<TokenClaims>, TokenValidationError> {
    let segments: Vec<&str> = token.split('.').collect();
    let [_, payload, _] = segments.as_slice() else {
        return Ok(None);
    };

    let bytes = URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .map_err(|e| TokenValidationError::Malformed(e.to_string()))?;

    serde_json::from_slice(&bytes)
        .map(Some)
        .map_err(|e| TokenValidationError::Malformed(e.to_string()))
}

/// Deterministically validate token claims against `now`.
pub fn validate_claims(claims: &TokenClaims, now: DateTime<Utc>) -> Result<(), TokenValidationError> {
    if let Some(issued_at) = claims.issued_at() {
        if now + Duration::seconds(ISSUED_AT_LEEWAY_SECS) < issued_at {
            return Err(TokenValidationError::NotYetValid);
        }
    }
    if let Some(expires_at) = claims.expires_at() {
        if now >= expires_at {
            return Err(TokenValidationError::Expired);
        }
    }
    Ok(())
}

/// Decode-and-validate in one step. Opaque tokens are accepted as-is.
pub fn check_token(token: &str, now: DateTime<Utc>) -> Result<(), TokenValidationError> {
    match decode_unverified(token)? {
        Some(claims) => validate_claims(&claims, now),
        None => Ok(()),
    }
}
