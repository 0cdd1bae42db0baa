//! Identifiers handed out by the backend.
//!
//! The REST API is not consistent about id types: some collections use numeric
//! keys, others string keys. Identifiers keep whichever JSON form they arrived
//! in so records serialize back unchanged.

use core::str::FromStr;
use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// Raw backend identifier (JSON number or string).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RecordId {
    Number(i64),
    Text(String),
}

impl core::fmt::Display for RecordId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            RecordId::Number(n) => write!(f, "{n}"),
            RecordId::Text(s) => f.write_str(s),
        }
    }
}

impl FromStr for RecordId {
    type Err = DomainError;

    /// Numeric strings become `Number`, anything else non-empty becomes `Text`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(DomainError::invalid_id("identifier is empty"));
        }
        Ok(match s.parse::<i64>() {
            Ok(n) => RecordId::Number(n),
            Err(_) => RecordId::Text(s.to_string()),
        })
    }
}

/// Identifier of a user account.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(RecordId);

/// Identifier of a form (a permission-controlled page).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FormId(RecordId);

macro_rules! impl_record_id_newtype {
    ($t:ty, $name:literal) => {
        impl $t {
            pub fn number(id: i64) -> Self {
                Self(RecordId::Number(id))
            }

            pub fn text(id: impl Into<String>) -> Self {
                Self(RecordId::Text(id.into()))
            }

            pub fn as_record_id(&self) -> &RecordId {
                &self.0
            }
        }

        impl core::fmt::Display for $t {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                core::fmt::Display::fmt(&self.0, f)
            }
        }

        impl From<RecordId> for $t {
            fn from(value: RecordId) -> Self {
                Self(value)
            }
        }

        impl From<i64> for $t {
            fn from(value: i64) -> Self {
                Self(RecordId::Number(value))
            }
        }

        impl FromStr for $t {
            type Err = DomainError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let id = RecordId::from_str(s)
                    .map_err(|e| DomainError::invalid_id(format!("{}: {}", $name, e)))?;
                Ok(Self(id))
            }
        }
    };
}

impl_record_id_newtype!(UserId, "UserId");
impl_record_id_newtype!(FormId, "FormId");
