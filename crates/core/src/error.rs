//! Domain error model.

use thiserror::Error;

pub type DomainResult<T> = Result<T, DomainError>;

/// Deterministic failures raised by the pure model (no IO).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("validation failed: {0}")]
    Validation(String),

    /// A permission edit on a form that is switched off.
    #[error("form '{form}' is inactive; enable it before editing rights")]
    FormInactive { form: String },

    /// A grant above the form's configured default.
    #[error("'{right}' right is not allowed on form '{form}'")]
    RightNotAllowed { right: String, form: String },

    #[error("invalid identifier: {0}")]
    InvalidId(String),
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn form_inactive(form: impl Into<String>) -> Self {
        Self::FormInactive { form: form.into() }
    }

    pub fn right_not_allowed(right: impl Into<String>, form: impl Into<String>) -> Self {
        Self::RightNotAllowed {
            right: right.into(),
            form: form.into(),
        }
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    /// True for edits refused by a form's configuration rather than bad input.
    pub fn is_policy_rejection(&self) -> bool {
        matches!(self, Self::FormInactive { .. } | Self::RightNotAllowed { .. })
    }
}
