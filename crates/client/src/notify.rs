//! Side-effect seams owned by the host UI: toast notifications and routing.

use std::collections::VecDeque;
use std::sync::{PoisonError, RwLock};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationLevel {
    Success,
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub level: NotificationLevel,
    pub message: String,
    pub at: DateTime<Utc>,
}

impl Notification {
    pub fn new(level: NotificationLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
            at: Utc::now(),
        }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self::new(NotificationLevel::Success, message)
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::new(NotificationLevel::Info, message)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(NotificationLevel::Warning, message)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(NotificationLevel::Error, message)
    }
}

/// Delivers user-facing notifications.
pub trait Notifier: Send + Sync {
    fn notify(&self, notification: Notification);
}

/// Writes notifications to the log. Used by the CLI host.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, notification: Notification) {
        match notification.level {
            NotificationLevel::Error => {
                tracing::error!(kind = "notification", "{}", notification.message)
            }
            NotificationLevel::Warning => {
                tracing::warn!(kind = "notification", "{}", notification.message)
            }
            NotificationLevel::Success | NotificationLevel::Info => {
                tracing::info!(kind = "notification", "{}", notification.message)
            }
        }
    }
}

/// Client-side router.
pub trait Navigator: Send + Sync {
    fn navigate(&self, path: &str);
    fn current_route(&self) -> String;
}

/// Routes kept by [`HistoryNavigator`]; older entries are dropped.
pub const HISTORY_LIMIT: usize = 32;

/// Keeps the most recent routes in memory.
#[derive(Debug)]
pub struct HistoryNavigator {
    history: RwLock<VecDeque<String>>,
}

impl HistoryNavigator {
    pub fn new(initial: impl Into<String>) -> Self {
        Self {
            history: RwLock::new(VecDeque::from([initial.into()])),
        }
    }

    /// Oldest first, at most [`HISTORY_LIMIT`] entries.
    pub fn history(&self) -> Vec<String> {
        self.history
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .cloned()
            .collect()
    }
}

impl Default for HistoryNavigator {
    fn default() -> Self {
        Self::new(crate::routes::HOME)
    }
}

impl Navigator for HistoryNavigator {
    fn navigate(&self, path: &str) {
        tracing::debug!(path, "navigate");
        let mut history = self.history.write().unwrap_or_else(PoisonError::into_inner);
        if history.len() == HISTORY_LIMIT {
            history.pop_front();
        }
        history.push_back(path.to_string());
    }

    fn current_route(&self) -> String {
        self.history
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .back()
            .cloned()
            .unwrap_or_else(|| crate::routes::HOME.to_string())
    }
}
