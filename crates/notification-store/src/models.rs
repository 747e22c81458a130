use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::hints::{Hints, TypedValue, keys};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Action {
    pub id: String,
    pub label: String,
}

impl Action {
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
        }
    }
}

/// One notification as submitted over IPC.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub id: u32,
    pub app_name: String,
    pub icon: String,
    pub summary: String,
    pub body: String,
    pub actions: Vec<Action>,
    pub hints: Hints,
    /// Milliseconds; 0 never expires.
    pub timeout: i32,
    /// Bus name that receives `NotificationClosed` / `ActionInvoked`.
    pub destination: String,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    pub fn hint(&self, key: &str) -> Option<&TypedValue> {
        self.hints.get(key)
    }

    pub fn hint_str(&self, key: &str) -> Option<&str> {
        self.hint(key).and_then(TypedValue::as_str)
    }

    pub fn hint_flag(&self, key: &str) -> bool {
        self.hint(key).is_some_and(TypedValue::is_truthy)
    }

    pub fn category(&self) -> Option<&str> {
        self.hint_str(keys::CATEGORY).filter(|c| !c.is_empty())
    }

    /// `persistent` hint, unless `no-notification-window` is also set.
    pub fn is_persistent(&self) -> bool {
        !self.hint_flag(keys::NO_NOTIFICATION_WINDOW) && self.hint_flag(keys::PERSISTENT)
    }

    /// Units this notification stands for, within `1..=i32::MAX`.
    pub fn amount(&self) -> i64 {
        self.hint(keys::AMOUNT)
            .and_then(TypedValue::as_i64)
            .unwrap_or(1)
            .clamp(1, i64::from(i32::MAX))
    }

    pub fn action_label(&self, action_id: &str) -> Option<&str> {
        self.actions
            .iter()
            .find(|a| a.id == action_id)
            .map(|a| a.label.as_str())
    }
}
