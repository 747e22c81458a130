//! Outbound collaborators of the service.
//!
//! Every call is fire-and-forget: implementations log their own failures and
//! never report back into the service.

use call_descriptor::CallDescriptor;
use serde::Serialize;

use crate::presentation::{GroupView, SystemNote};
use crate::grouping::GroupKey;

/// `NotificationClosed` reason codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
#[repr(u32)]
pub enum CloseReason {
    Expired = 1,
    Dismissed = 2,
    Closed = 3,
    Undefined = 4,
}

impl CloseReason {
    pub fn code(self) -> u32 {
        self as u32
    }
}

/// Signals and method calls on the message bus.
pub trait Bus: Send + Sync {
    /// An empty `destination` broadcasts.
    fn notification_closed(&self, destination: &str, id: u32, reason: CloseReason);
    fn action_invoked(&self, destination: &str, id: u32, action_id: &str);
    fn call(&self, call: &CallDescriptor);
}

/// Hardware side effects.
pub trait Device: Send + Sync {
    fn activate_led(&self, pattern: &str);
    fn deactivate_led(&self, pattern: &str);
    fn wake_display(&self);
}

/// The windows drawing previews, switcher entries and system notes.
pub trait Shell: Send + Sync {
    fn show_preview(&self, view: &GroupView);
    fn update_preview(&self, view: &GroupView);
    fn destroy_preview(&self);
    fn show_switcher(&self, view: &GroupView);
    fn update_switcher(&self, view: &GroupView);
    fn destroy_switcher(&self, key: &GroupKey);
    fn show_system_note(&self, note: &SystemNote);
}

/// Consulted before a preview is activated (low-memory guard and the like).
pub trait ActivationGuard: Send + Sync {
    fn may_activate(&self) -> bool;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct AlwaysAllow;

impl ActivationGuard for AlwaysAllow {
    fn may_activate(&self) -> bool {
        true
    }
}

/// Logs what a window system would draw. Used when no shell is attached.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingShell;

impl Shell for TracingShell {
    fn show_preview(&self, view: &GroupView) {
        tracing::info!(group = %view.key, amount = view.amount, title = %view.title, "Preview shown");
    }

    fn update_preview(&self, view: &GroupView) {
        tracing::debug!(group = %view.key, amount = view.amount, "Preview updated");
    }

    fn destroy_preview(&self) {
        tracing::debug!("Preview destroyed");
    }

    fn show_switcher(&self, view: &GroupView) {
        tracing::info!(group = %view.key, amount = view.amount, title = %view.title, "Switcher entry shown");
    }

    fn update_switcher(&self, view: &GroupView) {
        tracing::debug!(group = %view.key, amount = view.amount, "Switcher entry updated");
    }

    fn destroy_switcher(&self, key: &GroupKey) {
        tracing::debug!(group = %key, "Switcher entry destroyed");
    }

    fn show_system_note(&self, note: &SystemNote) {
        tracing::info!(id = note.id, kind = ?note.kind, body = %note.body, "System note shown");
    }
}

/// Device without LEDs or a display to wake.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoDevice;

impl Device for NoDevice {
    fn activate_led(&self, pattern: &str) {
        tracing::debug!(pattern, "LED pattern on (no device)");
    }

    fn deactivate_led(&self, pattern: &str) {
        tracing::debug!(pattern, "LED pattern off (no device)");
    }

    fn wake_display(&self) {}
}
