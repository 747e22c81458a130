//! Registry event constants and payloads.
//!
//! Events are broadcast by the service after each registry change. The D-Bus
//! adapter has its own signals; these are for in-process observers (logging,
//! tests).

use serde::Serialize;

use crate::service::CloseReason;

// -- Outbound D-Bus signal names --

pub const NOTIFICATION_CLOSED: &str = "NotificationClosed";
pub const ACTION_INVOKED: &str = "ActionInvoked";

/// Capacity of the registry event channel.
pub const EVENT_CHANNEL_CAPACITY: usize = 2048;

// -- Payload types --

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum RegistryEvent {
    Arrived { id: u32, replayed: bool },
    Updated { id: u32 },
    Closed { id: u32, reason: CloseReason },
}

impl RegistryEvent {
    pub fn id(&self) -> u32 {
        match self {
            Self::Arrived { id, .. } | Self::Updated { id } | Self::Closed { id, .. } => *id,
        }
    }
}
