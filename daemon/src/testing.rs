//! Builders and recording fakes shared by the unit tests.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use call_descriptor::CallDescriptor;
use chrono::{TimeZone, Utc};
use notification_store::hints::keys;
use notification_store::{Action, Database, Hints, Notification, TypedValue};
use tokio::sync::broadcast;

use crate::catalog::{CategoryCatalog, Untranslated};
use crate::events::RegistryEvent;
use crate::grouping::GroupKey;
use crate::presentation::{GroupView, PresentationController, SystemNote};
use crate::service::{
    ActivationGuard, Bus, CloseReason, Device, NotificationService, NotifyRequest, Ports, Shell,
};

pub struct NoteBuilder {
    note: Notification,
}

impl NoteBuilder {
    /// Creation times increase with the id so "newest member" is predictable.
    pub fn new(id: u32) -> Self {
        Self {
            note: Notification {
                id,
                app_name: "Test".into(),
                icon: format!("icon-{id}"),
                summary: format!("summary {id}"),
                body: format!("body {id}"),
                actions: Vec::new(),
                hints: Hints::new(),
                timeout: 0,
                destination: ":1.42".into(),
                created_at: Utc.timestamp_opt(1_700_000_000 + i64::from(id), 0).unwrap(),
            },
        }
    }

    pub fn category(self, category: &str) -> Self {
        self.hint(keys::CATEGORY, category)
    }

    pub fn hint(mut self, key: &str, value: impl Into<TypedValue>) -> Self {
        self.note.hints.insert(key.to_string(), value.into());
        self
    }

    pub fn persistent(self) -> Self {
        self.hint(keys::PERSISTENT, TypedValue::Byte(1))
    }

    pub fn action(mut self, id: &str, label: &str) -> Self {
        self.note.actions.push(Action::new(id, label));
        self
    }

    pub fn build(self) -> Notification {
        self.note
    }
}

pub const CHAT_CATALOG: &str = r#"{
    "chat.message": {
        "split-in-threads": "thread",
        "led-pattern": "PatternCommunicationIM",
        "dbus-call": "org.example.Chat /org/example/Chat org.example.Chat OpenThread"
    },
    "email.arrived": {
        "group": "mail",
        "title-text": "New e-mail",
        "account-hint": "email-account",
        "account-call": "org.example.Mail /org/example/Mail org.example.Mail OpenAccount string:\"inbox\"",
        "led-pattern": "PatternCommunicationEmail"
    },
    "battery.charging": { "no-window": true },
    "broken": { "dbus-call": "org.example.Broken" }
}"#;

pub fn chat_catalog() -> CategoryCatalog {
    CategoryCatalog::from_json_str(CHAT_CATALOG, &Untranslated).unwrap()
}

/// Everything the service did to the outside world, in order.
#[derive(Debug, Clone, PartialEq)]
pub enum Record {
    Closed {
        destination: String,
        id: u32,
        reason: CloseReason,
    },
    ActionInvoked {
        destination: String,
        id: u32,
        action: String,
    },
    Call(CallDescriptor),
    LedOn(String),
    LedOff(String),
    Wake,
    ShowPreview(GroupView),
    UpdatePreview(GroupView),
    DestroyPreview,
    ShowSwitcher(GroupView),
    UpdateSwitcher(GroupView),
    DestroySwitcher(GroupKey),
    SystemNote(SystemNote),
}

/// Implements every port and records what it was asked to do.
pub struct Recorder {
    records: Mutex<Vec<Record>>,
    allow: AtomicBool,
}

impl Recorder {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            records: Mutex::new(Vec::new()),
            allow: AtomicBool::new(true),
        })
    }

    pub fn ports(self: &Arc<Self>) -> Ports {
        Ports {
            bus: self.clone(),
            device: self.clone(),
            shell: self.clone(),
            guard: self.clone(),
        }
    }

    pub fn deny_activation(&self) {
        self.allow.store(false, Ordering::SeqCst);
    }

    pub fn records(&self) -> Vec<Record> {
        self.records.lock().unwrap().clone()
    }

    pub fn clear(&self) {
        self.records.lock().unwrap().clear();
    }

    pub fn closed(&self) -> Vec<(u32, CloseReason)> {
        self.records()
            .into_iter()
            .filter_map(|r| match r {
                Record::Closed { id, reason, .. } => Some((id, reason)),
                _ => None,
            })
            .collect()
    }

    pub fn calls(&self) -> Vec<CallDescriptor> {
        self.records()
            .into_iter()
            .filter_map(|r| match r {
                Record::Call(call) => Some(call),
                _ => None,
            })
            .collect()
    }

    pub fn actions(&self) -> Vec<(u32, String)> {
        self.records()
            .into_iter()
            .filter_map(|r| match r {
                Record::ActionInvoked { id, action, .. } => Some((id, action)),
                _ => None,
            })
            .collect()
    }

    fn push(&self, record: Record) {
        self.records.lock().unwrap().push(record);
    }
}

impl Bus for Recorder {
    fn notification_closed(&self, destination: &str, id: u32, reason: CloseReason) {
        self.push(Record::Closed {
            destination: destination.to_string(),
            id,
            reason,
        });
    }

    fn action_invoked(&self, destination: &str, id: u32, action_id: &str) {
        self.push(Record::ActionInvoked {
            destination: destination.to_string(),
            id,
            action: action_id.to_string(),
        });
    }

    fn call(&self, call: &CallDescriptor) {
        self.push(Record::Call(call.clone()));
    }
}

impl Device for Recorder {
    fn activate_led(&self, pattern: &str) {
        self.push(Record::LedOn(pattern.to_string()));
    }

    fn deactivate_led(&self, pattern: &str) {
        self.push(Record::LedOff(pattern.to_string()));
    }

    fn wake_display(&self) {
        self.push(Record::Wake);
    }
}

impl Shell for Recorder {
    fn show_preview(&self, view: &GroupView) {
        self.push(Record::ShowPreview(view.clone()));
    }

    fn update_preview(&self, view: &GroupView) {
        self.push(Record::UpdatePreview(view.clone()));
    }

    fn destroy_preview(&self) {
        self.push(Record::DestroyPreview);
    }

    fn show_switcher(&self, view: &GroupView) {
        self.push(Record::ShowSwitcher(view.clone()));
    }

    fn update_switcher(&self, view: &GroupView) {
        self.push(Record::UpdateSwitcher(view.clone()));
    }

    fn destroy_switcher(&self, key: &GroupKey) {
        self.push(Record::DestroySwitcher(key.clone()));
    }

    fn show_system_note(&self, note: &SystemNote) {
        self.push(Record::SystemNote(note.clone()));
    }
}

impl ActivationGuard for Recorder {
    fn may_activate(&self) -> bool {
        self.allow.load(Ordering::SeqCst)
    }
}

/// A service wired to a recorder. The event receiver is returned so tests can
/// watch registry events.
pub fn service_with(
    store: Option<Database>,
    catalog: CategoryCatalog,
) -> (
    NotificationService,
    Arc<Recorder>,
    broadcast::Receiver<RegistryEvent>,
) {
    let recorder = Recorder::new();
    let (tx, rx) = broadcast::channel(64);
    let service = NotificationService::new(
        store,
        catalog,
        PresentationController::new(true),
        recorder.ports(),
        tx,
    );
    (service, recorder, rx)
}

/// `Notify` arguments with the usual defaults.
pub fn request(summary: &str) -> NotifyRequest {
    NotifyRequest {
        app_name: "Mail".into(),
        icon: "qgn_mail".into(),
        summary: summary.to_string(),
        body: "From Bob".into(),
        sender: ":1.42".into(),
        ..NotifyRequest::default()
    }
}
