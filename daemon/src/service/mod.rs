//! The notification service: registry, allocator, store shadowing and the
//! presentation pipeline behind one `&mut self` API.

mod ports;


use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use call_descriptor::CallDescriptor;
use chrono::Utc;
use notification_store::hints::keys;
use notification_store::{Action, Database, DbError, Hints, Notification, TypedValue};
use tokio::sync::broadcast;

use crate::catalog::CategoryCatalog;
use crate::error::NotifyError;
use crate::events::RegistryEvent;
use crate::grouping::{Activation, GroupKey};
use crate::presentation::view::{DIALOG_CATEGORY, INFOPRINT_CATEGORY};
use crate::presentation::{Context, Effect, PresentationController, PreviewResponse, SwitcherResponse};
use crate::registry::{IdAllocator, Registry};

pub use ports::{
    ActivationGuard, AlwaysAllow, Bus, CloseReason, Device, NoDevice, Shell, TracingShell,
};

pub const SERVER_NAME: &str = "Hildon Desktop Notification Manager";
pub const SERVER_VENDOR: &str = "Nokia";
pub const CAPABILITIES: [&str; 3] = ["body", "body-markup", "icon-static"];

const SYSTEM_APP_NAME: &str = "hildon-desktop";
const INFOPRINT_ICON: &str = "qgn_note_infoprint";
const INFOPRINT_TIMEOUT_MS: i32 = 3000;
const DIALOG_ICONS: [&str; 5] = [
    "qgn_note_gene_syswarning",
    "qgn_note_gene_syserror",
    "qgn_note_info",
    "qgn_note_gene_wait",
    "qgn_note_gene_wait",
];
const DEFAULT_ACTION: &str = "default";

/// A `Notify` call as received over IPC.
#[derive(Debug, Clone, Default)]
pub struct NotifyRequest {
    pub app_name: String,
    pub replaces_id: u32,
    pub icon: String,
    pub summary: String,
    pub body: String,
    /// Flat `[id, label, id, label, ...]` list.
    pub actions: Vec<String>,
    pub hints: Hints,
    /// Milliseconds; negative values mean "server default" which is never.
    pub timeout: i32,
    /// Unique bus name of the caller.
    pub sender: String,
}

#[derive(Clone)]
pub struct Ports {
    pub bus: Arc<dyn Bus>,
    pub device: Arc<dyn Device>,
    pub shell: Arc<dyn Shell>,
    pub guard: Arc<dyn ActivationGuard>,
}

impl Ports {
    pub fn new(bus: Arc<dyn Bus>, device: Arc<dyn Device>) -> Self {
        Self {
            bus,
            device,
            shell: Arc::new(TracingShell),
            guard: Arc::new(AlwaysAllow),
        }
    }
}

pub struct NotificationService {
    registry: Registry,
    allocator: IdAllocator,
    store: Option<Database>,
    catalog: CategoryCatalog,
    controller: PresentationController,
    ports: Ports,
    events: broadcast::Sender<RegistryEvent>,
}

impl NotificationService {
    pub fn new(
        store: Option<Database>,
        catalog: CategoryCatalog,
        controller: PresentationController,
        ports: Ports,
        events: broadcast::Sender<RegistryEvent>,
    ) -> Self {
        Self {
            registry: Registry::new(),
            allocator: IdAllocator::new(),
            store,
            catalog,
            controller,
            ports,
            events,
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn catalog(&self) -> &CategoryCatalog {
        &self.catalog
    }

    pub fn controller(&self) -> &PresentationController {
        &self.controller
    }

    pub fn store(&self) -> Option<&Database> {
        self.store.as_ref()
    }

    pub fn capabilities(&self) -> Vec<String> {
        CAPABILITIES.iter().map(|c| c.to_string()).collect()
    }

    pub fn server_info(&self) -> (String, String, String) {
        (
            SERVER_NAME.to_string(),
            SERVER_VENDOR.to_string(),
            env!("CARGO_PKG_VERSION").to_string(),
        )
    }

    /// Create or replace a notification and return its id.
    pub fn notify(&mut self, request: NotifyRequest) -> Result<u32, NotifyError> {
        let NotifyRequest {
            app_name,
            replaces_id,
            icon,
            summary,
            body,
            actions,
            hints,
            timeout,
            sender,
        } = request;

        let id = if replaces_id != 0 && self.registry.contains(replaces_id) {
            replaces_id
        } else {
            if replaces_id != 0 {
                tracing::warn!(id = replaces_id, "Replace target is not live, allocating a new id");
            }
            self.allocate_id()?
        };

        let notification = Notification {
            id,
            app_name,
            icon,
            summary,
            body,
            actions: pair_actions(id, actions),
            hints,
            timeout: timeout.max(0),
            destination: sender,
            created_at: Utc::now(),
        };

        let previous = self.registry.insert(notification.clone());
        self.shadow(previous.as_ref(), &notification);

        let ctx = Context {
            registry: &self.registry,
            catalog: &self.catalog,
        };
        let effects = if previous.is_some() {
            tracing::debug!(id, "Notification updated");
            self.emit(RegistryEvent::Updated { id });
            self.controller.updated(id, ctx)
        } else {
            tracing::debug!(id, app = %notification.app_name, "Notification arrived");
            self.emit(RegistryEvent::Arrived {
                id,
                replayed: false,
            });
            self.controller.arrived(&notification, false, ctx)
        };
        self.apply(effects);
        Ok(id)
    }

    /// Close a live notification and tell its sender.
    pub fn close(&mut self, id: u32, reason: CloseReason) -> Result<(), NotifyError> {
        let effects = self.remove(id, reason)?;
        self.apply(effects);
        Ok(())
    }

    pub fn close_all(&mut self) -> usize {
        let mut closed = 0;
        for id in self.registry.ids() {
            if self.close(id, CloseReason::Closed).is_ok() {
                closed += 1;
            }
        }
        closed
    }

    /// Called by the auto-close timer.
    pub fn expire(&mut self, id: u32) -> Result<(), NotifyError> {
        self.close(id, CloseReason::Expired)
    }

    /// How long until `id` closes by itself. Persistent notifications and a
    /// zero timeout never expire.
    pub fn auto_close_after(&self, id: u32) -> Option<Duration> {
        let n = self.registry.get(id)?;
        if n.timeout <= 0 || n.is_persistent() {
            return None;
        }
        Some(Duration::from_millis(u64::from(n.timeout.unsigned_abs())))
    }

    pub fn system_note_infoprint(&mut self, message: &str) -> Result<u32, NotifyError> {
        let hints = Hints::from([(keys::CATEGORY.to_string(), TypedValue::from(INFOPRINT_CATEGORY))]);
        self.notify(NotifyRequest {
            app_name: SYSTEM_APP_NAME.into(),
            icon: INFOPRINT_ICON.into(),
            summary: "System Note Infoprint".into(),
            body: message.to_string(),
            hints,
            timeout: INFOPRINT_TIMEOUT_MS,
            ..NotifyRequest::default()
        })
    }

    pub fn system_note_dialog(
        &mut self,
        message: &str,
        dialog_type: u32,
        label: &str,
    ) -> Result<u32, NotifyError> {
        let icon = usize::try_from(dialog_type)
            .ok()
            .and_then(|t| DIALOG_ICONS.get(t))
            .ok_or(NotifyError::InvalidDialogType(dialog_type))?;

        let code = i32::try_from(dialog_type)
            .map_err(|_| NotifyError::InvalidDialogType(dialog_type))?;

        let mut hints = Hints::from([(keys::CATEGORY.to_string(), TypedValue::from(DIALOG_CATEGORY))]);
        hints.insert(keys::DIALOG_TYPE.to_string(), TypedValue::Int32(code));

        let actions = if label.is_empty() {
            Vec::new()
        } else {
            vec![DEFAULT_ACTION.to_string(), label.to_string()]
        };

        self.notify(NotifyRequest {
            app_name: SYSTEM_APP_NAME.into(),
            icon: (*icon).to_string(),
            summary: "System Note Dialog".into(),
            body: message.to_string(),
            actions,
            hints,
            timeout: 0,
            ..NotifyRequest::default()
        })
    }

    /// The button of a system dialog was pressed.
    pub fn system_dialog_response(&mut self, id: u32) -> Result<(), NotifyError> {
        self.invoke_action(id, DEFAULT_ACTION)?;
        self.close(id, CloseReason::Dismissed)
    }

    /// Run the `dbus-callback-<action>` hint, if any, then signal the sender.
    pub fn invoke_action(&mut self, id: u32, action_id: &str) -> Result<(), NotifyError> {
        let n = self.registry.get(id).ok_or(NotifyError::NotFound(id))?;

        let hint = format!("{}{action_id}", keys::DBUS_CALLBACK_PREFIX);
        if let Some(desc) = n.hint_str(&hint) {
            match CallDescriptor::parse(desc) {
                Ok(call) => self.ports.bus.call(&call),
                Err(e) => tracing::warn!(id, action = action_id, "Ignoring bad callback hint: {e}"),
            }
        }

        tracing::debug!(id, action = action_id, "Action invoked");
        self.ports.bus.action_invoked(&n.destination, id, action_id);
        Ok(())
    }

    /// Load persistent notifications from the store into the switcher.
    pub fn replay_persistent(&mut self) -> Result<usize, NotifyError> {
        let Some(store) = &self.store else {
            return Ok(0);
        };
        let loaded = store.load_notifications()?;

        let mut replayed = 0;
        for notification in loaded {
            let id = notification.id;
            if self.registry.contains(id) {
                tracing::warn!(id, "Stored notification already live, skipping replay");
                continue;
            }
            self.registry.insert(notification.clone());
            self.emit(RegistryEvent::Arrived { id, replayed: true });

            let ctx = Context {
                registry: &self.registry,
                catalog: &self.catalog,
            };
            let effects = self.controller.arrived(&notification, true, ctx);
            self.apply(effects);
            replayed += 1;
        }
        tracing::info!(count = replayed, "Persistent notifications replayed");
        Ok(replayed)
    }

    pub fn preview_response(&mut self, response: PreviewResponse) {
        let may_activate = response == PreviewResponse::Ok && self.ports.guard.may_activate();
        let ctx = Context {
            registry: &self.registry,
            catalog: &self.catalog,
        };
        let effects = self.controller.preview_response(response, may_activate, ctx);
        self.apply(effects);
    }

    pub fn switcher_response(&mut self, key: &GroupKey, response: SwitcherResponse) {
        let ctx = Context {
            registry: &self.registry,
            catalog: &self.catalog,
        };
        let effects = self.controller.switcher_response(key, response, ctx);
        self.apply(effects);
    }

    fn allocate_id(&self) -> Result<u32, NotifyError> {
        let registry = &self.registry;
        let store = self.store.as_ref();
        self.allocator.next_id(|id| {
            registry.contains(id)
                || store.is_some_and(|db| {
                    db.notification_exists(id).unwrap_or_else(|e| {
                        tracing::warn!(id, "Id lookup in store failed: {e}");
                        false
                    })
                })
        })
    }

    fn remove(&mut self, id: u32, reason: CloseReason) -> Result<Vec<Effect>, NotifyError> {
        let n = self.registry.remove(id).ok_or(NotifyError::NotFound(id))?;
        if n.is_persistent() {
            self.unshadow(id);
        }

        tracing::debug!(id, ?reason, "Notification closed");
        self.ports.bus.notification_closed(&n.destination, id, reason);
        self.emit(RegistryEvent::Closed { id, reason });

        let ctx = Context {
            registry: &self.registry,
            catalog: &self.catalog,
        };
        Ok(self.controller.closed(id, ctx))
    }

    /// Keep the store's copy in line with the persistent flag.
    fn shadow(&self, previous: Option<&Notification>, current: &Notification) {
        let Some(store) = &self.store else {
            return;
        };
        let was_stored = previous.is_some_and(Notification::is_persistent);

        let result = match (was_stored, current.is_persistent()) {
            (false, true) => store.insert_notification(current),
            (true, true) => match store.update_notification(current) {
                Err(DbError::NotFound(_)) => store.insert_notification(current),
                other => other,
            },
            (true, false) => store.delete_notification(current.id).map(|_| ()),
            (false, false) => Ok(()),
        };
        if let Err(e) = result {
            tracing::error!(id = current.id, "Failed to persist notification: {e}");
        }
    }

    fn unshadow(&self, id: u32) {
        if let Some(store) = &self.store {
            if let Err(e) = store.delete_notification(id) {
                tracing::error!(id, "Failed to delete stored notification: {e}");
            }
        }
    }

    fn emit(&self, event: RegistryEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    fn apply(&mut self, effects: Vec<Effect>) {
        let mut queue = VecDeque::from(effects);
        while let Some(effect) = queue.pop_front() {
            match effect {
                Effect::ShowPreview(view) => self.ports.shell.show_preview(&view),
                Effect::UpdatePreview(view) => self.ports.shell.update_preview(&view),
                Effect::DestroyPreview => self.ports.shell.destroy_preview(),
                Effect::ShowSwitcher(view) => self.ports.shell.show_switcher(&view),
                Effect::UpdateSwitcher(view) => self.ports.shell.update_switcher(&view),
                Effect::DestroySwitcher(key) => self.ports.shell.destroy_switcher(&key),
                Effect::ShowSystemNote(note) => self.ports.shell.show_system_note(&note),
                Effect::WakeDisplay => self.ports.device.wake_display(),
                Effect::ActivateLed(pattern) => self.ports.device.activate_led(&pattern),
                Effect::DeactivateLed(pattern) => self.ports.device.deactivate_led(&pattern),
                Effect::Activate(plan) => self.dispatch(plan),
                Effect::Close(ids) => {
                    for id in ids {
                        match self.remove(id, CloseReason::Dismissed) {
                            Ok(more) => queue.extend(more),
                            Err(e) => tracing::debug!(id, "Skipping close: {e}"),
                        }
                    }
                }
            }
        }
    }

    fn dispatch(&mut self, plan: Activation) {
        match plan {
            Activation::DefaultAction(id) => self.invoke_default(id),
            Activation::AccountCall { call, .. } | Activation::Callback(call) => {
                self.ports.bus.call(&call)
            }
            Activation::DefaultActions(ids) => {
                for id in ids {
                    self.invoke_default(id);
                }
            }
        }
    }

    fn invoke_default(&mut self, id: u32) {
        if let Err(e) = self.invoke_action(id, DEFAULT_ACTION) {
            tracing::warn!(id, "Default action failed: {e}");
        }
    }
}

/// Pair a flat `[id, label, ...]` list. A trailing id without a label is dropped.
fn pair_actions(id: u32, flat: Vec<String>) -> Vec<Action> {
    if flat.len() % 2 != 0 {
        tracing::warn!(id, action = ?flat.last(), "Dropping action without a label");
    }
    let mut iter = flat.into_iter();
    let mut actions = Vec::new();
    while let (Some(action_id), Some(label)) = (iter.next(), iter.next()) {
        actions.push(Action::new(action_id, label));
    }
    actions
}
