//! D-Bus adapter: the `org.freedesktop.Notifications` object on the session
//! bus, outbound signals and calls, and MCE requests on the system bus.
//!
//! Everything here only converts between zvariant values and the service's
//! types. Outbound traffic is spawned onto the runtime and never awaited by
//! the caller.

use std::collections::HashMap;

use call_descriptor::CallDescriptor;
use notification_store::{Hints, TypedValue};
use serde::Serialize;
use zbus::zvariant::{DynamicType, OwnedValue, Structure, StructureBuilder, Value};
use zbus::{Connection, MessageHeader, dbus_interface, fdo};

use crate::app::SharedState;
use crate::error::NotifyError;
use crate::events::{ACTION_INVOKED, NOTIFICATION_CLOSED};
use crate::service::{Bus, CloseReason, Device, NotifyRequest};

pub const OBJECT_PATH: &str = "/org/freedesktop/Notifications";
pub const INTERFACE: &str = "org.freedesktop.Notifications";

const MCE_SERVICE: &str = "com.nokia.mce";
const MCE_REQUEST_PATH: &str = "/com/nokia/mce/request";
const MCE_REQUEST_INTERFACE: &str = "com.nokia.mce.request";

pub struct NotificationsServer {
    state: SharedState,
}

impl NotificationsServer {
    pub fn new(state: SharedState) -> Self {
        Self { state }
    }
}

#[dbus_interface(name = "org.freedesktop.Notifications")]
impl NotificationsServer {
    #[dbus_interface(name = "GetCapabilities")]
    fn get_capabilities(&self) -> fdo::Result<Vec<String>> {
        self.state.capabilities().map_err(to_fdo)
    }

    #[allow(clippy::too_many_arguments)]
    #[dbus_interface(name = "Notify")]
    fn notify(
        &self,
        #[zbus(header)] header: MessageHeader<'_>,
        app_name: String,
        replaces_id: u32,
        app_icon: String,
        summary: String,
        body: String,
        actions: Vec<String>,
        hints: HashMap<String, OwnedValue>,
        expire_timeout: i32,
    ) -> fdo::Result<u32> {
        let sender = header
            .sender()
            .ok()
            .flatten()
            .map(ToString::to_string)
            .unwrap_or_default();
        tracing::debug!(app = %app_name, replaces_id, sender = %sender, "Notify");

        let request = NotifyRequest {
            app_name,
            replaces_id,
            icon: app_icon,
            summary,
            body,
            actions,
            hints: typed_hints(&hints),
            timeout: expire_timeout,
            sender,
        };
        self.state.notify(request).map_err(to_fdo)
    }

    #[dbus_interface(name = "CloseNotification")]
    fn close_notification(&self, id: u32) -> fdo::Result<()> {
        self.state.close(id, CloseReason::Closed).map_err(to_fdo)
    }

    #[dbus_interface(name = "GetServerInformation")]
    fn get_server_information(&self) -> fdo::Result<(String, String, String)> {
        self.state.server_info().map_err(to_fdo)
    }

    #[dbus_interface(name = "SystemNoteInfoprint")]
    fn system_note_infoprint(&self, message: String) -> fdo::Result<u32> {
        self.state.system_note_infoprint(&message).map_err(to_fdo)
    }

    #[dbus_interface(name = "SystemNoteDialog")]
    fn system_note_dialog(
        &self,
        message: String,
        dialog_type: u32,
        label: String,
    ) -> fdo::Result<u32> {
        self.state
            .system_note_dialog(&message, dialog_type, &label)
            .map_err(to_fdo)
    }
}

fn to_fdo(e: NotifyError) -> fdo::Error {
    match e {
        NotifyError::NotFound(_) | NotifyError::InvalidDialogType(_) => {
            fdo::Error::InvalidArgs(e.to_string())
        }
        other => fdo::Error::Failed(other.to_string()),
    }
}

pub fn typed_hints(hints: &HashMap<String, OwnedValue>) -> Hints {
    hints
        .iter()
        .filter_map(|(key, value)| Some((key.clone(), typed_hint(key, value)?)))
        .collect()
}

/// Hints of types the daemon cannot store (arrays, image data) are dropped.
pub fn typed_hint(key: &str, value: &Value<'_>) -> Option<TypedValue> {
    let typed = match value {
        Value::Str(s) => TypedValue::String(s.to_string()),
        Value::I32(v) => TypedValue::Int32(*v),
        Value::I16(v) => TypedValue::Int32(i32::from(*v)),
        Value::U16(v) => TypedValue::Int32(i32::from(*v)),
        Value::I64(v) => TypedValue::Int64(*v),
        Value::U32(v) => TypedValue::Int64(i64::from(*v)),
        Value::U8(v) => TypedValue::Byte(*v),
        Value::Bool(b) => TypedValue::Byte(u8::from(*b)),
        Value::F64(v) => TypedValue::Float(*v),
        Value::Value(inner) => return typed_hint(key, inner),
        other => {
            tracing::debug!(hint = key, signature = %other.value_signature(), "Ignoring hint of unsupported type");
            return None;
        }
    };
    Some(typed)
}

fn to_value(arg: &TypedValue) -> Option<Value<'static>> {
    match arg {
        TypedValue::None => None,
        TypedValue::String(s) => Some(Value::from(s.clone())),
        TypedValue::Int32(v) => Some(Value::I32(*v)),
        TypedValue::Int64(v) => Some(Value::I64(*v)),
        TypedValue::Float(v) => Some(Value::F64(*v)),
        TypedValue::Byte(v) => Some(Value::U8(*v)),
    }
}

/// Message body for a descriptor's literal arguments; `None` means no body.
pub fn call_arguments(args: &[TypedValue]) -> Option<Structure<'static>> {
    let fields: Vec<Value<'static>> = args.iter().filter_map(to_value).collect();
    if fields.is_empty() {
        return None;
    }
    let builder = fields
        .into_iter()
        .fold(StructureBuilder::new(), |builder, field| builder.append_field(field));
    Some(builder.build())
}

struct Target {
    destination: String,
    path: String,
    interface: String,
    member: String,
}

fn spawn_call<B>(conn: &Connection, target: Target, body: B)
where
    B: Serialize + DynamicType + Send + Sync + 'static,
{
    let conn = conn.clone();
    tokio::spawn(async move {
        let result = conn
            .call_method(
                Some(target.destination.as_str()),
                target.path.as_str(),
                Some(target.interface.as_str()),
                target.member.as_str(),
                &body,
            )
            .await;
        match result {
            Ok(_) => tracing::debug!(
                destination = %target.destination,
                member = %target.member,
                "Outbound call delivered"
            ),
            Err(e) => tracing::warn!(
                destination = %target.destination,
                member = %target.member,
                "Outbound call failed: {e}"
            ),
        }
    });
}

/// Session bus side of the service's outbound traffic.
pub struct DbusBus {
    conn: Connection,
}

impl DbusBus {
    pub fn new(conn: Connection) -> Self {
        Self { conn }
    }

    fn emit<B>(&self, destination: &str, signal: &'static str, body: B)
    where
        B: Serialize + DynamicType + Send + Sync + 'static,
    {
        let conn = self.conn.clone();
        let destination = (!destination.is_empty()).then(|| destination.to_string());
        tokio::spawn(async move {
            let result = conn
                .emit_signal(destination.as_deref(), OBJECT_PATH, INTERFACE, signal, &body)
                .await;
            if let Err(e) = result {
                tracing::warn!(signal, destination = ?destination, "Failed to emit signal: {e}");
            }
        });
    }
}

impl Bus for DbusBus {
    fn notification_closed(&self, destination: &str, id: u32, reason: CloseReason) {
        self.emit(destination, NOTIFICATION_CLOSED, (id, reason.code()));
    }

    fn action_invoked(&self, destination: &str, id: u32, action_id: &str) {
        self.emit(destination, ACTION_INVOKED, (id, action_id.to_string()));
    }

    fn call(&self, call: &CallDescriptor) {
        let target = Target {
            destination: call.service.clone(),
            path: call.path.clone(),
            interface: call.interface.clone(),
            member: call.member.clone(),
        };
        match call_arguments(&call.args) {
            Some(body) => spawn_call(&self.conn, target, body),
            None => spawn_call(&self.conn, target, ()),
        }
    }
}

/// LED and display requests to MCE on the system bus.
pub struct MceDevice {
    conn: Connection,
}

impl MceDevice {
    pub fn new(conn: Connection) -> Self {
        Self { conn }
    }

    fn request<B>(&self, method: &str, body: B)
    where
        B: Serialize + DynamicType + Send + Sync + 'static,
    {
        let target = Target {
            destination: MCE_SERVICE.to_string(),
            path: MCE_REQUEST_PATH.to_string(),
            interface: MCE_REQUEST_INTERFACE.to_string(),
            member: method.to_string(),
        };
        spawn_call(&self.conn, target, body);
    }
}

impl Device for MceDevice {
    fn activate_led(&self, pattern: &str) {
        self.request("req_led_pattern_activate", pattern.to_string());
    }

    fn deactivate_led(&self, pattern: &str) {
        self.request("req_led_pattern_deactivate", pattern.to_string());
    }

    fn wake_display(&self) {
        self.request("req_display_state_on", ());
    }
}
