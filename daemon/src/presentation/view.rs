//! Serializable snapshots handed to the shell.

use notification_store::Notification;
use notification_store::hints::keys;
use serde::Serialize;

use crate::catalog::CategoryCatalog;
use crate::grouping::{self, GroupKey, Lane, NotificationGroup};
use crate::registry::Registry;

pub const INFOPRINT_CATEGORY: &str = "system.note.infoprint";
pub const DIALOG_CATEGORY: &str = "system.note.dialog";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupView {
    pub key: GroupKey,
    pub lane: Lane,
    pub title: String,
    pub secondary: String,
    pub icon: String,
    pub amount: i64,
    pub members: Vec<u32>,
}

impl GroupView {
    /// Catalog texts win; otherwise the newest member speaks for the group.
    pub fn build(group: &NotificationGroup, registry: &Registry, catalog: &CategoryCatalog) -> Self {
        let info = group.info(catalog);
        let latest = group
            .members()
            .iter()
            .filter_map(|id| registry.get(*id))
            .max_by_key(|n| (n.created_at, n.id));

        Self {
            key: group.key().clone(),
            lane: group.lane(),
            title: pick(info.and_then(|i| i.title_text.as_deref()), latest.map(|n| n.summary.as_str())),
            secondary: pick(
                info.and_then(|i| i.secondary_text.as_deref()),
                latest.map(|n| n.body.as_str()),
            ),
            icon: pick(info.and_then(|i| i.icon.as_deref()), latest.map(|n| n.icon.as_str())),
            amount: grouping::amount(group, registry),
            members: group.member_ids(),
        }
    }
}

fn pick(configured: Option<&str>, fallback: Option<&str>) -> String {
    configured.or(fallback).unwrap_or_default().to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SystemNoteKind {
    Infoprint,
    Dialog { dialog_type: i64 },
}

/// A system banner or modal note, shown outside the preview/switcher flow.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SystemNote {
    pub id: u32,
    pub kind: SystemNoteKind,
    pub icon: String,
    pub body: String,
    pub button_label: Option<String>,
}

impl SystemNote {
    pub fn from_notification(n: &Notification) -> Option<Self> {
        let kind = match n.category()? {
            INFOPRINT_CATEGORY => SystemNoteKind::Infoprint,
            DIALOG_CATEGORY => SystemNoteKind::Dialog {
                dialog_type: n
                    .hint(keys::DIALOG_TYPE)
                    .and_then(|v| v.as_i64())
                    .unwrap_or(0),
            },
            _ => return None,
        };
        Some(Self {
            id: n.id,
            kind,
            icon: n.icon.clone(),
            body: n.body.clone(),
            button_label: n.action_label("default").map(str::to_string),
        })
    }
}
