//! Grouping engine: clusters live notifications by mapped category and thread.

use std::collections::{BTreeSet, HashMap};
use std::fmt;

use call_descriptor::CallDescriptor;
use notification_store::Notification;
use serde::Serialize;

use crate::catalog::{CategoryCatalog, CategoryInfo, CategoryPolicy};
use crate::registry::Registry;

/// Display bucket of a notification.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub enum GroupKey {
    Category {
        mapped: String,
        thread: Option<String>,
    },
    /// Uncategorized notifications are always alone.
    Single(u32),
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Category {
                mapped,
                thread: Some(thread),
            } => write!(f, "{mapped}#{thread}"),
            Self::Category {
                mapped,
                thread: None,
            } => f.write_str(mapped),
            Self::Single(id) => write!(f, "#{id}"),
        }
    }
}

/// Compute the group key for a notification.
pub fn group_key(notification: &Notification, catalog: &CategoryCatalog) -> GroupKey {
    let Some(category) = notification.category() else {
        return GroupKey::Single(notification.id);
    };
    if catalog.is_rejected(category) {
        return GroupKey::Single(notification.id);
    }

    match catalog.resolve(category) {
        Some(CategoryPolicy::Windowed(info)) => {
            let thread = info
                .split_in_threads
                .as_deref()
                .and_then(|hint| notification.hint_str(hint))
                .filter(|t| !t.is_empty())
                .map(str::to_string);
            GroupKey::Category {
                mapped: info.group.clone().unwrap_or_else(|| category.to_string()),
                thread,
            }
        }
        Some(CategoryPolicy::NoWindow) | None => GroupKey::Category {
            mapped: category.to_string(),
            thread: None,
        },
    }
}

/// Which presentation surface a group belongs to. A key may exist once per lane.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Lane {
    /// Waiting for, or showing in, the preview slot.
    Pending,
    Switcher,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationGroup {
    key: GroupKey,
    lane: Lane,
    /// Raw category of the first member, used for catalog lookups.
    category: Option<String>,
    members: BTreeSet<u32>,
}

impl NotificationGroup {
    pub fn key(&self) -> &GroupKey {
        &self.key
    }

    pub fn lane(&self) -> Lane {
        self.lane
    }

    pub fn category(&self) -> Option<&str> {
        self.category.as_deref()
    }

    pub fn members(&self) -> &BTreeSet<u32> {
        &self.members
    }

    pub fn member_ids(&self) -> Vec<u32> {
        self.members.iter().copied().collect()
    }

    pub fn contains(&self, id: u32) -> bool {
        self.members.contains(&id)
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn info<'a>(&self, catalog: &'a CategoryCatalog) -> Option<&'a CategoryInfo> {
        self.category.as_deref().and_then(|c| catalog.info(c))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Appended {
    Created,
    Joined,
    AlreadyMember,
    /// The id belongs to another group; nothing changed.
    OwnedElsewhere(Lane, GroupKey),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Detached {
    NotMember,
    Remaining(Lane, GroupKey),
    /// The group lost its last member and was removed from the index.
    Emptied(NotificationGroup),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Merged {
    Created,
    Joined,
}

/// Every live group, with a reverse index enforcing that an id belongs to at
/// most one group.
#[derive(Debug, Default)]
pub struct GroupIndex {
    groups: HashMap<(Lane, GroupKey), NotificationGroup>,
    owner: HashMap<u32, (Lane, GroupKey)>,
}

impl GroupIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(
        &mut self,
        lane: Lane,
        key: GroupKey,
        category: Option<&str>,
        id: u32,
    ) -> Appended {
        if let Some((owner_lane, owner_key)) = self.owner.get(&id) {
            if *owner_lane == lane && *owner_key == key {
                return Appended::AlreadyMember;
            }
            return Appended::OwnedElsewhere(*owner_lane, owner_key.clone());
        }

        self.owner.insert(id, (lane, key.clone()));
        match self.groups.get_mut(&(lane, key.clone())) {
            Some(group) => {
                group.members.insert(id);
                Appended::Joined
            }
            None => {
                let group = NotificationGroup {
                    key: key.clone(),
                    lane,
                    category: category.map(str::to_string),
                    members: BTreeSet::from([id]),
                };
                self.groups.insert((lane, key), group);
                Appended::Created
            }
        }
    }

    pub fn detach(&mut self, id: u32) -> Detached {
        let Some(slot) = self.owner.remove(&id) else {
            return Detached::NotMember;
        };
        let Some(group) = self.groups.get_mut(&slot) else {
            return Detached::NotMember;
        };
        group.members.remove(&id);
        if !group.members.is_empty() {
            return Detached::Remaining(slot.0, slot.1);
        }
        match self.groups.remove(&slot) {
            Some(group) => Detached::Emptied(group),
            None => Detached::NotMember,
        }
    }

    /// Remove a whole group; its members become unowned.
    pub fn take(&mut self, lane: Lane, key: &GroupKey) -> Option<NotificationGroup> {
        let group = self.groups.remove(&(lane, key.clone()))?;
        for id in &group.members {
            self.owner.remove(id);
        }
        Some(group)
    }

    /// Move a detached group into `lane`, joining an existing group with the
    /// same key if there is one.
    pub fn merge(&mut self, mut group: NotificationGroup, lane: Lane) -> Merged {
        group.members.retain(|id| !self.owner.contains_key(id));
        for id in &group.members {
            self.owner.insert(*id, (lane, group.key.clone()));
        }

        let slot = (lane, group.key.clone());
        match self.groups.get_mut(&slot) {
            Some(existing) => {
                existing.members.append(&mut group.members);
                Merged::Joined
            }
            None => {
                group.lane = lane;
                self.groups.insert(slot, group);
                Merged::Created
            }
        }
    }

    pub fn get(&self, lane: Lane, key: &GroupKey) -> Option<&NotificationGroup> {
        self.groups.get(&(lane, key.clone()))
    }

    pub fn group_of(&self, id: u32) -> Option<&NotificationGroup> {
        self.owner.get(&id).and_then(|slot| self.groups.get(slot))
    }

    pub fn groups(&self, lane: Lane) -> impl Iterator<Item = &NotificationGroup> {
        self.groups.values().filter(move |g| g.lane == lane)
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

/// Sum of the members' `amount` hints, counting at least one per member.
pub fn amount(group: &NotificationGroup, registry: &Registry) -> i64 {
    group
        .members
        .iter()
        .map(|id| registry.get(*id).map_or(1, Notification::amount))
        .fold(0, i64::saturating_add)
}

/// The account every member shares, if the category names an account hint.
pub fn common_account(
    group: &NotificationGroup,
    registry: &Registry,
    info: &CategoryInfo,
) -> Option<String> {
    let hint = info.account_hint.as_deref()?;
    let mut accounts = group
        .members
        .iter()
        .map(|id| registry.get(*id).and_then(|n| n.hint_str(hint)));

    let first = accounts.next()??;
    if accounts.all(|a| a == Some(first)) {
        Some(first.to_string())
    } else {
        None
    }
}

/// What activating a group dispatches. Every member is closed afterwards.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Activation {
    DefaultAction(u32),
    AccountCall {
        call: CallDescriptor,
        account: String,
    },
    Callback(CallDescriptor),
    DefaultActions(Vec<u32>),
}

pub fn activation_plan(
    group: &NotificationGroup,
    registry: &Registry,
    catalog: &CategoryCatalog,
) -> Activation {
    let info = group.info(catalog);

    if amount(group, registry) == 1 {
        if let Some(id) = group.members.first() {
            return Activation::DefaultAction(*id);
        }
    }

    if let Some(info) = info {
        if let (Some(call), Some(account)) =
            (&info.account_call, common_account(group, registry, info))
        {
            return Activation::AccountCall {
                call: call.clone().with_arg(account.clone()),
                account,
            };
        }
        if let Some(call) = &info.dbus_call {
            return Activation::Callback(call.clone());
        }
    }

    Activation::DefaultActions(group.member_ids())
}
