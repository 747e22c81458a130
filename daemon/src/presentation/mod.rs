//! Presentation controller: one preview slot fed by a FIFO of pending groups,
//! plus any number of switcher groups.
//!
//! The controller never touches the outside world. Every transition returns a
//! list of [`Effect`]s for the service to carry out, in order.

pub mod led;
pub mod view;

#[cfg(test)]
mod tests;

use std::collections::VecDeque;

use notification_store::Notification;
use notification_store::hints::keys;
use serde::Serialize;

use crate::catalog::CategoryCatalog;
use crate::grouping::{
    self, Activation, Appended, Detached, GroupIndex, GroupKey, Lane, Merged, NotificationGroup,
};
use crate::registry::Registry;

pub use led::LedPatterns;
pub use view::{GroupView, SystemNote, SystemNoteKind};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Effect {
    ShowPreview(GroupView),
    UpdatePreview(GroupView),
    DestroyPreview,
    ShowSwitcher(GroupView),
    UpdateSwitcher(GroupView),
    DestroySwitcher(GroupKey),
    ShowSystemNote(SystemNote),
    WakeDisplay,
    ActivateLed(String),
    DeactivateLed(String),
    Activate(Activation),
    /// Close these notifications (as if `CloseNotification` was called).
    Close(Vec<u32>),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum PreviewState {
    Idle,
    Showing(GroupKey),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreviewResponse {
    Ok,
    Dismiss,
    /// The window was closed without a choice.
    Close,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwitcherResponse {
    Ok,
    Close,
}

/// Read-only collaborators every transition needs.
#[derive(Clone, Copy)]
pub struct Context<'a> {
    pub registry: &'a Registry,
    pub catalog: &'a CategoryCatalog,
}

#[derive(Debug)]
pub struct PresentationController {
    groups: GroupIndex,
    queue: VecDeque<GroupKey>,
    preview: PreviewState,
    leds: LedPatterns,
    wake_display: bool,
}

impl Default for PresentationController {
    fn default() -> Self {
        Self::new(true)
    }
}

impl PresentationController {
    pub fn new(wake_display: bool) -> Self {
        Self {
            groups: GroupIndex::new(),
            queue: VecDeque::new(),
            preview: PreviewState::Idle,
            leds: LedPatterns::new(),
            wake_display,
        }
    }

    pub fn preview_state(&self) -> &PreviewState {
        &self.preview
    }

    /// Keys waiting for the preview slot, oldest first.
    pub fn queued(&self) -> impl Iterator<Item = &GroupKey> {
        self.queue.iter()
    }

    pub fn switcher_group(&self, key: &GroupKey) -> Option<&NotificationGroup> {
        self.groups.get(Lane::Switcher, key)
    }

    pub fn switcher_keys(&self) -> Vec<GroupKey> {
        self.groups
            .groups(Lane::Switcher)
            .map(|g| g.key().clone())
            .collect()
    }

    pub fn group_of(&self, id: u32) -> Option<&NotificationGroup> {
        self.groups.group_of(id)
    }

    pub fn leds(&self) -> &LedPatterns {
        &self.leds
    }

    pub fn arrived(&mut self, n: &Notification, replayed: bool, ctx: Context<'_>) -> Vec<Effect> {
        let mut effects = Vec::new();
        let category = n.category();

        let pattern = n.hint_str(keys::LED_PATTERN).or_else(|| {
            category
                .and_then(|c| ctx.catalog.info(c))
                .and_then(|info| info.led_pattern.as_deref())
        });
        if let Some(pattern) = pattern {
            if self.leds.hold(n.id, pattern) {
                effects.push(Effect::ActivateLed(pattern.to_string()));
            }
        }
        if self.wake_display && !replayed {
            effects.push(Effect::WakeDisplay);
        }

        if category.is_some_and(|c| ctx.catalog.is_no_window(c))
            || n.hint_flag(keys::NO_NOTIFICATION_WINDOW)
        {
            return effects;
        }

        if let Some(note) = SystemNote::from_notification(n) {
            if !replayed {
                effects.push(Effect::ShowSystemNote(note));
            }
            return effects;
        }

        let key = grouping::group_key(n, ctx.catalog);
        let lane = if replayed { Lane::Switcher } else { Lane::Pending };

        match self.groups.append(lane, key.clone(), category, n.id) {
            Appended::Created if lane == Lane::Switcher => {
                effects.extend(self.view(lane, &key, ctx).map(Effect::ShowSwitcher));
            }
            Appended::Created => self.queue.push_back(key),
            Appended::Joined => effects.extend(self.refresh(lane, &key, ctx)),
            Appended::AlreadyMember => {}
            Appended::OwnedElsewhere(other_lane, other) => {
                tracing::warn!(id = n.id, group = %other, lane = ?other_lane, "Notification already grouped");
            }
        }

        if self.preview == PreviewState::Idle {
            effects.extend(self.show_next(ctx));
        }
        effects
    }

    pub fn updated(&mut self, id: u32, ctx: Context<'_>) -> Vec<Effect> {
        let Some(group) = self.groups.group_of(id) else {
            return Vec::new();
        };
        let (lane, key) = (group.lane(), group.key().clone());
        self.refresh(lane, &key, ctx).into_iter().collect()
    }

    /// `id` has already left the registry.
    pub fn closed(&mut self, id: u32, ctx: Context<'_>) -> Vec<Effect> {
        let mut effects = Vec::new();
        if let Some(pattern) = self.leds.release(id) {
            effects.push(Effect::DeactivateLed(pattern));
        }

        match self.groups.detach(id) {
            Detached::NotMember => {}
            Detached::Remaining(lane, key) => effects.extend(self.refresh(lane, &key, ctx)),
            Detached::Emptied(group) => match group.lane() {
                Lane::Switcher => effects.push(Effect::DestroySwitcher(group.key().clone())),
                Lane::Pending => {
                    if self.preview == PreviewState::Showing(group.key().clone()) {
                        self.preview = PreviewState::Idle;
                        effects.push(Effect::DestroyPreview);
                        effects.extend(self.show_next(ctx));
                    } else {
                        self.queue.retain(|k| k != group.key());
                    }
                }
            },
        }
        effects
    }

    /// React to the preview window. `may_activate` is the activation guard's
    /// verdict; a refused activation keeps the group in the switcher.
    pub fn preview_response(
        &mut self,
        response: PreviewResponse,
        may_activate: bool,
        ctx: Context<'_>,
    ) -> Vec<Effect> {
        let PreviewState::Showing(key) = std::mem::replace(&mut self.preview, PreviewState::Idle)
        else {
            tracing::warn!(?response, "Preview response without a preview");
            return Vec::new();
        };

        let mut effects = vec![Effect::DestroyPreview];
        if let Some(group) = self.groups.take(Lane::Pending, &key) {
            match response {
                PreviewResponse::Ok if may_activate => {
                    let plan = grouping::activation_plan(&group, ctx.registry, ctx.catalog);
                    tracing::info!(group = %key, ?plan, "Activating preview group");
                    effects.push(Effect::Activate(plan));
                    effects.push(Effect::Close(group.member_ids()));
                }
                PreviewResponse::Ok => {
                    tracing::info!(group = %key, "Activation refused, moving group to switcher");
                    effects.extend(self.to_switcher(group, ctx));
                }
                PreviewResponse::Dismiss | PreviewResponse::Close => {
                    effects.extend(self.to_switcher(group, ctx));
                }
            }
        }
        effects.extend(self.show_next(ctx));
        effects
    }

    pub fn switcher_response(
        &mut self,
        key: &GroupKey,
        response: SwitcherResponse,
        ctx: Context<'_>,
    ) -> Vec<Effect> {
        let Some(group) = self.groups.get(Lane::Switcher, key) else {
            tracing::warn!(group = %key, "Switcher response for unknown group");
            return Vec::new();
        };

        match response {
            SwitcherResponse::Ok => {
                let plan = grouping::activation_plan(group, ctx.registry, ctx.catalog);
                tracing::info!(group = %key, ?plan, "Activating switcher group");
                vec![Effect::Activate(plan), Effect::Close(group.member_ids())]
            }
            SwitcherResponse::Close => vec![Effect::Close(group.member_ids())],
        }
    }

    fn to_switcher(&mut self, group: NotificationGroup, ctx: Context<'_>) -> Option<Effect> {
        let key = group.key().clone();
        let merged = self.groups.merge(group, Lane::Switcher);
        let view = self.view(Lane::Switcher, &key, ctx)?;
        Some(match merged {
            Merged::Created => Effect::ShowSwitcher(view),
            Merged::Joined => Effect::UpdateSwitcher(view),
        })
    }

    fn show_next(&mut self, ctx: Context<'_>) -> Option<Effect> {
        while let Some(key) = self.queue.pop_front() {
            if let Some(view) = self.view(Lane::Pending, &key, ctx) {
                self.preview = PreviewState::Showing(key);
                return Some(Effect::ShowPreview(view));
            }
        }
        self.preview = PreviewState::Idle;
        None
    }

    fn refresh(&self, lane: Lane, key: &GroupKey, ctx: Context<'_>) -> Option<Effect> {
        match lane {
            Lane::Switcher => self.view(lane, key, ctx).map(Effect::UpdateSwitcher),
            Lane::Pending if self.preview == PreviewState::Showing(key.clone()) => {
                self.view(lane, key, ctx).map(Effect::UpdatePreview)
            }
            Lane::Pending => None,
        }
    }

    fn view(&self, lane: Lane, key: &GroupKey, ctx: Context<'_>) -> Option<GroupView> {
        let group = self.groups.get(lane, key)?;
        Some(GroupView::build(group, ctx.registry, ctx.catalog))
    }
}
