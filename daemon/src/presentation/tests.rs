use notification_store::Notification;

use super::*;
use crate::catalog::CategoryCatalog;
use crate::grouping::Activation;
use crate::testing::{NoteBuilder, chat_catalog};

struct Fixture {
    registry: Registry,
    catalog: CategoryCatalog,
    controller: PresentationController,
}

impl Fixture {
    fn new() -> Self {
        Self {
            registry: Registry::new(),
            catalog: chat_catalog(),
            controller: PresentationController::new(true),
        }
    }

    fn arrive(&mut self, n: Notification) -> Vec<Effect> {
        self.deliver(n, false)
    }

    fn replay(&mut self, n: Notification) -> Vec<Effect> {
        self.deliver(n, true)
    }

    fn deliver(&mut self, n: Notification, replayed: bool) -> Vec<Effect> {
        self.registry.insert(n.clone());
        let ctx = Context {
            registry: &self.registry,
            catalog: &self.catalog,
        };
        self.controller.arrived(&n, replayed, ctx)
    }

    fn close(&mut self, id: u32) -> Vec<Effect> {
        self.registry.remove(id);
        let ctx = Context {
            registry: &self.registry,
            catalog: &self.catalog,
        };
        self.controller.closed(id, ctx)
    }

    fn preview(&mut self, response: PreviewResponse, may_activate: bool) -> Vec<Effect> {
        let ctx = Context {
            registry: &self.registry,
            catalog: &self.catalog,
        };
        self.controller.preview_response(response, may_activate, ctx)
    }

    fn switcher(&mut self, key: &GroupKey, response: SwitcherResponse) -> Vec<Effect> {
        let ctx = Context {
            registry: &self.registry,
            catalog: &self.catalog,
        };
        self.controller.switcher_response(key, response, ctx)
    }
}

fn kinds(effects: &[Effect]) -> Vec<&'static str> {
    effects
        .iter()
        .map(|e| match e {
            Effect::ShowPreview(_) => "show_preview",
            Effect::UpdatePreview(_) => "update_preview",
            Effect::DestroyPreview => "destroy_preview",
            Effect::ShowSwitcher(_) => "show_switcher",
            Effect::UpdateSwitcher(_) => "update_switcher",
            Effect::DestroySwitcher(_) => "destroy_switcher",
            Effect::ShowSystemNote(_) => "system_note",
            Effect::WakeDisplay => "wake",
            Effect::ActivateLed(_) => "led_on",
            Effect::DeactivateLed(_) => "led_off",
            Effect::Activate(_) => "activate",
            Effect::Close(_) => "close",
        })
        .collect()
}

fn key(mapped: &str, thread: Option<&str>) -> GroupKey {
    GroupKey::Category {
        mapped: mapped.to_string(),
        thread: thread.map(str::to_string),
    }
}

fn alice(id: u32) -> Notification {
    NoteBuilder::new(id)
        .category("chat.message")
        .hint("thread", "alice")
        .build()
}

fn sms(id: u32, sender: &str) -> Notification {
    NoteBuilder::new(id)
        .category("sms.received")
        .hint("thread", sender)
        .build()
}

#[test]
fn test_first_arrival_takes_preview() {
    let mut f = Fixture::new();
    let effects = f.arrive(alice(1));

    assert_eq!(kinds(&effects), ["led_on", "wake", "show_preview"]);
    assert_eq!(effects[0], Effect::ActivateLed("PatternCommunicationIM".into()));
    match &effects[2] {
        Effect::ShowPreview(view) => {
            assert_eq!(view.key, key("chat.message", Some("alice")));
            assert_eq!(view.title, "summary 1");
            assert_eq!(view.members, vec![1]);
        }
        other => panic!("expected preview, got {other:?}"),
    }
    assert_eq!(
        f.controller.preview_state(),
        &PreviewState::Showing(key("chat.message", Some("alice")))
    );
}

#[test]
fn test_other_groups_wait_in_fifo() {
    let mut f = Fixture::new();
    f.arrive(alice(1));
    assert_eq!(kinds(&f.arrive(sms(2, "x"))), ["wake"]);
    assert_eq!(kinds(&f.arrive(NoteBuilder::new(3).build())), ["wake"]);

    let queued: Vec<String> = f.controller.queued().map(ToString::to_string).collect();
    assert_eq!(queued, ["sms.received", "#3"]);

    let effects = f.preview(PreviewResponse::Dismiss, false);
    assert_eq!(kinds(&effects), ["destroy_preview", "show_switcher", "show_preview"]);
    assert_eq!(
        f.controller.preview_state(),
        &PreviewState::Showing(key("sms.received", None))
    );

    let effects = f.preview(PreviewResponse::Close, false);
    assert_eq!(kinds(&effects), ["destroy_preview", "show_switcher", "show_preview"]);
    let effects = f.preview(PreviewResponse::Dismiss, false);
    assert_eq!(kinds(&effects), ["destroy_preview", "show_switcher"]);
    assert_eq!(f.controller.preview_state(), &PreviewState::Idle);
    assert_eq!(f.controller.switcher_keys().len(), 3);
}

#[test]
fn test_same_key_joins_showing_preview() {
    let mut f = Fixture::new();
    f.arrive(alice(1));
    let effects = f.arrive(alice(2));

    assert_eq!(kinds(&effects), ["wake", "update_preview"]);
    match &effects[1] {
        Effect::UpdatePreview(view) => {
            assert_eq!(view.amount, 2);
            assert_eq!(view.members, vec![1, 2]);
            assert_eq!(view.title, "summary 2");
        }
        other => panic!("expected update, got {other:?}"),
    }
}

#[test]
fn test_replay_goes_straight_to_switcher() {
    let mut f = Fixture::new();
    let mail = |id| {
        NoteBuilder::new(id)
            .category("email.arrived")
            .persistent()
            .build()
    };

    let effects = f.replay(mail(1));
    assert_eq!(kinds(&effects), ["led_on", "show_switcher"]);
    match &effects[1] {
        Effect::ShowSwitcher(view) => {
            assert_eq!(view.key, key("mail", None));
            assert_eq!(view.title, "New e-mail");
            assert_eq!(view.secondary, "body 1");
        }
        other => panic!("expected switcher, got {other:?}"),
    }

    assert_eq!(kinds(&f.replay(mail(2))), ["update_switcher"]);
    assert_eq!(f.controller.preview_state(), &PreviewState::Idle);
    assert_eq!(f.controller.queued().count(), 0);
}

#[test]
fn test_windowless_arrivals_only_have_side_effects() {
    let mut f = Fixture::new();
    let charging = NoteBuilder::new(1).category("battery.charging").build();
    assert_eq!(kinds(&f.arrive(charging)), ["wake"]);

    let hidden = NoteBuilder::new(2)
        .category("sms.received")
        .hint("no-notification-window", 1u8)
        .build();
    assert_eq!(kinds(&f.arrive(hidden)), ["wake"]);

    assert!(f.controller.group_of(1).is_none());
    assert!(f.controller.group_of(2).is_none());
    assert_eq!(f.controller.preview_state(), &PreviewState::Idle);
}

#[test]
fn test_wake_disabled() {
    let mut f = Fixture::new();
    f.controller = PresentationController::new(false);
    assert_eq!(kinds(&f.arrive(sms(1, "x"))), ["show_preview"]);
}

#[test]
fn test_system_notes_bypass_grouping() {
    let mut f = Fixture::new();
    let infoprint = NoteBuilder::new(1).category(view::INFOPRINT_CATEGORY).build();
    let effects = f.arrive(infoprint);
    assert_eq!(kinds(&effects), ["wake", "system_note"]);
    match &effects[1] {
        Effect::ShowSystemNote(note) => assert_eq!(note.kind, SystemNoteKind::Infoprint),
        other => panic!("expected system note, got {other:?}"),
    }

    let dialog = NoteBuilder::new(2)
        .category(view::DIALOG_CATEGORY)
        .hint("dialog-type", 1)
        .action("default", "OK")
        .build();
    let effects = f.arrive(dialog);
    match &effects[1] {
        Effect::ShowSystemNote(note) => {
            assert_eq!(note.kind, SystemNoteKind::Dialog { dialog_type: 1 });
            assert_eq!(note.button_label.as_deref(), Some("OK"));
        }
        other => panic!("expected system note, got {other:?}"),
    }

    assert!(f.controller.group_of(1).is_none());
    assert_eq!(f.controller.preview_state(), &PreviewState::Idle);
}

#[test]
fn test_closing_preview_group_shows_next() {
    let mut f = Fixture::new();
    f.arrive(sms(1, "a"));
    f.arrive(NoteBuilder::new(2).build());

    assert_eq!(kinds(&f.close(1)), ["destroy_preview", "show_preview"]);
    assert_eq!(
        f.controller.preview_state(),
        &PreviewState::Showing(GroupKey::Single(2))
    );
}

#[test]
fn test_closing_queued_group_leaves_queue() {
    let mut f = Fixture::new();
    f.arrive(sms(1, "a"));
    f.arrive(NoteBuilder::new(2).build());

    assert!(f.close(2).is_empty());
    assert_eq!(f.controller.queued().count(), 0);

    assert_eq!(
        kinds(&f.preview(PreviewResponse::Dismiss, false)),
        ["destroy_preview", "show_switcher"]
    );
    assert_eq!(f.controller.preview_state(), &PreviewState::Idle);
}

#[test]
fn test_refused_activation_keeps_group() {
    let mut f = Fixture::new();
    f.arrive(alice(1));

    let effects = f.preview(PreviewResponse::Ok, false);
    assert_eq!(kinds(&effects), ["destroy_preview", "show_switcher"]);
    assert!(f.controller.switcher_group(&key("chat.message", Some("alice"))).is_some());
}

#[test]
fn test_preview_activation_closes_members() {
    let mut f = Fixture::new();
    f.arrive(alice(1));

    let effects = f.preview(PreviewResponse::Ok, true);
    assert_eq!(
        effects,
        vec![
            Effect::DestroyPreview,
            Effect::Activate(Activation::DefaultAction(1)),
            Effect::Close(vec![1]),
        ]
    );
    assert!(f.controller.group_of(1).is_none());

    assert_eq!(f.close(1), vec![Effect::DeactivateLed("PatternCommunicationIM".into())]);
}

#[test]
fn test_dismissed_preview_joins_switcher_entry() {
    let mut f = Fixture::new();
    f.replay(sms(1, "a"));
    f.arrive(sms(2, "a"));

    let effects = f.preview(PreviewResponse::Dismiss, false);
    assert_eq!(kinds(&effects), ["destroy_preview", "update_switcher"]);
    let group = f.controller.switcher_group(&key("sms.received", None)).unwrap();
    assert_eq!(group.member_ids(), vec![1, 2]);
}

#[test]
fn test_switcher_activation_and_teardown() {
    let mut f = Fixture::new();
    let thread = key("chat.message", Some("alice"));
    f.replay(alice(1));
    f.replay(alice(2));

    let effects = f.switcher(&thread, SwitcherResponse::Ok);
    assert_eq!(kinds(&effects), ["activate", "close"]);
    match &effects[0] {
        Effect::Activate(Activation::Callback(call)) => assert_eq!(call.member, "OpenThread"),
        other => panic!("expected callback, got {other:?}"),
    }
    assert_eq!(effects[1], Effect::Close(vec![1, 2]));

    assert_eq!(kinds(&f.close(1)), ["update_switcher"]);
    assert_eq!(
        f.close(2),
        vec![
            Effect::DeactivateLed("PatternCommunicationIM".into()),
            Effect::DestroySwitcher(thread.clone()),
        ]
    );
    assert!(f.controller.switcher_group(&thread).is_none());
}

#[test]
fn test_switcher_close_and_unknown_key() {
    let mut f = Fixture::new();
    f.replay(sms(1, "a"));

    let effects = f.switcher(&key("sms.received", None), SwitcherResponse::Close);
    assert_eq!(effects, vec![Effect::Close(vec![1])]);
    assert!(f.switcher(&key("nothing", None), SwitcherResponse::Ok).is_empty());
}

#[test]
fn test_led_from_hint_is_per_notification() {
    let mut f = Fixture::new();
    let blink = |id| {
        NoteBuilder::new(id)
            .hint("led-pattern", "PatternCommonNotification")
            .build()
    };
    assert_eq!(kinds(&f.arrive(blink(1))), ["led_on", "wake", "show_preview"]);
    assert_eq!(kinds(&f.arrive(blink(2))), ["wake"]);

    let effects = f.close(2);
    assert!(!effects.contains(&Effect::DeactivateLed("PatternCommonNotification".into())));
    assert!(f.controller.leds().is_active("PatternCommonNotification"));

    let effects = f.close(1);
    assert!(effects.contains(&Effect::DeactivateLed("PatternCommonNotification".into())));
}

#[test]
fn test_preview_response_without_preview() {
    let mut f = Fixture::new();
    assert!(f.preview(PreviewResponse::Ok, true).is_empty());
}
