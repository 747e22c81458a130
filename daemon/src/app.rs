use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use notification_store::Database;
use tokio::sync::{RwLock, broadcast};
use tokio::task::AbortHandle;
use tokio_util::sync::CancellationToken;

use crate::config::AppConfig;
use crate::error::NotifyError;
use crate::events::RegistryEvent;
use crate::grouping::GroupKey;
use crate::presentation::{PreviewResponse, SwitcherResponse};
use crate::service::{CloseReason, NotificationService, NotifyRequest};

/// Daemon state shared by the D-Bus handlers and the background loops.
#[derive(Clone)]
pub struct SharedState {
    inner: Arc<SharedStateInner>,
}

struct SharedStateInner {
    service: Mutex<NotificationService>,
    /// Same handle the service writes through; kept here for commits.
    store: Option<Database>,
    config: RwLock<AppConfig>,
    events: broadcast::Sender<RegistryEvent>,
    shutdown_token: CancellationToken,
    /// Pending auto-close timers by notification id.
    timers: Mutex<HashMap<u32, Timer>>,
    next_generation: AtomicU64,
}

struct Timer {
    generation: u64,
    handle: AbortHandle,
}

impl SharedState {
    /// `events` must be the sender the service was built with.
    pub fn new(
        service: NotificationService,
        config: AppConfig,
        events: broadcast::Sender<RegistryEvent>,
    ) -> Self {
        let store = service.store().cloned();
        Self {
            inner: Arc::new(SharedStateInner {
                service: Mutex::new(service),
                store,
                config: RwLock::new(config),
                events,
                shutdown_token: CancellationToken::new(),
                timers: Mutex::new(HashMap::new()),
                next_generation: AtomicU64::new(0),
            }),
        }
    }

    pub fn store(&self) -> Option<&Database> {
        self.inner.store.as_ref()
    }

    pub fn shutdown_token(&self) -> &CancellationToken {
        &self.inner.shutdown_token
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<RegistryEvent> {
        self.inner.events.subscribe()
    }

    /// Get a read lock on the current config.
    pub async fn config(&self) -> tokio::sync::RwLockReadGuard<'_, AppConfig> {
        self.inner.config.read().await
    }

    /// Run `f` with exclusive access to the service.
    pub fn with_service<R>(
        &self,
        f: impl FnOnce(&mut NotificationService) -> Result<R, NotifyError>,
    ) -> Result<R, NotifyError> {
        let mut service = self
            .inner
            .service
            .lock()
            .map_err(|_| NotifyError::LockPoisoned)?;
        f(&mut service)
    }

    pub fn capabilities(&self) -> Result<Vec<String>, NotifyError> {
        self.with_service(|s| Ok(s.capabilities()))
    }

    pub fn server_info(&self) -> Result<(String, String, String), NotifyError> {
        self.with_service(|s| Ok(s.server_info()))
    }

    pub fn notify(&self, request: NotifyRequest) -> Result<u32, NotifyError> {
        self.created(|s| s.notify(request))
    }

    pub fn system_note_infoprint(&self, message: &str) -> Result<u32, NotifyError> {
        self.created(|s| s.system_note_infoprint(message))
    }

    pub fn system_note_dialog(
        &self,
        message: &str,
        dialog_type: u32,
        label: &str,
    ) -> Result<u32, NotifyError> {
        self.created(|s| s.system_note_dialog(message, dialog_type, label))
    }

    pub fn close(&self, id: u32, reason: CloseReason) -> Result<(), NotifyError> {
        self.disarm(id);
        self.with_service(|s| s.close(id, reason))
    }

    pub fn close_all(&self) -> Result<usize, NotifyError> {
        let closed = self.with_service(|s| Ok(s.close_all()))?;
        self.prune_timers();
        Ok(closed)
    }

    pub fn invoke_action(&self, id: u32, action_id: &str) -> Result<(), NotifyError> {
        self.with_service(|s| s.invoke_action(id, action_id))
    }

    pub fn system_dialog_response(&self, id: u32) -> Result<(), NotifyError> {
        self.disarm(id);
        self.with_service(|s| s.system_dialog_response(id))
    }

    pub fn preview_response(&self, response: PreviewResponse) -> Result<(), NotifyError> {
        self.with_service(|s| {
            s.preview_response(response);
            Ok(())
        })?;
        self.prune_timers();
        Ok(())
    }

    pub fn switcher_response(
        &self,
        key: &GroupKey,
        response: SwitcherResponse,
    ) -> Result<(), NotifyError> {
        self.with_service(|s| {
            s.switcher_response(key, response);
            Ok(())
        })?;
        self.prune_timers();
        Ok(())
    }

    pub fn replay_persistent(&self) -> Result<usize, NotifyError> {
        self.with_service(|s| s.replay_persistent())
    }

    /// Abort every pending auto-close timer.
    pub fn cancel_timers(&self) -> usize {
        let Ok(mut timers) = self.inner.timers.lock() else {
            return 0;
        };
        let count = timers.len();
        for (_, timer) in timers.drain() {
            timer.handle.abort();
        }
        count
    }

    pub fn pending_timers(&self) -> usize {
        self.inner.timers.lock().map(|t| t.len()).unwrap_or(0)
    }

    /// Run a create-or-replace call and (re)arm the auto-close timer.
    ///
    /// Nested locking always takes the service lock before the timer table.
    fn created(
        &self,
        f: impl FnOnce(&mut NotificationService) -> Result<u32, NotifyError>,
    ) -> Result<u32, NotifyError> {
        self.with_service(|s| {
            let id = f(s)?;
            self.arm(id, s.auto_close_after(id));
            Ok(id)
        })
    }

    fn arm(&self, id: u32, expires_in: Option<Duration>) {
        let Ok(mut timers) = self.inner.timers.lock() else {
            tracing::warn!(id, "Timer table poisoned, auto-close skipped");
            return;
        };
        if let Some(previous) = timers.remove(&id) {
            previous.handle.abort();
        }
        let Some(expires_in) = expires_in else {
            return;
        };

        let generation = self.inner.next_generation.fetch_add(1, Ordering::Relaxed);
        let state = self.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(expires_in).await;
            state.expire(id, generation);
        });
        timers.insert(
            id,
            Timer {
                generation,
                handle: handle.abort_handle(),
            },
        );
    }

    fn disarm(&self, id: u32) {
        if let Ok(mut timers) = self.inner.timers.lock() {
            if let Some(timer) = timers.remove(&id) {
                timer.handle.abort();
            }
        }
    }

    /// Drop timers of notifications that were closed as a side effect.
    fn prune_timers(&self) {
        let Ok(live) = self.with_service(|s| Ok(s.registry().ids())) else {
            return;
        };
        if let Ok(mut timers) = self.inner.timers.lock() {
            timers.retain(|id, timer| {
                let keep = live.binary_search(id).is_ok();
                if !keep {
                    timer.handle.abort();
                }
                keep
            });
        }
    }

    /// Close `id` if `generation` is still its armed timer.
    fn expire(&self, id: u32, generation: u64) {
        let result = self.with_service(|s| {
            {
                let Ok(mut timers) = self.inner.timers.lock() else {
                    return Ok(false);
                };
                match timers.get(&id) {
                    Some(timer) if timer.generation == generation => {
                        timers.remove(&id);
                    }
                    _ => return Ok(false),
                }
            }
            s.expire(id).map(|()| true)
        });

        match result {
            Ok(true) => tracing::debug!(id, "Notification expired"),
            Ok(false) => tracing::trace!(id, generation, "Stale auto-close timer ignored"),
            Err(NotifyError::NotFound(_)) => {}
            Err(e) => tracing::warn!(id, "Auto-close failed: {e}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use notification_store::hints::keys;
    use notification_store::TypedValue;

    use super::*;
    use crate::testing::{Recorder, chat_catalog, request};
    use crate::presentation::PresentationController;

    fn state() -> (SharedState, Arc<Recorder>) {
        let recorder = Recorder::new();
        let (tx, _) = broadcast::channel(64);
        let service = NotificationService::new(
            None,
            chat_catalog(),
            PresentationController::new(true),
            recorder.ports(),
            tx.clone(),
        );
        (SharedState::new(service, AppConfig::default(), tx), recorder)
    }

    fn timed(ms: i32) -> NotifyRequest {
        let mut req = request("timed");
        req.timeout = ms;
        req
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_closes_once() {
        let (state, rec) = state();
        let id = state.notify(timed(100)).unwrap();
        assert_eq!(state.pending_timers(), 1);

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(rec.closed().is_empty());

        tokio::time::sleep(Duration::from_millis(100)).await;
        tokio::task::yield_now().await;
        assert_eq!(rec.closed(), vec![(id, CloseReason::Expired)]);
        assert_eq!(state.pending_timers(), 0);

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(rec.closed().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_explicit_close_cancels_timer() {
        let (state, rec) = state();
        let id = state.notify(timed(100)).unwrap();

        state.close(id, CloseReason::Closed).unwrap();
        assert!(matches!(
            state.close(id, CloseReason::Closed),
            Err(NotifyError::NotFound(_))
        ));

        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(rec.closed(), vec![(id, CloseReason::Closed)]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_replace_rearms_timer() {
        let (state, rec) = state();
        let id = state.notify(timed(100)).unwrap();

        tokio::time::sleep(Duration::from_millis(80)).await;
        let mut again = timed(100);
        again.replaces_id = id;
        state.notify(again).unwrap();

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(rec.closed().is_empty());

        tokio::time::sleep(Duration::from_millis(100)).await;
        tokio::task::yield_now().await;
        assert_eq!(rec.closed(), vec![(id, CloseReason::Expired)]);

        let forever = state.notify(timed(0)).unwrap();
        let mut kept = timed(100);
        kept.hints
            .insert(keys::PERSISTENT.to_string(), TypedValue::Byte(1));
        let persistent = state.notify(kept).unwrap();
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!(rec.closed().iter().all(|(i, _)| *i != forever && *i != persistent));
        assert_eq!(state.pending_timers(), 0);
    }

    fn armed_generation(state: &SharedState, id: u32) -> u64 {
        state.inner.timers.lock().unwrap()[&id].generation
    }

    #[tokio::test(start_paused = true)]
    async fn test_superseded_timer_leaves_replaced_notification() {
        let (state, rec) = state();
        let id = state.notify(timed(100)).unwrap();
        let stale = armed_generation(&state, id);

        let mut again = timed(100);
        again.replaces_id = id;
        state.notify(again).unwrap();
        assert_ne!(armed_generation(&state, id), stale);

        state.expire(id, stale);
        assert!(rec.closed().is_empty());
        assert!(state.with_service(|s| Ok(s.registry().contains(id))).unwrap());
        assert_eq!(state.pending_timers(), 1);

        tokio::time::sleep(Duration::from_millis(150)).await;
        tokio::task::yield_now().await;
        assert_eq!(rec.closed(), vec![(id, CloseReason::Expired)]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_activation_drops_timers_of_closed_members() {
        let (state, rec) = state();
        let id = state.notify(timed(1000)).unwrap();

        state.preview_response(PreviewResponse::Ok).unwrap();
        assert_eq!(rec.closed(), vec![(id, CloseReason::Dismissed)]);
        assert_eq!(state.pending_timers(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_timers() {
        let (state, rec) = state();
        state.notify(timed(100)).unwrap();
        state.system_note_infoprint("Saved").unwrap();

        assert_eq!(state.cancel_timers(), 2);
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!(rec.closed().is_empty());
    }
}
