//! Background task loops: deferred store commits, registry event log.

use std::time::Duration;

use tokio::sync::broadcast::error::RecvError;
use tokio::time::{Instant, sleep};
use tokio_util::sync::CancellationToken;

use crate::app::SharedState;

async fn sleep_or_cancel(token: &CancellationToken, duration: Duration) -> bool {
    tokio::select! {
        _ = token.cancelled() => true,
        _ = sleep(duration) => false,
    }
}

/// Commit the batched store transaction once its quiet period has passed.
pub async fn commit_loop(state: SharedState) {
    let Some(db) = state.store().cloned() else {
        tracing::info!("Persistence disabled, commit loop not started");
        return;
    };
    let shutdown_token = state.shutdown_token().clone();

    loop {
        let interval = state.config().await.commit_check_interval;
        if sleep_or_cancel(&shutdown_token, interval).await {
            tracing::info!("Commit loop stopped (shutdown)");
            return;
        }

        match db.commit_if_due(Instant::now().into_std()) {
            Ok(true) => tracing::debug!("Committed batched notification writes"),
            Ok(false) => {}
            Err(e) => tracing::error!("Deferred commit failed: {e}"),
        }
    }
}

/// Log every registry change at debug level.
pub async fn event_log_loop(state: SharedState) {
    let mut rx = state.subscribe_events();
    let shutdown_token = state.shutdown_token().clone();

    loop {
        tokio::select! {
            _ = shutdown_token.cancelled() => {
                tracing::info!("Event log loop stopped (shutdown)");
                return;
            }
            event = rx.recv() => match event {
                Ok(event) => tracing::debug!(id = event.id(), ?event, "Registry event"),
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Event log lagging behind");
                }
                Err(RecvError::Closed) => return,
            },
        }
    }
}
