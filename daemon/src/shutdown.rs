use crate::app::SharedState;

pub async fn graceful_shutdown(state: &SharedState) {
    tracing::info!("Shutdown sequence started");

    state.shutdown_token().cancel();
    tracing::info!("Shutdown: background loops cancelled");

    let timers = state.cancel_timers();
    tracing::info!(timers, "Shutdown: auto-close timers aborted");

    if let Some(db) = state.store() {
        match db.flush() {
            Ok(true) => tracing::info!("Shutdown: pending notification writes committed"),
            Ok(false) => tracing::info!("Shutdown: no pending notification writes"),
            Err(e) => tracing::error!("Shutdown: final commit failed: {e}"),
        }
    }

    tracing::info!("Shutdown sequence completed");
}
