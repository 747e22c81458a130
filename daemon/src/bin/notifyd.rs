//! Notification daemon binary.
//!
//! Serves `org.freedesktop.Notifications` on the session bus until Ctrl+C.

use std::sync::Arc;

use tokio::sync::broadcast;
use tracing_subscriber::EnvFilter;

use notifyd_lib::app::SharedState;
use notifyd_lib::catalog::{CategoryCatalog, Untranslated};
use notifyd_lib::dbus::{DbusBus, MceDevice, NotificationsServer, OBJECT_PATH};
use notifyd_lib::events::EVENT_CHANNEL_CAPACITY;
use notifyd_lib::presentation::PresentationController;
use notifyd_lib::service::{Device, NoDevice, NotificationService, Ports};
use notifyd_lib::{background, shutdown};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Step 1: Tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    tracing::info!("Starting notification daemon");

    // Step 2: Foundation
    let config = notifyd_lib::init_foundation()?;
    let store = notifyd_lib::open_store(&config);
    let catalog = CategoryCatalog::load(&config.catalog_path, &Untranslated);

    // Step 3: Buses
    let session = zbus::Connection::session().await?;
    let device: Arc<dyn Device> = if config.mce_enabled {
        match zbus::Connection::system().await {
            Ok(system) => Arc::new(MceDevice::new(system)),
            Err(e) => {
                tracing::warn!("System bus unavailable, LED and display requests disabled: {e}");
                Arc::new(NoDevice)
            }
        }
    } else {
        Arc::new(NoDevice)
    };

    // Step 4: Service
    let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
    let service = NotificationService::new(
        store,
        catalog,
        PresentationController::new(config.wake_display),
        Ports::new(Arc::new(DbusBus::new(session.clone())), device),
        events.clone(),
    );
    let bus_name = config.bus_name.clone();
    let state = SharedState::new(service, config, events);

    // Step 5: Replay persistent notifications before taking calls
    if let Err(e) = state.replay_persistent() {
        tracing::error!("Failed to replay stored notifications: {e}");
    }

    // Step 6: Background loops
    let s = state.clone();
    tokio::spawn(async move { background::commit_loop(s).await });
    let s = state.clone();
    tokio::spawn(async move { background::event_log_loop(s).await });

    // Step 7: Serve
    session
        .object_server()
        .at(OBJECT_PATH, NotificationsServer::new(state.clone()))
        .await?;
    session.request_name(bus_name.as_str()).await?;
    tracing::info!(name = %bus_name, "Notification daemon running. Press Ctrl+C to stop.");

    // Wait for shutdown signal
    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutting down...");

    shutdown::graceful_shutdown(&state).await;
    Ok(())
}
