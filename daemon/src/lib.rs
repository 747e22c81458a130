pub mod app;
pub mod background;
pub mod catalog;
pub mod config;
pub mod dbus;
pub mod error;
pub mod events;
pub mod grouping;
pub mod presentation;
pub mod registry;
pub mod service;
pub mod shutdown;

#[cfg(test)]
mod testing;

use std::path::PathBuf;

use notification_store::Database;

use config::{AppConfig, SettingsManager};

/// Determine the data directory for the daemon.
/// Priority: NOTIFYD_DATA_DIR env var > ~/.notifyd
pub fn data_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("NOTIFYD_DATA_DIR") {
        return PathBuf::from(dir);
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".notifyd")
}

/// Load .env from multiple candidate paths.
fn load_dotenv() {
    let candidates = [".env", "../.env", "../../.env"];
    for path in &candidates {
        if dotenvy::from_filename(path).is_ok() {
            tracing::info!("Loaded .env from: {path}");
            return;
        }
    }
    tracing::info!("No .env file found, using system environment variables");
}

/// Load .env, create the data directory and resolve the runtime config.
pub fn init_foundation() -> Result<AppConfig, anyhow::Error> {
    load_dotenv();

    let dir = data_dir();
    std::fs::create_dir_all(&dir)?;

    let sm = SettingsManager::new();
    let config = AppConfig::load(&sm, &dir)?;

    for setting in sm.get_all_settings()? {
        tracing::debug!(
            key = %setting.key,
            value = %setting.value,
            source = ?setting.source,
            "Setting resolved"
        );
    }

    tracing::info!(
        data_dir = %dir.display(),
        persistence = config.persistence_enabled,
        "Settings loaded"
    );
    Ok(config)
}

/// Open the notification store. Any failure disables persistence for this
/// session instead of stopping the daemon.
pub fn open_store(config: &AppConfig) -> Option<Database> {
    if !config.persistence_enabled {
        tracing::info!("Persistence disabled by configuration");
        return None;
    }

    let path = config.db_path();
    tracing::info!("Opening database at {}", path.display());
    match Database::open(&path) {
        Ok(db) => {
            if let Err(e) = db.set_commit_delay(config.commit_delay) {
                tracing::warn!("Failed to set commit delay: {e}");
            }
            Some(db)
        }
        Err(e) => {
            tracing::error!("Failed to open database, persistence disabled: {e}");
            None
        }
    }
}
