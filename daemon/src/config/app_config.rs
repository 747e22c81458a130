//! Runtime daemon configuration resolved by the settings manager.

use std::path::{Path, PathBuf};
use std::time::Duration;

use super::manager::SettingsManager;

/// Typed runtime configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub data_dir: PathBuf,
    pub db_file: String,
    pub persistence_enabled: bool,
    pub commit_delay: Duration,
    pub commit_check_interval: Duration,
    pub catalog_path: PathBuf,
    pub wake_display: bool,
    pub mce_enabled: bool,
    pub bus_name: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("."),
            db_file: "notifications.db".into(),
            persistence_enabled: true,
            commit_delay: Duration::from_secs(8),
            commit_check_interval: Duration::from_secs(10),
            catalog_path: PathBuf::from("categories.json"),
            wake_display: true,
            mce_enabled: true,
            bus_name: "org.freedesktop.Notifications".into(),
        }
    }
}

impl AppConfig {
    /// Load configuration for the given data directory.
    pub fn load(sm: &SettingsManager, data_dir: &Path) -> Result<Self, anyhow::Error> {
        let g = |key: &str| -> String { sm.get_setting(key).unwrap_or_default() };

        let catalog_path = {
            let p = g("NOTIFYD_CATALOG_PATH");
            if p.is_empty() {
                data_dir.join("categories.json")
            } else {
                PathBuf::from(p)
            }
        };

        Ok(Self {
            data_dir: data_dir.to_path_buf(),
            db_file: {
                let f = g("NOTIFYD_DB_FILE");
                if f.is_empty() { "notifications.db".into() } else { f }
            },
            persistence_enabled: g("NOTIFYD_PERSISTENCE_ENABLED") != "false",
            commit_delay: Duration::from_secs(parse_u64(&g("NOTIFYD_COMMIT_DELAY_SECS"), 8)),
            commit_check_interval: Duration::from_secs(
                parse_u64(&g("NOTIFYD_COMMIT_CHECK_INTERVAL_SECS"), 10).max(1),
            ),
            catalog_path,
            wake_display: g("NOTIFYD_WAKE_DISPLAY") != "false",
            mce_enabled: g("NOTIFYD_MCE_ENABLED") != "false",
            bus_name: {
                let n = g("NOTIFYD_BUS_NAME");
                if n.is_empty() { "org.freedesktop.Notifications".into() } else { n }
            },
        })
    }

    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join(&self.db_file)
    }
}

fn parse_u64(s: &str, default: u64) -> u64 {
    if s.is_empty() {
        return default;
    }
    s.parse().unwrap_or(default)
}
