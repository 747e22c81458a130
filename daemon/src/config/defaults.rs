//! All setting definitions with their default values.

use std::collections::HashMap;
use std::sync::LazyLock;

type DefTuple = (&'static str, &'static str, &'static str);

const DEFS: &[DefTuple] = &[
    (
        "NOTIFYD_DB_FILE",
        "notifications.db",
        "SQLite file for persistent notifications, relative to the data directory",
    ),
    (
        "NOTIFYD_PERSISTENCE_ENABLED",
        "true",
        "Store persistent notifications so they are replayed after a restart",
    ),
    (
        "NOTIFYD_COMMIT_DELAY_SECS",
        "8",
        "Quiet period after the last write before the batched transaction is committed",
    ),
    (
        "NOTIFYD_COMMIT_CHECK_INTERVAL_SECS",
        "10",
        "How often the deferred commit is re-checked",
    ),
    (
        "NOTIFYD_CATALOG_PATH",
        "",
        "Category catalog JSON file (empty: categories.json in the data directory)",
    ),
    (
        "NOTIFYD_WAKE_DISPLAY",
        "true",
        "Turn the display on when a notification arrives",
    ),
    (
        "NOTIFYD_MCE_ENABLED",
        "true",
        "Drive LED patterns and display state through the MCE service",
    ),
    (
        "NOTIFYD_BUS_NAME",
        "org.freedesktop.Notifications",
        "Well-known session bus name to own",
    ),
];

/// A single setting definition.
#[derive(Debug, Clone)]
pub struct SettingDef {
    pub key: &'static str,
    pub default: &'static str,
    pub description: &'static str,
}

/// Global setting definitions indexed by key.
pub static DEFAULT_SETTINGS: LazyLock<HashMap<&'static str, SettingDef>> = LazyLock::new(|| {
    DEFS.iter()
        .map(|&(key, default, description)| {
            (
                key,
                SettingDef {
                    key,
                    default,
                    description,
                },
            )
        })
        .collect()
});

/// Get the default value for a setting key, or `None` if not defined.
pub fn get_default(key: &str) -> Option<&'static str> {
    DEFAULT_SETTINGS.get(key).map(|d| d.default)
}
