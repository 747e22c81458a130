//! SettingsManager: explicit overrides, then environment, then defaults.

use std::collections::HashMap;

use super::defaults::DEFAULT_SETTINGS;
use super::validation::validate_setting;
use super::{SettingInfo, SettingSource};

/// Resolves setting values for [`AppConfig`](super::AppConfig).
#[derive(Debug, Default, Clone)]
pub struct SettingsManager {
    overrides: HashMap<String, String>,
}

impl SettingsManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a setting value. Overrides win, then non-empty environment values,
    /// then the default.
    pub fn get_setting(&self, key: &str) -> Result<String, anyhow::Error> {
        self.resolve(key).map(|(value, _)| value)
    }

    /// Set an override with validation.
    pub fn set_setting(&mut self, key: &str, value: &str) -> Result<(), anyhow::Error> {
        if !DEFAULT_SETTINGS.contains_key(key) {
            anyhow::bail!("unknown setting key: {key}");
        }
        validate_setting(key, value).map_err(|e| anyhow::anyhow!("validation error for {key}: {e}"))?;
        self.overrides.insert(key.to_string(), value.to_string());
        Ok(())
    }

    /// Every known setting with its resolved value, sorted by key.
    pub fn get_all_settings(&self) -> Result<Vec<SettingInfo>, anyhow::Error> {
        let mut all = DEFAULT_SETTINGS
            .values()
            .map(|def| {
                let (value, source) = self.resolve(def.key)?;
                Ok(SettingInfo {
                    key: def.key.to_string(),
                    value,
                    source,
                    description: def.description.to_string(),
                })
            })
            .collect::<Result<Vec<_>, anyhow::Error>>()?;
        all.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(all)
    }

    fn resolve(&self, key: &str) -> Result<(String, SettingSource), anyhow::Error> {
        let def = DEFAULT_SETTINGS
            .get(key)
            .ok_or_else(|| anyhow::anyhow!("setting not found: {key}"))?;

        if let Some(val) = self.overrides.get(key) {
            return Ok((val.clone(), SettingSource::Override));
        }
        if let Ok(env_val) = std::env::var(key) {
            if !env_val.is_empty() {
                match validate_setting(key, &env_val) {
                    Ok(()) => return Ok((env_val, SettingSource::Environment)),
                    Err(e) => tracing::warn!("Ignoring {key} from environment: {e}"),
                }
            }
        }
        Ok((def.default.to_string(), SettingSource::Default))
    }
}
