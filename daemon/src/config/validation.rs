//! Setting value validation.

use regex::Regex;
use std::sync::LazyLock;

static RE_BUS_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z_-][A-Za-z0-9_-]*(\.[A-Za-z_-][A-Za-z0-9_-]*)+$").unwrap()
});
static RE_FILE_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9._-]+$").unwrap());

/// Validate a setting value. Returns `Ok(())` if valid, or an error message.
pub fn validate_setting(key: &str, value: &str) -> Result<(), String> {
    match key {
        "NOTIFYD_DB_FILE" => {
            if !RE_FILE_NAME.is_match(value) || value == "." || value == ".." {
                return Err("must be a plain file name".into());
            }
        }
        "NOTIFYD_COMMIT_DELAY_SECS" => validate_int_range(value, 0, 3600)?,
        "NOTIFYD_COMMIT_CHECK_INTERVAL_SECS" => validate_int_range(value, 1, 3600)?,
        "NOTIFYD_BUS_NAME" => {
            if value.len() > 255 || !RE_BUS_NAME.is_match(value) {
                return Err("invalid well-known bus name".into());
            }
        }
        k if is_boolean_setting(k) => {
            if value != "true" && value != "false" {
                return Err("must be 'true' or 'false'".into());
            }
        }
        _ => {}
    }
    Ok(())
}

fn validate_int_range(value: &str, min: i64, max: i64) -> Result<(), String> {
    let v: i64 = value.parse().map_err(|_| "must be an integer")?;
    if v < min || v > max {
        return Err(format!("must be between {min} and {max}"));
    }
    Ok(())
}

fn is_boolean_setting(key: &str) -> bool {
    matches!(
        key,
        "NOTIFYD_PERSISTENCE_ENABLED" | "NOTIFYD_WAKE_DISPLAY" | "NOTIFYD_MCE_ENABLED"
    )
}
