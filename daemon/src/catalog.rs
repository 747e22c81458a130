//! Category catalog: the static display and behavior policy per category.
//!
//! The catalog is read once at startup from a JSON object keyed by category:
//!
//! ```json
//! {
//!   "chat.message": {
//!     "group": "chat",
//!     "title-text": "Chat",
//!     "dbus-call": "org.example.Chat /org/example/Chat org.example.Chat Open",
//!     "split-in-threads": "thread"
//!   },
//!   "battery.charging": { "no-window": true }
//! }
//! ```

use std::collections::{HashMap, HashSet};
use std::path::Path;

use call_descriptor::CallDescriptor;
use serde::{Deserialize, Serialize};

/// Resolves user visible strings at load time.
pub trait Translator: Send + Sync {
    fn translate(&self, domain: Option<&str>, text: &str) -> String;
}

/// Leaves every string untouched.
#[derive(Debug, Default, Clone, Copy)]
pub struct Untranslated;

impl Translator for Untranslated {
    fn translate(&self, _domain: Option<&str>, text: &str) -> String {
        text.to_string()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CategoryInfo {
    pub group: Option<String>,
    pub destination: Option<String>,
    pub title_text: Option<String>,
    pub secondary_text: Option<String>,
    pub icon: Option<String>,
    pub dbus_call: Option<CallDescriptor>,
    pub account_hint: Option<String>,
    pub account_call: Option<CallDescriptor>,
    pub led_pattern: Option<String>,
    pub split_in_threads: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum CategoryPolicy {
    /// Never presented; only side effects apply.
    NoWindow,
    Windowed(CategoryInfo),
}

/// A windowed entry as written in the file. `no-window` entries never get here.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct RawEntry {
    group: Option<String>,
    destination: Option<String>,
    title_text: Option<String>,
    secondary_text: Option<String>,
    icon: Option<String>,
    dbus_call: Option<String>,
    account_hint: Option<String>,
    account_call: Option<String>,
    led_pattern: Option<String>,
    split_in_threads: Option<String>,
    text_domain: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("failed to read catalog: {0}")]
    Io(#[from] std::io::Error),
    #[error("catalog is not a JSON object: {0}")]
    Format(#[from] serde_json::Error),
}

#[derive(Debug, Default, Clone)]
pub struct CategoryCatalog {
    entries: HashMap<String, CategoryPolicy>,
    rejected: HashSet<String>,
}

impl CategoryCatalog {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Read the catalog file. Failures leave the catalog empty.
    pub fn load(path: &Path, translator: &dyn Translator) -> Self {
        let parsed = std::fs::read_to_string(path)
            .map_err(CatalogError::from)
            .and_then(|text| Self::from_json_str(&text, translator));
        match parsed {
            Ok(catalog) => {
                tracing::info!(
                    path = %path.display(),
                    categories = catalog.len(),
                    "Category catalog loaded"
                );
                catalog
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), "Category catalog unavailable: {e}");
                Self::empty()
            }
        }
    }

    /// Parse a catalog; entries that do not parse are skipped.
    pub fn from_json_str(text: &str, translator: &dyn Translator) -> Result<Self, CatalogError> {
        let raw: HashMap<String, serde_json::Value> = serde_json::from_str(text)?;
        let mut catalog = Self::empty();

        for (category, value) in raw {
            if value.get("no-window").and_then(serde_json::Value::as_bool) == Some(true) {
                catalog.entries.insert(category, CategoryPolicy::NoWindow);
                continue;
            }
            let entry = match serde_json::from_value::<RawEntry>(value) {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::warn!(category = %category, "Skipping malformed category entry: {e}");
                    catalog.rejected.insert(category);
                    continue;
                }
            };
            match build_policy(entry, translator) {
                Ok(policy) => {
                    catalog.entries.insert(category, policy);
                }
                Err(e) => {
                    tracing::warn!(category = %category, "Skipping category entry: {e}");
                    catalog.rejected.insert(category);
                }
            }
        }
        Ok(catalog)
    }

    pub fn resolve(&self, category: &str) -> Option<&CategoryPolicy> {
        self.entries.get(category)
    }

    /// Category info for windowed categories.
    pub fn info(&self, category: &str) -> Option<&CategoryInfo> {
        match self.resolve(category)? {
            CategoryPolicy::Windowed(info) => Some(info),
            CategoryPolicy::NoWindow => None,
        }
    }

    pub fn is_no_window(&self, category: &str) -> bool {
        matches!(self.resolve(category), Some(CategoryPolicy::NoWindow))
    }

    /// Whether the category had an entry that failed to load.
    pub fn is_rejected(&self, category: &str) -> bool {
        self.rejected.contains(category)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn insert(&mut self, category: impl Into<String>, policy: CategoryPolicy) {
        let category = category.into();
        self.rejected.remove(&category);
        self.entries.insert(category, policy);
    }
}

fn build_policy(
    entry: RawEntry,
    translator: &dyn Translator,
) -> Result<CategoryPolicy, call_descriptor::DescriptorError> {
    let domain = entry.text_domain.as_deref();
    let translate = |text: Option<String>| text.map(|t| translator.translate(domain, &t));
    let descriptor = |desc: Option<String>| desc.as_deref().map(CallDescriptor::parse).transpose();

    Ok(CategoryPolicy::Windowed(CategoryInfo {
        group: entry.group.filter(|g| !g.is_empty()),
        destination: entry.destination,
        title_text: translate(entry.title_text),
        secondary_text: translate(entry.secondary_text),
        icon: entry.icon,
        dbus_call: descriptor(entry.dbus_call)?,
        account_hint: entry.account_hint,
        account_call: descriptor(entry.account_call)?,
        led_pattern: entry.led_pattern.filter(|p| !p.is_empty()),
        split_in_threads: entry.split_in_threads.filter(|h| !h.is_empty()),
    }))
}
