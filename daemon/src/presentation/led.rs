//! LED patterns are shared by name: the first holder turns a pattern on and
//! the last one to close turns it off.

use std::collections::HashMap;

#[derive(Debug, Default)]
pub struct LedPatterns {
    holders: HashMap<u32, String>,
    counts: HashMap<String, usize>,
}

impl LedPatterns {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `id` as a holder of `pattern`. Returns `true` when the pattern
    /// has to be activated.
    pub fn hold(&mut self, id: u32, pattern: &str) -> bool {
        if self.holders.contains_key(&id) {
            return false;
        }
        self.holders.insert(id, pattern.to_string());
        let count = self.counts.entry(pattern.to_string()).or_insert(0);
        *count += 1;
        *count == 1
    }

    /// Drop the pattern held by `id`. Returns the pattern when it has to be
    /// deactivated.
    pub fn release(&mut self, id: u32) -> Option<String> {
        let pattern = self.holders.remove(&id)?;
        let count = self.counts.get_mut(&pattern)?;
        *count -= 1;
        if *count > 0 {
            return None;
        }
        self.counts.remove(&pattern);
        Some(pattern)
    }

    pub fn is_active(&self, pattern: &str) -> bool {
        self.counts.contains_key(pattern)
    }
}
