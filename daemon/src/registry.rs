//! Live notifications and id allocation.

use std::collections::HashMap;
use std::sync::Mutex;

use notification_store::Notification;

use crate::error::NotifyError;

/// In-memory map of every live notification. The store only shadows the
/// persistent ones.
#[derive(Debug, Default)]
pub struct Registry {
    live: HashMap<u32, Notification>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: u32) -> Option<&Notification> {
        self.live.get(&id)
    }

    pub fn get_mut(&mut self, id: u32) -> Option<&mut Notification> {
        self.live.get_mut(&id)
    }

    pub fn contains(&self, id: u32) -> bool {
        self.live.contains_key(&id)
    }

    /// Insert or replace by id, returning the previous entry.
    pub fn insert(&mut self, notification: Notification) -> Option<Notification> {
        self.live.insert(notification.id, notification)
    }

    pub fn remove(&mut self, id: u32) -> Option<Notification> {
        self.live.remove(&id)
    }

    /// Live ids in ascending order.
    pub fn ids(&self) -> Vec<u32> {
        let mut ids: Vec<u32> = self.live.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    pub fn len(&self) -> usize {
        self.live.len()
    }

    pub fn is_empty(&self) -> bool {
        self.live.is_empty()
    }
}

/// Hands out notification ids. 0 is never returned; it means "no id" on the
/// wire.
#[derive(Debug)]
pub struct IdAllocator {
    last: Mutex<u32>,
}

impl Default for IdAllocator {
    fn default() -> Self {
        Self::starting_after(0)
    }
}

impl IdAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// The first candidate will be `last + 1` (wrapping past `u32::MAX` to 1).
    pub fn starting_after(last: u32) -> Self {
        Self {
            last: Mutex::new(last),
        }
    }

    /// Next id for which `taken` is false. The whole check-and-advance runs
    /// under one lock.
    pub fn next_id(&self, mut taken: impl FnMut(u32) -> bool) -> Result<u32, NotifyError> {
        let mut last = self.last.lock().map_err(|_| NotifyError::LockPoisoned)?;
        let mut candidate = *last;

        for _ in 0..u32::MAX {
            candidate = successor(candidate);
            if !taken(candidate) {
                *last = candidate;
                return Ok(candidate);
            }
            tracing::debug!(id = candidate, "Notification id in use, trying next");
        }
        Err(NotifyError::IdSpaceExhausted)
    }
}

fn successor(id: u32) -> u32 {
    match id.wrapping_add(1) {
        0 => 1,
        next => next,
    }
}
