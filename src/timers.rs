//! Cancellable scheduled callbacks
//!
//! Deadlines keyed by what they are for. The owner polls `next_deadline`,
//! sleeps until it, and fires whatever `take_due` returns. Rescheduling a key
//! replaces its deadline; cancelling or clearing guarantees it never fires,
//! so nothing runs against state that was torn down or superseded.

use std::collections::BTreeMap;
use tokio::time::Instant;

/// Keyed deadlines
#[derive(Debug, Clone)]
pub struct Timers<K: Ord + Clone> {
    deadlines: BTreeMap<K, Instant>,
}

impl<K: Ord + Clone> Timers<K> {
    /// Create an empty timer set
    pub fn new() -> Self {
        Self {
            deadlines: BTreeMap::new(),
        }
    }

    /// Schedule `key` at `at`, replacing any earlier schedule of it
    pub fn schedule(&mut self, key: K, at: Instant) {
        self.deadlines.insert(key, at);
    }

    /// Cancel `key`; returns whether it was scheduled
    pub fn cancel(&mut self, key: &K) -> bool {
        self.deadlines.remove(key).is_some()
    }

    /// Whether `key` is scheduled
    pub fn is_scheduled(&self, key: &K) -> bool {
        self.deadlines.contains_key(key)
    }

    /// Earliest pending deadline
    pub fn next_deadline(&self) -> Option<Instant> {
        self.deadlines.values().min().copied()
    }

    /// Remove and return every key due at `now`, earliest first
    pub fn take_due(&mut self, now: Instant) -> Vec<K> {
        let mut due: Vec<(Instant, K)> = self
            .deadlines
            .iter()
            .filter(|(_, at)| **at <= now)
            .map(|(key, at)| (*at, key.clone()))
            .collect();
        due.sort_by_key(|(at, _)| *at);

        for (_, key) in &due {
            self.deadlines.remove(key);
        }
        due.into_iter().map(|(_, key)| key).collect()
    }

    /// Cancel everything
    pub fn clear(&mut self) {
        self.deadlines.clear();
    }

    /// Number of scheduled keys
    pub fn len(&self) -> usize {
        self.deadlines.len()
    }

    /// Whether nothing is scheduled
    pub fn is_empty(&self) -> bool {
        self.deadlines.is_empty()
    }
}

impl<K: Ord + Clone> Default for Timers<K> {
    fn default() -> Self {
        Self::new()
    }
}
