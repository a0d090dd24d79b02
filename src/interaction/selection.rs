//! Long-press multi-select
//!
//! A hold on a bubble, started while nothing is selected and kept still for
//! the long-press duration, enters selection mode with that bubble selected.
//! In selection mode taps toggle membership. Movement or release during the
//! hold cancels it. The owner schedules the hold deadline and calls
//! `complete_press` when it fires.

use crate::store::MessageStore;
use crate::{Error, Result};
use std::collections::BTreeSet;
use tracing::debug;

/// Selection set plus the pending long-press, if any
#[derive(Debug, Clone, Default)]
pub struct SelectionState {
    selected: BTreeSet<String>,
    pressing: Option<String>,
}

impl SelectionState {
    /// Create an empty selection
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether selection mode is on
    pub fn is_active(&self) -> bool {
        !self.selected.is_empty()
    }

    /// Start a hold on `message_id`; refused while a selection exists
    pub fn press_start(&mut self, message_id: &str) -> bool {
        if self.is_active() {
            return false;
        }
        self.pressing = Some(message_id.to_string());
        true
    }

    /// Movement or release before the hold completed
    ///
    /// Returns the id whose hold was cancelled.
    pub fn cancel_press(&mut self) -> Option<String> {
        self.pressing.take()
    }

    /// The hold on `message_id` lasted long enough
    pub fn complete_press(&mut self, message_id: &str) -> bool {
        if self.pressing.as_deref() != Some(message_id) || self.is_active() {
            return false;
        }
        self.pressing = None;
        self.selected.insert(message_id.to_string());
        debug!("Selection mode entered with {}", message_id);
        true
    }

    /// Id of the hold in progress
    pub fn pressing(&self) -> Option<&str> {
        self.pressing.as_deref()
    }

    /// Toggle `message_id` while in selection mode
    ///
    /// Returns whether it is selected afterwards.
    pub fn toggle(&mut self, message_id: &str) -> bool {
        if !self.is_active() {
            return false;
        }
        if self.selected.remove(message_id) {
            false
        } else {
            self.selected.insert(message_id.to_string());
            true
        }
    }

    /// Drop an id that disappeared from the store
    pub fn forget(&mut self, message_id: &str) {
        self.selected.remove(message_id);
    }

    /// Leave selection mode
    pub fn clear(&mut self) {
        self.selected.clear();
        self.pressing = None;
    }

    /// Whether `message_id` is selected
    pub fn contains(&self, message_id: &str) -> bool {
        self.selected.contains(message_id)
    }

    /// Number of selected messages
    pub fn count(&self) -> usize {
        self.selected.len()
    }

    /// Selected ids
    pub fn selected(&self) -> impl Iterator<Item = &str> {
        self.selected.iter().map(String::as_str)
    }

    /// Check the selection can be deleted by `local_user_id`
    ///
    /// All or nothing: one foreign message rejects the whole batch. Ids that
    /// are no longer in the store are skipped, as are entries still waiting
    /// for the server since they have no server id to delete by.
    pub fn validate_delete(&self, store: &MessageStore, local_user_id: &str) -> Result<Vec<String>> {
        let present: Vec<_> = self
            .selected
            .iter()
            .filter_map(|id| store.get(id))
            .filter(|m| m.is_confirmed())
            .collect();

        if present.is_empty() {
            return Err(Error::Validation("No messages selected".to_string()));
        }

        if present.iter().any(|m| !m.is_own(local_user_id)) {
            return Err(Error::Unauthorized(
                "You can only delete your own messages".to_string(),
            ));
        }

        Ok(present.into_iter().map(|m| m.id.clone()).collect())
    }
}
