//! Reply draft and reply-click highlight

use crate::model::{Message, ReplySnapshot};

/// Where the list should scroll after a reply click
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScrollTarget {
    /// Message to bring into view
    pub message_id: String,
    /// Its position in the rendered list
    pub index: usize,
}

/// Pending reply and the currently highlighted message
#[derive(Debug, Clone, Default)]
pub struct ReplyState {
    draft: Option<ReplySnapshot>,
    highlighted: Option<String>,
}

impl ReplyState {
    /// Create an empty state
    pub fn new() -> Self {
        Self::default()
    }

    /// Reply to `message`, replacing any earlier draft
    pub fn set_draft(&mut self, message: &Message) {
        self.draft = Some(ReplySnapshot::of(message));
    }

    /// Current draft
    pub fn draft(&self) -> Option<&ReplySnapshot> {
        self.draft.as_ref()
    }

    /// Remove and return the draft (on send)
    pub fn take_draft(&mut self) -> Option<ReplySnapshot> {
        self.draft.take()
    }

    /// Drop the draft (user cancelled)
    pub fn cancel_draft(&mut self) {
        self.draft = None;
    }

    /// Reply snippet clicked; look `message_id` up in the rendered list
    ///
    /// Missing targets (deleted or not loaded) are a silent no-op.
    pub fn click(&mut self, message_id: &str, rendered: &[Message]) -> Option<ScrollTarget> {
        let index = rendered.iter().position(|m| m.id == message_id)?;
        self.highlighted = Some(message_id.to_string());
        Some(ScrollTarget {
            message_id: message_id.to_string(),
            index,
        })
    }

    /// Currently highlighted message
    pub fn highlighted(&self) -> Option<&str> {
        self.highlighted.as_deref()
    }

    /// End the highlight
    pub fn clear_highlight(&mut self) {
        self.highlighted = None;
    }
}
