//! Message structures and send state tracking

use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Prefix of client-assigned ids for optimistic entries
pub const TEMP_ID_PREFIX: &str = "temp-";

/// Content used for image messages sent without a caption
pub const IMAGE_PLACEHOLDER: &str = "[image]";

/// Message body kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    /// Plain text
    #[default]
    Text,
    /// Image attachment with optional caption
    Image,
}

impl MessageKind {
    /// Wire name of this kind
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageKind::Text => "text",
            MessageKind::Image => "image",
        }
    }
}

/// Lifecycle of a message inside the store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageState {
    /// Optimistic entry awaiting server confirmation
    Pending,
    /// Server-confirmed, immutable
    #[default]
    Confirmed,
    /// Optimistic send that was never confirmed in time
    Failed,
}

/// Snapshot of a message taken at the moment it was replied to
///
/// Not a live pointer: the original may be deleted later while the snapshot
/// stays renderable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplySnapshot {
    /// Id of the replied-to message
    pub id: String,
    /// Author of the replied-to message
    pub sender_id: String,
    /// Content at the time of reply
    pub content: String,
}

impl ReplySnapshot {
    /// Capture a snapshot of `message`
    pub fn of(message: &Message) -> Self {
        Self {
            id: message.id.clone(),
            sender_id: message.sender_id.clone(),
            content: message.content.clone(),
        }
    }
}

/// Text the user is about to send
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageDraft {
    /// Text body
    pub content: String,
    /// Optional reply target
    pub reply_to: Option<ReplySnapshot>,
}

impl MessageDraft {
    /// Create a draft without a reply target
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            reply_to: None,
        }
    }

    /// Attach a reply target
    pub fn replying_to(mut self, reply_to: Option<ReplySnapshot>) -> Self {
        self.reply_to = reply_to;
        self
    }
}

/// A chat message in canonical shape
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    /// Server id, or a `temp-` id while pending
    pub id: String,
    /// Owning conversation
    pub conversation_id: String,
    /// Author identity
    pub sender_id: String,
    /// Text body, caption, or the image placeholder
    pub content: String,
    /// Body kind
    pub kind: MessageKind,
    /// Image location, present for image messages
    #[serde(default)]
    pub attachment_url: Option<String>,
    /// Creation time (server-assigned once confirmed)
    pub created_at: DateTime<Utc>,
    /// Reply snapshot, if this message answers another
    #[serde(default)]
    pub reply_to: Option<ReplySnapshot>,
    /// Store lifecycle state
    #[serde(default)]
    pub state: MessageState,
    /// Client correlation id carried by optimistic sends
    #[serde(default)]
    pub client_id: Option<String>,
}

impl Message {
    /// Create an optimistic text entry for `draft`
    pub fn optimistic(
        draft: MessageDraft,
        conversation_id: &str,
        sender_id: &str,
        now: DateTime<Utc>,
    ) -> Self {
        let client_id = Uuid::new_v4().to_string();
        let id = format!(
            "{}{}-{}",
            TEMP_ID_PREFIX,
            now.timestamp_millis(),
            &client_id[..8]
        );

        Self {
            id,
            conversation_id: conversation_id.to_string(),
            sender_id: sender_id.to_string(),
            content: draft.content,
            kind: MessageKind::Text,
            attachment_url: None,
            created_at: now,
            reply_to: draft.reply_to,
            state: MessageState::Pending,
            client_id: Some(client_id),
        }
    }

    /// Whether the id was assigned locally
    pub fn has_temp_id(&self) -> bool {
        self.id.starts_with(TEMP_ID_PREFIX)
    }

    /// Whether the message awaits confirmation
    pub fn is_pending(&self) -> bool {
        self.state == MessageState::Pending
    }

    /// Whether the optimistic send was given up on
    pub fn is_failed(&self) -> bool {
        self.state == MessageState::Failed
    }

    /// Whether the server has acknowledged this message
    pub fn is_confirmed(&self) -> bool {
        self.state == MessageState::Confirmed
    }

    /// Whether `local_user_id` authored this message
    pub fn is_own(&self, local_user_id: &str) -> bool {
        self.sender_id == local_user_id
    }

    /// Mark an optimistic entry as failed
    pub fn mark_failed(&mut self) {
        if self.state == MessageState::Pending {
            self.state = MessageState::Failed;
        }
    }

    /// Put a failed entry back into pending for a manual retry
    pub fn mark_pending(&mut self) {
        if self.state == MessageState::Failed {
            self.state = MessageState::Pending;
        }
    }

    /// Local wall-clock time for the bubble footer
    pub fn display_time(&self) -> String {
        self.created_at.with_timezone(&Local).format("%H:%M").to_string()
    }

    /// Short status glyph for own messages
    pub fn status_indicator(&self) -> &str {
        match self.state {
            MessageState::Pending => "↻",
            MessageState::Confirmed => "✓",
            MessageState::Failed => "✗",
        }
    }
}
