//! Conversation descriptions and the per-screen chat context

use serde::{Deserialize, Serialize};

/// Public profile of a chat participant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    /// User id
    #[serde(alias = "_id")]
    pub id: String,
    /// Name shown in headers and bubbles
    pub display_name: String,
    /// Avatar URL
    #[serde(default)]
    pub avatar: Option<String>,
    /// Handle, when the backend provides one
    #[serde(default)]
    pub username: Option<String>,
}

/// Direct or group conversation details
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConversationKind {
    /// Two-party conversation
    Direct {
        /// The other party
        peer: UserProfile,
    },
    /// Multi-party conversation
    Group {
        /// Group display name
        name: String,
        /// Members, in no particular order
        participants: Vec<UserProfile>,
    },
}

/// A resolved conversation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conversation {
    /// Canonical conversation id
    pub id: String,
    /// Direct peer or group info
    pub kind: ConversationKind,
}

impl Conversation {
    /// Whether this is a group conversation
    pub fn is_group(&self) -> bool {
        matches!(self.kind, ConversationKind::Group { .. })
    }

    /// The direct peer, if any
    pub fn peer(&self) -> Option<&UserProfile> {
        match &self.kind {
            ConversationKind::Direct { peer } => Some(peer),
            ConversationKind::Group { .. } => None,
        }
    }

    /// Header title: peer name or group name
    pub fn title(&self) -> &str {
        match &self.kind {
            ConversationKind::Direct { peer } => &peer.display_name,
            ConversationKind::Group { name, .. } => name,
        }
    }

    /// Header avatar, direct conversations only
    pub fn avatar(&self) -> Option<&str> {
        self.peer().and_then(|p| p.avatar.as_deref())
    }
}

/// Explicit context handed to every chat operation
///
/// Carries the conversation metadata so the connection handle stays opaque
/// transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatContext {
    /// The open conversation
    pub conversation: Conversation,
    /// Identity of the local user
    pub local_user_id: String,
    /// Whether the chat screen currently has focus
    pub focused: bool,
}

impl ChatContext {
    /// Create a focused context
    pub fn new(conversation: Conversation, local_user_id: impl Into<String>) -> Self {
        Self {
            conversation,
            local_user_id: local_user_id.into(),
            focused: true,
        }
    }

    /// Canonical conversation id
    pub fn conversation_id(&self) -> &str {
        &self.conversation.id
    }

    /// Id of the direct peer, if any
    pub fn peer_id(&self) -> Option<&str> {
        self.conversation.peer().map(|p| p.id.as_str())
    }
}
