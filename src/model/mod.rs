//! Chat data model
//!
//! The module is organized into submodules:
//! - `message` - Messages, reply snapshots and optimistic drafts
//! - `conversation` - Direct/group conversations and the per-screen context

pub mod conversation;
pub mod message;

pub use conversation::{ChatContext, Conversation, ConversationKind, UserProfile};
pub use message::{
    IMAGE_PLACEHOLDER, Message, MessageDraft, MessageKind, MessageState, ReplySnapshot,
    TEMP_ID_PREFIX,
};
