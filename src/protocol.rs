//! Protocol module
//!
//! This module defines the wire formats shared with the chat backend:
//! - JSON frames exchanged over the live connection, with ack correlation
//! - Outgoing client events and incoming server events
//! - REST payloads for conversations, users and message history
//! - Mapping of server message payloads into the canonical `Message`

use crate::model::{Message, MessageKind, MessageState, ReplySnapshot, UserProfile};
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Event name of ack replies
pub const ACK_EVENT: &str = "ack";

/// One JSON text frame on the live connection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    /// Event name
    pub event: String,
    /// Event payload
    #[serde(default)]
    pub data: Value,
    /// Ack id; set on requests expecting a reply and on the reply itself
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ack: Option<u64>,
}

impl Frame {
    /// Encode to a JSON string
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Decode from a JSON string
    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| Error::Protocol(format!("Malformed frame: {}", e)))
    }

    /// Whether this frame answers an earlier request
    pub fn is_ack(&self) -> bool {
        self.event == ACK_EVENT && self.ack.is_some()
    }
}

/// Conversation id payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationRef {
    /// Conversation id
    pub conversation_id: String,
}

/// Message id within a conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageRef {
    /// Message id
    pub message_id: String,
    /// Conversation id
    pub conversation_id: String,
}

/// User within a conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewerRef {
    /// Conversation id
    pub conversation_id: String,
    /// User id
    pub user_id: String,
}

/// Explicit viewer status answer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewerStatus {
    /// Conversation id
    pub conversation_id: String,
    /// User id
    pub user_id: String,
    /// Whether the user has the conversation open
    pub is_viewing: bool,
}

/// Payload of `send_message`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessage {
    /// Target conversation
    pub conversation_id: String,
    /// Text body
    pub content: String,
    /// Body kind
    #[serde(rename = "type")]
    pub kind: MessageKind,
    /// Id of the replied-to message
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply_to: Option<String>,
    /// Correlation id echoed back in the confirming `new_message`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
}

impl SendMessage {
    /// Build the send request for an optimistic entry
    pub fn for_pending(message: &Message) -> Self {
        Self {
            conversation_id: message.conversation_id.clone(),
            content: message.content.clone(),
            kind: message.kind,
            reply_to: message.reply_to.as_ref().map(|r| r.id.clone()),
            client_id: message.client_id.clone(),
        }
    }
}

/// Reply to `join_conversation`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinAck {
    /// Users currently viewing the conversation
    #[serde(default)]
    pub existing_viewers: Vec<String>,
}

/// Outgoing live-connection events
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientEvent {
    /// Enter the conversation room
    JoinConversation(ConversationRef),
    /// Leave the conversation room
    LeaveConversation(ConversationRef),
    /// Send a text message
    SendMessage(SendMessage),
    /// Delete one message
    DeleteMessage(MessageRef),
    /// Ask whether a user is viewing the conversation
    CheckConversationViewer(ViewerRef),
}

impl ClientEvent {
    /// Wire event name
    pub fn name(&self) -> &'static str {
        match self {
            ClientEvent::JoinConversation(_) => "join_conversation",
            ClientEvent::LeaveConversation(_) => "leave_conversation",
            ClientEvent::SendMessage(_) => "send_message",
            ClientEvent::DeleteMessage(_) => "delete_message",
            ClientEvent::CheckConversationViewer(_) => "check_conversation_viewer",
        }
    }

    /// Encode into a frame, optionally requesting an ack
    pub fn to_frame(&self, ack: Option<u64>) -> Result<Frame> {
        let data = match self {
            ClientEvent::JoinConversation(p) | ClientEvent::LeaveConversation(p) => {
                serde_json::to_value(p)?
            }
            ClientEvent::SendMessage(p) => serde_json::to_value(p)?,
            ClientEvent::DeleteMessage(p) => serde_json::to_value(p)?,
            ClientEvent::CheckConversationViewer(p) => serde_json::to_value(p)?,
        };

        Ok(Frame {
            event: self.name().to_string(),
            data,
            ack,
        })
    }
}

/// Incoming live-connection events
#[derive(Debug, Clone, PartialEq)]
pub enum ServerEvent {
    /// A message was created in a room we joined
    NewMessage(WireMessage),
    /// A message was deleted
    MessageDeleted(MessageRef),
    /// Answer to a viewer check
    ViewerStatusChanged(ViewerStatus),
    /// Someone opened the conversation
    ViewerJoined(ViewerRef),
    /// Someone left the conversation
    ViewerLeft(ViewerRef),
    /// Connection established
    Connected,
    /// Connection lost
    Disconnected,
}

impl ServerEvent {
    /// Decode a frame into a server event
    ///
    /// Returns `Ok(None)` for event names this client does not handle.
    pub fn from_frame(frame: Frame) -> Result<Option<Self>> {
        let event = match frame.event.as_str() {
            "new_message" => ServerEvent::NewMessage(decode(frame.data)?),
            "message_deleted" => ServerEvent::MessageDeleted(decode(frame.data)?),
            "conversation_viewer_status" => ServerEvent::ViewerStatusChanged(decode(frame.data)?),
            "user_joined_conversation" => ServerEvent::ViewerJoined(decode(frame.data)?),
            "user_left_conversation" => ServerEvent::ViewerLeft(decode(frame.data)?),
            "connect" => ServerEvent::Connected,
            "disconnect" => ServerEvent::Disconnected,
            _ => return Ok(None),
        };
        Ok(Some(event))
    }
}

fn decode<T: serde::de::DeserializeOwned>(data: Value) -> Result<T> {
    serde_json::from_value(data).map_err(|e| Error::Protocol(format!("Malformed payload: {}", e)))
}

/// Nested sender object of a message payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireUser {
    /// User id
    #[serde(alias = "_id")]
    pub id: String,
    /// Display name
    #[serde(default)]
    pub display_name: Option<String>,
    /// Avatar URL
    #[serde(default)]
    pub avatar: Option<String>,
}

/// Reply snapshot as the server sends it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireReply {
    /// Replied-to message id
    #[serde(alias = "_id")]
    pub id: String,
    /// Content at reply time
    #[serde(default)]
    pub content: String,
    /// Nested author
    #[serde(default)]
    pub sender: Option<WireUser>,
    /// Flat author id
    #[serde(default)]
    pub sender_id: Option<String>,
}

/// Message payload from `new_message` and the history endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireMessage {
    /// Server id
    #[serde(alias = "_id")]
    pub id: String,
    /// Owning conversation
    #[serde(default)]
    pub conversation_id: Option<String>,
    /// Nested author
    #[serde(default)]
    pub sender: Option<WireUser>,
    /// Flat author id
    #[serde(default)]
    pub sender_id: Option<String>,
    /// Text body or caption
    #[serde(default)]
    pub content: String,
    /// Body kind
    #[serde(rename = "type", default)]
    pub kind: MessageKind,
    /// Image location
    #[serde(default, alias = "fileUrl")]
    pub attachment_url: Option<String>,
    /// Server timestamp
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    /// Reply snapshot
    #[serde(default)]
    pub reply_to: Option<WireReply>,
    /// Echoed correlation id
    #[serde(default)]
    pub client_id: Option<String>,
}

impl WireMessage {
    /// Map into the canonical message shape
    ///
    /// `fallback_conversation_id` fills in payloads that omit the conversation.
    pub fn into_message(self, fallback_conversation_id: &str) -> Result<Message> {
        let sender_id = self
            .sender_id
            .or_else(|| self.sender.map(|s| s.id))
            .ok_or_else(|| Error::Protocol(format!("Message {} has no sender", self.id)))?;

        let reply_to = self.reply_to.map(|r| ReplySnapshot {
            sender_id: r
                .sender_id
                .or_else(|| r.sender.map(|s| s.id))
                .unwrap_or_default(),
            id: r.id,
            content: r.content,
        });

        Ok(Message {
            id: self.id,
            conversation_id: self
                .conversation_id
                .unwrap_or_else(|| fallback_conversation_id.to_string()),
            sender_id,
            content: self.content,
            kind: self.kind,
            attachment_url: self.attachment_url,
            created_at: self.created_at.unwrap_or_else(Utc::now),
            reply_to,
            state: MessageState::Confirmed,
            client_id: self.client_id,
        })
    }
}

/// Body of `POST /chat/conversations`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateConversationRequest {
    /// The other party
    pub participant_id: String,
}

/// Response carrying just a conversation id
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationId {
    /// Conversation id
    #[serde(alias = "_id")]
    pub id: String,
}

/// Response of `GET /chat/conversations/{id}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationDetail {
    /// Conversation id
    #[serde(alias = "_id")]
    pub id: String,
    /// Group flag
    #[serde(default)]
    pub is_group: bool,
    /// Group display name
    #[serde(default)]
    pub group_name: Option<String>,
    /// Group members
    #[serde(default)]
    pub participants: Vec<UserProfile>,
    /// Direct peer
    #[serde(default)]
    pub participant: Option<UserProfile>,
}

/// Response of `GET /chat/conversations/{id}/messages`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MessagesResponse {
    /// Full history, oldest first
    #[serde(default)]
    pub messages: Vec<WireMessage>,
}
