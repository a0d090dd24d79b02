//! Presence tracker
//!
//! Best-effort "is the peer viewing this conversation" flag for direct
//! conversations. Never authoritative and never persisted; each mount starts
//! from `Unknown`. Group conversations keep the tracker inert.

use crate::model::ChatContext;
use crate::protocol::{ClientEvent, ServerEvent, ViewerRef};
use tracing::debug;

/// Peer presence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Presence {
    /// No signal yet
    #[default]
    Unknown,
    /// Peer has the conversation open
    Online,
    /// Peer left or is not viewing
    Offline,
}

impl Presence {
    /// Header label; `Unknown` renders as offline
    pub fn label(&self) -> &'static str {
        match self {
            Presence::Online => "Online",
            Presence::Unknown | Presence::Offline => "Offline",
        }
    }
}

/// Presence state for one mounted screen
#[derive(Debug, Clone)]
pub struct PresenceTracker {
    conversation_id: String,
    peer_id: Option<String>,
    state: Presence,
}

impl PresenceTracker {
    /// Create a tracker for the context's conversation
    pub fn new(ctx: &ChatContext) -> Self {
        Self {
            conversation_id: ctx.conversation_id().to_string(),
            peer_id: ctx.peer_id().map(str::to_string),
            state: Presence::Unknown,
        }
    }

    /// Current presence
    pub fn state(&self) -> Presence {
        self.state
    }

    /// Whether the peer is known to be viewing
    pub fn is_online(&self) -> bool {
        self.state == Presence::Online
    }

    /// Whether this tracker follows a peer at all
    pub fn is_active(&self) -> bool {
        self.peer_id.is_some()
    }

    /// Seed from the viewer list of the join ack
    pub fn seed(&mut self, existing_viewers: &[String]) {
        let Some(peer_id) = self.peer_id.as_deref() else {
            return;
        };
        if existing_viewers.iter().any(|v| v == peer_id) {
            self.set(Presence::Online);
        }
    }

    /// Dispatch a live event; returns whether presence changed
    pub fn apply(&mut self, event: &ServerEvent) -> bool {
        let next = match event {
            ServerEvent::ViewerStatusChanged(s) if self.concerns(&s.conversation_id, &s.user_id) => {
                if s.is_viewing {
                    Presence::Online
                } else {
                    Presence::Offline
                }
            }
            ServerEvent::ViewerJoined(v) if self.concerns(&v.conversation_id, &v.user_id) => {
                Presence::Online
            }
            ServerEvent::ViewerLeft(v) if self.concerns(&v.conversation_id, &v.user_id) => {
                Presence::Offline
            }
            _ => return false,
        };
        self.set(next)
    }

    /// Viewer check request for the peer, if this is a direct conversation
    pub fn check_request(&self) -> Option<ClientEvent> {
        self.peer_id.as_ref().map(|peer_id| {
            ClientEvent::CheckConversationViewer(ViewerRef {
                conversation_id: self.conversation_id.clone(),
                user_id: peer_id.clone(),
            })
        })
    }

    fn concerns(&self, conversation_id: &str, user_id: &str) -> bool {
        conversation_id == self.conversation_id && self.peer_id.as_deref() == Some(user_id)
    }

    fn set(&mut self, next: Presence) -> bool {
        if self.state == next {
            return false;
        }
        debug!("Presence {:?} -> {:?}", self.state, next);
        self.state = next;
        true
    }
}
