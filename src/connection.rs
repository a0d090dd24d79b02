//! Connection manager
//!
//! Owns the single live connection of the mounted chat screen: connects with
//! the credential, joins the conversation room, and on close leaves the room
//! and terminates the connection. Opening while another connection is still
//! live closes the previous one first, so a remount never ends up with
//! duplicate room membership or duplicate event delivery.

use crate::protocol::{ClientEvent, ConversationRef, JoinAck};
use crate::transport::{Connector, EventReceiver, Socket};
use crate::Result;
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Opaque handle to an open connection
#[derive(Clone)]
pub struct ConnectionHandle {
    id: u64,
    socket: Arc<dyn Socket>,
}

impl ConnectionHandle {
    /// Fire-and-forget emit
    pub async fn emit(&self, event: ClientEvent) -> Result<()> {
        self.socket.emit(event).await
    }

    /// Emit and wait for the ack payload
    pub async fn request(&self, event: ClientEvent) -> Result<Value> {
        self.socket.request(event).await
    }
}

impl std::fmt::Debug for ConnectionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionHandle").field("id", &self.id).finish()
    }
}

/// Result of opening a connection
pub struct OpenedConnection {
    /// Handle for emits and for `close`
    pub handle: ConnectionHandle,
    /// Incoming events in arrival order
    pub events: EventReceiver,
    /// Viewers reported by the join ack
    pub existing_viewers: Vec<String>,
}

struct LiveRoom {
    handle_id: u64,
    socket: Arc<dyn Socket>,
    conversation_id: String,
}

/// Owner of the one live connection
#[derive(Clone)]
pub struct ConnectionManager {
    connector: Arc<dyn Connector>,
    live: Arc<Mutex<Option<LiveRoom>>>,
    next_id: Arc<AtomicU64>,
}

impl ConnectionManager {
    /// Create a manager around `connector`
    pub fn new(connector: Arc<dyn Connector>) -> Self {
        Self {
            connector,
            live: Arc::new(Mutex::new(None)),
            next_id: Arc::new(AtomicU64::new(1)),
        }
    }

    /// Connect, authenticate and join `conversation_id`
    ///
    /// A still-live previous connection is closed before the new one opens.
    pub async fn open(&self, conversation_id: &str, credential: &str) -> Result<OpenedConnection> {
        let mut live = self.live.lock().await;
        if let Some(previous) = live.take() {
            info!(
                "Closing previous connection for {} before reopening",
                previous.conversation_id
            );
            close_room(previous).await;
        }

        let (socket, events) = self.connector.connect(credential).await?;

        let join = ClientEvent::JoinConversation(ConversationRef {
            conversation_id: conversation_id.to_string(),
        });
        let ack = match socket.request(join).await {
            Ok(ack) => ack,
            Err(e) => {
                socket.disconnect().await;
                return Err(e);
            }
        };
        let existing_viewers = match serde_json::from_value::<JoinAck>(ack) {
            Ok(ack) => ack.existing_viewers,
            Err(e) => {
                warn!("Join ack unreadable, assuming no viewers: {}", e);
                Vec::new()
            }
        };

        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        *live = Some(LiveRoom {
            handle_id: id,
            socket: socket.clone(),
            conversation_id: conversation_id.to_string(),
        });

        info!(
            "Joined conversation {} ({} viewers present)",
            conversation_id,
            existing_viewers.len()
        );

        Ok(OpenedConnection {
            handle: ConnectionHandle { id, socket },
            events,
            existing_viewers,
        })
    }

    /// Leave the room and terminate the connection behind `handle`
    ///
    /// A handle already superseded by a newer `open` is ignored.
    pub async fn close(&self, handle: &ConnectionHandle) {
        let mut live = self.live.lock().await;
        match live.as_ref() {
            Some(room) if room.handle_id == handle.id => {
                if let Some(room) = live.take() {
                    close_room(room).await;
                }
            }
            _ => debug!("Connection {} already closed", handle.id),
        }
    }

    /// Whether a connection is currently live
    pub async fn is_live(&self) -> bool {
        self.live.lock().await.is_some()
    }
}

async fn close_room(room: LiveRoom) {
    let leave = ClientEvent::LeaveConversation(ConversationRef {
        conversation_id: room.conversation_id.clone(),
    });
    if let Err(e) = room.socket.emit(leave).await {
        debug!("Leave for {} not delivered: {}", room.conversation_id, e);
    }
    room.socket.disconnect().await;
    info!("Left conversation {}", room.conversation_id);
}
