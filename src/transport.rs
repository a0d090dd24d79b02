//! Live connection transport
//!
//! This module handles the bidirectional channel to the chat backend:
//! - `Socket` - emit events, emit-with-ack requests, disconnect
//! - `Connector` - establish an authenticated connection
//! - `WsConnector` - WebSocket implementation over tokio-tungstenite
//!
//! Incoming events are delivered in arrival order on an unbounded channel.
//! There is no offline queue: emitting on a closed socket fails.

use crate::protocol::{ClientEvent, Frame, ServerEvent};
use crate::{Error, Result};
use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, Mutex};
use tokio::task::JoinHandle;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::header::AUTHORIZATION;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tracing::{debug, error, info, warn};

/// Receiving side of a connection's event stream
pub type EventReceiver = mpsc::UnboundedReceiver<ServerEvent>;

/// An open live connection
#[async_trait]
pub trait Socket: Send + Sync {
    /// Fire-and-forget emit
    async fn emit(&self, event: ClientEvent) -> Result<()>;

    /// Emit and wait for the matching ack payload
    async fn request(&self, event: ClientEvent) -> Result<Value>;

    /// Terminate the connection; idempotent
    async fn disconnect(&self);
}

/// Factory for authenticated connections
#[async_trait]
pub trait Connector: Send + Sync {
    /// Connect and authenticate with `credential`
    async fn connect(&self, credential: &str) -> Result<(Arc<dyn Socket>, EventReceiver)>;
}

pub(crate) type PendingAcks = Arc<Mutex<HashMap<u64, oneshot::Sender<Value>>>>;

/// WebSocket connector
#[derive(Debug, Clone)]
pub struct WsConnector {
    url: String,
    ack_timeout: Duration,
}

impl WsConnector {
    /// Create a connector for `url`
    pub fn new(url: impl Into<String>, ack_timeout: Duration) -> Self {
        Self {
            url: url.into(),
            ack_timeout,
        }
    }
}

#[async_trait]
impl Connector for WsConnector {
    async fn connect(&self, credential: &str) -> Result<(Arc<dyn Socket>, EventReceiver)> {
        info!("Connecting to {}", self.url);

        let mut request = self.url.as_str().into_client_request()?;
        let bearer = HeaderValue::from_str(&format!("Bearer {}", credential))
            .map_err(|e| Error::Validation(format!("Invalid credential: {}", e)))?;
        request.headers_mut().insert(AUTHORIZATION, bearer);

        let (stream, _) = connect_async(request).await?;
        let (mut sink, mut source) = stream.split();

        let (outgoing_tx, mut outgoing_rx) = mpsc::unbounded_channel::<WsMessage>();
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let pending: PendingAcks = Arc::new(Mutex::new(HashMap::new()));
        let peer_closed = Arc::new(AtomicBool::new(false));

        let writer = tokio::spawn(async move {
            while let Some(message) = outgoing_rx.recv().await {
                let closing = matches!(message, WsMessage::Close(_));
                if let Err(e) = sink.send(message).await {
                    error!("Failed to write frame: {}", e);
                    break;
                }
                if closing {
                    break;
                }
            }
        });

        let _ = events_tx.send(ServerEvent::Connected);

        let reader_pending = pending.clone();
        let reader_closed = peer_closed.clone();
        let reader = tokio::spawn(async move {
            while let Some(next) = source.next().await {
                match next {
                    Ok(WsMessage::Text(text)) => {
                        route_frame(&text, &reader_pending, &events_tx).await;
                    }
                    Ok(WsMessage::Close(_)) => break,
                    Ok(_) => {}
                    Err(e) => {
                        warn!("Connection read failed: {}", e);
                        break;
                    }
                }
            }
            reader_closed.store(true, Ordering::SeqCst);
            reader_pending.lock().await.clear();
            let _ = events_tx.send(ServerEvent::Disconnected);
            debug!("Reader task finished");
        });

        let socket = WsSocket::new(outgoing_tx, pending, peer_closed, self.ack_timeout)
            .with_tasks(vec![writer, reader]);

        info!("Connected to {}", self.url);
        Ok((Arc::new(socket), events_rx))
    }
}

async fn route_frame(
    text: &str,
    pending: &PendingAcks,
    events: &mpsc::UnboundedSender<ServerEvent>,
) {
    let frame = match Frame::from_json(text) {
        Ok(frame) => frame,
        Err(e) => {
            warn!("Dropping frame: {}", e);
            return;
        }
    };

    if frame.is_ack() {
        if let Some(id) = frame.ack {
            if let Some(waiter) = pending.lock().await.remove(&id) {
                let _ = waiter.send(frame.data);
            }
        }
        return;
    }

    match ServerEvent::from_frame(frame) {
        Ok(Some(event)) => {
            let _ = events.send(event);
        }
        Ok(None) => {}
        Err(e) => warn!("Dropping event: {}", e),
    }
}

/// WebSocket-backed `Socket`
pub struct WsSocket {
    outgoing: mpsc::UnboundedSender<WsMessage>,
    pending: PendingAcks,
    next_ack: AtomicU64,
    ack_timeout: Duration,
    closed: AtomicBool,
    peer_closed: Arc<AtomicBool>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl WsSocket {
    /// Socket writing frames to `outgoing`
    ///
    /// `peer_closed` is set by whoever reads the connection once it ends.
    pub(crate) fn new(
        outgoing: mpsc::UnboundedSender<WsMessage>,
        pending: PendingAcks,
        peer_closed: Arc<AtomicBool>,
        ack_timeout: Duration,
    ) -> Self {
        Self {
            outgoing,
            pending,
            next_ack: AtomicU64::new(1),
            ack_timeout,
            closed: AtomicBool::new(false),
            peer_closed,
            tasks: Mutex::new(Vec::new()),
        }
    }

    fn with_tasks(self, tasks: Vec<JoinHandle<()>>) -> Self {
        Self {
            tasks: Mutex::new(tasks),
            ..self
        }
    }

    /// Requests still waiting for their ack
    #[cfg(test)]
    pub(crate) async fn pending_acks(&self) -> usize {
        self.pending.lock().await.len()
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst) || self.peer_closed.load(Ordering::SeqCst)
    }

    fn write(&self, frame: Frame) -> Result<()> {
        if self.is_closed() {
            return Err(Error::Closed);
        }
        let text = frame.to_json()?;
        self.outgoing
            .send(WsMessage::Text(text))
            .map_err(|_| Error::Closed)
    }
}

#[async_trait]
impl Socket for WsSocket {
    async fn emit(&self, event: ClientEvent) -> Result<()> {
        debug!("Emitting {}", event.name());
        self.write(event.to_frame(None)?)
    }

    async fn request(&self, event: ClientEvent) -> Result<Value> {
        let id = self.next_ack.fetch_add(1, Ordering::SeqCst);
        let frame = event.to_frame(Some(id))?;
        let (tx, rx) = oneshot::channel();
        self.pending.lock().await.insert(id, tx);

        debug!("Requesting {} (ack {})", event.name(), id);
        if let Err(e) = self.write(frame) {
            self.pending.lock().await.remove(&id);
            return Err(e);
        }

        match tokio::time::timeout(self.ack_timeout, rx).await {
            Ok(Ok(data)) => Ok(data),
            Ok(Err(_)) => Err(Error::Closed),
            Err(_) => {
                self.pending.lock().await.remove(&id);
                Err(Error::Network(format!("No ack for {}", event.name())))
            }
        }
    }

    async fn disconnect(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        let _ = self.outgoing.send(WsMessage::Close(None));
        // Writer exits after flushing the close frame.
        let mut tasks = self.tasks.lock().await;
        if let Some(reader) = tasks.pop() {
            reader.abort();
        }
        tasks.clear();
        self.pending.lock().await.clear();
        info!("Connection closed");
    }
}
