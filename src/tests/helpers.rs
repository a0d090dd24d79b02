// Shared fakes and fixtures

use crate::api::{ChatApi, ImageUpload};
use crate::connection::ConnectionManager;
use crate::model::{Message, UserProfile};
use crate::protocol::{ClientEvent, ConversationDetail, ServerEvent, WireMessage, WireUser};
use crate::session::{ChatSession, MountRequest, SessionDeps};
use crate::settings::ChatSettings;
use crate::transport::{Connector, EventReceiver, Socket};
use crate::{Error, Result};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

pub const ME: &str = "me";
pub const PEER: &str = "peer";
pub const CONV: &str = "c1";

pub fn user(id: &str, name: &str) -> UserProfile {
    UserProfile {
        id: id.to_string(),
        display_name: name.to_string(),
        avatar: Some(format!("https://cdn.example.com/{}.png", id)),
        username: Some(id.to_string()),
    }
}

pub fn wire(id: &str, sender: &str, content: &str) -> WireMessage {
    WireMessage {
        id: id.to_string(),
        conversation_id: Some(CONV.to_string()),
        sender: Some(WireUser {
            id: sender.to_string(),
            display_name: None,
            avatar: None,
        }),
        sender_id: None,
        content: content.to_string(),
        kind: Default::default(),
        attachment_url: None,
        created_at: Some(chrono::Utc::now()),
        reply_to: None,
        client_id: None,
    }
}

pub fn confirmed(id: &str, sender: &str, content: &str) -> Message {
    wire(id, sender, content)
        .into_message(CONV)
        .expect("fixture message should map")
}

/// In-memory REST backend
#[derive(Default)]
pub struct FakeApi {
    pub users: HashMap<String, UserProfile>,
    pub conversations: HashMap<String, ConversationDetail>,
    pub direct_conversation_id: String,
    pub history: Vec<WireMessage>,
    pub fail_history: bool,
    pub fail_upload: AtomicBool,
    pub upload_response: Option<WireMessage>,
    pub read_marks: AtomicUsize,
    pub read_delay: Option<Duration>,
    pub upload_delay: Option<Duration>,
    pub uploads: Mutex<Vec<ImageUpload>>,
    pub created_for: Mutex<Vec<String>>,
}

impl FakeApi {
    /// Backend knowing the peer, with direct conversation `c1`
    pub fn direct() -> Self {
        let mut users = HashMap::new();
        users.insert(PEER.to_string(), user(PEER, "Peer Person"));
        Self {
            users,
            direct_conversation_id: CONV.to_string(),
            ..Default::default()
        }
    }

    pub fn read_marks(&self) -> usize {
        self.read_marks.load(Ordering::SeqCst)
    }

    /// Wait until `expected` read-marks landed, then check no more did
    pub async fn wait_for_read_marks(&self, expected: usize) {
        let deadline = tokio::time::Instant::now() + Duration::from_secs(1);
        while self.read_marks() < expected && tokio::time::Instant::now() < deadline {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        settle().await;
        assert_eq!(self.read_marks(), expected);
    }
}

#[async_trait]
impl ChatApi for FakeApi {
    async fn get_user(&self, user_id: &str) -> Result<UserProfile> {
        self.users
            .get(user_id)
            .cloned()
            .ok_or(Error::Http { status: 404 })
    }

    async fn create_conversation(&self, participant_id: &str) -> Result<String> {
        self.created_for
            .lock()
            .unwrap()
            .push(participant_id.to_string());
        Ok(self.direct_conversation_id.clone())
    }

    async fn get_conversation(&self, conversation_id: &str) -> Result<ConversationDetail> {
        self.conversations
            .get(conversation_id)
            .cloned()
            .ok_or(Error::Http { status: 404 })
    }

    async fn mark_read(&self, _conversation_id: &str) -> Result<()> {
        if let Some(delay) = self.read_delay {
            tokio::time::sleep(delay).await;
        }
        self.read_marks.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn fetch_messages(&self, _conversation_id: &str) -> Result<Vec<WireMessage>> {
        if self.fail_history {
            return Err(Error::Network("connection reset".to_string()));
        }
        Ok(self.history.clone())
    }

    async fn upload_image(
        &self,
        _conversation_id: &str,
        upload: ImageUpload,
    ) -> Result<Option<WireMessage>> {
        self.uploads.lock().unwrap().push(upload);
        if let Some(delay) = self.upload_delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_upload.load(Ordering::SeqCst) {
            return Err(Error::Http { status: 500 });
        }
        Ok(self.upload_response.clone())
    }
}

/// Socket recording everything emitted
pub struct FakeSocket {
    pub emitted: Mutex<Vec<ClientEvent>>,
    pub ack: Value,
    pub closed: AtomicBool,
    pub fail_emit: AtomicBool,
}

impl FakeSocket {
    pub fn emitted(&self) -> Vec<ClientEvent> {
        self.emitted.lock().unwrap().clone()
    }

    pub fn emitted_names(&self) -> Vec<&'static str> {
        self.emitted().iter().map(|e| e.name()).collect()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Socket for FakeSocket {
    async fn emit(&self, event: ClientEvent) -> Result<()> {
        if self.is_closed() || self.fail_emit.load(Ordering::SeqCst) {
            return Err(Error::Closed);
        }
        self.emitted.lock().unwrap().push(event);
        Ok(())
    }

    async fn request(&self, event: ClientEvent) -> Result<Value> {
        self.emit(event).await?;
        Ok(self.ack.clone())
    }

    async fn disconnect(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

/// Connector handing out `FakeSocket`s
#[derive(Default)]
pub struct FakeConnector {
    pub existing_viewers: Vec<String>,
    pub fail: bool,
    pub sockets: Mutex<Vec<Arc<FakeSocket>>>,
    pub senders: Mutex<Vec<mpsc::UnboundedSender<ServerEvent>>>,
    pub credentials: Mutex<Vec<String>>,
}

impl FakeConnector {
    pub fn with_viewers(viewers: &[&str]) -> Self {
        Self {
            existing_viewers: viewers.iter().map(|v| v.to_string()).collect(),
            ..Default::default()
        }
    }

    pub fn socket(&self, n: usize) -> Arc<FakeSocket> {
        self.sockets.lock().unwrap()[n].clone()
    }

    pub fn last_socket(&self) -> Arc<FakeSocket> {
        self.sockets
            .lock()
            .unwrap()
            .last()
            .cloned()
            .expect("no connection opened")
    }

    /// Push an event on the latest connection
    pub fn push(&self, event: ServerEvent) {
        let senders = self.senders.lock().unwrap();
        let tx = senders.last().expect("no connection opened");
        tx.send(event).expect("receiver dropped");
    }

    pub fn connect_count(&self) -> usize {
        self.sockets.lock().unwrap().len()
    }
}

#[async_trait]
impl Connector for FakeConnector {
    async fn connect(&self, credential: &str) -> Result<(Arc<dyn Socket>, EventReceiver)> {
        if self.fail {
            return Err(Error::Network("connection refused".to_string()));
        }
        self.credentials
            .lock()
            .unwrap()
            .push(credential.to_string());

        let socket = Arc::new(FakeSocket {
            emitted: Mutex::new(Vec::new()),
            ack: json!({ "existingViewers": self.existing_viewers }),
            closed: AtomicBool::new(false),
            fail_emit: AtomicBool::new(false),
        });
        let (tx, rx) = mpsc::unbounded_channel();
        self.sockets.lock().unwrap().push(socket.clone());
        self.senders.lock().unwrap().push(tx);
        Ok((socket, rx))
    }
}

/// Let spawned background calls run
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(20)).await;
}

pub fn deps(api: Arc<FakeApi>, connector: Arc<FakeConnector>) -> SessionDeps {
    SessionDeps {
        api,
        connections: ConnectionManager::new(connector),
        settings: ChatSettings::default(),
    }
}

pub fn mount_request(route_token: &str) -> MountRequest {
    MountRequest {
        route_token: route_token.to_string(),
        local_user_id: ME.to_string(),
        credential: "token-123".to_string(),
    }
}

/// Mount a direct conversation with the peer
pub async fn mount_direct(
    api: FakeApi,
    connector: FakeConnector,
) -> (ChatSession, Arc<FakeApi>, Arc<FakeConnector>) {
    let api = Arc::new(api);
    let connector = Arc::new(connector);
    let session = ChatSession::mount(
        deps(api.clone(), connector.clone()),
        mount_request(PEER),
        CancellationToken::new(),
    )
    .await
    .expect("mount should succeed");
    (session, api, connector)
}
