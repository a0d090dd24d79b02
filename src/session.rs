//! Chat session
//!
//! One `ChatSession` is the state behind one mounted chat screen. Mounting
//! resolves the route, opens the live connection, marks the conversation
//! read and loads history; afterwards every input (live event, user command,
//! timer) is handled one at a time on the session's own loop, so the store is
//! never mutated concurrently. REST calls made after mount (read-marks, image
//! uploads) run on spawned tasks; upload results come back to the loop over a
//! channel and are applied there.
//!
//! Live events received while history is still loading stay buffered in the
//! connection's channel and are merged only after the history replaced the
//! store, which keeps the one-shot replace from clobbering pushed messages.

use crate::api::{abortable, ChatApi};
use crate::connection::{ConnectionHandle, ConnectionManager};
use crate::identity;
use crate::interaction::{
    AttachmentState, ReplyState, ScrollTarget, SelectionState, StagedImage, SwipeRelease,
    SwipeTracker,
};
use crate::model::{ChatContext, Message, MessageDraft, ReplySnapshot};
use crate::presence::{Presence, PresenceTracker};
use crate::protocol::{ClientEvent, MessageRef, SendMessage, ServerEvent, WireMessage};
use crate::read_state::ReadStateSync;
use crate::settings::ChatSettings;
use crate::store::{MergeOutcome, MessageStore, StoreChange};
use crate::timers::Timers;
use crate::transport::EventReceiver;
use crate::{Error, Result};
use bytes::Bytes;
use chrono::Utc;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Live connection status shown in the header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    /// Events are flowing
    Connected,
    /// No live connection; history stays readable
    Disconnected,
}

/// User-visible notice
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    /// Something failed
    Error(String),
    /// Informational
    Info(String),
}

/// Scheduled session callbacks
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum SessionTimer {
    /// Nth delayed viewer check after connect
    PresenceCheck(usize),
    /// Long-press hold on a message
    LongPress(String),
    /// End of the reply-click highlight
    ClearHighlight,
    /// Optimistic send gives up waiting
    PendingTimeout(String),
}

/// Header model
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    /// Peer display name or group name
    pub title: String,
    /// Peer avatar
    pub avatar: Option<String>,
    /// Peer presence; `None` for groups
    pub presence: Option<Presence>,
    /// Live connection status
    pub status: ConnectionStatus,
}

/// User input for the session loop
#[derive(Debug, Clone)]
pub enum Command {
    /// Send a text message
    SendText(String),
    /// Stage a picked image
    StageImage {
        /// File name
        file_name: String,
        /// MIME type
        mime_type: String,
        /// Contents
        bytes: Bytes,
    },
    /// Drop the staged image
    ClearImage,
    /// Upload the staged image
    SendImage {
        /// Caption, may be empty
        caption: String,
    },
    /// Touch down on a message
    PointerDown(String),
    /// Horizontal movement since touch down
    PointerMove(f32),
    /// Touch up
    PointerUp,
    /// Tap on a message
    Tap(String),
    /// Delete the selected messages
    DeleteSelected,
    /// Leave selection mode
    CancelSelection,
    /// Drop the reply draft
    CancelReply,
    /// Reply snippet clicked
    ClickReply(String),
    /// Resend a failed message
    RetryFailed(String),
    /// Remove a failed message
    DiscardFailed(String),
    /// Screen gained or lost focus
    SetFocused(bool),
    /// Navigate away
    Close,
}

/// Collaborators a session is built from
#[derive(Clone)]
pub struct SessionDeps {
    /// REST collaborator
    pub api: Arc<dyn ChatApi>,
    /// Live connection owner
    pub connections: ConnectionManager,
    /// Timing and size settings
    pub settings: ChatSettings,
}

/// What to mount
#[derive(Debug, Clone)]
pub struct MountRequest {
    /// Route parameter: user id or conversation id
    pub route_token: String,
    /// Local user identity
    pub local_user_id: String,
    /// Credential for the live connection
    pub credential: String,
}

/// Result of a background image upload
#[derive(Debug)]
struct UploadDone {
    image: StagedImage,
    reply_to: Option<String>,
    result: Result<Option<WireMessage>>,
}

/// State of one mounted chat screen
pub struct ChatSession {
    ctx: ChatContext,
    settings: ChatSettings,
    api: Arc<dyn ChatApi>,
    read_state: ReadStateSync,
    connections: ConnectionManager,
    connection: Option<ConnectionHandle>,
    events: Option<EventReceiver>,
    status: ConnectionStatus,
    store: MessageStore,
    presence: PresenceTracker,
    swipe: SwipeTracker,
    selection: SelectionState,
    reply: ReplyState,
    attachment: AttachmentState,
    timers: Timers<SessionTimer>,
    notices: Vec<Notice>,
    uploads_tx: mpsc::UnboundedSender<UploadDone>,
    uploads_rx: mpsc::UnboundedReceiver<UploadDone>,
    uploads_in_flight: usize,
    cancel: CancellationToken,
}

impl ChatSession {
    /// Mount a chat screen
    ///
    /// # Returns
    /// * `Ok(ChatSession)` - mounted, possibly degraded (no connection or history)
    /// * `Err(Error::NotFound)` - route matched nothing; navigate away
    /// * `Err(Error::Aborted)` - `cancel` fired during mount; nothing to show
    pub async fn mount(
        deps: SessionDeps,
        request: MountRequest,
        cancel: CancellationToken,
    ) -> Result<Self> {
        info!("Mounting chat for route {}", request.route_token);

        let conversation = identity::resolve(
            deps.api.as_ref(),
            &request.route_token,
            &request.local_user_id,
            &cancel,
        )
        .await?;

        let ctx = ChatContext::new(conversation, request.local_user_id);
        let mut session = Self::new(ctx, deps, cancel);

        session.connect(&request.credential, Instant::now()).await;
        if session.cancel.is_cancelled() {
            session.unmount().await;
            return Err(Error::Aborted);
        }

        session.mark_read();

        if let Err(e) = session.load_history().await {
            session.unmount().await;
            return Err(e);
        }

        info!(
            "Chat {} mounted with {} messages",
            session.ctx.conversation_id(),
            session.store.len()
        );
        Ok(session)
    }

    fn new(ctx: ChatContext, deps: SessionDeps, cancel: CancellationToken) -> Self {
        let store = MessageStore::new(ctx.conversation_id());
        let presence = PresenceTracker::new(&ctx);
        let (uploads_tx, uploads_rx) = mpsc::unbounded_channel();
        Self {
            swipe: SwipeTracker::new(&deps.settings),
            attachment: AttachmentState::new(deps.settings.max_image_bytes),
            read_state: ReadStateSync::new(deps.api.clone()),
            ctx,
            settings: deps.settings,
            api: deps.api,
            connections: deps.connections,
            connection: None,
            events: None,
            status: ConnectionStatus::Disconnected,
            store,
            presence,
            selection: SelectionState::new(),
            reply: ReplyState::new(),
            timers: Timers::new(),
            notices: Vec::new(),
            uploads_tx,
            uploads_rx,
            uploads_in_flight: 0,
            cancel,
        }
    }

    async fn connect(&mut self, credential: &str, now: Instant) {
        let conversation_id = self.ctx.conversation_id().to_string();
        match self.connections.open(&conversation_id, credential).await {
            Ok(opened) => {
                self.presence.seed(&opened.existing_viewers);
                self.connection = Some(opened.handle);
                self.events = Some(opened.events);
                self.status = ConnectionStatus::Connected;

                if self.presence.is_active() {
                    for (n, delay) in self.settings.presence_check_delays().into_iter().enumerate() {
                        self.timers.schedule(SessionTimer::PresenceCheck(n), now + delay);
                    }
                }
            }
            Err(e) => {
                warn!("Live connection for {} failed: {}", conversation_id, e);
                self.status = ConnectionStatus::Disconnected;
                self.notify(Notice::Error(
                    "Live updates are unavailable right now".to_string(),
                ));
            }
        }
    }

    async fn load_history(&mut self) -> Result<()> {
        let conversation_id = self.ctx.conversation_id().to_string();
        match abortable(&self.cancel, self.api.fetch_messages(&conversation_id)).await {
            Ok(wire) => {
                let history = wire
                    .into_iter()
                    .filter_map(|w| match w.into_message(&conversation_id) {
                        Ok(message) => Some(message),
                        Err(e) => {
                            warn!("Skipping history entry: {}", e);
                            None
                        }
                    })
                    .collect();
                self.store.load_history(history);
                Ok(())
            }
            Err(Error::Aborted) => Err(Error::Aborted),
            Err(e) => {
                warn!("Failed to load history for {}: {}", conversation_id, e);
                self.notify(Notice::Error("Failed to load messages".to_string()));
                Ok(())
            }
        }
    }

    fn mark_read(&self) {
        if self.cancel.is_cancelled() {
            return;
        }
        self.read_state
            .spawn_mark_read(self.ctx.conversation_id(), &self.cancel);
    }

    /// Run the session loop until `Close`, the command channel closes, or
    /// the cancellation token fires; then unmount.
    pub async fn run(&mut self, mut commands: mpsc::UnboundedReceiver<Command>) {
        loop {
            let deadline = self.timers.next_deadline();
            tokio::select! {
                _ = self.cancel.cancelled() => break,
                event = next_event(&mut self.events) => match event {
                    Some(event) => {
                        self.handle_event(event);
                    }
                    None => {
                        warn!("Event stream ended for {}", self.ctx.conversation_id());
                        self.events = None;
                        self.status = ConnectionStatus::Disconnected;
                    }
                },
                command = commands.recv() => match command {
                    Some(Command::Close) | None => break,
                    Some(command) => self.handle_command(command, Instant::now()).await,
                },
                Some(done) = self.uploads_rx.recv() => self.finish_upload(done),
                _ = sleep_until(deadline) => self.fire_due_timers(Instant::now()).await,
            }
        }
        self.unmount().await;
    }

    /// Apply one user command
    pub async fn handle_command(&mut self, command: Command, now: Instant) {
        // Failures are already reported as notices.
        match command {
            Command::SendText(text) => {
                let _ = self.send_text(&text, now).await;
            }
            Command::StageImage {
                file_name,
                mime_type,
                bytes,
            } => {
                let _ = self.stage_image(&file_name, &mime_type, bytes);
            }
            Command::ClearImage => self.attachment.clear(),
            Command::SendImage { caption } => {
                let _ = self.send_image(&caption);
            }
            Command::PointerDown(id) => self.pointer_down(&id, now),
            Command::PointerMove(dx) => {
                self.pointer_move(dx);
            }
            Command::PointerUp => {
                self.pointer_up();
            }
            Command::Tap(id) => {
                self.tap(&id);
            }
            Command::DeleteSelected => {
                let _ = self.delete_selected().await;
            }
            Command::CancelSelection => self.cancel_selection(),
            Command::CancelReply => self.reply.cancel_draft(),
            Command::ClickReply(id) => {
                self.click_reply(&id, now);
            }
            Command::RetryFailed(id) => {
                let _ = self.retry_failed(&id, now).await;
            }
            Command::DiscardFailed(id) => {
                self.discard_failed(&id);
            }
            Command::SetFocused(focused) => self.set_focused(focused),
            Command::Close => self.unmount().await,
        }
    }

    /// Dispatch one live event into presence, store and read state
    pub fn handle_event(&mut self, event: ServerEvent) -> StoreChange {
        match &event {
            ServerEvent::Connected => {
                info!("Connected to {}", self.ctx.conversation_id());
                self.status = ConnectionStatus::Connected;
                return StoreChange::Ignored;
            }
            ServerEvent::Disconnected => {
                warn!("Disconnected from {}", self.ctx.conversation_id());
                self.status = ConnectionStatus::Disconnected;
                return StoreChange::Ignored;
            }
            _ => {}
        }

        if self.presence.apply(&event) {
            return StoreChange::Ignored;
        }

        let deleted_id = match &event {
            ServerEvent::MessageDeleted(deleted) => Some(deleted.message_id.clone()),
            _ => None,
        };

        let change = self.store.apply(event);
        match &change {
            StoreChange::Merged {
                outcome: MergeOutcome::Reconciled { temp_id },
                ..
            } => {
                self.timers
                    .cancel(&SessionTimer::PendingTimeout(temp_id.clone()));
            }
            StoreChange::Removed(true) => {
                if let Some(id) = deleted_id {
                    self.selection.forget(&id);
                }
            }
            _ => {}
        }

        if ReadStateSync::should_sync(&self.ctx, &change) {
            self.mark_read();
        }
        change
    }

    /// Send a text message optimistically
    ///
    /// Returns the temp id of the optimistic entry, or `None` for blank text.
    pub async fn send_text(&mut self, text: &str, now: Instant) -> Result<Option<String>> {
        let content = text.trim();
        if content.is_empty() {
            return Ok(None);
        }

        let Some(handle) = self.connection.clone() else {
            self.notify(Notice::Error("Not connected; message not sent".to_string()));
            return Err(Error::Closed);
        };

        let draft = MessageDraft::text(content).replying_to(self.reply.take_draft());
        let pending = self
            .store
            .append_optimistic(draft, &self.ctx.local_user_id, Utc::now());
        self.dispatch_send(&handle, &pending, now).await;
        Ok(Some(pending.id))
    }

    async fn dispatch_send(&mut self, handle: &ConnectionHandle, pending: &Message, now: Instant) {
        let request = ClientEvent::SendMessage(SendMessage::for_pending(pending));
        match handle.emit(request).await {
            Ok(()) => {
                self.timers.schedule(
                    SessionTimer::PendingTimeout(pending.id.clone()),
                    now + self.settings.pending_timeout(),
                );
            }
            Err(e) => {
                warn!("Send of {} failed: {}", pending.id, e);
                self.store.mark_failed(&pending.id);
                self.notify(Notice::Error("Message not sent".to_string()));
            }
        }
    }

    /// Resend a failed optimistic message
    pub async fn retry_failed(&mut self, message_id: &str, now: Instant) -> Result<()> {
        let Some(handle) = self.connection.clone() else {
            self.notify(Notice::Error("Not connected; message not sent".to_string()));
            return Err(Error::Closed);
        };
        let Some(message) = self.store.retry(message_id) else {
            return Err(Error::Validation(format!(
                "Message {} has not failed",
                message_id
            )));
        };
        info!("Retrying {}", message_id);
        self.dispatch_send(&handle, &message, now).await;
        Ok(())
    }

    /// Remove a failed optimistic message
    pub fn discard_failed(&mut self, message_id: &str) -> bool {
        let failed = self
            .store
            .get(message_id)
            .is_some_and(|m| m.is_failed());
        failed && self.store.remove_by_id(message_id)
    }

    /// Validate and stage a picked image
    pub fn stage_image(&mut self, file_name: &str, mime_type: &str, bytes: Bytes) -> Result<()> {
        match self.attachment.stage(file_name, mime_type, bytes) {
            Ok(staged) => {
                debug!("Staged {} ({} bytes)", staged.file_name, staged.len());
                Ok(())
            }
            Err(e) => {
                self.report(&e);
                Err(e)
            }
        }
    }

    /// Start uploading the staged image with `caption`
    ///
    /// The upload runs on its own task and its result is applied on the
    /// session loop. On failure the image stays staged for another attempt.
    pub fn send_image(&mut self, caption: &str) -> Result<()> {
        let Some(staged) = self.attachment.staged().cloned() else {
            let e = Error::Validation("No image selected".to_string());
            self.report(&e);
            return Err(e);
        };
        if self.uploads_in_flight > 0 {
            let e = Error::Validation("Image is still uploading".to_string());
            self.report(&e);
            return Err(e);
        }

        let conversation_id = self.ctx.conversation_id().to_string();
        let reply_to = self.reply.draft().map(|r| r.id.clone());
        let upload = staged.to_upload(caption, reply_to.clone());
        let api = self.api.clone();
        let cancel = self.cancel.clone();
        let done = self.uploads_tx.clone();

        debug!("Uploading {} to {}", staged.file_name, conversation_id);
        self.uploads_in_flight += 1;
        tokio::spawn(async move {
            let result = abortable(&cancel, api.upload_image(&conversation_id, upload)).await;
            let _ = done.send(UploadDone {
                image: staged,
                reply_to,
                result,
            });
        });
        Ok(())
    }

    fn finish_upload(&mut self, done: UploadDone) {
        self.uploads_in_flight = self.uploads_in_flight.saturating_sub(1);
        let conversation_id = self.ctx.conversation_id().to_string();
        match done.result {
            Ok(created) => {
                if self.attachment.staged() == Some(&done.image) {
                    self.attachment.clear();
                }
                if self.reply.draft().map(|r| r.id.as_str()) == done.reply_to.as_deref() {
                    self.reply.cancel_draft();
                }
                if let Some(wire) = created {
                    match wire.into_message(&conversation_id) {
                        Ok(message) => {
                            self.store.merge_incoming(message);
                        }
                        Err(e) => warn!("Upload response unusable: {}", e),
                    }
                }
            }
            Err(Error::Aborted) => debug!("Upload to {} aborted", conversation_id),
            Err(e) => {
                warn!("Image upload to {} failed: {}", conversation_id, e);
                self.notify(Notice::Error("Failed to send image".to_string()));
            }
        }
    }

    /// Wait for the running upload and apply its result
    ///
    /// Returns `false` when no upload is in flight.
    pub async fn finish_pending_upload(&mut self) -> bool {
        if self.uploads_in_flight == 0 {
            return false;
        }
        match self.uploads_rx.recv().await {
            Some(done) => {
                self.finish_upload(done);
                true
            }
            None => false,
        }
    }

    /// Whether an image upload is running
    pub fn is_uploading(&self) -> bool {
        self.uploads_in_flight > 0
    }

    /// Touch down on a message: arms the long-press and the swipe
    ///
    /// Messages the server has not confirmed yet take no gestures.
    pub fn pointer_down(&mut self, message_id: &str, now: Instant) {
        let Some(message) = self.store.get(message_id).filter(|m| m.is_confirmed()) else {
            return;
        };
        let own = message.is_own(&self.ctx.local_user_id);
        let selecting = self.selection.is_active();

        self.swipe.begin(message_id, own, selecting);
        if self.selection.press_start(message_id) {
            self.timers.schedule(
                SessionTimer::LongPress(message_id.to_string()),
                now + self.settings.long_press(),
            );
        }
    }

    /// Movement since touch down; cancels the long-press
    ///
    /// Returns the swipe offset magnitude while dragging.
    pub fn pointer_move(&mut self, dx: f32) -> Option<f32> {
        self.cancel_press();
        self.swipe.drag(dx)
    }

    /// Touch up; returns whether a reply draft was set
    pub fn pointer_up(&mut self) -> bool {
        self.cancel_press();
        match self.swipe.release() {
            Some(SwipeRelease::Committed { message_id }) => match self.store.get(&message_id) {
                Some(message) => {
                    self.reply.set_draft(message);
                    true
                }
                None => false,
            },
            _ => false,
        }
    }

    fn cancel_press(&mut self) {
        if let Some(id) = self.selection.cancel_press() {
            self.timers.cancel(&SessionTimer::LongPress(id));
        }
    }

    /// Tap on a message; toggles it while in selection mode
    pub fn tap(&mut self, message_id: &str) -> bool {
        if !self.store.get(message_id).is_some_and(|m| m.is_confirmed()) {
            return false;
        }
        self.selection.toggle(message_id)
    }

    /// Leave selection mode
    pub fn cancel_selection(&mut self) {
        self.cancel_press();
        self.selection.clear();
    }

    /// Delete every selected message
    ///
    /// Rejected as a whole when the selection is empty or holds any message
    /// by someone else. Entries the server has not confirmed are never
    /// deleted. Returns how many messages were removed.
    pub async fn delete_selected(&mut self) -> Result<usize> {
        let ids = match self
            .selection
            .validate_delete(&self.store, &self.ctx.local_user_id)
        {
            Ok(ids) => ids,
            Err(e) => {
                self.report(&e);
                return Err(e);
            }
        };

        let Some(handle) = self.connection.clone() else {
            self.notify(Notice::Error("Not connected; nothing deleted".to_string()));
            return Err(Error::Closed);
        };

        let conversation_id = self.ctx.conversation_id().to_string();
        for id in &ids {
            let request = ClientEvent::DeleteMessage(MessageRef {
                message_id: id.clone(),
                conversation_id: conversation_id.clone(),
            });
            if let Err(e) = handle.emit(request).await {
                warn!("Delete request for {} failed: {}", id, e);
            }
        }

        let removed = self.store.remove_many(ids.iter().map(String::as_str));
        self.selection.clear();
        info!("Deleted {} messages from {}", removed, conversation_id);
        Ok(removed)
    }

    /// Reply snippet clicked: scroll to and highlight the original if rendered
    pub fn click_reply(&mut self, message_id: &str, now: Instant) -> Option<ScrollTarget> {
        let target = self.reply.click(message_id, self.store.messages())?;
        self.timers
            .schedule(SessionTimer::ClearHighlight, now + self.settings.highlight());
        Some(target)
    }

    /// Drop the reply draft
    pub fn cancel_reply(&mut self) {
        self.reply.cancel_draft();
    }

    /// Screen focus changed; regaining focus marks the conversation read
    pub fn set_focused(&mut self, focused: bool) {
        let regained = focused && !self.ctx.focused;
        self.ctx.focused = focused;
        if regained {
            self.mark_read();
        }
    }

    /// Fire every timer due at `now`
    pub async fn fire_due_timers(&mut self, now: Instant) {
        for timer in self.timers.take_due(now) {
            match timer {
                SessionTimer::PresenceCheck(n) => self.check_presence(n).await,
                SessionTimer::LongPress(id) => {
                    if self.selection.complete_press(&id) {
                        self.swipe.cancel();
                    }
                }
                SessionTimer::ClearHighlight => self.reply.clear_highlight(),
                SessionTimer::PendingTimeout(id) => {
                    if self.store.mark_failed(&id) {
                        warn!("Send of {} timed out", id);
                        self.notify(Notice::Error(
                            "Message failed to send. Tap to retry.".to_string(),
                        ));
                    }
                }
            }
        }
    }

    async fn check_presence(&self, n: usize) {
        let (Some(handle), Some(request)) = (&self.connection, self.presence.check_request()) else {
            return;
        };
        debug!("Viewer check #{} for {}", n + 1, self.ctx.conversation_id());
        if let Err(e) = handle.emit(request).await {
            debug!("Viewer check failed: {}", e);
        }
    }

    /// Tear down: cancel in-flight requests and timers, close the connection
    pub async fn unmount(&mut self) {
        self.cancel.cancel();
        self.timers.clear();
        self.swipe.cancel();
        self.events = None;
        if let Some(handle) = self.connection.take() {
            self.connections.close(&handle).await;
        }
        self.status = ConnectionStatus::Disconnected;
        info!("Chat {} unmounted", self.ctx.conversation_id());
    }

    fn report(&mut self, error: &Error) {
        if error.is_aborted() {
            return;
        }
        let text = match error {
            Error::Validation(msg) | Error::Unauthorized(msg) => msg.clone(),
            other => other.to_string(),
        };
        self.notify(Notice::Error(text));
    }

    fn notify(&mut self, notice: Notice) {
        self.notices.push(notice);
    }

    /// Take all queued notices
    pub fn drain_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    /// Header model
    pub fn header(&self) -> Header {
        let conversation = &self.ctx.conversation;
        Header {
            title: conversation.title().to_string(),
            avatar: conversation.avatar().map(str::to_string),
            presence: self.presence.is_active().then(|| self.presence.state()),
            status: self.status,
        }
    }

    /// Chat context
    pub fn context(&self) -> &ChatContext {
        &self.ctx
    }

    /// Messages in display order
    pub fn messages(&self) -> &[Message] {
        self.store.messages()
    }

    /// Message store
    pub fn store(&self) -> &MessageStore {
        &self.store
    }

    /// Peer presence
    pub fn presence(&self) -> Presence {
        self.presence.state()
    }

    /// Live connection status
    pub fn connection_status(&self) -> ConnectionStatus {
        self.status
    }

    /// Multi-select state
    pub fn selection(&self) -> &SelectionState {
        &self.selection
    }

    /// Pending reply target
    pub fn reply_draft(&self) -> Option<&ReplySnapshot> {
        self.reply.draft()
    }

    /// Message highlighted after a reply click
    pub fn highlighted(&self) -> Option<&str> {
        self.reply.highlighted()
    }

    /// Image waiting to be sent
    pub fn staged_image(&self) -> Option<&StagedImage> {
        self.attachment.staged()
    }

    /// Render offset of a bubble being swiped
    pub fn swipe_offset(&self, message_id: &str) -> f32 {
        self.swipe.offset_for(message_id)
    }

    /// Whether `timer` is scheduled
    pub fn is_scheduled(&self, timer: &SessionTimer) -> bool {
        self.timers.is_scheduled(timer)
    }

    /// Earliest scheduled timer
    pub fn next_deadline(&self) -> Option<Instant> {
        self.timers.next_deadline()
    }
}

async fn next_event(events: &mut Option<EventReceiver>) -> Option<ServerEvent> {
    match events {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(at) => tokio::time::sleep_until(at).await,
        None => std::future::pending().await,
    }
}
