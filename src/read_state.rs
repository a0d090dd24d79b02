//! Read-state synchronizer
//!
//! Marks the open conversation read on mount and on every accepted incoming
//! message from someone else while the screen has focus. The call is
//! idempotent and runs off the session loop; failures are logged and never
//! retried or surfaced.

use crate::api::ChatApi;
use crate::model::ChatContext;
use crate::store::StoreChange;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Fires read-marks for one conversation
#[derive(Clone)]
pub struct ReadStateSync {
    api: Arc<dyn ChatApi>,
}

impl ReadStateSync {
    /// Create a synchronizer over `api`
    pub fn new(api: Arc<dyn ChatApi>) -> Self {
        Self { api }
    }

    /// Whether `change` calls for a read-mark in `ctx`
    pub fn should_sync(ctx: &ChatContext, change: &StoreChange) -> bool {
        match change {
            StoreChange::Merged { outcome, sender_id } => {
                ctx.focused && outcome.accepted() && sender_id != &ctx.local_user_id
            }
            _ => false,
        }
    }

    /// Mark the conversation read; returns whether the call succeeded
    pub async fn mark_read(&self, conversation_id: &str) -> bool {
        match self.api.mark_read(conversation_id).await {
            Ok(()) => {
                debug!("Marked {} read", conversation_id);
                true
            }
            Err(e) => {
                warn!("Failed to mark {} read: {}", conversation_id, e);
                false
            }
        }
    }

    /// Mark the conversation read on a background task
    ///
    /// The call is dropped once `cancel` fires.
    pub fn spawn_mark_read(
        &self,
        conversation_id: &str,
        cancel: &CancellationToken,
    ) -> JoinHandle<bool> {
        let sync = self.clone();
        let conversation_id = conversation_id.to_string();
        let cancel = cancel.clone();
        tokio::spawn(async move {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => false,
                marked = sync.mark_read(&conversation_id) => marked,
            }
        })
    }
}
