//! Message store and reconciler
//!
//! An append-ordered list of the open conversation's messages that merges
//! three sources: optimistic local sends, the REST history, and live pushes.
//!
//! Rules:
//! - ids are unique; a pushed message whose id is already present is dropped
//! - a pushed confirmation replaces its optimistic entry in place, matched by
//!   echoed correlation id, or failing that by sender + identical content
//! - insertion order is arrival order; `created_at` never re-sorts
//!
//! The content match is a heuristic. When the server does not echo the
//! correlation id and the local user sends identical text twice in quick
//! succession, the first confirmation resolves the oldest pending entry,
//! which may not be the one it was sent for. The final list is still correct.

use crate::model::{Message, MessageDraft, MessageState};
use crate::protocol::ServerEvent;
use chrono::{DateTime, Utc};
use tracing::{debug, warn};

/// What `merge_incoming` did with a message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeOutcome {
    /// Id already present; nothing changed
    Duplicate,
    /// Replaced the optimistic entry `temp_id` in place
    Reconciled {
        /// Id the optimistic entry had
        temp_id: String,
    },
    /// Appended at the tail
    Appended,
}

impl MergeOutcome {
    /// Whether the message was taken into the store
    pub fn accepted(&self) -> bool {
        !matches!(self, MergeOutcome::Duplicate)
    }
}

/// Effect of dispatching a live event into the store
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreChange {
    /// A pushed message was merged
    Merged {
        /// Merge result
        outcome: MergeOutcome,
        /// Author of the merged message
        sender_id: String,
    },
    /// A deletion was applied; `false` if the id was unknown
    Removed(bool),
    /// Event does not concern the store or this conversation
    Ignored,
}

/// Ordered messages of one conversation
#[derive(Debug, Clone)]
pub struct MessageStore {
    conversation_id: String,
    messages: Vec<Message>,
}

impl MessageStore {
    /// Create an empty store for `conversation_id`
    pub fn new(conversation_id: impl Into<String>) -> Self {
        Self {
            conversation_id: conversation_id.into(),
            messages: Vec::new(),
        }
    }

    /// Conversation this store belongs to
    pub fn conversation_id(&self) -> &str {
        &self.conversation_id
    }

    /// Replace the whole content with fetched history
    ///
    /// Runs once at mount, before any live event is dispatched. Repeated ids
    /// in the payload keep their first occurrence.
    pub fn load_history(&mut self, history: Vec<Message>) {
        self.messages.clear();
        for message in history {
            if self.contains(&message.id) {
                warn!("History repeats message {}, keeping first", message.id);
                continue;
            }
            self.messages.push(message);
        }
        debug!(
            "Loaded {} messages for {}",
            self.messages.len(),
            self.conversation_id
        );
    }

    /// Insert an optimistic text entry at the tail
    ///
    /// Returns a copy of the inserted entry, which carries the temp id and
    /// correlation id the send request needs.
    pub fn append_optimistic(
        &mut self,
        draft: MessageDraft,
        sender_id: &str,
        now: DateTime<Utc>,
    ) -> Message {
        let message = Message::optimistic(draft, &self.conversation_id, sender_id, now);
        debug!("Optimistic entry {}", message.id);
        self.messages.push(message.clone());
        message
    }

    /// Merge a server-confirmed message
    pub fn merge_incoming(&mut self, message: Message) -> MergeOutcome {
        if self.contains(&message.id) {
            debug!("Dropping duplicate {}", message.id);
            return MergeOutcome::Duplicate;
        }

        if let Some(index) = self.find_optimistic_match(&message) {
            let temp_id = std::mem::replace(&mut self.messages[index], message).id;
            debug!("Reconciled {} -> {}", temp_id, self.messages[index].id);
            return MergeOutcome::Reconciled { temp_id };
        }

        self.messages.push(message);
        MergeOutcome::Appended
    }

    fn find_optimistic_match(&self, incoming: &Message) -> Option<usize> {
        if let Some(client_id) = incoming.client_id.as_deref() {
            let by_correlation = self.messages.iter().position(|m| {
                m.state != MessageState::Confirmed && m.client_id.as_deref() == Some(client_id)
            });
            if by_correlation.is_some() {
                return by_correlation;
            }
        }

        self.messages.iter().position(|m| {
            m.is_pending() && m.sender_id == incoming.sender_id && m.content == incoming.content
        })
    }

    /// Remove a message; unknown ids are a no-op
    pub fn remove_by_id(&mut self, id: &str) -> bool {
        let before = self.messages.len();
        self.messages.retain(|m| m.id != id);
        before != self.messages.len()
    }

    /// Remove every id in `ids`, returning how many were present
    pub fn remove_many<'a, I>(&mut self, ids: I) -> usize
    where
        I: IntoIterator<Item = &'a str>,
    {
        ids.into_iter().filter(|id| self.remove_by_id(id)).count()
    }

    /// Mark a still-pending optimistic entry as failed
    pub fn mark_failed(&mut self, id: &str) -> bool {
        match self.messages.iter_mut().find(|m| m.id == id && m.is_pending()) {
            Some(message) => {
                message.mark_failed();
                true
            }
            None => false,
        }
    }

    /// Return a failed entry to pending for a manual retry
    ///
    /// Returns a copy of the entry to resend.
    pub fn retry(&mut self, id: &str) -> Option<Message> {
        let message = self.messages.iter_mut().find(|m| m.id == id && m.is_failed())?;
        message.mark_pending();
        Some(message.clone())
    }

    /// Dispatch a live event
    pub fn apply(&mut self, event: ServerEvent) -> StoreChange {
        match event {
            ServerEvent::NewMessage(wire) => {
                let message = match wire.into_message(&self.conversation_id) {
                    Ok(message) => message,
                    Err(e) => {
                        warn!("Ignoring pushed message: {}", e);
                        return StoreChange::Ignored;
                    }
                };
                if message.conversation_id != self.conversation_id {
                    return StoreChange::Ignored;
                }
                let sender_id = message.sender_id.clone();
                StoreChange::Merged {
                    outcome: self.merge_incoming(message),
                    sender_id,
                }
            }
            ServerEvent::MessageDeleted(deleted) => {
                if deleted.conversation_id != self.conversation_id {
                    return StoreChange::Ignored;
                }
                StoreChange::Removed(self.remove_by_id(&deleted.message_id))
            }
            _ => StoreChange::Ignored,
        }
    }

    /// Look up a message by id
    pub fn get(&self, id: &str) -> Option<&Message> {
        self.messages.iter().find(|m| m.id == id)
    }

    /// Whether `id` is present
    pub fn contains(&self, id: &str) -> bool {
        self.messages.iter().any(|m| m.id == id)
    }

    /// Messages in display order
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Number of messages
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Whether the store is empty
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Number of entries still awaiting confirmation
    pub fn pending_count(&self) -> usize {
        self.messages.iter().filter(|m| m.is_pending()).count()
    }
}
