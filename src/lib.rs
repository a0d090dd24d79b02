//! Threadline - real-time chat core
//!
//! This library provides the client-side chat subsystem for direct messages and
//! group conversations: a live connection per open conversation, an optimistic
//! message store reconciled against REST history and pushed events, peer
//! presence, and the interaction state behind swipe-to-reply, multi-select
//! deletion and image attachments.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod api;
pub mod connection;
pub mod identity;
pub mod interaction;
pub mod model;
pub mod presence;
pub mod protocol;
pub mod read_state;
pub mod session;
pub mod settings;
pub mod store;
pub mod timers;
pub mod transport;

#[cfg(test)]
mod tests;

/// Result type alias for Threadline operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for Threadline operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Route token matched neither a user nor a conversation
    #[error("Conversation not found: {0}")]
    NotFound(String),

    /// REST or live-connection failure
    #[error("Network error: {0}")]
    Network(String),

    /// REST call answered with a non-success status
    #[error("HTTP error: status {status}")]
    Http {
        /// Response status code
        status: u16,
    },

    /// Request cancelled because the screen was torn down
    #[error("Request aborted")]
    Aborted,

    /// Input rejected before any network call
    #[error("Validation error: {0}")]
    Validation(String),

    /// Action not permitted for the local user
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Malformed frame or payload on the live connection
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// The live connection is no longer open
    #[error("Connection closed")]
    Closed,

    /// Settings could not be read or written
    #[error("Settings error: {0}")]
    Settings(String),

    /// General I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Whether this error came from navigation-triggered cancellation
    pub fn is_aborted(&self) -> bool {
        matches!(self, Error::Aborted)
    }

    /// Whether this error must end the chat screen
    pub fn is_terminal(&self) -> bool {
        matches!(self, Error::NotFound(_))
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        match e.status() {
            Some(status) => Error::Http {
                status: status.as_u16(),
            },
            None => Error::Network(e.to_string()),
        }
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for Error {
    fn from(e: tokio_tungstenite::tungstenite::Error) -> Self {
        use tokio_tungstenite::tungstenite::Error as WsError;
        match e {
            WsError::ConnectionClosed | WsError::AlreadyClosed => Error::Closed,
            other => Error::Network(other.to_string()),
        }
    }
}

/// Initialize the Threadline library with logging
pub fn init() {
    tracing_subscriber::fmt::init();
}
