//! Client session seam and notification wire types.
//!
//! A session is the live command/notify channel to the embedded web client.
//! The relay never stores one: it is handed in for the duration of a single
//! flush.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use uuid::Uuid;

/// Opaque session identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(Uuid);

impl SessionId {
    /// Fresh random identity.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Server-to-client notify event.
///
/// Serialises as `{"type":"message","data":{"message":"<json-string>"}}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientNotification {
    /// One relayed message.
    Message {
        /// Message body.
        data: MessageData,
    },
}

/// Body of [`ClientNotification::Message`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageData {
    /// The queued payload, still serialised.
    pub message: String,
}

impl ClientNotification {
    /// Wrap a queued payload.
    #[must_use]
    pub fn message(payload: impl Into<String>) -> Self {
        Self::Message {
            data: MessageData {
                message: payload.into(),
            },
        }
    }
}

/// A connected web-client command channel.
pub trait ClientSession {
    /// Stable identity for logging.
    fn id(&self) -> SessionId;

    /// Whether the client is still connected.
    fn is_alive(&self) -> bool;

    /// Deliver one notify event.
    fn notify(&mut self, notification: &ClientNotification) -> Result<()>;
}

/// Session that forwards serialised notifications into a tokio channel.
///
/// Alive as long as the receiving half exists.
#[derive(Debug)]
pub struct ChannelSession {
    id: SessionId,
    tx: mpsc::UnboundedSender<String>,
}

impl ChannelSession {
    /// Create a session and the receiver its notifications arrive on.
    #[must_use]
    pub fn new() -> (Self, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                id: SessionId::new(),
                tx,
            },
            rx,
        )
    }
}

impl ClientSession for ChannelSession {
    fn id(&self) -> SessionId {
        self.id
    }

    fn is_alive(&self) -> bool {
        !self.tx.is_closed()
    }

    fn notify(&mut self, notification: &ClientNotification) -> Result<()> {
        let json = serde_json::to_string(notification).context("Failed to encode notification")?;
        self.tx
            .send(json)
            .map_err(|e| anyhow::anyhow!("Session {} closed: {e}", self.id))
    }
}
