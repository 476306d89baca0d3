//! Ordered buffer of push-origin events awaiting a client pull.
//!
//! Producers (the push-delivery thread) append; the UI context drains
//! everything in one step when a session sends `check_messages`. A single
//! mutex guards the buffer and is never held across session I/O: the flush
//! swaps the buffer out under the lock, then delivers from the snapshot.
//! An enqueue racing a flush lands either before the swap (delivered now)
//! or after it (kept for the next flush).

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};

use super::session::{ClientNotification, ClientSession};
use crate::constants::CHECK_MESSAGES_COMMAND;

/// One queued event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueuedMessage {
    /// Serialised event, opaque to the relay.
    pub payload: String,
    /// When it was accepted.
    pub enqueued_at: DateTime<Utc>,
}

/// Process-lifetime relay between push delivery and the web client.
#[derive(Debug, Default)]
pub struct MessageRelayQueue {
    pending: Mutex<VecDeque<QueuedMessage>>,
    /// `None` is unbounded; otherwise the oldest entries are evicted.
    capacity: Option<usize>,
}

impl MessageRelayQueue {
    /// Unbounded queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue holding at most `capacity` messages (`None` for unbounded).
    #[must_use]
    pub fn with_capacity(capacity: Option<usize>) -> Self {
        Self {
            pending: Mutex::new(VecDeque::new()),
            capacity: capacity.filter(|c| *c > 0),
        }
    }

    /// Append a payload. Returns `false` if it was rejected.
    ///
    /// Empty or whitespace-only payloads are dropped with a warning.
    pub fn enqueue(&self, payload: impl Into<String>) -> bool {
        let payload = payload.into();
        if payload.trim().is_empty() {
            log::warn!("[Relay] Dropping empty payload");
            return false;
        }

        let message = QueuedMessage {
            payload,
            enqueued_at: Utc::now(),
        };

        let mut pending = self.lock();
        if let Some(capacity) = self.capacity {
            while pending.len() >= capacity {
                if let Some(evicted) = pending.pop_front() {
                    log::warn!(
                        "[Relay] Queue full ({capacity}); evicting message queued at {}",
                        evicted.enqueued_at
                    );
                }
            }
        }
        pending.push_back(message);
        log::debug!("[Relay] Queued message ({} pending)", pending.len());
        true
    }

    /// Deliver every queued message to `session` in order and empty the queue.
    ///
    /// Returns the number of messages taken off the queue. An empty queue or a
    /// disconnected session returns 0 and leaves the queue as it was. Delivery
    /// errors are logged; the messages are not requeued.
    pub fn flush(&self, session: &mut dyn ClientSession) -> usize {
        let drained = {
            let mut pending = self.lock();
            if pending.is_empty() {
                return 0;
            }
            if !session.is_alive() {
                log::debug!(
                    "[Relay] Session {} gone; keeping {} messages",
                    session.id(),
                    pending.len()
                );
                return 0;
            }
            std::mem::take(&mut *pending)
        };

        let count = drained.len();
        for message in drained {
            if let Err(e) = session.notify(&ClientNotification::message(message.payload)) {
                log::warn!("[Relay] Delivery to session {} failed: {e:#}", session.id());
            }
        }
        log::info!("[Relay] Flushed {count} messages to session {}", session.id());
        count
    }

    /// Client bridge command hook.
    ///
    /// Handles only `check_messages`, and only when something was delivered;
    /// every other case returns `false` so other handlers can respond.
    pub fn handle_session_command(
        &self,
        session: &mut dyn ClientSession,
        command: &str,
        _args: &serde_json::Value,
    ) -> bool {
        if command != CHECK_MESSAGES_COMMAND {
            return false;
        }
        self.flush(session) > 0
    }

    /// Number of queued messages.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether nothing is queued.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    // The buffer is valid after any panic mid-push, so poisoning is ignored.
    fn lock(&self) -> MutexGuard<'_, VecDeque<QueuedMessage>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
