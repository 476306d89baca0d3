//! Push-delivery handling.
//!
//! The platform push service calls in on its own thread at arbitrary times,
//! including before any web content is loaded.
//!
//! # Flow
//!
//! ```text
//! new token ──▶ TokenStore (persist) ──▶ {"type":"fcm_token",...} ──▶ MessageRelayQueue
//! message   ──▶ DisplayNotification ──▶ NotificationPresenter (if permitted)
//! ```

pub mod display;
pub mod token;

use std::collections::HashMap;
use std::sync::{mpsc, Arc};
use std::thread::{self, JoinHandle};

use serde::{Deserialize, Serialize};

pub use display::{DisplayNotification, LoggingPresenter, NotificationPresenter};
pub use token::{TokenEnvelope, TokenStore};

use crate::relay::MessageRelayQueue;

/// An incoming message from the push service.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteMessage {
    /// Sender id reported by the push service.
    #[serde(default)]
    pub from: Option<String>,
    /// Notification title, if the message carries one.
    #[serde(default)]
    pub title: Option<String>,
    /// Notification body, if the message carries one.
    #[serde(default)]
    pub body: Option<String>,
    /// Data payload.
    #[serde(default)]
    pub data: HashMap<String, String>,
}

/// Event delivered by the push service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PushEvent {
    /// The delivery token was issued or rotated.
    NewToken(String),
    /// A message arrived.
    Message(RemoteMessage),
}

/// Routes push events to the relay queue and the display layer.
#[derive(Debug)]
pub struct PushHandler<P> {
    queue: Arc<MessageRelayQueue>,
    tokens: Option<TokenStore>,
    presenter: P,
    default_title: String,
}

impl<P: NotificationPresenter> PushHandler<P> {
    /// Create a handler feeding `queue`.
    pub fn new(
        queue: Arc<MessageRelayQueue>,
        presenter: P,
        default_title: impl Into<String>,
    ) -> Self {
        Self {
            queue,
            tokens: None,
            presenter,
            default_title: default_title.into(),
        }
    }

    /// Persist every new token in `store`.
    #[must_use]
    pub fn with_token_store(mut self, store: TokenStore) -> Self {
        self.tokens = Some(store);
        self
    }

    /// Borrow the presenter.
    pub fn presenter(&self) -> &P {
        &self.presenter
    }

    /// Dispatch one event.
    pub fn handle(&mut self, event: PushEvent) {
        match event {
            PushEvent::NewToken(token) => self.on_new_token(&token),
            PushEvent::Message(message) => self.on_message_received(&message),
        }
    }

    /// New delivery token: persist it and queue it for the web client.
    pub fn on_new_token(&mut self, token: &str) {
        if token.trim().is_empty() {
            log::warn!("[Push] Ignoring empty delivery token");
            return;
        }
        log::info!("[Push] New delivery token received");

        if let Some(store) = &self.tokens {
            if let Err(e) = store.save(token) {
                log::warn!("[Push] Failed to persist token: {e:#}");
            }
        }

        match TokenEnvelope::new(token).to_json() {
            Ok(payload) => {
                self.queue.enqueue(payload);
            }
            Err(e) => log::error!("[Push] Dropping token event: {e:#}"),
        }
    }

    /// Incoming message: show it if notifications are permitted.
    pub fn on_message_received(&mut self, message: &RemoteMessage) {
        log::debug!("[Push] Message from {:?}", message.from);

        let notification = DisplayNotification {
            title: message
                .title
                .clone()
                .unwrap_or_else(|| self.default_title.clone()),
            body: message.body.clone().unwrap_or_default(),
        };

        if self.presenter.is_permitted() {
            self.presenter.present(&notification);
        } else {
            log::debug!("[Push] Notification suppressed: permission not granted");
        }
    }
}

/// Run `handler` on a dedicated push-delivery thread until `rx` closes.
pub fn spawn_push_worker<P>(
    mut handler: PushHandler<P>,
    rx: mpsc::Receiver<PushEvent>,
) -> std::io::Result<JoinHandle<PushHandler<P>>>
where
    P: NotificationPresenter + Send + 'static,
{
    thread::Builder::new()
        .name("push-delivery".to_string())
        .spawn(move || {
            for event in rx {
                handler.handle(event);
            }
            log::debug!("[Push] Delivery channel closed");
            handler
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Default)]
    struct RecordingPresenter {
        permitted: bool,
        shown: Vec<DisplayNotification>,
    }

    impl NotificationPresenter for RecordingPresenter {
        fn is_permitted(&self) -> bool {
            self.permitted
        }

        fn present(&mut self, notification: &DisplayNotification) {
            self.shown.push(notification.clone());
        }
    }

    fn handler(permitted: bool) -> (PushHandler<RecordingPresenter>, Arc<MessageRelayQueue>) {
        let queue = Arc::new(MessageRelayQueue::new());
        let presenter = RecordingPresenter {
            permitted,
            ..RecordingPresenter::default()
        };
        (
            PushHandler::new(Arc::clone(&queue), presenter, "TouchBase"),
            queue,
        )
    }

    #[test]
    fn test_new_token_is_queued_as_envelope() {
        let (mut handler, queue) = handler(true);
        handler.handle(PushEvent::NewToken("tok".to_string()));

        let (mut session, mut rx) = crate::relay::ChannelSession::new();
        assert_eq!(queue.flush(&mut session), 1);

        let raw: serde_json::Value = serde_json::from_str(&rx.try_recv().unwrap()).unwrap();
        assert_eq!(raw["type"], "message");
        assert_eq!(
            raw["data"]["message"],
            r#"{"type":"fcm_token","token":"tok"}"#
        );
    }

    #[test]
    fn test_empty_token_is_ignored() {
        let (mut handler, queue) = handler(true);
        handler.on_new_token("");
        assert!(queue.is_empty());
    }

    #[test]
    fn test_token_is_persisted() {
        let dir = tempfile::tempdir().unwrap();
        let store = TokenStore::at(dir.path().join("push_token.json"));
        let (handler, _queue) = handler(true);
        let mut handler = handler.with_token_store(store.clone());

        handler.on_new_token("rotated");
        assert_eq!(store.load().unwrap().as_deref(), Some("rotated"));
    }

    #[test]
    fn test_message_uses_default_title() {
        let (mut handler, queue) = handler(true);
        handler.handle(PushEvent::Message(RemoteMessage {
            body: Some("Ping".to_string()),
            ..RemoteMessage::default()
        }));

        assert_eq!(
            handler.presenter().shown,
            vec![DisplayNotification {
                title: "TouchBase".to_string(),
                body: "Ping".to_string(),
            }]
        );
        // Messages are displayed, not relayed.
        assert!(queue.is_empty());
    }

    #[test]
    fn test_message_suppressed_without_permission() {
        let (mut handler, _queue) = handler(false);
        handler.on_message_received(&RemoteMessage {
            title: Some("Hi".to_string()),
            ..RemoteMessage::default()
        });
        assert!(handler.presenter().shown.is_empty());
    }

    #[test]
    fn test_worker_drains_until_closed() {
        let (handler, queue) = handler(true);
        let (tx, rx) = mpsc::channel();
        let worker = spawn_push_worker(handler, rx).unwrap();

        tx.send(PushEvent::NewToken("a".to_string())).unwrap();
        tx.send(PushEvent::NewToken("b".to_string())).unwrap();
        drop(tx);

        worker.join().unwrap();
        assert_eq!(queue.len(), 2);
    }
}
