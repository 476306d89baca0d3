//! Message relay from push delivery to the web client.
//!
//! # Architecture
//!
//! ```text
//! push-delivery thread ──enqueue──▶ MessageRelayQueue ◀──check_messages── ClientSession
//!                                          │
//!                                          └──flush: {"type":"message",...} × N ──▶ session
//! ```
//!
//! Events can arrive before any client exists, so nothing is pushed on
//! arrival: the client pulls with `check_messages` and receives everything
//! queued so far, once.

pub mod queue;
pub mod session;

pub use queue::{MessageRelayQueue, QueuedMessage};
pub use session::{ChannelSession, ClientNotification, ClientSession, MessageData, SessionId};
