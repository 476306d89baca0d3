//! Event channel for the launch sequencer's control loop.
//!
//! Timer firings and permission callbacks are not method calls from
//! arbitrary contexts: they are posted as [`LaunchEvent`]s into a single
//! `mpsc::UnboundedSender<LaunchEvent>` and dispatched one at a time by
//! [`LaunchSequencer::run`](super::LaunchSequencer::run).

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Input to the launch control loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaunchEvent {
    /// Process activation.
    Start,

    /// The one-shot splash timer has fired.
    SplashTimerElapsed,

    /// The platform permission prompt has answered.
    PermissionResolved {
        /// Whether the user granted the permission.
        granted: bool,
    },

    /// The optional permission timeout has fired before any answer.
    PermissionTimedOut,

    /// The host is tearing the shell down.
    Destroyed,
}

/// Receiving half of the launch event channel.
pub type LaunchEventReceiver = mpsc::UnboundedReceiver<LaunchEvent>;

/// Cloneable sending half of the launch event channel.
#[derive(Debug, Clone)]
pub struct LaunchEventSender {
    tx: mpsc::UnboundedSender<LaunchEvent>,
}

/// Create a connected sender/receiver pair.
#[must_use]
pub fn channel() -> (LaunchEventSender, LaunchEventReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    (LaunchEventSender { tx }, rx)
}

impl LaunchEventSender {
    /// Post an event to the loop.
    ///
    /// Returns `false` when the loop has already shut down.
    pub fn send(&self, event: LaunchEvent) -> bool {
        self.tx.send(event).is_ok()
    }

    /// Post `event` once `delay` has elapsed (one-shot timer).
    ///
    /// Spawns a tokio task on the current runtime. Returns `None` when called
    /// outside a runtime, in which case the event is never delivered.
    pub fn send_after(&self, delay: Duration, event: LaunchEvent) -> Option<JoinHandle<()>> {
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            log::error!("[Launch] No tokio runtime; timer for {event:?} not scheduled");
            return None;
        };

        let tx = self.tx.clone();
        Some(handle.spawn(async move {
            tokio::time::sleep(delay).await;
            // Loop may be gone after teardown.
            let _ = tx.send(event);
        }))
    }

    /// Whether the receiving loop has gone away.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}
