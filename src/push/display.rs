//! User-visible notifications for incoming push messages.

use serde::{Deserialize, Serialize};

/// A notification ready for the platform display layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayNotification {
    /// Title line.
    pub title: String,
    /// Body text, possibly empty.
    pub body: String,
}

/// Platform display layer.
pub trait NotificationPresenter {
    /// Whether the notification permission currently allows display.
    fn is_permitted(&self) -> bool;

    /// Show `notification`. Only called when [`is_permitted`](Self::is_permitted) holds.
    fn present(&mut self, notification: &DisplayNotification);
}

/// Presenter that writes notifications to the log.
#[derive(Debug)]
pub struct LoggingPresenter {
    permitted: bool,
}

impl LoggingPresenter {
    /// Presenter with a fixed permission state.
    #[must_use]
    pub fn new(permitted: bool) -> Self {
        Self { permitted }
    }
}

impl NotificationPresenter for LoggingPresenter {
    fn is_permitted(&self) -> bool {
        self.permitted
    }

    fn present(&mut self, notification: &DisplayNotification) {
        log::info!(
            "[Push] Notification: {} - {}",
            notification.title,
            notification.body
        );
    }
}
