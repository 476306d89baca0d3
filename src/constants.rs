//! Shell-wide constants.
//!
//! Tunable durations and the fixed protocol names shared between the
//! launch sequencer, the relay queue, and the push handler.

use std::time::Duration;

// ============================================================================
// Launch
// ============================================================================

/// How long the splash presentation stays up before the permission check.
///
/// Tunable via `ShellConfig::splash_delay_ms`; this is only the default.
pub const DEFAULT_SPLASH_DELAY: Duration = Duration::from_millis(500);

/// Default launch URL when no configuration file overrides it.
pub const DEFAULT_LAUNCH_URL: &str = "https://touchbase.site/";

/// Name under which the client bridge is exposed to the web content.
pub const DEFAULT_BRIDGE_NAME: &str = "AndroidInterface";

// ============================================================================
// Permission
// ============================================================================

/// Runtime permission guarding notification display.
pub const NOTIFICATION_PERMISSION: &str = "android.permission.POST_NOTIFICATIONS";

/// First platform level that requires an explicit notification grant.
pub const NOTIFICATION_PERMISSION_MIN_PLATFORM_LEVEL: u32 = 33;

// ============================================================================
// Relay
// ============================================================================

/// Client bridge command asking for queued messages.
pub const CHECK_MESSAGES_COMMAND: &str = "check_messages";

/// Default bound on queued relay messages before the oldest are evicted.
pub const DEFAULT_RELAY_CAPACITY: usize = 256;

// ============================================================================
// Push
// ============================================================================

/// Envelope `type` for delivery token events.
pub const TOKEN_EVENT_TYPE: &str = "fcm_token";

/// Title used for displayed notifications that arrive without one.
pub const DEFAULT_NOTIFICATION_TITLE: &str = "TouchBase";
