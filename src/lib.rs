//! TWA Shell - native launch shell for an embedded web app.
//!
//! The shell shows a splash, asks for the notification permission when the
//! platform requires it, loads the web app exactly once, and relays push
//! events (delivery tokens) to the web client when it asks for them.
//!
//! # Architecture
//!
//! Two execution contexts:
//!
//! - **UI context** - owns the [`LaunchSequencer`] and the content renderer.
//!   Timer firings and permission answers arrive as events on one channel.
//! - **Push-delivery context** - a background thread feeding the shared
//!   [`MessageRelayQueue`]; the UI context drains it on `check_messages`.
//!
//! # Modules
//!
//! - [`launch`] - Launch sequencer, permission gateway, renderer seams
//! - [`relay`] - Relay queue and client session types
//! - [`push`] - Push event handling, token envelope and store
//! - [`config`] - Configuration loading/saving

pub mod config;
pub mod constants;
pub mod env;
pub mod launch;
pub mod push;
pub mod relay;

// Re-export commonly used types
pub use config::ShellConfig;
pub use launch::{LaunchConfig, LaunchSequencer, LaunchState, PermissionOutcome};
pub use push::{PushEvent, PushHandler};
pub use relay::{ClientSession, MessageRelayQueue};
