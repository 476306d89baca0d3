//! Runtime permission gateway.
//!
//! [`PermissionGateway`] is what the sequencer sees. Platform bindings
//! implement the lower-level [`PermissionApi`] and get version gating for
//! free through [`VersionGatedGateway`].

use super::events::{LaunchEvent, LaunchEventSender};
use crate::constants::{NOTIFICATION_PERMISSION, NOTIFICATION_PERMISSION_MIN_PLATFORM_LEVEL};

/// One-shot answer handle for a permission prompt.
///
/// Consumed by [`resolve`](Self::resolve), so a prompt can only be answered
/// once. The answer is posted into the launch loop rather than calling the
/// sequencer directly.
#[derive(Debug)]
pub struct PermissionResponder {
    events: LaunchEventSender,
}

impl PermissionResponder {
    /// Create a responder that posts into the given launch loop.
    #[must_use]
    pub fn new(events: LaunchEventSender) -> Self {
        Self { events }
    }

    /// Deliver the prompt result.
    pub fn resolve(self, granted: bool) {
        if !self.events.send(LaunchEvent::PermissionResolved { granted }) {
            log::debug!("[Launch] Permission result (granted={granted}) after teardown ignored");
        }
    }
}

/// Capability-style access to the notification permission.
pub trait PermissionGateway {
    /// `false` where the platform has no explicit runtime grant.
    fn is_required(&self) -> bool;

    /// Current grant state. Meaningless when [`is_required`](Self::is_required) is `false`.
    fn is_granted(&self) -> bool;

    /// Show exactly one platform prompt and answer through `responder`.
    ///
    /// Implementations must resolve the responder on every outcome,
    /// including a prompt suppressed by policy (resolve with `false`).
    fn request(&mut self, responder: PermissionResponder);
}

/// Raw platform permission API.
pub trait PermissionApi {
    /// Whether `permission` is currently granted.
    fn check_granted(&self, permission: &str) -> bool;

    /// Prompt for `permission`, answering through `responder`.
    fn request(&mut self, permission: &str, responder: PermissionResponder);
}

/// Gates the notification permission on the platform level.
///
/// Below [`NOTIFICATION_PERMISSION_MIN_PLATFORM_LEVEL`] no prompt exists:
/// the permission is reported as granted and requests resolve immediately.
#[derive(Debug)]
pub struct VersionGatedGateway<A> {
    api: A,
    platform_level: u32,
}

impl<A: PermissionApi> VersionGatedGateway<A> {
    /// Wrap `api` for a device running `platform_level`.
    pub fn new(api: A, platform_level: u32) -> Self {
        Self {
            api,
            platform_level,
        }
    }

    /// Borrow the wrapped platform API.
    pub fn api(&self) -> &A {
        &self.api
    }
}

impl<A: PermissionApi> PermissionGateway for VersionGatedGateway<A> {
    fn is_required(&self) -> bool {
        self.platform_level >= NOTIFICATION_PERMISSION_MIN_PLATFORM_LEVEL
    }

    fn is_granted(&self) -> bool {
        !self.is_required() || self.api.check_granted(NOTIFICATION_PERMISSION)
    }

    fn request(&mut self, responder: PermissionResponder) {
        if self.is_required() {
            self.api.request(NOTIFICATION_PERMISSION, responder);
        } else {
            responder.resolve(true);
        }
    }
}

/// How a [`StaticPermissionGateway`] answers its prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptBehavior {
    /// Answer "granted" right away.
    Grant,
    /// Answer "denied" right away.
    Deny,
    /// Never answer; the responder is parked until the gateway is dropped.
    Never,
}

/// Gateway with fixed answers, for headless hosts and tests.
#[derive(Debug)]
pub struct StaticPermissionGateway {
    required: bool,
    granted: bool,
    prompt: PromptBehavior,
    requests: usize,
    parked: Vec<PermissionResponder>,
}

impl StaticPermissionGateway {
    /// Platform without a runtime grant.
    #[must_use]
    pub fn not_required() -> Self {
        Self::new(false, true, PromptBehavior::Grant)
    }

    /// Grant already held from an earlier run.
    #[must_use]
    pub fn already_granted() -> Self {
        Self::new(true, true, PromptBehavior::Grant)
    }

    /// Grant not held; the prompt answers per `prompt`.
    #[must_use]
    pub fn prompting(prompt: PromptBehavior) -> Self {
        Self::new(true, false, prompt)
    }

    fn new(required: bool, granted: bool, prompt: PromptBehavior) -> Self {
        Self {
            required,
            granted,
            prompt,
            requests: 0,
            parked: Vec::new(),
        }
    }

    /// Number of prompts shown so far.
    #[must_use]
    pub fn request_count(&self) -> usize {
        self.requests
    }
}

impl PermissionGateway for StaticPermissionGateway {
    fn is_required(&self) -> bool {
        self.required
    }

    fn is_granted(&self) -> bool {
        self.granted
    }

    fn request(&mut self, responder: PermissionResponder) {
        self.requests += 1;
        match self.prompt {
            PromptBehavior::Grant => {
                self.granted = true;
                responder.resolve(true);
            }
            PromptBehavior::Deny => responder.resolve(false),
            PromptBehavior::Never => self.parked.push(responder),
        }
    }
}
