//! Launch sequencing: splash, notification permission, content load.
//!
//! # State machine
//!
//! ```text
//! Init ─start─▶ SplashShown ─timer─┬─(not required / granted)──────────▶ PermissionResolved ─▶ ContentLoaded
//!                                  └─▶ PermissionPending ─callback/timeout─▶ PermissionResolved ─▶ ContentLoaded
//! ```
//!
//! Every transition method checks its precondition state and is a silent
//! no-op otherwise, so duplicate platform callbacks and repeated "show
//! content" requests converge on a single renderer creation and a single
//! content load.
//!
//! # Threading
//!
//! The sequencer is single-threaded. Timer firings and permission answers
//! arrive as [`LaunchEvent`]s on one channel and are dispatched by
//! [`LaunchSequencer::run`].

pub mod events;
pub mod permission;
pub mod renderer;

use std::time::Duration;

use tokio::task::JoinHandle;

pub use events::{channel, LaunchEvent, LaunchEventReceiver, LaunchEventSender};
pub use permission::{
    PermissionApi, PermissionGateway, PermissionResponder, PromptBehavior,
    StaticPermissionGateway, VersionGatedGateway,
};
pub use renderer::{ContentRenderer, LoggingHost, LoggingRenderer, ShellHost};

/// Launch progress. Strictly ordered; only forward transitions happen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LaunchState {
    /// Constructed, not yet activated.
    Init,
    /// Splash is up and the splash timer is running.
    SplashShown,
    /// Waiting on the permission prompt.
    PermissionPending,
    /// Permission outcome known, content not yet loaded.
    PermissionResolved,
    /// Content requested from the renderer. Terminal.
    ContentLoaded,
}

/// Result of the notification permission step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionOutcome {
    /// The user granted the permission (now or earlier).
    Granted,
    /// The user denied it, or the prompt never answered before the timeout.
    Denied,
    /// No explicit grant exists on this platform or variant.
    NotRequired,
}

/// Parameters for one shell variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchConfig {
    /// URL handed to the renderer.
    pub launch_url: String,
    /// Client bridge name passed to renderer creation.
    pub bridge_name: String,
    /// Splash visibility before the permission check.
    pub splash_delay: Duration,
    /// Whether this variant asks for the permission at all.
    pub requires_permission_prompt: bool,
    /// Force loading after this long without a permission answer.
    pub permission_timeout: Option<Duration>,
}

/// Drives splash → permission → content load exactly once.
pub struct LaunchSequencer<G, H> {
    config: LaunchConfig,
    gateway: G,
    host: H,
    events: LaunchEventSender,
    state: LaunchState,
    history: Vec<LaunchState>,
    outcome: Option<PermissionOutcome>,
    renderer: Option<Box<dyn ContentRenderer>>,
    timers: Vec<JoinHandle<()>>,
    destroyed: bool,
}

impl<G, H> std::fmt::Debug for LaunchSequencer<G, H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LaunchSequencer")
            .field("state", &self.state)
            .field("outcome", &self.outcome)
            .field("has_renderer", &self.renderer.is_some())
            .field("destroyed", &self.destroyed)
            .finish_non_exhaustive()
    }
}

impl<G: PermissionGateway, H: ShellHost> LaunchSequencer<G, H> {
    /// Create a sequencer that schedules its timers through `events`.
    pub fn new(config: LaunchConfig, gateway: G, host: H, events: LaunchEventSender) -> Self {
        Self {
            config,
            gateway,
            host,
            events,
            state: LaunchState::Init,
            history: vec![LaunchState::Init],
            outcome: None,
            renderer: None,
            timers: Vec::new(),
            destroyed: false,
        }
    }

    /// Current state.
    pub fn state(&self) -> LaunchState {
        self.state
    }

    /// Every state visited so far, starting with `Init`.
    pub fn history(&self) -> &[LaunchState] {
        &self.history
    }

    /// Permission outcome, once determined.
    pub fn outcome(&self) -> Option<PermissionOutcome> {
        self.outcome
    }

    /// Whether a renderer is currently held.
    pub fn has_renderer(&self) -> bool {
        self.renderer.is_some()
    }

    /// Whether [`on_destroyed`](Self::on_destroyed) has run.
    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    /// Borrow the permission gateway.
    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    /// Borrow the host.
    pub fn host(&self) -> &H {
        &self.host
    }

    /// Activation: show the splash and arm the splash timer.
    pub fn start(&mut self) {
        if !self.expect_state(LaunchState::Init, "start") {
            return;
        }

        self.transition(LaunchState::SplashShown);
        self.host.show_splash();
        self.schedule(self.config.splash_delay, LaunchEvent::SplashTimerElapsed);
    }

    /// Splash timer fired: resolve the permission or prompt for it.
    pub fn on_splash_timer_elapsed(&mut self) {
        if !self.expect_state(LaunchState::SplashShown, "splash timer") {
            return;
        }

        let outcome = if !self.config.requires_permission_prompt || !self.gateway.is_required() {
            PermissionOutcome::NotRequired
        } else if self.gateway.is_granted() {
            PermissionOutcome::Granted
        } else {
            self.transition(LaunchState::PermissionPending);
            log::info!("[Launch] Requesting notification permission");
            self.gateway
                .request(PermissionResponder::new(self.events.clone()));
            if let Some(timeout) = self.config.permission_timeout {
                self.schedule(timeout, LaunchEvent::PermissionTimedOut);
            }
            return;
        };

        self.resolve(outcome);
    }

    /// Permission prompt answered. Only the first answer counts.
    pub fn on_permission_resolved(&mut self, granted: bool) {
        if !self.expect_state(LaunchState::PermissionPending, "permission result") {
            return;
        }

        self.resolve(if granted {
            PermissionOutcome::Granted
        } else {
            PermissionOutcome::Denied
        });
    }

    /// Permission prompt did not answer within the configured timeout.
    pub fn on_permission_timed_out(&mut self) {
        if !self.expect_state(LaunchState::PermissionPending, "permission timeout") {
            return;
        }

        log::warn!("[Launch] Permission prompt unanswered; loading content anyway");
        self.resolve(PermissionOutcome::Denied);
    }

    /// Load content once the permission step is done.
    ///
    /// This is the host's "show content" entry point as well; calls before
    /// the permission is resolved or after content is loaded do nothing.
    pub fn proceed_to_load(&mut self) {
        if self.destroyed || self.state != LaunchState::PermissionResolved {
            log::debug!("[Launch] Ignoring load request in {:?}", self.state);
            return;
        }

        if self.renderer.is_none() {
            match self.host.create_renderer(&self.config.bridge_name) {
                Ok(renderer) => self.renderer = Some(renderer),
                Err(e) => {
                    log::error!("[Launch] Failed to create renderer: {e:#}");
                    return;
                }
            }
        }

        self.transition(LaunchState::ContentLoaded);
        log::info!("[Launch] Loading {}", self.config.launch_url);
        if let Some(renderer) = self.renderer.as_mut() {
            renderer.load_content(&self.config.launch_url);
        }
    }

    /// Teardown: release the renderer and stop pending timers.
    ///
    /// Safe to call repeatedly. Later callbacks against this instance are no-ops.
    pub fn on_destroyed(&mut self) {
        if let Some(mut renderer) = self.renderer.take() {
            renderer.destroy();
        }
        for timer in self.timers.drain(..) {
            timer.abort();
        }
        if !self.destroyed {
            log::info!("[Launch] Destroyed in {:?}", self.state);
        }
        self.destroyed = true;
    }

    /// Dispatch one loop event. Returns `false` once the loop should stop.
    pub fn handle_event(&mut self, event: LaunchEvent) -> bool {
        match event {
            LaunchEvent::Start => self.start(),
            LaunchEvent::SplashTimerElapsed => self.on_splash_timer_elapsed(),
            LaunchEvent::PermissionResolved { granted } => self.on_permission_resolved(granted),
            LaunchEvent::PermissionTimedOut => self.on_permission_timed_out(),
            LaunchEvent::Destroyed => {
                self.on_destroyed();
                return false;
            }
        }
        true
    }

    /// Run the control loop until `Destroyed` arrives.
    ///
    /// The sequencer holds its own sender for timers and permission answers,
    /// so the channel stays open while the loop runs and `Destroyed` is the
    /// only way out.
    pub async fn run(mut self, mut rx: LaunchEventReceiver) -> Self {
        while let Some(event) = rx.recv().await {
            if !self.handle_event(event) {
                break;
            }
        }
        self
    }

    fn resolve(&mut self, outcome: PermissionOutcome) {
        log::info!("[Launch] Permission outcome: {outcome:?}");
        self.outcome = Some(outcome);
        self.transition(LaunchState::PermissionResolved);
        self.proceed_to_load();
    }

    fn expect_state(&self, expected: LaunchState, what: &str) -> bool {
        if self.destroyed {
            log::debug!("[Launch] Ignoring {what} after teardown");
            return false;
        }
        if self.state != expected {
            log::debug!("[Launch] Ignoring {what} in {:?}", self.state);
            return false;
        }
        true
    }

    fn transition(&mut self, next: LaunchState) {
        debug_assert!(next > self.state, "{:?} -> {next:?}", self.state);
        log::debug!("[Launch] {:?} -> {next:?}", self.state);
        self.state = next;
        self.history.push(next);
    }

    fn schedule(&mut self, delay: Duration, event: LaunchEvent) {
        self.timers.retain(|t| !t.is_finished());
        if let Some(handle) = self.events.send_after(delay, event) {
            self.timers.push(handle);
        }
    }
}
