//! Host-side collaborators of the launch sequencer.
//!
//! The sequencer never draws anything itself. The host shell owns the splash
//! presentation and knows how to build the embedded web-content surface.

use anyhow::Result;

/// The embedded web-content surface.
pub trait ContentRenderer {
    /// Navigate to `url`.
    fn load_content(&mut self, url: &str);

    /// Release the surface. Called at most once per renderer.
    fn destroy(&mut self);
}

/// The native shell hosting the sequencer.
pub trait ShellHost {
    /// Show the splash presentation.
    fn show_splash(&mut self);

    /// Build the content renderer with the client bridge exposed as `bridge_name`.
    fn create_renderer(&mut self, bridge_name: &str) -> Result<Box<dyn ContentRenderer>>;
}

/// Host that only logs, for headless runs.
#[derive(Debug, Default)]
pub struct LoggingHost;

impl ShellHost for LoggingHost {
    fn show_splash(&mut self) {
        log::info!("[Host] Splash shown");
    }

    fn create_renderer(&mut self, bridge_name: &str) -> Result<Box<dyn ContentRenderer>> {
        log::info!("[Host] Renderer created (bridge: {bridge_name})");
        Ok(Box::new(LoggingRenderer::default()))
    }
}

/// Renderer that only logs, for headless runs.
#[derive(Debug, Default)]
pub struct LoggingRenderer {
    loaded: Option<String>,
}

impl ContentRenderer for LoggingRenderer {
    fn load_content(&mut self, url: &str) {
        log::info!("[Host] Loading {url}");
        self.loaded = Some(url.to_string());
    }

    fn destroy(&mut self) {
        log::info!("[Host] Renderer destroyed (last url: {:?})", self.loaded);
    }
}
