//! Configuration loading and persistence.
//!
//! One parameterised configuration drives every shell variant: the launch
//! URL, the splash delay, and whether the notification prompt is required.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;
use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use crate::constants::{
    DEFAULT_BRIDGE_NAME, DEFAULT_LAUNCH_URL, DEFAULT_NOTIFICATION_TITLE, DEFAULT_RELAY_CAPACITY,
    DEFAULT_SPLASH_DELAY,
};
use crate::launch::LaunchConfig;

/// Configuration for the shell.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(default)]
pub struct ShellConfig {
    /// URL loaded into the content renderer.
    pub launch_url: String,
    /// Splash visibility before the permission check, in milliseconds.
    pub splash_delay_ms: u64,
    /// Whether this variant asks for the notification permission at launch.
    pub requires_permission_prompt: bool,
    /// Give up waiting for the permission callback after this long.
    ///
    /// `None` waits for the lifetime of the process.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub permission_timeout_ms: Option<u64>,
    /// Maximum queued relay messages; `0` means unbounded.
    pub relay_capacity: usize,
    /// Name of the client bridge exposed to the web content.
    pub bridge_name: String,
    /// Title for displayed notifications that arrive without one.
    pub default_notification_title: String,
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            launch_url: DEFAULT_LAUNCH_URL.to_string(),
            splash_delay_ms: u64::try_from(DEFAULT_SPLASH_DELAY.as_millis()).unwrap_or(500),
            requires_permission_prompt: true,
            permission_timeout_ms: None,
            relay_capacity: DEFAULT_RELAY_CAPACITY,
            bridge_name: DEFAULT_BRIDGE_NAME.to_string(),
            default_notification_title: DEFAULT_NOTIFICATION_TITLE.to_string(),
        }
    }
}

impl ShellConfig {
    /// Returns the configuration directory path, creating it if necessary.
    ///
    /// Directory selection priority:
    /// 1. `#[cfg(test)]` (unit tests): `tmp/twa-shell-test`
    /// 2. `TWA_SHELL_CONFIG_DIR` env var: explicit override
    /// 3. `TWA_SHELL_ENV=test`: `tmp/twa-shell-test` (integration tests)
    /// 4. Default: platform config dir + `twa-shell`
    pub fn config_dir() -> Result<PathBuf> {
        let dir = {
            #[cfg(test)]
            {
                PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tmp/twa-shell-test")
            }

            #[cfg(not(test))]
            {
                if let Ok(custom_dir) = std::env::var("TWA_SHELL_CONFIG_DIR") {
                    PathBuf::from(custom_dir)
                } else if crate::env::is_test_mode() {
                    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tmp/twa-shell-test")
                } else {
                    dirs::config_dir()
                        .context("Could not determine config directory")?
                        .join("twa-shell")
                }
            }
        };
        fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create config dir {}", dir.display()))?;
        Ok(dir)
    }

    /// Loads configuration from the config directory, with environment overrides.
    pub fn load() -> Result<Self> {
        let path = Self::config_dir()?.join("config.json");
        let mut config = Self::load_from(&path).unwrap_or_else(|e| {
            log::debug!("[Config] Using defaults ({e:#})");
            Self::default()
        });
        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Loads configuration from a specific file without env overrides.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            anyhow::bail!("Config file not found: {}", path.display());
        }
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        serde_json::from_str(&content).with_context(|| format!("Invalid config {}", path.display()))
    }

    /// Applies `TWA_SHELL_*` overrides resolved through `lookup`.
    ///
    /// Unparseable numeric or boolean values are ignored with a warning.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup("TWA_SHELL_LAUNCH_URL") {
            self.launch_url = url;
        }

        if let Some(raw) = lookup("TWA_SHELL_SPLASH_DELAY_MS") {
            match raw.parse::<u64>() {
                Ok(ms) => self.splash_delay_ms = ms,
                Err(_) => log::warn!("[Config] Ignoring TWA_SHELL_SPLASH_DELAY_MS={raw}"),
            }
        }

        if let Some(raw) = lookup("TWA_SHELL_REQUIRES_PERMISSION") {
            match raw.as_str() {
                "1" | "true" | "yes" => self.requires_permission_prompt = true,
                "0" | "false" | "no" => self.requires_permission_prompt = false,
                _ => log::warn!("[Config] Ignoring TWA_SHELL_REQUIRES_PERMISSION={raw}"),
            }
        }

        if let Some(raw) = lookup("TWA_SHELL_PERMISSION_TIMEOUT_MS") {
            match raw.parse::<u64>() {
                Ok(0) => self.permission_timeout_ms = None,
                Ok(ms) => self.permission_timeout_ms = Some(ms),
                Err(_) => log::warn!("[Config] Ignoring TWA_SHELL_PERMISSION_TIMEOUT_MS={raw}"),
            }
        }

        if let Some(raw) = lookup("TWA_SHELL_RELAY_CAPACITY") {
            match raw.parse::<usize>() {
                Ok(capacity) => self.relay_capacity = capacity,
                Err(_) => log::warn!("[Config] Ignoring TWA_SHELL_RELAY_CAPACITY={raw}"),
            }
        }
    }

    /// Persists the configuration to the config directory.
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_dir()?.join("config.json"))
    }

    /// Persists the configuration to a specific file.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        fs::write(path, serde_json::to_string_pretty(self)?)
            .with_context(|| format!("Failed to write {}", path.display()))?;

        #[cfg(unix)]
        fs::set_permissions(path, fs::Permissions::from_mode(0o600))?;

        Ok(())
    }

    /// Relay queue bound, `None` when unbounded.
    pub fn relay_capacity(&self) -> Option<usize> {
        (self.relay_capacity > 0).then_some(self.relay_capacity)
    }

    /// Projects the sequencer's launch parameters.
    pub fn launch_config(&self) -> LaunchConfig {
        LaunchConfig {
            launch_url: self.launch_url.clone(),
            bridge_name: self.bridge_name.clone(),
            splash_delay: Duration::from_millis(self.splash_delay_ms),
            requires_permission_prompt: self.requires_permission_prompt,
            permission_timeout: self.permission_timeout_ms.map(Duration::from_millis),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = ShellConfig::default();
        assert_eq!(config.splash_delay_ms, 500);
        assert!(config.requires_permission_prompt);
        assert_eq!(config.permission_timeout_ms, None);
        assert_eq!(config.relay_capacity(), Some(DEFAULT_RELAY_CAPACITY));
    }

    #[test]
    fn test_env_overrides() {
        let mut config = ShellConfig::default();
        config.apply_overrides(lookup_from(&[
            ("TWA_SHELL_LAUNCH_URL", "https://example.com/app"),
            ("TWA_SHELL_SPLASH_DELAY_MS", "250"),
            ("TWA_SHELL_REQUIRES_PERMISSION", "false"),
            ("TWA_SHELL_PERMISSION_TIMEOUT_MS", "10000"),
            ("TWA_SHELL_RELAY_CAPACITY", "0"),
        ]));

        assert_eq!(config.launch_url, "https://example.com/app");
        assert_eq!(config.splash_delay_ms, 250);
        assert!(!config.requires_permission_prompt);
        assert_eq!(config.permission_timeout_ms, Some(10_000));
        assert_eq!(config.relay_capacity(), None);
    }

    #[test]
    fn test_invalid_overrides_are_ignored() {
        let mut config = ShellConfig::default();
        config.apply_overrides(lookup_from(&[
            ("TWA_SHELL_SPLASH_DELAY_MS", "soon"),
            ("TWA_SHELL_REQUIRES_PERMISSION", "maybe"),
        ]));
        assert_eq!(config, ShellConfig::default());
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");

        let config = ShellConfig {
            launch_url: "https://touchbase.pro/".to_string(),
            requires_permission_prompt: false,
            ..ShellConfig::default()
        };
        config.save_to(&path).unwrap();

        let loaded = ShellConfig::load_from(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_save_writes_config_dir_file() {
        let config = ShellConfig {
            splash_delay_ms: 750,
            permission_timeout_ms: Some(5000),
            ..ShellConfig::default()
        };
        config.save().unwrap();

        let path = ShellConfig::config_dir().unwrap().join("config.json");
        assert_eq!(ShellConfig::load_from(&path).unwrap(), config);

        #[cfg(unix)]
        {
            let mode = fs::metadata(&path).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o600);
        }
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"launch_url":"https://a.example/"}"#).unwrap();

        let loaded = ShellConfig::load_from(&path).unwrap();
        assert_eq!(loaded.launch_url, "https://a.example/");
        assert_eq!(loaded.splash_delay_ms, 500);
    }

    #[test]
    fn test_missing_file_errors() {
        let dir = tempfile::tempdir().unwrap();
        assert!(ShellConfig::load_from(&dir.path().join("nope.json")).is_err());
    }

    #[test]
    fn test_launch_config_projection() {
        let config = ShellConfig {
            permission_timeout_ms: Some(1500),
            ..ShellConfig::default()
        };
        let launch = config.launch_config();
        assert_eq!(launch.splash_delay, Duration::from_millis(500));
        assert_eq!(launch.permission_timeout, Some(Duration::from_millis(1500)));
        assert_eq!(launch.bridge_name, DEFAULT_BRIDGE_NAME);
    }
}
