//! Runtime environment detection.
//!
//! Single source of truth for whether the shell runs under test, development,
//! or production, based on the `TWA_SHELL_ENV` environment variable.
//!
//! # Environment Variable
//!
//! Set `TWA_SHELL_ENV` to one of:
//! - `test` - Test mode (config and token files live under the repo's `tmp/`)
//! - `development` or `dev` - Development mode
//! - (anything else or unset) - Production mode

/// Runtime environment for the shell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    /// Production environment (default).
    Production,
    /// Development environment.
    Development,
    /// Test environment.
    Test,
}

impl Environment {
    /// Detect current environment from `TWA_SHELL_ENV`.
    #[must_use]
    pub fn current() -> Self {
        Self::parse(std::env::var("TWA_SHELL_ENV").ok().as_deref())
    }

    fn parse(value: Option<&str>) -> Self {
        match value {
            Some("test") => Self::Test,
            Some("development" | "dev") => Self::Development,
            _ => Self::Production,
        }
    }

    /// Returns `true` if this is the test environment.
    #[must_use]
    pub fn is_test(self) -> bool {
        self == Self::Test
    }
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Production => write!(f, "production"),
            Self::Development => write!(f, "development"),
            Self::Test => write!(f, "test"),
        }
    }
}

/// Convenience check used by path selection.
#[must_use]
pub fn is_test_mode() -> bool {
    Environment::current().is_test()
}
