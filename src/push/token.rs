//! Delivery token envelope and persistence.
//!
//! The last token received is kept on disk so it survives restarts, and
//! every new token is wrapped in a stable envelope for the web client.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::ShellConfig;
use crate::constants::TOKEN_EVENT_TYPE;

/// Token event as seen by the web client.
///
/// Serialises exactly as `{"type":"fcm_token","token":"<token>"}`. Fields may
/// be added but never renamed. Parsing rejects any other `type`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "RawTokenEnvelope", try_from = "RawTokenEnvelope")]
pub struct TokenEnvelope {
    /// The delivery token.
    pub token: String,
}

#[derive(Serialize, Deserialize)]
struct RawTokenEnvelope {
    #[serde(rename = "type")]
    kind: String,
    token: String,
}

impl From<TokenEnvelope> for RawTokenEnvelope {
    fn from(envelope: TokenEnvelope) -> Self {
        Self {
            kind: TOKEN_EVENT_TYPE.to_string(),
            token: envelope.token,
        }
    }
}

impl TryFrom<RawTokenEnvelope> for TokenEnvelope {
    type Error = String;

    fn try_from(raw: RawTokenEnvelope) -> std::result::Result<Self, Self::Error> {
        if raw.kind != TOKEN_EVENT_TYPE {
            return Err(format!("expected type {TOKEN_EVENT_TYPE:?}, got {:?}", raw.kind));
        }
        Ok(Self { token: raw.token })
    }
}

impl TokenEnvelope {
    /// Wrap a token.
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }

    /// Serialise to the wire string.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).context("Failed to serialize token envelope")
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct StoredToken {
    token: String,
    updated_at: DateTime<Utc>,
}

/// File-backed store for the most recent delivery token.
#[derive(Debug, Clone)]
pub struct TokenStore {
    path: PathBuf,
}

impl TokenStore {
    /// Store at `push_token.json` in the shell's config directory.
    pub fn open_default() -> Result<Self> {
        Ok(Self::at(ShellConfig::config_dir()?.join("push_token.json")))
    }

    /// Store at an explicit path.
    #[must_use]
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Backing file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Last saved token, if any.
    pub fn load(&self) -> Result<Option<String>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read {}", self.path.display()))?;
        let stored: StoredToken = serde_json::from_str(&content)
            .with_context(|| format!("Corrupt token file {}", self.path.display()))?;
        Ok(Some(stored.token))
    }

    /// Replace the saved token.
    ///
    /// Writes a sibling temp file and renames it over the old one.
    pub fn save(&self, token: &str) -> Result<()> {
        let stored = StoredToken {
            token: token.to_string(),
            updated_at: Utc::now(),
        };
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_vec(&stored)?)
            .with_context(|| format!("Failed to write {}", tmp.display()))?;

        #[cfg(unix)]
        fs::set_permissions(&tmp, fs::Permissions::from_mode(0o600))?;

        fs::rename(&tmp, &self.path)
            .with_context(|| format!("Failed to replace {}", self.path.display()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_exact_shape() {
        let json = TokenEnvelope::new("tok-123").to_json().unwrap();
        assert_eq!(json, r#"{"type":"fcm_token","token":"tok-123"}"#);
    }

    #[test]
    fn test_envelope_escapes_token() {
        let json = TokenEnvelope::new("a\"b").to_json().unwrap();
        let back: TokenEnvelope = serde_json::from_str(&json).unwrap();
        assert_eq!(back.token, "a\"b");
    }

    #[test]
    fn test_envelope_rejects_other_types() {
        let parsed = serde_json::from_str::<TokenEnvelope>(r#"{"type":"other","token":"x"}"#);
        let err = parsed.unwrap_err().to_string();
        assert!(err.contains("fcm_token"), "{err}");

        let untyped = serde_json::from_str::<TokenEnvelope>(r#"{"token":"x"}"#);
        assert!(untyped.is_err());

        let ok = serde_json::from_str::<TokenEnvelope>(r#"{"type":"fcm_token","token":"x"}"#);
        assert_eq!(ok.unwrap(), TokenEnvelope::new("x"));
    }

    #[test]
    fn test_store_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store = TokenStore::at(dir.path().join("push_token.json"));

        assert_eq!(store.load().unwrap(), None);
        store.save("first").unwrap();
        store.save("second").unwrap();
        assert_eq!(store.load().unwrap().as_deref(), Some("second"));
    }

    #[cfg(unix)]
    #[test]
    fn test_store_file_is_private() {
        let dir = tempfile::tempdir().unwrap();
        let store = TokenStore::at(dir.path().join("push_token.json"));
        store.save("secret").unwrap();

        let mode = fs::metadata(store.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn test_store_corrupt_file_errors() {
        let dir = tempfile::tempdir().unwrap();
        let store = TokenStore::at(dir.path().join("push_token.json"));
        fs::write(store.path(), "not json").unwrap();
        assert!(store.load().is_err());
    }
}
