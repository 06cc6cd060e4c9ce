//! Installation records and partial updates.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One workspace's installation of one plugin.
///
/// Uniquely identified by `(plugin_name, channel_id)`; the surrogate `id`
/// exists for references only. Token fields hold plaintext in memory; the
/// store encrypts on write and decrypts on read, so ciphertext never leaks
/// through this type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Installation {
    /// Surrogate row id; `None` until persisted.
    pub id: Option<i64>,
    /// Plugin tag, e.g. `slack`.
    pub plugin_name: String,
    /// Opaque workspace handle (team id, phone number, …).
    pub channel_id: String,
    /// OAuth access token (plaintext in memory only).
    pub access_token: String,
    /// OAuth refresh token, when the platform issues one.
    pub refresh_token: Option<String>,
    /// Plugin-specific metadata (bot user id, workspace name, scopes, …).
    pub metadata: Map<String, Value>,
    pub installed_at: DateTime<Utc>,
    pub last_active: DateTime<Utc>,
    /// Inactive installations behave as absent for routing and OAuth replay.
    pub is_active: bool,
}

impl Installation {
    /// Creates an active, unsaved installation.
    pub fn new(
        plugin_name: impl Into<String>,
        channel_id: impl Into<String>,
        access_token: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: None,
            plugin_name: plugin_name.into(),
            channel_id: channel_id.into(),
            access_token: access_token.into(),
            refresh_token: None,
            metadata: Map::new(),
            installed_at: now,
            last_active: now,
            is_active: true,
        }
    }

    /// Sets the refresh token.
    pub fn with_refresh_token(mut self, token: impl Into<String>) -> Self {
        self.refresh_token = Some(token.into());
        self
    }

    /// Replaces the metadata map.
    pub fn with_metadata(mut self, metadata: Map<String, Value>) -> Self {
        self.metadata = metadata;
        self
    }

    /// Returns a metadata entry as a string slice.
    pub fn metadata_str(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).and_then(Value::as_str)
    }
}

/// A partial update to an installation.
///
/// `None` fields are left untouched; `last_active` is stamped on every
/// update regardless.
#[derive(Debug, Clone, Default)]
pub struct InstallationUpdate {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub metadata: Option<Map<String, Value>>,
    pub is_active: Option<bool>,
}

impl InstallationUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }

    pub fn refresh_token(mut self, token: impl Into<String>) -> Self {
        self.refresh_token = Some(token.into());
        self
    }

    pub fn metadata(mut self, metadata: Map<String, Value>) -> Self {
        self.metadata = Some(metadata);
        self
    }

    pub fn is_active(mut self, active: bool) -> Self {
        self.is_active = Some(active);
        self
    }

    /// True when no field would change.
    pub fn is_empty(&self) -> bool {
        self.access_token.is_none()
            && self.refresh_token.is_none()
            && self.metadata.is_none()
            && self.is_active.is_none()
    }
}
