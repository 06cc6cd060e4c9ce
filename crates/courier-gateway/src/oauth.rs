//! OAuth provider capability and error type.

use async_trait::async_trait;
use thiserror::Error;
use tracing::error;

/// An OAuth failure with a user-presentable message.
///
/// `message` is safe to render on the callback error page; `details`
/// carries the technical cause and goes to the logs only. Neither field
/// ever contains the client secret or a token.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct OAuthError {
    /// User-friendly message.
    pub message: String,
    /// Stable platform error code, e.g. `invalid_code`.
    pub code: Option<String>,
    /// Technical detail, logged but never rendered.
    pub details: Option<String>,
}

impl OAuthError {
    /// Creates an error and logs its internal details.
    pub fn new(
        message: impl Into<String>,
        code: Option<String>,
        details: Option<String>,
    ) -> Self {
        let err = Self {
            message: message.into(),
            code,
            details,
        };
        error!(
            error_code = ?err.code,
            details = ?err.details,
            "OAuth error occurred"
        );
        err
    }
}

/// Summary of a completed installation, for the success page.
#[derive(Debug, Clone)]
pub struct InstallSummary {
    /// Workspace-scope channel id.
    pub channel_id: String,
    /// Human-readable workspace name, when the platform provides one.
    pub channel_name: Option<String>,
}

/// One platform's OAuth flow: consent URL composition and code exchange.
///
/// `complete_install` covers exchange *and* persistence: on success the
/// installation is already stored with encrypted tokens.
#[async_trait]
pub trait OAuthProvider: Send + Sync {
    /// Composes the platform authorisation URL carrying the CSRF `state`.
    fn authorize_url(&self, state: &str) -> String;

    /// Exchanges the callback `code` and persists the installation.
    async fn complete_install(&self, code: &str) -> Result<InstallSummary, OAuthError>;
}
