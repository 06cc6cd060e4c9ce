//! Error vocabulary for channel adapters.
//!
//! Adapters use these internally; the registry catches everything at the
//! routing boundary, so none of this text ever reaches a user.

use thiserror::Error;

/// Errors a channel adapter can raise.
#[derive(Debug, Clone, Error)]
pub enum PluginError {
    /// Initialisation failed (bad credentials, missing config, …).
    #[error("plugin initialization failed: {reason}")]
    Initialization {
        /// Reason for failure.
        reason: String,
    },

    /// A lifecycle method was called before `initialize`.
    #[error("plugin is not initialized")]
    NotInitialized,

    /// The platform API rejected a call.
    #[error("platform API error: {0}")]
    Api(String),

    /// Message handling failed inside the adapter.
    #[error("message handling failed: {0}")]
    Handler(String),

    /// Persistent storage failure surfaced through the adapter.
    #[error("storage error: {0}")]
    Storage(String),

    /// Anything else.
    #[error("{0}")]
    Other(String),
}

impl PluginError {
    /// Creates an initialisation error.
    pub fn initialization(reason: impl Into<String>) -> Self {
        Self::Initialization {
            reason: reason.into(),
        }
    }
}

/// Result type for adapter operations.
pub type PluginResult<T> = Result<T, PluginError>;
