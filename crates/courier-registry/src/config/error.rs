//! Configuration error types.

use courier_core::SchemaViolation;
use thiserror::Error;

/// Errors raised while loading or validating plugin configuration.
///
/// Messages name the plugin and, for validation failures, the failing key
/// path, never the offending value, which may be a secret.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The merged layers could not be combined into a config map.
    #[error("failed to merge configuration for plugin '{plugin}': {source}")]
    Merge {
        /// Plugin being configured.
        plugin: String,
        #[source]
        source: Box<figment::Error>,
    },

    /// The merged config violated the adapter's schema.
    #[error("invalid configuration for plugin '{plugin}': {violation}")]
    Validation {
        /// Plugin being configured.
        plugin: String,
        #[source]
        violation: SchemaViolation,
    },
}

/// Result type for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;
