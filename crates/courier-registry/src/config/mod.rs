//! Layered plugin configuration.
//!
//! Three layers merge into one validated [`PluginConfig`], later layers
//! overriding earlier ones:
//!
//! 1. defaults declared in the adapter's schema
//! 2. a `{plugin}.yaml` / `{plugin}.yml` / `{plugin}.toml` file in the
//!    configured directory (first hit wins)
//! 3. `PLUGIN_{NAME}_{KEY}` environment variables (double underscore for
//!    nesting, values parsed as JSON first with a raw-string fallback)
//!
//! Validation failure is fast and loud: the error names the plugin and the
//! failing key, and the plugin is never instantiated.
//!
//! [`PluginConfig`]: courier_core::PluginConfig

mod error;
mod loader;

pub use error::ConfigError;
pub use loader::ConfigLoader;
