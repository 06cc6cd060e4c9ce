//! The plugin contract: the capability set every channel adapter must
//! satisfy.
//!
//! Adapters bridge one external communication platform (Slack, WhatsApp, …)
//! with the Courier bus. The registry owns adapter instances and their
//! health state; adapters report health via [`ChannelPlugin::health_check`]
//! but the registry also transitions health on observed failures.
//!
//! # Re-entrancy
//!
//! [`handle_message`](ChannelPlugin::handle_message) and
//! [`handle_event`](ChannelPlugin::handle_event) may be invoked
//! concurrently; the registry does not serialise routed messages per
//! adapter. Adapters keep mutable state behind interior mutability and must
//! not block the registry indefinitely; `stop()` should cancel in-flight
//! work cooperatively.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::action::SharedCoreActions;
use crate::error::PluginResult;
use crate::event::Event;
use crate::message::Message;
use crate::response::Response;
use crate::schema::ConfigSchema;

// =============================================================================
// Health
// =============================================================================

/// Adapter health as tracked by the registry.
///
/// `Degraded` means the adapter has raised during message handling since
/// its last health check; routing skips it until the next `Healthy` report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthState {
    Healthy,
    Degraded,
    Unhealthy,
    Stopped,
}

impl HealthState {
    pub fn as_str(&self) -> &'static str {
        match self {
            HealthState::Healthy => "healthy",
            HealthState::Degraded => "degraded",
            HealthState::Unhealthy => "unhealthy",
            HealthState::Stopped => "stopped",
        }
    }
}

impl std::fmt::Display for HealthState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// PluginConfig
// =============================================================================

/// What the bus hands an adapter at construction.
///
/// Built once by the config loader from schema defaults, config files, and
/// environment; immutable for the life of the adapter instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PluginConfig {
    pub plugin_name: String,
    pub plugin_version: String,
    pub enabled: bool,
    /// Validated adapter-specific configuration.
    pub config: Map<String, Value>,
}

impl PluginConfig {
    /// Creates an enabled config for tests and manual wiring.
    pub fn new(plugin_name: impl Into<String>, plugin_version: impl Into<String>) -> Self {
        Self {
            plugin_name: plugin_name.into(),
            plugin_version: plugin_version.into(),
            enabled: true,
            config: Map::new(),
        }
    }

    /// Inserts a config value.
    pub fn with_value(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.config.insert(key.into(), value.into());
        self
    }

    /// Returns a config value as a string slice.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.config.get(key).and_then(Value::as_str)
    }
}

// =============================================================================
// ChannelPlugin trait
// =============================================================================

/// A shared channel adapter trait object.
pub type BoxedPlugin = Arc<dyn ChannelPlugin>;

/// The capability set every channel adapter must satisfy.
///
/// Identity methods (`name`, `version`, `config_schema`) must be callable
/// on a bare, uninitialised instance, because the registry probes them before the
/// adapter's configuration even exists.
#[async_trait]
pub trait ChannelPlugin: Send + Sync {
    /// Short channel tag, e.g. `slack`. Doubles as the routing key.
    fn name(&self) -> &'static str;

    /// Semver version string of the adapter.
    fn version(&self) -> &'static str;

    /// The configuration schema this adapter expects.
    fn config_schema(&self) -> ConfigSchema;

    /// Initialises the adapter with its validated configuration and a
    /// shared handle to the core façade.
    ///
    /// Called once during load, before `start`. Failure aborts the load; no
    /// partial state may remain observable.
    async fn initialize(&self, config: PluginConfig, core: SharedCoreActions) -> PluginResult<()>;

    /// Activates the adapter (open connections, register background work).
    async fn start(&self) -> PluginResult<()>;

    /// Stops the adapter gracefully, cancelling in-flight work.
    async fn stop(&self) -> PluginResult<()>;

    /// Reports current health. Exceptions map to `Unhealthy` at the
    /// registry.
    async fn health_check(&self) -> HealthState;

    /// Handles one inbound, channel-agnostic message.
    ///
    /// This is the hot path; it must be safe to enter concurrently.
    async fn handle_message(&self, message: Message) -> PluginResult<Response>;

    /// Pushes a message out to the channel (proactive notifications).
    ///
    /// Returns `false` on delivery failure; outbound sends are
    /// best-effort and never raise.
    async fn send_message(&self, channel_id: &str, user_id: &str, response: &Response) -> bool;

    /// Consumes one core event. Adapters ignore event types they do not
    /// subscribe to.
    async fn handle_event(&self, event: &Event) -> PluginResult<()>;
}
