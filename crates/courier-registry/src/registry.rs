//! Plugin lifecycle management, routing, and health tracking.
//!
//! [`PluginRegistry`] is the exclusive owner of adapter instances and their
//! health. It:
//!
//! - holds a **factory table** of available adapters (the compile-time
//!   counterpart of directory discovery) and instantiates them on load;
//! - drives lifecycle (`initialize` → `start` → `stop`) with per-plugin
//!   failure isolation: one adapter failing never affects the others;
//! - routes inbound messages by channel tag, refusing non-healthy adapters
//!   and demoting an adapter to `Degraded` when it raises;
//! - fans core events out to every loaded adapter regardless of health;
//! - sweeps adapter health on demand, restoring `Degraded` adapters whose
//!   probe reports `Healthy`.
//!
//! Adapter calls on the hot paths run inside spawned tasks, so a panicking
//! adapter is contained exactly like an erring one. Internal error text is
//! logged with plugin identifiers but never placed in a response.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::{error, info, warn};

use courier_core::{
    BoxedPlugin, Event, HealthState, Message, PluginConfig, Response, SharedCoreActions,
};

use crate::bus::EventSubscriber;
use crate::config::ConfigLoader;

/// Generic user-facing error line; adapter error text never leaks here.
const GENERIC_ERROR: &str = "An error occurred processing your request";

/// User-facing line for routing to a non-healthy adapter.
const UNAVAILABLE: &str = "Service temporarily unavailable";

/// Produces a fresh, uninitialised adapter instance.
pub type PluginFactory = Box<dyn Fn() -> BoxedPlugin + Send + Sync>;

/// Outcome of [`PluginRegistry::load_with_auto_config`].
///
/// `Disabled` is not an error: the plugin's configuration said
/// `enabled=false`, so it was deliberately skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    Loaded,
    Disabled,
    Failed,
}

/// Manages plugin lifecycle, routing, broadcast, and health.
pub struct PluginRegistry {
    core: SharedCoreActions,
    config_loader: ConfigLoader,
    factories: parking_lot::RwLock<HashMap<String, PluginFactory>>,
    plugins: RwLock<HashMap<String, BoxedPlugin>>,
    health: RwLock<HashMap<String, HealthState>>,
    stop_grace: Duration,
}

impl PluginRegistry {
    /// Creates a registry over the given core façade and config loader.
    pub fn new(core: SharedCoreActions, config_loader: ConfigLoader) -> Self {
        Self {
            core,
            config_loader,
            factories: parking_lot::RwLock::new(HashMap::new()),
            plugins: RwLock::new(HashMap::new()),
            health: RwLock::new(HashMap::new()),
            stop_grace: Duration::from_secs(5),
        }
    }

    /// Overrides the `stop_all` grace window.
    pub fn with_stop_grace(mut self, grace: Duration) -> Self {
        self.stop_grace = grace;
        self
    }

    // ─── Factory table ───────────────────────────────────────────────────

    /// Registers an adapter factory under its channel tag.
    ///
    /// This is the static counterpart of directory discovery: adapters are
    /// registered at wiring time, and [`discover`](Self::discover) lists
    /// what is available.
    pub fn register_factory(
        &self,
        name: impl Into<String>,
        factory: impl Fn() -> BoxedPlugin + Send + Sync + 'static,
    ) {
        let name = name.into();
        info!(plugin = %name, "Registered plugin factory");
        self.factories.write().insert(name, Box::new(factory));
    }

    /// Lists the registered adapter names, sorted.
    pub fn discover(&self) -> Vec<String> {
        let mut names: Vec<String> = self.factories.read().keys().cloned().collect();
        names.sort();
        names
    }

    // ─── Loading ─────────────────────────────────────────────────────────

    /// Loads and initialises a plugin with an already-validated config.
    ///
    /// Every failure step is caught, logged with the plugin name, and
    /// reported as `false` without affecting other plugins; no partial
    /// state is retained.
    pub async fn load(&self, plugin_name: &str, config: PluginConfig) -> bool {
        let Some(instance) = self.instantiate(plugin_name) else {
            return false;
        };
        self.install(plugin_name, instance, config).await
    }

    /// Loads a plugin end to end: instantiate once, probe its schema and
    /// version, run the config loader, then initialise the same instance.
    ///
    /// A plugin whose merged config carries `enabled=false` is not loaded
    /// at all; the outcome distinguishes that from an error.
    pub async fn load_with_auto_config(&self, plugin_name: &str) -> LoadOutcome {
        let Some(instance) = self.instantiate(plugin_name) else {
            return LoadOutcome::Failed;
        };

        let schema = instance.config_schema();
        let version = instance.version();

        let config = match self
            .config_loader
            .load_plugin_config(plugin_name, version, &schema)
        {
            Ok(config) => config,
            Err(e) => {
                error!(plugin = %plugin_name, error = %e, "Configuration error, plugin not loaded");
                return LoadOutcome::Failed;
            }
        };

        if !config.enabled {
            info!(plugin = %plugin_name, "Plugin is disabled, skipping load");
            return LoadOutcome::Disabled;
        }

        if self.install(plugin_name, instance, config).await {
            LoadOutcome::Loaded
        } else {
            LoadOutcome::Failed
        }
    }

    fn instantiate(&self, plugin_name: &str) -> Option<BoxedPlugin> {
        let factories = self.factories.read();
        let Some(factory) = factories.get(plugin_name) else {
            error!(plugin = %plugin_name, "No factory registered for plugin");
            return None;
        };
        let instance = factory();

        // The factory table and the instance must agree on the channel tag;
        // a mismatch would silently break routing.
        if instance.name() != plugin_name {
            error!(
                plugin = %plugin_name,
                reports = %instance.name(),
                "Plugin instance reports a different name than its registration"
            );
            return None;
        }

        Some(instance)
    }

    async fn install(&self, plugin_name: &str, instance: BoxedPlugin, config: PluginConfig) -> bool {
        let version = instance.version();

        if let Err(e) = instance.initialize(config, Arc::clone(&self.core)).await {
            error!(plugin = %plugin_name, error = %e, "Failed to initialize plugin");
            return false;
        }

        self.plugins
            .write()
            .await
            .insert(plugin_name.to_string(), instance);
        self.health
            .write()
            .await
            .insert(plugin_name.to_string(), HealthState::Healthy);

        info!(plugin = %plugin_name, version = %version, "Loaded plugin");
        true
    }

    // ─── Lifecycle ───────────────────────────────────────────────────────

    /// Starts every loaded plugin. A start failure marks that plugin
    /// `Unhealthy`; the others continue.
    pub async fn start_all(&self) {
        let plugins = self.snapshot().await;

        for (name, plugin) in plugins {
            let outcome = tokio::spawn(async move { plugin.start().await }).await;
            match outcome {
                Ok(Ok(())) => info!(plugin = %name, "Started plugin"),
                Ok(Err(e)) => {
                    error!(plugin = %name, error = %e, "Failed to start plugin");
                    self.set_health(&name, HealthState::Unhealthy).await;
                }
                Err(e) => {
                    error!(plugin = %name, error = %e, "Plugin start panicked");
                    self.set_health(&name, HealthState::Unhealthy).await;
                }
            }
        }
    }

    /// Stops every loaded plugin gracefully, waiting up to the configured
    /// grace window per plugin before giving up on it.
    pub async fn stop_all(&self) {
        let plugins = self.snapshot().await;

        for (name, plugin) in plugins {
            let mut stopping = tokio::spawn(async move { plugin.stop().await });
            match tokio::time::timeout(self.stop_grace, &mut stopping).await {
                Ok(Ok(Ok(()))) => {
                    self.set_health(&name, HealthState::Stopped).await;
                    info!(plugin = %name, "Stopped plugin");
                }
                Ok(Ok(Err(e))) => {
                    error!(plugin = %name, error = %e, "Error stopping plugin");
                }
                Ok(Err(e)) => {
                    error!(plugin = %name, error = %e, "Plugin stop panicked");
                }
                Err(_) => {
                    // Grace window exhausted; force termination.
                    stopping.abort();
                    warn!(plugin = %name, grace = ?self.stop_grace, "Plugin stop timed out");
                    self.set_health(&name, HealthState::Stopped).await;
                }
            }
        }
    }

    // ─── Routing (the hot path) ──────────────────────────────────────────

    /// Routes an inbound message to the adapter registered for
    /// `channel_type`.
    ///
    /// Never raises: unknown channels and non-healthy adapters produce
    /// error responses, and an adapter failure demotes it to `Degraded`
    /// while the caller receives a generic error line that carries none of
    /// the adapter's internal error text.
    pub async fn route_message(&self, channel_type: &str, message: Message) -> Response {
        let plugin = {
            let plugins = self.plugins.read().await;
            plugins.get(channel_type).cloned()
        };

        let Some(plugin) = plugin else {
            warn!(channel_type = %channel_type, "Unknown channel type");
            return Response::error(format!("Unknown channel type: {channel_type}"));
        };

        let health = self.plugin_health(channel_type).await;
        if health != Some(HealthState::Healthy) {
            warn!(
                channel_type = %channel_type,
                status = ?health,
                "Plugin is not healthy, refusing to route"
            );
            return Response::error(UNAVAILABLE);
        }

        let handled = tokio::spawn(async move { plugin.handle_message(message).await }).await;

        match handled {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => {
                error!(channel_type = %channel_type, error = %e, "Plugin error");
                self.set_health(channel_type, HealthState::Degraded).await;
                Response::error(GENERIC_ERROR)
            }
            Err(e) => {
                error!(channel_type = %channel_type, error = %e, "Plugin panicked handling message");
                self.set_health(channel_type, HealthState::Degraded).await;
                Response::error(GENERIC_ERROR)
            }
        }
    }

    // ─── Broadcast ───────────────────────────────────────────────────────

    /// Delivers a core event to every loaded adapter, independent of
    /// health. Events are informational; adapters decide whether to
    /// act.
    ///
    /// One adapter failing (or panicking) is logged and swallowed; the
    /// remaining adapters still receive the event, and event failures are
    /// not a liveness signal, so health is left untouched.
    pub async fn broadcast_event(&self, event: &Event) {
        info!(event = %event.event_type, "Broadcasting event");

        let plugins = self.snapshot().await;

        for (name, plugin) in plugins {
            let delivered = {
                let event = event.clone();
                tokio::spawn(async move { plugin.handle_event(&event).await }).await
            };
            match delivered {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    error!(
                        plugin = %name,
                        event = %event.event_type,
                        error = %e,
                        "Plugin failed to handle event"
                    );
                }
                Err(e) => {
                    error!(
                        plugin = %name,
                        event = %event.event_type,
                        error = %e,
                        "Plugin panicked handling event"
                    );
                }
            }
        }
    }

    // ─── Health ──────────────────────────────────────────────────────────

    /// Probes every adapter and records the reported state.
    ///
    /// A probe that fails (or panics) maps to `Unhealthy`. A `Degraded`
    /// adapter whose probe reports `Healthy` is restored and resumes
    /// receiving routed messages.
    pub async fn health_check_all(&self) -> HashMap<String, HealthState> {
        let plugins = self.snapshot().await;

        for (name, plugin) in plugins {
            let probed = tokio::spawn(async move { plugin.health_check().await }).await;
            let state = match probed {
                Ok(state) => state,
                Err(e) => {
                    error!(plugin = %name, error = %e, "Health check panicked");
                    HealthState::Unhealthy
                }
            };
            if state != HealthState::Healthy {
                warn!(plugin = %name, status = %state, "Plugin health check returned");
            }
            self.set_health(&name, state).await;
        }

        self.health.read().await.clone()
    }

    /// Returns the recorded health of one plugin.
    pub async fn plugin_health(&self, plugin_name: &str) -> Option<HealthState> {
        self.health.read().await.get(plugin_name).copied()
    }

    /// Returns a loaded plugin by name.
    pub async fn get_plugin(&self, plugin_name: &str) -> Option<BoxedPlugin> {
        self.plugins.read().await.get(plugin_name).cloned()
    }

    /// Names of all loaded plugins, sorted.
    pub async fn plugin_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.plugins.read().await.keys().cloned().collect();
        names.sort();
        names
    }

    async fn snapshot(&self) -> Vec<(String, BoxedPlugin)> {
        let plugins = self.plugins.read().await;
        let mut entries: Vec<(String, BoxedPlugin)> = plugins
            .iter()
            .map(|(name, plugin)| (name.clone(), Arc::clone(plugin)))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        entries
    }

    async fn set_health(&self, plugin_name: &str, state: HealthState) {
        self.health
            .write()
            .await
            .insert(plugin_name.to_string(), state);
    }
}

#[async_trait]
impl EventSubscriber for PluginRegistry {
    /// Bus deliveries fan out to every loaded adapter, in order per
    /// subscriber.
    async fn on_event(&self, event: Event) {
        self.broadcast_event(&event).await;
    }
}
