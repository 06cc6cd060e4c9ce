//! # Courier
//!
//! A channel-agnostic plugin bus that lets messaging platforms drive a
//! task-triage engine through one uniform interface.
//!
//! ## Overview
//!
//! Courier fuses two subsystems: a task-triage engine that ranks tracker
//! issues into a daily plan, and a plugin bus that connects chat platforms
//! (Slack first, others pluggable) to that engine: inbound commands route
//! through a health-tracking registry, outbound events fan out over an
//! in-process bus, and per-workspace OAuth installations live encrypted at
//! rest.
//!
//! ## Architecture
//!
//! ```text
//!                 ┌─────────┐      ┌──────────┐      ┌─────────────┐
//!  Platform ────▶ │ Gateway │ ───▶ │ Registry │ ───▶ │   Adapter   │
//!  webhooks       │ (axum)  │      │ (health) │      │   (slack)   │
//!                 └─────────┘      └──────────┘      └──────┬──────┘
//!                                       ▲                   │
//!                                   ┌───┴────┐      ┌───────▼───────┐
//!  Triage engine ──publish────────▶ │EventBus│      │  CoreActions  │
//!                                   └────────┘      │ (TriageActions)│
//!                                                   └───────────────┘
//! ```
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use courier::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let cipher = TokenCipher::from_passphrase(&std::env::var("COURIER_CIPHER_KEY")?)?;
//!     let storage = Arc::new(InstallationStore::open(Path::new("courier.db"), cipher)?);
//!
//!     let actions: SharedCoreActions = Arc::new(
//!         TriageActions::builder()
//!             .task_source(tracker_client)
//!             .ledger(Arc::new(InMemoryClosureLedger::new()))
//!             .build(),
//!     );
//!
//!     let registry = Arc::new(PluginRegistry::new(
//!         actions,
//!         ConfigLoader::with_config_dir("config/plugins"),
//!     ));
//!     registry.register_factory("slack", SlackPlugin::factory(storage.clone()));
//!     registry.load_with_auto_config("slack").await;
//!     registry.start_all().await;
//!
//!     let bus = EventBus::new();
//!     bus.subscribe("registry", registry.clone());
//!
//!     let gateway = Gateway::builder(registry)
//!         .codec(Arc::new(SlackWebhook::new(signing_secret)))
//!         .oauth("slack", Arc::new(oauth))
//!         .build();
//!     let handle = serve("0.0.0.0:8080", gateway.router()).await?;
//!     Ok(())
//! }
//! ```

// Core contracts and data model
pub use courier_core as core;

// Subsystems
pub use courier_adapter_slack as slack;
pub use courier_gateway as gateway;
pub use courier_registry as registry;
pub use courier_store as store;
pub use courier_triage as triage;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use courier_core::{
        ActionResult, ChannelPlugin, CoreActions, ErrorCode, Event, EventType, HealthState,
        Message, PluginConfig, Response, ResponseType, SharedCoreActions,
    };

    pub use courier_gateway::{Gateway, serve};
    pub use courier_registry::{ConfigLoader, EventBus, LoadOutcome, PluginRegistry};
    pub use courier_store::{Installation, InstallationStore, TokenCipher};
    pub use courier_triage::{InMemoryClosureLedger, InMemoryTaskSource, TriageActions};

    pub use courier_adapter_slack::{SlackOAuth, SlackPlugin, SlackWebhook};
}
