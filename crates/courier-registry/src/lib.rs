//! # Courier Registry
//!
//! The heart of the plugin bus: adapter lifecycle, health-driven routing,
//! event fan-out, and layered plugin configuration.
//!
//! # Architecture
//!
//! ```text
//!                    ┌──────────────┐
//!  Gateway ─route──▶ │   Registry   │ ──handle_message──▶ Adapter
//!                    │  (health map)│
//!  EventBus ─event─▶ │              │ ──handle_event────▶ Adapter
//!                    └──────────────┘
//!                           ▲
//!                     ConfigLoader (defaults → file → env)
//! ```
//!
//! The registry exclusively owns adapter instances and their health state.
//! Failures inside one adapter never propagate to another: message
//! handling, event delivery, and health probes all run in isolated tasks,
//! and the raised error text never reaches the response surface.

pub mod bus;
pub mod config;
pub mod logging;
pub mod registry;

pub use bus::{EventBus, EventSubscriber};
pub use config::{ConfigError, ConfigLoader};
pub use registry::{LoadOutcome, PluginRegistry};
