//! # Courier Core
//!
//! Core contracts and data model for the Courier plugin bus.
//!
//! This crate defines the channel-agnostic vocabulary every piece of the bus
//! speaks:
//!
//! - **Messages**: inbound user interactions, normalised away from any
//!   specific chat platform ([`Message`])
//! - **Responses**: outbound replies plugins hand back for the gateway to
//!   serialise ([`Response`])
//! - **Events**: notifications the triage engine publishes for plugins to
//!   consume ([`Event`], [`EventType`])
//! - **The plugin contract**: the capability set every channel adapter must
//!   satisfy ([`ChannelPlugin`])
//! - **The core façade**: the stable, validated entry points plugins call
//!   into the triage engine ([`CoreActions`], [`ActionResult`])
//! - **Config schemas**: the typed schema model adapters declare and the
//!   config loader validates against ([`ConfigSchema`])
//!
//! # Architecture
//!
//! ```text
//! Gateway ──Message──▶ Registry ──▶ ChannelPlugin ──▶ CoreActions
//!    ▲                                   │
//!    └───────────Response────────────────┘
//!
//! Triage engine ──Event──▶ EventBus ──▶ Registry ──▶ ChannelPlugin
//! ```
//!
//! Ownership is deliberately one-directional: the registry owns adapter
//! instances and their health, adapters hold a shared reference to the core
//! façade but never own it.

pub mod action;
pub mod error;
pub mod event;
pub mod message;
pub mod plugin;
pub mod response;
pub mod schema;

pub use action::{ActionResult, CoreActions, ErrorCode, SharedCoreActions};
pub use error::{PluginError, PluginResult};
pub use event::{Event, EventPublisher, EventType};
pub use message::Message;
pub use plugin::{BoxedPlugin, ChannelPlugin, HealthState, PluginConfig};
pub use response::{ActionStyle, Attachment, Response, ResponseAction, ResponseType};
pub use schema::{ConfigSchema, PropertySpec, SchemaType, SchemaViolation};

/// Prelude for common imports.
pub mod prelude {
    pub use super::action::{ActionResult, CoreActions, ErrorCode};
    pub use super::error::{PluginError, PluginResult};
    pub use super::event::{Event, EventType};
    pub use super::message::Message;
    pub use super::plugin::{ChannelPlugin, HealthState, PluginConfig};
    pub use super::response::{Response, ResponseType};
    pub use super::schema::ConfigSchema;
}
