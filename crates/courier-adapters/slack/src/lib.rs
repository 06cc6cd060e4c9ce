//! Slack adapter for the Courier plugin bus.
//!
//! The reference channel adapter: it translates Slack's vocabulary (slash
//! commands, interactive components, Events API envelopes, Block Kit) into
//! the bus's channel-agnostic [`Message`]/[`Response`] model and back.
//!
//! Pieces:
//!
//! - [`SlackPlugin`]: the [`ChannelPlugin`] implementation with command
//!   routing, the workspace isolation gate, core-event notifications
//! - [`SlackWebhook`]: the gateway codec, signature verification and
//!   payload decoding for `/plugins/slack/webhook`
//! - [`SlackOAuth`]: the OAuth v2 flow, consent URL, code exchange,
//!   encrypted installation storage, token refresh
//! - [`commands`]: payload → [`Message`] parsers
//! - [`blocks`]: [`Response`] → Block Kit rendering
//!
//! # Wiring
//!
//! ```rust,ignore
//! let storage = Arc::new(InstallationStore::open(path, cipher)?);
//! registry.register_factory("slack", SlackPlugin::factory(storage.clone()));
//! registry.load_with_auto_config("slack").await;
//!
//! let gateway = Gateway::builder(registry)
//!     .codec(Arc::new(SlackWebhook::new(signing_secret)))
//!     .oauth("slack", Arc::new(oauth))
//!     .build();
//! ```
//!
//! [`Message`]: courier_core::Message
//! [`Response`]: courier_core::Response
//! [`ChannelPlugin`]: courier_core::ChannelPlugin

pub mod adapter;
pub mod blocks;
pub mod client;
pub mod commands;
pub mod config;
pub mod oauth;
pub mod webhook;

pub use adapter::SlackPlugin;
pub use config::SlackConfig;
pub use oauth::{SlackOAuth, SlackTokens};
pub use webhook::SlackWebhook;
