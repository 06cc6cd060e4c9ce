//! Per-platform webhook codec capability.

use axum::http::HeaderMap;

use courier_core::{Message, Response};

use crate::error::GatewayError;

/// What a platform payload decoded into.
#[derive(Debug)]
pub enum WebhookPayload {
    /// A URL-verification challenge to echo straight back.
    Challenge(String),
    /// A user interaction to route through the registry.
    Inbound(Message),
    /// A payload the integration deliberately ignores (channel chatter,
    /// unsubscribed event types).
    Ignored,
}

/// One platform's webhook dialect: authentication, payload decoding, and
/// response serialisation.
///
/// The gateway drives these strictly in order (`verify` before `decode`,
/// `decode` before routing), so implementations can assume an
/// authenticated body by the time `decode` runs.
pub trait WebhookCodec: Send + Sync {
    /// Channel tag this codec serves, e.g. `slack`.
    fn plugin_name(&self) -> &'static str;

    /// Authenticates the raw request (signature + replay checks).
    fn verify(&self, headers: &HeaderMap, body: &[u8]) -> Result<(), GatewayError>;

    /// Parses the authenticated body into a routable payload.
    fn decode(&self, content_type: &str, body: &[u8]) -> Result<WebhookPayload, GatewayError>;

    /// Serialises a bus response into the platform's reply shape.
    fn encode(&self, response: &Response) -> serde_json::Value;
}
