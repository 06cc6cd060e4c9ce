//! # Courier Gateway
//!
//! The HTTP edge of the plugin bus: one webhook endpoint per integration,
//! OAuth authorize/callback plumbing, and a liveness probe.
//!
//! ```text
//! POST /plugins/{name}/webhook          signature → parse → route → serialise
//! GET  /plugins/{name}/oauth/authorize  302 to the platform consent page
//! GET  /plugins/{name}/oauth/callback   code exchange → installation stored
//! GET  /plugins/health                  liveness, no adapter involvement
//! ```
//!
//! Per inbound request the ordering is strict: signature verification
//! happens before any parsing, parsing before routing, routing before
//! serialisation. Authentication failures return 401 and malformed
//! envelopes 400; adapter-layer errors surface as HTTP 200 with an
//! `error`-typed body so the platform does not retry.
//!
//! Adapters plug in through two capability traits: [`WebhookCodec`]
//! (verify + decode + encode for one platform's payloads) and
//! [`OAuthProvider`] (authorisation URL + code exchange).

pub mod codec;
pub mod error;
pub mod oauth;
pub mod router;
pub mod signature;
pub mod state;

pub use codec::{WebhookCodec, WebhookPayload};
pub use error::GatewayError;
pub use oauth::{InstallSummary, OAuthError, OAuthProvider};
pub use router::{Gateway, GatewayBuilder, ServerHandle, serve};
pub use state::OAuthStateStore;
