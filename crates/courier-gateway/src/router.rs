//! The gateway router and its HTTP handlers.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode, header::CONTENT_TYPE};
use axum::response::{Html, IntoResponse, Redirect, Response as HttpResponse};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;
use tokio::sync::oneshot;
use tracing::{error, info, warn};

use courier_core::Response;
use courier_registry::PluginRegistry;

use crate::codec::{WebhookCodec, WebhookPayload};
use crate::error::GatewayError;
use crate::oauth::OAuthProvider;
use crate::state::OAuthStateStore;

/// Default end-to-end deadline for webhook routing.
const DEFAULT_DEADLINE: Duration = Duration::from_secs(30);

/// Best-effort reply when routing exceeds the deadline.
const TIMEOUT_MESSAGE: &str = "Request timed out. Please try again.";

/// Shared gateway state: the registry plus per-plugin codecs and OAuth
/// providers.
pub struct Gateway {
    registry: Arc<PluginRegistry>,
    codecs: HashMap<String, Arc<dyn WebhookCodec>>,
    oauth: HashMap<String, Arc<dyn OAuthProvider>>,
    states: OAuthStateStore,
    deadline: Duration,
}

impl Gateway {
    pub fn builder(registry: Arc<PluginRegistry>) -> GatewayBuilder {
        GatewayBuilder {
            registry,
            codecs: HashMap::new(),
            oauth: HashMap::new(),
            states: OAuthStateStore::default(),
            deadline: DEFAULT_DEADLINE,
        }
    }

    /// Builds the axum router over this gateway.
    pub fn router(self: Arc<Self>) -> Router {
        Router::new()
            .route("/plugins/health", get(health))
            .route("/plugins/{name}/webhook", post(webhook))
            .route("/plugins/{name}/oauth/authorize", get(oauth_authorize))
            .route("/plugins/{name}/oauth/callback", get(oauth_callback))
            .with_state(self)
    }
}

/// Builder for [`Gateway`].
pub struct GatewayBuilder {
    registry: Arc<PluginRegistry>,
    codecs: HashMap<String, Arc<dyn WebhookCodec>>,
    oauth: HashMap<String, Arc<dyn OAuthProvider>>,
    states: OAuthStateStore,
    deadline: Duration,
}

impl GatewayBuilder {
    /// Registers a webhook codec under its plugin name.
    pub fn codec(mut self, codec: Arc<dyn WebhookCodec>) -> Self {
        self.codecs.insert(codec.plugin_name().to_string(), codec);
        self
    }

    /// Registers an OAuth provider for a plugin.
    pub fn oauth(mut self, plugin_name: impl Into<String>, provider: Arc<dyn OAuthProvider>) -> Self {
        self.oauth.insert(plugin_name.into(), provider);
        self
    }

    /// Overrides the routing deadline.
    pub fn deadline(mut self, deadline: Duration) -> Self {
        self.deadline = deadline;
        self
    }

    /// Overrides the OAuth state TTL.
    pub fn state_ttl(mut self, ttl: Duration) -> Self {
        self.states = OAuthStateStore::new(ttl);
        self
    }

    pub fn build(self) -> Arc<Gateway> {
        Arc::new(Gateway {
            registry: self.registry,
            codecs: self.codecs,
            oauth: self.oauth,
            states: self.states,
            deadline: self.deadline,
        })
    }
}

// =============================================================================
// Handlers
// =============================================================================

/// `POST /plugins/{name}/webhook`
async fn webhook(
    State(gateway): State<Arc<Gateway>>,
    Path(name): Path<String>,
    headers: HeaderMap,
    body: axum::body::Bytes,
) -> HttpResponse {
    let Some(codec) = gateway.codecs.get(&name) else {
        return GatewayError::UnknownPlugin(name).into_response();
    };

    // Authentication strictly precedes parsing. The bad signature itself
    // is never logged.
    if let Err(e) = codec.verify(&headers, &body) {
        warn!(plugin = %name, reason = %e, "Webhook rejected");
        return e.into_response();
    }

    let content_type = headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    let payload = match codec.decode(content_type, &body) {
        Ok(payload) => payload,
        Err(e) => {
            warn!(plugin = %name, reason = %e, "Malformed webhook payload");
            return e.into_response();
        }
    };

    match payload {
        WebhookPayload::Challenge(challenge) => {
            info!(plugin = %name, "Answering URL verification challenge");
            (StatusCode::OK, Json(json!({"challenge": challenge}))).into_response()
        }
        WebhookPayload::Ignored => (StatusCode::OK, Json(json!({"ok": true}))).into_response(),
        WebhookPayload::Inbound(message) => {
            let routed =
                tokio::time::timeout(gateway.deadline, gateway.registry.route_message(&name, message))
                    .await;

            let response = match routed {
                Ok(response) => response,
                Err(_) => {
                    warn!(plugin = %name, deadline = ?gateway.deadline, "Routing deadline exceeded");
                    Response::error(TIMEOUT_MESSAGE)
                }
            };

            // Adapter-layer errors still return 200 so the platform does
            // not retry.
            (StatusCode::OK, Json(codec.encode(&response))).into_response()
        }
    }
}

/// `GET /plugins/{name}/oauth/authorize`
async fn oauth_authorize(
    State(gateway): State<Arc<Gateway>>,
    Path(name): Path<String>,
) -> HttpResponse {
    let Some(provider) = gateway.oauth.get(&name) else {
        return GatewayError::UnknownPlugin(name).into_response();
    };

    let state = gateway.states.issue();
    let url = provider.authorize_url(&state);

    info!(plugin = %name, "Redirecting to platform authorization");
    Redirect::temporary(&url).into_response()
}

#[derive(Debug, Deserialize)]
struct CallbackParams {
    code: Option<String>,
    state: Option<String>,
    error: Option<String>,
}

/// `GET /plugins/{name}/oauth/callback`
async fn oauth_callback(
    State(gateway): State<Arc<Gateway>>,
    Path(name): Path<String>,
    Query(params): Query<CallbackParams>,
) -> HttpResponse {
    let Some(provider) = gateway.oauth.get(&name) else {
        return GatewayError::UnknownPlugin(name).into_response();
    };

    if let Some(error) = params.error {
        warn!(plugin = %name, platform_error = %error, "OAuth callback carried an error");
        return error_page(
            StatusCode::BAD_REQUEST,
            "Authorization was not completed. Please try installing again.",
        );
    }

    // The state must round-trip; absence or mismatch is an authentication
    // failure.
    let state_ok = params
        .state
        .as_deref()
        .is_some_and(|s| gateway.states.consume(s));
    if !state_ok {
        warn!(plugin = %name, "OAuth callback with missing or mismatched state");
        return error_page(
            StatusCode::UNAUTHORIZED,
            "This installation link has expired or was tampered with. Please start again.",
        );
    }

    let Some(code) = params.code else {
        return error_page(
            StatusCode::BAD_REQUEST,
            "No authorization code was provided. Please start the installation again.",
        );
    };

    match provider.complete_install(&code).await {
        Ok(summary) => {
            info!(plugin = %name, channel_id = %summary.channel_id, "Installation completed");
            success_page(summary.channel_name.as_deref())
        }
        Err(e) => {
            error!(plugin = %name, error_code = ?e.code, "Installation failed");
            error_page(StatusCode::BAD_REQUEST, &e.message)
        }
    }
}

/// `GET /plugins/health`: liveness only, never touches adapters.
async fn health() -> HttpResponse {
    (
        StatusCode::OK,
        Json(json!({
            "status": "ok",
            "service": "courier",
            "version": env!("CARGO_PKG_VERSION"),
            "timestamp": chrono::Utc::now().to_rfc3339(),
        })),
    )
        .into_response()
}

// Tokens never appear on either page.
fn success_page(channel_name: Option<&str>) -> HttpResponse {
    let workspace = channel_name
        .map(|n| format!(" to <strong>{}</strong>", escape_html(n)))
        .unwrap_or_default();
    let body = format!(
        "<html><body><h1>Installation complete</h1>\
         <p>Courier has been added{workspace}. You can close this window.</p>\
         </body></html>"
    );
    (StatusCode::OK, Html(body)).into_response()
}

fn error_page(status: StatusCode, message: &str) -> HttpResponse {
    let body = format!(
        "<html><body><h1>Installation failed</h1><p>{}</p></body></html>",
        escape_html(message)
    );
    (status, Html(body)).into_response()
}

fn escape_html(raw: &str) -> String {
    raw.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

// =============================================================================
// Serving
// =============================================================================

/// Handle for a running gateway server.
pub struct ServerHandle {
    addr: SocketAddr,
    shutdown: oneshot::Sender<()>,
}

impl ServerHandle {
    /// The address the server actually bound.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Signals the server to shut down.
    pub fn stop(self) {
        let _ = self.shutdown.send(());
    }
}

/// Binds `addr` and serves the router in a background task.
pub async fn serve(addr: &str, router: Router) -> std::io::Result<ServerHandle> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    let actual_addr = listener.local_addr()?;

    info!(addr = %actual_addr, "Gateway listening");

    let (shutdown_tx, mut shutdown_rx) = oneshot::channel();

    tokio::spawn(async move {
        let server = axum::serve(listener, router);
        tokio::select! {
            result = server => {
                if let Err(e) = result {
                    error!(error = %e, "Gateway server error");
                }
            }
            _ = &mut shutdown_rx => {
                info!("Gateway shutting down");
            }
        }
    });

    Ok(ServerHandle {
        addr: actual_addr,
        shutdown: shutdown_tx,
    })
}
