//! Minimal Slack Web API client.

use std::time::Duration;

use reqwest::Client;
use serde_json::{Value, json};
use tracing::debug;

use courier_core::{PluginError, PluginResult};

use crate::blocks::Block;

const API_BASE: &str = "https://slack.com/api";

/// Default deadline for outbound platform calls.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Thin wrapper over the two Web API methods the adapter needs.
#[derive(Clone)]
pub struct SlackApiClient {
    http: Client,
    base_url: String,
}

impl SlackApiClient {
    pub fn new() -> Self {
        Self::with_base_url(API_BASE)
    }

    /// Points the client at a different API base. Intended for tests.
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        let http = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .expect("reqwest client construction cannot fail with static options");

        Self {
            http,
            base_url: base_url.into(),
        }
    }

    /// Posts a message via `chat.postMessage`.
    pub async fn post_message(
        &self,
        token: &str,
        channel: &str,
        text: &str,
        blocks: &[Block],
    ) -> PluginResult<()> {
        let mut body = json!({
            "channel": channel,
            "text": text,
        });
        if !blocks.is_empty() {
            body["blocks"] =
                serde_json::to_value(blocks).map_err(|e| PluginError::Api(e.to_string()))?;
        }

        let response = self
            .http
            .post(format!("{}/chat.postMessage", self.base_url))
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .map_err(|e| PluginError::Api(e.to_string()))?;

        let payload: Value = response
            .json()
            .await
            .map_err(|e| PluginError::Api(e.to_string()))?;

        if payload.get("ok").and_then(Value::as_bool) != Some(true) {
            let code = payload
                .get("error")
                .and_then(Value::as_str)
                .unwrap_or("unknown_error");
            return Err(PluginError::Api(code.to_string()));
        }

        debug!(channel = %channel, "Posted message");
        Ok(())
    }

    /// Probes authentication via `auth.test`.
    pub async fn auth_test(&self, token: &str) -> PluginResult<bool> {
        let response = self
            .http
            .post(format!("{}/auth.test", self.base_url))
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| PluginError::Api(e.to_string()))?;

        let payload: Value = response
            .json()
            .await
            .map_err(|e| PluginError::Api(e.to_string()))?;

        Ok(payload.get("ok").and_then(Value::as_bool) == Some(true))
    }
}

impl Default for SlackApiClient {
    fn default() -> Self {
        Self::new()
    }
}
