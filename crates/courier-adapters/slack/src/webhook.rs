//! Gateway codec for Slack webhooks.

use std::collections::HashMap;

use axum::http::HeaderMap;
use serde_json::{Value, json};
use tracing::debug;

use courier_core::Response;
use courier_gateway::{GatewayError, WebhookCodec, WebhookPayload, signature};

use crate::blocks::response_to_blocks;
use crate::commands;

const TIMESTAMP_HEADER: &str = "x-slack-request-timestamp";
const SIGNATURE_HEADER: &str = "x-slack-signature";

/// Slack's webhook dialect: `v0` HMAC signatures, three payload shapes
/// (form-encoded slash commands, form-wrapped interactive JSON, JSON
/// Events API envelopes), and Block Kit replies.
pub struct SlackWebhook {
    signing_secret: String,
}

impl SlackWebhook {
    pub fn new(signing_secret: impl Into<String>) -> Self {
        Self {
            signing_secret: signing_secret.into(),
        }
    }

    fn decode_json(&self, payload: &Value) -> Result<WebhookPayload, GatewayError> {
        match payload.get("type").and_then(Value::as_str) {
            Some("url_verification") => {
                let challenge = payload
                    .get("challenge")
                    .and_then(Value::as_str)
                    .ok_or_else(|| {
                        GatewayError::MalformedPayload("url_verification without challenge".into())
                    })?;
                Ok(WebhookPayload::Challenge(challenge.to_string()))
            }
            Some("event_callback") => Ok(self.decode_event_callback(payload)),
            Some("block_actions") | Some("interactive_message") => Ok(WebhookPayload::Inbound(
                commands::parse_interactive_component(payload),
            )),
            other => Err(GatewayError::MalformedPayload(format!(
                "unknown payload type: {}",
                other.unwrap_or("<missing>")
            ))),
        }
    }

    fn decode_event_callback(&self, envelope: &Value) -> WebhookPayload {
        let event_type = envelope
            .get("event")
            .and_then(|e| e.get("type"))
            .and_then(Value::as_str);

        match event_type {
            Some("app_mention") => {
                WebhookPayload::Inbound(commands::parse_app_mention(envelope))
            }
            Some("message") => {
                let channel_type = envelope
                    .get("event")
                    .and_then(|e| e.get("channel_type"))
                    .and_then(Value::as_str);
                if channel_type == Some("im") {
                    WebhookPayload::Inbound(commands::parse_direct_message(envelope))
                } else {
                    // Only mentions are answered in shared channels.
                    WebhookPayload::Ignored
                }
            }
            other => {
                debug!(event_type = ?other, "Ignoring Slack event type");
                WebhookPayload::Ignored
            }
        }
    }
}

impl WebhookCodec for SlackWebhook {
    fn plugin_name(&self) -> &'static str {
        "slack"
    }

    fn verify(&self, headers: &HeaderMap, body: &[u8]) -> Result<(), GatewayError> {
        let timestamp = headers
            .get(TIMESTAMP_HEADER)
            .and_then(|v| v.to_str().ok())
            .ok_or(GatewayError::InvalidSignature)?;
        let provided = headers
            .get(SIGNATURE_HEADER)
            .and_then(|v| v.to_str().ok())
            .ok_or(GatewayError::InvalidSignature)?;

        signature::verify(&self.signing_secret, timestamp, body, provided)
    }

    fn decode(&self, content_type: &str, body: &[u8]) -> Result<WebhookPayload, GatewayError> {
        if content_type.contains("application/json") {
            let payload: Value = serde_json::from_slice(body)
                .map_err(|e| GatewayError::MalformedPayload(e.to_string()))?;
            return self.decode_json(&payload);
        }

        // Everything else arrives form-encoded.
        let form: HashMap<String, String> = url::form_urlencoded::parse(body)
            .into_owned()
            .collect();

        if let Some(raw_payload) = form.get("payload") {
            // Interactive components wrap their JSON in a form field.
            let payload: Value = serde_json::from_str(raw_payload)
                .map_err(|e| GatewayError::MalformedPayload(e.to_string()))?;
            return self.decode_json(&payload);
        }

        if form.contains_key("command") {
            return Ok(WebhookPayload::Inbound(commands::parse_slash_command(&form)));
        }

        Err(GatewayError::MalformedPayload(
            "unknown payload type".to_string(),
        ))
    }

    fn encode(&self, response: &Response) -> Value {
        let mut body = json!({
            "text": response.content,
            "response_type": response.response_type.as_str(),
        });

        if !response.actions.is_empty() || !response.attachments.is_empty() {
            if let Ok(blocks) = serde_json::to_value(response_to_blocks(response)) {
                body["blocks"] = blocks;
            }
        }

        body
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use chrono::Utc;
    use courier_core::{ActionStyle, ResponseAction};

    const SECRET: &str = "test-signing-secret";

    fn codec() -> SlackWebhook {
        SlackWebhook::new(SECRET)
    }

    fn signed_headers(body: &[u8], timestamp: i64) -> HeaderMap {
        let ts = timestamp.to_string();
        let sig = signature::expected_signature(SECRET, &ts, body);

        let mut headers = HeaderMap::new();
        headers.insert(TIMESTAMP_HEADER, HeaderValue::from_str(&ts).unwrap());
        headers.insert(SIGNATURE_HEADER, HeaderValue::from_str(&sig).unwrap());
        headers
    }

    #[test]
    fn verify_accepts_fresh_signed_requests() {
        let body = b"command=%2Ftriage&text=plan";
        let headers = signed_headers(body, Utc::now().timestamp());
        assert!(codec().verify(&headers, body).is_ok());
    }

    #[test]
    fn verify_rejects_replays() {
        let body = b"command=%2Ftriage&text=plan";
        let headers = signed_headers(body, Utc::now().timestamp() - 600);
        assert!(matches!(
            codec().verify(&headers, body),
            Err(GatewayError::StaleTimestamp)
        ));
    }

    #[test]
    fn verify_rejects_missing_headers() {
        let headers = HeaderMap::new();
        assert!(matches!(
            codec().verify(&headers, b"body"),
            Err(GatewayError::InvalidSignature)
        ));
    }

    #[test]
    fn slash_command_form_decodes_to_inbound() {
        let body = b"command=%2Ftriage&text=plan&team_id=T1&user_id=U1&channel_id=C1";
        let payload = codec()
            .decode("application/x-www-form-urlencoded", body)
            .unwrap();

        let WebhookPayload::Inbound(message) = payload else {
            panic!("expected inbound message");
        };
        assert_eq!(message.command.as_deref(), Some("plan"));
        assert_eq!(message.channel_id, "T1");
    }

    #[test]
    fn url_verification_echoes_the_challenge() {
        let body = br#"{"type": "url_verification", "challenge": "c-123"}"#;
        let payload = codec().decode("application/json", body).unwrap();
        assert!(matches!(
            payload,
            WebhookPayload::Challenge(c) if c == "c-123"
        ));
    }

    #[test]
    fn direct_message_event_decodes_but_channel_chatter_is_ignored() {
        let dm = serde_json::to_vec(&json!({
            "type": "event_callback",
            "team_id": "T1",
            "event": {"type": "message", "channel_type": "im", "user": "U1", "text": "status", "channel": "D1"}
        }))
        .unwrap();
        assert!(matches!(
            codec().decode("application/json", &dm).unwrap(),
            WebhookPayload::Inbound(_)
        ));

        let chatter = serde_json::to_vec(&json!({
            "type": "event_callback",
            "team_id": "T1",
            "event": {"type": "message", "channel_type": "channel", "user": "U1", "text": "hi", "channel": "C1"}
        }))
        .unwrap();
        assert!(matches!(
            codec().decode("application/json", &chatter).unwrap(),
            WebhookPayload::Ignored
        ));
    }

    #[test]
    fn form_wrapped_interactive_payload_decodes() {
        let inner = json!({
            "type": "block_actions",
            "team": {"id": "T1"},
            "user": {"id": "U1"},
            "actions": [{"action_id": "approve_plan", "value": "approve"}]
        })
        .to_string();
        let body = url::form_urlencoded::Serializer::new(String::new())
            .append_pair("payload", &inner)
            .finish();

        let payload = codec()
            .decode("application/x-www-form-urlencoded", body.as_bytes())
            .unwrap();
        let WebhookPayload::Inbound(message) = payload else {
            panic!("expected inbound message");
        };
        assert_eq!(message.command.as_deref(), Some("approve"));
    }

    #[test]
    fn unknown_envelope_is_malformed() {
        let body = br#"{"type": "something_else"}"#;
        assert!(matches!(
            codec().decode("application/json", body),
            Err(GatewayError::MalformedPayload(_))
        ));

        assert!(matches!(
            codec().decode("application/x-www-form-urlencoded", b"foo=bar"),
            Err(GatewayError::MalformedPayload(_))
        ));
    }

    #[test]
    fn encode_includes_blocks_only_when_interactive() {
        let plain = codec().encode(&Response::ephemeral("hi"));
        assert_eq!(plain["response_type"], "ephemeral");
        assert!(plain.get("blocks").is_none());

        let interactive = codec().encode(
            &Response::message("plan")
                .with_action(ResponseAction::new("Approve", "approve_plan").with_style(ActionStyle::Primary)),
        );
        assert!(interactive.get("blocks").is_some());
    }
}
