//! Slack payload → [`Message`] parsers.
//!
//! All four inbound shapes (slash command, interactive component, app
//! mention, direct message) normalise to the same channel-agnostic
//! [`Message`]: the workspace id becomes `channel_id`, the Slack room id
//! travels in `metadata.slack_channel_id`, and `response_url` is preserved
//! for delayed replies.

use std::collections::HashMap;

use serde_json::Value;
use tracing::debug;

use courier_core::Message;

/// Command assumed when the text carries none.
const DEFAULT_COMMAND: &str = "help";

/// Parses a form-decoded slash-command payload.
///
/// Text after `/triage` splits on whitespace: token 0 is the command,
/// `key=value` tokens become parameters, bare tokens become positional
/// `arg_N` parameters.
pub fn parse_slash_command(form: &HashMap<String, String>) -> Message {
    let team_id = form.get("team_id").cloned().unwrap_or_default();
    let user_id = form.get("user_id").cloned().unwrap_or_default();
    let text = form.get("text").map(|t| t.trim()).unwrap_or_default();
    let slack_channel_id = form.get("channel_id").cloned().unwrap_or_default();
    let response_url = form.get("response_url").cloned().unwrap_or_default();

    let (command, parameters) = parse_command_text(text);

    debug!(command = %command, team_id = %team_id, user_id = %user_id, "Parsed slash command");

    let mut message = Message::new(team_id, user_id, text);
    message.command = Some(command);
    message.parameters = parameters;
    message
        .with_metadata("slack_channel_id", slack_channel_id)
        .with_metadata("response_url", response_url)
        .with_metadata("command_type", "slash_command")
}

/// Parses an interactive-component payload (button clicks).
///
/// The command is the `action_id` prefix before the first underscore
/// (`approve_plan` → `approve`); message-level context such as an embedded
/// `plan_date` line is recovered into metadata.
pub fn parse_interactive_component(payload: &Value) -> Message {
    let team_id = string_at(payload, &["team", "id"]);
    let user_id = string_at(payload, &["user", "id"]);

    let action = payload
        .get("actions")
        .and_then(Value::as_array)
        .and_then(|a| a.first());
    let action_id = action
        .and_then(|a| a.get("action_id"))
        .and_then(Value::as_str)
        .unwrap_or_default();
    let action_value = action
        .and_then(|a| a.get("value"))
        .and_then(Value::as_str)
        .unwrap_or_default();

    let command = action_id
        .split_once('_')
        .map(|(prefix, _)| prefix)
        .unwrap_or(action_id);

    let mut message = Message::new(team_id, user_id, action_value)
        .with_command(command)
        .with_metadata("slack_channel_id", string_at(payload, &["channel", "id"]))
        .with_metadata("response_url", string_at(payload, &["response_url"]))
        .with_metadata("message_ts", string_at(payload, &["message", "ts"]))
        .with_metadata("action_id", action_id)
        .with_metadata("action_value", action_value)
        .with_metadata("command_type", "interactive_component");

    if let Some(plan_date) = extract_plan_date(payload) {
        message = message.with_metadata("plan_date", plan_date);
    }

    debug!(
        command = ?message.command,
        action_id = %action_id,
        "Parsed interactive component"
    );

    message
}

/// Parses an `app_mention` event from an Events API envelope.
pub fn parse_app_mention(envelope: &Value) -> Message {
    let event = envelope.get("event").cloned().unwrap_or(Value::Null);
    let team_id = string_at(envelope, &["team_id"]);
    let user_id = string_at(&event, &["user"]);
    let text = string_at(&event, &["text"]);

    // Strip the leading <@BOTID> mention.
    let clean_text = match text.split_once('>') {
        Some((prefix, rest)) if prefix.starts_with("<@") => rest.trim().to_string(),
        _ => text,
    };

    let (command, parameters) = parse_command_text(&clean_text);

    let mut message = Message::new(team_id, user_id, clean_text).with_command(command);
    message.parameters = parameters;
    message.thread_id = event
        .get("thread_ts")
        .and_then(Value::as_str)
        .map(str::to_string);
    message
        .with_metadata("slack_channel_id", string_at(&event, &["channel"]))
        .with_metadata("command_type", "app_mention")
}

/// Parses a direct-message event from an Events API envelope.
pub fn parse_direct_message(envelope: &Value) -> Message {
    let event = envelope.get("event").cloned().unwrap_or(Value::Null);
    let team_id = string_at(envelope, &["team_id"]);
    let user_id = string_at(&event, &["user"]);
    let text = string_at(&event, &["text"]).trim().to_string();

    let (command, parameters) = parse_command_text(&text);

    let mut message = Message::new(team_id, user_id, text).with_command(command);
    message.parameters = parameters;
    message.thread_id = event
        .get("thread_ts")
        .and_then(Value::as_str)
        .map(str::to_string);
    message
        .with_metadata("slack_channel_id", string_at(&event, &["channel"]))
        .with_metadata("command_type", "direct_message")
}

/// Splits command text into `(command, parameters)`.
fn parse_command_text(text: &str) -> (String, HashMap<String, String>) {
    let mut parts = text.split_whitespace();
    let command = parts.next().unwrap_or(DEFAULT_COMMAND).to_string();

    let mut parameters = HashMap::new();
    for part in parts {
        match part.split_once('=') {
            Some((key, value)) => {
                parameters.insert(key.trim().to_string(), value.trim().to_string());
            }
            None => {
                parameters.insert(format!("arg_{}", parameters.len()), part.to_string());
            }
        }
    }

    (command, parameters)
}

/// Recovers a `plan_date: …` line from the message's context blocks.
fn extract_plan_date(payload: &Value) -> Option<String> {
    let blocks = payload.get("message")?.get("blocks")?.as_array()?;
    for block in blocks {
        if block.get("type").and_then(Value::as_str) != Some("context") {
            continue;
        }
        for element in block.get("elements")?.as_array()? {
            let text = element.get("text").and_then(Value::as_str).unwrap_or("");
            if let Some((_, date)) = text.split_once("plan_date:") {
                return Some(date.trim().trim_end_matches('_').trim().to_string());
            }
        }
    }
    None
}

fn string_at(value: &Value, path: &[&str]) -> String {
    let mut current = value;
    for key in path {
        match current.get(key) {
            Some(next) => current = next,
            None => return String::new(),
        }
    }
    current.as_str().unwrap_or_default().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn slash_form(text: &str) -> HashMap<String, String> {
        HashMap::from([
            ("team_id".to_string(), "T1".to_string()),
            ("user_id".to_string(), "U1".to_string()),
            ("command".to_string(), "/triage".to_string()),
            ("text".to_string(), text.to_string()),
            ("channel_id".to_string(), "C1".to_string()),
            (
                "response_url".to_string(),
                "https://hooks.slack.test/r".to_string(),
            ),
        ])
    }

    #[test]
    fn slash_command_basic() {
        let message = parse_slash_command(&slash_form("plan"));

        assert_eq!(message.channel_id, "T1");
        assert_eq!(message.user_id, "U1");
        assert_eq!(message.command.as_deref(), Some("plan"));
        assert_eq!(message.metadata_str("slack_channel_id"), Some("C1"));
        assert_eq!(
            message.metadata_str("response_url"),
            Some("https://hooks.slack.test/r")
        );
    }

    #[test]
    fn slash_command_parameters_and_positionals() {
        let message = parse_slash_command(&slash_form("config max_priorities=3 verbose"));

        assert_eq!(message.command.as_deref(), Some("config"));
        assert_eq!(
            message.parameters.get("max_priorities").map(String::as_str),
            Some("3")
        );
        assert_eq!(message.parameters.get("arg_1").map(String::as_str), Some("verbose"));
    }

    #[test]
    fn empty_text_defaults_to_help() {
        let message = parse_slash_command(&slash_form(""));
        assert_eq!(message.command.as_deref(), Some("help"));
    }

    #[test]
    fn interactive_component_extracts_command_and_plan_date() {
        let payload = json!({
            "type": "block_actions",
            "team": {"id": "T1"},
            "user": {"id": "U1"},
            "channel": {"id": "C1"},
            "response_url": "https://hooks.slack.test/r",
            "message": {
                "ts": "1700000000.000100",
                "blocks": [
                    {"type": "section", "text": {"type": "mrkdwn", "text": "plan body"}},
                    {"type": "context", "elements": [
                        {"type": "mrkdwn", "text": "_plan_date: 2026-03-02_"}
                    ]}
                ]
            },
            "actions": [{"action_id": "approve_plan", "value": "approve"}]
        });

        let message = parse_interactive_component(&payload);
        assert_eq!(message.command.as_deref(), Some("approve"));
        assert_eq!(message.channel_id, "T1");
        assert_eq!(message.metadata_str("action_id"), Some("approve_plan"));
        assert_eq!(message.metadata_str("plan_date"), Some("2026-03-02"));
        assert_eq!(message.metadata_str("message_ts"), Some("1700000000.000100"));
    }

    #[test]
    fn app_mention_strips_bot_prefix_and_keeps_thread() {
        let envelope = json!({
            "team_id": "T1",
            "event": {
                "type": "app_mention",
                "user": "U1",
                "text": "<@B99> plan closure_rate=0.5",
                "channel": "C1",
                "thread_ts": "1700000000.000200"
            }
        });

        let message = parse_app_mention(&envelope);
        assert_eq!(message.command.as_deref(), Some("plan"));
        assert_eq!(
            message.parameters.get("closure_rate").map(String::as_str),
            Some("0.5")
        );
        assert_eq!(message.thread_id.as_deref(), Some("1700000000.000200"));
        assert_eq!(message.metadata_str("command_type"), Some("app_mention"));
    }

    #[test]
    fn direct_message_parses_like_a_command() {
        let envelope = json!({
            "team_id": "T1",
            "event": {
                "type": "message",
                "channel_type": "im",
                "user": "U1",
                "text": "status",
                "channel": "D1"
            }
        });

        let message = parse_direct_message(&envelope);
        assert_eq!(message.command.as_deref(), Some("status"));
        assert_eq!(message.metadata_str("slack_channel_id"), Some("D1"));
    }
}
