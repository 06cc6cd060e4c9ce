//! Channel-agnostic inbound message representation.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A normalised inbound interaction from any channel.
///
/// Adapters parse platform payloads (slash commands, button clicks,
/// mentions, DMs) into this shape before handing them to the registry.
/// `channel_id` is always the *workspace-scope* identifier: for Slack the
/// team id, never a per-room id. Platform-specific identifiers travel in
/// [`metadata`](Self::metadata).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Message {
    /// Workspace-scope channel identifier (team id, phone number, …).
    pub channel_id: String,
    /// User identifier within the channel.
    pub user_id: String,
    /// Raw text content of the interaction.
    pub content: String,
    /// Parsed command, when the content carried one (e.g. `plan`).
    pub command: Option<String>,
    /// `key=value` command parameters; positional tokens become `arg_N`.
    pub parameters: HashMap<String, String>,
    /// Channel-specific metadata (room id, response URL, message ts, …).
    pub metadata: HashMap<String, Value>,
    /// Thread identifier for threaded conversations.
    pub thread_id: Option<String>,
}

impl Message {
    /// Creates a message with the identifying fields set.
    pub fn new(
        channel_id: impl Into<String>,
        user_id: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            channel_id: channel_id.into(),
            user_id: user_id.into(),
            content: content.into(),
            ..Self::default()
        }
    }

    /// Sets the parsed command.
    pub fn with_command(mut self, command: impl Into<String>) -> Self {
        self.command = Some(command.into());
        self
    }

    /// Inserts a string metadata entry.
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Returns a metadata entry as a string slice, when present and textual.
    pub fn metadata_str(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).and_then(Value::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metadata_str_ignores_non_strings() {
        let msg = Message::new("T1", "U1", "plan")
            .with_metadata("response_url", "https://hooks.example/abc")
            .with_metadata("attempt", 3);

        assert_eq!(msg.metadata_str("response_url"), Some("https://hooks.example/abc"));
        assert_eq!(msg.metadata_str("attempt"), None);
        assert_eq!(msg.metadata_str("missing"), None);
    }
}
