//! Channel-agnostic outbound response representation.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// How a response should be presented on the channel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseType {
    /// Regular visible message.
    #[default]
    Message,
    /// Visible only to the requesting user.
    Ephemeral,
    /// Modal / dialog presentation.
    Modal,
    /// Posted into the channel the command came from.
    InChannel,
    /// Error presentation.
    Error,
}

impl ResponseType {
    /// Wire name used by channel serialisers.
    pub fn as_str(&self) -> &'static str {
        match self {
            ResponseType::Message => "message",
            ResponseType::Ephemeral => "ephemeral",
            ResponseType::Modal => "modal",
            ResponseType::InChannel => "in_channel",
            ResponseType::Error => "error",
        }
    }
}

/// Visual emphasis for an interactive action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionStyle {
    Primary,
    Danger,
}

/// An interactive action (button) attached to a response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseAction {
    /// Button label.
    pub text: String,
    /// Identifier the channel echoes back on click.
    pub action_id: String,
    /// Optional emphasis.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub style: Option<ActionStyle>,
    /// Optional opaque value carried with the click.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

impl ResponseAction {
    /// Creates a plain action button.
    pub fn new(text: impl Into<String>, action_id: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            action_id: action_id.into(),
            style: None,
            value: None,
        }
    }

    /// Sets the emphasis style.
    pub fn with_style(mut self, style: ActionStyle) -> Self {
        self.style = Some(style);
        self
    }
}

/// A structured attachment rendered after the main content.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attachment {
    pub text: String,
}

/// A normalised outbound reply.
///
/// Adapters translate this into the platform's own representation (block
/// grammar for chat apps). The bus itself only ever inspects
/// [`response_type`](Self::response_type).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Response {
    /// Response text (markdown supported).
    pub content: String,
    /// Presentation kind.
    pub response_type: ResponseType,
    /// Structured attachments.
    #[serde(default)]
    pub attachments: Vec<Attachment>,
    /// Interactive actions (buttons).
    #[serde(default)]
    pub actions: Vec<ResponseAction>,
    /// Channel-specific response data (e.g. `plan_date`).
    #[serde(default)]
    pub metadata: HashMap<String, Value>,
}

impl Response {
    /// Creates a regular message response.
    pub fn message(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            response_type: ResponseType::Message,
            ..Self::default()
        }
    }

    /// Creates an ephemeral response.
    pub fn ephemeral(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            response_type: ResponseType::Ephemeral,
            ..Self::default()
        }
    }

    /// Creates an error response.
    pub fn error(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            response_type: ResponseType::Error,
            ..Self::default()
        }
    }

    /// Appends an interactive action.
    pub fn with_action(mut self, action: ResponseAction) -> Self {
        self.actions.push(action);
        self
    }

    /// Inserts a metadata entry.
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Returns a metadata entry as a string slice.
    pub fn metadata_str(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).and_then(Value::as_str)
    }
}
