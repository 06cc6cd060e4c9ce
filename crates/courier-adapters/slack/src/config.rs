//! Slack adapter configuration.

use courier_core::{ConfigSchema, PluginConfig, PluginError, PluginResult, SchemaType};

/// Validated Slack adapter configuration.
#[derive(Debug, Clone)]
pub struct SlackConfig {
    /// Slack app client id.
    pub client_id: String,
    /// Slack app client secret. Never logged.
    pub client_secret: String,
    /// Signing secret for webhook validation. Never logged.
    pub signing_secret: String,
    /// Workspace-independent bot token; normally absent, tokens come from
    /// the installation store per workspace.
    pub bot_token: Option<String>,
    /// OAuth redirect URI override.
    pub redirect_uri: Option<String>,
}

impl SlackConfig {
    /// The schema the config loader validates against.
    pub fn schema() -> ConfigSchema {
        ConfigSchema::new()
            .required("client_id", SchemaType::String, "Slack app client ID")
            .required("client_secret", SchemaType::String, "Slack app client secret")
            .required(
                "signing_secret",
                SchemaType::String,
                "Slack signing secret for webhook validation",
            )
            .optional(
                "bot_token",
                SchemaType::String,
                "Bot token for single-workspace use (normally loaded per workspace)",
            )
            .optional(
                "app_token",
                SchemaType::String,
                "App-level token for Socket Mode (reserved)",
            )
            .optional("redirect_uri", SchemaType::String, "OAuth callback URL")
    }

    /// Extracts the typed config from a validated [`PluginConfig`].
    pub fn from_plugin_config(config: &PluginConfig) -> PluginResult<Self> {
        let required = |key: &str| -> PluginResult<String> {
            config
                .get_str(key)
                .map(str::to_string)
                .ok_or_else(|| PluginError::initialization(format!("{key} is required")))
        };

        Ok(Self {
            client_id: required("client_id")?,
            client_secret: required("client_secret")?,
            signing_secret: required("signing_secret")?,
            bot_token: config.get_str("bot_token").map(str::to_string),
            redirect_uri: config.get_str("redirect_uri").map(str::to_string),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_requires_the_three_secrets() {
        let schema = SlackConfig::schema();
        let empty = serde_json::Map::new();
        assert!(schema.validate(&empty).is_err());
    }

    #[test]
    fn typed_extraction() {
        let plugin_config = PluginConfig::new("slack", "1.0.0")
            .with_value("client_id", "C1")
            .with_value("client_secret", "cs")
            .with_value("signing_secret", "ss");

        let config = SlackConfig::from_plugin_config(&plugin_config).unwrap();
        assert_eq!(config.client_id, "C1");
        assert!(config.bot_token.is_none());
    }

    #[test]
    fn missing_secret_fails_initialization() {
        let plugin_config = PluginConfig::new("slack", "1.0.0").with_value("client_id", "C1");
        let err = SlackConfig::from_plugin_config(&plugin_config).unwrap_err();
        assert!(err.to_string().contains("client_secret"));
    }
}
