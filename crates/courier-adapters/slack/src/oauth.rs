//! Slack OAuth 2.0 flow: consent URL, code exchange, encrypted token
//! storage, refresh.
//!
//! Flow states run `initiated → code_received → exchanging → stored →
//! active`; any failure lands in a terminal error carrying a
//! user-presentable message from the closed table below. The client
//! secret and tokens never appear in messages or logs.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{Map, Value, json};
use tracing::{info, warn};
use url::Url;

use courier_gateway::{InstallSummary, OAuthError, OAuthProvider};
use courier_store::{Installation, InstallationStore, InstallationUpdate, StoreError};

const OAUTH_AUTHORIZE_URL: &str = "https://slack.com/oauth/v2/authorize";
const OAUTH_TOKEN_URL: &str = "https://slack.com/api/oauth.v2.access";

/// Default bot scopes requested at install time.
pub const DEFAULT_SCOPES: &[&str] = &[
    "commands",
    "chat:write",
    "app_mentions:read",
    "im:history",
    "im:write",
];

/// Token data returned from a successful exchange.
#[derive(Debug, Clone)]
pub struct SlackTokens {
    pub access_token: String,
    pub bot_user_id: String,
    pub team_id: String,
    pub team_name: String,
    pub scope: String,
    pub refresh_token: Option<String>,
    pub expires_in: Option<i64>,
}

impl SlackTokens {
    /// Workspace metadata persisted alongside the tokens.
    pub fn to_metadata(&self) -> Map<String, Value> {
        let mut metadata = Map::new();
        metadata.insert("bot_user_id".into(), json!(self.bot_user_id));
        metadata.insert("team_name".into(), json!(self.team_name));
        metadata.insert("scope".into(), json!(self.scope));
        if let Some(expires_in) = self.expires_in {
            metadata.insert("expires_at".into(), json!(expires_in));
        }
        metadata
    }
}

/// The Slack OAuth handler.
pub struct SlackOAuth {
    client_id: String,
    client_secret: String,
    redirect_uri: String,
    storage: Arc<InstallationStore>,
    http: Client,
    token_url: String,
}

impl SlackOAuth {
    pub fn new(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        redirect_uri: impl Into<String>,
        storage: Arc<InstallationStore>,
    ) -> Self {
        let http = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("reqwest client construction cannot fail with static options");

        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            redirect_uri: redirect_uri.into(),
            storage,
            http,
            token_url: OAUTH_TOKEN_URL.to_string(),
        }
    }

    /// Points the token exchange at a different endpoint. Intended for
    /// tests.
    pub fn with_token_url(mut self, token_url: impl Into<String>) -> Self {
        self.token_url = token_url.into();
        self
    }

    /// Composes the workspace authorisation URL.
    ///
    /// Scopes join comma-separated; `state` is the caller-supplied CSRF
    /// nonce the callback must echo.
    pub fn authorization_url(&self, state: &str, scopes: Option<&[&str]>) -> String {
        let scope = scopes.unwrap_or(DEFAULT_SCOPES).join(",");
        let url = Url::parse_with_params(
            OAUTH_AUTHORIZE_URL,
            &[
                ("client_id", self.client_id.as_str()),
                ("scope", scope.as_str()),
                ("redirect_uri", self.redirect_uri.as_str()),
                ("state", state),
            ],
        )
        .expect("authorize URL is statically valid");

        info!(redirect_uri = %self.redirect_uri, "Generated OAuth authorization URL");
        url.into()
    }

    /// Exchanges an authorisation code for tokens.
    pub async fn exchange_code(&self, code: &str) -> Result<SlackTokens, OAuthError> {
        info!("Exchanging authorization code for access token");

        let response = self
            .http
            .post(&self.token_url)
            .form(&[
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("code", code),
                ("redirect_uri", self.redirect_uri.as_str()),
            ])
            .send()
            .await
            .map_err(|e| {
                OAuthError::new(
                    "Failed to connect to Slack. Please try again later.",
                    None,
                    Some(e.to_string()),
                )
            })?;

        let data: Value = response.json().await.map_err(|e| {
            OAuthError::new(
                "Received an unreadable response from Slack. Please try again.",
                None,
                Some(e.to_string()),
            )
        })?;

        parse_token_response(&data, None)
    }

    /// Stores exchanged tokens as a new installation.
    ///
    /// An *inactive* leftover row behaves as absent: re-installing over it
    /// rotates the tokens and reactivates the workspace. Only an active
    /// installation counts as a duplicate.
    pub async fn store_tokens(&self, tokens: &SlackTokens) -> Result<Installation, OAuthError> {
        info!(team_id = %tokens.team_id, "Storing OAuth tokens");

        let storage_error = |e: StoreError| {
            OAuthError::new(
                "Failed to complete installation. Please try again.",
                None,
                Some(e.to_string()),
            )
        };

        let existing = self
            .storage
            .get("slack", &tokens.team_id)
            .await
            .map_err(storage_error)?;

        if let Some(existing) = existing {
            if existing.is_active {
                warn!(team_id = %tokens.team_id, "Installation already exists");
                return Err(OAuthError::new(
                    format!(
                        "Courier is already installed in workspace '{}'. \
                         Please uninstall first if you want to reinstall.",
                        tokens.team_name
                    ),
                    Some("already_installed".to_string()),
                    None,
                ));
            }

            let mut update = InstallationUpdate::new()
                .access_token(&tokens.access_token)
                .metadata(tokens.to_metadata())
                .is_active(true);
            if let Some(refresh) = &tokens.refresh_token {
                update = update.refresh_token(refresh);
            }

            let reactivated = self
                .storage
                .update("slack", &tokens.team_id, update)
                .await
                .map_err(storage_error)?
                .ok_or_else(|| {
                    OAuthError::new(
                        "Failed to complete installation. Please try again.",
                        None,
                        Some("installation disappeared during reinstall".to_string()),
                    )
                })?;

            info!(team_id = %tokens.team_id, "Inactive installation reactivated");
            return Ok(reactivated);
        }

        let mut installation = Installation::new("slack", &tokens.team_id, &tokens.access_token)
            .with_metadata(tokens.to_metadata());
        if let Some(refresh) = &tokens.refresh_token {
            installation = installation.with_refresh_token(refresh);
        }

        match self.storage.create(installation).await {
            Ok(created) => {
                info!(team_id = %tokens.team_id, installation_id = ?created.id, "Installation stored");
                Ok(created)
            }
            Err(StoreError::AlreadyExists { .. }) => {
                warn!(team_id = %tokens.team_id, "Installation already exists");
                Err(OAuthError::new(
                    format!(
                        "Courier is already installed in workspace '{}'. \
                         Please uninstall first if you want to reinstall.",
                        tokens.team_name
                    ),
                    Some("already_installed".to_string()),
                    None,
                ))
            }
            Err(e) => Err(storage_error(e)),
        }
    }

    /// Refreshes an expired access token and updates the stored
    /// installation atomically.
    pub async fn refresh_token(
        &self,
        team_id: &str,
        refresh_token: &str,
    ) -> Result<SlackTokens, OAuthError> {
        info!(team_id = %team_id, "Refreshing access token");

        let response = self
            .http
            .post(&self.token_url)
            .form(&[
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token),
            ])
            .send()
            .await
            .map_err(|e| {
                OAuthError::new(
                    "Failed to refresh token. Please reinstall the app.",
                    None,
                    Some(e.to_string()),
                )
            })?;

        let data: Value = response.json().await.map_err(|e| {
            OAuthError::new(
                "Failed to refresh token. Please reinstall the app.",
                None,
                Some(e.to_string()),
            )
        })?;

        // The platform may rotate the refresh token; keep the old one when
        // it does not.
        let tokens = parse_token_response(&data, Some(refresh_token))?;

        let update = {
            let mut update = InstallationUpdate::new()
                .access_token(&tokens.access_token)
                .metadata(tokens.to_metadata());
            if let Some(refresh) = &tokens.refresh_token {
                update = update.refresh_token(refresh);
            }
            update
        };

        self.storage
            .update("slack", team_id, update)
            .await
            .map_err(|e| {
                OAuthError::new(
                    "Failed to refresh token. Please reinstall the app.",
                    None,
                    Some(e.to_string()),
                )
            })?;

        info!(team_id = %team_id, "Access token refreshed");
        Ok(tokens)
    }
}

#[async_trait]
impl OAuthProvider for SlackOAuth {
    fn authorize_url(&self, state: &str) -> String {
        self.authorization_url(state, None)
    }

    async fn complete_install(&self, code: &str) -> Result<InstallSummary, OAuthError> {
        let tokens = self.exchange_code(code).await?;
        let installation = self.store_tokens(&tokens).await?;
        Ok(InstallSummary {
            channel_id: installation.channel_id,
            channel_name: Some(tokens.team_name),
        })
    }
}

/// Parses an `oauth.v2.access` response body into tokens.
fn parse_token_response(
    data: &Value,
    fallback_refresh: Option<&str>,
) -> Result<SlackTokens, OAuthError> {
    if data.get("ok").and_then(Value::as_bool) != Some(true) {
        let code = data
            .get("error")
            .and_then(Value::as_str)
            .unwrap_or("unknown_error");
        return Err(OAuthError::new(
            friendly_message(code),
            Some(code.to_string()),
            data.get("error_description")
                .and_then(Value::as_str)
                .map(str::to_string),
        ));
    }

    let field = |path: &[&str]| -> Result<String, OAuthError> {
        let mut current = data;
        for key in path {
            current = current.get(key).ok_or_else(|| {
                OAuthError::new(
                    "Received an unexpected response from Slack. Please contact support.",
                    None,
                    Some(format!("missing field: {}", path.join("."))),
                )
            })?;
        }
        current
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| {
                OAuthError::new(
                    "Received an unexpected response from Slack. Please contact support.",
                    None,
                    Some(format!("non-string field: {}", path.join("."))),
                )
            })
    };

    Ok(SlackTokens {
        access_token: field(&["access_token"])?,
        bot_user_id: field(&["bot_user_id"])?,
        team_id: field(&["team", "id"])?,
        team_name: field(&["team", "name"])?,
        scope: field(&["scope"])?,
        refresh_token: data
            .get("refresh_token")
            .and_then(Value::as_str)
            .map(str::to_string)
            .or_else(|| fallback_refresh.map(str::to_string)),
        expires_in: data.get("expires_in").and_then(Value::as_i64),
    })
}

/// The closed table of user-friendly messages for platform error codes.
fn friendly_message(code: &str) -> &'static str {
    match code {
        "invalid_code" => {
            "The authorization code is invalid or has expired. Please try installing the app again."
        }
        "code_already_used" => {
            "This authorization code has already been used. Please start the installation process again."
        }
        "invalid_client_id" | "invalid_client_secret" | "invalid_redirect_uri"
        | "invalid_grant_type" => "App configuration error. Please contact support.",
        "invalid_refresh_token" => "Your session has expired. Please reinstall the app.",
        "token_revoked" => {
            "The app has been uninstalled. Please reinstall to continue using Courier."
        }
        "access_denied" => {
            "Installation was cancelled. Please try again if you want to install Courier."
        }
        _ => "An error occurred during installation. Please try again or contact support.",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use courier_store::TokenCipher;

    fn storage() -> Arc<InstallationStore> {
        let cipher = TokenCipher::from_passphrase("oauth-test-passphrase-of-decent-length").unwrap();
        Arc::new(InstallationStore::open_in_memory(cipher).unwrap())
    }

    fn oauth() -> SlackOAuth {
        SlackOAuth::new("C1", "cs-secret", "https://bus.test/plugins/slack/oauth/callback", storage())
    }

    fn tokens(team_id: &str) -> SlackTokens {
        SlackTokens {
            access_token: "xoxb-token".to_string(),
            bot_user_id: "B1".to_string(),
            team_id: team_id.to_string(),
            team_name: "Acme".to_string(),
            scope: "commands,chat:write".to_string(),
            refresh_token: None,
            expires_in: None,
        }
    }

    #[test]
    fn authorize_url_carries_all_params() {
        let url = oauth().authorization_url("state-123", None);

        assert!(url.starts_with("https://slack.com/oauth/v2/authorize?"));
        assert!(url.contains("client_id=C1"));
        assert!(url.contains("state=state-123"));
        assert!(url.contains("commands"));
        // Comma-separated scopes survive encoding.
        assert!(url.contains("chat%3Awrite"));
        // The client secret never appears.
        assert!(!url.contains("cs-secret"));
    }

    #[test]
    fn custom_scopes_override_defaults() {
        let url = oauth().authorization_url("s", Some(&["commands"]));
        assert!(!url.contains("chat%3Awrite"));
    }

    #[tokio::test]
    async fn duplicate_install_names_the_workspace() {
        let oauth = oauth();
        oauth.store_tokens(&tokens("T1")).await.unwrap();

        let err = oauth.store_tokens(&tokens("T1")).await.unwrap_err();
        assert_eq!(err.code.as_deref(), Some("already_installed"));
        assert!(err.message.contains("Acme"));
        // No secrets in the message.
        assert!(!err.message.contains("xoxb"));
    }

    #[tokio::test]
    async fn reinstall_over_inactive_row_reactivates() {
        let storage = storage();
        let oauth = SlackOAuth::new(
            "C1",
            "cs-secret",
            "https://bus.test/plugins/slack/oauth/callback",
            Arc::clone(&storage),
        );

        oauth.store_tokens(&tokens("T1")).await.unwrap();
        storage
            .update(
                "slack",
                "T1",
                courier_store::InstallationUpdate::new().is_active(false),
            )
            .await
            .unwrap();

        let mut fresh = tokens("T1");
        fresh.access_token = "xoxb-rotated".to_string();
        let reactivated = oauth.store_tokens(&fresh).await.unwrap();

        assert!(reactivated.is_active);
        assert_eq!(reactivated.access_token, "xoxb-rotated");
    }

    #[tokio::test]
    async fn stored_installation_is_active_with_metadata() {
        let oauth = oauth();
        let created = oauth.store_tokens(&tokens("T1")).await.unwrap();

        assert!(created.is_active);
        assert_eq!(created.metadata_str("team_name"), Some("Acme"));
        assert_eq!(created.metadata_str("bot_user_id"), Some("B1"));
    }

    #[test]
    fn error_table_covers_platform_codes() {
        for code in [
            "invalid_code",
            "code_already_used",
            "invalid_client_id",
            "invalid_client_secret",
            "invalid_redirect_uri",
            "invalid_grant_type",
            "invalid_refresh_token",
            "token_revoked",
            "access_denied",
        ] {
            let message = friendly_message(code);
            assert!(!message.is_empty());
            assert!(!message.contains("secret"), "{code} message leaks detail");
        }
        // Unknown codes fall back to the generic message.
        assert!(friendly_message("something_new").contains("error occurred"));
    }

    #[test]
    fn platform_error_maps_through_the_table() {
        let data = json!({"ok": false, "error": "invalid_code"});
        let err = parse_token_response(&data, None).unwrap_err();
        assert_eq!(err.code.as_deref(), Some("invalid_code"));
        assert!(err.message.contains("authorization code"));
    }

    #[test]
    fn token_response_parses_nested_team() {
        let data = json!({
            "ok": true,
            "access_token": "xoxb-1",
            "bot_user_id": "B1",
            "team": {"id": "T1", "name": "Acme"},
            "scope": "commands",
            "expires_in": 43200
        });

        let tokens = parse_token_response(&data, Some("old-refresh")).unwrap();
        assert_eq!(tokens.team_id, "T1");
        assert_eq!(tokens.expires_in, Some(43200));
        // Fallback refresh token is retained when the platform omits one.
        assert_eq!(tokens.refresh_token.as_deref(), Some("old-refresh"));
    }

    #[test]
    fn malformed_token_response_is_a_support_error() {
        let data = json!({"ok": true, "access_token": "xoxb-1"});
        let err = parse_token_response(&data, None).unwrap_err();
        assert!(err.message.contains("unexpected response"));
        assert!(err.details.as_deref().unwrap_or("").contains("bot_user_id"));
    }
}
