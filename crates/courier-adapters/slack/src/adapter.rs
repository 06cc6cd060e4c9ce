//! The Slack channel adapter.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use serde_json::{Map, Value};
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

use courier_core::{
    ActionStyle, BoxedPlugin, ChannelPlugin, ConfigSchema, Event, EventType, HealthState, Message,
    PluginConfig, PluginError, PluginResult, Response, ResponseAction, SharedCoreActions,
};
use courier_store::{Installation, InstallationStore, InstallationUpdate};

use crate::blocks::response_to_blocks;
use crate::client::SlackApiClient;
use crate::config::SlackConfig;

const PLUGIN_NAME: &str = "slack";
const PLUGIN_VERSION: &str = "1.0.0";

const NOT_INSTALLED: &str =
    "Courier is not installed in this workspace. Please reinstall the app.";
const ISOLATION_FAILED: &str = "Unable to process your request. Please contact support.";

/// Everything `initialize` wires up. Swapped atomically behind the
/// plugin's lock so `handle_message` stays re-entrant.
#[derive(Clone)]
struct SlackState {
    config: SlackConfig,
    core: SharedCoreActions,
    client: SlackApiClient,
}

/// Slack implementation of the plugin contract.
///
/// The installation store is injected at construction so the cipher and
/// persistence stay outside the adapter; everything else arrives through
/// `initialize`.
pub struct SlackPlugin {
    storage: Arc<InstallationStore>,
    state: RwLock<Option<SlackState>>,
}

impl SlackPlugin {
    pub fn new(storage: Arc<InstallationStore>) -> Self {
        Self {
            storage,
            state: RwLock::new(None),
        }
    }

    /// A registry factory closure over a shared installation store.
    pub fn factory(
        storage: Arc<InstallationStore>,
    ) -> impl Fn() -> BoxedPlugin + Send + Sync + 'static {
        move || {
            let plugin: BoxedPlugin = Arc::new(SlackPlugin::new(Arc::clone(&storage)));
            plugin
        }
    }

    async fn state(&self) -> PluginResult<SlackState> {
        self.state
            .read()
            .await
            .clone()
            .ok_or(PluginError::NotInitialized)
    }

    // ─── Workspace management ────────────────────────────────────────────

    /// Returns the active installation for a workspace, or `None`.
    ///
    /// Storage failures are logged and treated as absent: an inbound
    /// message must never surface storage internals.
    pub async fn verify_installation(&self, team_id: &str) -> Option<Installation> {
        match self.storage.get(PLUGIN_NAME, team_id).await {
            Ok(Some(installation)) if installation.is_active => Some(installation),
            Ok(Some(_)) => {
                warn!(team_id = %team_id, "Installation exists but is inactive");
                None
            }
            Ok(None) => {
                warn!(team_id = %team_id, "No installation found for workspace");
                None
            }
            Err(e) => {
                error!(team_id = %team_id, error = %e, "Failed to verify installation");
                None
            }
        }
    }

    /// Cheap workspace-isolation sanity check.
    ///
    /// Requires an active installation and a Slack-shaped user id (`U…` or
    /// `W…`). This is defence in depth over the per-workspace token
    /// scoping, not a membership lookup; it does not verify that the user
    /// actually belongs to the workspace.
    pub async fn ensure_workspace_isolation(&self, team_id: &str, user_id: &str) -> bool {
        if self.verify_installation(team_id).await.is_none() {
            return false;
        }

        if !user_id.starts_with('U') && !user_id.starts_with('W') {
            warn!(team_id = %team_id, user_id = %user_id, "Invalid user id format");
            return false;
        }

        true
    }

    /// Removes a workspace installation and every stored token with it.
    pub async fn uninstall_workspace(&self, team_id: &str) -> PluginResult<bool> {
        info!(team_id = %team_id, "Uninstalling workspace");
        self.storage
            .delete(PLUGIN_NAME, team_id)
            .await
            .map_err(|e| PluginError::Storage(e.to_string()))
    }

    /// Rotates the stored tokens for a workspace.
    pub async fn update_installation_token(
        &self,
        team_id: &str,
        access_token: &str,
        refresh_token: Option<&str>,
    ) -> PluginResult<Option<Installation>> {
        let mut update = InstallationUpdate::new().access_token(access_token);
        if let Some(refresh) = refresh_token {
            update = update.refresh_token(refresh);
        }

        self.storage
            .update(PLUGIN_NAME, team_id, update)
            .await
            .map_err(|e| PluginError::Storage(e.to_string()))
    }

    /// Lists workspace installations.
    pub async fn list_workspace_installations(
        &self,
        active_only: bool,
    ) -> PluginResult<Vec<Installation>> {
        self.storage
            .list_for_plugin(PLUGIN_NAME, active_only)
            .await
            .map_err(|e| PluginError::Storage(e.to_string()))
    }

    // ─── Command handlers ────────────────────────────────────────────────

    async fn handle_plan(&self, state: &SlackState, message: &Message) -> PluginResult<Response> {
        let closure_rate = match message.parameters.get("closure_rate") {
            Some(raw) => match raw.parse::<f64>() {
                Ok(rate) => Some(rate),
                Err(_) => {
                    return Ok(Response::ephemeral(
                        "Invalid closure_rate parameter. Must be a number between 0.0 and 1.0.",
                    ));
                }
            },
            None => None,
        };

        let result = state
            .core
            .generate_plan(&message.user_id, None, closure_rate)
            .await;

        if !result.success {
            return Ok(Response::ephemeral(format!(
                "Error generating plan: {}",
                result.error.unwrap_or_default()
            )));
        }

        let markdown = result
            .data_field("markdown")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        let mut response = Response::message(markdown)
            .with_action(ResponseAction::new("Approve", "approve_plan").with_style(ActionStyle::Primary))
            .with_action(ResponseAction::new("Reject", "reject_plan").with_style(ActionStyle::Danger));

        if let Some(date) = result
            .data_field("plan")
            .and_then(|p| p.get("date"))
            .and_then(Value::as_str)
        {
            response = response.with_metadata("plan_date", date);
        }

        Ok(response)
    }

    async fn handle_status(&self, state: &SlackState, message: &Message) -> PluginResult<Response> {
        let result = state.core.get_status(&message.user_id, None).await;

        if !result.success {
            return Ok(Response::ephemeral(format!(
                "Error fetching status: {}",
                result.error.unwrap_or_default()
            )));
        }

        let status = result
            .data_field("status")
            .and_then(Value::as_str)
            .unwrap_or_default();

        if status == "not_found" {
            return Ok(Response::ephemeral(
                "No plan found for today. Use `/triage plan` to generate one.",
            ));
        }

        let date = result
            .data_field("date")
            .and_then(Value::as_str)
            .unwrap_or_default();
        let total = result
            .data_field("total_priorities")
            .and_then(Value::as_u64)
            .unwrap_or(0);
        let completed = result
            .data_field("completed_priorities")
            .and_then(Value::as_u64)
            .unwrap_or(0);
        let closure_rate = result
            .data_field("closure_rate")
            .and_then(Value::as_f64)
            .unwrap_or(0.0);

        let mut content = format!(
            "*Plan Status for {date}*\n\n\
             Completed: {completed}/{total} priorities\n\
             Closure Rate: {:.0}%",
            closure_rate * 100.0
        );

        if let Some(incomplete) = result.data_field("incomplete_tasks").and_then(Value::as_array)
            && !incomplete.is_empty()
        {
            content.push_str("\n\n*Incomplete Tasks:*\n");
            for task in incomplete.iter().take(5) {
                if let Some(key) = task.as_str() {
                    content.push_str(&format!("- {key}\n"));
                }
            }
        }

        Ok(Response::ephemeral(content))
    }

    async fn handle_config(&self, state: &SlackState, message: &Message) -> PluginResult<Response> {
        if message.parameters.is_empty() {
            return Ok(Response::ephemeral(
                "*Configuration Options*\n\n\
                 Use `/triage config <setting>=<value>` to update settings:\n\n\
                 - `notification_enabled=true/false` - Enable/disable notifications\n\
                 - `approval_timeout_hours=24` - Hours before approval timeout\n\
                 - `admin_block_time=14:00-15:30` - Time for admin tasks\n\
                 - `max_priorities=3` - Maximum priority tasks per day (1-5)\n\n\
                 Example: `/triage config max_priorities=3`",
            ));
        }

        let settings: Map<String, Value> = message
            .parameters
            .iter()
            .map(|(key, value)| (key.clone(), Value::String(value.clone())))
            .collect();

        let result = state
            .core
            .configure_settings(&message.user_id, &settings)
            .await;

        if !result.success {
            return Ok(Response::ephemeral(format!(
                "Error updating settings: {}",
                result.error.unwrap_or_default()
            )));
        }

        let mut content = "*Settings Updated*\n\n".to_string();
        if let Some(updated) = result.data_field("settings").and_then(Value::as_object) {
            for (key, value) in updated {
                content.push_str(&format!("- {key}: `{value}`\n"));
            }
        }

        Ok(Response::ephemeral(content))
    }

    async fn handle_approve(&self, state: &SlackState, message: &Message) -> PluginResult<Response> {
        let plan_date = plan_date_from_metadata(message);

        let result = state
            .core
            .approve_plan(&message.user_id, plan_date, true, None)
            .await;

        if result.success {
            Ok(Response::message(
                "Plan approved! Good luck with your priorities today.",
            ))
        } else {
            Ok(Response::ephemeral(format!(
                "Error approving plan: {}",
                result.error.unwrap_or_default()
            )))
        }
    }

    async fn handle_reject(&self, state: &SlackState, message: &Message) -> PluginResult<Response> {
        let plan_date = plan_date_from_metadata(message);

        let feedback = if !message.content.trim().is_empty() {
            message.content.trim().to_string()
        } else {
            message
                .parameters
                .get("feedback")
                .cloned()
                .unwrap_or_default()
        };

        if feedback.is_empty() {
            return Ok(Response::ephemeral(
                "Please provide feedback on why you're rejecting this plan.",
            ));
        }

        let result = state
            .core
            .reject_plan(&message.user_id, plan_date, &feedback)
            .await;

        if !result.success {
            return Ok(Response::ephemeral(format!(
                "Error rejecting plan: {}",
                result.error.unwrap_or_default()
            )));
        }

        let new_markdown = result
            .data_field("new_plan")
            .and_then(|p| p.get("markdown"))
            .and_then(Value::as_str);

        match new_markdown {
            Some(markdown) => Ok(Response::message(format!(
                "Plan rejected. Here's a new plan:\n\n{markdown}"
            ))
            .with_action(ResponseAction::new("Approve", "approve_plan").with_style(ActionStyle::Primary))
            .with_action(ResponseAction::new("Reject", "reject_plan").with_style(ActionStyle::Danger))),
            None => Ok(Response::message(
                "Plan rejected. Your feedback has been recorded.",
            )),
        }
    }

    fn help_text(&self) -> String {
        "*Courier Commands*\n\n\
         - `/triage plan` - Generate your daily plan\n\
         - `/triage status` - Check current plan status\n\
         - `/triage config` - Configure your settings\n\n\
         Need help? Contact support or visit the documentation."
            .to_string()
    }

    // ─── Core-event notifications ────────────────────────────────────────

    async fn notify_plan_generated(&self, event: &Event) {
        let (Some(user_id), Some(channel_id), Some(markdown)) = (
            event.data_str("user_id"),
            event.data_str("channel_id"),
            event.data_str("plan_markdown"),
        ) else {
            warn!(event = %event.event_type, "Missing required fields in plan_generated event");
            return;
        };

        let mut response = Response::message(format!("*Your Daily Plan is Ready*\n\n{markdown}"))
            .with_action(ResponseAction::new("Approve", "approve_plan").with_style(ActionStyle::Primary))
            .with_action(ResponseAction::new("Reject", "reject_plan").with_style(ActionStyle::Danger));
        if let Some(plan_date) = event.data_str("plan_date") {
            response = response.with_metadata("plan_date", plan_date);
        }

        if !self.send_message(channel_id, user_id, &response).await {
            error!(channel_id = %channel_id, user_id = %user_id, "Failed to send plan notification");
        }
    }

    async fn notify_task_blocked(&self, event: &Event) {
        let (Some(user_id), Some(channel_id), Some(task_key)) = (
            event.data_str("user_id"),
            event.data_str("channel_id"),
            event.data_str("task_key"),
        ) else {
            warn!(event = %event.event_type, "Missing required fields in task_blocked event");
            return;
        };

        let summary = event.data_str("task_summary").unwrap_or("No summary");
        let reason = event.data_str("blocking_reason").unwrap_or("Unknown reason");

        let content = format!(
            "*Task Blocked Alert*\n\n\
             *Task:* {task_key} - {summary}\n\
             *Reason:* {reason}\n\n\
             This task is currently blocked and cannot be completed. Please review and take action."
        );

        if !self
            .send_message(channel_id, user_id, &Response::message(content))
            .await
        {
            error!(
                channel_id = %channel_id,
                user_id = %user_id,
                task_key = %task_key,
                "Failed to send task blocked notification"
            );
        }
    }

    async fn notify_approval_timeout(&self, event: &Event) {
        let (Some(user_id), Some(channel_id), Some(plan_date)) = (
            event.data_str("user_id"),
            event.data_str("channel_id"),
            event.data_str("plan_date"),
        ) else {
            warn!(event = %event.event_type, "Missing required fields in approval_timeout event");
            return;
        };

        let hours_remaining = event
            .data
            .get("hours_remaining")
            .and_then(Value::as_f64)
            .unwrap_or(0.0);

        let content = format!(
            "*Plan Approval Reminder*\n\n\
             Your plan for {plan_date} is still pending approval.\n\n\
             Time remaining: {hours_remaining:.0} hours\n\n\
             Please review and approve your plan to get started!"
        );

        let response = Response::message(content)
            .with_action(ResponseAction::new("View Plan", "view_plan").with_style(ActionStyle::Primary))
            .with_metadata("plan_date", plan_date);

        if !self.send_message(channel_id, user_id, &response).await {
            error!(
                channel_id = %channel_id,
                user_id = %user_id,
                "Failed to send approval timeout notification"
            );
        }
    }
}

/// Reads the plan date out of message metadata, defaulting to today.
fn plan_date_from_metadata(message: &Message) -> NaiveDate {
    message
        .metadata_str("plan_date")
        .and_then(|raw| raw.parse().ok())
        .unwrap_or_else(|| Utc::now().date_naive())
}

#[async_trait]
impl ChannelPlugin for SlackPlugin {
    fn name(&self) -> &'static str {
        PLUGIN_NAME
    }

    fn version(&self) -> &'static str {
        PLUGIN_VERSION
    }

    fn config_schema(&self) -> ConfigSchema {
        SlackConfig::schema()
    }

    async fn initialize(&self, config: PluginConfig, core: SharedCoreActions) -> PluginResult<()> {
        info!("Initializing Slack plugin");

        let slack_config = SlackConfig::from_plugin_config(&config)?;

        *self.state.write().await = Some(SlackState {
            config: slack_config,
            core,
            client: SlackApiClient::new(),
        });

        info!("Slack plugin initialized");
        Ok(())
    }

    async fn start(&self) -> PluginResult<()> {
        // Webhook-driven: nothing to open, the gateway delivers inbound
        // traffic.
        self.state().await?;
        info!("Slack plugin started and ready to receive webhooks");
        Ok(())
    }

    async fn stop(&self) -> PluginResult<()> {
        info!("Slack plugin stopped");
        Ok(())
    }

    async fn health_check(&self) -> HealthState {
        let state = self.state.read().await.clone();
        let Some(state) = state else {
            return HealthState::Unhealthy;
        };

        // Without a global bot token there is nothing to probe; tokens are
        // loaded per workspace on demand.
        let Some(token) = &state.config.bot_token else {
            debug!("Health check: no global bot token, multi-workspace mode");
            return HealthState::Healthy;
        };

        match state.client.auth_test(token).await {
            Ok(true) => HealthState::Healthy,
            Ok(false) => {
                warn!("Health check: platform API returned not ok");
                HealthState::Degraded
            }
            Err(e) => {
                error!(error = %e, "Health check: platform API error");
                HealthState::Unhealthy
            }
        }
    }

    async fn handle_message(&self, message: Message) -> PluginResult<Response> {
        let state = self.state().await?;

        info!(
            command = ?message.command,
            user_id = %message.user_id,
            channel_id = %message.channel_id,
            "Handling Slack message"
        );

        // Workspace gate: an uninstalled or inactive workspace is refused
        // before the core is ever consulted.
        if self.verify_installation(&message.channel_id).await.is_none() {
            return Ok(Response::ephemeral(NOT_INSTALLED));
        }

        if !self
            .ensure_workspace_isolation(&message.channel_id, &message.user_id)
            .await
        {
            return Ok(Response::ephemeral(ISOLATION_FAILED));
        }

        match message.command.as_deref() {
            Some("plan") => self.handle_plan(&state, &message).await,
            Some("status") => self.handle_status(&state, &message).await,
            Some("config") => self.handle_config(&state, &message).await,
            Some("approve") => self.handle_approve(&state, &message).await,
            Some("reject") => self.handle_reject(&state, &message).await,
            _ => Ok(Response::ephemeral(self.help_text())),
        }
    }

    async fn send_message(&self, channel_id: &str, user_id: &str, response: &Response) -> bool {
        let Ok(state) = self.state().await else {
            error!("send_message called before initialization");
            return false;
        };

        // Tokens are fetched per request and never cached decrypted.
        let installation = match self.storage.get(PLUGIN_NAME, channel_id).await {
            Ok(Some(installation)) if installation.is_active => installation,
            Ok(_) => {
                error!(channel_id = %channel_id, "No active installation for workspace");
                return false;
            }
            Err(e) => {
                error!(channel_id = %channel_id, error = %e, "Failed to load installation");
                return false;
            }
        };

        let blocks = response_to_blocks(response);

        match state
            .client
            .post_message(&installation.access_token, user_id, &response.content, &blocks)
            .await
        {
            Ok(()) => {
                info!(channel_id = %channel_id, user_id = %user_id, "Message sent");
                true
            }
            Err(e) => {
                error!(
                    channel_id = %channel_id,
                    user_id = %user_id,
                    error = %e,
                    "Failed to send message"
                );
                false
            }
        }
    }

    async fn handle_event(&self, event: &Event) -> PluginResult<()> {
        info!(event = %event.event_type, "Handling core event");

        match event.event_type {
            EventType::PlanGenerated => self.notify_plan_generated(event).await,
            EventType::TaskBlocked => self.notify_task_blocked(event).await,
            EventType::ApprovalTimeout => self.notify_approval_timeout(event).await,
            _ => {
                debug!(event = %event.event_type, "Ignoring event type");
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use courier_core::{ActionResult, CoreActions, ErrorCode, ResponseType};
    use courier_store::TokenCipher;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct StubActions {
        plan_calls: AtomicUsize,
    }

    impl StubActions {
        fn new() -> Self {
            Self {
                plan_calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl CoreActions for StubActions {
        async fn generate_plan(
            &self,
            _user_id: &str,
            _plan_date: Option<NaiveDate>,
            _closure_rate: Option<f64>,
        ) -> ActionResult {
            self.plan_calls.fetch_add(1, Ordering::SeqCst);
            ActionResult::ok(json!({
                "plan": {"date": "2026-03-02"},
                "markdown": "# Daily Plan - 2026-03-02",
            }))
        }
        async fn approve_plan(
            &self,
            user_id: &str,
            plan_date: NaiveDate,
            approved: bool,
            _feedback: Option<&str>,
        ) -> ActionResult {
            ActionResult::ok(json!({
                "user_id": user_id,
                "plan_date": plan_date.to_string(),
                "approved": approved,
            }))
        }
        async fn reject_plan(
            &self,
            _user_id: &str,
            _plan_date: NaiveDate,
            _feedback: &str,
        ) -> ActionResult {
            ActionResult::ok(json!({"rejection_recorded": true, "new_plan": null}))
        }
        async fn decompose_task(
            &self,
            _user_id: &str,
            _task_key: &str,
            _target_days: f64,
        ) -> ActionResult {
            ActionResult::fail(ErrorCode::NotInitialized, "unused")
        }
        async fn get_status(&self, user_id: &str, _plan_date: Option<NaiveDate>) -> ActionResult {
            ActionResult::ok(json!({
                "user_id": user_id,
                "date": "2026-03-02",
                "status": "in_progress",
                "total_priorities": 3,
                "completed_priorities": 1,
                "closure_rate": 1.0 / 3.0,
                "incomplete_tasks": ["PROJ-2", "PROJ-3"],
            }))
        }
        async fn configure_settings(
            &self,
            user_id: &str,
            settings: &Map<String, Value>,
        ) -> ActionResult {
            ActionResult::ok(json!({
                "user_id": user_id,
                "settings": settings,
                "updated_at": "2026-03-02",
            }))
        }
    }

    async fn plugin_with_install() -> (SlackPlugin, Arc<StubActions>) {
        let cipher =
            TokenCipher::from_passphrase("adapter-test-passphrase-with-length!").unwrap();
        let storage = Arc::new(InstallationStore::open_in_memory(cipher).unwrap());
        storage
            .create(Installation::new("slack", "T1", "xoxb-token"))
            .await
            .unwrap();

        let plugin = SlackPlugin::new(storage);
        let core = Arc::new(StubActions::new());

        let config = PluginConfig::new("slack", PLUGIN_VERSION)
            .with_value("client_id", "C1")
            .with_value("client_secret", "cs")
            .with_value("signing_secret", "ss");
        plugin.initialize(config, core.clone()).await.unwrap();

        (plugin, core)
    }

    fn slash(command: &str, team: &str, user: &str) -> Message {
        Message::new(team, user, command).with_command(command)
    }

    #[tokio::test]
    async fn plan_command_returns_blocks_with_approval_actions() {
        let (plugin, _core) = plugin_with_install().await;

        let response = plugin.handle_message(slash("plan", "T1", "U1")).await.unwrap();

        assert_eq!(response.response_type, ResponseType::Message);
        assert!(response.content.contains("# Daily Plan - 2026-03-02"));
        let ids: Vec<&str> = response.actions.iter().map(|a| a.action_id.as_str()).collect();
        assert_eq!(ids, vec!["approve_plan", "reject_plan"]);
        assert_eq!(response.metadata_str("plan_date"), Some("2026-03-02"));
    }

    #[tokio::test]
    async fn uninstalled_workspace_is_refused_before_the_core() {
        let (plugin, core) = plugin_with_install().await;

        let response = plugin
            .handle_message(slash("plan", "T_UNKNOWN", "U1"))
            .await
            .unwrap();

        assert_eq!(response.response_type, ResponseType::Ephemeral);
        assert!(response.content.contains("not installed"));
        assert_eq!(core.plan_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn foreign_user_id_shape_fails_isolation() {
        let (plugin, core) = plugin_with_install().await;

        let response = plugin
            .handle_message(slash("plan", "T1", "X999"))
            .await
            .unwrap();

        assert_eq!(response.response_type, ResponseType::Ephemeral);
        assert!(response.content.contains("contact support"));
        assert_eq!(core.plan_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn invalid_closure_rate_parameter_is_rejected_locally() {
        let (plugin, core) = plugin_with_install().await;

        let mut message = slash("plan", "T1", "U1");
        message
            .parameters
            .insert("closure_rate".to_string(), "not-a-number".to_string());

        let response = plugin.handle_message(message).await.unwrap();
        assert!(response.content.contains("closure_rate"));
        assert_eq!(core.plan_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn unknown_command_shows_help() {
        let (plugin, _core) = plugin_with_install().await;

        let response = plugin
            .handle_message(slash("dance", "T1", "U1"))
            .await
            .unwrap();

        assert_eq!(response.response_type, ResponseType::Ephemeral);
        assert!(response.content.contains("Courier Commands"));
    }

    #[tokio::test]
    async fn status_command_formats_progress() {
        let (plugin, _core) = plugin_with_install().await;

        let response = plugin
            .handle_message(slash("status", "T1", "U1"))
            .await
            .unwrap();

        assert!(response.content.contains("Completed: 1/3 priorities"));
        assert!(response.content.contains("Closure Rate: 33%"));
        assert!(response.content.contains("PROJ-2"));
    }

    #[tokio::test]
    async fn config_without_parameters_shows_options() {
        let (plugin, _core) = plugin_with_install().await;

        let response = plugin
            .handle_message(slash("config", "T1", "U1"))
            .await
            .unwrap();

        assert!(response.content.contains("Configuration Options"));
    }

    #[tokio::test]
    async fn reject_without_feedback_asks_for_it() {
        let (plugin, _core) = plugin_with_install().await;

        let mut message = Message::new("T1", "U1", "");
        message.command = Some("reject".to_string());

        let response = plugin.handle_message(message).await.unwrap();
        assert!(response.content.contains("provide feedback"));
    }

    #[tokio::test]
    async fn approve_uses_plan_date_from_metadata() {
        let (plugin, _core) = plugin_with_install().await;

        let message = slash("approve", "T1", "U1").with_metadata("plan_date", "2026-03-02");
        let response = plugin.handle_message(message).await.unwrap();

        assert!(response.content.contains("Plan approved"));
    }

    #[tokio::test]
    async fn uninitialized_plugin_reports_unhealthy_and_errors() {
        let cipher =
            TokenCipher::from_passphrase("adapter-test-passphrase-with-length!").unwrap();
        let storage = Arc::new(InstallationStore::open_in_memory(cipher).unwrap());
        let plugin = SlackPlugin::new(storage);

        assert_eq!(plugin.health_check().await, HealthState::Unhealthy);
        assert!(plugin.handle_message(slash("plan", "T1", "U1")).await.is_err());
    }

    #[tokio::test]
    async fn initialized_plugin_without_bot_token_is_healthy() {
        let (plugin, _core) = plugin_with_install().await;
        assert_eq!(plugin.health_check().await, HealthState::Healthy);
    }

    #[tokio::test]
    async fn send_message_without_installation_is_best_effort_false() {
        let (plugin, _core) = plugin_with_install().await;
        let sent = plugin
            .send_message("T_MISSING", "U1", &Response::message("hello"))
            .await;
        assert!(!sent);
    }

    #[tokio::test]
    async fn uninstall_removes_the_workspace() {
        let (plugin, _core) = plugin_with_install().await;

        assert!(plugin.uninstall_workspace("T1").await.unwrap());
        assert!(plugin.verify_installation("T1").await.is_none());

        let response = plugin.handle_message(slash("plan", "T1", "U1")).await.unwrap();
        assert!(response.content.contains("not installed"));
    }

    #[tokio::test]
    async fn events_with_missing_fields_are_ignored() {
        let (plugin, _core) = plugin_with_install().await;

        let mut data = Map::new();
        data.insert("user_id".into(), json!("U1"));
        let event = Event::new(EventType::PlanGenerated, data, "triage-engine");

        // No channel_id / plan_markdown: logged and skipped, no error.
        plugin.handle_event(&event).await.unwrap();

        // Unsubscribed event types are ignored silently.
        let event = Event::new(EventType::TaskCompleted, Map::new(), "triage-engine");
        plugin.handle_event(&event).await.unwrap();
    }
}
