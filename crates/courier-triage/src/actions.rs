//! `TriageActions`, the concrete Core Actions API.
//!
//! Every entry point validates all of its parameters before any side
//! effect, returns [`ActionResult`] instead of raising for expected
//! failures, and maps collaborator errors to deterministic error codes.
//! The registry relies on this totality: adapters call straight into the
//! façade from the routing hot path.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use serde_json::{Map, Value, json};
use tokio::sync::RwLock;
use tracing::{error, info};

use courier_core::{ActionResult, CoreActions, ErrorCode, Event, EventPublisher, EventType};

use crate::classifier::TaskClassifier;
use crate::ledger::ClosureLedger;
use crate::planner::PlanGenerator;
use crate::source::TaskSource;

/// The source tag stamped onto events this façade publishes.
const EVENT_SOURCE: &str = "triage-engine";

/// Recognised user-settings keys and their validation rules.
const SETTING_NOTIFICATION_ENABLED: &str = "notification_enabled";
const SETTING_APPROVAL_TIMEOUT_HOURS: &str = "approval_timeout_hours";
const SETTING_ADMIN_BLOCK_TIME: &str = "admin_block_time";
const SETTING_MAX_PRIORITIES: &str = "max_priorities";

/// Builder for [`TriageActions`].
#[derive(Default)]
pub struct TriageActionsBuilder {
    tasks: Option<Arc<dyn TaskSource>>,
    ledger: Option<Arc<dyn ClosureLedger>>,
    events: Option<Arc<dyn EventPublisher>>,
}

impl TriageActionsBuilder {
    /// Sets the issue-tracker source.
    pub fn task_source(mut self, source: Arc<dyn TaskSource>) -> Self {
        self.tasks = Some(source);
        self
    }

    /// Sets the closure ledger.
    pub fn ledger(mut self, ledger: Arc<dyn ClosureLedger>) -> Self {
        self.ledger = Some(ledger);
        self
    }

    /// Sets the event sink for approval/rejection notifications.
    pub fn events(mut self, events: Arc<dyn EventPublisher>) -> Self {
        self.events = Some(events);
        self
    }

    pub fn build(self) -> TriageActions {
        TriageActions {
            tasks: self.tasks,
            ledger: self.ledger,
            events: self.events,
            classifier: TaskClassifier::new(),
            planner: PlanGenerator::new(),
            settings: RwLock::new(HashMap::new()),
        }
    }
}

/// The concrete [`CoreActions`] façade over the triage engine.
pub struct TriageActions {
    tasks: Option<Arc<dyn TaskSource>>,
    ledger: Option<Arc<dyn ClosureLedger>>,
    events: Option<Arc<dyn EventPublisher>>,
    classifier: TaskClassifier,
    planner: PlanGenerator,
    /// Per-user validated settings.
    settings: RwLock<HashMap<String, Map<String, Value>>>,
}

impl TriageActions {
    pub fn builder() -> TriageActionsBuilder {
        TriageActionsBuilder::default()
    }

    fn publish(&self, event_type: EventType, data: Map<String, Value>) {
        if let Some(events) = &self.events {
            events.publish(Event::new(event_type, data, EVENT_SOURCE));
        }
    }
}

/// Rejects empty or whitespace-only user ids.
fn check_user_id(user_id: &str) -> Result<(), ActionResult> {
    if user_id.trim().is_empty() {
        return Err(ActionResult::fail(
            ErrorCode::InvalidUserId,
            "user_id is required and must be a non-empty string",
        ));
    }
    Ok(())
}

fn check_closure_rate(closure_rate: Option<f64>) -> Result<(), ActionResult> {
    if let Some(rate) = closure_rate {
        if !rate.is_finite() {
            return Err(ActionResult::fail(
                ErrorCode::InvalidClosureRate,
                "closure_rate cannot be NaN or infinity",
            ));
        }
        if !(0.0..=1.0).contains(&rate) {
            return Err(ActionResult::fail(
                ErrorCode::InvalidClosureRate,
                "closure_rate must be between 0.0 and 1.0",
            ));
        }
    }
    Ok(())
}

#[async_trait]
impl CoreActions for TriageActions {
    async fn generate_plan(
        &self,
        user_id: &str,
        plan_date: Option<NaiveDate>,
        closure_rate: Option<f64>,
    ) -> ActionResult {
        if let Err(invalid) = check_user_id(user_id) {
            return invalid;
        }
        if let Err(invalid) = check_closure_rate(closure_rate) {
            return invalid;
        }

        let Some(tasks) = &self.tasks else {
            return ActionResult::fail(ErrorCode::NotInitialized, "Core components not initialized");
        };

        let plan_date = plan_date.unwrap_or_else(|| Utc::now().date_naive());

        info!(user_id = %user_id, date = %plan_date, "Generating daily plan");

        let active = match tasks.fetch_active_tasks(user_id).await {
            Ok(active) => active,
            Err(e) => {
                error!(user_id = %user_id, error = %e, "Plan generation failed");
                return ActionResult::fail(ErrorCode::PlanGenerationFailed, e.to_string());
            }
        };

        let classified = active
            .iter()
            .map(|task| self.classifier.classify(task))
            .collect();

        let plan = self
            .planner
            .generate_daily_plan(classified, plan_date, closure_rate);
        let markdown = plan.to_markdown();

        match serde_json::to_value(&plan) {
            Ok(plan_json) => ActionResult::ok(json!({"plan": plan_json, "markdown": markdown})),
            Err(e) => {
                error!(user_id = %user_id, error = %e, "Plan serialization failed");
                ActionResult::fail(ErrorCode::PlanGenerationFailed, "plan serialization failed")
            }
        }
    }

    async fn approve_plan(
        &self,
        user_id: &str,
        plan_date: NaiveDate,
        approved: bool,
        feedback: Option<&str>,
    ) -> ActionResult {
        if let Err(invalid) = check_user_id(user_id) {
            return invalid;
        }

        info!(
            user_id = %user_id,
            date = %plan_date,
            approved = approved,
            "Processing plan approval"
        );

        let mut data = Map::new();
        data.insert("user_id".into(), json!(user_id));
        data.insert("plan_date".into(), json!(plan_date.to_string()));
        data.insert("approved".into(), json!(approved));
        data.insert("timestamp".into(), json!(Utc::now().date_naive().to_string()));
        if let Some(feedback) = feedback {
            data.insert("feedback".into(), json!(feedback));
        }

        let event_type = if approved {
            EventType::PlanApproved
        } else {
            EventType::PlanRejected
        };
        self.publish(event_type, data.clone());

        ActionResult::ok(Value::Object(data))
    }

    async fn reject_plan(
        &self,
        user_id: &str,
        plan_date: NaiveDate,
        feedback: &str,
    ) -> ActionResult {
        if let Err(invalid) = check_user_id(user_id) {
            return invalid;
        }
        if feedback.trim().is_empty() {
            return ActionResult::fail(
                ErrorCode::InvalidFeedback,
                "feedback is required when rejecting a plan and must be a non-empty string",
            );
        }

        info!(user_id = %user_id, date = %plan_date, "Plan rejected, triggering re-planning");

        let recorded = self
            .approve_plan(user_id, plan_date, false, Some(feedback))
            .await;
        if !recorded.success {
            return ActionResult::fail(
                ErrorCode::RejectionFailed,
                recorded
                    .error
                    .unwrap_or_else(|| "rejection could not be recorded".to_string()),
            );
        }

        let replan = self.generate_plan(user_id, Some(plan_date), None).await;
        let new_plan = if replan.success { replan.data } else { None };

        ActionResult::ok(json!({
            "rejection_recorded": true,
            "new_plan": new_plan,
        }))
    }

    async fn decompose_task(
        &self,
        user_id: &str,
        task_key: &str,
        target_days: f64,
    ) -> ActionResult {
        if let Err(invalid) = check_user_id(user_id) {
            return invalid;
        }
        if task_key.trim().is_empty() {
            return ActionResult::fail(
                ErrorCode::InvalidTaskKey,
                "task_key is required and must be a non-empty string in format PROJECT-123",
            );
        }
        if !target_days.is_finite() {
            return ActionResult::fail(
                ErrorCode::InvalidTargetDays,
                "target_days cannot be NaN or infinity",
            );
        }
        if target_days <= 0.0 {
            return ActionResult::fail(
                ErrorCode::InvalidTargetDays,
                "target_days must be greater than 0",
            );
        }

        let Some(tasks) = &self.tasks else {
            return ActionResult::fail(ErrorCode::NotInitialized, "Core components not initialized");
        };

        info!(user_id = %user_id, task_key = %task_key, "Decomposing task");

        let task = match tasks.get_task(task_key).await {
            Ok(Some(task)) => task,
            Ok(None) => {
                return ActionResult::fail(
                    ErrorCode::DecompositionFailed,
                    format!("task '{task_key}' not found"),
                );
            }
            Err(e) => {
                error!(task_key = %task_key, error = %e, "Task decomposition failed");
                return ActionResult::fail(ErrorCode::DecompositionFailed, e.to_string());
            }
        };

        let estimated_days = self.classifier.estimate_effort_days(&task);
        let subtasks = self
            .planner
            .propose_decomposition(&task, estimated_days, target_days);

        match serde_json::to_value(&subtasks) {
            Ok(subtasks_json) => ActionResult::ok(json!({
                "task_key": task_key,
                "subtasks": subtasks_json,
                "count": subtasks.len(),
            })),
            Err(e) => {
                error!(task_key = %task_key, error = %e, "Subtask serialization failed");
                ActionResult::fail(ErrorCode::DecompositionFailed, "subtask serialization failed")
            }
        }
    }

    async fn get_status(&self, user_id: &str, plan_date: Option<NaiveDate>) -> ActionResult {
        if let Err(invalid) = check_user_id(user_id) {
            return invalid;
        }

        let plan_date = plan_date.unwrap_or_else(|| Utc::now().date_naive());

        let Some(ledger) = &self.ledger else {
            return ActionResult::fail(
                ErrorCode::StatusFetchFailed,
                "closure ledger not configured",
            );
        };

        match ledger.load(plan_date).await {
            Ok(Some(record)) => {
                let status = if record.closure_rate >= 1.0 {
                    "completed"
                } else {
                    "in_progress"
                };
                ActionResult::ok(json!({
                    "user_id": user_id,
                    "date": plan_date.to_string(),
                    "status": status,
                    "total_priorities": record.total_priorities,
                    "completed_priorities": record.completed_priorities,
                    "closure_rate": record.closure_rate,
                    "incomplete_tasks": record.incomplete_tasks,
                }))
            }
            Ok(None) => ActionResult::ok(json!({
                "user_id": user_id,
                "date": plan_date.to_string(),
                "status": "not_found",
                "message": "No plan found for this date",
            })),
            Err(e) => {
                error!(user_id = %user_id, error = %e, "Status fetch failed");
                ActionResult::fail(ErrorCode::StatusFetchFailed, e.to_string())
            }
        }
    }

    async fn configure_settings(
        &self,
        user_id: &str,
        settings: &Map<String, Value>,
    ) -> ActionResult {
        if let Err(invalid) = check_user_id(user_id) {
            return invalid;
        }

        let mut validated = Map::new();

        for (key, value) in settings {
            match key.as_str() {
                SETTING_NOTIFICATION_ENABLED => match coerce_bool(value) {
                    Some(enabled) => {
                        validated.insert(key.clone(), json!(enabled));
                    }
                    None => return invalid_setting(key, "must be a boolean"),
                },
                SETTING_APPROVAL_TIMEOUT_HOURS => match coerce_number(value) {
                    Some(hours) if hours > 0.0 && hours.is_finite() => {
                        validated.insert(key.clone(), json!(hours));
                    }
                    _ => return invalid_setting(key, "must be a positive number"),
                },
                SETTING_ADMIN_BLOCK_TIME => match value.as_str() {
                    Some(window) if is_time_window(window) => {
                        validated.insert(key.clone(), json!(window));
                    }
                    _ => return invalid_setting(key, "must be a time window of form HH:MM-HH:MM"),
                },
                SETTING_MAX_PRIORITIES => match coerce_integer(value) {
                    Some(max) if (1..=5).contains(&max) => {
                        validated.insert(key.clone(), json!(max));
                    }
                    _ => return invalid_setting(key, "must be an integer between 1 and 5"),
                },
                // Unknown keys are silently dropped.
                _ => {}
            }
        }

        info!(user_id = %user_id, count = validated.len(), "Settings updated");

        {
            let mut all = self.settings.write().await;
            all.entry(user_id.to_string())
                .or_default()
                .extend(validated.clone());
        }

        ActionResult::ok(json!({
            "user_id": user_id,
            "settings": validated,
            "updated_at": Utc::now().date_naive().to_string(),
        }))
    }
}

fn invalid_setting(key: &str, requirement: &str) -> ActionResult {
    ActionResult::fail(
        ErrorCode::InvalidSettings,
        format!("setting '{key}' {requirement}"),
    )
}

/// Accepts native booleans and the chat-friendly textual forms.
fn coerce_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::String(s) => match s.to_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => Some(true),
            "false" | "0" | "no" | "off" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

fn coerce_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn coerce_integer(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Validates a `HH:MM-HH:MM` window.
fn is_time_window(window: &str) -> bool {
    fn is_clock(part: &str) -> bool {
        let Some((hours, minutes)) = part.split_once(':') else {
            return false;
        };
        let valid_hours = hours.len() == 2 && hours.parse::<u8>().is_ok_and(|h| h < 24);
        let valid_minutes = minutes.len() == 2 && minutes.parse::<u8>().is_ok_and(|m| m < 60);
        valid_hours && valid_minutes
    }

    match window.split_once('-') {
        Some((start, end)) => is_clock(start) && is_clock(end),
        None => false,
    }
}
