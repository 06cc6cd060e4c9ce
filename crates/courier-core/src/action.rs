//! The Core Actions façade: the stable contract from plugins into the
//! triage engine.
//!
//! Every entry point validates its inputs before touching shared state and
//! returns an [`ActionResult`] instead of raising for expected failures:
//! invalid input, an uninitialised collaborator, a downstream error. The
//! machine-readable surface is [`ErrorCode`]; the strings it renders to are
//! frozen.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// =============================================================================
// Error codes
// =============================================================================

/// Stable, machine-readable failure codes for core actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    InvalidUserId,
    InvalidDate,
    InvalidClosureRate,
    InvalidApproved,
    InvalidFeedback,
    InvalidTaskKey,
    InvalidTargetDays,
    InvalidSettings,
    NotInitialized,
    PlanGenerationFailed,
    ApprovalFailed,
    RejectionFailed,
    DecompositionFailed,
    StatusFetchFailed,
    SettingsUpdateFailed,
}

impl ErrorCode {
    /// The frozen wire string, e.g. `INVALID_USER_ID`.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::InvalidUserId => "INVALID_USER_ID",
            ErrorCode::InvalidDate => "INVALID_DATE",
            ErrorCode::InvalidClosureRate => "INVALID_CLOSURE_RATE",
            ErrorCode::InvalidApproved => "INVALID_APPROVED",
            ErrorCode::InvalidFeedback => "INVALID_FEEDBACK",
            ErrorCode::InvalidTaskKey => "INVALID_TASK_KEY",
            ErrorCode::InvalidTargetDays => "INVALID_TARGET_DAYS",
            ErrorCode::InvalidSettings => "INVALID_SETTINGS",
            ErrorCode::NotInitialized => "NOT_INITIALIZED",
            ErrorCode::PlanGenerationFailed => "PLAN_GENERATION_FAILED",
            ErrorCode::ApprovalFailed => "APPROVAL_FAILED",
            ErrorCode::RejectionFailed => "REJECTION_FAILED",
            ErrorCode::DecompositionFailed => "DECOMPOSITION_FAILED",
            ErrorCode::StatusFetchFailed => "STATUS_FETCH_FAILED",
            ErrorCode::SettingsUpdateFailed => "SETTINGS_UPDATE_FAILED",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// ActionResult
// =============================================================================

/// Standard result wrapper for every core action.
///
/// `success == true` implies `data` is present and `error`/`error_code` are
/// absent; the inverse holds for failures.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<ErrorCode>,
}

impl ActionResult {
    /// Creates a success result carrying `data`.
    pub fn ok(data: Value) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            error_code: None,
        }
    }

    /// Creates a failure result with a stable code and a user-presentable
    /// message.
    pub fn fail(code: ErrorCode, error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
            error_code: Some(code),
        }
    }

    /// Returns a data field by key, when this is a success with an object
    /// payload.
    pub fn data_field(&self, key: &str) -> Option<&Value> {
        self.data.as_ref().and_then(|d| d.get(key))
    }
}

// =============================================================================
// CoreActions trait
// =============================================================================

/// Shared handle to the core façade adapters hold.
pub type SharedCoreActions = Arc<dyn CoreActions>;

/// The versioned façade plugins call into the triage engine.
///
/// Implementations must be total: expected failures come back as
/// `ActionResult { success: false, .. }` with a deterministic
/// [`ErrorCode`]; only uncatchable runtime faults may escape.
///
/// The façade is safe for concurrent entry; all inputs are validated
/// before any shared state is touched, and individual collaborators may
/// serialise internally.
#[async_trait]
pub trait CoreActions: Send + Sync {
    /// Generates a daily plan for the user.
    ///
    /// `plan_date` defaults to today; `closure_rate`, when given, must be a
    /// finite number in `[0.0, 1.0]`.
    async fn generate_plan(
        &self,
        user_id: &str,
        plan_date: Option<NaiveDate>,
        closure_rate: Option<f64>,
    ) -> ActionResult;

    /// Records an approval decision for the plan of `plan_date`.
    async fn approve_plan(
        &self,
        user_id: &str,
        plan_date: NaiveDate,
        approved: bool,
        feedback: Option<&str>,
    ) -> ActionResult;

    /// Rejects a plan (feedback required) and triggers re-planning.
    async fn reject_plan(&self, user_id: &str, plan_date: NaiveDate, feedback: &str)
    -> ActionResult;

    /// Decomposes a long-running task into subtasks of at most
    /// `target_days` effort each.
    async fn decompose_task(&self, user_id: &str, task_key: &str, target_days: f64)
    -> ActionResult;

    /// Fetches the completion record for `plan_date` (today when absent).
    async fn get_status(&self, user_id: &str, plan_date: Option<NaiveDate>) -> ActionResult;

    /// Updates user preferences. Unknown keys are dropped; invalid values
    /// on recognised keys fail the whole call.
    async fn configure_settings(
        &self,
        user_id: &str,
        settings: &Map<String, Value>,
    ) -> ActionResult;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn error_codes_render_frozen_strings() {
        assert_eq!(ErrorCode::InvalidUserId.as_str(), "INVALID_USER_ID");
        assert_eq!(ErrorCode::NotInitialized.as_str(), "NOT_INITIALIZED");
        assert_eq!(ErrorCode::PlanGenerationFailed.as_str(), "PLAN_GENERATION_FAILED");
        let wire = serde_json::to_string(&ErrorCode::InvalidClosureRate).unwrap();
        assert_eq!(wire, "\"INVALID_CLOSURE_RATE\"");
    }

    #[test]
    fn result_constructors() {
        let ok = ActionResult::ok(json!({"plan": {}}));
        assert!(ok.success);
        assert!(ok.data_field("plan").is_some());

        let failed = ActionResult::fail(ErrorCode::InvalidUserId, "user_id is required");
        assert!(!failed.success);
        assert_eq!(failed.error_code, Some(ErrorCode::InvalidUserId));
        assert!(failed.data.is_none());
    }
}
