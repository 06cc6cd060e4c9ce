//! Task classification.

use serde_json::Value;

use crate::model::{ClassifiedTask, TaskCategory, TrackedTask};

/// Labels that mark a task as administrative.
const ADMIN_LABELS: &[&str] = &[
    "admin",
    "administrative",
    "email",
    "report",
    "approval",
    "meeting",
    "review",
];

/// Issue types that mark a task as administrative.
const ADMIN_ISSUE_TYPES: &[&str] = &["Administrative Task", "Admin", "Approval", "Review"];

/// Link types that indicate third-party blocking.
const BLOCKING_LINK_TYPES: &[&str] = &["is blocked by", "depends on", "blocked by"];

/// Conservative story-point conversion: 1 point ≈ 1.25 working days.
const STORY_POINTS_TO_DAYS: f64 = 1.25;

/// Seconds in an 8-hour working day.
const SECONDS_PER_DAY: f64 = 8.0 * 60.0 * 60.0;

/// Classifies tracker tasks and determines priority eligibility.
#[derive(Debug, Clone, Copy, Default)]
pub struct TaskClassifier;

impl TaskClassifier {
    pub fn new() -> Self {
        Self
    }

    /// Classifies a single task.
    pub fn classify(&self, task: &TrackedTask) -> ClassifiedTask {
        let has_dependencies = self.has_third_party_dependencies(task);
        let estimated_days = self.estimate_effort_days(task);
        let is_admin = self.is_administrative(task);
        let is_blocking = task.priority.eq_ignore_ascii_case("blocker");

        let category = if is_blocking {
            TaskCategory::Blocking
        } else if has_dependencies {
            TaskCategory::Dependent
        } else if is_admin {
            TaskCategory::Administrative
        } else if estimated_days > 1.0 {
            TaskCategory::LongRunning
        } else {
            TaskCategory::PriorityEligible
        };

        // Priority eligibility: unblocked, at most a day of effort, and
        // neither administrative nor a blocker (blockers re-plan instead).
        let priority_eligible =
            !has_dependencies && estimated_days <= 1.0 && !is_admin && !is_blocking;

        ClassifiedTask {
            task: task.clone(),
            category,
            priority_eligible,
            has_dependencies,
            estimated_days,
            blocking_reason: is_blocking.then(|| "Marked as blocker priority".to_string()),
        }
    }

    /// True when the task waits on an external party.
    ///
    /// Looks at blocking link types and at custom fields whose names
    /// suggest an external dependency.
    pub fn has_third_party_dependencies(&self, task: &TrackedTask) -> bool {
        for link in &task.links {
            let link_type = link.link_type.to_lowercase();
            if BLOCKING_LINK_TYPES.iter().any(|t| link_type.contains(t)) {
                return true;
            }
        }

        for (name, value) in &task.custom_fields {
            let name = name.to_lowercase();
            if !(name.contains("external") || name.contains("dependency") || name.contains("blocked"))
            {
                continue;
            }
            let set = match value {
                Value::Null => false,
                Value::Bool(b) => *b,
                Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
                Value::String(s) => !s.trim().is_empty(),
                Value::Array(items) => !items.is_empty(),
                Value::Object(map) => !map.is_empty(),
            };
            if set {
                return true;
            }
        }

        false
    }

    /// Estimates effort in working days.
    ///
    /// Story points and time estimates both floor at a conservative 1.0
    /// day; tasks without any estimate default to 1.0 day.
    pub fn estimate_effort_days(&self, task: &TrackedTask) -> f64 {
        if let Some(points) = task.story_points
            && points > 0
        {
            let days = f64::from(points) * STORY_POINTS_TO_DAYS;
            return ((days * 2.0).round() / 2.0).max(1.0);
        }

        if let Some(seconds) = task.time_estimate
            && seconds > 0
        {
            let days = seconds as f64 / SECONDS_PER_DAY;
            return ((days * 2.0).round() / 2.0).max(1.0);
        }

        1.0
    }

    /// True for low-cognitive-load administrative tasks.
    pub fn is_administrative(&self, task: &TrackedTask) -> bool {
        if task
            .labels
            .iter()
            .any(|label| ADMIN_LABELS.contains(&label.to_lowercase().as_str()))
        {
            return true;
        }

        if ADMIN_ISSUE_TYPES.contains(&task.issue_type.as_str()) {
            return true;
        }

        let issue_type = task.issue_type.to_lowercase();
        ["admin", "approval", "review"]
            .iter()
            .any(|keyword| issue_type.contains(keyword))
    }
}
