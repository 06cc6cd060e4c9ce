//! Task and plan data model.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Classification buckets for tracker tasks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskCategory {
    /// Small, unblocked, non-administrative; may be a daily priority.
    PriorityEligible,
    /// Low cognitive load; batched into the admin block.
    Administrative,
    /// More than a day of effort; needs decomposition.
    LongRunning,
    /// Marked blocker; goes through the re-planning flow.
    Blocking,
    /// Waiting on a third party.
    Dependent,
}

/// A typed link between tracker tasks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskLink {
    /// Relationship, e.g. `is blocked by`.
    pub link_type: String,
    pub target_key: String,
    pub target_summary: String,
}

/// Snapshot of one issue-tracker task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackedTask {
    /// Tracker key, e.g. `PROJ-123`.
    pub key: String,
    pub summary: String,
    #[serde(default)]
    pub description: String,
    /// e.g. `Story`, `Bug`, `Administrative Task`.
    pub issue_type: String,
    /// e.g. `High`, `Blocker`.
    pub priority: String,
    /// e.g. `To Do`, `In Progress`.
    pub status: String,
    #[serde(default)]
    pub story_points: Option<u32>,
    /// Time estimate in seconds.
    #[serde(default)]
    pub time_estimate: Option<u64>,
    #[serde(default)]
    pub labels: Vec<String>,
    #[serde(default)]
    pub links: Vec<TaskLink>,
    #[serde(default)]
    pub custom_fields: Map<String, Value>,
}

impl TrackedTask {
    /// Creates a minimal task for tests and fixtures.
    pub fn new(key: impl Into<String>, summary: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            summary: summary.into(),
            description: String::new(),
            issue_type: "Task".to_string(),
            priority: "Medium".to_string(),
            status: "To Do".to_string(),
            story_points: None,
            time_estimate: None,
            labels: Vec::new(),
            links: Vec::new(),
            custom_fields: Map::new(),
        }
    }
}

/// Classification result for one task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifiedTask {
    pub task: TrackedTask,
    pub category: TaskCategory,
    /// Eligible for daily-priority selection.
    pub priority_eligible: bool,
    pub has_dependencies: bool,
    /// Effort estimate in working days.
    pub estimated_days: f64,
    /// Why the task blocks, when it does.
    pub blocking_reason: Option<String>,
}

/// Administrative tasks batched into one time block.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminBlock {
    pub tasks: Vec<ClassifiedTask>,
    /// Allocated minutes, never above the 90-minute cap.
    pub time_allocation_minutes: u32,
    /// Scheduled window, e.g. `14:00-15:30`.
    pub scheduled_time: String,
}

/// A daily execution plan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyPlan {
    pub date: NaiveDate,
    /// At most three priority tasks.
    pub priorities: Vec<ClassifiedTask>,
    pub admin_block: AdminBlock,
    /// Non-priority, non-admin tasks listed for reference.
    pub other_tasks: Vec<ClassifiedTask>,
    pub previous_closure_rate: Option<f64>,
}

impl DailyPlan {
    /// Renders the plan as structured markdown.
    pub fn to_markdown(&self) -> String {
        let mut lines: Vec<String> = Vec::new();

        lines.push(format!("# Daily Plan - {}", self.date.format("%Y-%m-%d")));
        lines.push(String::new());

        if let Some(rate) = self.previous_closure_rate {
            let completed = (rate * 3.0) as u32;
            let percentage = (rate * 100.0) as u32;
            lines.push("## Previous Day".to_string());
            lines.push(format!(
                "- Closure Rate: {completed}/3 tasks completed ({percentage}%)"
            ));
            lines.push(String::new());
        }

        lines.push("## Today's Priorities".to_string());
        lines.push(String::new());

        if self.priorities.is_empty() {
            lines.push("No priority tasks for today.".to_string());
            lines.push(String::new());
        } else {
            for (i, classified) in self.priorities.iter().enumerate() {
                let task = &classified.task;
                let effort_hours = classified.estimated_days * 8.0;
                lines.push(format!("{}. **[{}] {}**", i + 1, task.key, task.summary));
                lines.push(format!("   - Effort: {effort_hours:.1} hours"));
                lines.push(format!("   - Type: {}", task.issue_type));
                if !task.priority.is_empty() {
                    lines.push(format!("   - Priority: {}", task.priority));
                }
                lines.push(String::new());
            }
        }

        if !self.admin_block.tasks.is_empty() {
            lines.push(format!(
                "## Administrative Block ({})",
                self.admin_block.scheduled_time
            ));
            lines.push(String::new());
            for classified in &self.admin_block.tasks {
                let task = &classified.task;
                lines.push(format!("- [ ] [{}] {}", task.key, task.summary));
            }
            lines.push(String::new());
        }

        if !self.other_tasks.is_empty() {
            lines.push("## Other Active Tasks (For Reference)".to_string());
            lines.push(String::new());
            for classified in &self.other_tasks {
                let task = &classified.task;
                let note = if classified.has_dependencies {
                    " (blocked by dependencies)"
                } else if classified.category == TaskCategory::LongRunning {
                    " (decomposition needed)"
                } else {
                    ""
                };
                lines.push(format!("- [{}] {}{}", task.key, task.summary, note));
            }
            lines.push(String::new());
        }

        lines.join("\n")
    }
}

/// Specification for one proposed subtask.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubtaskSpec {
    pub summary: String,
    pub description: String,
    pub estimated_days: f64,
    /// Sequence order, starting at 1.
    pub order: u32,
}

/// Completion record for one plan date.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClosureRecord {
    pub plan_date: NaiveDate,
    pub total_priorities: u32,
    pub completed_priorities: u32,
    /// `completed / total` in `[0.0, 1.0]`.
    pub closure_rate: f64,
    /// Keys of priorities left incomplete.
    pub incomplete_tasks: Vec<String>,
}
