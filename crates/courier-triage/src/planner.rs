//! Daily plan generation.

use chrono::NaiveDate;

use crate::model::{AdminBlock, ClassifiedTask, DailyPlan, SubtaskSpec, TaskCategory, TrackedTask};

/// Maximum number of daily priorities.
const MAX_PRIORITIES: usize = 3;

/// Admin block cap, in minutes.
const MAX_ADMIN_MINUTES: f64 = 90.0;

/// Default admin block window (post-lunch).
const DEFAULT_ADMIN_TIME: &str = "14:00-15:30";

/// Generates daily plans and decomposition proposals from classified tasks.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlanGenerator;

impl PlanGenerator {
    pub fn new() -> Self {
        Self
    }

    /// Builds the plan for `date` from the classified task set.
    ///
    /// Eligible tasks are ranked, the top three become priorities,
    /// administrative tasks are batched into one capped block, and
    /// everything else is listed for reference.
    pub fn generate_daily_plan(
        &self,
        classified: Vec<ClassifiedTask>,
        date: NaiveDate,
        previous_closure_rate: Option<f64>,
    ) -> DailyPlan {
        let mut eligible: Vec<ClassifiedTask> = classified
            .iter()
            .filter(|c| c.priority_eligible)
            .cloned()
            .collect();
        rank_tasks(&mut eligible);

        let priorities: Vec<ClassifiedTask> =
            eligible.into_iter().take(MAX_PRIORITIES).collect();

        let admin_block = group_admin_tasks(&classified);

        let taken: Vec<&str> = priorities
            .iter()
            .chain(admin_block.tasks.iter())
            .map(|c| c.task.key.as_str())
            .collect();

        let other_tasks = classified
            .into_iter()
            .filter(|c| !taken.contains(&c.task.key.as_str()))
            .collect();

        DailyPlan {
            date,
            priorities,
            admin_block,
            other_tasks,
            previous_closure_rate,
        }
    }

    /// Proposes an ordered decomposition of `task` into subtasks of at most
    /// `target_days` effort each.
    pub fn propose_decomposition(
        &self,
        task: &TrackedTask,
        estimated_days: f64,
        target_days: f64,
    ) -> Vec<SubtaskSpec> {
        let count = (estimated_days / target_days).ceil().max(1.0) as u32;
        let per_subtask = estimated_days / f64::from(count);

        (1..=count)
            .map(|order| SubtaskSpec {
                summary: format!("{} (part {order}/{count})", task.summary),
                description: format!(
                    "Slice {order} of {count} of [{}]: {}",
                    task.key, task.summary
                ),
                estimated_days: per_subtask.min(target_days),
                order,
            })
            .collect()
    }
}

/// Ranks in place by priority, then effort, then age proxy (numeric key
/// suffix; older keys have lower numbers).
fn rank_tasks(tasks: &mut [ClassifiedTask]) {
    fn priority_rank(priority: &str) -> u8 {
        match priority.to_lowercase().as_str() {
            "blocker" => 0,
            "highest" => 1,
            "high" => 2,
            "medium" => 3,
            "low" => 4,
            "lowest" => 5,
            _ => 3,
        }
    }

    fn age_proxy(key: &str) -> u64 {
        key.rsplit('-').next().and_then(|n| n.parse().ok()).unwrap_or(0)
    }

    tasks.sort_by(|a, b| {
        priority_rank(&a.task.priority)
            .cmp(&priority_rank(&b.task.priority))
            .then(
                a.estimated_days
                    .partial_cmp(&b.estimated_days)
                    .unwrap_or(std::cmp::Ordering::Equal),
            )
            .then(age_proxy(&a.task.key).cmp(&age_proxy(&b.task.key)))
    });
}

/// Batches administrative tasks into one block, stopping at the 90-minute
/// cap.
fn group_admin_tasks(classified: &[ClassifiedTask]) -> AdminBlock {
    let mut selected = Vec::new();
    let mut total_minutes = 0.0;

    for candidate in classified
        .iter()
        .filter(|c| c.category == TaskCategory::Administrative)
    {
        let task_minutes = candidate.estimated_days * 8.0 * 60.0;
        if total_minutes + task_minutes > MAX_ADMIN_MINUTES {
            break;
        }
        selected.push(candidate.clone());
        total_minutes += task_minutes;
    }

    AdminBlock {
        tasks: selected,
        time_allocation_minutes: total_minutes as u32,
        scheduled_time: DEFAULT_ADMIN_TIME.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::TaskClassifier;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 2).unwrap()
    }

    fn eligible(key: &str, priority: &str, days: f64) -> ClassifiedTask {
        let mut task = TrackedTask::new(key, format!("Work on {key}"));
        task.priority = priority.to_string();
        ClassifiedTask {
            task,
            category: TaskCategory::PriorityEligible,
            priority_eligible: true,
            has_dependencies: false,
            estimated_days: days,
            blocking_reason: None,
        }
    }

    fn admin(key: &str, days: f64) -> ClassifiedTask {
        let mut task = TrackedTask::new(key, format!("Admin {key}"));
        task.labels.push("admin".to_string());
        ClassifiedTask {
            task,
            category: TaskCategory::Administrative,
            priority_eligible: false,
            has_dependencies: false,
            estimated_days: days,
            blocking_reason: None,
        }
    }

    #[test]
    fn plan_caps_priorities_at_three() {
        let classified = vec![
            eligible("PROJ-1", "High", 0.5),
            eligible("PROJ-2", "High", 0.5),
            eligible("PROJ-3", "High", 0.5),
            eligible("PROJ-4", "High", 0.5),
        ];

        let plan = PlanGenerator::new().generate_daily_plan(classified, date(), None);
        assert_eq!(plan.priorities.len(), 3);
        assert_eq!(plan.other_tasks.len(), 1);
    }

    #[test]
    fn ranking_prefers_priority_then_effort_then_age() {
        let classified = vec![
            eligible("PROJ-30", "Low", 0.5),
            eligible("PROJ-20", "High", 1.0),
            eligible("PROJ-10", "High", 0.5),
            eligible("PROJ-5", "High", 0.5),
        ];

        let plan = PlanGenerator::new().generate_daily_plan(classified, date(), None);
        let order: Vec<&str> = plan.priorities.iter().map(|c| c.task.key.as_str()).collect();
        assert_eq!(order, vec!["PROJ-5", "PROJ-10", "PROJ-20"]);
    }

    #[test]
    fn admin_block_respects_ninety_minute_cap() {
        // 0.125 days = 60 minutes each; only one fits under 90.
        let classified = vec![admin("ADM-1", 0.125), admin("ADM-2", 0.125)];

        let plan = PlanGenerator::new().generate_daily_plan(classified, date(), None);
        assert_eq!(plan.admin_block.tasks.len(), 1);
        assert_eq!(plan.admin_block.time_allocation_minutes, 60);
        assert_eq!(plan.admin_block.scheduled_time, "14:00-15:30");
        // The overflow admin task is still listed for reference.
        assert_eq!(plan.other_tasks.len(), 1);
    }

    #[test]
    fn ineligible_tasks_never_become_priorities() {
        let classifier = TaskClassifier::new();
        let mut blocked = TrackedTask::new("PROJ-1", "Blocked work");
        blocked.priority = "Blocker".to_string();

        let classified = vec![classifier.classify(&blocked), eligible("PROJ-2", "Low", 1.0)];
        let plan = PlanGenerator::new().generate_daily_plan(classified, date(), None);

        assert_eq!(plan.priorities.len(), 1);
        assert_eq!(plan.priorities[0].task.key, "PROJ-2");
    }

    #[test]
    fn decomposition_covers_effort_within_target() {
        let task = TrackedTask::new("PROJ-9", "Build importer");
        let subtasks = PlanGenerator::new().propose_decomposition(&task, 2.5, 1.0);

        assert_eq!(subtasks.len(), 3);
        assert!(subtasks.iter().all(|s| s.estimated_days <= 1.0));
        let orders: Vec<u32> = subtasks.iter().map(|s| s.order).collect();
        assert_eq!(orders, vec![1, 2, 3]);
        let total: f64 = subtasks.iter().map(|s| s.estimated_days).sum();
        assert!((total - 2.5).abs() < 1e-9);
    }

    #[test]
    fn decomposition_of_small_task_is_single_subtask() {
        let task = TrackedTask::new("PROJ-9", "Tiny job");
        let subtasks = PlanGenerator::new().propose_decomposition(&task, 0.5, 1.0);
        assert_eq!(subtasks.len(), 1);
        assert_eq!(subtasks[0].order, 1);
    }
}
