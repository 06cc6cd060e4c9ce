//! # Courier Triage
//!
//! The task-triage engine behind the Courier plugin bus, and
//! [`TriageActions`], the concrete [`CoreActions`] façade channel plugins
//! call into.
//!
//! The ranking machinery itself is deliberately plain:
//!
//! - [`TaskClassifier`] buckets tracker tasks into
//!   `{priority_eligible, administrative, long_running, blocking, dependent}`
//! - [`PlanGenerator`] turns classified tasks into a [`DailyPlan`]
//!   (≤ 3 priorities, one admin block capped at 90 minutes, the rest listed
//!   for reference) and proposes decompositions for long-running tasks
//! - [`ClosureLedger`] keeps completion records per plan date
//!
//! The issue-tracker REST client stays outside this crate; it enters
//! through the [`TaskSource`] seam.
//!
//! [`CoreActions`]: courier_core::CoreActions

pub mod actions;
pub mod classifier;
pub mod ledger;
pub mod model;
pub mod planner;
pub mod source;

pub use actions::{TriageActions, TriageActionsBuilder};
pub use classifier::TaskClassifier;
pub use ledger::{ClosureLedger, InMemoryClosureLedger};
pub use model::{
    AdminBlock, ClassifiedTask, ClosureRecord, DailyPlan, SubtaskSpec, TaskCategory, TaskLink,
    TrackedTask,
};
pub use planner::PlanGenerator;
pub use source::{InMemoryTaskSource, TaskSource, TriageError};
