//! Core → plugin event model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// The closed set of notifications the triage engine publishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    PlanGenerated,
    TaskBlocked,
    ApprovalTimeout,
    PlanApproved,
    PlanRejected,
    TaskCompleted,
}

impl EventType {
    /// Wire name of the event type.
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::PlanGenerated => "plan_generated",
            EventType::TaskBlocked => "task_blocked",
            EventType::ApprovalTimeout => "approval_timeout",
            EventType::PlanApproved => "plan_approved",
            EventType::PlanRejected => "plan_rejected",
            EventType::TaskCompleted => "task_completed",
        }
    }
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A data-carrying notification published on the event bus.
///
/// Delivery is asynchronous and best-effort: every loaded adapter receives
/// every event, regardless of its health, and decides for itself whether to
/// act on it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub event_type: EventType,
    /// Event payload; field names are part of the per-event contract.
    pub data: Map<String, Value>,
    pub timestamp: DateTime<Utc>,
    /// Logical publisher, e.g. `triage-engine`.
    pub source: String,
}

impl Event {
    /// Creates an event stamped with the current time.
    pub fn new(event_type: EventType, data: Map<String, Value>, source: impl Into<String>) -> Self {
        Self {
            event_type,
            data,
            timestamp: Utc::now(),
            source: source.into(),
        }
    }

    /// Returns a payload field as a string slice.
    pub fn data_str(&self, key: &str) -> Option<&str> {
        self.data.get(key).and_then(Value::as_str)
    }
}

/// Accepts events for asynchronous fan-out.
///
/// The triage engine holds this seam; the event bus implements it.
/// `publish` must not block the caller.
pub trait EventPublisher: Send + Sync {
    fn publish(&self, event: Event);
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn event_type_round_trips_through_serde() {
        let serialized = serde_json::to_string(&EventType::PlanGenerated).unwrap();
        assert_eq!(serialized, "\"plan_generated\"");
        let parsed: EventType = serde_json::from_str("\"approval_timeout\"").unwrap();
        assert_eq!(parsed, EventType::ApprovalTimeout);
    }

    #[test]
    fn data_accessor() {
        let mut data = Map::new();
        data.insert("user_id".into(), json!("U1"));
        let event = Event::new(EventType::PlanGenerated, data, "triage-engine");
        assert_eq!(event.data_str("user_id"), Some("U1"));
        assert_eq!(event.data_str("channel_id"), None);
    }
}
