//! In-process event bus: core → plugins.
//!
//! One channel, many subscribers. [`EventBus::publish`] never blocks the
//! publisher: each subscriber owns an unbounded queue drained by its own
//! delivery task, so a slow subscriber delays nobody and events reach each
//! subscriber in publish order. No ordering is guaranteed *across*
//! subscribers, and nothing survives the process.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use courier_core::{Event, EventPublisher};

/// Receives events from the bus, one at a time, in publish order.
#[async_trait]
pub trait EventSubscriber: Send + Sync {
    async fn on_event(&self, event: Event);
}

struct SubscriberHandle {
    name: String,
    tx: mpsc::UnboundedSender<Event>,
}

/// Single-process publish/subscribe channel.
#[derive(Default)]
pub struct EventBus {
    subscribers: RwLock<Vec<SubscriberHandle>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a subscriber and spawns its delivery task.
    ///
    /// Must be called from within a tokio runtime.
    pub fn subscribe(&self, name: impl Into<String>, subscriber: Arc<dyn EventSubscriber>) {
        let name = name.into();
        let (tx, mut rx) = mpsc::unbounded_channel::<Event>();

        let task_name = name.clone();
        tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                subscriber.on_event(event).await;
            }
            debug!(subscriber = %task_name, "Event delivery task finished");
        });

        self.subscribers.write().push(SubscriberHandle { name, tx });
    }

    /// Publishes an event to every subscriber without suspending.
    ///
    /// Delivery happens asynchronously on each subscriber's own task; a
    /// dead subscriber is logged and skipped.
    pub fn publish(&self, event: Event) {
        let subscribers = self.subscribers.read();
        debug!(
            event = %event.event_type,
            subscribers = subscribers.len(),
            "Publishing event"
        );

        for handle in subscribers.iter() {
            if handle.tx.send(event.clone()).is_err() {
                warn!(
                    subscriber = %handle.name,
                    event = %event.event_type,
                    "Subscriber queue closed, dropping event"
                );
            }
        }
    }

    /// Number of registered subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.read().len()
    }
}

impl EventPublisher for EventBus {
    fn publish(&self, event: Event) {
        EventBus::publish(self, event);
    }
}
