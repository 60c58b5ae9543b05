//! Component L: a bounded in-process broadcast queue.
//!
//! `tokio::sync::broadcast` already has the shape the spec asks for: a fixed
//! capacity ring buffer where publishing past capacity silently drops the
//! oldest unread entry for any subscriber that hasn't caught up yet. A
//! subscriber that falls behind far enough to lose messages is treated as
//! disconnected rather than resynced, since the spec calls for dropping slow
//! subscribers, not replaying gaps to them.

use analysis_core::ActivityEvent;
use tokio::sync::broadcast;

/// Matches the spec's "capacity ~10,000".
pub const CAPACITY: usize = 10_000;

#[derive(Clone)]
pub struct ActivityBus {
    tx: broadcast::Sender<ActivityEvent>,
}

impl ActivityBus {
    pub fn new() -> Self {
        let (tx, _rx) = broadcast::channel(CAPACITY);
        Self { tx }
    }

    /// Never blocks; a publish with zero subscribers is a no-op.
    pub fn publish(&self, event: ActivityEvent) {
        let _ = self.tx.send(event);
    }

    pub fn subscribe(&self) -> ActivitySubscription {
        ActivitySubscription { rx: self.tx.subscribe() }
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for ActivityBus {
    fn default() -> Self {
        Self::new()
    }
}

pub struct ActivitySubscription {
    rx: broadcast::Receiver<ActivityEvent>,
}

impl ActivitySubscription {
    /// `None` once the bus is gone or once this subscriber has lagged past
    /// the buffer and lost events — both are treated as disconnection.
    pub async fn recv(&mut self) -> Option<ActivityEvent> {
        match self.rx.recv().await {
            Ok(event) => Some(event),
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "activity bus subscriber lagged, disconnecting");
                None
            }
            Err(broadcast::error::RecvError::Closed) => None,
        }
    }
}

impl dxy_context::ActivityPublisher for ActivityBus {
    fn publish(&self, event: ActivityEvent) {
        ActivityBus::publish(self, event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn published_events_reach_subscriber_in_order() {
        let bus = ActivityBus::new();
        let mut sub = bus.subscribe();
        bus.publish(ActivityEvent { event_type: "a".into(), payload: serde_json::json!({}), timestamp_ms: 1 });
        bus.publish(ActivityEvent { event_type: "b".into(), payload: serde_json::json!({}), timestamp_ms: 2 });

        assert_eq!(sub.recv().await.unwrap().event_type, "a");
        assert_eq!(sub.recv().await.unwrap().event_type, "b");
    }

    #[tokio::test]
    async fn publish_with_no_subscribers_does_not_panic() {
        let bus = ActivityBus::new();
        bus.publish(ActivityEvent { event_type: "a".into(), payload: serde_json::json!({}), timestamp_ms: 1 });
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn lagging_subscriber_is_disconnected_not_resynced() {
        let bus = ActivityBus::new();
        let mut sub = bus.subscribe();
        for i in 0..(CAPACITY as i64 + 10) {
            bus.publish(ActivityEvent { event_type: "x".into(), payload: serde_json::json!({}), timestamp_ms: i });
        }
        assert!(sub.recv().await.is_none());
    }
}
