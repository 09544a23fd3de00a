//! `EventBus` — in-process publish/subscribe delivering `ChangeEvent`
//! values to interested sinks (alert writer, enricher, live subscribers).
//!
//! One bounded queue per subscriber, not a single broadcast channel, so a
//! slow subscriber's backpressure never affects another subscriber's
//! delivery. On overflow the oldest undelivered event for that subscriber
//! is dropped and a counter incremented; subscribers detect gaps by
//! `version_number`, per spec.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::{Mutex, Notify};

use sitewatch_core::models::ChangeEvent;

struct Inner {
    queue: Mutex<VecDeque<ChangeEvent>>,
    notify: Notify,
    capacity: usize,
    dropped: AtomicU64,
}

/// Handle held by a subscriber to receive events in order.
#[derive(Clone)]
pub struct EventSubscription {
    inner: Arc<Inner>,
}

impl EventSubscription {
    /// Awaits and removes the next event for this subscriber. Delivery
    /// order matches publish order for any single target.
    pub async fn recv(&self) -> ChangeEvent {
        loop {
            {
                let mut queue = self.inner.queue.lock().await;
                if let Some(event) = queue.pop_front() {
                    return event;
                }
            }
            self.inner.notify.notified().await;
        }
    }

    /// Count of events dropped for this subscriber due to buffer overflow.
    pub fn dropped_count(&self) -> u64 {
        self.inner.dropped.load(Ordering::Relaxed)
    }
}

/// Single-process pub/sub for `ChangeEvent`. Subscribers register once at
/// startup; publishing is asynchronous but ordered per target.
pub struct EventBus {
    subscribers: Mutex<Vec<Arc<Inner>>>,
    capacity: usize,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        Self {
            subscribers: Mutex::new(Vec::new()),
            capacity,
        }
    }

    pub async fn subscribe(&self) -> EventSubscription {
        let inner = Arc::new(Inner {
            queue: Mutex::new(VecDeque::new()),
            notify: Notify::new(),
            capacity: self.capacity,
            dropped: AtomicU64::new(0),
        });
        self.subscribers.lock().await.push(inner.clone());
        EventSubscription { inner }
    }

    /// Delivers `event` to every registered subscriber. At-least-once:
    /// subscribers must be idempotent on `snapshot_id`.
    pub async fn publish(&self, event: ChangeEvent) {
        let subscribers = self.subscribers.lock().await;
        for subscriber in subscribers.iter() {
            let mut queue = subscriber.queue.lock().await;
            if queue.len() >= subscriber.capacity {
                queue.pop_front();
                subscriber.dropped.fetch_add(1, Ordering::Relaxed);
            }
            queue.push_back(event.clone());
            drop(queue);
            subscriber.notify.notify_one();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use sitewatch_core_types::{ChangeType, SectionType, Severity, SnapshotId, TargetId};

    fn event(target_id: &TargetId, version: u64) -> ChangeEvent {
        ChangeEvent {
            target_id: target_id.clone(),
            snapshot_id: SnapshotId::new(),
            version_number: version,
            change_count: 1,
            change_percentage: 5.0,
            severity: Severity::Low,
            change_type: ChangeType::Content,
            sections: vec![],
            timestamp: Utc::now(),
        }
    }

    #[tokio::test]
    async fn subscriber_receives_events_in_publish_order() {
        let bus = EventBus::new(8);
        let subscription = bus.subscribe().await;
        let target_id = TargetId::new();

        bus.publish(event(&target_id, 1)).await;
        bus.publish(event(&target_id, 2)).await;

        assert_eq!(subscription.recv().await.version_number, 1);
        assert_eq!(subscription.recv().await.version_number, 2);
    }

    #[tokio::test]
    async fn overflow_drops_oldest_and_counts_it() {
        let bus = EventBus::new(2);
        let subscription = bus.subscribe().await;
        let target_id = TargetId::new();

        for v in 1..=3 {
            bus.publish(event(&target_id, v)).await;
        }

        assert_eq!(subscription.dropped_count(), 1);
        assert_eq!(subscription.recv().await.version_number, 2);
        assert_eq!(subscription.recv().await.version_number, 3);
    }

    #[tokio::test]
    async fn independent_subscribers_each_get_every_event() {
        let bus = EventBus::new(8);
        let a = bus.subscribe().await;
        let b = bus.subscribe().await;
        bus.publish(event(&TargetId::new(), 1)).await;

        assert_eq!(a.recv().await.version_number, 1);
        assert_eq!(b.recv().await.version_number, 1);
    }

    #[test]
    fn section_type_display_is_stable_for_gap_detection_docs() {
        assert_eq!(SectionType::Hero.to_string(), "hero");
    }
}
