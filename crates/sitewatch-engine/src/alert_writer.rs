//! `AlertWriter` — subscribes to `ChangeEvent` and materializes an alert
//! row whenever `change_count > 0`.

use std::sync::Arc;

use tokio::sync::Mutex;

use sitewatch_core::models::{Alert, ChangeEvent};
use sitewatch_core_types::AlertId;
use sitewatch_logging::log_op_error;
use sitewatch_store::AlertStore;

use crate::event_bus::EventSubscription;

pub struct AlertWriter {
    alerts: Arc<Mutex<AlertStore>>,
    subscription: EventSubscription,
    /// Competitor display name, used in alert titles; looked up per event
    /// via the caller-supplied resolver rather than re-querying the target
    /// store directly, keeping this component decoupled from it.
    target_name: Arc<dyn Fn(&sitewatch_core_types::TargetId) -> String + Send + Sync>,
}

impl AlertWriter {
    pub fn new(
        alerts: Arc<Mutex<AlertStore>>,
        subscription: EventSubscription,
        target_name: Arc<dyn Fn(&sitewatch_core_types::TargetId) -> String + Send + Sync>,
    ) -> Self {
        Self {
            alerts,
            subscription,
            target_name,
        }
    }

    /// Runs forever, consuming events from the subscription.
    pub async fn run(self) {
        loop {
            let event = self.subscription.recv().await;
            if let Err(err) = self.handle(event).await {
                log_op_error!("alert_writer.handle", err, duration_ms = 0u64);
            }
        }
    }

    async fn handle(&self, event: ChangeEvent) -> sitewatch_core::errors::Result<()> {
        if event.change_count == 0 {
            return Ok(());
        }

        let alert = self.build_alert(&event);
        let alerts = self.alerts.lock().await;
        alerts.insert(&alert)?;
        Ok(())
    }

    fn build_alert(&self, event: &ChangeEvent) -> Alert {
        let competitor = (self.target_name)(&event.target_id);
        let dominant_section = event
            .sections
            .iter()
            .max_by(|a, b| a.confidence.partial_cmp(&b.confidence).unwrap_or(std::cmp::Ordering::Equal))
            .map(|s| s.section_type.to_string());

        let title = format!("{} change detected for {competitor}", event.change_type);
        let message = match dominant_section {
            Some(section) => format!(
                "{} change in the {section} section ({} changes, {} severity)",
                event.change_type, event.change_count, event.severity
            ),
            None => format!(
                "{} change detected ({} changes, {} severity)",
                event.change_type, event.change_count, event.severity
            ),
        };

        Alert {
            id: AlertId::new(),
            target_id: event.target_id.clone(),
            snapshot_id: event.snapshot_id.clone(),
            title,
            message,
            change_type: event.change_type,
            severity: event.severity,
            change_count: event.change_count,
            version_number: event.version_number,
            status: sitewatch_core_types::AlertStatus::Unread,
            enrichment: None,
            created_at: event.timestamp,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event_bus::EventBus;
    use chrono::Utc;
    use sitewatch_core_types::{ChangeType, SectionType, Severity, SnapshotId, TargetId};
    use sitewatch_store::{db, migrations::apply_migrations};

    fn sample_event(target_id: TargetId, change_count: u32) -> ChangeEvent {
        ChangeEvent {
            target_id,
            snapshot_id: SnapshotId::new(),
            version_number: 2,
            change_count,
            change_percentage: 12.0,
            severity: Severity::Medium,
            change_type: ChangeType::Pricing,
            sections: vec![sitewatch_core::models::LocatedSection {
                selector: "section#pricing".to_string(),
                section_type: SectionType::Pricing,
                confidence: 0.9,
            }],
            timestamp: Utc::now(),
        }
    }

    #[tokio::test]
    async fn writes_alert_for_nonzero_change_count() {
        let mut conn = db::open_in_memory().unwrap();
        apply_migrations(&mut conn).unwrap();
        let alerts = Arc::new(Mutex::new(AlertStore::new(conn)));

        let bus = EventBus::new(8);
        let subscription = bus.subscribe().await;
        let target_id = TargetId::new();

        let writer = AlertWriter::new(alerts.clone(), subscription, Arc::new(|_: &TargetId| "Acme".to_string()));
        bus.publish(sample_event(target_id.clone(), 3)).await;

        // Drive one iteration of `handle` directly instead of spawning
        // `run`, so the test is deterministic without a timeout race.
        let event = writer.subscription.recv().await;
        writer.handle(event).await.unwrap();

        let stored = alerts.lock().await.list_for_target(&target_id).unwrap();
        assert_eq!(stored.len(), 1);
        assert!(stored[0].title.contains("Acme"));
    }

    #[tokio::test]
    async fn zero_change_count_does_not_write_an_alert() {
        let mut conn = db::open_in_memory().unwrap();
        apply_migrations(&mut conn).unwrap();
        let alerts = Arc::new(Mutex::new(AlertStore::new(conn)));

        let bus = EventBus::new(8);
        let subscription = bus.subscribe().await;
        let target_id = TargetId::new();
        let writer = AlertWriter::new(alerts.clone(), subscription, Arc::new(|_: &TargetId| "Acme".to_string()));

        writer.handle(sample_event(target_id.clone(), 0)).await.unwrap();

        let stored = alerts.lock().await.list_for_target(&target_id).unwrap();
        assert!(stored.is_empty());
    }
}
