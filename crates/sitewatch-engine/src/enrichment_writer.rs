//! `EnrichmentWriter` — subscribes to `ChangeEvent` and requests a
//! narrative/severity reassessment from the external `Enricher` (§4.9).
//!
//! Never allowed to affect the core pipeline: a failed or unreachable
//! enricher is logged and dropped, not retried inline and not propagated
//! as a capture error. Out-of-band retry is left to the deployment's own
//! job supervision, not modeled here.

use std::sync::Arc;

use tokio::sync::Mutex;

use sitewatch_core::models::ChangeEvent;
use sitewatch_core_types::TargetId;
use sitewatch_logging::log_op_error;
use sitewatch_store::SnapshotStore;

use crate::clients::{EnricherClient, EnrichmentRequest, SectionExcerpt};
use crate::event_bus::EventSubscription;

pub struct EnrichmentWriter {
    snapshots: Arc<Mutex<SnapshotStore>>,
    subscription: EventSubscription,
    enricher: Arc<dyn EnricherClient>,
    /// Resolves a target's display name and URL for the enrichment packet,
    /// kept as a callback so this component never needs a `TargetStore`
    /// handle of its own.
    target_info: Arc<dyn Fn(&TargetId) -> (String, String) + Send + Sync>,
}

impl EnrichmentWriter {
    pub fn new(
        snapshots: Arc<Mutex<SnapshotStore>>,
        subscription: EventSubscription,
        enricher: Arc<dyn EnricherClient>,
        target_info: Arc<dyn Fn(&TargetId) -> (String, String) + Send + Sync>,
    ) -> Self {
        Self {
            snapshots,
            subscription,
            enricher,
            target_info,
        }
    }

    /// Runs forever, consuming events from the subscription.
    pub async fn run(self) {
        loop {
            let event = self.subscription.recv().await;
            self.handle(event).await;
        }
    }

    async fn handle(&self, event: ChangeEvent) {
        if event.change_count == 0 {
            return;
        }

        let (name, url) = (self.target_info)(&event.target_id);
        let sections = event
            .sections
            .iter()
            .map(|s| SectionExcerpt {
                section_type: s.section_type.to_string(),
                before: String::new(),
                after: String::new(),
            })
            .collect();

        let request = EnrichmentRequest {
            target_name: name,
            url,
            change_type: event.change_type,
            severity: event.severity,
            sections,
        };

        match self.enricher.enrich(request).await {
            Ok(response) => {
                let patch = serde_json::json!({
                    "enrichment": {
                        "summary": response.summary,
                        "impact": response.impact,
                        "recommendations": response.recommendations,
                        "urgency": response.urgency,
                        "insights": response.insights,
                    }
                });
                let snapshots = self.snapshots.lock().await;
                if let Err(err) = snapshots.merge_metadata(&event.snapshot_id, patch) {
                    log_op_error!("enrichment_writer.persist", err, duration_ms = 0u64);
                }
            }
            Err(err) => {
                log_op_error!("enrichment_writer.enrich", err, duration_ms = 0u64);
            }
        }
    }
}
