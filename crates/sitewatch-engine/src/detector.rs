//! `ChangeDetector` — the orchestrator. For a `(target, new_html)` pair,
//! runs the diff → locate → classify → store pipeline under a per-target
//! exclusive lock and publishes a `ChangeEvent` once the lock is released.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use tokio::sync::Mutex;

use sitewatch_core::config::Config;
use sitewatch_core::errors::{ErrorKind, Result, WatchError};
use sitewatch_core::models::{CaptureOutcome, ChangeEvent};
use sitewatch_core::pipeline::compute_change;
use sitewatch_core_types::{CaptureSource, TargetId};
use sitewatch_logging::{log_op_end, log_op_error, log_op_start};

use sitewatch_store::{SnapshotStore, TargetStore};

use crate::event_bus::EventBus;

/// Owns the snapshot/target stores and the per-target lock map. Cheap to
/// clone (everything inside is already `Arc`-wrapped) so callers can hand a
/// copy to the scheduler's worker tasks.
#[derive(Clone)]
pub struct ChangeDetector {
    snapshots: Arc<Mutex<SnapshotStore>>,
    targets: Arc<Mutex<TargetStore>>,
    event_bus: Arc<EventBus>,
    config: Config,
    locks: Arc<Mutex<HashMap<TargetId, Arc<Mutex<()>>>>>,
}

impl ChangeDetector {
    pub fn new(
        snapshots: Arc<Mutex<SnapshotStore>>,
        targets: Arc<Mutex<TargetStore>>,
        event_bus: Arc<EventBus>,
        config: Config,
    ) -> Self {
        Self {
            snapshots,
            targets,
            event_bus,
            config,
            locks: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    async fn lock_for(&self, target_id: &TargetId) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().await;
        locks
            .entry(target_id.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Runs one capture for `target_id`. `source` distinguishes scheduled,
    /// manual, and initial-onboarding triggers but does not change the
    /// algorithm itself.
    pub async fn capture(
        &self,
        target_id: &TargetId,
        html: &str,
        _source: CaptureSource,
    ) -> Result<CaptureOutcome> {
        let started = Instant::now();
        log_op_start!("change_detector.capture", target_id = target_id.as_str());

        let (html, oversized) = self.truncate_if_oversized(html);

        let target_lock = self.lock_for(target_id).await;
        let _guard = target_lock.lock().await;

        let outcome = self.capture_locked(target_id, &html).await;

        match &outcome {
            Ok(_) => {
                log_op_end!(
                    "change_detector.capture",
                    duration_ms = started.elapsed().as_millis() as u64
                );
            }
            Err(err) => {
                log_op_error!(
                    "change_detector.capture",
                    err,
                    duration_ms = started.elapsed().as_millis() as u64
                );
            }
        }

        if let Ok(outcome) = &outcome {
            if oversized {
                self.flag_oversized(outcome).await;
            }
            self.publish_if_any(outcome).await;
        }

        outcome
    }

    /// Enforces the HTML size cap (§5). Returns the possibly-truncated
    /// HTML and whether truncation happened, so the caller can set the
    /// `OversizedInput` warning flag on the resulting snapshot's metadata
    /// without that bookkeeping changing the capture algorithm itself.
    fn truncate_if_oversized(&self, html: &str) -> (String, bool) {
        if html.len() <= self.config.html_size_cap {
            return (html.to_string(), false);
        }
        (html.chars().take(self.config.html_size_cap).collect(), true)
    }

    async fn flag_oversized(&self, outcome: &CaptureOutcome) {
        let snapshot_id = match outcome {
            CaptureOutcome::Initial { snapshot, .. } | CaptureOutcome::Captured { snapshot, .. } => {
                Some(&snapshot.id)
            }
            CaptureOutcome::NoChange => None,
        };
        if let Some(snapshot_id) = snapshot_id {
            let snapshots = self.snapshots.lock().await;
            let _ = snapshots.merge_metadata(snapshot_id, serde_json::json!({"oversized_input": true}));
        }
    }

    async fn capture_locked(&self, target_id: &TargetId, html: &str) -> Result<CaptureOutcome> {
        let mut snapshots = self.snapshots.lock().await;
        let targets = self.targets.lock().await;

        let current = match snapshots.get_current(target_id) {
            Ok(snapshot) => Some(snapshot),
            Err(err) if err.kind() == ErrorKind::NotFound => None,
            Err(err) => return Err(err),
        };

        let Some(current) = current else {
            let snapshot = snapshots.append_initial(target_id, html)?;
            targets.record_capture_success(target_id, true)?;
            let event = ChangeEvent {
                target_id: target_id.clone(),
                snapshot_id: snapshot.id.clone(),
                version_number: snapshot.version_number,
                change_count: 0,
                change_percentage: 0.0,
                severity: snapshot.severity,
                change_type: snapshot.change_type,
                sections: vec![],
                timestamp: Utc::now(),
            };
            return Ok(CaptureOutcome::Initial { snapshot, event });
        };

        let prior_html = snapshots.reconstruct(&current.id)?;
        let computed = compute_change(&prior_html, html)?;

        if computed.stats.is_no_change(self.config.no_change_epsilon) {
            targets.record_capture_success(target_id, false)?;
            return Ok(CaptureOutcome::NoChange);
        }

        let (snapshot, diff) = snapshots.append_change(target_id, html, &computed, &self.config)?;
        targets.record_capture_success(target_id, true)?;

        let event = ChangeEvent {
            target_id: target_id.clone(),
            snapshot_id: snapshot.id.clone(),
            version_number: snapshot.version_number,
            change_count: snapshot.change_count,
            change_percentage: snapshot.change_percentage,
            severity: snapshot.severity,
            change_type: snapshot.change_type,
            sections: computed.sections.clone(),
            timestamp: Utc::now(),
        };

        Ok(CaptureOutcome::Captured {
            snapshot,
            diff,
            event,
        })
    }

    async fn publish_if_any(&self, outcome: &CaptureOutcome) {
        match outcome {
            CaptureOutcome::Initial { event, .. } | CaptureOutcome::Captured { event, .. } => {
                self.event_bus.publish(event.clone()).await;
            }
            CaptureOutcome::NoChange => {}
        }
    }

    /// Records a render failure against the target without touching the
    /// snapshot chain, per the scheduler's retry-exhaustion contract.
    pub async fn record_render_failure(&self, target_id: &TargetId, message: &str) -> Result<()> {
        let targets = self.targets.lock().await;
        targets.record_render_failure(target_id, message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sitewatch_store::{db, migrations::apply_migrations};

    async fn detector() -> (ChangeDetector, TargetId) {
        // Each in-memory SQLite connection is its own private database, so
        // the target store and snapshot store get separate connections
        // here; in production both point at the same on-disk file.
        let mut conn = db::open_in_memory().unwrap();
        apply_migrations(&mut conn).unwrap();
        let target_store = sitewatch_store::TargetStore::new(conn);

        let mut snap_conn = db::open_in_memory().unwrap();
        apply_migrations(&mut snap_conn).unwrap();
        let snapshot_store = SnapshotStore::new(snap_conn);

        let target_id = TargetId::new();
        let target = sitewatch_core::models::Target::new("user-1", "https://ex.test", "Example");
        target_store.create(&sitewatch_core::models::Target {
            id: target_id.clone(),
            ..target
        }).unwrap();

        let detector = ChangeDetector::new(
            Arc::new(Mutex::new(snapshot_store)),
            Arc::new(Mutex::new(target_store)),
            Arc::new(EventBus::new(16)),
            Config::default(),
        );
        (detector, target_id)
    }

    #[tokio::test]
    async fn initial_capture_creates_version_one_and_publishes_once() {
        let (detector, target_id) = detector().await;
        let subscription = detector.event_bus.subscribe().await;

        let outcome = detector
            .capture(&target_id, "<html><body><h1>Hi</h1></body></html>", CaptureSource::Initial)
            .await
            .unwrap();

        assert!(matches!(outcome, CaptureOutcome::Initial { .. }));
        let event = subscription.recv().await;
        assert_eq!(event.version_number, 1);
    }

    #[tokio::test]
    async fn oversized_input_is_truncated_and_flagged() {
        let (mut detector, target_id) = detector().await;
        detector.config.html_size_cap = 16;

        let huge_html = "<html>".to_string() + &"x".repeat(100);
        let outcome = detector
            .capture(&target_id, &huge_html, CaptureSource::Initial)
            .await
            .unwrap();

        let CaptureOutcome::Initial { snapshot, .. } = outcome else {
            panic!("expected an initial capture");
        };
        assert!(snapshot.html_byte_len <= 16);

        let snapshots = detector.snapshots.lock().await;
        let stored = snapshots.reconstruct(&snapshot.id).unwrap();
        assert!(stored.len() <= 16);
    }

    #[tokio::test]
    async fn identical_second_capture_is_no_change() {
        let (detector, target_id) = detector().await;
        let html = "<html><body><h1>Hi</h1></body></html>";
        detector.capture(&target_id, html, CaptureSource::Initial).await.unwrap();
        let second = detector.capture(&target_id, html, CaptureSource::Scheduled).await.unwrap();
        assert!(matches!(second, CaptureOutcome::NoChange));
    }
}
