//! One-off manual capture against a target, bypassing the Scheduler.
//! Mirrors `POST /targets/{id}/capture` (spec.md §6): supplying `--html`
//! skips the Renderer entirely, matching the REST handler's contract.

use clap::Args;

use sitewatch_core::models::CaptureOutcome;
use sitewatch_core_types::{CaptureSource, TargetId};
use sitewatch_store::migrations::apply_migrations;
use sitewatch_store::{SnapshotStore, TargetStore};

use super::block_on;

#[derive(Debug, Args)]
pub struct CaptureArgs {
    #[arg(long, default_value = "watch.sqlite3")]
    pub db: String,

    /// Target to capture against.
    pub target_id: String,

    /// Inline HTML to capture instead of calling out to a Renderer.
    #[arg(long)]
    pub html: String,
}

pub fn execute(args: CaptureArgs) -> Result<(), Box<dyn std::error::Error>> {
    block_on(async move {
        // The detector needs independent connections for its target and
        // snapshot stores; open two handles against the same file rather
        // than sharing one `Connection`, exactly as `Core::bootstrap` does
        // for the on-disk case.
        let mut targets_conn = sitewatch_store::db::open(&args.db)?;
        apply_migrations(&mut targets_conn)?;
        let mut snapshots_conn = sitewatch_store::db::open(&args.db)?;
        apply_migrations(&mut snapshots_conn)?;

        let targets = std::sync::Arc::new(tokio::sync::Mutex::new(TargetStore::new(targets_conn)));
        let snapshots = std::sync::Arc::new(tokio::sync::Mutex::new(SnapshotStore::new(snapshots_conn)));

        let target_id = TargetId::from_string(args.target_id);
        targets.lock().await.get(&target_id)?;

        let config = sitewatch_core::config::Config::default();
        let event_bus = std::sync::Arc::new(sitewatch_engine::EventBus::new(config.event_buffer_per_subscriber));
        let detector = sitewatch_engine::ChangeDetector::new(snapshots, targets, event_bus, config);

        let outcome = detector
            .capture(&target_id, &args.html, CaptureSource::Manual)
            .await?;

        match outcome {
            CaptureOutcome::Initial { snapshot, .. } => {
                println!("initial capture stored as version {}", snapshot.version_number);
            }
            CaptureOutcome::Captured { snapshot, diff, .. } => {
                println!(
                    "captured version {} ({} changes, severity {})",
                    snapshot.version_number,
                    diff.records.len(),
                    snapshot.severity
                );
            }
            CaptureOutcome::NoChange => {
                println!("no effective change detected");
            }
        }
        Ok::<(), Box<dyn std::error::Error>>(())
    })
}
