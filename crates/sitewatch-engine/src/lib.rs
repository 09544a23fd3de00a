//! Runtime wiring for the change-detection engine: stores, event bus,
//! detector, scheduler, alert writer, and the external service clients,
//! assembled behind a single [`Core`] handle.

pub mod alert_writer;
pub mod clients;
pub mod detector;
pub mod enrichment_writer;
pub mod event_bus;
pub mod scheduler;

use std::path::Path;
use std::sync::Arc;

use tokio::sync::Mutex;

use sitewatch_core::config::Config;
use sitewatch_core::errors::Result;
use sitewatch_core_types::TargetId;
use sitewatch_store::{db, migrations::apply_migrations, AlertStore, SnapshotStore, TargetStore};

pub use alert_writer::AlertWriter;
pub use clients::{
    EnricherClient, EnrichmentRequest, EnrichmentResponse, HttpEnricherClient, HttpRendererClient,
    NoopEnricherClient, RenderRequest, RenderResponse, RendererClient, SectionExcerpt,
    StaticRendererClient, UnconfiguredRendererClient, Urgency,
};
pub use detector::ChangeDetector;
pub use enrichment_writer::EnrichmentWriter;
pub use event_bus::{EventBus, EventSubscription};
pub use scheduler::Scheduler;

/// Every long-lived handle the REST and CLI front ends need, assembled once
/// at process start so neither front end reaches for ambient globals.
#[derive(Clone)]
pub struct Core {
    pub config: Config,
    pub targets: Arc<Mutex<TargetStore>>,
    pub alerts: Arc<Mutex<AlertStore>>,
    pub snapshots: Arc<Mutex<SnapshotStore>>,
    pub event_bus: Arc<EventBus>,
    pub detector: ChangeDetector,
    pub scheduler: Arc<Scheduler>,
}

impl Core {
    /// Opens (and migrates) the on-disk database at `config.database_path`,
    /// then wires the detector, event bus, scheduler, and alert writer
    /// together. Spawns the scheduler's poll/worker loop and the alert
    /// writer's consume loop as background tasks.
    pub fn bootstrap(config: Config, renderer: Arc<dyn RendererClient>) -> Result<Self> {
        // A single logical `:memory:` database must still hand out three
        // independent `Connection`s (one per store); `cache=shared` is what
        // lets them see each other's writes the way three connections to an
        // on-disk file already do. Each bootstrap call gets its own name so
        // concurrent `Core`s in the same process (e.g. tests) don't collide.
        let shared_memory_name = (config.database_path == ":memory:")
            .then(|| format!("sitewatch_{}", sitewatch_core_types::TargetId::new()));

        let targets_conn = open_and_migrate(&config.database_path, shared_memory_name.as_deref())?;
        let snapshots_conn = open_and_migrate(&config.database_path, shared_memory_name.as_deref())?;
        let alerts_conn = open_and_migrate(&config.database_path, shared_memory_name.as_deref())?;

        let targets = Arc::new(Mutex::new(TargetStore::new(targets_conn)));
        let snapshots = Arc::new(Mutex::new(SnapshotStore::new(snapshots_conn)));
        let alerts = Arc::new(Mutex::new(AlertStore::new(alerts_conn)));

        let event_bus = Arc::new(EventBus::new(config.event_buffer_per_subscriber));

        let detector = ChangeDetector::new(
            snapshots.clone(),
            targets.clone(),
            event_bus.clone(),
            config.clone(),
        );

        let scheduler = Arc::new(Scheduler::new(
            detector.clone(),
            targets.clone(),
            renderer,
            config.clone(),
        ));

        let core = Self {
            config,
            targets,
            alerts,
            snapshots,
            event_bus,
            detector,
            scheduler,
        };

        core.spawn_background_tasks();
        Ok(core)
    }

    fn spawn_background_tasks(&self) {
        let scheduler = self.scheduler.clone();
        tokio::spawn(async move { scheduler.run().await });

        // Resolving the exact competitor name synchronously would require
        // blocking on the (async) target store lock from a sync closure;
        // the alert title and enrichment packet fall back to generic labels
        // instead.
        let target_name: Arc<dyn Fn(&TargetId) -> String + Send + Sync> =
            Arc::new(|_target_id: &TargetId| "monitored site".to_string());
        let target_info: Arc<dyn Fn(&TargetId) -> (String, String) + Send + Sync> =
            Arc::new(|_target_id: &TargetId| ("monitored site".to_string(), String::new()));

        let bus = self.event_bus.clone();
        let alerts = self.alerts.clone();
        tokio::spawn(async move {
            let subscription = bus.subscribe().await;
            let writer = AlertWriter::new(alerts, subscription, target_name);
            writer.run().await;
        });

        let enricher: Arc<dyn EnricherClient> = match &self.config.enricher_url {
            Some(url) => Arc::new(HttpEnricherClient::new(
                url.clone(),
                std::time::Duration::from_secs(self.config.render_timeout),
            )),
            None => Arc::new(NoopEnricherClient),
        };

        let bus = self.event_bus.clone();
        let snapshots = self.snapshots.clone();
        tokio::spawn(async move {
            let subscription = bus.subscribe().await;
            let writer = EnrichmentWriter::new(snapshots, subscription, enricher, target_info);
            writer.run().await;
        });
    }

    pub async fn start_monitoring(&self, target_id: &TargetId) -> Result<()> {
        let targets = self.targets.lock().await;
        targets.get(target_id)?;
        targets.set_monitoring(target_id, true, None)
    }

    pub async fn disable_monitoring(&self, target_id: &TargetId) -> Result<()> {
        let targets = self.targets.lock().await;
        targets.get(target_id)?;
        targets.set_monitoring(target_id, false, None)
    }

    /// Soft-deletes a target and cascades the deletion to its snapshots and
    /// alerts, per the target lifecycle: a deleted target leaves nothing
    /// behind for another target to collide with on reuse of its URL.
    pub async fn delete_target(&self, target_id: &TargetId) -> Result<()> {
        self.targets.lock().await.soft_delete(target_id)?;
        self.snapshots.lock().await.delete_by_target(target_id)?;
        self.alerts.lock().await.delete_by_target(target_id)?;
        Ok(())
    }
}

fn open_and_migrate(database_path: &str, shared_memory_name: Option<&str>) -> Result<rusqlite::Connection> {
    let mut conn = match shared_memory_name {
        Some(name) => db::open_shared_memory(name)?,
        None => db::open(Path::new(database_path))?,
    };
    apply_migrations(&mut conn)?;
    Ok(conn)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::StaticRendererClient;

    #[tokio::test]
    async fn bootstrap_with_in_memory_database_shares_one_logical_db_across_stores() {
        let config = Config {
            database_path: ":memory:".to_string(),
            ..Config::default()
        };
        let renderer = Arc::new(StaticRendererClient::new("<html></html>"));
        let core = Core::bootstrap(config, renderer).unwrap();

        let target = sitewatch_core::models::Target::new("user-1", "https://acme.test", "Acme");
        let target_id = target.id.clone();
        core.targets.lock().await.create(&target).unwrap();

        // The target created through `core.targets` must be visible to a
        // snapshot written through the independently-opened `core.snapshots`
        // connection; before the shared-memory fix these were two disjoint
        // `:memory:` databases and this would fail with a foreign key error.
        let snapshots = core.snapshots.lock().await;
        let snapshot = snapshots.append_initial(&target_id, "<html></html>");
        assert!(snapshot.is_ok());
    }
}
