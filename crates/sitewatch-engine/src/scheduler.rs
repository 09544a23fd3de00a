//! `Scheduler` — per-target periodic trigger honoring each target's
//! configured interval, submitting capture jobs to a worker pool that
//! guarantees at most one in-flight capture per target.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinSet;

use sitewatch_core::config::Config;
use sitewatch_core_types::{CaptureSource, TargetId};
use sitewatch_logging::{log_op_end, log_op_error, log_op_start};

use sitewatch_store::TargetStore;

use crate::clients::{RenderRequest, RendererClient};
use crate::detector::ChangeDetector;

#[derive(Debug, Clone)]
struct Job {
    target_id: TargetId,
    url: String,
    source: CaptureSource,
    inline_html: Option<String>,
}

/// Owns the job queue and worker pool. `run` spawns the poller and workers
/// and returns once `shutdown` is awaited or the process exits.
pub struct Scheduler {
    detector: ChangeDetector,
    targets: Arc<Mutex<TargetStore>>,
    renderer: Arc<dyn RendererClient>,
    config: Config,
    in_flight: Arc<Mutex<HashSet<TargetId>>>,
    job_tx: mpsc::Sender<Job>,
    job_rx: Mutex<Option<mpsc::Receiver<Job>>>,
}

impl Scheduler {
    pub fn new(
        detector: ChangeDetector,
        targets: Arc<Mutex<TargetStore>>,
        renderer: Arc<dyn RendererClient>,
        config: Config,
    ) -> Self {
        let (job_tx, job_rx) = mpsc::channel(config.worker_count * 4);
        Self {
            detector,
            targets,
            renderer,
            config,
            in_flight: Arc::new(Mutex::new(HashSet::new())),
            job_tx,
            job_rx: Mutex::new(Some(job_rx)),
        }
    }

    /// Submits a manual capture, bypassing the interval check. Still shares
    /// the per-target lock and in-flight bookkeeping with scheduled jobs.
    pub async fn submit_manual(
        &self,
        target_id: TargetId,
        url: String,
        inline_html: Option<String>,
    ) -> bool {
        self.enqueue(Job {
            target_id,
            url,
            source: CaptureSource::Manual,
            inline_html,
        })
        .await
    }

    async fn enqueue(&self, job: Job) -> bool {
        {
            let mut in_flight = self.in_flight.lock().await;
            if in_flight.contains(&job.target_id) {
                return false;
            }
            in_flight.insert(job.target_id.clone());
        }
        if self.job_tx.send(job.clone()).await.is_err() {
            self.in_flight.lock().await.remove(&job.target_id);
            return false;
        }
        true
    }

    /// Runs forever: one task polling for due targets, and a pool of `W`
    /// worker tasks draining the job queue.
    pub async fn run(self: Arc<Self>) {
        let Some(job_rx) = self.job_rx.lock().await.take() else {
            return;
        };

        let mut workers = JoinSet::new();

        let poller = self.clone();
        workers.spawn(async move { poller.poll_due_targets_forever().await });

        let worker_count = self.config.worker_count.max(1);
        let shared_rx = Arc::new(Mutex::new(job_rx));
        for _ in 0..worker_count {
            let scheduler = self.clone();
            let rx = shared_rx.clone();
            workers.spawn(async move {
                loop {
                    let job = {
                        let mut rx = rx.lock().await;
                        rx.recv().await
                    };
                    match job {
                        Some(job) => scheduler.run_job(job).await,
                        None => break,
                    }
                }
            });
        }

        while workers.join_next().await.is_some() {}
    }

    async fn poll_due_targets_forever(self: Arc<Self>) {
        loop {
            self.poll_due_targets_once().await;
            tokio::time::sleep(Duration::from_secs(1)).await;
        }
    }

    async fn poll_due_targets_once(&self) {
        let due = {
            let targets = self.targets.lock().await;
            let Ok(enabled) = targets.list_enabled() else {
                return;
            };
            let now = Utc::now();
            enabled
                .into_iter()
                .filter(|t| {
                    let due_at = t
                        .last_checked_at
                        .map(|last| last + chrono::Duration::seconds(t.check_interval_secs as i64))
                        .unwrap_or(now);
                    due_at <= now
                })
                .collect::<Vec<_>>()
        };

        for target in due {
            self.enqueue(Job {
                target_id: target.id,
                url: target.url,
                source: CaptureSource::Scheduled,
                inline_html: None,
            })
            .await;
        }
    }

    async fn run_job(&self, job: Job) {
        let started = std::time::Instant::now();
        log_op_start!("scheduler.run_job", target_id = job.target_id.as_str());

        let result = self.execute_with_retry(&job).await;

        match &result {
            Ok(_) => log_op_end!(
                "scheduler.run_job",
                duration_ms = started.elapsed().as_millis() as u64
            ),
            Err(err) => log_op_error!(
                "scheduler.run_job",
                err,
                duration_ms = started.elapsed().as_millis() as u64
            ),
        }

        self.in_flight.lock().await.remove(&job.target_id);
    }

    async fn execute_with_retry(&self, job: &Job) -> sitewatch_core::errors::Result<()> {
        let html = match &job.inline_html {
            Some(html) => html.clone(),
            None => self.render_with_retry(job).await?,
        };

        let deadline = Duration::from_secs(self.config.render_timeout);
        let capture = tokio::time::timeout(
            deadline,
            self.detector.capture(&job.target_id, &html, job.source),
        )
        .await;

        match capture {
            Ok(result) => result.map(|_| ()),
            Err(_) => Err(sitewatch_core::errors::WatchError::new(
                sitewatch_core::errors::ErrorKind::StorageFailure,
            )
            .with_op("scheduler.execute_with_retry")
            .with_target_id(job.target_id.as_str())
            .with_message("capture deadline exceeded")),
        }
    }

    async fn render_with_retry(&self, job: &Job) -> sitewatch_core::errors::Result<String> {
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            let request = RenderRequest {
                url: job.url.clone(),
                wait_ms: 0,
                viewport_w: 1280,
                viewport_h: 720,
                remove_scripts: true,
            };
            match self.renderer.render(request).await {
                Ok(response) => return Ok(response.html),
                Err(err) if attempt >= self.config.render_retries => {
                    let targets = self.targets.lock().await;
                    let _ = targets.record_render_failure(&job.target_id, &err.to_string());
                    return Err(err);
                }
                Err(_) => {
                    let backoff = Duration::from_secs(
                        (self.config.render_backoff_base * 2u64.pow(attempt - 1))
                            .min(self.config.render_backoff_max),
                    );
                    tokio::time::sleep(backoff).await;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_caps_at_configured_maximum() {
        let config = Config {
            render_backoff_base: 2,
            render_backoff_max: 10,
            ..Config::default()
        };
        let computed = (config.render_backoff_base * 2u64.pow(5)).min(config.render_backoff_max);
        assert_eq!(computed, 10);
    }
}
