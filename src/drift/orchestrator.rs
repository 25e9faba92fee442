//! Batched fan-out of the drift pipeline across many projects.
//!
//! Projects are launched in fixed-size batches with a pause between batch
//! launches. Every launched worker reports into one channel; the orchestrator
//! drains exactly as many reports as it launched, so a worker that dies
//! without reporting can never hang a scan.

use std::path::PathBuf;
use std::slice::Chunks;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, Semaphore};
use tokio_util::sync::CancellationToken;
use tracing::instrument::WithSubscriber;
use tracing::{error, info, info_span, warn, Instrument};

use super::pipeline::DriftPipeline;
use super::result::{DriftResult, ResultAggregate};
use crate::context::ServiceContext;
use crate::error::ConfigureError;
use crate::logging::LogContext;

/// Projects launched together in one batch.
pub const DEFAULT_BATCH_SIZE: usize = 5;

/// Pause between consecutive batch launches.
pub const DEFAULT_BATCH_DELAY: Duration = Duration::from_secs(5);

/// Reason recorded for a worker that ended without reporting.
const WORKER_ABORTED: &str = "worker aborted";

/// Reason recorded for a project never launched because the scan was cancelled.
const NOT_LAUNCHED: &str = "cancelled";

/// How projects are spread over time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchPolicy {
    /// Projects per batch. Zero is treated as one.
    pub batch_size: usize,
    /// Pause before every batch after the first.
    pub batch_delay: Duration,
    /// Upper bound on pipelines running at once, across batches. Zero is
    /// treated as one.
    pub max_concurrency: Option<usize>,
}

impl Default for BatchPolicy {
    fn default() -> Self {
        Self { batch_size: DEFAULT_BATCH_SIZE, batch_delay: DEFAULT_BATCH_DELAY, max_concurrency: None }
    }
}

/// Splits projects into launch batches, preserving order.
#[must_use]
pub fn batches(projects: &[PathBuf], batch_size: usize) -> Chunks<'_, PathBuf> {
    projects.chunks(batch_size.max(1))
}

struct WorkerReport {
    slot: usize,
    outcome: Result<DriftResult, ConfigureError>,
}

/// Runs the drift pipeline over a set of projects.
pub struct Orchestrator {
    ctx: ServiceContext,
    pipeline: Arc<DriftPipeline>,
    policy: BatchPolicy,
    log: LogContext,
    cancel: CancellationToken,
}

impl Orchestrator {
    /// Creates an orchestrator that owns `pipeline`.
    ///
    /// The pipeline is rewired to this orchestrator's cancellation token so a
    /// fatal error in one worker aborts the tool calls of all others.
    pub fn new(ctx: ServiceContext, pipeline: DriftPipeline, policy: BatchPolicy, log: &LogContext) -> Self {
        let cancel = CancellationToken::new();
        Self {
            ctx,
            pipeline: Arc::new(pipeline.with_cancellation(cancel.clone())),
            policy,
            log: log.clone(),
            cancel,
        }
    }

    /// Token that aborts the scan when cancelled.
    ///
    /// Cancellation is permanent: later scans on this orchestrator fail every
    /// project.
    #[must_use]
    pub fn cancellation(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Scans every project and collects one result per project.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigureError`] raised by any worker. Remaining
    /// workers are cancelled and drained before returning.
    pub async fn scan(&self, projects: Vec<PathBuf>) -> Result<ResultAggregate, ConfigureError> {
        let dispatch = self.log.dispatch().clone();
        self.scan_projects(projects).with_subscriber(dispatch).await
    }

    async fn scan_projects(&self, projects: Vec<PathBuf>) -> Result<ResultAggregate, ConfigureError> {
        let scan_id = self.ctx.id_gen.generate_id();
        let span = info_span!("scan", scan_id = %scan_id, projects = projects.len());
        self.collect(scan_id, &projects).instrument(span).await
    }

    async fn collect(&self, scan_id: String, projects: &[PathBuf]) -> Result<ResultAggregate, ConfigureError> {
        let started_at = self.ctx.clock.now();
        if projects.is_empty() {
            info!("no projects to scan");
            return Ok(ResultAggregate::new(scan_id, started_at, self.ctx.clock.now(), Vec::new()));
        }

        let results = self.fan_out(projects).await?;
        let aggregate = ResultAggregate::new(scan_id, started_at, self.ctx.clock.now(), results);
        info!(
            total = aggregate.len(),
            drifted = aggregate.drifted().count(),
            failed = aggregate.failed().count(),
            "scan complete"
        );
        Ok(aggregate)
    }

    async fn fan_out(&self, projects: &[PathBuf]) -> Result<Vec<DriftResult>, ConfigureError> {
        let (tx, mut rx) = mpsc::channel::<WorkerReport>(projects.len());
        let semaphore = self.policy.max_concurrency.map(|limit| Arc::new(Semaphore::new(limit.max(1))));
        let mut launched = 0usize;

        for (index, batch) in batches(projects, self.policy.batch_size).enumerate() {
            if index > 0 && !self.policy.batch_delay.is_zero() {
                tokio::select! {
                    biased;
                    () = self.cancel.cancelled() => {}
                    () = tokio::time::sleep(self.policy.batch_delay) => {}
                }
            }
            if self.cancel.is_cancelled() {
                warn!(remaining = projects.len() - launched, "scan cancelled, skipping remaining batches");
                break;
            }

            info!(batch = index + 1, size = batch.len(), "launching batch");
            for project in batch {
                self.spawn_worker(launched, project.clone(), tx.clone(), semaphore.clone());
                launched += 1;
            }
        }
        drop(tx);

        let mut reported = vec![false; projects.len()];
        let mut results = Vec::with_capacity(projects.len());
        let mut fatal = None;
        let mut received = 0usize;
        while received < launched {
            let Some(report) = rx.recv().await else {
                break;
            };
            received += 1;
            reported[report.slot] = true;
            match report.outcome {
                Ok(result) => results.push(result),
                Err(err) => {
                    error!(error = %err, "fatal configuration error, cancelling scan");
                    fatal.get_or_insert(err);
                }
            }
        }

        if let Some(err) = fatal {
            return Err(err);
        }

        let version = self.pipeline.tool_version();
        for (slot, project) in projects.iter().enumerate() {
            if reported[slot] {
                continue;
            }
            let reason = if slot < launched { WORKER_ABORTED } else { NOT_LAUNCHED };
            if slot < launched {
                warn!(project = %project.display(), "worker ended without reporting");
            }
            results.push(DriftResult::failed(project, version, reason));
        }
        Ok(results)
    }

    fn spawn_worker(
        &self,
        slot: usize,
        project: PathBuf,
        tx: mpsc::Sender<WorkerReport>,
        semaphore: Option<Arc<Semaphore>>,
    ) {
        let pipeline = Arc::clone(&self.pipeline);
        let cancel = self.cancel.clone();

        let worker = async move {
            let _permit = match semaphore {
                Some(semaphore) => semaphore.acquire_owned().await.ok(),
                None => None,
            };
            let outcome = if cancel.is_cancelled() {
                Ok(DriftResult::failed(&project, pipeline.tool_version(), NOT_LAUNCHED))
            } else {
                pipeline.run(&project).await
            };
            if outcome.is_err() {
                cancel.cancel();
            }
            // The receiver only goes away once the scan has stopped listening.
            let _ = tx.send(WorkerReport { slot, outcome }).await;
        };

        tokio::spawn(worker.in_current_span().with_current_subscriber());
    }
}
