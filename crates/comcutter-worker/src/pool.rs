//! Fixed-size pool of workers draining the job queue.

use std::panic::AssertUnwindSafe;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use futures::FutureExt;
use metrics::counter;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, info_span, Instrument};

use comcutter_queue::{InFlightSet, JobReceiver};

use crate::error::JobResult;
use crate::executor::{Committed, JobExecutor};

/// Counter of finished jobs, labelled by outcome.
pub const JOBS_FINISHED_TOTAL: &str = "comcutter_jobs_finished_total";

/// Something that can process one dequeued path.
#[async_trait]
pub trait JobHandler: Send + Sync + 'static {
    async fn handle(&self, path: &Path) -> JobResult<Committed>;
}

#[async_trait]
impl JobHandler for JobExecutor {
    async fn handle(&self, path: &Path) -> JobResult<Committed> {
        self.execute(path).await
    }
}

/// Long-lived workers sharing one queue and one in-flight set.
pub struct WorkerPool {
    handles: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// Launch `size` workers (at least one).
    pub fn spawn<H: JobHandler>(
        size: usize,
        jobs: JobReceiver,
        in_flight: InFlightSet,
        handler: Arc<H>,
    ) -> Self {
        let size = size.max(1);
        info!("Starting worker pool with {} workers", size);

        let handles = (0..size)
            .map(|id| {
                tokio::spawn(run_worker(
                    id,
                    jobs.clone(),
                    in_flight.clone(),
                    Arc::clone(&handler),
                ))
            })
            .collect();

        Self { handles }
    }

    pub fn size(&self) -> usize {
        self.handles.len()
    }

    /// Wait for every worker to exit. Workers only exit once the queue is
    /// closed.
    pub async fn join(self) {
        for handle in self.handles {
            if let Err(e) = handle.await {
                error!("Worker task ended abnormally: {}", e);
            }
        }
    }

    /// Stop all workers. A job interrupted here is dropped before its path
    /// is released, and keeps its `.bak` file.
    pub fn abort(&self) {
        for handle in &self.handles {
            handle.abort();
        }
    }
}

/// Worker loop: pop, run, release.
///
/// The release guard is armed right after the pop, so the path leaves the
/// in-flight set whether the job commits, fails or panics. When the worker
/// is aborted mid-job, the job future is dropped first and the path is
/// released after it.
pub async fn run_worker<H: JobHandler>(
    id: usize,
    jobs: JobReceiver,
    in_flight: InFlightSet,
    handler: Arc<H>,
) {
    debug!(worker = id, "Worker started");

    while let Some(path) = jobs.pop().await {
        let _release = scopeguard::guard((in_flight.clone(), path.clone()), |(set, path)| {
            set.remove(&path);
        });

        // Run inline so cancelling the worker drops the job before the
        // release guard fires.
        let job = handler
            .handle(&path)
            .instrument(info_span!("worker", id));

        match AssertUnwindSafe(job).catch_unwind().await {
            Ok(Ok(_)) => record_finished("committed"),
            Ok(Err(e)) => record_finished(e.kind()),
            Err(_) => {
                error!(worker = id, path = %path.display(), "Job panicked");
                record_finished("panicked");
            }
        }
    }

    info!(worker = id, "Job queue closed, worker exiting");
}

fn record_finished(outcome: &'static str) {
    counter!(JOBS_FINISHED_TOTAL, "outcome" => outcome).increment(1);
}
