//! Submission entry point shared by the HTTP layer.

use std::path::PathBuf;

use metrics::counter;
use tracing::{debug, info, warn};

use crate::error::SubmitError;
use crate::inflight::InFlightSet;
use crate::path::resolve_media_path;
use crate::queue::JobSender;

/// Counter of submissions, labelled by result.
pub const JOBS_SUBMITTED_TOTAL: &str = "comcutter_jobs_submitted_total";

/// Accepts submissions and hands them to the worker pool.
///
/// Owns the producer half of the queue and a handle on the in-flight set
/// the workers release into.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    library_dir: PathBuf,
    in_flight: InFlightSet,
    sender: JobSender,
}

impl Dispatcher {
    pub fn new(library_dir: impl Into<PathBuf>, in_flight: InFlightSet, sender: JobSender) -> Self {
        Self {
            library_dir: library_dir.into(),
            in_flight,
            sender,
        }
    }

    /// Resolve `media_filepath` and enqueue it unless it is missing or
    /// already in flight. Returns the resolved path on success.
    ///
    /// Never waits for the job itself.
    pub async fn submit(&self, ip: &str, media_filepath: &str) -> Result<PathBuf, SubmitError> {
        let path = resolve_media_path(&self.library_dir, media_filepath);

        if !tokio::fs::try_exists(&path).await.unwrap_or(false) {
            let err = SubmitError::FileNotFound(path);
            warn!("[{}] {}", ip, err);
            record_submission("not_found");
            return Err(err);
        }

        if !self.in_flight.try_add(&path) {
            debug!(ip, path = %path.display(), "Rejected duplicate submission");
            record_submission("duplicate");
            return Err(SubmitError::AlreadyProcessing);
        }

        if let Err(e) = self.sender.push(path.clone()) {
            self.in_flight.remove(&path);
            record_submission("error");
            return Err(e.into());
        }

        info!(ip, path = %path.display(), "Queued file for processing");
        record_submission("accepted");
        Ok(path)
    }

    pub fn in_flight(&self) -> &InFlightSet {
        &self.in_flight
    }

    /// Number of accepted paths not yet picked up by a worker.
    pub fn queued(&self) -> usize {
        self.sender.len()
    }
}

fn record_submission(result: &'static str) {
    counter!(JOBS_SUBMITTED_TOTAL, "result" => result).increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::QueueError;
    use crate::queue::job_queue;
    use tempfile::TempDir;

    fn library_with(file: &str) -> TempDir {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(file);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, b"recording").unwrap();
        dir
    }

    #[tokio::test]
    async fn test_submit_twice_is_rejected() {
        let library = library_with("shows/ep1.mkv");
        let (tx, rx) = job_queue();
        let dispatcher = Dispatcher::new(library.path(), InFlightSet::new(), tx);

        let first = dispatcher.submit("127.0.0.1", "/shows/ep1.mkv").await.unwrap();
        assert_eq!(first, library.path().join("shows/ep1.mkv"));

        let second = dispatcher.submit("127.0.0.1", "/shows/ep1.mkv").await;
        assert!(matches!(second, Err(SubmitError::AlreadyProcessing)));

        assert_eq!(dispatcher.queued(), 1);
        assert_eq!(rx.pop().await, Some(first));
    }

    #[tokio::test]
    async fn test_resubmit_after_release() {
        let library = library_with("ep1.ts");
        let (tx, _rx) = job_queue();
        let in_flight = InFlightSet::new();
        let dispatcher = Dispatcher::new(library.path(), in_flight.clone(), tx);

        let path = dispatcher.submit("127.0.0.1", "ep1.ts").await.unwrap();
        in_flight.remove(&path);

        assert!(dispatcher.submit("127.0.0.1", "ep1.ts").await.is_ok());
    }

    #[tokio::test]
    async fn test_missing_file() {
        let library = TempDir::new().unwrap();
        let (tx, _rx) = job_queue();
        let dispatcher = Dispatcher::new(library.path(), InFlightSet::new(), tx);

        let err = dispatcher.submit("10.0.0.2", "/nope.mkv").await.unwrap_err();
        let expected = library.path().join("nope.mkv");
        assert_eq!(
            err.message(),
            format!("could not open file: {}", expected.display())
        );
        assert!(dispatcher.in_flight().is_empty());
        assert_eq!(dispatcher.queued(), 0);
    }

    #[tokio::test]
    async fn test_closed_queue_releases_path() {
        let library = library_with("ep1.ts");
        let (tx, rx) = job_queue();
        drop(rx);
        let dispatcher = Dispatcher::new(library.path(), InFlightSet::new(), tx);

        let err = dispatcher.submit("127.0.0.1", "ep1.ts").await.unwrap_err();
        assert!(matches!(err, SubmitError::Queue(QueueError::Closed)));
        assert!(dispatcher.in_flight().is_empty());
    }
}
