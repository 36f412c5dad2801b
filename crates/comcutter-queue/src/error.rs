//! Queue error types.

use std::path::PathBuf;

use thiserror::Error;

pub type QueueResult<T> = Result<T, QueueError>;

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("Job queue is closed")]
    Closed,
}

/// Reasons a submission is not accepted.
#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("could not open file: {}", .0.display())]
    FileNotFound(PathBuf),

    #[error("already processing")]
    AlreadyProcessing,

    #[error("Queue error: {0}")]
    Queue(#[from] QueueError),
}

impl SubmitError {
    /// Message reported back to the caller.
    pub fn message(&self) -> String {
        self.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_submit_messages() {
        let err = SubmitError::FileNotFound(PathBuf::from("/library/shows/ep1.mkv"));
        assert_eq!(err.message(), "could not open file: /library/shows/ep1.mkv");

        assert_eq!(SubmitError::AlreadyProcessing.message(), "already processing");
        assert_eq!(SubmitError::Queue(QueueError::Closed).message(), "Queue error: Job queue is closed");
    }
}
