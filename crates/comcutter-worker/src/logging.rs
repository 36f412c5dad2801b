//! Structured job logging utilities.
//!
//! Provides consistent, structured logging for job processing with
//! tracing spans and contextual information.

use std::path::Path;

use tracing::{debug, error, info, warn, Span};

/// Job logger for structured logging with consistent formatting.
///
/// Every event carries the job's file path (the path is the job identity)
/// and the operation being performed.
#[derive(Debug, Clone)]
pub struct JobLogger {
    path: String,
    file_name: String,
    operation: String,
}

impl JobLogger {
    /// Create a new job logger for a file and operation.
    ///
    /// # Arguments
    /// * `path` - The absolute path of the file being processed
    /// * `operation` - The type of operation (e.g., "comskip", "postprocess")
    pub fn new(path: &Path, operation: &str) -> Self {
        Self {
            path: path.display().to_string(),
            file_name: path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
            operation: operation.to_string(),
        }
    }

    /// Log the start of a job operation.
    pub fn log_start(&self, message: &str) {
        info!(
            path = %self.path,
            operation = %self.operation,
            "{}", message
        );
    }

    /// Log a detail useful when debugging a job.
    pub fn log_debug(&self, message: &str) {
        debug!(
            path = %self.path,
            operation = %self.operation,
            "{}", message
        );
    }

    /// Log a progress update during job execution.
    pub fn log_progress(&self, message: &str) {
        info!(
            path = %self.path,
            operation = %self.operation,
            "{}", message
        );
    }

    /// Log a warning during job execution.
    pub fn log_warning(&self, message: &str) {
        warn!(
            path = %self.path,
            operation = %self.operation,
            "{}", message
        );
    }

    /// Log an error during job execution.
    pub fn log_error(&self, message: &str) {
        error!(
            path = %self.path,
            operation = %self.operation,
            "{}", message
        );
    }

    /// Log the completion of a job operation.
    pub fn log_completion(&self, message: &str) {
        info!(
            path = %self.path,
            operation = %self.operation,
            "{}", message
        );
    }

    /// File name without the directory, used in human-facing messages.
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// Create a tracing span for this job.
    pub fn create_span(&self) -> Span {
        tracing::info_span!(
            "job",
            path = %self.path,
            operation = %self.operation
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_logger_creation() {
        let logger = JobLogger::new(Path::new("/library/shows/ep1.mkv"), "comskip");

        assert_eq!(logger.path, "/library/shows/ep1.mkv");
        assert_eq!(logger.file_name(), "ep1.mkv");
        assert_eq!(logger.operation, "comskip");
    }
}
