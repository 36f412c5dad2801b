//! Job error types.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

pub type JobResult<T> = Result<T, JobError>;

/// Terminal outcomes of a job other than a commit.
///
/// None of these are retried. The tool-level variants (timeout, invocation,
/// non-zero exit, size check) are only produced after the backup has been
/// moved back over the original.
#[derive(Debug, Error)]
pub enum JobError {
    #[error("file does not exist: {}", .0.display())]
    FileNotFound(PathBuf),

    #[error("backup failed for {}: {source}", .path.display())]
    BackupFailed {
        path: PathBuf,
        #[source]
        source: comcutter_media::MediaError,
    },

    #[error("timed out after {0:?}")]
    ToolTimeout(Duration),

    #[error("error processing file: {0}")]
    ToolInvocation(String),

    #[error("tool exited with {}: {}", exit_code_label(.exit_code), .stderr.as_deref().unwrap_or("unknown error"))]
    ToolNonZeroExit {
        exit_code: Option<i32>,
        stderr: Option<String>,
    },

    #[error(
        "new file size incorrect: old={original_size} - new={new_size} ({:.0}%, expected {:.0}%)",
        percent_of(.original_size, .new_size),
        .threshold * 100.0
    )]
    SizeCheckFailed {
        original_size: u64,
        new_size: u64,
        threshold: f64,
    },

    #[error("postprocess exited with {}: {}", exit_code_label(.exit_code), .stderr.as_deref().unwrap_or("unknown error"))]
    PostProcessFailed {
        exit_code: Option<i32>,
        stderr: Option<String>,
    },
}

impl JobError {
    pub fn tool_invocation(msg: impl Into<String>) -> Self {
        Self::ToolInvocation(msg.into())
    }

    /// Whether the original was restored from backup before this error was returned.
    pub fn is_rolled_back(&self) -> bool {
        matches!(
            self,
            JobError::ToolTimeout(_)
                | JobError::ToolInvocation(_)
                | JobError::ToolNonZeroExit { .. }
                | JobError::SizeCheckFailed { .. }
        )
    }

    /// Short label for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            JobError::FileNotFound(_) => "file_not_found",
            JobError::BackupFailed { .. } => "backup_failed",
            JobError::ToolTimeout(_) => "tool_timeout",
            JobError::ToolInvocation(_) => "tool_invocation",
            JobError::ToolNonZeroExit { .. } => "tool_non_zero_exit",
            JobError::SizeCheckFailed { .. } => "size_check_failed",
            JobError::PostProcessFailed { .. } => "postprocess_failed",
        }
    }
}

fn exit_code_label(code: &Option<i32>) -> String {
    match *code {
        Some(code) => format!("status {code}"),
        None => "signal".to_string(),
    }
}

/// Whole percent, truncated so a rejected size never reads as the threshold.
fn percent_of(original_size: &u64, new_size: &u64) -> f64 {
    size_percent(*original_size, *new_size).trunc()
}

/// New size as a percentage of the original.
pub(crate) fn size_percent(original_size: u64, new_size: u64) -> f64 {
    if original_size == 0 {
        return 0.0;
    }
    new_size as f64 / original_size as f64 * 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_size_check_message() {
        let err = JobError::SizeCheckFailed {
            original_size: 1000,
            new_size: 850,
            threshold: 0.9,
        };
        assert_eq!(
            err.to_string(),
            "new file size incorrect: old=1000 - new=850 (85%, expected 90%)"
        );
        assert!(err.is_rolled_back());
    }

    #[test]
    fn test_non_zero_exit_message() {
        let err = JobError::ToolNonZeroExit {
            exit_code: Some(2),
            stderr: None,
        };
        assert_eq!(err.to_string(), "tool exited with status 2: unknown error");

        let err = JobError::ToolNonZeroExit {
            exit_code: None,
            stderr: Some("segfault".to_string()),
        };
        assert_eq!(err.to_string(), "tool exited with signal: segfault");
    }

    #[test]
    fn test_precondition_errors_are_not_rollbacks() {
        assert!(!JobError::FileNotFound(PathBuf::from("/library/a.ts")).is_rolled_back());
        let err = JobError::BackupFailed {
            path: PathBuf::from("/library/a.ts"),
            source: comcutter_media::MediaError::BackupExists(PathBuf::from("/library/a.ts.bak")),
        };
        assert!(!err.is_rolled_back());
        assert_eq!(err.kind(), "backup_failed");
    }

    #[test]
    fn test_size_message_truncates_percent() {
        let err = JobError::SizeCheckFailed {
            original_size: 1000,
            new_size: 899,
            threshold: 0.90,
        };
        assert_eq!(
            err.to_string(),
            "new file size incorrect: old=1000 - new=899 (89%, expected 90%)"
        );
    }

    #[test]
    fn test_size_percent_of_empty_original() {
        assert_eq!(size_percent(0, 10), 0.0);
        assert_eq!(size_percent(200, 50), 25.0);
    }
}
