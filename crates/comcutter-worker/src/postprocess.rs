//! Best-effort hook run on a committed file.

use std::path::{Path, PathBuf};

use comcutter_media::{is_file, ToolCommand, ToolRunner};

use crate::error::{JobError, JobResult};
use crate::logging::JobLogger;

/// What the hook did for one committed file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PostProcess {
    /// No hook configured
    NotConfigured,
    /// Configured path is not an existing file
    MissingExecutable(PathBuf),
    /// Hook exited 0
    Completed,
    /// Hook failed; the commit stands
    Failed(String),
}

/// Runs `<cmd> <path>` after a successful commit.
#[derive(Debug, Clone)]
pub struct PostProcessor {
    cmd: Option<PathBuf>,
    runner: ToolRunner,
}

impl PostProcessor {
    pub fn new(cmd: Option<PathBuf>) -> Self {
        Self {
            cmd,
            runner: ToolRunner::new(),
        }
    }

    /// Run the hook for `path`.
    ///
    /// A missing configuration is silent and a missing executable is only a
    /// warning; both return `Ok`. A spawn failure or non-zero exit returns
    /// [`JobError::PostProcessFailed`].
    pub async fn run(&self, path: &Path) -> JobResult<PostProcess> {
        let Some(ref cmd) = self.cmd else {
            return Ok(PostProcess::NotConfigured);
        };

        let logger = JobLogger::new(path, "postprocess");

        if !is_file(cmd).await {
            logger.log_warning(&format!("could not run postprocess command: {}", cmd.display()));
            return Ok(PostProcess::MissingExecutable(cmd.clone()));
        }

        let command = ToolCommand::new(cmd).target(path);
        logger.log_debug(&format!("running postprocess cmd: {}", command.display()));

        let output = self
            .runner
            .run(&command)
            .await
            .map_err(|e| JobError::PostProcessFailed {
                exit_code: None,
                stderr: Some(e.to_string()),
            })?;

        if output.success() {
            logger.log_completion("postprocess complete");
            Ok(PostProcess::Completed)
        } else {
            Err(JobError::PostProcessFailed {
                exit_code: output.exit_code,
                stderr: output.stderr_message().map(str::to_string),
            })
        }
    }
}
